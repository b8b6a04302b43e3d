//! # document.xml Parser
//!
//! Event-driven parse of WordprocessingML into the [`DocumentXml`] model.
//! Modeled elements (`w:p`, `w:r`, `w:t`, `w:br`, `w:tbl`, `w:tr`, `w:tc`,
//! the typed subset of `w:rPr`) become tree nodes; everything else is
//! captured as a raw XML string and will be emitted verbatim by the writer.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{
    BodyElement, DocumentXml, Paragraph, ParagraphChild, Run, RunContent, RunProperties, Table,
    TableCell, TableRow,
};
use crate::error::Error;

/// Root tag used when the source document somehow lacks namespace
/// declarations (synthetic test documents).
const DEFAULT_ROOT_TAG: &str = "w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\" xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\"";

fn xml_err<E: std::fmt::Display>(e: E) -> Error {
    Error::Xml(e.to_string())
}

fn utf8(bytes: &[u8]) -> Result<&str, Error> {
    std::str::from_utf8(bytes).map_err(xml_err)
}

/// Parse the full `word/document.xml` text.
pub fn parse_document(xml: &str) -> Result<DocumentXml, Error> {
    let mut reader = Reader::from_str(xml);
    let mut root_tag: Option<String> = None;

    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:document" => root_tag = Some(tag_content(&e)?),
                b"w:body" => {
                    let (body, section, _) = parse_block_children(&mut reader, b"w:body")?;
                    return Ok(DocumentXml {
                        root_tag: root_tag.unwrap_or_else(|| DEFAULT_ROOT_TAG.to_string()),
                        body,
                        section,
                    });
                }
                _ => {
                    // Unexpected container before the body; skip over it.
                    skip_element(&mut reader)?;
                }
            },
            Event::Eof => return Err(Error::Template("document.xml has no w:body".to_string())),
            _ => {}
        }
    }
}

/// Parse block-level children until `end_tag` closes. Returns the elements,
/// a raw `w:sectPr` if one appeared (body only), and raw `w:tcPr` if one
/// appeared (cells only).
fn parse_block_children(
    reader: &mut Reader<&[u8]>,
    end_tag: &[u8],
) -> Result<(Vec<BodyElement>, Option<String>, Option<String>), Error> {
    let mut elements = Vec::new();
    let mut section = None;
    let mut cell_props = None;

    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => elements.push(BodyElement::Paragraph(parse_paragraph(reader)?)),
                b"w:tbl" => elements.push(BodyElement::Table(parse_table(reader)?)),
                b"w:sectPr" => section = Some(capture_element(reader, &e, false)?),
                b"w:tcPr" => cell_props = Some(capture_element(reader, &e, false)?),
                _ => elements.push(BodyElement::Raw(capture_element(reader, &e, false)?)),
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:p" => elements.push(BodyElement::Paragraph(Paragraph::default())),
                b"w:sectPr" => section = Some(capture_element(reader, &e, true)?),
                b"w:tcPr" => cell_props = Some(capture_element(reader, &e, true)?),
                _ => elements.push(BodyElement::Raw(capture_element(reader, &e, true)?)),
            },
            Event::End(e) if e.name().as_ref() == end_tag => {
                return Ok((elements, section, cell_props))
            }
            Event::Eof => {
                return Err(Error::Xml(format!(
                    "unclosed <{}> element",
                    utf8(end_tag)?
                )))
            }
            _ => {}
        }
    }
}

fn parse_paragraph(reader: &mut Reader<&[u8]>) -> Result<Paragraph, Error> {
    let mut paragraph = Paragraph::default();
    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:pPr" => paragraph.properties = Some(capture_element(reader, &e, false)?),
                b"w:r" => paragraph
                    .children
                    .push(ParagraphChild::Run(parse_run(reader)?)),
                _ => paragraph
                    .children
                    .push(ParagraphChild::Raw(capture_element(reader, &e, false)?)),
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:pPr" => paragraph.properties = Some(capture_element(reader, &e, true)?),
                b"w:r" => paragraph.children.push(ParagraphChild::Run(Run::default())),
                _ => paragraph
                    .children
                    .push(ParagraphChild::Raw(capture_element(reader, &e, true)?)),
            },
            Event::End(e) if e.name().as_ref() == b"w:p" => return Ok(paragraph),
            Event::Eof => return Err(Error::Xml("unclosed <w:p> element".to_string())),
            _ => {}
        }
    }
}

fn parse_run(reader: &mut Reader<&[u8]>) -> Result<Run, Error> {
    let mut run = Run::default();
    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:rPr" => run.properties = parse_run_properties(reader)?,
                b"w:t" => {
                    let preserve = attr_value(&e, b"xml:space")?.as_deref() == Some("preserve");
                    run.content.push(RunContent::Text {
                        value: read_text_content(reader)?,
                        preserve_space: preserve,
                    });
                }
                _ => run
                    .content
                    .push(RunContent::Raw(capture_element(reader, &e, false)?)),
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:t" => run.content.push(RunContent::Text {
                    value: String::new(),
                    preserve_space: false,
                }),
                b"w:br" => match attr_value(&e, b"w:type")?.as_deref() {
                    Some("page") => run.content.push(RunContent::PageBreak),
                    // Plain line breaks round-trip as newlines in run text,
                    // so caption blocks read and compare naturally.
                    None | Some("textWrapping") => run.content.push(RunContent::Text {
                        value: "\n".to_string(),
                        preserve_space: false,
                    }),
                    _ => run
                        .content
                        .push(RunContent::Raw(capture_element(reader, &e, true)?)),
                },
                _ => run
                    .content
                    .push(RunContent::Raw(capture_element(reader, &e, true)?)),
            },
            Event::End(e) if e.name().as_ref() == b"w:r" => return Ok(run),
            Event::Eof => return Err(Error::Xml("unclosed <w:r> element".to_string())),
            _ => {}
        }
    }
}

/// Collect the character content of a `w:t` element.
fn read_text_content(reader: &mut Reader<&[u8]>) -> Result<String, Error> {
    let mut value = String::new();
    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Text(t) => value.push_str(&t.unescape().map_err(xml_err)?),
            Event::CData(c) => value.push_str(utf8(&c.into_inner())?),
            Event::End(e) if e.name().as_ref() == b"w:t" => return Ok(value),
            Event::Eof => return Err(Error::Xml("unclosed <w:t> element".to_string())),
            _ => {}
        }
    }
}

fn parse_run_properties(reader: &mut Reader<&[u8]>) -> Result<RunProperties, Error> {
    let mut props = RunProperties::default();
    loop {
        let event = reader.read_event().map_err(xml_err)?;
        let (e, is_empty) = match &event {
            Event::Start(e) => (e, false),
            Event::Empty(e) => (e, true),
            Event::End(e) if e.name().as_ref() == b"w:rPr" => return Ok(props),
            Event::Eof => return Err(Error::Xml("unclosed <w:rPr> element".to_string())),
            _ => continue,
        };
        match e.name().as_ref() {
            b"w:rFonts" => {
                props.font = attr_value(e, b"w:ascii")?.or(attr_value(e, b"w:hAnsi")?);
                props.east_asia_font = attr_value(e, b"w:eastAsia")?;
                if !is_empty {
                    skip_element(reader)?;
                }
            }
            b"w:b" => {
                props.bold = Some(parse_on_off(e)?);
                if !is_empty {
                    skip_element(reader)?;
                }
            }
            b"w:i" => {
                props.italic = Some(parse_on_off(e)?);
                if !is_empty {
                    skip_element(reader)?;
                }
            }
            b"w:u" => {
                props.underline = attr_value(e, b"w:val")?;
                if !is_empty {
                    skip_element(reader)?;
                }
            }
            b"w:sz" => {
                props.size_half_points = attr_value(e, b"w:val")?.and_then(|v| v.parse().ok());
                if !is_empty {
                    skip_element(reader)?;
                }
            }
            b"w:color" => {
                props.color = attr_value(e, b"w:val")?;
                if !is_empty {
                    skip_element(reader)?;
                }
            }
            _ => props.extra.push(capture_element(reader, e, is_empty)?),
        }
    }
}

fn parse_table(reader: &mut Reader<&[u8]>) -> Result<Table, Error> {
    let mut table = Table::default();
    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:tblPr" => table.properties = Some(capture_element(reader, &e, false)?),
                b"w:tblGrid" => table.grid = Some(capture_element(reader, &e, false)?),
                b"w:tr" => table.rows.push(parse_row(reader)?),
                _ => table.extra.push(capture_element(reader, &e, false)?),
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tr" => table.rows.push(TableRow::default()),
                _ => table.extra.push(capture_element(reader, &e, true)?),
            },
            Event::End(e) if e.name().as_ref() == b"w:tbl" => return Ok(table),
            Event::Eof => return Err(Error::Xml("unclosed <w:tbl> element".to_string())),
            _ => {}
        }
    }
}

fn parse_row(reader: &mut Reader<&[u8]>) -> Result<TableRow, Error> {
    let mut row = TableRow::default();
    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:trPr" => row.properties = Some(capture_element(reader, &e, false)?),
                b"w:tc" => {
                    let (content, _, cell_props) = parse_block_children(reader, b"w:tc")?;
                    row.cells.push(TableCell {
                        properties: cell_props,
                        content,
                    });
                }
                _ => row.extra.push(capture_element(reader, &e, false)?),
            },
            Event::Empty(e) => row.extra.push(capture_element(reader, &e, true)?),
            Event::End(e) if e.name().as_ref() == b"w:tr" => return Ok(row),
            Event::Eof => return Err(Error::Xml("unclosed <w:tr> element".to_string())),
            _ => {}
        }
    }
}

// ─── Raw capture ────────────────────────────────────────────────────

/// Reconstruct the opening-tag content (`name attr="value" …`) of an
/// element, preserving attribute escaping as it appeared in the source.
fn tag_content(e: &BytesStart) -> Result<String, Error> {
    let mut out = String::from(utf8(e.name().as_ref())?);
    for attr in e.attributes() {
        let attr = attr.map_err(xml_err)?;
        out.push(' ');
        out.push_str(utf8(attr.key.as_ref())?);
        out.push_str("=\"");
        out.push_str(utf8(&attr.value)?);
        out.push('"');
    }
    Ok(out)
}

/// Capture an element (whose start tag has just been read) and its whole
/// subtree as a raw XML string.
fn capture_element(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart,
    is_empty: bool,
) -> Result<String, Error> {
    let mut out = String::from("<");
    out.push_str(&tag_content(start)?);
    if is_empty {
        out.push_str("/>");
        return Ok(out);
    }
    out.push('>');

    let mut depth = 1usize;
    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) => {
                out.push('<');
                out.push_str(&tag_content(&e)?);
                out.push('>');
                depth += 1;
            }
            Event::Empty(e) => {
                out.push('<');
                out.push_str(&tag_content(&e)?);
                out.push_str("/>");
            }
            Event::End(e) => {
                out.push_str("</");
                out.push_str(utf8(e.name().as_ref())?);
                out.push('>');
                depth -= 1;
                if depth == 0 {
                    return Ok(out);
                }
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(xml_err)?;
                out.push_str(&quick_xml::escape::escape(text.as_ref()));
            }
            Event::CData(c) => {
                out.push_str("<![CDATA[");
                out.push_str(utf8(&c.into_inner())?);
                out.push_str("]]>");
            }
            Event::Eof => return Err(Error::Xml("unclosed element in capture".to_string())),
            _ => {}
        }
    }
}

/// Consume events until the element whose start tag was just read closes.
fn skip_element(reader: &mut Reader<&[u8]>) -> Result<(), Error> {
    let mut depth = 1usize;
    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Event::Eof => return Err(Error::Xml("unclosed element in skip".to_string())),
            _ => {}
        }
    }
}

fn attr_value(e: &BytesStart, key: &[u8]) -> Result<Option<String>, Error> {
    for attr in e.attributes() {
        let attr = attr.map_err(xml_err)?;
        if attr.key.as_ref() == key {
            let raw = utf8(&attr.value)?;
            let unescaped = quick_xml::escape::unescape(raw).map_err(xml_err)?;
            return Ok(Some(unescaped.into_owned()));
        }
    }
    Ok(None)
}

/// Word's on/off properties: present means on unless w:val says otherwise.
fn parse_on_off(e: &BytesStart) -> Result<bool, Error> {
    Ok(match attr_value(e, b"w:val")?.as_deref() {
        Some("0") | Some("false") | Some("none") | Some("off") => false,
        _ => true,
    })
}
