//! # document.xml Writer
//!
//! Serializes the [`DocumentXml`] model back to WordprocessingML. Raw
//! passthrough strings are emitted verbatim; typed nodes are rebuilt in
//! schema order. Text content and attribute values are escaped with
//! quick-xml's escaper.

use quick_xml::escape::escape;

use super::{
    BodyElement, DocumentXml, Paragraph, ParagraphChild, Run, RunContent, RunProperties, Table,
    TableCell, TableRow,
};

const XML_DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\r\n";

/// Serialize a full `word/document.xml`.
pub fn write_document(doc: &DocumentXml) -> String {
    let mut out = String::with_capacity(16 * 1024);
    out.push_str(XML_DECL);
    out.push('<');
    out.push_str(&doc.root_tag);
    out.push_str("><w:body>");
    for element in &doc.body {
        write_body_element(&mut out, element);
    }
    if let Some(section) = &doc.section {
        out.push_str(section);
    }
    out.push_str("</w:body></w:document>");
    out
}

fn write_body_element(out: &mut String, element: &BodyElement) {
    match element {
        BodyElement::Paragraph(p) => write_paragraph(out, p),
        BodyElement::Table(t) => write_table(out, t),
        BodyElement::Raw(raw) => out.push_str(raw),
    }
}

fn write_paragraph(out: &mut String, paragraph: &Paragraph) {
    out.push_str("<w:p>");
    if let Some(props) = &paragraph.properties {
        out.push_str(props);
    }
    for child in &paragraph.children {
        match child {
            ParagraphChild::Run(run) => write_run(out, run),
            ParagraphChild::Raw(raw) => out.push_str(raw),
        }
    }
    out.push_str("</w:p>");
}

fn write_run(out: &mut String, run: &Run) {
    out.push_str("<w:r>");
    write_run_properties(out, &run.properties);
    for item in &run.content {
        match item {
            RunContent::Text {
                value,
                preserve_space,
            } => {
                // Newlines become line breaks; w:t cannot hold them.
                let segments: Vec<&str> = value.split('\n').collect();
                for (i, segment) in segments.iter().enumerate() {
                    if i > 0 {
                        out.push_str("<w:br/>");
                    }
                    if segment.is_empty() {
                        continue;
                    }
                    let needs_preserve = *preserve_space
                        || segment.starts_with(char::is_whitespace)
                        || segment.ends_with(char::is_whitespace);
                    if needs_preserve {
                        out.push_str("<w:t xml:space=\"preserve\">");
                    } else {
                        out.push_str("<w:t>");
                    }
                    out.push_str(&escape(*segment));
                    out.push_str("</w:t>");
                }
            }
            RunContent::PageBreak => out.push_str("<w:br w:type=\"page\"/>"),
            RunContent::Drawing {
                rel_id,
                cx_emu,
                cy_emu,
                name,
            } => write_drawing(out, rel_id, *cx_emu, *cy_emu, name),
            RunContent::Raw(raw) => out.push_str(raw),
        }
    }
    out.push_str("</w:r>");
}

/// Emit `w:rPr` in schema order: rFonts, b, i, color, sz, u, then the raw
/// leftovers. Nothing is emitted for a fully unset property block.
fn write_run_properties(out: &mut String, props: &RunProperties) {
    if props.is_empty() {
        return;
    }
    out.push_str("<w:rPr>");
    if props.font.is_some() || props.east_asia_font.is_some() {
        out.push_str("<w:rFonts");
        if let Some(font) = &props.font {
            let escaped = escape(font.as_str());
            out.push_str(&format!(" w:ascii=\"{0}\" w:hAnsi=\"{0}\"", escaped));
        }
        if let Some(ea) = &props.east_asia_font {
            out.push_str(&format!(" w:eastAsia=\"{}\"", escape(ea.as_str())));
        }
        out.push_str("/>");
    }
    if let Some(bold) = props.bold {
        out.push_str(if bold { "<w:b/>" } else { "<w:b w:val=\"0\"/>" });
    }
    if let Some(italic) = props.italic {
        out.push_str(if italic { "<w:i/>" } else { "<w:i w:val=\"0\"/>" });
    }
    if let Some(color) = &props.color {
        out.push_str(&format!("<w:color w:val=\"{}\"/>", escape(color.as_str())));
    }
    if let Some(size) = props.size_half_points {
        out.push_str(&format!("<w:sz w:val=\"{0}\"/><w:szCs w:val=\"{0}\"/>", size));
    }
    if let Some(underline) = &props.underline {
        out.push_str(&format!("<w:u w:val=\"{}\"/>", escape(underline.as_str())));
    }
    for raw in &props.extra {
        out.push_str(raw);
    }
    out.push_str("</w:rPr>");
}

/// The standard inline-picture boilerplate. The drawing carries its own
/// DrawingML namespace declarations so the root tag needs none of them.
fn write_drawing(out: &mut String, rel_id: &str, cx: u64, cy: u64, name: &str) {
    // docPr ids must be unique per document; the relationship id's numeric
    // suffix is unique already, so reuse it.
    let doc_pr_id: u32 = rel_id
        .trim_start_matches(|c: char| !c.is_ascii_digit())
        .parse()
        .unwrap_or(1);
    let escaped_name = escape(name);
    let escaped_rel = escape(rel_id);
    out.push_str(&format!(
        "<w:drawing><wp:inline distT=\"0\" distB=\"0\" distL=\"0\" distR=\"0\" \
         xmlns:wp=\"http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing\">\
         <wp:extent cx=\"{cx}\" cy=\"{cy}\"/>\
         <wp:docPr id=\"{id}\" name=\"{name}\"/>\
         <a:graphic xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\">\
         <a:graphicData uri=\"http://schemas.openxmlformats.org/drawingml/2006/picture\">\
         <pic:pic xmlns:pic=\"http://schemas.openxmlformats.org/drawingml/2006/picture\">\
         <pic:nvPicPr><pic:cNvPr id=\"{id}\" name=\"{name}\"/><pic:cNvPicPr/></pic:nvPicPr>\
         <pic:blipFill><a:blip r:embed=\"{rel}\" \
         xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\"/>\
         <a:stretch><a:fillRect/></a:stretch></pic:blipFill>\
         <pic:spPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"{cx}\" cy=\"{cy}\"/></a:xfrm>\
         <a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom></pic:spPr>\
         </pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing>",
        cx = cx,
        cy = cy,
        id = doc_pr_id,
        name = escaped_name,
        rel = escaped_rel,
    ));
}

fn write_table(out: &mut String, table: &Table) {
    out.push_str("<w:tbl>");
    if let Some(props) = &table.properties {
        out.push_str(props);
    }
    if let Some(grid) = &table.grid {
        out.push_str(grid);
    }
    for row in &table.rows {
        write_row(out, row);
    }
    for raw in &table.extra {
        out.push_str(raw);
    }
    out.push_str("</w:tbl>");
}

fn write_row(out: &mut String, row: &TableRow) {
    out.push_str("<w:tr>");
    if let Some(props) = &row.properties {
        out.push_str(props);
    }
    for cell in &row.cells {
        write_cell(out, cell);
    }
    for raw in &row.extra {
        out.push_str(raw);
    }
    out.push_str("</w:tr>");
}

fn write_cell(out: &mut String, cell: &TableCell) {
    out.push_str("<w:tc>");
    if let Some(props) = &cell.properties {
        out.push_str(props);
    }
    // A table cell must contain at least one paragraph to stay valid.
    if cell.content.is_empty() {
        out.push_str("<w:p/>");
    }
    for element in &cell.content {
        write_body_element(out, element);
    }
    out.push_str("</w:tc>");
}
