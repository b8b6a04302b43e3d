//! # Multi-Document Composition
//!
//! Concatenates generated documents into one continuous output. The first
//! document is the base; each subsequent document's body is appended behind
//! an explicit page break so it still starts on its own page.
//!
//! Source documents are independent packages with their own relationship
//! numbering, so every appended image part is re-registered in the base and
//! its relationship id remapped during the copy — the classic id-collision
//! hazard of merging container formats. Named style references are NOT
//! remapped: an appended body resolves `w:pStyle` and friends against the
//! base's style part, so composition refuses sources whose style or
//! numbering definitions differ from the base's.

use crate::error::Error;
use crate::model::{BodyElement, Paragraph, ParagraphChild, Run, RunContent};
use crate::package::DocxPackage;

/// Merge packages into one. Empty input is an error; a single document
/// passes through unchanged.
pub fn compose(mut documents: Vec<DocxPackage>) -> Result<DocxPackage, Error> {
    if documents.is_empty() {
        return Err(Error::Compose("no documents to compose".to_string()));
    }
    if documents.len() == 1 {
        return Ok(documents.remove(0));
    }

    let mut base = documents.remove(0);
    for (index, source) in documents.into_iter().enumerate() {
        append_document(&mut base, source)
            .map_err(|e| Error::Compose(format!("appending document {}: {}", index + 2, e)))?;
    }
    Ok(base)
}

/// Parts whose definitions the appended body keeps referencing by name
/// (`w:pStyle`, `w:tblStyle`, `w:numId`). Those references are resolved
/// against the BASE document after the copy, so the parts must agree.
const SHARED_RESOURCE_PARTS: [&str; 2] = ["word/styles.xml", "word/numbering.xml"];

fn ensure_shared_resources_match(base: &DocxPackage, source: &DocxPackage) -> Result<(), Error> {
    for part in SHARED_RESOURCE_PARTS {
        if let Some(theirs) = source.parts.get(part) {
            if base.parts.get(part).map(|p| p.as_slice()) != Some(theirs.as_slice()) {
                return Err(Error::Compose(format!(
                    "documents carry different {}; generate them from the same template before composing",
                    part
                )));
            }
        }
    }
    Ok(())
}

fn append_document(base: &mut DocxPackage, source: DocxPackage) -> Result<(), Error> {
    ensure_shared_resources_match(base, &source)?;

    // Re-register the source's image parts under fresh relationship ids.
    let mut mapping: Vec<(String, String)> = Vec::new();
    for (rel, bytes) in source.image_rels() {
        let bytes = bytes
            .ok_or_else(|| Error::Compose(format!("missing media part {}", rel.target)))?
            .to_vec();
        let extension = rel.target.rsplit('.').next().unwrap_or("png").to_string();
        let new_id = base.add_image(bytes, &extension);
        mapping.push((rel.id.clone(), new_id));
    }

    let mut body = source.document.body;
    remap_relationships(&mut body, &mapping);

    // The appended document starts on its own page.
    let mut separator = Paragraph::default();
    separator.push_run(Run::page_break());
    base.document.body.push(BodyElement::Paragraph(separator));
    base.document.body.extend(body);
    Ok(())
}

fn remap_relationships(elements: &mut [BodyElement], mapping: &[(String, String)]) {
    if mapping.is_empty() {
        return;
    }
    for element in elements.iter_mut() {
        match element {
            BodyElement::Paragraph(p) => remap_paragraph(p, mapping),
            BodyElement::Table(table) => {
                for row in &mut table.rows {
                    for cell in &mut row.cells {
                        remap_relationships(&mut cell.content, mapping);
                    }
                }
            }
            BodyElement::Raw(raw) => *raw = remap_raw(raw, mapping),
        }
    }
}

fn remap_paragraph(paragraph: &mut Paragraph, mapping: &[(String, String)]) {
    for child in &mut paragraph.children {
        match child {
            ParagraphChild::Run(run) => {
                for item in &mut run.content {
                    match item {
                        RunContent::Drawing { rel_id, .. } => {
                            if let Some((_, new_id)) =
                                mapping.iter().find(|(old, _)| old == rel_id)
                            {
                                *rel_id = new_id.clone();
                            }
                        }
                        RunContent::Raw(raw) => *raw = remap_raw(raw, mapping),
                        _ => {}
                    }
                }
            }
            ParagraphChild::Raw(raw) => *raw = remap_raw(raw, mapping),
        }
    }
}

/// Rewrite `r:embed="old"` references inside raw XML. Two phases via
/// unmistakable placeholders, so a fresh id that collides with a later old
/// id is never remapped twice.
fn remap_raw(raw: &str, mapping: &[(String, String)]) -> String {
    if !raw.contains("r:embed") {
        return raw.to_string();
    }
    let mut out = raw.to_string();
    for (index, (old, _)) in mapping.iter().enumerate() {
        out = out.replace(
            &format!("r:embed=\"{}\"", old),
            &format!("r:embed=\"\u{1}{}\u{1}\"", index),
        );
    }
    for (index, (_, new)) in mapping.iter().enumerate() {
        out = out.replace(
            &format!("r:embed=\"\u{1}{}\u{1}\"", index),
            &format!("r:embed=\"{}\"", new),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn package_with_styles(styles: Option<&str>) -> DocxPackage {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        writer.start_file("word/document.xml", options).unwrap();
        writer
            .write_all(
                b"<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
                  <w:document xmlns:w=\"http://example/w\"><w:body>\
                  <w:p><w:r><w:t>x</w:t></w:r></w:p>\
                  </w:body></w:document>",
            )
            .unwrap();
        if let Some(styles) = styles {
            writer.start_file("word/styles.xml", options).unwrap();
            writer.write_all(styles.as_bytes()).unwrap();
        }
        let bytes = writer.finish().unwrap().into_inner();
        DocxPackage::open(&bytes).unwrap()
    }

    #[test]
    fn test_compose_empty_is_error() {
        let result = compose(Vec::new());
        assert!(matches!(result, Err(Error::Compose(_))));
    }

    #[test]
    fn test_compose_rejects_mismatched_styles() {
        let base = package_with_styles(Some("<w:styles><w:style w:styleId=\"A\"/></w:styles>"));
        let other = package_with_styles(Some("<w:styles><w:style w:styleId=\"B\"/></w:styles>"));
        let result = compose(vec![base, other]);
        assert!(matches!(result, Err(Error::Compose(_))));
    }

    #[test]
    fn test_compose_accepts_matching_styles() {
        let styles = "<w:styles><w:style w:styleId=\"A\"/></w:styles>";
        let base = package_with_styles(Some(styles));
        let other = package_with_styles(Some(styles));
        let merged = compose(vec![base, other]).unwrap();
        // Both bodies present, separated by the page break.
        assert_eq!(merged.document.all_text().matches('x').count(), 2);
        assert!(merged.document.first_page_break_index().is_some());
    }

    #[test]
    fn test_compose_accepts_source_without_styles_part() {
        let base = package_with_styles(Some("<w:styles/>"));
        let other = package_with_styles(None);
        assert!(compose(vec![base, other]).is_ok());
    }

    #[test]
    fn test_remap_raw_avoids_double_remap() {
        // rId2 -> rId5 while an original rId5 -> rId6: the fresh rId5 must
        // not be swept up by the second rule.
        let mapping = vec![
            ("rId2".to_string(), "rId5".to_string()),
            ("rId5".to_string(), "rId6".to_string()),
        ];
        let raw = "<a:blip r:embed=\"rId2\"/><a:blip r:embed=\"rId5\"/>";
        let out = remap_raw(raw, &mapping);
        assert_eq!(out, "<a:blip r:embed=\"rId5\"/><a:blip r:embed=\"rId6\"/>");
    }

    #[test]
    fn test_remap_raw_respects_id_boundaries() {
        let mapping = vec![("rId1".to_string(), "rId9".to_string())];
        let raw = "<a:blip r:embed=\"rId1\"/><a:blip r:embed=\"rId10\"/>";
        let out = remap_raw(raw, &mapping);
        assert!(out.contains("r:embed=\"rId9\""));
        assert!(out.contains("r:embed=\"rId10\""));
    }
}
