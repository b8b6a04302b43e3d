//! # Structural Truncation
//!
//! Templates are authored at a fixed photo capacity laid out across pages,
//! with one explicit page break between the short single-page layout and
//! the trailing long layout. When a batch fills few enough slots to fit the
//! first page, everything from the break onward is deleted so the output
//! never renders empty photo boxes.
//!
//! The single-page threshold is measured from the template itself — the
//! number of distinct `{img_k}` slots appearing before the first page
//! break — rather than assuming any particular template's density.
//!
//! After truncation a cleanup pass blanks every token still unresolved, so
//! no raw `{...}` text can leak into the output.

use std::collections::BTreeSet;

use crate::model::{BodyElement, DocumentXml, Run, RunContent, RunProperties, Walk};
use crate::style::StyleSnapshot;
use crate::token;

/// How many distinct image slots the template places before its first
/// explicit page break. `None` when the template has no page break (a
/// single-layout template that is never truncated).
pub fn slots_before_first_break(document: &DocumentXml) -> Option<usize> {
    let break_index = document.first_page_break_index()?;
    let mut names: BTreeSet<String> = BTreeSet::new();
    for element in &document.body[..break_index] {
        collect_image_slots(element, &mut names);
    }
    Some(names.len())
}

fn collect_image_slots(element: &BodyElement, names: &mut BTreeSet<String>) {
    match element {
        BodyElement::Paragraph(p) => {
            let text = p.text();
            for t in token::find_tokens(&text) {
                if t.name.starts_with("img_") {
                    names.insert(t.name.to_string());
                }
            }
        }
        BodyElement::Table(table) => {
            for row in &table.rows {
                for cell in &row.cells {
                    for inner in &cell.content {
                        collect_image_slots(inner, names);
                    }
                }
            }
        }
        BodyElement::Raw(_) => {}
    }
}

/// Drop the trailing layout when the batch fits the first page.
///
/// `threshold` is the slot count from [`slots_before_first_break`],
/// measured on the untouched template: slot substitution clears the very
/// `{img_k}` tokens the measurement counts, so the caller takes it before
/// filling any slot and hands it in here. Everything from the body element
/// carrying the first page break onward is removed; the body-level section
/// properties are stored outside the element list and always survive,
/// since they define page geometry for the whole document.
pub fn truncate_unused_slots(
    document: &mut DocumentXml,
    used_slot_count: usize,
    threshold: Option<usize>,
) {
    let Some(threshold) = threshold else {
        return;
    };
    if used_slot_count > threshold {
        return;
    }
    if let Some(break_index) = document.first_page_break_index() {
        document.body.truncate(break_index);
    }
}

/// Final cleanup: force every remaining `{name}` token to the empty
/// string. In-run blanking first; a token split across runs falls back to
/// the snapshot-rebuild path, same as text substitution.
pub fn blank_leftover_tokens(document: &mut DocumentXml) {
    document.walk_paragraphs_mut(&mut |paragraph| {
        if !token::contains_token(&paragraph.text()) {
            return Walk::Continue;
        }
        let snapshot = StyleSnapshot::capture(paragraph);

        for run in paragraph.runs_mut() {
            for item in &mut run.content {
                if let RunContent::Text { value, .. } = item {
                    if token::contains_token(value) {
                        *value = token::blank_all_tokens(value);
                    }
                }
            }
        }

        let remaining = paragraph.text();
        if token::contains_token(&remaining) {
            let full = token::blank_all_tokens(&remaining);
            paragraph.clear_content();
            let mut run = Run::text(&full, RunProperties::default());
            snapshot.apply(&mut run);
            paragraph.push_run(run);
        }
        Walk::Continue
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Paragraph;

    fn para(text: &str) -> BodyElement {
        BodyElement::Paragraph(Paragraph::with_text(text))
    }

    fn break_paragraph() -> BodyElement {
        let mut p = Paragraph::default();
        p.push_run(Run::page_break());
        BodyElement::Paragraph(p)
    }

    /// First page holds slots 1-4, then a page break, then slots 5-8.
    fn two_page_template() -> DocumentXml {
        DocumentXml {
            root_tag: "w:document".to_string(),
            body: vec![
                para("{img_1}{info_1}"),
                para("{img_2}{info_2}"),
                para("{img_3}{info_3}"),
                para("{img_4}{info_4}"),
                break_paragraph(),
                para("{img_5}{info_5}"),
                para("{img_6}{info_6}"),
                para("{img_7}{info_7}"),
                para("{img_8}{info_8}"),
            ],
            section: Some("<w:sectPr><w:pgSz w:w=\"11906\"/></w:sectPr>".to_string()),
        }
    }

    #[test]
    fn test_threshold_measured_from_template() {
        assert_eq!(slots_before_first_break(&two_page_template()), Some(4));

        let no_break = DocumentXml {
            root_tag: "w:document".to_string(),
            body: vec![para("{img_1}")],
            section: None,
        };
        assert_eq!(slots_before_first_break(&no_break), None);
    }

    #[test]
    fn test_truncates_at_or_below_threshold() {
        let mut doc = two_page_template();
        let threshold = slots_before_first_break(&doc);
        truncate_unused_slots(&mut doc, 3, threshold);
        assert_eq!(doc.body.len(), 4);
        assert!(!doc.all_text().contains("{img_5}"));
        // Section properties always survive.
        assert!(doc.section.is_some());
    }

    #[test]
    fn test_no_truncation_above_threshold() {
        let mut doc = two_page_template();
        let threshold = slots_before_first_break(&doc);
        truncate_unused_slots(&mut doc, 5, threshold);
        assert_eq!(doc.body.len(), 9);
        assert!(doc.all_text().contains("{img_8}"));
    }

    #[test]
    fn test_no_truncation_without_page_break() {
        let mut doc = DocumentXml {
            root_tag: "w:document".to_string(),
            body: vec![para("{img_1}"), para("{img_2}")],
            section: None,
        };
        let threshold = slots_before_first_break(&doc);
        truncate_unused_slots(&mut doc, 1, threshold);
        assert_eq!(doc.body.len(), 2);
    }

    #[test]
    fn test_threshold_taken_before_slots_cleared_still_truncates() {
        // Slot substitution wipes the {img_k} tokens the measurement
        // counts, so the threshold must come from the untouched template.
        let mut doc = two_page_template();
        let threshold = slots_before_first_break(&doc);
        for element in &mut doc.body {
            if let BodyElement::Paragraph(p) = element {
                if p.text().contains("{img_") {
                    p.clear_content();
                }
            }
        }
        assert_eq!(slots_before_first_break(&doc), Some(0));
        truncate_unused_slots(&mut doc, 3, threshold);
        assert_eq!(doc.first_page_break_index(), None);
        assert_eq!(doc.body.len(), 4);
    }

    #[test]
    fn test_blank_leftover_tokens() {
        let mut doc = DocumentXml {
            root_tag: "w:document".to_string(),
            body: vec![para("before {img_5} mid {info_5} after"), para("clean")],
            section: None,
        };
        blank_leftover_tokens(&mut doc);
        assert_eq!(doc.all_text(), "before  mid  after\nclean\n");
    }

    #[test]
    fn test_blank_split_token_keeps_first_run_style() {
        let mut p = Paragraph::default();
        p.push_run(Run::text(
            "{inf",
            RunProperties {
                italic: Some(true),
                ..Default::default()
            },
        ));
        p.push_run(Run::text("o_7}", RunProperties::default()));
        let mut doc = DocumentXml {
            root_tag: "w:document".to_string(),
            body: vec![BodyElement::Paragraph(p)],
            section: None,
        };
        blank_leftover_tokens(&mut doc);
        let p = match &doc.body[0] {
            BodyElement::Paragraph(p) => p,
            _ => panic!("expected paragraph"),
        };
        assert_eq!(p.text(), "");
        assert_eq!(p.runs().next().unwrap().properties.italic, Some(true));
    }
}
