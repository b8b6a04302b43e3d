//! # Placeholder Substitution
//!
//! The two substitution passes of the engine. Text substitution walks every
//! paragraph (table cells first, then top level) and replaces `{key}`
//! tokens with caller values. The preferred path replaces inside a single
//! existing run, which cannot disturb formatting; only when a token's
//! characters are split across runs is the paragraph rebuilt as one run
//! carrying a [`StyleSnapshot`] of its original first run.
//!
//! Image substitution clears the first paragraph holding a slot token and
//! anchors a fixed-width inline picture there; the paragraph's alignment
//! survives because paragraph properties are never part of a content clear.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::image_loader::PreparedImage;
use crate::model::{DocumentXml, Run, RunContent, RunProperties, Walk, EMU_PER_CM};
use crate::package::DocxPackage;
use crate::style::StyleSnapshot;
use crate::token;

/// Full-width space used for the visual gap inside photo captions.
pub const WIDE_SPACE: char = '\u{3000}';

/// The context map: placeholder name → stringified substitution value.
/// Values arrive as strings, numbers, or date strings; a JSON null becomes
/// the empty string.
#[derive(Debug, Clone, Default)]
pub struct Replacements {
    entries: BTreeMap<String, String>,
}

impl Replacements {
    pub fn new() -> Self {
        Replacements::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Insert a JSON value, stringified the way the context map defines:
    /// strings as-is, numbers via display, null as empty.
    pub fn insert_value(&mut self, key: impl Into<String>, value: &Value) {
        self.entries.insert(key.into(), stringify_value(value));
    }

    /// Build from a JSON object (the job file's `context`).
    pub fn from_json_map(map: &serde_json::Map<String, Value>) -> Self {
        let mut replacements = Replacements::new();
        for (key, value) in map {
            replacements.insert_value(key.clone(), value);
        }
        replacements
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Does `text` contain any of this map's keys as a token?
    fn matches(&self, text: &str) -> bool {
        token::contains_any(text, self.entries.keys().map(|k| k.as_str()))
    }
}

fn stringify_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ─── Text substitution ──────────────────────────────────────────────

/// Replace every `{key}` occurrence from `replacements` across the whole
/// document. Unmatched tokens pass through; an empty map is a no-op.
pub fn substitute_text(document: &mut DocumentXml, replacements: &Replacements) {
    if replacements.is_empty() {
        return;
    }
    document.walk_paragraphs_mut(&mut |paragraph| {
        if replacements.matches(&paragraph.text()) {
            substitute_in_paragraph(paragraph, replacements);
        }
        Walk::Continue
    });
}

fn substitute_in_paragraph(paragraph: &mut crate::model::Paragraph, replacements: &Replacements) {
    // Snapshot before any rewrite, in case the rebuild path is needed.
    let snapshot = StyleSnapshot::capture(paragraph);

    // Preferred path: whole tokens inside a single run. Formatting of
    // every run is untouched.
    for run in paragraph.runs_mut() {
        for (key, value) in replacements.iter() {
            run.replace_text(&token::wrap(key), value);
        }
    }

    // A token split across run boundaries survives the in-run pass.
    let remaining = paragraph.text();
    if !replacements.matches(&remaining) {
        return;
    }
    let mut full = remaining;
    for (key, value) in replacements.iter() {
        full = full.replace(&token::wrap(key), value);
    }
    paragraph.clear_content();
    let mut run = Run::text(&full, RunProperties::default());
    snapshot.apply(&mut run);
    paragraph.push_run(run);
}

// ─── Image substitution ─────────────────────────────────────────────

/// What goes into an image slot.
pub enum SlotContent<'a> {
    /// A prepared photo, scaled to `width_cm`.
    Image(&'a PreparedImage),
    /// A visible error marker for a photo that failed to decode.
    Marker(String),
    /// No photo supplied: the slot is cleared and left for truncation.
    Blank,
}

/// Fill the first paragraph containing `slot_token`. Returns false when the
/// template has no such slot (silent no-op). Only the first occurrence is
/// filled; a slot token appears at most once per template.
pub fn substitute_image(
    package: &mut DocxPackage,
    slot_token: &str,
    content: SlotContent<'_>,
    width_cm: f64,
) -> bool {
    // Locate first so a missing slot never leaves an orphan media part.
    let mut found = false;
    package.document.walk_paragraphs(&mut |p| {
        if p.text().contains(slot_token) {
            found = true;
            Walk::Stop
        } else {
            Walk::Continue
        }
    });
    if !found {
        return false;
    }

    let replacement_run = match content {
        SlotContent::Image(image) => {
            let rel_id = package.add_image(image.bytes.clone(), image.extension());
            let cx_emu = (width_cm * EMU_PER_CM as f64).round() as u64;
            let cy_emu = (cx_emu as f64 * image.height_px as f64 / image.width_px as f64).round() as u64;
            Some(Run {
                properties: RunProperties::default(),
                content: vec![RunContent::Drawing {
                    rel_id,
                    cx_emu,
                    cy_emu,
                    name: slot_token
                        .trim_start_matches('{')
                        .trim_end_matches('}')
                        .to_string(),
                }],
            })
        }
        SlotContent::Marker(message) => Some(Run::text(&message, RunProperties::default())),
        SlotContent::Blank => None,
    };

    package.document.walk_paragraphs_mut(&mut |paragraph| {
        if !paragraph.text().contains(slot_token) {
            return Walk::Continue;
        }
        // Content-only clear: runs go, w:pPr (alignment included) stays.
        paragraph.clear_content();
        if let Some(run) = replacement_run.clone() {
            paragraph.push_run(run);
        }
        Walk::Stop
    });
    true
}

// ─── Caption composition ────────────────────────────────────────────

/// Compose the fixed caption block for a filled slot:
/// `照片編號：NN　…　日期：date` / `說明：…` / optional `設計：…` / `實測：…`.
/// The design line is emitted only when non-empty.
pub fn compose_caption(
    sequence: u32,
    date: &str,
    description: &str,
    design_standard: Option<&str>,
    result: &str,
    spacer_width: usize,
) -> String {
    let spacer: String = std::iter::repeat(WIDE_SPACE).take(spacer_width).collect();
    let mut caption = format!(
        "照片編號：{:02}{}日期：{}\n說明：{}",
        sequence, spacer, date, description
    );
    if let Some(design) = design_standard {
        if !design.trim().is_empty() {
            caption.push_str("\n設計：");
            caption.push_str(design);
        }
    }
    caption.push_str("\n實測：");
    caption.push_str(result);
    caption
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BodyElement, Paragraph, ParagraphChild};
    use serde_json::json;

    fn doc_with_paragraph(p: Paragraph) -> DocumentXml {
        DocumentXml {
            root_tag: "w:document".to_string(),
            body: vec![BodyElement::Paragraph(p)],
            section: None,
        }
    }

    fn first_paragraph(doc: &DocumentXml) -> &Paragraph {
        match &doc.body[0] {
            BodyElement::Paragraph(p) => p,
            _ => panic!("expected paragraph"),
        }
    }

    #[test]
    fn test_in_run_replacement_keeps_other_runs() {
        let mut p = Paragraph::default();
        p.push_run(Run::text(
            "bold head ",
            RunProperties {
                bold: Some(true),
                ..Default::default()
            },
        ));
        p.push_run(Run::text("{name}", RunProperties::default()));
        let mut doc = doc_with_paragraph(p);

        let mut replacements = Replacements::new();
        replacements.insert("name", "value");
        substitute_text(&mut doc, &replacements);

        let p = first_paragraph(&doc);
        assert_eq!(p.text(), "bold head value");
        // Two runs survive; the bold run was never touched.
        let runs: Vec<_> = p.runs().collect();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].properties.bold, Some(true));
    }

    #[test]
    fn test_split_token_rebuilds_with_first_run_style() {
        let mut p = Paragraph::default();
        p.push_run(Run::text(
            "{na",
            RunProperties {
                bold: Some(true),
                size_half_points: Some(28),
                ..Default::default()
            },
        ));
        p.push_run(Run::text(
            "me} tail",
            RunProperties {
                size_half_points: Some(24),
                ..Default::default()
            },
        ));
        let mut doc = doc_with_paragraph(p);

        let mut replacements = Replacements::new();
        replacements.insert("name", "value");
        substitute_text(&mut doc, &replacements);

        let p = first_paragraph(&doc);
        assert_eq!(p.text(), "value tail");
        let runs: Vec<_> = p.runs().collect();
        assert_eq!(runs.len(), 1);
        // Formatting equals the snapshot of the FIRST run before mutation.
        assert_eq!(runs[0].properties.bold, Some(true));
        assert_eq!(runs[0].properties.size_half_points, Some(28));
    }

    #[test]
    fn test_multiple_occurrences_in_one_paragraph() {
        let mut doc = doc_with_paragraph(Paragraph::with_text("{x} then {x} again"));
        let mut replacements = Replacements::new();
        replacements.insert("x", "y");
        substitute_text(&mut doc, &replacements);
        assert_eq!(first_paragraph(&doc).text(), "y then y again");
    }

    #[test]
    fn test_null_value_substitutes_empty() {
        let mut doc = doc_with_paragraph(Paragraph::with_text("a{gone}b"));
        let mut replacements = Replacements::new();
        replacements.insert_value("gone", &json!(null));
        substitute_text(&mut doc, &replacements);
        assert_eq!(first_paragraph(&doc).text(), "ab");
    }

    #[test]
    fn test_number_value_stringified() {
        let mut doc = doc_with_paragraph(Paragraph::with_text("count: {n}"));
        let mut replacements = Replacements::new();
        replacements.insert_value("n", &json!(42));
        substitute_text(&mut doc, &replacements);
        assert_eq!(first_paragraph(&doc).text(), "count: 42");
    }

    #[test]
    fn test_empty_replacements_change_nothing() {
        let mut p = Paragraph::with_text("{keep} text");
        p.properties = Some("<w:pPr><w:jc w:val=\"center\"/></w:pPr>".to_string());
        let mut doc = doc_with_paragraph(p);
        let before = format!("{:?}", doc);
        substitute_text(&mut doc, &Replacements::new());
        assert_eq!(format!("{:?}", doc), before);
    }

    #[test]
    fn test_unmatched_tokens_pass_through() {
        let mut doc = doc_with_paragraph(Paragraph::with_text("{unknown} stays"));
        let mut replacements = Replacements::new();
        replacements.insert("other", "x");
        substitute_text(&mut doc, &replacements);
        assert_eq!(first_paragraph(&doc).text(), "{unknown} stays");
    }

    #[test]
    fn test_rebuild_preserves_paragraph_properties() {
        let mut p = Paragraph::default();
        p.properties = Some("<w:pPr><w:jc w:val=\"center\"/></w:pPr>".to_string());
        p.push_run(Run::text("{sp", RunProperties::default()));
        p.push_run(Run::text("lit}", RunProperties::default()));
        let mut doc = doc_with_paragraph(p);

        let mut replacements = Replacements::new();
        replacements.insert("split", "joined");
        substitute_text(&mut doc, &replacements);

        let p = first_paragraph(&doc);
        assert_eq!(p.text(), "joined");
        assert!(p.properties.as_deref().unwrap().contains("center"));
    }

    #[test]
    fn test_raw_children_removed_only_on_rebuild() {
        // In-run path: raw children (bookmarks) survive.
        let mut p = Paragraph::default();
        p.children.push(ParagraphChild::Raw(
            "<w:bookmarkStart w:id=\"0\" w:name=\"b\"/>".to_string(),
        ));
        p.push_run(Run::text("{k}", RunProperties::default()));
        let mut doc = doc_with_paragraph(p);
        let mut replacements = Replacements::new();
        replacements.insert("k", "v");
        substitute_text(&mut doc, &replacements);
        let p = first_paragraph(&doc);
        assert_eq!(p.children.len(), 2);
        assert_eq!(p.text(), "v");
    }

    #[test]
    fn test_compose_caption_full() {
        let caption = compose_caption(1, "115.02.03", "A", Some("D90"), "R1", 4);
        assert_eq!(
            caption,
            "照片編號：01\u{3000}\u{3000}\u{3000}\u{3000}日期：115.02.03\n說明：A\n設計：D90\n實測：R1"
        );
    }

    #[test]
    fn test_compose_caption_without_design_line() {
        let caption = compose_caption(12, "114.12.31", "desc", None, "ok", 2);
        assert_eq!(
            caption,
            "照片編號：12\u{3000}\u{3000}日期：114.12.31\n說明：desc\n實測：ok"
        );
        let empty_design = compose_caption(12, "114.12.31", "desc", Some("  "), "ok", 2);
        assert_eq!(empty_design, caption);
    }
}
