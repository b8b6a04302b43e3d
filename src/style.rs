//! # Style Snapshot
//!
//! When a placeholder is split across formatting runs, the only way to
//! substitute it is to rebuild the paragraph's content as a single run —
//! which would lose the original formatting. The snapshot captures the
//! formatting of the paragraph's first run before the rewrite and reapplies
//! it to the replacement run afterwards.
//!
//! An attribute the source run did not set stays unset in the snapshot, and
//! applying the snapshot never clears an attribute the destination run
//! defines itself. A snapshot lives for exactly one substitution: capture,
//! rewrite, apply, discard.

use crate::model::{Paragraph, Run, RunProperties};

/// Captured run-level formatting: typeface, east-Asian typeface override,
/// size, bold, italic, underline, color. `None` everywhere means "nothing
/// to reapply".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleSnapshot {
    pub font: Option<String>,
    pub east_asia_font: Option<String>,
    pub size_half_points: Option<u32>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<String>,
    pub color: Option<String>,
}

impl StyleSnapshot {
    /// Capture from the paragraph's first run. A paragraph with no runs
    /// yields the empty snapshot.
    pub fn capture(paragraph: &Paragraph) -> Self {
        match paragraph.first_run() {
            Some(run) => Self::from_properties(&run.properties),
            None => StyleSnapshot::default(),
        }
    }

    fn from_properties(props: &RunProperties) -> Self {
        StyleSnapshot {
            font: props.font.clone(),
            east_asia_font: props.east_asia_font.clone(),
            size_half_points: props.size_half_points,
            bold: props.bold,
            italic: props.italic,
            underline: props.underline.clone(),
            color: props.color.clone(),
        }
    }

    /// Assign every captured attribute onto the run; unset attributes are
    /// left untouched. Applying an empty snapshot is a no-op.
    pub fn apply(&self, run: &mut Run) {
        if let Some(font) = &self.font {
            run.properties.font = Some(font.clone());
        }
        if let Some(ea) = &self.east_asia_font {
            run.properties.east_asia_font = Some(ea.clone());
        }
        if let Some(size) = self.size_half_points {
            run.properties.size_half_points = Some(size);
        }
        if let Some(bold) = self.bold {
            run.properties.bold = Some(bold);
        }
        if let Some(italic) = self.italic {
            run.properties.italic = Some(italic);
        }
        if let Some(underline) = &self.underline {
            run.properties.underline = Some(underline.clone());
        }
        if let Some(color) = &self.color {
            run.properties.color = Some(color.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == StyleSnapshot::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RunProperties;

    fn styled_paragraph() -> Paragraph {
        let mut p = Paragraph::default();
        p.push_run(Run::text(
            "first",
            RunProperties {
                font: Some("標楷體".to_string()),
                east_asia_font: Some("標楷體".to_string()),
                size_half_points: Some(28),
                bold: Some(true),
                ..Default::default()
            },
        ));
        p.push_run(Run::text("second", RunProperties::default()));
        p
    }

    #[test]
    fn test_capture_uses_first_run() {
        let snapshot = StyleSnapshot::capture(&styled_paragraph());
        assert_eq!(snapshot.font.as_deref(), Some("標楷體"));
        assert_eq!(snapshot.size_half_points, Some(28));
        assert_eq!(snapshot.bold, Some(true));
        assert_eq!(snapshot.italic, None);
        assert_eq!(snapshot.underline, None);
    }

    #[test]
    fn test_capture_empty_paragraph_is_empty() {
        let snapshot = StyleSnapshot::capture(&Paragraph::default());
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_apply_sets_only_captured_attributes() {
        let snapshot = StyleSnapshot::capture(&styled_paragraph());
        let mut run = Run::text(
            "replacement",
            RunProperties {
                italic: Some(true),
                color: Some("00FF00".to_string()),
                ..Default::default()
            },
        );
        snapshot.apply(&mut run);
        // Captured attributes land.
        assert_eq!(run.properties.font.as_deref(), Some("標楷體"));
        assert_eq!(run.properties.bold, Some(true));
        // Unset attributes never clobber what the run already defines.
        assert_eq!(run.properties.italic, Some(true));
        assert_eq!(run.properties.color.as_deref(), Some("00FF00"));
    }

    #[test]
    fn test_apply_empty_snapshot_is_noop() {
        let mut run = Run::text(
            "x",
            RunProperties {
                bold: Some(true),
                ..Default::default()
            },
        );
        let before = run.properties.clone();
        StyleSnapshot::default().apply(&mut run);
        assert_eq!(run.properties, before);
    }
}
