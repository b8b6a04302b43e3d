//! # ROC Dates and Report Naming
//!
//! Inspection reports are dated in the Republic of China calendar
//! (Gregorian year minus 1911) and named from the selected checklist
//! category: `拆除工程-施工 (EA26)` becomes the display title
//! `拆除工程施工自主檢查(EA26)` and the file name
//! `1150203拆除工程施工自主檢查.docx` for an inspection on 2026-02-03.

use chrono::{Datelike, NaiveDate};

/// Display form, e.g. `115.02.03`.
pub fn roc_date(date: NaiveDate) -> String {
    format!(
        "{}.{:02}.{:02}",
        date.year() - 1911,
        date.month(),
        date.day()
    )
}

/// Filename prefix form, e.g. `1150203`.
pub fn roc_compact(date: NaiveDate) -> String {
    format!(
        "{}{:02}{:02}",
        date.year() - 1911,
        date.month(),
        date.day()
    )
}

/// Derive `(display_title, filename_base)` from a checklist category and
/// the inspection date.
///
/// The trailing parenthetical classification code is set aside, the
/// category marker is rewritten to the full inspection-form title, and
/// the code is reattached after the suffix. The filename base drops the
/// code and anything hostile to a filesystem.
pub fn derive_names(category: &str, date: NaiveDate) -> (String, String) {
    let (base, parenthetical) = split_parenthetical(category.trim());

    let title_core = if let Some(stripped) = remove_marker(&base, "-施工") {
        format!("{}施工自主檢查", stripped)
    } else if let Some(stripped) = remove_marker(&base, "-材料") {
        format!("{}材料進場自主檢查", stripped)
    } else {
        base
    };

    let display_title = match &parenthetical {
        Some(code) => format!("{}{}", title_core, code),
        None => title_core.clone(),
    };
    let filename_base = format!("{}{}", roc_compact(date), sanitize_filename(&title_core));
    (display_title, filename_base)
}

/// Split a trailing `(...)` or `（...）` code off the label. The code is
/// returned in normalized ASCII parentheses.
fn split_parenthetical(label: &str) -> (String, Option<String>) {
    for (open, close) in [('(', ')'), ('（', '）')] {
        if let Some(start) = label.rfind(open) {
            let rest = &label[start..];
            if rest.ends_with(close) {
                let inner = rest
                    .trim_start_matches(open)
                    .trim_end_matches(close)
                    .trim();
                return (label[..start].trim().to_string(), Some(format!("({})", inner)));
            }
        }
    }
    (label.to_string(), None)
}

fn remove_marker(label: &str, marker: &str) -> Option<String> {
    if label.contains(marker) {
        Some(label.replacen(marker, "", 1))
    } else {
        None
    }
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_roc_date_formats() {
        assert_eq!(roc_date(date(2026, 2, 3)), "115.02.03");
        assert_eq!(roc_compact(date(2026, 2, 3)), "1150203");
        assert_eq!(roc_date(date(2025, 12, 31)), "114.12.31");
    }

    #[test]
    fn test_derive_names_construction_category() {
        let (title, filename) = derive_names("拆除工程-施工 (EA26)", date(2026, 2, 3));
        assert_eq!(title, "拆除工程施工自主檢查(EA26)");
        assert!(filename.starts_with("1150203"));
        assert_eq!(filename, "1150203拆除工程施工自主檢查");
        assert!(!title.contains("-施工"));
    }

    #[test]
    fn test_derive_names_material_category() {
        let (title, filename) = derive_names("鋼筋工程-材料 (RB01)", date(2026, 2, 3));
        assert_eq!(title, "鋼筋工程材料進場自主檢查(RB01)");
        assert_eq!(filename, "1150203鋼筋工程材料進場自主檢查");
    }

    #[test]
    fn test_derive_names_without_parenthetical() {
        let (title, filename) = derive_names("泥作工程-施工", date(2026, 2, 3));
        assert_eq!(title, "泥作工程施工自主檢查");
        assert_eq!(filename, "1150203泥作工程施工自主檢查");
    }

    #[test]
    fn test_derive_names_unmatched_marker_passes_through() {
        let (title, _) = derive_names("其他檢查 (X1)", date(2026, 2, 3));
        assert_eq!(title, "其他檢查(X1)");
    }

    #[test]
    fn test_full_width_parenthetical() {
        let (title, _) = derive_names("拆除工程-施工（EA26）", date(2026, 2, 3));
        assert_eq!(title, "拆除工程施工自主檢查(EA26)");
    }

    #[test]
    fn test_filename_sanitized() {
        let (_, filename) = derive_names("A/B:C-施工", date(2026, 2, 3));
        assert_eq!(filename, "1150203A_B_C施工自主檢查");
    }
}
