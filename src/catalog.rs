//! # Checklist Catalog
//!
//! A lookup table from inspection category to its ordered checklist
//! entries, loaded from JSON. Entries prefill the photo descriptions,
//! design standards, and measured-result lines of a report so crews only
//! override what differs on site.
//!
//! ```json
//! {
//!   "拆除工程-施工 (EA26)": [
//!     { "description": "現場既有雜物整理", "result": "已完成" },
//!     { "description": "室裝材分類拆除集中",
//!       "design_standard": "依可回收/不可回收/有價物分類",
//!       "result": "符合" }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// One prefilled checklist line for a photo slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChecklistEntry {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design_standard: Option<String>,
    pub result: String,
}

/// Category name → ordered checklist entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(flatten)]
    categories: BTreeMap<String, Vec<ChecklistEntry>>,
}

impl Catalog {
    /// Parse and validate a catalog from JSON text.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let catalog: Catalog = serde_json::from_str(json)
            .map_err(|e| Error::Catalog(format!("invalid catalog JSON: {}", e)))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load a catalog from a JSON file on disk.
    pub fn from_file(path: &str) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    fn validate(&self) -> Result<(), Error> {
        for (category, entries) in &self.categories {
            for (index, entry) in entries.iter().enumerate() {
                if entry.description.trim().is_empty() {
                    return Err(Error::Catalog(format!(
                        "category '{}' entry {}: empty description",
                        category,
                        index + 1
                    )));
                }
                if entry.result.trim().is_empty() {
                    return Err(Error::Catalog(format!(
                        "category '{}' entry {}: empty result",
                        category,
                        index + 1
                    )));
                }
            }
        }
        Ok(())
    }

    /// Entries for a category, in catalog order.
    pub fn entries(&self, category: &str) -> Option<&[ChecklistEntry]> {
        self.categories.get(category).map(|v| v.as_slice())
    }

    /// All category names, sorted.
    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(|k| k.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_and_lookup() {
        let catalog = Catalog::from_json(
            r#"{
                "拆除工程-施工 (EA26)": [
                    { "description": "現場既有雜物整理", "result": "已完成" },
                    { "description": "室裝材分類拆除集中",
                      "design_standard": "依可回收/不可回收/有價物分類",
                      "result": "符合" }
                ]
            }"#,
        )
        .unwrap();

        let entries = catalog.entries("拆除工程-施工 (EA26)").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].description, "現場既有雜物整理");
        assert_eq!(entries[0].design_standard, None);
        assert_eq!(
            entries[1].design_standard.as_deref(),
            Some("依可回收/不可回收/有價物分類")
        );
        assert!(catalog.entries("missing").is_none());
    }

    #[test]
    fn test_rejects_empty_description() {
        let result = Catalog::from_json(
            r#"{ "c": [ { "description": "  ", "result": "ok" } ] }"#,
        );
        assert!(matches!(result, Err(Error::Catalog(_))));
    }

    #[test]
    fn test_rejects_empty_result() {
        let result = Catalog::from_json(
            r#"{ "c": [ { "description": "d", "result": "" } ] }"#,
        );
        assert!(matches!(result, Err(Error::Catalog(_))));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            Catalog::from_json("not json"),
            Err(Error::Catalog(_))
        ));
    }

    #[test]
    fn test_category_names_sorted() {
        let catalog = Catalog::from_json(
            r#"{
                "b": [ { "description": "d", "result": "r" } ],
                "a": [ { "description": "d", "result": "r" } ]
            }"#,
        )
        .unwrap();
        let names: Vec<&str> = catalog.category_names().collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
