//! # Sitedoc
//!
//! A template-driven DOCX engine for site-inspection photo reports.
//!
//! Most report generators build the document from scratch in code, which
//! means every layout tweak is a code change. Sitedoc does the opposite:
//! **the template is the layout.** Site engineers keep authoring the
//! inspection form in Word; the engine only performs surgical edits —
//! replacing `{key}` placeholders while preserving run formatting,
//! anchoring photos at `{img_k}` slots, and cutting the trailing page when
//! a batch doesn't fill it. Everything the engine does not understand in
//! the template passes through byte-faithfully.
//!
//! ## Architecture
//!
//! ```text
//! Input (job JSON/API)
//!       ↓
//!   [package]     — .docx zip: parts, relationships, media
//!       ↓
//!   [model]       — typed WordprocessingML tree + raw passthrough
//!       ↓
//!   [substitute]  — text/image placeholder substitution, captions
//!       ↓
//!   [truncate]    — unused-slot truncation, leftover-token cleanup
//!       ↓
//!   [compose]     — optional multi-report concatenation
//! ```

pub mod catalog;
pub mod compose;
pub mod error;
pub mod image_loader;
pub mod model;
pub mod naming;
pub mod package;
pub mod report;
pub mod style;
pub mod substitute;
pub mod token;
pub mod truncate;

pub use catalog::{Catalog, ChecklistEntry};
pub use error::Error;
pub use report::{GeneratedDocument, PhotoRecord, ReportConfig};
pub use substitute::Replacements;

/// Generate one report document and return the `.docx` bytes.
///
/// This is the primary entry point. Takes the template bytes, the
/// context map, and the batch of photo records.
pub fn generate(
    template: &[u8],
    context: &Replacements,
    photos: &[PhotoRecord],
    config: &ReportConfig,
) -> Result<Vec<u8>, Error> {
    report::generate_report(template, context, photos, config)
}

/// Generate one report, keeping the package open for [`compose_reports`].
pub fn generate_document(
    template: &[u8],
    context: &Replacements,
    photos: &[PhotoRecord],
    config: &ReportConfig,
) -> Result<GeneratedDocument, Error> {
    report::generate_document(template, context, photos, config)
}

/// Concatenate generated reports into one continuous document. Each
/// report after the first starts on its own page.
pub fn compose_reports(documents: Vec<GeneratedDocument>) -> Result<GeneratedDocument, Error> {
    let packages = documents
        .into_iter()
        .map(GeneratedDocument::into_package)
        .collect();
    compose::compose(packages).map(GeneratedDocument::from_package)
}
