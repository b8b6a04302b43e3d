//! Structured error types for the sitedoc engine.
//!
//! The variants cover the real failure sources: an unreadable template
//! package, XML that doesn't parse, bad image bytes, bad job/catalog input,
//! and composition of nothing. Per-slot image failures are deliberately NOT
//! here — they are recovered in place with a visible marker (see
//! `report.rs`) and never abort a batch.

use thiserror::Error;

/// The unified error type returned by all public sitedoc API functions.
#[derive(Error, Debug)]
pub enum Error {
    /// The template bytes are not a readable .docx package
    /// (bad zip archive, missing document part, invalid encoding).
    #[error("invalid template: {0}")]
    Template(String),

    /// word/document.xml (or a rels part) failed to parse.
    #[error("document XML error: {0}")]
    Xml(String),

    /// File or in-memory archive I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image bytes could not be decoded or re-encoded.
    #[error("image error: {0}")]
    Image(String),

    /// The photo batch doesn't fit the generation parameters (e.g. more
    /// records than the template has slots).
    #[error("invalid batch: {0}")]
    Batch(String),

    /// Composition was asked to merge an empty document list, or a source
    /// document could not be carried into the combined output.
    #[error("compose error: {0}")]
    Compose(String),

    /// A catalog row is missing a required field.
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Job JSON failed to parse against the expected schema.
    #[error("failed to parse job: {source}{hint}")]
    Job {
        source: serde_json::Error,
        hint: String,
    },
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        match e {
            zip::result::ZipError::Io(io_err) => Error::Io(io_err),
            other => Error::Template(other.to_string()),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::Xml(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "\n  Hint: check for trailing commas, missing quotes, or unescaped characters."
            }
            serde_json::error::Category::Data => {
                "\n  Hint: the JSON is valid but doesn't match the job schema. Check field names and types."
            }
            serde_json::error::Category::Eof => "\n  Hint: unexpected end of input — is the JSON truncated?",
            serde_json::error::Category::Io => "",
        };
        Error::Job {
            source: e,
            hint: hint.to_string(),
        }
    }
}
