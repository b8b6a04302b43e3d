//! # Report Generation
//!
//! Orchestrates one batch — a context map plus up to `capacity` photo
//! records — into one generated document: open the template package,
//! substitute the context text, fill each photo slot and its caption,
//! truncate the unused trailing layout, blank whatever tokens remain,
//! and hand back the package (or its serialized bytes).
//!
//! A photo that fails to decode is recovered per slot: the slot shows a
//! visible error marker and generation continues, so one corrupt upload
//! never costs the whole report.

use crate::error::Error;
use crate::image_loader;
use crate::package::DocxPackage;
use crate::substitute::{self, Replacements, SlotContent};
use crate::token;
use crate::truncate;

/// One photo entry of a batch. The image is optional: a checklist line
/// can be recorded without a photo, in which case its slot stays blank.
#[derive(Debug, Clone)]
pub struct PhotoRecord {
    pub image: Option<Vec<u8>>,
    pub sequence: u32,
    pub description: String,
    pub design_standard: Option<String>,
    pub result: String,
    /// Display date, already in ROC form (e.g. `115.02.03`).
    pub date: String,
}

/// Knobs of the generation pass. Defaults match the report templates in
/// circulation: 8 photo slots, 8.0 cm photo width, a 4-character
/// full-width gap inside captions.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub capacity: u32,
    pub image_width_cm: f64,
    pub spacer_width: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            capacity: 8,
            image_width_cm: 8.0,
            spacer_width: 4,
        }
    }
}

/// A fully generated document, kept unserialized so it can still be
/// composed with others.
#[derive(Debug)]
pub struct GeneratedDocument {
    pub(crate) package: DocxPackage,
}

impl GeneratedDocument {
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        self.package.save()
    }

    pub fn into_package(self) -> DocxPackage {
        self.package
    }

    pub fn from_package(package: DocxPackage) -> Self {
        GeneratedDocument { package }
    }
}

/// Generate one report and serialize it.
pub fn generate_report(
    template: &[u8],
    context: &Replacements,
    photos: &[PhotoRecord],
    config: &ReportConfig,
) -> Result<Vec<u8>, Error> {
    generate_document(template, context, photos, config)?.to_bytes()
}

/// Generate one report, returning the open package for composition.
pub fn generate_document(
    template: &[u8],
    context: &Replacements,
    photos: &[PhotoRecord],
    config: &ReportConfig,
) -> Result<GeneratedDocument, Error> {
    if photos.len() > config.capacity as usize {
        return Err(Error::Batch(format!(
            "{} photos exceed the template capacity of {}",
            photos.len(),
            config.capacity
        )));
    }

    let mut package = DocxPackage::open(template)?;
    // The single-page threshold counts {img_k} tokens, which the slot loop
    // below clears; measure it while the template is still untouched.
    let threshold = truncate::slots_before_first_break(&package.document);
    substitute::substitute_text(&mut package.document, context);

    let mut captions = Replacements::new();
    for k in 1..=config.capacity {
        let slot = token::image_slot(k);
        match photos.get(k as usize - 1) {
            Some(record) => {
                fill_photo_slot(&mut package, &slot, record, config);
                captions.insert(
                    caption_key(k),
                    substitute::compose_caption(
                        record.sequence,
                        &record.date,
                        &record.description,
                        record.design_standard.as_deref(),
                        &record.result,
                        config.spacer_width,
                    ),
                );
            }
            None => {
                substitute::substitute_image(&mut package, &slot, SlotContent::Blank, 0.0);
                captions.insert(caption_key(k), "");
            }
        }
    }
    substitute::substitute_text(&mut package.document, &captions);

    truncate::truncate_unused_slots(&mut package.document, photos.len(), threshold);
    truncate::blank_leftover_tokens(&mut package.document);

    Ok(GeneratedDocument { package })
}

fn caption_key(k: u32) -> String {
    format!("info_{}", k)
}

fn fill_photo_slot(
    package: &mut DocxPackage,
    slot: &str,
    record: &PhotoRecord,
    config: &ReportConfig,
) {
    match &record.image {
        Some(bytes) => match image_loader::prepare_image(bytes) {
            Ok(prepared) => {
                substitute::substitute_image(
                    package,
                    slot,
                    SlotContent::Image(&prepared),
                    config.image_width_cm,
                );
            }
            Err(e) => {
                substitute::substitute_image(
                    package,
                    slot,
                    SlotContent::Marker(format!("[圖片讀取失敗: {}]", e)),
                    config.image_width_cm,
                );
            }
        },
        None => {
            substitute::substitute_image(package, slot, SlotContent::Blank, config.image_width_cm);
        }
    }
}
