//! # DOCX Package
//!
//! A `.docx` file is a zip archive: `word/document.xml` plus styles,
//! relationships, content types, and media. The package layer unpacks the
//! archive, hands `word/document.xml` to the model parser, and carries every
//! other part through untouched so the output keeps the template's styles,
//! numbering, headers, and theme exactly as authored.
//!
//! Inserted photos become new `word/media/imageN` parts plus a relationship
//! entry; `[Content_Types].xml` is patched so the image extensions are
//! declared.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::Error;
use crate::model::parse::parse_document;
use crate::model::write::write_document;
use crate::model::DocumentXml;

const DOCUMENT_PART: &str = "word/document.xml";
const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";
const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const IMAGE_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

/// One entry of `word/_rels/document.xml.rels`.
#[derive(Debug, Clone)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
}

impl Relationship {
    pub fn is_image(&self) -> bool {
        self.rel_type == IMAGE_REL_TYPE
    }
}

/// An opened `.docx` with its document body parsed into the model and all
/// other parts held as raw bytes.
#[derive(Debug, Clone)]
pub struct DocxPackage {
    pub document: DocumentXml,
    pub(crate) rels: Vec<Relationship>,
    pub(crate) parts: BTreeMap<String, Vec<u8>>,
    content_types: String,
}

impl DocxPackage {
    /// Unpack template bytes. A bad archive or a missing/unparseable
    /// document part is fatal for the generation call.
    pub fn open(bytes: &[u8]) -> Result<Self, Error> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| Error::Template(format!("not a docx archive: {}", e)))?;

        let mut parts: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let mut data = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut data)?;
            parts.insert(entry.name().to_string(), data);
        }

        let document_xml = parts
            .remove(DOCUMENT_PART)
            .ok_or_else(|| Error::Template("archive has no word/document.xml".to_string()))?;
        let document_xml = String::from_utf8(document_xml)
            .map_err(|e| Error::Template(format!("document.xml is not UTF-8: {}", e)))?;
        let document = parse_document(&document_xml)?;

        let rels = match parts.remove(DOCUMENT_RELS_PART) {
            Some(data) => parse_relationships(&data)?,
            None => Vec::new(),
        };

        let content_types = match parts.remove(CONTENT_TYPES_PART) {
            Some(data) => String::from_utf8(data)
                .map_err(|e| Error::Template(format!("[Content_Types].xml is not UTF-8: {}", e)))?,
            None => DEFAULT_CONTENT_TYPES.to_string(),
        };

        Ok(DocxPackage {
            document,
            rels,
            parts,
            content_types,
        })
    }

    /// Serialize the package back to `.docx` bytes.
    pub fn save(&self) -> Result<Vec<u8>, Error> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        writer.start_file(CONTENT_TYPES_PART, options)?;
        writer.write_all(self.patched_content_types().as_bytes())?;

        writer.start_file(DOCUMENT_PART, options)?;
        writer.write_all(write_document(&self.document).as_bytes())?;

        writer.start_file(DOCUMENT_RELS_PART, options)?;
        writer.write_all(write_relationships(&self.rels).as_bytes())?;

        for (name, data) in &self.parts {
            writer.start_file(name.as_str(), options)?;
            writer.write_all(data)?;
        }

        Ok(writer.finish()?.into_inner())
    }

    /// Store image bytes as a new media part and return the relationship id
    /// to embed in a drawing.
    pub fn add_image(&mut self, bytes: Vec<u8>, extension: &str) -> String {
        let image_number = self.next_media_number();
        let target = format!("media/image{}.{}", image_number, extension);
        self.parts
            .insert(format!("word/{}", target), bytes);

        let rel_id = format!("rId{}", self.next_rel_number());
        self.rels.push(Relationship {
            id: rel_id.clone(),
            rel_type: IMAGE_REL_TYPE.to_string(),
            target,
        });
        rel_id
    }

    /// The media parts referenced by image relationships, with their bytes.
    pub(crate) fn image_rels(&self) -> Vec<(&Relationship, Option<&[u8]>)> {
        self.rels
            .iter()
            .filter(|r| r.is_image())
            .map(|r| {
                let part = self.parts.get(&format!("word/{}", r.target));
                (r, part.map(|p| p.as_slice()))
            })
            .collect()
    }

    fn next_media_number(&self) -> u32 {
        let mut max = 0;
        for name in self.parts.keys() {
            if let Some(rest) = name.strip_prefix("word/media/image") {
                let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
                if let Ok(n) = digits.parse::<u32>() {
                    max = max.max(n);
                }
            }
        }
        max + 1
    }

    fn next_rel_number(&self) -> u32 {
        let mut max = 0;
        for rel in &self.rels {
            if let Some(rest) = rel.id.strip_prefix("rId") {
                if let Ok(n) = rest.parse::<u32>() {
                    max = max.max(n);
                }
            }
        }
        max + 1
    }

    /// Ensure image extensions used by media parts are declared.
    fn patched_content_types(&self) -> String {
        let mut defaults = String::new();
        for (extension, mime) in [("png", "image/png"), ("jpeg", "image/jpeg"), ("jpg", "image/jpeg")]
        {
            let has_media = self
                .parts
                .keys()
                .any(|name| name.starts_with("word/media/") && name.ends_with(&format!(".{}", extension)));
            let declared = self
                .content_types
                .contains(&format!("Extension=\"{}\"", extension));
            if has_media && !declared {
                defaults.push_str(&format!(
                    "<Default Extension=\"{}\" ContentType=\"{}\"/>",
                    extension, mime
                ));
            }
        }
        if defaults.is_empty() {
            return self.content_types.clone();
        }
        match self.content_types.find("</Types>") {
            Some(pos) => {
                let mut patched = self.content_types.clone();
                patched.insert_str(pos, &defaults);
                patched
            }
            None => self.content_types.clone(),
        }
    }
}

const DEFAULT_CONTENT_TYPES: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
<Default Extension=\"xml\" ContentType=\"application/xml\"/>\
<Override PartName=\"/word/document.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/>\
</Types>";

fn parse_relationships(data: &[u8]) -> Result<Vec<Relationship>, Error> {
    let text = std::str::from_utf8(data)
        .map_err(|e| Error::Template(format!("relationships part is not UTF-8: {}", e)))?;
    let mut reader = Reader::from_str(text);
    let mut rels = Vec::new();
    loop {
        let event = reader.read_event().map_err(|e| Error::Xml(e.to_string()))?;
        let e = match &event {
            Event::Start(e) | Event::Empty(e) => e,
            Event::Eof => return Ok(rels),
            _ => continue,
        };
        if e.local_name().as_ref() != b"Relationship" {
            continue;
        }
        let mut id = None;
        let mut rel_type = None;
        let mut target = None;
        for attr in e.attributes() {
            let attr = attr.map_err(|e| Error::Xml(e.to_string()))?;
            let value = String::from_utf8_lossy(&attr.value).into_owned();
            match attr.key.as_ref() {
                b"Id" => id = Some(value),
                b"Type" => rel_type = Some(value),
                b"Target" => target = Some(value),
                _ => {}
            }
        }
        match (id, rel_type, target) {
            (Some(id), Some(rel_type), Some(target)) => rels.push(Relationship {
                id,
                rel_type,
                target,
            }),
            _ => return Err(Error::Xml("relationship entry missing attributes".to_string())),
        }
    }
}

fn write_relationships(rels: &[Relationship]) -> String {
    let mut out = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
    );
    for rel in rels {
        out.push_str(&format!(
            "<Relationship Id=\"{}\" Type=\"{}\" Target=\"{}\"/>",
            quick_xml::escape::escape(rel.id.as_str()),
            quick_xml::escape::escape(rel.rel_type.as_str()),
            quick_xml::escape::escape(rel.target.as_str()),
        ));
    }
    out.push_str("</Relationships>");
    out
}
