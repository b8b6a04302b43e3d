//! # Sitedoc CLI
//!
//! Usage:
//!   sitedoc job.json -o report.docx
//!   echo '{ ... }' | sitedoc -o report.docx
//!   sitedoc --example > job.json
//!
//! When `-o` is omitted the output name is derived from the job's
//! category and date (ROC compact date + report title).

use std::env;
use std::fs;
use std::io::{self, Read};

use chrono::NaiveDate;
use serde::Deserialize;

use sitedoc::{naming, Catalog, Error, GeneratedDocument, PhotoRecord, Replacements, ReportConfig};

#[derive(Debug, Deserialize)]
struct Job {
    template: String,
    category: String,
    /// ISO date of the inspection, e.g. "2026-02-03".
    date: String,
    #[serde(default)]
    context: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    photos: Vec<PhotoEntry>,
    /// Optional checklist catalog; prefills empty photo fields by index.
    #[serde(default)]
    catalog: Option<String>,
    #[serde(default)]
    capacity: Option<u32>,
    #[serde(default)]
    image_width_cm: Option<f64>,
    #[serde(default)]
    spacer_width: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct PhotoEntry {
    /// File path, data URI, or raw base64.
    #[serde(default)]
    src: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    design_standard: Option<String>,
    #[serde(default)]
    result: String,
}

/// Either one job or a `compose` batch of jobs merged into one file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JobFile {
    Batch { compose: Vec<Job> },
    Single(Job),
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--example") {
        print!("{}", example_job_json());
        return;
    }

    let input = if args.len() > 1 && !args[1].starts_with('-') {
        fs::read_to_string(&args[1]).expect("Failed to read job file")
    } else {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .expect("Failed to read stdin");
        buf
    };

    let output_arg = args.windows(2).find(|w| w[0] == "-o").map(|w| w[1].clone());

    match run(&input, output_arg) {
        Ok((path, bytes)) => {
            eprintln!("✓ Written {} bytes to {}", bytes, path);
        }
        Err(e) => {
            eprintln!("✗ {}", e);
            std::process::exit(1);
        }
    }
}

fn run(input: &str, output_arg: Option<String>) -> Result<(String, usize), Error> {
    let job_file: JobFile = serde_json::from_str(input)?;
    let jobs = match job_file {
        JobFile::Batch { compose } => compose,
        JobFile::Single(job) => vec![job],
    };
    if jobs.is_empty() {
        return Err(Error::Compose("compose batch is empty".to_string()));
    }

    let default_name = default_output_name(&jobs[0])?;
    let mut documents = Vec::with_capacity(jobs.len());
    for job in &jobs {
        documents.push(generate_one(job)?);
    }
    let merged = sitedoc::compose_reports(documents)?;

    let output_path = output_arg.unwrap_or(default_name);
    let bytes = merged.to_bytes()?;
    fs::write(&output_path, &bytes)?;
    Ok((output_path, bytes.len()))
}

fn generate_one(job: &Job) -> Result<GeneratedDocument, Error> {
    let date = parse_date(&job.date)?;
    let roc = naming::roc_date(date);
    let (title, _) = naming::derive_names(&job.category, date);

    let template = fs::read(&job.template)
        .map_err(|e| Error::Template(format!("failed to read template '{}': {}", job.template, e)))?;

    let mut context = Replacements::from_json_map(&job.context);
    context.insert("title", title);
    context.insert("date", roc.clone());

    let catalog = match &job.catalog {
        Some(path) => Some(Catalog::from_file(path)?),
        None => None,
    };
    let checklist = catalog
        .as_ref()
        .and_then(|c| c.entries(&job.category))
        .unwrap_or(&[]);

    let mut photos = Vec::with_capacity(job.photos.len());
    for (index, entry) in job.photos.iter().enumerate() {
        let image = match &entry.src {
            Some(src) => Some(sitedoc::image_loader::load_photo(src)?),
            None => None,
        };
        let prefill = checklist.get(index);
        let description = if entry.description.is_empty() {
            prefill.map(|e| e.description.clone()).unwrap_or_default()
        } else {
            entry.description.clone()
        };
        let design_standard = entry
            .design_standard
            .clone()
            .or_else(|| prefill.and_then(|e| e.design_standard.clone()));
        let result = if entry.result.is_empty() {
            prefill.map(|e| e.result.clone()).unwrap_or_default()
        } else {
            entry.result.clone()
        };
        photos.push(PhotoRecord {
            image,
            sequence: index as u32 + 1,
            description,
            design_standard,
            result,
            date: roc.clone(),
        });
    }

    let defaults = ReportConfig::default();
    let config = ReportConfig {
        capacity: job.capacity.unwrap_or(defaults.capacity),
        image_width_cm: job.image_width_cm.unwrap_or(defaults.image_width_cm),
        spacer_width: job.spacer_width.unwrap_or(defaults.spacer_width),
    };

    sitedoc::generate_document(&template, &context, &photos, &config)
}

fn default_output_name(job: &Job) -> Result<String, Error> {
    let date = parse_date(&job.date)?;
    let (_, filename_base) = naming::derive_names(&job.category, date);
    Ok(format!("{}.docx", filename_base))
}

fn parse_date(value: &str) -> Result<NaiveDate, Error> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| Error::Template(format!("invalid date '{}': {}", value, e)))
}

fn example_job_json() -> &'static str {
    r##"{
  "template": "inspection_template.docx",
  "category": "拆除工程-施工 (EA26)",
  "date": "2026-02-03",
  "context": {
    "project": "北棟辦公室整修工程",
    "contractor": "大安營造股份有限公司",
    "location": "北棟 6F"
  },
  "photos": [
    {
      "src": "./photos/before.jpg",
      "description": "現場既有雜物整理",
      "result": "已完成"
    },
    {
      "src": "./photos/sorting.jpg",
      "description": "室裝材分類拆除集中",
      "design_standard": "依可回收/不可回收/有價物分類",
      "result": "符合"
    },
    {
      "src": "./photos/after.jpg",
      "description": "拆除完成面清理",
      "result": "符合"
    }
  ]
}"##
}
