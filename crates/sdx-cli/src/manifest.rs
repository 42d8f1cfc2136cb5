//! Output manifest written next to the generated files.

use chrono::{DateTime, Utc};
use sdx_report::{GeneratedReport, OutputFormat, ReportWarning, TocEntry};
use serde::Serialize;
use sha2::{Digest, Sha256};

pub const MANIFEST_FILE: &str = "manifest.json";

/// One written output file.
#[derive(Debug, Clone, Serialize)]
pub struct OutputEntry {
    pub format: OutputFormat,
    pub file: String,
    pub bytes: usize,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub generator: String,
    pub client_name: String,
    pub period_label: String,
    pub generated_at: DateTime<Utc>,
    pub outputs: Vec<OutputEntry>,
    pub page_count: usize,
    pub toc: Vec<TocEntry>,
    pub warnings: Vec<ReportWarning>,
}

/// File name for a format's output.
pub fn file_name(format: OutputFormat) -> String {
    format!("report.{}", format.extension())
}

pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

impl Manifest {
    pub fn new(
        report: &GeneratedReport,
        client_name: &str,
        period_label: &str,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let outputs = report
            .outputs
            .iter()
            .map(|(format, bytes)| OutputEntry {
                format: *format,
                file: file_name(*format),
                bytes: bytes.len(),
                sha256: sha256_hex(bytes),
            })
            .collect();
        Self {
            generator: concat!("sdx-report ", env!("CARGO_PKG_VERSION")).to_string(),
            client_name: client_name.to_string(),
            period_label: period_label.to_string(),
            generated_at,
            outputs,
            page_count: report.page_count,
            toc: report.toc.clone(),
            warnings: report.warnings.clone(),
        }
    }
}
