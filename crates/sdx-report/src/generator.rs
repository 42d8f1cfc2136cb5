//! Library entry point: one report job in, one byte buffer per format out.
//!
//! A run validates the job, renders every chart in one parallel batch,
//! normalizes the modules into sections, lays the document out once and
//! hands the same IR to each requested backend.

use crate::asset::{self, AssetRenderer, ChartSpec};
use crate::backend;
use crate::compose::{DocumentComposer, TocEntry};
use crate::config::GeneratorConfig;
use crate::error::{ConfigurationError, GenerateError, Result};
use crate::model::{Appendix, Asset, CoverMetadata, Kpi, OutputFormat, ReportDocument};
use crate::section::{ModuleOutput, SectionBuilder};
use crate::warning::{ReportWarning, Warnings};

use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;
use tracing::{debug, info};

/// Title of the appendix listing recoverable problems.
pub const DATA_NOTES_TITLE: &str = "Data availability notes";

fn default_report_title() -> String {
    "Service Desk Analytics Report".to_string()
}

/// Where the cover logo comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogoSource {
    /// Already-encoded PNG, base64 in JSON.
    Png { data: String },
    /// A chart rendered at the configured asset size.
    Chart(ChartSpec),
}

/// Cover page metadata supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverConfig {
    #[serde(default = "default_report_title")]
    pub report_title: String,
    pub client_name: String,
    pub period_label: String,
    #[serde(default)]
    pub logo: Option<LogoSource>,
    /// Generation timestamp; the current time when absent.
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
}

impl CoverConfig {
    pub fn new(client_name: impl Into<String>, period_label: impl Into<String>) -> Self {
        Self {
            report_title: default_report_title(),
            client_name: client_name.into(),
            period_label: period_label.into(),
            logo: None,
            generated_at: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.report_title = title.into();
        self
    }

    pub fn with_logo(mut self, logo: LogoSource) -> Self {
        self.logo = Some(logo);
        self
    }

    pub fn with_generated_at(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = Some(at);
        self
    }
}

/// A complete export request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportJob {
    pub cover: CoverConfig,
    pub requested_formats: Vec<OutputFormat>,
    #[serde(default)]
    pub kpis: Vec<Kpi>,
    /// Analytics module outputs in registration order.
    #[serde(default)]
    pub modules: Vec<ModuleOutput>,
    #[serde(default)]
    pub appendices: Vec<Appendix>,
}

impl ReportJob {
    pub fn new(cover: CoverConfig) -> Self {
        Self {
            cover,
            requested_formats: vec![OutputFormat::Pdf, OutputFormat::Docx],
            kpis: Vec::new(),
            modules: Vec::new(),
            appendices: Vec::new(),
        }
    }

    pub fn with_formats(mut self, formats: Vec<OutputFormat>) -> Self {
        self.requested_formats = formats;
        self
    }

    pub fn with_kpi(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.kpis.push(Kpi::new(label, value));
        self
    }

    pub fn with_module(mut self, module: ModuleOutput) -> Self {
        self.modules.push(module);
        self
    }

    pub fn with_appendix(mut self, appendix: Appendix) -> Self {
        self.appendices.push(appendix);
        self
    }

    /// Check everything that can be checked without rendering.
    pub fn validate(&self) -> std::result::Result<(), ConfigurationError> {
        if self.cover.client_name.trim().is_empty() {
            return Err(ConfigurationError::MissingCoverField("client_name"));
        }
        if self.cover.period_label.trim().is_empty() {
            return Err(ConfigurationError::MissingCoverField("period_label"));
        }
        if self.cover.report_title.trim().is_empty() {
            return Err(ConfigurationError::MissingCoverField("report_title"));
        }
        if self.requested_formats.is_empty() {
            return Err(ConfigurationError::NoFormats);
        }
        let mut seen = BTreeSet::new();
        for format in &self.requested_formats {
            if !seen.insert(*format) {
                return Err(ConfigurationError::DuplicateFormat(*format));
            }
        }
        match &self.cover.logo {
            Some(LogoSource::Png { data }) => {
                decode_logo(data)?;
            }
            Some(LogoSource::Chart(spec)) => {
                asset::validate(spec)
                    .map_err(|e| ConfigurationError::InvalidLogo(e.to_string()))?;
            }
            None => {}
        }
        Ok(())
    }
}

fn decode_logo(data: &str) -> std::result::Result<Asset, ConfigurationError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| ConfigurationError::InvalidLogo(format!("base64: {}", e)))?;
    Asset::from_png(bytes, "").map_err(ConfigurationError::InvalidLogo)
}

/// A job resolved into a layout-ready document.
#[derive(Debug, Clone)]
pub struct PreparedReport {
    pub document: ReportDocument,
    /// Asset and data warnings raised while building sections.
    pub warnings: Warnings,
}

/// Result of a generation run.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedReport {
    /// One buffer per requested format.
    #[serde(skip)]
    pub outputs: BTreeMap<OutputFormat, Vec<u8>>,
    pub toc: Vec<TocEntry>,
    /// Pages in the paginated (PDF) layout.
    pub page_count: usize,
    pub warnings: Vec<ReportWarning>,
}

impl GeneratedReport {
    pub fn output(&self, format: OutputFormat) -> Option<&[u8]> {
        self.outputs.get(&format).map(Vec::as_slice)
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Generates reports with a fixed configuration.
pub struct ReportGenerator {
    config: GeneratorConfig,
    renderer: AssetRenderer,
    composer: DocumentComposer,
}

impl ReportGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        let renderer = AssetRenderer::new(config.assets.clone(), &config.theme);
        let composer = DocumentComposer::new(config.theme.clone(), config.layout.clone());
        Self {
            config,
            renderer,
            composer,
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn composer(&self) -> &DocumentComposer {
        &self.composer
    }

    /// Validate configuration and job without rendering anything.
    pub fn validate(&self, job: &ReportJob) -> std::result::Result<(), ConfigurationError> {
        self.config.validate()?;
        job.validate()
    }

    /// Validate the job, render its charts and build the document.
    pub fn prepare(&self, job: &ReportJob) -> std::result::Result<PreparedReport, ConfigurationError> {
        self.validate(job)?;

        let logo = match &job.cover.logo {
            Some(LogoSource::Png { data }) => Some(decode_logo(data)?),
            Some(LogoSource::Chart(spec)) => Some(
                self.renderer
                    .try_render(spec)
                    .map_err(|e| ConfigurationError::InvalidLogo(e.to_string()))?,
            ),
            None => None,
        };
        let generated_at = job.cover.generated_at.unwrap_or_else(|| {
            let now = Utc::now();
            debug!(%now, "No generation timestamp supplied; using current time");
            now
        });

        let batch = SectionBuilder::new(&self.renderer).build_all(&job.modules);
        let mut appendices = job.appendices.clone();
        if self.config.layout.warnings_appendix && !batch.warnings.is_empty() {
            appendices.push(data_notes(batch.warnings.as_slice()));
        }

        let document = ReportDocument {
            cover: CoverMetadata {
                report_title: job.cover.report_title.clone(),
                client_name: job.cover.client_name.clone(),
                period_label: job.cover.period_label.clone(),
                logo,
                generated_at,
            },
            kpis: job.kpis.clone(),
            sections: batch.sections,
            appendices,
        };
        Ok(PreparedReport {
            document,
            warnings: batch.warnings,
        })
    }

    /// Run the whole pipeline.
    pub fn generate(&self, job: &ReportJob) -> Result<GeneratedReport> {
        let started = Instant::now();
        let prepared = self.prepare(job)?;
        let mut warnings = prepared.warnings.clone();

        let composition = self.composer.compose(&prepared.document);
        warnings.extend(composition.warnings.clone());

        let mut outputs = BTreeMap::new();
        for &format in &job.requested_formats {
            let rendered = backend::render(&composition.ir, format)
                .map_err(|source| GenerateError::Backend { format, source })?;
            info!(format = %format, bytes = rendered.bytes.len(), "Output rendered");
            warnings.extend(rendered.warnings);
            outputs.insert(format, rendered.bytes);
        }

        let report = GeneratedReport {
            outputs,
            toc: composition.toc().to_vec(),
            page_count: composition.ir.page_count,
            warnings: warnings.into_vec(),
        };
        info!(
            sections = prepared.document.sections.len(),
            pages = report.page_count,
            formats = report.outputs.len(),
            warnings = report.warnings.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Report generated"
        );
        Ok(report)
    }
}

fn data_notes(warnings: &[ReportWarning]) -> Appendix {
    Appendix {
        title: DATA_NOTES_TITLE.to_string(),
        paragraphs: warnings
            .iter()
            .map(|w| match &w.section {
                Some(section) => format!("{}: {}", section, w.message),
                None => w.message.clone(),
            })
            .collect(),
    }
}
