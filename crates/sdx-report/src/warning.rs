//! Non-fatal warnings collected during a generation run.

use crate::error::{AssetRenderError, BackendError, DataUnavailableError, LayoutOverflowError};
use crate::model::OutputFormat;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Category of a recoverable problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A chart fell back to a placeholder image.
    AssetRender,
    /// A chart, table group or whole section had no data.
    DataUnavailable,
    /// A block larger than a page was force-placed.
    LayoutOverflow,
}

impl std::fmt::Display for WarningKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WarningKind::AssetRender => write!(f, "asset_render"),
            WarningKind::DataUnavailable => write!(f, "data_unavailable"),
            WarningKind::LayoutOverflow => write!(f, "layout_overflow"),
        }
    }
}

/// A recoverable problem returned alongside the generated outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportWarning {
    /// Warning category.
    pub kind: WarningKind,
    /// Section the warning belongs to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Referenced asset (chart title), if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset: Option<String>,
    /// Human-readable description.
    pub message: String,
}

impl ReportWarning {
    /// Warning for a chart that was replaced by a placeholder.
    pub fn asset(section: Option<&str>, asset: &str, err: &AssetRenderError) -> Self {
        Self {
            kind: WarningKind::AssetRender,
            section: section.map(str::to_string),
            asset: Some(asset.to_string()),
            message: format!("chart '{}' replaced by placeholder: {}", asset, err),
        }
    }

    /// Warning for an image an output backend could not embed.
    pub fn embed(
        section: Option<&str>,
        asset: &str,
        format: OutputFormat,
        err: &BackendError,
    ) -> Self {
        Self {
            kind: WarningKind::AssetRender,
            section: section.map(str::to_string),
            asset: Some(asset.to_string()),
            message: format!("image '{}' drawn as an empty frame in {}: {}", asset, format, err),
        }
    }

    /// Warning for missing module data.
    pub fn data(err: &DataUnavailableError) -> Self {
        Self {
            kind: WarningKind::DataUnavailable,
            section: Some(err.section.clone()),
            asset: None,
            message: err.to_string(),
        }
    }

    /// Warning for an oversized block.
    pub fn overflow(section: Option<&str>, err: &LayoutOverflowError) -> Self {
        Self {
            kind: WarningKind::LayoutOverflow,
            section: section.map(str::to_string),
            asset: None,
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for ReportWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

/// Ordered warning sink. Every pushed warning is also logged.
#[derive(Debug, Clone, Default)]
pub struct Warnings {
    items: Vec<ReportWarning>,
}

impl Warnings {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning.
    pub fn push(&mut self, warning: ReportWarning) {
        warn!(
            kind = %warning.kind,
            section = warning.section.as_deref().unwrap_or("-"),
            "{}",
            warning.message
        );
        self.items.push(warning);
    }

    /// Append all warnings from another sink, keeping order.
    pub fn extend(&mut self, other: Warnings) {
        self.items.extend(other.items);
    }

    /// Number of warnings.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no warnings were recorded.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Borrow the recorded warnings.
    pub fn as_slice(&self) -> &[ReportWarning] {
        &self.items
    }

    /// Consume the sink.
    pub fn into_vec(self) -> Vec<ReportWarning> {
        self.items
    }
}
