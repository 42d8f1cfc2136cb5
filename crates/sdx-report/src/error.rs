//! Error types for report export.
//!
//! Only [`ConfigurationError`] aborts a generation run. Asset, data and
//! layout failures degrade locally and surface as [`crate::ReportWarning`]s.

use crate::model::OutputFormat;
use thiserror::Error;

/// Result type for report operations.
pub type Result<T> = std::result::Result<T, GenerateError>;

/// Fatal configuration problems, detected before any rendering starts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// A required cover field is blank.
    #[error("missing required cover metadata: {0}")]
    MissingCoverField(&'static str),

    /// No output format was requested.
    #[error("no output format requested")]
    NoFormats,

    /// The same output format was requested more than once.
    #[error("output format '{0}' requested more than once")]
    DuplicateFormat(OutputFormat),

    /// The logo bytes are not a decodable PNG.
    #[error("invalid logo image: {0}")]
    InvalidLogo(String),

    /// Page geometry leaves no printable area.
    #[error("invalid page geometry: {0}")]
    InvalidGeometry(String),

    /// A layout or asset option is out of range.
    #[error("invalid option '{name}': {reason}")]
    InvalidOption { name: &'static str, reason: String },

    /// Theme or options file could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

/// A chart could not be rasterized; a placeholder is used instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssetRenderError {
    /// The chart mark is not one the renderer draws.
    #[error("unsupported chart encoding '{0}'")]
    UnsupportedEncoding(String),

    /// The chart has no series or only empty series.
    #[error("chart has no data points")]
    EmptySeries,

    /// A series length disagrees with the category axis.
    #[error("series '{series}' has {actual} values but {expected} categories")]
    LengthMismatch {
        series: String,
        expected: usize,
        actual: usize,
    },

    /// A value is NaN or infinite.
    #[error("series '{series}' contains a non-finite value")]
    NonFinite { series: String },

    /// Pie charts need a positive total.
    #[error("pie chart total must be positive")]
    NonPositiveTotal,

    /// The pixmap could not be allocated or encoded.
    #[error("raster backend failure: {0}")]
    Raster(String),
}

/// An analytics module could not supply a chart or table.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{subject} unavailable in section '{section}': {reason}")]
pub struct DataUnavailableError {
    /// Section title.
    pub section: String,
    /// What is missing ("chart", "recommendation tables", "section data").
    pub subject: String,
    /// Human-readable cause.
    pub reason: String,
}

/// A block is larger than a full page and was force-placed alone.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{what} exceeds one page ({height:.1}pt > {available:.1}pt); placed alone on page {page}")]
pub struct LayoutOverflowError {
    /// Short description of the oversized block.
    pub what: String,
    /// Natural height of the block in points.
    pub height: f32,
    /// Usable page height in points.
    pub available: f32,
    /// Page the block was forced onto.
    pub page: usize,
}

/// Failures inside an output backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// ZIP packaging error.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// I/O error while writing an in-memory buffer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Embedded image could not be decoded.
    #[error("image decode error: {0}")]
    ImageDecode(String),
}

impl From<png::DecodingError> for BackendError {
    fn from(err: png::DecodingError) -> Self {
        BackendError::ImageDecode(err.to_string())
    }
}

/// Errors returned by [`crate::ReportGenerator::generate`].
#[derive(Error, Debug)]
pub enum GenerateError {
    /// The job was rejected before rendering.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// A backend failed while emitting its output.
    #[error("{format} backend failed: {source}")]
    Backend {
        format: OutputFormat,
        #[source]
        source: BackendError,
    },
}
