//! Document data model shared by the builder, composer and backends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Output formats the engine can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Manually paginated PDF.
    Pdf,
    /// Flowing WordprocessingML document.
    #[serde(alias = "flowing")]
    Docx,
}

impl OutputFormat {
    /// File extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Docx => "docx",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pdf" => Ok(OutputFormat::Pdf),
            "docx" | "flowing" | "word" => Ok(OutputFormat::Docx),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

/// A rasterized image embedded in the document.
///
/// Immutable once created; the PNG bytes and pixel size always agree.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    png: Vec<u8>,
    width: u32,
    height: u32,
    caption: String,
    placeholder: bool,
}

impl Asset {
    pub(crate) fn rendered(png: Vec<u8>, width: u32, height: u32, caption: String) -> Self {
        Self {
            png,
            width,
            height,
            caption,
            placeholder: false,
        }
    }

    pub(crate) fn placeholder(png: Vec<u8>, width: u32, height: u32, caption: String) -> Self {
        Self {
            png,
            width,
            height,
            caption,
            placeholder: true,
        }
    }

    /// Wrap caller-supplied PNG bytes.
    ///
    /// The whole image is decoded once so corrupt pixel data is rejected
    /// here rather than when a backend embeds it.
    pub fn from_png(png: Vec<u8>, caption: impl Into<String>) -> Result<Self, String> {
        let (width, height) = {
            let decoder = png::Decoder::new(Cursor::new(png.as_slice()));
            let mut reader = decoder.read_info().map_err(|e| e.to_string())?;
            let (width, height) = (reader.info().width, reader.info().height);
            if width == 0 || height == 0 {
                return Err("image has zero size".to_string());
            }
            let mut buf = vec![0u8; reader.output_buffer_size()];
            reader.next_frame(&mut buf).map_err(|e| e.to_string())?;
            (width, height)
        };
        Ok(Self {
            png,
            width,
            height,
            caption: caption.into(),
            placeholder: false,
        })
    }

    /// Encoded PNG bytes.
    pub fn png(&self) -> &[u8] {
        &self.png
    }

    /// Pixel width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Pixel height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Width divided by height.
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Caption shown under the image.
    pub fn caption(&self) -> &str {
        &self.caption
    }

    /// Whether this is a fallback image for a failed chart.
    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }
}

/// One row of a recommendation table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecommendationRow {
    pub recommendation: String,
    pub explanation: String,
    pub benefit: String,
    pub cost_calculation: String,
    pub evidence: String,
}

impl RecommendationRow {
    /// Column headers, in cell order.
    pub const COLUMNS: [&'static str; 5] = [
        "Recommendation",
        "Explanation",
        "Benefit",
        "Cost calculation",
        "Evidence",
    ];

    /// Cells in column order.
    pub fn cells(&self) -> [&str; 5] {
        [
            &self.recommendation,
            &self.explanation,
            &self.benefit,
            &self.cost_calculation,
            &self.evidence,
        ]
    }
}

/// The three fixed recommendation categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationCategory {
    Cost,
    Performance,
    Satisfaction,
}

impl RecommendationCategory {
    /// All categories in document order.
    pub const ALL: [RecommendationCategory; 3] = [
        RecommendationCategory::Cost,
        RecommendationCategory::Performance,
        RecommendationCategory::Satisfaction,
    ];

    /// Heading used for the category table.
    pub fn heading(&self) -> &'static str {
        match self {
            RecommendationCategory::Cost => "Cost recommendations",
            RecommendationCategory::Performance => "Performance recommendations",
            RecommendationCategory::Satisfaction => "Satisfaction recommendations",
        }
    }

    /// Lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            RecommendationCategory::Cost => "cost",
            RecommendationCategory::Performance => "performance",
            RecommendationCategory::Satisfaction => "satisfaction",
        }
    }
}

/// Cost, performance and satisfaction recommendation tables.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecommendationTableGroup {
    #[serde(default)]
    pub cost: Vec<RecommendationRow>,
    #[serde(default)]
    pub performance: Vec<RecommendationRow>,
    #[serde(default)]
    pub satisfaction: Vec<RecommendationRow>,
}

impl RecommendationTableGroup {
    /// Rows for one category.
    pub fn table(&self, category: RecommendationCategory) -> &[RecommendationRow] {
        match category {
            RecommendationCategory::Cost => &self.cost,
            RecommendationCategory::Performance => &self.performance,
            RecommendationCategory::Satisfaction => &self.satisfaction,
        }
    }

    /// Total rows across all three tables.
    pub fn row_count(&self) -> usize {
        self.cost.len() + self.performance.len() + self.satisfaction.len()
    }
}

/// A unit of section content.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    /// A rendered chart.
    Asset(Asset),
    /// Pre-formatted narrative text.
    Paragraph(String),
    /// Categorized recommendation tables.
    Recommendations(RecommendationTableGroup),
    /// Explicit "no data" marker for something the module could not supply.
    Unavailable { subject: String, reason: String },
}

/// The normalized contribution of one analytics module.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSection {
    title: String,
    blocks: Vec<ContentBlock>,
}

impl ReportSection {
    /// Create a section. An empty block list is replaced by a "no data" block.
    pub fn new(title: impl Into<String>, blocks: Vec<ContentBlock>) -> Self {
        let blocks = if blocks.is_empty() {
            vec![ContentBlock::Unavailable {
                subject: "section data".to_string(),
                reason: "no charts, narrative or recommendations were produced".to_string(),
            }]
        } else {
            blocks
        };
        Self {
            title: title.into(),
            blocks,
        }
    }

    /// Section title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Content blocks in order.
    pub fn blocks(&self) -> &[ContentBlock] {
        &self.blocks
    }

    /// Number of chart assets in the section.
    pub fn asset_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| matches!(b, ContentBlock::Asset(_)))
            .count()
    }
}

/// A key performance indicator shown on the summary page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kpi {
    pub label: String,
    pub value: String,
}

impl Kpi {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Supplementary material placed after the last section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appendix {
    pub title: String,
    #[serde(default)]
    pub paragraphs: Vec<String>,
}

/// Cover page metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverMetadata {
    /// Document title.
    pub report_title: String,
    /// Client the report is prepared for.
    pub client_name: String,
    /// Reporting period, e.g. "Q3 2026".
    pub period_label: String,
    /// Optional client logo.
    pub logo: Option<Asset>,
    /// Caller-supplied generation timestamp.
    pub generated_at: DateTime<Utc>,
}

impl CoverMetadata {
    /// Timestamp as printed on the cover.
    pub fn generated_label(&self) -> String {
        self.generated_at.format("%Y-%m-%d %H:%M UTC").to_string()
    }

    /// Footer text used on every page after the cover.
    pub fn footer_label(&self) -> String {
        format!("{} | {}", self.client_name, self.period_label)
    }
}

/// Everything the composer lays out.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub cover: CoverMetadata,
    pub kpis: Vec<Kpi>,
    pub sections: Vec<ReportSection>,
    pub appendices: Vec<Appendix>,
}
