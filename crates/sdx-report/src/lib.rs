//! Paginated report export for service-desk analytics.
//!
//! Assembles already-computed analytics module output (charts, narrative,
//! recommendation tables) into one document and emits it as a manually
//! paginated PDF and a flowing DOCX with identical content and order.
//!
//! # Pipeline
//!
//! - **Assets**: chart specs rasterized to fixed-size PNGs, in parallel
//! - **Sections**: module output normalized into ordered content blocks
//! - **Composition**: two-pass layout into a format-agnostic IR; pass 1
//!   paginates and resolves the table of contents, pass 2 emits placed items
//! - **Backends**: PDF draws the IR at its pass-1 positions, DOCX keeps the
//!   order and lets the viewer paginate
//!
//! Chart, data and layout problems never abort a run. They degrade to
//! placeholders and come back as [`ReportWarning`]s.
//!
//! # Example
//!
//! ```no_run
//! use sdx_report::{CoverConfig, GeneratorConfig, ModuleOutput, ReportGenerator, ReportJob};
//!
//! let job = ReportJob::new(CoverConfig::new("Acme", "Q3 2026"))
//!     .with_kpi("Tickets", "1,204")
//!     .with_module(ModuleOutput::new("Ticket volume").with_paragraph("Volume rose 4%."));
//! let report = ReportGenerator::new(GeneratorConfig::default())
//!     .generate(&job)
//!     .unwrap();
//! for entry in &report.toc {
//!     println!("{} .... {}", entry.title(), entry.page());
//! }
//! ```

pub mod asset;
pub mod backend;
pub mod compose;
pub mod config;
pub mod error;
pub mod generator;
pub mod model;
pub mod section;
pub mod warning;

pub use asset::{AssetRenderer, ChartSpec, RenderOutcome, Series};
pub use backend::{PdfRendering, ReportBackend};
pub use compose::{Composition, DocumentComposer, TocEntry};
pub use config::{AssetOptions, BrandColors, FontSizes, GeneratorConfig, LayoutOptions, PageGeometry, Rgb, Theme};
pub use error::{
    AssetRenderError, BackendError, ConfigurationError, DataUnavailableError, GenerateError,
    LayoutOverflowError, Result,
};
pub use generator::{
    CoverConfig, GeneratedReport, LogoSource, PreparedReport, ReportGenerator, ReportJob,
};
pub use model::{
    Appendix, Asset, ContentBlock, CoverMetadata, Kpi, OutputFormat, RecommendationCategory,
    RecommendationRow, RecommendationTableGroup, ReportDocument, ReportSection,
};
pub use section::{ChartSlot, ModuleOutput, SectionBatch, SectionBuilder};
pub use warning::{ReportWarning, WarningKind, Warnings};
