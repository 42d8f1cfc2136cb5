//! Output backends.
//!
//! Both backends consume the same [`DocumentIr`]. The PDF backend draws
//! every item at its pass-1 position; the DOCX backend only keeps the order
//! and the part boundaries and leaves pagination to the viewer.

pub mod docx;
pub mod pdf;

use crate::compose::ir::{DocumentIr, IrPart, PartKind};
use crate::compose::TocEntry;
use crate::error::BackendError;
use crate::model::OutputFormat;
use crate::warning::Warnings;
use std::time::Instant;
use tracing::info;

pub use docx::DocxBackend;
pub use pdf::{PdfBackend, PdfRendering};

/// Sink for one output format, fed part by part in document order.
pub trait ReportBackend {
    type Output;

    fn format(&self) -> OutputFormat;

    fn emit_cover(&mut self, part: &IrPart<'_>) -> Result<(), BackendError>;

    fn emit_kpi_summary(&mut self, part: &IrPart<'_>) -> Result<(), BackendError>;

    fn emit_toc(&mut self, part: &IrPart<'_>, toc: &[TocEntry]) -> Result<(), BackendError>;

    fn emit_section(&mut self, index: usize, part: &IrPart<'_>) -> Result<(), BackendError>;

    fn emit_appendix(&mut self, index: usize, part: &IrPart<'_>) -> Result<(), BackendError>;

    /// Assemble the final output.
    fn finish(self) -> Result<Self::Output, BackendError>;
}

/// Feed every part of `ir` to `backend` and finish it.
pub fn drive<B: ReportBackend>(ir: &DocumentIr<'_>, mut backend: B) -> Result<B::Output, BackendError> {
    let started = Instant::now();
    let format = backend.format();
    for part in &ir.parts {
        match part.kind {
            PartKind::Cover => backend.emit_cover(part)?,
            PartKind::KpiSummary => backend.emit_kpi_summary(part)?,
            PartKind::Contents => backend.emit_toc(part, &ir.toc)?,
            PartKind::Section(index) => backend.emit_section(index, part)?,
            PartKind::Appendix(index) => backend.emit_appendix(index, part)?,
        }
    }
    let output = backend.finish()?;
    info!(
        format = %format,
        parts = ir.parts.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Backend finished"
    );
    Ok(output)
}

/// Encoded bytes of one format plus anything the backend degraded.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub bytes: Vec<u8>,
    pub warnings: Warnings,
}

/// Render `ir` in the given format.
pub fn render(ir: &DocumentIr<'_>, format: OutputFormat) -> Result<Rendered, BackendError> {
    match format {
        OutputFormat::Pdf => drive(ir, PdfBackend::new(ir)).map(|r| Rendered {
            bytes: r.bytes,
            warnings: r.warnings,
        }),
        OutputFormat::Docx => drive(ir, DocxBackend::new(ir)).map(|bytes| Rendered {
            bytes,
            warnings: Warnings::new(),
        }),
    }
}
