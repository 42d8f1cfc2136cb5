//! Document composition and two-pass pagination.
//!
//! The composer turns a [`ReportDocument`] into a [`DocumentIr`]:
//!
//! 1. Every part (cover, KPI summary, contents, sections, appendices) is
//!    measured into flow units: text wrapped with Helvetica metrics, images
//!    scaled to the content width, table rows sized from their wrapped cells.
//! 2. Pass 1 paginates the units and resolves each section's start page,
//!    which yields the table of contents. TOC line heights do not depend on
//!    the page numbers printed in them, so one pass is enough.
//! 3. Pass 2 walks the same units with the pass-1 placements and emits the
//!    IR items, slicing split paragraphs and tables into fragments.

mod flow;
pub mod ir;
pub mod metrics;

pub use flow::TocEntry;

use crate::config::{LayoutOptions, Theme};
use crate::error::LayoutOverflowError;
use crate::model::{
    Asset, ContentBlock, RecommendationCategory, RecommendationRow, ReportDocument,
};
use crate::warning::{ReportWarning, Warnings};
use flow::{FlowSettings, Fragment, PartFlow, Unit};
use ir::{
    heading_size, section_anchor, DocumentIr, IrBlock, IrCell, IrColumn, IrItem, IrPart, IrRow,
    IrTable, PartKind, TextStyle, CAPTION_GAP,
};
use metrics::{truncate_with_ellipsis, wrap_text};
use std::cell::Cell;
use std::collections::HashSet;
use tracing::{debug, info};

const TABLE_PADDING: f32 = 3.0;
const TOC_PAGE_COLUMN: f32 = 40.0;
const KPI_HEADING: &str = "Key Performance Indicators";
const CONTENTS_HEADING: &str = "Contents";
const RECOMMENDATION_WIDTHS: [f32; 5] = [0.22, 0.24, 0.18, 0.18, 0.18];

/// Output of the composer.
#[derive(Debug, Clone)]
pub struct Composition<'a> {
    pub ir: DocumentIr<'a>,
    /// Layout overflow warnings, in document order.
    pub warnings: Warnings,
}

impl Composition<'_> {
    /// Resolved table of contents.
    pub fn toc(&self) -> &[TocEntry] {
        &self.ir.toc
    }
}

/// Lays out a report with a fixed theme and layout options.
#[derive(Debug, Clone)]
pub struct DocumentComposer {
    theme: Theme,
    layout: LayoutOptions,
}

impl DocumentComposer {
    pub fn new(theme: Theme, layout: LayoutOptions) -> Self {
        Self { theme, layout }
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Measure, paginate and emit the IR.
    pub fn compose<'a>(&'a self, doc: &'a ReportDocument) -> Composition<'a> {
        let table_ids = Cell::new(0usize);
        let mut parts = Vec::new();

        let mut cover = self.part(
            PartKind::Cover,
            doc.cover.report_title.clone(),
            false,
            &table_ids,
        );
        if let Some(logo) = &doc.cover.logo {
            cover.image(logo, None, Some(self.layout.max_logo_height), 0.0);
        }
        cover.text(TextStyle::Title, &doc.cover.report_title, 24.0);
        let client = format!("Prepared for {}", doc.cover.client_name);
        cover.text(TextStyle::Subtitle, &client, 12.0);
        let period = format!("Reporting period: {}", doc.cover.period_label);
        cover.text(TextStyle::Subtitle, &period, 4.0);
        let generated = format!("Generated {}", doc.cover.generated_label());
        cover.text(TextStyle::Muted, &generated, 4.0);
        parts.push(cover);

        let mut kpis = self.part(
            PartKind::KpiSummary,
            KPI_HEADING.to_string(),
            true,
            &table_ids,
        );
        kpis.heading(1, KPI_HEADING, "_sdx_kpis".to_string(), None);
        if doc.kpis.is_empty() {
            kpis.text(
                TextStyle::Placeholder,
                "No KPI data was supplied for this period.",
                self.layout.paragraph_spacing,
            );
        } else {
            let rows: Vec<Vec<&str>> = doc
                .kpis
                .iter()
                .map(|k| vec![k.label.as_str(), k.value.as_str()])
                .collect();
            kpis.table(&[("Metric", 0.6), ("Value", 0.4)], &rows, self.layout.block_spacing);
        }
        parts.push(kpis);

        let mut contents = self.part(
            PartKind::Contents,
            CONTENTS_HEADING.to_string(),
            false,
            &table_ids,
        );
        contents.heading(1, CONTENTS_HEADING, "_sdx_contents".to_string(), None);
        if doc.sections.is_empty() {
            contents.text(
                TextStyle::Placeholder,
                "This report has no sections.",
                self.layout.paragraph_spacing,
            );
        }
        for (index, section) in doc.sections.iter().enumerate() {
            contents.toc_line(index, section.title());
        }
        parts.push(contents);

        let first_section_part = parts.len();
        for (index, section) in doc.sections.iter().enumerate() {
            let mut part = self.part(
                PartKind::Section(index),
                section.title().to_string(),
                true,
                &table_ids,
            );
            part.heading(1, section.title(), section_anchor(index), Some(index));
            for (block_index, block) in section.blocks().iter().enumerate() {
                match block {
                    ContentBlock::Asset(asset) => {
                        part.image(asset, Some(asset.caption()), None, self.layout.block_spacing);
                    }
                    ContentBlock::Paragraph(text) => {
                        part.text(TextStyle::Body, text, self.layout.paragraph_spacing);
                    }
                    ContentBlock::Recommendations(group) => {
                        for category in RecommendationCategory::ALL {
                            part.heading(
                                2,
                                category.heading(),
                                format!(
                                    "_sdx_section_{}_{}_{}",
                                    index,
                                    block_index,
                                    category.name()
                                ),
                                None,
                            );
                            let rows = group.table(category);
                            if rows.is_empty() {
                                part.text(
                                    TextStyle::Placeholder,
                                    &format!("No {} recommendations for this period.", category.name()),
                                    self.layout.paragraph_spacing,
                                );
                            } else {
                                let columns: Vec<(&str, f32)> = RecommendationRow::COLUMNS
                                    .iter()
                                    .copied()
                                    .zip(RECOMMENDATION_WIDTHS)
                                    .collect();
                                let cells: Vec<Vec<&str>> =
                                    rows.iter().map(|r| r.cells().to_vec()).collect();
                                part.table(&columns, &cells, self.layout.block_spacing);
                            }
                        }
                    }
                    ContentBlock::Unavailable { subject, reason } => {
                        part.text(
                            TextStyle::Placeholder,
                            &format!("No data available for {}: {}", subject, reason),
                            self.layout.paragraph_spacing,
                        );
                    }
                }
            }
            parts.push(part);
        }

        for (index, appendix) in doc.appendices.iter().enumerate() {
            let mut part = self.part(
                PartKind::Appendix(index),
                appendix.title.clone(),
                index == 0,
                &table_ids,
            );
            part.heading(1, &appendix.title, format!("_sdx_appendix_{}", index), None);
            let mut wrote = false;
            for paragraph in appendix.paragraphs.iter().filter(|p| !p.trim().is_empty()) {
                part.text(TextStyle::Body, paragraph.trim(), self.layout.paragraph_spacing);
                wrote = true;
            }
            if !wrote {
                part.text(TextStyle::Placeholder, "No content.", self.layout.paragraph_spacing);
            }
            parts.push(part);
        }

        // Pass 1
        let flows: Vec<PartFlow> = parts
            .iter()
            .map(|p| PartFlow {
                page_break_before: p.page_break_before,
                units: p.units.clone(),
            })
            .collect();
        let pagination = flow::paginate(
            &flows,
            FlowSettings {
                content_height: self.theme.page.content_height(),
                rows_per_page: self.layout.table_rows_per_page,
                orphan_lines: self.layout.orphan_min_lines,
            },
        );
        let toc = pagination.toc(
            doc.sections
                .iter()
                .enumerate()
                .map(|(i, s)| (first_section_part + i, s.title())),
        );

        // Pass 2
        let mut warnings = Warnings::new();
        let mut ir_parts = Vec::with_capacity(parts.len());
        for (part_index, part) in parts.into_iter().enumerate() {
            let fragments = &pagination.fragments[part_index];
            let section_title = match part.kind {
                PartKind::Section(_) => Some(part.title.as_str()),
                _ => None,
            };

            let mut noted = HashSet::new();
            for note in &part.overflows {
                let page = fragments
                    .iter()
                    .find(|f| f.unit == note.unit)
                    .map(|f| f.page)
                    .unwrap_or(pagination.first_pages[part_index]);
                let err = LayoutOverflowError {
                    what: note.what.clone(),
                    height: note.height,
                    available: note.available,
                    page,
                };
                warnings.push(ReportWarning::overflow(section_title, &err));
                noted.insert(note.unit);
            }
            for overflow in pagination.overflows.iter().filter(|o| o.part == part_index) {
                if noted.insert(overflow.unit) {
                    let err = LayoutOverflowError {
                        what: part.contents[overflow.unit].describe(),
                        height: overflow.height,
                        available: overflow.available,
                        page: overflow.page,
                    };
                    warnings.push(ReportWarning::overflow(section_title, &err));
                }
            }

            let items = fragments
                .iter()
                .map(|f| IrItem {
                    page: f.page,
                    y: f.y,
                    height: f.height,
                    block: part.contents[f.unit].emit(f, &toc),
                })
                .collect();
            ir_parts.push(IrPart {
                kind: part.kind,
                title: part.title,
                page_break_before: part.page_break_before,
                first_page: pagination.first_pages[part_index],
                items,
            });
        }

        info!(
            pages = pagination.page_count,
            sections = doc.sections.len(),
            parts = ir_parts.len(),
            overflows = warnings.len(),
            "Document composed"
        );

        Composition {
            ir: DocumentIr {
                theme: &self.theme,
                cover: &doc.cover,
                parts: ir_parts,
                page_count: pagination.page_count,
                toc,
            },
            warnings,
        }
    }

    fn part<'c, 'a>(
        &'c self,
        kind: PartKind,
        title: String,
        page_break_before: bool,
        table_ids: &'c Cell<usize>,
    ) -> MeasuredPart<'c, 'a> {
        MeasuredPart {
            theme: &self.theme,
            layout: &self.layout,
            table_ids,
            kind,
            title,
            page_break_before,
            units: Vec::new(),
            contents: Vec::new(),
            overflows: Vec::new(),
        }
    }
}

/// Content of a measured unit, kept until pass 2 knows where it goes.
#[derive(Debug, Clone)]
enum Measured<'a> {
    Heading {
        level: u8,
        text: String,
        lines: Vec<String>,
        anchor: String,
        section: Option<usize>,
    },
    Text {
        style: TextStyle,
        text: String,
        lines: Vec<String>,
    },
    Image {
        asset: &'a Asset,
        x: f32,
        width: f32,
        height: f32,
        caption: Vec<String>,
        caption_height: f32,
    },
    Table(IrTable),
    TocLine {
        section: usize,
        lines: Vec<String>,
    },
}

impl<'a> Measured<'a> {
    fn describe(&self) -> String {
        match self {
            Measured::Heading { text, .. } => format!("heading '{}'", text),
            Measured::Text { .. } => "paragraph".to_string(),
            Measured::Image { asset, .. } => format!("image '{}'", asset.caption()),
            Measured::Table(_) => "table row".to_string(),
            Measured::TocLine { .. } => "contents line".to_string(),
        }
    }

    fn emit(&self, fragment: &Fragment, toc: &[TocEntry]) -> IrBlock<'a> {
        let range = fragment.range.clone();
        let continued = fragment.continued;
        match self {
            Measured::Heading {
                level,
                text,
                lines,
                anchor,
                section,
            } => IrBlock::Heading {
                level: *level,
                text: text.clone(),
                lines: lines.clone(),
                anchor: anchor.clone(),
                section: *section,
            },
            Measured::Text { style, text, lines } => IrBlock::Text {
                style: *style,
                text: text.clone(),
                lines: lines[range].to_vec(),
                continued,
            },
            Measured::Image {
                asset,
                x,
                width,
                height,
                caption,
                caption_height,
            } => {
                // Pass 1 may have shrunk the image to keep it under its heading.
                let room = (fragment.height - caption_height).max(0.0);
                let (w, h) = if room + 0.01 < *height {
                    (room * asset.aspect_ratio(), room)
                } else {
                    (*width, *height)
                };
                IrBlock::Image {
                    asset: *asset,
                    x: x + (width - w) / 2.0,
                    width: w,
                    height: h,
                    caption: caption.clone(),
                }
            }
            Measured::Table(table) => IrBlock::Table(IrTable {
                rows: table.rows[range].to_vec(),
                continued,
                ..table.clone()
            }),
            Measured::TocLine { section, lines } => IrBlock::TocLine {
                entry: toc[*section].clone(),
                anchor: section_anchor(*section),
                lines: lines.clone(),
            },
        }
    }
}

/// An oversize block detected while measuring.
#[derive(Debug, Clone)]
struct OverflowNote {
    unit: usize,
    what: String,
    height: f32,
    available: f32,
}

/// Collects measured units for one part.
struct MeasuredPart<'c, 'a> {
    theme: &'c Theme,
    layout: &'c LayoutOptions,
    table_ids: &'c Cell<usize>,
    kind: PartKind,
    title: String,
    page_break_before: bool,
    units: Vec<Unit>,
    contents: Vec<Measured<'a>>,
    overflows: Vec<OverflowNote>,
}

impl<'c, 'a> MeasuredPart<'c, 'a> {
    fn content_width(&self) -> f32 {
        self.theme.page.content_width()
    }

    fn content_height(&self) -> f32 {
        self.theme.page.content_height()
    }

    fn push(&mut self, unit: Unit, content: Measured<'a>) {
        self.units.push(unit);
        self.contents.push(content);
    }

    fn heading(&mut self, level: u8, text: &str, anchor: String, section: Option<usize>) {
        let size = heading_size(self.theme, level);
        let lines = wrap_text(text, size, true, self.content_width());
        let (gap, rule) = if level <= 1 {
            (self.layout.block_spacing * 2.0, 8.0)
        } else {
            (self.layout.block_spacing * 1.5, 2.0)
        };
        let height = lines.len() as f32 * self.theme.line_height(size) + rule;
        self.push(
            Unit::heading(height, gap),
            Measured::Heading {
                level,
                text: text.to_string(),
                lines,
                anchor,
                section,
            },
        );
    }

    fn text(&mut self, style: TextStyle, text: &str, gap: f32) {
        let size = style.size(self.theme);
        let lines = wrap_text(text, size, style.bold(), self.content_width());
        self.push(
            Unit::lines(style.line_height(self.theme), lines.len(), gap),
            Measured::Text {
                style,
                text: text.to_string(),
                lines,
            },
        );
    }

    fn image(&mut self, asset: &'a Asset, caption: Option<&str>, max_height: Option<f32>, gap: f32) {
        let content_width = self.content_width();
        let caption_size = self.theme.fonts.caption;
        let caption: Vec<String> = caption
            .filter(|c| !c.is_empty())
            .map(|c| wrap_text(c, caption_size, false, content_width))
            .unwrap_or_default();
        let caption_height = if caption.is_empty() {
            0.0
        } else {
            CAPTION_GAP + caption.len() as f32 * self.theme.line_height(caption_size)
        };

        let aspect = asset.aspect_ratio();
        let mut width = content_width;
        let mut height = width / aspect;
        if let Some(max) = max_height {
            if height > max {
                height = max;
                width = height * aspect;
            }
        }
        let available = self.content_height() - caption_height;
        if height > available {
            self.overflows.push(OverflowNote {
                unit: self.units.len(),
                what: format!("image '{}'", asset.caption()),
                height: height + caption_height,
                available: self.content_height(),
            });
            height = available;
            width = height * aspect;
        }
        debug!(
            width = width as f64,
            height = height as f64,
            pixels_w = asset.width(),
            pixels_h = asset.height(),
            "Image measured"
        );

        self.push(
            Unit::image(height + caption_height, gap),
            Measured::Image {
                asset,
                x: (content_width - width) / 2.0,
                width,
                height,
                caption,
                caption_height,
            },
        );
    }

    fn table(&mut self, columns: &[(&str, f32)], rows: &[Vec<&str>], gap: f32) {
        let size = self.theme.fonts.table;
        let line_height = self.theme.line_height(size);
        let content_width = self.content_width();

        let columns: Vec<IrColumn> = columns
            .iter()
            .map(|(label, fraction)| {
                let width = content_width * fraction;
                IrColumn {
                    label: label.to_string(),
                    width,
                    header_lines: wrap_text(label, size, true, width - 2.0 * TABLE_PADDING),
                }
            })
            .collect();
        let header_height = columns.iter().map(|c| c.header_lines.len()).max().unwrap_or(1) as f32
            * line_height
            + 2.0 * TABLE_PADDING;

        let max_row = self.content_height() - header_height;
        let max_lines = (((max_row - 2.0 * TABLE_PADDING) / line_height).floor() as usize).max(1);

        let mut ir_rows = Vec::with_capacity(rows.len());
        for row in rows {
            let mut truncated = None;
            let cells: Vec<IrCell> = row
                .iter()
                .zip(&columns)
                .map(|(text, column)| {
                    let inner = column.width - 2.0 * TABLE_PADDING;
                    let mut lines = wrap_text(text, size, false, inner);
                    if lines.len() > max_lines {
                        truncated = Some(lines.len());
                        lines.truncate(max_lines);
                        if let Some(last) = lines.last_mut() {
                            *last = truncate_with_ellipsis(last, size, false, inner);
                        }
                    }
                    IrCell {
                        text: text.to_string(),
                        lines,
                    }
                })
                .collect();
            let tallest = cells.iter().map(|c| c.lines.len()).max().unwrap_or(1);
            if let Some(natural_lines) = truncated {
                self.overflows.push(OverflowNote {
                    unit: self.units.len(),
                    what: "table row".to_string(),
                    height: natural_lines as f32 * line_height + 2.0 * TABLE_PADDING,
                    available: max_row,
                });
            }
            ir_rows.push(IrRow {
                cells,
                height: tallest as f32 * line_height + 2.0 * TABLE_PADDING,
            });
        }

        let table_id = self.table_ids.get();
        self.table_ids.set(table_id + 1);
        self.push(
            Unit::rows(header_height, ir_rows.iter().map(|r| r.height).collect(), gap),
            Measured::Table(IrTable {
                table_id,
                columns,
                header_height,
                rows: ir_rows,
                line_height,
                padding: TABLE_PADDING,
                continued: false,
            }),
        );
    }

    fn toc_line(&mut self, section: usize, title: &str) {
        let size = self.theme.fonts.body;
        let lines = wrap_text(title, size, false, self.content_width() - TOC_PAGE_COLUMN);
        let height = lines.len() as f32 * self.theme.line_height(size);
        self.push(Unit::atomic(height, 4.0), Measured::TocLine { section, lines });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CoverMetadata, Kpi, RecommendationTableGroup, ReportSection};
    use chrono::{TimeZone, Utc};

    fn doc(sections: Vec<ReportSection>) -> ReportDocument {
        ReportDocument {
            cover: CoverMetadata {
                report_title: "Service Desk Analytics Report".to_string(),
                client_name: "Acme".to_string(),
                period_label: "Q3 2026".to_string(),
                logo: None,
                generated_at: Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap(),
            },
            kpis: vec![Kpi::new("Tickets", "1,204"), Kpi::new("MTTR", "6.2h")],
            sections,
            appendices: vec![],
        }
    }

    fn solid_png(width: u32, height: u32) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, width, height);
            encoder.set_color(png::ColorType::Rgb);
            encoder.set_depth(png::BitDepth::Eight);
            let pixels = vec![200u8; (width * height * 3) as usize];
            encoder.write_header().unwrap().write_image_data(&pixels).unwrap();
        }
        out
    }

    fn composer() -> DocumentComposer {
        DocumentComposer::new(Theme::default(), LayoutOptions::default())
    }

    #[test]
    fn test_fixed_front_matter_pages() {
        let d = doc(vec![
            ReportSection::new("Volume", vec![ContentBlock::Paragraph("Up 4%.".into())]),
            ReportSection::new("Backlog", vec![ContentBlock::Paragraph("Flat.".into())]),
        ]);
        let c = composer();
        let comp = c.compose(&d);
        let kinds: Vec<_> = comp.ir.parts.iter().map(|p| (p.kind, p.first_page)).collect();
        assert_eq!(
            kinds,
            vec![
                (PartKind::Cover, 1),
                (PartKind::KpiSummary, 2),
                (PartKind::Contents, 2),
                (PartKind::Section(0), 3),
                (PartKind::Section(1), 4),
            ]
        );
        let pages: Vec<_> = comp.toc().iter().map(|t| t.page()).collect();
        assert_eq!(pages, vec![3, 4]);
        assert_eq!(comp.ir.page_count, 4);
        assert!(comp.warnings.is_empty());
    }

    #[test]
    fn test_toc_lines_carry_resolved_pages() {
        let d = doc(vec![ReportSection::new("Volume", vec![])]);
        let c = composer();
        let comp = c.compose(&d);
        let contents = &comp.ir.parts[2];
        let line = contents
            .items
            .iter()
            .find_map(|i| match &i.block {
                IrBlock::TocLine { entry, anchor, .. } => Some((entry.page(), anchor.clone())),
                _ => None,
            })
            .unwrap();
        assert_eq!(line, (3, "_sdx_section_0".to_string()));
    }

    #[test]
    fn test_empty_category_gets_placeholder_line() {
        let group = RecommendationTableGroup {
            cost: vec![RecommendationRow {
                recommendation: "Automate password resets".into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let d = doc(vec![ReportSection::new(
            "Recommendations",
            vec![ContentBlock::Recommendations(group)],
        )]);
        let c = composer();
        let comp = c.compose(&d);
        let section = &comp.ir.parts[3];
        let tables = section
            .items
            .iter()
            .filter(|i| matches!(i.block, IrBlock::Table(_)))
            .count();
        let placeholders = section
            .items
            .iter()
            .filter(|i| matches!(i.block, IrBlock::Text { style: TextStyle::Placeholder, .. }))
            .count();
        assert_eq!(tables, 1);
        assert_eq!(placeholders, 2);
    }

    #[test]
    fn test_items_stay_inside_content_area() {
        let long = "Resolution times improved across every priority band. ".repeat(40);
        let d = doc(vec![ReportSection::new(
            "Narrative",
            vec![ContentBlock::Paragraph(long); 6],
        )]);
        let c = composer();
        let comp = c.compose(&d);
        let limit = c.theme().page.content_height() + 0.01;
        for part in &comp.ir.parts {
            for item in &part.items {
                assert!(item.y + item.height <= limit, "item overruns page {}", item.page);
            }
        }
        assert!(comp.ir.page_count > 4);
    }

    #[test]
    fn test_tall_image_scaled_with_warning() {
        let png = solid_png(10, 40);
        let asset = Asset::from_png(png, "Tall chart").unwrap();
        let d = doc(vec![ReportSection::new("Tall", vec![ContentBlock::Asset(asset)])]);
        let c = composer();
        let comp = c.compose(&d);
        let image = comp.ir.parts[3]
            .items
            .iter()
            .find_map(|i| match &i.block {
                IrBlock::Image { width, height, .. } => Some((*width, *height, i.height)),
                _ => None,
            })
            .unwrap();
        assert!((image.0 / image.1 - 0.25).abs() < 1e-3);
        assert!(image.2 <= c.theme().page.content_height() + 0.01);
        assert_eq!(comp.warnings.len(), 1);
        assert_eq!(comp.warnings.as_slice()[0].section.as_deref(), Some("Tall"));

        // Heading and image share the page the contents entry points to.
        let pages: Vec<_> = comp.ir.parts[3].items.iter().map(|i| i.page).collect();
        assert_eq!(pages, vec![3, 3]);
        assert_eq!(comp.toc()[0].page(), 3);
        assert_eq!(comp.ir.page_count, 3);
    }

    #[test]
    fn test_no_page_ends_with_a_heading() {
        let row = RecommendationRow {
            recommendation: "Route P1 tickets to the on-call queue".into(),
            explanation: "Escalations wait for triage overnight.".into(),
            benefit: "Faster first response".into(),
            cost_calculation: "2h per week".into(),
            evidence: "34 overnight breaches".into(),
        };
        let group = RecommendationTableGroup {
            cost: vec![row.clone(); 3],
            performance: vec![],
            satisfaction: vec![row; 2],
        };
        let sections = (0..24)
            .map(|n| {
                let lead = "Ticket volume moved with the release calendar. ".repeat(n * 9 + 1);
                ReportSection::new(
                    format!("Module {}", n),
                    vec![
                        ContentBlock::Paragraph(lead),
                        ContentBlock::Recommendations(group.clone()),
                        ContentBlock::Paragraph("Closing note.".into()),
                    ],
                )
            })
            .collect();
        let d = doc(sections);
        let c = composer();
        let comp = c.compose(&d);

        let mut last_on_page = std::collections::BTreeMap::new();
        for part in &comp.ir.parts {
            for item in &part.items {
                last_on_page.insert(item.page, matches!(item.block, IrBlock::Heading { .. }));
            }
        }
        for (page, heading) in last_on_page {
            assert!(!heading, "page {} ends with a heading", page);
        }
    }

    #[test]
    fn test_repeated_recommendation_blocks_get_distinct_anchors() {
        let d = doc(vec![ReportSection::new(
            "Recommendations",
            vec![
                ContentBlock::Recommendations(RecommendationTableGroup::default()),
                ContentBlock::Recommendations(RecommendationTableGroup::default()),
            ],
        )]);
        let c = composer();
        let comp = c.compose(&d);
        let anchors: Vec<_> = comp.ir.parts[3]
            .items
            .iter()
            .filter_map(|i| match &i.block {
                IrBlock::Heading { anchor, .. } => Some(anchor.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(anchors.len(), 7);
        let unique: HashSet<_> = anchors.iter().collect();
        assert_eq!(unique.len(), anchors.len());
        assert!(anchors.contains(&"_sdx_section_0_1_cost".to_string()));
    }
}
