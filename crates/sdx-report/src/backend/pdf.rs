//! PDF backend.
//!
//! Draws every IR item at the position pass 1 assigned, using the base-14
//! Helvetica faces the composer measured with. Pages are never re-flowed
//! here; if they were, the resolved table of contents would be wrong.

use super::ReportBackend;
use crate::compose::ir::{heading_size, DocumentIr, IrBlock, IrItem, IrPart, IrTable, CAPTION_GAP};
use crate::compose::metrics::{text_width, win_ansi};
use crate::compose::TocEntry;
use crate::config::{Rgb, Theme};
use crate::error::BackendError;
use crate::model::{Asset, CoverMetadata, OutputFormat};
use crate::warning::{ReportWarning, Warnings};

use chrono::{Datelike, Timelike};
use miniz_oxide::deflate::compress_to_vec_zlib;
use pdf_writer::types::PageMode;
use pdf_writer::{Content, Date, Filter, Name, Pdf, Rect, Ref, Str, TextStr};
use std::io::Cursor;
use tracing::debug;

const FONT_REGULAR: Name<'static> = Name(b"F1");
const FONT_BOLD: Name<'static> = Name(b"F2");
const COMPRESSION: u8 = 6;

/// Finished PDF plus the page each section heading was drawn on.
#[derive(Debug, Clone)]
pub struct PdfRendering {
    pub bytes: Vec<u8>,
    /// Indexed by section.
    pub heading_pages: Vec<usize>,
    /// Images that could not be embedded and were drawn as frames.
    pub warnings: Warnings,
}

struct OutlineEntry {
    title: String,
    page: usize,
    top: f32,
}

/// Decoded image split into colour and alpha planes.
struct DecodedImage {
    width: u32,
    height: u32,
    color: Vec<u8>,
    gray: bool,
    alpha: Option<Vec<u8>>,
}

pub struct PdfBackend<'d> {
    theme: &'d Theme,
    cover: &'d CoverMetadata,
    pdf: Pdf,
    next_id: i32,
    catalog_id: Ref,
    page_tree_id: Ref,
    regular_id: Ref,
    bold_id: Ref,
    info_id: Ref,
    outline_id: Ref,
    pages: Vec<Content>,
    page_images: Vec<Vec<(String, Ref)>>,
    image_count: usize,
    heading_pages: Vec<usize>,
    outline: Vec<OutlineEntry>,
    section: Option<String>,
    warnings: Warnings,
}

impl<'d> PdfBackend<'d> {
    pub fn new(ir: &DocumentIr<'d>) -> Self {
        let page_count = ir.page_count.max(1);
        Self {
            theme: ir.theme,
            cover: ir.cover,
            pdf: Pdf::new(),
            next_id: 7,
            catalog_id: Ref::new(1),
            page_tree_id: Ref::new(2),
            regular_id: Ref::new(3),
            bold_id: Ref::new(4),
            info_id: Ref::new(5),
            outline_id: Ref::new(6),
            pages: (0..page_count).map(|_| Content::new()).collect(),
            page_images: vec![Vec::new(); page_count],
            image_count: 0,
            heading_pages: vec![0; ir.toc.len()],
            outline: Vec::new(),
            section: None,
            warnings: Warnings::new(),
        }
    }

    fn alloc(&mut self) -> Ref {
        let id = Ref::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn left(&self) -> f32 {
        self.theme.page.margin_left
    }

    /// PDF y coordinate of a content-area offset.
    fn top(&self, y: f32) -> f32 {
        self.theme.page.height - self.theme.page.margin_top - y
    }

    fn content(&mut self, page: usize) -> &mut Content {
        let index = page.saturating_sub(1).min(self.pages.len() - 1);
        &mut self.pages[index]
    }

    fn emit_part(&mut self, part: &IrPart<'_>) -> Result<(), BackendError> {
        for item in &part.items {
            self.draw_item(item)?;
        }
        Ok(())
    }

    fn draw_item(&mut self, item: &IrItem<'_>) -> Result<(), BackendError> {
        let top = self.top(item.y);
        let left = self.left();
        let theme = self.theme;

        match &item.block {
            IrBlock::Heading {
                level,
                lines,
                section,
                text,
                ..
            } => {
                let size = heading_size(theme, *level);
                let color = if *level <= 1 {
                    theme.colors.primary
                } else {
                    theme.colors.text
                };
                let content = self.content(item.page);
                let line_height = theme.line_height(size);
                draw_lines(content, lines, FONT_BOLD, size, line_height, color, left, top);
                if *level <= 1 {
                    let rule_y = top - item.height + 3.0;
                    let (r, g, b) = theme.colors.primary.unit();
                    content
                        .set_stroke_rgb(r, g, b)
                        .set_line_width(0.8)
                        .move_to(left, rule_y)
                        .line_to(left + theme.page.content_width(), rule_y)
                        .stroke();
                }
                if let Some(index) = section {
                    if let Some(slot) = self.heading_pages.get_mut(*index) {
                        *slot = item.page;
                    }
                    self.outline.push(OutlineEntry {
                        title: text.clone(),
                        page: item.page,
                        top,
                    });
                }
            }
            IrBlock::Text { style, lines, .. } => {
                let size = style.size(theme);
                let font = if style.bold() { FONT_BOLD } else { FONT_REGULAR };
                let line_height = style.line_height(theme);
                let content = self.content(item.page);
                draw_lines(content, lines, font, size, line_height, style.color(theme), left, top);
            }
            IrBlock::Image {
                asset,
                x,
                width,
                height,
                caption,
            } => {
                let x = left + x;
                let bottom = top - height;
                match self.embed_image(asset, item.page) {
                    Ok(name) => {
                        self.content(item.page)
                            .save_state()
                            .transform([*width, 0.0, 0.0, *height, x, bottom])
                            .x_object(Name(name.as_bytes()))
                            .restore_state();
                    }
                    Err(err) => {
                        self.warnings.push(ReportWarning::embed(
                            self.section.as_deref(),
                            asset.caption(),
                            OutputFormat::Pdf,
                            &err,
                        ));
                        let (r, g, b) = theme.colors.table_border.unit();
                        self.content(item.page)
                            .set_stroke_rgb(r, g, b)
                            .set_line_width(1.0)
                            .rect(x, bottom, *width, *height)
                            .stroke()
                            .move_to(x, bottom)
                            .line_to(x + width, top)
                            .move_to(x, top)
                            .line_to(x + width, bottom)
                            .stroke();
                    }
                }

                let size = theme.fonts.caption;
                let line_height = theme.line_height(size);
                let content_width = theme.page.content_width();
                let content = self.content(item.page);
                for (i, line) in caption.iter().enumerate() {
                    let line_top = bottom - CAPTION_GAP - i as f32 * line_height;
                    let offset = (content_width - text_width(line, size, false)).max(0.0) / 2.0;
                    draw_text(
                        content,
                        FONT_REGULAR,
                        size,
                        theme.colors.muted,
                        left + offset,
                        baseline(line_top, line_height, size),
                        line,
                    );
                }
            }
            IrBlock::Table(table) => {
                let content = self.content(item.page);
                draw_table(content, theme, table, left, top);
            }
            IrBlock::TocLine { entry, lines, .. } => {
                let size = theme.fonts.body;
                let line_height = theme.line_height(size);
                let content = self.content(item.page);
                let color = theme.colors.text;
                draw_lines(content, lines, FONT_REGULAR, size, line_height, color, left, top);
                let number = entry.page().to_string();
                let right = left + theme.page.content_width() - text_width(&number, size, false);
                draw_text(
                    content,
                    FONT_REGULAR,
                    size,
                    theme.colors.text,
                    right,
                    baseline(top, line_height, size),
                    &number,
                );
            }
        }
        Ok(())
    }

    /// Write the image XObject (and soft mask) and register it on `page`.
    fn embed_image(&mut self, asset: &Asset, page: usize) -> Result<String, BackendError> {
        let image = decode_png(asset.png())?;
        let image_id = self.alloc();
        let mask_id = match &image.alpha {
            Some(alpha) => {
                let id = self.alloc();
                let compressed = compress_to_vec_zlib(alpha, COMPRESSION);
                let mut mask = self.pdf.image_xobject(id, &compressed);
                mask.filter(Filter::FlateDecode);
                mask.width(image.width as i32);
                mask.height(image.height as i32);
                mask.color_space().device_gray();
                mask.bits_per_component(8);
                Some(id)
            }
            None => None,
        };

        let compressed = compress_to_vec_zlib(&image.color, COMPRESSION);
        let mut xobject = self.pdf.image_xobject(image_id, &compressed);
        xobject.filter(Filter::FlateDecode);
        xobject.width(image.width as i32);
        xobject.height(image.height as i32);
        if image.gray {
            xobject.color_space().device_gray();
        } else {
            xobject.color_space().device_rgb();
        }
        xobject.bits_per_component(8);
        if let Some(mask_id) = mask_id {
            xobject.s_mask(mask_id);
        }
        drop(xobject);

        self.image_count += 1;
        let name = format!("Im{}", self.image_count);
        let index = page.saturating_sub(1).min(self.page_images.len() - 1);
        self.page_images[index].push((name.clone(), image_id));
        debug!(
            image = %name,
            width = image.width,
            height = image.height,
            alpha = image.alpha.is_some(),
            "Image embedded"
        );
        Ok(name)
    }

    fn draw_footers(&mut self) {
        let theme = self.theme;
        let size = theme.fonts.footer;
        let left = self.left();
        let right_edge = left + theme.page.content_width();
        let y = theme.page.margin_bottom / 2.0;
        let label = self.cover.footer_label();
        let total = self.pages.len();

        for (index, content) in self.pages.iter_mut().enumerate().skip(1) {
            let number = format!("Page {} of {}", index + 1, total);
            draw_text(content, FONT_REGULAR, size, theme.colors.muted, left, y, &label);
            draw_text(
                content,
                FONT_REGULAR,
                size,
                theme.colors.muted,
                right_edge - text_width(&number, size, false),
                y,
                &number,
            );
        }
    }
}

impl ReportBackend for PdfBackend<'_> {
    type Output = PdfRendering;

    fn format(&self) -> OutputFormat {
        OutputFormat::Pdf
    }

    fn emit_cover(&mut self, part: &IrPart<'_>) -> Result<(), BackendError> {
        self.section = None;
        self.emit_part(part)
    }

    fn emit_kpi_summary(&mut self, part: &IrPart<'_>) -> Result<(), BackendError> {
        self.emit_part(part)
    }

    fn emit_toc(&mut self, part: &IrPart<'_>, _toc: &[TocEntry]) -> Result<(), BackendError> {
        self.emit_part(part)
    }

    fn emit_section(&mut self, _index: usize, part: &IrPart<'_>) -> Result<(), BackendError> {
        self.section = Some(part.title.clone());
        self.emit_part(part)
    }

    fn emit_appendix(&mut self, _index: usize, part: &IrPart<'_>) -> Result<(), BackendError> {
        self.section = None;
        self.emit_part(part)
    }

    fn finish(mut self) -> Result<PdfRendering, BackendError> {
        self.draw_footers();

        let page_count = self.pages.len();
        let page_ids: Vec<Ref> = (0..page_count).map(|_| self.alloc()).collect();
        let content_ids: Vec<Ref> = (0..page_count).map(|_| self.alloc()).collect();
        let outline_ids: Vec<Ref> = (0..self.outline.len()).map(|_| self.alloc()).collect();

        let Self {
            theme,
            cover,
            mut pdf,
            catalog_id,
            page_tree_id,
            regular_id,
            bold_id,
            info_id,
            outline_id,
            pages,
            page_images,
            heading_pages,
            outline,
            warnings,
            ..
        } = self;

        for (i, content) in pages.into_iter().enumerate() {
            let raw = content.finish();
            let compressed = compress_to_vec_zlib(raw.as_slice(), COMPRESSION);
            pdf.stream(content_ids[i], &compressed).filter(Filter::FlateDecode);
        }

        pdf.type1_font(regular_id)
            .base_font(Name(b"Helvetica"))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
        pdf.type1_font(bold_id)
            .base_font(Name(b"Helvetica-Bold"))
            .encoding_predefined(Name(b"WinAnsiEncoding"));

        pdf.pages(page_tree_id)
            .kids(page_ids.iter().copied())
            .count(page_count as i32);

        for (i, page_id) in page_ids.iter().enumerate() {
            let mut page = pdf.page(*page_id);
            page.media_box(Rect::new(0.0, 0.0, theme.page.width, theme.page.height))
                .parent(page_tree_id)
                .contents(content_ids[i]);
            let mut resources = page.resources();
            resources
                .fonts()
                .pair(FONT_REGULAR, regular_id)
                .pair(FONT_BOLD, bold_id);
            if !page_images[i].is_empty() {
                let mut xobjects = resources.x_objects();
                for (name, id) in &page_images[i] {
                    xobjects.pair(Name(name.as_bytes()), *id);
                }
            }
        }

        if !outline.is_empty() {
            let last = outline_ids.len() - 1;
            pdf.outline(outline_id)
                .first(outline_ids[0])
                .last(outline_ids[last])
                .count(outline_ids.len() as i32);
            for (i, entry) in outline.iter().enumerate() {
                let mut item = pdf.outline_item(outline_ids[i]);
                item.parent(outline_id).title(TextStr(&entry.title));
                if i > 0 {
                    item.prev(outline_ids[i - 1]);
                }
                if i < last {
                    item.next(outline_ids[i + 1]);
                }
                let target = page_ids[entry.page.saturating_sub(1).min(page_count - 1)];
                item.dest().page(target).xyz(0.0, entry.top, None);
            }
        }

        {
            let mut catalog = pdf.catalog(catalog_id);
            catalog.pages(page_tree_id);
            if !outline.is_empty() {
                catalog.outlines(outline_id).page_mode(PageMode::UseOutlines);
            }
        }

        let at = cover.generated_at;
        let created = Date::new(at.year().clamp(0, 9999) as u16)
            .month(at.month() as u8)
            .day(at.day() as u8)
            .hour(at.hour() as u8)
            .minute(at.minute() as u8)
            .second(at.second() as u8)
            .utc_offset_hour(0)
            .utc_offset_minute(0);
        let subject = cover.footer_label();
        pdf.document_info(info_id)
            .title(TextStr(&cover.report_title))
            .subject(TextStr(&subject))
            .producer(TextStr(concat!("sdx-report ", env!("CARGO_PKG_VERSION"))))
            .creation_date(created);

        let bytes = pdf.finish();
        debug!(bytes = bytes.len(), pages = page_count, "PDF assembled");
        Ok(PdfRendering {
            bytes,
            heading_pages,
            warnings,
        })
    }
}

/// Baseline of a line whose box starts at `top`.
fn baseline(top: f32, line_height: f32, size: f32) -> f32 {
    top - (line_height - size) / 2.0 - size * 0.78
}

fn draw_text(content: &mut Content, font: Name, size: f32, color: Rgb, x: f32, y: f32, text: &str) {
    if text.is_empty() {
        return;
    }
    let (r, g, b) = color.unit();
    let bytes = win_ansi(text);
    content.set_fill_rgb(r, g, b);
    content
        .begin_text()
        .set_font(font, size)
        .next_line(x, y)
        .show(Str(&bytes))
        .end_text();
}

#[allow(clippy::too_many_arguments)]
fn draw_lines(
    content: &mut Content,
    lines: &[String],
    font: Name,
    size: f32,
    line_height: f32,
    color: Rgb,
    x: f32,
    top: f32,
) {
    for (i, line) in lines.iter().enumerate() {
        let line_top = top - i as f32 * line_height;
        draw_text(content, font, size, color, x, baseline(line_top, line_height, size), line);
    }
}

fn draw_table(content: &mut Content, theme: &Theme, table: &IrTable, left: f32, top: f32) {
    let size = theme.fonts.table;
    let lh = table.line_height;
    let pad = table.padding;
    let total_width: f32 = table.columns.iter().map(|c| c.width).sum();

    let (r, g, b) = theme.colors.table_header_fill.unit();
    content
        .set_fill_rgb(r, g, b)
        .rect(left, top - table.header_height, total_width, table.header_height)
        .fill_nonzero();

    let mut x = left;
    for column in &table.columns {
        let lines = &column.header_lines;
        draw_lines(content, lines, FONT_BOLD, size, lh, theme.colors.text, x + pad, top - pad);
        x += column.width;
    }

    let mut row_top = top - table.header_height;
    for row in &table.rows {
        let mut x = left;
        for (cell, column) in row.cells.iter().zip(&table.columns) {
            let color = theme.colors.text;
            draw_lines(content, &cell.lines, FONT_REGULAR, size, lh, color, x + pad, row_top - pad);
            x += column.width;
        }
        row_top -= row.height;
    }

    let (r, g, b) = theme.colors.table_border.unit();
    content.set_stroke_rgb(r, g, b).set_line_width(0.5);
    let bottom = row_top;
    content.rect(left, bottom, total_width, top - bottom).stroke();
    let mut y = top - table.header_height;
    content.move_to(left, y).line_to(left + total_width, y);
    for row in table.rows.iter().take(table.rows.len().saturating_sub(1)) {
        y -= row.height;
        content.move_to(left, y).line_to(left + total_width, y);
    }
    let mut x = left;
    for column in table.columns.iter().take(table.columns.len().saturating_sub(1)) {
        x += column.width;
        content.move_to(x, top).line_to(x, bottom);
    }
    content.stroke();
}

fn decode_png(bytes: &[u8]) -> Result<DecodedImage, BackendError> {
    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info()?;
    let mut buf = vec![0u8; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf)?;
    buf.truncate(info.buffer_size());

    let split = |channels: usize| -> (Vec<u8>, Vec<u8>) {
        let color_channels = channels - 1;
        let mut color = Vec::with_capacity(buf.len() / channels * color_channels);
        let mut alpha = Vec::with_capacity(buf.len() / channels);
        for px in buf.chunks_exact(channels) {
            color.extend_from_slice(&px[..color_channels]);
            alpha.push(px[color_channels]);
        }
        (color, alpha)
    };
    let keep_alpha = |alpha: Vec<u8>| -> Option<Vec<u8>> {
        if alpha.iter().all(|a| *a == 255) {
            None
        } else {
            Some(alpha)
        }
    };

    let (color, gray, alpha) = match info.color_type {
        png::ColorType::Rgb => (buf.clone(), false, None),
        png::ColorType::Grayscale => (buf.clone(), true, None),
        png::ColorType::Rgba => {
            let (color, alpha) = split(4);
            (color, false, keep_alpha(alpha))
        }
        png::ColorType::GrayscaleAlpha => {
            let (color, alpha) = split(2);
            (color, true, keep_alpha(alpha))
        }
        png::ColorType::Indexed => {
            return Err(BackendError::ImageDecode(
                "palette image was not expanded".to_string(),
            ))
        }
    };

    Ok(DecodedImage {
        width: info.width,
        height: info.height,
        color,
        gray,
        alpha,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::DocumentComposer;
    use crate::config::LayoutOptions;
    use crate::model::{ContentBlock, ReportDocument, ReportSection};
    use chrono::{TimeZone, Utc};

    fn rgba_png(width: u32, height: u32, alpha: u8) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, width, height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let pixels: Vec<u8> = (0..width * height).flat_map(|_| [10, 20, 30, alpha]).collect();
            encoder.write_header().unwrap().write_image_data(&pixels).unwrap();
        }
        out
    }

    fn document(blocks: Vec<ContentBlock>) -> ReportDocument {
        ReportDocument {
            cover: CoverMetadata {
                report_title: "Service Desk Analytics Report".to_string(),
                client_name: "Acme".to_string(),
                period_label: "Q3 2026".to_string(),
                logo: None,
                generated_at: Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap(),
            },
            kpis: vec![],
            sections: vec![
                ReportSection::new("Volume", blocks),
                ReportSection::new("Backlog", vec![]),
            ],
            appendices: vec![],
        }
    }

    fn render(doc: &ReportDocument) -> PdfRendering {
        let composer = DocumentComposer::new(Theme::default(), LayoutOptions::default());
        let composition = composer.compose(doc);
        crate::backend::drive(&composition.ir, PdfBackend::new(&composition.ir)).unwrap()
    }

    #[test]
    fn test_decode_png_splits_alpha() {
        let image = decode_png(&rgba_png(2, 2, 128)).unwrap();
        assert_eq!(image.color.len(), 12);
        assert_eq!(image.alpha.as_ref().map(Vec::len), Some(4));
        assert!(!image.gray);

        let opaque = decode_png(&rgba_png(2, 2, 255)).unwrap();
        assert!(opaque.alpha.is_none());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_png(b"not a png"),
            Err(BackendError::ImageDecode(_))
        ));
    }

    #[test]
    fn test_pdf_structure() {
        let asset = Asset::from_png(rgba_png(16, 9, 200), "Weekly volume").unwrap();
        let rendering = render(&document(vec![ContentBlock::Asset(asset)]));
        let bytes = &rendering.bytes;
        assert!(bytes.starts_with(b"%PDF-"));
        let text = String::from_utf8_lossy(bytes);
        assert!(text.contains("/Helvetica-Bold"));
        assert!(text.contains("/WinAnsiEncoding"));
        assert!(text.contains("/SMask"));
        assert!(text.contains("/Outlines"));
        assert!(text.contains("/Count 4"));
        assert_eq!(rendering.heading_pages, vec![3, 4]);
    }

    #[test]
    fn test_unembeddable_image_is_reported() {
        let broken = Asset::rendered(b"\x89PNG broken".to_vec(), 16, 9, "Weekly volume".into());
        let rendering = render(&document(vec![ContentBlock::Asset(broken)]));
        assert!(rendering.bytes.starts_with(b"%PDF-"));
        let warnings = rendering.warnings.as_slice();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, crate::warning::WarningKind::AssetRender);
        assert_eq!(warnings[0].section.as_deref(), Some("Volume"));
        assert_eq!(warnings[0].asset.as_deref(), Some("Weekly volume"));
        assert!(!String::from_utf8_lossy(&rendering.bytes).contains("/Im1"));
    }

    #[test]
    fn test_pdf_is_deterministic() {
        let doc = document(vec![ContentBlock::Paragraph("Tickets rose 4%.".into())]);
        assert_eq!(render(&doc).bytes, render(&doc).bytes);
    }

    #[test]
    fn test_baseline_inside_line_box() {
        let y = baseline(100.0, 13.5, 10.0);
        assert!(y < 100.0 && y > 100.0 - 13.5);
    }
}
