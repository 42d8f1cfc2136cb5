//! WordprocessingML (DOCX) backend.
//!
//! The viewer paginates a DOCX itself, so this backend ignores the pass-1
//! page assignment. It keeps the IR order, inserts a hard page break before
//! each part that opens a page, merges table fragments back into one native
//! table with a repeating header row, and lets `PAGEREF` fields resolve the
//! contents page numbers when the document is opened.

use super::ReportBackend;
use crate::compose::ir::{DocumentIr, IrBlock, IrItem, IrPart, IrTable, TextStyle};
use crate::compose::TocEntry;
use crate::config::Theme;
use crate::error::BackendError;
use crate::model::{CoverMetadata, OutputFormat};

use chrono::SecondsFormat;
use std::fmt::Write as _;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_WP: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_PIC: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const XML_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// EMU per PDF point.
const EMU_PER_PT: f32 = 12_700.0;
/// Relationship ids below this are reserved for styles, settings and footer.
const FIRST_IMAGE_REL: usize = 4;

fn twips(pt: f32) -> i64 {
    (pt * 20.0).round() as i64
}

fn half_points(pt: f32) -> u32 {
    (pt * 2.0).round() as u32
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if (c as u32) < 0x20 && c != '\t' && c != '\n' && c != '\r' => {}
            c => out.push(c),
        }
    }
    out
}

/// Runs for `text`, turning newlines into `w:br`.
fn runs(text: &str, bold: bool) -> String {
    let rpr = if bold { "<w:rPr><w:b/></w:rPr>" } else { "" };
    let mut out = String::new();
    for (i, line) in text.split('\n').enumerate() {
        out.push_str("<w:r>");
        out.push_str(rpr);
        if i > 0 {
            out.push_str("<w:br/>");
        }
        let _ = write!(out, r#"<w:t xml:space="preserve">{}</w:t></w:r>"#, escape(line));
    }
    out
}

fn paragraph(style: Option<&str>, text: &str) -> String {
    let ppr = match style {
        Some(style) => format!(r#"<w:pPr><w:pStyle w:val="{}"/></w:pPr>"#, style),
        None => String::new(),
    };
    format!("<w:p>{}{}</w:p>", ppr, runs(text, false))
}

fn style_id(style: TextStyle) -> Option<&'static str> {
    match style {
        TextStyle::Title => Some("Title"),
        TextStyle::Subtitle => Some("Subtitle"),
        TextStyle::Body => None,
        TextStyle::Muted | TextStyle::Placeholder => Some("Placeholder"),
        TextStyle::Caption => Some("Caption"),
    }
}

/// Rows collected from consecutive fragments of one table.
struct OpenTable {
    table_id: usize,
    head: IrTable,
    rows: Vec<Vec<String>>,
}

pub struct DocxBackend<'d> {
    theme: &'d Theme,
    cover: &'d CoverMetadata,
    body: String,
    media: Vec<Vec<u8>>,
    open_table: Option<OpenTable>,
    parts_emitted: usize,
    bookmarks: usize,
}

impl<'d> DocxBackend<'d> {
    pub fn new(ir: &DocumentIr<'d>) -> Self {
        Self {
            theme: ir.theme,
            cover: ir.cover,
            body: String::new(),
            media: Vec::new(),
            open_table: None,
            parts_emitted: 0,
            bookmarks: 0,
        }
    }

    fn emit_part(&mut self, part: &IrPart<'_>) -> Result<(), BackendError> {
        if self.parts_emitted > 0 && part.page_break_before {
            self.flush_table();
            self.body
                .push_str(r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#);
        }
        self.parts_emitted += 1;
        for item in &part.items {
            self.emit_item(item);
        }
        self.flush_table();
        Ok(())
    }

    fn emit_item(&mut self, item: &IrItem<'_>) {
        if let IrBlock::Table(table) = &item.block {
            self.push_table(table);
            return;
        }
        self.flush_table();

        match &item.block {
            IrBlock::Heading {
                level, text, anchor, ..
            } => {
                let id = self.bookmarks;
                self.bookmarks += 1;
                let style = if *level <= 1 { "Heading1" } else { "Heading2" };
                let _ = write!(
                    self.body,
                    r#"<w:p><w:pPr><w:pStyle w:val="{style}"/></w:pPr><w:bookmarkStart w:id="{id}" w:name="{}"/>{}<w:bookmarkEnd w:id="{id}"/></w:p>"#,
                    escape(anchor),
                    runs(text, false)
                );
            }
            IrBlock::Text {
                style,
                text,
                continued,
                ..
            } => {
                if !continued {
                    self.body.push_str(&paragraph(style_id(*style), text));
                }
            }
            IrBlock::Image {
                asset,
                width,
                height,
                ..
            } => {
                self.media.push(asset.png().to_vec());
                let n = self.media.len();
                let rel = format!("rId{}", FIRST_IMAGE_REL + n - 1);
                let cx = (width * EMU_PER_PT).round() as i64;
                let cy = (height * EMU_PER_PT).round() as i64;
                let descr = escape(asset.caption());
                let _ = write!(
                    self.body,
                    r#"<w:p><w:pPr><w:jc w:val="center"/><w:keepNext/></w:pPr><w:r><w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0"><wp:extent cx="{cx}" cy="{cy}"/><wp:docPr id="{n}" name="Picture {n}" descr="{descr}"/><wp:cNvGraphicFramePr><a:graphicFrameLocks noChangeAspect="1"/></wp:cNvGraphicFramePr><a:graphic><a:graphicData uri="{NS_PIC}"><pic:pic><pic:nvPicPr><pic:cNvPr id="{n}" name="image{n}.png"/><pic:cNvPicPr/></pic:nvPicPr><pic:blipFill><a:blip r:embed="{rel}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill><pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#
                );
                if !asset.caption().is_empty() {
                    self.body.push_str(&paragraph(Some("Caption"), asset.caption()));
                }
            }
            IrBlock::TocLine { entry, anchor, .. } => {
                let tab = twips(self.theme.page.content_width());
                let anchor = escape(anchor);
                let _ = write!(
                    self.body,
                    r#"<w:p><w:pPr><w:pStyle w:val="TOC1"/><w:tabs><w:tab w:val="right" w:leader="dot" w:pos="{tab}"/></w:tabs></w:pPr><w:hyperlink w:anchor="{anchor}" w:history="1">{}</w:hyperlink><w:r><w:tab/></w:r><w:fldSimple w:instr=" PAGEREF {anchor} \h "><w:r><w:t></w:t></w:r></w:fldSimple></w:p>"#,
                    runs(entry.title(), false)
                );
            }
            IrBlock::Table(_) => {}
        }
    }

    fn push_table(&mut self, table: &IrTable) {
        let rows = table
            .rows
            .iter()
            .map(|r| r.cells.iter().map(|c| c.text.clone()).collect())
            .collect::<Vec<Vec<String>>>();
        match &mut self.open_table {
            Some(open) if open.table_id == table.table_id => open.rows.extend(rows),
            _ => {
                self.flush_table();
                self.open_table = Some(OpenTable {
                    table_id: table.table_id,
                    head: table.clone(),
                    rows,
                });
            }
        }
    }

    fn flush_table(&mut self) {
        let Some(open) = self.open_table.take() else {
            return;
        };
        let columns = &open.head.columns;
        let total: i64 = columns.iter().map(|c| twips(c.width)).sum();
        let border = self.theme.colors.table_border.hex();
        let fill = self.theme.colors.table_header_fill.hex();

        let body = &mut self.body;
        let _ = write!(
            body,
            r#"<w:tbl><w:tblPr><w:tblStyle w:val="ReportTable"/><w:tblW w:w="{total}" w:type="dxa"/><w:tblLayout w:type="fixed"/><w:tblBorders>"#
        );
        for edge in ["top", "left", "bottom", "right", "insideH", "insideV"] {
            let _ = write!(
                body,
                r#"<w:{edge} w:val="single" w:sz="4" w:space="0" w:color="{border}"/>"#
            );
        }
        body.push_str("</w:tblBorders></w:tblPr><w:tblGrid>");
        for column in columns {
            let _ = write!(body, r#"<w:gridCol w:w="{}"/>"#, twips(column.width));
        }
        body.push_str("</w:tblGrid>");

        body.push_str("<w:tr><w:trPr><w:tblHeader/><w:cantSplit/></w:trPr>");
        for column in columns {
            let _ = write!(
                body,
                r#"<w:tc><w:tcPr><w:tcW w:w="{}" w:type="dxa"/><w:shd w:val="clear" w:color="auto" w:fill="{fill}"/></w:tcPr><w:p><w:pPr><w:pStyle w:val="TableText"/></w:pPr>{}</w:p></w:tc>"#,
                twips(column.width),
                runs(&column.label, true)
            );
        }
        body.push_str("</w:tr>");

        for row in &open.rows {
            body.push_str("<w:tr><w:trPr><w:cantSplit/></w:trPr>");
            for (text, column) in row.iter().zip(columns) {
                let _ = write!(
                    body,
                    r#"<w:tc><w:tcPr><w:tcW w:w="{}" w:type="dxa"/></w:tcPr><w:p><w:pPr><w:pStyle w:val="TableText"/></w:pPr>{}</w:p></w:tc>"#,
                    twips(column.width),
                    runs(text, false)
                );
            }
            body.push_str("</w:tr>");
        }
        body.push_str("</w:tbl>");
        // A table directly followed by another table would merge in the viewer.
        body.push_str(r#"<w:p><w:pPr><w:spacing w:after="0"/></w:pPr></w:p>"#);
    }

    fn document_xml(&self) -> String {
        let page = &self.theme.page;
        let mut xml = String::with_capacity(self.body.len() + 1024);
        let _ = write!(
            xml,
            r#"{XML_HEADER}<w:document xmlns:w="{NS_W}" xmlns:r="{NS_R}" xmlns:wp="{NS_WP}" xmlns:a="{NS_A}" xmlns:pic="{NS_PIC}"><w:body>"#
        );
        xml.push_str(&self.body);
        let _ = write!(
            xml,
            r#"<w:sectPr><w:footerReference w:type="default" r:id="rId3"/><w:pgSz w:w="{}" w:h="{}"/><w:pgMar w:top="{}" w:right="{}" w:bottom="{}" w:left="{}" w:header="0" w:footer="{}" w:gutter="0"/><w:titlePg/></w:sectPr></w:body></w:document>"#,
            twips(page.width),
            twips(page.height),
            twips(page.margin_top),
            twips(page.margin_right),
            twips(page.margin_bottom),
            twips(page.margin_left),
            twips(page.margin_bottom / 2.0),
        );
        xml
    }

    fn styles_xml(&self) -> String {
        let theme = self.theme;
        let fonts = &theme.fonts;
        let text = theme.colors.text.hex();
        let primary = theme.colors.primary.hex();
        let muted = theme.colors.muted.hex();
        let line = (theme.line_spacing * 240.0).round() as u32;

        let mut xml = String::new();
        let _ = write!(
            xml,
            r#"{XML_HEADER}<w:styles xmlns:w="{NS_W}"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Helvetica" w:hAnsi="Helvetica" w:cs="Arial"/><w:color w:val="{text}"/><w:sz w:val="{}"/></w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:after="{}" w:line="{line}" w:lineRule="auto"/></w:pPr></w:pPrDefault></w:docDefaults>"#,
            half_points(fonts.body),
            twips(6.0),
        );
        let _ = write!(
            xml,
            r#"<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style>"#
        );
        let mut para = |id: &str, ppr: String, rpr: String| {
            let _ = write!(
                xml,
                r#"<w:style w:type="paragraph" w:styleId="{id}"><w:name w:val="{id}"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr>{ppr}</w:pPr><w:rPr>{rpr}</w:rPr></w:style>"#
            );
        };
        para(
            "Title",
            format!(r#"<w:spacing w:before="{}" w:after="{}"/>"#, twips(24.0), twips(12.0)),
            format!(r#"<w:b/><w:color w:val="{primary}"/><w:sz w:val="{}"/>"#, half_points(fonts.title)),
        );
        para(
            "Subtitle",
            String::new(),
            format!(r#"<w:sz w:val="{}"/>"#, half_points(fonts.subheading)),
        );
        para(
            "Heading1",
            format!(
                r#"<w:keepNext/><w:keepLines/><w:spacing w:before="{}" w:after="{}"/><w:pBdr><w:bottom w:val="single" w:sz="6" w:space="1" w:color="{primary}"/></w:pBdr><w:outlineLvl w:val="0"/>"#,
                twips(20.0),
                twips(8.0)
            ),
            format!(r#"<w:b/><w:color w:val="{primary}"/><w:sz w:val="{}"/>"#, half_points(fonts.heading)),
        );
        para(
            "Heading2",
            format!(
                r#"<w:keepNext/><w:keepLines/><w:spacing w:before="{}" w:after="{}"/><w:outlineLvl w:val="1"/>"#,
                twips(15.0),
                twips(2.0)
            ),
            format!(r#"<w:b/><w:sz w:val="{}"/>"#, half_points(fonts.subheading)),
        );
        para(
            "Caption",
            r#"<w:jc w:val="center"/>"#.to_string(),
            format!(r#"<w:color w:val="{muted}"/><w:sz w:val="{}"/>"#, half_points(fonts.caption)),
        );
        para(
            "Placeholder",
            String::new(),
            format!(r#"<w:i/><w:color w:val="{muted}"/>"#),
        );
        para("TOC1", format!(r#"<w:spacing w:after="{}"/>"#, twips(4.0)), String::new());
        para(
            "TableText",
            r#"<w:spacing w:after="0" w:line="240" w:lineRule="auto"/>"#.to_string(),
            format!(r#"<w:sz w:val="{}"/>"#, half_points(fonts.table)),
        );
        para(
            "Footer",
            String::new(),
            format!(r#"<w:color w:val="{muted}"/><w:sz w:val="{}"/>"#, half_points(fonts.footer)),
        );
        let _ = write!(
            xml,
            r#"<w:style w:type="table" w:styleId="ReportTable"><w:name w:val="Report Table"/><w:tblPr><w:tblCellMar><w:top w:w="{pad}" w:type="dxa"/><w:left w:w="{pad}" w:type="dxa"/><w:bottom w:w="{pad}" w:type="dxa"/><w:right w:w="{pad}" w:type="dxa"/></w:tblCellMar></w:tblPr></w:style></w:styles>"#,
            pad = twips(3.0)
        );
        xml
    }

    fn footer_xml(&self) -> String {
        let tab = twips(self.theme.page.content_width());
        format!(
            r#"{XML_HEADER}<w:ftr xmlns:w="{NS_W}" xmlns:r="{NS_R}"><w:p><w:pPr><w:pStyle w:val="Footer"/><w:tabs><w:tab w:val="right" w:pos="{tab}"/></w:tabs></w:pPr>{}<w:r><w:tab/><w:t xml:space="preserve">Page </w:t></w:r><w:fldSimple w:instr=" PAGE "><w:r><w:t>1</w:t></w:r></w:fldSimple><w:r><w:t xml:space="preserve"> of </w:t></w:r><w:fldSimple w:instr=" NUMPAGES "><w:r><w:t>1</w:t></w:r></w:fldSimple></w:p></w:ftr>"#,
            runs(&self.cover.footer_label(), false)
        )
    }

    fn content_types_xml(&self) -> String {
        let wml = "application/vnd.openxmlformats-officedocument.wordprocessingml";
        format!(
            r#"{XML_HEADER}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Override PartName="/word/document.xml" ContentType="{wml}.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="{wml}.styles+xml"/><Override PartName="/word/settings.xml" ContentType="{wml}.settings+xml"/><Override PartName="/word/footer1.xml" ContentType="{wml}.footer+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/><Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/></Types>"#
        )
    }

    fn document_rels_xml(&self) -> String {
        let mut xml = format!(
            r#"{XML_HEADER}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL_BASE}/styles" Target="styles.xml"/><Relationship Id="rId2" Type="{REL_BASE}/settings" Target="settings.xml"/><Relationship Id="rId3" Type="{REL_BASE}/footer" Target="footer1.xml"/>"#
        );
        for n in 1..=self.media.len() {
            let _ = write!(
                xml,
                r#"<Relationship Id="rId{}" Type="{REL_BASE}/image" Target="media/image{n}.png"/>"#,
                FIRST_IMAGE_REL + n - 1
            );
        }
        xml.push_str("</Relationships>");
        xml
    }

    fn core_xml(&self) -> String {
        let created = self
            .cover
            .generated_at
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        format!(
            r#"{XML_HEADER}<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:title>{}</dc:title><dc:subject>{}</dc:subject><dc:creator>sdx-report</dc:creator><dcterms:created xsi:type="dcterms:W3CDTF">{created}</dcterms:created><dcterms:modified xsi:type="dcterms:W3CDTF">{created}</dcterms:modified></cp:coreProperties>"#,
            escape(&self.cover.report_title),
            escape(&self.cover.footer_label()),
        )
    }
}

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/></Relationships>"#;

const APP_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"><Application>sdx-report</Application></Properties>"#;

const SETTINGS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:settings xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:updateFields w:val="true"/><w:defaultTabStop w:val="720"/><w:compat><w:compatSetting w:name="compatibilityMode" w:uri="http://schemas.microsoft.com/office/word" w:val="15"/></w:compat></w:settings>"#;

impl ReportBackend for DocxBackend<'_> {
    type Output = Vec<u8>;

    fn format(&self) -> OutputFormat {
        OutputFormat::Docx
    }

    fn emit_cover(&mut self, part: &IrPart<'_>) -> Result<(), BackendError> {
        self.emit_part(part)
    }

    fn emit_kpi_summary(&mut self, part: &IrPart<'_>) -> Result<(), BackendError> {
        self.emit_part(part)
    }

    fn emit_toc(&mut self, part: &IrPart<'_>, _toc: &[TocEntry]) -> Result<(), BackendError> {
        self.emit_part(part)
    }

    fn emit_section(&mut self, _index: usize, part: &IrPart<'_>) -> Result<(), BackendError> {
        self.emit_part(part)
    }

    fn emit_appendix(&mut self, _index: usize, part: &IrPart<'_>) -> Result<(), BackendError> {
        self.emit_part(part)
    }

    fn finish(mut self) -> Result<Vec<u8>, BackendError> {
        self.flush_table();

        let mut entries: Vec<(String, Vec<u8>)> = vec![
            ("[Content_Types].xml".to_string(), self.content_types_xml().into_bytes()),
            ("_rels/.rels".to_string(), ROOT_RELS.as_bytes().to_vec()),
            ("docProps/core.xml".to_string(), self.core_xml().into_bytes()),
            ("docProps/app.xml".to_string(), APP_XML.as_bytes().to_vec()),
            ("word/document.xml".to_string(), self.document_xml().into_bytes()),
            ("word/styles.xml".to_string(), self.styles_xml().into_bytes()),
            ("word/settings.xml".to_string(), SETTINGS_XML.as_bytes().to_vec()),
            ("word/footer1.xml".to_string(), self.footer_xml().into_bytes()),
            ("word/_rels/document.xml.rels".to_string(), self.document_rels_xml().into_bytes()),
        ];
        for (i, png) in self.media.iter().enumerate() {
            entries.push((format!("word/media/image{}.png", i + 1), png.clone()));
        }

        let mut buffer = Cursor::new(Vec::new());
        {
            let mut zip = ZipWriter::new(&mut buffer);
            let options: FileOptions<'_, ()> = FileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .last_modified_time(zip::DateTime::default())
                .unix_permissions(0o644);

            for (name, data) in &entries {
                zip.start_file(name.as_str(), options)?;
                zip.write_all(data)?;
            }
            zip.finish()?;
        }

        let bytes = buffer.into_inner();
        debug!(
            entries = entries.len(),
            images = self.media.len(),
            bytes = bytes.len(),
            "DOCX package assembled"
        );
        Ok(bytes)
    }
}
