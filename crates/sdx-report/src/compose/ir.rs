//! Format-agnostic intermediate representation of a laid-out report.
//!
//! Every item carries the page and vertical offset decided by pass 1.
//! Text arrives pre-wrapped and images pre-scaled; a backend that honours
//! the placement draws exactly what was measured.

use super::flow::TocEntry;
use crate::config::{Rgb, Theme};
use crate::model::{Asset, CoverMetadata};

/// Role of a run of text; backends map it to font, size and colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStyle {
    /// Cover title.
    Title,
    /// Cover detail lines.
    Subtitle,
    /// Narrative text.
    Body,
    /// Secondary text such as the generation timestamp.
    Muted,
    /// "No data" notices.
    Placeholder,
    /// Image captions.
    Caption,
}

impl TextStyle {
    pub fn size(&self, theme: &Theme) -> f32 {
        match self {
            TextStyle::Title => theme.fonts.title,
            TextStyle::Subtitle => theme.fonts.subheading,
            TextStyle::Body | TextStyle::Muted | TextStyle::Placeholder => theme.fonts.body,
            TextStyle::Caption => theme.fonts.caption,
        }
    }

    pub fn bold(&self) -> bool {
        matches!(self, TextStyle::Title)
    }

    pub fn color(&self, theme: &Theme) -> Rgb {
        match self {
            TextStyle::Title => theme.colors.primary,
            TextStyle::Subtitle | TextStyle::Body => theme.colors.text,
            TextStyle::Muted | TextStyle::Placeholder | TextStyle::Caption => theme.colors.muted,
        }
    }

    pub fn line_height(&self, theme: &Theme) -> f32 {
        theme.line_height(self.size(theme))
    }
}

/// Space between an image and its caption.
pub const CAPTION_GAP: f32 = 4.0;

/// Font size for a heading level.
pub fn heading_size(theme: &Theme, level: u8) -> f32 {
    if level <= 1 {
        theme.fonts.heading
    } else {
        theme.fonts.subheading
    }
}

/// Which top-level part an [`IrPart`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    Cover,
    KpiSummary,
    Contents,
    /// Index into the document's sections.
    Section(usize),
    /// Index into the document's appendices.
    Appendix(usize),
}

/// A table column.
#[derive(Debug, Clone, PartialEq)]
pub struct IrColumn {
    pub label: String,
    pub width: f32,
    pub header_lines: Vec<String>,
}

/// A table cell: source text plus its wrapped lines.
#[derive(Debug, Clone, PartialEq)]
pub struct IrCell {
    pub text: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IrRow {
    pub cells: Vec<IrCell>,
    pub height: f32,
}

/// A table fragment: the header plus the rows placed on one page.
#[derive(Debug, Clone, PartialEq)]
pub struct IrTable {
    /// Identifies all fragments of one logical table.
    pub table_id: usize,
    pub columns: Vec<IrColumn>,
    pub header_height: f32,
    pub rows: Vec<IrRow>,
    pub line_height: f32,
    pub padding: f32,
    /// Whether this fragment continues a table from a previous page.
    pub continued: bool,
}

/// A drawable block.
#[derive(Debug, Clone, PartialEq)]
pub enum IrBlock<'a> {
    Heading {
        level: u8,
        text: String,
        lines: Vec<String>,
        /// Bookmark / destination name.
        anchor: String,
        /// Set for section headings.
        section: Option<usize>,
    },
    Text {
        style: TextStyle,
        text: String,
        /// Lines placed in this fragment.
        lines: Vec<String>,
        continued: bool,
    },
    Image {
        asset: &'a Asset,
        /// Offset from the left content edge.
        x: f32,
        width: f32,
        height: f32,
        caption: Vec<String>,
    },
    Table(IrTable),
    TocLine {
        entry: TocEntry,
        anchor: String,
        lines: Vec<String>,
    },
}

/// A placed block.
#[derive(Debug, Clone, PartialEq)]
pub struct IrItem<'a> {
    /// 1-based page number.
    pub page: usize,
    /// Offset from the top of the content area.
    pub y: f32,
    pub height: f32,
    pub block: IrBlock<'a>,
}

/// A top-level part with its placed items.
#[derive(Debug, Clone, PartialEq)]
pub struct IrPart<'a> {
    pub kind: PartKind,
    pub title: String,
    /// Whether the part opens a new page.
    pub page_break_before: bool,
    pub first_page: usize,
    pub items: Vec<IrItem<'a>>,
}

/// The fully laid-out document.
#[derive(Debug, Clone)]
pub struct DocumentIr<'a> {
    pub theme: &'a Theme,
    pub cover: &'a CoverMetadata,
    pub parts: Vec<IrPart<'a>>,
    pub page_count: usize,
    pub toc: Vec<TocEntry>,
}

impl<'a> DocumentIr<'a> {
    /// Section titles in document order.
    pub fn section_titles(&self) -> Vec<&str> {
        self.parts
            .iter()
            .filter(|p| matches!(p.kind, PartKind::Section(_)))
            .map(|p| p.title.as_str())
            .collect()
    }

    /// All items placed on `page`.
    pub fn items_on_page(&self, page: usize) -> impl Iterator<Item = &IrItem<'a>> {
        self.parts
            .iter()
            .flat_map(|p| p.items.iter())
            .filter(move |i| i.page == page)
    }
}

/// Anchor used for section headings in both backends.
pub fn section_anchor(index: usize) -> String {
    format!("_sdx_section_{}", index)
}
