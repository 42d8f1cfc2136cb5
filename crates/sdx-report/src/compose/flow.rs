//! Layout pass 1: greedy flow pagination over measured units.
//!
//! The paginator only sees heights. Parts are walked in order; units are
//! appended to the current page while they fit and a new page starts
//! before the first unit that does not. Text splits at line boundaries,
//! tables at row boundaries, everything else is atomic.

use serde::Serialize;
use std::ops::Range;
use tracing::debug;

/// Measured geometry of one unit.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Shape {
    /// Never split (images, headings, single text lines).
    Atomic { height: f32 },
    /// Paragraph text, splittable between lines.
    Lines { line_height: f32, count: usize },
    /// Table body rows under a repeated header.
    Rows { header: f32, rows: Vec<f32> },
}

impl Shape {
    fn natural_height(&self) -> f32 {
        match self {
            Shape::Atomic { height } => *height,
            Shape::Lines { line_height, count } => line_height * *count as f32,
            Shape::Rows { header, rows } => header + rows.iter().sum::<f32>(),
        }
    }
}

/// A measured block ready for pagination.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Unit {
    pub shape: Shape,
    /// Space above the unit, dropped at the top of a page.
    pub gap_before: f32,
    /// Headings must share a page with the start of the following unit.
    pub keep_with_next: bool,
    /// Atomic content that may be shrunk to stay with a heading above it.
    pub scalable: bool,
}

impl Unit {
    pub fn atomic(height: f32, gap_before: f32) -> Self {
        Self {
            shape: Shape::Atomic { height },
            gap_before,
            keep_with_next: false,
            scalable: false,
        }
    }

    pub fn image(height: f32, gap_before: f32) -> Self {
        Self {
            scalable: true,
            ..Self::atomic(height, gap_before)
        }
    }

    pub fn heading(height: f32, gap_before: f32) -> Self {
        Self {
            keep_with_next: true,
            ..Self::atomic(height, gap_before)
        }
    }

    pub fn lines(line_height: f32, count: usize, gap_before: f32) -> Self {
        Self {
            shape: Shape::Lines { line_height, count },
            gap_before,
            keep_with_next: false,
            scalable: false,
        }
    }

    pub fn rows(header: f32, rows: Vec<f32>, gap_before: f32) -> Self {
        Self {
            shape: Shape::Rows { header, rows },
            gap_before,
            keep_with_next: false,
            scalable: false,
        }
    }
}

/// A top-level part as seen by the paginator.
#[derive(Debug, Clone)]
pub(crate) struct PartFlow {
    pub page_break_before: bool,
    pub units: Vec<Unit>,
}

/// One placed piece of a unit.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Fragment {
    pub unit: usize,
    /// 1-based page number.
    pub page: usize,
    /// Offset from the top of the content area.
    pub y: f32,
    pub height: f32,
    /// Lines or rows covered; `0..1` for atomic units.
    pub range: Range<usize>,
    /// Whether an earlier fragment of the same unit exists.
    pub continued: bool,
}

/// A unit that was force-placed or shrunk because it did not fit.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Overflow {
    pub part: usize,
    pub unit: usize,
    /// Natural height of the unit.
    pub height: f32,
    /// Space it was given.
    pub available: f32,
    pub page: usize,
}

/// Pagination settings.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FlowSettings {
    pub content_height: f32,
    pub rows_per_page: usize,
    pub orphan_lines: usize,
}

/// Result of pass 1.
#[derive(Debug, Clone)]
pub(crate) struct Pagination {
    /// Fragments per part, in unit order.
    pub fragments: Vec<Vec<Fragment>>,
    /// Page each part starts on.
    pub first_pages: Vec<usize>,
    pub page_count: usize,
    pub overflows: Vec<Overflow>,
}

/// A table-of-contents line with its resolved page.
///
/// Values only come out of a completed pagination pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    title: String,
    page: usize,
    #[serde(skip)]
    section: usize,
}

impl TocEntry {
    /// Section title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// 1-based page the section starts on.
    pub fn page(&self) -> usize {
        self.page
    }

    /// Index of the section in document order.
    pub fn section(&self) -> usize {
        self.section
    }
}

impl Pagination {
    /// Resolve TOC entries from the start pages of the given parts.
    pub fn toc<'t>(&self, sections: impl IntoIterator<Item = (usize, &'t str)>) -> Vec<TocEntry> {
        sections
            .into_iter()
            .enumerate()
            .map(|(section, (part, title))| TocEntry {
                title: title.to_string(),
                page: self.first_pages[part],
                section,
            })
            .collect()
    }
}

struct Cursor {
    page: usize,
    y: f32,
}

impl Cursor {
    fn at_top(&self) -> bool {
        self.y <= f32::EPSILON
    }

    fn new_page(&mut self) {
        self.page += 1;
        self.y = 0.0;
    }

    fn gap(&self, unit: &Unit) -> f32 {
        if self.at_top() {
            0.0
        } else {
            unit.gap_before
        }
    }
}

/// Height a heading at `index` needs below it to avoid being orphaned.
fn keep_height(units: &[Unit], index: usize, settings: &FlowSettings) -> f32 {
    let Some(next) = units.get(index + 1) else {
        return 0.0;
    };
    let own = match &next.shape {
        Shape::Atomic { height } => *height,
        Shape::Lines { line_height, count } => {
            line_height * (*count).min(settings.orphan_lines.max(1)) as f32
        }
        Shape::Rows { header, rows } => header + rows.first().copied().unwrap_or(0.0),
    };
    let chained = if next.keep_with_next {
        keep_height(units, index + 1, settings)
    } else {
        0.0
    };
    next.gap_before + own + chained
}

/// Whether the unit directly follows a heading placed on the cursor's page.
fn held_by_heading(units: &[Unit], index: usize, placed: &[Fragment], cursor: &Cursor) -> bool {
    index > 0
        && units[index - 1].keep_with_next
        && placed.last().is_some_and(|f| f.unit == index - 1 && f.page == cursor.page)
}

/// Run pass 1 over all parts.
pub(crate) fn paginate(parts: &[PartFlow], settings: FlowSettings) -> Pagination {
    let limit = settings.content_height;
    let cap = settings.rows_per_page.max(1);
    let mut cursor = Cursor { page: 1, y: 0.0 };
    let mut out = Pagination {
        fragments: Vec::with_capacity(parts.len()),
        first_pages: Vec::with_capacity(parts.len()),
        page_count: 1,
        overflows: Vec::new(),
    };

    for (part_index, part) in parts.iter().enumerate() {
        if part_index > 0 && part.page_break_before {
            cursor.new_page();
        }
        out.first_pages.push(cursor.page);
        let mut fragments = Vec::new();

        for (unit_index, unit) in part.units.iter().enumerate() {
            match &unit.shape {
                Shape::Atomic { height } => {
                    let mut placed = *height;
                    let mut need = cursor.gap(unit) + height;
                    if unit.keep_with_next {
                        need += keep_height(&part.units, unit_index, &settings);
                    }
                    if !cursor.at_top() && cursor.y + need > limit {
                        let room = limit - cursor.y - cursor.gap(unit);
                        if unit.scalable
                            && room > 0.0
                            && held_by_heading(&part.units, unit_index, &fragments, &cursor)
                        {
                            debug!(
                                part = part_index,
                                unit = unit_index,
                                page = cursor.page,
                                height = *height as f64,
                                room = room as f64,
                                "Block shrunk to stay with heading"
                            );
                            out.overflows.push(Overflow {
                                part: part_index,
                                unit: unit_index,
                                height: *height,
                                available: room,
                                page: cursor.page,
                            });
                            placed = room;
                        } else {
                            debug!(
                                part = part_index,
                                unit = unit_index,
                                page = cursor.page,
                                "Block moved to next page"
                            );
                            cursor.new_page();
                        }
                    }
                    if *height > limit {
                        out.overflows.push(Overflow {
                            part: part_index,
                            unit: unit_index,
                            height: *height,
                            available: limit,
                            page: cursor.page,
                        });
                    }
                    cursor.y += cursor.gap(unit);
                    fragments.push(Fragment {
                        unit: unit_index,
                        page: cursor.page,
                        y: cursor.y,
                        height: placed,
                        range: 0..1,
                        continued: false,
                    });
                    cursor.y += placed;
                }
                Shape::Lines { line_height, count } => {
                    let total = unit.shape.natural_height();
                    if !cursor.at_top() && cursor.y + cursor.gap(unit) + total > limit {
                        // Below a heading the paragraph splits as soon as the
                        // minimum lines fit; elsewhere a short one moves whole.
                        let move_whole =
                            if held_by_heading(&part.units, unit_index, &fragments, &cursor) {
                                let lead = (*count).min(settings.orphan_lines.max(1));
                                cursor.y + cursor.gap(unit) + line_height * lead as f32 > limit
                            } else {
                                let first_fits =
                                    cursor.y + cursor.gap(unit) + line_height <= limit;
                                total <= limit || !first_fits
                            };
                        if move_whole {
                            cursor.new_page();
                        }
                    }
                    let mut start = 0;
                    while start < *count {
                        cursor.y += cursor.gap(unit);
                        let room = ((limit - cursor.y) / line_height + 1e-3).floor().max(1.0) as usize;
                        let take = room.min(count - start);
                        let height = take as f32 * line_height;
                        fragments.push(Fragment {
                            unit: unit_index,
                            page: cursor.page,
                            y: cursor.y,
                            height,
                            range: start..start + take,
                            continued: start > 0,
                        });
                        cursor.y += height;
                        start += take;
                        if start < *count {
                            cursor.new_page();
                        }
                    }
                }
                Shape::Rows { header, rows } => {
                    let mut start = 0;
                    loop {
                        let gap = cursor.gap(unit);
                        let first = rows.get(start).copied().unwrap_or(0.0);
                        if !cursor.at_top() && cursor.y + gap + header + first > limit {
                            cursor.new_page();
                            continue;
                        }
                        cursor.y += gap;
                        let mut height = *header;
                        let mut take = 0;
                        while start + take < rows.len()
                            && take < cap
                            && cursor.y + height + rows[start + take] <= limit
                        {
                            height += rows[start + take];
                            take += 1;
                        }
                        if take == 0 && start < rows.len() {
                            height += rows[start];
                            take = 1;
                            out.overflows.push(Overflow {
                                part: part_index,
                                unit: unit_index,
                                height,
                                available: limit - cursor.y,
                                page: cursor.page,
                            });
                        }
                        fragments.push(Fragment {
                            unit: unit_index,
                            page: cursor.page,
                            y: cursor.y,
                            height,
                            range: start..start + take,
                            continued: start > 0,
                        });
                        cursor.y += height;
                        start += take;
                        if start >= rows.len() {
                            break;
                        }
                        debug!(
                            part = part_index,
                            unit = unit_index,
                            rows_placed = start,
                            rows_total = rows.len(),
                            "Table continues on next page"
                        );
                        cursor.new_page();
                    }
                }
            }
        }

        if let Some(first) = fragments.first() {
            out.first_pages[part_index] = first.page;
        }
        out.fragments.push(fragments);
    }

    out.page_count = cursor.page;
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(height: f32) -> FlowSettings {
        FlowSettings {
            content_height: height,
            rows_per_page: 12,
            orphan_lines: 2,
        }
    }

    fn part(units: Vec<Unit>) -> PartFlow {
        PartFlow {
            page_break_before: true,
            units,
        }
    }

    #[test]
    fn test_each_part_starts_new_page() {
        let parts = vec![
            part(vec![Unit::atomic(10.0, 0.0)]),
            part(vec![Unit::atomic(10.0, 0.0)]),
            PartFlow {
                page_break_before: false,
                units: vec![Unit::atomic(10.0, 0.0)],
            },
        ];
        let p = paginate(&parts, settings(100.0));
        assert_eq!(p.first_pages, vec![1, 2, 2]);
        assert_eq!(p.page_count, 2);
        assert_eq!(p.fragments[2][0].y, 10.0);
    }

    #[test]
    fn test_atomic_moves_whole() {
        let parts = vec![part(vec![Unit::atomic(60.0, 0.0), Unit::atomic(50.0, 5.0)])];
        let p = paginate(&parts, settings(100.0));
        let f = &p.fragments[0];
        assert_eq!(f.len(), 2);
        assert_eq!(f[1].page, 2);
        assert_eq!(f[1].y, 0.0);
        assert!(p.overflows.is_empty());
    }

    #[test]
    fn test_oversized_atomic_reports_overflow() {
        let parts = vec![part(vec![Unit::atomic(10.0, 0.0), Unit::atomic(150.0, 0.0)])];
        let p = paginate(&parts, settings(100.0));
        assert_eq!(p.fragments[0][1].page, 2);
        assert_eq!(p.overflows.len(), 1);
        assert_eq!(p.overflows[0].page, 2);
    }

    #[test]
    fn test_paragraph_moves_whole_when_it_fits_a_page() {
        let parts = vec![part(vec![Unit::atomic(80.0, 0.0), Unit::lines(10.0, 4, 0.0)])];
        let p = paginate(&parts, settings(100.0));
        let f = &p.fragments[0];
        assert_eq!(f.len(), 2);
        assert_eq!(f[1].page, 2);
        assert_eq!(f[1].range, 0..4);
    }

    #[test]
    fn test_long_paragraph_splits_at_lines() {
        let parts = vec![part(vec![Unit::lines(10.0, 25, 0.0)])];
        let p = paginate(&parts, settings(100.0));
        let ranges: Vec<_> = p.fragments[0].iter().map(|f| f.range.clone()).collect();
        assert_eq!(ranges, vec![0..10, 10..20, 20..25]);
        assert!(p.fragments[0][1].continued);
        assert_eq!(p.page_count, 3);
    }

    #[test]
    fn test_table_splits_at_capacity_with_header() {
        let parts = vec![part(vec![Unit::rows(10.0, vec![5.0; 20], 0.0)])];
        let p = paginate(&parts, settings(500.0));
        let f = &p.fragments[0];
        assert_eq!(f.len(), 2);
        assert_eq!(f[0].range, 0..12);
        assert_eq!(f[1].range, 12..20);
        assert_eq!(f[1].page, f[0].page + 1);
        assert_eq!(f[1].height, 10.0 + 8.0 * 5.0);
        assert!(f[1].continued);
    }

    #[test]
    fn test_table_splits_on_height() {
        let parts = vec![part(vec![Unit::rows(10.0, vec![20.0; 8], 0.0)])];
        let p = paginate(&parts, settings(100.0));
        let ranges: Vec<_> = p.fragments[0].iter().map(|f| f.range.clone()).collect();
        assert_eq!(ranges, vec![0..4, 4..8]);
    }

    #[test]
    fn test_heading_not_orphaned() {
        let parts = vec![part(vec![
            Unit::lines(10.0, 8, 0.0),
            Unit::heading(15.0, 0.0),
            Unit::lines(10.0, 3, 0.0),
        ])];
        // 80 used, heading fits (95) but only 0 lines would follow.
        let p = paginate(&parts, settings(100.0));
        let f = &p.fragments[0];
        assert_eq!(f[1].page, 2);
        assert_eq!(f[2].page, 2);
    }

    #[test]
    fn test_paragraph_splits_below_heading_once_lead_lines_fit() {
        let parts = vec![part(vec![
            Unit::lines(10.0, 5, 0.0),
            Unit::heading(10.0, 0.0),
            Unit::lines(10.0, 6, 0.0),
        ])];
        // 60 used after the heading; the paragraph fits a page but not the rest.
        let p = paginate(&parts, settings(100.0));
        let f = &p.fragments[0];
        assert_eq!(f[1].page, 1);
        let paragraph: Vec<_> = f[2..].iter().map(|x| (x.page, x.range.clone())).collect();
        assert_eq!(paragraph, vec![(1, 0..4), (2, 4..6)]);
        assert!(f[3].continued);
    }

    #[test]
    fn test_heading_at_top_keeps_long_paragraph_start() {
        let parts = vec![part(vec![Unit::heading(30.0, 0.0), Unit::lines(10.0, 9, 0.0)])];
        let p = paginate(&parts, settings(100.0));
        let f = &p.fragments[0];
        assert_eq!(f[0].page, 1);
        assert_eq!((f[1].page, f[1].range.clone()), (1, 0..7));
        assert_eq!((f[2].page, f[2].range.clone()), (2, 7..9));
        assert_eq!(p.page_count, 2);
    }

    #[test]
    fn test_image_below_heading_at_top_is_shrunk() {
        let parts = vec![part(vec![Unit::heading(30.0, 0.0), Unit::image(90.0, 5.0)])];
        let p = paginate(&parts, settings(100.0));
        let f = &p.fragments[0];
        assert_eq!(f[1].page, 1);
        assert_eq!(f[1].y, 35.0);
        assert_eq!(f[1].height, 65.0);
        assert_eq!(p.page_count, 1);
        assert_eq!(p.overflows.len(), 1);
        assert_eq!(p.overflows[0].height, 90.0);
        assert_eq!(p.overflows[0].available, 65.0);
    }

    #[test]
    fn test_image_after_text_moves_instead_of_shrinking() {
        let parts = vec![part(vec![Unit::lines(10.0, 3, 0.0), Unit::image(90.0, 5.0)])];
        let p = paginate(&parts, settings(100.0));
        let f = &p.fragments[0];
        assert_eq!((f[1].page, f[1].height), (2, 90.0));
        assert!(p.overflows.is_empty());
    }

    #[test]
    fn test_heading_chain_kept_with_table() {
        let parts = vec![part(vec![
            Unit::lines(10.0, 6, 0.0),
            Unit::heading(10.0, 0.0),
            Unit::heading(10.0, 0.0),
            Unit::rows(10.0, vec![10.0; 3], 0.0),
        ])];
        // 60 + 10 + 10 leaves 20: header + first row do not fit.
        let p = paginate(&parts, settings(95.0));
        let f = &p.fragments[0];
        assert_eq!(f[1].page, 2);
        assert_eq!(f[2].page, 2);
        assert_eq!(f[3].page, 2);
    }

    #[test]
    fn test_toc_resolves_part_pages() {
        let parts = vec![
            part(vec![Unit::atomic(10.0, 0.0)]),
            part(vec![Unit::atomic(10.0, 0.0)]),
            part(vec![Unit::lines(10.0, 15, 0.0)]),
            part(vec![Unit::atomic(10.0, 0.0)]),
        ];
        let p = paginate(&parts, settings(100.0));
        let toc = p.toc([(1, "Volume"), (2, "Backlog"), (3, "SLA")]);
        let pages: Vec<_> = toc.iter().map(|t| t.page()).collect();
        assert_eq!(pages, vec![2, 3, 5]);
        assert_eq!(toc[2].title(), "SLA");
        assert_eq!(toc[2].section(), 2);
    }
}
