//! SVG documents for charts and placeholders.

use super::{ChartMark, ValidChart};
use crate::config::{BrandColors, Rgb};
use std::f64::consts::PI;
use std::fmt::Write as _;

const GRID_LINES: usize = 5;
const MAX_CATEGORY_LABELS: usize = 12;

/// Plot rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy)]
struct Plot {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

impl Plot {
    fn bottom(&self) -> f64 {
        self.top + self.height
    }

    fn right(&self) -> f64 {
        self.left + self.width
    }
}

/// Value axis with "nice" rounded bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Axis {
    pub lo: f64,
    pub hi: f64,
    pub step: f64,
}

impl Axis {
    pub(crate) fn nice(min: f64, max: f64) -> Self {
        let (min, max) = if (max - min).abs() < f64::EPSILON {
            (min - 1.0, max + 1.0)
        } else {
            (min, max)
        };
        let raw = (max - min) / GRID_LINES as f64;
        let magnitude = 10f64.powf(raw.log10().floor());
        let normalized = raw / magnitude;
        let nice = if normalized <= 1.0 {
            1.0
        } else if normalized <= 2.0 {
            2.0
        } else if normalized <= 5.0 {
            5.0
        } else {
            10.0
        };
        let step = nice * magnitude;
        Axis {
            lo: (min / step).floor() * step,
            hi: (max / step).ceil() * step,
            step,
        }
    }

    fn project(&self, value: f64, plot: &Plot) -> f64 {
        plot.bottom() - (value - self.lo) / (self.hi - self.lo) * plot.height
    }

    fn ticks(&self) -> Vec<f64> {
        let count = ((self.hi - self.lo) / self.step).round() as usize;
        (0..=count).map(|i| self.lo + i as f64 * self.step).collect()
    }
}

fn color(c: Rgb) -> String {
    format!("#{}", c.hex())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn format_tick(value: f64) -> String {
    if value.abs() >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if value.abs() >= 10_000.0 {
        format!("{:.0}k", value / 1_000.0)
    } else if value.fract().abs() < 1e-9 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}

/// Build the SVG for a validated chart.
pub(crate) fn chart_svg(
    chart: &ValidChart<'_>,
    width: u32,
    height: u32,
    colors: &BrandColors,
    font_family: &str,
) -> String {
    let (w, h) = (width as f64, height as f64);
    let font = escape_xml(font_family);
    let title_size = (h * 0.045).max(8.0);
    let label_size = (h * 0.03).max(6.0);

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        "<svg xmlns='http://www.w3.org/2000/svg' width='{width}' height='{height}' viewBox='0 0 {width} {height}'>"
    );
    let _ = writeln!(svg, "  <rect x='0' y='0' width='{w}' height='{h}' fill='#FFFFFF'/>");
    let _ = writeln!(
        svg,
        "  <text x='{:.1}' y='{:.1}' font-family='{font}' font-size='{title_size:.1}' font-weight='bold' fill='{}'>{}</text>",
        w * 0.04,
        h * 0.075,
        color(colors.text),
        escape_xml(&chart.spec.title)
    );

    let plot = Plot {
        left: w * 0.09,
        top: h * 0.12,
        width: w * 0.87,
        height: h * 0.70,
    };

    match chart.mark {
        ChartMark::Pie => pie(&mut svg, chart, &plot, colors, &font, label_size),
        _ => cartesian(&mut svg, chart, &plot, colors, &font, label_size),
    }

    legend(&mut svg, chart, w, h, colors, &font, label_size);
    let _ = writeln!(svg, "</svg>");
    svg
}

fn cartesian(
    svg: &mut String,
    chart: &ValidChart<'_>,
    plot: &Plot,
    colors: &BrandColors,
    font: &str,
    label_size: f64,
) {
    let values = chart.spec.series.iter().flat_map(|s| s.values.iter().copied());
    let (mut min, mut max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if matches!(chart.mark, ChartMark::Bar | ChartMark::Area) {
        min = min.min(0.0);
        max = max.max(0.0);
    }
    let axis = Axis::nice(min, max);
    let grid = color(colors.table_border);
    let muted = color(colors.muted);

    let _ = writeln!(svg, "  <g stroke='{grid}' stroke-width='1'>");
    for tick in axis.ticks() {
        let y = axis.project(tick, plot);
        let _ = writeln!(
            svg,
            "    <line x1='{:.1}' y1='{y:.1}' x2='{:.1}' y2='{y:.1}'/>",
            plot.left,
            plot.right()
        );
    }
    let _ = writeln!(svg, "  </g>");
    for tick in axis.ticks() {
        let _ = writeln!(
            svg,
            "  <text x='{:.1}' y='{:.1}' font-family='{font}' font-size='{label_size:.1}' text-anchor='end' fill='{muted}'>{}</text>",
            plot.left - label_size * 0.5,
            axis.project(tick, plot) + label_size * 0.35,
            format_tick(tick)
        );
    }
    if let Some(label) = &chart.spec.y_label {
        let _ = writeln!(
            svg,
            "  <text x='{:.1}' y='{:.1}' font-family='{font}' font-size='{label_size:.1}' fill='{muted}'>{}</text>",
            plot.left,
            plot.top - label_size * 0.6,
            escape_xml(label)
        );
    }

    let points = chart.points.max(1);
    let slot = plot.width / points as f64;
    let label_every = points.div_ceil(MAX_CATEGORY_LABELS).max(1);
    for (i, label) in chart.spec.categories.iter().enumerate() {
        if i % label_every != 0 {
            continue;
        }
        let _ = writeln!(
            svg,
            "  <text x='{:.1}' y='{:.1}' font-family='{font}' font-size='{label_size:.1}' text-anchor='middle' fill='{muted}'>{}</text>",
            plot.left + slot * (i as f64 + 0.5),
            plot.bottom() + label_size * 1.4,
            escape_xml(label)
        );
    }

    let zero = axis.project(0.0_f64.clamp(axis.lo, axis.hi), plot);
    let series_count = chart.spec.series.len().max(1);
    for (si, series) in chart.spec.series.iter().enumerate() {
        let fill = color(colors.series(si));
        let x_at = |i: usize| plot.left + slot * (i as f64 + 0.5);
        match chart.mark {
            ChartMark::Bar => {
                let group = slot * 0.8;
                let bar = group / series_count as f64;
                for (i, v) in series.values.iter().enumerate() {
                    let x = plot.left + slot * i as f64 + slot * 0.1 + bar * si as f64;
                    let y = axis.project(*v, plot);
                    let (top, height) = if y < zero { (y, zero - y) } else { (zero, y - zero) };
                    let _ = writeln!(
                        svg,
                        "  <rect x='{x:.2}' y='{top:.2}' width='{:.2}' height='{height:.2}' fill='{fill}'/>",
                        (bar * 0.92).max(0.5)
                    );
                }
            }
            ChartMark::Line | ChartMark::Area => {
                let path: Vec<String> = series
                    .values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| format!("{:.2},{:.2}", x_at(i), axis.project(*v, plot)))
                    .collect();
                if chart.mark == ChartMark::Area && !path.is_empty() {
                    let last = series.values.len().saturating_sub(1);
                    let _ = writeln!(
                        svg,
                        "  <polygon points='{:.2},{zero:.2} {} {:.2},{zero:.2}' fill='{fill}' fill-opacity='0.35'/>",
                        x_at(0),
                        path.join(" "),
                        x_at(last)
                    );
                }
                let _ = writeln!(
                    svg,
                    "  <polyline points='{}' fill='none' stroke='{fill}' stroke-width='{:.1}' stroke-linejoin='round'/>",
                    path.join(" "),
                    (plot.height * 0.006).max(1.0)
                );
            }
            ChartMark::Scatter => {
                let r = (plot.height * 0.008).max(1.5);
                for (i, v) in series.values.iter().enumerate() {
                    let _ = writeln!(
                        svg,
                        "  <circle cx='{:.2}' cy='{:.2}' r='{r:.1}' fill='{fill}'/>",
                        x_at(i),
                        axis.project(*v, plot)
                    );
                }
            }
            ChartMark::Pie => {}
        }
    }

    let _ = writeln!(
        svg,
        "  <line x1='{:.1}' y1='{zero:.1}' x2='{:.1}' y2='{zero:.1}' stroke='{}' stroke-width='1.5'/>",
        plot.left,
        plot.right(),
        color(colors.text)
    );
}

fn pie(
    svg: &mut String,
    chart: &ValidChart<'_>,
    plot: &Plot,
    colors: &BrandColors,
    font: &str,
    label_size: f64,
) {
    let values = &chart.spec.series[0].values;
    let total: f64 = values.iter().sum();
    let cx = plot.left + plot.width / 2.0;
    let cy = plot.top + plot.height / 2.0;
    let r = plot.height.min(plot.width) / 2.0 * 0.95;

    let mut angle = -PI / 2.0;
    for (i, v) in values.iter().enumerate() {
        if *v <= 0.0 {
            continue;
        }
        let fill = color(colors.series(i));
        let sweep = v / total * 2.0 * PI;
        if sweep >= 2.0 * PI - 1e-9 {
            let _ = writeln!(svg, "  <circle cx='{cx:.2}' cy='{cy:.2}' r='{r:.2}' fill='{fill}'/>");
        } else {
            let (x0, y0) = (cx + r * angle.cos(), cy + r * angle.sin());
            let end = angle + sweep;
            let (x1, y1) = (cx + r * end.cos(), cy + r * end.sin());
            let large = if sweep > PI { 1 } else { 0 };
            let _ = writeln!(
                svg,
                "  <path d='M {cx:.2} {cy:.2} L {x0:.2} {y0:.2} A {r:.2} {r:.2} 0 {large} 1 {x1:.2} {y1:.2} Z' fill='{fill}' stroke='#FFFFFF' stroke-width='2'/>"
            );
        }
        if let Some(label) = chart.spec.categories.get(i) {
            let mid = angle + sweep / 2.0;
            let _ = writeln!(
                svg,
                "  <text x='{:.1}' y='{:.1}' font-family='{font}' font-size='{label_size:.1}' text-anchor='middle' fill='#FFFFFF'>{} ({:.0}%)</text>",
                cx + r * 0.62 * mid.cos(),
                cy + r * 0.62 * mid.sin(),
                escape_xml(label),
                v / total * 100.0
            );
        }
        angle += sweep;
    }
}

fn legend(
    svg: &mut String,
    chart: &ValidChart<'_>,
    w: f64,
    h: f64,
    colors: &BrandColors,
    font: &str,
    label_size: f64,
) {
    if chart.mark == ChartMark::Pie || chart.spec.series.len() < 2 {
        return;
    }
    let swatch = label_size;
    let y = h * 0.93;
    let mut x = w * 0.09;
    for (i, series) in chart.spec.series.iter().enumerate() {
        let _ = writeln!(
            svg,
            "  <rect x='{x:.1}' y='{:.1}' width='{swatch:.1}' height='{swatch:.1}' fill='{}'/>",
            y - swatch * 0.85,
            color(colors.series(i))
        );
        let _ = writeln!(
            svg,
            "  <text x='{:.1}' y='{y:.1}' font-family='{font}' font-size='{label_size:.1}' fill='{}'>{}</text>",
            x + swatch * 1.4,
            color(colors.text),
            escape_xml(&series.name)
        );
        x += swatch * 2.4 + series.name.chars().count() as f64 * label_size * 0.6;
    }
}

/// Neutral frame with a diagonal cross.
pub(crate) fn placeholder_svg(width: u32, height: u32, colors: &BrandColors, font_family: &str) -> String {
    let (w, h) = (width as f64, height as f64);
    let inset = (w.min(h) * 0.04).max(1.0);
    let border = color(colors.table_border);
    let mut svg = String::new();
    let _ = writeln!(
        svg,
        "<svg xmlns='http://www.w3.org/2000/svg' width='{width}' height='{height}' viewBox='0 0 {width} {height}'>"
    );
    let _ = writeln!(svg, "  <rect x='0' y='0' width='{w}' height='{h}' fill='#F3F4F6'/>");
    let _ = writeln!(
        svg,
        "  <rect x='{inset:.1}' y='{inset:.1}' width='{:.1}' height='{:.1}' fill='none' stroke='{border}' stroke-width='{:.1}'/>",
        w - 2.0 * inset,
        h - 2.0 * inset,
        (inset * 0.25).max(1.0)
    );
    let _ = writeln!(
        svg,
        "  <path d='M {inset:.1} {inset:.1} L {:.1} {:.1} M {:.1} {inset:.1} L {inset:.1} {:.1}' stroke='{border}' stroke-width='{:.1}'/>",
        w - inset,
        h - inset,
        w - inset,
        h - inset,
        (inset * 0.25).max(1.0)
    );
    let _ = writeln!(
        svg,
        "  <text x='{:.1}' y='{:.1}' font-family='{}' font-size='{:.1}' text-anchor='middle' fill='{}'>Chart unavailable</text>",
        w / 2.0,
        h / 2.0 - h * 0.06,
        escape_xml(font_family),
        (h * 0.06).max(6.0),
        color(colors.muted)
    );
    let _ = writeln!(svg, "</svg>");
    svg
}

/// Solid light-grey PNG, used when even the placeholder SVG cannot be drawn.
pub(crate) fn flat_png(width: u32, height: u32) -> Result<Vec<u8>, png::EncodingError> {
    let pixels = vec![0xF3u8; (width as usize) * (height as usize) * 3];
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.write_header()?.write_image_data(&pixels)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nice_axis() {
        let axis = Axis::nice(0.0, 47.0);
        assert_eq!(axis.lo, 0.0);
        assert_eq!(axis.step, 10.0);
        assert_eq!(axis.hi, 50.0);
        assert_eq!(axis.ticks().len(), 6);
    }

    #[test]
    fn test_nice_axis_flat_series() {
        let axis = Axis::nice(5.0, 5.0);
        assert!(axis.lo < 5.0 && axis.hi > 5.0);
    }

    #[test]
    fn test_format_tick() {
        assert_eq!(format_tick(20.0), "20");
        assert_eq!(format_tick(2.5), "2.5");
        assert_eq!(format_tick(25_000.0), "25k");
        assert_eq!(format_tick(2_500_000.0), "2.5M");
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("P1 & <P2>"), "P1 &amp; &lt;P2&gt;");
    }

    #[test]
    fn test_flat_png_header() {
        let png = flat_png(4, 3).unwrap();
        assert!(png.starts_with(b"\x89PNG"));
    }
}
