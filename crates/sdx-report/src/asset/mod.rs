//! Chart rasterization.
//!
//! A [`ChartSpec`] carries already-aggregated data plus a visual encoding.
//! The renderer turns it into an SVG document, rasterizes it with `resvg`
//! at a fixed pixel size and encodes PNG. Rendering is a pure function of
//! the chart spec and the renderer settings, so batches are rendered in parallel.
//!
//! Failures never abort a report: [`AssetRenderer::render`] substitutes a
//! placeholder image of the same size and hands back the error so the caller
//! can record a warning.

mod svg;

use crate::config::{AssetOptions, BrandColors, Theme};
use crate::error::AssetRenderError;
use crate::model::Asset;

use rayon::prelude::*;
use resvg::tiny_skia;
use resvg::usvg;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// One named data series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    #[serde(default)]
    pub values: Vec<f64>,
}

impl Series {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Self-contained chart description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    /// Chart title, also used to reference the chart in warnings.
    pub title: String,
    /// Visual encoding: `bar`, `line`, `area`, `scatter` or `pie`.
    pub mark: String,
    /// Category axis labels (pie slice labels for `pie`).
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub series: Vec<Series>,
    /// Caption placed under the image; defaults to the title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_label: Option<String>,
}

impl ChartSpec {
    /// Create a spec with no data.
    pub fn new(title: impl Into<String>, mark: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            mark: mark.into(),
            categories: Vec::new(),
            series: Vec::new(),
            caption: None,
            y_label: None,
        }
    }

    /// Set category labels.
    pub fn with_categories<S: Into<String>>(mut self, categories: impl IntoIterator<Item = S>) -> Self {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    /// Append a series.
    pub fn with_series(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.series.push(Series::new(name, values));
        self
    }

    /// Set the caption.
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Caption text for the rendered asset.
    pub fn caption_text(&self) -> String {
        self.caption.clone().unwrap_or_else(|| self.title.clone())
    }
}

/// Supported visual encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartMark {
    Bar,
    Line,
    Area,
    Scatter,
    Pie,
}

impl std::str::FromStr for ChartMark {
    type Err = AssetRenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bar" | "column" => Ok(ChartMark::Bar),
            "line" => Ok(ChartMark::Line),
            "area" => Ok(ChartMark::Area),
            "scatter" | "point" => Ok(ChartMark::Scatter),
            "pie" => Ok(ChartMark::Pie),
            _ => Err(AssetRenderError::UnsupportedEncoding(s.to_string())),
        }
    }
}

/// A chart spec that passed validation.
pub(crate) struct ValidChart<'a> {
    pub mark: ChartMark,
    pub spec: &'a ChartSpec,
    /// Number of points per series.
    pub points: usize,
}

/// Check a spec against the renderer's data requirements.
pub(crate) fn validate(spec: &ChartSpec) -> Result<ValidChart<'_>, AssetRenderError> {
    let mark: ChartMark = spec.mark.parse()?;

    if spec.series.iter().all(|s| s.values.is_empty()) {
        return Err(AssetRenderError::EmptySeries);
    }
    for series in &spec.series {
        if series.values.iter().any(|v| !v.is_finite()) {
            return Err(AssetRenderError::NonFinite {
                series: series.name.clone(),
            });
        }
    }

    let points = if spec.categories.is_empty() {
        spec.series[0].values.len()
    } else {
        spec.categories.len()
    };

    if mark == ChartMark::Pie {
        let values = &spec.series[0].values;
        if values.len() != points {
            return Err(AssetRenderError::LengthMismatch {
                series: spec.series[0].name.clone(),
                expected: points,
                actual: values.len(),
            });
        }
        if values.iter().any(|v| *v < 0.0) || values.iter().sum::<f64>() <= 0.0 {
            return Err(AssetRenderError::NonPositiveTotal);
        }
    } else {
        for series in &spec.series {
            if series.values.len() != points {
                return Err(AssetRenderError::LengthMismatch {
                    series: series.name.clone(),
                    expected: points,
                    actual: series.values.len(),
                });
            }
        }
    }

    Ok(ValidChart { mark, spec, points })
}

/// Result of rendering one chart: always an asset, plus the error if the
/// asset is a placeholder.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub asset: Asset,
    pub error: Option<AssetRenderError>,
}

/// Rasterizes chart specs at a fixed resolution.
pub struct AssetRenderer {
    options: AssetOptions,
    colors: BrandColors,
    fontdb: Arc<usvg::fontdb::Database>,
}

impl AssetRenderer {
    /// Create a renderer using the theme's chart palette.
    pub fn new(options: AssetOptions, theme: &Theme) -> Self {
        let mut fontdb = usvg::fontdb::Database::new();
        if options.system_fonts {
            fontdb.load_system_fonts();
            debug!(faces = fontdb.len(), "Loaded system fonts for chart text");
        }
        Self {
            options,
            colors: theme.colors.clone(),
            fontdb: Arc::new(fontdb),
        }
    }

    /// Output size in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.options.width, self.options.height)
    }

    /// Render a chart, or fail with the reason.
    pub fn try_render(&self, spec: &ChartSpec) -> Result<Asset, AssetRenderError> {
        let chart = validate(spec)?;
        let (width, height) = self.size();
        let document = svg::chart_svg(&chart, width, height, &self.colors, &self.options.font_family);
        let png = self.rasterize(&document)?;
        Ok(Asset::rendered(png, width, height, spec.caption_text()))
    }

    /// Render a chart, substituting a placeholder on failure.
    pub fn render(&self, spec: &ChartSpec) -> RenderOutcome {
        let started = Instant::now();
        match self.try_render(spec) {
            Ok(asset) => {
                debug!(
                    chart = %spec.title,
                    bytes = asset.png().len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Chart rendered"
                );
                RenderOutcome { asset, error: None }
            }
            Err(err) => RenderOutcome {
                asset: self.placeholder(&spec.title, &err.to_string()),
                error: Some(err),
            },
        }
    }

    /// Render a batch in parallel; output order matches input order.
    pub fn render_all(&self, specs: &[&ChartSpec]) -> Vec<RenderOutcome> {
        let started = Instant::now();
        let outcomes: Vec<RenderOutcome> = specs.par_iter().map(|spec| self.render(spec)).collect();
        info!(
            charts = outcomes.len(),
            failed = outcomes.iter().filter(|o| o.error.is_some()).count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Chart batch rendered"
        );
        outcomes
    }

    /// Placeholder image with an explanatory caption.
    pub fn placeholder(&self, title: &str, reason: &str) -> Asset {
        let (width, height) = self.size();
        let caption = format!("Chart unavailable: {} ({})", title, reason);
        let document = svg::placeholder_svg(width, height, &self.colors, &self.options.font_family);
        let png = match self.rasterize(&document) {
            Ok(png) => png,
            Err(err) => {
                debug!(error = %err, "Placeholder raster failed; using flat fill");
                svg::flat_png(width, height).unwrap_or_default()
            }
        };
        Asset::placeholder(png, width, height, caption)
    }

    fn rasterize(&self, document: &str) -> Result<Vec<u8>, AssetRenderError> {
        let (width, height) = self.size();
        let mut opt = usvg::Options::default();
        opt.font_family = self.options.font_family.clone();
        opt.fontdb = Arc::clone(&self.fontdb);

        let tree = usvg::Tree::from_str(document, &opt)
            .map_err(|e| AssetRenderError::Raster(format!("SVG parse failed: {}", e)))?;
        let mut pixmap = tiny_skia::Pixmap::new(width, height)
            .ok_or_else(|| AssetRenderError::Raster("pixmap allocation failed".to_string()))?;
        resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());
        pixmap
            .encode_png()
            .map_err(|e| AssetRenderError::Raster(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> AssetRenderer {
        let options = AssetOptions {
            width: 160,
            height: 90,
            ..AssetOptions::default()
        };
        AssetRenderer::new(options, &Theme::default())
    }

    fn bar_chart() -> ChartSpec {
        ChartSpec::new("Tickets by priority", "bar")
            .with_categories(["P1", "P2", "P3"])
            .with_series("open", vec![4.0, 12.0, 30.0])
            .with_series("closed", vec![3.0, 10.0, 28.0])
    }

    #[test]
    fn test_mark_parse() {
        assert_eq!("BAR".parse::<ChartMark>().unwrap(), ChartMark::Bar);
        assert_eq!("pie".parse::<ChartMark>().unwrap(), ChartMark::Pie);
        assert!(matches!(
            "sankey".parse::<ChartMark>(),
            Err(AssetRenderError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn test_validate_errors() {
        let empty = ChartSpec::new("x", "line");
        assert!(matches!(validate(&empty), Err(AssetRenderError::EmptySeries)));

        let mismatch = ChartSpec::new("x", "line")
            .with_categories(["a", "b"])
            .with_series("s", vec![1.0]);
        assert!(matches!(
            validate(&mismatch),
            Err(AssetRenderError::LengthMismatch { expected: 2, actual: 1, .. })
        ));

        let nan = ChartSpec::new("x", "bar").with_series("s", vec![1.0, f64::NAN]);
        assert!(matches!(validate(&nan), Err(AssetRenderError::NonFinite { .. })));

        let zero_pie = ChartSpec::new("x", "pie").with_series("s", vec![0.0, 0.0]);
        assert!(matches!(validate(&zero_pie), Err(AssetRenderError::NonPositiveTotal)));
    }

    #[test]
    fn test_render_produces_png_at_fixed_size() {
        let asset = renderer().try_render(&bar_chart()).unwrap();
        assert_eq!(asset.width(), 160);
        assert_eq!(asset.height(), 90);
        assert!(asset.png().starts_with(b"\x89PNG\r\n\x1a\n"));
        assert!(!asset.is_placeholder());
        assert_eq!(asset.caption(), "Tickets by priority");
    }

    #[test]
    fn test_render_all_marks() {
        let r = renderer();
        for mark in ["bar", "line", "area", "scatter", "pie"] {
            let spec = ChartSpec::new("Mix", mark)
                .with_categories(["Email", "Phone", "Portal", "Chat"])
                .with_series("share", vec![40.0, 25.0, 20.0, 15.0]);
            let outcome = r.render(&spec);
            assert!(outcome.error.is_none(), "mark {} failed: {:?}", mark, outcome.error);
        }
    }

    #[test]
    fn test_render_is_deterministic() {
        let r = renderer();
        let a = r.try_render(&bar_chart()).unwrap();
        let b = r.try_render(&bar_chart()).unwrap();
        assert_eq!(a.png(), b.png());
    }

    #[test]
    fn test_failure_yields_placeholder() {
        let outcome = renderer().render(&ChartSpec::new("Backlog age", "heatmap"));
        assert!(outcome.asset.is_placeholder());
        assert_eq!(outcome.asset.width(), 160);
        assert!(outcome.asset.caption().starts_with("Chart unavailable: Backlog age"));
        assert!(matches!(
            outcome.error,
            Some(AssetRenderError::UnsupportedEncoding(_))
        ));
        assert!(Asset::from_png(outcome.asset.png().to_vec(), "").is_ok());
    }

    #[test]
    fn test_render_all_preserves_order() {
        let specs = vec![
            bar_chart().with_caption("first"),
            ChartSpec::new("broken", "line"),
            bar_chart().with_caption("third"),
        ];
        let refs: Vec<&ChartSpec> = specs.iter().collect();
        let outcomes = renderer().render_all(&refs);
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].asset.caption(), "first");
        assert!(outcomes[1].error.is_some());
        assert_eq!(outcomes[2].asset.caption(), "third");
    }
}
