//! Branding, layout and asset configuration.
//!
//! All values are immutable once handed to a generator; nothing here is
//! global, so independent reports with different branding can be produced
//! concurrently.

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};

/// An sRGB colour, serialized as `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Hex form without the leading `#`, as used by WordprocessingML.
    pub fn hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }

    /// Components scaled to `0.0..=1.0`, as used by PDF operators.
    pub fn unit(&self) -> (f32, f32, f32) {
        (
            self.0 as f32 / 255.0,
            self.1 as f32 / 255.0,
            self.2 as f32 / 255.0,
        )
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let hex = value.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("invalid colour '{}': expected #RRGGBB", value));
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| e.to_string());
        Ok(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        format!("#{}", value.hex())
    }
}

/// Page size and margins in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    #[serde(default = "default_page_width")]
    pub width: f32,
    #[serde(default = "default_page_height")]
    pub height: f32,
    #[serde(default = "default_margin")]
    pub margin_top: f32,
    /// Includes room for the page footer.
    #[serde(default = "default_margin_bottom")]
    pub margin_bottom: f32,
    #[serde(default = "default_margin")]
    pub margin_left: f32,
    #[serde(default = "default_margin")]
    pub margin_right: f32,
}

fn default_page_width() -> f32 {
    595.28
}

fn default_page_height() -> f32 {
    841.89
}

fn default_margin() -> f32 {
    56.0
}

fn default_margin_bottom() -> f32 {
    64.0
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            width: default_page_width(),
            height: default_page_height(),
            margin_top: default_margin(),
            margin_bottom: default_margin_bottom(),
            margin_left: default_margin(),
            margin_right: default_margin(),
        }
    }
}

impl PageGeometry {
    /// Width available for content.
    pub fn content_width(&self) -> f32 {
        self.width - self.margin_left - self.margin_right
    }

    /// Height available for content.
    pub fn content_height(&self) -> f32 {
        self.height - self.margin_top - self.margin_bottom
    }
}

/// Font sizes in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FontSizes {
    #[serde(default = "default_title_size")]
    pub title: f32,
    #[serde(default = "default_heading_size")]
    pub heading: f32,
    #[serde(default = "default_subheading_size")]
    pub subheading: f32,
    #[serde(default = "default_body_size")]
    pub body: f32,
    #[serde(default = "default_small_size")]
    pub table: f32,
    #[serde(default = "default_small_size")]
    pub caption: f32,
    #[serde(default = "default_small_size")]
    pub footer: f32,
}

fn default_title_size() -> f32 {
    26.0
}

fn default_heading_size() -> f32 {
    18.0
}

fn default_subheading_size() -> f32 {
    12.0
}

fn default_body_size() -> f32 {
    10.0
}

fn default_small_size() -> f32 {
    8.0
}

impl Default for FontSizes {
    fn default() -> Self {
        Self {
            title: default_title_size(),
            heading: default_heading_size(),
            subheading: default_subheading_size(),
            body: default_body_size(),
            table: default_small_size(),
            caption: default_small_size(),
            footer: default_small_size(),
        }
    }
}

/// Brand colours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandColors {
    #[serde(default = "default_primary")]
    pub primary: Rgb,
    #[serde(default = "default_text")]
    pub text: Rgb,
    #[serde(default = "default_muted")]
    pub muted: Rgb,
    #[serde(default = "default_header_fill")]
    pub table_header_fill: Rgb,
    #[serde(default = "default_border")]
    pub table_border: Rgb,
    /// Series colours for charts, cycled in order.
    #[serde(default = "default_palette")]
    pub palette: Vec<Rgb>,
}

fn default_primary() -> Rgb {
    Rgb(0x1F, 0x4E, 0x79)
}

fn default_text() -> Rgb {
    Rgb(0x11, 0x18, 0x27)
}

fn default_muted() -> Rgb {
    Rgb(0x6B, 0x72, 0x80)
}

fn default_header_fill() -> Rgb {
    Rgb(0xE5, 0xEC, 0xF4)
}

fn default_border() -> Rgb {
    Rgb(0xC8, 0xCF, 0xD8)
}

fn default_palette() -> Vec<Rgb> {
    vec![
        Rgb(0x1F, 0x77, 0xB4),
        Rgb(0xFF, 0x7F, 0x0E),
        Rgb(0x2C, 0xA0, 0x2C),
        Rgb(0xD6, 0x27, 0x28),
        Rgb(0x94, 0x67, 0xBD),
        Rgb(0x8C, 0x56, 0x4B),
    ]
}

impl Default for BrandColors {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            text: default_text(),
            muted: default_muted(),
            table_header_fill: default_header_fill(),
            table_border: default_border(),
            palette: default_palette(),
        }
    }
}

impl BrandColors {
    /// Series colour for index `i`, cycling through the palette.
    pub fn series(&self, i: usize) -> Rgb {
        if self.palette.is_empty() {
            self.primary
        } else {
            self.palette[i % self.palette.len()]
        }
    }
}

/// Visual theme passed to the composer and backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default)]
    pub page: PageGeometry,
    #[serde(default)]
    pub fonts: FontSizes,
    /// Line height as a multiple of font size.
    #[serde(default = "default_line_spacing")]
    pub line_spacing: f32,
    #[serde(default)]
    pub colors: BrandColors,
}

fn default_line_spacing() -> f32 {
    1.35
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            page: PageGeometry::default(),
            fonts: FontSizes::default(),
            line_spacing: default_line_spacing(),
            colors: BrandColors::default(),
        }
    }
}

impl Theme {
    /// Line height for a font size.
    pub fn line_height(&self, size: f32) -> f32 {
        size * self.line_spacing
    }
}

/// Pagination tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutOptions {
    /// Maximum table body rows on one page; the header row does not count.
    #[serde(default = "default_rows_per_page")]
    pub table_rows_per_page: usize,
    /// Content lines that must follow a heading on the same page.
    #[serde(default = "default_orphan_lines")]
    pub orphan_min_lines: usize,
    /// Vertical gap between paragraphs.
    #[serde(default = "default_paragraph_spacing")]
    pub paragraph_spacing: f32,
    /// Vertical gap before images, tables and sub-headings.
    #[serde(default = "default_block_spacing")]
    pub block_spacing: f32,
    /// Maximum logo height on the cover.
    #[serde(default = "default_logo_height")]
    pub max_logo_height: f32,
    /// Append a "Data availability notes" appendix listing builder warnings.
    #[serde(default = "default_true")]
    pub warnings_appendix: bool,
}

fn default_rows_per_page() -> usize {
    12
}

fn default_orphan_lines() -> usize {
    2
}

fn default_paragraph_spacing() -> f32 {
    6.0
}

fn default_block_spacing() -> f32 {
    10.0
}

fn default_logo_height() -> f32 {
    96.0
}

fn default_true() -> bool {
    true
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            table_rows_per_page: default_rows_per_page(),
            orphan_min_lines: default_orphan_lines(),
            paragraph_spacing: default_paragraph_spacing(),
            block_spacing: default_block_spacing(),
            max_logo_height: default_logo_height(),
            warnings_appendix: true,
        }
    }
}

/// Chart rasterization settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetOptions {
    /// Output width in pixels.
    #[serde(default = "default_asset_width")]
    pub width: u32,
    /// Output height in pixels.
    #[serde(default = "default_asset_height")]
    pub height: u32,
    /// Load system fonts so axis labels and titles are drawn.
    #[serde(default)]
    pub system_fonts: bool,
    /// Font family used for chart text.
    #[serde(default = "default_font_family")]
    pub font_family: String,
}

fn default_asset_width() -> u32 {
    1280
}

fn default_asset_height() -> u32 {
    720
}

fn default_font_family() -> String {
    "Helvetica".to_string()
}

impl Default for AssetOptions {
    fn default() -> Self {
        Self {
            width: default_asset_width(),
            height: default_asset_height(),
            system_fonts: false,
            font_family: default_font_family(),
        }
    }
}

/// Complete generator configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub layout: LayoutOptions,
    #[serde(default)]
    pub assets: AssetOptions,
}

impl GeneratorConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the theme.
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Set the table row capacity per page.
    pub fn with_rows_per_page(mut self, rows: usize) -> Self {
        self.layout.table_rows_per_page = rows;
        self
    }

    /// Set the chart raster size.
    pub fn with_asset_size(mut self, width: u32, height: u32) -> Self {
        self.assets.width = width;
        self.assets.height = height;
        self
    }

    /// Enable or disable the warnings appendix.
    pub fn with_warnings_appendix(mut self, enabled: bool) -> Self {
        self.layout.warnings_appendix = enabled;
        self
    }

    /// Load configuration from TOML.
    pub fn from_toml(text: &str) -> Result<Self, ConfigurationError> {
        toml::from_str(text).map_err(|e| ConfigurationError::Parse(e.to_string()))
    }

    /// Serialize to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigurationError> {
        toml::to_string_pretty(self).map_err(|e| ConfigurationError::Parse(e.to_string()))
    }

    /// Reject geometry and options that cannot produce a valid document.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let page = &self.theme.page;
        for (name, value) in [
            ("width", page.width),
            ("height", page.height),
            ("margin_top", page.margin_top),
            ("margin_bottom", page.margin_bottom),
            ("margin_left", page.margin_left),
            ("margin_right", page.margin_right),
        ] {
            // NaN fails the comparison.
            if !(value >= 0.0 && value.is_finite()) {
                return Err(ConfigurationError::InvalidGeometry(format!(
                    "page.{} must be a finite non-negative length, got {}",
                    name, value
                )));
            }
        }
        if !(page.content_width() > 0.0 && page.content_height() > 0.0) {
            return Err(ConfigurationError::InvalidGeometry(format!(
                "content area {:.1}x{:.1}pt",
                page.content_width(),
                page.content_height()
            )));
        }
        let fonts = &self.theme.fonts;
        for (name, size) in [
            ("fonts.title", fonts.title),
            ("fonts.heading", fonts.heading),
            ("fonts.subheading", fonts.subheading),
            ("fonts.body", fonts.body),
            ("fonts.table", fonts.table),
            ("fonts.caption", fonts.caption),
            ("fonts.footer", fonts.footer),
        ] {
            if !(size > 0.0) {
                return Err(ConfigurationError::InvalidOption {
                    name,
                    reason: format!("font size must be positive, got {}", size),
                });
            }
        }
        if !(self.theme.line_spacing >= 1.0) {
            return Err(ConfigurationError::InvalidOption {
                name: "line_spacing",
                reason: "must be at least 1.0".to_string(),
            });
        }
        if self.theme.line_height(self.theme.fonts.title) * 2.0 > page.content_height() {
            return Err(ConfigurationError::InvalidGeometry(
                "page too short for the title font".to_string(),
            ));
        }
        let layout = &self.layout;
        for (name, value) in [
            ("paragraph_spacing", layout.paragraph_spacing),
            ("block_spacing", layout.block_spacing),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(ConfigurationError::InvalidOption {
                    name,
                    reason: format!("spacing must be finite and non-negative, got {}", value),
                });
            }
        }
        if !(layout.max_logo_height > 0.0 && layout.max_logo_height.is_finite()) {
            return Err(ConfigurationError::InvalidOption {
                name: "max_logo_height",
                reason: format!("must be a positive length, got {}", layout.max_logo_height),
            });
        }
        if self.layout.table_rows_per_page == 0 {
            return Err(ConfigurationError::InvalidOption {
                name: "table_rows_per_page",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.assets.width == 0 || self.assets.height == 0 {
            return Err(ConfigurationError::InvalidOption {
                name: "assets",
                reason: format!(
                    "raster size must be non-zero, got {}x{}",
                    self.assets.width, self.assets.height
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GeneratorConfig::default();
        assert_eq!(config.layout.table_rows_per_page, 12);
        assert_eq!(config.layout.orphan_min_lines, 2);
        assert_eq!(config.assets.width, 1280);
        assert_eq!(config.assets.height, 720);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_content_area() {
        let page = PageGeometry::default();
        assert!((page.content_width() - 483.28).abs() < 0.01);
        assert!((page.content_height() - 721.89).abs() < 0.01);
    }

    #[test]
    fn test_rgb_parse() {
        let c = Rgb::try_from("#1f4e79".to_string()).unwrap();
        assert_eq!(c, Rgb(0x1F, 0x4E, 0x79));
        assert_eq!(c.hex(), "1F4E79");
        assert!(Rgb::try_from("blue".to_string()).is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = GeneratorConfig::new()
            .with_rows_per_page(20)
            .with_asset_size(640, 480)
            .with_warnings_appendix(false);
        assert_eq!(config.layout.table_rows_per_page, 20);
        assert_eq!(config.assets.width, 640);
        assert!(!config.layout.warnings_appendix);
    }

    #[test]
    fn test_toml_partial_override() {
        let config = GeneratorConfig::from_toml(
            r##"
            [theme.colors]
            primary = "#AA0000"

            [layout]
            table_rows_per_page = 8
            "##,
        )
        .unwrap();
        assert_eq!(config.theme.colors.primary, Rgb(0xAA, 0, 0));
        assert_eq!(config.theme.colors.palette.len(), 6);
        assert_eq!(config.layout.table_rows_per_page, 8);
        assert_eq!(config.layout.orphan_min_lines, 2);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = GeneratorConfig::default();
        let text = config.to_toml().unwrap();
        let parsed = GeneratorConfig::from_toml(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_validate_rejects_zero_rows() {
        let config = GeneratorConfig::new().with_rows_per_page(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidOption {
                name: "table_rows_per_page",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_nan_geometry() {
        let config = GeneratorConfig::from_toml(
            r#"
            [theme.page]
            height = nan
            "#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidGeometry(_))
        ));

        let mut config = GeneratorConfig::new();
        config.theme.page.margin_top = f32::NAN;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidGeometry(_))
        ));

        let mut config = GeneratorConfig::new();
        config.theme.page.margin_right = -20.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_spacing() {
        let mut config = GeneratorConfig::new();
        config.layout.paragraph_spacing = -4.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidOption {
                name: "paragraph_spacing",
                ..
            })
        ));

        let mut config = GeneratorConfig::new();
        config.layout.block_spacing = f32::NAN;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidOption {
                name: "block_spacing",
                ..
            })
        ));

        let mut config = GeneratorConfig::new();
        config.layout.paragraph_spacing = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_margins() {
        let mut config = GeneratorConfig::new();
        config.theme.page.margin_left = 400.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidGeometry(_))
        ));
    }
}
