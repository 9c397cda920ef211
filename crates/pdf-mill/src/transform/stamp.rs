use super::TransformError;
use crate::constants::{
    DATE_FORMAT, DEFAULT_DATETIME_FORMAT, HELVETICA_CHAR_WIDTH_RATIO, STAMP_FONT_NAME, STAMP_FONT_SIZE,
    STAMP_MARGIN, TIME_FORMAT,
};
use crate::dimension::{Coordinate, parse_coordinate};
use crate::geometry::Matrix;
use crate::page::{Layer, LayerContent, Page, Rgb, TextRun};
use crate::pipeline::StepContext;
use chrono::NaiveDateTime;
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::sync::Arc;

/// The standard 14 PDF fonts, usable without embedding
const STANDARD_FONTS: [&str; 14] = [
    "Courier",
    "Courier-Bold",
    "Courier-BoldOblique",
    "Courier-Oblique",
    "Helvetica",
    "Helvetica-Bold",
    "Helvetica-BoldOblique",
    "Helvetica-Oblique",
    "Symbol",
    "Times-Bold",
    "Times-BoldItalic",
    "Times-Italic",
    "Times-Roman",
    "ZapfDingbats",
];

/// Where the stamp is anchored on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StampPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
    Center,
    /// Use the configured `x`/`y` verbatim
    Custom,
}

impl fmt::Display for StampPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StampPosition::TopLeft => "top-left",
            StampPosition::TopRight => "top-right",
            StampPosition::BottomLeft => "bottom-left",
            StampPosition::BottomRight => "bottom-right",
            StampPosition::Center => "center",
            StampPosition::Custom => "custom",
        })
    }
}

impl std::str::FromStr for StampPosition {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "top-left" => Ok(StampPosition::TopLeft),
            "top-right" => Ok(StampPosition::TopRight),
            "bottom-left" => Ok(StampPosition::BottomLeft),
            "bottom-right" => Ok(StampPosition::BottomRight),
            "center" => Ok(StampPosition::Center),
            "custom" => Ok(StampPosition::Custom),
            _ => Err(TransformError::UnknownPosition(s.to_string())),
        }
    }
}

impl TryFrom<String> for StampPosition {
    type Error = TransformError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StampPosition> for String {
    fn from(position: StampPosition) -> Self {
        position.to_string()
    }
}

fn default_font_size() -> f32 {
    STAMP_FONT_SIZE
}

fn default_font_name() -> String {
    STAMP_FONT_NAME.to_string()
}

fn default_font_color() -> String {
    "black".to_string()
}

fn default_opacity() -> f32 {
    1.0
}

fn default_margin() -> Coordinate {
    Coordinate::Points(STAMP_MARGIN)
}

fn default_datetime_format() -> String {
    DEFAULT_DATETIME_FORMAT.to_string()
}

/// Text overlay parameters.
///
/// `text` may contain `{page}`, `{total}`, `{date}`, `{time}` and
/// `{datetime}` placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StampConfig {
    pub text: String,
    #[serde(default)]
    pub position: StampPosition,
    /// Used only with [`StampPosition::Custom`]
    #[serde(default)]
    pub x: Coordinate,
    #[serde(default)]
    pub y: Coordinate,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default = "default_font_name")]
    pub font_name: String,
    #[serde(default = "default_font_color")]
    pub font_color: String,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(default = "default_margin")]
    pub margin: Coordinate,
    #[serde(default = "default_datetime_format")]
    pub datetime_format: String,
}

impl StampConfig {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            position: StampPosition::default(),
            x: Coordinate::default(),
            y: Coordinate::default(),
            font_size: default_font_size(),
            font_name: default_font_name(),
            font_color: default_font_color(),
            opacity: default_opacity(),
            margin: default_margin(),
            datetime_format: default_datetime_format(),
        }
    }

    pub fn validate(&self) -> Result<(), TransformError> {
        self.resolve().map(|_| ())
    }

    fn resolve(&self) -> Result<ResolvedStamp, TransformError> {
        if self.font_size.is_nan() || self.font_size <= 0.0 {
            return Err(TransformError::InvalidParameter(format!(
                "stamp font_size must be positive, got {}",
                self.font_size
            )));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(TransformError::InvalidParameter(format!(
                "stamp opacity must be between 0 and 1, got {}",
                self.opacity
            )));
        }
        if !STANDARD_FONTS.contains(&self.font_name.as_str()) {
            return Err(TransformError::InvalidParameter(format!(
                "stamp font '{}' is not a standard PDF font",
                self.font_name
            )));
        }
        if StrftimeItems::new(&self.datetime_format).any(|item| matches!(item, Item::Error)) {
            return Err(TransformError::InvalidDatetimeFormat(self.datetime_format.clone()));
        }

        let custom = if self.position == StampPosition::Custom {
            (parse_coordinate(&self.x)?, parse_coordinate(&self.y)?)
        } else {
            (0.0, 0.0)
        };

        Ok(ResolvedStamp {
            color: parse_color(&self.font_color)?,
            margin: parse_coordinate(&self.margin)?,
            custom,
        })
    }
}

struct ResolvedStamp {
    color: Rgb,
    margin: f32,
    custom: (f32, f32),
}

/// Parse a color name or a `#RRGGBB` hex code.
pub fn parse_color(text: &str) -> Result<Rgb, TransformError> {
    let trimmed = text.trim();
    if let Some(hex) = trimmed.strip_prefix('#') {
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(TransformError::InvalidColor(text.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map(|v| v as f32 / 255.0)
                .map_err(|_| TransformError::InvalidColor(text.to_string()))
        };
        return Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?));
    }

    let rgb = match trimmed.to_lowercase().as_str() {
        "black" => (0x00, 0x00, 0x00),
        "white" => (0xFF, 0xFF, 0xFF),
        "red" => (0xFF, 0x00, 0x00),
        "green" => (0x00, 0x80, 0x00),
        "blue" => (0x00, 0x00, 0xFF),
        "yellow" => (0xFF, 0xFF, 0x00),
        "orange" => (0xFF, 0xA5, 0x00),
        "purple" => (0x80, 0x00, 0x80),
        "cyan" => (0x00, 0xFF, 0xFF),
        "magenta" => (0xFF, 0x00, 0xFF),
        "gray" | "grey" => (0x80, 0x80, 0x80),
        "darkgray" | "darkgrey" => (0xA9, 0xA9, 0xA9),
        "lightgray" | "lightgrey" => (0xD3, 0xD3, 0xD3),
        "navy" => (0x00, 0x00, 0x80),
        "maroon" => (0x80, 0x00, 0x00),
        "darkred" => (0x8B, 0x00, 0x00),
        "darkgreen" => (0x00, 0x64, 0x00),
        "darkblue" => (0x00, 0x00, 0x8B),
        "brown" => (0xA5, 0x2A, 0x2A),
        "pink" => (0xFF, 0xC0, 0xCB),
        _ => return Err(TransformError::InvalidColor(text.to_string())),
    };
    Ok(Rgb::new(
        rgb.0 as f32 / 255.0,
        rgb.1 as f32 / 255.0,
        rgb.2 as f32 / 255.0,
    ))
}

fn format_timestamp(timestamp: &NaiveDateTime, format: &str) -> Result<String, TransformError> {
    let mut out = String::new();
    write!(out, "{}", timestamp.format(format))
        .map_err(|_| TransformError::InvalidDatetimeFormat(format.to_string()))?;
    Ok(out)
}

/// Substitute stamp placeholders.
pub fn format_stamp_text(
    text: &str,
    page_num: usize,
    total_pages: usize,
    timestamp: &NaiveDateTime,
    datetime_format: &str,
) -> Result<String, TransformError> {
    let mut result = text
        .replace("{page}", &page_num.to_string())
        .replace("{total}", &total_pages.to_string());
    if result.contains("{datetime}") {
        result = result.replace("{datetime}", &format_timestamp(timestamp, datetime_format)?);
    }
    if result.contains("{date}") {
        result = result.replace("{date}", &format_timestamp(timestamp, DATE_FORMAT)?);
    }
    if result.contains("{time}") {
        result = result.replace("{time}", &format_timestamp(timestamp, TIME_FORMAT)?);
    }
    Ok(result)
}

/// Baseline start for a stamp. Preset positions estimate the text box as
/// `chars * font_size * 0.5` wide and `font_size` tall.
pub fn stamp_position(
    position: StampPosition,
    page_width: f32,
    page_height: f32,
    text: &str,
    font_size: f32,
    margin: f32,
    custom: (f32, f32),
) -> (f32, f32) {
    let text_width = text.chars().count() as f32 * font_size * HELVETICA_CHAR_WIDTH_RATIO;
    let text_height = font_size;

    match position {
        StampPosition::Custom => custom,
        StampPosition::TopLeft => (margin, page_height - margin - text_height),
        StampPosition::TopRight => (
            page_width - margin - text_width,
            page_height - margin - text_height,
        ),
        StampPosition::BottomLeft => (margin, margin),
        StampPosition::BottomRight => (page_width - margin - text_width, margin),
        StampPosition::Center => (
            (page_width - text_width) / 2.0,
            (page_height - text_height) / 2.0,
        ),
    }
}

fn stamp_page(
    mut page: Page,
    config: &StampConfig,
    resolved: &ResolvedStamp,
    page_num: usize,
    total_pages: usize,
    timestamp: &NaiveDateTime,
) -> Result<Page, TransformError> {
    let text = format_stamp_text(
        &config.text,
        page_num,
        total_pages,
        timestamp,
        &config.datetime_format,
    )?;
    let (width, height) = page.dimensions();
    let (x, y) = stamp_position(
        config.position,
        width,
        height,
        &text,
        config.font_size,
        resolved.margin,
        resolved.custom,
    );

    page.push_layer(Layer::new(
        LayerContent::Text(Arc::new(TextRun {
            text,
            x,
            y,
            font_name: config.font_name.clone(),
            font_size: config.font_size,
            color: resolved.color,
            opacity: config.opacity,
        })),
        Matrix::IDENTITY,
    ));
    Ok(page)
}

pub(super) fn apply(
    config: &StampConfig,
    pages: Vec<Page>,
    step: &StepContext<'_>,
) -> Result<Vec<Page>, TransformError> {
    let resolved = config.resolve()?;
    let total = pages.len();
    pages
        .into_iter()
        .enumerate()
        .map(|(position, page)| {
            stamp_page(page, config, &resolved, position + 1, total, &step.run.timestamp)
                .map_err(|e| e.at_page(position))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(12, 30, 5))
            .unwrap()
    }

    #[test]
    fn placeholders_are_substituted() {
        let text = format_stamp_text(
            "Page {page} of {total} @ {date} {time} ({datetime})",
            2,
            7,
            &noon(),
            "%d/%m",
        )
        .unwrap();
        assert_eq!(text, "Page 2 of 7 @ 2024-03-09 12:30:05 (09/03)");
    }

    #[test]
    fn preset_positions_use_estimated_width() {
        // 4 chars * 10pt * 0.5 = 20pt wide, 10pt tall
        let at = |p| stamp_position(p, 200.0, 100.0, "abcd", 10.0, 10.0, (3.0, 4.0));
        assert_eq!(at(StampPosition::TopLeft), (10.0, 80.0));
        assert_eq!(at(StampPosition::TopRight), (170.0, 80.0));
        assert_eq!(at(StampPosition::BottomLeft), (10.0, 10.0));
        assert_eq!(at(StampPosition::BottomRight), (170.0, 10.0));
        assert_eq!(at(StampPosition::Center), (90.0, 45.0));
        assert_eq!(at(StampPosition::Custom), (3.0, 4.0));
    }

    #[test]
    fn colors() {
        assert_eq!(parse_color("#FF0000").unwrap(), Rgb::new(1.0, 0.0, 0.0));
        assert_eq!(parse_color("Black").unwrap(), Rgb::BLACK);
        assert!(parse_color("#FF00").is_err());
        assert!(parse_color("chartreuse-ish").is_err());
    }

    #[test]
    fn validation_catches_bad_styles() {
        let mut config = StampConfig::new("x");
        assert!(config.validate().is_ok());

        config.opacity = 1.5;
        assert!(config.validate().is_err());

        let mut config = StampConfig::new("x");
        config.datetime_format = "%Y-%Q".to_string();
        assert!(matches!(
            config.validate(),
            Err(TransformError::InvalidDatetimeFormat(_))
        ));

        let mut config = StampConfig::new("x");
        config.font_name = "Comic Sans".to_string();
        assert!(config.validate().is_err());

        let position: StampPosition = serde_json::from_str(r#""top_left""#).unwrap();
        assert_eq!(position, StampPosition::TopLeft);
        assert!(serde_json::from_str::<StampPosition>(r#""middle""#).is_err());
    }
}
