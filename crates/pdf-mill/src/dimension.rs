//! Length literals ("100mm", "4in", "288pt", "10cm") and coordinates.

use crate::constants::{cm_to_pt, in_to_pt, mm_to_pt};
use crate::transform::TransformError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static DIMENSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(?:\.\d*)?|\.\d+)\s*(pt|in|mm|cm)$").expect("dimension pattern is valid")
});

/// Parse a dimension string to points.
///
/// The number must be unsigned decimal and directly followed (optional
/// whitespace allowed) by a case-insensitive unit suffix.
pub fn parse_dimension(text: &str) -> Result<f32, TransformError> {
    let normalized = text.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        return Err(TransformError::InvalidDimension {
            value: text.to_string(),
            reason: "empty dimension value".to_string(),
        });
    }

    let captures = DIMENSION_RE
        .captures(&normalized)
        .ok_or_else(|| TransformError::InvalidDimension {
            value: text.to_string(),
            reason: "use a format like '100mm', '4in', '288pt' or '10cm'".to_string(),
        })?;

    let number: f32 = captures[1]
        .parse()
        .map_err(|_| TransformError::InvalidDimension {
            value: text.to_string(),
            reason: "malformed number".to_string(),
        })?;

    let points = match &captures[2] {
        "pt" => number,
        "in" => in_to_pt(number),
        "mm" => mm_to_pt(number),
        "cm" => cm_to_pt(number),
        unit => {
            return Err(TransformError::InvalidDimension {
                value: text.to_string(),
                reason: format!("unknown unit '{}'", unit),
            });
        }
    };

    Ok(points)
}

/// A coordinate as written in configuration: a bare number of points or a
/// unit-bearing string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coordinate {
    Points(f32),
    Length(String),
}

impl Coordinate {
    pub fn to_points(&self) -> Result<f32, TransformError> {
        parse_coordinate(self)
    }
}

impl Default for Coordinate {
    fn default() -> Self {
        Coordinate::Points(0.0)
    }
}

impl From<f32> for Coordinate {
    fn from(value: f32) -> Self {
        Coordinate::Points(value)
    }
}

impl From<&str> for Coordinate {
    fn from(value: &str) -> Self {
        Coordinate::Length(value.to_string())
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coordinate::Points(pt) => write!(f, "{}", pt),
            Coordinate::Length(s) => f.write_str(s),
        }
    }
}

/// Resolve a coordinate to points. Numbers are taken as points.
pub fn parse_coordinate(value: &Coordinate) -> Result<f32, TransformError> {
    match value {
        Coordinate::Points(pt) => Ok(*pt),
        Coordinate::Length(text) => parse_dimension(text),
    }
}

/// Resolve an (x, y) pair.
pub(crate) fn parse_point(pair: &[Coordinate; 2]) -> Result<(f32, f32), TransformError> {
    Ok((parse_coordinate(&pair[0])?, parse_coordinate(&pair[1])?))
}
