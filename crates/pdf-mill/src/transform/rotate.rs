use super::TransformError;
use crate::geometry::{Matrix, Rect};
use crate::page::Page;
use crate::pipeline::StepContext;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four supported rotation angles (counter-clockwise)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuarterTurn {
    Zero,
    Ninety,
    OneEighty,
    TwoSeventy,
}

impl QuarterTurn {
    pub fn from_degrees(degrees: i64) -> Result<Self, TransformError> {
        match degrees {
            0 => Ok(QuarterTurn::Zero),
            90 => Ok(QuarterTurn::Ninety),
            180 => Ok(QuarterTurn::OneEighty),
            270 => Ok(QuarterTurn::TwoSeventy),
            other => Err(TransformError::UnsupportedAngle(other)),
        }
    }

    pub fn degrees(self) -> i32 {
        match self {
            QuarterTurn::Zero => 0,
            QuarterTurn::Ninety => 90,
            QuarterTurn::OneEighty => 180,
            QuarterTurn::TwoSeventy => 270,
        }
    }
}

/// Requested rotation: a literal angle or a target orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AngleValue", into = "AngleValue")]
pub enum RotateAngle {
    Fixed(QuarterTurn),
    /// Rotate 90° only if the page is currently portrait
    Landscape,
    /// Rotate 90° only if the page is currently landscape
    Portrait,
    /// Ask the orientation detector about the original source page
    Auto,
}

impl Default for RotateAngle {
    fn default() -> Self {
        RotateAngle::Fixed(QuarterTurn::Zero)
    }
}

impl fmt::Display for RotateAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RotateAngle::Fixed(turn) => write!(f, "{}", turn.degrees()),
            RotateAngle::Landscape => f.write_str("landscape"),
            RotateAngle::Portrait => f.write_str("portrait"),
            RotateAngle::Auto => f.write_str("auto"),
        }
    }
}

impl std::str::FromStr for RotateAngle {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim().to_lowercase();
        if let Ok(degrees) = text.parse::<i64>() {
            return QuarterTurn::from_degrees(degrees).map(RotateAngle::Fixed);
        }
        match text.as_str() {
            "landscape" => Ok(RotateAngle::Landscape),
            "portrait" => Ok(RotateAngle::Portrait),
            "auto" => Ok(RotateAngle::Auto),
            _ => Err(TransformError::UnknownOrientation(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum AngleValue {
    Degrees(i64),
    Keyword(String),
}

impl TryFrom<AngleValue> for RotateAngle {
    type Error = TransformError;

    fn try_from(value: AngleValue) -> Result<Self, Self::Error> {
        match value {
            AngleValue::Degrees(degrees) => QuarterTurn::from_degrees(degrees).map(RotateAngle::Fixed),
            AngleValue::Keyword(text) => text.parse(),
        }
    }
}

impl From<RotateAngle> for AngleValue {
    fn from(angle: RotateAngle) -> Self {
        match angle {
            RotateAngle::Fixed(turn) => AngleValue::Degrees(turn.degrees() as i64),
            other => AngleValue::Keyword(other.to_string()),
        }
    }
}

/// Rotate parameters. Written either as a bare angle (`"rotate": 90`) or as
/// a table with an optional subset of sequence positions to rotate.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawRotate", into = "RawRotate")]
pub struct RotateConfig {
    pub angle: RotateAngle,
    /// 0-based positions in the current page sequence; `None` or an empty
    /// list rotates all
    pub pages: Option<Vec<usize>>,
}

impl RotateConfig {
    pub fn new(angle: RotateAngle) -> Self {
        Self { angle, pages: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawRotate {
    Short(RotateAngle),
    Full {
        angle: RotateAngle,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pages: Option<Vec<usize>>,
    },
}

impl TryFrom<RawRotate> for RotateConfig {
    type Error = TransformError;

    fn try_from(raw: RawRotate) -> Result<Self, Self::Error> {
        Ok(match raw {
            RawRotate::Short(angle) => RotateConfig::new(angle),
            RawRotate::Full { angle, pages } => RotateConfig { angle, pages },
        })
    }
}

impl From<RotateConfig> for RawRotate {
    fn from(config: RotateConfig) -> Self {
        match config.pages {
            None => RawRotate::Short(config.angle),
            pages => RawRotate::Full {
                angle: config.angle,
                pages,
            },
        }
    }
}

/// Rotate a page's content counter-clockwise and translate it back into the
/// positive quadrant. The `/Rotate` display flag is dropped so the rotation
/// is applied exactly once, geometrically.
pub fn rotate_page(mut page: Page, turn: QuarterTurn) -> Page {
    let (width, height) = page.dimensions();
    let (tx, ty, new_width, new_height) = match turn {
        QuarterTurn::Zero => return page,
        QuarterTurn::Ninety => (height, 0.0, height, width),
        QuarterTurn::OneEighty => (width, height, width, height),
        QuarterTurn::TwoSeventy => (0.0, width, height, width),
    };

    page.clear_rotation_flag();
    page.add_transformation(Matrix::rotate(turn.degrees()).then(&Matrix::translate(tx, ty)));
    page.set_media_box(Rect::from_size(new_width, new_height));
    page
}

fn resolve_turn(
    angle: RotateAngle,
    page: &Page,
    position: usize,
    step: &StepContext<'_>,
) -> Result<QuarterTurn, TransformError> {
    match angle {
        RotateAngle::Fixed(turn) => Ok(turn),
        RotateAngle::Landscape if page.is_landscape() => Ok(QuarterTurn::Zero),
        RotateAngle::Landscape => Ok(QuarterTurn::Ninety),
        RotateAngle::Portrait if page.is_landscape() => Ok(QuarterTurn::Ninety),
        RotateAngle::Portrait => Ok(QuarterTurn::Zero),
        RotateAngle::Auto => {
            let source = step.run.source_path.as_deref().ok_or_else(|| {
                TransformError::InvalidParameter(
                    "auto rotation needs the source document path".to_string(),
                )
            })?;
            let original = step.origin(position).ok_or_else(|| {
                TransformError::InvalidParameter(format!(
                    "no source page is recorded for position {}",
                    position
                ))
            })?;
            step.capabilities.detector.detect(source, original)
        }
    }
}

pub(super) fn apply(
    config: &RotateConfig,
    pages: Vec<Page>,
    step: &StepContext<'_>,
) -> Result<Vec<Page>, TransformError> {
    // Positions listed twice are rotated twice; positions past the end are ignored.
    // An empty list means every page.
    let mut times = vec![0usize; pages.len()];
    match &config.pages {
        Some(subset) if !subset.is_empty() => {
            for &idx in subset {
                if let Some(count) = times.get_mut(idx) {
                    *count += 1;
                }
            }
        }
        _ => times.fill(1),
    }

    pages
        .into_iter()
        .zip(times)
        .enumerate()
        .map(|(position, (mut page, count))| {
            for _ in 0..count {
                let turn = resolve_turn(config.angle, &page, position, step)
                    .map_err(|e| e.at_page(position))?;
                page = rotate_page(page, turn);
            }
            Ok(page)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_angle_forms() {
        let config: RotateConfig = serde_json::from_str("180").unwrap();
        assert_eq!(config.angle, RotateAngle::Fixed(QuarterTurn::OneEighty));
        assert!(config.pages.is_none());

        let config: RotateConfig =
            serde_json::from_str(r#"{"angle": "Landscape", "pages": [0, 2]}"#).unwrap();
        assert_eq!(config.angle, RotateAngle::Landscape);
        assert_eq!(config.pages, Some(vec![0, 2]));

        assert!(serde_json::from_str::<RotateConfig>("45").is_err());
        assert!(serde_json::from_str::<RotateConfig>(r#""sideways""#).is_err());
    }

    #[test]
    fn quarter_turn_boxes() {
        let page = Page::blank(612.0, 792.0);
        assert_eq!(rotate_page(page.clone(), QuarterTurn::Ninety).dimensions(), (792.0, 612.0));
        assert_eq!(rotate_page(page.clone(), QuarterTurn::OneEighty).dimensions(), (612.0, 792.0));
        assert_eq!(rotate_page(page.clone(), QuarterTurn::TwoSeventy).dimensions(), (792.0, 612.0));
        assert_eq!(rotate_page(page, QuarterTurn::Zero).dimensions(), (612.0, 792.0));
    }
}
