use super::TransformError;
use crate::dimension::parse_dimension;
use crate::geometry::{Matrix, Rect};
use crate::page::Page;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How content is scaled into the target box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FitMode {
    /// Uniform scale so the whole page fits; centered
    #[default]
    Contain,
    /// Uniform scale so the page fills the box; centered, overflow is clipped by the box
    Cover,
    /// Independent x/y scale, no centering
    Stretch,
}

impl fmt::Display for FitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FitMode::Contain => "contain",
            FitMode::Cover => "cover",
            FitMode::Stretch => "stretch",
        })
    }
}

impl std::str::FromStr for FitMode {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "contain" => Ok(FitMode::Contain),
            "cover" => Ok(FitMode::Cover),
            "stretch" => Ok(FitMode::Stretch),
            _ => Err(TransformError::UnknownFitMode(s.to_string())),
        }
    }
}

impl TryFrom<String> for FitMode {
    type Error = TransformError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FitMode> for String {
    fn from(mode: FitMode) -> Self {
        mode.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResizeConfig {
    /// Target width, e.g. "100mm"
    pub width: String,
    /// Target height, e.g. "150mm"
    pub height: String,
    #[serde(default)]
    pub fit: FitMode,
}

impl ResizeConfig {
    pub fn new(width: impl Into<String>, height: impl Into<String>, fit: FitMode) -> Self {
        Self {
            width: width.into(),
            height: height.into(),
            fit,
        }
    }

    /// Target size in points
    pub fn target(&self) -> Result<(f32, f32), TransformError> {
        let width = parse_dimension(&self.width)?;
        let height = parse_dimension(&self.height)?;
        if width <= 0.0 || height <= 0.0 {
            return Err(TransformError::InvalidParameter(format!(
                "resize target must be larger than zero, got {} x {}",
                self.width, self.height
            )));
        }
        Ok((width, height))
    }
}

/// Scale a page into a `width` x `height` box. The media box always ends up
/// exactly `(0, 0)-(width, height)`.
pub fn resize_page(mut page: Page, width: f32, height: f32, fit: FitMode) -> Result<Page, TransformError> {
    let (current_width, current_height) = page.dimensions();
    if current_width <= 0.0 || current_height <= 0.0 {
        return Err(TransformError::InvalidParameter(format!(
            "cannot resize a page of {} x {} pt",
            current_width, current_height
        )));
    }

    let scale_x = width / current_width;
    let scale_y = height / current_height;

    let matrix = match fit {
        FitMode::Stretch => Matrix::scale(scale_x, scale_y),
        FitMode::Contain | FitMode::Cover => {
            let scale = if fit == FitMode::Contain {
                scale_x.min(scale_y)
            } else {
                scale_x.max(scale_y)
            };
            let offset_x = (width - current_width * scale) / 2.0;
            let offset_y = (height - current_height * scale) / 2.0;
            Matrix::scale(scale, scale).then(&Matrix::translate(offset_x, offset_y))
        }
    };

    page.add_transformation(matrix);
    page.set_media_box(Rect::from_size(width, height));
    Ok(page)
}

pub(super) fn apply(config: &ResizeConfig, pages: Vec<Page>) -> Result<Vec<Page>, TransformError> {
    let (width, height) = config.target()?;
    pages
        .into_iter()
        .enumerate()
        .map(|(position, page)| {
            resize_page(page, width, height, config.fit).map_err(|e| e.at_page(position))
        })
        .collect()
}
