//! Page transforms
//!
//! Each [`Transform`] variant owns exactly one parameter record. A
//! [`TransformStep`] pairs a transform with its `enabled` flag as written in
//! configuration. Steps consume a page sequence and produce a new one; the
//! [`StepMode`] declares how the page count changes.

mod combine;
mod crop;
mod render;
mod resize;
mod rotate;
mod split;
mod stamp;

pub use combine::{CombineConfig, LayoutItem, combine_pages};
pub use crop::{CropConfig, crop_page};
pub use render::{RenderConfig, render_page};
pub use resize::{FitMode, ResizeConfig, resize_page};
pub use rotate::{QuarterTurn, RotateAngle, RotateConfig, rotate_page};
pub use split::{SplitConfig, split_page};
pub use stamp::{StampConfig, StampPosition, format_stamp_text, parse_color, stamp_position};

use crate::page::Page;
use crate::pipeline::StepContext;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Invalid dimension '{value}': {reason}")]
    InvalidDimension { value: String, reason: String },
    #[error(
        "Invalid crop: lower-left ({}, {}) must be below and left of upper-right ({}, {})",
        .lower_left.0, .lower_left.1, .upper_right.0, .upper_right.1
    )]
    InvalidCrop {
        lower_left: (f32, f32),
        upper_right: (f32, f32),
    },
    #[error("Rotation angle must be 0, 90, 180, or 270, got {0}")]
    UnsupportedAngle(i64),
    #[error("Unknown rotation orientation: '{0}'. Valid options: landscape, portrait, auto")]
    UnknownOrientation(String),
    #[error("Unknown fit mode: '{0}'. Valid options: contain, cover, stretch")]
    UnknownFitMode(String),
    #[error(
        "Unknown stamp position: '{0}'. Valid options: top-left, top-right, bottom-left, bottom-right, center, custom"
    )]
    UnknownPosition(String),
    #[error("Unknown color: '{0}'. Use a color name (e.g. 'black', 'red') or hex code (e.g. '#FF0000')")]
    InvalidColor(String),
    #[error("Invalid datetime format '{0}'")]
    InvalidDatetimeFormat(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Orientation detection failed for source page {page}: {message}")]
    Orientation { page: usize, message: String },
    #[error("Rasterization failed: {0}")]
    Rasterize(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("page {page}: {source}")]
    AtPage {
        page: usize,
        #[source]
        source: Box<TransformError>,
    },
    #[error("step {step} ({description}): {source}")]
    Step {
        step: usize,
        description: String,
        #[source]
        source: Box<TransformError>,
    },
}

impl TransformError {
    pub(crate) fn at_page(self, page: usize) -> Self {
        match self {
            TransformError::AtPage { .. } => self,
            other => TransformError::AtPage {
                page,
                source: Box::new(other),
            },
        }
    }

    /// Position in the page sequence (0-based) the failure refers to, if any
    pub fn page(&self) -> Option<usize> {
        match self {
            TransformError::AtPage { page, .. } => Some(*page),
            TransformError::Step { source, .. } => source.page(),
            _ => None,
        }
    }
}

/// How a step changes the page count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
    /// Same count; output page i corresponds to input page i
    Replace,
    /// Each input page becomes `factor` output pages
    Expand { factor: usize },
    /// Every `batch_size` input pages become one output page (last batch may be short)
    Reduce { batch_size: usize },
}

impl StepMode {
    /// Expected output count for `input` pages
    pub fn output_len(self, input: usize) -> usize {
        match self {
            StepMode::Replace => input,
            StepMode::Expand { factor } => input * factor,
            StepMode::Reduce { batch_size } => input.div_ceil(batch_size.max(1)),
        }
    }

    /// Map output positions back to the input position they came from
    pub fn map_origins(self, origins: &[usize]) -> Vec<usize> {
        match self {
            StepMode::Replace => origins.to_vec(),
            StepMode::Expand { factor } => origins
                .iter()
                .flat_map(|&origin| std::iter::repeat_n(origin, factor))
                .collect(),
            StepMode::Reduce { batch_size } => origins
                .chunks(batch_size.max(1))
                .map(|batch| batch[0])
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    Rotate(RotateConfig),
    Crop(CropConfig),
    Resize(ResizeConfig),
    Stamp(StampConfig),
    Split(SplitConfig),
    Combine(CombineConfig),
    Render(RenderConfig),
}

impl Transform {
    pub fn kind(&self) -> &'static str {
        match self {
            Transform::Rotate(_) => "rotate",
            Transform::Crop(_) => "crop",
            Transform::Resize(_) => "size",
            Transform::Stamp(_) => "stamp",
            Transform::Split(_) => "split",
            Transform::Combine(_) => "combine",
            Transform::Render(_) => "render",
        }
    }

    pub fn mode(&self) -> StepMode {
        match self {
            Transform::Split(config) => StepMode::Expand {
                factor: config.regions.len(),
            },
            Transform::Combine(config) => StepMode::Reduce {
                batch_size: config.pages_per_output,
            },
            _ => StepMode::Replace,
        }
    }

    /// Short identifier used in dry-run logs and debug file names
    pub fn describe(&self) -> String {
        match self {
            Transform::Rotate(config) => format!("rotate{}", config.angle),
            Transform::Crop(_) => "crop".to_string(),
            Transform::Resize(config) => format!("size_{}", config.fit),
            Transform::Stamp(_) => "stamp".to_string(),
            Transform::Split(config) => format!("split{}", config.regions.len()),
            Transform::Combine(config) => format!("combine{}", config.pages_per_output),
            Transform::Render(config) => format!("render_{}dpi", config.dpi),
        }
    }

    /// Check parameters that can be validated without any pages
    pub fn validate(&self) -> Result<(), TransformError> {
        match self {
            Transform::Rotate(_) => Ok(()),
            Transform::Crop(config) => config.bounds().map(|_| ()),
            Transform::Resize(config) => config.target().map(|_| ()),
            Transform::Stamp(config) => config.validate(),
            Transform::Split(config) => config.validate(),
            Transform::Combine(config) => config.validate(),
            Transform::Render(config) => config.validate(),
        }
    }

    /// Apply to a page sequence
    pub fn apply(&self, pages: Vec<Page>, step: &StepContext<'_>) -> Result<Vec<Page>, TransformError> {
        match self {
            Transform::Rotate(config) => rotate::apply(config, pages, step),
            Transform::Crop(config) => crop::apply(config, pages),
            Transform::Resize(config) => resize::apply(config, pages),
            Transform::Stamp(config) => stamp::apply(config, pages, step),
            Transform::Split(config) => split::apply(config, pages),
            Transform::Combine(config) => combine::apply(config, pages),
            Transform::Render(config) => render::apply(config, pages, step),
        }
    }
}

/// A configured transform with its `enabled` flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStep", into = "RawStep")]
pub struct TransformStep {
    pub enabled: bool,
    pub transform: Transform,
}

impl TransformStep {
    pub fn new(transform: Transform) -> Self {
        Self {
            enabled: true,
            transform,
        }
    }

    pub fn disabled(transform: Transform) -> Self {
        Self {
            enabled: false,
            transform,
        }
    }
}

impl From<Transform> for TransformStep {
    fn from(transform: Transform) -> Self {
        TransformStep::new(transform)
    }
}

fn default_true() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

/// Configuration shape: one payload key plus an optional `enabled` flag
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStep {
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rotate: Option<RotateConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    crop: Option<CropConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    size: Option<ResizeConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stamp: Option<StampConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    split: Option<SplitConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    combine: Option<CombineConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    render: Option<RenderConfig>,
}

impl TryFrom<RawStep> for TransformStep {
    type Error = String;

    fn try_from(raw: RawStep) -> Result<Self, Self::Error> {
        let mut found: Vec<Transform> = Vec::with_capacity(1);
        found.extend(raw.rotate.map(Transform::Rotate));
        found.extend(raw.crop.map(Transform::Crop));
        found.extend(raw.size.map(Transform::Resize));
        found.extend(raw.stamp.map(Transform::Stamp));
        found.extend(raw.split.map(Transform::Split));
        found.extend(raw.combine.map(Transform::Combine));
        found.extend(raw.render.map(Transform::Render));

        if found.len() != 1 {
            let kinds: Vec<&str> = found.iter().map(Transform::kind).collect();
            return Err(format!(
                "a transform must have exactly one of rotate, crop, size, stamp, split, combine, render (found: [{}])",
                kinds.join(", ")
            ));
        }

        Ok(TransformStep {
            enabled: raw.enabled,
            transform: found.remove(0),
        })
    }
}

impl From<TransformStep> for RawStep {
    fn from(step: TransformStep) -> Self {
        let mut raw = RawStep {
            enabled: step.enabled,
            ..Default::default()
        };
        match step.transform {
            Transform::Rotate(c) => raw.rotate = Some(c),
            Transform::Crop(c) => raw.crop = Some(c),
            Transform::Resize(c) => raw.size = Some(c),
            Transform::Stamp(c) => raw.stamp = Some(c),
            Transform::Split(c) => raw.split = Some(c),
            Transform::Combine(c) => raw.combine = Some(c),
            Transform::Render(c) => raw.render = Some(c),
        }
        raw
    }
}
