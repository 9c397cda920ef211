//! Rasterization. This is the one lossy transform: vector content, text,
//! annotations and layering are all flattened into a single image.

use super::TransformError;
use crate::constants::DEFAULT_RENDER_DPI;
use crate::geometry::Matrix;
use crate::page::{Layer, LayerContent, Page};
use crate::pipeline::StepContext;
use crate::raster::Rasterizer;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

fn default_dpi() -> u32 {
    DEFAULT_RENDER_DPI
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_dpi")]
    pub dpi: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { dpi: default_dpi() }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> Result<(), TransformError> {
        if self.dpi == 0 {
            return Err(TransformError::InvalidParameter(
                "render dpi must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Replace a page's content with a raster image of it. The media box is kept.
pub fn render_page(page: &Page, dpi: u32, rasterizer: &dyn Rasterizer) -> Result<Page, TransformError> {
    let image = rasterizer.rasterize(page, dpi)?;
    let media_box = page.media_box();

    let mut rendered = Page::blank(media_box.width, media_box.height);
    rendered.set_media_box(media_box);
    rendered.replace_content(Layer::new(
        LayerContent::Image(Arc::new(image)),
        Matrix::scale(media_box.width, media_box.height)
            .then(&Matrix::translate(media_box.x, media_box.y)),
    ));
    Ok(rendered)
}

pub(super) fn apply(
    config: &RenderConfig,
    pages: Vec<Page>,
    step: &StepContext<'_>,
) -> Result<Vec<Page>, TransformError> {
    config.validate()?;
    let rasterizer = step.capabilities.rasterizer.as_ref();
    pages
        .iter()
        .enumerate()
        .map(|(position, page)| {
            render_page(page, config.dpi, rasterizer).map_err(|e| e.at_page(position))
        })
        .collect()
}
