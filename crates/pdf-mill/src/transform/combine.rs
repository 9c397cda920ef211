use super::TransformError;
use crate::dimension::{Coordinate, parse_point};
use crate::geometry::Matrix;
use crate::page::Page;
use serde::{Deserialize, Serialize};

fn default_scale() -> f32 {
    1.0
}

fn default_pages_per_output() -> usize {
    2
}

/// Placement of one batch page on the combined sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutItem {
    /// 0-based index within the batch
    #[serde(default)]
    pub page: usize,
    /// Lower-left corner of the placed page
    #[serde(default)]
    pub position: [Coordinate; 2],
    #[serde(default = "default_scale")]
    pub scale: f32,
}

impl LayoutItem {
    pub fn new(page: usize, position: [Coordinate; 2], scale: f32) -> Self {
        Self {
            page,
            position,
            scale,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombineConfig {
    /// Output sheet width and height
    pub page_size: [Coordinate; 2],
    pub layout: Vec<LayoutItem>,
    #[serde(default = "default_pages_per_output")]
    pub pages_per_output: usize,
}

struct Placement {
    page: usize,
    matrix: Matrix,
}

impl CombineConfig {
    pub fn validate(&self) -> Result<(), TransformError> {
        self.sheet_size()?;
        self.placements()?;
        Ok(())
    }

    fn sheet_size(&self) -> Result<(f32, f32), TransformError> {
        let (width, height) = parse_point(&self.page_size)?;
        if width <= 0.0 || height <= 0.0 {
            return Err(TransformError::InvalidParameter(format!(
                "combine page_size must be larger than zero, got {} x {}",
                self.page_size[0], self.page_size[1]
            )));
        }
        if self.pages_per_output == 0 {
            return Err(TransformError::InvalidParameter(
                "combine pages_per_output must be at least 1".to_string(),
            ));
        }
        Ok((width, height))
    }

    fn placements(&self) -> Result<Vec<Placement>, TransformError> {
        self.layout
            .iter()
            .map(|item| {
                if item.scale.is_nan() || item.scale <= 0.0 {
                    return Err(TransformError::InvalidParameter(format!(
                        "combine layout scale must be positive, got {}",
                        item.scale
                    )));
                }
                let (x, y) = parse_point(&item.position)?;
                Ok(Placement {
                    page: item.page,
                    matrix: Matrix::scale(item.scale, item.scale).then(&Matrix::translate(x, y)),
                })
            })
            .collect()
    }
}

fn compose(batch: &[Page], width: f32, height: f32, placements: &[Placement]) -> Page {
    let mut sheet = Page::blank(width, height);
    for placement in placements {
        // Short final batches simply leave their slots empty
        if let Some(source) = batch.get(placement.page) {
            sheet.merge_transformed_page(source, placement.matrix);
        }
    }
    sheet
}

/// Place a batch of pages onto one new `width` x `height` sheet, each item
/// scaled and then translated to its position.
pub fn combine_pages(
    batch: &[Page],
    width: f32,
    height: f32,
    layout: &[LayoutItem],
) -> Result<Page, TransformError> {
    let config = CombineConfig {
        page_size: [Coordinate::Points(width), Coordinate::Points(height)],
        layout: layout.to_vec(),
        pages_per_output: batch.len().max(1),
    };
    Ok(compose(batch, width, height, &config.placements()?))
}

pub(super) fn apply(config: &CombineConfig, pages: Vec<Page>) -> Result<Vec<Page>, TransformError> {
    let (width, height) = config.sheet_size()?;
    let placements = config.placements()?;
    Ok(pages
        .chunks(config.pages_per_output)
        .map(|batch| compose(batch, width, height, &placements))
        .collect())
}
