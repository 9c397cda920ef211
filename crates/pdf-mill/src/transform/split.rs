use super::TransformError;
use super::crop::{CropConfig, crop_page};
use crate::geometry::Rect;
use crate::page::Page;
use serde::{Deserialize, Serialize};

/// Regions to cut out of every page; region order is output order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitConfig {
    pub regions: Vec<CropConfig>,
}

impl SplitConfig {
    pub fn validate(&self) -> Result<(), TransformError> {
        self.bounds().map(|_| ())
    }

    fn bounds(&self) -> Result<Vec<Rect>, TransformError> {
        if self.regions.is_empty() {
            return Err(TransformError::InvalidParameter(
                "split needs at least one region".to_string(),
            ));
        }
        self.regions.iter().map(CropConfig::bounds).collect()
    }
}

/// Cut one page into `regions.len()` pages. Each region works on its own
/// clone of the page.
pub fn split_page(page: &Page, regions: &[Rect]) -> Vec<Page> {
    regions
        .iter()
        .map(|region| crop_page(page.clone(), *region))
        .collect()
}

pub(super) fn apply(config: &SplitConfig, pages: Vec<Page>) -> Result<Vec<Page>, TransformError> {
    let regions = config.bounds()?;
    Ok(pages
        .iter()
        .flat_map(|page| split_page(page, &regions))
        .collect())
}
