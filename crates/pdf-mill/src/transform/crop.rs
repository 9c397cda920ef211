use super::TransformError;
use crate::dimension::{Coordinate, parse_point};
use crate::geometry::{Matrix, Rect};
use crate::page::Page;
use serde::{Deserialize, Serialize};

/// A crop region given by two corners; each coordinate may carry its own unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropConfig {
    pub lower_left: [Coordinate; 2],
    pub upper_right: [Coordinate; 2],
}

impl CropConfig {
    pub fn new(lower_left: [Coordinate; 2], upper_right: [Coordinate; 2]) -> Self {
        Self {
            lower_left,
            upper_right,
        }
    }

    /// Resolve the region in points. Zero-area and inverted regions are rejected.
    pub fn bounds(&self) -> Result<Rect, TransformError> {
        let lower_left = parse_point(&self.lower_left)?;
        let upper_right = parse_point(&self.upper_right)?;
        if lower_left.0 >= upper_right.0 || lower_left.1 >= upper_right.1 {
            return Err(TransformError::InvalidCrop {
                lower_left,
                upper_right,
            });
        }
        Ok(Rect::from_corners(lower_left, upper_right))
    }
}

/// Move `region`'s lower-left corner to the origin and shrink the media box
/// to the region's size.
pub fn crop_page(mut page: Page, region: Rect) -> Page {
    page.add_transformation(Matrix::translate(-region.x, -region.y));
    page.set_media_box(Rect::from_size(region.width, region.height));
    page
}

pub(super) fn apply(config: &CropConfig, pages: Vec<Page>) -> Result<Vec<Page>, TransformError> {
    let region = config.bounds()?;
    Ok(pages.into_iter().map(|page| crop_page(page, region)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(value: f32) -> Coordinate {
        Coordinate::Points(value)
    }

    #[test]
    fn rejects_degenerate_regions() {
        let flat = CropConfig::new([pt(0.0), pt(10.0)], [pt(100.0), pt(10.0)]);
        assert!(matches!(flat.bounds(), Err(TransformError::InvalidCrop { .. })));

        let inverted = CropConfig::new(["2in".into(), pt(0.0)], ["1in".into(), "1in".into()]);
        assert!(matches!(inverted.bounds(), Err(TransformError::InvalidCrop { .. })));
    }

    #[test]
    fn crop_normalizes_to_origin() {
        let config = CropConfig::new([pt(36.0), "1in".into()], ["4in".into(), "6in".into()]);
        let region = config.bounds().unwrap();
        let cropped = crop_page(Page::blank(612.0, 792.0), region);
        assert_eq!(cropped.media_box(), Rect::from_size(252.0, 360.0));
    }
}
