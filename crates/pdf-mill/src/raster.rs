//! Page rasterization backends
//!
//! The render transform and OCR-based orientation detection need pixels.
//! Backends implement [`Rasterizer`]; the default [`UnavailableRasterizer`]
//! refuses so a run without a renderer fails loudly instead of producing
//! blank pages.

use crate::constants::POINTS_PER_INCH;
use crate::page::{Page, RasterImage};
use crate::transform::TransformError;

pub trait Rasterizer: Send + Sync {
    /// Render the page's media box at `dpi`
    fn rasterize(&self, page: &Page, dpi: u32) -> Result<RasterImage, TransformError>;
}

/// Pixel dimensions of a page rendered at `dpi`
pub fn pixel_size(page: &Page, dpi: u32) -> (u32, u32) {
    let to_px = |pt: f32| ((pt / POINTS_PER_INCH) * dpi as f32).round().max(1.0) as u32;
    (to_px(page.width()), to_px(page.height()))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableRasterizer;

impl Rasterizer for UnavailableRasterizer {
    fn rasterize(&self, _page: &Page, _dpi: u32) -> Result<RasterImage, TransformError> {
        Err(TransformError::Unavailable(
            "page rendering is not available; rebuild with the `pdfium` feature".to_string(),
        ))
    }
}

/// Produces a uniformly colored image of the right size. Useful for dry
/// layouts and tests.
#[derive(Debug, Clone, Copy)]
pub struct SolidRasterizer {
    pub rgb: [u8; 3],
}

impl SolidRasterizer {
    pub fn new(rgb: [u8; 3]) -> Self {
        Self { rgb }
    }
}

impl Default for SolidRasterizer {
    fn default() -> Self {
        Self::new([255, 255, 255])
    }
}

impl Rasterizer for SolidRasterizer {
    fn rasterize(&self, page: &Page, dpi: u32) -> Result<RasterImage, TransformError> {
        let (width_px, height_px) = pixel_size(page, dpi);
        let pixels = width_px as usize * height_px as usize;
        Ok(RasterImage {
            width_px,
            height_px,
            rgb: self.rgb.repeat(pixels),
            dpi,
        })
    }
}

#[cfg(feature = "pdfium")]
pub use pdfium::PdfiumRasterizer;

#[cfg(feature = "pdfium")]
mod pdfium {
    use super::{Rasterizer, pixel_size};
    use crate::codec::write_pages;
    use crate::page::{Page, RasterImage};
    use crate::transform::TransformError;
    use pdfium_render::prelude::*;
    use std::path::PathBuf;

    /// Renders pages with the Pdfium library.
    ///
    /// Each call writes the page to an in-memory PDF and renders page 0 of it,
    /// so every layer (forms, stamps, earlier renders) is included.
    #[derive(Debug, Clone, Default)]
    pub struct PdfiumRasterizer {
        library_dir: Option<PathBuf>,
    }

    impl PdfiumRasterizer {
        pub fn new() -> Self {
            Self::default()
        }

        /// Look for the Pdfium shared library in `dir` before the system paths
        pub fn with_library_dir(dir: impl Into<PathBuf>) -> Self {
            Self {
                library_dir: Some(dir.into()),
            }
        }

        fn init_pdfium(&self) -> Result<Pdfium, PdfiumError> {
            if let Some(dir) = &self.library_dir {
                if let Ok(binding) =
                    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
                {
                    return Ok(Pdfium::new(binding));
                }
            }

            // Fallback to system library or default search paths
            Pdfium::bind_to_system_library().map(Pdfium::new)
        }
    }

    fn render_error(e: impl std::fmt::Display) -> TransformError {
        TransformError::Rasterize(e.to_string())
    }

    impl Rasterizer for PdfiumRasterizer {
        fn rasterize(&self, page: &Page, dpi: u32) -> Result<RasterImage, TransformError> {
            let mut single = write_pages(std::slice::from_ref(page)).map_err(render_error)?;
            let mut bytes = Vec::new();
            single.save_to(&mut bytes).map_err(render_error)?;

            let pdfium = self.init_pdfium().map_err(|e| {
                TransformError::Unavailable(format!("Pdfium library could not be loaded: {}", e))
            })?;
            let document = pdfium
                .load_pdf_from_byte_slice(&bytes, None)
                .map_err(render_error)?;
            let rendered = document.pages().get(0).map_err(render_error)?;

            let (width_px, height_px) = pixel_size(page, dpi);
            let config = PdfRenderConfig::new()
                .set_target_width(width_px as i32)
                .set_maximum_height(height_px as i32);
            let bitmap = rendered.render_with_config(&config).map_err(render_error)?;

            let rgba = image::RgbaImage::from_raw(
                bitmap.width() as u32,
                bitmap.height() as u32,
                bitmap.as_rgba_bytes().to_vec(),
            )
            .ok_or_else(|| render_error("bitmap size does not match its buffer"))?;
            let rgb = image::DynamicImage::ImageRgba8(rgba).to_rgb8();

            Ok(RasterImage {
                width_px: rgb.width(),
                height_px: rgb.height(),
                rgb: rgb.into_raw(),
                dpi,
            })
        }
    }
}
