//! In-memory page model
//!
//! A [`Page`] owns a media box, the legacy `/Rotate` display flag carried
//! over from its source, and an ordered stack of [`Layer`]s. Each layer is a
//! piece of immutable content (a source page, a text run, or a raster image)
//! plus the matrix that places it in the page's coordinate space. Content is
//! shared through `Arc`, so cloning a page to branch it is cheap and the
//! clones never observe each other's geometric changes.

use crate::geometry::{Matrix, Rect};
use lopdf::{Document, ObjectId};
use std::sync::Arc;

/// One page of a source document, captured for placement as a Form XObject.
#[derive(Debug)]
pub struct SourcePage {
    /// Document the page lives in
    pub document: Arc<Document>,
    /// Object ID of the page dictionary
    pub page_id: ObjectId,
    /// The source page's media box, used as the form's bounding box
    pub bbox: Rect,
}

/// RGB color with components in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

/// A single line of text drawn with a standard PDF font.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    /// Baseline start in layer space
    pub x: f32,
    pub y: f32,
    pub font_name: String,
    pub font_size: f32,
    pub color: Rgb,
    pub opacity: f32,
}

/// A raster image. Its layer matrix maps the unit square onto the page.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pub width_px: u32,
    pub height_px: u32,
    /// Packed 8-bit RGB samples, row-major from the top row
    pub rgb: Vec<u8>,
    pub dpi: u32,
}

#[derive(Debug, Clone)]
pub enum LayerContent {
    Form(Arc<SourcePage>),
    Text(Arc<TextRun>),
    Image(Arc<RasterImage>),
}

/// Content plus its placement.
#[derive(Debug, Clone)]
pub struct Layer {
    pub content: LayerContent,
    pub matrix: Matrix,
}

impl Layer {
    pub fn new(content: LayerContent, matrix: Matrix) -> Self {
        Self { content, matrix }
    }
}

#[derive(Debug, Clone)]
pub struct Page {
    media_box: Rect,
    rotation_flag: i64,
    layers: Vec<Layer>,
}

impl Page {
    /// A page with no content
    pub fn blank(width: f32, height: f32) -> Self {
        Self {
            media_box: Rect::from_size(width, height),
            rotation_flag: 0,
            layers: Vec::new(),
        }
    }

    /// Capture a source page as a single untransformed layer
    pub fn from_source(source: SourcePage, rotation_flag: i64) -> Self {
        let media_box = source.bbox;
        Self {
            media_box,
            rotation_flag,
            layers: vec![Layer::new(
                LayerContent::Form(Arc::new(source)),
                Matrix::IDENTITY,
            )],
        }
    }

    pub fn media_box(&self) -> Rect {
        self.media_box
    }

    pub fn set_media_box(&mut self, media_box: Rect) {
        self.media_box = media_box;
    }

    /// Page width and height in points
    pub fn dimensions(&self) -> (f32, f32) {
        (self.media_box.width, self.media_box.height)
    }

    pub fn width(&self) -> f32 {
        self.media_box.width
    }

    pub fn height(&self) -> f32 {
        self.media_box.height
    }

    pub fn is_landscape(&self) -> bool {
        self.media_box.is_landscape()
    }

    /// The `/Rotate` display flag inherited from the source (degrees)
    pub fn rotation_flag(&self) -> i64 {
        self.rotation_flag
    }

    pub fn clear_rotation_flag(&mut self) {
        self.rotation_flag = 0;
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Post-multiply every layer by `matrix`, transforming all existing
    /// content. The media box is left alone.
    pub fn add_transformation(&mut self, matrix: Matrix) {
        for layer in &mut self.layers {
            layer.matrix = layer.matrix.then(&matrix);
        }
    }

    /// Composite new content on top of the existing layers
    pub fn push_layer(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    /// Composite another page's content on top of this one, unchanged
    pub fn merge_page(&mut self, other: &Page) {
        self.merge_transformed_page(other, Matrix::IDENTITY);
    }

    /// Composite another page's content on top of this one, placed by `matrix`
    pub fn merge_transformed_page(&mut self, other: &Page, matrix: Matrix) {
        self.layers.extend(other.layers.iter().map(|layer| Layer {
            content: layer.content.clone(),
            matrix: layer.matrix.then(&matrix),
        }));
    }

    /// Replace all content with a single layer
    pub fn replace_content(&mut self, layer: Layer) {
        self.layers = vec![layer];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_layer() -> Layer {
        Layer::new(
            LayerContent::Text(Arc::new(TextRun {
                text: "x".into(),
                x: 0.0,
                y: 0.0,
                font_name: "Helvetica".into(),
                font_size: 10.0,
                color: Rgb::BLACK,
                opacity: 1.0,
            })),
            Matrix::IDENTITY,
        )
    }

    #[test]
    fn clones_transform_independently() {
        let mut original = Page::blank(100.0, 100.0);
        original.push_layer(text_layer());

        let mut branch = original.clone();
        branch.add_transformation(Matrix::translate(-50.0, 0.0));
        branch.set_media_box(Rect::from_size(50.0, 100.0));

        assert!(original.layers()[0].matrix.is_identity());
        assert_eq!(original.media_box(), Rect::from_size(100.0, 100.0));
        assert_eq!(branch.layers()[0].matrix, Matrix::translate(-50.0, 0.0));
    }

    #[test]
    fn merge_places_layers_after_existing_content() {
        let mut sheet = Page::blank(200.0, 200.0);
        let mut src = Page::blank(100.0, 100.0);
        src.push_layer(text_layer());

        sheet.merge_transformed_page(&src, Matrix::translate(100.0, 0.0));
        sheet.merge_page(&src);

        assert_eq!(sheet.layers().len(), 2);
        assert_eq!(sheet.layers()[0].matrix, Matrix::translate(100.0, 0.0));
        assert!(sheet.layers()[1].matrix.is_identity());
    }
}
