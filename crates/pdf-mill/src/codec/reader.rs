//! Reading source pages out of a loaded document

use super::io::load_pdf;
use crate::constants::DEFAULT_PAGE_DIMENSIONS;
use crate::geometry::Rect;
use crate::page::{Page, SourcePage};
use crate::selector::SelectionError;
use crate::Result;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Guard against cyclic `/Parent` chains in malformed files
const MAX_TREE_DEPTH: usize = 64;

/// A loaded source PDF
#[derive(Debug, Clone)]
pub struct SourceDocument {
    path: PathBuf,
    document: Arc<Document>,
    page_ids: Vec<ObjectId>,
}

impl SourceDocument {
    pub fn new(path: impl Into<PathBuf>, document: Document) -> Self {
        // get_pages is keyed by page number, so values come out in page order
        let page_ids = document.get_pages().values().copied().collect();
        Self {
            path: path.into(),
            document: Arc::new(document),
            page_ids,
        }
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let document = load_pdf(path).await?;
        Ok(Self::new(path, document))
    }

    /// Blocking load, for use inside worker threads
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let document = Document::load(path)?;
        Ok(Self::new(path, document))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn page_id(&self, index: usize) -> Result<ObjectId> {
        self.page_ids.get(index).copied().ok_or_else(|| {
            SelectionError::PageOutOfRange {
                page: index as i64 + 1,
                page_count: self.page_count(),
            }
            .into()
        })
    }

    /// Media box of a page, honoring values inherited from the page tree
    pub fn media_box(&self, index: usize) -> Result<Rect> {
        let page_id = self.page_id(index)?;
        Ok(page_media_box(&self.document, page_id))
    }

    /// Width and height of every page in points
    pub fn page_sizes(&self) -> Vec<(f32, f32)> {
        self.page_ids
            .iter()
            .map(|&id| {
                let media_box = page_media_box(&self.document, id);
                (media_box.width, media_box.height)
            })
            .collect()
    }

    /// Capture one page (0-based) as an in-memory [`Page`]
    pub fn page(&self, index: usize) -> Result<Page> {
        let page_id = self.page_id(index)?;
        let bbox = page_media_box(&self.document, page_id);
        let rotation = inherited(&self.document, page_id, b"Rotate")
            .and_then(|obj| number(&self.document, &obj))
            .map(|degrees| (degrees as i64).rem_euclid(360))
            .unwrap_or(0);

        Ok(Page::from_source(
            SourcePage {
                document: Arc::clone(&self.document),
                page_id,
                bbox,
            },
            rotation,
        ))
    }

    /// Capture several pages; indices may repeat
    pub fn pages(&self, indices: &[usize]) -> Result<Vec<Page>> {
        indices.iter().map(|&index| self.page(index)).collect()
    }
}

/// Look up a page attribute, walking up `/Parent` links for inheritable keys
pub(crate) fn inherited(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut dict: &Dictionary = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        let parent = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
        dict = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Extract numeric value from a PDF object
fn number(doc: &Document, obj: &Object) -> Option<f32> {
    match resolve(doc, obj) {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn page_media_box(doc: &Document, page_id: ObjectId) -> Rect {
    let default = Rect::from_size(DEFAULT_PAGE_DIMENSIONS.0, DEFAULT_PAGE_DIMENSIONS.1);
    let Some(obj) = inherited(doc, page_id, b"MediaBox") else {
        return default;
    };
    let Ok(values) = resolve(doc, &obj).as_array() else {
        return default;
    };
    let coords: Vec<f32> = values.iter().filter_map(|v| number(doc, v)).collect();
    if coords.len() != 4 {
        return default;
    }
    Rect::from_corners((coords[0], coords[1]), (coords[2], coords[3]))
}
