//! Writing in-memory pages to a new PDF
//!
//! Source pages become Form XObjects placed with a `cm` operator, so
//! geometric transforms never touch the original content streams. Text
//! runs use the standard Type1 fonts and raster images become 8-bit
//! DeviceRGB image XObjects.

use super::reader::inherited;
use crate::geometry::{Matrix, Rect};
use crate::page::{Layer, LayerContent, Page, RasterImage, SourcePage, TextRun};
use crate::Result;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

/// Object caches shared by every page of one output document
#[derive(Default)]
struct WriteCache {
    /// (source document address, source page) -> form XObject
    forms: HashMap<(usize, ObjectId), ObjectId>,
    /// Per source document: source object -> copied object
    copies: HashMap<usize, HashMap<ObjectId, ObjectId>>,
    fonts: HashMap<String, ObjectId>,
    /// Opacity bit pattern -> ExtGState
    graphics_states: HashMap<u32, ObjectId>,
}

/// Resources referenced by one output page
#[derive(Default)]
struct PageResources {
    xobjects: Dictionary,
    fonts: Dictionary,
    graphics_states: Dictionary,
}

/// Build a new document containing `pages` in order.
pub fn write_pages(pages: &[Page]) -> Result<Document> {
    let mut output = Document::with_version("1.7");
    let pages_id = output.new_object_id();
    let mut cache = WriteCache::default();

    let mut page_refs = Vec::with_capacity(pages.len());
    for page in pages {
        let page_id = write_page(&mut output, page, pages_id, &mut cache)?;
        page_refs.push(Object::Reference(page_id));
    }

    // Create pages tree
    let count = page_refs.len() as i64;
    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(page_refs)),
        ("Count", Object::Integer(count)),
    ]);
    output
        .objects
        .insert(pages_id, Object::Dictionary(pages_dict));

    // Create catalog
    let catalog_id = output.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));

    output.trailer.set("Root", catalog_id);
    output.compress();

    Ok(output)
}

fn write_page(
    output: &mut Document,
    page: &Page,
    parent_pages_id: ObjectId,
    cache: &mut WriteCache,
) -> Result<ObjectId> {
    let mut page_dict = Dictionary::new();
    page_dict.set("Type", Object::Name(b"Page".to_vec()));
    page_dict.set("Parent", Object::Reference(parent_pages_id));
    page_dict.set("MediaBox", rect_array(&page.media_box()));
    if page.rotation_flag() != 0 {
        page_dict.set("Rotate", Object::Integer(page.rotation_flag()));
    }

    let mut resources = PageResources::default();
    let mut content = String::new();
    for (idx, layer) in page.layers().iter().enumerate() {
        write_layer(output, layer, idx, &mut resources, &mut content, cache)?;
    }

    let mut resource_dict = Dictionary::new();
    if !resources.xobjects.is_empty() {
        resource_dict.set("XObject", Object::Dictionary(resources.xobjects));
    }
    if !resources.fonts.is_empty() {
        resource_dict.set("Font", Object::Dictionary(resources.fonts));
    }
    if !resources.graphics_states.is_empty() {
        resource_dict.set("ExtGState", Object::Dictionary(resources.graphics_states));
    }

    let content_id = output.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
    page_dict.set("Contents", Object::Reference(content_id));
    page_dict.set("Resources", Object::Dictionary(resource_dict));

    Ok(output.add_object(page_dict))
}

fn write_layer(
    output: &mut Document,
    layer: &Layer,
    idx: usize,
    resources: &mut PageResources,
    content: &mut String,
    cache: &mut WriteCache,
) -> Result<()> {
    match &layer.content {
        LayerContent::Form(source) => {
            let name = format!("P{}", idx);
            let form_id = form_xobject(output, source, cache)?;
            resources.xobjects.set(name.as_bytes(), Object::Reference(form_id));
            push_placement(content, &layer.matrix, &name);
        }
        LayerContent::Image(image) => {
            let name = format!("Im{}", idx);
            let image_id = output.add_object(image_xobject(image));
            resources.xobjects.set(name.as_bytes(), Object::Reference(image_id));
            push_placement(content, &layer.matrix, &name);
        }
        LayerContent::Text(run) => {
            write_text(output, run, &layer.matrix, resources, content, cache);
        }
    }
    Ok(())
}

/// Generate the content stream command to place an XObject.
fn push_placement(content: &mut String, matrix: &Matrix, name: &str) {
    let _ = writeln!(content, "q {} cm /{} Do Q", matrix.to_operands(), name);
}

fn write_text(
    output: &mut Document,
    run: &Arc<TextRun>,
    matrix: &Matrix,
    resources: &mut PageResources,
    content: &mut String,
    cache: &mut WriteCache,
) {
    let font_id = *cache.fonts.entry(run.font_name.clone()).or_insert_with(|| {
        let mut font_dict = Dictionary::new();
        font_dict.set("Type", Object::Name(b"Font".to_vec()));
        font_dict.set("Subtype", Object::Name(b"Type1".to_vec()));
        font_dict.set("BaseFont", Object::Name(run.font_name.as_bytes().to_vec()));
        font_dict.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
        output.add_object(font_dict)
    });
    let font_name = format!("F{}", font_id.0);
    resources.fonts.set(font_name.as_bytes(), Object::Reference(font_id));

    content.push_str("q ");
    if !matrix.is_identity() {
        let _ = write!(content, "{} cm ", matrix.to_operands());
    }
    if run.opacity < 1.0 {
        let gs_id = *cache
            .graphics_states
            .entry(run.opacity.to_bits())
            .or_insert_with(|| {
                let mut gs = Dictionary::new();
                gs.set("Type", Object::Name(b"ExtGState".to_vec()));
                gs.set("ca", Object::Real(run.opacity));
                gs.set("CA", Object::Real(run.opacity));
                output.add_object(gs)
            });
        let gs_name = format!("GS{}", gs_id.0);
        resources
            .graphics_states
            .set(gs_name.as_bytes(), Object::Reference(gs_id));
        let _ = write!(content, "/{} gs ", gs_name);
    }
    let _ = writeln!(
        content,
        "{} {} {} rg BT /{} {} Tf {} {} Td ({}) Tj ET Q",
        run.color.r,
        run.color.g,
        run.color.b,
        font_name,
        run.font_size,
        run.x,
        run.y,
        escape_text(&run.text)
    );
}

/// Encode text as a literal PDF string body for a WinAnsi font.
///
/// Characters outside Latin-1 are replaced with `?`.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            ' '..='~' => out.push(ch),
            '\u{a0}'..='\u{ff}' => {
                let _ = write!(out, "\\{:03o}", ch as u32);
            }
            _ => out.push('?'),
        }
    }
    out
}

fn image_xobject(image: &RasterImage) -> Stream {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(image.width_px as i64));
    dict.set("Height", Object::Integer(image.height_px as i64));
    dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    Stream::new(dict, image.rgb.clone())
}

/// Create (or reuse) a Form XObject for a source page.
fn form_xobject(output: &mut Document, source: &SourcePage, cache: &mut WriteCache) -> Result<ObjectId> {
    let doc_key = Arc::as_ptr(&source.document) as usize;
    if let Some(&id) = cache.forms.get(&(doc_key, source.page_id)) {
        return Ok(id);
    }

    let doc = source.document.as_ref();
    let page_dict = doc.get_dictionary(source.page_id)?;
    let content_data = get_page_content(doc, page_dict)?;

    let mut xobject_dict = Dictionary::new();
    xobject_dict.set("Type", Object::Name(b"XObject".to_vec()));
    xobject_dict.set("Subtype", Object::Name(b"Form".to_vec()));
    xobject_dict.set("BBox", rect_array(&source.bbox));
    xobject_dict.set("FormType", Object::Integer(1));

    // Resources may be inherited from the page tree
    if let Some(resources) = inherited(doc, source.page_id, b"Resources") {
        let copies = cache.copies.entry(doc_key).or_default();
        xobject_dict.set("Resources", copy_object_deep(output, doc, &resources, copies)?);
    }

    let id = output.add_object(Stream::new(xobject_dict, content_data));
    cache.forms.insert((doc_key, source.page_id), id);
    Ok(id)
}

fn rect_array(rect: &Rect) -> Object {
    Object::Array(rect.to_array().iter().map(|&v| Object::Real(v)).collect())
}

// =============================================================================
// Page Content Extraction
// =============================================================================

/// Get the content stream data from a page.
fn get_page_content(doc: &Document, page_dict: &Dictionary) -> Result<Vec<u8>> {
    let contents = match page_dict.get(b"Contents") {
        Ok(c) => c,
        Err(_) => return Ok(Vec::new()),
    };

    match contents {
        Object::Reference(id) => match doc.get_object(*id)? {
            Object::Array(arr) => concatenate_streams(doc, arr),
            Object::Stream(stream) => Ok(stream_bytes(stream)),
            _ => Ok(Vec::new()),
        },
        Object::Array(arr) => concatenate_streams(doc, arr),
        _ => Ok(Vec::new()),
    }
}

fn stream_bytes(stream: &Stream) -> Vec<u8> {
    stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone())
}

fn concatenate_streams(doc: &Document, refs: &[Object]) -> Result<Vec<u8>> {
    let mut result = Vec::new();
    for obj in refs {
        if let Object::Reference(id) = obj {
            if let Ok(stream) = doc.get_object(*id)?.as_stream() {
                result.extend_from_slice(&stream_bytes(stream));
                result.push(b'\n');
            }
        }
    }
    Ok(result)
}

// =============================================================================
// Deep Copy
// =============================================================================

/// Deep copy an object from source to output document, following references.
fn copy_object_deep(
    output: &mut Document,
    source: &Document,
    obj: &Object,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<Object> {
    match obj {
        Object::Reference(id) => {
            if let Some(&new_id) = cache.get(id) {
                return Ok(Object::Reference(new_id));
            }
            // Reserve the id first so reference cycles terminate
            let new_id = output.new_object_id();
            cache.insert(*id, new_id);

            let referenced = source.get_object(*id)?;
            let copied = copy_object_deep(output, source, referenced, cache)?;
            output.objects.insert(new_id, copied);

            Ok(Object::Reference(new_id))
        }
        Object::Dictionary(dict) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in dict.iter() {
                // Parent links would drag the whole source page tree along
                if key.as_slice() == b"Parent" {
                    continue;
                }
                new_dict.set(key.clone(), copy_object_deep(output, source, value, cache)?);
            }
            Ok(Object::Dictionary(new_dict))
        }
        Object::Array(arr) => {
            let new_arr: Result<Vec<_>> = arr
                .iter()
                .map(|item| copy_object_deep(output, source, item, cache))
                .collect();
            Ok(Object::Array(new_arr?))
        }
        Object::Stream(stream) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in stream.dict.iter() {
                new_dict.set(key.clone(), copy_object_deep(output, source, value, cache)?);
            }
            Ok(Object::Stream(Stream {
                dict: new_dict,
                content: stream.content.clone(),
                allows_compression: stream.allows_compression,
                start_position: None,
            }))
        }
        _ => Ok(obj.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_escaping() {
        assert_eq!(escape_text("a(b)c\\"), "a\\(b\\)c\\\\");
        assert_eq!(escape_text("é"), "\\351");
        assert_eq!(escape_text("→"), "?");
    }

    #[test]
    fn blank_pages_round_trip_count() {
        let pages = vec![Page::blank(100.0, 200.0), Page::blank(300.0, 400.0)];
        let doc = write_pages(&pages).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }
}
