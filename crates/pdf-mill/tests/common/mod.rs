#![allow(dead_code)]

use lopdf::{Dictionary, Document, Object, Stream};
use std::path::{Path, PathBuf};

pub fn create_test_pdf(num_pages: usize) -> Document {
    create_sized_pdf(&vec![(612.0, 792.0); num_pages])
}

/// One page per entry, each with a `MediaBox` of that width and height
pub fn create_sized_pdf(sizes: &[(f32, f32)]) -> Document {
    let texts = vec![None; sizes.len()];
    build_pdf(sizes, &texts)
}

/// Letter pages that show the given text in Helvetica
pub fn create_text_pdf(texts: &[&str]) -> Document {
    let sizes = vec![(612.0, 792.0); texts.len()];
    let texts: Vec<Option<&str>> = texts.iter().copied().map(Some).collect();
    build_pdf(&sizes, &texts)
}

fn build_pdf(sizes: &[(f32, f32)], texts: &[Option<&str>]) -> Document {
    let mut doc = Document::with_version("1.7");

    // Create page tree root ID
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
    ]));

    let mut kids = Vec::new();
    for (&(width, height), text) in sizes.iter().zip(texts) {
        let content = match text {
            Some(text) => format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", text).into_bytes(),
            None => b"q Q".to_vec(),
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

        let mut fonts = Dictionary::new();
        fonts.set("F1", Object::Reference(font_id));
        let resources = Dictionary::from_iter(vec![("Font", Object::Dictionary(fonts))]);

        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(width),
                    Object::Real(height),
                ]),
            ),
            ("Resources", Object::Dictionary(resources)),
            ("Contents", Object::Reference(content_id)),
        ]));
        kids.push(Object::Reference(page_id));
    }

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(sizes.len() as i64)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));

    doc.trailer.set("Root", catalog_id);

    doc
}

/// Save `doc` as `dir/name` and return the path
pub fn write_pdf(dir: &Path, name: &str, mut doc: Document) -> PathBuf {
    let path = dir.join(name);
    let mut writer = Vec::new();
    doc.save_to(&mut writer).unwrap();
    std::fs::write(&path, writer).unwrap();
    path
}

pub fn page_count(path: &Path) -> usize {
    Document::load(path).unwrap().get_pages().len()
}

/// Width and height of every page's media box
pub fn page_sizes(path: &Path) -> Vec<(f32, f32)> {
    pdf_mill::SourceDocument::open(path).unwrap().page_sizes()
}

pub fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 0.01
}
