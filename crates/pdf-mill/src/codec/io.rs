//! Document I/O

use super::reader::SourceDocument;
use super::writer::write_pages;
use crate::{MillError, Result};
use lopdf::Document;
use std::path::Path;

/// Load a single PDF document
pub async fn load_pdf(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref().to_owned();
    let bytes = tokio::fs::read(&path).await?;
    let doc = tokio::task::spawn_blocking(move || Document::load_mem(&bytes)).await??;
    Ok(doc)
}

/// Save a document, creating the parent directory if needed
pub async fn save_pdf(mut doc: Document, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref().to_owned();
    let bytes = tokio::task::spawn_blocking(move || {
        let mut writer = Vec::new();
        doc.save_to(&mut writer)?;
        Ok::<_, MillError>(writer)
    })
    .await??;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, bytes).await?;
    Ok(())
}

/// Blocking variant of [`save_pdf`] for callers already off the async runtime
pub fn save_pdf_blocking(doc: &mut Document, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = Vec::new();
    doc.save_to(&mut writer)?;
    std::fs::write(path, writer)?;
    Ok(())
}

/// Concatenate the pages of several files, in order, into one document
pub async fn merge_documents(paths: &[impl AsRef<Path>]) -> Result<Document> {
    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        sources.push(SourceDocument::load(path).await?);
    }

    tokio::task::spawn_blocking(move || {
        let mut pages = Vec::new();
        for source in &sources {
            let all: Vec<usize> = (0..source.page_count()).collect();
            pages.extend(source.pages(&all)?);
        }
        write_pages(&pages)
    })
    .await?
}
