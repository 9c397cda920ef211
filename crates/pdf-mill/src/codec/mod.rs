//! PDF reading and writing on top of `lopdf`

mod io;
mod reader;
mod writer;

pub use io::{load_pdf, merge_documents, save_pdf, save_pdf_blocking};
pub use reader::SourceDocument;
pub use writer::write_pages;
