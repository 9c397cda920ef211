//! Profile-driven PDF page pipeline
//!
//! Pages are picked with a [`SelectionSpec`], reshaped by an ordered list
//! of [`TransformStep`]s and written to a new document. [`process`] runs a
//! whole [`Config`] over input files, then prints each profile's outputs
//! through a [`PrintBackend`], optionally split across weighted
//! [`PrintTarget`]s after a [`SafetyLimit`] check.

pub mod codec;
pub mod constants;
pub mod dimension;
pub mod distribute;
pub mod geometry;
pub mod options;
pub mod orientation;
pub mod page;
pub mod pipeline;
pub mod print;
pub mod processor;
pub mod raster;
pub mod safety;
pub mod selector;
pub mod transform;

pub use codec::{SourceDocument, load_pdf, merge_documents, save_pdf, write_pages};
pub use dimension::{Coordinate, parse_coordinate, parse_dimension};
pub use distribute::{PrintTarget, TargetShare, allocate_pages, split_by_weight, split_document_by_weight};
pub use geometry::{Matrix, Rect};
pub use options::*;
pub use orientation::{FixedDetector, OrientationDetector, TimeoutDetector, UnavailableDetector};
pub use page::{Layer, LayerContent, Page};
pub use pipeline::{Capabilities, TransformContext, TransformPipeline};
pub use print::{LpBackend, MockBackend, PrintBackend, PrintCall};
pub use processor::{PairReport, ProfileOutcome, RunOptions, RunSummary, process};
pub use raster::{Rasterizer, UnavailableRasterizer};
pub use safety::{
    CheckResult, PageSizes, SafetyAction, SafetyLimit, SafetyViolation, check, check_sizes, enforce,
    enforce_sizes,
};
pub use selector::{Keyword, SelectionError, SelectionSpec, select};
pub use transform::{StepMode, Transform, TransformError, TransformStep};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MillError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
    #[error("Page selection failed: {0}")]
    Selection(#[from] SelectionError),
    #[error("Transform failed: {0}")]
    Transform(#[from] TransformError),
    #[error(transparent)]
    Safety(#[from] SafetyViolation),
    #[error("Print error: {0}")]
    Print(String),
    #[error("Profile '{profile}' failed for {}: {source}", .document.display())]
    Profile {
        profile: String,
        document: PathBuf,
        #[source]
        source: Box<MillError>,
    },
}

impl MillError {
    /// Attach the (profile, document) pair that was being processed.
    pub fn in_profile(self, profile: impl Into<String>, document: impl Into<PathBuf>) -> Self {
        MillError::Profile {
            profile: profile.into(),
            document: document.into(),
            source: Box::new(self),
        }
    }

    /// Whether the error aborts only one (document, profile) pair and may be
    /// skipped under an `on_error: continue` policy.
    pub fn is_recoverable(&self) -> bool {
        match self {
            MillError::Selection(_) | MillError::Transform(_) | MillError::Pdf(_) => true,
            MillError::Profile { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, MillError>;
