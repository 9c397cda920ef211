//! Ordered execution of transform steps
//!
//! [`TransformPipeline::apply`] runs each enabled step over the whole page
//! sequence in list order. Step numbers follow list positions (1-based), so
//! a disabled step leaves a gap rather than renumbering the ones after it.

use crate::codec::{save_pdf_blocking, write_pages};
use crate::orientation::{OrientationDetector, UnavailableDetector};
use crate::page::Page;
use crate::raster::{Rasterizer, UnavailableRasterizer};
use crate::transform::{TransformError, TransformStep};
use crate::Result;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Read-only facts about one (document, profile) run.
#[derive(Debug, Clone)]
pub struct TransformContext {
    /// File the pages were selected from. Needed by `rotate: auto` and for
    /// naming debug snapshots.
    pub source_path: Option<PathBuf>,
    /// For each selected page, its 0-based index in the source document
    pub original_page_indices: Vec<usize>,
    /// Number of pages the pipeline starts with. Steps that change the
    /// count (split, combine) do not update it; stamp's `{total}` uses the
    /// length of the sequence it is applied to.
    pub page_count: usize,
    /// Describe steps instead of applying them
    pub dry_run: bool,
    /// Local time used for every stamp placeholder in this run
    pub timestamp: NaiveDateTime,
}

impl TransformContext {
    pub fn new(original_page_indices: Vec<usize>) -> Self {
        Self {
            source_path: None,
            page_count: original_page_indices.len(),
            original_page_indices,
            dry_run: false,
            timestamp: chrono::Local::now().naive_local(),
        }
    }

    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// External services a pipeline may call on
#[derive(Clone)]
pub struct Capabilities {
    pub detector: Arc<dyn OrientationDetector>,
    pub rasterizer: Arc<dyn Rasterizer>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            detector: Arc::new(UnavailableDetector),
            rasterizer: Arc::new(UnavailableRasterizer),
        }
    }
}

impl Capabilities {
    pub fn with_detector(mut self, detector: Arc<dyn OrientationDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }
}

/// What a single step sees while it runs
pub struct StepContext<'a> {
    pub run: &'a TransformContext,
    pub capabilities: &'a Capabilities,
    origins: &'a [usize],
}

impl<'a> StepContext<'a> {
    pub fn new(run: &'a TransformContext, capabilities: &'a Capabilities, origins: &'a [usize]) -> Self {
        Self {
            run,
            capabilities,
            origins,
        }
    }

    /// Source page index behind the page at `position` of the current sequence
    pub fn origin(&self, position: usize) -> Option<usize> {
        self.origins.get(position).copied()
    }
}

/// Receives the page sequence after selection (step 0) and after every
/// applied step.
pub trait SnapshotSink: Send + Sync {
    fn snapshot(&self, step: usize, description: &str, pages: &[Page]) -> Result<()>;
}

/// Writes `{stem}_{profile}_step{n}_{description}.pdf` files
#[derive(Debug, Clone)]
pub struct DebugSnapshots {
    dir: PathBuf,
    stem: String,
    profile: String,
}

impl DebugSnapshots {
    pub fn new(dir: impl Into<PathBuf>, source: &Path, profile: impl Into<String>) -> Self {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            dir: dir.into(),
            stem,
            profile: profile.into(),
        }
    }

    pub fn path_for(&self, step: usize, description: &str) -> PathBuf {
        self.dir.join(format!(
            "{}_{}_step{}_{}.pdf",
            self.stem, self.profile, step, description
        ))
    }
}

impl SnapshotSink for DebugSnapshots {
    fn snapshot(&self, step: usize, description: &str, pages: &[Page]) -> Result<()> {
        let path = self.path_for(step, description);
        let mut doc = write_pages(pages)?;
        save_pdf_blocking(&mut doc, &path)?;
        log::debug!("Saved: {}", path.display());
        Ok(())
    }
}

pub struct TransformPipeline {
    steps: Vec<TransformStep>,
    capabilities: Capabilities,
    snapshots: Option<Box<dyn SnapshotSink>>,
}

impl TransformPipeline {
    pub fn new(steps: Vec<TransformStep>) -> Self {
        Self {
            steps,
            capabilities: Capabilities::default(),
            snapshots: None,
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_snapshots(mut self, sink: Box<dyn SnapshotSink>) -> Self {
        self.snapshots = Some(sink);
        self
    }

    pub fn steps(&self) -> &[TransformStep] {
        &self.steps
    }

    /// `(step number, description)` of every enabled step
    pub fn describe(&self) -> Vec<(usize, String)> {
        self.enabled().map(|(n, step)| (n, step.transform.describe())).collect()
    }

    /// Check every enabled step's parameters without touching any page
    pub fn validate(&self) -> std::result::Result<(), TransformError> {
        for (number, step) in self.enabled() {
            step.transform
                .validate()
                .map_err(|source| step_error(number, step, source))?;
        }
        Ok(())
    }

    fn enabled(&self) -> impl Iterator<Item = (usize, &TransformStep)> {
        self.steps
            .iter()
            .enumerate()
            .filter(|(_, step)| step.enabled)
            .map(|(idx, step)| (idx + 1, step))
    }

    /// Run the steps over `pages`.
    ///
    /// In dry-run mode each step is only logged and the input comes back
    /// unchanged. Snapshots are never written in dry run.
    pub fn apply(&self, mut pages: Vec<Page>, context: &TransformContext) -> Result<Vec<Page>> {
        if context.dry_run {
            for (number, description) in self.describe() {
                log::info!("    [dry-run] step {}: {}", number, description);
            }
            return Ok(pages);
        }

        if let Some(sink) = &self.snapshots {
            sink.snapshot(0, "selected", &pages)?;
        }

        let mut origins = context.original_page_indices.clone();
        for (number, step) in self.enabled() {
            let description = step.transform.describe();
            let mode = step.transform.mode();
            let input_len = pages.len();

            let step_context = StepContext::new(context, &self.capabilities, &origins);
            pages = step
                .transform
                .apply(pages, &step_context)
                .map_err(|source| step_error(number, step, source))?;
            origins = mode.map_origins(&origins);

            log::debug!(
                "step {} ({}): {} -> {} page(s)",
                number,
                description,
                input_len,
                pages.len()
            );

            if let Some(sink) = &self.snapshots {
                sink.snapshot(number, &description, &pages)?;
            }
        }

        Ok(pages)
    }
}

fn step_error(number: usize, step: &TransformStep, source: TransformError) -> TransformError {
    TransformError::Step {
        step: number,
        description: step.transform.describe(),
        source: Box::new(source),
    }
}
