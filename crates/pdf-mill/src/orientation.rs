//! Orientation detection for `rotate: auto`
//!
//! Detectors answer "how far must this source page be rotated so its text
//! is upright?" for a page of a file on disk.

use crate::codec::SourceDocument;
use crate::constants::OCR_RENDER_DPI;
use crate::raster::Rasterizer;
use crate::transform::{QuarterTurn, TransformError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, mpsc};
use std::time::Duration;

pub trait OrientationDetector: Send + Sync {
    /// Rotation needed for the 0-based `page_index` of `source`
    fn detect(&self, source: &Path, page_index: usize) -> Result<QuarterTurn, TransformError>;
}

/// Default detector: always fails, so `auto` never silently becomes a no-op
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableDetector;

impl OrientationDetector for UnavailableDetector {
    fn detect(&self, _source: &Path, _page_index: usize) -> Result<QuarterTurn, TransformError> {
        Err(TransformError::Unavailable(
            "auto rotation needs an orientation detector (e.g. tesseract)".to_string(),
        ))
    }
}

/// Returns preset answers, per page or a fallback for every page
#[derive(Debug, Clone, Default)]
pub struct FixedDetector {
    fallback: Option<QuarterTurn>,
    pages: HashMap<usize, QuarterTurn>,
}

impl FixedDetector {
    pub fn new(turn: QuarterTurn) -> Self {
        Self {
            fallback: Some(turn),
            pages: HashMap::new(),
        }
    }

    pub fn with_page(mut self, page_index: usize, turn: QuarterTurn) -> Self {
        self.pages.insert(page_index, turn);
        self
    }
}

impl OrientationDetector for FixedDetector {
    fn detect(&self, _source: &Path, page_index: usize) -> Result<QuarterTurn, TransformError> {
        self.pages
            .get(&page_index)
            .copied()
            .or(self.fallback)
            .ok_or_else(|| TransformError::Orientation {
                page: page_index,
                message: "no answer configured".to_string(),
            })
    }
}

/// Bounds another detector's running time.
///
/// The inner call runs on its own thread; when the deadline passes the
/// thread is abandoned and its eventual answer discarded. The thread is not
/// killed: a hung `tesseract` process keeps running until it exits on its
/// own, holding its scratch image until then.
#[derive(Clone)]
pub struct TimeoutDetector {
    inner: Arc<dyn OrientationDetector>,
    timeout: Duration,
}

impl TimeoutDetector {
    pub fn new(inner: Arc<dyn OrientationDetector>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

impl OrientationDetector for TimeoutDetector {
    fn detect(&self, source: &Path, page_index: usize) -> Result<QuarterTurn, TransformError> {
        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        let source = source.to_path_buf();
        std::thread::spawn(move || {
            let _ = tx.send(inner.detect(&source, page_index));
        });

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => Err(TransformError::Orientation {
                page: page_index,
                message: format!("timed out after {:?}", self.timeout),
            }),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(TransformError::Orientation {
                page: page_index,
                message: "detector stopped without an answer".to_string(),
            }),
        }
    }
}

/// Tesseract OSD (`--psm 0`) on a rasterized page
pub struct TesseractDetector {
    rasterizer: Arc<dyn Rasterizer>,
    program: PathBuf,
    dpi: u32,
}

impl TesseractDetector {
    pub fn new(rasterizer: Arc<dyn Rasterizer>) -> Self {
        Self {
            rasterizer,
            program: PathBuf::from("tesseract"),
            dpi: OCR_RENDER_DPI,
        }
    }

    /// Use a specific tesseract executable
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    fn failure(page_index: usize, message: impl Into<String>) -> TransformError {
        TransformError::Orientation {
            page: page_index,
            message: message.into(),
        }
    }
}

/// Extract the `Rotate:` line of tesseract's OSD report
pub fn parse_osd_rotation(report: &str) -> Option<i64> {
    report.lines().find_map(|line| {
        line.trim()
            .strip_prefix("Rotate:")
            .and_then(|value| value.trim().parse().ok())
    })
}

impl OrientationDetector for TesseractDetector {
    fn detect(&self, source: &Path, page_index: usize) -> Result<QuarterTurn, TransformError> {
        let fail = |message: String| Self::failure(page_index, message);

        let document = SourceDocument::open(source).map_err(|e| fail(e.to_string()))?;
        let page = document.page(page_index).map_err(|e| fail(e.to_string()))?;
        let raster = self.rasterizer.rasterize(&page, self.dpi)?;

        let image = image::RgbImage::from_raw(raster.width_px, raster.height_px, raster.rgb)
            .ok_or_else(|| fail("rendered image has the wrong size".to_string()))?;
        let scratch = tempfile::Builder::new()
            .prefix("pdfmill-osd-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| fail(e.to_string()))?;
        image
            .save_with_format(scratch.path(), image::ImageFormat::Png)
            .map_err(|e| fail(e.to_string()))?;

        let output = Command::new(&self.program)
            .arg(scratch.path())
            .arg("stdout")
            .args(["--psm", "0"])
            .output()
            .map_err(|e| {
                TransformError::Unavailable(format!(
                    "could not run {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            return Err(fail(String::from_utf8_lossy(&output.stderr).trim().to_string()));
        }

        // Some tesseract builds print the OSD report on stderr
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let degrees = parse_osd_rotation(&stdout)
            .or_else(|| parse_osd_rotation(&stderr))
            .ok_or_else(|| fail("no rotation in tesseract output".to_string()))?;

        log::debug!(
            "Detected rotation {} for page {} of {}",
            degrees,
            page_index + 1,
            source.display()
        );
        QuarterTurn::from_degrees(degrees).map_err(|e| fail(e.to_string()))
    }
}
