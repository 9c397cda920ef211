//! Page-count and page-size ceilings checked before printing

use crate::codec::SourceDocument;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// What happens when a limit is exceeded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyAction {
    /// Log the violations and print anyway
    Warn,
    /// Refuse to print
    #[default]
    Block,
}

/// Resolved limits for one profile; sizes are in points
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SafetyLimit {
    pub max_pages: Option<usize>,
    pub max_page_size: Option<(f32, f32)>,
    pub action: SafetyAction,
}

impl SafetyLimit {
    pub fn is_unlimited(&self) -> bool {
        self.max_pages.is_none() && self.max_page_size.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CheckResult {
    pub passed: bool,
    pub violations: Vec<String>,
}

impl CheckResult {
    fn pass() -> Self {
        Self {
            passed: true,
            violations: Vec::new(),
        }
    }

    fn add_violation(&mut self, message: String) {
        self.passed = false;
        self.violations.push(message);
    }
}

/// Printing was refused because a blocking limit was exceeded
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Print blocked for profile '{profile}': {}", .violations.join("; "))]
pub struct SafetyViolation {
    pub profile: String,
    pub violations: Vec<String>,
}

/// Page sizes of one document, labelled for messages
#[derive(Debug, Clone, PartialEq)]
pub struct PageSizes {
    pub label: String,
    pub sizes: Vec<(f32, f32)>,
}

impl PageSizes {
    pub fn new(label: impl Into<String>, sizes: Vec<(f32, f32)>) -> Self {
        Self {
            label: label.into(),
            sizes,
        }
    }

    /// Read sizes from a file on disk (blocking)
    pub fn read(path: &Path) -> crate::Result<Self> {
        let document = SourceDocument::open(path)?;
        Ok(Self::new(file_label(path), document.page_sizes()))
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn fits(size: (f32, f32), limit: (f32, f32)) -> bool {
    let (w, h) = size;
    let (max_w, max_h) = limit;
    (w <= max_w && h <= max_h) || (h <= max_w && w <= max_h)
}

/// Check in-memory page sizes against `limits`.
///
/// The page count is summed over all documents. A page passes the size
/// ceiling if it fits in either orientation.
pub fn check_sizes(documents: &[PageSizes], limits: &SafetyLimit) -> CheckResult {
    let mut result = CheckResult::pass();

    if let Some(max_pages) = limits.max_pages {
        let total: usize = documents.iter().map(|doc| doc.sizes.len()).sum();
        if total > max_pages {
            result.add_violation(format!(
                "Page count ({}) exceeds max_pages limit ({})",
                total, max_pages
            ));
        }
    }

    if let Some(limit) = limits.max_page_size {
        for doc in documents {
            for (i, &(w, h)) in doc.sizes.iter().enumerate() {
                if !fits((w, h), limit) {
                    result.add_violation(format!(
                        "{} page {}: size ({:.1}x{:.1} pt) exceeds max_page_size ({:.1}x{:.1} pt)",
                        doc.label,
                        i + 1,
                        w,
                        h,
                        limit.0,
                        limit.1
                    ));
                }
            }
        }
    }

    result
}

/// Check files on disk against `limits`. Unreadable files are logged and
/// left out of the check.
pub fn check(paths: &[impl AsRef<Path>], limits: &SafetyLimit) -> CheckResult {
    if limits.is_unlimited() {
        return CheckResult::pass();
    }

    let documents: Vec<PageSizes> = paths
        .iter()
        .filter_map(|path| {
            let path = path.as_ref();
            match PageSizes::read(path) {
                Ok(sizes) => Some(sizes),
                Err(e) => {
                    log::warn!("Could not read {} for safety check: {}", path.display(), e);
                    None
                }
            }
        })
        .collect();

    check_sizes(&documents, limits)
}

/// Run [`check`] and apply the profile's action.
///
/// Under [`SafetyAction::Block`] any violation becomes an error; under
/// [`SafetyAction::Warn`] the violations are logged and returned.
pub fn enforce(
    paths: &[impl AsRef<Path>],
    limits: &SafetyLimit,
    profile: &str,
) -> Result<CheckResult, SafetyViolation> {
    judge(check(paths, limits), limits.action, profile)
}

/// [`enforce`] for page sizes already in memory
pub fn enforce_sizes(
    documents: &[PageSizes],
    limits: &SafetyLimit,
    profile: &str,
) -> Result<CheckResult, SafetyViolation> {
    if limits.is_unlimited() {
        return Ok(CheckResult::pass());
    }
    judge(check_sizes(documents, limits), limits.action, profile)
}

fn judge(result: CheckResult, action: SafetyAction, profile: &str) -> Result<CheckResult, SafetyViolation> {
    if result.passed {
        return Ok(result);
    }

    let summary = result.violations.join("; ");
    match action {
        SafetyAction::Block => {
            log::error!("Print blocked for profile '{}': {}", profile, summary);
            Err(SafetyViolation {
                profile: profile.to_string(),
                violations: result.violations,
            })
        }
        SafetyAction::Warn => {
            log::warn!(
                "Safety limits exceeded for profile '{}' (continuing anyway): {}",
                profile,
                summary
            );
            Ok(result)
        }
    }
}
