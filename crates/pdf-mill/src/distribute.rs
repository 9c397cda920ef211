//! Weighted distribution of a finished document across print targets
//!
//! Targets are ordered by weight, heaviest first, and each receives a
//! contiguous block of pages proportional to its weight. The heaviest
//! target gets the earliest pages so that stacks collected from the
//! fastest device first come out in document order. The last target takes
//! whatever is left, which absorbs the rounding drift of the others.

use crate::codec::{SourceDocument, write_pages};
use crate::page::Page;
use crate::Result;
use lopdf::Document;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// One printer (or queue) a profile can send pages to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintTarget {
    pub name: String,
    /// Backend identifier, e.g. a CUPS queue name
    pub printer: String,
    #[serde(default = "default_weight")]
    pub weight: i64,
    #[serde(default = "default_copies")]
    pub copies: u32,
    /// Passed through to the backend untouched
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

fn default_weight() -> i64 {
    1
}

fn default_copies() -> u32 {
    1
}

impl PrintTarget {
    pub fn new(name: impl Into<String>, printer: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            printer: printer.into(),
            weight: default_weight(),
            copies: default_copies(),
            args: Vec::new(),
        }
    }

    pub fn with_weight(mut self, weight: i64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_copies(mut self, copies: u32) -> Self {
        self.copies = copies;
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

/// Pages assigned to one target, as 0-based half-open range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetShare {
    pub name: String,
    pub range: Range<usize>,
}

impl TargetShare {
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Assign contiguous page ranges of a `total_pages` document to `targets`.
///
/// Targets with weight ≤ 0 are ignored. The remaining ones are sorted by
/// weight descending (ties keep their configured order). Every target but
/// the last gets `round(total * weight / total_weight)` pages, rounding
/// half to even; the last one gets the remainder. A target whose share is
/// zero pages gets no entry, and allocation stops once every page has an
/// owner.
pub fn allocate_pages(total_pages: usize, targets: &[PrintTarget]) -> Vec<TargetShare> {
    let mut weighted: Vec<&PrintTarget> = targets.iter().filter(|t| t.weight > 0).collect();
    if weighted.is_empty() || total_pages == 0 {
        return Vec::new();
    }
    weighted.sort_by(|a, b| b.weight.cmp(&a.weight));

    let total_weight: i64 = weighted.iter().map(|t| t.weight).sum();
    let last = weighted.len() - 1;

    let mut shares = Vec::new();
    let mut current = 0usize;
    for (i, target) in weighted.iter().enumerate() {
        let count = if i == last {
            total_pages - current
        } else {
            let exact = total_pages as f64 * target.weight as f64 / total_weight as f64;
            exact.round_ties_even() as usize
        };
        if count == 0 {
            continue;
        }

        let end = (current + count).min(total_pages);
        shares.push(TargetShare {
            name: target.name.clone(),
            range: current..end,
        });
        current = end;

        if current >= total_pages {
            break;
        }
    }

    shares
}

/// Split an in-memory page sequence across `targets`.
///
/// Pages are cloned into each share, so the result is independent of the
/// input.
pub fn split_by_weight(pages: &[Page], targets: &[PrintTarget]) -> Vec<(String, Vec<Page>)> {
    allocate_pages(pages.len(), targets)
        .into_iter()
        .map(|share| (share.name, pages[share.range].to_vec()))
        .collect()
}

/// Split a document loaded from disk into one new document per target
pub fn split_document_by_weight(
    source: &SourceDocument,
    targets: &[PrintTarget],
) -> Result<Vec<(String, Document)>> {
    let mut parts = Vec::new();
    for share in allocate_pages(source.page_count(), targets) {
        log::debug!(
            "Target '{}' gets pages {}-{} of {}",
            share.name,
            share.range.start + 1,
            share.range.end,
            source.path().display()
        );
        let indices: Vec<usize> = share.range.clone().collect();
        let pages = source.pages(&indices)?;
        parts.push((share.name, write_pages(&pages)?));
    }
    Ok(parts)
}
