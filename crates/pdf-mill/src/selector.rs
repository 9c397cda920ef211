//! Page selection
//!
//! A [`SelectionSpec`] is parsed once from configuration and resolved
//! against a concrete page count with [`select`]. Resolved indices are
//! 0-based and always lie in `[0, page_count)`. Explicit lists keep their
//! order and duplicates so configuration can reorder or repeat pages.
//!
//! Accepted text forms:
//! - keywords: `first`, `last`, `all`, `odd`, `even`
//! - `-N`: the last N pages
//! - `A--B`: page A (default 1) through `page_count - B` (default 0)
//! - `A-B`, `A-`, `-B` style ranges; an overshooting end is clamped
//! - a bare page number: `5`

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("PDF has no pages")]
    EmptyDocument,
    #[error("Cannot select last {requested} pages from {page_count} page PDF")]
    TooManyPages { requested: usize, page_count: usize },
    #[error("Invalid range: '{spec}' for {page_count} page PDF")]
    InvalidRange { spec: String, page_count: usize },
    #[error("Start page {start} is after end page {end}")]
    StartAfterEnd { start: i64, end: i64 },
    #[error("Page {page} is out of range for {page_count} page PDF")]
    PageOutOfRange { page: i64, page_count: usize },
    #[error("Invalid range specification: '{spec}': {reason}")]
    Syntax { spec: String, reason: String },
    #[error(
        "Unknown page specification: '{0}'. Valid formats: keywords (first, last, all, odd, even), ranges (1-3, 3-, -2, 1--1), page numbers (5), or lists ([1, 3, 5])"
    )]
    UnknownSpec(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    First,
    Last,
    All,
    Odd,
    Even,
}

impl Keyword {
    fn parse(text: &str) -> Option<Self> {
        match text {
            "first" => Some(Keyword::First),
            "last" => Some(Keyword::Last),
            "all" => Some(Keyword::All),
            "odd" => Some(Keyword::Odd),
            "even" => Some(Keyword::Even),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Keyword::First => "first",
            Keyword::Last => "last",
            Keyword::All => "all",
            Keyword::Odd => "odd",
            Keyword::Even => "even",
        }
    }
}

/// A parsed page selection. 1-based page numbers throughout; negative list
/// entries count from the end (`-1` is the last page).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSelection", into = "RawSelection")]
pub enum SelectionSpec {
    Keyword(Keyword),
    /// `A-B` with either side optional
    SimpleRange { start: Option<i64>, end: Option<i64> },
    /// `A-`
    OpenRange(i64),
    /// `-N`
    LastN(usize),
    /// `A--B`: from A through `page_count - B`
    BoundedFromStart {
        start: Option<i64>,
        trailing_offset: Option<i64>,
    },
    ExplicitList(Vec<i64>),
}

impl Default for SelectionSpec {
    fn default() -> Self {
        SelectionSpec::Keyword(Keyword::All)
    }
}

/// How a selection appears in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawSelection {
    Page(i64),
    List(Vec<i64>),
    Text(String),
}

impl TryFrom<RawSelection> for SelectionSpec {
    type Error = SelectionError;

    fn try_from(raw: RawSelection) -> Result<Self, Self::Error> {
        match raw {
            RawSelection::Page(page) => Ok(SelectionSpec::ExplicitList(vec![page])),
            RawSelection::List(pages) => Ok(SelectionSpec::ExplicitList(pages)),
            RawSelection::Text(text) => SelectionSpec::parse(&text),
        }
    }
}

impl From<SelectionSpec> for RawSelection {
    fn from(spec: SelectionSpec) -> Self {
        match spec {
            SelectionSpec::ExplicitList(pages) => RawSelection::List(pages),
            other => RawSelection::Text(other.to_string()),
        }
    }
}

fn parse_bound(spec: &str, part: &str) -> Result<Option<i64>, SelectionError> {
    if part.is_empty() {
        return Ok(None);
    }
    part.parse::<i64>()
        .map(Some)
        .map_err(|_| SelectionError::Syntax {
            spec: spec.to_string(),
            reason: "range values must be integers".to_string(),
        })
}

fn is_last_n(text: &str) -> bool {
    text.len() > 1
        && text.starts_with('-')
        && !text.contains("--")
        && text[1..].bytes().all(|b| b.is_ascii_digit())
}

impl SelectionSpec {
    /// Parse the text form. Validates syntax only; page bounds are checked
    /// by [`select`] once the page count is known.
    pub fn parse(text: &str) -> Result<Self, SelectionError> {
        let spec = text.trim().to_lowercase();
        if spec.is_empty() {
            return Err(SelectionError::Syntax {
                spec: text.to_string(),
                reason: "page specification cannot be empty".to_string(),
            });
        }

        if let Some(keyword) = Keyword::parse(&spec) {
            return Ok(SelectionSpec::Keyword(keyword));
        }

        if is_last_n(&spec) {
            let count = spec[1..].parse::<usize>().map_err(|_| SelectionError::Syntax {
                spec: text.to_string(),
                reason: "page count is too large".to_string(),
            })?;
            return Ok(SelectionSpec::LastN(count));
        }

        if spec.contains("--") {
            let parts: Vec<&str> = spec.split("--").collect();
            if parts.len() != 2 {
                return Err(SelectionError::Syntax {
                    spec: text.to_string(),
                    reason: "negative offset range must have format 'start--offset' (e.g. '1--1')"
                        .to_string(),
                });
            }
            return Ok(SelectionSpec::BoundedFromStart {
                start: parse_bound(text, parts[0])?,
                trailing_offset: parse_bound(text, parts[1])?,
            });
        }

        if spec.contains('-') {
            let parts: Vec<&str> = spec.split('-').collect();
            if parts.len() != 2 {
                return Err(SelectionError::Syntax {
                    spec: text.to_string(),
                    reason: format!(
                        "expected format like '1-3', '3-', or '-2', but got {} hyphens",
                        parts.len() - 1
                    ),
                });
            }
            let start = parse_bound(text, parts[0])?;
            let end = parse_bound(text, parts[1])?;
            return Ok(match (start, end) {
                (Some(start), None) => SelectionSpec::OpenRange(start),
                (start, end) => SelectionSpec::SimpleRange { start, end },
            });
        }

        if spec.bytes().all(|b| b.is_ascii_digit()) {
            let page = spec.parse::<i64>().map_err(|_| SelectionError::Syntax {
                spec: text.to_string(),
                reason: "page number is too large".to_string(),
            })?;
            return Ok(SelectionSpec::ExplicitList(vec![page]));
        }

        Err(SelectionError::UnknownSpec(text.to_string()))
    }
}

impl std::str::FromStr for SelectionSpec {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SelectionSpec::parse(s)
    }
}

fn opt(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl fmt::Display for SelectionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionSpec::Keyword(keyword) => f.write_str(keyword.as_str()),
            SelectionSpec::SimpleRange { start, end } => {
                write!(f, "{}-{}", opt(*start), opt(*end))
            }
            SelectionSpec::OpenRange(start) => write!(f, "{}-", start),
            SelectionSpec::LastN(count) => write!(f, "-{}", count),
            SelectionSpec::BoundedFromStart {
                start,
                trailing_offset,
            } => write!(f, "{}--{}", opt(*start), opt(*trailing_offset)),
            SelectionSpec::ExplicitList(pages) => {
                let items: Vec<String> = pages.iter().map(|p| p.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
        }
    }
}

/// Validate the syntax of a textual page specification without a page count.
pub fn validate_syntax(text: &str) -> Result<(), SelectionError> {
    SelectionSpec::parse(text).map(|_| ())
}

/// Resolve a selection to 0-based page indices.
pub fn select(spec: &SelectionSpec, page_count: usize) -> Result<Vec<usize>, SelectionError> {
    if page_count == 0 {
        return Err(SelectionError::EmptyDocument);
    }
    let total = page_count as i64;

    match spec {
        SelectionSpec::Keyword(keyword) => Ok(match keyword {
            Keyword::First => vec![0],
            Keyword::Last => vec![page_count - 1],
            Keyword::All => (0..page_count).collect(),
            // 1-based page number parity
            Keyword::Odd => (0..page_count).step_by(2).collect(),
            Keyword::Even => (1..page_count).step_by(2).collect(),
        }),
        SelectionSpec::LastN(count) => {
            if *count > page_count {
                return Err(SelectionError::TooManyPages {
                    requested: *count,
                    page_count,
                });
            }
            Ok((page_count - count..page_count).collect())
        }
        SelectionSpec::BoundedFromStart {
            start,
            trailing_offset,
        } => {
            let start = start.unwrap_or(1);
            let end = total - trailing_offset.unwrap_or(0);
            if start < 1 || end < 1 || end > total || start > end {
                return Err(SelectionError::InvalidRange {
                    spec: spec.to_string(),
                    page_count,
                });
            }
            Ok(((start - 1) as usize..end as usize).collect())
        }
        SelectionSpec::OpenRange(start) => resolve_range(spec, Some(*start), None, page_count),
        SelectionSpec::SimpleRange { start, end } => resolve_range(spec, *start, *end, page_count),
        SelectionSpec::ExplicitList(pages) => select_from_list(pages, page_count),
    }
}

fn resolve_range(
    spec: &SelectionSpec,
    start: Option<i64>,
    end: Option<i64>,
    page_count: usize,
) -> Result<Vec<usize>, SelectionError> {
    let total = page_count as i64;
    let start = start.unwrap_or(1);
    let mut end = end.unwrap_or(total);

    if start < 1 || end < 1 || start > total {
        return Err(SelectionError::InvalidRange {
            spec: spec.to_string(),
            page_count,
        });
    }
    if end > total {
        end = total;
    }
    if start > end {
        return Err(SelectionError::StartAfterEnd { start, end });
    }

    Ok(((start - 1) as usize..end as usize).collect())
}

fn select_from_list(pages: &[i64], page_count: usize) -> Result<Vec<usize>, SelectionError> {
    let total = page_count as i64;
    pages
        .iter()
        .map(|&page| {
            let idx = if page < 0 { total + page } else { page - 1 };
            if idx < 0 || idx >= total {
                Err(SelectionError::PageOutOfRange { page, page_count })
            } else {
                Ok(idx as usize)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_round_trips_text_forms() {
        for text in ["first", "1-3", "3-", "-2", "1--1", "--2", "-"] {
            let spec = SelectionSpec::parse(text).unwrap();
            assert_eq!(SelectionSpec::parse(&spec.to_string()).unwrap(), spec);
        }
    }

    #[test]
    fn last_n_detection() {
        assert!(is_last_n("-3"));
        assert!(!is_last_n("-"));
        assert!(!is_last_n("--3"));
        assert!(!is_last_n("1-3"));
    }
}
