//! Run configuration: input discovery, output profiles and printing
//!
//! A [`Config`] is stored as JSON. [`Config::problems`] reports every
//! problem it can find without opening any document.

use crate::dimension::{Coordinate, parse_point};
use crate::distribute::PrintTarget;
use crate::safety::{SafetyAction, SafetyLimit};
use crate::selector::SelectionSpec;
use crate::transform::{TransformError, TransformStep};
use crate::{MillError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// What to do when one (document, profile) pair fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Log the failure and carry on with the next pair
    #[default]
    Continue,
    /// Abort the run
    Stop,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub on_error: ErrorPolicy,
    /// Delete source files once every profile has processed them
    pub cleanup_source: bool,
    /// Delete printed outputs and temporary merge/split files
    pub cleanup_output_after_print: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordMatch {
    #[default]
    Any,
    All,
}

/// Keep only documents whose text contains the keywords
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, rename = "match")]
    pub match_mode: KeywordMatch,
}

impl FilterConfig {
    /// Case-sensitive substring test; an empty keyword list matches anything
    pub fn matches(&self, text: &str) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        match self.match_mode {
            KeywordMatch::Any => self.keywords.iter().any(|k| text.contains(k.as_str())),
            KeywordMatch::All => self.keywords.iter().all(|k| text.contains(k.as_str())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// File name, case-insensitive
    NameAsc,
    NameDesc,
    /// Modification time, oldest first
    TimeAsc,
    TimeDesc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::NameAsc => "name_asc",
            SortOrder::NameDesc => "name_desc",
            SortOrder::TimeAsc => "time_asc",
            SortOrder::TimeDesc => "time_desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_input_path")]
    pub path: PathBuf,
    /// Glob over file names (`*`, `?`, `[...]`)
    #[serde(default = "default_pattern")]
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortOrder>,
}

fn default_input_path() -> PathBuf {
    PathBuf::from("./input")
}

fn default_pattern() -> String {
    "*.pdf".to_string()
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: default_input_path(),
            pattern: default_pattern(),
            filter: None,
            sort: None,
        }
    }
}

impl InputConfig {
    pub fn pattern_regex(&self) -> Result<Regex> {
        glob_to_regex(&self.pattern)
    }
}

/// Translate a file-name glob into an anchored regex
pub fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let mut out = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                let mut class = String::new();
                let mut closed = false;
                for next in chars.by_ref() {
                    if next == ']' && !class.is_empty() {
                        closed = true;
                        break;
                    }
                    class.push(next);
                }
                if !closed {
                    return Err(MillError::Config(format!("Unclosed '[' in pattern '{}'", pattern)));
                }
                let class = match class.strip_prefix('!') {
                    Some(rest) => format!("^{}", rest),
                    None => class,
                };
                out.push('[');
                out.push_str(&class.replace('\\', "\\\\"));
                out.push(']');
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    Regex::new(&out).map_err(|e| MillError::Config(format!("Invalid pattern '{}': {}", pattern, e)))
}

/// Printing for one profile
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintConfig {
    pub enabled: bool,
    /// Concatenate every output of the run before printing
    pub merge: bool,
    pub targets: Vec<PrintTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pages: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_page_size: Option<[Coordinate; 2]>,
    pub action: SafetyAction,
}

impl PrintConfig {
    pub fn safety_limit(&self) -> std::result::Result<SafetyLimit, TransformError> {
        let max_page_size = self.max_page_size.as_ref().map(parse_point).transpose()?;
        Ok(SafetyLimit {
            max_pages: self.max_pages,
            max_page_size,
            action: self.action,
        })
    }
}

/// One named output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputProfile {
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub pages: SelectionSpec,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub filename_prefix: String,
    #[serde(default)]
    pub filename_suffix: String,
    #[serde(default)]
    pub transforms: Vec<TransformStep>,
    #[serde(default)]
    pub print: PrintConfig,
    /// Write a snapshot after selection and after every step
    #[serde(default)]
    pub debug: bool,
    /// Overrides the input order for this profile's print jobs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortOrder>,
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

impl OutputProfile {
    pub fn new(name: impl Into<String>, pages: SelectionSpec) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            pages,
            output_dir: default_output_dir(),
            filename_prefix: String::new(),
            filename_suffix: String::new(),
            transforms: Vec::new(),
            print: PrintConfig::default(),
            debug: false,
            sort: None,
        }
    }

    pub fn with_transforms(mut self, transforms: Vec<TransformStep>) -> Self {
        self.transforms = transforms;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_print(mut self, print: PrintConfig) -> Self {
        self.print = print;
        self
    }

    /// `{prefix}{stem}{suffix}_{profile}.pdf`
    pub fn output_filename(&self, source: &Path) -> String {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!(
            "{}{}{}_{}.pdf",
            self.filename_prefix, stem, self.filename_suffix, self.name
        )
    }
}

/// Whole-run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub outputs: Vec<OutputProfile>,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            settings: Settings::default(),
            input: InputConfig::default(),
            outputs: Vec::new(),
        }
    }
}

impl Config {
    /// Load a configuration from a JSON file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let config = serde_json::from_slice(&bytes)?;
        Ok(config)
    }

    /// Save the configuration to a JSON file
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    pub fn profile(&self, name: &str) -> Option<&OutputProfile> {
        self.outputs.iter().find(|p| p.name == name)
    }

    /// Every problem with the configuration, in the order found
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.outputs.is_empty() {
            problems.push("No output profiles defined".to_string());
        }

        if let Err(e) = glob_to_regex(&self.input.pattern) {
            problems.push(format!("input.pattern: {}", e));
        }

        let mut seen = HashSet::new();
        for profile in &self.outputs {
            let name = &profile.name;
            if name.is_empty() {
                problems.push("Profile with an empty name".to_string());
            } else if !seen.insert(name.as_str()) {
                problems.push(format!("Duplicate profile name '{}'", name));
            }

            // Text forms are checked when parsed; lists can still hold nonsense
            if let SelectionSpec::ExplicitList(pages) = &profile.pages {
                if pages.is_empty() {
                    problems.push(format!("[{}] pages: empty page list", name));
                } else if pages.contains(&0) {
                    problems.push(format!("[{}] pages: page numbers start at 1", name));
                }
            }

            for (i, step) in profile.transforms.iter().enumerate() {
                if let Err(e) = step.transform.validate() {
                    problems.push(format!(
                        "[{}] transform {} ({}): {}",
                        name,
                        i + 1,
                        step.transform.kind(),
                        e
                    ));
                }
            }

            problems.extend(print_problems(name, &profile.print));

            if self.input.sort.is_some() && profile.sort.is_some() {
                problems.push(format!(
                    "[{}] sort: cannot be set when input.sort is also set",
                    name
                ));
            }
        }

        problems
    }

    /// Fails with every problem joined into one message
    pub fn validate(&self) -> Result<()> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(MillError::Config(problems.join("; ")))
        }
    }
}

fn print_problems(profile: &str, print: &PrintConfig) -> Vec<String> {
    let mut problems = Vec::new();

    if print.enabled && print.targets.is_empty() {
        problems.push(format!("[{}] print: enabled but no targets configured", profile));
    }

    let mut names = HashSet::new();
    for target in &print.targets {
        let label = if target.name.is_empty() {
            "<unnamed>"
        } else {
            target.name.as_str()
        };
        if target.name.is_empty() {
            problems.push(format!("[{}] print target without a name", profile));
        } else if !names.insert(target.name.as_str()) {
            problems.push(format!("[{}] duplicate print target '{}'", profile, label));
        }
        if target.printer.trim().is_empty() {
            problems.push(format!("[{}] print target '{}': printer is empty", profile, label));
        }
        if target.weight < 0 {
            problems.push(format!(
                "[{}] print target '{}': weight must not be negative (got {})",
                profile, label, target.weight
            ));
        }
        if target.copies < 1 {
            problems.push(format!("[{}] print target '{}': copies must be at least 1", profile, label));
        }
    }

    if let Err(e) = print.safety_limit() {
        problems.push(format!("[{}] print.max_page_size: {}", profile, e));
    }

    problems
}
