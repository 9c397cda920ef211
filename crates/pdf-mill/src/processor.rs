//! Runs a [`Config`] over input files
//!
//! For every input document and every enabled profile: select pages, run
//! the profile's transforms, write the output. Then, per profile, print the
//! outputs (optionally merged and split across targets) and clean up.

use crate::codec::{SourceDocument, merge_documents, save_pdf, save_pdf_blocking, write_pages};
use crate::distribute::{PrintTarget, split_document_by_weight};
use crate::options::{Config, ErrorPolicy, FilterConfig, OutputProfile, SortOrder};
use crate::pipeline::{Capabilities, DebugSnapshots, TransformContext, TransformPipeline};
use crate::print::{LpBackend, PrintBackend};
use crate::safety::enforce;
use crate::selector::select;
use crate::{MillError, Result};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Run-level switches that are not part of the configuration file
#[derive(Clone)]
pub struct RunOptions {
    /// Replaces every profile's `output_dir`
    pub output_dir: Option<PathBuf>,
    pub dry_run: bool,
    pub capabilities: Capabilities,
    pub backend: Arc<dyn PrintBackend>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::new(Arc::new(LpBackend::new()))
    }
}

impl RunOptions {
    pub fn new(backend: Arc<dyn PrintBackend>) -> Self {
        Self {
            output_dir: None,
            dry_run: false,
            capabilities: Capabilities::default(),
            backend,
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    fn output_dir_for<'a>(&'a self, profile: &'a OutputProfile) -> &'a Path {
        self.output_dir.as_deref().unwrap_or(&profile.output_dir)
    }
}

/// Result of one (document, profile) pair
#[derive(Debug)]
pub enum ProfileOutcome {
    Written { path: PathBuf, pages: usize },
    DryRun { pages: usize },
    Failed { error: MillError },
}

impl ProfileOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ProfileOutcome::Failed { .. })
    }
}

#[derive(Debug)]
pub struct PairReport {
    pub source: PathBuf,
    pub profile: String,
    pub outcome: ProfileOutcome,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    /// Documents that passed discovery, filtering and sorting
    pub inputs: Vec<PathBuf>,
    pub reports: Vec<PairReport>,
    /// Print-stage failures, including blocked safety checks
    pub print_errors: Vec<MillError>,
    /// Merged and split files created for printing
    pub temporary_files: Vec<PathBuf>,
    /// (document, profile) pairs written or described
    pub succeeded: usize,
    /// (document, profile) pairs that failed
    pub failed: usize,
    /// Profiles whose printing failed or was blocked
    pub print_failed: usize,
}

impl RunSummary {
    pub fn written(&self) -> impl Iterator<Item = &PairReport> {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, ProfileOutcome::Written { .. }))
    }
}

// =============================================================================
// Input discovery
// =============================================================================

/// A file yields itself; a directory yields its matching files sorted by name
pub async fn get_input_files(input: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let metadata = tokio::fs::metadata(input).await.map_err(|_| {
        MillError::Config(format!("Input path does not exist: {}", input.display()))
    })?;
    if metadata.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    let matcher = crate::options::glob_to_regex(pattern)?;
    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(input).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if matcher.is_match(&name.to_string_lossy()) && entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Text of every page, newline separated
pub fn extract_text(path: &Path) -> Result<String> {
    let source = SourceDocument::open(path)?;
    let numbers: Vec<u32> = source.document().get_pages().keys().copied().collect();
    let mut text = String::new();
    for number in numbers {
        if !text.is_empty() {
            text.push('\n');
        }
        // Pages without extractable text contribute nothing
        text.push_str(&source.document().extract_text(&[number]).unwrap_or_default());
    }
    Ok(text)
}

async fn filter_files(files: Vec<PathBuf>, filter: &FilterConfig) -> Result<Vec<PathBuf>> {
    let mut kept = Vec::with_capacity(files.len());
    for path in files {
        let probe = path.clone();
        match tokio::task::spawn_blocking(move || extract_text(&probe)).await? {
            Ok(text) if filter.matches(&text) => kept.push(path),
            Ok(_) => log::debug!("Filtered out: {}", path.display()),
            Err(e) => log::warn!("Could not read text of {}: {}", path.display(), e),
        }
    }
    Ok(kept)
}

fn name_key(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Order `items` by the file each one refers to
pub async fn sort_by<T>(mut items: Vec<T>, order: SortOrder, path_of: impl Fn(&T) -> &Path) -> Result<Vec<T>> {
    match order {
        SortOrder::NameAsc => items.sort_by_key(|item| name_key(path_of(item))),
        SortOrder::NameDesc => items.sort_by(|a, b| name_key(path_of(b)).cmp(&name_key(path_of(a)))),
        SortOrder::TimeAsc | SortOrder::TimeDesc => {
            let mut keyed = Vec::with_capacity(items.len());
            for item in items {
                let modified = tokio::fs::metadata(path_of(&item)).await?.modified()?;
                keyed.push((modified, item));
            }
            if order == SortOrder::TimeAsc {
                keyed.sort_by_key(|(modified, _)| *modified);
            } else {
                keyed.sort_by(|a, b| b.0.cmp(&a.0));
            }
            items = keyed.into_iter().map(|(_, item): (SystemTime, T)| item).collect();
        }
    }
    Ok(items)
}

// =============================================================================
// Per-pair processing
// =============================================================================

fn process_pair(
    source_path: &Path,
    profile: &OutputProfile,
    output_dir: &Path,
    run: &RunOptions,
    timestamp: NaiveDateTime,
) -> Result<ProfileOutcome> {
    if run.dry_run {
        log::info!(
            "  Processing profile '{}' for {}",
            profile.name,
            source_path.display()
        );
    }

    let source = SourceDocument::open(source_path)?;
    let total = source.page_count();
    let indices = select(&profile.pages, total)?;

    if run.dry_run {
        let one_based: Vec<usize> = indices.iter().map(|i| i + 1).collect();
        log::info!("    [dry-run] Select pages: {:?} from {} pages", one_based, total);
    }

    let pages = source.pages(&indices)?;
    let context = TransformContext::new(indices)
        .with_source(source_path)
        .with_dry_run(run.dry_run)
        .with_timestamp(timestamp);

    let mut pipeline =
        TransformPipeline::new(profile.transforms.clone()).with_capabilities(run.capabilities.clone());
    if profile.debug && !run.dry_run {
        pipeline = pipeline.with_snapshots(Box::new(DebugSnapshots::new(
            output_dir,
            source_path,
            profile.name.clone(),
        )));
    }
    pipeline.validate()?;
    let pages = pipeline.apply(pages, &context)?;

    let output_path = output_dir.join(profile.output_filename(source_path));
    if run.dry_run {
        log::info!("    [dry-run] Write to: {}", output_path.display());
        return Ok(ProfileOutcome::DryRun { pages: pages.len() });
    }

    let mut document = write_pages(&pages)?;
    save_pdf_blocking(&mut document, &output_path)?;
    log::info!("  Created: {}", output_path.display());
    Ok(ProfileOutcome::Written {
        path: output_path,
        pages: pages.len(),
    })
}

// =============================================================================
// Printing
// =============================================================================

async fn submit(backend: &Arc<dyn PrintBackend>, path: &Path, target: &PrintTarget) -> Result<()> {
    log::info!(
        "  Printing {} to {}...",
        path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
        target.printer
    );
    let backend = Arc::clone(backend);
    let path = path.to_path_buf();
    let target = target.clone();
    tokio::task::spawn_blocking(move || {
        backend.print_pdf(&path, &target.printer, target.copies, &target.args, false)
    })
    .await?
}

async fn print_profile(
    profile: &OutputProfile,
    files: Vec<PathBuf>,
    output_dir: &Path,
    run: &RunOptions,
    temporary_files: &mut Vec<PathBuf>,
) -> Result<()> {
    let print = &profile.print;
    let files_to_print = if print.merge && files.len() > 1 {
        let merged_path = output_dir.join(format!("merged_{}.pdf", profile.name));
        log::info!("Merging {} files for profile '{}'...", files.len(), profile.name);
        let merged = merge_documents(&files).await?;
        save_pdf(merged, &merged_path).await?;
        temporary_files.push(merged_path.clone());
        vec![merged_path]
    } else {
        files
    };

    let limits = print.safety_limit()?;
    if !limits.is_unlimited() {
        let paths = files_to_print.clone();
        let name = profile.name.clone();
        tokio::task::spawn_blocking(move || enforce(&paths, &limits, &name)).await??;
    }

    let targets = &print.targets;
    if targets.len() > 1 && print.merge {
        for file in &files_to_print {
            log::info!(
                "Splitting {} across {} printers...",
                file.display(),
                targets.len()
            );
            let source = SourceDocument::load(file).await?;
            let split_targets = targets.clone();
            let parts =
                tokio::task::spawn_blocking(move || split_document_by_weight(&source, &split_targets))
                    .await??;

            for (target_name, document) in parts {
                let split_path = output_dir.join(format!("split_{}_{}.pdf", profile.name, target_name));
                save_pdf(document, &split_path).await?;
                temporary_files.push(split_path.clone());
                if let Some(target) = targets.iter().find(|t| t.name == target_name) {
                    submit(&run.backend, &split_path, target).await?;
                }
            }
        }
    } else {
        for file in &files_to_print {
            for target in targets {
                submit(&run.backend, file, target).await?;
            }
        }
    }

    Ok(())
}

struct WrittenOutput {
    path: PathBuf,
    source: PathBuf,
}

async fn print_outputs(
    config: &Config,
    written: &[(usize, WrittenOutput)],
    run: &RunOptions,
    summary: &mut RunSummary,
) -> Result<()> {
    for (index, profile) in config.outputs.iter().enumerate() {
        let outputs: Vec<&WrittenOutput> = written
            .iter()
            .filter(|(i, _)| *i == index)
            .map(|(_, output)| output)
            .collect();
        if outputs.is_empty() || !profile.print.enabled || profile.print.targets.is_empty() {
            continue;
        }

        let outputs = match profile.sort {
            Some(order) => {
                log::info!("Sorted profile '{}' files by: {}", profile.name, order.as_str());
                sort_by(outputs, order, |o| o.source.as_path()).await?
            }
            None => outputs,
        };
        let files: Vec<PathBuf> = outputs.iter().map(|o| o.path.clone()).collect();

        let output_dir = run.output_dir_for(profile);
        if let Err(e) = print_profile(profile, files, output_dir, run, &mut summary.temporary_files).await {
            summary.print_failed += 1;
            // A blocked safety check only cancels this profile's printing
            if matches!(e, MillError::Safety(_)) {
                summary.print_errors.push(e);
                continue;
            }
            log::error!("  Print error: {}", e);
            if config.settings.on_error == ErrorPolicy::Stop {
                return Err(e);
            }
            summary.print_errors.push(e);
        }
    }
    Ok(())
}

// =============================================================================
// Cleanup
// =============================================================================

async fn remove_files<'a>(paths: impl IntoIterator<Item = &'a Path>, what: &str) {
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => log::debug!("Cleaned up {}: {}", what, path.display()),
            Err(e) => log::warn!("Failed to cleanup {}: {}", path.display(), e),
        }
    }
}

// =============================================================================
// Entry point
// =============================================================================

/// Process every input document with every enabled profile of `config`.
///
/// Per-pair selection and transform failures are recorded in the summary
/// and, under [`ErrorPolicy::Stop`], end the run with that error.
pub async fn process(config: &Config, input: &Path, run: &RunOptions) -> Result<RunSummary> {
    let mut summary = RunSummary::default();

    let mut files = get_input_files(input, &config.input.pattern).await?;
    if files.is_empty() {
        log::info!("No PDF files found in: {}", input.display());
        return Ok(summary);
    }

    if let Some(filter) = config.input.filter.as_ref().filter(|f| !f.keywords.is_empty()) {
        let before = files.len();
        files = filter_files(files, filter).await?;
        if files.len() < before {
            log::info!("Filtered out {} file(s) by keyword filter", before - files.len());
        }
        if files.is_empty() {
            log::info!("No PDF files matched the keyword filter");
            return Ok(summary);
        }
    }
    log::info!("Found {} PDF file(s) to process", files.len());

    if let Some(input_sort) = config.input.sort {
        if let Some(profile) = config.outputs.iter().find(|p| p.sort.is_some()) {
            return Err(MillError::Config(format!(
                "Sort specified in both input ({}) and profile '{}' ({}). Use only one.",
                input_sort.as_str(),
                profile.name,
                profile.sort.map(SortOrder::as_str).unwrap_or_default()
            )));
        }
        files = sort_by(files, input_sort, |p| p.as_path()).await?;
        log::info!("Sorted files by: {}", input_sort.as_str());
    }
    summary.inputs = files.clone();

    let timestamp = chrono::Local::now().naive_local();
    let mut written: Vec<(usize, WrittenOutput)> = Vec::new();

    for source in &files {
        log::info!("Processing: {}", source.display());
        for (index, profile) in config.outputs.iter().enumerate() {
            if !profile.enabled {
                log::debug!("Skipping disabled profile: {}", profile.name);
                continue;
            }

            let output_dir = run.output_dir_for(profile).to_path_buf();
            let task_source = source.clone();
            let task_profile = profile.clone();
            let task_run = run.clone();
            let result = tokio::task::spawn_blocking(move || {
                process_pair(&task_source, &task_profile, &output_dir, &task_run, timestamp)
            })
            .await?;

            let outcome = match result {
                Ok(outcome) => {
                    summary.succeeded += 1;
                    if let ProfileOutcome::Written { path, .. } = &outcome {
                        written.push((
                            index,
                            WrittenOutput {
                                path: path.clone(),
                                source: source.clone(),
                            },
                        ));
                    }
                    outcome
                }
                Err(e) => {
                    let error = e.in_profile(profile.name.clone(), source.clone());
                    log::error!("Error in profile '{}': {}", profile.name, error);
                    summary.failed += 1;
                    if config.settings.on_error == ErrorPolicy::Stop || !error.is_recoverable() {
                        return Err(error);
                    }
                    ProfileOutcome::Failed { error }
                }
            };
            summary.reports.push(PairReport {
                source: source.clone(),
                profile: profile.name.clone(),
                outcome,
            });
        }
    }

    if !run.dry_run {
        print_outputs(config, &written, run, &mut summary).await?;

        if config.settings.cleanup_source {
            remove_files(files.iter().map(PathBuf::as_path), "source").await;
        }
        if config.settings.cleanup_output_after_print {
            let printed = written
                .iter()
                .filter(|(index, _)| config.outputs[*index].print.enabled)
                .map(|(_, output)| output.path.as_path());
            remove_files(printed, "output").await;
            remove_files(summary.temporary_files.iter().map(PathBuf::as_path), "temporary").await;
        }
    }

    log::info!(
        "Processing complete: {} succeeded, {} failed, {} print failure(s)",
        summary.succeeded,
        summary.failed,
        summary.print_failed
    );
    Ok(summary)
}
