//! Print backends

use crate::{MillError, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Mutex, MutexGuard};

pub trait PrintBackend: Send + Sync {
    /// Short identifier used in log messages
    fn name(&self) -> &str;

    fn list_printers(&self) -> Result<Vec<String>>;

    /// Send `path` to `printer`. With `dry_run` nothing is submitted.
    fn print_pdf(
        &self,
        path: &Path,
        printer: &str,
        copies: u32,
        extra_args: &[String],
        dry_run: bool,
    ) -> Result<()>;
}

/// CUPS command-line tools (`lp` and `lpstat`)
#[derive(Debug, Clone)]
pub struct LpBackend {
    lp: PathBuf,
    lpstat: PathBuf,
}

impl Default for LpBackend {
    fn default() -> Self {
        Self {
            lp: PathBuf::from("lp"),
            lpstat: PathBuf::from("lpstat"),
        }
    }
}

impl LpBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Command line that would print `path`, without the program name
    pub fn print_args(path: &Path, printer: &str, copies: u32, extra_args: &[String]) -> Vec<String> {
        let mut args = vec![
            "-d".to_string(),
            printer.to_string(),
            "-n".to_string(),
            copies.to_string(),
        ];
        args.extend(extra_args.iter().cloned());
        args.push(path.display().to_string());
        args
    }
}

impl PrintBackend for LpBackend {
    fn name(&self) -> &str {
        "lp"
    }

    fn list_printers(&self) -> Result<Vec<String>> {
        let output = Command::new(&self.lpstat)
            .arg("-e")
            .output()
            .map_err(|e| MillError::Print(format!("could not run {}: {}", self.lpstat.display(), e)))?;
        if !output.status.success() {
            return Err(MillError::Print(format!(
                "lpstat failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn print_pdf(
        &self,
        path: &Path,
        printer: &str,
        copies: u32,
        extra_args: &[String],
        dry_run: bool,
    ) -> Result<()> {
        let args = Self::print_args(path, printer, copies, extra_args);
        if dry_run {
            log::info!("[dry-run] Would run: {} {}", self.lp.display(), args.join(" "));
            return Ok(());
        }

        if !path.exists() {
            return Err(MillError::Print(format!("PDF file not found: {}", path.display())));
        }

        log::info!("Printing {} to '{}' ({} copies)", path.display(), printer, copies);
        let output = Command::new(&self.lp)
            .args(&args)
            .output()
            .map_err(|e| MillError::Print(format!("could not run {}: {}", self.lp.display(), e)))?;
        if !output.status.success() {
            return Err(MillError::Print(format!(
                "lp failed for '{}': {}",
                printer,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

/// One recorded [`MockBackend::print_pdf`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintCall {
    pub path: PathBuf,
    pub printer: String,
    pub copies: u32,
    pub extra_args: Vec<String>,
    pub dry_run: bool,
}

/// Records print requests instead of printing
#[derive(Debug)]
pub struct MockBackend {
    printers: Vec<String>,
    fail_on_print: bool,
    calls: Mutex<Vec<PrintCall>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new(vec!["Mock Printer 1".to_string(), "Mock Printer 2".to_string()])
    }
}

impl MockBackend {
    pub fn new(printers: Vec<String>) -> Self {
        Self {
            printers,
            fail_on_print: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every non-dry-run print reports failure
    pub fn failing() -> Self {
        Self {
            fail_on_print: true,
            ..Self::default()
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PrintCall>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn calls(&self) -> Vec<PrintCall> {
        self.lock().clone()
    }

    pub fn reset(&self) {
        self.lock().clear();
    }
}

impl PrintBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn list_printers(&self) -> Result<Vec<String>> {
        Ok(self.printers.clone())
    }

    fn print_pdf(
        &self,
        path: &Path,
        printer: &str,
        copies: u32,
        extra_args: &[String],
        dry_run: bool,
    ) -> Result<()> {
        self.lock().push(PrintCall {
            path: path.to_path_buf(),
            printer: printer.to_string(),
            copies,
            extra_args: extra_args.to_vec(),
            dry_run,
        });

        if dry_run || !self.fail_on_print {
            Ok(())
        } else {
            Err(MillError::Print(format!("mock print to '{}' failed", printer)))
        }
    }
}
