use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use pdf_mill::orientation::{TesseractDetector, TimeoutDetector};
use pdf_mill::print::{LpBackend, PrintBackend};
use pdf_mill::raster::Rasterizer;
use pdf_mill::{Capabilities, Config, ProfileOutcome, RunOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "pdfm", about = "Select, transform and print PDF pages by profile", version)]
struct Cli {
    /// Show debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only show warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process input PDFs with every enabled profile
    Run {
        /// Configuration file (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Input file or directory (defaults to input.path from the config)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Write every output here instead of the profiles' directories
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Describe what would be done without writing or printing
        #[arg(long)]
        dry_run: bool,

        /// Seconds to wait for orientation detection of one page
        #[arg(long, default_value = "30")]
        ocr_timeout: u64,
    },

    /// Check a configuration file and report every problem
    Validate {
        /// Configuration file (JSON)
        #[arg(short, long)]
        config: PathBuf,
    },

    /// List available printers
    Printers,
}

fn init_logger(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

#[cfg(feature = "pdfium")]
fn rasterizer() -> Arc<dyn Rasterizer> {
    Arc::new(pdf_mill::raster::PdfiumRasterizer::new())
}

#[cfg(not(feature = "pdfium"))]
fn rasterizer() -> Arc<dyn Rasterizer> {
    Arc::new(pdf_mill::raster::UnavailableRasterizer)
}

fn capabilities(ocr_timeout: Duration) -> Capabilities {
    let rasterizer = rasterizer();
    let tesseract = Arc::new(TesseractDetector::new(Arc::clone(&rasterizer)));
    Capabilities::default()
        .with_rasterizer(rasterizer)
        .with_detector(Arc::new(TimeoutDetector::new(tesseract, ocr_timeout)))
}

async fn load_config(path: &Path) -> Result<Config> {
    Config::load(path)
        .await
        .with_context(|| format!("Failed to load {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Run {
            config,
            input,
            output,
            dry_run,
            ocr_timeout,
        } => {
            let config = load_config(&config).await?;
            config.validate()?;

            let input = input.unwrap_or_else(|| config.input.path.clone());
            let mut options = RunOptions::new(Arc::new(LpBackend::new()))
                .with_dry_run(dry_run)
                .with_capabilities(capabilities(Duration::from_secs(ocr_timeout)));
            if let Some(dir) = output {
                options = options.with_output_dir(dir);
            }

            let summary = pdf_mill::process(&config, &input, &options).await?;
            for report in &summary.reports {
                if let ProfileOutcome::Failed { error } = &report.outcome {
                    eprintln!("FAILED {} [{}]: {}", report.source.display(), report.profile, error);
                }
            }
            for error in &summary.print_errors {
                eprintln!("PRINT FAILED: {}", error);
            }
            if summary.failed > 0 || summary.print_failed > 0 {
                bail!(
                    "{} of {} document/profile pair(s) failed, {} profile(s) failed to print",
                    summary.failed,
                    summary.succeeded + summary.failed,
                    summary.print_failed
                );
            }
        }

        Commands::Validate { config } => {
            let path = config;
            let config = load_config(&path).await?;
            let problems = config.problems();
            if !problems.is_empty() {
                for problem in &problems {
                    eprintln!("  - {}", problem);
                }
                bail!("{} has {} problem(s)", path.display(), problems.len());
            }
            println!(
                "{} is valid ({} profile(s))",
                path.display(),
                config.outputs.len()
            );
        }

        Commands::Printers => {
            let backend = LpBackend::new();
            let printers = tokio::task::spawn_blocking(move || backend.list_printers()).await??;
            if printers.is_empty() {
                println!("No printers found");
            }
            for printer in printers {
                println!("{}", printer);
            }
        }
    }

    Ok(())
}
