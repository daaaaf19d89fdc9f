//! Contour tool.
//!
//! Reads JSON grid documents, traces contours for every grid and writes
//! the records as JSON:
//! - Base options from `CONTOUR_*` environment variables (and `.env`)
//! - Per-document option overrides and fault lines
//! - Independent grids contoured in parallel

mod document;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use contour_engine::ContourOptions;
use rayon::prelude::*;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use document::{load_documents, run_document, Outcome};

#[derive(Parser, Debug)]
#[command(name = "contour-tool")]
#[command(about = "Trace contour lines over gridded data")]
struct Args {
    /// Grid document files (JSON)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON file with base contour options; replaces CONTOUR_* variables
    #[arg(long, env = "CONTOUR_OPTIONS_FILE")]
    options: Option<PathBuf>,

    /// Contour interval for documents without their own options
    #[arg(long)]
    interval: Option<f32>,

    /// Smoothing factor (0-9) for documents without their own options
    #[arg(long)]
    smoothing: Option<i32>,

    /// Worker threads (default: one per core)
    #[arg(short, long, env = "CONTOUR_JOBS")]
    jobs: Option<usize>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(args: &Args) -> Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so stdout stays clean JSON
    let builder = FmtSubscriber::builder()
        .with_writer(io::stderr)
        .with_target(true);

    if std::env::var("RUST_LOG").is_ok() {
        let builder = builder.with_env_filter(EnvFilter::from_default_env());
        if args.json_logs {
            tracing::subscriber::set_global_default(builder.json().finish())?;
        } else {
            tracing::subscriber::set_global_default(builder.finish())?;
        }
    } else {
        let builder = builder.with_max_level(level);
        if args.json_logs {
            tracing::subscriber::set_global_default(builder.json().finish())?;
        } else {
            tracing::subscriber::set_global_default(builder.finish())?;
        }
    }
    Ok(())
}

fn base_options(args: &Args) -> Result<ContourOptions> {
    let mut options = match &args.options {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read options file {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse options file {}", path.display()))?
        }
        None => ContourOptions::from_env(),
    };

    if let Some(interval) = args.interval {
        options.contour_interval = interval;
    }
    if let Some(smoothing) = args.smoothing {
        options.smoothing = smoothing;
    }
    Ok(options)
}

fn write_outcomes(args: &Args, outcomes: &[Outcome]) -> Result<()> {
    let out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut out = BufWriter::new(out);

    if args.pretty {
        serde_json::to_writer_pretty(&mut out, outcomes)?;
    } else {
        serde_json::to_writer(&mut out, outcomes)?;
    }
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args)?;

    let options = base_options(&args)?;
    if let Err(msg) = options.validate() {
        anyhow::bail!("Invalid contour options: {}", msg);
    }

    if let Some(jobs) = args.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs.max(1))
            .build_global()
            .context("Failed to configure worker threads")?;
    }

    let mut documents = Vec::new();
    for path in &args.inputs {
        documents.extend(load_documents(path)?);
    }
    info!(documents = documents.len(), "Contouring grids");

    let outcomes: Vec<Outcome> = documents
        .par_iter()
        .map(|doc| run_document(doc, &options))
        .collect();

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    let records: usize = outcomes.iter().map(|o| o.records.len()).sum();
    info!(records, failed, "Finished");

    write_outcomes(&args, &outcomes)?;

    if failed > 0 {
        anyhow::bail!("{} of {} grids failed", failed, outcomes.len());
    }
    Ok(())
}
