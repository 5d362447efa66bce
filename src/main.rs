// This is the command-line entry point for the WebP batch converter.
// The converter itself lives in the library crate (lib.rs).

use std::path::PathBuf;
use std::process::ExitCode;
use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use webp_batch_lib::utils::{format_bytes, format_savings};
use webp_batch_lib::{
    AppState, BatchReport, CompressionSettings, ConversionStatus, ConverterError, CwebpEncoder,
    OutputPolicy, Progress, QualityPreset, QueueRow,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Convert images to WebP with the cwebp encoder")]
struct Cli {
    /// Image files or folders to queue
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Lossy quality (0-100); switches the preset to custom
    #[arg(short, long)]
    quality: Option<f64>,

    /// Quality preset: high, medium, low, tiny or custom
    #[arg(long)]
    preset: Option<QualityPreset>,

    #[arg(long, help = "Encode losslessly; quality is ignored")]
    lossless: bool,

    /// Write into this folder instead of next to each original
    #[arg(short = 'o', long = "output-dir")]
    output_dir: Option<PathBuf>,

    #[arg(long, help = "Write directly into --output-dir without the \"WebP output\" subfolder")]
    no_auto_subfolder: bool,

    #[arg(long, help = "Recreate the scanned folder hierarchy under --output-dir")]
    preserve_structure: bool,

    #[arg(long, help = "Convert WebP inputs and overwrite existing outputs")]
    no_skip_existing: bool,

    #[arg(long, help = "Delete each original after a successful conversion")]
    delete_original: bool,

    /// Include subfolders when scanning folders
    #[arg(short, long)]
    recursive: bool,

    /// Path to the cwebp executable
    #[arg(long, env = "WEBP_BATCH_ENCODER")]
    encoder: Option<PathBuf>,

    /// Queue and estimate only; nothing is converted
    #[arg(long)]
    dry_run: bool,

    /// Print the final queue as JSON
    #[arg(long)]
    json: bool,

    #[arg(short, long, help = "Debug logging (RUST_LOG overrides)")]
    verbose: bool,
}

impl Cli {
    fn output_policy(&self) -> OutputPolicy {
        OutputPolicy {
            save_next_to_original: self.output_dir.is_none(),
            custom_folder: self.output_dir.clone(),
            auto_subfolder: !self.no_auto_subfolder,
            preserve_structure: self.preserve_structure,
            skip_existing_output: !self.no_skip_existing,
            delete_original_on_success: self.delete_original,
            last_scanned_folder: None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    settings: CompressionSettings,
    entries: Vec<QueueRow>,
    estimated_savings: u64,
    total_savings: u64,
    report: Option<&'a BatchReport>,
    log: Vec<String>,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_target(false)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

async fn configure(state: &AppState, cli: &Cli) -> anyhow::Result<()> {
    if let Some(preset) = cli.preset {
        state.apply_preset(preset).await;
    }
    if let Some(quality) = cli.quality {
        state.set_quality(quality).await.context("Invalid --quality")?;
    }
    state.set_lossless(cli.lossless).await;
    state.set_output_policy(cli.output_policy()).await;
    state.set_scan_subfolders(cli.recursive).await;
    Ok(())
}

fn print_table(rows: &[QueueRow]) {
    println!("{:<10} {:>12} {:>13} {:>7}  FILE", "STATUS", "ORIGINAL", "OUTPUT", "SAVED");
    for row in rows {
        let name = row.path.display();
        let Some(info) = &row.info else {
            println!("{:<10} {:>12} {:>13} {:>7}  {}", "Pending", "?", "?", "—", name);
            continue;
        };
        let (output, saved) = match (info.output_size(), info.estimate()) {
            (Some(out), _) => (format_bytes(out), format_savings(info.original_size, out)),
            (None, Some(estimate)) => (
                format!("~{}", format_bytes(estimate)),
                format_savings(info.original_size, estimate),
            ),
            (None, None) => ("—".to_string(), "—".to_string()),
        };
        println!(
            "{:<10} {:>12} {:>13} {:>7}  {}",
            info.status.label(),
            format_bytes(info.original_size),
            output,
            saved,
            name
        );
        if let (ConversionStatus::Failed, Some(error)) = (info.status, &info.error) {
            println!("{:<10} {}", "", error);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    info!("=== webp-batch starting ===");

    let encoder = CwebpEncoder::discover(cli.encoder.as_deref());
    let state = AppState::new(encoder);
    configure(&state, &cli).await?;

    for path in &cli.paths {
        // Rejections are already in the event log
        if let Err(e) = state.add_path(path).await {
            debug!("Not queued {}: {}", path.display(), e);
        }
    }

    let report = if cli.dry_run {
        None
    } else {
        let on_progress = |p: &Progress| {
            debug!(
                "{}/{} ({}%) {}",
                p.completed_tasks, p.total_tasks, p.progress_percentage, p.status
            )
        };
        match state.run_batch(on_progress).await {
            Ok(report) => Some(report),
            Err(ConverterError::EmptyQueue) => return Ok(ExitCode::FAILURE),
            Err(e) => return Err(e).context("Batch could not start"),
        }
    };

    let rows = state.rows().await;
    let estimated_savings = state.estimated_savings().await;
    let total_savings = state.total_savings().await;

    if cli.json {
        let json = JsonReport {
            settings: state.settings().await,
            entries: rows,
            estimated_savings,
            total_savings,
            report: report.as_ref(),
            log: state.log_messages().await,
        };
        println!("{}", serde_json::to_string_pretty(&json).context("Failed to serialize report")?);
    } else {
        print_table(&rows);
        match &report {
            Some(report) => {
                println!();
                println!("{}", report.summary());
                println!("Total saved: {}", format_bytes(total_savings));
            }
            None => {
                println!();
                println!("Estimated savings: {}", format_bytes(estimated_savings));
            }
        }
    }

    let failed = report.as_ref().is_some_and(BatchReport::has_failures);
    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}
