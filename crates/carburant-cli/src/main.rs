//! Carburant CLI - fleet fuel consumption extraction and regression

mod config;

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use carburant::prelude::*;
use carburant::filter_for_regression;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "carburant")]
#[command(
    author,
    version,
    about = "Fuel consumption extraction and regression for fleet spreadsheets"
)]
struct Cli {
    /// JSON file with `extract` and `regression` option sections
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `carburant_extract=debug` (default: RUST_LOG, then info)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SheetArgs {
    /// Input workbook (xlsx or xls)
    input: PathBuf,

    /// Sheet to read
    #[arg(short, long)]
    sheet: String,

    /// Header row, 0-based (overrides the config file)
    #[arg(long)]
    header_row: Option<usize>,
}

#[derive(Args)]
struct OutputArgs {
    /// Output JSON file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Indent the JSON output
    #[arg(short, long)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the sheets of a workbook
    Sheets {
        /// Input workbook (xlsx or xls)
        input: PathBuf,
    },

    /// Extract vehicle records, monthly totals and skipped rows
    Extract {
        #[command(flatten)]
        sheet: SheetArgs,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Monthly summary in calendar order
    Monthly {
        #[command(flatten)]
        sheet: SheetArgs,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Per-vehicle totals and performance indices
    Vehicles {
        #[command(flatten)]
        sheet: SheetArgs,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Fit consumption against distance and tonnage
    Regress {
        #[command(flatten)]
        sheet: SheetArgs,
        #[command(flatten)]
        output: OutputArgs,

        /// One model per vehicle type plus a fleet-wide model
        #[arg(long)]
        by_type: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref())?;
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Sheets { input } => list_sheets(&input),
        Commands::Extract { sheet, output } => {
            let extraction = extract(&sheet, &config)?;
            write_json(&extraction, &output)
        }
        Commands::Monthly { sheet, output } => {
            let extraction = extract(&sheet, &config)?;
            write_json(&monthly_summary(&extraction.records), &output)
        }
        Commands::Vehicles { sheet, output } => {
            let extraction = extract(&sheet, &config)?;
            write_json(&vehicle_performance(&extraction.records), &output)
        }
        Commands::Regress {
            sheet,
            output,
            by_type,
        } => {
            let extraction = extract(&sheet, &config)?;
            let records = filter_for_regression(&extraction.records);
            if by_type {
                write_json(&fit_by_type(&records, &config.regression), &output)
            } else {
                let result = fit_or_default(&records, &sheet.sheet, &config.regression);
                write_json(&result, &output)
            }
        }
    }
}

fn init_logging(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level)
            .with_context(|| format!("Invalid log filter '{}'", level))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    // log records from the library crates are bridged by `init`
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    Ok(())
}

fn list_sheets(input: &Path) -> Result<()> {
    let workbook =
        Workbook::open(input).with_context(|| format!("Failed to open '{}'", input.display()))?;

    let mut stdout = io::stdout().lock();
    for name in workbook.sheet_names() {
        writeln!(stdout, "{}", name).context("Failed to write to stdout")?;
    }
    Ok(())
}

fn extract(args: &SheetArgs, config: &Config) -> Result<Extraction> {
    let workbook = Workbook::open(&args.input)
        .with_context(|| format!("Failed to open '{}'", args.input.display()))?;

    let mut options = config.extract.clone();
    if let Some(row) = args.header_row {
        options.header_row = row;
    }

    let extraction = workbook
        .extract_sheet(&args.sheet, &options)
        .with_context(|| format!("Failed to extract sheet '{}'", args.sheet))?;
    for issue in &extraction.issues {
        tracing::debug!(row = issue.row, reason = %issue.reason, "skipped row");
    }
    tracing::info!(
        records = extraction.records.len(),
        skipped = extraction.issues.len(),
        "extracted '{}'",
        args.sheet
    );
    Ok(extraction)
}

fn write_json<T: Serialize>(value: &T, output: &OutputArgs) -> Result<()> {
    let mut json = if output.pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("Failed to serialize output")?;
    json.push('\n');

    match &output.output {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("Failed to write '{}'", path.display()))?;
            tracing::info!("wrote {}", path.display());
        }
        None => io::stdout()
            .write_all(json.as_bytes())
            .context("Failed to write to stdout")?,
    }
    Ok(())
}
