//! mealgrid CLI - Catering pivot grids
//!
//! Command-line interface for validating attendance payloads and rendering
//! them into a spreadsheet and an HTML snapshot.

mod assets;
mod config;
mod logging;
mod pipeline;
mod sink;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use mealgrid_core::{CanonicalGrid, SectionKind};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::assets::Assets;
use crate::config::Config;
use crate::pipeline::Pipeline;
use crate::sink::DirectorySink;

#[derive(Parser)]
#[command(name = "mealgrid")]
#[command(author, version, about = "Catering pivot grids rendered to XLSX and HTML", long_about = None)]
struct Cli {
    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (defaults to ./mealgrid.toml when present)
    #[arg(long, global = true, env = "MEALGRID_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the spreadsheet and HTML snapshot for a payload
    Render {
        /// Payload JSON file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output directory (overrides output_dir)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Assets directory (overrides assets_dir)
        #[arg(long, value_name = "DIR")]
        assets: Option<PathBuf>,
    },

    /// Validate a payload and summarize its grid without rendering
    Check {
        /// Payload JSON file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::resolve(cli.config.as_deref())?;
    logging::init_logging(&config.log_level, cli.verbose);

    match cli.command {
        Commands::Render {
            file,
            output,
            assets,
        } => {
            let assets_dir = assets.unwrap_or_else(|| config.assets_dir.clone());
            let output_dir = output.unwrap_or_else(|| config.output_dir.clone());
            cmd_render(&file, &assets_dir, &output_dir)
        }
        Commands::Check { file, format } => cmd_check(&file, format),
    }
}

fn read_payload(file: &Path) -> Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("Failed to read payload '{}'", file.display()))
}

fn cmd_render(file: &Path, assets_dir: &Path, output_dir: &Path) -> Result<()> {
    let payload = read_payload(file)?;
    let assets = Assets::load(assets_dir)?;
    let sink = DirectorySink::new(output_dir);

    let outcome = Pipeline::new(assets).run(&payload, &sink)?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

// =============================================================================
// Check
// =============================================================================

#[derive(Debug, Serialize)]
struct CheckSummary {
    event: String,
    dates: Vec<String>,
    slots: Vec<String>,
    accommodated: usize,
    others: usize,
    grand_total: u64,
}

impl CheckSummary {
    fn from_grid(grid: &CanonicalGrid) -> Self {
        let count = |kind| grid.section(kind).map_or(0, |s| s.rows.len());
        Self {
            event: grid.event_name.clone(),
            dates: grid.date_blocks.iter().map(|b| b.label.clone()).collect(),
            slots: grid.slots.iter().map(|s| s.abbreviation.clone()).collect(),
            accommodated: count(SectionKind::Accommodated),
            others: count(SectionKind::Others),
            grand_total: grid.grand_total,
        }
    }

    fn to_text(&self) -> String {
        format!(
            "Event:        {}\nDates:        {} ({})\nSlots:        {} ({})\nAccommodated: {}\nOthers:       {}\nGrand total:  {}",
            self.event,
            self.dates.len(),
            self.dates.join(", "),
            self.slots.len(),
            self.slots.join(", "),
            self.accommodated,
            self.others,
            self.grand_total
        )
    }
}

fn cmd_check(file: &Path, format: OutputFormat) -> Result<()> {
    let payload = read_payload(file)?;
    let input = mealgrid_parser::parse_payload(&payload)
        .with_context(|| format!("Invalid payload '{}'", file.display()))?;
    let grid = mealgrid_pivot::build_grid(&input);
    let summary = CheckSummary::from_grid(&grid);

    match format {
        OutputFormat::Text => println!("{}", summary.to_text()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }
    Ok(())
}
