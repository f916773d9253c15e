#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the broker sheet tools.
//!
//! Reads broker listing PDFs, identifies the aircraft model, extracts the
//! configured fields, and writes them into the model's comparison
//! workbook. A safe-mode `report` subcommand prints the planned cell
//! writes instead, and `analyze-template` bootstraps a model
//! configuration from a template workbook.
//!
//! Uses `indicatif-log-bridge` (via [`broker_sheet_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

use std::path::{Path, PathBuf};

use broker_sheet_cli_utils::IndicatifProgress;
use broker_sheet_config::ConfigRegistry;
use broker_sheet_extract::{ExtractionRules, FieldExtractor};
use broker_sheet_process::{Document, ListingOptions, Pipeline};
use clap::{Parser, Subcommand, ValueEnum};

mod template;

// ---------------------------------------------------------------------------
// CLI definitions
// ---------------------------------------------------------------------------

/// Fill aircraft comparison workbooks from broker listing PDFs.
#[derive(Parser)]
#[command(name = "broker_sheet")]
#[command(about = "Fill aircraft comparison workbooks from broker listing PDFs")]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// List configured models and any rejected configuration entries.
    Models {
        /// Model configuration JSON.
        #[arg(long)]
        config: PathBuf,
    },

    /// Print the aircraft model a listing describes.
    Identify {
        /// Model configuration JSON.
        #[arg(long)]
        config: PathBuf,
        /// Listing PDF.
        #[arg(long)]
        pdf: PathBuf,
    },

    /// Print the fields extracted from a listing as JSON.
    Extract {
        /// Model configuration JSON.
        #[arg(long)]
        config: PathBuf,
        /// Listing PDF.
        #[arg(long)]
        pdf: PathBuf,
        /// Aircraft model (skips identification).
        #[arg(long)]
        model: Option<String>,
        /// Extraction vocabulary JSON overriding the built-in rules.
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Write one or more listings into a workbook.
    Process {
        /// Model configuration JSON.
        #[arg(long)]
        config: PathBuf,
        /// Workbook to update.
        #[arg(long)]
        workbook: PathBuf,
        /// Listing PDFs, processed in order.
        #[arg(long = "pdf", required = true, num_args = 1..)]
        pdfs: Vec<PathBuf>,
        /// Broker name for new columns.
        #[arg(long)]
        broker: String,
        /// Serial number (default: the one found in each listing).
        #[arg(long)]
        serial: Option<String>,
        /// Sheet receiving new columns (default: the first sheet).
        #[arg(long)]
        sheet: Option<String>,
        /// Aircraft model (skips identification).
        #[arg(long)]
        model: Option<String>,
        /// Updated workbook path (default: `<workbook>_updated.xlsx`).
        #[arg(long)]
        output: Option<PathBuf>,
        /// Backup path (default: `<workbook>_backup.xlsx`).
        #[arg(long)]
        backup: Option<PathBuf>,
        /// Extraction vocabulary JSON overriding the built-in rules.
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Print the cell writes for a listing without changing the workbook.
    Report {
        /// Model configuration JSON.
        #[arg(long)]
        config: PathBuf,
        /// Workbook the listing would go into.
        #[arg(long)]
        workbook: PathBuf,
        /// Listing PDF.
        #[arg(long)]
        pdf: PathBuf,
        /// Serial number.
        #[arg(long)]
        serial: String,
        /// Broker name.
        #[arg(long, default_value = "")]
        broker: String,
        /// Sheet receiving new columns (default: the first sheet).
        #[arg(long)]
        sheet: Option<String>,
        /// Aircraft model (skips identification).
        #[arg(long)]
        model: Option<String>,
        /// Output format.
        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
        /// Extraction vocabulary JSON overriding the built-in rules.
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Detect field and upgrade rows in a template workbook.
    AnalyzeTemplate {
        /// Template workbook.
        #[arg(long)]
        workbook: PathBuf,
        /// Configuration JSON to write (merged if it exists).
        #[arg(long)]
        output: Option<PathBuf>,
        /// Confirm or edit every detected row before saving.
        #[arg(long)]
        interactive: bool,
    },
}

/// Rendering of a safe-mode report.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ReportFormat {
    Json,
    Csv,
    Text,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Loads a registry, warning about every rejected entry.
fn load_registry(path: &Path) -> Result<ConfigRegistry, Box<dyn std::error::Error>> {
    let (registry, rejected) = ConfigRegistry::load(path)?;
    for entry in &rejected {
        log::warn!("Skipping configuration {entry}");
    }
    if registry.is_empty() {
        return Err(format!("No usable model configurations in {}", path.display()).into());
    }
    Ok(registry)
}

fn load_extractor(rules: Option<&Path>) -> Result<FieldExtractor, Box<dyn std::error::Error>> {
    let rules = match rules {
        Some(path) => ExtractionRules::load(path)?,
        None => ExtractionRules::default(),
    };
    Ok(FieldExtractor::new(&rules)?)
}

/// `<dir>/<stem><suffix>.xlsx` next to `workbook`.
fn sibling(workbook: &Path, suffix: &str) -> PathBuf {
    let stem = workbook
        .file_stem()
        .map_or_else(|| "workbook".into(), |s| s.to_string_lossy());
    workbook.with_file_name(format!("{stem}{suffix}.xlsx"))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_models(config: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let (registry, rejected) = ConfigRegistry::load(config)?;

    println!("{:<30} {:>6} {:>9}", "MODEL", "FIELDS", "UPGRADES");
    println!("{}", "-".repeat(47));
    for (model, configuration) in registry.iter() {
        println!(
            "{model:<30} {:>6} {:>9}",
            configuration.row_mappings.len(),
            configuration.upgrades.len()
        );
    }

    if !rejected.is_empty() {
        println!();
        println!("Rejected entries:");
        for entry in &rejected {
            println!("  {entry}");
        }
    }
    Ok(())
}

fn cmd_identify(config: &Path, pdf: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let registry = load_registry(config)?;
    let pipeline = Pipeline::new(&registry, load_extractor(None)?);
    let text = broker_sheet_pdf::extract_text_from_path(pdf)?;
    println!("{}", pipeline.identify(&text)?);
    Ok(())
}

fn cmd_extract(
    config: &Path,
    pdf: &Path,
    model: Option<&str>,
    rules: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let registry = load_registry(config)?;
    let pipeline = Pipeline::new(&registry, load_extractor(rules)?);
    let text = broker_sheet_pdf::extract_text_from_path(pdf)?;
    let analysis = pipeline.analyze(&text, model)?;

    println!("Model: {}", analysis.model);
    println!("{}", serde_json::to_string_pretty(&analysis.record)?);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_process(
    multi: &broker_sheet_cli_utils::MultiProgress,
    config: &Path,
    workbook: &Path,
    pdfs: &[PathBuf],
    options: &ListingOptions<'_>,
    output: Option<PathBuf>,
    backup: Option<PathBuf>,
    rules: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let registry = load_registry(config)?;
    let pipeline = Pipeline::new(&registry, load_extractor(rules)?);
    let input = std::fs::read(workbook)?;

    let mut documents = Vec::with_capacity(pdfs.len());
    for path in pdfs {
        documents.push(Document {
            name: file_name(path),
            bytes: std::fs::read(path)?,
        });
    }
    if options.serial.is_some() && documents.len() > 1 {
        log::warn!("--serial applies to every one of the {} listings", documents.len());
    }

    let progress = IndicatifProgress::documents_bar(multi, "Processing listings");
    let outcome = pipeline.process_batch(&documents, &input, options, progress.as_ref());

    for report in &outcome.documents {
        println!();
        match &report.result {
            Ok(summary) => {
                println!(
                    "{}: {} {} at column {} of {} ({})",
                    report.name,
                    summary.placement.mode,
                    summary.serial,
                    summary.placement.column,
                    summary.placement.sheet,
                    summary.model
                );
                for update in &summary.updates {
                    println!("  {update}");
                }
                for violation in &summary.violations {
                    println!("  ! {violation}");
                }
                for note in summary.record.unresolved_notes() {
                    println!("  ? {note}");
                }
            }
            Err(e) => println!("{}: FAILED: {e}", report.name),
        }
    }

    if outcome.succeeded() == 0 {
        return Err("No listings were processed".into());
    }

    let backup = backup.unwrap_or_else(|| sibling(workbook, "_backup"));
    std::fs::write(&backup, &outcome.backup)?;
    let output = output.unwrap_or_else(|| sibling(workbook, "_updated"));
    std::fs::write(&output, &outcome.updated)?;

    println!();
    println!("Backup written to {}", backup.display());
    println!("Updated workbook written to {}", output.display());
    Ok(())
}

fn cmd_report(
    config: &Path,
    workbook: &Path,
    pdf: &Path,
    options: &ListingOptions<'_>,
    format: ReportFormat,
    rules: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let registry = load_registry(config)?;
    let pipeline = Pipeline::new(&registry, load_extractor(rules)?);
    let text = broker_sheet_pdf::extract_text_from_path(pdf)?;
    let input = std::fs::read(workbook)?;

    let plan = pipeline.plan(&text, &input, options)?;
    let rendered = match format {
        ReportFormat::Json => plan.to_json()?,
        ReportFormat::Csv if plan.entries.is_empty() => "No updates to apply\n".to_owned(),
        ReportFormat::Csv => plan.to_csv()?,
        ReportFormat::Text => plan.to_text(),
    };
    print!("{rendered}");
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = broker_sheet_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Models { config } => cmd_models(&config)?,
        Commands::Identify { config, pdf } => cmd_identify(&config, &pdf)?,
        Commands::Extract {
            config,
            pdf,
            model,
            rules,
        } => cmd_extract(&config, &pdf, model.as_deref(), rules.as_deref())?,
        Commands::Process {
            config,
            workbook,
            pdfs,
            broker,
            serial,
            sheet,
            model,
            output,
            backup,
            rules,
        } => {
            let options = ListingOptions {
                broker: &broker,
                serial: serial.as_deref(),
                sheet: sheet.as_deref(),
                model: model.as_deref(),
            };
            cmd_process(
                &multi,
                &config,
                &workbook,
                &pdfs,
                &options,
                output,
                backup,
                rules.as_deref(),
            )?;
        }
        Commands::Report {
            config,
            workbook,
            pdf,
            serial,
            broker,
            sheet,
            model,
            format,
            rules,
        } => {
            let options = ListingOptions {
                broker: &broker,
                serial: Some(&serial),
                sheet: sheet.as_deref(),
                model: model.as_deref(),
            };
            cmd_report(&config, &workbook, &pdf, &options, format, rules.as_deref())?;
        }
        Commands::AnalyzeTemplate {
            workbook,
            output,
            interactive,
        } => template::run(&workbook, output.as_deref(), interactive)?,
    }

    Ok(())
}
