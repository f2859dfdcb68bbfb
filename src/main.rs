use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

mod columns;
mod config;
mod extract;
mod header;
mod models;
mod normalize;
mod pipeline;
mod report;
mod source;
mod text;
mod validate;
mod vocabulary;
mod workload;

use config::{
    ExtractionConfig, HoursFormula, WeekdayMode, DEFAULT_HEADER_THRESHOLD, DEFAULT_HEADER_WINDOW,
    STRICT_HEADER_THRESHOLD,
};
use models::FileReport;
use pipeline::Importer;
use vocabulary::Vocabulary;

#[derive(Parser)]
#[command(name = "activity-importer")]
#[command(about = "Imports internship activity plans from spreadsheets and CSV exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract activities from one file
    Extract {
        #[arg(long)]
        file: PathBuf,
        /// Write the JSON report here
        #[arg(long)]
        out: Option<PathBuf>,
        #[command(flatten)]
        options: ExtractionArgs,
    },
    /// Extract several files and summarize them per course
    Batch {
        #[arg(long, required = true, num_args = 1..)]
        file: Vec<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
        #[command(flatten)]
        options: ExtractionArgs,
    },
    /// Show header candidates and the chosen column mapping
    Headers {
        #[arg(long)]
        file: PathBuf,
        #[command(flatten)]
        options: ExtractionArgs,
    },
    /// Generate a markdown report for a batch
    Report {
        #[arg(long, required = true, num_args = 1..)]
        file: Vec<PathBuf>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        #[command(flatten)]
        options: ExtractionArgs,
    },
    /// Print the default vocabulary as JSON
    Vocabulary {
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ExtractionArgs {
    /// JSON vocabulary replacing the built-in PT-BR one
    #[arg(long)]
    vocabulary: Option<PathBuf>,
    /// Distinct keywords a row needs to count as the header
    #[arg(long, conflicts_with = "strict_header")]
    threshold: Option<usize>,
    /// Require four keywords in the header row
    #[arg(long)]
    strict_header: bool,
    /// Rows scanned from the top when looking for the header
    #[arg(long, default_value_t = DEFAULT_HEADER_WINDOW)]
    window: usize,
    #[arg(long, env = "ACTIVITY_HOURLY_RATE")]
    hourly_rate: Option<f64>,
    #[arg(long, value_enum, default_value_t = HoursFormula::Calendar)]
    hours_formula: HoursFormula,
    #[arg(long, value_enum, default_value_t = WeekdayMode::First)]
    weekday_mode: WeekdayMode,
}

impl ExtractionArgs {
    fn config(&self) -> ExtractionConfig {
        let header_threshold = match (self.threshold, self.strict_header) {
            (Some(threshold), _) => threshold,
            (None, true) => STRICT_HEADER_THRESHOLD,
            (None, false) => DEFAULT_HEADER_THRESHOLD,
        };
        ExtractionConfig {
            header_threshold,
            header_window: self.window,
            hourly_rate: self.hourly_rate,
            hours_formula: self.hours_formula,
            weekday_mode: self.weekday_mode,
        }
    }

    fn importer(&self) -> anyhow::Result<Importer> {
        let vocabulary = match &self.vocabulary {
            Some(path) => Vocabulary::from_json_file(path)?,
            None => Vocabulary::portuguese(),
        };
        Ok(Importer::new(vocabulary, self.config()))
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract { file, out, options } => {
            let importer = options.importer()?;
            let report = importer.extract_file(&file);
            print_file_summary(&report);
            if let Some(out) = out {
                write_json(&report, Some(&out))?;
                println!("Report written to {}.", out.display());
            }
        }
        Commands::Batch { file, out, options } => {
            let importer = options.importer()?;
            let result = importer.extract_batch(&file);
            for report in &result.files {
                print_file_summary(report);
            }
            println!(
                "Processed {} of {} files, {} activities.",
                result.summary.files_processed,
                result.files.len(),
                result.summary.total_activities
            );
            for (subject, rollup) in &result.summary.per_subject {
                println!(
                    "- {}: {} activities, {:.2} hours, {} institutions",
                    subject,
                    rollup.activities,
                    rollup.total_hours,
                    rollup.institutions.len()
                );
            }
            if let Some(out) = out {
                write_json(&result, Some(&out))?;
                println!("Report written to {}.", out.display());
            }
        }
        Commands::Headers { file, options } => {
            let importer = options.importer()?;
            let report = importer.extract_file(&file);
            for error in &report.errors {
                println!("! {}", error);
            }
            for sheet in &report.sheets {
                println!("Sheet '{}':", sheet.name);
                for candidate in &sheet.candidates {
                    if candidate.score == 0 {
                        continue;
                    }
                    let marker = if sheet.header_detected && candidate.row == sheet.header_row {
                        "*"
                    } else {
                        " "
                    };
                    println!(
                        "{} row {:>3} score {}: {}",
                        marker,
                        candidate.row,
                        candidate.score,
                        candidate.preview.join(" | ")
                    );
                }
                if !sheet.header_detected {
                    println!("  no row reached the threshold, row {} used", sheet.header_row);
                }
                for (field, column) in &sheet.field_map.columns {
                    println!("  {:<24} column {:>2}  {}", field, column.index, column.header);
                }
                for ambiguity in &sheet.field_map.ambiguities {
                    println!(
                        "  {:<24} column {:>2}  {} (ignored, column {} kept)",
                        ambiguity.field,
                        ambiguity.ignored_column,
                        ambiguity.ignored_header,
                        ambiguity.kept_column
                    );
                }
            }
        }
        Commands::Report { file, out, options } => {
            let importer = options.importer()?;
            let result = importer.extract_batch(&file);
            let report = report::build_report(&result);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Vocabulary { out } => {
            write_json(&Vocabulary::portuguese(), out.as_deref())?;
        }
    }

    Ok(())
}

fn print_file_summary(report: &FileReport) {
    println!(
        "{}: {} activities across {} sheets",
        report.source,
        report.activity_count(),
        report.sheets.len()
    );
    for sheet in &report.sheets {
        println!(
            "- {} (header row {}): {} kept, {} discarded",
            sheet.name,
            sheet.header_row,
            sheet.activities.len(),
            sheet.discarded_rows
        );
    }
    for error in &report.errors {
        println!("! {}", error);
    }
}

fn write_json<T: Serialize>(value: &T, out: Option<&Path>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    match out {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{}", json),
    }
    Ok(())
}
