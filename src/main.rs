use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};

mod aggregate;
mod config;
mod dedup;
mod error;
mod models;
mod normalize;
mod report;
mod store;

use aggregate::DEFAULT_DEFAULTER_THRESHOLD;
use config::Settings;
use models::RawRecord;
use store::AttendanceStore;

#[derive(Parser)]
#[command(name = "attendance-analyzer")]
#[command(about = "Validate, deduplicate and summarize student attendance", long_about = None)]
struct Cli {
    /// CSV table holding the attendance rows
    #[arg(long, global = true, env = "ATTENDANCE_DATA_FILE", default_value = config::DEFAULT_DATA_FILE)]
    data_file: PathBuf,
    /// Log filter directive, e.g. `info` or `debug`
    #[arg(long, global = true, env = "ATTENDANCE_LOG", default_value = "info")]
    log_level: String,
    /// Reject statuses that do not reduce to P, A, L or H
    #[arg(long, global = true)]
    strict_status: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate one entry and append it to the table
    Add {
        #[arg(long)]
        student_id: String,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long)]
        date: String,
        #[arg(long)]
        status: String,
    },
    /// Print per-student and per-day attendance
    Summary {
        #[arg(long, default_value_t = DEFAULT_DEFAULTER_THRESHOLD)]
        threshold: f64,
        #[arg(long, default_value_t = 10)]
        top: usize,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value_t = DEFAULT_DEFAULTER_THRESHOLD)]
        threshold: f64,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Deduplicate the table and rewrite it without invalid rows
    Clean,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    config::setup_logging(&cli.log_level);

    let settings = Settings::new(cli.data_file, cli.strict_status);
    let store = AttendanceStore::open(&settings.data_file, settings.normalizer())
        .context("failed to open attendance table")?;

    match cli.command {
        Commands::Add {
            student_id,
            name,
            date,
            status,
        } => {
            let raw = RawRecord::new(student_id, name, date, status);
            match store.normalizer().normalize(&raw) {
                Ok(record) => {
                    store.append(&record)?;
                    println!("Record added.");
                }
                Err(err) => {
                    tracing::warn!(%err, "rejected attendance entry");
                    println!("Error: {err}");
                }
            }
        }
        Commands::Summary {
            threshold,
            top,
            format,
        } => {
            let threshold = config::validate_threshold(threshold)?;
            let top = config::validate_top(top)?;
            let records = store.read_all()?.records;
            let summary = aggregate::aggregate(&records, threshold);

            match format {
                OutputFormat::Text => {
                    print!("{}", report::console_summary(&summary, threshold, top))
                }
                OutputFormat::Json => println!("{}", report::to_json(&summary)?),
            }
        }
        Commands::Report { threshold, out } => {
            let threshold = config::validate_threshold(threshold)?;
            let records = store.read_all()?.records;
            let summary = aggregate::aggregate(&records, threshold);
            let report = report::build_report(
                &summary,
                threshold,
                &store.path().display().to_string(),
            );
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Clean => {
            let outcome = store.save_cleaned()?;
            println!(
                "Cleaned data saved to {} ({} kept, {} duplicates removed, {} invalid rows dropped).",
                store.path().display(),
                outcome.kept,
                outcome.removed,
                outcome.skipped
            );
        }
    }

    Ok(())
}
