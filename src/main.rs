use aidev_report::config::Config;
use aidev_report::extract::{self, ExtractResult, Table};
use aidev_report::{logging, metrics, report, ReportError, RunSummary};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "aidev_report")]
#[command(about = "Extract AIDev pull request tables and build the security summary")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, env = "AIDEV_REPORT_CONFIG")]
    config: Option<PathBuf>,

    /// Write a Prometheus text snapshot of the run metrics to this file
    #[arg(long, global = true)]
    metrics_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Project dataset tables (NDJSON exports) into flat CSVs
    Extract {
        /// Table to extract: pull-requests, repositories, task-types, commit-details or all
        #[arg(long, default_value = "all")]
        table: String,
        #[arg(long)]
        source_dir: Option<PathBuf>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Join pull requests with task types and flag security keywords
    Report {
        /// Pull request CSV
        #[arg(long)]
        primary: Option<PathBuf>,
        /// Task type CSV
        #[arg(long)]
        lookup: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
        /// Write the run summary as JSON to this file
        #[arg(long)]
        summary: Option<PathBuf>,
        /// Log progress every N pull requests (0 disables)
        #[arg(long)]
        progress_every: Option<u64>,
    },
    /// Run all four extractions, then the report
    Run {
        #[arg(long)]
        source_dir: Option<PathBuf>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
        #[arg(long)]
        summary: Option<PathBuf>,
    },
}

fn parse_tables(arg: &str) -> Result<Vec<Table>, ReportError> {
    if arg.trim() == "all" {
        return Ok(Table::ALL.to_vec());
    }
    arg.split(',').map(str::parse).collect()
}

fn print_extract_results(results: &[ExtractResult]) {
    for result in results {
        println!(
            "✅ {}: wrote {} rows to {}",
            result.table,
            result.rows_written,
            result.output_path.display()
        );
        if result.rejected_lines > 0 {
            println!("   ⚠️  skipped {} malformed source lines", result.rejected_lines);
        }
    }
}

fn print_summary(summary: &RunSummary) {
    println!("\n📊 Security summary:");
    println!("   Rows written: {}", summary.rows_written);
    println!("   PRs with type/confidence info: {}", summary.lookup_matches);
    println!("   Security flagged: {}", summary.security_flagged);
    println!(
        "   Lookup table: {} rows, {} ids, {} skipped, {} duplicate ids",
        summary.lookup_rows,
        summary.lookup_entries,
        summary.lookup_skipped,
        summary.lookup_collisions
    );
    println!("   Output file: {}", summary.output_path.display());
    println!("   sha256: {}", summary.output_sha256);
}

fn run_report(config: &Config, summary_path: Option<&Path>) -> anyhow::Result<()> {
    let summary = report::generate(config)?;
    print_summary(&summary);
    if let Some(path) = summary_path {
        summary
            .write_json(path)
            .with_context(|| format!("writing run summary to {}", path.display()))?;
    }
    Ok(())
}

fn execute(cli: Cli, mut config: Config) -> anyhow::Result<()> {
    match cli.command {
        Commands::Extract {
            table,
            source_dir,
            output_dir,
        } => {
            let tables = parse_tables(&table)?;
            let source_dir = source_dir.unwrap_or_else(|| config.extract.source_dir.clone());
            let output_dir = output_dir.unwrap_or_else(|| config.extract.output_dir.clone());
            println!("🔄 Extracting {} table(s)...", tables.len());
            let results = extract::extract_tables(
                &tables,
                &source_dir,
                &output_dir,
                config.progress.extract_every,
            )?;
            print_extract_results(&results);
        }
        Commands::Report {
            primary,
            lookup,
            output,
            summary,
            progress_every,
        } => {
            if let Some(p) = primary {
                config.report.primary = p;
            }
            if let Some(p) = lookup {
                config.report.lookup = p;
            }
            if let Some(p) = output {
                config.report.output = p;
            }
            if let Some(n) = progress_every {
                config.progress.every = n;
            }
            println!("🔎 Building security summary...");
            run_report(&config, summary.as_deref())?;
        }
        Commands::Run {
            source_dir,
            output_dir,
            summary,
        } => {
            let source_dir = source_dir.unwrap_or_else(|| config.extract.source_dir.clone());
            let output_dir = output_dir.unwrap_or_else(|| config.extract.output_dir.clone());

            println!("\n📥 Step 1: Extracting tables...");
            let results = extract::extract_tables(
                &Table::ALL,
                &source_dir,
                &output_dir,
                config.progress.extract_every,
            )?;
            print_extract_results(&results);

            println!("\n🔎 Step 2: Building security summary...");
            config.chain_extract_outputs(&output_dir);
            run_report(&config, summary.as_deref())?;
        }
    }
    Ok(())
}

fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ReportError>())
        .map(|e| e.exit_code() as u8)
        .unwrap_or(1)
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {e}");
            return ExitCode::from(e.exit_code() as u8);
        }
    };

    let _log_guard = logging::init_logging(&config.logging.dir);

    let metrics_file = cli.metrics_file.clone();
    if metrics_file.is_some() {
        if let Err(e) = metrics::init() {
            error!("{}", e);
            return ExitCode::from(1);
        }
    }

    let outcome = execute(cli, config);

    if let Some(path) = metrics_file {
        if let Err(e) = metrics::write_snapshot(&path) {
            error!("{}", e);
        }
    }

    match outcome {
        Ok(()) => {
            info!("Done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            eprintln!("❌ {e:#}");
            ExitCode::from(exit_code_for(&e))
        }
    }
}
