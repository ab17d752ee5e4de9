// Temporal transaction-graph analysis for the Sarafu community currency network.
// Builds one graph per time window and derives structural metrics, activity scores
// and cyclic/community statistics from them.
use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use log::warn;

use config::{Granularity, PipelineConfig};
use pipeline::{run_pipeline, PipelineRun};

mod analysis;
mod cache;
mod community;
mod config;
mod csv_reader;
mod cycles;
mod degree;
mod error;
mod graph;
mod kshell;
mod metrics;
mod output;
mod partition;
mod pipeline;
mod scoring;

const TOP_USERS_PER_WINDOW: usize = 5;

#[derive(Parser, Debug)]
#[command(
    name = "sarafu-graph",
    version,
    about = "Snapshot graph metrics, activity scores and cyclic-user analysis for transaction logs"
)]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Transaction CSV (overrides the configured path)
    #[arg(long)]
    transactions: Option<PathBuf>,

    /// Window size: month or week
    #[arg(long)]
    granularity: Option<String>,

    /// Skip Louvain community detection
    #[arg(long)]
    no_communities: bool,

    /// Directory for the output tables and report.json
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// JSON snapshot cache, reused when present
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

// Merges the optional config file with command-line overrides
// Inputs: parsed arguments
// Outputs: validated PipelineConfig
fn resolve_config(args: &Args) -> Result<PipelineConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(path) = &args.transactions {
        config.transactions = path.clone();
    }
    if let Some(raw) = &args.granularity {
        config.granularity = raw.parse::<Granularity>()?;
    }
    if args.no_communities {
        config.include_community_detection = false;
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(path) = &args.cache {
        config.cache_path = Some(path.clone());
    }
    config.validate()?;
    Ok(config)
}

// Prints per-window user counts and the most active users of each window
// Inputs: finished pipeline run
// Outputs: Prints formatted tables to console
fn print_window_summaries(run: &PipelineRun) {
    println!("\nWindow Summary:");
    for window in &run.cross.windows {
        print!(
            "{}: {} users, {} cyclic, {} acyclic",
            window.month, window.total_users, window.cyclic_users, window.acyclic_users
        );
        if let (Some(total), Some(with_cyclic)) =
            (window.total_communities, window.communities_with_cyclic_users)
        {
            print!(", {} communities ({} with cyclic users)", total, with_cyclic);
        }
        println!();
    }

    println!("\nTop Activity Scores:");
    let mut current: Option<&str> = None;
    let mut shown = 0;
    for row in &run.scores.rows {
        if current != Some(row.month.as_str()) {
            current = Some(row.month.as_str());
            shown = 0;
            println!("{}", row.month);
        }
        if shown < TOP_USERS_PER_WINDOW {
            println!(
                "  {:<44} score {:.3} (kshell {}, centrality {:.4})",
                row.user, row.activity_score, row.kshell, row.degree_centrality
            );
            shown += 1;
        }
    }
}

fn format_correlation(value: Option<f64>) -> String {
    value.map_or_else(|| "undefined".to_string(), |c| format!("{:.2}", c))
}

// Prints headline statistics and any recovered problems of the run
fn print_overall(run: &PipelineRun) {
    let report = run.report();
    println!("\nOverall Metrics:");
    if let Some(load) = report.load {
        println!(
            "Transactions: {} kept of {} rows ({} bad timestamps, {} malformed)",
            load.kept_rows, load.total_rows, load.dropped_timestamps, load.malformed_rows
        );
    } else {
        println!("Transactions: snapshots loaded from cache");
    }
    println!("Windows: {}", report.windows);
    println!(
        "Correlation between degree and cyclic status: {}",
        format_correlation(report.degree_cyclic_correlation)
    );
    println!(
        "Correlation between k-shell and degree: {}",
        format_correlation(report.kshell_degree_correlation)
    );

    if report.score_join.dropped() > 0 {
        warn!(
            "{} rows had no counterpart in the activity score join",
            report.score_join.dropped()
        );
    }
    if !report.skipped_community_windows.is_empty() {
        warn!(
            "Community detection skipped for: {}",
            report.skipped_community_windows.join(", ")
        );
    }
}

// Main entry point
// Key steps:
// 1. Resolve configuration and start logging
// 2. Run the snapshot pipeline
// 3. Write all output tables, then print the summary
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = resolve_config(&args)?;
    let run = run_pipeline(&config)?;
    if run.snapshots.is_empty() {
        println!("No transactions with valid timestamps; nothing to analyze.");
        return Ok(());
    }

    let written = output::write_outputs(&config.output_dir, &run)?;
    print_window_summaries(&run);
    print_overall(&run);
    println!("\nOutputs:");
    for path in written {
        println!("  {}", path.display());
    }

    Ok(())
}
