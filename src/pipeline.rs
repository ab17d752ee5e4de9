use log::info;
use serde::Serialize;

use crate::analysis::{analyze, CrossMetricReport};
use crate::cache::{build_snapshots, load_cache, save_cache, SnapshotCollection};
use crate::config::{Granularity, PipelineConfig};
use crate::csv_reader::{read_transactions, LoadReport};
use crate::error::Result;
use crate::metrics::{
    compute_snapshot_metrics, degree_centrality_series, kshell_series, MetricsOptions,
    SnapshotMetrics, UserMetrics,
};
use crate::partition::partition_transactions;
use crate::scoring::{combine_activity_scores, JoinDiagnostics, ScoreTable};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LoadSummary {
    pub total_rows: usize,
    pub kept_rows: usize,
    pub dropped_timestamps: usize,
    pub malformed_rows: usize,
}

impl From<&LoadReport> for LoadSummary {
    fn from(report: &LoadReport) -> Self {
        LoadSummary {
            total_rows: report.total_rows,
            kept_rows: report.transactions.len(),
            dropped_timestamps: report.dropped_timestamps,
            malformed_rows: report.malformed_rows,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub granularity: Granularity,
    // None when the snapshots came from the cache
    pub load: Option<LoadSummary>,
    pub snapshots: Vec<SnapshotMetrics>,
    pub scores: ScoreTable,
    pub cross: CrossMetricReport,
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub granularity: Granularity,
    pub windows: usize,
    pub from_cache: bool,
    pub load: Option<LoadSummary>,
    pub skipped_community_windows: Vec<String>,
    pub score_join: JoinDiagnostics,
    pub kshell_range: (f64, f64),
    pub degree_centrality_range: (f64, f64),
    pub mean_degree_cyclic: Option<f64>,
    pub mean_degree_acyclic: Option<f64>,
    pub degree_cyclic_correlation: Option<f64>,
    pub kshell_degree_correlation: Option<f64>,
}

impl PipelineRun {
    pub fn user_rows(&self) -> Vec<&UserMetrics> {
        self.snapshots.iter().flat_map(|s| s.users.iter()).collect()
    }

    pub fn skipped_community_windows(&self) -> Vec<String> {
        self.snapshots
            .iter()
            .filter(|s| s.community_skipped)
            .map(|s| s.window.to_string())
            .collect()
    }

    pub fn report(&self) -> RunReport {
        RunReport {
            granularity: self.granularity,
            windows: self.snapshots.len(),
            from_cache: self.load.is_none(),
            load: self.load,
            skipped_community_windows: self.skipped_community_windows(),
            score_join: self.scores.join,
            kshell_range: self.scores.kshell_range,
            degree_centrality_range: self.scores.degree_range,
            mean_degree_cyclic: self.cross.degree_cyclic.mean_degree_cyclic,
            mean_degree_acyclic: self.cross.degree_cyclic.mean_degree_acyclic,
            degree_cyclic_correlation: self.cross.degree_cyclic.degree_cyclic_correlation,
            kshell_degree_correlation: self.cross.kshell_degree_correlation,
        }
    }
}

// Runs every stage after graph construction over a snapshot collection.
pub fn analyze_snapshots(
    snapshots: &SnapshotCollection,
    config: &PipelineConfig,
    load: Option<LoadSummary>,
) -> PipelineRun {
    let options = MetricsOptions::from(config);
    let metrics: Vec<SnapshotMetrics> = snapshots
        .iter()
        .map(|(window, graph)| compute_snapshot_metrics(*window, graph, &options))
        .collect();
    info!("Computed metrics for {} windows", metrics.len());

    let scores = combine_activity_scores(
        &kshell_series(&metrics),
        &degree_centrality_series(&metrics),
        &config.weight_blend,
    );
    let cross = analyze(&metrics);

    PipelineRun {
        granularity: config.granularity,
        load,
        snapshots: metrics,
        scores,
        cross,
    }
}

// Loads or builds the snapshot graphs, then analyzes them.
// Inputs: validated pipeline configuration
// Outputs: PipelineRun holding every derived table
// Key steps:
// 1. Reuse the snapshot cache when it matches the requested granularity
// 2. Otherwise read transactions, partition them and build one graph per window
// 3. Compute metrics, activity scores and cross-metric statistics
pub fn run_pipeline(config: &PipelineConfig) -> Result<PipelineRun> {
    config.validate()?;

    let cached = match &config.cache_path {
        Some(path) => load_cache(path, config.granularity)?,
        None => None,
    };

    let (snapshots, load) = match cached {
        Some(snapshots) => (snapshots, None),
        None => {
            info!("Reading transactions from {}", config.transactions.display());
            let report = read_transactions(&config.transactions, &config.input)?;
            info!(
                "Loaded {} transactions ({} dropped timestamps, {} malformed rows)",
                report.transactions.len(),
                report.dropped_timestamps,
                report.malformed_rows
            );
            let windows = partition_transactions(&report.transactions, config.granularity);
            let snapshots = build_snapshots(&windows);
            if let Some(path) = &config.cache_path {
                save_cache(path, config.granularity, &snapshots)?;
            }
            (snapshots, Some(LoadSummary::from(&report)))
        }
    };
    info!("Built {} {:?} snapshots", snapshots.len(), config.granularity);

    Ok(analyze_snapshots(&snapshots, config, load))
}
