use log::{debug, info};
use serde::Serialize;

use crate::community::{louvain, CommunityPartition};
use crate::config::{CentralityBasis, PipelineConfig};
use crate::cycles::classify_cycles;
use crate::degree::{degree_centrality, degree_stats};
use crate::graph::SnapshotGraph;
use crate::kshell::core_numbers;
use crate::partition::WindowKey;

const LOUVAIN_RESOLUTION: f64 = 1.0;

#[derive(Debug, Clone, Copy)]
pub struct MetricsOptions {
    pub centrality_basis: CentralityBasis,
    pub self_loops_are_cyclic: bool,
    pub include_community_detection: bool,
}

impl From<&PipelineConfig> for MetricsOptions {
    fn from(config: &PipelineConfig) -> Self {
        MetricsOptions {
            centrality_basis: config.centrality_basis,
            self_loops_are_cyclic: config.self_loops_are_cyclic,
            include_community_detection: config.include_community_detection,
        }
    }
}

impl Default for MetricsOptions {
    fn default() -> Self {
        MetricsOptions::from(&PipelineConfig::default())
    }
}

// One row per (user, window). Under weekly granularity `month` holds the
// ISO week label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserMetrics {
    pub user: String,
    pub month: String,
    pub in_degree: usize,
    pub out_degree: usize,
    pub degree: usize,
    pub weighted_in_degree: f64,
    pub weighted_out_degree: f64,
    pub weighted_degree: f64,
    pub degree_centrality: f64,
    pub in_degree_centrality: f64,
    pub out_degree_centrality: f64,
    pub kshell: usize,
    pub component: usize,
    pub cyclic: bool,
    pub community_id: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CommunitySummary {
    pub community_count: usize,
    pub modularity: f64,
}

#[derive(Debug, Clone)]
pub struct SnapshotMetrics {
    pub window: WindowKey,
    pub node_count: usize,
    pub edge_count: usize,
    pub total_weight: f64,
    pub component_count: usize,
    pub users: Vec<UserMetrics>,
    pub communities: Option<CommunitySummary>,
    pub community_skipped: bool,
}

impl SnapshotMetrics {
    pub fn cyclic_users(&self) -> usize {
        self.users.iter().filter(|u| u.cyclic).count()
    }

    pub fn acyclic_users(&self) -> usize {
        self.users.len() - self.cyclic_users()
    }
}

// Computes every per-node metric of one snapshot. The input graph is only
// read; an empty snapshot yields an empty user list.
pub fn compute_snapshot_metrics(
    window: WindowKey,
    snapshot: &SnapshotGraph,
    options: &MetricsOptions,
) -> SnapshotMetrics {
    let label = window.to_string();
    let stats = degree_stats(snapshot);
    let centrality = degree_centrality(&stats, options.centrality_basis);
    let in_centrality = degree_centrality(&stats, CentralityBasis::In);
    let out_centrality = degree_centrality(&stats, CentralityBasis::Out);

    let projection = snapshot.undirected_projection();
    let cores = core_numbers(&projection);
    let cycles = classify_cycles(snapshot, options.self_loops_are_cyclic);

    let mut community_skipped = false;
    let partition: Option<CommunityPartition> = if !options.include_community_detection {
        None
    } else if snapshot.edge_count() == 0 {
        info!("Skipping community detection for {}: no edges", label);
        community_skipped = true;
        None
    } else {
        let result = louvain(&projection, LOUVAIN_RESOLUTION);
        if result.is_none() {
            info!("Skipping community detection for {}: zero total weight", label);
            community_skipped = true;
        }
        result
    };

    let users = snapshot
        .graph()
        .node_indices()
        .map(|node| {
            let i = node.index();
            let s = stats[i];
            UserMetrics {
                user: snapshot.user(node).to_string(),
                month: label.clone(),
                in_degree: s.in_degree,
                out_degree: s.out_degree,
                degree: s.degree(),
                weighted_in_degree: s.weighted_in,
                weighted_out_degree: s.weighted_out,
                weighted_degree: s.weighted_degree(),
                degree_centrality: centrality[i],
                in_degree_centrality: in_centrality[i],
                out_degree_centrality: out_centrality[i],
                kshell: cores[i],
                component: cycles.component_of[i],
                cyclic: cycles.cyclic[i],
                community_id: partition.as_ref().map(|p| p.assignment[i]),
            }
        })
        .collect();

    let metrics = SnapshotMetrics {
        window,
        node_count: snapshot.node_count(),
        edge_count: snapshot.edge_count(),
        total_weight: snapshot.total_weight(),
        component_count: cycles.component_count(),
        users,
        communities: partition.map(|p| CommunitySummary {
            community_count: p.community_count,
            modularity: p.modularity,
        }),
        community_skipped,
    };
    debug!(
        "{}: {} users, {} edges, {:.2} total weight, {} cyclic, {} SCCs",
        label,
        metrics.node_count,
        metrics.edge_count,
        metrics.total_weight,
        cycles.cyclic_count(),
        metrics.component_count
    );
    metrics
}

// Narrow {user, month, metric, value} view of the wide metric rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRecord {
    pub user: String,
    pub month: String,
    pub metric: &'static str,
    pub value: f64,
}

pub fn to_long_format<'a>(rows: impl IntoIterator<Item = &'a UserMetrics>) -> Vec<MetricRecord> {
    let mut out = Vec::new();
    for row in rows {
        let mut push = |metric: &'static str, value: f64| {
            out.push(MetricRecord {
                user: row.user.clone(),
                month: row.month.clone(),
                metric,
                value,
            })
        };
        push("degree", row.degree as f64);
        push("weighted_degree", row.weighted_degree);
        push("degree_centrality", row.degree_centrality);
        push("kshell", row.kshell as f64);
        push("cyclic", if row.cyclic { 1.0 } else { 0.0 });
        if let Some(id) = row.community_id {
            push("community_id", id as f64);
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub user: String,
    pub month: String,
    pub value: f64,
}

pub fn kshell_series(snapshots: &[SnapshotMetrics]) -> Vec<SeriesPoint> {
    series(snapshots, |u| u.kshell as f64)
}

pub fn degree_centrality_series(snapshots: &[SnapshotMetrics]) -> Vec<SeriesPoint> {
    series(snapshots, |u| u.degree_centrality)
}

fn series(snapshots: &[SnapshotMetrics], value: impl Fn(&UserMetrics) -> f64) -> Vec<SeriesPoint> {
    snapshots
        .iter()
        .flat_map(|s| s.users.iter())
        .map(|u| SeriesPoint {
            user: u.user.clone(),
            month: u.month.clone(),
            value: value(u),
        })
        .collect()
}
