use std::collections::{BTreeMap, HashSet};

use ndarray::Array1;
use serde::Serialize;

use crate::metrics::{SnapshotMetrics, UserMetrics};

const DEGREE_BIN_COUNT: usize = 5;
const DEGREE_BIN_LABELS: [&str; DEGREE_BIN_COUNT] = ["Very Low", "Low", "Mid", "High", "Very High"];

// Pearson correlation; None when fewer than two points or either side has
// no variance.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let x = Array1::from(x.to_vec());
    let y = Array1::from(y.to_vec());
    let dx = &x - x.mean()?;
    let dy = &y - y.mean()?;
    let sxx = dx.dot(&dx);
    let syy = dy.dot(&dy);
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    Some(dx.dot(&dy) / (sxx.sqrt() * syy.sqrt()))
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

// Quantile edges with linear interpolation between order statistics.
// Repeated edges are collapsed, so heavily tied data yields fewer bins.
pub fn quantile_edges(values: &[f64], bins: usize) -> Vec<f64> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let last = (sorted.len() - 1) as f64;

    let mut edges: Vec<f64> = (0..=bins)
        .map(|i| {
            let pos = last * i as f64 / bins as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            let frac = pos - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        })
        .collect();
    edges.dedup();
    edges
}

// Index of the right-closed interval holding `value`; the first interval
// also holds its lower edge.
fn bin_of(value: f64, edges: &[f64]) -> Option<usize> {
    if edges.len() < 2 || value < edges[0] || value > edges[edges.len() - 1] {
        return None;
    }
    let intervals = edges.len() - 1;
    (0..intervals).find(|&i| value <= edges[i + 1])
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CyclicWindowSummary {
    pub month: String,
    pub cyclic_users: usize,
    pub acyclic_users: usize,
    pub total_users: usize,
    pub total_communities: Option<usize>,
    pub communities_with_cyclic_users: Option<usize>,
    pub avg_cyclic_users_per_community: Option<f64>,
    pub modularity: Option<f64>,
}

// Per-window cyclic counts plus, when a partition exists, how cyclic users
// spread over communities.
pub fn cyclic_window_summaries(snapshots: &[SnapshotMetrics]) -> Vec<CyclicWindowSummary> {
    snapshots
        .iter()
        .map(|s| {
            let cyclic = s.cyclic_users();
            let cyclic_communities = s.communities.map(|_| {
                s.users
                    .iter()
                    .filter(|u| u.cyclic)
                    .filter_map(|u| u.community_id)
                    .collect::<HashSet<_>>()
                    .len()
            });
            CyclicWindowSummary {
                month: s.window.to_string(),
                cyclic_users: cyclic,
                acyclic_users: s.acyclic_users(),
                total_users: s.users.len(),
                total_communities: s.communities.map(|c| c.community_count),
                communities_with_cyclic_users: cyclic_communities,
                avg_cyclic_users_per_community: cyclic_communities
                    .map(|n| cyclic as f64 / n.max(1) as f64),
                modularity: s.communities.map(|c| c.modularity),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegreeBin {
    pub label: String,
    pub lower: f64,
    pub upper: f64,
    pub users: usize,
    pub cyclic_users: usize,
    pub cyclic_share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegreeCyclicSummary {
    pub rows: usize,
    pub mean_degree_cyclic: Option<f64>,
    pub mean_degree_acyclic: Option<f64>,
    pub degree_cyclic_correlation: Option<f64>,
    pub bins: Vec<DegreeBin>,
}

// Degree centrality against the cyclic flag over every (user, window) row.
pub fn degree_vs_cyclic(rows: &[&UserMetrics]) -> DegreeCyclicSummary {
    let degrees: Vec<f64> = rows.iter().map(|u| u.degree_centrality).collect();
    let flags: Vec<f64> = rows.iter().map(|u| if u.cyclic { 1.0 } else { 0.0 }).collect();

    let edges = quantile_edges(&degrees, DEGREE_BIN_COUNT);
    let intervals = edges.len().saturating_sub(1);
    let mut counts = vec![(0usize, 0usize); intervals];
    for u in rows {
        if let Some(bin) = bin_of(u.degree_centrality, &edges) {
            counts[bin].0 += 1;
            if u.cyclic {
                counts[bin].1 += 1;
            }
        }
    }

    let bins = counts
        .iter()
        .enumerate()
        .map(|(i, &(users, cyclic_users))| DegreeBin {
            label: if intervals == DEGREE_BIN_COUNT {
                DEGREE_BIN_LABELS[i].to_string()
            } else {
                format!("Q{}", i + 1)
            },
            lower: edges[i],
            upper: edges[i + 1],
            users,
            cyclic_users,
            cyclic_share: if users > 0 {
                cyclic_users as f64 / users as f64
            } else {
                0.0
            },
        })
        .collect();

    DegreeCyclicSummary {
        rows: rows.len(),
        mean_degree_cyclic: mean(rows.iter().filter(|u| u.cyclic).map(|u| u.degree_centrality)),
        mean_degree_acyclic: mean(rows.iter().filter(|u| !u.cyclic).map(|u| u.degree_centrality)),
        degree_cyclic_correlation: pearson(&degrees, &flags),
        bins,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KshellCyclicRow {
    pub kshell: usize,
    pub count: usize,
    pub percentage: f64,
}

// Share of cyclic users sitting in each k-shell.
pub fn kshell_of_cyclic(rows: &[&UserMetrics]) -> Vec<KshellCyclicRow> {
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for u in rows.iter().filter(|u| u.cyclic) {
        *counts.entry(u.kshell).or_insert(0) += 1;
    }
    let total: usize = counts.values().sum();
    counts
        .into_iter()
        .map(|(kshell, count)| KshellCyclicRow {
            kshell,
            count,
            percentage: count as f64 * 100.0 / total as f64,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KshellDegreeRow {
    pub kshell: usize,
    pub users: usize,
    pub mean_degree_centrality: f64,
}

pub fn kshell_vs_degree(rows: &[&UserMetrics]) -> (Vec<KshellDegreeRow>, Option<f64>) {
    let mut groups: BTreeMap<usize, (usize, f64)> = BTreeMap::new();
    for u in rows {
        let entry = groups.entry(u.kshell).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += u.degree_centrality;
    }
    let table = groups
        .into_iter()
        .map(|(kshell, (users, sum))| KshellDegreeRow {
            kshell,
            users,
            mean_degree_centrality: sum / users as f64,
        })
        .collect();

    let ks: Vec<f64> = rows.iter().map(|u| u.kshell as f64).collect();
    let dc: Vec<f64> = rows.iter().map(|u| u.degree_centrality).collect();
    (table, pearson(&ks, &dc))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KshellDistributionRow {
    pub month: String,
    pub kshell: usize,
    pub count: usize,
}

// Number of users per k-shell value in each window.
pub fn kshell_distribution(snapshots: &[SnapshotMetrics]) -> Vec<KshellDistributionRow> {
    let mut out = Vec::new();
    for s in snapshots {
        let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
        for u in &s.users {
            *counts.entry(u.kshell).or_insert(0) += 1;
        }
        let month = s.window.to_string();
        out.extend(counts.into_iter().map(|(kshell, count)| KshellDistributionRow {
            month: month.clone(),
            kshell,
            count,
        }));
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossMetricReport {
    pub windows: Vec<CyclicWindowSummary>,
    pub degree_cyclic: DegreeCyclicSummary,
    pub kshell_cyclic: Vec<KshellCyclicRow>,
    pub kshell_degree: Vec<KshellDegreeRow>,
    pub kshell_degree_correlation: Option<f64>,
    pub kshell_distribution: Vec<KshellDistributionRow>,
}

pub fn analyze(snapshots: &[SnapshotMetrics]) -> CrossMetricReport {
    let rows: Vec<&UserMetrics> = snapshots.iter().flat_map(|s| s.users.iter()).collect();
    let (kshell_degree, kshell_degree_correlation) = kshell_vs_degree(&rows);
    CrossMetricReport {
        windows: cyclic_window_summaries(snapshots),
        degree_cyclic: degree_vs_cyclic(&rows),
        kshell_cyclic: kshell_of_cyclic(&rows),
        kshell_degree,
        kshell_degree_correlation,
        kshell_distribution: kshell_distribution(snapshots),
    }
}
