use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use log::warn;
use ndarray::Array1;
use serde::Serialize;

use crate::config::WeightBlend;
use crate::metrics::SeriesPoint;

#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxScaled {
    pub min: f64,
    pub max: f64,
    pub values: Array1<f64>,
}

// Global min-max scaling of one column. A column without spread maps to
// all zeros instead of dividing by zero.
pub fn min_max_scale(column: &[f64]) -> MinMaxScaled {
    let values = Array1::from(column.to_vec());
    if values.is_empty() {
        return MinMaxScaled {
            min: 0.0,
            max: 0.0,
            values,
        };
    }
    let min = values.fold(f64::INFINITY, |acc, &v| acc.min(v));
    let max = values.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
    let range = max - min;
    let scaled = if range > 0.0 {
        values.mapv(|v| (v - min) / range)
    } else {
        Array1::zeros(values.len())
    };
    MinMaxScaled {
        min,
        max,
        values: scaled,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityScore {
    pub user: String,
    pub month: String,
    pub kshell: f64,
    pub degree_centrality: f64,
    pub kshell_scaled: f64,
    pub degree_scaled: f64,
    pub activity_score: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct JoinDiagnostics {
    pub matched: usize,
    pub kshell_only: usize,
    pub degree_only: usize,
}

impl JoinDiagnostics {
    pub fn dropped(&self) -> usize {
        self.kshell_only + self.degree_only
    }
}

#[derive(Debug, Clone)]
pub struct ScoreTable {
    pub rows: Vec<ActivityScore>,
    pub join: JoinDiagnostics,
    pub kshell_range: (f64, f64),
    pub degree_range: (f64, f64),
}

// Builds the composite activity score table.
// Inputs: k-shell and degree-centrality series keyed by (user, month), blend weights
// Outputs: ScoreTable sorted by month ascending then score descending
// Key steps:
// 1. Inner join the two series, counting rows present on only one side
// 2. Min-max scale each column across the whole joined table
// 3. Blend the scaled columns and sort
pub fn combine_activity_scores(
    kshell: &[SeriesPoint],
    degree: &[SeriesPoint],
    blend: &WeightBlend,
) -> ScoreTable {
    let degree_by_key: HashMap<(&str, &str), f64> = degree
        .iter()
        .map(|p| ((p.user.as_str(), p.month.as_str()), p.value))
        .collect();

    let mut join = JoinDiagnostics::default();
    let mut matched_keys: HashSet<(&str, &str)> = HashSet::new();
    let mut joined: Vec<(&SeriesPoint, f64)> = Vec::new();
    for point in kshell {
        let key = (point.user.as_str(), point.month.as_str());
        match degree_by_key.get(&key) {
            Some(&centrality) => {
                matched_keys.insert(key);
                joined.push((point, centrality));
            }
            None => join.kshell_only += 1,
        }
    }
    join.matched = joined.len();
    join.degree_only = degree_by_key
        .keys()
        .filter(|key| !matched_keys.contains(*key))
        .count();
    if join.dropped() > 0 {
        warn!(
            "Activity score join dropped {} rows ({} k-shell only, {} degree only)",
            join.dropped(),
            join.kshell_only,
            join.degree_only
        );
    }

    let kshell_column: Vec<f64> = joined.iter().map(|(p, _)| p.value).collect();
    let degree_column: Vec<f64> = joined.iter().map(|&(_, d)| d).collect();
    let kshell_scaled = min_max_scale(&kshell_column);
    let degree_scaled = min_max_scale(&degree_column);

    let mut rows: Vec<ActivityScore> = joined
        .iter()
        .enumerate()
        .map(|(i, (point, centrality))| {
            let ks = kshell_scaled.values[i];
            let ds = degree_scaled.values[i];
            ActivityScore {
                user: point.user.clone(),
                month: point.month.clone(),
                kshell: point.value,
                degree_centrality: *centrality,
                kshell_scaled: ks,
                degree_scaled: ds,
                activity_score: blend.kshell * ks + blend.degree * ds,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        a.month
            .cmp(&b.month)
            .then_with(|| {
                b.activity_score
                    .partial_cmp(&a.activity_score)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.user.cmp(&b.user))
    });

    ScoreTable {
        rows,
        join,
        kshell_range: (kshell_scaled.min, kshell_scaled.max),
        degree_range: (degree_scaled.min, degree_scaled.max),
    }
}
