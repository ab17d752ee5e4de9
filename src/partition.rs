use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Granularity;
use crate::csv_reader::Transaction;

// Calendar month or ISO week. The derived ordering is chronological within
// one granularity, which is all a single run ever mixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WindowKey {
    Month { year: i32, month: u32 },
    Week { year: i32, week: u32 },
}

impl WindowKey {
    pub fn for_timestamp(timestamp: &DateTime<Utc>, granularity: Granularity) -> Self {
        match granularity {
            Granularity::Month => WindowKey::Month {
                year: timestamp.year(),
                month: timestamp.month(),
            },
            Granularity::Week => {
                let iso = timestamp.iso_week();
                WindowKey::Week {
                    year: iso.year(),
                    week: iso.week(),
                }
            }
        }
    }

    pub fn granularity(&self) -> Granularity {
        match self {
            WindowKey::Month { .. } => Granularity::Month,
            WindowKey::Week { .. } => Granularity::Week,
        }
    }
}

impl fmt::Display for WindowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowKey::Month { year, month } => write!(f, "{:04}-{:02}", year, month),
            WindowKey::Week { year, week } => write!(f, "{:04}-W{:02}", year, week),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
    pub weight: f64,
}

impl EdgeRecord {
    pub fn new(source: impl Into<String>, target: impl Into<String>, weight: f64) -> Self {
        EdgeRecord {
            source: source.into(),
            target: target.into(),
            weight,
        }
    }
}

impl From<&Transaction> for EdgeRecord {
    fn from(tx: &Transaction) -> Self {
        EdgeRecord::new(tx.source.clone(), tx.target.clone(), tx.weight)
    }
}

// Groups transactions into one edge list per window. Windows without
// transactions never appear; iteration over the map is chronological.
pub fn partition_transactions(
    transactions: &[Transaction],
    granularity: Granularity,
) -> BTreeMap<WindowKey, Vec<EdgeRecord>> {
    let mut windows: BTreeMap<WindowKey, Vec<EdgeRecord>> = BTreeMap::new();
    for tx in transactions {
        let key = WindowKey::for_timestamp(&tx.timestamp, granularity);
        windows.entry(key).or_default().push(EdgeRecord::from(tx));
    }
    windows
}
