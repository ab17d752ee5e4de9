use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::Granularity;
use crate::error::{PipelineError, Result};
use crate::graph::{SnapshotGraph, SnapshotRecord};
use crate::partition::{EdgeRecord, WindowKey};

pub type SnapshotCollection = BTreeMap<WindowKey, SnapshotGraph>;

#[derive(Debug, Serialize, Deserialize)]
struct CachedWindow {
    window: WindowKey,
    #[serde(flatten)]
    graph: SnapshotRecord,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotCache {
    granularity: Granularity,
    windows: Vec<CachedWindow>,
}

pub fn build_snapshots(windows: &BTreeMap<WindowKey, Vec<EdgeRecord>>) -> SnapshotCollection {
    windows
        .iter()
        .map(|(key, edges)| (*key, SnapshotGraph::from_edges(edges)))
        .collect()
}

// Serializes into a temp file beside `path`, then renames it into place.
pub fn save_cache(path: &Path, granularity: Granularity, snapshots: &SnapshotCollection) -> Result<()> {
    let cache = SnapshotCache {
        granularity,
        windows: snapshots
            .iter()
            .map(|(window, graph)| CachedWindow {
                window: *window,
                graph: graph.to_record(),
            })
            .collect(),
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| PipelineError::io(dir, e))?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer(&mut writer, &cache).map_err(|source| PipelineError::Cache {
            path: path.to_path_buf(),
            source,
        })?;
        writer.flush().map_err(|e| PipelineError::io(path, e))?;
    }
    tmp.persist(path)
        .map_err(|e| PipelineError::io(path, e.error))?;
    info!("Saved {} snapshot graphs to {}", snapshots.len(), path.display());
    Ok(())
}

// Returns None when there is no cache yet or it was built with another
// granularity; a cache that exists but cannot be parsed is an error.
pub fn load_cache(path: &Path, granularity: Granularity) -> Result<Option<SnapshotCollection>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(PipelineError::io(path, e)),
    };
    let cache: SnapshotCache =
        serde_json::from_reader(BufReader::new(file)).map_err(|source| PipelineError::Cache {
            path: path.to_path_buf(),
            source,
        })?;

    if cache.granularity != granularity {
        warn!(
            "Snapshot cache {} holds {:?} windows but {:?} was requested; rebuilding",
            path.display(),
            cache.granularity,
            granularity
        );
        return Ok(None);
    }

    let snapshots: SnapshotCollection = cache
        .windows
        .iter()
        .map(|w| (w.window, SnapshotGraph::from_record(&w.graph)))
        .collect();
    info!("Loaded {} snapshot graphs from {}", snapshots.len(), path.display());
    Ok(Some(snapshots))
}
