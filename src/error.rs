use std::path::PathBuf;
use thiserror::Error;

// Fatal failures of a pipeline run. Anything recoverable (dropped rows,
// skipped snapshots, join drops) is reported through diagnostics instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error in '{}': {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Input '{}' has no '{column}' column", .path.display())]
    MissingColumn { path: PathBuf, column: String },
    #[error("Malformed row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Failed to parse TOML from '{}': {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Snapshot cache error in '{}': {source}", .path.display())]
    Cache {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to write output '{name}': {reason}")]
    Output { name: String, reason: String },
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        PipelineError::Csv {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
