use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Month,
    Week,
}

impl std::str::FromStr for Granularity {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "month" | "monthly" | "m" => Ok(Granularity::Month),
            "week" | "weekly" | "w" => Ok(Granularity::Week),
            other => Err(PipelineError::Config(format!(
                "unknown granularity '{}', expected 'month' or 'week'",
                other
            ))),
        }
    }
}

// Which degree count feeds the `degree_centrality` column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CentralityBasis {
    #[default]
    Total,
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightBlend {
    pub kshell: f64,
    pub degree: f64,
}

impl Default for WeightBlend {
    fn default() -> Self {
        WeightBlend {
            kshell: 0.2,
            degree: 0.8,
        }
    }
}

impl WeightBlend {
    pub fn validate(&self) -> Result<()> {
        let finite = self.kshell.is_finite() && self.degree.is_finite();
        if !finite || self.kshell < 0.0 || self.degree < 0.0 {
            return Err(PipelineError::Config(format!(
                "weight_blend must be finite and non-negative (got kshell={}, degree={})",
                self.kshell, self.degree
            )));
        }
        if self.kshell == 0.0 && self.degree == 0.0 {
            return Err(PipelineError::Config(
                "weight_blend weights cannot both be zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextEncoding {
    #[default]
    #[serde(rename = "utf-8", alias = "utf8")]
    Utf8,
    #[serde(rename = "latin-1", alias = "latin1", alias = "iso-8859-1")]
    Latin1,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedRows {
    #[default]
    Skip,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputOptions {
    pub delimiter: String,
    pub encoding: TextEncoding,
    pub malformed_rows: MalformedRows,
}

impl Default for InputOptions {
    fn default() -> Self {
        InputOptions {
            delimiter: ",".to_string(),
            encoding: TextEncoding::Utf8,
            malformed_rows: MalformedRows::Skip,
        }
    }
}

impl InputOptions {
    pub fn delimiter_byte(&self) -> Result<u8> {
        match self.delimiter.as_bytes() {
            [byte] if byte.is_ascii() => Ok(*byte),
            _ => Err(PipelineError::Config(format!(
                "delimiter '{}' must be a single ASCII character",
                self.delimiter
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub transactions: PathBuf,
    pub granularity: Granularity,
    pub include_community_detection: bool,
    pub weight_blend: WeightBlend,
    pub centrality_basis: CentralityBasis,
    pub self_loops_are_cyclic: bool,
    pub input: InputOptions,
    pub output_dir: PathBuf,
    pub cache_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            transactions: PathBuf::from("sarafu_txns_20200125-20210615.csv"),
            granularity: Granularity::Month,
            include_community_detection: true,
            weight_blend: WeightBlend::default(),
            centrality_basis: CentralityBasis::Total,
            self_loops_are_cyclic: false,
            input: InputOptions::default(),
            output_dir: PathBuf::from("output"),
            cache_path: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self> {
        let config: PipelineConfig =
            toml::from_str(text).map_err(|source| PipelineError::ConfigParse {
                path: origin.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        Self::from_toml_str(&text, path)
    }

    pub fn validate(&self) -> Result<()> {
        self.weight_blend.validate()?;
        self.input.delimiter_byte()?;
        Ok(())
    }
}
