use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use log::{debug, warn};
use serde::Deserialize;

use crate::config::{InputOptions, MalformedRows, TextEncoding};
use crate::error::{PipelineError, Result};

const REQUIRED_COLUMNS: [&str; 4] = ["timeset", "source", "target", "weight"];

const NAIVE_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub target: String,
    pub weight: f64,
}

// Row shape of the Sarafu export; any extra columns are ignored.
#[derive(Debug, Deserialize)]
struct RawTransaction {
    timeset: String,
    source: String,
    target: String,
    weight: f64,
}

#[derive(Debug, Default)]
pub struct LoadReport {
    pub transactions: Vec<Transaction>,
    pub total_rows: usize,
    pub dropped_timestamps: usize,
    pub malformed_rows: usize,
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn decode_field(bytes: &[u8], encoding: TextEncoding) -> Option<String> {
    match encoding {
        TextEncoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_string),
        TextEncoding::Latin1 => Some(bytes.iter().map(|&b| b as char).collect()),
    }
}

fn decode_record(record: &csv::ByteRecord, encoding: TextEncoding) -> Option<csv::StringRecord> {
    let mut out = csv::StringRecord::with_capacity(record.as_slice().len(), record.len());
    for field in record.iter() {
        out.push_field(&decode_field(field, encoding)?);
    }
    Some(out)
}

// Strips a byte-order mark (raw or mis-decoded as latin-1) and maps the
// `from`/`to` spellings some exports use onto `source`/`target`.
fn normalize_header(raw: &str) -> String {
    let trimmed = raw
        .trim_start_matches('\u{feff}')
        .trim_start_matches("\u{ef}\u{bb}\u{bf}")
        .trim()
        .to_ascii_lowercase();
    match trimmed.as_str() {
        "from" => "source".to_string(),
        "to" => "target".to_string(),
        "timestamp" => "timeset".to_string(),
        _ => trimmed,
    }
}

struct RowTally<'a> {
    policy: MalformedRows,
    origin: &'a Path,
    malformed: usize,
}

impl RowTally<'_> {
    fn malformed(&mut self, line: u64, reason: String) -> Result<()> {
        match self.policy {
            MalformedRows::Fail => Err(PipelineError::MalformedRow { line, reason }),
            MalformedRows::Skip => {
                debug!("{}: skipping line {}: {}", self.origin.display(), line, reason);
                self.malformed += 1;
                Ok(())
            }
        }
    }
}

pub fn read_transactions(file_path: &Path, options: &InputOptions) -> Result<LoadReport> {
    let file = File::open(file_path).map_err(|e| PipelineError::io(file_path, e))?;
    read_transactions_from(file, file_path, options)
}

// Reads transaction rows from any byte source.
// Inputs: reader, the path used in diagnostics, input options
// Outputs: LoadReport with the surviving rows and drop counters
// Key steps:
// 1. Decode and normalize the header, checking required columns exist
// 2. Decode each row with the configured encoding and deserialize it
// 3. Drop rows with unparseable timestamps, apply the malformed-row policy to the rest
pub fn read_transactions_from<R: Read>(
    reader: R,
    origin: &Path,
    options: &InputOptions,
) -> Result<LoadReport> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .delimiter(options.delimiter_byte()?)
        .from_reader(reader);

    let raw_headers = rdr
        .byte_headers()
        .map_err(|e| PipelineError::csv(origin, e))?
        .clone();
    let decoded = decode_record(&raw_headers, options.encoding).ok_or_else(|| {
        PipelineError::MalformedRow {
            line: 1,
            reason: "header row cannot be decoded with the configured encoding".to_string(),
        }
    })?;
    let headers: csv::StringRecord = decoded.iter().map(normalize_header).collect();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(PipelineError::MissingColumn {
                path: origin.to_path_buf(),
                column: column.to_string(),
            });
        }
    }

    let mut report = LoadReport::default();
    let mut tally = RowTally {
        policy: options.malformed_rows,
        origin,
        malformed: 0,
    };
    let mut record = csv::ByteRecord::new();

    loop {
        match rdr.read_byte_record(&mut record) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                if let csv::ErrorKind::UnequalLengths { .. } = e.kind() {
                    report.total_rows += 1;
                    tally.malformed(line, e.to_string())?;
                    continue;
                }
                return Err(PipelineError::csv(origin, e));
            }
        }
        report.total_rows += 1;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let Some(row) = decode_record(&record, options.encoding) else {
            tally.malformed(line, "field is not valid for the configured encoding".to_string())?;
            continue;
        };
        let raw: RawTransaction = match row.deserialize(Some(&headers)) {
            Ok(raw) => raw,
            Err(e) => {
                tally.malformed(line, e.to_string())?;
                continue;
            }
        };

        let source = raw.source.trim();
        let target = raw.target.trim();
        if source.is_empty() || target.is_empty() {
            tally.malformed(line, "empty source or target user id".to_string())?;
            continue;
        }
        if !raw.weight.is_finite() {
            tally.malformed(line, format!("non-finite weight {}", raw.weight))?;
            continue;
        }

        match parse_timestamp(&raw.timeset) {
            Some(timestamp) => report.transactions.push(Transaction {
                timestamp,
                source: source.to_string(),
                target: target.to_string(),
                weight: raw.weight,
            }),
            None => report.dropped_timestamps += 1,
        }
    }

    report.malformed_rows = tally.malformed;
    if report.dropped_timestamps > 0 {
        warn!(
            "Dropped {} of {} rows with unparseable timestamps",
            report.dropped_timestamps, report.total_rows
        );
    }
    if report.malformed_rows > 0 {
        warn!("Skipped {} malformed rows", report.malformed_rows);
    }

    Ok(report)
}
