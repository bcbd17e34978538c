//! Reads telemetry CSV logs into per-signal sample series.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::schema::TIME_COLUMN;

/// `(time, value)` pairs of one signal in file order.
pub type Samples = Vec<(f64, f64)>;

/// Every non-time column of a log, keyed by header name.
pub type SignalData = BTreeMap<String, Samples>;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("could not read header row: {0}")]
    Header(#[source] csv::Error),

    #[error("file has no header row")]
    NoHeader,

    #[error("header has no `time` column")]
    MissingTime,

    #[error("column `{0}` appears more than once in the header")]
    DuplicateColumn(String),
}

/// Reason a data row was dropped.
#[derive(Debug, Error)]
enum RowError {
    #[error("unreadable row: {0}")]
    Read(#[from] csv::Error),

    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("column `{column}` value \"{value}\" is not a number")]
    NotANumber { column: String, value: String },

    #[error("column `{column}` value is not finite")]
    NonFinite { column: String },

    #[error("negative time {0}")]
    NegativeTime(f64),
}

fn first_duplicate(names: &[String]) -> Option<&str> {
    let mut seen = BTreeSet::new();
    names.iter().map(String::as_str).find(|name| !seen.insert(*name))
}

struct Columns {
    names: Vec<String>,
    time: usize,
}

impl Columns {
    fn from_header(header: &StringRecord) -> Result<Self, LoadError> {
        if header.iter().all(str::is_empty) {
            return Err(LoadError::NoHeader);
        }

        let names: Vec<String> = header.iter().map(str::to_string).collect();

        if let Some(name) = first_duplicate(&names) {
            return Err(LoadError::DuplicateColumn(name.to_string()));
        }

        let time = names
            .iter()
            .position(|name| name == TIME_COLUMN)
            .ok_or(LoadError::MissingTime)?;

        Ok(Self { names, time })
    }

    fn signals(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.names
            .iter()
            .enumerate()
            .filter(move |(index, _)| *index != self.time)
            .map(|(index, name)| (index, name.as_str()))
    }

    fn parse_row(&self, record: &StringRecord) -> Result<(f64, Vec<f64>), RowError> {
        if record.len() != self.names.len() {
            return Err(RowError::FieldCount {
                expected: self.names.len(),
                found: record.len(),
            });
        }

        let time = self.parse_field(record, self.time)?;

        if time < 0.0 {
            return Err(RowError::NegativeTime(time));
        }

        let values = self
            .signals()
            .map(|(index, _)| self.parse_field(record, index))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((time, values))
    }

    fn parse_field(&self, record: &StringRecord, index: usize) -> Result<f64, RowError> {
        let column = &self.names[index];
        let raw = record.get(index).unwrap_or_default();
        let value: f64 = raw.parse().map_err(|_| RowError::NotANumber {
            column: column.clone(),
            value: raw.to_string(),
        })?;

        if value.is_finite() {
            Ok(value)
        } else {
            Err(RowError::NonFinite { column: column.clone() })
        }
    }
}

/// Read a CSV log from any source.
///
/// Malformed rows are skipped whole and logged; only header problems are errors.
pub fn read<R: Read>(source: R) -> Result<SignalData, LoadError> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).flexible(true).from_reader(source);
    let header = reader.headers().map_err(LoadError::Header)?.clone();
    let columns = Columns::from_header(&header)?;

    let mut data: SignalData = columns.signals().map(|(_, name)| (name.to_string(), Samples::new())).collect();
    let mut accepted = 0usize;
    let mut skipped = 0usize;

    for (index, result) in reader.records().enumerate() {
        let record = index + 1;
        let parsed = result.map_err(RowError::from).and_then(|row| columns.parse_row(&row));

        match parsed {
            Ok((time, values)) => {
                for ((_, name), value) in columns.signals().zip(values) {
                    if let Some(samples) = data.get_mut(name) {
                        samples.push((time, value));
                    }
                }
                accepted += 1;
            }
            Err(reason) => {
                warn!(record, %reason, "skipping malformed row");
                skipped += 1;
            }
        }
    }

    info!(signals = data.len(), rows = accepted, "loaded telemetry");

    if skipped > 0 {
        warn!(skipped, "some rows were skipped");
    }

    Ok(data)
}

/// Open and read a CSV log from disk.
pub fn try_load(path: impl AsRef<Path>) -> Result<SignalData, LoadError> {
    let path = path.as_ref();
    debug!(path = %path.display(), "opening telemetry log");

    let file = std::fs::File::open(path).map_err(|err| LoadError::Open {
        path: path.to_path_buf(),
        source: err.into(),
    })?;

    read(file)
}

/// Load a CSV log, yielding no signals when the file or its header is unusable.
pub fn load(path: impl AsRef<Path>) -> SignalData {
    let path = path.as_ref();

    match try_load(path) {
        Ok(data) => data,
        Err(err) => {
            error!(path = %path.display(), %err, "could not load telemetry");
            SignalData::new()
        }
    }
}
