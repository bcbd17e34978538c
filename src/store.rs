//! Durable JSON array of robustness records.
//!
//! Every write is a read-modify-write of the whole array. Writers serialize on a sidecar
//! `<path>.lock` file and replace the array through an atomic rename, so concurrent writers
//! never lose each other's records and readers never see a half-written file.

use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::results::RobustnessRecord;

/// Default bound on the wait for another writer to release the store.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

const MIN_BACKOFF: Duration = Duration::from_millis(2);
const MAX_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} does not hold a JSON array of records: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not encode records: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("timed out after {waited:?} waiting for the lock on {}", path.display())]
    LockTimeout { path: PathBuf, waited: Duration },
}

impl PersistError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Exclusive ownership of the store, released when dropped.
struct LockGuard {
    path: PathBuf,
}

impl LockGuard {
    fn acquire(path: PathBuf, timeout: Duration) -> Result<Self, PersistError> {
        let started = Instant::now();
        let mut backoff = MIN_BACKOFF;

        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(Self { path }),
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    let waited = started.elapsed();

                    if waited >= timeout {
                        return Err(PersistError::LockTimeout { path, waited });
                    }

                    thread::sleep(backoff);
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
                Err(err) => return Err(PersistError::io(&path)(err)),
            }
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), %err, "could not remove lock file");
        }
    }
}

/// Replace infinities with the largest finite values and drop NaN robustness.
fn storable(records: &[RobustnessRecord]) -> Vec<RobustnessRecord> {
    records
        .iter()
        .filter_map(|record| {
            if record.robustness.is_nan() || record.timestamp.is_nan() {
                warn!(
                    timestamp = record.timestamp,
                    property_id = record.stl_spec_id,
                    "dropping record with NaN value"
                );
                return None;
            }

            let mut record = *record;
            record.robustness = record.robustness.clamp(-f64::MAX, f64::MAX);
            Some(record)
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct ResultStore {
    path: PathBuf,
    lock_timeout: Duration,
}

impl ResultStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn lock(&self) -> Result<LockGuard, PersistError> {
        let directory = self.directory();
        fs::create_dir_all(directory).map_err(PersistError::io(directory))?;

        LockGuard::acquire(self.lock_path(), self.lock_timeout)
    }

    /// Every stored record. A missing or empty file holds none.
    pub fn load(&self) -> Result<Vec<RobustnessRecord>, PersistError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(PersistError::io(&self.path)(err)),
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&contents).map_err(|source| PersistError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn write(&self, records: &[RobustnessRecord]) -> Result<(), PersistError> {
        let directory = self.directory();
        let file = NamedTempFile::new_in(directory).map_err(PersistError::io(directory))?;
        let mut writer = BufWriter::new(file);

        serde_json::to_writer_pretty(&mut writer, records)?;
        writer.write_all(b"\n").map_err(PersistError::io(&self.path))?;

        let file = writer
            .into_inner()
            .map_err(|err| PersistError::io(&self.path)(err.into_error()))?;
        file.persist(&self.path).map_err(|err| PersistError::io(&self.path)(err.error))?;

        Ok(())
    }

    /// Merge-append records, returning the number of records now stored.
    pub fn append(&self, records: &[RobustnessRecord]) -> Result<usize, PersistError> {
        let _guard = self.lock()?;
        let mut stored = self.load()?;
        let before = stored.len();

        stored.extend(storable(records));
        self.write(&stored)?;

        info!(path = %self.path.display(), appended = stored.len() - before, total = stored.len(), "saved results");
        Ok(stored.len())
    }

    /// Discard the stored records and store `records` in their place.
    pub fn replace(&self, records: &[RobustnessRecord]) -> Result<usize, PersistError> {
        let _guard = self.lock()?;
        let stored = storable(records);
        debug!(path = %self.path.display(), "replacing stored results");

        self.write(&stored)?;

        info!(path = %self.path.display(), total = stored.len(), "saved results");
        Ok(stored.len())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Duration;

    use super::{PersistError, ResultStore};
    use crate::results::{RobustnessRecord, Status};

    #[test]
    fn missing_and_empty_files_hold_nothing() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let store = ResultStore::new(dir.path().join("results.json"));

        assert!(store.load()?.is_empty());

        fs::write(store.path(), "  \n")?;
        assert!(store.load()?.is_empty());

        Ok(())
    }

    #[test]
    fn creates_parent_directory() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let store = ResultStore::new(dir.path().join("stl_result").join("stl_results.json"));

        assert_eq!(store.append(&[RobustnessRecord::new(0.0, 1.0, 0, 0)])?, 1);
        assert!(fs::read_to_string(store.path())?.starts_with("[\n  {"));

        Ok(())
    }

    #[test]
    fn clamps_infinities_and_drops_nan() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let store = ResultStore::new(dir.path().join("results.json"));
        let records = [
            RobustnessRecord::new(0.0, f64::INFINITY, 1, 0),
            RobustnessRecord::new(1.0, f64::NAN, 1, 0),
            RobustnessRecord::new(2.0, f64::NEG_INFINITY, 1, 0),
        ];

        store.append(&records)?;
        let stored = store.load()?;

        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].robustness, f64::MAX);
        assert_eq!(stored[0].status, Status::Success);
        assert_eq!(stored[1].robustness, -f64::MAX);
        assert_eq!(stored[1].status, Status::Violation);

        Ok(())
    }

    #[test]
    fn refuses_to_overwrite_foreign_content() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let store = ResultStore::new(dir.path().join("results.json"));
        fs::write(store.path(), "{\"not\": \"an array\"}")?;

        assert!(matches!(store.append(&[]), Err(PersistError::Corrupt { .. })));
        assert_eq!(fs::read_to_string(store.path())?, "{\"not\": \"an array\"}");

        Ok(())
    }

    #[test]
    fn lock_timeout() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let store = ResultStore::new(dir.path().join("results.json")).with_lock_timeout(Duration::from_millis(20));
        fs::write(dir.path().join("results.json.lock"), "")?;

        assert!(matches!(store.append(&[]), Err(PersistError::LockTimeout { .. })));
        assert!(store.load()?.is_empty());

        Ok(())
    }

    #[test]
    fn replace_discards_previous_records() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let store = ResultStore::new(dir.path().join("results.json"));

        store.append(&[RobustnessRecord::new(0.0, 1.0, 0, 0), RobustnessRecord::new(1.0, 1.0, 0, 0)])?;

        assert_eq!(store.replace(&[RobustnessRecord::new(5.0, -1.0, 2, 0)])?, 1);
        assert_eq!(store.load()?[0].timestamp, 5.0);
        assert!(!dir.path().join("results.json.lock").exists());

        Ok(())
    }
}
