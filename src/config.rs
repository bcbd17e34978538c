//! Run configuration, read from YAML and completed with the reference defaults.
//!
//! ```yaml
//! mode: dense
//! input: logs/car7.csv
//! vehicle_id: 7
//! window_time: 3
//! thresholds:
//!   - {signal: speed, max: 90}
//!   - {signal: x, min: 0, max: 600}
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalogue::{self, Property, ENVELOPE_PROPERTY_ID};
use crate::monitor::TimeSemantics;
use crate::schema::{SchemaEntry, SignalSchema, DEFAULT_IDENTIFIER};
use crate::thresholds::{ThresholdError, ThresholdRegistry, ThresholdRule, DEFAULT_WINDOW};

pub const DEFAULT_INPUT: &str = "discrete_stl_data.csv";
pub const DEFAULT_OUTPUT: &str = "stl_result/stl_results.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error(transparent)]
    Threshold(#[from] ThresholdError),
}

/// Settings as written in a configuration file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorConfig {
    pub mode: Option<TimeSemantics>,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub vehicle_id: Option<u64>,
    pub envelope_property_id: Option<u32>,
    pub window_time: Option<f64>,
    pub thresholds: Option<Vec<ThresholdRule>>,
    pub properties: Option<Vec<Property>>,
    pub schema: Option<Vec<SchemaEntry>>,
    pub identifier: Option<String>,
}

impl MonitorConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        // an empty document deserializes to unit, not to a mapping
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        Ok(serde_yaml::from_str(contents)?)
    }

    /// Fill the unset fields with defaults and validate the thresholds.
    pub fn resolve(self) -> Result<RunConfig, ConfigError> {
        let mode = self.mode.unwrap_or_default();
        let window = self.window_time.unwrap_or(DEFAULT_WINDOW);
        let registry = match self.thresholds {
            Some(rules) => ThresholdRegistry::new(rules, window)?,
            None => ThresholdRegistry::default().with_window(window),
        };
        let schema = match self.schema {
            Some(entries) => SignalSchema::new(entries),
            None => mode.default_schema(),
        }
        .with_identifier(self.identifier.unwrap_or_else(|| DEFAULT_IDENTIFIER.to_string()));

        Ok(RunConfig {
            mode,
            input: self.input.unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT)),
            output: self.output.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
            vehicle_id: self.vehicle_id.unwrap_or(0),
            envelope_property_id: self.envelope_property_id.unwrap_or(ENVELOPE_PROPERTY_ID),
            registry,
            properties: self.properties.unwrap_or_else(catalogue::reference),
            schema,
            fresh: false,
        })
    }
}

/// Fully resolved settings of one monitoring run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub mode: TimeSemantics,
    pub input: PathBuf,
    pub output: PathBuf,
    pub vehicle_id: u64,
    pub envelope_property_id: u32,
    pub registry: ThresholdRegistry,
    pub properties: Vec<Property>,
    pub schema: SignalSchema,
    /// Empty the result store before writing.
    pub fresh: bool,
}
