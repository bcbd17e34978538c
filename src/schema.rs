//! Ordered signal interface of a telemetry log.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the column holding sample times.
pub const TIME_COLUMN: &str = "time";

/// Column identifying the vehicle in the dense-time vehicle logs.
pub const DEFAULT_IDENTIFIER: &str = "device_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalType {
    Float,
    Integer,
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float => f.write_str("float"),
            Self::Integer => f.write_str("integer"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SignalType,
}

impl SchemaEntry {
    pub fn new(name: impl Into<String>, kind: SignalType) -> Self {
        Self { name: name.into(), kind }
    }
}

/// Signal names and their semantic types, in declaration order.
///
/// The time column and the identifier column may appear in the schema so that it mirrors the
/// log layout, but they are never handed out as monitored signals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalSchema {
    entries: Vec<SchemaEntry>,
    identifier: String,
}

impl SignalSchema {
    pub fn new(entries: Vec<SchemaEntry>) -> Self {
        Self {
            entries,
            identifier: DEFAULT_IDENTIFIER.to_string(),
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Schema of the discrete-time bench logs.
    pub fn discrete() -> Self {
        Self::new(vec![
            SchemaEntry::new("speed", SignalType::Float),
            SchemaEntry::new("acc", SignalType::Float),
            SchemaEntry::new("pos", SignalType::Float),
        ])
    }

    /// Schema of the per-vehicle dense-time logs.
    pub fn vehicle() -> Self {
        Self::new(vec![
            SchemaEntry::new(TIME_COLUMN, SignalType::Float),
            SchemaEntry::new(DEFAULT_IDENTIFIER, SignalType::Integer),
            SchemaEntry::new("speed", SignalType::Float),
            SchemaEntry::new("acceleration", SignalType::Float),
            SchemaEntry::new("x", SignalType::Float),
            SchemaEntry::new("y", SignalType::Float),
            SchemaEntry::new("angle", SignalType::Float),
        ])
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn entries(&self) -> &[SchemaEntry] {
        &self.entries
    }

    /// Entries that become monitored input signals.
    pub fn monitored(&self) -> impl Iterator<Item = &SchemaEntry> + '_ {
        self.entries
            .iter()
            .filter(move |entry| entry.name != TIME_COLUMN && entry.name != self.identifier)
    }

    pub fn signal_type(&self, name: &str) -> Option<SignalType> {
        self.monitored().find(|entry| entry.name == name).map(|entry| entry.kind)
    }
}
