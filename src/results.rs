//! Verdicts derived from robustness values.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Violation,
}

impl Status {
    /// A robustness of exactly zero satisfies the property.
    pub fn from_robustness(robustness: f64) -> Self {
        if robustness >= 0.0 {
            Self::Success
        } else {
            Self::Violation
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Violation => f.write_str("violation"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobustnessRecord {
    pub timestamp: f64,
    pub vehicle_id: u64,
    pub stl_spec_id: u32,
    pub robustness: f64,
    pub status: Status,
}

impl RobustnessRecord {
    pub fn new(timestamp: f64, robustness: f64, property_id: u32, vehicle_id: u64) -> Self {
        Self {
            timestamp,
            vehicle_id,
            stl_spec_id: property_id,
            robustness,
            status: Status::from_robustness(robustness),
        }
    }
}

/// Turn a robustness sequence into records, logging one line per record.
pub fn classify(robustness: &[(f64, f64)], property_id: u32, vehicle_id: u64) -> Vec<RobustnessRecord> {
    robustness
        .iter()
        .map(|&(timestamp, value)| {
            let record = RobustnessRecord::new(timestamp, value, property_id, vehicle_id);
            info!(
                property_id,
                "[car-{}] Time={}s: robustness={:.2} → {}", vehicle_id, timestamp, value, record.status
            );
            record
        })
        .collect()
}
