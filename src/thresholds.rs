//! Safe operating envelope of each monitored signal.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Seconds a signal has to return to its envelope after leaving it.
pub const DEFAULT_WINDOW: f64 = 5.0;

/// Bounds of one signal. A missing bound leaves that side unconstrained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRule {
    pub signal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl ThresholdRule {
    pub fn min(signal: impl Into<String>, min: f64) -> Self {
        Self {
            signal: signal.into(),
            min: Some(min),
            max: None,
        }
    }

    pub fn max(signal: impl Into<String>, max: f64) -> Self {
        Self {
            signal: signal.into(),
            min: None,
            max: Some(max),
        }
    }

    pub fn range(signal: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            signal: signal.into(),
            min: Some(min),
            max: Some(max),
        }
    }

    fn validate(&self) -> Result<(), ThresholdError> {
        let signal = || self.signal.clone();

        if self.min.into_iter().chain(self.max).any(|bound| !bound.is_finite()) {
            return Err(ThresholdError::NonFinite(signal()));
        }

        match (self.min, self.max) {
            (None, None) => Err(ThresholdError::Unbounded(signal())),
            (Some(min), Some(max)) if min > max => Err(ThresholdError::Inverted {
                signal: signal(),
                min,
                max,
            }),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThresholdError {
    #[error("threshold for `{0}` has neither a min nor a max bound")]
    Unbounded(String),

    #[error("threshold for `{0}` has a non-finite bound")]
    NonFinite(String),

    #[error("threshold for `{signal}` has min {min} above max {max}")]
    Inverted { signal: String, min: f64, max: f64 },
}

/// Ordered threshold rules plus the shared recovery window.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdRegistry {
    rules: Vec<ThresholdRule>,
    window: f64,
}

impl ThresholdRegistry {
    /// Build a registry, rejecting rules that constrain nothing.
    pub fn new(rules: Vec<ThresholdRule>, window: f64) -> Result<Self, ThresholdError> {
        for rule in &rules {
            rule.validate()?;
        }

        Ok(Self { rules, window })
    }

    pub fn with_window(mut self, window: f64) -> Self {
        self.window = window;
        self
    }

    pub fn rules(&self) -> &[ThresholdRule] {
        &self.rules
    }

    pub fn window(&self) -> f64 {
        self.window
    }
}

impl Default for ThresholdRegistry {
    fn default() -> Self {
        Self {
            rules: vec![
                ThresholdRule::max("speed", 100.0),
                ThresholdRule::range("acceleration", -20.0, 20.0),
                ThresholdRule::range("x", 0.0, 600.0),
                ThresholdRule::range("y", 0.0, 500.0),
                ThresholdRule::range("angle", 0.0, 20.0),
            ],
            window: DEFAULT_WINDOW,
        }
    }
}
