//! Builds the bounded-recovery formula from the threshold registry.
//!
//! Every bound contributes a violation predicate and the matching recovery predicate. The
//! formula demands that whenever any violation holds, every recovery holds at some point
//! within the recovery window:
//!
//! ```text
//! out = always((speed > 100 or x < 0) implies eventually[0:5](speed <= 100 and x >= 0))
//! ```

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::{info, warn};

use crate::thresholds::ThresholdRegistry;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SynthesisError {
    #[error("no threshold applies to any signal present in the data")]
    NoMonitoredSignals,

    #[error("recovery window {0} must be finite and non-negative")]
    InvalidWindow(f64),
}

/// Violation and recovery predicates of the signals that are both constrained and present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clauses {
    pub violations: Vec<String>,
    pub recoveries: Vec<String>,
}

impl Clauses {
    /// Collect predicates in registry order, skipping rules whose signal is absent.
    pub fn collect<'a, I>(registry: &ThresholdRegistry, present: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let present: BTreeSet<&str> = present.into_iter().collect();
        let mut clauses = Self::default();

        for rule in registry.rules() {
            if !present.contains(rule.signal.as_str()) {
                warn!(signal = %rule.signal, "signal missing from data, leaving it out of the formula");
                continue;
            }

            if let Some(min) = rule.min {
                clauses.violations.push(format!("{} < {}", rule.signal, min));
                clauses.recoveries.push(format!("{} >= {}", rule.signal, min));
            }

            if let Some(max) = rule.max {
                clauses.violations.push(format!("{} > {}", rule.signal, max));
                clauses.recoveries.push(format!("{} <= {}", rule.signal, max));
            }
        }

        clauses
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violation(&self) -> String {
        self.violations.join(" or ")
    }

    pub fn recovery(&self) -> String {
        self.recoveries.join(" and ")
    }

    /// Render the complete `out = ...` formula for a recovery window.
    pub fn formula(&self, window: f64) -> Result<String, SynthesisError> {
        if self.is_empty() {
            return Err(SynthesisError::NoMonitoredSignals);
        }

        if !window.is_finite() || window < 0.0 {
            return Err(SynthesisError::InvalidWindow(window));
        }

        Ok(format!(
            "out = always(({}) implies eventually[0:{}]({}))",
            self.violation(),
            window,
            self.recovery()
        ))
    }
}

/// Synthesize the envelope formula for the signals present in a log.
pub fn build<'a, I>(registry: &ThresholdRegistry, present: I) -> Result<String, SynthesisError>
where
    I: IntoIterator<Item = &'a str>,
{
    let formula = Clauses::collect(registry, present).formula(registry.window())?;
    info!(%formula, "synthesized envelope formula");

    Ok(formula)
}
