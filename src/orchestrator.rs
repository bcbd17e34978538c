//! Evaluates a catalogue of properties against one dataset.

use thiserror::Error;
use tracing::{error, info, info_span};

use crate::catalogue::Property;
use crate::context::RunContext;
use crate::loader::SignalData;
use crate::monitor::{Monitor, MonitorError};
use crate::results::{classify, RobustnessRecord};
use crate::synthesis::SynthesisError;

#[derive(Debug, Error)]
pub enum FailureReason {
    #[error("could not synthesize formula: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error("could not load formula: {0}")]
    Load(#[from] MonitorError),

    #[error("evaluation produced no robustness values")]
    NoResult,
}

/// A property that produced no records, tagged with its name and id.
#[derive(Debug, Error)]
#[error("property `{name}` (id {id}): {reason}")]
pub struct PropertyFailure {
    pub name: String,
    pub id: u32,
    #[source]
    pub reason: FailureReason,
}

impl PropertyFailure {
    pub fn new(property: &Property, reason: impl Into<FailureReason>) -> Self {
        Self {
            name: property.name.clone(),
            id: property.id,
            reason: reason.into(),
        }
    }
}

/// Records of every property that evaluated, plus the failures of those that did not.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub records: Vec<RobustnessRecord>,
    pub failures: Vec<PropertyFailure>,
    pub evaluated: Vec<u32>,
}

impl BatchReport {
    fn absorb(mut self, outcome: Result<(u32, Vec<RobustnessRecord>), PropertyFailure>) -> Self {
        match outcome {
            Ok((id, records)) => {
                self.evaluated.push(id);
                self.records.extend(records);
            }
            Err(failure) => self.record_failure(failure),
        }

        self
    }

    pub fn record_failure(&mut self, failure: PropertyFailure) {
        error!(property = %failure.name, property_id = failure.id, reason = %failure.reason, "property failed");
        self.failures.push(failure);
    }
}

fn evaluate_property(
    monitor: &mut dyn Monitor,
    property: &Property,
    data: &SignalData,
    ctx: &RunContext,
) -> Result<(u32, Vec<RobustnessRecord>), PropertyFailure> {
    let _span = info_span!("property", name = %property.name, id = property.id).entered();
    info!(formula = %property.formula, "evaluating property");

    monitor
        .load_formula(&property.formula)
        .map_err(|err| PropertyFailure::new(property, err))?;

    let robustness = monitor.robustness_or_empty(data, ctx);

    if robustness.is_empty() {
        return Err(PropertyFailure::new(property, FailureReason::NoResult));
    }

    Ok((property.id, classify(&robustness, property.id, ctx.vehicle_id())))
}

/// Evaluate each property in turn with the same monitor. A failing property never stops the
/// remaining ones.
pub fn evaluate_catalogue(
    monitor: &mut dyn Monitor,
    properties: &[Property],
    data: &SignalData,
    ctx: &RunContext,
) -> BatchReport {
    properties
        .iter()
        .map(|property| evaluate_property(monitor, property, data, ctx))
        .fold(BatchReport::default(), BatchReport::absorb)
}

#[cfg(test)]
mod tests {
    use super::{evaluate_catalogue, FailureReason};
    use crate::catalogue::Property;
    use crate::context::RunContext;
    use crate::loader::SignalData;
    use crate::monitor::{MonitorError, TimeSemantics};
    use crate::schema::SignalSchema;

    #[test]
    fn failures_do_not_stop_the_batch() {
        let mut monitor = TimeSemantics::Dense.monitor();
        monitor.declare(&SignalSchema::vehicle());

        let data = SignalData::from([("speed".to_string(), vec![(0.0, 50.0), (1.0, 120.0)])]);
        let properties = [
            Property::new("broken", 1, "out = always(speed >"),
            Property::new("absent", 2, "out = always(x >= 0)"),
            Property::new("speed", 3, "out = speed <= 100"),
        ];
        let report = evaluate_catalogue(monitor.as_mut(), &properties, &data, &RunContext::new(9));

        assert_eq!(report.evaluated, vec![3]);
        assert_eq!(report.records.len(), 2);
        assert!(report.records.iter().all(|r| r.stl_spec_id == 3 && r.vehicle_id == 9));

        assert_eq!(report.failures.len(), 2);
        assert!(matches!(report.failures[0].reason, FailureReason::Load(MonitorError::Parse(_))));
        assert!(matches!(report.failures[1].reason, FailureReason::NoResult));
    }
}
