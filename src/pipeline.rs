//! One monitoring run: load, synthesize, evaluate, persist.

use tracing::{error, info, warn};

use crate::catalogue::{Property, ENVELOPE_PROPERTY_NAME};
use crate::config::RunConfig;
use crate::context::RunContext;
use crate::loader;
use crate::orchestrator::{evaluate_catalogue, PropertyFailure};
use crate::results::RobustnessRecord;
use crate::store::{PersistError, ResultStore};
use crate::synthesis;

/// Outcome of [`run`].
#[derive(Debug, Default)]
pub struct RunReport {
    /// Number of signal columns loaded.
    pub signals: usize,
    /// Synthesized envelope formula, when synthesis succeeded.
    pub envelope: Option<String>,
    pub records: Vec<RobustnessRecord>,
    pub failures: Vec<PropertyFailure>,
    /// Records held by the store after the run.
    pub stored: Option<usize>,
    pub persist_error: Option<PersistError>,
}

impl RunReport {
    pub fn has_data(&self) -> bool {
        self.signals > 0
    }
}

/// Run the whole pipeline for one log.
///
/// A log without usable data skips evaluation and leaves the store untouched. Failures of
/// individual properties are reported, never propagated.
pub fn run(config: &RunConfig) -> RunReport {
    let ctx = RunContext::new(config.vehicle_id);
    let _span = ctx.span().enter();
    let store = ResultStore::new(&config.output);
    let mut report = RunReport::default();

    info!(input = %config.input.display(), "starting run");

    let data = loader::load(&config.input);
    report.signals = data.len();

    if data.is_empty() {
        warn!(path = %config.input.display(), "no telemetry to monitor, skipping evaluation");
        return report;
    }

    let mut properties = config.properties.clone();
    let envelope = Property::new(ENVELOPE_PROPERTY_NAME, config.envelope_property_id, String::new());
    let synthesized = synthesis::build(&config.registry, data.keys().map(String::as_str));

    let synthesis_failure = match synthesized {
        Ok(formula) => {
            report.envelope = Some(formula.clone());
            properties.push(Property { formula, ..envelope });
            None
        }
        Err(err) => Some(PropertyFailure::new(&envelope, err)),
    };

    let mut monitor = config.mode.monitor();
    monitor.declare(&config.schema);
    info!(semantics = ?monitor.semantics(), properties = properties.len(), "monitor declared");

    let mut batch = evaluate_catalogue(monitor.as_mut(), &properties, &data, &ctx);

    if let Some(failure) = synthesis_failure {
        batch.record_failure(failure);
    }

    info!(
        evaluated = batch.evaluated.len(),
        failed = batch.failures.len(),
        records = batch.records.len(),
        "catalogue evaluated"
    );

    let persisted = if config.fresh {
        store.replace(&batch.records)
    } else {
        store.append(&batch.records)
    };

    match persisted {
        Ok(total) => report.stored = Some(total),
        Err(err) => {
            error!(path = %store.path().display(), %err, "could not persist results");
            report.persist_error = Some(err);
        }
    }

    report.records = batch.records;
    report.failures = batch.failures;
    report
}
