//! Evaluates specification text over loaded telemetry.
//!
//! A [`Monitor`] is declared once from a [`SignalSchema`], then any number of formulas can be
//! loaded into it in turn and evaluated against the same data. The two implementations differ
//! only in how they align the signals into one trace of states:
//!
//! - [`DiscreteMonitor`] treats the samples as one table. All signals must share the time
//!   column.
//! - [`DenseMonitor`] gives each signal its own time base and reconstructs the missing values
//!   by interpolation.

mod dense;
mod discrete;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};
use vigil_core::trace::NanTimeError;
use vigil_parser::expressions::Expr;
use vigil_parser::{parse_specification, Formula, ParseError, ParsedFormula, ParsedFormulaError, Trace, Variables};

use crate::context::RunContext;
use crate::loader::{SignalData, Samples};
use crate::schema::{SchemaEntry, SignalSchema, SignalType};

pub use dense::DenseMonitor;
pub use discrete::DiscreteMonitor;

/// Name of the variable every formula assigns its robustness to.
pub const OUTPUT_VARIABLE: &str = "out";

/// Robustness of the formula at each evaluated time.
pub type Robustness = Vec<(f64, f64)>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TimeSemantics {
    /// Samples share one time column and are aligned by index.
    Discrete,
    /// Every signal keeps its own sample times.
    #[default]
    Dense,
}

impl TimeSemantics {
    /// Schema of the logs usually recorded for this mode.
    pub fn default_schema(self) -> SignalSchema {
        match self {
            Self::Discrete => SignalSchema::discrete(),
            Self::Dense => SignalSchema::vehicle(),
        }
    }

    pub fn monitor(self) -> Box<dyn Monitor> {
        match self {
            Self::Discrete => Box::new(DiscreteMonitor::new()),
            Self::Dense => Box::new(DenseMonitor::new()),
        }
    }
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("formula assigns `{found}` but the declared output is `{expected}`")]
    WrongOutput { expected: String, found: String },

    #[error("formula references undeclared variable `{0}`")]
    Undeclared(String),

    #[error("no formula has been loaded")]
    NoFormula,

    #[error("no samples for signal `{0}`")]
    MissingSignal(String),

    #[error("no declared signal has samples")]
    NoSignals,

    #[error("signal `{signal}` is not sampled at the same times as `{reference}`")]
    Misaligned { signal: String, reference: String },

    #[error("sample times of `{signal}` do not increase at t={time}")]
    NonMonotonic { signal: String, time: f64 },

    #[error("signal `{0}` has a NaN sample time")]
    InvalidTime(String),

    #[error("signals are never defined at the same time")]
    DisjointSignals,

    #[error("evaluation failed: {0}")]
    Evaluation(#[from] ParsedFormulaError),
}

impl MonitorError {
    fn invalid_time(signal: &str) -> impl FnOnce(NanTimeError) -> Self + '_ {
        move |_| Self::InvalidTime(signal.to_string())
    }
}

/// Robustness evaluation over a fixed signal interface.
pub trait Monitor {
    fn semantics(&self) -> TimeSemantics;

    /// Declare every monitored schema entry as an input and `out` as the output.
    fn declare(&mut self, schema: &SignalSchema);

    /// Parse a formula, replacing the previously loaded one.
    fn load_formula(&mut self, text: &str) -> Result<(), MonitorError>;

    fn evaluate(&self, data: &SignalData) -> Result<Robustness, MonitorError>;

    /// Evaluate, logging any failure and yielding no values instead.
    ///
    /// An empty result means the formula could not be evaluated. It never means the data
    /// satisfied the formula.
    fn robustness_or_empty(&self, data: &SignalData, ctx: &RunContext) -> Robustness {
        match self.evaluate(data) {
            Ok(robustness) => robustness,
            Err(err) => {
                error!(vehicle_id = ctx.vehicle_id(), %err, "failed to evaluate formula");
                Robustness::new()
            }
        }
    }
}

struct Compiled {
    variables: BTreeSet<String>,
    expr: Expr,
    formula: ParsedFormula,
}

/// Declarations and loaded formula shared by both monitors.
#[derive(Default)]
struct Interface {
    inputs: Vec<SchemaEntry>,
    output: String,
    compiled: Option<Compiled>,
}

/// One signal selected to be fed to the formula.
struct Input<'a> {
    name: &'a str,
    kind: SignalType,
    samples: &'a Samples,
}

impl Interface {
    fn declare(&mut self, schema: &SignalSchema) {
        self.inputs = schema.monitored().cloned().collect();
        self.output = OUTPUT_VARIABLE.to_string();
        self.compiled = None;

        for entry in &self.inputs {
            info!(variable = %entry.name, kind = %entry.kind, "declared input");
        }
        debug!(variable = %self.output, "declared output");
    }

    fn kind(&self, name: &str) -> Option<SignalType> {
        self.inputs.iter().find(|entry| entry.name == name).map(|entry| entry.kind)
    }

    fn load(&mut self, text: &str) -> Result<(), MonitorError> {
        self.compiled = None;
        let spec = parse_specification(text)?;

        if let Some(name) = spec.output() {
            if name != self.output {
                return Err(MonitorError::WrongOutput {
                    expected: self.output.clone(),
                    found: name.to_string(),
                });
            }
        }

        let variables: BTreeSet<String> = spec.expr().variables().into_iter().map(str::to_string).collect();

        if let Some(name) = variables.iter().find(|name| self.kind(name).is_none()) {
            return Err(MonitorError::Undeclared(name.clone()));
        }

        debug!(formula = %spec.expr(), "loaded formula");
        self.compiled = Some(Compiled {
            variables,
            expr: spec.expr().clone(),
            formula: spec.formula(),
        });

        Ok(())
    }

    fn compiled(&self) -> Result<&Compiled, MonitorError> {
        self.compiled.as_ref().ok_or(MonitorError::NoFormula)
    }

    /// Signals the formula reads. A formula that reads none is evaluated over the first
    /// declared signal with samples so that it still has a time base.
    fn inputs<'a>(&'a self, data: &'a SignalData) -> Result<Vec<Input<'a>>, MonitorError> {
        let compiled = self.compiled()?;

        for name in data.keys().filter(|name| self.kind(name).is_none()) {
            debug!(signal = %name, "ignoring undeclared signal");
        }

        if compiled.variables.is_empty() {
            return self
                .inputs
                .iter()
                .find_map(|entry| {
                    let samples = data.get(&entry.name).filter(|samples| !samples.is_empty())?;
                    Some(vec![Input {
                        name: &entry.name,
                        kind: entry.kind,
                        samples,
                    }])
                })
                .ok_or(MonitorError::NoSignals);
        }

        compiled
            .variables
            .iter()
            .map(|name| {
                let samples = data
                    .get(name)
                    .filter(|samples| !samples.is_empty())
                    .ok_or_else(|| MonitorError::MissingSignal(name.clone()))?;
                let kind = self.kind(name).unwrap_or(SignalType::Float);

                Ok(Input { name, kind, samples })
            })
            .collect()
    }

    fn evaluate(&self, trace: Trace<Variables>) -> Result<Robustness, MonitorError> {
        let robustness = self.compiled()?.formula.evaluate(&trace)?;

        Ok(robustness.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{Monitor, MonitorError, TimeSemantics};
    use crate::context::RunContext;
    use crate::loader::SignalData;
    use crate::schema::SignalSchema;

    fn declared(semantics: TimeSemantics) -> Box<dyn Monitor> {
        let mut monitor = semantics.monitor();
        monitor.declare(&SignalSchema::vehicle());
        monitor
    }

    #[test]
    fn rejects_undeclared_variables() {
        for semantics in [TimeSemantics::Discrete, TimeSemantics::Dense] {
            let mut monitor = declared(semantics);
            let result = monitor.load_formula("out = always(rpm < 5000)");

            assert!(matches!(result, Err(MonitorError::Undeclared(name)) if name == "rpm"));
        }
    }

    #[test]
    fn rejects_wrong_output() {
        let mut monitor = declared(TimeSemantics::Dense);
        let result = monitor.load_formula("speed = always(speed < 100)");

        assert!(matches!(result, Err(MonitorError::WrongOutput { .. })));
    }

    #[test]
    fn accepts_bare_expression() {
        let mut monitor = declared(TimeSemantics::Dense);

        assert!(monitor.load_formula("always(speed < 100)").is_ok());
    }

    #[test]
    fn failed_load_clears_previous_formula() {
        let mut monitor = declared(TimeSemantics::Discrete);
        let data = SignalData::from([("speed".to_string(), vec![(0.0, 1.0)])]);

        assert!(monitor.load_formula("out = speed < 100").is_ok());
        assert!(monitor.load_formula("out = speed <").is_err());
        assert!(matches!(monitor.evaluate(&data), Err(MonitorError::NoFormula)));
    }

    #[test]
    fn missing_signal_yields_empty_robustness() {
        let mut monitor = declared(TimeSemantics::Dense);
        let data = SignalData::from([("speed".to_string(), vec![(0.0, 1.0)])]);

        monitor.load_formula("out = always(x >= 0)").unwrap();

        assert!(matches!(monitor.evaluate(&data), Err(MonitorError::MissingSignal(name)) if name == "x"));
        assert!(monitor.robustness_or_empty(&data, &RunContext::new(3)).is_empty());
    }

    #[test]
    fn constant_formula_uses_first_declared_signal() {
        let mut monitor = declared(TimeSemantics::Discrete);
        let data = SignalData::from([("x".to_string(), vec![(0.0, 1.0), (1.0, 2.0)])]);

        monitor.load_formula("out = 1 > 0").unwrap();

        assert_eq!(monitor.evaluate(&data).unwrap(), vec![(0.0, 1.0), (1.0, 1.0)]);
    }
}
