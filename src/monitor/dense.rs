use tracing::debug;
use vigil_core::predicate::Predicate;
use vigil_core::trace::Interpolation;
use vigil_parser::{Trace, Variables};

use super::{Input, Interface, Monitor, MonitorError, Robustness, TimeSemantics};
use crate::loader::SignalData;
use crate::schema::{SignalSchema, SignalType};

/// Evaluates signals with independent time bases.
///
/// Robustness is reported at every sample time of any input that falls inside the interval where
/// all inputs are defined. Float signals are interpolated linearly between samples, integer
/// signals hold their previous value. Evaluation also visits the instants where a bounded window
/// opens or closes and the instants where a predicate crosses zero, so a window sees the
/// interpolated signal rather than only the recorded samples.
#[derive(Default)]
pub struct DenseMonitor {
    interface: Interface,
}

impl DenseMonitor {
    pub fn new() -> Self {
        Self::default()
    }
}

fn interpolation(kind: SignalType) -> Interpolation {
    match kind {
        SignalType::Float => Interpolation::Linear,
        SignalType::Integer => Interpolation::Hold,
    }
}

struct Signal<'a> {
    name: &'a str,
    interpolation: Interpolation,
    trace: Trace<f64>,
}

impl<'a> Signal<'a> {
    fn build(input: &Input<'a>) -> Result<Self, MonitorError> {
        let mut trace = Trace::new();

        for &(time, value) in input.samples {
            trace.try_insert(time, value).map_err(MonitorError::invalid_time(input.name))?;
        }

        Ok(Self {
            name: input.name,
            interpolation: interpolation(input.kind),
            trace,
        })
    }
}

/// Common domain `[start, end]` of all signals.
fn domain(signals: &[Signal<'_>]) -> Option<(f64, f64)> {
    let mut start = f64::NEG_INFINITY;
    let mut end = f64::INFINITY;

    for signal in signals {
        let (first, _) = signal.trace.first()?;
        let (last, _) = signal.trace.last()?;

        start = start.max(first);
        end = end.min(last);
    }

    (start <= end).then_some((start, end))
}

fn sorted(mut times: Vec<f64>) -> Vec<f64> {
    times.sort_by(f64::total_cmp);
    times.dedup();
    times
}

/// Signal values at `time`, `None` outside the samples of any signal.
fn state_at(signals: &[Signal<'_>], time: f64) -> Option<Variables> {
    signals
        .iter()
        .map(|signal| Some((signal.name.to_string(), signal.trace.sample(time, signal.interpolation)?)))
        .collect()
}

/// Instants between neighbouring grid states where a predicate changes sign.
fn crossings(predicates: &[&Predicate], grid: &[(f64, Variables)]) -> Vec<f64> {
    let mut found = Vec::new();

    for pair in grid.windows(2) {
        let ((t0, s0), (t1, s1)) = (&pair[0], &pair[1]);

        for predicate in predicates {
            let (Ok(e0), Ok(e1)) = (predicate.difference(s0), predicate.difference(s1)) else {
                continue;
            };

            if e0 * e1 < 0.0 {
                found.push(t0 + (t1 - t0) * e0 / (e0 - e1));
            }
        }
    }

    found
}

impl Monitor for DenseMonitor {
    fn semantics(&self) -> TimeSemantics {
        TimeSemantics::Dense
    }

    fn declare(&mut self, schema: &SignalSchema) {
        self.interface.declare(schema);
    }

    fn load_formula(&mut self, text: &str) -> Result<(), MonitorError> {
        self.interface.load(text)
    }

    fn evaluate(&self, data: &SignalData) -> Result<Robustness, MonitorError> {
        let expr = &self.interface.compiled()?.expr;
        let signals = self
            .interface
            .inputs(data)?
            .iter()
            .map(Signal::build)
            .collect::<Result<Vec<_>, _>>()?;
        let (start, end) = domain(&signals).ok_or(MonitorError::DisjointSignals)?;

        let reported = sorted(
            signals
                .iter()
                .flat_map(|signal| signal.trace.range(start..=end).times())
                .collect(),
        );

        let offsets = expr.window_offsets();
        let grid: Vec<(f64, Variables)> = sorted(
            reported
                .iter()
                .flat_map(|time| offsets.iter().map(move |offset| time + offset))
                .filter(|time| (start..=end).contains(time))
                .collect(),
        )
        .into_iter()
        .filter_map(|time| Some((time, state_at(&signals, time)?)))
        .collect();

        let extra: Vec<(f64, Variables)> = crossings(&expr.predicates(), &grid)
            .into_iter()
            .filter_map(|time| Some((time, state_at(&signals, time)?)))
            .collect();

        debug!(samples = reported.len(), grid = grid.len(), crossings = extra.len(), "built dense grid");

        let trace: Trace<Variables> = grid.into_iter().chain(extra).collect();
        let robustness = self.interface.evaluate(trace)?;

        Ok(robustness
            .into_iter()
            .filter(|(time, _)| reported.binary_search_by(|t| t.total_cmp(time)).is_ok())
            .collect())
    }
}
