//! Quantitative evaluation of Signal Temporal Logic formulas over recorded telemetry.
//!
//! A [`Formula`] turns a [`Trace`] of system states (for instance the speed and acceleration of
//! a vehicle sampled over time) into a trace of [robustness] values. A positive value means the
//! requirement holds at that time with the given margin, a negative value means it is violated
//! by that amount.
//!
//! Formulas are built from [`Predicate`](crate::predicate::Predicate) expressions combined with
//! the [`operators`]:
//!
//! ```rust
//! use std::collections::HashMap;
//!
//! use vigil_core::operators::{Always, Eventually, Implies};
//! use vigil_core::predicate::{Predicate, Relation};
//! use vigil_core::{evaluate, Trace};
//!
//! fn state(speed: f64) -> HashMap<&'static str, f64> {
//!     HashMap::from([("speed", speed)])
//! }
//!
//! let overspeed = Predicate::compare(["speed"], Relation::Greater, [100.0]);
//! let recovered = Predicate::compare(["speed"], Relation::LessEqual, [100.0]);
//! let phi = Always::unbounded(Implies::new(overspeed, Eventually::bounded(0.0..=5.0, recovered)));
//!
//! let trace = Trace::from([(0.0, state(50.0)), (1.0, state(110.0)), (2.0, state(90.0))]);
//! let rho = evaluate(&trace, &phi).unwrap();
//!
//! assert!(rho >= 0.0);
//! ```
//!
//! [robustness]: https://link.springer.com/chapter/10.1007/11940197_12

use std::borrow::Borrow;

use thiserror::Error;

pub mod metrics;
pub mod operators;
pub mod predicate;
pub mod trace;

pub use crate::metrics::{Bottom, Join, Meet, Top};
pub use crate::trace::Trace;

/// Evaluate a trace of states into a trace of metric values.
pub trait Formula<State> {
    type Metric;
    type Error;

    fn evaluate(&self, trace: &Trace<State>) -> Result<Trace<Self::Metric>, Self::Error>;
}

impl<State, T> Formula<State> for &T
where
    T: Formula<State> + ?Sized,
{
    type Metric = T::Metric;
    type Error = T::Error;

    fn evaluate(&self, trace: &Trace<State>) -> Result<Trace<Self::Metric>, Self::Error> {
        (**self).evaluate(trace)
    }
}

impl<State, T> Formula<State> for Box<T>
where
    T: Formula<State> + ?Sized,
{
    type Metric = T::Metric;
    type Error = T::Error;

    fn evaluate(&self, trace: &Trace<State>) -> Result<Trace<Self::Metric>, Self::Error> {
        (**self).evaluate(trace)
    }
}

#[derive(Debug, Error)]
enum ErrorKind<Err> {
    #[error("Error evaluating formula: {0}")]
    FormulaError(Err),

    #[error("Empty trace")]
    EmptyTraceError,
}

/// Error returned by [`evaluate`] when either the formula fails or produces no metric.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct EvaluationError<Err>(ErrorKind<Err>);

impl<Err> EvaluationError<Err> {
    fn wrap(err: Err) -> Self {
        Self(ErrorKind::FormulaError(err))
    }

    fn empty() -> Self {
        Self(ErrorKind::EmptyTraceError)
    }
}

/// Evaluate a trace and return the metric for its earliest time.
///
/// For monitoring, the earliest metric is the verdict of the whole recording: an `always`
/// formula evaluated at the first sample covers every later sample.
pub fn evaluate<T, F, State>(trace: T, formula: F) -> Result<F::Metric, EvaluationError<F::Error>>
where
    T: Borrow<Trace<State>>,
    F: Formula<State>,
{
    formula
        .evaluate(trace.borrow())
        .map_err(EvaluationError::wrap)
        .and_then(|trace| {
            trace
                .into_iter()
                .next()
                .map(|(_, metric)| metric)
                .ok_or_else(EvaluationError::empty)
        })
}
