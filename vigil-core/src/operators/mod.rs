//! Operators that combine formulas.
//!
//! Operators never read system states directly. They evaluate their operands and transform the
//! resulting robustness traces, so every formula bottoms out in a
//! [`Predicate`](crate::predicate::Predicate).
//!
//! # First order operators
//!
//! [`Not`], [`And`], [`Or`] and [`Implies`] only look at the current sample. Binary operators
//! require both operands to produce metrics at identical times.
//!
//! # Forward temporal operators
//!
//! [`Always`], [`Eventually`], [`Next`] and [`Until`] look at the current sample and the samples
//! after it. `Always` and `Eventually` accept an optional window relative to the current time:
//!
//! ```text
//! T1 T2 T3 T4 T5 T6
//! M1 M2 M3 M4 M5 M6
//!     |--------|       eventually[0,3] at T2
//!     |-----------|    eventually at T2
//! ```
//!
//! A window that runs past the end of the recording is truncated to the samples that exist.
//!
//! ```rust
//! use std::collections::HashMap;
//!
//! use vigil_core::operators::{Always, And};
//! use vigil_core::predicate::{Predicate, Relation};
//! use vigil_core::{evaluate, Formula, Trace};
//!
//! let lower = Predicate::compare(["acceleration"], Relation::GreaterEqual, [-20.0]);
//! let upper = Predicate::compare(["acceleration"], Relation::LessEqual, [20.0]);
//! let phi = Always::bounded(0.0..=5.0, And::new(lower, upper));
//!
//! let states = Trace::from([
//!     (0.0, HashMap::from([("acceleration", 5.0)])),
//!     (1.0, HashMap::from([("acceleration", -18.0)])),
//! ]);
//!
//! let metrics: Trace<f64> = phi.evaluate(&states).unwrap();
//! assert_eq!(metrics.at_time(1.0), Some(&2.0));
//! assert_eq!(evaluate(&states, &phi).unwrap(), 2.0);
//! ```

mod first_order;
mod forward;

pub use first_order::{And, BinaryEvaluationError, BinaryOperatorError, Implies, Not, Or};
pub use forward::{Always, Eventually, ForwardOperatorError, Interval, Next, Until};

use first_order::aligned;

#[cfg(test)]
mod test {
    use thiserror::Error;

    use crate::trace::Trace;
    use crate::Formula;

    /// Returns its input trace as the metric trace.
    pub struct Const;

    #[derive(Debug, Error)]
    pub enum ConstError {}

    impl<S> Formula<S> for Const
    where
        S: Clone,
    {
        type Metric = S;
        type Error = ConstError;

        fn evaluate(&self, trace: &Trace<S>) -> Result<Trace<Self::Metric>, Self::Error> {
            Ok(trace.clone())
        }
    }

    /// Like [`Const`] but drops the last sample.
    pub struct Truncated;

    impl<S> Formula<S> for Truncated
    where
        S: Clone,
    {
        type Metric = S;
        type Error = ConstError;

        fn evaluate(&self, trace: &Trace<S>) -> Result<Trace<Self::Metric>, Self::Error> {
            let keep = trace.len().saturating_sub(1);
            Ok(trace.iter().take(keep).map(|(t, s)| (t, s.clone())).collect())
        }
    }

    pub struct ConstLeft;

    impl<L, R> Formula<(L, R)> for ConstLeft
    where
        L: Clone,
    {
        type Metric = L;
        type Error = ConstError;

        fn evaluate(&self, trace: &Trace<(L, R)>) -> Result<Trace<Self::Metric>, Self::Error> {
            Ok(trace.iter().map(|(time, (left, _))| (time, left.clone())).collect())
        }
    }

    pub struct ConstRight;

    impl<L, R> Formula<(L, R)> for ConstRight
    where
        R: Clone,
    {
        type Metric = R;
        type Error = ConstError;

        fn evaluate(&self, trace: &Trace<(L, R)>) -> Result<Trace<Self::Metric>, Self::Error> {
            Ok(trace.iter().map(|(time, (_, right))| (time, right.clone())).collect())
        }
    }
}
