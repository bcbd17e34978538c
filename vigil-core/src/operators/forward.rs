use std::fmt::{Display, Formatter};
use std::ops::{Bound, RangeBounds};

use thiserror::Error;

use super::BinaryOperatorError;
use crate::metrics::{Bottom, Join, Meet, Top};
use crate::trace::{Range, Trace};
use crate::Formula;

/// Folds a window of metrics from its latest sample back to its earliest, yielding the running
/// value at every sample time (latest first).
struct ForwardIter<'a, T, F> {
    rest: Range<'a, T>,
    state: Option<(f64, T)>,
    combine: F,
}

impl<'a, T, F> ForwardIter<'a, T, F>
where
    F: Fn(&T, &T) -> T,
{
    fn new(mut range: Range<'a, T>, init: T, combine: F) -> Self {
        // An empty window evaluates to the identity of the fold.
        let state = match range.next_back() {
            Some((time, value)) => Some((time, combine(&init, value))),
            None => Some((0.0, init)),
        };

        Self {
            rest: range,
            state,
            combine,
        }
    }
}

impl<'a, T, F> Iterator for ForwardIter<'a, T, F>
where
    F: Fn(&T, &T) -> T,
{
    type Item = (f64, T);

    fn next(&mut self) -> Option<Self::Item> {
        let state = self.state.take()?;
        self.state = self
            .rest
            .next_back()
            .map(|(time, value)| (time, (self.combine)(&state.1, value)));

        Some(state)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
enum Endpoint {
    Open(f64),
    Closed(f64),
}

impl Endpoint {
    fn value(&self) -> f64 {
        match self {
            Self::Open(value) | Self::Closed(value) => *value,
        }
    }

    fn shift(self, amount: f64) -> Endpoint {
        match self {
            Self::Open(value) => Self::Open(value + amount),
            Self::Closed(value) => Self::Closed(value + amount),
        }
    }
}

/// Relative time window of a bounded temporal operator.
///
/// `0.0..=5.0` is the closed window `[0, 5]`, `0.0..5.0` excludes its end.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub struct Interval {
    start: Endpoint,
    end: Endpoint,
}

impl Interval {
    pub fn start(&self) -> f64 {
        self.start.value()
    }

    pub fn end(&self) -> f64 {
        self.end.value()
    }

    fn shift(&self, amount: f64) -> Interval {
        Self {
            start: self.start.shift(amount),
            end: self.end.shift(amount),
        }
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let opening = match &self.start {
            Endpoint::Open(_) => '(',
            Endpoint::Closed(_) => '[',
        };

        let closing = match &self.end {
            Endpoint::Open(_) => ')',
            Endpoint::Closed(_) => ']',
        };

        write!(f, "{}{},{}{}", opening, self.start.value(), self.end.value(), closing)
    }
}

impl<T> From<std::ops::Range<T>> for Interval
where
    T: Into<f64>,
{
    fn from(std::ops::Range { start, end }: std::ops::Range<T>) -> Self {
        Self {
            start: Endpoint::Closed(start.into()),
            end: Endpoint::Open(end.into()),
        }
    }
}

impl<T> From<std::ops::RangeInclusive<T>> for Interval
where
    T: Into<f64>,
{
    fn from(range: std::ops::RangeInclusive<T>) -> Self {
        let (start, end) = range.into_inner();

        Self {
            start: Endpoint::Closed(start.into()),
            end: Endpoint::Closed(end.into()),
        }
    }
}

impl RangeBounds<f64> for Interval {
    fn start_bound(&self) -> Bound<&f64> {
        match &self.start {
            Endpoint::Open(start) => Bound::Excluded(start),
            Endpoint::Closed(start) => Bound::Included(start),
        }
    }

    fn end_bound(&self) -> Bound<&f64> {
        match &self.end {
            Endpoint::Open(end) => Bound::Excluded(end),
            Endpoint::Closed(end) => Bound::Included(end),
        }
    }
}

#[derive(Debug, Clone)]
struct UnaryOperator<F> {
    subformula: F,
    bounds: Option<Interval>,
}

#[derive(Debug, Error)]
pub enum ForwardOperatorError<F> {
    #[error("bounded formula error: {0}")]
    FormulaError(F),

    #[error("subtrace evaluation for interval {0} is empty")]
    EmptySubtraceEvaluation(Interval),
}

impl<F> UnaryOperator<F> {
    fn new(bounds: Option<Interval>, subformula: F) -> Self {
        Self { bounds, subformula }
    }

    fn evaluate<State, I, C, Metric>(
        &self,
        trace: &Trace<State>,
        init: I,
        combine: C,
    ) -> Result<Trace<Metric>, ForwardOperatorError<F::Error>>
    where
        F: Formula<State, Metric = Metric>,
        I: Fn() -> Metric,
        C: Fn(&Metric, &Metric) -> Metric,
    {
        if trace.is_empty() {
            return Ok(Trace::from_iter([(0.0, init())]));
        }

        let inner = self
            .subformula
            .evaluate(trace)
            .map_err(ForwardOperatorError::FormulaError)?;

        match &self.bounds {
            None => Ok(ForwardIter::new(inner.range(..), init(), combine).collect()),
            Some(interval) => {
                let evaluate_time = |time: f64| {
                    let shifted = interval.shift(time);
                    let range = inner.range(shifted.clone());

                    ForwardIter::new(range, init(), &combine)
                        .last()
                        .map(|(_, value)| (time, value))
                        .ok_or(ForwardOperatorError::EmptySubtraceEvaluation(shifted))
                };

                inner.times().map(evaluate_time).collect()
            }
        }
    }
}

/// Requires the subformula to hold at every sample inside the window. Robustness is the minimum.
#[derive(Debug, Clone)]
pub struct Always<F>(UnaryOperator<F>);

impl<F> Always<F> {
    pub fn unbounded(formula: F) -> Self {
        Self(UnaryOperator::new(None, formula))
    }

    pub fn bounded<I>(interval: I, formula: F) -> Self
    where
        I: Into<Interval>,
    {
        Self(UnaryOperator::new(Some(interval.into()), formula))
    }
}

impl<State, F, M> Formula<State> for Always<F>
where
    F: Formula<State, Metric = M>,
    M: Top + Meet,
{
    type Metric = M;
    type Error = ForwardOperatorError<F::Error>;

    fn evaluate(&self, trace: &Trace<State>) -> Result<Trace<Self::Metric>, Self::Error> {
        self.0.evaluate(trace, M::top, M::min)
    }
}

/// Requires the subformula to hold at some sample inside the window. Robustness is the maximum.
#[derive(Debug, Clone)]
pub struct Eventually<F>(UnaryOperator<F>);

impl<F> Eventually<F> {
    pub fn unbounded(formula: F) -> Self {
        Self(UnaryOperator::new(None, formula))
    }

    pub fn bounded<I>(interval: I, formula: F) -> Self
    where
        I: Into<Interval>,
    {
        Self(UnaryOperator::new(Some(interval.into()), formula))
    }
}

impl<State, F, M> Formula<State> for Eventually<F>
where
    F: Formula<State, Metric = M>,
    M: Bottom + Join,
{
    type Metric = M;
    type Error = ForwardOperatorError<F::Error>;

    fn evaluate(&self, trace: &Trace<State>) -> Result<Trace<Self::Metric>, Self::Error> {
        self.0.evaluate(trace, M::bottom, M::max)
    }
}

/// Robustness of the subformula at the following sample. The last sample has no successor and
/// evaluates to bottom.
#[derive(Clone, Debug)]
pub struct Next<F> {
    subformula: F,
}

impl<F> Next<F> {
    pub fn new(subformula: F) -> Self {
        Self { subformula }
    }
}

impl<State, F, Metric> Formula<State> for Next<F>
where
    F: Formula<State, Metric = Metric>,
    Metric: Bottom,
{
    type Metric = Metric;
    type Error = F::Error;

    fn evaluate(&self, trace: &Trace<State>) -> Result<Trace<Self::Metric>, Self::Error> {
        let inner = self.subformula.evaluate(trace)?;
        let mut shifted = Trace::new();
        let mut following = Metric::bottom();

        for (time, metric) in inner.into_iter().rev() {
            shifted.insert(time, std::mem::replace(&mut following, metric));
        }

        Ok(shifted)
    }
}

/// `left until right`: `right` holds now, or at some later sample with `left` holding at every
/// sample before it.
#[derive(Clone, Debug)]
pub struct Until<Left, Right> {
    left: Left,
    right: Right,
}

impl<Left, Right> Until<Left, Right> {
    pub fn new(left: Left, right: Right) -> Self {
        Self { left, right }
    }
}

impl<Left, Right, State, Metric> Formula<State> for Until<Left, Right>
where
    Left: Formula<State, Metric = Metric>,
    Right: Formula<State, Metric = Metric>,
    Metric: Clone + Bottom + Meet + Join,
{
    type Metric = Metric;
    type Error = BinaryOperatorError<Left::Error, Right::Error>;

    fn evaluate(&self, trace: &Trace<State>) -> Result<Trace<Self::Metric>, Self::Error> {
        let left = self.left.evaluate(trace).map_err(BinaryOperatorError::LeftError)?;
        let right = self.right.evaluate(trace).map_err(BinaryOperatorError::RightError)?;
        super::aligned(&left, &right)?;

        let mut result = Trace::new();
        let mut later = Metric::bottom();

        for ((time, l), (_, r)) in left.into_iter().zip(right).rev() {
            later = r.max(&l.min(&later));
            result.insert(time, later.clone());
        }

        Ok(result)
    }
}
