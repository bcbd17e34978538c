use std::ops::Neg;

use thiserror::Error;

use crate::metrics::{Join, Meet};
use crate::trace::Trace;
use crate::Formula;

/// Negation. Flips the sign of the robustness.
#[derive(Debug, Clone, PartialEq)]
pub struct Not<F> {
    subformula: F,
}

impl<F> Not<F> {
    pub fn new(subformula: F) -> Self {
        Self { subformula }
    }
}

impl<T, F, M> Formula<T> for Not<F>
where
    F: Formula<T, Metric = M>,
    M: Neg<Output = M>,
{
    type Metric = M;
    type Error = F::Error;

    fn evaluate(&self, trace: &Trace<T>) -> Result<Trace<Self::Metric>, Self::Error> {
        self.subformula
            .evaluate(trace)
            .map(|result| result.into_iter().map_states(Neg::neg).collect())
    }
}

#[derive(Debug, Clone, Error)]
pub enum BinaryEvaluationError {
    #[error("metric traces have mismatched lengths: [{0}] [{1}]")]
    MismatchedLengths(usize, usize),

    #[error("mismatched times between traces: [{0}] [{1}]")]
    MismatchedTimes(f64, f64),
}

#[derive(Debug, Clone, Error)]
pub enum BinaryOperatorError<L, R> {
    #[error("left subformula error: {0}")]
    LeftError(L),

    #[error("right subformula error: {0}")]
    RightError(R),

    #[error("error evaluating binary operator: {0}")]
    EvaluationError(#[from] BinaryEvaluationError),
}

/// Both operands of a binary operator must be sampled at the same times.
pub(super) fn aligned<L, R>(left: &Trace<L>, right: &Trace<R>) -> Result<(), BinaryEvaluationError> {
    if left.len() != right.len() {
        return Err(BinaryEvaluationError::MismatchedLengths(left.len(), right.len()));
    }

    match left.times().zip(right.times()).find(|(lt, rt)| lt != rt) {
        Some((lt, rt)) => Err(BinaryEvaluationError::MismatchedTimes(lt, rt)),
        None => Ok(()),
    }
}

#[derive(Debug, Clone)]
struct Binop<Left, Right> {
    left: Left,
    right: Right,
}

impl<Left, Right> Binop<Left, Right> {
    /// Evaluate both operands and combine their metrics pointwise.
    fn evaluate<State, Metric, C>(
        &self,
        trace: &Trace<State>,
        combine: C,
    ) -> Result<Trace<Metric>, BinaryOperatorError<Left::Error, Right::Error>>
    where
        Left: Formula<State, Metric = Metric>,
        Right: Formula<State, Metric = Metric>,
        C: Fn(Metric, Metric) -> Metric,
    {
        let left = self.left.evaluate(trace).map_err(BinaryOperatorError::LeftError)?;
        let right = self.right.evaluate(trace).map_err(BinaryOperatorError::RightError)?;

        aligned(&left, &right)?;

        let result = left
            .into_iter()
            .zip(right)
            .map(|((time, l), (_, r))| (time, combine(l, r)))
            .collect();

        Ok(result)
    }
}

/// Disjunction. Robustness is the maximum of both operands.
#[derive(Debug, Clone)]
pub struct Or<Left, Right>(Binop<Left, Right>);

impl<Left, Right> Or<Left, Right> {
    pub fn new(left: Left, right: Right) -> Self {
        Self(Binop { left, right })
    }
}

impl<Left, Right, State, Metric> Formula<State> for Or<Left, Right>
where
    Left: Formula<State, Metric = Metric>,
    Right: Formula<State, Metric = Metric>,
    Metric: Join,
{
    type Metric = Metric;
    type Error = BinaryOperatorError<Left::Error, Right::Error>;

    fn evaluate(&self, trace: &Trace<State>) -> Result<Trace<Self::Metric>, Self::Error> {
        self.0.evaluate(trace, |l, r| l.max(&r))
    }
}

/// Conjunction. Robustness is the minimum of both operands.
#[derive(Debug, Clone)]
pub struct And<Left, Right>(Binop<Left, Right>);

impl<Left, Right> And<Left, Right> {
    pub fn new(left: Left, right: Right) -> Self {
        Self(Binop { left, right })
    }
}

impl<Left, Right, State, Metric> Formula<State> for And<Left, Right>
where
    Left: Formula<State, Metric = Metric>,
    Right: Formula<State, Metric = Metric>,
    Metric: Meet,
{
    type Metric = Metric;
    type Error = BinaryOperatorError<Left::Error, Right::Error>;

    fn evaluate(&self, trace: &Trace<State>) -> Result<Trace<Self::Metric>, Self::Error> {
        self.0.evaluate(trace, |l, r| l.min(&r))
    }
}

/// Material implication, `max(-antecedent, consequent)`.
#[derive(Debug, Clone)]
pub struct Implies<Ante, Cons>(Binop<Ante, Cons>);

impl<Ante, Cons> Implies<Ante, Cons> {
    pub fn new(ante: Ante, cons: Cons) -> Self {
        Self(Binop { left: ante, right: cons })
    }
}

impl<Ante, Cons, State, Metric> Formula<State> for Implies<Ante, Cons>
where
    Ante: Formula<State, Metric = Metric>,
    Cons: Formula<State, Metric = Metric>,
    Metric: Neg<Output = Metric> + Join,
{
    type Metric = Metric;
    type Error = BinaryOperatorError<Ante::Error, Cons::Error>;

    fn evaluate(&self, trace: &Trace<State>) -> Result<Trace<Self::Metric>, Self::Error> {
        self.0.evaluate(trace, |a, c| a.neg().max(&c))
    }
}
