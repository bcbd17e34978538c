//! Atomic constraints on a system state, such as `speed <= 100` or `x >= 0`.
//!
//! A [`Predicate`] compares two linear expressions over named signals. Internally both sides are
//! folded into a single expression `e = lhs - rhs` made of coefficients **a** and a constant `c`,
//! so that `e = `**`a`**`·`**`x`**` + c`. The [robustness] of the comparison is then:
//!
//! | relation      | robustness |
//! |---------------|------------|
//! | `<`, `<=`     | `-e`       |
//! | `>`, `>=`     | `e`        |
//! | `==`          | `-|e|`     |
//! | `!=`          | `|e|`      |
//!
//! Strict and non-strict relations share the same value, the distinction only matters at the
//! boundary where the robustness is zero.
//!
//! ```rust
//! use std::collections::HashMap;
//!
//! use vigil_core::predicate::{Predicate, Relation};
//!
//! let mut p = Predicate::compare(["acceleration"], Relation::GreaterEqual, [-20.0]);
//! let state = HashMap::from([("acceleration", -5.0)]);
//!
//! assert_eq!(p.evaluate_state(&state), Ok(15.0));
//!
//! p -= ("acceleration", 2.0); // -acceleration >= -20
//! assert_eq!(p.evaluate_state(&state), Ok(25.0));
//! ```
//!
//! [robustness]: https://link.springer.com/chapter/10.1007/11940197_12

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;
use std::ops::{AddAssign, Neg, SubAssign};

use thiserror::Error;

use crate::trace::Trace;
use crate::Formula;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Relation {
    Less,
    #[default]
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
}

impl Relation {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
        }
    }

    fn robustness(&self, difference: f64) -> f64 {
        match self {
            Self::Less | Self::LessEqual => -difference,
            Self::Greater | Self::GreaterEqual => difference,
            Self::Equal => -difference.abs(),
            Self::NotEqual => difference.abs(),
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Comparison of a linear expression against zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    coefficients: BTreeMap<String, f64>,
    constant: f64,
    pub relation: Relation,
}

impl Predicate {
    /// Empty predicate `0 <relation> 0`. Terms are added with `+=` and `-=`.
    pub fn new(relation: Relation) -> Self {
        Self {
            relation,
            ..Self::default()
        }
    }

    /// Build the predicate `lhs <relation> rhs` from the terms of both sides.
    pub fn compare<L, R>(lhs: L, relation: Relation, rhs: R) -> Self
    where
        L: IntoIterator,
        L::Item: Into<Term>,
        R: IntoIterator,
        R::Item: Into<Term>,
    {
        let mut p = Self::new(relation);

        for term in lhs {
            p += term;
        }

        for term in rhs {
            p -= term;
        }

        p
    }

    /// Coefficient of a variable in `lhs - rhs`.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.coefficients.get(name).copied()
    }

    /// Constant part of `lhs - rhs`.
    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// Names of the signals this predicate reads, in sorted order.
    pub fn variables(&self) -> impl Iterator<Item = &str> + '_ {
        self.coefficients.keys().map(String::as_str)
    }
}

/// Renders the folded form, e.g. `speed - 100 > 0`.
impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;

        for (name, &coeff) in &self.coefficients {
            let sign = if coeff < 0.0 { "-" } else { "+" };

            match (first, coeff.abs() == 1.0) {
                (true, true) if coeff < 0.0 => write!(f, "-{}", name)?,
                (true, true) => write!(f, "{}", name)?,
                (true, false) => write!(f, "{}*{}", coeff, name)?,
                (false, true) => write!(f, " {} {}", sign, name)?,
                (false, false) => write!(f, " {} {}*{}", sign, coeff.abs(), name)?,
            }

            first = false;
        }

        if first {
            write!(f, "{}", self.constant)?;
        } else if self.constant != 0.0 {
            let sign = if self.constant < 0.0 { "-" } else { "+" };
            write!(f, " {} {}", sign, self.constant.abs())?;
        }

        write!(f, " {} 0", self.relation)
    }
}

/// A single addend of a linear expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Variable(String, f64),
    Constant(f64),
}

impl Neg for Term {
    type Output = Term;

    fn neg(self) -> Self::Output {
        match self {
            Self::Variable(name, value) => Self::Variable(name, -value),
            Self::Constant(value) => Self::Constant(-value),
        }
    }
}

impl From<&str> for Term {
    fn from(name: &str) -> Self {
        Term::Variable(name.into(), 1.0)
    }
}

impl From<String> for Term {
    fn from(name: String) -> Self {
        Term::Variable(name, 1.0)
    }
}

impl From<(&str, f64)> for Term {
    fn from((name, value): (&str, f64)) -> Self {
        Term::Variable(name.into(), value)
    }
}

impl From<(String, f64)> for Term {
    fn from((name, value): (String, f64)) -> Self {
        Term::Variable(name, value)
    }
}

impl From<f64> for Term {
    fn from(value: f64) -> Self {
        Term::Constant(value)
    }
}

impl<T> AddAssign<T> for Predicate
where
    T: Into<Term>,
{
    fn add_assign(&mut self, rhs: T) {
        match rhs.into() {
            Term::Variable(name, value) => {
                *self.coefficients.entry(name).or_insert(0.0) += value;
            }
            Term::Constant(value) => {
                self.constant += value;
            }
        }
    }
}

impl<T> SubAssign<T> for Predicate
where
    T: Into<Term>,
{
    fn sub_assign(&mut self, rhs: T) {
        *self += -rhs.into();
    }
}

/// A system state that can be queried for signal values by name.
pub trait VariableSet {
    fn value_for(&self, name: &str) -> Option<f64>;
}

impl<K> VariableSet for HashMap<K, f64>
where
    K: Borrow<str> + Eq + Hash,
{
    fn value_for(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

impl<K> VariableSet for BTreeMap<K, f64>
where
    K: Borrow<str> + Ord,
{
    fn value_for(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ErrorKind {
    #[error("missing variable")]
    Missing,

    #[error("NaN value for variable")]
    NanValue,

    #[error("NaN coefficient for variable")]
    NanCoefficient,
}

/// Failure to evaluate a predicate against a single state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind} \"{name}\"")]
pub struct StateError {
    kind: ErrorKind,
    name: String,
}

impl StateError {
    pub fn missing(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            kind: ErrorKind::Missing,
        }
    }

    pub fn nan_value(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            kind: ErrorKind::NanValue,
        }
    }

    pub fn nan_coefficient(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            kind: ErrorKind::NanCoefficient,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl Predicate {
    /// Robustness of this predicate for one state.
    pub fn evaluate_state<State>(&self, state: &State) -> Result<f64, StateError>
    where
        State: VariableSet + ?Sized,
    {
        self.difference(state).map(|e| self.relation.robustness(e))
    }

    /// Value of `lhs - rhs` for one state. The comparison changes truth value where it crosses zero.
    pub fn difference<State>(&self, state: &State) -> Result<f64, StateError>
    where
        State: VariableSet + ?Sized,
    {
        let mut difference = self.constant;

        for (name, coeff) in &self.coefficients {
            if coeff.is_nan() {
                return Err(StateError::nan_coefficient(name));
            }

            let value = state.value_for(name).ok_or_else(|| StateError::missing(name))?;

            if value.is_nan() {
                return Err(StateError::nan_value(name));
            }

            difference += coeff * value;
        }

        Ok(difference)
    }
}

/// Predicate failure tagged with the time of the offending state.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("at time {time}: {error}")]
pub struct PredicateError {
    time: f64,

    #[source]
    error: StateError,
}

impl PredicateError {
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn error(&self) -> &StateError {
        &self.error
    }
}

impl<State> Formula<State> for Predicate
where
    State: VariableSet,
{
    type Metric = f64;
    type Error = PredicateError;

    fn evaluate(&self, trace: &Trace<State>) -> Result<Trace<Self::Metric>, Self::Error> {
        trace
            .iter()
            .map(|(time, state)| {
                self.evaluate_state(state)
                    .map(|rho| (time, rho))
                    .map_err(|error| PredicateError { time, error })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use super::{Predicate, Relation, StateError, Term};
    use crate::{Formula, Trace};

    #[test]
    fn folds_both_sides() {
        // 3x + 1 <= 4.1y + 3.2 + z
        let p = Predicate::compare(
            [Term::from(("x", 3.0)), Term::from(1.0)],
            Relation::LessEqual,
            [Term::from(("y", 4.1)), Term::from(3.2), Term::from("z")],
        );

        assert_eq!(p.get("x"), Some(3.0));
        assert_eq!(p.get("y"), Some(-4.1));
        assert_eq!(p.get("z"), Some(-1.0));
        assert_eq!(p.constant(), 1.0 - 3.2);
        assert_eq!(p.variables().collect::<Vec<_>>(), vec!["x", "y", "z"]);
    }

    #[test]
    fn difference_keeps_sign() {
        let p = Predicate::compare(["speed"], Relation::Equal, [100.0]);
        let state = HashMap::from([("speed", 90.0)]);

        assert_eq!(p.difference(&state), Ok(-10.0));
        assert_eq!(p.evaluate_state(&state), Ok(-10.0));
        assert_eq!(p.difference(&HashMap::from([("speed", 110.0)])), Ok(10.0));
    }

    #[test]
    fn display() {
        let speed = Predicate::compare(["speed"], Relation::Greater, [100.0]);
        let mixed = Predicate::compare([("x", -2.0), ("y", 1.0)], Relation::NotEqual, [-0.5]);

        assert_eq!(speed.to_string(), "speed - 100 > 0");
        assert_eq!(mixed.to_string(), "-2*x + y + 0.5 != 0");
        assert_eq!(Predicate::new(Relation::Equal).to_string(), "0 == 0");
    }

    #[test]
    fn relation_robustness() {
        let state = HashMap::from([("speed", 90.0)]);
        let rho = |relation| Predicate::compare(["speed"], relation, [100.0]).evaluate_state(&state);

        assert_eq!(rho(Relation::Less), Ok(10.0));
        assert_eq!(rho(Relation::LessEqual), Ok(10.0));
        assert_eq!(rho(Relation::Greater), Ok(-10.0));
        assert_eq!(rho(Relation::GreaterEqual), Ok(-10.0));
        assert_eq!(rho(Relation::Equal), Ok(-10.0));
        assert_eq!(rho(Relation::NotEqual), Ok(10.0));
    }

    #[test]
    fn evaluation_errors() {
        let mut p = Predicate::compare([("x", 1.0), ("y", 2.0)], Relation::LessEqual, [10.0]);

        let btree = BTreeMap::from([("x", 5.0), ("y", 5.0)]);
        let missing = HashMap::from([("y", 2.0)]);
        let nan_value = HashMap::from([("x", 2.0), ("y", f64::NAN)]);

        assert_eq!(p.evaluate_state(&btree), Ok(-5.0));
        assert_eq!(p.evaluate_state(&missing), Err(StateError::missing("x")));
        assert_eq!(p.evaluate_state(&nan_value), Err(StateError::nan_value("y")));

        p += ("z", f64::NAN);
        assert_eq!(p.evaluate_state(&btree), Err(StateError::nan_coefficient("z")));
    }

    #[test]
    fn error_carries_time() {
        let p = Predicate::compare(["x"], Relation::Greater, [0.0]);
        let trace = Trace::from([
            (0.0, HashMap::from([("x", 1.0)])),
            (1.0, HashMap::from([("y", 1.0)])),
        ]);

        let err = p.evaluate(&trace).unwrap_err();

        assert_eq!(err.time(), 1.0);
        assert_eq!(err.error().name(), "x");
    }
}
