//! Syntax tree of a parsed specification.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use vigil_core::operators::{Always, And, Eventually, Implies, Next, Not, Or, Until};
use vigil_core::predicate::Predicate;

use crate::parser::ParsedFormula;

/// Relative time window `[start, end]` of a bounded temporal operator.
pub type Bounds = (f64, f64);

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Predicate(Predicate),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Implies(Box<Expr>, Box<Expr>),
    Until(Box<Expr>, Box<Expr>),
    Always(Option<Bounds>, Box<Expr>),
    Eventually(Option<Bounds>, Box<Expr>),
    Next(Box<Expr>),
}

impl Expr {
    pub fn not(inner: Expr) -> Self {
        Self::Not(Box::new(inner))
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Self::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Self::Or(Box::new(left), Box::new(right))
    }

    pub fn implies(ante: Expr, cons: Expr) -> Self {
        Self::Implies(Box::new(ante), Box::new(cons))
    }

    pub fn until(left: Expr, right: Expr) -> Self {
        Self::Until(Box::new(left), Box::new(right))
    }

    pub fn always(bounds: Option<Bounds>, inner: Expr) -> Self {
        Self::Always(bounds, Box::new(inner))
    }

    pub fn eventually(bounds: Option<Bounds>, inner: Expr) -> Self {
        Self::Eventually(bounds, Box::new(inner))
    }

    pub fn next(inner: Expr) -> Self {
        Self::Next(Box::new(inner))
    }

    /// Every signal name read by a predicate in this expression.
    pub fn variables(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables<'a>(&'a self, names: &mut BTreeSet<&'a str>) {
        match self {
            Self::Predicate(p) => names.extend(p.variables()),
            Self::Not(e) | Self::Next(e) | Self::Always(_, e) | Self::Eventually(_, e) => e.collect_variables(names),
            Self::And(l, r) | Self::Or(l, r) | Self::Implies(l, r) | Self::Until(l, r) => {
                l.collect_variables(names);
                r.collect_variables(names);
            }
        }
    }

    /// Offsets from an evaluation instant at which some bounded window opens or closes, including
    /// the instant itself. Offsets of nested windows add up. Sorted and without duplicates.
    pub fn window_offsets(&self) -> Vec<f64> {
        let mut offsets = match self {
            Self::Predicate(_) => vec![0.0],
            Self::Not(e) | Self::Next(e) | Self::Always(None, e) | Self::Eventually(None, e) => e.window_offsets(),
            Self::Always(Some((a, b)), e) | Self::Eventually(Some((a, b)), e) => e
                .window_offsets()
                .into_iter()
                .flat_map(|offset| [offset, a + offset, b + offset])
                .collect(),
            Self::And(l, r) | Self::Or(l, r) | Self::Implies(l, r) | Self::Until(l, r) => {
                let mut offsets = l.window_offsets();
                offsets.extend(r.window_offsets());
                offsets
            }
        };

        offsets.sort_by(f64::total_cmp);
        offsets.dedup();
        offsets
    }

    /// Every predicate in this expression, left to right.
    pub fn predicates(&self) -> Vec<&Predicate> {
        match self {
            Self::Predicate(p) => vec![p],
            Self::Not(e) | Self::Next(e) | Self::Always(_, e) | Self::Eventually(_, e) => e.predicates(),
            Self::And(l, r) | Self::Or(l, r) | Self::Implies(l, r) | Self::Until(l, r) => {
                let mut predicates = l.predicates();
                predicates.extend(r.predicates());
                predicates
            }
        }
    }

    /// Build the evaluable formula for this expression.
    pub fn to_formula(&self) -> ParsedFormula {
        match self {
            Self::Predicate(p) => ParsedFormula::new(p.clone()),
            Self::Not(e) => ParsedFormula::new(Not::new(e.to_formula())),
            Self::And(l, r) => ParsedFormula::new(And::new(l.to_formula(), r.to_formula())),
            Self::Or(l, r) => ParsedFormula::new(Or::new(l.to_formula(), r.to_formula())),
            Self::Implies(l, r) => ParsedFormula::new(Implies::new(l.to_formula(), r.to_formula())),
            Self::Until(l, r) => ParsedFormula::new(Until::new(l.to_formula(), r.to_formula())),
            Self::Next(e) => ParsedFormula::new(Next::new(e.to_formula())),
            Self::Always(None, e) => ParsedFormula::new(Always::unbounded(e.to_formula())),
            Self::Always(Some((a, b)), e) => ParsedFormula::new(Always::bounded(*a..=*b, e.to_formula())),
            Self::Eventually(None, e) => ParsedFormula::new(Eventually::unbounded(e.to_formula())),
            Self::Eventually(Some((a, b)), e) => ParsedFormula::new(Eventually::bounded(*a..=*b, e.to_formula())),
        }
    }
}

fn write_bounded(f: &mut Formatter<'_>, op: &str, bounds: &Option<Bounds>, inner: &Expr) -> std::fmt::Result {
    match bounds {
        Some((a, b)) => write!(f, "{}[{}:{}]({})", op, a, b, inner),
        None => write!(f, "{}({})", op, inner),
    }
}

/// Fully parenthesized rendering that parses back to the same tree.
impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Predicate(p) => write!(f, "{}", p),
            Self::Not(e) => write!(f, "not ({})", e),
            Self::And(l, r) => write!(f, "({}) and ({})", l, r),
            Self::Or(l, r) => write!(f, "({}) or ({})", l, r),
            Self::Implies(l, r) => write!(f, "({}) implies ({})", l, r),
            Self::Until(l, r) => write!(f, "({}) until ({})", l, r),
            Self::Next(e) => write!(f, "next ({})", e),
            Self::Always(bounds, e) => write_bounded(f, "always", bounds, e),
            Self::Eventually(bounds, e) => write_bounded(f, "eventually", bounds, e),
        }
    }
}
