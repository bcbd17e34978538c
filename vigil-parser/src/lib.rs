//! Parse temporal specifications written as text into evaluable formulas.
//!
//! The accepted language is a small Signal Temporal Logic dialect:
//!
//! ```text
//! out = always((speed > 100) implies eventually[0:5](speed <= 100))
//! ```
//!
//! - comparisons `<`, `<=`, `>`, `>=`, `==`, `!=` between linear expressions such as
//!   `2*x - y + 3`
//! - `not`/`!`, `and`/`&&`, `or`/`||`, `implies`/`->` and `until`, from tightest to loosest
//!   binding: unary operators, `until`, `and`, `or`, `implies`
//! - `always`/`G`, `eventually`/`F` with an optional `[start:end]` window, `next`/`X`
//!
//! [`parse_specification`] keeps the syntax tree so callers can inspect the assigned name and the
//! signals the formula reads before evaluating it. [`parse_formula`] goes straight to an
//! evaluable [`ParsedFormula`].
//!
//! ```rust
//! use std::collections::HashMap;
//!
//! use vigil_parser::{parse_formula, Formula, Trace};
//!
//! let phi = parse_formula("always[0:5](acceleration >= -20 and acceleration <= 20)").unwrap();
//! let trace = Trace::from([
//!     (0.0, HashMap::from([("acceleration".to_string(), 4.0)])),
//!     (1.0, HashMap::from([("acceleration".to_string(), -12.5)])),
//! ]);
//!
//! let robustness = phi.evaluate(&trace).unwrap();
//! assert_eq!(robustness.at_time(0.0), Some(&7.5));
//! ```

pub mod expressions;
mod parser;

pub use vigil_core::operators;
pub use vigil_core::{Formula, Trace};

pub use parser::{
    parse_formula, parse_predicate, parse_specification, ParseError, ParsedFormula, ParsedFormulaError, Specification,
    Variables, KEYWORDS,
};
