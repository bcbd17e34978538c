mod common;
mod errors;
mod formula;

pub use common::KEYWORDS;
pub use errors::{ParseError, ParsedFormulaError};
pub use formula::{parse_formula, parse_predicate, parse_specification, ParsedFormula, Specification, Variables};
