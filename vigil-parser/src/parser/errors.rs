use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

use thiserror::Error;

/// Evaluation error of a parsed formula, with the operator-specific error type erased.
pub struct ParsedFormulaError {
    inner: Box<dyn Error + Send + Sync>,
}

impl ParsedFormulaError {
    pub fn from_err<E: Error + Send + Sync + 'static>(err: E) -> Self {
        Self { inner: Box::new(err) }
    }
}

impl Display for ParsedFormulaError {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.inner, f)
    }
}

impl Debug for ParsedFormulaError {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.inner, f)
    }
}

impl Error for ParsedFormulaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner.source()
    }
}

/// Failure to turn specification text into a formula.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty specification")]
    Empty,

    #[error("syntax error at offset {offset} near \"{near}\"")]
    Syntax { offset: usize, near: String },

    #[error("could not parse remaining input \"{0}\"")]
    Incomplete(String),
}

impl ParseError {
    /// Locate the nom failure inside the original input.
    pub(crate) fn syntax(source: &str, err: nom::Err<nom::error::Error<&str>>) -> Self {
        let rest = match err {
            nom::Err::Error(e) | nom::Err::Failure(e) => e.input,
            nom::Err::Incomplete(_) => "",
        };

        Self::Syntax {
            offset: source.len() - rest.len(),
            near: rest.chars().take(24).collect(),
        }
    }
}
