use std::error::Error;
use std::str::FromStr;

use nom::bytes::complete::{tag, take_while, take_while1};
use nom::character::complete::{digit1, multispace0, satisfy};
use nom::combinator::{map_res, not, opt, recognize, verify};
use nom::sequence::{delimited, pair, terminated};
use nom::IResult;

use super::errors::ParsedFormulaError;
use crate::{Formula, Trace};

/// Erases the concrete error type of a formula so operators over parsed formulas can be boxed.
pub struct FormulaWrapper<F> {
    inner: F,
}

impl<F> FormulaWrapper<F> {
    pub fn wrap<State>(formula: F) -> Self
    where
        F: Formula<State>,
    {
        Self { inner: formula }
    }
}

impl<State, F, E> Formula<State> for FormulaWrapper<F>
where
    F: Formula<State, Error = E>,
    E: Error + Send + Sync + 'static,
{
    type Metric = F::Metric;
    type Error = ParsedFormulaError;

    #[inline]
    fn evaluate(&self, trace: &Trace<State>) -> Result<Trace<Self::Metric>, Self::Error> {
        self.inner.evaluate(trace).map_err(ParsedFormulaError::from_err)
    }
}

/// Words that can never be used as signal names.
pub const KEYWORDS: [&str; 8] = ["always", "eventually", "next", "until", "not", "and", "or", "implies"];

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Identifiers such as `x`, `speed`, `roll_rate2`. Keywords are rejected.
pub fn var_name(input: &str) -> IResult<&str, String> {
    let ident = recognize(pair(take_while1(is_ident_start), take_while(is_ident_char)));
    let mut parser = verify(ident, |name: &str| !KEYWORDS.contains(&name));
    let (rest, name) = parser(input)?;

    Ok((rest, name.to_string()))
}

pub fn pos_num(input: &str) -> IResult<&str, f64> {
    let number = recognize(pair(digit1, opt(pair(tag("."), digit1))));
    let mut parser = map_res(number, f64::from_str);

    parser(input)
}

pub fn pos_neg_num(input: &str) -> IResult<&str, f64> {
    let mut parser = pair(opt(terminated(tag("-"), multispace0)), pos_num);
    let (rest, (sign, num)) = parser(input)?;

    Ok((rest, if sign.is_some() { -num } else { num }))
}

/// A symbolic operator surrounded by optional whitespace.
pub fn op0<'a>(op: &'a str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    move |input: &'a str| {
        let mut parser = delimited(multispace0, tag(op), multispace0);
        parser(input)
    }
}

/// A word operator surrounded by optional whitespace. The word must not run into an identifier,
/// so `orientation` is never read as `or` followed by `ientation`.
pub fn kw0<'a>(word: &'a str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    move |input: &'a str| {
        let keyword = terminated(tag(word), not(satisfy(is_ident_char)));
        let mut parser = delimited(multispace0, keyword, multispace0);
        parser(input)
    }
}
