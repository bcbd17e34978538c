use std::collections::HashMap;

use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{char, multispace0};
use nom::combinator::{map, not, opt, value, verify};
use nom::multi::many0;
use nom::sequence::{delimited, pair, preceded, separated_pair, terminated, tuple};
use nom::IResult;
use vigil_core::predicate::{Predicate, Relation, Term};

use super::common::{kw0, op0, pos_neg_num, pos_num, var_name, FormulaWrapper};
use super::errors::{ParseError, ParsedFormulaError};
use crate::expressions::{Bounds, Expr};
use crate::{Formula, Trace};

/// Signal values at one instant, keyed by signal name.
pub type Variables = HashMap<String, f64>;

/// A formula built from text, evaluable over traces of [`Variables`].
pub struct ParsedFormula {
    inner: Box<dyn Formula<Variables, Metric = f64, Error = ParsedFormulaError>>,
}

impl ParsedFormula {
    pub fn new<F, E>(formula: F) -> Self
    where
        F: Formula<Variables, Metric = f64, Error = E> + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            inner: Box::new(FormulaWrapper::wrap(formula)),
        }
    }
}

impl Formula<Variables> for ParsedFormula {
    type Metric = f64;
    type Error = ParsedFormulaError;

    #[inline]
    fn evaluate(&self, trace: &Trace<Variables>) -> Result<Trace<f64>, Self::Error> {
        self.inner.evaluate(trace)
    }
}

/// Parsed `name = expression` text. The assignment part is optional.
#[derive(Debug, Clone, PartialEq)]
pub struct Specification {
    output: Option<String>,
    expr: Expr,
}

impl Specification {
    /// Name on the left of `=`, if the text assigned the formula to one.
    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn formula(&self) -> ParsedFormula {
        self.expr.to_formula()
    }
}

fn minus(input: &str) -> IResult<&str, &str> {
    // `->` is implication, not subtraction
    delimited(multispace0, terminated(tag("-"), not(char('>'))), multispace0)(input)
}

fn term(input: &str) -> IResult<&str, Term> {
    let scaled = map(separated_pair(pos_num, op0("*"), var_name), |(coeff, name)| Term::Variable(name, coeff));
    let variable = map(pair(var_name, opt(preceded(op0("*"), pos_neg_num))), |(name, coeff)| {
        Term::Variable(name, coeff.unwrap_or(1.0))
    });
    let constant = map(pos_num, Term::Constant);

    alt((scaled, variable, constant))(input)
}

fn signed_term(input: &str) -> IResult<&str, Term> {
    let (rest, (sign, term)) = pair(opt(terminated(tag("-"), multispace0)), term)(input)?;

    Ok((rest, if sign.is_some() { -term } else { term }))
}

fn linear_expression(input: &str) -> IResult<&str, Vec<Term>> {
    let operator = alt((value(false, op0("+")), value(true, minus)));
    let (rest, (first, others)) = pair(signed_term, many0(pair(operator, term)))(input)?;

    let mut terms = vec![first];
    terms.extend(others.into_iter().map(|(negate, t)| if negate { -t } else { t }));

    Ok((rest, terms))
}

fn relation(input: &str) -> IResult<&str, Relation> {
    let relations = alt((
        value(Relation::LessEqual, tag("<=")),
        value(Relation::GreaterEqual, tag(">=")),
        value(Relation::Equal, tag("==")),
        value(Relation::NotEqual, tag("!=")),
        value(Relation::Less, tag("<")),
        value(Relation::Greater, tag(">")),
    ));

    delimited(multispace0, relations, multispace0)(input)
}

fn predicate(input: &str) -> IResult<&str, Predicate> {
    let (rest, (lhs, rel, rhs)) = tuple((linear_expression, relation, linear_expression))(input)?;

    Ok((rest, Predicate::compare(lhs, rel, rhs)))
}

fn bounds(input: &str) -> IResult<&str, Bounds> {
    let separator = alt((op0(":"), op0(",")));
    let window = separated_pair(pos_num, separator, pos_num);

    verify(delimited(op0("["), window, op0("]")), |&(start, end): &Bounds| start <= end)(input)
}

fn atom(input: &str) -> IResult<&str, Expr> {
    let group = delimited(op0("("), implies, op0(")"));

    alt((group, map(predicate, Expr::Predicate)))(input)
}

fn unary(input: &str) -> IResult<&str, Expr> {
    let bang = delimited(multispace0, terminated(tag("!"), not(char('='))), multispace0);
    let negation = map(preceded(alt((kw0("not"), bang)), unary), Expr::not);
    let always = map(
        tuple((alt((kw0("always"), kw0("G"))), opt(bounds), unary)),
        |(_, window, inner)| Expr::always(window, inner),
    );
    let eventually = map(
        tuple((alt((kw0("eventually"), kw0("F"))), opt(bounds), unary)),
        |(_, window, inner)| Expr::eventually(window, inner),
    );
    let next = map(preceded(alt((kw0("next"), kw0("X"))), unary), Expr::next);

    alt((negation, always, eventually, next, atom))(input)
}

fn until(input: &str) -> IResult<&str, Expr> {
    let (rest, left) = unary(input)?;
    let (rest, right) = opt(preceded(kw0("until"), until))(rest)?;

    match right {
        Some(right) => Ok((rest, Expr::until(left, right))),
        None => Ok((rest, left)),
    }
}

fn and(input: &str) -> IResult<&str, Expr> {
    let operator = alt((kw0("and"), op0("&&"), op0(r"/\")));
    let (rest, (first, others)) = pair(until, many0(preceded(operator, until)))(input)?;

    Ok((rest, others.into_iter().fold(first, Expr::and)))
}

fn or(input: &str) -> IResult<&str, Expr> {
    let operator = alt((kw0("or"), op0("||"), op0(r"\/")));
    let (rest, (first, others)) = pair(and, many0(preceded(operator, and)))(input)?;

    Ok((rest, others.into_iter().fold(first, Expr::or)))
}

fn implies(input: &str) -> IResult<&str, Expr> {
    let (rest, ante) = or(input)?;
    let (rest, cons) = opt(preceded(alt((kw0("implies"), op0("->"))), implies))(rest)?;

    match cons {
        Some(cons) => Ok((rest, Expr::implies(ante, cons))),
        None => Ok((rest, ante)),
    }
}

fn assignment(input: &str) -> IResult<&str, String> {
    let equals = delimited(multispace0, terminated(char('='), not(char('='))), multispace0);
    terminated(var_name, equals)(input)
}

fn specification(input: &str) -> IResult<&str, (Option<String>, Expr)> {
    delimited(multispace0, pair(opt(assignment), implies), multispace0)(input)
}

fn finish<T>(input: &str, result: IResult<&str, T>) -> Result<T, ParseError> {
    if input.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    match result {
        Ok(("", parsed)) => Ok(parsed),
        Ok((rest, _)) => Err(ParseError::Incomplete(rest.to_string())),
        Err(err) => Err(ParseError::syntax(input, err)),
    }
}

/// Parse `[name =] expression`.
///
/// ```rust
/// use vigil_parser::parse_specification;
///
/// let spec = parse_specification("out = always((speed > 100) implies eventually[0:5](speed <= 100))").unwrap();
///
/// assert_eq!(spec.output(), Some("out"));
/// assert_eq!(spec.expr().variables().into_iter().collect::<Vec<_>>(), vec!["speed"]);
/// ```
pub fn parse_specification(input: &str) -> Result<Specification, ParseError> {
    finish(input, specification(input)).map(|(output, expr)| Specification { output, expr })
}

/// Parse a bare temporal expression into an evaluable formula.
pub fn parse_formula(input: &str) -> Result<ParsedFormula, ParseError> {
    finish(input, delimited(multispace0, implies, multispace0)(input)).map(|expr| expr.to_formula())
}

/// Parse a single comparison such as `3.1*x + 22.4*y <= 12`.
pub fn parse_predicate(input: &str) -> Result<Predicate, ParseError> {
    finish(input, delimited(multispace0, predicate, multispace0)(input))
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use vigil_core::predicate::{Predicate, Relation, Term};

    use super::{bounds, implies, linear_expression, predicate, term};
    use crate::expressions::Expr;

    fn pred(lhs: &str, rel: Relation, rhs: f64) -> Expr {
        Expr::Predicate(Predicate::compare([lhs], rel, [rhs]))
    }

    #[test]
    fn parse_terms() -> Result<(), Box<dyn Error>> {
        assert_eq!(term("12.0 * abc")?, ("", Term::Variable("abc".into(), 12.0)));
        assert_eq!(term("y*3")?, ("", Term::Variable("y".into(), 3.0)));
        assert_eq!(term("z * -0.3")?, ("", Term::Variable("z".into(), -0.3)));
        assert_eq!(term("L")?, ("", Term::Variable("L".into(), 1.0)));
        assert_eq!(term("4.5")?, ("", Term::Constant(4.5)));

        Ok(())
    }

    #[test]
    fn parse_linear_expression() -> Result<(), Box<dyn Error>> {
        let (rest, terms) = linear_expression("-x + 2*y - 3 -> z")?;

        assert_eq!(rest, " -> z");
        assert_eq!(
            terms,
            vec![
                Term::Variable("x".into(), -1.0),
                Term::Variable("y".into(), 2.0),
                Term::Constant(-3.0),
            ]
        );

        Ok(())
    }

    #[test]
    fn parse_relations() -> Result<(), Box<dyn Error>> {
        let cases = [
            ("speed < 1", Relation::Less),
            ("speed<=1", Relation::LessEqual),
            ("speed > 1", Relation::Greater),
            ("speed >= 1", Relation::GreaterEqual),
            ("speed == 1", Relation::Equal),
            ("speed != 1", Relation::NotEqual),
        ];

        for (text, relation) in cases {
            let (_, parsed) = predicate(text)?;
            assert_eq!(parsed, Predicate::compare(["speed"], relation, [1.0]));
        }

        Ok(())
    }

    #[test]
    fn parse_bounds() -> Result<(), Box<dyn Error>> {
        assert_eq!(bounds("[0:5]")?, ("", (0.0, 5.0)));
        assert_eq!(bounds("[ 0.5 , 2 ]")?, ("", (0.5, 2.0)));
        assert!(bounds("[5:0]").is_err());

        Ok(())
    }

    #[test]
    fn precedence() -> Result<(), Box<dyn Error>> {
        let (rest, expr) = implies("a > 0 or b > 0 and c > 0 implies d > 0")?;
        let expected = Expr::implies(
            Expr::or(
                pred("a", Relation::Greater, 0.0),
                Expr::and(pred("b", Relation::Greater, 0.0), pred("c", Relation::Greater, 0.0)),
            ),
            pred("d", Relation::Greater, 0.0),
        );

        assert_eq!(rest, "");
        assert_eq!(expr, expected);

        Ok(())
    }

    #[test]
    fn temporal_operators() -> Result<(), Box<dyn Error>> {
        let (_, expr) = implies("G[0:5](x >= 0) && F x < 1 || X !(y == 2)")?;
        let expected = Expr::or(
            Expr::and(
                Expr::always(Some((0.0, 5.0)), pred("x", Relation::GreaterEqual, 0.0)),
                Expr::eventually(None, pred("x", Relation::Less, 1.0)),
            ),
            Expr::next(Expr::not(pred("y", Relation::Equal, 2.0))),
        );

        assert_eq!(expr, expected);

        let (_, expr) = implies("x > 0 until y > 0 until z > 0")?;
        let expected = Expr::until(
            pred("x", Relation::Greater, 0.0),
            Expr::until(pred("y", Relation::Greater, 0.0), pred("z", Relation::Greater, 0.0)),
        );

        assert_eq!(expr, expected);

        Ok(())
    }
}
