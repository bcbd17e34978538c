//! Parse specification strings and evaluate them against telemetry traces.

use std::collections::HashMap;

use approx::assert_relative_eq;
use vigil_parser::{parse_formula, parse_predicate, parse_specification, Formula, ParseError, Trace, Variables};

fn state(pairs: &[(&str, f64)]) -> Variables {
    pairs.iter().map(|&(name, value)| (name.to_string(), value)).collect()
}

fn speed_trace(values: &[f64]) -> Trace<Variables> {
    values
        .iter()
        .enumerate()
        .map(|(t, &v)| (t as f64, state(&[("speed", v)])))
        .collect()
}

#[test]
fn predicate_string() {
    let p = parse_predicate("3.1*x + 22.4*y <= 12.0").expect("parse predicate");
    let s = HashMap::from([("x", 1.0), ("y", 0.5)]);

    assert_relative_eq!(p.evaluate_state(&s).expect("evaluate"), 12.0 - 3.1 - 11.2, epsilon = 1e-9);
}

#[test]
fn bounded_recovery_specification() {
    let text = "out = always((speed > 100) implies eventually[0:5](speed <= 100))";
    let spec = parse_specification(text).expect("parse");
    let trace = speed_trace(&[50.0, 110.0, 110.0, 90.0]);
    let robustness = spec.formula().evaluate(&trace).expect("evaluate");

    assert_eq!(spec.output(), Some("out"));
    assert_eq!(robustness.len(), 4);
    assert_eq!(robustness.at_time(1.0), Some(&10.0));
    assert!(robustness.states().all(|&rho| rho >= 0.0));
}

#[test]
fn reference_deployment_spacing() {
    let spec = parse_specification("out=always[0:5](acceleration >= -20 and acceleration <=20)").expect("parse");
    let vars: Vec<&str> = spec.expr().variables().into_iter().collect();

    assert_eq!(vars, vec!["acceleration"]);

    let spec = parse_specification("out = always((  (speed > 100)) implies eventually[0:5](  speed <= 100))");
    assert!(spec.is_ok());
}

#[test]
fn combined_properties() {
    let text = "out = always((speed > 100 or acceleration < -20 or x < 0 or x > 600) implies \
                eventually[0:5](speed <= 100 and acceleration >= -20 and x >= 0 and x <= 600))";
    let spec = parse_specification(text).expect("parse");
    let vars: Vec<&str> = spec.expr().variables().into_iter().collect();

    assert_eq!(vars, vec!["acceleration", "speed", "x"]);

    let trace: Trace<Variables> = Trace::from([
        (0.0, state(&[("speed", 90.0), ("acceleration", 1.0), ("x", 10.0)])),
        (1.0, state(&[("speed", 95.0), ("acceleration", -2.0), ("x", 620.0)])),
    ]);

    let robustness = spec.formula().evaluate(&trace).expect("evaluate");

    // x stays 20 past the right edge until the end of the recording
    assert_eq!(robustness.states().next(), Some(&-20.0));
}

#[test]
fn display_round_trip() {
    let spec = parse_specification("G[0:2](x > 1 -> F y <= 2 * x) && !(z != 0)").expect("parse");
    let reparsed = parse_specification(&spec.expr().to_string()).expect("reparse");

    assert_eq!(spec.expr(), reparsed.expr());
    assert_eq!(reparsed.output(), None);
}

#[test]
fn invalid_strings() {
    assert_eq!(parse_formula("   ").err(), Some(ParseError::Empty));
    assert!(matches!(parse_formula("speed > 100 )"), Err(ParseError::Incomplete(_))));
    assert!(matches!(parse_formula("not a valid formula !!"), Err(ParseError::Syntax { .. })));
    assert!(parse_formula("always[5:0](x > 0)").is_err());
    assert!(parse_formula("and > 3").is_err());
}

#[test]
fn until_satisfied_by_right_side_alone() {
    let phi = parse_formula("(speed > 100) until (acc > 0)").expect("parse");
    let trace = Trace::from([(0.0, state(&[("speed", 50.0), ("acc", 5.0)]))]);
    let robustness = phi.evaluate(&trace).expect("evaluate");

    assert_eq!(robustness.at_time(0.0), Some(&5.0));
}
