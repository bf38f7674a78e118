//! End-to-end properties of the engine through its public API.

use calc_core::calculus::SolveMethod;
use calc_core::format::format_real;
use calc_core::value::VariablePayload;
use calc_core::evaluator::EvalMode;
use calc_core::{Dimension, Engine, OutputFormat, PrecisionSettings, ResultValue, Variables};

fn vars(entries: &[(&str, VariablePayload)]) -> Variables {
    entries.iter().map(|(n, p)| (n.to_string(), p.clone())).collect()
}

fn real(value: &Option<ResultValue>) -> f64 {
    match value {
        Some(ResultValue::Real(x)) => *x,
        other => panic!("expected a real value, got {:?}", other),
    }
}

#[test]
fn test_conversion_round_trip() {
    let engine = Engine::new();
    let pairs = [("km", "mi"), ("psi", "kPa"), ("degC", "degF"), ("kWh", "BTU"), ("ft^3", "L")];
    for (a, b) in pairs {
        for x in [-40.0, 0.0, 1.0, 123.456] {
            let there = engine.convert_unit(x, a, b).value.unwrap();
            let back = engine.convert_unit(there, b, a).value.unwrap();
            assert!((back - x).abs() < 1e-9 * (1.0 + x.abs()), "{} {} -> {} -> {}", x, a, b, back);
        }
    }
}

#[test]
fn test_equal_dimensions_add() {
    let engine = Engine::new();
    let v = vars(&[("a", VariablePayload::with_unit(1.0, "m")), ("b", VariablePayload::with_unit(30.0, "cm"))]);
    let result = engine.evaluate("a + b", &v);
    assert!((real(&result.value) - 1.3).abs() < 1e-12);
    assert_eq!(result.unit.as_deref(), Some("m"));
}

#[test]
fn test_mismatched_dimensions_fail() {
    let engine = Engine::new();
    let v = vars(&[("a", VariablePayload::with_unit(1.0, "m")), ("m0", VariablePayload::with_unit(1.0, "kg"))]);
    let result = engine.evaluate("a - m0", &v);
    assert_eq!(result.error.unwrap().code, "INCOMPATIBLE_DIMENSIONS");
    assert!(result.value.is_none());
}

#[test]
fn test_mode_selection() {
    let engine = Engine::new();
    let symbolic = engine.evaluate("x + 1", &Variables::new());
    assert_eq!(symbolic.mode, Some(EvalMode::Symbolic));
    assert_eq!(symbolic.free_symbols, vec!["x".to_string()]);

    let numeric = engine.evaluate("2 + 3", &Variables::new());
    assert_eq!(numeric.mode, Some(EvalMode::Numeric));
    assert!((real(&numeric.value) - 5.0).abs() < 1e-12);
}

#[test]
fn test_quadratic_roots() {
    let engine = Engine::new();
    let result = engine.solve("x^2 - 4 = 0", "x", &Variables::new(), SolveMethod::Symbolic);
    let mut roots: Vec<f64> = result
        .solutions
        .iter()
        .map(|s| match s.value {
            ResultValue::Real(x) => x,
            ref other => panic!("expected real root, got {:?}", other),
        })
        .collect();
    roots.sort_by(|a, b| a.total_cmp(b));
    assert_eq!(roots.len(), 2);
    assert!((roots[0] + 2.0).abs() < 1e-12);
    assert!((roots[1] - 2.0).abs() < 1e-12);
}

#[test]
fn test_cubic_derivative() {
    let engine = Engine::new();
    let result = engine.differentiate("x^3", "x", 1);
    assert_eq!(result.derivative.as_deref(), Some("3*x**2"));
}

#[test]
fn test_force_over_area_is_pressure() {
    let engine = Engine::new();
    let v = vars(&[("F", VariablePayload::with_unit(100.0, "N")), ("A", VariablePayload::with_unit(2.0, "m^2"))]);
    let result = engine.evaluate("F / A", &v);
    assert!((real(&result.value) - 50.0).abs() < 1e-12);

    let unit = result.unit.unwrap();
    let dimension = engine.registry().dimension_of(&unit).unwrap();
    assert_eq!(dimension, Dimension::new([-1, 1, -2, 0, 0, 0, 0]));
    assert_eq!(engine.unit_dimension_info(&unit).info.unwrap().kind.as_deref(), Some("pressure"));
}

fn precision(format: OutputFormat, decimal_places: usize) -> PrecisionSettings {
    PrecisionSettings { output_format: format, decimal_places, ..PrecisionSettings::default() }
}

#[test]
fn test_formatting_examples() {
    let auto = format_real(0.0000001234, &precision(OutputFormat::Auto, 4));
    assert!(auto.contains('e'), "{}", auto);
    assert_eq!(format_real(1234.5, &precision(OutputFormat::Decimal, 2)), "1234.50");

    let tolerant = PrecisionSettings { tolerance: 1e-10, ..PrecisionSettings::default() };
    assert_eq!(format_real(1e-15, &tolerant), "0");
}

#[test]
fn test_formatting_is_idempotent() {
    let formats = [
        precision(OutputFormat::Auto, 4),
        precision(OutputFormat::Decimal, 3),
        precision(OutputFormat::Scientific, 4),
        precision(OutputFormat::Engineering, 4),
    ];
    for settings in &formats {
        for x in [0.0000001234_f64, 2.0 / 3.0, 1234.5, -98765.4321, 6.02e23, 42.0] {
            // Fixed places round tiny values to a zero that prints differently.
            if settings.output_format == OutputFormat::Decimal && x.abs() < 1e-3 {
                continue;
            }
            let once = format_real(x, settings);
            let parsed: f64 = once.parse().unwrap();
            assert_eq!(format_real(parsed, settings), once, "{:?} {}", settings.output_format, x);
        }
    }
}
