//! Single-variable minimisation and maximisation.
//!
//! Golden-section search on a bracket. Without bounds, a bracket is found
//! by walking downhill from `[0, 1]` with golden-ratio steps.

use log::debug;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::errors::{CalcError, CalcResult};
use crate::expr::numeric::as_real;
use crate::expr::{eval_complex, Expr};
use crate::settings::SolverSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OptimizeGoal {
    #[default]
    #[strum(serialize = "minimize", serialize = "min")]
    #[serde(alias = "min")]
    Minimize,
    #[strum(serialize = "maximize", serialize = "max")]
    #[serde(alias = "max")]
    Maximize,
}

/// Location and value of the optimum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Optimum {
    pub x: f64,
    pub value: f64,
    /// False when the bracket search or the iteration cap gave up
    pub success: bool,
    pub iterations: usize,
}

const INV_PHI: f64 = 0.618_033_988_749_894_8;
const PHI: f64 = 1.618_033_988_749_894_8;

struct Objective<'a> {
    expr: &'a Expr,
    var: &'a str,
    sign: f64,
}

impl Objective<'_> {
    /// Objective value, with undefined or complex points treated as +inf.
    fn at(&self, x: f64) -> f64 {
        let value = eval_complex(self.expr, &|name| (name == self.var).then(|| Complex64::new(x, 0.0)))
            .ok()
            .and_then(as_real);
        match value {
            Some(v) if v.is_finite() => self.sign * v,
            _ => f64::INFINITY,
        }
    }
}

/// Optimise `expr` over `var`, optionally within `bounds`.
pub fn optimize(
    expr: &Expr,
    var: &str,
    goal: OptimizeGoal,
    bounds: Option<(f64, f64)>,
    settings: &SolverSettings,
) -> CalcResult<Optimum> {
    let other: Vec<String> = expr.free_symbols().into_iter().filter(|s| s != var).collect();
    if !other.is_empty() {
        return Err(CalcError::evaluation_failed(
            expr.to_string(),
            format!("symbols without values: {}", other.join(", ")),
        ));
    }
    let sign = match goal {
        OptimizeGoal::Minimize => 1.0,
        OptimizeGoal::Maximize => -1.0,
    };
    let objective = Objective { expr, var, sign };

    let (lo, hi, bracketed, used) = match bounds {
        Some((a, b)) => {
            if !(a.is_finite() && b.is_finite()) || a >= b {
                return Err(CalcError::invalid_input(
                    "bounds",
                    format!("({}, {})", a, b),
                    "lower bound must be below upper bound",
                ));
            }
            (a, b, true, 0)
        }
        None => bracket(&objective, settings.max_iterations),
    };

    let (x, iterations, converged) = golden_section(&objective, lo, hi, settings);
    let value = sign * objective.at(x);
    if !value.is_finite() {
        return Err(CalcError::evaluation_failed(expr.to_string(), format!("undefined at {} = {}", var, x)));
    }
    debug!("{} of {} at {} = {} after {} iterations", goal, expr, var, x, used + iterations);
    Ok(Optimum {
        x,
        value,
        success: bracketed && converged,
        iterations: used + iterations,
    })
}

/// Downhill walk from `[0, 1]`; returns `(lo, hi, found, iterations)`.
fn bracket(objective: &Objective, max_iterations: usize) -> (f64, f64, bool, usize) {
    let (mut a, mut b) = (0.0, 1.0);
    let (mut fa, mut fb) = (objective.at(a), objective.at(b));
    if fb > fa {
        std::mem::swap(&mut a, &mut b);
        std::mem::swap(&mut fa, &mut fb);
    }
    let mut c = b + PHI * (b - a);
    let mut fc = objective.at(c);
    for iteration in 0..max_iterations {
        if fc >= fb {
            return (a.min(c), a.max(c), true, iteration);
        }
        a = b;
        b = c;
        fb = fc;
        c = b + PHI * (b - a);
        fc = objective.at(c);
    }
    (a.min(c), a.max(c), false, max_iterations)
}

/// Golden-section search on `[lo, hi]`; returns `(x, iterations, converged)`.
fn golden_section(objective: &Objective, mut lo: f64, mut hi: f64, settings: &SolverSettings) -> (f64, usize, bool) {
    let tolerance = settings.tolerance.max(1e-12);
    let mut x1 = hi - INV_PHI * (hi - lo);
    let mut x2 = lo + INV_PHI * (hi - lo);
    let (mut f1, mut f2) = (objective.at(x1), objective.at(x2));
    // Each step shrinks the bracket by 0.618, so 200 steps reach machine precision.
    let cap = settings.max_iterations.max(200);
    for iteration in 0..cap {
        if (hi - lo).abs() <= tolerance * (1.0 + x1.abs() + x2.abs()) {
            return ((lo + hi) / 2.0, iteration, true);
        }
        if f1 < f2 {
            hi = x2;
            x2 = x1;
            f2 = f1;
            x1 = hi - INV_PHI * (hi - lo);
            f1 = objective.at(x1);
        } else {
            lo = x1;
            x1 = x2;
            f1 = f2;
            x2 = lo + INV_PHI * (hi - lo);
            f2 = objective.at(x2);
        }
    }
    ((lo + hi) / 2.0, cap, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parse_expression;

    fn run(text: &str, goal: OptimizeGoal, bounds: Option<(f64, f64)>) -> Optimum {
        optimize(&parse_expression(text).unwrap(), "x", goal, bounds, &SolverSettings::default()).unwrap()
    }

    #[test]
    fn test_minimum_unbounded() {
        let optimum = run("(x - 3)^2 + 1", OptimizeGoal::Minimize, None);
        assert!(optimum.success);
        assert!((optimum.x - 3.0).abs() < 1e-5);
        assert!((optimum.value - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_maximum_bounded() {
        let optimum = run("sin(x)", OptimizeGoal::Maximize, Some((0.0, 3.0)));
        assert!((optimum.x - std::f64::consts::FRAC_PI_2).abs() < 1e-5);
        assert!((optimum.value - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_bounded_edge() {
        let optimum = run("x", OptimizeGoal::Minimize, Some((2.0, 5.0)));
        assert!((optimum.x - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_unbounded_below_reports_failure() {
        let settings = SolverSettings { max_iterations: 20, ..SolverSettings::default() };
        let optimum = optimize(&parse_expression("-x").unwrap(), "x", OptimizeGoal::Minimize, None, &settings).unwrap();
        assert!(!optimum.success);
    }

    #[test]
    fn test_invalid_bounds() {
        let expr = parse_expression("x^2").unwrap();
        let err = optimize(&expr, "x", OptimizeGoal::Minimize, Some((1.0, 0.0)), &SolverSettings::default())
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }

    #[test]
    fn test_goal_strings() {
        assert_eq!("max".parse::<OptimizeGoal>().unwrap(), OptimizeGoal::Maximize);
        assert_eq!("Minimize".parse::<OptimizeGoal>().unwrap(), OptimizeGoal::Minimize);
    }
}
