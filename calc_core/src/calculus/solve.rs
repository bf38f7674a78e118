//! Equation solving.
//!
//! Symbolic solving clears denominators and then tries, in order:
//!
//! 1. closed-form roots of polynomials up to degree two (coefficients may
//!    be symbolic),
//! 2. companion-matrix eigenvalues for higher-degree polynomials with
//!    numeric coefficients,
//! 3. isolation of a single occurrence of the unknown through inverse
//!    functions (`exp`/`log`, powers, trigonometric functions).
//!
//! Numeric solving runs Newton's method from a fixed initial guess and
//! returns at most one root.

use log::debug;
use nalgebra::DMatrix;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::errors::{CalcError, CalcResult};
use crate::expr::numeric::{as_real, canonical_function_name};
use crate::expr::simplify::{split_coefficient, sum_terms};
use crate::expr::{eval_complex, eval_constant, numer_denom, polynomial_coefficients, simplify, Constant, Expr};
use crate::settings::SolverSettings;

use super::diff::{derivative, log_of};

/// Solving strategy requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SolveMethod {
    /// All closed-form roots
    #[default]
    Symbolic,
    /// One root by local root finding
    Numeric,
}

/// Roots within this distance of an integer snap to it.
const SNAP_TOL: f64 = 1e-9;
/// Residual accepted when checking a candidate root.
const CHECK_TOL: f64 = 1e-8;

/// `lhs - rhs` as a single tree.
pub fn residual(lhs: &Expr, rhs: &Expr) -> Expr {
    if rhs.is_number(0.0) {
        lhs.clone()
    } else {
        lhs.clone() - rhs.clone()
    }
}

/// Every closed-form root of `f = 0` in `var`, simplified.
pub fn solve_symbolic(f: &Expr, var: &str) -> CalcResult<Vec<Expr>> {
    let no_solution = |reason: &str| CalcError::no_solution(format!("{} = 0", f), var, reason);
    let f = simplify(f);
    if !f.contains_symbol(var) {
        return Err(no_solution(if f.is_number(0.0) {
            "the equation holds for every value"
        } else {
            "the unknown does not appear in the equation"
        }));
    }

    let (numerator, denominator) = numer_denom(&f);
    let candidates = match polynomial_coefficients(&numerator, var) {
        Some(coeffs) if coeffs.len() > 1 => {
            debug!("solving polynomial of degree {} in {}", coeffs.len() - 1, var);
            polynomial_roots(&coeffs)
        }
        _ => isolate(&f, var).map(|roots| roots.into_iter().filter(|r| satisfies(&f, var, r)).collect()),
    }
    .ok_or_else(|| no_solution("no closed-form solution found; try the numeric method"))?;

    let mut roots: Vec<Expr> = Vec::new();
    for root in candidates {
        let root = simplify(&root);
        if makes_zero(&denominator, var, &root) || roots.contains(&root) {
            continue;
        }
        roots.push(root);
    }
    if roots.is_empty() {
        return Err(no_solution("no root satisfies the equation"));
    }
    sort_roots(&mut roots);
    Ok(roots)
}

/// One real root by Newton's method.
pub fn solve_numeric(f: &Expr, var: &str, settings: &SolverSettings) -> CalcResult<f64> {
    let f = simplify(f);
    let no_solution = |reason: String| CalcError::no_solution(format!("{} = 0", f), var, reason);
    let other: Vec<String> = f.free_symbols().into_iter().filter(|s| s != var).collect();
    if !other.is_empty() {
        return Err(no_solution(format!("symbols without values: {}", other.join(", "))));
    }
    let df = simplify(&derivative(&f, var)?);
    let at = |expr: &Expr, x: f64| -> CalcResult<f64> {
        let z = eval_complex(expr, &|name| (name == var).then(|| Complex64::new(x, 0.0)))?;
        as_real(z).ok_or_else(|| no_solution(format!("complex value at {} = {}", var, x)))
    };

    let mut x = settings.initial_guess;
    for iteration in 0..settings.max_iterations {
        let fx = at(&f, x)?;
        if fx.abs() <= settings.tolerance {
            debug!("newton converged after {} iterations", iteration);
            return Ok(x);
        }
        let slope = at(&df, x)?;
        if slope == 0.0 || !slope.is_finite() {
            return Err(no_solution(format!("derivative vanished at {} = {}", var, x)));
        }
        let step = fx / slope;
        x -= step;
        if step.abs() <= settings.tolerance * x.abs().max(1.0) {
            let residual = at(&f, x)?;
            if residual.abs() <= CHECK_TOL.max(settings.tolerance) {
                debug!("newton converged after {} iterations", iteration + 1);
                return Ok(x);
            }
        }
    }
    Err(no_solution(format!("no convergence within {} iterations", settings.max_iterations)))
}

/// Numeric value of a root when it has no free symbols.
pub fn root_value(root: &Expr) -> Option<Complex64> {
    if !root.free_symbols().is_empty() {
        return None;
    }
    eval_constant(root).ok()
}

fn makes_zero(denominator: &Expr, var: &str, root: &Expr) -> bool {
    if !denominator.contains_symbol(var) {
        return false;
    }
    let value = simplify(&denominator.substitute(var, root));
    match root_value(&value) {
        Some(z) => z.norm() < 1e-12,
        None => value.is_number(0.0),
    }
}

/// Check a candidate root by substitution where it can be evaluated.
fn satisfies(f: &Expr, var: &str, root: &Expr) -> bool {
    let substituted = f.substitute(var, root);
    if !substituted.free_symbols().is_empty() {
        return true;
    }
    match eval_constant(&substituted) {
        Ok(z) => z.norm() <= CHECK_TOL,
        Err(_) => false,
    }
}

fn sort_roots(roots: &mut [Expr]) {
    if roots.iter().all(|r| root_value(r).is_some()) {
        roots.sort_by(|a, b| {
            let (za, zb) = (root_value(a).unwrap_or_default(), root_value(b).unwrap_or_default());
            za.re.total_cmp(&zb.re).then(za.im.total_cmp(&zb.im))
        });
    }
}

fn numeric_coefficients(coeffs: &[Expr]) -> Option<Vec<f64>> {
    coeffs.iter().map(|c| c.as_number()).collect()
}

/// Roots of `sum(coeffs[k] * x^k)`.
fn polynomial_roots(coeffs: &[Expr]) -> Option<Vec<Expr>> {
    match coeffs {
        [c0, c1] => Some(vec![-c0.clone() / c1.clone()]),
        [c, b, a] => Some(quadratic_roots(a, b, c)),
        _ => {
            let numeric = numeric_coefficients(coeffs)?;
            Some(companion_roots(&numeric).into_iter().map(complex_expr).collect())
        }
    }
}

fn quadratic_roots(a: &Expr, b: &Expr, c: &Expr) -> Vec<Expr> {
    let two_a = Expr::Number(2.0) * a.clone();
    let discriminant = simplify(&(b.clone().powf(2.0) - Expr::Number(4.0) * a.clone() * c.clone()));
    match discriminant.as_number() {
        Some(d) if d < 0.0 => {
            let re = simplify(&(-b.clone() / two_a.clone()));
            let im = simplify(&(Expr::Number(-d).powf(0.5) / two_a));
            let i = Expr::Constant(Constant::I);
            vec![re.clone() - im.clone() * i.clone(), re + im * i]
        }
        Some(d) if d == 0.0 => vec![-b.clone() / two_a],
        _ => {
            let root = discriminant.powf(0.5);
            vec![
                (-b.clone() - root.clone()) / two_a.clone(),
                (-b.clone() + root) / two_a,
            ]
        }
    }
}

/// Eigenvalues of the companion matrix, polished by Newton steps.
fn companion_roots(coeffs: &[f64]) -> Vec<Complex64> {
    let n = coeffs.len() - 1;
    let lead = coeffs[n];
    let companion = DMatrix::<f64>::from_fn(n, n, |row, col| {
        if row == 0 {
            -coeffs[n - 1 - col] / lead
        } else if row == col + 1 {
            1.0
        } else {
            0.0
        }
    });
    companion
        .complex_eigenvalues()
        .iter()
        .map(|&z| snap(polish(coeffs, z)))
        .collect()
}

fn horner(coeffs: &[f64], z: Complex64) -> (Complex64, Complex64) {
    let mut value = Complex64::new(0.0, 0.0);
    let mut slope = Complex64::new(0.0, 0.0);
    for &c in coeffs.iter().rev() {
        slope = slope * z + value;
        value = value * z + c;
    }
    (value, slope)
}

fn polish(coeffs: &[f64], mut z: Complex64) -> Complex64 {
    for _ in 0..20 {
        let (value, slope) = horner(coeffs, z);
        if slope.norm() == 0.0 {
            break;
        }
        let step = value / slope;
        z -= step;
        if step.norm() <= 1e-15 * z.norm().max(1.0) {
            break;
        }
    }
    z
}

fn snap(z: Complex64) -> Complex64 {
    let snap_part = |x: f64| {
        let rounded = x.round();
        if (x - rounded).abs() <= SNAP_TOL * x.abs().max(1.0) {
            rounded + 0.0
        } else {
            x
        }
    };
    let im = if z.im.abs() <= SNAP_TOL * z.re.abs().max(1.0) { 0.0 } else { snap_part(z.im) };
    Complex64::new(snap_part(z.re), im)
}

fn complex_expr(z: Complex64) -> Expr {
    if z.im == 0.0 {
        Expr::Number(z.re)
    } else {
        Expr::Number(z.re) + Expr::Number(z.im) * Expr::Constant(Constant::I)
    }
}

/// Solve `f = 0` when exactly one term contains `var`.
fn isolate(f: &Expr, var: &str) -> Option<Vec<Expr>> {
    let (with_var, without): (Vec<Expr>, Vec<Expr>) = sum_terms(f).into_iter().partition(|t| t.contains_symbol(var));
    let [term] = with_var.as_slice() else {
        return None;
    };
    let rest = without.into_iter().reduce(|acc, t| acc + t).unwrap_or(Expr::Number(0.0));
    invert(term, simplify(&-rest), var)
}

/// Values of `var` for which `expr == target`.
fn invert(expr: &Expr, target: Expr, var: &str) -> Option<Vec<Expr>> {
    match expr {
        Expr::Symbol(name) if name == var => Some(vec![target]),
        Expr::Mul(..) => {
            let (coeff, body) = split_coefficient(expr);
            let mut constant = Expr::Number(coeff);
            let mut varying = None;
            for factor in factors_of(&body) {
                if !factor.contains_symbol(var) {
                    constant = constant * factor;
                } else if varying.replace(factor).is_some() {
                    return None;
                }
            }
            invert(&varying?, simplify(&(target / constant)), var)
        }
        Expr::Pow(base, exponent) if !exponent.contains_symbol(var) => {
            let root = simplify(&target.clone().pow(Expr::Number(1.0) / (**exponent).clone()));
            let even = exponent.as_number().is_some_and(|k| k.fract() == 0.0 && k % 2.0 == 0.0);
            let mut targets = vec![root.clone()];
            if even {
                targets.insert(0, simplify(&-root));
            }
            invert_each(base, targets, var)
        }
        Expr::Pow(base, exponent) if !base.contains_symbol(var) => {
            invert(exponent, simplify(&(Expr::call("log", target) / log_of(base))), var)
        }
        Expr::Call { name, args } if args.len() == 1 => {
            let u = &args[0];
            let pi = Expr::Constant(Constant::Pi);
            let targets = match canonical_function_name(name) {
                "exp" => vec![Expr::call("log", target)],
                "log" => vec![Expr::call("exp", target)],
                "log10" => vec![Expr::Number(10.0).pow(target)],
                "sin" => vec![Expr::call("asin", target.clone()), pi - Expr::call("asin", target)],
                "cos" => vec![Expr::call("acos", target.clone()), Expr::Number(2.0) * pi - Expr::call("acos", target)],
                "tan" => vec![Expr::call("atan", target)],
                "asin" => vec![Expr::call("sin", target)],
                "acos" => vec![Expr::call("cos", target)],
                "atan" => vec![Expr::call("tan", target)],
                "abs" => vec![-target.clone(), target],
                _ => return None,
            };
            invert_each(u, targets.iter().map(simplify).collect(), var)
        }
        _ => None,
    }
}

fn invert_each(expr: &Expr, targets: Vec<Expr>, var: &str) -> Option<Vec<Expr>> {
    let mut roots = Vec::new();
    for target in targets {
        roots.extend(invert(expr, target, var)?);
    }
    Some(roots)
}

fn factors_of(expr: &Expr) -> Vec<Expr> {
    match expr {
        Expr::Mul(a, b) => {
            let mut out = factors_of(a);
            out.extend(factors_of(b));
            out
        }
        other => vec![other.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{parse_equation, parse_expression};

    fn roots(equation: &str) -> Vec<String> {
        let (lhs, rhs) = parse_equation(equation).unwrap();
        solve_symbolic(&residual(&lhs, &rhs), "x")
            .unwrap()
            .iter()
            .map(|r| r.to_string())
            .collect()
    }

    fn values(equation: &str) -> Vec<Complex64> {
        let (lhs, rhs) = parse_equation(equation).unwrap();
        solve_symbolic(&residual(&lhs, &rhs), "x")
            .unwrap()
            .iter()
            .map(|r| root_value(r).unwrap())
            .collect()
    }

    #[test]
    fn test_quadratic() {
        assert_eq!(roots("x^2 - 4 = 0"), vec!["-2", "2"]);
        assert_eq!(roots("x^2 = 4"), vec!["-2", "2"]);
    }

    #[test]
    fn test_linear() {
        assert_eq!(roots("2*x + 3 = 7"), vec!["2"]);
        assert_eq!(roots("x/4 = 1"), vec!["4"]);
    }

    #[test]
    fn test_linear_symbolic_coefficients() {
        let (lhs, rhs) = parse_equation("a*x + b = 0").unwrap();
        let roots = solve_symbolic(&residual(&lhs, &rhs), "x").unwrap();
        assert_eq!(roots.len(), 1);
        let value = eval_complex(&roots[0], &|name| match name {
            "a" => Some(Complex64::new(2.0, 0.0)),
            "b" => Some(Complex64::new(6.0, 0.0)),
            _ => None,
        })
        .unwrap();
        assert!((value.re + 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_complex_roots() {
        let found = values("x^2 + 1 = 0");
        assert_eq!(found.len(), 2);
        assert!((found[0].im + 1.0).abs() < 1e-12);
        assert!((found[1].im - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_irrational_roots() {
        let found = values("x^2 = 2");
        assert!((found[0].re + 2f64.sqrt()).abs() < 1e-12);
        assert!((found[1].re - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_cubic() {
        assert_eq!(roots("x^3 - 6*x^2 + 11*x - 6 = 0"), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_rational_equation_excludes_poles() {
        // (x^2 - 1)/(x - 1) = 0 has no root at the pole x = 1
        assert_eq!(roots("(x^2 - 1)/(x - 1) = 0"), vec!["-1"]);
        assert_eq!(roots("1/x = 2"), vec!["1/2"]);
    }

    #[test]
    fn test_isolation() {
        let found = values("exp(x) = 5");
        assert!((found[0].re - 5f64.ln()).abs() < 1e-12);
        let found = values("sqrt(x) = 3");
        assert!((found[0].re - 9.0).abs() < 1e-12);
        assert!(solve_symbolic(&parse_expression("sqrt(x) + 3").unwrap(), "x").is_err());
    }

    #[test]
    fn test_no_unknown() {
        let err = solve_symbolic(&parse_expression("y + 1").unwrap(), "x").unwrap_err();
        assert_eq!(err.error_code(), "NO_SOLUTION");
    }

    #[test]
    fn test_numeric_newton() {
        let f = parse_expression("x^2 - 2").unwrap();
        let root = solve_numeric(&f, "x", &SolverSettings::default()).unwrap();
        assert!((root - 2f64.sqrt()).abs() < 1e-9);

        let f = parse_expression("cos(x) - x").unwrap();
        let root = solve_numeric(&f, "x", &SolverSettings::default()).unwrap();
        assert!((root.cos() - root).abs() < 1e-9);
    }

    #[test]
    fn test_numeric_iteration_cap() {
        let f = parse_expression("x^2 + 1").unwrap();
        let settings = SolverSettings { max_iterations: 10, ..SolverSettings::default() };
        assert!(solve_numeric(&f, "x", &settings).is_err());
    }

    #[test]
    fn test_method_strings() {
        assert_eq!("numeric".parse::<SolveMethod>().unwrap(), SolveMethod::Numeric);
        assert_eq!(SolveMethod::default().to_string(), "symbolic");
    }
}
