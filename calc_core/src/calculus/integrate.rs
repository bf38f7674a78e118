//! Symbolic antiderivatives.
//!
//! Covers linearity, powers (including `1/u`), exponentials `a^u`, the
//! elementary functions of a linear argument, products of a polynomial
//! with one such factor (tabular integration by parts), `x^n*log(x)`, and
//! anything that expands into these.

use crate::errors::{CalcError, CalcResult};
use crate::expr::numeric::canonical_function_name;
use crate::expr::simplify::{split_coefficient, sum_terms};
use crate::expr::{eval_constant, expand, simplify, Expr};

use super::diff::{derivative, log_of};

/// Bound on nested rule applications.
const MAX_DEPTH: usize = 8;

/// Antiderivative with respect to `var`, simplified, without a constant of integration.
pub fn antiderivative(expr: &Expr, var: &str) -> CalcResult<Expr> {
    let simplified = simplify(expr);
    let result = integrate_sum(&simplified, var, 0).ok_or_else(|| {
        CalcError::non_integrable(simplified.to_string(), var, "no closed-form antiderivative found")
    })?;
    Ok(simplify(&result))
}

/// `F(upper) - F(lower)` plus its numeric value when the bounds are constant.
pub fn definite(expr: &Expr, var: &str, lower: &Expr, upper: &Expr) -> CalcResult<(Expr, Option<f64>)> {
    let antiderivative = antiderivative(expr, var)?;
    let value = simplify(&(antiderivative.substitute(var, upper) - antiderivative.substitute(var, lower)));
    let numeric = if value.free_symbols().is_empty() {
        eval_constant(&value).ok().and_then(crate::expr::numeric::as_real)
    } else {
        None
    };
    Ok((value, numeric))
}

fn integrate_sum(expr: &Expr, var: &str, depth: usize) -> Option<Expr> {
    if depth > MAX_DEPTH {
        return None;
    }
    let terms = sum_terms(expr);
    let mut total: Option<Expr> = None;
    for term in terms {
        let part = integrate_term(&term, var, depth)?;
        total = Some(match total {
            Some(acc) => acc + part,
            None => part,
        });
    }
    Some(total.unwrap_or(Expr::Number(0.0)))
}

/// Flatten a simplified product into its factors.
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

fn product(factors: Vec<Expr>) -> Expr {
    factors.into_iter().reduce(|acc, f| acc * f).unwrap_or(Expr::Number(1.0))
}

fn integrate_term(term: &Expr, var: &str, depth: usize) -> Option<Expr> {
    if !term.contains_symbol(var) {
        return Some(term.clone() * Expr::sym(var));
    }
    let (coeff, body) = split_coefficient(term);
    let (constant, varying): (Vec<Expr>, Vec<Expr>) =
        factors_of(&body).into_iter().partition(|f| !f.contains_symbol(var));
    let scale = Expr::Number(coeff) * product(constant);

    let integral = match varying.as_slice() {
        [single] => integrate_factor(single, var).or_else(|| integrate_expanded(single, var, depth)),
        _ => integrate_product(&varying, var, depth),
    }?;
    Some(scale * integral)
}

/// Retry after expanding products and small powers of sums.
fn integrate_expanded(expr: &Expr, var: &str, depth: usize) -> Option<Expr> {
    let expanded = expand(expr);
    if expanded == simplify(expr) {
        return None;
    }
    integrate_sum(&expanded, var, depth + 1)
}

/// `d u / d var` when `u` is linear in `var`.
fn linear_slope(u: &Expr, var: &str) -> Option<Expr> {
    let slope = simplify(&derivative(u, var).ok()?);
    if slope.contains_symbol(var) || slope.is_number(0.0) {
        return None;
    }
    Some(slope)
}

/// One factor that depends on `var`.
fn integrate_factor(factor: &Expr, var: &str) -> Option<Expr> {
    match factor {
        Expr::Symbol(name) if name == var => Some(Expr::sym(var).powf(2.0) / Expr::Number(2.0)),
        Expr::Pow(base, exponent) if !exponent.contains_symbol(var) => {
            let k = linear_slope(base, var)?;
            let u = (**base).clone();
            if exponent.is_number(-1.0) {
                return Some(Expr::call("log", u) / k);
            }
            let n1 = simplify(&((**exponent).clone() + Expr::Number(1.0)));
            Some(u.pow(n1.clone()) / (n1 * k))
        }
        Expr::Pow(base, exponent) if !base.contains_symbol(var) => {
            // a^u = exp(u*log(a))
            let k = linear_slope(exponent, var)?;
            Some(factor.clone() / (log_of(base) * k))
        }
        Expr::Call { name, args } if args.len() == 1 => {
            let u = args[0].clone();
            let k = linear_slope(&u, var)?;
            let primitive = match canonical_function_name(name) {
                "exp" => Expr::call("exp", u),
                "sin" => -Expr::call("cos", u),
                "cos" => Expr::call("sin", u),
                "tan" => -Expr::call("log", Expr::call("cos", u)),
                "sinh" => Expr::call("cosh", u),
                "cosh" => Expr::call("sinh", u),
                "tanh" => Expr::call("log", Expr::call("cosh", u)),
                "log" => u.clone() * Expr::call("log", u.clone()) - u,
                "log10" => (u.clone() * Expr::call("log", u.clone()) - u) / Expr::call("log", Expr::Number(10.0)),
                "asin" => {
                    u.clone() * Expr::call("asin", u.clone()) + (Expr::Number(1.0) - u.powf(2.0)).powf(0.5)
                }
                "acos" => {
                    u.clone() * Expr::call("acos", u.clone()) - (Expr::Number(1.0) - u.powf(2.0)).powf(0.5)
                }
                "atan" => {
                    u.clone() * Expr::call("atan", u.clone())
                        - Expr::call("log", Expr::Number(1.0) + u.powf(2.0)) / Expr::Number(2.0)
                }
                _ => return None,
            };
            Some(primitive / k)
        }
        _ => None,
    }
}

/// Non-negative integer power of `var`, i.e. a polynomial factor.
fn is_monomial(factor: &Expr, var: &str) -> bool {
    match factor {
        Expr::Symbol(name) => name == var,
        Expr::Pow(base, exponent) => {
            matches!(&**base, Expr::Symbol(name) if name == var)
                && exponent.as_number().is_some_and(|k| k >= 1.0 && k.fract() == 0.0)
        }
        _ => false,
    }
}

fn integrate_product(factors: &[Expr], var: &str, depth: usize) -> Option<Expr> {
    let (poly, rest): (Vec<Expr>, Vec<Expr>) = factors.iter().cloned().partition(|f| is_monomial(f, var));
    match (poly.is_empty(), rest.as_slice()) {
        (false, [other]) if matches!(other, Expr::Call { name, .. } if canonical_function_name(name) == "log") => {
            by_parts_log(&product(poly), other, var, depth)
        }
        (false, [other]) => tabular(&product(poly.clone()), other, var)
            .or_else(|| integrate_expanded(&product(factors.to_vec()), var, depth)),
        _ => integrate_expanded(&product(factors.to_vec()), var, depth),
    }
}

/// `∫ p*g` = `p*G1 - p'*G2 + p''*G3 - ...` for polynomial `p`.
fn tabular(poly: &Expr, g: &Expr, var: &str) -> Option<Expr> {
    let mut p = simplify(poly);
    let mut g_integral = simplify(&integrate_factor(g, var)?);
    let mut sign = 1.0;
    let mut total: Option<Expr> = None;
    for _ in 0..64 {
        let term = Expr::Number(sign) * p.clone() * g_integral.clone();
        total = Some(match total {
            Some(acc) => acc + term,
            None => term,
        });
        p = simplify(&derivative(&p, var).ok()?);
        if p.is_number(0.0) {
            return total;
        }
        g_integral = simplify(&integrate_sum(&g_integral, var, MAX_DEPTH)?);
        sign = -sign;
    }
    None
}

/// `∫ p*log(u)` = `P*log(u) - ∫ P*u'/u`.
fn by_parts_log(poly: &Expr, log_factor: &Expr, var: &str, depth: usize) -> Option<Expr> {
    let p_integral = simplify(&integrate_sum(poly, var, depth + 1)?);
    let remainder = simplify(&(p_integral.clone() * derivative(log_factor, var).ok()?));
    let rest = integrate_sum(&remainder, var, depth + 1)?;
    Some(p_integral * log_factor.clone() - rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculus::diff::differentiate;
    use crate::expr::{eval_complex, parse_expression};
    use num_complex::Complex64;

    fn integral(text: &str) -> Expr {
        antiderivative(&parse_expression(text).unwrap(), "x").unwrap()
    }

    fn at(expr: &Expr, x: f64) -> f64 {
        eval_complex(expr, &|name| (name == "x").then(|| Complex64::new(x, 0.0))).unwrap().re
    }

    /// d/dx F(x) == f(x) at a few sample points.
    fn assert_antiderivative(text: &str) {
        let f = parse_expression(text).unwrap();
        let big_f = integral(text);
        let df = differentiate(&big_f, "x", 1).unwrap();
        for x in [0.3, 0.7, 1.9] {
            assert!((at(&df, x) - at(&f, x)).abs() < 1e-9, "{} -> {} fails at {}", text, big_f, x);
        }
    }

    #[test]
    fn test_power_rule() {
        assert_eq!(integral("x^2").to_string(), "x**3/3");
        assert_eq!(integral("1/x").to_string(), "log(x)");
    }

    #[test]
    fn test_polynomial() {
        assert_antiderivative("3*x^2 + 2*x + 1");
        assert_antiderivative("(x + 1)^3");
        assert_antiderivative("x*(x - 2)");
    }

    #[test]
    fn test_linear_substitution() {
        assert_antiderivative("sin(2*x + 1)");
        assert_antiderivative("exp(-3*x)");
        assert_antiderivative("1/(2*x + 1)");
        assert_antiderivative("sqrt(x)");
        assert_antiderivative("2^x");
    }

    #[test]
    fn test_by_parts() {
        assert_antiderivative("x*exp(x)");
        assert_antiderivative("x^2*sin(x)");
        assert_antiderivative("x*cos(2*x)");
        assert_antiderivative("x*log(x)");
        assert_antiderivative("log(x)");
    }

    #[test]
    fn test_constant_factors_and_symbols() {
        assert_eq!(integral("5").to_string(), "5*x");
        let with_symbol = antiderivative(&parse_expression("a*x").unwrap(), "x").unwrap();
        assert_eq!(with_symbol.to_string(), "a*x**2/2");
    }

    #[test]
    fn test_definite() {
        let expr = parse_expression("x^2").unwrap();
        let (value, numeric) = definite(&expr, "x", &Expr::num(0.0), &Expr::num(3.0)).unwrap();
        assert_eq!(value.to_string(), "9");
        assert!((numeric.unwrap() - 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_non_integrable() {
        let err = antiderivative(&parse_expression("exp(x^2)").unwrap(), "x").unwrap_err();
        assert_eq!(err.error_code(), "NON_INTEGRABLE");
        assert!(antiderivative(&parse_expression("sin(x)/x").unwrap(), "x").is_err());
    }
}
