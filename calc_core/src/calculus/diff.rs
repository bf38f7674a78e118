//! Symbolic differentiation by syntactic rules.

use crate::errors::{CalcError, CalcResult};
use crate::expr::numeric::canonical_function_name;
use crate::expr::{simplify, Constant, Expr};

/// `d expr / d var`, unsimplified.
pub fn derivative(expr: &Expr, var: &str) -> CalcResult<Expr> {
    if !expr.contains_symbol(var) {
        return Ok(Expr::Number(0.0));
    }
    Ok(match expr {
        Expr::Number(_) | Expr::Constant(_) => Expr::Number(0.0),
        Expr::Symbol(name) => Expr::Number(if name == var { 1.0 } else { 0.0 }),
        Expr::Neg(a) => -derivative(a, var)?,
        Expr::Add(a, b) => derivative(a, var)? + derivative(b, var)?,
        Expr::Sub(a, b) => derivative(a, var)? - derivative(b, var)?,
        Expr::Mul(a, b) => {
            derivative(a, var)? * (**b).clone() + (**a).clone() * derivative(b, var)?
        }
        Expr::Div(a, b) => {
            let (u, v) = ((**a).clone(), (**b).clone());
            (derivative(a, var)? * v.clone() - u * derivative(b, var)?) / v.powf(2.0)
        }
        Expr::Pow(base, exponent) => {
            let (b, e) = ((**base).clone(), (**exponent).clone());
            if !exponent.contains_symbol(var) {
                // d(u^n) = n*u^(n-1)*u'
                e.clone() * b.pow(e - Expr::Number(1.0)) * derivative(base, var)?
            } else if !base.contains_symbol(var) {
                // d(a^v) = a^v*log(a)*v'
                b.clone().pow(e) * Expr::call("log", b) * derivative(exponent, var)?
            } else {
                // d(u^v) = u^v*(v'*log(u) + v*u'/u)
                let log_u = Expr::call("log", b.clone());
                b.clone().pow(e.clone())
                    * (derivative(exponent, var)? * log_u + e * derivative(base, var)? / b)
            }
        }
        Expr::Call { name, args } => {
            if args.len() != 1 {
                return Err(CalcError::evaluation_failed(
                    expr.to_string(),
                    format!("Function '{}' expects 1 argument, got {}", name, args.len()),
                ));
            }
            let u = args[0].clone();
            let du = derivative(&u, var)?;
            let outer = match canonical_function_name(name) {
                "sin" => Expr::call("cos", u),
                "cos" => -Expr::call("sin", u),
                "tan" => Expr::call("cos", u).powf(-2.0),
                "asin" => (Expr::Number(1.0) - u.powf(2.0)).powf(-0.5),
                "acos" => -(Expr::Number(1.0) - u.powf(2.0)).powf(-0.5),
                "atan" => (Expr::Number(1.0) + u.powf(2.0)).powf(-1.0),
                "sinh" => Expr::call("cosh", u),
                "cosh" => Expr::call("sinh", u),
                "tanh" => Expr::call("cosh", u).powf(-2.0),
                "exp" => Expr::call("exp", u),
                "log" => u.powf(-1.0),
                "log10" => (u * Expr::call("log", Expr::Number(10.0))).powf(-1.0),
                "sqrt" => Expr::Number(0.5) * u.powf(-0.5),
                "abs" => u.clone() / Expr::call("abs", u),
                _ => {
                    return Err(CalcError::evaluation_failed(
                        expr.to_string(),
                        format!("Cannot differentiate unknown function '{}'", name),
                    ))
                }
            };
            outer * du
        }
    })
}

/// `n`-th derivative, simplified after every step.
pub fn differentiate(expr: &Expr, var: &str, order: u32) -> CalcResult<Expr> {
    if order == 0 {
        return Err(CalcError::invalid_input("order", "0", "Order must be at least 1"));
    }
    let mut current = simplify(expr);
    for _ in 0..order {
        current = simplify(&derivative(&current, var)?);
    }
    Ok(current)
}

/// Natural log of a constant base; `E` collapses to 1.
pub(crate) fn log_of(base: &Expr) -> Expr {
    match base {
        Expr::Constant(Constant::E) => Expr::Number(1.0),
        other => Expr::call("log", other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{eval_complex, parse_expression};
    use num_complex::Complex64;

    fn d(text: &str, order: u32) -> String {
        differentiate(&parse_expression(text).unwrap(), "x", order).unwrap().to_string()
    }

    fn slope_at(text: &str, x: f64) -> f64 {
        let expr = differentiate(&parse_expression(text).unwrap(), "x", 1).unwrap();
        eval_complex(&expr, &|name| (name == "x").then(|| Complex64::new(x, 0.0))).unwrap().re
    }

    #[test]
    fn test_power_rule() {
        assert_eq!(d("x^3", 1), "3*x**2");
        assert_eq!(d("x^3", 2), "6*x");
        assert_eq!(d("x^3", 4), "0");
    }

    #[test]
    fn test_linearity() {
        assert_eq!(d("x^2 + 3*x + 1", 1), "2*x + 3");
    }

    #[test]
    fn test_chain_rule_numeric() {
        assert!((slope_at("sin(x^2)", 1.0) - 2.0 * 1.0f64.cos()).abs() < 1e-12);
        assert!((slope_at("exp(2*x)", 0.0) - 2.0).abs() < 1e-12);
        assert!((slope_at("log(x)", 4.0) - 0.25).abs() < 1e-12);
        assert!((slope_at("sqrt(x)", 4.0) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_quotient_and_product_numeric() {
        // d/dx x/(x+1) = 1/(x+1)^2
        assert!((slope_at("x/(x+1)", 1.0) - 0.25).abs() < 1e-12);
        // d/dx x*cos(x) = cos(x) - x*sin(x)
        let expected = 2.0f64.cos() - 2.0 * 2.0f64.sin();
        assert!((slope_at("x*cos(x)", 2.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_variable_exponent() {
        // d/dx 2^x = 2^x*log(2)
        assert!((slope_at("2^x", 3.0) - 8.0 * 2.0f64.ln()).abs() < 1e-12);
        // d/dx x^x = x^x*(log(x) + 1)
        assert!((slope_at("x^x", 2.0) - 4.0 * (2.0f64.ln() + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_other_symbols_are_constants() {
        assert_eq!(d("a*x^2", 1), "2*a*x");
    }

    #[test]
    fn test_order_zero_rejected() {
        let expr = parse_expression("x").unwrap();
        assert_eq!(differentiate(&expr, "x", 0).unwrap_err().error_code(), "INVALID_INPUT");
    }
}
