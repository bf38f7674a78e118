//! Built-in functions and unit-free complex evaluation of expression trees.

use num_complex::Complex64;

use crate::errors::{CalcError, CalcResult};

use super::ast::Expr;

/// Names accepted as built-in single-argument functions.
pub const BUILTIN_FUNCTIONS: &[&str] = &[
    "sin", "cos", "tan", "asin", "acos", "atan", "sinh", "cosh", "tanh", "exp", "log", "ln", "log10", "sqrt", "abs",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_FUNCTIONS.contains(&name)
}

/// `ln` is an alias of `log` (natural logarithm).
pub fn canonical_function_name(name: &str) -> &str {
    match name {
        "ln" => "log",
        other => other,
    }
}

fn real(value: f64) -> Complex64 {
    Complex64::new(value, 0.0)
}

/// Apply a built-in function, preferring real arithmetic inside the real domain.
pub fn apply_builtin(name: &str, z: Complex64) -> Option<Complex64> {
    let x = z.re;
    let is_real = z.im == 0.0;
    let value = match canonical_function_name(name) {
        "sin" if is_real => real(x.sin()),
        "sin" => z.sin(),
        "cos" if is_real => real(x.cos()),
        "cos" => z.cos(),
        "tan" if is_real => real(x.tan()),
        "tan" => z.tan(),
        "asin" if is_real && x.abs() <= 1.0 => real(x.asin()),
        "asin" => z.asin(),
        "acos" if is_real && x.abs() <= 1.0 => real(x.acos()),
        "acos" => z.acos(),
        "atan" if is_real => real(x.atan()),
        "atan" => z.atan(),
        "sinh" if is_real => real(x.sinh()),
        "sinh" => z.sinh(),
        "cosh" if is_real => real(x.cosh()),
        "cosh" => z.cosh(),
        "tanh" if is_real => real(x.tanh()),
        "tanh" => z.tanh(),
        "exp" if is_real => real(x.exp()),
        "exp" => z.exp(),
        "log" if is_real && x > 0.0 => real(x.ln()),
        "log" => z.ln(),
        "log10" if is_real && x > 0.0 => real(x.log10()),
        "log10" => z.log10(),
        "sqrt" if is_real && x >= 0.0 => real(x.sqrt()),
        "sqrt" => z.sqrt(),
        "abs" => real(z.norm()),
        _ => return None,
    };
    Some(value)
}

/// Power with exact real results for integer exponents and non-negative bases.
pub fn complex_pow(base: Complex64, exponent: Complex64) -> Complex64 {
    if base.im == 0.0 && exponent.im == 0.0 {
        let (b, e) = (base.re, exponent.re);
        if e.fract() == 0.0 && e.abs() < i32::MAX as f64 {
            return real(b.powi(e as i32));
        }
        if b >= 0.0 {
            return real(b.powf(e));
        }
    }
    if base == Complex64::new(0.0, 0.0) {
        return base;
    }
    base.powc(exponent)
}

/// Evaluate a tree to a complex number, resolving symbols through `lookup`.
pub fn eval_complex<F>(expr: &Expr, lookup: &F) -> CalcResult<Complex64>
where
    F: Fn(&str) -> Option<Complex64>,
{
    let fail = |reason: String| CalcError::evaluation_failed(expr.to_string(), reason);
    let value = match expr {
        Expr::Number(n) => real(*n),
        Expr::Constant(c) => c.value(),
        Expr::Symbol(name) => lookup(name).ok_or_else(|| fail(format!("Symbol '{}' has no value", name)))?,
        Expr::Neg(a) => -eval_complex(a, lookup)?,
        Expr::Add(a, b) => eval_complex(a, lookup)? + eval_complex(b, lookup)?,
        Expr::Sub(a, b) => eval_complex(a, lookup)? - eval_complex(b, lookup)?,
        Expr::Mul(a, b) => eval_complex(a, lookup)? * eval_complex(b, lookup)?,
        Expr::Div(a, b) => {
            let numerator = eval_complex(a, lookup)?;
            let denominator = eval_complex(b, lookup)?;
            if denominator.norm() == 0.0 {
                return Err(fail("Division by zero".to_string()));
            }
            numerator / denominator
        }
        Expr::Pow(a, b) => {
            let base = eval_complex(a, lookup)?;
            let exponent = eval_complex(b, lookup)?;
            if base.norm() == 0.0 && exponent.re < 0.0 {
                return Err(fail("Division by zero".to_string()));
            }
            complex_pow(base, exponent)
        }
        Expr::Call { name, args } => {
            if args.len() != 1 {
                return Err(fail(format!("Function '{}' expects 1 argument, got {}", name, args.len())));
            }
            let arg = eval_complex(&args[0], lookup)?;
            apply_builtin(name, arg).ok_or_else(|| fail(format!("Unknown function '{}'", name)))?
        }
    };
    if value.re.is_nan() || value.im.is_nan() {
        return Err(fail("Result is undefined".to_string()));
    }
    Ok(value)
}

/// Evaluate a tree with no symbols.
pub fn eval_constant(expr: &Expr) -> CalcResult<Complex64> {
    eval_complex(expr, &|_| None)
}

/// Real part when the imaginary part is negligible.
pub fn as_real(z: Complex64) -> Option<f64> {
    if z.im.abs() <= 1e-12 * z.re.abs().max(1.0) {
        Some(z.re)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parse_expression;

    #[test]
    fn test_eval_with_lookup() {
        let expr = parse_expression("2*x + sin(0)").unwrap();
        let value = eval_complex(&expr, &|name| (name == "x").then(|| real(3.0))).unwrap();
        assert!((value.re - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_sqrt_negative_is_complex() {
        let value = apply_builtin("sqrt", real(-4.0)).unwrap();
        assert!(value.re.abs() < 1e-12);
        assert!((value.im - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_log_is_natural() {
        let value = apply_builtin("log", real(std::f64::consts::E)).unwrap();
        assert!((value.re - 1.0).abs() < 1e-12);
        let value = apply_builtin("log10", real(1000.0)).unwrap();
        assert!((value.re - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_division_by_zero() {
        let expr = parse_expression("1/0").unwrap();
        assert_eq!(eval_constant(&expr).unwrap_err().error_code(), "EVALUATION_FAILED");
    }

    #[test]
    fn test_unknown_function() {
        let expr = parse_expression("frobnicate(2)").unwrap();
        assert!(eval_constant(&expr).is_err());
    }
}
