//! Expansion, polynomial coefficients and numerator/denominator split.

use super::ast::Expr;
use super::simplify::{simplify, sum_terms};

const MAX_EXPANSION_POWER: f64 = 12.0;
pub(crate) const MAX_DEGREE: usize = 64;

/// Distribute products over sums and expand small integer powers of sums.
pub fn expand(expr: &Expr) -> Expr {
    simplify(&expand_inner(&simplify(expr)))
}

fn expand_inner(expr: &Expr) -> Expr {
    match expr {
        Expr::Add(a, b) => expand_inner(a) + expand_inner(b),
        Expr::Sub(a, b) => expand_inner(a) - expand_inner(b),
        Expr::Neg(a) => -expand_inner(a),
        Expr::Mul(a, b) => distribute(&expand_inner(a), &expand_inner(b)),
        Expr::Div(a, b) => distribute(&expand_inner(a), &expand_inner(b).powf(-1.0)),
        Expr::Pow(base, exponent) => match exponent.as_number() {
            Some(k) if k.fract() == 0.0 && (2.0..=MAX_EXPANSION_POWER).contains(&k) => {
                let base = expand_inner(base);
                if sum_terms(&base).len() < 2 {
                    return base.powf(k);
                }
                let mut acc = base.clone();
                for _ in 1..(k as usize) {
                    acc = distribute(&acc, &base);
                }
                acc
            }
            _ => expr.clone(),
        },
        _ => expr.clone(),
    }
}

fn distribute(a: &Expr, b: &Expr) -> Expr {
    let left = sum_terms(a);
    let right = sum_terms(b);
    let mut out: Option<Expr> = None;
    for l in &left {
        for r in &right {
            let term = simplify(&(l.clone() * r.clone()));
            out = Some(match out {
                Some(acc) => acc + term,
                None => term,
            });
        }
    }
    simplify(&out.unwrap_or(Expr::Number(0.0)))
}

/// Split one product term into `(degree in var, remaining factor)`.
fn split_power(term: &Expr, var: &str) -> Option<(usize, Expr)> {
    if !term.contains_symbol(var) {
        return Some((0, term.clone()));
    }
    let mut degree = 0usize;
    let mut rest: Vec<Expr> = Vec::new();
    let mut stack = vec![term.clone()];
    while let Some(factor) = stack.pop() {
        match factor {
            Expr::Mul(a, b) => {
                stack.push(*a);
                stack.push(*b);
            }
            Expr::Symbol(ref name) if name == var => degree += 1,
            Expr::Pow(ref base, ref exponent) if matches!(&**base, Expr::Symbol(n) if n == var) => {
                let k = exponent.as_number()?;
                if k < 0.0 || k.fract() != 0.0 {
                    return None;
                }
                degree += k as usize;
            }
            other if other.contains_symbol(var) => return None,
            other => rest.push(other),
        }
    }
    if degree > MAX_DEGREE {
        return None;
    }
    let rest = rest.into_iter().reduce(|acc, f| acc * f).unwrap_or(Expr::Number(1.0));
    Some((degree, rest))
}

/// Coefficients (ascending powers of `var`) when `expr` is a polynomial in `var`.
///
/// Coefficients may contain other symbols. Returns `None` for anything
/// that is not a polynomial (negative or fractional powers, `var` inside
/// a function call, ...).
pub fn polynomial_coefficients(expr: &Expr, var: &str) -> Option<Vec<Expr>> {
    let expanded = expand(expr);
    let mut coeffs: Vec<Expr> = Vec::new();
    for term in sum_terms(&expanded) {
        let (degree, rest) = split_power(&term, var)?;
        if coeffs.len() <= degree {
            coeffs.resize(degree + 1, Expr::Number(0.0));
        }
        coeffs[degree] = coeffs[degree].clone() + rest;
    }
    let mut coeffs: Vec<Expr> = coeffs.iter().map(simplify).collect();
    while coeffs.len() > 1 && coeffs.last().is_some_and(|c| c.is_number(0.0)) {
        coeffs.pop();
    }
    if coeffs.is_empty() {
        coeffs.push(Expr::Number(0.0));
    }
    Some(coeffs)
}

/// Rewrite `expr` as `numerator / denominator` over a common denominator.
pub fn numer_denom(expr: &Expr) -> (Expr, Expr) {
    let (n, d) = split_fraction(&simplify(expr));
    (simplify(&n), simplify(&d))
}

fn split_fraction(expr: &Expr) -> (Expr, Expr) {
    match expr {
        Expr::Add(a, b) => {
            let (an, ad) = split_fraction(a);
            let (bn, bd) = split_fraction(b);
            if ad == bd {
                return (an + bn, ad);
            }
            (an * bd.clone() + bn * ad.clone(), ad * bd)
        }
        Expr::Sub(a, b) => split_fraction(&(*a.clone() + -*b.clone())),
        Expr::Neg(a) => {
            let (n, d) = split_fraction(a);
            (-n, d)
        }
        Expr::Mul(a, b) => {
            let (an, ad) = split_fraction(a);
            let (bn, bd) = split_fraction(b);
            (an * bn, ad * bd)
        }
        Expr::Div(a, b) => {
            let (an, ad) = split_fraction(a);
            let (bn, bd) = split_fraction(b);
            (an * bd, ad * bn)
        }
        Expr::Pow(base, exponent) => match exponent.as_number() {
            Some(k) if k < 0.0 => {
                let (n, d) = split_fraction(base);
                (d.powf(-k), n.powf(-k))
            }
            _ => (expr.clone(), Expr::Number(1.0)),
        },
        _ => (expr.clone(), Expr::Number(1.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parse_expression;

    fn coeffs(input: &str, var: &str) -> Option<Vec<String>> {
        polynomial_coefficients(&parse_expression(input).unwrap(), var)
            .map(|c| c.iter().map(|e| e.to_string()).collect())
    }

    #[test]
    fn test_expand() {
        let expanded = expand(&parse_expression("(x + 1)^2").unwrap());
        assert_eq!(expanded.to_string(), "x**2 + 2*x + 1");
        let expanded = expand(&parse_expression("(x - 2)*(x + 2)").unwrap());
        assert_eq!(expanded.to_string(), "x**2 - 4");
    }

    #[test]
    fn test_polynomial_coefficients() {
        assert_eq!(coeffs("x^2 - 4", "x"), Some(vec!["-4".into(), "0".into(), "1".into()]));
        assert_eq!(coeffs("a*x + b", "x"), Some(vec!["b".into(), "a".into()]));
        assert_eq!(coeffs("3", "x"), Some(vec!["3".into()]));
        assert_eq!(coeffs("sin(x)", "x"), None);
        assert_eq!(coeffs("1/x", "x"), None);
    }

    #[test]
    fn test_numer_denom() {
        let (n, d) = numer_denom(&parse_expression("1/x + 1").unwrap());
        assert_eq!(expand(&n).to_string(), "x + 1");
        assert_eq!(d.to_string(), "x");
    }
}
