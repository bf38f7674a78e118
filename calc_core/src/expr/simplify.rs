//! Algebraic simplification.
//!
//! Output shape: sums are left-folded `Add` chains with the constant term
//! last; products are `coefficient * factor * ...` with the coefficient
//! first and factors sorted (numbers, constants, symbols, calls, the rest);
//! subtraction, negation and division only survive as negative coefficients
//! and negative exponents. `sqrt(x)` becomes `x**(1/2)` and `E**x` becomes
//! `exp(x)`.

use std::cmp::Ordering;

use super::ast::{Constant, Expr};
use super::numeric::{apply_builtin, as_real, canonical_function_name, eval_constant, is_builtin};

const ZERO_TOL: f64 = 1e-12;

pub fn simplify(expr: &Expr) -> Expr {
    match expr {
        Expr::Add(..) | Expr::Sub(..) | Expr::Neg(..) => simplify_sum(expr),
        Expr::Mul(..) | Expr::Div(..) => {
            let mut product = Product::default();
            product.absorb(expr, 1.0);
            product.build()
        }
        Expr::Pow(base, exponent) => simplify_power(base, exponent),
        Expr::Call { name, args } => simplify_call(name, args),
        Expr::Number(n) => Expr::Number(*n + 0.0),
        Expr::Constant(_) | Expr::Symbol(_) => expr.clone(),
    }
}

fn add_coefficients(a: f64, b: f64) -> f64 {
    let sum = a + b;
    if sum.abs() <= ZERO_TOL * a.abs().max(b.abs()) {
        0.0
    } else {
        sum
    }
}

fn is_integer(x: f64) -> bool {
    x.is_finite() && x.fract() == 0.0
}

fn near_integer(x: f64) -> Option<f64> {
    let rounded = x.round();
    if x.is_finite() && (x - rounded).abs() <= 1e-9 * x.abs().max(1.0) {
        Some(rounded + 0.0)
    } else {
        None
    }
}

/// Split a simplified term into its numeric coefficient and the rest.
pub fn split_coefficient(term: &Expr) -> (f64, Expr) {
    match term {
        Expr::Number(n) => (*n, Expr::Number(1.0)),
        Expr::Mul(a, b) => match a.as_number() {
            Some(c) => (c, (**b).clone()),
            None => (1.0, term.clone()),
        },
        _ => (1.0, term.clone()),
    }
}

fn scale_term(coeff: f64, key: Expr) -> Expr {
    if key.is_number(1.0) {
        Expr::Number(coeff)
    } else if coeff == 1.0 {
        key
    } else {
        Expr::Number(coeff) * key
    }
}

/// Flatten `+`, `-` and negation into signed, simplified terms.
pub fn sum_terms(expr: &Expr) -> Vec<Expr> {
    let mut leaves = Vec::new();
    gather_terms(expr, 1.0, &mut leaves);
    leaves
        .into_iter()
        .map(|(sign, leaf)| if sign < 0.0 { simplify(&-leaf) } else { leaf })
        .collect()
}

fn gather_terms(expr: &Expr, sign: f64, out: &mut Vec<(f64, Expr)>) {
    match expr {
        Expr::Add(a, b) => {
            gather_terms(a, sign, out);
            gather_terms(b, sign, out);
        }
        Expr::Sub(a, b) => {
            gather_terms(a, sign, out);
            gather_terms(b, -sign, out);
        }
        Expr::Neg(a) => gather_terms(a, -sign, out),
        _ => {
            let simplified = simplify(expr);
            if matches!(simplified, Expr::Add(..) | Expr::Sub(..) | Expr::Neg(..)) {
                gather_terms(&simplified, sign, out);
            } else {
                out.push((sign, simplified));
            }
        }
    }
}

/// Total numeric power of symbols in a term, used for ordering.
pub fn degree(expr: &Expr) -> f64 {
    match expr {
        Expr::Symbol(_) => 1.0,
        Expr::Pow(base, exponent) => match (&**base, exponent.as_number()) {
            (Expr::Symbol(_), Some(k)) => k,
            _ => 0.0,
        },
        Expr::Mul(a, b) => degree(a) + degree(b),
        _ => 0.0,
    }
}

fn term_order(a: &Expr, b: &Expr) -> Ordering {
    degree(b)
        .total_cmp(&degree(a))
        .then_with(|| a.to_string().cmp(&b.to_string()))
}

fn simplify_sum(expr: &Expr) -> Expr {
    let mut leaves = Vec::new();
    gather_terms(expr, 1.0, &mut leaves);

    let mut constant = 0.0;
    let mut terms: Vec<(Expr, f64)> = Vec::new();
    for (sign, leaf) in leaves {
        let (c, key) = split_coefficient(&leaf);
        let c = sign * c;
        if key.is_number(1.0) {
            constant = add_coefficients(constant, c);
            continue;
        }
        match terms.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = add_coefficients(entry.1, c),
            None => terms.push((key, c)),
        }
    }
    terms.retain(|(_, c)| *c != 0.0);
    terms.sort_by(|a, b| term_order(&a.0, &b.0));

    let mut parts: Vec<Expr> = terms.into_iter().map(|(key, c)| scale_term(c, key)).collect();
    if constant != 0.0 || parts.is_empty() {
        parts.push(Expr::Number(constant + 0.0));
    }
    parts.into_iter().reduce(|acc, t| acc + t).unwrap_or(Expr::Number(0.0))
}

fn factor_rank(expr: &Expr) -> u8 {
    let base = match expr {
        Expr::Pow(b, _) => &**b,
        other => other,
    };
    match base {
        Expr::Number(_) => 0,
        Expr::Constant(_) => 1,
        Expr::Symbol(_) => 2,
        Expr::Call { .. } => 3,
        _ => 4,
    }
}

fn factor_key(expr: &Expr) -> String {
    match expr {
        Expr::Pow(b, _) => b.to_string(),
        other => other.to_string(),
    }
}

fn factor_order(a: &Expr, b: &Expr) -> Ordering {
    factor_rank(a)
        .cmp(&factor_rank(b))
        .then_with(|| factor_key(a).cmp(&factor_key(b)))
        .then_with(|| a.to_string().cmp(&b.to_string()))
}

/// Assemble `coeff * f1 * f2 * ...` in canonical order.
///
/// A numeric coefficient on a lone sum is distributed over its terms.
pub fn build_product(coeff: f64, mut factors: Vec<Expr>) -> Expr {
    if coeff == 0.0 {
        return Expr::Number(0.0);
    }
    if factors.len() == 1 && coeff != 1.0 && matches!(factors[0], Expr::Add(..)) {
        let distributed = sum_terms(&factors[0])
            .into_iter()
            .map(|t| Expr::Number(coeff) * t)
            .reduce(|acc, t| acc + t)
            .unwrap_or(Expr::Number(0.0));
        return simplify_sum(&distributed);
    }
    factors.sort_by(factor_order);
    match factors.into_iter().reduce(|acc, f| acc * f) {
        None => Expr::Number(coeff + 0.0),
        Some(body) if coeff == 1.0 => body,
        Some(body) => Expr::Number(coeff) * body,
    }
}

/// Whether `(b**k)**power` may be rewritten as `b**(k*power)`.
fn combinable(k: f64, power: f64) -> bool {
    is_integer(power) || !(is_integer(k) && k % 2.0 == 0.0)
}

#[derive(Debug, Default)]
struct Product {
    coeff: Option<f64>,
    factors: Vec<(Expr, Expr)>,
}

impl Product {
    fn coeff(&self) -> f64 {
        self.coeff.unwrap_or(1.0)
    }

    fn scale(&mut self, by: f64) {
        self.coeff = Some(self.coeff() * by);
    }

    fn absorb(&mut self, expr: &Expr, power: f64) {
        match expr {
            Expr::Mul(a, b) => {
                self.absorb(a, power);
                self.absorb(b, power);
            }
            Expr::Div(a, b) => {
                self.absorb(a, power);
                self.absorb(b, -power);
            }
            Expr::Neg(a) if is_integer(power) => {
                self.absorb_number(-1.0, power);
                self.absorb(a, power);
            }
            _ => {
                let simplified = simplify(expr);
                match &simplified {
                    Expr::Number(n) => self.absorb_number(*n, power),
                    Expr::Mul(..) => self.absorb(&simplified, power),
                    Expr::Pow(base, exponent) => match exponent.as_number() {
                        Some(k) if combinable(k, power) => self.absorb(base, k * power),
                        Some(_) => self.push(simplified.clone(), Expr::Number(power)),
                        None => {
                            let exponent = if power == 1.0 {
                                (**exponent).clone()
                            } else {
                                simplify(&(Expr::Number(power) * (**exponent).clone()))
                            };
                            self.push((**base).clone(), exponent);
                        }
                    },
                    _ => self.push(simplified, Expr::Number(power)),
                }
            }
        }
    }

    fn absorb_number(&mut self, n: f64, power: f64) {
        if power == 1.0 {
            self.scale(n);
            return;
        }
        if is_integer(power) {
            if n == 0.0 && power < 0.0 {
                self.push(Expr::Number(0.0), Expr::Number(power));
            } else {
                self.scale(n.powi(power as i32));
            }
            return;
        }
        if n == 0.0 && power > 0.0 {
            self.scale(0.0);
            return;
        }
        if n > 0.0 {
            let value = n.powf(power);
            if let Some(whole) = near_integer(value) {
                self.scale(whole);
                return;
            }
            if let Some(inverse) = near_integer(1.0 / value) {
                self.scale(1.0 / inverse);
                return;
            }
        }
        self.push(Expr::Number(n), Expr::Number(power));
    }

    fn push(&mut self, base: Expr, exponent: Expr) {
        if let Some(entry) = self.factors.iter_mut().find(|(b, _)| *b == base) {
            entry.1 = match (entry.1.as_number(), exponent.as_number()) {
                (Some(a), Some(b)) => Expr::Number(add_coefficients(a, b)),
                _ => simplify(&(entry.1.clone() + exponent)),
            };
        } else {
            self.factors.push((base, exponent));
        }
    }

    fn build(self) -> Expr {
        let mut coeff = self.coeff();
        let mut factors = Vec::new();
        for (base, exponent) in self.factors {
            let k = exponent.as_number();
            if k == Some(0.0) {
                continue;
            }
            match (&base, k) {
                (Expr::Number(n), Some(k)) => {
                    let mut folded = Product::default();
                    folded.absorb_number(*n, k);
                    if folded.factors.is_empty() {
                        coeff *= folded.coeff();
                    } else {
                        factors.push(base.clone().powf(k));
                    }
                }
                (Expr::Constant(Constant::E), _) => factors.push(simplify_call("exp", &[exponent])),
                (_, Some(k)) if k == 1.0 => factors.push(base),
                _ => factors.push(Expr::Pow(Box::new(base), Box::new(exponent))),
            }
        }
        build_product(coeff, factors)
    }
}

fn simplify_power(base: &Expr, exponent: &Expr) -> Expr {
    let base = simplify(base);
    let exponent = simplify(exponent);
    if let Expr::Constant(Constant::E) = base {
        return simplify_call("exp", &[exponent]);
    }
    match exponent.as_number() {
        Some(k) => {
            let mut product = Product::default();
            product.absorb(&base, k);
            product.build()
        }
        None if base.is_number(1.0) => Expr::Number(1.0),
        None => base.pow(exponent),
    }
}

fn simplify_call(name: &str, args: &[Expr]) -> Expr {
    let name = canonical_function_name(name);
    let args: Vec<Expr> = args.iter().map(simplify).collect();

    if args.len() == 1 {
        let arg = &args[0];
        match (name, arg) {
            ("sqrt", _) => return simplify_power(arg, &Expr::Number(0.5)),
            ("abs", Expr::Number(n)) => return Expr::Number(n.abs()),
            ("exp", Expr::Call { name: inner, args: inner_args }) if inner == "log" && inner_args.len() == 1 => {
                return inner_args[0].clone();
            }
            ("log", Expr::Call { name: inner, args: inner_args }) if inner == "exp" && inner_args.len() == 1 => {
                return inner_args[0].clone();
            }
            _ => {}
        }

        if is_builtin(name) && arg.free_symbols().is_empty() {
            let folded = eval_constant(arg)
                .ok()
                .and_then(|z| apply_builtin(name, z))
                .and_then(as_real)
                .and_then(near_integer);
            if let Some(value) = folded {
                return Expr::Number(value);
            }
        }
    }

    Expr::Call { name: name.to_string(), args }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parse_expression;

    fn simp(input: &str) -> String {
        simplify(&parse_expression(input).unwrap()).to_string()
    }

    #[test]
    fn test_constant_folding() {
        assert_eq!(simp("2 + 3"), "5");
        assert_eq!(simp("2*3 - 1"), "5");
        assert_eq!(simp("sin(0) + exp(0)"), "1");
        assert_eq!(simp("sqrt(16)"), "4");
    }

    #[test]
    fn test_like_terms() {
        assert_eq!(simp("x + x"), "2*x");
        assert_eq!(simp("x - x"), "0");
        assert_eq!(simp("1 + x + 2"), "x + 3");
        assert_eq!(simp("3*x - 2*x + y"), "x + y");
    }

    #[test]
    fn test_like_factors() {
        assert_eq!(simp("x*x*x"), "x**3");
        assert_eq!(simp("x^2/x"), "x");
        assert_eq!(simp("2*x*3"), "6*x");
        assert_eq!(simp("x/x"), "1");
        assert_eq!(simp("(2*x)^2"), "4*x**2");
    }

    #[test]
    fn test_ordering() {
        assert_eq!(simp("1 + 2*x + x^2"), "x**2 + 2*x + 1");
        assert_eq!(simp("y*x"), "x*y");
        assert_eq!(simp("x*pi*2"), "2*pi*x");
    }

    #[test]
    fn test_identities() {
        assert_eq!(simp("x*1 + 0"), "x");
        assert_eq!(simp("x^1"), "x");
        assert_eq!(simp("x^0"), "1");
        assert_eq!(simp("0*x"), "0");
        assert_eq!(simp("log(exp(x))"), "x");
        assert_eq!(simp("ln(x)"), "log(x)");
    }

    #[test]
    fn test_distribute_coefficient() {
        assert_eq!(simp("-(x - 1)"), "-x + 1");
        assert_eq!(simp("2*(x + 1)"), "2*x + 2");
    }

    #[test]
    fn test_roots_kept_exact() {
        assert_eq!(simp("sqrt(2)"), "sqrt(2)");
        assert_eq!(simp("sqrt(x)*sqrt(x)"), "x");
        assert_eq!(simp("sqrt(x^2)"), "sqrt(x**2)");
    }

    #[test]
    fn test_idempotent() {
        for input in ["x**3/3 - 2*x + 1", "a*b/(c + 1)", "exp(2*x)*sin(x)", "x^y*x^2"] {
            let once = simplify(&parse_expression(input).unwrap());
            let twice = simplify(&once);
            assert_eq!(once, twice, "not idempotent for {}", input);
        }
    }
}
