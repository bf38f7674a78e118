//! Canonical text form of expression trees.
//!
//! The printed form re-parses to the same value: `x + 1`, `3*x**2`,
//! `x**3/3`, `-x + 1`, `sqrt(x)`, `pi`, `E`, `I`, `oo`. Coefficients that
//! are close to a fraction with a small denominator print as that fraction.

use std::fmt;

use super::ast::Expr;

const PREC_ADD: u8 = 1;
const PREC_MUL: u8 = 2;
const PREC_POW: u8 = 3;
const PREC_ATOM: u8 = 4;

const MAX_DENOMINATOR: i64 = 1000;

/// Closest fraction `p/q` with `q <= 1000`, if it matches `x` to ~1e-12.
pub fn rational_approx(x: f64) -> Option<(i64, i64)> {
    if !x.is_finite() || x.abs() > 1e15 {
        return None;
    }
    if x.fract() == 0.0 {
        return Some((x as i64, 1));
    }
    let sign = if x < 0.0 { -1 } else { 1 };
    let target = x.abs();
    let mut v = target;
    let (mut h_prev, mut h) = (0i64, 1i64);
    let (mut k_prev, mut k) = (1i64, 0i64);

    for _ in 0..32 {
        let a = v.floor();
        if a > 1e12 {
            return None;
        }
        let a = a as i64;
        let h_next = a.checked_mul(h)?.checked_add(h_prev)?;
        let k_next = a.checked_mul(k)?.checked_add(k_prev)?;
        if k_next > MAX_DENOMINATOR {
            return None;
        }
        h_prev = h;
        h = h_next;
        k_prev = k;
        k = k_next;
        if (h as f64 / k as f64 - target).abs() <= 1e-12 * target.max(1.0) {
            return Some((sign * h, k));
        }
        let frac = v - v.floor();
        if frac < 1e-15 {
            return None;
        }
        v = 1.0 / frac;
    }
    None
}

/// Print a number the way it appears inside expressions.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "nan".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "oo".to_string() } else { "-oo".to_string() };
    }
    match rational_approx(n) {
        Some((p, 1)) => p.to_string(),
        Some((p, q)) => format!("{}/{}", p, q),
        None if n.abs() >= 1e-4 && n.abs() < 1e15 => format!("{}", n),
        None => format!("{:e}", n),
    }
}

struct Rendered {
    text: String,
    prec: u8,
    negative: bool,
}

impl Rendered {
    fn new(text: String, prec: u8) -> Self {
        let negative = text.starts_with('-');
        Rendered { text, prec, negative }
    }

    /// Text wrapped in parentheses when looser than `min_prec` or signed.
    fn wrapped(self, min_prec: u8) -> String {
        if self.prec < min_prec || self.negative {
            format!("({})", self.text)
        } else {
            self.text
        }
    }
}

fn render(expr: &Expr) -> Rendered {
    match expr {
        Expr::Number(n) => {
            let text = format_number(*n);
            let prec = if text.contains('/') { PREC_MUL } else { PREC_ATOM };
            Rendered::new(text, prec)
        }
        Expr::Constant(c) => Rendered::new(c.symbol().to_string(), PREC_ATOM),
        Expr::Symbol(name) => Rendered::new(name.clone(), PREC_ATOM),
        Expr::Call { name, args } => {
            let args: Vec<String> = args.iter().map(|a| render(a).text).collect();
            Rendered::new(format!("{}({})", name, args.join(", ")), PREC_ATOM)
        }
        Expr::Add(..) | Expr::Sub(..) => render_sum(expr),
        Expr::Neg(..) | Expr::Mul(..) | Expr::Div(..) => render_product(expr),
        Expr::Pow(base, exponent) => match exponent.as_number() {
            Some(e) if e == 0.5 => Rendered::new(format!("sqrt({})", render(base).text), PREC_ATOM),
            Some(e) if e < 0.0 => render_product(expr),
            _ => {
                let base = render(base).wrapped(PREC_ATOM);
                let exponent = render(exponent).wrapped(PREC_ATOM);
                Rendered::new(format!("{}**{}", base, exponent), PREC_POW)
            }
        },
    }
}

fn gather_terms<'a>(expr: &'a Expr, negative: bool, out: &mut Vec<(bool, &'a Expr)>) {
    match expr {
        Expr::Add(a, b) => {
            gather_terms(a, negative, out);
            gather_terms(b, negative, out);
        }
        Expr::Sub(a, b) => {
            gather_terms(a, negative, out);
            gather_terms(b, !negative, out);
        }
        _ => out.push((negative, expr)),
    }
}

fn render_sum(expr: &Expr) -> Rendered {
    let mut terms = Vec::new();
    gather_terms(expr, false, &mut terms);

    let mut text = String::new();
    for (index, (negative, term)) in terms.into_iter().enumerate() {
        let rendered = render(term);
        let (negative, body) = if rendered.negative {
            (!negative, rendered.text[1..].to_string())
        } else {
            (negative, rendered.text)
        };
        if index == 0 {
            if negative {
                text.push('-');
            }
        } else {
            text.push_str(if negative { " - " } else { " + " });
        }
        text.push_str(&body);
    }
    Rendered::new(text, PREC_ADD)
}

fn gather_factors(expr: &Expr, invert: bool, coeff: &mut f64, numerator: &mut Vec<Expr>, denominator: &mut Vec<Expr>) {
    match expr {
        Expr::Number(n) if *n != 0.0 && n.is_finite() => {
            if invert {
                *coeff /= n;
            } else {
                *coeff *= n;
            }
        }
        Expr::Neg(a) => {
            *coeff = -*coeff;
            gather_factors(a, invert, coeff, numerator, denominator);
        }
        Expr::Mul(a, b) => {
            gather_factors(a, invert, coeff, numerator, denominator);
            gather_factors(b, invert, coeff, numerator, denominator);
        }
        Expr::Div(a, b) => {
            gather_factors(a, invert, coeff, numerator, denominator);
            gather_factors(b, !invert, coeff, numerator, denominator);
        }
        Expr::Pow(base, exponent) if exponent.as_number().is_some_and(|e| e < 0.0) => {
            let e = -exponent.as_number().unwrap_or(-1.0);
            let factor = if e == 1.0 { (**base).clone() } else { (**base).clone().powf(e) };
            if invert {
                numerator.push(factor);
            } else {
                denominator.push(factor);
            }
        }
        other => {
            if invert {
                denominator.push(other.clone());
            } else {
                numerator.push(other.clone());
            }
        }
    }
}

fn render_product(expr: &Expr) -> Rendered {
    let mut coeff = 1.0;
    let mut numerator = Vec::new();
    let mut denominator = Vec::new();
    gather_factors(expr, false, &mut coeff, &mut numerator, &mut denominator);

    let negative = coeff < 0.0;
    let (p, q) = match rational_approx(coeff.abs()) {
        Some((p, q)) => (format_number(p as f64), q),
        None => (format_number(coeff.abs()), 1),
    };

    let mut num_parts: Vec<Rendered> = Vec::new();
    if p != "1" || numerator.is_empty() {
        num_parts.push(Rendered::new(p, PREC_ATOM));
    }
    num_parts.extend(numerator.iter().map(render));

    let mut den_parts: Vec<Rendered> = Vec::new();
    if q != 1 {
        den_parts.push(Rendered::new(q.to_string(), PREC_ATOM));
    }
    den_parts.extend(denominator.iter().map(render));

    let single = num_parts.len() == 1 && den_parts.is_empty() && !negative;
    let single_prec = num_parts.first().map(|r| r.prec).unwrap_or(PREC_ATOM);

    let mut text = num_parts.into_iter().map(|r| r.wrapped(PREC_MUL + 1)).collect::<Vec<_>>().join("*");
    if !den_parts.is_empty() {
        let den = if den_parts.len() == 1 {
            den_parts.pop().map(|r| r.wrapped(PREC_POW)).unwrap_or_default()
        } else {
            format!("({})", den_parts.into_iter().map(|r| r.wrapped(PREC_MUL + 1)).collect::<Vec<_>>().join("*"))
        };
        text = format!("{}/{}", text, den);
    }
    if negative {
        text = format!("-{}", text);
    }
    Rendered::new(text, if single { single_prec } else { PREC_MUL })
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", render(self).text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parse_expression;

    fn show(input: &str) -> String {
        parse_expression(input).unwrap().to_string()
    }

    #[test]
    fn test_rational_approx() {
        assert_eq!(rational_approx(0.5), Some((1, 2)));
        assert_eq!(rational_approx(-1.0 / 3.0), Some((-1, 3)));
        assert_eq!(rational_approx(4.0), Some((4, 1)));
        assert_eq!(rational_approx(std::f64::consts::PI), None);
    }

    #[test]
    fn test_number_format() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(0.25), "1/4");
        assert_eq!(format_number(f64::INFINITY), "oo");
        assert_eq!(format_number(1.23456789), "1.23456789");
    }

    #[test]
    fn test_sums() {
        assert_eq!(show("x + 1"), "x + 1");
        assert_eq!(show("x - (-1)"), "x + 1");
        assert_eq!(show("-x + 1"), "-x + 1");
        assert_eq!(show("a - b - c"), "a - b - c");
    }

    #[test]
    fn test_products() {
        assert_eq!(show("3*x**2"), "3*x**2");
        assert_eq!(show("x^3/3"), "x**3/3");
        assert_eq!(show("x/(2*y)"), "x/(2*y)");
        assert_eq!(show("1/(x + 1)"), "1/(x + 1)");
        assert_eq!(show("2*(x + 1)"), "2*(x + 1)");
    }

    #[test]
    fn test_powers() {
        assert_eq!(show("(x + 1)^2"), "(x + 1)**2");
        assert_eq!(show("x^0.5"), "sqrt(x)");
        assert_eq!(show("x^(1/3)"), "x**(1/3)");
        assert_eq!(show("x^-2"), "1/x**2");
        assert_eq!(show("(-2)^x"), "(-2)**x");
    }

    #[test]
    fn test_reparse_same_text() {
        for input in ["x**3/3 - 2*x + 1", "sin(x)*cos(y)", "-3*a/(b + 1)", "E**x + pi"] {
            let once = show(input);
            assert_eq!(show(&once), once);
        }
    }
}
