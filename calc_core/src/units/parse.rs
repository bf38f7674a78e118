//! Unit expression parsing: `kg*m/s^2`, `N·m`, `W/(m^2*K)`, `kN/m2`, `1/s`.
//!
//! Whitespace between two factors multiplies. Digits written directly after
//! a unit symbol (or `²`/`³`) are an exponent. Numeric factors are accepted
//! only when the caller allows them (custom unit definitions); otherwise the
//! only legal number is a leading `1` as in `1/s`.

use crate::errors::{CalcError, CalcResult};

use super::dimension::{Dimension, MAX_EXPONENT};
use super::registry::UnitCatalog;

/// Scale/dimension/offset of a parsed unit expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitTerm {
    /// Multiplier to the SI base combination
    pub scale: f64,
    /// Dimension vector
    pub dimension: Dimension,
    /// Kelvin offset; non-zero only for a lone affine unit
    pub offset: f64,
}

impl UnitTerm {
    fn factor(value: f64) -> Self {
        UnitTerm { scale: value, dimension: Dimension::dimensionless(), offset: 0.0 }
    }

    fn mul(self, rhs: UnitTerm) -> Option<Self> {
        let dimension = self.dimension.checked_mul(rhs.dimension)?;
        Some(UnitTerm { scale: self.scale * rhs.scale, dimension, offset: 0.0 })
    }

    fn div(self, rhs: UnitTerm) -> Option<Self> {
        let dimension = self.dimension.checked_div(rhs.dimension)?;
        Some(UnitTerm { scale: self.scale / rhs.scale, dimension, offset: 0.0 })
    }

    fn powi(self, n: i32) -> Option<Self> {
        if n == 1 {
            return Some(self);
        }
        let dimension = self.dimension.checked_powi(n)?;
        Some(UnitTerm { scale: self.scale.powi(n), dimension, offset: 0.0 })
    }

    pub fn is_affine(&self) -> bool {
        self.offset != 0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Atom(String),
    Number(f64),
    Mul,
    Div,
    Pow,
    Minus,
    LParen,
    RParen,
}

fn is_atom_start(c: char) -> bool {
    c.is_alphabetic() || matches!(c, '°' | 'µ' | 'μ' | 'Ω' | '_')
}

fn superscript_digit(c: char) -> Option<i32> {
    match c {
        '⁰' => Some(0),
        '¹' => Some(1),
        '²' => Some(2),
        '³' => Some(3),
        '⁴' => Some(4),
        _ => None,
    }
}

fn tokenize(text: &str) -> CalcResult<Vec<Tok>> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Tok::Pow);
                i += 2;
            }
            '*' | '·' | '⋅' | '×' => {
                tokens.push(Tok::Mul);
                i += 1;
            }
            '/' => {
                tokens.push(Tok::Div);
                i += 1;
            }
            '^' => {
                tokens.push(Tok::Pow);
                i += 1;
            }
            '-' => {
                tokens.push(Tok::Minus);
                i += 1;
            }
            '(' => {
                tokens.push(Tok::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Tok::RParen);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '-' || chars[j] == '+') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal.parse::<f64>().map_err(|_| CalcError::unknown_unit(text))?;
                tokens.push(Tok::Number(value));
            }
            c if is_atom_start(c) => {
                let start = i;
                while i < chars.len() && is_atom_start(chars[i]) {
                    i += 1;
                }
                tokens.push(Tok::Atom(chars[start..i].iter().collect()));

                // `m2`, `s-1`, `m²`: exponent glued to the symbol
                if i < chars.len() && (chars[i].is_ascii_digit() || (chars[i] == '-' && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit()))) {
                    let start = i;
                    i += 1;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                    let literal: String = chars[start..i].iter().collect();
                    let exponent = literal.parse::<f64>().map_err(|_| CalcError::unknown_unit(text))?;
                    tokens.push(Tok::Pow);
                    tokens.push(Tok::Number(exponent));
                } else if let Some(d) = chars.get(i).copied().and_then(superscript_digit) {
                    i += 1;
                    tokens.push(Tok::Pow);
                    tokens.push(Tok::Number(d as f64));
                }
            }
            _ => return Err(CalcError::unknown_unit(text)),
        }
    }

    Ok(tokens)
}

/// Deepest parenthesis nesting accepted in a unit expression
const MAX_NESTING: usize = 64;

struct UnitParser<'a> {
    text: &'a str,
    tokens: Vec<Tok>,
    pos: usize,
    nesting: usize,
    catalog: &'a UnitCatalog,
    allow_factors: bool,
}

impl<'a> UnitParser<'a> {
    fn fail(&self) -> CalcError {
        CalcError::unknown_unit(self.text)
    }

    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn expr(&mut self) -> CalcResult<UnitTerm> {
        let mut acc = self.term()?;
        loop {
            match self.peek() {
                Some(Tok::Mul) => {
                    self.pos += 1;
                    let rhs = self.term()?;
                    acc = acc.mul(rhs).ok_or_else(|| self.fail())?;
                }
                Some(Tok::Div) => {
                    self.pos += 1;
                    let rhs = self.term()?;
                    acc = acc.div(rhs).ok_or_else(|| self.fail())?;
                }
                // Juxtaposition: `kg m`
                Some(Tok::Atom(_)) | Some(Tok::Number(_)) | Some(Tok::LParen) => {
                    let rhs = self.term()?;
                    acc = acc.mul(rhs).ok_or_else(|| self.fail())?;
                }
                _ => break,
            }
        }
        Ok(acc)
    }

    fn term(&mut self) -> CalcResult<UnitTerm> {
        let base = self.primary()?;
        if let Some(Tok::Pow) = self.peek() {
            self.pos += 1;
            let exponent = self.exponent()?;
            return base.powi(exponent).ok_or_else(|| self.fail());
        }
        Ok(base)
    }

    fn exponent(&mut self) -> CalcResult<i32> {
        let mut sign = 1.0;
        let mut parens = false;
        if let Some(Tok::LParen) = self.peek() {
            parens = true;
            self.pos += 1;
        }
        if let Some(Tok::Minus) = self.peek() {
            sign = -1.0;
            self.pos += 1;
        }
        let value = match self.tokens.get(self.pos) {
            Some(Tok::Number(n)) => sign * *n,
            _ => return Err(self.fail()),
        };
        self.pos += 1;
        if parens {
            match self.peek() {
                Some(Tok::RParen) => self.pos += 1,
                _ => return Err(self.fail()),
            }
        }
        if value.fract() != 0.0 || value.abs() > MAX_EXPONENT as f64 {
            return Err(self.fail());
        }
        Ok(value as i32)
    }

    fn primary(&mut self) -> CalcResult<UnitTerm> {
        match self.tokens.get(self.pos).cloned() {
            Some(Tok::Atom(name)) => {
                self.pos += 1;
                self.catalog.resolve_atom(&name).ok_or_else(|| self.fail())
            }
            Some(Tok::Number(value)) => {
                self.pos += 1;
                if !self.allow_factors && value != 1.0 {
                    return Err(self.fail());
                }
                Ok(UnitTerm::factor(value))
            }
            Some(Tok::LParen) => {
                if self.nesting >= MAX_NESTING {
                    return Err(self.fail());
                }
                self.pos += 1;
                self.nesting += 1;
                let inner = self.expr()?;
                self.nesting -= 1;
                match self.peek() {
                    Some(Tok::RParen) => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    _ => Err(self.fail()),
                }
            }
            _ => Err(self.fail()),
        }
    }
}

/// Parse a unit expression against a catalog snapshot.
pub(crate) fn parse_unit_expr(text: &str, catalog: &UnitCatalog, allow_factors: bool) -> CalcResult<UnitTerm> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err(CalcError::unknown_unit(text));
    }
    let mut parser = UnitParser { text, tokens, pos: 0, nesting: 0, catalog, allow_factors };
    let term = parser.expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(CalcError::unknown_unit(text));
    }
    Ok(term)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> CalcResult<UnitTerm> {
        parse_unit_expr(text, &UnitCatalog::seeded(), false)
    }

    #[test]
    fn test_compound_units() {
        let newton = parse("kg*m/s^2").unwrap();
        assert_eq!(newton.dimension.0, [1, 1, -2, 0, 0, 0, 0]);
        assert!((newton.scale - 1.0).abs() < 1e-12);

        let h_coeff = parse("W/(m^2*K)").unwrap();
        assert_eq!(h_coeff.dimension.0, [0, 1, -3, -1, 0, 0, 0]);
    }

    #[test]
    fn test_prefixes_and_powers() {
        let kpa = parse("kPa").unwrap();
        assert!((kpa.scale - 1000.0).abs() < 1e-9);

        let mm2 = parse("mm^2").unwrap();
        assert!((mm2.scale - 1e-6).abs() < 1e-18);

        let glued = parse("kN/m2").unwrap();
        assert_eq!(glued.dimension, parse("kPa").unwrap().dimension);

        let sup = parse("m²").unwrap();
        assert_eq!(sup.dimension.0[0], 2);
    }

    #[test]
    fn test_juxtaposition_and_reciprocal() {
        let torque = parse("N m").unwrap();
        assert_eq!(torque.dimension.0, [2, 1, -2, 0, 0, 0, 0]);
        let hz = parse("1/s").unwrap();
        assert_eq!(hz.dimension.0[2], -1);
        let neg = parse("m^-1").unwrap();
        assert_eq!(neg.dimension.0[0], -1);
    }

    #[test]
    fn test_affine_only_when_alone() {
        assert!(parse("degC").unwrap().is_affine());
        assert!(!parse("W/degC").unwrap().is_affine());
    }

    #[test]
    fn test_rejections() {
        assert!(parse("").is_err());
        assert!(parse("furlong").is_err());
        assert!(parse("m^0.5").is_err());
        assert!(parse("2*m").is_err());
        assert!(parse_unit_expr("1.852 * km", &UnitCatalog::seeded(), true).is_ok());
    }

    #[test]
    fn test_exponent_limits() {
        assert!(parse("m^64").is_ok());
        assert!(parse("m^-64").is_ok());
        assert!(parse("m^65").is_err());
        assert!(parse("m^3000000000*m").is_err());
        assert!(parse("m^(-3000000000)").is_err());
        // Every exponent is in range, the nested product is not
        let nested = |depth: usize| format!("{}m{}", "(".repeat(depth), ")^64".repeat(depth));
        assert_eq!(parse(&nested(5)).unwrap().dimension.0[0], 64i32.pow(5));
        assert!(parse(&nested(6)).is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let shallow = format!("{}m{}", "(".repeat(10), ")".repeat(10));
        assert_eq!(parse(&shallow).unwrap().dimension.0[0], 1);
        let deep = format!("{}m{}", "(".repeat(100_000), ")".repeat(100_000));
        assert!(parse(&deep).is_err());
    }
}
