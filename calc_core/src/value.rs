//! # Value Parser
//!
//! Turns a raw variable payload into a typed [`VariableBinding`].
//!
//! Accepted payloads (JSON shapes):
//!
//! | Payload | Result |
//! |---------|--------|
//! | `3.5` | real number |
//! | `"3.5"`, `"1e3"` | real number |
//! | `"3+4i"`, `"2-1.5j"` | complex number |
//! | `"5.2 kg"` | dimensioned quantity |
//! | `"a*b + 1"`, `"2*pi"` | expression tree |
//! | `{"value": 100, "unit": "N", "description": "..."}` | dimensioned quantity |
//!
//! ## Example
//!
//! ```rust
//! use calc_core::units::UnitRegistry;
//! use calc_core::value::{parse_variable, Scope, VariablePayload};
//!
//! let registry = UnitRegistry::new();
//! let payload: VariablePayload = serde_json::from_str(r#"{"value": 100, "unit": "kN"}"#).unwrap();
//! let binding = parse_variable("F", &payload, &registry, Scope::Local).unwrap();
//! assert_eq!(binding.quantity.base_value().unwrap().re, 100_000.0);
//! ```

use std::str::FromStr;

use num_complex::Complex64;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};
use crate::expr::{eval_constant, parse_expression, Expr};
use crate::units::{Dimension, UnitRegistry};

/// Variable names: a letter followed by letters, digits or underscores.
static VARIABLE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\W\d_][\w]*$").expect("valid regex"));

/// A number followed by a unit expression, e.g. `5.2 kg` or `-3e2 N*m`.
static QUANTITY_STRING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)\s*(\S.*)$").expect("valid regex")
});

/// The scalar part of a `{value, unit}` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

/// Raw variable payload as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariablePayload {
    Number(f64),
    Text(String),
    Record {
        value: RawValue,
        #[serde(default)]
        unit: Option<String>,
        #[serde(default)]
        description: Option<String>,
    },
}

impl From<f64> for VariablePayload {
    fn from(value: f64) -> Self {
        VariablePayload::Number(value)
    }
}

impl From<&str> for VariablePayload {
    fn from(text: &str) -> Self {
        VariablePayload::Text(text.to_string())
    }
}

impl VariablePayload {
    /// `{value, unit}` record with a numeric value.
    pub fn with_unit(value: f64, unit: &str) -> Self {
        VariablePayload::Record {
            value: RawValue::Number(value),
            unit: Some(unit.to_string()),
            description: None,
        }
    }
}

/// Where a binding lives. Local bindings shadow global ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Global,
    Local,
}

/// Resolved unit attached to a numeric magnitude.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantityUnit {
    /// Unit expression as written
    pub symbol: String,
    /// Multiplier to SI base units
    pub scale: f64,
    pub dimension: Dimension,
    /// Kelvin offset of a lone affine unit
    pub offset: f64,
}

impl QuantityUnit {
    pub fn resolve(symbol: &str, registry: &UnitRegistry) -> CalcResult<Self> {
        let term = registry.resolve(symbol)?;
        Ok(QuantityUnit {
            symbol: symbol.trim().to_string(),
            scale: term.scale,
            dimension: term.dimension,
            offset: term.offset,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Magnitude {
    Real(f64),
    Complex(Complex64),
    Symbolic(Expr),
}

/// A value with an optional unit.
///
/// A unit is never attached to a symbolic magnitude; the constructors are
/// the only way to build one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    magnitude: Magnitude,
    unit: Option<QuantityUnit>,
}

impl Quantity {
    pub fn real(value: f64) -> Self {
        Quantity { magnitude: Magnitude::Real(value), unit: None }
    }

    /// Complex value; collapses to real when the imaginary part is zero.
    pub fn complex(value: Complex64) -> Self {
        if value.im == 0.0 {
            return Quantity::real(value.re);
        }
        Quantity { magnitude: Magnitude::Complex(value), unit: None }
    }

    pub fn symbolic(expr: Expr) -> Self {
        Quantity { magnitude: Magnitude::Symbolic(expr), unit: None }
    }

    /// Attach a unit to a numeric quantity.
    pub fn with_unit(self, unit: QuantityUnit) -> CalcResult<Self> {
        if let Magnitude::Symbolic(expr) = &self.magnitude {
            return Err(CalcError::invalid_variable(
                expr.to_string(),
                format!("a symbolic value cannot carry the unit '{}'", unit.symbol),
            ));
        }
        Ok(Quantity { magnitude: self.magnitude, unit: Some(unit) })
    }

    pub fn magnitude(&self) -> &Magnitude {
        &self.magnitude
    }

    pub fn unit(&self) -> Option<&QuantityUnit> {
        self.unit.as_ref()
    }

    pub fn is_symbolic(&self) -> bool {
        matches!(self.magnitude, Magnitude::Symbolic(_))
    }

    pub fn dimension(&self) -> Dimension {
        self.unit.as_ref().map(|u| u.dimension).unwrap_or_default()
    }

    /// Magnitude in SI base units; `None` for symbolic values.
    pub fn base_value(&self) -> Option<Complex64> {
        let raw = match &self.magnitude {
            Magnitude::Real(x) => Complex64::new(*x, 0.0),
            Magnitude::Complex(z) => *z,
            Magnitude::Symbolic(_) => return None,
        };
        Some(match &self.unit {
            Some(unit) => raw * unit.scale + unit.offset,
            None => raw,
        })
    }

    /// Tree form for symbolic substitution (unit-free).
    pub fn to_expr(&self) -> Expr {
        match &self.magnitude {
            Magnitude::Symbolic(expr) => expr.clone(),
            _ => {
                let z = self.base_value().unwrap_or_default();
                if z.im == 0.0 {
                    Expr::Number(z.re)
                } else {
                    Expr::Number(z.re) + Expr::Number(z.im) * Expr::Constant(crate::expr::Constant::I)
                }
            }
        }
    }
}

/// A named, typed variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableBinding {
    pub name: String,
    pub quantity: Quantity,
    pub description: Option<String>,
    pub scope: Scope,
}

pub fn is_valid_name(name: &str) -> bool {
    VARIABLE_NAME.is_match(name)
}

/// Parse a payload into a binding.
pub fn parse_variable(
    name: &str,
    payload: &VariablePayload,
    registry: &UnitRegistry,
    scope: Scope,
) -> CalcResult<VariableBinding> {
    if !is_valid_name(name) {
        return Err(CalcError::invalid_variable(
            name,
            "names start with a letter followed by letters, digits or '_'",
        ));
    }

    let (quantity, description) = match payload {
        VariablePayload::Number(x) => (parse_number(name, *x)?, None),
        VariablePayload::Text(text) => (parse_text(name, text, registry)?, None),
        VariablePayload::Record { value, unit, description } => {
            let quantity = match value {
                RawValue::Number(x) => parse_number(name, *x)?,
                RawValue::Text(text) => parse_text(name, text, registry)?,
            };
            let quantity = match unit.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
                None => quantity,
                Some(_) if quantity.unit.is_some() => {
                    return Err(CalcError::invalid_variable(name, "value already carries a unit"));
                }
                Some(_) if quantity.is_symbolic() => {
                    return Err(CalcError::invalid_variable(name, "a symbolic value cannot carry a unit"));
                }
                Some(unit) => quantity.with_unit(QuantityUnit::resolve(unit, registry)?)?,
            };
            (quantity, description.clone())
        }
    };

    Ok(VariableBinding {
        name: name.to_string(),
        quantity,
        description,
        scope,
    })
}

fn parse_number(name: &str, x: f64) -> CalcResult<Quantity> {
    if x.is_nan() {
        return Err(CalcError::invalid_variable(name, "value is not a number"));
    }
    Ok(Quantity::real(x))
}

/// Numeric, then complex, then `number unit`, then expression.
fn parse_text(name: &str, text: &str, registry: &UnitRegistry) -> CalcResult<Quantity> {
    let text = text.trim();
    if text.is_empty() {
        return Err(CalcError::invalid_variable(name, "empty value"));
    }

    if let Ok(x) = text.parse::<f64>() {
        if x.is_finite() {
            return Ok(Quantity::real(x));
        }
    }

    if let Some(z) = parse_complex(text) {
        return Ok(Quantity::complex(z));
    }

    if let Some(caps) = QUANTITY_STRING.captures(text) {
        let unit = caps[2].trim();
        if registry.is_valid_unit(unit) {
            if let Ok(x) = caps[1].parse::<f64>() {
                return Quantity::real(x).with_unit(QuantityUnit::resolve(unit, registry)?);
            }
        }
    }

    let expr = parse_expression(text)
        .map_err(|e| CalcError::invalid_variable(name, format!("'{}' is not a number, quantity or expression: {}", text, e)))?;
    if expr.free_symbols().is_empty() {
        if let Ok(z) = eval_constant(&expr) {
            return Ok(Quantity::complex(z));
        }
    }
    Ok(Quantity::symbolic(expr))
}

/// `a+bi`, `a-bj`, `bi`, with `i` or `j` as the imaginary unit.
fn parse_complex(text: &str) -> Option<Complex64> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let body = compact.strip_suffix(['i', 'j'])?;
    if !body.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    // Split at the last sign that is not the leading one or part of an exponent.
    let bytes = body.as_bytes();
    let split = (1..bytes.len())
        .rev()
        .find(|&k| matches!(bytes[k], b'+' | b'-') && !matches!(bytes[k - 1], b'e' | b'E'));

    let imaginary = |s: &str| -> Option<f64> {
        match s {
            "" | "+" => Some(1.0),
            "-" => Some(-1.0),
            _ => f64::from_str(s).ok(),
        }
    };

    match split {
        Some(k) => {
            let re = f64::from_str(&body[..k]).ok()?;
            let im = imaginary(&body[k..])?;
            Some(Complex64::new(re, im))
        }
        None => Some(Complex64::new(0.0, imaginary(body)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(name: &str, payload: VariablePayload) -> CalcResult<VariableBinding> {
        parse_variable(name, &payload, &UnitRegistry::new(), Scope::Local)
    }

    #[test]
    fn test_bare_number() {
        let binding = parse("x", 2.5.into()).unwrap();
        assert_eq!(binding.quantity.magnitude(), &Magnitude::Real(2.5));
        assert!(binding.quantity.unit().is_none());
    }

    #[test]
    fn test_numeric_string() {
        let binding = parse("x", "1e3".into()).unwrap();
        assert_eq!(binding.quantity.magnitude(), &Magnitude::Real(1000.0));
    }

    #[test]
    fn test_complex_string() {
        let binding = parse("z", "3+4i".into()).unwrap();
        assert_eq!(binding.quantity.magnitude(), &Magnitude::Complex(Complex64::new(3.0, 4.0)));
        let binding = parse("z", "2-1.5j".into()).unwrap();
        assert_eq!(binding.quantity.magnitude(), &Magnitude::Complex(Complex64::new(2.0, -1.5)));
    }

    #[test]
    fn test_quantity_string() {
        let binding = parse("m", "5.2 kg".into()).unwrap();
        let unit = binding.quantity.unit().unwrap();
        assert_eq!(unit.symbol, "kg");
        assert!((binding.quantity.base_value().unwrap().re - 5.2).abs() < 1e-12);

        let binding = parse("p", "2 kPa".into()).unwrap();
        assert!((binding.quantity.base_value().unwrap().re - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn test_expression_string() {
        let binding = parse("y", "a*b + 1".into()).unwrap();
        assert!(binding.quantity.is_symbolic());
        assert_eq!(binding.quantity.to_expr().free_symbols().len(), 2);

        let binding = parse("k", "sqrt(16)".into()).unwrap();
        assert_eq!(binding.quantity.magnitude(), &Magnitude::Real(4.0));
    }

    #[test]
    fn test_record_with_unit() {
        let payload: VariablePayload =
            serde_json::from_str(r#"{"value": "100", "unit": "N", "description": "axial load"}"#).unwrap();
        let binding = parse("F", payload).unwrap();
        assert_eq!(binding.description.as_deref(), Some("axial load"));
        assert_eq!(binding.quantity.dimension(), Dimension::new([1, 1, -2, 0, 0, 0, 0]));
    }

    #[test]
    fn test_affine_record_converts_to_kelvin() {
        let binding = parse("T", VariablePayload::with_unit(25.0, "degC")).unwrap();
        assert!((binding.quantity.base_value().unwrap().re - 298.15).abs() < 1e-9);
    }

    #[test]
    fn test_symbolic_value_rejects_unit() {
        let payload = VariablePayload::Record {
            value: RawValue::Text("a + b".to_string()),
            unit: Some("m".to_string()),
            description: None,
        };
        assert_eq!(parse("L", payload).unwrap_err().error_code(), "INVALID_VARIABLE");
    }

    #[test]
    fn test_unknown_unit_in_record() {
        let err = parse("L", VariablePayload::with_unit(1.0, "furlongz")).unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_UNIT");
    }

    #[test]
    fn test_invalid_names() {
        assert!(parse("2x", 1.0.into()).is_err());
        assert!(parse("_x", 1.0.into()).is_err());
        assert!(parse("x y", 1.0.into()).is_err());
        assert!(parse("x_1", 1.0.into()).is_ok());
        assert!(parse("σ", 1.0.into()).is_ok());
    }

    #[test]
    fn test_unparseable_text() {
        assert_eq!(parse("x", "2 +".into()).unwrap_err().error_code(), "INVALID_VARIABLE");
        assert!(parse("x", "   ".into()).is_err());
    }

    #[test]
    fn test_payload_shapes_deserialize() {
        let number: VariablePayload = serde_json::from_str("4").unwrap();
        assert_eq!(number, VariablePayload::Number(4.0));
        let text: VariablePayload = serde_json::from_str(r#""4 m""#).unwrap();
        assert_eq!(text, VariablePayload::Text("4 m".to_string()));
    }
}
