//! # Expression Evaluator
//!
//! `PARSE -> BIND -> MODE_SELECT -> EVALUATE -> UNIT_PROPAGATE`.
//!
//! - **Bind** resolves identifiers in priority order: call variables, the
//!   session table, named constants. Calls to engineering functions are
//!   expanded into their formulas. Identifiers that resolve to nothing stay
//!   free.
//! - **Mode select** is symbolic iff a free symbol remains after binding
//!   (a variable whose value is an unresolved expression brings its own
//!   free symbols along).
//! - **Evaluate** either simplifies the tree or walks it numerically,
//!   carrying a dimension vector next to every SI-normalised magnitude.
//!
//! ## Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use calc_core::evaluator::{Evaluation, Evaluator};
//! use calc_core::symbols::SymbolTable;
//! use calc_core::units::UnitRegistry;
//!
//! let registry = UnitRegistry::new();
//! let session = SymbolTable::new();
//! let locals = BTreeMap::new();
//! let evaluator = Evaluator::new(&registry, &session, &locals);
//!
//! match evaluator.evaluate_str("x + x").unwrap() {
//!     Evaluation::Symbolic { expr, free_symbols } => {
//!         assert_eq!(expr.to_string(), "2*x");
//!         assert_eq!(free_symbols, vec!["x".to_string()]);
//!     }
//!     Evaluation::Numeric { .. } => unreachable!(),
//! }
//! ```

use std::collections::BTreeMap;

use log::debug;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::errors::{CalcError, CalcResult};
use crate::expr::numeric::{apply_builtin, canonical_function_name, complex_pow};
use crate::expr::{is_builtin, parse_expression, simplify, Constant, Expr};
use crate::functions::EngineeringFunction;
use crate::symbols::SymbolTable;
use crate::units::{Dimension, UnitRegistry, MAX_EXPONENT};
use crate::value::{Magnitude, VariableBinding};

/// Which path evaluation took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EvalMode {
    Symbolic,
    Numeric,
}

/// SI-normalised magnitude with its dimension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimensioned {
    pub value: Complex64,
    pub dimension: Dimension,
}

impl Dimensioned {
    fn plain(value: Complex64) -> Self {
        Dimensioned { value, dimension: Dimension::dimensionless() }
    }
}

/// Output of [`Evaluator::evaluate_expr`].
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// Value in SI base units
    Numeric { value: Complex64, dimension: Dimension },
    /// Simplified tree and its sorted free symbols
    Symbolic { expr: Expr, free_symbols: Vec<String> },
}

impl Evaluation {
    pub fn mode(&self) -> EvalMode {
        match self {
            Evaluation::Numeric { .. } => EvalMode::Numeric,
            Evaluation::Symbolic { .. } => EvalMode::Symbolic,
        }
    }
}

/// A tree after binding.
///
/// Symbols with numeric values stay as symbols in `tree` and are looked up
/// in `values`; every other remaining symbol is free.
#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    pub tree: Expr,
    pub values: BTreeMap<String, Dimensioned>,
}

impl Bound {
    /// Symbols with no value, sorted.
    pub fn free_symbols(&self) -> Vec<String> {
        self.tree
            .free_symbols()
            .into_iter()
            .filter(|s| !self.values.contains_key(s))
            .collect()
    }

    pub fn is_symbolic(&self) -> bool {
        !self.free_symbols().is_empty()
    }

    /// Tree with numeric values substituted as plain (SI) numbers.
    ///
    /// Units are dropped: a symbolic tree never carries one.
    pub fn unitless_tree(&self) -> Expr {
        self.tree.replace_symbols(&mut |name| self.values.get(name).map(|d| complex_expr(d.value)))
    }

    /// Evaluate with unit tracking; every symbol must have a value.
    pub fn evaluate(&self) -> CalcResult<Dimensioned> {
        eval_dimensioned(&self.tree, &self.values)
    }

    pub fn mode(&self) -> EvalMode {
        if self.is_symbolic() {
            EvalMode::Symbolic
        } else {
            EvalMode::Numeric
        }
    }

    /// Simplified tree in symbolic mode, dimensioned value in numeric mode.
    pub fn evaluation(&self) -> CalcResult<Evaluation> {
        let free_symbols = self.free_symbols();
        if !free_symbols.is_empty() {
            debug!("symbolic mode, free symbols {:?}", free_symbols);
            let simplified = simplify(&self.unitless_tree());
            return Ok(Evaluation::Symbolic {
                free_symbols: simplified.free_symbols().into_iter().collect(),
                expr: simplified,
            });
        }
        debug!("numeric mode for {}", self.tree);
        let result = self.evaluate()?;
        Ok(Evaluation::Numeric { value: result.value, dimension: result.dimension })
    }
}

fn complex_expr(z: Complex64) -> Expr {
    if z.im == 0.0 {
        Expr::Number(z.re)
    } else {
        Expr::Number(z.re) + Expr::Number(z.im) * Expr::Constant(Constant::I)
    }
}

/// Resolves identifiers against call variables and the session table.
pub struct Evaluator<'a> {
    registry: &'a UnitRegistry,
    session: &'a SymbolTable,
    locals: &'a BTreeMap<String, VariableBinding>,
    excluded: Option<&'a str>,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        registry: &'a UnitRegistry,
        session: &'a SymbolTable,
        locals: &'a BTreeMap<String, VariableBinding>,
    ) -> Self {
        Evaluator { registry, session, locals, excluded: None }
    }

    /// Leave `name` free even when a variable binds it (the solve target).
    pub fn excluding(mut self, name: &'a str) -> Self {
        self.excluded = Some(name);
        self
    }

    pub fn registry(&self) -> &UnitRegistry {
        self.registry
    }

    fn lookup(&self, name: &str) -> Option<&'a VariableBinding> {
        if self.excluded == Some(name) {
            return None;
        }
        self.locals.get(name).or_else(|| self.session.get(name))
    }

    /// Parse and evaluate.
    pub fn evaluate_str(&self, text: &str) -> CalcResult<Evaluation> {
        let expr = parse_expression(text)?;
        debug!("parsed '{}' as {}", text, expr);
        self.evaluate_expr(&expr)
    }

    /// Bind, select the mode, evaluate.
    pub fn evaluate_expr(&self, expr: &Expr) -> CalcResult<Evaluation> {
        self.bind(expr)?.evaluation()
    }

    /// Resolve identifiers and expand engineering functions.
    pub fn bind(&self, expr: &Expr) -> CalcResult<Bound> {
        let mut values = BTreeMap::new();
        let mut stack = Vec::new();
        let tree = self.bind_tree(expr, &mut values, &mut stack)?;
        debug!("bound tree {} with {} numeric values", tree, values.len());
        Ok(Bound { tree, values })
    }

    fn bind_tree(
        &self,
        expr: &Expr,
        values: &mut BTreeMap<String, Dimensioned>,
        stack: &mut Vec<String>,
    ) -> CalcResult<Expr> {
        let bin = |a: &Expr, b: &Expr, values: &mut BTreeMap<String, Dimensioned>, stack: &mut Vec<String>| {
            Ok::<_, CalcError>((
                Box::new(self.bind_tree(a, values, stack)?),
                Box::new(self.bind_tree(b, values, stack)?),
            ))
        };
        Ok(match expr {
            Expr::Number(_) | Expr::Constant(_) => expr.clone(),
            Expr::Symbol(name) => self.bind_symbol(name, values, stack)?,
            Expr::Neg(a) => Expr::Neg(Box::new(self.bind_tree(a, values, stack)?)),
            Expr::Add(a, b) => {
                let (a, b) = bin(a, b, values, stack)?;
                Expr::Add(a, b)
            }
            Expr::Sub(a, b) => {
                let (a, b) = bin(a, b, values, stack)?;
                Expr::Sub(a, b)
            }
            Expr::Mul(a, b) => {
                let (a, b) = bin(a, b, values, stack)?;
                Expr::Mul(a, b)
            }
            Expr::Div(a, b) => {
                let (a, b) = bin(a, b, values, stack)?;
                Expr::Div(a, b)
            }
            Expr::Pow(a, b) => {
                let (a, b) = bin(a, b, values, stack)?;
                Expr::Pow(a, b)
            }
            Expr::Call { name, args } => {
                let args = args
                    .iter()
                    .map(|a| self.bind_tree(a, values, stack))
                    .collect::<CalcResult<Vec<_>>>()?;
                if is_builtin(name) {
                    Expr::Call { name: canonical_function_name(name).to_string(), args }
                } else if let Some(function) = EngineeringFunction::from_name(name) {
                    debug!("expanding engineering function {}", name);
                    function.expand(&args)?
                } else {
                    return Err(CalcError::evaluation_failed(
                        expr.to_string(),
                        format!("Unknown function '{}'", name),
                    ));
                }
            }
        })
    }

    fn bind_symbol(
        &self,
        name: &str,
        values: &mut BTreeMap<String, Dimensioned>,
        stack: &mut Vec<String>,
    ) -> CalcResult<Expr> {
        if let Some(binding) = self.lookup(name) {
            match binding.quantity.magnitude() {
                Magnitude::Symbolic(body) => {
                    if stack.iter().any(|s| s == name) {
                        return Err(CalcError::invalid_variable(
                            name,
                            format!("circular definition through {}", stack.join(" -> ")),
                        ));
                    }
                    stack.push(name.to_string());
                    let bound = self.bind_tree(body, values, stack)?;
                    stack.pop();
                    return Ok(bound);
                }
                _ => {
                    let value = binding.quantity.base_value().unwrap_or_default();
                    values.insert(
                        name.to_string(),
                        Dimensioned { value, dimension: binding.quantity.dimension() },
                    );
                    return Ok(Expr::Symbol(name.to_string()));
                }
            }
        }
        Ok(match Constant::lookup(name) {
            Some(constant) if self.excluded != Some(name) => Expr::Constant(constant),
            _ => Expr::Symbol(name.to_string()),
        })
    }
}

fn same_dimension(op: &str, left: Dimensioned, right: Dimensioned) -> CalcResult<Dimension> {
    if left.dimension != right.dimension {
        return Err(CalcError::incompatible(
            describe(left.dimension),
            describe(right.dimension),
            format!("cannot {} quantities with different dimensions", op),
        ));
    }
    Ok(left.dimension)
}

fn describe(dimension: Dimension) -> String {
    if dimension.is_dimensionless() {
        "dimensionless".to_string()
    } else {
        dimension.canonical_unit()
    }
}

fn out_of_range(a: Dimension, b: Dimension) -> CalcError {
    CalcError::incompatible(describe(a), describe(b), "dimension exponents out of range")
}

/// Integer value of a dimensionless real exponent.
fn integer_exponent(exponent: Dimensioned) -> Option<i32> {
    let z = exponent.value;
    if !exponent.dimension.is_dimensionless() || z.im != 0.0 || z.re.fract() != 0.0 || z.re.abs() > MAX_EXPONENT as f64 {
        return None;
    }
    Some(z.re as i32)
}

/// Numeric walk with dimension tracking.
pub fn eval_dimensioned(expr: &Expr, values: &BTreeMap<String, Dimensioned>) -> CalcResult<Dimensioned> {
    let fail = |reason: String| CalcError::evaluation_failed(expr.to_string(), reason);
    let result = match expr {
        Expr::Number(n) => Dimensioned::plain(Complex64::new(*n, 0.0)),
        Expr::Constant(c) => Dimensioned::plain(c.value()),
        Expr::Symbol(name) => *values
            .get(name)
            .ok_or_else(|| fail(format!("Symbol '{}' has no value", name)))?,
        Expr::Neg(a) => {
            let a = eval_dimensioned(a, values)?;
            Dimensioned { value: -a.value, dimension: a.dimension }
        }
        Expr::Add(a, b) => {
            let (a, b) = (eval_dimensioned(a, values)?, eval_dimensioned(b, values)?);
            Dimensioned { value: a.value + b.value, dimension: same_dimension("add", a, b)? }
        }
        Expr::Sub(a, b) => {
            let (a, b) = (eval_dimensioned(a, values)?, eval_dimensioned(b, values)?);
            Dimensioned { value: a.value - b.value, dimension: same_dimension("subtract", a, b)? }
        }
        Expr::Mul(a, b) => {
            let (a, b) = (eval_dimensioned(a, values)?, eval_dimensioned(b, values)?);
            let dimension = a.dimension.checked_mul(b.dimension).ok_or_else(|| out_of_range(a.dimension, b.dimension))?;
            Dimensioned { value: a.value * b.value, dimension }
        }
        Expr::Div(a, b) => {
            let (a, b) = (eval_dimensioned(a, values)?, eval_dimensioned(b, values)?);
            if b.value.norm() == 0.0 {
                return Err(fail("Division by zero".to_string()));
            }
            let dimension = a.dimension.checked_div(b.dimension).ok_or_else(|| out_of_range(a.dimension, b.dimension))?;
            Dimensioned { value: a.value / b.value, dimension }
        }
        Expr::Pow(a, b) => {
            let (base, exponent) = (eval_dimensioned(a, values)?, eval_dimensioned(b, values)?);
            if !exponent.dimension.is_dimensionless() {
                return Err(CalcError::incompatible(
                    describe(exponent.dimension),
                    "dimensionless",
                    "exponents must be dimensionless",
                ));
            }
            if base.value.norm() == 0.0 && exponent.value.re < 0.0 {
                return Err(fail("Division by zero".to_string()));
            }
            let dimension = if base.dimension.is_dimensionless() {
                base.dimension
            } else {
                let n = match (b.free_symbols().is_empty(), integer_exponent(exponent)) {
                    (true, Some(n)) => n,
                    _ => {
                        return Err(CalcError::incompatible(
                            describe(base.dimension),
                            b.to_string(),
                            "a dimensioned value can only be raised to an integer constant",
                        ))
                    }
                };
                base.dimension
                    .checked_powi(n)
                    .ok_or_else(|| out_of_range(base.dimension, exponent.dimension))?
            };
            Dimensioned { value: complex_pow(base.value, exponent.value), dimension }
        }
        Expr::Call { name, args } => {
            if args.len() != 1 {
                return Err(fail(format!("Function '{}' expects 1 argument, got {}", name, args.len())));
            }
            let arg = eval_dimensioned(&args[0], values)?;
            let dimension = match canonical_function_name(name) {
                "abs" => arg.dimension,
                "sqrt" => arg.dimension.root(2).ok_or_else(|| {
                    CalcError::incompatible(
                        describe(arg.dimension),
                        "even powers",
                        "square root of a dimension with odd exponents",
                    )
                })?,
                _ if arg.dimension.is_dimensionless() => arg.dimension,
                other => {
                    return Err(CalcError::incompatible(
                        describe(arg.dimension),
                        "dimensionless",
                        format!("'{}' needs a dimensionless argument", other),
                    ))
                }
            };
            let value =
                apply_builtin(name, arg.value).ok_or_else(|| fail(format!("Unknown function '{}'", name)))?;
            Dimensioned { value, dimension }
        }
    };
    if result.value.re.is_nan() || result.value.im.is_nan() {
        return Err(fail("Result is undefined".to_string()));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{parse_variable, Scope, VariablePayload};

    fn locals(registry: &UnitRegistry, vars: &[(&str, VariablePayload)]) -> BTreeMap<String, VariableBinding> {
        vars.iter()
            .map(|(name, payload)| {
                (name.to_string(), parse_variable(name, payload, registry, Scope::Local).unwrap())
            })
            .collect()
    }

    fn eval(text: &str, vars: &[(&str, VariablePayload)]) -> CalcResult<Evaluation> {
        let registry = UnitRegistry::new();
        let session = SymbolTable::new();
        let locals = locals(&registry, vars);
        Evaluator::new(&registry, &session, &locals).evaluate_str(text)
    }

    fn numeric(text: &str, vars: &[(&str, VariablePayload)]) -> (f64, Dimension) {
        match eval(text, vars).unwrap() {
            Evaluation::Numeric { value, dimension } => (value.re, dimension),
            other => panic!("expected numeric, got {:?}", other),
        }
    }

    #[test]
    fn test_numeric_arithmetic() {
        let (value, dimension) = numeric("2 + 3", &[]);
        assert!((value - 5.0).abs() < 1e-12);
        assert!(dimension.is_dimensionless());
    }

    #[test]
    fn test_symbolic_free_symbol() {
        match eval("x + 1", &[]).unwrap() {
            Evaluation::Symbolic { expr, free_symbols } => {
                assert_eq!(expr.to_string(), "x + 1");
                assert_eq!(free_symbols, vec!["x".to_string()]);
            }
            other => panic!("expected symbolic, got {:?}", other),
        }
    }

    #[test]
    fn test_force_over_area_is_pressure() {
        let vars = [
            ("F", VariablePayload::with_unit(100.0, "N")),
            ("A", VariablePayload::with_unit(2.0, "m^2")),
        ];
        let (value, dimension) = numeric("F / A", &vars);
        assert!((value - 50.0).abs() < 1e-12);
        assert_eq!(dimension, Dimension::new([-1, 1, -2, 0, 0, 0, 0]));
    }

    #[test]
    fn test_scale_normalisation() {
        let vars = [
            ("a", VariablePayload::with_unit(1.0, "m")),
            ("b", VariablePayload::with_unit(50.0, "cm")),
        ];
        let (value, dimension) = numeric("a + b", &vars);
        assert!((value - 1.5).abs() < 1e-12);
        assert_eq!(dimension, Dimension::new([1, 0, 0, 0, 0, 0, 0]));
    }

    #[test]
    fn test_mismatched_addition() {
        let vars = [
            ("a", VariablePayload::with_unit(1.0, "m")),
            ("t", VariablePayload::with_unit(1.0, "s")),
        ];
        let err = eval("a + t", &vars).unwrap_err();
        assert_eq!(err.error_code(), "INCOMPATIBLE_DIMENSIONS");
    }

    #[test]
    fn test_integer_power_scales_dimension() {
        let vars = [("L", VariablePayload::with_unit(3.0, "m"))];
        let (value, dimension) = numeric("L^3", &vars);
        assert!((value - 27.0).abs() < 1e-12);
        assert_eq!(dimension, Dimension::new([3, 0, 0, 0, 0, 0, 0]));
    }

    #[test]
    fn test_dimension_exponent_overflow_is_an_error() {
        let vars = [("L", VariablePayload::with_unit(1.0, "m"))];
        let text = format!("{}L{}", "(".repeat(6), ")^64".repeat(6));
        assert!(eval(&text, &vars).is_err());
        assert!(eval("L^65", &vars).is_err());
    }

    #[test]
    fn test_fractional_power_on_dimension_rejected() {
        let vars = [("L", VariablePayload::with_unit(4.0, "m"))];
        assert_eq!(eval("L^0.5", &vars).unwrap_err().error_code(), "INCOMPATIBLE_DIMENSIONS");
        let vars = [("L", VariablePayload::with_unit(4.0, "m")), ("n", VariablePayload::Number(2.0))];
        assert_eq!(eval("L^n", &vars).unwrap_err().error_code(), "INCOMPATIBLE_DIMENSIONS");
    }

    #[test]
    fn test_sqrt_of_area() {
        let vars = [("A", VariablePayload::with_unit(16.0, "m^2"))];
        let (value, dimension) = numeric("sqrt(A)", &vars);
        assert!((value - 4.0).abs() < 1e-12);
        assert_eq!(dimension, Dimension::new([1, 0, 0, 0, 0, 0, 0]));
    }

    #[test]
    fn test_transcendental_needs_dimensionless() {
        let vars = [("L", VariablePayload::with_unit(1.0, "m"))];
        assert_eq!(eval("sin(L)", &vars).unwrap_err().error_code(), "INCOMPATIBLE_DIMENSIONS");
    }

    #[test]
    fn test_constants_bind_after_variables() {
        let (value, _) = numeric("2*pi", &[]);
        assert!((value - 2.0 * std::f64::consts::PI).abs() < 1e-12);
        let (value, _) = numeric("E*I", &[("E", 200.0.into()), ("I", 3.0.into())]);
        assert!((value - 600.0).abs() < 1e-12);
    }

    #[test]
    fn test_local_shadows_session() {
        let registry = UnitRegistry::new();
        let mut session = SymbolTable::new();
        session.define(parse_variable("g", &9.81.into(), &registry, Scope::Global).unwrap());
        let locals = locals(&registry, &[("g", 10.0.into())]);
        let result = Evaluator::new(&registry, &session, &locals).evaluate_str("2*g").unwrap();
        assert_eq!(result, Evaluation::Numeric { value: Complex64::new(20.0, 0.0), dimension: Dimension::dimensionless() });

        let empty = BTreeMap::new();
        let result = Evaluator::new(&registry, &session, &empty).evaluate_str("2*g").unwrap();
        assert_eq!(result.mode(), EvalMode::Numeric);
    }

    #[test]
    fn test_symbolic_variable_value() {
        match eval("y^2", &[("y", "a + 1".into())]).unwrap() {
            Evaluation::Symbolic { free_symbols, .. } => assert_eq!(free_symbols, vec!["a".to_string()]),
            other => panic!("expected symbolic, got {:?}", other),
        }
        let (value, _) = numeric("y^2", &[("y", "a + 1".into()), ("a", 2.0.into())]);
        assert!((value - 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_circular_definition() {
        let err = eval("a", &[("a", "b + 1".into()), ("b", "a * 2".into())]).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_VARIABLE");
    }

    #[test]
    fn test_engineering_function_with_units() {
        let vars = [
            ("w", VariablePayload::with_unit(2.0, "kN/m")),
            ("L", VariablePayload::with_unit(6.0, "m")),
        ];
        let (value, dimension) = numeric("uniform_load_max_moment(w, L)", &vars);
        assert!((value - 9000.0).abs() < 1e-9);
        assert_eq!(dimension, Dimension::new([2, 1, -2, 0, 0, 0, 0]));
    }

    #[test]
    fn test_unknown_function() {
        assert_eq!(eval("frob(2)", &[]).unwrap_err().error_code(), "EVALUATION_FAILED");
    }

    #[test]
    fn test_complex_result() {
        match eval("sqrt(-4)", &[]).unwrap() {
            Evaluation::Numeric { value, .. } => assert!((value.im - 2.0).abs() < 1e-12),
            other => panic!("expected numeric, got {:?}", other),
        }
    }

    #[test]
    fn test_excluded_variable_stays_free() {
        let registry = UnitRegistry::new();
        let session = SymbolTable::new();
        let locals = locals(&registry, &[("x", 3.0.into())]);
        let bound = Evaluator::new(&registry, &session, &locals).excluding("x").bind(&Expr::sym("x")).unwrap();
        assert_eq!(bound.free_symbols(), vec!["x".to_string()]);
    }
}
