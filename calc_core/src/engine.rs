//! # Engine
//!
//! The handle every caller goes through. An [`Engine`] owns the unit
//! registry, the session symbol table and the settings; callers construct
//! one and pass it by reference.
//!
//! Every public operation returns a result record. Failures never escape
//! as `Err`: they land in the record's `error` field as an
//! [`ErrorReport`], and shared state is left untouched.
//!
//! ## Example
//!
//! ```rust
//! use calc_core::engine::{Engine, Variables};
//! use calc_core::value::VariablePayload;
//!
//! let engine = Engine::new();
//! let mut vars = Variables::new();
//! vars.insert("F".to_string(), VariablePayload::with_unit(100.0, "N"));
//! vars.insert("A".to_string(), VariablePayload::with_unit(2.0, "m^2"));
//!
//! let result = engine.evaluate("F / A", &vars);
//! assert!(result.error.is_none());
//! assert_eq!(result.formatted, "50 m^-1*kg*s^-2");
//! ```

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{info, warn};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::calculus::{self, infer_dimension, residual, root_value, OptimizeGoal, SolveMethod};
use crate::errors::{CalcError, CalcResult, ErrorReport};
use crate::evaluator::{Bound, EvalMode, Evaluation, Evaluator};
use crate::expr::{parse_equation, parse_expression, Expr};
use crate::fitting::{self, FitMethod};
use crate::format::{format_complex, format_real, format_with_unit};
use crate::functions::{function_listing, FunctionListing};
use crate::matrix::{self, Eigenpair, ExprMatrix, MatrixOp, MatrixValue};
use crate::settings::{EngineSettings, PrecisionSettings};
use crate::symbols::SymbolTable;
use crate::units::{Dimension, UnitCategory, UnitDef, UnitDimensionInfo, UnitRegistry};
use crate::value::{is_valid_name, parse_variable, Magnitude, RawValue, Scope, VariableBinding, VariablePayload};

/// Call variables keyed by name.
pub type Variables = BTreeMap<String, VariablePayload>;

/// A computed value: real, complex (`[re, im]`) or canonical expression text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultValue {
    Real(f64),
    Complex(Complex64),
    Symbolic(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub expression: String,
    pub value: Option<ResultValue>,
    pub unit: Option<String>,
    pub formatted: String,
    /// Known once binding succeeded
    pub mode: Option<EvalMode>,
    pub free_symbols: Vec<String>,
    pub error: Option<ErrorReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub value: ResultValue,
    pub unit: Option<String>,
    pub formatted: String,
    /// Exact root as an expression
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveResult {
    pub equation: String,
    pub solve_for: String,
    pub method: SolveMethod,
    pub solutions: Vec<Solution>,
    pub error: Option<ErrorReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivativeResult {
    pub expression: String,
    pub variable: String,
    pub order: u32,
    pub derivative: Option<String>,
    pub formatted: String,
    pub error: Option<ErrorReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegralResult {
    pub expression: String,
    pub variable: String,
    pub integral: Option<String>,
    /// Value of a definite integral with constant bounds
    pub numeric: Option<f64>,
    pub formatted: String,
    pub error: Option<ErrorReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub value: Option<f64>,
    pub unit: String,
    pub formatted: String,
    pub error: Option<ErrorReport>,
}

/// Payload of a matrix operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatrixOutput {
    Matrix { rows: Vec<Vec<String>> },
    Scalar { value: String },
    Rank { rank: usize },
    Eigen { pairs: Vec<Eigenpair> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixResult {
    pub operation: MatrixOp,
    pub output: Option<MatrixOutput>,
    pub formatted: String,
    pub error: Option<ErrorReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveFitResult {
    pub method: FitMethod,
    pub coefficients: Vec<f64>,
    pub r_squared: Option<f64>,
    pub expression: Option<String>,
    pub formatted: String,
    pub error: Option<ErrorReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeResult {
    pub expression: String,
    pub variable: String,
    pub goal: OptimizeGoal,
    pub x: Option<f64>,
    pub value: Option<f64>,
    pub success: bool,
    pub iterations: usize,
    pub formatted: String,
    pub error: Option<ErrorReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecisionResult {
    /// Settings in force after the call
    pub precision: PrecisionSettings,
    pub error: Option<ErrorReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDefinitionResult {
    pub name: String,
    pub definition: String,
    pub unit: Option<UnitDef>,
    pub error: Option<ErrorReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceResult {
    pub kind: String,
    pub unit: String,
    pub error: Option<ErrorReport>,
}

/// A session variable as shown to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSummary {
    pub name: String,
    pub value: ResultValue,
    pub unit: Option<String>,
    pub formatted: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableResult {
    pub name: String,
    pub variable: Option<VariableSummary>,
    /// Whether an earlier binding of the same name was replaced
    pub replaced: bool,
    pub error: Option<ErrorReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitInfoResult {
    pub unit: String,
    pub info: Option<UnitDimensionInfo>,
    pub error: Option<ErrorReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibleUnitsResult {
    pub unit: String,
    pub units: Vec<String>,
    pub error: Option<ErrorReport>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn report(operation: &str, subject: &str, error: CalcError) -> Option<ErrorReport> {
    warn!("{} failed for '{}': {}", operation, subject, error);
    Some(error.report())
}

fn require_name(name: &str) -> CalcResult<()> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(CalcError::invalid_variable(
            name,
            "names start with a letter followed by letters, digits or '_'",
        ))
    }
}

/// Unit-aware expression engine.
#[derive(Debug)]
pub struct Engine {
    registry: UnitRegistry,
    symbols: RwLock<SymbolTable>,
    settings: RwLock<EngineSettings>,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

impl Engine {
    /// Engine with default settings and the seeded unit catalog.
    pub fn new() -> Self {
        Engine {
            registry: UnitRegistry::new(),
            symbols: RwLock::new(SymbolTable::new()),
            settings: RwLock::new(EngineSettings::default()),
        }
    }

    /// Engine configured from a settings document.
    ///
    /// Fails when the precision settings are out of range or a unit
    /// preference names an unknown kind or a unit of the wrong dimension.
    pub fn with_settings(settings: EngineSettings) -> CalcResult<Self> {
        settings.precision.validate()?;
        let registry = UnitRegistry::with_cache_capacity(settings.conversion_cache_capacity);
        for (kind, unit) in &settings.unit_preferences {
            registry.set_preference(kind, unit)?;
        }
        info!(
            "engine configured: {} unit preference(s), output format {}",
            settings.unit_preferences.len(),
            settings.precision.output_format
        );
        Ok(Engine {
            registry,
            symbols: RwLock::new(SymbolTable::new()),
            settings: RwLock::new(settings),
        })
    }

    pub fn registry(&self) -> &UnitRegistry {
        &self.registry
    }

    /// Current settings, including unit preferences set since construction.
    pub fn settings(&self) -> EngineSettings {
        let mut settings = read(&self.settings).clone();
        settings.unit_preferences = self.registry.snapshot().preferences().clone();
        settings
    }

    fn precision(&self) -> PrecisionSettings {
        read(&self.settings).precision.clone()
    }

    fn locals(&self, variables: &Variables) -> CalcResult<BTreeMap<String, VariableBinding>> {
        variables
            .iter()
            .map(|(name, payload)| Ok((name.clone(), parse_variable(name, payload, &self.registry, Scope::Local)?)))
            .collect()
    }

    /// Value, unit and text for an SI magnitude of the given dimension.
    fn present(
        &self,
        value: Complex64,
        dimension: &Dimension,
        precision: &PrecisionSettings,
    ) -> CalcResult<(ResultValue, Option<String>, String)> {
        let (unit, re) = match self.registry.present(value.re, dimension)? {
            Some((unit, re)) => (Some(unit), re),
            None => (None, value.re),
        };
        let im = if value.im == 0.0 {
            0.0
        } else {
            match self.registry.present(value.re + value.im, dimension)? {
                Some((_, shifted)) => shifted - re,
                None => value.im,
            }
        };
        let z = Complex64::new(re, im);
        let result = if im.abs() < precision.tolerance || im == 0.0 {
            ResultValue::Real(re)
        } else {
            ResultValue::Complex(z)
        };
        let formatted = format_with_unit(format_complex(z, precision), unit.as_deref());
        Ok((result, unit, formatted))
    }

    // ------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------

    /// Evaluate an expression symbolically or numerically.
    pub fn evaluate(&self, expression: &str, variables: &Variables) -> EvaluationResult {
        let mut result = EvaluationResult {
            expression: expression.to_string(),
            value: None,
            unit: None,
            formatted: String::new(),
            mode: None,
            free_symbols: Vec::new(),
            error: None,
        };
        if let Err(error) = self.try_evaluate(expression, variables, &mut result) {
            result.error = report("evaluate", expression, error);
        }
        result
    }

    fn try_evaluate(&self, expression: &str, variables: &Variables, result: &mut EvaluationResult) -> CalcResult<()> {
        let expr = parse_expression(expression)?;
        let locals = self.locals(variables)?;
        let symbols = read(&self.symbols);
        let bound = Evaluator::new(&self.registry, &symbols, &locals).bind(&expr)?;
        result.mode = Some(bound.mode());
        match bound.evaluation()? {
            Evaluation::Symbolic { expr, free_symbols } => {
                let text = expr.to_string();
                result.value = Some(ResultValue::Symbolic(text.clone()));
                result.formatted = text;
                result.free_symbols = free_symbols;
            }
            Evaluation::Numeric { value, dimension } => {
                let (value, unit, formatted) = self.present(value, &dimension, &self.precision())?;
                result.value = Some(value);
                result.unit = unit;
                result.formatted = formatted;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Calculus
    // ------------------------------------------------------------------

    /// Solve `equation` for `solve_for`. An equation without `=` means `= 0`.
    pub fn solve(&self, equation: &str, solve_for: &str, variables: &Variables, method: SolveMethod) -> SolveResult {
        let (solutions, error) = match self.try_solve(equation, solve_for, variables, method) {
            Ok(solutions) => (solutions, None),
            Err(error) => (Vec::new(), report("solve", equation, error)),
        };
        SolveResult {
            equation: equation.to_string(),
            solve_for: solve_for.to_string(),
            method,
            solutions,
            error,
        }
    }

    fn try_solve(
        &self,
        equation: &str,
        solve_for: &str,
        variables: &Variables,
        method: SolveMethod,
    ) -> CalcResult<Vec<Solution>> {
        require_name(solve_for)?;
        let (lhs, rhs) = parse_equation(equation)?;
        let locals = self.locals(variables)?;
        let symbols = read(&self.symbols);
        let bound = Evaluator::new(&self.registry, &symbols, &locals)
            .excluding(solve_for)
            .bind(&residual(&lhs, &rhs))?;
        let dimension = infer_dimension(&bound, solve_for);
        let f = bound.unitless_tree();

        let settings = read(&self.settings).clone();
        let roots = match method {
            SolveMethod::Symbolic => calculus::solve_symbolic(&f, solve_for)?,
            SolveMethod::Numeric => vec![Expr::Number(calculus::solve_numeric(&f, solve_for, &settings.solver)?)],
        };
        info!("solved {} for {}: {} root(s)", equation, solve_for, roots.len());
        roots
            .iter()
            .map(|root| self.solution(root, dimension, &settings.precision))
            .collect()
    }

    fn solution(&self, root: &Expr, dimension: Option<Dimension>, precision: &PrecisionSettings) -> CalcResult<Solution> {
        let expression = root.to_string();
        Ok(match root_value(root) {
            Some(z) => {
                let (value, unit, formatted) = self.present(z, &dimension.unwrap_or_default(), precision)?;
                Solution { value, unit, formatted, expression }
            }
            None => Solution {
                value: ResultValue::Symbolic(expression.clone()),
                unit: None,
                formatted: expression.clone(),
                expression,
            },
        })
    }

    /// Bind session values, constants and engineering functions, leaving `variable` free.
    fn bind_over(&self, expr: &Expr, variable: &str) -> CalcResult<Bound> {
        let locals = BTreeMap::new();
        let symbols = read(&self.symbols);
        Evaluator::new(&self.registry, &symbols, &locals).excluding(variable).bind(expr)
    }

    /// `order`-th derivative of `expression` with respect to `variable`.
    pub fn differentiate(&self, expression: &str, variable: &str, order: u32) -> DerivativeResult {
        let outcome = require_name(variable)
            .and_then(|_| parse_expression(expression))
            .and_then(|expr| self.bind_over(&expr, variable))
            .and_then(|bound| calculus::differentiate(&bound.unitless_tree(), variable, order));
        let (derivative, error) = match outcome {
            Ok(d) => (Some(d.to_string()), None),
            Err(error) => (None, report("differentiate", expression, error)),
        };
        DerivativeResult {
            expression: expression.to_string(),
            variable: variable.to_string(),
            order,
            formatted: derivative.clone().unwrap_or_default(),
            derivative,
            error,
        }
    }

    /// Antiderivative, or the definite integral when both bounds are given.
    pub fn integrate(&self, expression: &str, variable: &str, lower: Option<&str>, upper: Option<&str>) -> IntegralResult {
        let mut result = IntegralResult {
            expression: expression.to_string(),
            variable: variable.to_string(),
            integral: None,
            numeric: None,
            formatted: String::new(),
            error: None,
        };
        match self.try_integrate(expression, variable, lower, upper) {
            Ok((integral, numeric)) => {
                result.formatted = match numeric {
                    Some(value) => format_real(value, &self.precision()),
                    None => integral.to_string(),
                };
                result.integral = Some(integral.to_string());
                result.numeric = numeric;
            }
            Err(error) => result.error = report("integrate", expression, error),
        }
        result
    }

    fn try_integrate(
        &self,
        expression: &str,
        variable: &str,
        lower: Option<&str>,
        upper: Option<&str>,
    ) -> CalcResult<(Expr, Option<f64>)> {
        require_name(variable)?;
        let integrand = self.bind_over(&parse_expression(expression)?, variable)?.unitless_tree();
        match (lower, upper) {
            (None, None) => Ok((calculus::antiderivative(&integrand, variable)?, None)),
            (Some(lower), Some(upper)) => {
                let lower = self.bind_over(&parse_expression(lower)?, variable)?.unitless_tree();
                let upper = self.bind_over(&parse_expression(upper)?, variable)?.unitless_tree();
                calculus::definite(&integrand, variable, &lower, &upper)
            }
            (lower, upper) => Err(CalcError::invalid_input(
                "bounds",
                format!("{:?}..{:?}", lower, upper),
                "both lower and upper bounds are required",
            )),
        }
    }

    /// Minimum or maximum of a single-variable expression.
    pub fn optimize(
        &self,
        expression: &str,
        variable: &str,
        goal: OptimizeGoal,
        bounds: Option<(f64, f64)>,
    ) -> OptimizeResult {
        let mut result = OptimizeResult {
            expression: expression.to_string(),
            variable: variable.to_string(),
            goal,
            x: None,
            value: None,
            success: false,
            iterations: 0,
            formatted: String::new(),
            error: None,
        };
        let solver = read(&self.settings).solver.clone();
        let outcome = require_name(variable)
            .and_then(|_| parse_expression(expression))
            .and_then(|expr| self.bind_over(&expr, variable))
            .and_then(|bound| calculus::optimize(&bound.unitless_tree(), variable, goal, bounds, &solver));
        match outcome {
            Ok(optimum) => {
                let precision = self.precision();
                result.formatted = format!(
                    "{} = {}, value = {}",
                    variable,
                    format_real(optimum.x, &precision),
                    format_real(optimum.value, &precision)
                );
                result.x = Some(optimum.x);
                result.value = Some(optimum.value);
                result.success = optimum.success;
                result.iterations = optimum.iterations;
            }
            Err(error) => result.error = report("optimize", expression, error),
        }
        result
    }

    // ------------------------------------------------------------------
    // Matrices and fitting
    // ------------------------------------------------------------------

    /// Apply a matrix operation to matrices given as rows of numbers or expression text.
    pub fn matrix_operation(&self, operation: MatrixOp, matrices: &[Vec<Vec<RawValue>>]) -> MatrixResult {
        let outcome = matrices
            .iter()
            .map(|rows| ExprMatrix::from_raw(rows))
            .collect::<CalcResult<Vec<_>>>()
            .and_then(|operands| matrix::matrix_operation(operation, &operands));
        match outcome {
            Ok(value) => {
                let (output, formatted) = self.matrix_output(value);
                MatrixResult { operation, output: Some(output), formatted, error: None }
            }
            Err(error) => MatrixResult {
                operation,
                output: None,
                formatted: String::new(),
                error: report("matrix_operation", &operation.to_string(), error),
            },
        }
    }

    fn matrix_output(&self, value: MatrixValue) -> (MatrixOutput, String) {
        let precision = self.precision();
        let entry = |e: &Expr| match e.as_number() {
            Some(n) => format_real(n, &precision),
            None => e.to_string(),
        };
        match value {
            MatrixValue::Matrix(m) => {
                let formatted = m
                    .rows()
                    .iter()
                    .map(|row| format!("[{}]", row.iter().map(&entry).collect::<Vec<_>>().join(", ")))
                    .collect::<Vec<_>>()
                    .join(", ");
                (MatrixOutput::Matrix { rows: m.to_strings() }, format!("[{}]", formatted))
            }
            MatrixValue::Scalar(e) => {
                let formatted = entry(&e);
                (MatrixOutput::Scalar { value: e.to_string() }, formatted)
            }
            MatrixValue::Rank(rank) => (MatrixOutput::Rank { rank }, rank.to_string()),
            MatrixValue::Eigen(pairs) => {
                let formatted = pairs
                    .iter()
                    .map(|pair| format_complex(pair.value, &precision))
                    .collect::<Vec<_>>()
                    .join(", ");
                (MatrixOutput::Eigen { pairs }, formatted)
            }
        }
    }

    /// Least-squares fit of `y` against `x`.
    pub fn curve_fit(&self, x: &[f64], y: &[f64], degree: usize, method: FitMethod) -> CurveFitResult {
        match fitting::curve_fit(x, y, degree, method) {
            Ok(fit) => {
                let precision = self.precision();
                let formatted = format!(
                    "y = {} (R² = {})",
                    fit.expression,
                    format_real(fit.r_squared, &precision)
                );
                CurveFitResult {
                    method,
                    coefficients: fit.coefficients,
                    r_squared: Some(fit.r_squared),
                    expression: Some(fit.expression.to_string()),
                    formatted,
                    error: None,
                }
            }
            Err(error) => CurveFitResult {
                method,
                coefficients: Vec::new(),
                r_squared: None,
                expression: None,
                formatted: String::new(),
                error: report("curve_fit", &method.to_string(), error),
            },
        }
    }

    // ------------------------------------------------------------------
    // Units
    // ------------------------------------------------------------------

    pub fn is_valid_unit(&self, unit: &str) -> bool {
        self.registry.is_valid_unit(unit)
    }

    pub fn convert_unit(&self, value: f64, from_unit: &str, to_unit: &str) -> ConversionResult {
        match self.registry.convert(value, from_unit, to_unit) {
            Ok(converted) => ConversionResult {
                value: Some(converted),
                unit: to_unit.to_string(),
                formatted: format_with_unit(format_real(converted, &self.precision()), Some(to_unit)),
                error: None,
            },
            Err(error) => ConversionResult {
                value: None,
                unit: to_unit.to_string(),
                formatted: String::new(),
                error: report("convert_unit", &format!("{} {} -> {}", value, from_unit, to_unit), error),
            },
        }
    }

    pub fn define_custom_unit(&self, name: &str, definition: &str) -> UnitDefinitionResult {
        let (unit, error) = match self.registry.define_custom_unit(name, definition) {
            Ok(def) => (Some(def), None),
            Err(error) => (None, report("define_custom_unit", name, error)),
        };
        UnitDefinitionResult {
            name: name.to_string(),
            definition: definition.to_string(),
            unit,
            error,
        }
    }

    /// Prefer `unit` when presenting results of quantity `kind`.
    pub fn set_unit_preference(&self, kind: &str, unit: &str) -> PreferenceResult {
        let error = self
            .registry
            .set_preference(kind, unit)
            .err()
            .and_then(|error| report("set_unit_preference", kind, error));
        PreferenceResult { kind: kind.to_string(), unit: unit.to_string(), error }
    }

    /// Drop the preference for `kind`; returns whether one existed.
    pub fn clear_unit_preference(&self, kind: &str) -> bool {
        let removed = self.registry.clear_preference(kind);
        if removed {
            info!("unit preference for {} cleared", kind);
        }
        removed
    }

    pub fn unit_dimension_info(&self, unit: &str) -> UnitInfoResult {
        let (info, error) = match self.registry.unit_dimension_info(unit) {
            Ok(info) => (Some(info), None),
            Err(error) => (None, report("unit_dimension_info", unit, error)),
        };
        UnitInfoResult { unit: unit.to_string(), info, error }
    }

    pub fn compatible_units(&self, unit: &str) -> CompatibleUnitsResult {
        let (units, error) = match self.registry.compatible_units(unit) {
            Ok(units) => (units, None),
            Err(error) => (Vec::new(), report("compatible_units", unit, error)),
        };
        CompatibleUnitsResult { unit: unit.to_string(), units, error }
    }

    pub fn unit_categories(&self) -> Vec<UnitCategory> {
        self.registry.unit_categories()
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    /// Replace the precision settings when they validate.
    pub fn set_precision(&self, precision: PrecisionSettings) -> PrecisionResult {
        if let Err(error) = precision.validate() {
            return PrecisionResult { precision: self.precision(), error: report("set_precision", "precision", error) };
        }
        let mut settings = write(&self.settings);
        settings.precision = precision.clone();
        info!(
            "precision set: {} format, {} decimal places, {} significant digits",
            precision.output_format, precision.decimal_places, precision.significant_digits
        );
        PrecisionResult { precision, error: None }
    }

    // ------------------------------------------------------------------
    // Session variables
    // ------------------------------------------------------------------

    /// Bind a global variable visible to every later call.
    pub fn define_variable(&self, name: &str, payload: &VariablePayload) -> VariableResult {
        match parse_variable(name, payload, &self.registry, Scope::Global) {
            Ok(binding) => {
                let summary = self.summarize(&binding);
                let replaced = write(&self.symbols).define(binding).is_some();
                info!("variable {} = {}", name, summary.formatted);
                VariableResult { name: name.to_string(), variable: Some(summary), replaced, error: None }
            }
            Err(error) => VariableResult {
                name: name.to_string(),
                variable: None,
                replaced: false,
                error: report("define_variable", name, error),
            },
        }
    }

    /// Remove a global variable; returns whether it existed.
    pub fn remove_variable(&self, name: &str) -> bool {
        let removed = write(&self.symbols).remove(name).is_some();
        if removed {
            info!("variable {} removed", name);
        }
        removed
    }

    /// Global variables sorted by name.
    pub fn variables(&self) -> Vec<VariableSummary> {
        read(&self.symbols).iter().map(|binding| self.summarize(binding)).collect()
    }

    /// Remove every global variable; returns how many there were.
    pub fn clear_variables(&self) -> usize {
        let mut symbols = write(&self.symbols);
        let count = symbols.len();
        symbols.clear();
        info!("cleared {} variable(s)", count);
        count
    }

    fn summarize(&self, binding: &VariableBinding) -> VariableSummary {
        let precision = self.precision();
        let unit = binding.quantity.unit().map(|u| u.symbol.clone());
        let (value, text) = match binding.quantity.magnitude() {
            Magnitude::Real(x) => (ResultValue::Real(*x), format_real(*x, &precision)),
            Magnitude::Complex(z) => (ResultValue::Complex(*z), format_complex(*z, &precision)),
            Magnitude::Symbolic(expr) => (ResultValue::Symbolic(expr.to_string()), expr.to_string()),
        };
        VariableSummary {
            name: binding.name.clone(),
            value,
            formatted: format_with_unit(text, unit.as_deref()),
            unit,
            description: binding.description.clone(),
        }
    }

    // ------------------------------------------------------------------
    // Engineering functions
    // ------------------------------------------------------------------

    /// Catalog of engineering functions callable by name.
    pub fn functions(&self) -> Vec<FunctionListing> {
        function_listing()
    }
}
