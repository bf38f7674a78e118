//! # Requests
//!
//! JSON request/response envelope over [`Engine`]. One request names one
//! operation through its `op` field; the response carries the same `op`
//! and the operation's result record.
//!
//! ## Example
//!
//! ```rust
//! use calc_core::Engine;
//!
//! let engine = Engine::new();
//! let response = engine.handle_json(r#"{"op": "convert_unit", "value": 1, "from_unit": "km", "to_unit": "m"}"#);
//! let json = serde_json::to_value(&response).unwrap();
//! assert_eq!(json["op"], "conversion");
//! assert_eq!(json["result"]["value"], 1000.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::calculus::{OptimizeGoal, SolveMethod};
use crate::engine::{
    CompatibleUnitsResult, ConversionResult, CurveFitResult, DerivativeResult, Engine, EvaluationResult,
    IntegralResult, MatrixResult, OptimizeResult, PrecisionResult, PreferenceResult, SolveResult,
    UnitDefinitionResult, UnitInfoResult, VariableResult, VariableSummary, Variables,
};
use crate::errors::{CalcError, ErrorReport};
use crate::fitting::FitMethod;
use crate::functions::FunctionListing;
use crate::matrix::MatrixOp;
use crate::settings::{EngineSettings, PrecisionSettings};
use crate::units::UnitCategory;
use crate::value::{RawValue, VariablePayload};

fn first_order() -> u32 {
    1
}

fn linear() -> usize {
    1
}

/// One engine operation with its arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Evaluate {
        expression: String,
        #[serde(default)]
        variables: Variables,
    },
    Solve {
        equation: String,
        solve_for: String,
        #[serde(default)]
        variables: Variables,
        #[serde(default)]
        method: SolveMethod,
    },
    Differentiate {
        expression: String,
        variable: String,
        #[serde(default = "first_order")]
        order: u32,
    },
    Integrate {
        expression: String,
        variable: String,
        #[serde(default)]
        lower: Option<String>,
        #[serde(default)]
        upper: Option<String>,
    },
    ConvertUnit {
        value: f64,
        from_unit: String,
        to_unit: String,
    },
    MatrixOperation {
        operation: MatrixOp,
        matrices: Vec<Vec<Vec<RawValue>>>,
    },
    CurveFit {
        x: Vec<f64>,
        y: Vec<f64>,
        #[serde(default = "linear")]
        degree: usize,
        #[serde(default)]
        method: FitMethod,
    },
    Optimize {
        expression: String,
        variable: String,
        #[serde(default)]
        goal: OptimizeGoal,
        #[serde(default)]
        bounds: Option<(f64, f64)>,
    },
    SetPrecision {
        precision: PrecisionSettings,
    },
    DefineCustomUnit {
        name: String,
        definition: String,
    },
    SetUnitPreference {
        kind: String,
        unit: String,
    },
    ClearUnitPreference {
        kind: String,
    },
    DefineVariable {
        name: String,
        value: VariablePayload,
    },
    RemoveVariable {
        name: String,
    },
    ListVariables,
    ClearVariables,
    ValidateUnit {
        unit: String,
    },
    UnitDimensionInfo {
        unit: String,
    },
    CompatibleUnits {
        unit: String,
    },
    UnitCategories,
    ListFunctions,
    GetSettings,
}

/// Result of one [`Request`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "op", content = "result", rename_all = "snake_case")]
pub enum Response {
    Evaluation(EvaluationResult),
    Solve(SolveResult),
    Derivative(DerivativeResult),
    Integral(IntegralResult),
    Conversion(ConversionResult),
    Matrix(MatrixResult),
    CurveFit(CurveFitResult),
    Optimize(OptimizeResult),
    Precision(PrecisionResult),
    UnitDefinition(UnitDefinitionResult),
    UnitPreference(PreferenceResult),
    UnitPreferenceCleared { kind: String, removed: bool },
    Variable(VariableResult),
    VariableRemoved { name: String, removed: bool },
    Variables(Vec<VariableSummary>),
    VariablesCleared { count: usize },
    UnitValidity { unit: String, valid: bool },
    UnitInfo(UnitInfoResult),
    CompatibleUnits(CompatibleUnitsResult),
    UnitCategories(Vec<UnitCategory>),
    Functions(Vec<FunctionListing>),
    Settings(EngineSettings),
    /// The request itself could not be read
    Rejected(ErrorReport),
}

impl Response {
    /// Error carried by the response, if any.
    pub fn error(&self) -> Option<&ErrorReport> {
        match self {
            Response::Evaluation(r) => r.error.as_ref(),
            Response::Solve(r) => r.error.as_ref(),
            Response::Derivative(r) => r.error.as_ref(),
            Response::Integral(r) => r.error.as_ref(),
            Response::Conversion(r) => r.error.as_ref(),
            Response::Matrix(r) => r.error.as_ref(),
            Response::CurveFit(r) => r.error.as_ref(),
            Response::Optimize(r) => r.error.as_ref(),
            Response::Precision(r) => r.error.as_ref(),
            Response::UnitDefinition(r) => r.error.as_ref(),
            Response::UnitPreference(r) => r.error.as_ref(),
            Response::Variable(r) => r.error.as_ref(),
            Response::UnitInfo(r) => r.error.as_ref(),
            Response::CompatibleUnits(r) => r.error.as_ref(),
            Response::Rejected(report) => Some(report),
            _ => None,
        }
    }
}

impl Engine {
    /// Dispatch a request to the matching operation.
    pub fn handle(&self, request: Request) -> Response {
        match request {
            Request::Evaluate { expression, variables } => Response::Evaluation(self.evaluate(&expression, &variables)),
            Request::Solve { equation, solve_for, variables, method } => {
                Response::Solve(self.solve(&equation, &solve_for, &variables, method))
            }
            Request::Differentiate { expression, variable, order } => {
                Response::Derivative(self.differentiate(&expression, &variable, order))
            }
            Request::Integrate { expression, variable, lower, upper } => Response::Integral(self.integrate(
                &expression,
                &variable,
                lower.as_deref(),
                upper.as_deref(),
            )),
            Request::ConvertUnit { value, from_unit, to_unit } => {
                Response::Conversion(self.convert_unit(value, &from_unit, &to_unit))
            }
            Request::MatrixOperation { operation, matrices } => {
                Response::Matrix(self.matrix_operation(operation, &matrices))
            }
            Request::CurveFit { x, y, degree, method } => Response::CurveFit(self.curve_fit(&x, &y, degree, method)),
            Request::Optimize { expression, variable, goal, bounds } => {
                Response::Optimize(self.optimize(&expression, &variable, goal, bounds))
            }
            Request::SetPrecision { precision } => Response::Precision(self.set_precision(precision)),
            Request::DefineCustomUnit { name, definition } => {
                Response::UnitDefinition(self.define_custom_unit(&name, &definition))
            }
            Request::SetUnitPreference { kind, unit } => Response::UnitPreference(self.set_unit_preference(&kind, &unit)),
            Request::ClearUnitPreference { kind } => {
                let removed = self.clear_unit_preference(&kind);
                Response::UnitPreferenceCleared { kind, removed }
            }
            Request::DefineVariable { name, value } => Response::Variable(self.define_variable(&name, &value)),
            Request::RemoveVariable { name } => {
                let removed = self.remove_variable(&name);
                Response::VariableRemoved { name, removed }
            }
            Request::ListVariables => Response::Variables(self.variables()),
            Request::ClearVariables => Response::VariablesCleared { count: self.clear_variables() },
            Request::ValidateUnit { unit } => {
                let valid = self.is_valid_unit(&unit);
                Response::UnitValidity { unit, valid }
            }
            Request::UnitDimensionInfo { unit } => Response::UnitInfo(self.unit_dimension_info(&unit)),
            Request::CompatibleUnits { unit } => Response::CompatibleUnits(self.compatible_units(&unit)),
            Request::UnitCategories => Response::UnitCategories(self.unit_categories()),
            Request::ListFunctions => Response::Functions(self.functions()),
            Request::GetSettings => Response::Settings(self.settings()),
        }
    }

    /// Parse one JSON request and dispatch it.
    pub fn handle_json(&self, text: &str) -> Response {
        match serde_json::from_str::<Request>(text) {
            Ok(request) => self.handle(request),
            Err(e) => {
                let error = CalcError::SerializationError { reason: e.to_string() };
                log::warn!("rejected request: {}", error);
                Response::Rejected(error.report())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn call(engine: &Engine, request: Value) -> Value {
        serde_json::to_value(engine.handle_json(&request.to_string())).unwrap()
    }

    #[test]
    fn test_evaluate_with_variables() {
        let engine = Engine::new();
        let response = call(
            &engine,
            json!({
                "op": "evaluate",
                "expression": "F / A",
                "variables": {"F": "100 N", "A": {"value": 2, "unit": "m^2"}}
            }),
        );
        assert_eq!(response["op"], "evaluation");
        assert_eq!(response["result"]["value"], 50.0);
        assert_eq!(response["result"]["mode"], "numeric");
        assert!(response["result"]["error"].is_null());
    }

    #[test]
    fn test_solve_defaults_to_symbolic() {
        let engine = Engine::new();
        let response = call(&engine, json!({"op": "solve", "equation": "x^2 = 9", "solve_for": "x"}));
        assert_eq!(response["result"]["method"], "symbolic");
        let solutions = response["result"]["solutions"].as_array().unwrap();
        assert_eq!(solutions.len(), 2);
        assert_eq!(solutions[1]["value"], 3.0);
    }

    #[test]
    fn test_differentiate_default_order() {
        let engine = Engine::new();
        let response = call(&engine, json!({"op": "differentiate", "expression": "x^3", "variable": "x"}));
        assert_eq!(response["result"]["order"], 1);
        assert_eq!(response["result"]["derivative"], "3*x**2");
    }

    #[test]
    fn test_curve_fit_degree_out_of_range() {
        let engine = Engine::new();
        let response = call(
            &engine,
            json!({"op": "curve_fit", "x": [1, 2, 3], "y": [2, 4, 6], "degree": u64::MAX}),
        );
        assert_eq!(response["result"]["error"]["code"], "INVALID_INPUT");
        assert!(response["result"]["coefficients"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_matrix_request() {
        let engine = Engine::new();
        let response = call(
            &engine,
            json!({"op": "matrix_operation", "operation": "transpose", "matrices": [[[1, "a"], [2, 3]]]}),
        );
        assert_eq!(response["result"]["output"]["kind"], "matrix");
        assert_eq!(response["result"]["output"]["rows"], json!([["1", "2"], ["a", "3"]]));
    }

    #[test]
    fn test_session_requests() {
        let engine = Engine::new();
        let defined = call(
            &engine,
            json!({"op": "define_variable", "name": "g", "value": {"value": 9.81, "unit": "m/s^2", "description": "gravity"}}),
        );
        assert_eq!(defined["result"]["variable"]["description"], "gravity");

        let listed = call(&engine, json!({"op": "list_variables"}));
        assert_eq!(listed["result"].as_array().unwrap().len(), 1);

        let cleared = call(&engine, json!({"op": "clear_variables"}));
        assert_eq!(cleared["result"]["count"], 1);
    }

    #[test]
    fn test_precision_and_settings() {
        let engine = Engine::new();
        let response = call(
            &engine,
            json!({"op": "set_precision", "precision": {"output_format": "scientific", "significant_digits": 3}}),
        );
        assert!(response["result"]["error"].is_null());

        call(&engine, json!({"op": "set_unit_preference", "kind": "pressure", "unit": "kPa"}));
        let settings = call(&engine, json!({"op": "get_settings"}));
        assert_eq!(settings["result"]["precision"]["output_format"], "scientific");
        assert_eq!(settings["result"]["unit_preferences"]["pressure"], "kPa");
    }

    #[test]
    fn test_unit_queries() {
        let engine = Engine::new();
        let valid = call(&engine, json!({"op": "validate_unit", "unit": "kN*m"}));
        assert_eq!(valid["result"]["valid"], true);

        let info = call(&engine, json!({"op": "unit_dimension_info", "unit": "N"}));
        assert_eq!(info["result"]["info"]["dimensions"]["mass"], 1);

        let functions = call(&engine, json!({"op": "list_functions"}));
        let stress = functions["result"].as_array().unwrap().iter().find(|f| f["name"] == "stress").unwrap();
        assert_eq!(stress["category_name"], "Stresses");
        assert_eq!(stress["citation"], "Fundamental Mechanics");
    }

    #[test]
    fn test_malformed_request() {
        let engine = Engine::new();
        let response = engine.handle_json(r#"{"op": "teleport"}"#);
        assert_eq!(response.error().map(|e| e.code.as_str()), Some("SERIALIZATION_ERROR"));

        let response = engine.handle_json("not json");
        assert!(matches!(response, Response::Rejected(_)));
    }

    #[test]
    fn test_error_surfaces_through_response() {
        let engine = Engine::new();
        let response = engine.handle(Request::ConvertUnit {
            value: 1.0,
            from_unit: "kg".to_string(),
            to_unit: "m".to_string(),
        });
        assert_eq!(response.error().map(|e| e.code.as_str()), Some("INCOMPATIBLE_DIMENSIONS"));
    }
}
