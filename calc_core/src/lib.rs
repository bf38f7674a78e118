//! # calc_core - Unit-Aware Expression Engine
//!
//! `calc_core` is the computational heart of Calcsheet, evaluating engineering
//! expressions with physical units, symbolic algebra and calculus behind a clean,
//! JSON-friendly API. Every request and result is serializable, so the engine can
//! sit behind a JSON-lines pipe, an editor plugin or an AI assistant.
//!
//! ## Design Philosophy
//!
//! - **Unit-Safe**: Values carry dimensions; mismatches are errors, not silent bugs
//! - **Symbolic When Needed**: Free symbols switch evaluation to exact algebra
//! - **JSON-First**: Requests, results and errors implement Serialize
//! - **Rich Errors**: Structured error records with stable codes, never panics
//!
//! ## Quick Start
//!
//! ```rust
//! use calc_core::{Engine, Variables};
//! use calc_core::value::VariablePayload;
//!
//! let engine = Engine::new();
//! let mut vars = Variables::new();
//! vars.insert("L".to_string(), VariablePayload::with_unit(250.0, "mm"));
//!
//! let result = engine.evaluate("L * 4", &vars);
//! assert_eq!(result.formatted, "1 m");
//! ```
//!
//! ## Modules
//!
//! - [`engine`] - The [`Engine`] handle and its result records
//! - [`requests`] - JSON request/response envelope
//! - [`expr`] - Expression trees, parser, simplifier
//! - [`evaluator`] - Binding and unit-aware numeric evaluation
//! - [`calculus`] - Derivatives, integrals, equation solving, optimisation
//! - [`matrix`] - Symbolic and numeric matrix operations
//! - [`fitting`] - Least-squares curve fitting
//! - [`functions`] - Named engineering formulas
//! - [`units`] - Dimensions, unit catalog and conversion
//! - [`value`] - Variable payloads and quantities
//! - [`symbols`] - Session symbol table
//! - [`format`] - Result formatting
//! - [`settings`] - Engine settings document
//! - [`errors`] - Structured error types
//! - [`file_io`] - Settings persistence with atomic saves

pub mod calculus;
pub mod engine;
pub mod errors;
pub mod evaluator;
pub mod expr;
pub mod file_io;
pub mod fitting;
pub mod format;
pub mod functions;
pub mod matrix;
pub mod requests;
pub mod settings;
pub mod symbols;
pub mod units;
pub mod value;

// Re-export commonly used types at crate root for convenience
pub use engine::{Engine, ResultValue, Variables};
pub use errors::{CalcError, CalcResult, ErrorReport};
pub use file_io::{load_settings, save_settings};
pub use requests::{Request, Response};
pub use settings::{EngineSettings, OutputFormat, PrecisionSettings};
pub use units::{Dimension, UnitRegistry};
