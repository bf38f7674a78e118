//! # Expressions
//!
//! Parsing, printing and algebraic manipulation of expression trees.
//!
//! ## Modules
//!
//! - [`lexer`] - Tokens with source positions, implicit multiplication
//! - [`parser`] - Recursive-descent parser for expressions and equations
//! - [`ast`] - The [`Expr`] tree and named constants
//! - [`display`] - Canonical text form (`3*x**2`, `x**3/3`)
//! - [`simplify`] - Constant folding and like-term collection
//! - [`polynomial`] - Expansion and polynomial coefficients
//! - [`numeric`] - Built-in functions and unit-free evaluation
//!
//! ## Example
//!
//! ```rust
//! use calc_core::expr::{parse_expression, simplify};
//!
//! let expr = parse_expression("x + x + 1").unwrap();
//! assert_eq!(simplify(&expr).to_string(), "2*x + 1");
//! ```

pub mod ast;
pub mod display;
pub mod lexer;
pub mod numeric;
pub mod parser;
pub mod polynomial;
pub mod simplify;

pub use ast::{Constant, Expr};
pub use display::format_number;
pub use numeric::{eval_complex, eval_constant, is_builtin};
pub use parser::{parse_equation, parse_expression};
pub use polynomial::{expand, numer_denom, polynomial_coefficients};
pub use simplify::simplify;
