//! # Calculus
//!
//! Symbolic differentiation, integration and equation solving over
//! [`Expr`](crate::expr::Expr) trees, plus numeric root finding and
//! single-variable optimisation.
//!
//! ## Modules
//!
//! - [`diff`] - Derivatives of any order
//! - [`integrate`] - Antiderivatives and definite integrals
//! - [`solve`] - Closed-form, polynomial and Newton solving
//! - [`infer`] - Dimension of an unknown from dimensional homogeneity
//! - [`optimize`] - Golden-section minimisation and maximisation
//!
//! Results are unit-free: operands are bound to SI magnitudes before any
//! rule is applied.

pub mod diff;
pub mod infer;
pub mod integrate;
pub mod optimize;
pub mod solve;

pub use diff::differentiate;
pub use infer::infer_dimension;
pub use integrate::{antiderivative, definite};
pub use optimize::{optimize, Optimum, OptimizeGoal};
pub use solve::{residual, root_value, solve_numeric, solve_symbolic, SolveMethod};
