//! # Engineering Functions
//!
//! Closed-form formulas callable by name inside expressions. The catalog
//! is fixed at compile time and cannot be extended at runtime: callers
//! that need their own formulas bind them as variables whose value is an
//! expression.
//!
//! ## Modules
//!
//! - [`registry`] - Function enum, metadata and call expansion
//!
//! ## References
//!
//! - Roark's Formulas for Stress and Strain, 8th Edition
//! - Hibbeler, Mechanics of Materials, 10th Edition

pub mod registry;

pub use registry::{
    function_listing, CodeReference, EngineeringFunction, FunctionCategory, FunctionListing, FunctionMetadata,
    Parameter, ALL_FUNCTIONS,
};
