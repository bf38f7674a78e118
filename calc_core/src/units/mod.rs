//! # Units & Dimensional Analysis
//!
//! Physical units for the expression engine. Every unit reduces to a scale
//! factor over the seven SI base dimensions, so dimension checks are plain
//! integer vector comparisons.
//!
//! ## Modules
//!
//! - [`dimension`] - Dimension vectors and base dimensions
//! - [`catalog`] - Seeded units, SI prefixes, quantity kinds
//! - [`parse`] - Unit expression parser (`kg*m/s^2`, `kN/m2`)
//! - [`registry`] - Thread-safe registry, conversion and preferences
//!
//! ## Conventions
//!
//! - **Magnitudes** are carried internally in SI base units
//! - **Affine units** (`degC`, `degF`) apply their offset only when they
//!   stand alone; inside a compound unit they act as temperature differences
//! - **Prefixes** attach to SI-style units only (`kPa`, `mm`, `uF`), never to
//!   customary units (`ft`, `psi`) or affine scales

pub mod catalog;
pub mod dimension;
pub mod parse;
pub mod registry;

pub use catalog::{QuantityKind, UnitDef, QUANTITY_KINDS};
pub use dimension::{BaseDimension, Dimension, MAX_EXPONENT};
pub use parse::UnitTerm;
pub use registry::{UnitCatalog, UnitCategory, UnitDimensionInfo, UnitRegistry};
