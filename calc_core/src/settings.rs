//! # Engine Settings
//!
//! Session-wide configuration: precision and output format for the result
//! formatter, preferred units per quantity kind, solver limits and the
//! conversion cache bound. Everything is serde-friendly so a session can be
//! persisted with [`crate::file_io::save_settings`].
//!
//! ## Example
//!
//! ```rust
//! use calc_core::settings::{EngineSettings, OutputFormat};
//!
//! let mut settings = EngineSettings::default();
//! settings.precision.output_format = OutputFormat::Engineering;
//! settings.unit_preferences.insert("pressure".to_string(), "kPa".to_string());
//!
//! let json = serde_json::to_string(&settings).unwrap();
//! let back: EngineSettings = serde_json::from_str(&json).unwrap();
//! assert_eq!(back.precision.output_format, OutputFormat::Engineering);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::errors::{CalcError, CalcResult};

/// Current schema version for settings files
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Numeric display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OutputFormat {
    /// Scientific outside `[1e-3, 1e6)`, trimmed fixed-point inside
    #[default]
    Auto,
    /// Fixed number of decimal places
    Decimal,
    /// Fixed significant digits, exponential notation
    Scientific,
    /// Exponent constrained to multiples of 3
    Engineering,
}

/// Settings read by the result formatter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrecisionSettings {
    /// Places after the decimal point in `decimal` mode
    pub decimal_places: usize,
    /// Significant digits in `scientific`/`engineering` mode and for `auto`
    pub significant_digits: usize,
    /// Magnitudes below this print as "0"
    pub tolerance: f64,
    pub output_format: OutputFormat,
}

impl Default for PrecisionSettings {
    fn default() -> Self {
        PrecisionSettings {
            decimal_places: 4,
            significant_digits: 6,
            tolerance: 1e-10,
            output_format: OutputFormat::Auto,
        }
    }
}

impl PrecisionSettings {
    pub fn validate(&self) -> CalcResult<()> {
        if self.decimal_places > 15 {
            return Err(CalcError::invalid_input(
                "decimal_places",
                self.decimal_places.to_string(),
                "must be between 0 and 15",
            ));
        }
        if self.significant_digits == 0 || self.significant_digits > 17 {
            return Err(CalcError::invalid_input(
                "significant_digits",
                self.significant_digits.to_string(),
                "must be between 1 and 17",
            ));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(CalcError::invalid_input(
                "tolerance",
                self.tolerance.to_string(),
                "must be a non-negative finite number",
            ));
        }
        Ok(())
    }
}

/// Limits for iterative numeric methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Iteration cap for root finding and optimisation
    pub max_iterations: usize,
    /// Starting point for numeric root finding
    pub initial_guess: f64,
    /// Convergence tolerance
    pub tolerance: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        SolverSettings {
            max_iterations: 100,
            initial_guess: 1.0,
            tolerance: 1e-10,
        }
    }
}

/// Root settings document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Schema version (see [`SCHEMA_VERSION`])
    pub version: String,
    pub precision: PrecisionSettings,
    /// Quantity kind name -> preferred unit (e.g. "pressure" -> "kPa")
    pub unit_preferences: BTreeMap<String, String>,
    pub solver: SolverSettings,
    /// Bound on memoized conversions; `None` means unbounded
    pub conversion_cache_capacity: Option<usize>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            version: SCHEMA_VERSION.to_string(),
            precision: PrecisionSettings::default(),
            unit_preferences: BTreeMap::new(),
            solver: SolverSettings::default(),
            conversion_cache_capacity: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_defaults() {
        let settings = EngineSettings::default();
        assert_eq!(settings.precision.decimal_places, 4);
        assert_eq!(settings.precision.output_format, OutputFormat::Auto);
        assert_eq!(settings.solver.max_iterations, 100);
        assert!(settings.unit_preferences.is_empty());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: EngineSettings =
            serde_json::from_str(r#"{"precision": {"decimal_places": 2}}"#).unwrap();
        assert_eq!(settings.precision.decimal_places, 2);
        assert_eq!(settings.precision.significant_digits, 6);
        assert_eq!(settings.version, SCHEMA_VERSION);
    }

    #[test]
    fn test_output_format_strings() {
        assert_eq!(OutputFormat::from_str("scientific").unwrap(), OutputFormat::Scientific);
        assert_eq!(OutputFormat::from_str("Engineering").unwrap(), OutputFormat::Engineering);
        assert_eq!(OutputFormat::Decimal.to_string(), "decimal");
        assert!(OutputFormat::from_str("roman").is_err());
    }

    #[test]
    fn test_validate() {
        let mut precision = PrecisionSettings::default();
        assert!(precision.validate().is_ok());
        precision.significant_digits = 0;
        assert!(precision.validate().is_err());
    }
}
