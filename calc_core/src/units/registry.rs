//! # Unit Registry & Converter
//!
//! Holds the unit catalog and the per-quantity-kind preference table.
//!
//! ## Concurrency
//!
//! Readers take a cheap `Arc` clone of the current [`UnitCatalog`] snapshot
//! and never block each other. Mutations (custom units, preferences) are
//! serialized by a writer mutex: the writer clones the snapshot, edits the
//! copy, validates it and swaps it in. A failed mutation leaves the old
//! snapshot untouched.
//!
//! Conversions are memoized by the exact `(value, from, to)` triple. Unit
//! definitions never change once registered, so entries are never
//! invalidated; an optional capacity evicts the oldest entry first.
//!
//! ## Example
//!
//! ```rust
//! use calc_core::units::UnitRegistry;
//!
//! let registry = UnitRegistry::new();
//! let inches = registry.convert(1.0, "ft", "in").unwrap();
//! assert!((inches - 12.0).abs() < 1e-9);
//!
//! let kelvin = registry.convert(25.0, "degC", "K").unwrap();
//! assert!((kelvin - 298.15).abs() < 1e-9);
//! ```

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};

use super::catalog::{self, UnitDef, PREFIXES, QUANTITY_KINDS};
use super::dimension::Dimension;
use super::parse::{parse_unit_expr, UnitTerm};

static UNIT_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

/// Immutable view of every registered unit plus the preference table.
#[derive(Debug, Clone)]
pub struct UnitCatalog {
    units: HashMap<String, UnitDef>,
    preferences: BTreeMap<String, String>,
}

impl UnitCatalog {
    /// Catalog containing only the seeded units and no preferences
    pub fn seeded() -> Self {
        UnitCatalog {
            units: catalog::seed_units(),
            preferences: BTreeMap::new(),
        }
    }

    /// Resolve a single symbol, trying an exact match before SI prefixes.
    pub(crate) fn resolve_atom(&self, name: &str) -> Option<UnitTerm> {
        if let Some(def) = self.units.get(name) {
            return Some(UnitTerm { scale: def.scale, dimension: def.dimension, offset: def.offset });
        }
        PREFIXES.iter().find_map(|(prefix, factor)| {
            let rest = name.strip_prefix(prefix)?;
            let def = self.units.get(rest).filter(|d| d.prefixable && !d.is_affine())?;
            Some(UnitTerm { scale: def.scale * factor, dimension: def.dimension, offset: 0.0 })
        })
    }

    pub fn get(&self, name: &str) -> Option<&UnitDef> {
        self.units.get(name)
    }

    pub fn preferences(&self) -> &BTreeMap<String, String> {
        &self.preferences
    }
}

/// Dimension details for a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDimensionInfo {
    pub unit: String,
    /// Named base-dimension exponents
    pub dimensions: BTreeMap<String, i32>,
    /// True when the unit spans exactly one base dimension to the first power
    pub is_base_unit: bool,
    /// Quantity kind name, when one matches
    pub kind: Option<String>,
}

/// A quantity kind with example units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitCategory {
    pub name: String,
    pub units: Vec<String>,
}

type ConversionKey = (u64, String, String);

#[derive(Debug, Default)]
struct ConversionCache {
    entries: HashMap<ConversionKey, f64>,
    order: VecDeque<ConversionKey>,
}

/// Thread-safe unit registry; share it behind `&` or `Arc`.
#[derive(Debug)]
pub struct UnitRegistry {
    snapshot: RwLock<Arc<UnitCatalog>>,
    writer: Mutex<()>,
    cache: Mutex<ConversionCache>,
    cache_capacity: Option<usize>,
}

impl Default for UnitRegistry {
    fn default() -> Self {
        UnitRegistry::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl UnitRegistry {
    /// Registry seeded with the fixed catalog and an unbounded conversion cache.
    pub fn new() -> Self {
        UnitRegistry::with_cache_capacity(None)
    }

    /// Registry whose conversion cache keeps at most `capacity` entries.
    pub fn with_cache_capacity(capacity: Option<usize>) -> Self {
        UnitRegistry {
            snapshot: RwLock::new(Arc::new(UnitCatalog::seeded())),
            writer: Mutex::new(()),
            cache: Mutex::new(ConversionCache::default()),
            cache_capacity: capacity,
        }
    }

    /// Current immutable snapshot.
    pub fn snapshot(&self) -> Arc<UnitCatalog> {
        let guard = self.snapshot.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    fn publish(&self, catalog: UnitCatalog) {
        let mut guard = self.snapshot.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(catalog);
    }

    /// Resolve a unit expression to scale, dimension and affine offset.
    pub fn resolve(&self, symbol: &str) -> CalcResult<UnitTerm> {
        parse_unit_expr(symbol.trim(), &self.snapshot(), false)
    }

    /// Whether `symbol` resolves. Never fails.
    pub fn is_valid_unit(&self, symbol: &str) -> bool {
        self.resolve(symbol).is_ok()
    }

    /// Dimension vector of a unit expression.
    pub fn dimension_of(&self, symbol: &str) -> CalcResult<Dimension> {
        Ok(self.resolve(symbol)?.dimension)
    }

    /// Convert `value` from one unit to another.
    ///
    /// Lone affine units (`degC`, `degF`) convert through kelvin.
    pub fn convert(&self, value: f64, from_unit: &str, to_unit: &str) -> CalcResult<f64> {
        let key = (value.to_bits(), from_unit.to_string(), to_unit.to_string());
        if let Some(hit) = lock(&self.cache).entries.get(&key) {
            return Ok(*hit);
        }

        let from = self.resolve(from_unit)?;
        let to = self.resolve(to_unit)?;
        if from.dimension != to.dimension {
            return Err(CalcError::incompatible(
                format!("{} [{}]", from_unit, from.dimension),
                format!("{} [{}]", to_unit, to.dimension),
                "cannot convert between different dimensions",
            ));
        }

        let base = value * from.scale + from.offset;
        let result = (base - to.offset) / to.scale;
        self.remember(key, result);
        Ok(result)
    }

    fn remember(&self, key: ConversionKey, result: f64) {
        let mut cache = lock(&self.cache);
        if let Some(capacity) = self.cache_capacity {
            if capacity == 0 {
                return;
            }
            while cache.entries.len() >= capacity {
                match cache.order.pop_front() {
                    Some(oldest) => {
                        cache.entries.remove(&oldest);
                    }
                    None => break,
                }
            }
        }
        if cache.entries.insert(key.clone(), result).is_none() {
            cache.order.push_back(key);
        }
    }

    /// Number of memoized conversions.
    pub fn cached_conversions(&self) -> usize {
        lock(&self.cache).entries.len()
    }

    /// Convert a magnitude expressed in `unit` into SI base units.
    pub fn to_base(&self, value: f64, unit: &str) -> CalcResult<(f64, Dimension)> {
        let term = self.resolve(unit)?;
        Ok((value * term.scale + term.offset, term.dimension))
    }

    /// Register `name` as `definition` (e.g. `"1.852 * km"`).
    ///
    /// The name must be a fresh identifier and the definition must reduce to
    /// known units. Affine definitions are rejected.
    pub fn define_custom_unit(&self, name: &str, definition: &str) -> CalcResult<UnitDef> {
        let _writer = lock(&self.writer);
        let current = self.snapshot();

        if !UNIT_NAME.is_match(name) {
            return Err(CalcError::invalid_unit_definition(name, "unit name must be an identifier"));
        }
        if current.resolve_atom(name).is_some() {
            return Err(CalcError::invalid_unit_definition(name, "name collides with an existing unit"));
        }

        let term = parse_unit_expr(definition.trim(), &current, true).map_err(|_| {
            CalcError::invalid_unit_definition(name, format!("'{}' does not resolve to known units", definition))
        })?;
        if term.is_affine() {
            return Err(CalcError::invalid_unit_definition(name, "affine (offset) units cannot be redefined"));
        }
        if !term.scale.is_finite() || term.scale <= 0.0 {
            return Err(CalcError::invalid_unit_definition(name, "scale factor must be positive and finite"));
        }

        let def = UnitDef {
            name: name.to_string(),
            scale: term.scale,
            dimension: term.dimension,
            offset: 0.0,
            prefixable: false,
            custom: true,
        };
        let mut next = (*current).clone();
        next.units.insert(name.to_string(), def.clone());
        self.publish(next);
        info!("registered custom unit {} = {} [{}]", name, definition, def.dimension);
        Ok(def)
    }

    /// Map a quantity kind (e.g. "pressure") to a preferred unit (e.g. "kPa").
    pub fn set_preference(&self, kind: &str, unit: &str) -> CalcResult<()> {
        let _writer = lock(&self.writer);
        let current = self.snapshot();

        let quantity = catalog::kind_by_name(kind)
            .ok_or_else(|| CalcError::invalid_input("kind", kind, "unknown quantity kind"))?;
        let term = parse_unit_expr(unit.trim(), &current, false)?;
        if term.dimension != quantity.dimension {
            return Err(CalcError::incompatible(
                format!("{} [{}]", kind, quantity.dimension),
                format!("{} [{}]", unit, term.dimension),
                "preferred unit must match the quantity kind",
            ));
        }

        let mut next = (*current).clone();
        next.preferences.insert(kind.to_string(), unit.trim().to_string());
        self.publish(next);
        info!("unit preference {} -> {}", kind, unit);
        Ok(())
    }

    /// Remove a preference; returns whether one existed.
    pub fn clear_preference(&self, kind: &str) -> bool {
        let _writer = lock(&self.writer);
        let current = self.snapshot();
        if !current.preferences.contains_key(kind) {
            return false;
        }
        let mut next = (*current).clone();
        next.preferences.remove(kind);
        self.publish(next);
        true
    }

    /// Preferred unit for a dimension, through its quantity kind.
    pub fn preferred_unit_for(&self, dimension: &Dimension) -> Option<String> {
        let kind = catalog::kind_for_dimension(dimension)?;
        self.snapshot().preferences.get(kind.name).cloned()
    }

    /// Unit string and conversion for presenting a base-unit magnitude.
    ///
    /// Returns `(unit, value_in_unit)`: the preferred unit when one is set,
    /// otherwise the canonical base-unit product. Dimensionless yields `None`.
    pub fn present(&self, base_value: f64, dimension: &Dimension) -> CalcResult<Option<(String, f64)>> {
        if dimension.is_dimensionless() {
            return Ok(None);
        }
        if let Some(unit) = self.preferred_unit_for(dimension) {
            let term = self.resolve(&unit)?;
            debug!("presenting [{}] in preferred unit {}", dimension, unit);
            return Ok(Some((unit, (base_value - term.offset) / term.scale)));
        }
        Ok(Some((dimension.canonical_unit(), base_value)))
    }

    /// Named dimension map for a unit.
    pub fn unit_dimension_info(&self, unit: &str) -> CalcResult<UnitDimensionInfo> {
        let dimension = self.dimension_of(unit)?;
        let dimensions = dimension.components();
        let is_base_unit = dimensions.len() == 1 && dimensions.values().all(|&p| p == 1);
        Ok(UnitDimensionInfo {
            unit: unit.to_string(),
            dimensions,
            is_base_unit,
            kind: catalog::kind_for_dimension(&dimension).map(|k| k.name.to_string()),
        })
    }

    /// Registered unit names sharing the dimension of `unit`, sorted.
    pub fn compatible_units(&self, unit: &str) -> CalcResult<Vec<String>> {
        let dimension = self.dimension_of(unit)?;
        let snapshot = self.snapshot();
        let mut names: Vec<String> = snapshot
            .units
            .values()
            .filter(|def| def.dimension == dimension)
            .map(|def| def.name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    /// Quantity kinds with their example units, plus custom units grouped by kind.
    pub fn unit_categories(&self) -> Vec<UnitCategory> {
        let snapshot = self.snapshot();
        let mut categories: Vec<UnitCategory> = QUANTITY_KINDS
            .iter()
            .map(|kind| UnitCategory {
                name: kind.name.to_string(),
                units: kind.examples.iter().map(|u| u.to_string()).collect(),
            })
            .collect();

        let mut custom: Vec<&UnitDef> = snapshot.units.values().filter(|d| d.custom).collect();
        custom.sort_by(|a, b| a.name.cmp(&b.name));
        for def in custom {
            if let Some(kind) = catalog::kind_for_dimension(&def.dimension) {
                if let Some(category) = categories.iter_mut().find(|c| c.name == kind.name) {
                    category.units.push(def.name.clone());
                }
            }
        }
        categories
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_length() {
        let registry = UnitRegistry::new();
        let km = registry.convert(1500.0, "m", "km").unwrap();
        assert!((km - 1.5).abs() < 1e-12);
        let ft = registry.convert(1.0, "m", "ft").unwrap();
        assert!((ft - 3.280839895).abs() < 1e-6);
    }

    #[test]
    fn test_convert_temperature() {
        let registry = UnitRegistry::new();
        let f = registry.convert(100.0, "degC", "degF").unwrap();
        assert!((f - 212.0).abs() < 1e-9);
        let c = registry.convert(32.0, "°F", "degC").unwrap();
        assert!(c.abs() < 1e-9);
    }

    #[test]
    fn test_incompatible() {
        let registry = UnitRegistry::new();
        let err = registry.convert(1.0, "m", "s").unwrap_err();
        assert_eq!(err.error_code(), "INCOMPATIBLE_DIMENSIONS");
        assert_eq!(registry.convert(1.0, "m", "blarg").unwrap_err().error_code(), "UNKNOWN_UNIT");
    }

    #[test]
    fn test_validity() {
        let registry = UnitRegistry::new();
        assert!(registry.is_valid_unit("kN*m"));
        assert!(registry.is_valid_unit("psi"));
        assert!(!registry.is_valid_unit("kdegC"));
        assert!(!registry.is_valid_unit("(m"));
        assert!(!registry.is_valid_unit("m^3000000000*m"));
        assert!(!registry.is_valid_unit("m^-3000000000/m"));
    }

    #[test]
    fn test_custom_unit() {
        let registry = UnitRegistry::new();
        let def = registry.define_custom_unit("nautical_league", "3 * nmi").unwrap();
        assert!((def.scale - 5556.0).abs() < 1e-9);
        let m = registry.convert(1.0, "nautical_league", "m").unwrap();
        assert!((m - 5556.0).abs() < 1e-9);

        let err = registry.define_custom_unit("m", "100 cm").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_UNIT_DEFINITION");
        let err = registry.define_custom_unit("zorp", "3 * blargs").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_UNIT_DEFINITION");
        let err = registry.define_custom_unit("warm", "degC").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_UNIT_DEFINITION");
        assert!(!registry.is_valid_unit("zorp"));
    }

    #[test]
    fn test_preferences() {
        let registry = UnitRegistry::new();
        let pressure = registry.dimension_of("Pa").unwrap();
        assert_eq!(registry.preferred_unit_for(&pressure), None);

        registry.set_preference("pressure", "kPa").unwrap();
        assert_eq!(registry.preferred_unit_for(&pressure), Some("kPa".to_string()));

        let (unit, value) = registry.present(5000.0, &pressure).unwrap().unwrap();
        assert_eq!(unit, "kPa");
        assert!((value - 5.0).abs() < 1e-12);

        assert!(registry.set_preference("pressure", "m").is_err());
        assert!(registry.set_preference("mood", "m").is_err());
        assert!(registry.clear_preference("pressure"));
        assert_eq!(registry.preferred_unit_for(&pressure), None);
    }

    #[test]
    fn test_cache() {
        let registry = UnitRegistry::with_cache_capacity(Some(2));
        registry.convert(1.0, "m", "ft").unwrap();
        registry.convert(2.0, "m", "ft").unwrap();
        registry.convert(3.0, "m", "ft").unwrap();
        assert_eq!(registry.cached_conversions(), 2);
        let again = registry.convert(3.0, "m", "ft").unwrap();
        assert!((again - 9.842519685).abs() < 1e-6);
    }

    #[test]
    fn test_dimension_info() {
        let registry = UnitRegistry::new();
        let info = registry.unit_dimension_info("m").unwrap();
        assert!(info.is_base_unit);
        assert_eq!(info.kind.as_deref(), Some("length"));
        let info = registry.unit_dimension_info("N").unwrap();
        assert!(!info.is_base_unit);
        assert_eq!(info.dimensions.get("time"), Some(&-2));
    }

    #[test]
    fn test_compatible_units() {
        let registry = UnitRegistry::new();
        let units = registry.compatible_units("psi").unwrap();
        assert!(units.contains(&"Pa".to_string()));
        assert!(units.contains(&"bar".to_string()));
        assert!(!units.contains(&"N".to_string()));
    }

    #[test]
    fn test_categories_include_custom() {
        let registry = UnitRegistry::new();
        registry.define_custom_unit("smoot", "1.7018 m").unwrap();
        let categories = registry.unit_categories();
        let length = categories.iter().find(|c| c.name == "length").unwrap();
        assert!(length.units.contains(&"smoot".to_string()));
    }

    #[test]
    fn test_concurrent_readers_and_writers() {
        let registry = UnitRegistry::with_cache_capacity(Some(16));
        let name = |w: u8, i: u8| format!("zzq{}{}", (b'a' + w) as char, (b'a' + i) as char);

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..200 {
                        let m = registry.convert(1.0, "km", "m").unwrap();
                        assert!((m - 1000.0).abs() < 1e-9);
                        let f = registry.convert(100.0, "degC", "degF").unwrap();
                        assert!((f - 212.0).abs() < 1e-9);
                        assert!(registry.is_valid_unit("kN*m"));
                        assert!(!registry.is_valid_unit("blarg"));
                    }
                });
            }
            for w in 0..3u8 {
                let registry = &registry;
                scope.spawn(move || {
                    for i in 0..10u8 {
                        let scale = (w as usize * 10 + i as usize + 1) as f64;
                        registry.define_custom_unit(&name(w, i), &format!("{} m", scale)).unwrap();
                    }
                });
            }
        });

        for w in 0..3u8 {
            for i in 0..10u8 {
                let unit = name(w, i);
                assert!(registry.is_valid_unit(&unit), "{}", unit);
                let m = registry.convert(2.0, &unit, "m").unwrap();
                let expected = 2.0 * (w as usize * 10 + i as usize + 1) as f64;
                assert!((m - expected).abs() < 1e-9, "{} -> {}", unit, m);
            }
        }
    }
}
