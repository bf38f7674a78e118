//! Dimension vectors over the seven SI base dimensions.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};

/// The fixed set of base physical dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum BaseDimension {
    Length,
    Mass,
    Time,
    Temperature,
    Current,
    Amount,
    LuminousIntensity,
}

impl BaseDimension {
    /// Position in the exponent vector
    pub fn index(self) -> usize {
        match self {
            BaseDimension::Length => 0,
            BaseDimension::Mass => 1,
            BaseDimension::Time => 2,
            BaseDimension::Temperature => 3,
            BaseDimension::Current => 4,
            BaseDimension::Amount => 5,
            BaseDimension::LuminousIntensity => 6,
        }
    }

    /// SI base unit symbol
    pub fn base_symbol(self) -> &'static str {
        match self {
            BaseDimension::Length => "m",
            BaseDimension::Mass => "kg",
            BaseDimension::Time => "s",
            BaseDimension::Temperature => "K",
            BaseDimension::Current => "A",
            BaseDimension::Amount => "mol",
            BaseDimension::LuminousIntensity => "cd",
        }
    }

    /// Name used in dimension maps
    pub fn name(self) -> &'static str {
        match self {
            BaseDimension::Length => "length",
            BaseDimension::Mass => "mass",
            BaseDimension::Time => "time",
            BaseDimension::Temperature => "temperature",
            BaseDimension::Current => "current",
            BaseDimension::Amount => "amount",
            BaseDimension::LuminousIntensity => "luminous_intensity",
        }
    }
}

/// Exponents of the base dimensions, in [`BaseDimension::index`] order.
///
/// ```rust
/// use calc_core::units::Dimension;
///
/// let force = Dimension::new([1, 1, -2, 0, 0, 0, 0]);
/// let area = Dimension::new([2, 0, 0, 0, 0, 0, 0]);
/// assert_eq!(force.checked_div(area).unwrap().canonical_unit(), "m^-1*kg*s^-2");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dimension(pub [i32; 7]);

/// Largest integer power accepted in unit expressions and `^` on quantities
pub const MAX_EXPONENT: i32 = 64;

impl Dimension {
    pub const fn new(exponents: [i32; 7]) -> Self {
        Dimension(exponents)
    }

    pub const fn dimensionless() -> Self {
        Dimension([0; 7])
    }

    /// Dimension of a single base quantity
    pub fn base(base: BaseDimension) -> Self {
        let mut exponents = [0; 7];
        exponents[base.index()] = 1;
        Dimension(exponents)
    }

    pub fn is_dimensionless(&self) -> bool {
        self.0.iter().all(|&e| e == 0)
    }

    pub fn exponent(&self, base: BaseDimension) -> i32 {
        self.0[base.index()]
    }

    /// Product of two dimensions, `None` on exponent overflow
    pub fn checked_mul(self, rhs: Self) -> Option<Self> {
        self.zip_with(rhs, i32::checked_add)
    }

    /// Quotient of two dimensions, `None` on exponent overflow
    pub fn checked_div(self, rhs: Self) -> Option<Self> {
        self.zip_with(rhs, i32::checked_sub)
    }

    /// Raise to an integer power, `None` on exponent overflow
    pub fn checked_powi(self, n: i32) -> Option<Self> {
        let mut exponents = self.0;
        for e in exponents.iter_mut() {
            *e = e.checked_mul(n)?;
        }
        Some(Dimension(exponents))
    }

    fn zip_with(self, rhs: Self, op: fn(i32, i32) -> Option<i32>) -> Option<Self> {
        let mut exponents = self.0;
        for (e, r) in exponents.iter_mut().zip(rhs.0.iter()) {
            *e = op(*e, *r)?;
        }
        Some(Dimension(exponents))
    }

    /// Integer root, `None` when any exponent is not divisible by `n`
    pub fn root(self, n: i32) -> Option<Self> {
        if n == 0 || self.0.iter().any(|e| e.checked_rem(n) != Some(0)) {
            return None;
        }
        let mut exponents = self.0;
        for e in exponents.iter_mut() {
            *e = e.checked_div(n)?;
        }
        Some(Dimension(exponents))
    }

    /// Named, non-zero exponents (e.g. `{"length": 1, "time": -2}`)
    pub fn components(&self) -> BTreeMap<String, i32> {
        BaseDimension::iter()
            .filter(|b| self.exponent(*b) != 0)
            .map(|b| (b.name().to_string(), self.exponent(b)))
            .collect()
    }

    /// Product of base-unit symbols raised to their powers.
    ///
    /// Dimensionless yields an empty string.
    pub fn canonical_unit(&self) -> String {
        BaseDimension::iter()
            .filter_map(|b| match self.exponent(b) {
                0 => None,
                1 => Some(b.base_symbol().to_string()),
                e => Some(format!("{}^{}", b.base_symbol(), e)),
            })
            .collect::<Vec<_>>()
            .join("*")
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dimensionless() {
            write!(f, "dimensionless")
        } else {
            write!(f, "{}", self.canonical_unit())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic() {
        let length = Dimension::base(BaseDimension::Length);
        let time = Dimension::base(BaseDimension::Time);
        let velocity = length.checked_div(time).unwrap();
        assert_eq!(velocity.0, [1, 0, -1, 0, 0, 0, 0]);
        assert_eq!(velocity.checked_mul(time), Some(length));
        assert_eq!(length.checked_powi(3).unwrap().0[0], 3);
    }

    #[test]
    fn test_exponent_overflow() {
        let huge = Dimension::new([i32::MAX, 0, 0, 0, 0, 0, 0]);
        let length = Dimension::base(BaseDimension::Length);
        assert_eq!(huge.checked_mul(length), None);
        assert_eq!(Dimension::new([i32::MIN, 0, 0, 0, 0, 0, 0]).checked_div(length), None);
        assert_eq!(Dimension::new([3_000_000, 0, 0, 0, 0, 0, 0]).checked_powi(3_000), None);
        assert_eq!(Dimension::new([i32::MIN, 0, 0, 0, 0, 0, 0]).root(-1), None);
    }

    #[test]
    fn test_root() {
        let area = Dimension::base(BaseDimension::Length).checked_powi(2).unwrap();
        assert_eq!(area.root(2), Some(Dimension::base(BaseDimension::Length)));
        assert_eq!(Dimension::base(BaseDimension::Length).root(2), None);
    }

    #[test]
    fn test_canonical_unit() {
        assert_eq!(Dimension::dimensionless().canonical_unit(), "");
        assert_eq!(Dimension::base(BaseDimension::Mass).canonical_unit(), "kg");
        let accel = Dimension::new([1, 0, -2, 0, 0, 0, 0]);
        assert_eq!(accel.canonical_unit(), "m*s^-2");
        assert_eq!(accel.to_string(), "m*s^-2");
    }

    #[test]
    fn test_components() {
        let pressure = Dimension::new([-1, 1, -2, 0, 0, 0, 0]);
        let map = pressure.components();
        assert_eq!(map.get("length"), Some(&-1));
        assert_eq!(map.get("mass"), Some(&1));
        assert_eq!(map.len(), 3);
    }
}
