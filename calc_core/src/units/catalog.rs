//! # Seeded Unit Catalog
//!
//! The fixed set of units available at registry construction, the SI prefix
//! table, and the quantity kinds used for unit preferences.
//!
//! Every entry is expressed as `scale × SI base combination`, so the
//! dimension of every unit is known up front. Affine temperature scales carry
//! an additional `offset` (in kelvin) applied only when the unit stands alone.

use std::collections::HashMap;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::dimension::Dimension;

/// A named unit: `value_in_base = value * scale + offset`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDef {
    /// Symbol or name the unit is registered under
    pub name: String,
    /// Multiplier to the SI base combination
    pub scale: f64,
    /// Dimension vector
    pub dimension: Dimension,
    /// Additive offset in base units (non-zero only for affine temperature scales)
    pub offset: f64,
    /// Whether SI prefixes may be attached
    pub prefixable: bool,
    /// Registered at runtime rather than seeded
    pub custom: bool,
}

impl UnitDef {
    pub fn is_affine(&self) -> bool {
        self.offset != 0.0
    }
}

const fn dim(l: i32, m: i32, t: i32, th: i32, i: i32, n: i32, j: i32) -> Dimension {
    Dimension::new([l, m, t, th, i, n, j])
}

const NONE: Dimension = dim(0, 0, 0, 0, 0, 0, 0);
const LENGTH: Dimension = dim(1, 0, 0, 0, 0, 0, 0);
const AREA: Dimension = dim(2, 0, 0, 0, 0, 0, 0);
const VOLUME: Dimension = dim(3, 0, 0, 0, 0, 0, 0);
const MASS: Dimension = dim(0, 1, 0, 0, 0, 0, 0);
const TIME: Dimension = dim(0, 0, 1, 0, 0, 0, 0);
const TEMPERATURE: Dimension = dim(0, 0, 0, 1, 0, 0, 0);
const CURRENT: Dimension = dim(0, 0, 0, 0, 1, 0, 0);
const AMOUNT: Dimension = dim(0, 0, 0, 0, 0, 1, 0);
const LUMINOUS: Dimension = dim(0, 0, 0, 0, 0, 0, 1);
const VELOCITY: Dimension = dim(1, 0, -1, 0, 0, 0, 0);
const ACCELERATION: Dimension = dim(1, 0, -2, 0, 0, 0, 0);
const FORCE: Dimension = dim(1, 1, -2, 0, 0, 0, 0);
const PRESSURE: Dimension = dim(-1, 1, -2, 0, 0, 0, 0);
const ENERGY: Dimension = dim(2, 1, -2, 0, 0, 0, 0);
const POWER: Dimension = dim(2, 1, -3, 0, 0, 0, 0);
const FREQUENCY: Dimension = dim(0, 0, -1, 0, 0, 0, 0);
const DENSITY: Dimension = dim(-3, 1, 0, 0, 0, 0, 0);
const CHARGE: Dimension = dim(0, 0, 1, 0, 1, 0, 0);
const VOLTAGE: Dimension = dim(2, 1, -3, 0, -1, 0, 0);
const RESISTANCE: Dimension = dim(2, 1, -3, 0, -2, 0, 0);
const CAPACITANCE: Dimension = dim(-2, -1, 4, 0, 2, 0, 0);
const INDUCTANCE: Dimension = dim(2, 1, -2, 0, -2, 0, 0);
const MAGNETIC_FIELD: Dimension = dim(0, 1, -2, 0, -1, 0, 0);
const MAGNETIC_FLUX: Dimension = dim(2, 1, -2, 0, -1, 0, 0);
const CONDUCTANCE: Dimension = dim(-2, -1, 3, 0, 2, 0, 0);
const VISCOSITY: Dimension = dim(-1, 1, -1, 0, 0, 0, 0);

const LBF: f64 = 4.448_221_615_260_5;
const INCH: f64 = 0.0254;
const FOOT: f64 = 0.3048;

struct Seed {
    names: &'static [&'static str],
    scale: f64,
    dimension: Dimension,
    offset: f64,
    prefixable: bool,
}

const fn unit(names: &'static [&'static str], scale: f64, dimension: Dimension, prefixable: bool) -> Seed {
    Seed { names, scale, dimension, offset: 0.0, prefixable }
}

const fn affine(names: &'static [&'static str], scale: f64, offset: f64) -> Seed {
    Seed { names, scale, dimension: TEMPERATURE, offset, prefixable: false }
}

const SEEDS: &[Seed] = &[
    // SI base
    unit(&["m", "meter", "metre"], 1.0, LENGTH, true),
    unit(&["kg", "kilogram"], 1.0, MASS, false),
    unit(&["g", "gram"], 1e-3, MASS, true),
    unit(&["s", "sec", "second"], 1.0, TIME, true),
    unit(&["K", "kelvin"], 1.0, TEMPERATURE, true),
    unit(&["A", "amp", "ampere"], 1.0, CURRENT, true),
    unit(&["mol", "mole"], 1.0, AMOUNT, true),
    unit(&["cd", "candela"], 1.0, LUMINOUS, true),
    // SI derived
    unit(&["N", "newton"], 1.0, FORCE, true),
    unit(&["Pa", "pascal"], 1.0, PRESSURE, true),
    unit(&["J", "joule"], 1.0, ENERGY, true),
    unit(&["W", "watt"], 1.0, POWER, true),
    unit(&["Hz", "hertz"], 1.0, FREQUENCY, true),
    unit(&["C", "coulomb"], 1.0, CHARGE, true),
    unit(&["V", "volt"], 1.0, VOLTAGE, true),
    unit(&["ohm", "Ω"], 1.0, RESISTANCE, true),
    unit(&["F", "farad"], 1.0, CAPACITANCE, true),
    unit(&["H", "henry"], 1.0, INDUCTANCE, true),
    unit(&["T", "tesla"], 1.0, MAGNETIC_FIELD, true),
    unit(&["Wb", "weber"], 1.0, MAGNETIC_FLUX, true),
    unit(&["S", "siemens"], 1.0, CONDUCTANCE, true),
    unit(&["L", "l", "liter", "litre"], 1e-3, VOLUME, true),
    unit(&["P", "poise"], 0.1, VISCOSITY, true),
    // Time
    unit(&["min", "minute"], 60.0, TIME, false),
    unit(&["h", "hr", "hour"], 3600.0, TIME, false),
    unit(&["day"], 86_400.0, TIME, false),
    unit(&["week"], 604_800.0, TIME, false),
    unit(&["yr", "year"], 31_557_600.0, TIME, false),
    // Angle (dimensionless)
    unit(&["rad", "radian"], 1.0, NONE, false),
    unit(&["deg", "degree"], PI / 180.0, NONE, false),
    unit(&["rev", "revolution"], 2.0 * PI, NONE, false),
    unit(&["rpm"], 2.0 * PI / 60.0, FREQUENCY, false),
    // US customary length/area/volume
    unit(&["in", "inch"], INCH, LENGTH, false),
    unit(&["ft", "foot", "feet"], FOOT, LENGTH, false),
    unit(&["yd", "yard"], 0.9144, LENGTH, false),
    unit(&["mi", "mile"], 1609.344, LENGTH, false),
    unit(&["nmi"], 1852.0, LENGTH, false),
    unit(&["acre"], 4046.856_422_4, AREA, false),
    unit(&["ha", "hectare"], 1e4, AREA, false),
    unit(&["gal", "gallon"], 0.003_785_411_784, VOLUME, false),
    unit(&["qt", "quart"], 0.000_946_352_946, VOLUME, false),
    // Mass
    unit(&["lb", "lbm", "pound"], 0.453_592_37, MASS, false),
    unit(&["oz", "ounce"], 0.028_349_523_125, MASS, false),
    unit(&["ton"], 907.184_74, MASS, false),
    unit(&["t", "tonne"], 1000.0, MASS, false),
    unit(&["slug"], 14.593_902_937_206_4, MASS, false),
    // Force and stress
    unit(&["lbf"], LBF, FORCE, false),
    unit(&["kip"], LBF * 1000.0, FORCE, false),
    unit(&["kgf"], 9.806_65, FORCE, false),
    unit(&["psi"], LBF / (INCH * INCH), PRESSURE, false),
    unit(&["ksi"], LBF * 1000.0 / (INCH * INCH), PRESSURE, false),
    unit(&["psf"], LBF / (FOOT * FOOT), PRESSURE, false),
    unit(&["bar"], 1e5, PRESSURE, true),
    unit(&["atm"], 101_325.0, PRESSURE, false),
    unit(&["mmHg"], 133.322_387_415, PRESSURE, false),
    // Speed
    unit(&["mph"], 0.447_04, VELOCITY, false),
    unit(&["kph"], 1.0 / 3.6, VELOCITY, false),
    unit(&["knot", "kn"], 1852.0 / 3600.0, VELOCITY, false),
    unit(&["gn"], 9.806_65, ACCELERATION, false),
    // Energy and power
    unit(&["cal", "calorie"], 4.184, ENERGY, true),
    unit(&["BTU", "Btu"], 1055.055_852_62, ENERGY, false),
    unit(&["Wh"], 3600.0, ENERGY, true),
    unit(&["eV"], 1.602_176_634e-19, ENERGY, true),
    unit(&["hp", "horsepower"], 745.699_871_582_270_2, POWER, false),
    // Temperature
    affine(&["degC", "°C", "celsius"], 1.0, 273.15),
    affine(&["degF", "°F", "fahrenheit"], 5.0 / 9.0, 459.67 * 5.0 / 9.0),
    unit(&["degR", "°R", "rankine"], 5.0 / 9.0, TEMPERATURE, false),
];

/// SI prefixes, longest first so that `da` wins over `d`.
pub const PREFIXES: &[(&str, f64)] = &[
    ("da", 1e1),
    ("Y", 1e24),
    ("Z", 1e21),
    ("E", 1e18),
    ("P", 1e15),
    ("T", 1e12),
    ("G", 1e9),
    ("M", 1e6),
    ("k", 1e3),
    ("h", 1e2),
    ("d", 1e-1),
    ("c", 1e-2),
    ("m", 1e-3),
    ("u", 1e-6),
    ("µ", 1e-6),
    ("μ", 1e-6),
    ("n", 1e-9),
    ("p", 1e-12),
    ("f", 1e-15),
    ("a", 1e-18),
];

/// Build the seeded unit table keyed by every alias.
pub fn seed_units() -> HashMap<String, UnitDef> {
    let mut units = HashMap::new();
    for seed in SEEDS {
        for name in seed.names {
            units.insert(
                name.to_string(),
                UnitDef {
                    name: name.to_string(),
                    scale: seed.scale,
                    dimension: seed.dimension,
                    offset: seed.offset,
                    prefixable: seed.prefixable,
                    custom: false,
                },
            );
        }
    }
    units
}

/// A named physical quantity type, used for unit preferences and categories.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantityKind {
    /// Kind name (e.g. "pressure")
    pub name: &'static str,
    /// Dimension of the kind
    pub dimension: Dimension,
    /// Representative units, all resolvable by the registry
    pub examples: &'static [&'static str],
}

/// Quantity kinds, first match wins for dimensions shared by several
/// kinds (energy and torque, for example).
pub const QUANTITY_KINDS: &[QuantityKind] = &[
    QuantityKind { name: "length", dimension: LENGTH, examples: &["m", "km", "cm", "mm", "in", "ft", "yd", "mi"] },
    QuantityKind { name: "area", dimension: AREA, examples: &["m^2", "cm^2", "mm^2", "in^2", "ft^2", "acre", "ha"] },
    QuantityKind { name: "volume", dimension: VOLUME, examples: &["m^3", "L", "mL", "gal", "qt", "ft^3"] },
    QuantityKind { name: "mass", dimension: MASS, examples: &["kg", "g", "mg", "lb", "oz", "ton", "t"] },
    QuantityKind { name: "time", dimension: TIME, examples: &["s", "ms", "min", "h", "day", "week", "yr"] },
    QuantityKind { name: "temperature", dimension: TEMPERATURE, examples: &["K", "degC", "degF", "degR"] },
    QuantityKind { name: "current", dimension: CURRENT, examples: &["A", "mA", "kA"] },
    QuantityKind { name: "amount", dimension: AMOUNT, examples: &["mol", "mmol", "umol"] },
    QuantityKind { name: "luminous_intensity", dimension: LUMINOUS, examples: &["cd"] },
    QuantityKind { name: "velocity", dimension: VELOCITY, examples: &["m/s", "km/h", "mph", "knot", "ft/s"] },
    QuantityKind { name: "acceleration", dimension: ACCELERATION, examples: &["m/s^2", "ft/s^2", "gn"] },
    QuantityKind { name: "force", dimension: FORCE, examples: &["N", "kN", "lbf", "kip", "kgf"] },
    QuantityKind { name: "pressure", dimension: PRESSURE, examples: &["Pa", "kPa", "MPa", "bar", "atm", "psi", "ksi", "psf"] },
    QuantityKind { name: "energy", dimension: ENERGY, examples: &["J", "kJ", "cal", "kcal", "Wh", "kWh", "eV", "BTU"] },
    QuantityKind { name: "power", dimension: POWER, examples: &["W", "kW", "MW", "hp"] },
    QuantityKind { name: "frequency", dimension: FREQUENCY, examples: &["Hz", "kHz", "MHz", "GHz", "rpm"] },
    QuantityKind { name: "density", dimension: DENSITY, examples: &["kg/m^3", "g/cm^3", "lb/ft^3"] },
    QuantityKind { name: "charge", dimension: CHARGE, examples: &["C", "mC"] },
    QuantityKind { name: "voltage", dimension: VOLTAGE, examples: &["V", "mV", "kV"] },
    QuantityKind { name: "resistance", dimension: RESISTANCE, examples: &["ohm", "kohm", "Mohm"] },
    QuantityKind { name: "capacitance", dimension: CAPACITANCE, examples: &["F", "uF", "nF", "pF"] },
    QuantityKind { name: "inductance", dimension: INDUCTANCE, examples: &["H", "mH"] },
    QuantityKind { name: "magnetic_field", dimension: MAGNETIC_FIELD, examples: &["T", "mT"] },
    QuantityKind { name: "magnetic_flux", dimension: MAGNETIC_FLUX, examples: &["Wb"] },
    QuantityKind { name: "conductance", dimension: CONDUCTANCE, examples: &["S", "mS"] },
    QuantityKind { name: "viscosity", dimension: VISCOSITY, examples: &["Pa*s", "P", "cP"] },
];

/// Look up a quantity kind by name.
pub fn kind_by_name(name: &str) -> Option<&'static QuantityKind> {
    QUANTITY_KINDS.iter().find(|k| k.name == name)
}

/// Look up the first quantity kind with the given dimension.
pub fn kind_for_dimension(dimension: &Dimension) -> Option<&'static QuantityKind> {
    QUANTITY_KINDS.iter().find(|k| k.dimension == *dimension)
}
