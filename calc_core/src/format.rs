//! # Result Formatter
//!
//! Renders numbers per [`PrecisionSettings`]:
//!
//! | Mode | Example |
//! |------|---------|
//! | `decimal` (2 places) | `1234.50` |
//! | `scientific` (4 digits) | `1.235e3` |
//! | `engineering` (4 digits) | `1.235e3`, `12.35e-6` |
//! | `auto` | `1234.5`, `1.234e-7` |
//!
//! Magnitudes below the tolerance print as `0`. Complex values print as
//! `<re> + <im>i` / `<re> - <im>i`; a negligible real part is dropped, so
//! `0 + 2i` prints as `2i` and `0 - 2i` as `-2i`. A negligible imaginary part
//! prints the real part alone. Output re-parses as an expression.

use num_complex::Complex64;

use crate::settings::{OutputFormat, PrecisionSettings};

/// Below this magnitude `auto` switches to scientific notation.
const AUTO_SMALL: f64 = 1e-3;
/// At or above this magnitude `auto` switches to scientific notation.
const AUTO_LARGE: f64 = 1e6;

/// Format a real number.
pub fn format_real(x: f64, precision: &PrecisionSettings) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "oo".to_string() } else { "-oo".to_string() };
    }
    if x.abs() < precision.tolerance || x == 0.0 {
        return "0".to_string();
    }

    let digits = precision.significant_digits.clamp(1, 17);
    match precision.output_format {
        OutputFormat::Decimal => format!("{:.*}", precision.decimal_places, x),
        OutputFormat::Scientific => scientific(x, digits),
        OutputFormat::Engineering => engineering(x, digits),
        OutputFormat::Auto => {
            if x.abs() >= AUTO_LARGE || x.abs() < AUTO_SMALL {
                scientific(x, digits)
            } else {
                trim_zeros(&fixed_significant(x, digits))
            }
        }
    }
}

/// Format a complex number; the imaginary part is dropped below tolerance.
pub fn format_complex(z: Complex64, precision: &PrecisionSettings) -> String {
    let re_negligible = z.re.abs() < precision.tolerance;
    let im_negligible = z.im.abs() < precision.tolerance;
    if im_negligible {
        return format_real(z.re, precision);
    }
    let im = format_imaginary(z.im.abs(), precision);
    if re_negligible {
        return if z.im < 0.0 { format!("-{}", im) } else { im };
    }
    let sign = if z.im < 0.0 { '-' } else { '+' };
    format!("{} {} {}", format_real(z.re, precision), sign, im)
}

fn format_imaginary(magnitude: f64, precision: &PrecisionSettings) -> String {
    format!("{}i", format_real(magnitude, precision))
}

/// Value followed by its unit, if any.
pub fn format_with_unit(text: String, unit: Option<&str>) -> String {
    match unit {
        Some(unit) if !unit.is_empty() => format!("{} {}", text, unit),
        _ => text,
    }
}

fn decimal_exponent(x: f64) -> i32 {
    x.abs().log10().floor() as i32
}

/// `d.ddd e N` with `digits` significant digits, mantissa zeros trimmed.
fn scientific(x: f64, digits: usize) -> String {
    let text = format!("{:.*e}", digits - 1, x);
    match text.split_once('e') {
        Some((mantissa, exponent)) => format!("{}e{}", trim_zeros(mantissa), exponent),
        None => text,
    }
}

/// Exponent constrained to a multiple of three.
fn engineering(x: f64, digits: usize) -> String {
    // Round first so 999.99 -> 1.000e3 rather than 1000.0e0.
    let rounded: f64 = format!("{:.*e}", digits - 1, x).parse().unwrap_or(x);
    let exponent = decimal_exponent(rounded).div_euclid(3) * 3;
    let mantissa = rounded / 10f64.powi(exponent);
    let integer_digits = (decimal_exponent(mantissa) + 1).max(1) as usize;
    let places = digits.saturating_sub(integer_digits);
    let mantissa = trim_zeros(&format!("{:.*}", places, mantissa));
    if exponent == 0 {
        mantissa
    } else {
        format!("{}e{}", mantissa, exponent)
    }
}

/// Fixed-point with `digits` significant digits.
fn fixed_significant(x: f64, digits: usize) -> String {
    let places = (digits as i32 - 1 - decimal_exponent(x)).max(0) as usize;
    format!("{:.*}", places, x)
}

fn trim_zeros(text: &str) -> String {
    if !text.contains('.') {
        return text.to_string();
    }
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}
