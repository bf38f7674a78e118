//! # Curve Fitting
//!
//! Least-squares fits of sampled data.
//!
//! - **Polynomial**: `y = c0 + c1*x + ... + cn*x^n`, solved on the
//!   Vandermonde system by SVD
//! - **Exponential**: `y = a*exp(b*x)`, fitted as a straight line through
//!   `(x, ln y)`; every `y` must be positive
//!
//! `r_squared` is always measured against the original `y` values.

use log::debug;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::errors::{CalcError, CalcResult};
use crate::expr::polynomial::MAX_DEGREE;
use crate::expr::{simplify, Expr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FitMethod {
    #[default]
    Polynomial,
    Exponential,
}

/// Fitted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveFit {
    pub method: FitMethod,
    /// Polynomial: ascending powers. Exponential: `[a, b]`.
    pub coefficients: Vec<f64>,
    pub r_squared: f64,
    /// Model as an expression in `x`
    pub expression: Expr,
}

impl CurveFit {
    /// Model value at `x`.
    pub fn predict(&self, x: f64) -> f64 {
        match self.method {
            FitMethod::Polynomial => self.coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c),
            FitMethod::Exponential => self.coefficients[0] * (self.coefficients[1] * x).exp(),
        }
    }
}

pub fn curve_fit(x: &[f64], y: &[f64], degree: usize, method: FitMethod) -> CalcResult<CurveFit> {
    if x.len() != y.len() {
        return Err(CalcError::insufficient_data(format!(
            "x has {} values but y has {}",
            x.len(),
            y.len()
        )));
    }
    if let Some(bad) = x.iter().chain(y).find(|v| !v.is_finite()) {
        return Err(CalcError::invalid_input("data", bad.to_string(), "data must be finite"));
    }
    let fit = match method {
        FitMethod::Polynomial => fit_polynomial(x, y, degree)?,
        FitMethod::Exponential => fit_exponential(x, y)?,
    };
    debug!("{} fit on {} points: r^2 = {}", method, x.len(), fit.r_squared);
    Ok(fit)
}

fn fit_polynomial(x: &[f64], y: &[f64], degree: usize) -> CalcResult<CurveFit> {
    if degree > MAX_DEGREE {
        return Err(CalcError::invalid_input(
            "degree",
            degree.to_string(),
            format!("degree must be at most {}", MAX_DEGREE),
        ));
    }
    let needed = degree + 1;
    if x.len() < needed {
        return Err(CalcError::insufficient_data(format!(
            "degree {} needs at least {} points, got {}",
            degree,
            needed,
            x.len()
        )));
    }
    let coefficients = least_squares(x, y, needed)?;
    let expression = simplify(
        &coefficients
            .iter()
            .enumerate()
            .map(|(k, &c)| Expr::Number(c) * Expr::sym("x").powf(k as f64))
            .reduce(|acc, term| acc + term)
            .unwrap_or(Expr::Number(0.0)),
    );
    let mut fit = CurveFit { method: FitMethod::Polynomial, coefficients, r_squared: 0.0, expression };
    fit.r_squared = r_squared(y, &x.iter().map(|&xi| fit.predict(xi)).collect::<Vec<_>>());
    Ok(fit)
}

fn fit_exponential(x: &[f64], y: &[f64]) -> CalcResult<CurveFit> {
    if x.len() < 2 {
        return Err(CalcError::insufficient_data(format!(
            "exponential fit needs at least 2 points, got {}",
            x.len()
        )));
    }
    if let Some(bad) = y.iter().find(|&&v| v <= 0.0) {
        return Err(CalcError::insufficient_data(format!(
            "exponential fit needs positive y values, got {}",
            bad
        )));
    }
    let log_y: Vec<f64> = y.iter().map(|v| v.ln()).collect();
    let line = least_squares(x, &log_y, 2)?;
    let (a, b) = (line[0].exp(), line[1]);
    let expression = simplify(&(Expr::Number(a) * Expr::call("exp", Expr::Number(b) * Expr::sym("x"))));
    let mut fit = CurveFit { method: FitMethod::Exponential, coefficients: vec![a, b], r_squared: 0.0, expression };
    fit.r_squared = r_squared(y, &x.iter().map(|&xi| fit.predict(xi)).collect::<Vec<_>>());
    Ok(fit)
}

/// Coefficients of the best polynomial with `terms` terms, ascending powers.
fn least_squares(x: &[f64], y: &[f64], terms: usize) -> CalcResult<Vec<f64>> {
    let vandermonde = DMatrix::from_fn(x.len(), terms, |i, j| x[i].powi(j as i32));
    let rhs = DVector::from_column_slice(y);
    let solution = vandermonde
        .svd(true, true)
        .solve(&rhs, 1e-12)
        .map_err(|reason| CalcError::Internal { message: reason.to_string() })?;
    if solution.iter().any(|c| !c.is_finite()) {
        return Err(CalcError::insufficient_data("x values do not determine the fit"));
    }
    Ok(solution.iter().copied().collect())
}

/// Coefficient of determination; 1 for an exact fit of constant data.
pub fn r_squared(y: &[f64], predicted: &[f64]) -> f64 {
    let mean = y.iter().sum::<f64>() / y.len() as f64;
    let ss_tot: f64 = y.iter().map(|v| (v - mean).powi(2)).sum();
    let ss_res: f64 = y.iter().zip(predicted).map(|(v, p)| (v - p).powi(2)).sum();
    if ss_tot == 0.0 {
        return if ss_res <= 1e-24 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_quadratic() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v * v + 3.0 * v + 1.0).collect();
        let fit = curve_fit(&x, &y, 2, FitMethod::Polynomial).unwrap();
        assert!((fit.coefficients[0] - 1.0).abs() < 1e-9);
        assert!((fit.coefficients[1] - 3.0).abs() < 1e-9);
        assert!((fit.coefficients[2] - 2.0).abs() < 1e-9);
        assert!((fit.r_squared - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_noisy_line() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [1.1, 2.9, 5.2, 6.8];
        let fit = curve_fit(&x, &y, 1, FitMethod::Polynomial).unwrap();
        // Closed-form slope and intercept for these points
        assert!((fit.coefficients[1] - 1.94).abs() < 1e-9);
        assert!((fit.coefficients[0] - 1.09).abs() < 1e-9);
        assert!(fit.r_squared > 0.99 && fit.r_squared < 1.0);
    }

    #[test]
    fn test_exponential() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y: Vec<f64> = x.iter().map(|v| 3.0 * (0.5_f64 * v).exp()).collect();
        let fit = curve_fit(&x, &y, 1, FitMethod::Exponential).unwrap();
        assert!((fit.coefficients[0] - 3.0).abs() < 1e-9);
        assert!((fit.coefficients[1] - 0.5).abs() < 1e-9);
        assert!((fit.predict(4.0) - 3.0 * 2.0f64.exp()).abs() < 1e-8);
    }

    #[test]
    fn test_insufficient_points() {
        let err = curve_fit(&[1.0, 2.0], &[1.0, 4.0], 2, FitMethod::Polynomial).unwrap_err();
        assert_eq!(err.error_code(), "INSUFFICIENT_DATA");
    }

    #[test]
    fn test_degree_limit() {
        let err = curve_fit(&[1.0, 2.0], &[1.0, 4.0], usize::MAX, FitMethod::Polynomial).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
        let err = curve_fit(&[1.0, 2.0], &[1.0, 4.0], 65, FitMethod::Polynomial).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }

    #[test]
    fn test_exponential_rejects_non_positive() {
        let err = curve_fit(&[0.0, 1.0, 2.0], &[1.0, 0.0, 2.0], 1, FitMethod::Exponential).unwrap_err();
        assert_eq!(err.error_code(), "INSUFFICIENT_DATA");
    }

    #[test]
    fn test_length_mismatch() {
        let err = curve_fit(&[0.0, 1.0, 2.0], &[1.0, 2.0], 1, FitMethod::Polynomial).unwrap_err();
        assert_eq!(err.error_code(), "INSUFFICIENT_DATA");
    }

    #[test]
    fn test_r_squared_constant_data() {
        assert!((r_squared(&[2.0, 2.0], &[2.0, 2.0]) - 1.0).abs() < 1e-12);
    }
}
