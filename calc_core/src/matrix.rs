//! # Matrices
//!
//! Matrices of expressions. Entries may be numbers or any expression text,
//! so `[[a, b], [c, d]]` inverts symbolically. Operations that only make
//! sense numerically (eigen-decomposition, rank) require every entry to
//! evaluate to a real number and run through `nalgebra`.
//!
//! ## Example
//!
//! ```rust
//! use calc_core::matrix::{matrix_operation, ExprMatrix, MatrixOp, MatrixValue};
//! use calc_core::value::RawValue;
//!
//! let m = ExprMatrix::from_raw(&[
//!     vec![RawValue::Number(1.0), RawValue::Number(2.0)],
//!     vec![RawValue::Number(3.0), RawValue::Number(4.0)],
//! ]).unwrap();
//! match matrix_operation(MatrixOp::Determinant, &[m]).unwrap() {
//!     MatrixValue::Scalar(det) => assert_eq!(det.to_string(), "-2"),
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```

use log::debug;
use nalgebra::DMatrix;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::errors::{CalcError, CalcResult};
use crate::expr::numeric::as_real;
use crate::expr::{eval_constant, parse_expression, simplify, Expr};
use crate::value::RawValue;

/// Largest size handled by cofactor expansion on symbolic entries.
const MAX_SYMBOLIC_SIZE: usize = 6;

/// Relative singular-value threshold for rank and singularity.
const RANK_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MatrixOp {
    Multiply,
    Add,
    Subtract,
    Inverse,
    Transpose,
    Determinant,
    Eigen,
    Rank,
    Trace,
}

impl MatrixOp {
    /// Operands the operation takes: `(min, max)`.
    fn operand_range(&self) -> (usize, usize) {
        match self {
            MatrixOp::Multiply | MatrixOp::Add => (2, usize::MAX),
            MatrixOp::Subtract => (2, 2),
            _ => (1, 1),
        }
    }
}

/// Row-major matrix of simplified expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprMatrix {
    rows: Vec<Vec<Expr>>,
    ncols: usize,
}

impl ExprMatrix {
    pub fn new(rows: Vec<Vec<Expr>>) -> CalcResult<Self> {
        let ncols = rows.first().map(Vec::len).unwrap_or(0);
        if rows.is_empty() || ncols == 0 {
            return Err(CalcError::invalid_input("matrix", "[]", "Matrix must have at least one entry"));
        }
        if let Some(bad) = rows.iter().position(|row| row.len() != ncols) {
            return Err(CalcError::invalid_input(
                "matrix",
                format!("row {}", bad),
                format!("expected {} columns, got {}", ncols, rows[bad].len()),
            ));
        }
        let rows = rows.iter().map(|row| row.iter().map(simplify).collect()).collect();
        Ok(ExprMatrix { rows, ncols })
    }

    /// Parse caller-supplied entries (numbers or expression text).
    pub fn from_raw(rows: &[Vec<RawValue>]) -> CalcResult<Self> {
        let parsed = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|entry| match entry {
                        RawValue::Number(n) => Ok(Expr::Number(*n)),
                        RawValue::Text(text) => parse_expression(text),
                    })
                    .collect::<CalcResult<Vec<_>>>()
            })
            .collect::<CalcResult<Vec<_>>>()?;
        ExprMatrix::new(parsed)
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.ncols)
    }

    pub fn is_square(&self) -> bool {
        self.rows.len() == self.ncols
    }

    pub fn get(&self, i: usize, j: usize) -> Option<&Expr> {
        self.rows.get(i)?.get(j)
    }

    pub fn rows(&self) -> &[Vec<Expr>] {
        &self.rows
    }

    /// Canonical text of every entry.
    pub fn to_strings(&self) -> Vec<Vec<String>> {
        self.rows.iter().map(|row| row.iter().map(Expr::to_string).collect()).collect()
    }

    /// Real values of every entry, if all of them are constant.
    pub fn to_numeric(&self) -> Option<DMatrix<f64>> {
        let (nrows, ncols) = self.shape();
        let mut values = Vec::with_capacity(nrows * ncols);
        for row in &self.rows {
            for entry in row {
                if !entry.free_symbols().is_empty() {
                    return None;
                }
                values.push(eval_constant(entry).ok().and_then(as_real)?);
            }
        }
        Some(DMatrix::from_row_slice(nrows, ncols, &values))
    }

    fn from_numeric(m: &DMatrix<f64>) -> Self {
        let rows = (0..m.nrows()).map(|i| (0..m.ncols()).map(|j| Expr::Number(snap(m[(i, j)]))).collect()).collect();
        ExprMatrix { rows, ncols: m.ncols() }
    }

    fn map2(&self, other: &ExprMatrix, op: &str, f: impl Fn(&Expr, &Expr) -> Expr) -> CalcResult<Self> {
        if self.shape() != other.shape() {
            return Err(shape_error(op, self, other));
        }
        let rows = self
            .rows
            .iter()
            .zip(&other.rows)
            .map(|(a, b)| a.iter().zip(b).map(|(x, y)| simplify(&f(x, y))).collect())
            .collect();
        Ok(ExprMatrix { rows, ncols: self.ncols })
    }

    pub fn add(&self, other: &ExprMatrix) -> CalcResult<Self> {
        self.map2(other, "add", |a, b| a.clone() + b.clone())
    }

    pub fn subtract(&self, other: &ExprMatrix) -> CalcResult<Self> {
        self.map2(other, "subtract", |a, b| a.clone() - b.clone())
    }

    pub fn multiply(&self, other: &ExprMatrix) -> CalcResult<Self> {
        let (n, k) = self.shape();
        let (k2, m) = other.shape();
        if k != k2 {
            return Err(shape_error("multiply", self, other));
        }
        let rows = (0..n)
            .map(|i| {
                (0..m)
                    .map(|j| {
                        let sum = (0..k)
                            .map(|l| self.rows[i][l].clone() * other.rows[l][j].clone())
                            .reduce(|acc, term| acc + term)
                            .unwrap_or(Expr::Number(0.0));
                        simplify(&sum)
                    })
                    .collect()
            })
            .collect();
        Ok(ExprMatrix { rows, ncols: m })
    }

    pub fn transpose(&self) -> Self {
        let rows = (0..self.ncols).map(|j| self.rows.iter().map(|row| row[j].clone()).collect()).collect();
        ExprMatrix { rows, ncols: self.rows.len() }
    }

    pub fn trace(&self) -> CalcResult<Expr> {
        self.require_square("trace")?;
        let sum = (0..self.ncols)
            .map(|i| self.rows[i][i].clone())
            .reduce(|acc, term| acc + term)
            .unwrap_or(Expr::Number(0.0));
        Ok(simplify(&sum))
    }

    pub fn determinant(&self) -> CalcResult<Expr> {
        self.require_square("determinant")?;
        if let Some(m) = self.to_numeric() {
            let scale: f64 = m.row_iter().map(|row| row.norm().max(1.0)).product();
            let det = m.determinant();
            return Ok(Expr::Number(if det.abs() <= RANK_EPSILON * scale { 0.0 } else { snap(det) }));
        }
        self.require_symbolic_size("determinant")?;
        Ok(simplify(&cofactor_determinant(&self.rows)))
    }

    pub fn inverse(&self) -> CalcResult<Self> {
        self.require_square("inverse")?;
        if let Some(m) = self.to_numeric() {
            if numeric_rank(&m) < m.nrows() {
                return Err(CalcError::SingularMatrix { reason: "Matrix is singular and cannot be inverted".to_string() });
            }
            let inverse = m.try_inverse().ok_or_else(|| CalcError::SingularMatrix {
                reason: "Matrix is singular and cannot be inverted".to_string(),
            })?;
            return Ok(ExprMatrix::from_numeric(&inverse));
        }
        self.require_symbolic_size("inverse")?;
        let det = simplify(&cofactor_determinant(&self.rows));
        if det.is_number(0.0) {
            return Err(CalcError::SingularMatrix { reason: "Determinant is identically zero".to_string() });
        }
        let n = self.ncols;
        let rows = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| {
                        // adj(A)[i][j] = cofactor(j, i)
                        let sign = if (i + j) % 2 == 0 { 1.0 } else { -1.0 };
                        let minor = cofactor_determinant(&minor_rows(&self.rows, j, i));
                        simplify(&(Expr::Number(sign) * minor / det.clone()))
                    })
                    .collect()
            })
            .collect();
        Ok(ExprMatrix { rows, ncols: n })
    }

    pub fn rank(&self) -> CalcResult<usize> {
        let m = self.require_numeric("rank")?;
        Ok(numeric_rank(&m))
    }

    /// Eigenvalues, with eigenvectors for the real ones, sorted by value.
    pub fn eigen(&self) -> CalcResult<Vec<Eigenpair>> {
        self.require_square("eigen")?;
        let m = self.require_numeric("eigen")?;
        let mut pairs = if m == m.transpose() {
            let decomposition = m.clone().symmetric_eigen();
            decomposition
                .eigenvalues
                .iter()
                .enumerate()
                .map(|(k, &value)| Eigenpair {
                    value: Complex64::new(snap(value), 0.0),
                    vector: Some(normalise(decomposition.eigenvectors.column(k).iter().copied().collect())),
                })
                .collect::<Vec<_>>()
        } else {
            m.complex_eigenvalues()
                .iter()
                .map(|&value| {
                    let value = Complex64::new(snap(value.re), snap(value.im));
                    let vector = (value.im == 0.0).then(|| null_vector(&m, value.re)).flatten();
                    Eigenpair { value, vector }
                })
                .collect()
        };
        pairs.sort_by(|a, b| a.value.re.total_cmp(&b.value.re).then(a.value.im.total_cmp(&b.value.im)));
        Ok(pairs)
    }

    fn require_square(&self, op: &str) -> CalcResult<()> {
        if self.is_square() {
            Ok(())
        } else {
            let (r, c) = self.shape();
            Err(CalcError::invalid_input("matrix", format!("{}x{}", r, c), format!("{} requires a square matrix", op)))
        }
    }

    fn require_numeric(&self, op: &str) -> CalcResult<DMatrix<f64>> {
        self.to_numeric().ok_or_else(|| {
            CalcError::invalid_input("matrix", "symbolic entries", format!("{} requires real numeric entries", op))
        })
    }

    fn require_symbolic_size(&self, op: &str) -> CalcResult<()> {
        if self.ncols <= MAX_SYMBOLIC_SIZE {
            Ok(())
        } else {
            Err(CalcError::invalid_input(
                "matrix",
                format!("{}x{}", self.ncols, self.ncols),
                format!("symbolic {} supports at most {}x{}", op, MAX_SYMBOLIC_SIZE, MAX_SYMBOLIC_SIZE),
            ))
        }
    }
}

/// One eigenvalue and, when real, a unit eigenvector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Eigenpair {
    pub value: Complex64,
    pub vector: Option<Vec<f64>>,
}

/// Result of a [`MatrixOp`].
#[derive(Debug, Clone, PartialEq)]
pub enum MatrixValue {
    Matrix(ExprMatrix),
    Scalar(Expr),
    Rank(usize),
    Eigen(Vec<Eigenpair>),
}

/// Apply `op` to `operands`. Multiply and add fold left over any number of operands.
pub fn matrix_operation(op: MatrixOp, operands: &[ExprMatrix]) -> CalcResult<MatrixValue> {
    let (min, max) = op.operand_range();
    if operands.len() < min || operands.len() > max {
        let expected = if min == max { min.to_string() } else { format!("at least {}", min) };
        return Err(CalcError::invalid_input(
            "matrices",
            operands.len().to_string(),
            format!("{} expects {} matrices", op, expected),
        ));
    }
    debug!("matrix {} on {} operand(s)", op, operands.len());
    let first = &operands[0];
    Ok(match op {
        MatrixOp::Multiply => MatrixValue::Matrix(fold(operands, ExprMatrix::multiply)?),
        MatrixOp::Add => MatrixValue::Matrix(fold(operands, ExprMatrix::add)?),
        MatrixOp::Subtract => MatrixValue::Matrix(first.subtract(&operands[1])?),
        MatrixOp::Inverse => MatrixValue::Matrix(first.inverse()?),
        MatrixOp::Transpose => MatrixValue::Matrix(first.transpose()),
        MatrixOp::Determinant => MatrixValue::Scalar(first.determinant()?),
        MatrixOp::Trace => MatrixValue::Scalar(first.trace()?),
        MatrixOp::Rank => MatrixValue::Rank(first.rank()?),
        MatrixOp::Eigen => MatrixValue::Eigen(first.eigen()?),
    })
}

fn fold(
    operands: &[ExprMatrix],
    f: impl Fn(&ExprMatrix, &ExprMatrix) -> CalcResult<ExprMatrix>,
) -> CalcResult<ExprMatrix> {
    let mut acc = operands[0].clone();
    for next in &operands[1..] {
        acc = f(&acc, next)?;
    }
    Ok(acc)
}

fn shape_error(op: &str, a: &ExprMatrix, b: &ExprMatrix) -> CalcError {
    let (ar, ac) = a.shape();
    let (br, bc) = b.shape();
    CalcError::invalid_input(
        "matrices",
        format!("{}x{} and {}x{}", ar, ac, br, bc),
        format!("incompatible shapes for {}", op),
    )
}

fn minor_rows(rows: &[Vec<Expr>], skip_row: usize, skip_col: usize) -> Vec<Vec<Expr>> {
    rows.iter()
        .enumerate()
        .filter(|(i, _)| *i != skip_row)
        .map(|(_, row)| row.iter().enumerate().filter(|(j, _)| *j != skip_col).map(|(_, e)| e.clone()).collect())
        .collect()
}

/// Laplace expansion along the first row.
fn cofactor_determinant(rows: &[Vec<Expr>]) -> Expr {
    match rows.len() {
        0 => Expr::Number(1.0),
        1 => rows[0][0].clone(),
        2 => rows[0][0].clone() * rows[1][1].clone() - rows[0][1].clone() * rows[1][0].clone(),
        n => (0..n)
            .filter(|&j| !rows[0][j].is_number(0.0))
            .map(|j| {
                let term = rows[0][j].clone() * simplify(&cofactor_determinant(&minor_rows(rows, 0, j)));
                if j % 2 == 0 {
                    term
                } else {
                    -term
                }
            })
            .reduce(|acc, term| acc + term)
            .unwrap_or(Expr::Number(0.0)),
    }
}

fn numeric_rank(m: &DMatrix<f64>) -> usize {
    let largest = m.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
    if largest == 0.0 {
        return 0;
    }
    let tolerance = RANK_EPSILON * largest * m.nrows().max(m.ncols()) as f64;
    m.clone().svd(false, false).singular_values.iter().filter(|&&s| s > tolerance).count()
}

/// Right singular vector of `A - λI` with the smallest singular value.
fn null_vector(m: &DMatrix<f64>, lambda: f64) -> Option<Vec<f64>> {
    let n = m.nrows();
    let shifted = m - DMatrix::<f64>::identity(n, n) * lambda;
    let svd = shifted.svd(false, true);
    let v_t = svd.v_t?;
    let (k, _) = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    Some(normalise(v_t.row(k).iter().copied().collect()))
}

/// Unit length with the largest component positive.
fn normalise(mut v: Vec<f64>) -> Vec<f64> {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    let pivot = v.iter().copied().fold(0.0f64, |acc, x| if x.abs() > acc.abs() { x } else { acc });
    if norm > 0.0 {
        let sign = if pivot < 0.0 { -1.0 } else { 1.0 };
        v.iter_mut().for_each(|x| *x = snap(sign * *x / norm));
    }
    v
}

/// Round away floating-point noise near integers.
fn snap(x: f64) -> f64 {
    let rounded = x.round();
    if (x - rounded).abs() <= 1e-10 * x.abs().max(1.0) {
        if rounded == 0.0 {
            0.0
        } else {
            rounded
        }
    } else {
        x
    }
}
