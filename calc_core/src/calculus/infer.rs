//! Dimension of a solve target from dimensional homogeneity.
//!
//! Every subtree's dimension is tracked as `base + k*D`, where `D` is the
//! unknown dimension of the target. The first place where two terms of a
//! sum (or a function argument) must agree fixes `D`.

use crate::evaluator::Bound;
use crate::expr::{eval_constant, Expr};
use crate::units::{Dimension, MAX_EXPONENT};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Linear {
    base: [i32; 7],
    k: i32,
}

impl Linear {
    const NONE: Linear = Linear { base: [0; 7], k: 0 };

    fn known(dimension: Dimension) -> Self {
        Linear { base: dimension.0, k: 0 }
    }

    /// `self + sign*other`, `None` on overflow
    fn combine(self, other: Linear, sign: i32) -> Option<Self> {
        let mut base = self.base;
        for (b, o) in base.iter_mut().zip(other.base) {
            *b = b.checked_add(o.checked_mul(sign)?)?;
        }
        Some(Linear { base, k: self.k.checked_add(other.k.checked_mul(sign)?)? })
    }

    fn scale(self, n: i32) -> Option<Self> {
        let mut base = self.base;
        for b in base.iter_mut() {
            *b = b.checked_mul(n)?;
        }
        Some(Linear { base, k: self.k.checked_mul(n)? })
    }

    fn halve(self) -> Option<Self> {
        if self.k % 2 != 0 || self.base.iter().any(|b| b % 2 != 0) {
            return None;
        }
        Some(Linear { base: self.base.map(|b| b / 2), k: self.k / 2 })
    }

    fn resolve(self, d: Dimension) -> Option<Self> {
        Some(self.combine(Linear::known(d).scale(self.k)?, 1)?.with_k(0))
    }

    fn with_k(mut self, k: i32) -> Self {
        self.k = k;
        self
    }
}

struct Inference<'a> {
    bound: &'a Bound,
    target: &'a str,
    found: Option<Dimension>,
}

impl Inference<'_> {
    /// Record `k*D = rhs` if it has an integer solution.
    fn constrain(&mut self, k: i32, rhs: [i32; 7]) {
        if self.found.is_some() || k == 0 || rhs.iter().any(|r| r.checked_rem(k) != Some(0)) {
            return;
        }
        let mut exponents = [0; 7];
        for (e, r) in exponents.iter_mut().zip(rhs) {
            match r.checked_div(k) {
                Some(q) => *e = q,
                None => return,
            }
        }
        self.found = Some(Dimension::new(exponents));
    }

    fn settle(&self, value: Linear) -> Option<Linear> {
        match self.found {
            Some(d) if value.k != 0 => value.resolve(d),
            _ => Some(value),
        }
    }

    /// Make two dimensions equal (sum terms, equation sides).
    fn unify(&mut self, a: Linear, b: Linear) -> Option<Linear> {
        let (a, b) = (self.settle(a)?, self.settle(b)?);
        if a != b {
            let rhs = b.combine(a, -1)?.base;
            self.constrain(a.k.checked_sub(b.k)?, rhs);
        }
        self.settle(a)
    }

    fn walk(&mut self, expr: &Expr) -> Option<Linear> {
        Some(match expr {
            Expr::Number(_) | Expr::Constant(_) => Linear::NONE,
            Expr::Symbol(name) if name == self.target => Linear { base: [0; 7], k: 1 },
            Expr::Symbol(name) => Linear::known(self.bound.values.get(name)?.dimension),
            Expr::Neg(a) => self.walk(a)?,
            Expr::Add(a, b) | Expr::Sub(a, b) => {
                let (a, b) = (self.walk(a)?, self.walk(b)?);
                self.unify(a, b)?
            }
            Expr::Mul(a, b) => {
                let (a, b) = (self.walk(a)?, self.walk(b)?);
                a.combine(b, 1)?
            }
            Expr::Div(a, b) => {
                let (a, b) = (self.walk(a)?, self.walk(b)?);
                a.combine(b, -1)?
            }
            Expr::Pow(base, exponent) => {
                let base_dim = self.walk(base)?;
                let base_dim = self.settle(base_dim)?;
                if base_dim == Linear::NONE {
                    return Some(Linear::NONE);
                }
                if !exponent.free_symbols().is_empty() {
                    return None;
                }
                let n = eval_constant(exponent).ok()?.re;
                if n.abs() > MAX_EXPONENT as f64 {
                    return None;
                }
                if n.fract() == 0.0 {
                    base_dim.scale(n as i32)?
                } else if (2.0 * n).fract() == 0.0 {
                    base_dim.halve()?.scale((2.0 * n) as i32)?
                } else {
                    return None;
                }
            }
            Expr::Call { name, args } => {
                let arg = self.walk(args.first()?)?;
                let arg = self.settle(arg)?;
                match name.as_str() {
                    "abs" => arg,
                    "sqrt" => arg.halve()?,
                    _ => {
                        self.constrain(arg.k, Linear::NONE.combine(arg, -1)?.base);
                        Linear::NONE
                    }
                }
            }
        })
    }
}

/// Dimension of `target` implied by `bound.tree = 0`, when determinable.
pub fn infer_dimension(bound: &Bound, target: &str) -> Option<Dimension> {
    let mut inference = Inference { bound, target, found: None };
    let whole = inference.walk(&bound.tree)?;
    if inference.found.is_none() {
        // The whole residual is compared against a dimensionless zero.
        inference.constrain(whole.k, Linear::NONE.combine(whole, -1)?.base);
    }
    inference.found
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::calculus::solve::residual;
    use crate::evaluator::Evaluator;
    use crate::expr::parse_equation;
    use crate::symbols::SymbolTable;
    use crate::units::UnitRegistry;
    use crate::value::{parse_variable, Scope, VariablePayload};

    fn infer(equation: &str, target: &str, vars: &[(&str, VariablePayload)]) -> Option<Dimension> {
        let registry = UnitRegistry::new();
        let session = SymbolTable::new();
        let locals: BTreeMap<_, _> = vars
            .iter()
            .map(|(n, p)| (n.to_string(), parse_variable(n, p, &registry, Scope::Local).unwrap()))
            .collect();
        let (lhs, rhs) = parse_equation(equation).unwrap();
        let bound = Evaluator::new(&registry, &session, &locals)
            .excluding(target)
            .bind(&residual(&lhs, &rhs))
            .unwrap();
        infer_dimension(&bound, target)
    }

    #[test]
    fn test_newton_second_law() {
        let vars = [
            ("F", VariablePayload::with_unit(10.0, "N")),
            ("m", VariablePayload::with_unit(2.0, "kg")),
        ];
        let d = infer("F = m*a", "a", &vars).unwrap();
        assert_eq!(d, Dimension::new([1, 0, -2, 0, 0, 0, 0]));
    }

    #[test]
    fn test_square_of_unknown() {
        let vars = [("A", VariablePayload::with_unit(4.0, "m^2"))];
        let d = infer("x^2 = A", "x", &vars).unwrap();
        assert_eq!(d, Dimension::new([1, 0, 0, 0, 0, 0, 0]));
    }

    #[test]
    fn test_dimensionless_polynomial() {
        let d = infer("x^2 - 4 = 0", "x", &[]).unwrap();
        assert!(d.is_dimensionless());
    }

    #[test]
    fn test_unknown_other_symbol() {
        assert!(infer("x = y", "x", &[]).is_none());
    }

    #[test]
    fn test_exponent_overflow_gives_up() {
        let vars = [("L", VariablePayload::with_unit(1.0, "m"))];
        let nested = format!("{}x{}", "(".repeat(6), ")^64".repeat(6));
        assert!(infer(&format!("{} = L", nested), "x", &vars).is_none());
        assert!(infer("x^3000000000 = L", "x", &vars).is_none());
    }

    #[test]
    fn test_function_argument() {
        let vars = [("t", VariablePayload::with_unit(2.0, "s"))];
        let d = infer("exp(k*t) = 5", "k", &vars).unwrap();
        assert_eq!(d, Dimension::new([0, 0, -1, 0, 0, 0, 0]));
    }
}
