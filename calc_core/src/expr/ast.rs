//! Operator tree produced by the parser.

use std::collections::BTreeSet;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Named mathematical constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constant {
    Pi,
    E,
    I,
    Infinity,
}

impl Constant {
    /// Identifier spellings that bind to a constant when nothing else does.
    pub fn lookup(name: &str) -> Option<Constant> {
        match name {
            "pi" | "π" | "Pi" | "PI" => Some(Constant::Pi),
            "e" | "E" => Some(Constant::E),
            "i" | "I" | "j" => Some(Constant::I),
            "oo" | "inf" | "∞" | "infinity" | "Infinity" => Some(Constant::Infinity),
            _ => None,
        }
    }

    /// Canonical printed form
    pub fn symbol(self) -> &'static str {
        match self {
            Constant::Pi => "pi",
            Constant::E => "E",
            Constant::I => "I",
            Constant::Infinity => "oo",
        }
    }

    pub fn value(self) -> Complex64 {
        match self {
            Constant::Pi => Complex64::new(std::f64::consts::PI, 0.0),
            Constant::E => Complex64::new(std::f64::consts::E, 0.0),
            Constant::I => Complex64::new(0.0, 1.0),
            Constant::Infinity => Complex64::new(f64::INFINITY, 0.0),
        }
    }
}

/// Expression tree.
///
/// Binary minus and division are kept as written by the parser; the
/// simplifier rewrites them into sums and products with negative
/// coefficients or exponents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Number(f64),
    Constant(Constant),
    Symbol(String),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Call { name: String, args: Vec<Expr> },
}

impl Expr {
    pub fn num(value: f64) -> Expr {
        Expr::Number(value)
    }

    pub fn sym(name: &str) -> Expr {
        Expr::Symbol(name.to_string())
    }

    pub fn call(name: &str, arg: Expr) -> Expr {
        Expr::Call { name: name.to_string(), args: vec![arg] }
    }

    pub fn pow(self, exponent: Expr) -> Expr {
        Expr::Pow(Box::new(self), Box::new(exponent))
    }

    pub fn powf(self, exponent: f64) -> Expr {
        self.pow(Expr::Number(exponent))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Expr::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_number(&self, value: f64) -> bool {
        matches!(self, Expr::Number(n) if *n == value)
    }

    /// Names of every symbol in the tree, sorted.
    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Symbol(name) => {
                out.insert(name.clone());
            }
            Expr::Number(_) | Expr::Constant(_) => {}
            Expr::Neg(a) => a.collect_symbols(out),
            Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) | Expr::Pow(a, b) => {
                a.collect_symbols(out);
                b.collect_symbols(out);
            }
            Expr::Call { args, .. } => args.iter().for_each(|a| a.collect_symbols(out)),
        }
    }

    pub fn contains_symbol(&self, name: &str) -> bool {
        match self {
            Expr::Symbol(s) => s == name,
            Expr::Number(_) | Expr::Constant(_) => false,
            Expr::Neg(a) => a.contains_symbol(name),
            Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) | Expr::Pow(a, b) => {
                a.contains_symbol(name) || b.contains_symbol(name)
            }
            Expr::Call { args, .. } => args.iter().any(|a| a.contains_symbol(name)),
        }
    }

    /// Replace every symbol for which `f` returns a tree.
    pub fn replace_symbols<F>(&self, f: &mut F) -> Expr
    where
        F: FnMut(&str) -> Option<Expr>,
    {
        match self {
            Expr::Symbol(name) => f(name).unwrap_or_else(|| self.clone()),
            Expr::Number(_) | Expr::Constant(_) => self.clone(),
            Expr::Neg(a) => Expr::Neg(Box::new(a.replace_symbols(f))),
            Expr::Add(a, b) => Expr::Add(Box::new(a.replace_symbols(f)), Box::new(b.replace_symbols(f))),
            Expr::Sub(a, b) => Expr::Sub(Box::new(a.replace_symbols(f)), Box::new(b.replace_symbols(f))),
            Expr::Mul(a, b) => Expr::Mul(Box::new(a.replace_symbols(f)), Box::new(b.replace_symbols(f))),
            Expr::Div(a, b) => Expr::Div(Box::new(a.replace_symbols(f)), Box::new(b.replace_symbols(f))),
            Expr::Pow(a, b) => Expr::Pow(Box::new(a.replace_symbols(f)), Box::new(b.replace_symbols(f))),
            Expr::Call { name, args } => Expr::Call {
                name: name.clone(),
                args: args.iter().map(|a| a.replace_symbols(f)).collect(),
            },
        }
    }

    /// Substitute one symbol.
    pub fn substitute(&self, name: &str, replacement: &Expr) -> Expr {
        self.replace_symbols(&mut |s| if s == name { Some(replacement.clone()) } else { None })
    }

    /// Names of every function call in the tree.
    pub fn function_names(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_functions(&mut out);
        out
    }

    fn collect_functions(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Number(_) | Expr::Constant(_) | Expr::Symbol(_) => {}
            Expr::Neg(a) => a.collect_functions(out),
            Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) | Expr::Pow(a, b) => {
                a.collect_functions(out);
                b.collect_functions(out);
            }
            Expr::Call { name, args } => {
                out.insert(name.clone());
                args.iter().for_each(|a| a.collect_functions(out));
            }
        }
    }
}

impl std::ops::Add for Expr {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        Expr::Add(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Sub for Expr {
    type Output = Expr;
    fn sub(self, rhs: Expr) -> Expr {
        Expr::Sub(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Mul for Expr {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        Expr::Mul(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Div for Expr {
    type Output = Expr;
    fn div(self, rhs: Expr) -> Expr {
        Expr::Div(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::Neg(Box::new(self))
    }
}
