//! Recursive-descent parser.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! equation := expr ('=' expr)?
//! expr     := term (('+' | '-') term)*
//! term     := unary (('*' | '/') unary)*
//! unary    := ('-' | '+') unary | power
//! power    := primary ('^' unary)?
//! primary  := number | ident | ident '(' args ')' | '(' expr ')'
//! ```
//!
//! Binary minus and divide fold left; `^` is right-associative and binds
//! tighter than unary minus, so `-x^2` is `-(x^2)` and `2^-1` is `1/2`.
//!
//! Input whose tree would be more than 256 levels deep is a parse error.

use crate::errors::{CalcError, CalcResult};

use super::ast::Expr;
use super::lexer::{tokenize, Token, TokenKind};

/// Deepest tree (and parser recursion) accepted
const MAX_DEPTH: usize = 256;

/// Parsed subtree with its height
type Node = (Expr, usize);

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    nesting: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> CalcResult<Self> {
        Ok(Parser { input, tokens: tokenize(input)?, pos: 0, nesting: 0 })
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|t| t.pos)
            .unwrap_or_else(|| self.input.chars().count())
    }

    fn error(&self, reason: impl Into<String>) -> CalcError {
        CalcError::parse(self.input, self.position(), reason)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> CalcResult<()> {
        if self.peek() == Some(&kind) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("Expected {}", what)))
        }
    }

    /// Height of a node built over children of height `height`.
    fn above(&self, height: usize) -> CalcResult<usize> {
        if height >= MAX_DEPTH {
            return Err(self.error("Expression is nested too deeply"));
        }
        Ok(height + 1)
    }

    /// Run a recursive production one level deeper.
    fn nested<T>(&mut self, production: impl FnOnce(&mut Self) -> CalcResult<T>) -> CalcResult<T> {
        if self.nesting >= MAX_DEPTH {
            return Err(self.error("Expression is nested too deeply"));
        }
        self.nesting += 1;
        let result = production(self);
        self.nesting -= 1;
        result
    }

    fn expr(&mut self) -> CalcResult<Node> {
        let (mut left, mut height) = self.term()?;
        loop {
            match self.peek() {
                Some(TokenKind::Plus) => {
                    self.pos += 1;
                    let (right, h) = self.term()?;
                    height = self.above(height.max(h))?;
                    left = left + right;
                }
                Some(TokenKind::Minus) => {
                    self.pos += 1;
                    let (right, h) = self.term()?;
                    height = self.above(height.max(h))?;
                    left = left - right;
                }
                _ => return Ok((left, height)),
            }
        }
    }

    fn term(&mut self) -> CalcResult<Node> {
        let (mut left, mut height) = self.unary()?;
        loop {
            match self.peek() {
                Some(TokenKind::Star) => {
                    self.pos += 1;
                    let (right, h) = self.unary()?;
                    height = self.above(height.max(h))?;
                    left = left * right;
                }
                Some(TokenKind::Slash) => {
                    self.pos += 1;
                    let (right, h) = self.unary()?;
                    height = self.above(height.max(h))?;
                    left = left / right;
                }
                _ => return Ok((left, height)),
            }
        }
    }

    fn unary(&mut self) -> CalcResult<Node> {
        match self.peek() {
            Some(TokenKind::Minus) => {
                self.pos += 1;
                let (operand, height) = self.nested(Self::unary)?;
                Ok(match operand {
                    Expr::Number(n) => (Expr::Number(-n), height),
                    other => (-other, self.above(height)?),
                })
            }
            Some(TokenKind::Plus) => {
                self.pos += 1;
                self.nested(Self::unary)
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> CalcResult<Node> {
        let (base, height) = self.primary()?;
        if let Some(TokenKind::Caret) = self.peek() {
            self.pos += 1;
            let (exponent, h) = self.nested(Self::unary)?;
            return Ok((base.pow(exponent), self.above(height.max(h))?));
        }
        Ok((base, height))
    }

    fn primary(&mut self) -> CalcResult<Node> {
        let token = match self.tokens.get(self.pos) {
            Some(token) => token.kind.clone(),
            None => return Err(self.error("Unexpected end of input")),
        };
        match token {
            TokenKind::Number(value) => {
                self.pos += 1;
                Ok((Expr::Number(value), 0))
            }
            TokenKind::Ident(name) => {
                self.pos += 1;
                if let Some(TokenKind::LParen) = self.peek() {
                    self.pos += 1;
                    let (args, height) = self.nested(Self::arguments)?;
                    return Ok((Expr::Call { name, args }, self.above(height)?));
                }
                Ok((Expr::Symbol(name), 0))
            }
            TokenKind::LParen => {
                self.pos += 1;
                let inner = self.nested(Self::expr)?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            other => Err(self.error(format!("Unexpected token {:?}", other))),
        }
    }

    fn arguments(&mut self) -> CalcResult<(Vec<Expr>, usize)> {
        let mut args = Vec::new();
        let mut height = 0;
        if let Some(TokenKind::RParen) = self.peek() {
            self.pos += 1;
            return Ok((args, height));
        }
        loop {
            let (arg, h) = self.expr()?;
            args.push(arg);
            height = height.max(h);
            match self.peek() {
                Some(TokenKind::Comma) => self.pos += 1,
                Some(TokenKind::RParen) => {
                    self.pos += 1;
                    return Ok((args, height));
                }
                _ => return Err(self.error("Expected ',' or ')' in argument list")),
            }
        }
    }

    fn finish(&self) -> CalcResult<()> {
        if self.pos < self.tokens.len() {
            return Err(self.error("Unexpected trailing input"));
        }
        Ok(())
    }
}

/// Parse a single expression. An `=` is a parse error here.
pub fn parse_expression(input: &str) -> CalcResult<Expr> {
    if input.trim().is_empty() {
        return Err(CalcError::parse(input, 0, "Empty expression"));
    }
    let mut parser = Parser::new(input)?;
    let (expr, _) = parser.expr()?;
    parser.finish()?;
    Ok(expr)
}

/// Parse `lhs = rhs`; without `=` the right side is `0`.
pub fn parse_equation(input: &str) -> CalcResult<(Expr, Expr)> {
    if input.trim().is_empty() {
        return Err(CalcError::parse(input, 0, "Empty equation"));
    }
    let mut parser = Parser::new(input)?;
    let (lhs, _) = parser.expr()?;
    let rhs = if let Some(TokenKind::Equals) = parser.peek() {
        parser.pos += 1;
        parser.expr()?.0
    } else {
        Expr::Number(0.0)
    };
    parser.finish()?;
    Ok((lhs, rhs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Expr {
        Expr::sym("x")
    }

    #[test]
    fn test_precedence() {
        let expr = parse_expression("1 + 2 * x").unwrap();
        assert_eq!(expr, Expr::num(1.0) + Expr::num(2.0) * x());
    }

    #[test]
    fn test_left_associative() {
        let expr = parse_expression("8 / 4 / 2").unwrap();
        assert_eq!(expr, (Expr::num(8.0) / Expr::num(4.0)) / Expr::num(2.0));
        let expr = parse_expression("5 - 3 - 1").unwrap();
        assert_eq!(expr, (Expr::num(5.0) - Expr::num(3.0)) - Expr::num(1.0));
    }

    #[test]
    fn test_power_right_associative() {
        let expr = parse_expression("2^3^2").unwrap();
        assert_eq!(expr, Expr::num(2.0).pow(Expr::num(3.0).pow(Expr::num(2.0))));
        let expr = parse_expression("-x**2").unwrap();
        assert_eq!(expr, -(x().powf(2.0)));
    }

    #[test]
    fn test_calls() {
        let expr = parse_expression("stress(F, A)").unwrap();
        match expr {
            Expr::Call { name, args } => {
                assert_eq!(name, "stress");
                assert_eq!(args.len(), 2);
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_equation() {
        let (lhs, rhs) = parse_equation("x^2 - 4 = 0").unwrap();
        assert_eq!(lhs, x().powf(2.0) - Expr::num(4.0));
        assert_eq!(rhs, Expr::num(0.0));
        let (_, rhs) = parse_equation("x + 1").unwrap();
        assert_eq!(rhs, Expr::num(0.0));
        assert!(parse_equation("x = 1 = 2").is_err());
    }

    #[test]
    fn test_errors() {
        assert!(parse_expression("").is_err());
        assert!(parse_expression("2 +").is_err());
        assert!(parse_expression("(x + 1").is_err());
        assert!(parse_expression("x = 1").is_err());
        match parse_expression("2 + * 3").unwrap_err() {
            CalcError::Parse { position, .. } => assert_eq!(position, 4),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_nesting_limit() {
        let shallow = format!("{}x{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(parse_expression(&shallow).unwrap(), x());

        let deep = format!("{}x{}", "(".repeat(100_000), ")".repeat(100_000));
        assert_eq!(parse_expression(&deep).unwrap_err().error_code(), "PARSE_ERROR");

        let signs = format!("{}x", "-".repeat(100_000));
        assert!(parse_expression(&signs).is_err());
        let calls = format!("{}x{}", "sin(".repeat(100_000), ")".repeat(100_000));
        assert!(parse_expression(&calls).is_err());
        let towers = vec!["x"; 100_000].join("^");
        assert!(parse_expression(&towers).is_err());
    }

    #[test]
    fn test_long_chains_are_bounded() {
        let sum = vec!["1"; 200].join(" + ");
        assert!(parse_expression(&sum).is_ok());
        let long = vec!["x"; 100_000].join(" * ");
        assert_eq!(parse_expression(&long).unwrap_err().error_code(), "PARSE_ERROR");
    }
}
