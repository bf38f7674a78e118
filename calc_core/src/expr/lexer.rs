//! Tokenizer for expressions and equations.
//!
//! `^` and `**` both lex to [`TokenKind::Caret`]. Implicit multiplication
//! (`2x`, `2(x + 1)`, `(a)(b)`) is made explicit here so the parser only
//! ever sees binary operators.

use crate::errors::{CalcError, CalcResult};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    Comma,
    Equals,
}

/// A token and the character offset where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: usize,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

pub fn tokenize(input: &str) -> CalcResult<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens: Vec<Token> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let start = i;
        let kind = match c {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '+' => {
                i += 1;
                TokenKind::Plus
            }
            '-' | '−' => {
                i += 1;
                TokenKind::Minus
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                TokenKind::Caret
            }
            '*' | '·' | '×' => {
                i += 1;
                TokenKind::Star
            }
            '/' | '÷' => {
                i += 1;
                TokenKind::Slash
            }
            '^' => {
                i += 1;
                TokenKind::Caret
            }
            '(' | '[' => {
                i += 1;
                TokenKind::LParen
            }
            ')' | ']' => {
                i += 1;
                TokenKind::RParen
            }
            ',' => {
                i += 1;
                TokenKind::Comma
            }
            '=' => {
                i += 1;
                // `==` reads as a single equals sign
                if chars.get(i) == Some(&'=') {
                    i += 1;
                }
                TokenKind::Equals
            }
            '∞' => {
                i += 1;
                TokenKind::Ident("∞".to_string())
            }
            c if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit())) => {
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| CalcError::parse(input, start, format!("Invalid number '{}'", literal)))?;
                TokenKind::Number(value)
            }
            c if is_ident_start(c) => {
                while i < chars.len() && is_ident_continue(chars[i]) {
                    i += 1;
                }
                TokenKind::Ident(chars[start..i].iter().collect())
            }
            other => {
                return Err(CalcError::parse(input, start, format!("Unexpected character '{}'", other)));
            }
        };

        if let Some(prev) = tokens.last() {
            if implies_multiplication(&prev.kind, &kind) {
                tokens.push(Token { kind: TokenKind::Star, pos: start });
            }
        }
        tokens.push(Token { kind, pos: start });
    }

    Ok(tokens)
}

/// Juxtaposed operands multiply; an identifier before `(` is a call.
fn implies_multiplication(prev: &TokenKind, next: &TokenKind) -> bool {
    matches!(
        (prev, next),
        (TokenKind::Number(_) | TokenKind::Ident(_) | TokenKind::RParen, TokenKind::Ident(_))
            | (TokenKind::Number(_) | TokenKind::RParen, TokenKind::LParen)
            | (TokenKind::Ident(_) | TokenKind::RParen, TokenKind::Number(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(
            kinds("x**2 + 1.5e3"),
            vec![
                TokenKind::Ident("x".into()),
                TokenKind::Caret,
                TokenKind::Number(2.0),
                TokenKind::Plus,
                TokenKind::Number(1500.0),
            ]
        );
    }

    #[test]
    fn test_implicit_multiplication() {
        assert_eq!(
            kinds("2x"),
            vec![TokenKind::Number(2.0), TokenKind::Star, TokenKind::Ident("x".into())]
        );
        assert_eq!(kinds("2(x)")[1], TokenKind::Star);
        assert_eq!(kinds("sin(x)")[1], TokenKind::LParen);
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("a + bc").unwrap();
        assert_eq!(tokens[2].pos, 4);
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("2 $ 3").unwrap_err();
        match err {
            CalcError::Parse { position, .. } => assert_eq!(position, 2),
            other => panic!("unexpected error {:?}", other),
        }
    }
}
