//! Calculator Tool
//!
//! Evaluates restricted arithmetic: binary `+ - * /`, parentheses,
//! numeric literals, and a leading sign at the start of an expression
//! or sub-expression. Exponentiation is rejected with a dedicated
//! message rather than evaluated.

use async_trait::async_trait;

use super::{Tool, ToolName};
use crate::error::{AgentError, Result};

/// Restricted arithmetic evaluator
pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> ToolName {
        ToolName::Calculator
    }

    async fn run(&self, query: &str) -> Result<String> {
        let expression = query.trim();
        if expression.is_empty() {
            return Err(AgentError::ToolExecution(
                "Calculator received an empty expression".into(),
            ));
        }
        let value = evaluate(expression)?;
        Ok(render_number(value))
    }
}

/// Render a finite integral value with a trailing `.0`; everything else
/// (fractions, infinities, NaN from `0/0`) uses the shortest form.
fn render_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LeftParen,
    RightParen,
}

fn exponent_error() -> AgentError {
    AgentError::ToolExecution("Exponentiation is not allowed for safety reasons".into())
}

fn invalid(expression: &str) -> AgentError {
    AgentError::ToolExecution(format!("Invalid mathematical expression: {expression}"))
}

fn tokenize(expression: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = expression.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            c if c.is_whitespace() => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                if chars.get(i + 1) == Some(&'*') {
                    return Err(exponent_error());
                }
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LeftParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RightParen);
                i += 1;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let number: f64 = literal.parse().map_err(|_| invalid(expression))?;
                tokens.push(Token::Number(number));
            }
            _ => return Err(invalid(expression)),
        }
    }
    Ok(tokens)
}

/// Evaluate an expression over the restricted grammar.
///
/// Division by zero follows IEEE 754 (infinity or NaN) instead of
/// failing; the result is rendered as-is.
fn evaluate(expression: &str) -> Result<f64> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        expression,
    };
    let value = parser.expr()?;
    if parser.pos != tokens.len() {
        return Err(invalid(expression));
    }
    Ok(value)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    expression: &'a str,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<f64> {
        let mut value = self.term(true)?;
        while let Some(token) = self.peek() {
            match token {
                Token::Plus => {
                    self.pos += 1;
                    value += self.term(false)?;
                }
                Token::Minus => {
                    self.pos += 1;
                    value -= self.term(false)?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    // term := factor (('*' | '/') factor)*
    fn term(&mut self, leading_sign: bool) -> Result<f64> {
        let mut value = self.factor(leading_sign)?;
        while let Some(token) = self.peek() {
            match token {
                Token::Star => {
                    self.pos += 1;
                    value *= self.factor(false)?;
                }
                Token::Slash => {
                    self.pos += 1;
                    value /= self.factor(false)?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    // factor := NUMBER | '(' expr ')' | sign factor
    //
    // A sign is only legal where an expression opens, which is what
    // makes `1 ++ 2` a parse error instead of `1 + (+2)`.
    fn factor(&mut self, allow_sign: bool) -> Result<f64> {
        match self.advance() {
            Some(Token::Number(value)) => Ok(value),
            Some(Token::LeftParen) => {
                let value = self.expr()?;
                match self.advance() {
                    Some(Token::RightParen) => Ok(value),
                    _ => Err(invalid(self.expression)),
                }
            }
            Some(Token::Plus) if allow_sign => self.factor(false),
            Some(Token::Minus) if allow_sign => Ok(-self.factor(false)?),
            _ => Err(invalid(self.expression)),
        }
    }
}
