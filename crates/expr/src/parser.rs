// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recursive-descent parser for resource expressions.
//!
//! Precedence, loosest first: `or`, `and`, `not`, comparisons (chained,
//! including `in` / `not in`), operands.

use crate::ast::{CmpOp, Expr, Func, Literal};
use crate::error::ParseError;
use crate::lexer::Lexer;
use crate::token::{Span, Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Parse a complete expression.
    pub fn parse(input: &str) -> Result<Expr, ParseError> {
        let tokens = Lexer::tokenize(input)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_or()?;
        if !parser.at_end() {
            return Err(parser.unexpected("end of expression"));
        }
        Ok(expr)
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn peek_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Span, ParseError> {
        match self.tokens.get(self.pos) {
            Some(token) if token.kind == kind => {
                self.pos += 1;
                Ok(token.span)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.tokens.get(self.pos) {
            Some(token) => ParseError::UnexpectedToken {
                found: token.kind.clone(),
                expected: expected.to_string(),
                span: token.span,
            },
            None => ParseError::UnexpectedEof { expected: expected.to_string() },
        }
    }

    /// Grammar: and_expr ('or' and_expr)*
    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut items = vec![self.parse_and()?];
        while self.eat(&TokenKind::Or) {
            items.push(self.parse_and()?);
        }
        Ok(if items.len() == 1 { items.remove(0) } else { Expr::Or(items) })
    }

    /// Grammar: not_expr ('and' not_expr)*
    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut items = vec![self.parse_not()?];
        while self.eat(&TokenKind::And) {
            items.push(self.parse_not()?);
        }
        Ok(if items.len() == 1 { items.remove(0) } else { Expr::And(items) })
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&TokenKind::Not) {
            return Ok(Expr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_operand()?;
        let mut rest = Vec::new();
        loop {
            let op = match self.peek() {
                Some(TokenKind::EqEq) => CmpOp::Eq,
                Some(TokenKind::NotEq) => CmpOp::Ne,
                Some(TokenKind::Lt) => CmpOp::Lt,
                Some(TokenKind::Le) => CmpOp::Le,
                Some(TokenKind::Gt) => CmpOp::Gt,
                Some(TokenKind::Ge) => CmpOp::Ge,
                Some(TokenKind::In) => CmpOp::In,
                Some(TokenKind::Not) if self.peek_at(1) == Some(&TokenKind::In) => {
                    self.pos += 1;
                    CmpOp::NotIn
                }
                _ => break,
            };
            self.pos += 1;
            rest.push((op, self.parse_operand()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare { first: Box::new(first), rest })
        }
    }

    fn parse_operand(&mut self) -> Result<Expr, ParseError> {
        let Some(token) = self.advance() else {
            return Err(ParseError::UnexpectedEof { expected: "an operand".to_string() });
        };
        Ok(match token.kind {
            TokenKind::Str(s) => Expr::Literal(Literal::Str(s)),
            TokenKind::Int(i) => Expr::Literal(Literal::Int(i)),
            TokenKind::Float(ref text) => match text.parse() {
                Ok(f) => Expr::Literal(Literal::Float(f)),
                Err(_) => {
                    return Err(ParseError::UnexpectedToken {
                        found: token.kind.clone(),
                        expected: "a number".to_string(),
                        span: token.span,
                    })
                }
            },
            TokenKind::True => Expr::Literal(Literal::Bool(true)),
            TokenKind::False => Expr::Literal(Literal::Bool(false)),
            TokenKind::None => Expr::Literal(Literal::None),
            TokenKind::LParen => {
                let inner = self.parse_or()?;
                self.expect(TokenKind::RParen, "')'")?;
                inner
            }
            TokenKind::LBracket => self.parse_list()?,
            TokenKind::Name(name) => self.parse_name(name, token.span)?,
            found => {
                return Err(ParseError::UnexpectedToken {
                    found,
                    expected: "an operand".to_string(),
                    span: token.span,
                })
            }
        })
    }

    /// The opening `[` is already consumed. A trailing comma is allowed.
    fn parse_list(&mut self) -> Result<Expr, ParseError> {
        let mut items = Vec::new();
        while !self.eat(&TokenKind::RBracket) {
            items.push(self.parse_or()?);
            if !self.eat(&TokenKind::Comma) {
                self.expect(TokenKind::RBracket, "',' or ']'")?;
                break;
            }
        }
        Ok(Expr::List(items))
    }

    fn parse_name(&mut self, name: String, span: Span) -> Result<Expr, ParseError> {
        if self.eat(&TokenKind::Dot) {
            return match self.advance() {
                Some(Token { kind: TokenKind::Name(field), span: field_span }) => {
                    Ok(Expr::Field { resource: name, field, span: span.merge(field_span) })
                }
                Some(Token { kind, span }) => Err(ParseError::UnexpectedToken {
                    found: kind,
                    expected: "a field name".to_string(),
                    span,
                }),
                None => Err(ParseError::UnexpectedEof { expected: "a field name".to_string() }),
            };
        }
        if self.eat(&TokenKind::LParen) {
            let func = Func::from_name(&name).ok_or(ParseError::UnknownFunction { name, span })?;
            let arg = self.parse_or()?;
            self.expect(TokenKind::RParen, "')'")?;
            return Ok(Expr::Call { func, arg: Box::new(arg) });
        }
        Err(ParseError::BareName { name, span })
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
