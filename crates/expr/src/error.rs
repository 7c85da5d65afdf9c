// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the expression lexer and parser.

use crate::token::{context_snippet, Span, TokenKind};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexerError {
    #[error("unexpected character '{ch}' at position {}", span.start)]
    UnexpectedChar { ch: char, span: Span },

    #[error("unterminated string at position {}", span.start)]
    UnterminatedString { span: Span },

    #[error("invalid number '{text}' at position {}", span.start)]
    InvalidNumber { text: String, span: Span },
}

impl LexerError {
    pub fn span(&self) -> Span {
        match self {
            LexerError::UnexpectedChar { span, .. }
            | LexerError::UnterminatedString { span }
            | LexerError::InvalidNumber { span, .. } => *span,
        }
    }
}

/// Errors raised while parsing a resource expression.
///
/// Use [`ParseError::context`] for a snippet pointing at the problem.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("lexer error: {0}")]
    Lexer(#[from] LexerError),

    #[error("unexpected {found} at position {}, expected {expected}", span.start)]
    UnexpectedToken { found: TokenKind, expected: String, span: Span },

    #[error("unexpected end of expression, expected {expected}")]
    UnexpectedEof { expected: String },

    #[error("'{name}' is not a resource field; write {name}.<field>")]
    BareName { name: String, span: Span },

    #[error("function '{name}' is not allowed (allowed: len, int, float, bool)")]
    UnknownFunction { name: String, span: Span },

    #[error("expression refers to resources '{first}' and '{second}'; only one resource per expression")]
    MultipleResources { first: String, second: String, span: Span },

    #[error("expression does not refer to any resource")]
    NoResource,
}

impl ParseError {
    pub fn span(&self) -> Option<Span> {
        match self {
            ParseError::Lexer(e) => Some(e.span()),
            ParseError::UnexpectedToken { span, .. }
            | ParseError::BareName { span, .. }
            | ParseError::UnknownFunction { span, .. }
            | ParseError::MultipleResources { span, .. } => Some(*span),
            ParseError::UnexpectedEof { .. } | ParseError::NoResource => None,
        }
    }

    /// Snippet of `input` with carets under the error, or `None` if the error has no span.
    pub fn context(&self, input: &str) -> Option<String> {
        Some(context_snippet(input, self.span()?))
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
