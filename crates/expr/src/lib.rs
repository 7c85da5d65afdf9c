// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ck-expr: resource expressions
//!
//! A small boolean language over resource records, e.g.
//! `package.name == 'fwts' and int(package.version) >= 2`. Expressions are
//! lexed and parsed into an [`ast::Expr`] and evaluated without executing
//! any host code.

pub mod ast;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod program;
pub mod token;

pub use error::{LexerError, ParseError};
pub use eval::Value;
pub use program::{bind_resource, evaluate, ExpressionError, ResourceExpression, ResourceProgram};
pub use token::Span;
