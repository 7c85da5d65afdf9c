// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Syntax tree for resource expressions.

use crate::token::Span;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Or(Vec<Expr>),
    And(Vec<Expr>),
    Not(Box<Expr>),
    /// `a < b <= c` holds when every adjacent pair holds.
    Compare { first: Box<Expr>, rest: Vec<(CmpOp, Expr)> },
    Literal(Literal),
    /// `resource.field`
    Field { resource: String, field: String, span: Span },
    Call { func: Func, arg: Box<Expr> },
    List(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

/// Functions callable from an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Len,
    Int,
    Float,
    Bool,
}

impl Func {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "len" => Func::Len,
            "int" => Func::Int,
            "float" => Func::Float,
            "bool" => Func::Bool,
            _ => return None,
        })
    }
}

impl Expr {
    /// Visit every `resource.field` access in source order.
    pub fn for_each_field<'a>(&'a self, f: &mut impl FnMut(&'a str, &'a str, Span)) {
        match self {
            Expr::Or(items) | Expr::And(items) | Expr::List(items) => {
                items.iter().for_each(|e| e.for_each_field(f));
            }
            Expr::Not(inner) | Expr::Call { arg: inner, .. } => inner.for_each_field(f),
            Expr::Compare { first, rest } => {
                first.for_each_field(f);
                rest.iter().for_each(|(_, e)| e.for_each_field(f));
            }
            Expr::Field { resource, field, span } => f(resource, field, *span),
            Expr::Literal(_) => {}
        }
    }
}
