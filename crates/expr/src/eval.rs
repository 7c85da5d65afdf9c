// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Evaluation of a parsed expression against one resource record.
//!
//! Missing fields evaluate to [`Value::Undefined`]. Any comparison that
//! involves `Undefined` is false, so an expression about a key the record
//! lacks simply does not match.

use crate::ast::{CmpOp, Expr, Func, Literal};
use ck_core::Resource;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Undefined,
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
}

impl Value {
    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_) | Value::Bool(_))
    }
}

/// Evaluate `expr` against one record.
pub fn eval(expr: &Expr, record: &Resource) -> Value {
    match expr {
        Expr::Or(items) => Value::Bool(items.iter().any(|e| eval(e, record).truthy())),
        Expr::And(items) => Value::Bool(items.iter().all(|e| eval(e, record).truthy())),
        Expr::Not(inner) => Value::Bool(!eval(inner, record).truthy()),
        Expr::Compare { first, rest } => {
            let mut left = eval(first, record);
            for (op, right) in rest {
                let right = eval(right, record);
                if !compare(*op, &left, &right) {
                    return Value::Bool(false);
                }
                left = right;
            }
            Value::Bool(true)
        }
        Expr::Literal(lit) => match lit {
            Literal::Str(s) => Value::Str(s.clone()),
            Literal::Int(i) => Value::Int(*i),
            Literal::Float(f) => Value::Float(*f),
            Literal::Bool(b) => Value::Bool(*b),
            Literal::None => Value::None,
        },
        Expr::Field { field, .. } => {
            record.get(field).map_or(Value::Undefined, |v| Value::Str(v.to_string()))
        }
        Expr::Call { func, arg } => call(*func, eval(arg, record)),
        Expr::List(items) => Value::List(items.iter().map(|e| eval(e, record)).collect()),
    }
}

fn call(func: Func, arg: Value) -> Value {
    match (func, arg) {
        (_, Value::Undefined) => Value::Undefined,
        (Func::Len, Value::Str(s)) => Value::Int(s.chars().count() as i64),
        (Func::Len, Value::List(items)) => Value::Int(items.len() as i64),
        (Func::Len, _) => Value::Undefined,
        (Func::Int, Value::Str(s)) => parse_int(s.trim()).map_or(Value::Undefined, Value::Int),
        (Func::Int, Value::Float(f)) => Value::Int(f.trunc() as i64),
        (Func::Int, Value::Int(i)) => Value::Int(i),
        (Func::Int, Value::Bool(b)) => Value::Int(i64::from(b)),
        (Func::Int, _) => Value::Undefined,
        (Func::Float, v) => v.as_number().map_or(Value::Undefined, Value::Float),
        (Func::Bool, v) => Value::Bool(v.truthy()),
    }
}

fn parse_int(s: &str) -> Option<i64> {
    match s.strip_prefix("0x") {
        Some(hex) => i64::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

fn compare(op: CmpOp, left: &Value, right: &Value) -> bool {
    if matches!(left, Value::Undefined) || matches!(right, Value::Undefined) {
        return false;
    }
    match op {
        CmpOp::Eq => equals(left, right),
        CmpOp::Ne => !equals(left, right),
        CmpOp::In => contains(right, left),
        CmpOp::NotIn => !contains(right, left),
        CmpOp::Lt => order(left, right) == Some(Ordering::Less),
        CmpOp::Le => matches!(order(left, right), Some(Ordering::Less | Ordering::Equal)),
        CmpOp::Gt => order(left, right) == Some(Ordering::Greater),
        CmpOp::Ge => matches!(order(left, right), Some(Ordering::Greater | Ordering::Equal)),
    }
}

fn equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::None, Value::None) => true,
        (Value::List(a), Value::List(b)) => a.len() == b.len() && a.iter().zip(b).all(|(x, y)| equals(x, y)),
        (a, b) if a.is_number() || b.is_number() => match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
        _ => false,
    }
}

fn order(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (a, b) if a.is_number() || b.is_number() => a.as_number()?.partial_cmp(&b.as_number()?),
        _ => None,
    }
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    match (haystack, needle) {
        (Value::List(items), needle) => items.iter().any(|item| equals(item, needle)),
        (Value::Str(hay), Value::Str(needle)) => hay.contains(needle.as_str()),
        _ => false,
    }
}

#[cfg(test)]
#[path = "eval_tests.rs"]
mod tests;
