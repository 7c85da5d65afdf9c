// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource expressions and the per-job requirement program.

use crate::ast::Expr;
use crate::error::ParseError;
use crate::eval::eval;
use crate::parser::Parser;
use ck_core::{JobDefinition, JobId, Resource};
use thiserror::Error;

/// A parsed expression bound to the single resource it reads.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceExpression {
    text: String,
    resource: String,
    expr: Expr,
}

impl ResourceExpression {
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let expr = Parser::parse(text)?;
        let mut resource: Option<&str> = None;
        let mut conflict = None;
        expr.for_each_field(&mut |name, _, span| match resource {
            None => resource = Some(name),
            Some(first) if first != name && conflict.is_none() => {
                conflict = Some(ParseError::MultipleResources {
                    first: first.to_string(),
                    second: name.to_string(),
                    span,
                });
            }
            Some(_) => {}
        });
        if let Some(err) = conflict {
            return Err(err);
        }
        let resource = resource.ok_or(ParseError::NoResource)?.to_string();
        Ok(Self { text: text.to_string(), resource, expr })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Name of the resource the expression reads (`package` in `package.name`).
    pub fn resource_name(&self) -> &str {
        &self.resource
    }

    /// True when any record satisfies the expression; false for no records.
    pub fn evaluate(&self, records: &[Resource]) -> bool {
        records.iter().any(|record| eval(&self.expr, record).truthy())
    }
}

/// Parse and evaluate in one step.
pub fn evaluate(expression: &str, records: &[Resource]) -> Result<bool, ParseError> {
    Ok(ResourceExpression::parse(expression)?.evaluate(records))
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("bad resource expression {text:?}: {source}")]
pub struct ExpressionError {
    pub text: String,
    #[source]
    pub source: ParseError,
}

/// All requirement lines of one job; the job may run when every line holds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourceProgram {
    expressions: Vec<ResourceExpression>,
}

impl ResourceProgram {
    pub fn for_job(job: &JobDefinition) -> Result<Self, ExpressionError> {
        Self::parse(job.requirement_lines())
    }

    pub fn parse<'a>(lines: impl IntoIterator<Item = &'a str>) -> Result<Self, ExpressionError> {
        let expressions = lines
            .into_iter()
            .map(|text| {
                ResourceExpression::parse(text)
                    .map_err(|source| ExpressionError { text: text.to_string(), source })
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { expressions })
    }

    pub fn expressions(&self) -> &[ResourceExpression] {
        &self.expressions
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }

    /// Distinct resource names referenced, in first-use order.
    pub fn resource_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for expr in &self.expressions {
            if !names.contains(&expr.resource_name()) {
                names.push(expr.resource_name());
            }
        }
        names
    }
}

/// Map the resource name used in `job`'s expressions to the producing job.
///
/// Tries, in order: the job's `imports` aliases, `namespace::name` in the
/// job's own namespace, then `name` as a full id. `exists` reports whether
/// a job id is known. Unbindable names return `None`.
pub fn bind_resource(job: &JobDefinition, name: &str, exists: impl Fn(&str) -> bool) -> Option<JobId> {
    if let Some(import) = job.imports.iter().find(|i| i.alias == name) {
        return Some(import.id.clone());
    }
    if let Some(ns) = job.id.namespace() {
        let qualified = format!("{ns}::{name}");
        if exists(&qualified) {
            return Some(JobId::new(qualified));
        }
    }
    if exists(name) {
        return Some(JobId::new(name));
    }
    None
}

#[cfg(test)]
#[path = "program_tests.rs"]
mod tests;
