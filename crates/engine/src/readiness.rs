// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-job readiness: what keeps a job from running right now.

use ck_core::{JobDefinition, JobId, Outcome, SessionState, UnitStore};
use ck_expr::{bind_resource, ExpressionError, ResourceProgram};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InhibitorCause {
    /// A `depends` job has not run yet.
    PendingDep,
    /// A `depends` job ran and did not pass.
    FailedDep,
    /// An `after` job has not run yet.
    PendingOrderingDep,
    /// The resource job behind an expression has not run yet.
    PendingResource,
    /// An expression evaluated false.
    FailedResource,
}

ck_core::simple_display! {
    InhibitorCause {
        PendingDep => "pending-dep",
        FailedDep => "failed-dep",
        PendingOrderingDep => "pending-ordering-dep",
        PendingResource => "pending-resource",
        FailedResource => "failed-resource",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inhibitor {
    pub cause: InhibitorCause,
    pub related_job: Option<JobId>,
    pub expression: Option<String>,
}

/// What the assistant does with a job about to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    /// Record `skip` with this comment.
    Skip(String),
    /// Record `not-supported`; the failing expression is the comment.
    NotSupported(String),
}

/// Everything currently inhibiting `job`, in declaration order.
pub fn inhibitors(
    job: &JobDefinition,
    state: &SessionState,
    units: &UnitStore,
) -> Result<Vec<Inhibitor>, ExpressionError> {
    let mut out = Vec::new();
    let dep = |cause, id: &JobId| Inhibitor { cause, related_job: Some(id.clone()), expression: None };

    for id in &job.depends {
        match state.outcome(id) {
            Outcome::Undecided => out.push(dep(InhibitorCause::PendingDep, id)),
            Outcome::Pass => {}
            _ => out.push(dep(InhibitorCause::FailedDep, id)),
        }
    }
    for id in &job.after {
        if state.outcome(id) == Outcome::Undecided {
            out.push(dep(InhibitorCause::PendingOrderingDep, id));
        }
    }

    let program = ResourceProgram::for_job(job)?;
    for expr in program.expressions() {
        let bound = bind_resource(job, expr.resource_name(), |id| units.contains(id));
        if let Some(resource) = &bound {
            if state.outcome(resource) == Outcome::Undecided {
                out.push(Inhibitor {
                    cause: InhibitorCause::PendingResource,
                    related_job: bound.clone(),
                    expression: Some(expr.text().to_string()),
                });
                continue;
            }
        }
        let records = bound.as_ref().and_then(|id| state.resources(id)).unwrap_or_default();
        if !expr.evaluate(records) {
            out.push(Inhibitor {
                cause: InhibitorCause::FailedResource,
                related_job: bound,
                expression: Some(expr.text().to_string()),
            });
        }
    }
    Ok(out)
}

/// Decide whether `job` runs.
///
/// A failed direct dependency wins over a false requirement. A dependency
/// that never ran means it was left out of the run list; the job is skipped
/// rather than waiting forever. Pending ordering dependencies do not block.
pub fn readiness(job: &JobDefinition, state: &SessionState, units: &UnitStore) -> Result<Readiness, ExpressionError> {
    let found = inhibitors(job, state, units)?;
    let first = |cause: InhibitorCause| found.iter().find(|i| i.cause == cause);
    let related = |i: &Inhibitor| i.related_job.as_ref().map(JobId::as_str).unwrap_or("?").to_string();

    if let Some(i) = first(InhibitorCause::FailedDep) {
        return Ok(Readiness::Skip(format!("required dependency '{}' did not pass", related(i))));
    }
    if let Some(i) = first(InhibitorCause::PendingDep) {
        return Ok(Readiness::Skip(format!("required dependency '{}' did not run", related(i))));
    }
    if let Some(i) = first(InhibitorCause::PendingResource) {
        return Ok(Readiness::Skip(format!("resource job '{}' did not run", related(i))));
    }
    if let Some(i) = first(InhibitorCause::FailedResource) {
        return Ok(Readiness::NotSupported(i.expression.clone().unwrap_or_default()));
    }
    Ok(Readiness::Ready)
}

#[cfg(test)]
#[path = "readiness_tests.rs"]
mod tests;
