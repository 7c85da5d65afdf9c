// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Jobs created at runtime by the bootstrap phase.
//!
//! Two sources: `local` jobs print `[[job]]` tables on stdout, and template
//! units are instantiated once per record of their template resource.
//! Merging is idempotent, so a resumed session can rebuild the same store
//! from its checkpoint. A generated job that cannot be resolved (bad
//! expression, unknown prerequisite, cycle) is replaced by a failing
//! placeholder instead of failing the session.

use crate::resolver::{DependencyResolver, ResolveError};
use ck_core::{JobDefinition, JobId, Outcome, Plugin, SessionState, UnitFile, UnitStore};
use ck_expr::{ResourceExpression, ResourceProgram};
use std::path::Path;
use tracing::{debug, info, warn};

/// A generated definition that could not be used.
///
/// `job` is a placeholder carrying the offending id; it is recorded as
/// `fail` with `message` as the comment.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedFailure {
    pub job: JobDefinition,
    pub message: String,
}

/// Marks the placeholder standing in for a rejected generated job.
pub const FLAG_REJECTED: &str = "rejected";

impl GeneratedFailure {
    fn new(id: impl Into<JobId>, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut job = JobDefinition::new(id, Plugin::Shell);
        job.summary = Some(message.clone());
        job.flags.insert(FLAG_REJECTED.to_string());
        Self { job, message }
    }

    /// Rebuild the failure a previous merge left in the store.
    fn from_placeholder(job: &JobDefinition) -> Option<Self> {
        if !job.flags.contains(FLAG_REJECTED) {
            return None;
        }
        Some(Self::new(job.id.clone(), job.summary.clone().unwrap_or_default()))
    }
}

#[derive(Debug, Default)]
pub struct Generated {
    /// Ids of usable generated jobs, in generation order.
    pub jobs: Vec<JobId>,
    pub failures: Vec<GeneratedFailure>,
}

/// Merge everything the session's finished bootstrap jobs generated into `units`.
///
/// Malformed definitions become failures; a generated id clashing with a
/// different existing definition is a configuration error.
pub fn merge_generated(units: &mut UnitStore, state: &SessionState) -> Result<Generated, ResolveError> {
    let mut out = Generated::default();
    let mut candidates: Vec<JobDefinition> = Vec::new();

    let locals: Vec<JobId> = state
        .run_list
        .iter()
        .filter(|id| state.outcome(id) == Outcome::Pass)
        .filter(|id| units.job(id).is_some_and(|j| j.plugin == Plugin::Local))
        .cloned()
        .collect();
    for local in locals {
        let Some(result) = state.job_state(&local) else { continue };
        let text = String::from_utf8_lossy(&result.stdout()).into_owned();
        match UnitFile::parse(&text, Path::new(local.as_str())) {
            Ok(file) => {
                if !file.templates.is_empty() || !file.test_plans.is_empty() {
                    warn!(job = %local, "local job output may only define jobs; ignoring the rest");
                }
                candidates.extend(file.jobs);
            }
            Err(e) => {
                out.failures.push(GeneratedFailure::new(format!("{local}.invalid"), e.to_string()));
            }
        }
    }

    let templates: Vec<_> = units.templates().cloned().collect();
    for template in templates {
        let Some(records) = state.resources(&template.template_resource) else {
            debug!(template = %template.id, "template resource has no records");
            continue;
        };
        let filter = match template.template_filter.as_deref().map(ResourceExpression::parse).transpose() {
            Ok(filter) => filter,
            Err(e) => {
                out.failures.push(GeneratedFailure::new(
                    format!("{}[filter]", template.id),
                    format!("bad template filter: {e}"),
                ));
                continue;
            }
        };
        for (index, record) in records.iter().enumerate() {
            if filter.as_ref().is_some_and(|f| !f.evaluate(std::slice::from_ref(record))) {
                continue;
            }
            match template.instantiate(record) {
                Ok(job) => candidates.push(job),
                Err(e) => {
                    out.failures.push(GeneratedFailure::new(format!("{}[{index}]", template.id), e.to_string()));
                }
            }
        }
    }

    for job in admit(units, candidates, &mut out.failures)? {
        let id = job.id.clone();
        if units.add_job(job).is_err() {
            return Err(ResolveError::DuplicateJob(id));
        }
        if !out.jobs.contains(&id) {
            out.jobs.push(id);
        }
    }

    for failure in &out.failures {
        warn!(job = %failure.job.id, error = %failure.message, "generated job rejected");
        if units.add_job(failure.job.clone()).is_err() {
            return Err(ResolveError::DuplicateJob(failure.job.id.clone()));
        }
    }
    if !out.jobs.is_empty() {
        info!(jobs = out.jobs.len(), failures = out.failures.len(), "merged generated jobs");
    }
    Ok(out)
}

/// Keep the candidates that resolve against the store plus each other.
///
/// Resolution runs on a scratch copy where every rejected job is swapped for
/// its placeholder, so jobs depending on a rejected one still resolve and
/// are skipped at run time.
fn admit(
    units: &UnitStore,
    candidates: Vec<JobDefinition>,
    failures: &mut Vec<GeneratedFailure>,
) -> Result<Vec<JobDefinition>, ResolveError> {
    let mut scratch = units.clone();
    let mut admitted = Vec::new();
    for job in candidates {
        if let Err(e) = ResourceProgram::for_job(&job) {
            let message = format!("bad resource expression {:?}: {}", e.text, e.source);
            let failure = GeneratedFailure::new(job.id, message);
            scratch.replace_job(failure.job.clone());
            failures.push(failure);
            continue;
        }
        if let Some(existing) = units.job(&job.id) {
            if let Some(failure) = GeneratedFailure::from_placeholder(existing) {
                failures.push(failure);
                continue;
            }
        }
        if scratch.add_job(job.clone()).is_err() {
            return Err(ResolveError::DuplicateJob(job.id));
        }
        if !admitted.iter().any(|j: &JobDefinition| j.id == job.id) {
            admitted.push(job);
        }
    }

    let mut kept = Vec::new();
    for job in admitted {
        match DependencyResolver::new(&scratch).resolve(std::slice::from_ref(&job.id)) {
            Ok(_) => kept.push(job),
            Err(e) => {
                let failure = GeneratedFailure::new(job.id, e.to_string());
                scratch.replace_job(failure.job.clone());
                failures.push(failure);
            }
        }
    }
    Ok(kept)
}

#[cfg(test)]
#[path = "bootstrap_tests.rs"]
mod tests;
