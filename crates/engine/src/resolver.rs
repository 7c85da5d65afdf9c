// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency resolution: requested jobs to an ordered run list.
//!
//! The graph has three kinds of edges: `depends` (must run and pass),
//! `after` (must run first, any outcome) and the implicit edge from each
//! resource expression to the resource job its name binds to. A depth-first
//! walk in request order yields a run list where every prerequisite comes
//! before the jobs that need it; a back edge aborts with the shortest cycle
//! through the offending job.

use ck_core::{JobDefinition, JobId, UnitStore};
use ck_expr::{bind_resource, ParseError, ResourceProgram};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// `depends`
    Direct,
    /// `after`
    Ordering,
    /// A `requires` expression reading the job's records.
    Resource,
}

ck_core::simple_display! {
    DependencyKind {
        Direct => "direct",
        Ordering => "ordering",
        Resource => "resource",
    }
}

/// A dependency cycle, first job repeated at the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclePath(pub Vec<JobId>);

impl fmt::Display for CyclePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            f.write_str(id.as_str())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("unknown job: {0}")]
    UnknownJob(JobId),
    #[error("job {job} has a {kind} dependency on unknown job {missing}")]
    MissingDependency { job: JobId, missing: JobId, kind: DependencyKind },
    #[error("dependency cycle: {path}")]
    Cycle { path: CyclePath },
    #[error("duplicate job definition: {0}")]
    DuplicateJob(JobId),
    #[error("job {job}: bad resource expression {text:?}: {error}")]
    BadExpression { job: JobId, text: String, error: ParseError },
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Resolves job lists against one unit store.
pub struct DependencyResolver<'a> {
    units: &'a UnitStore,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(units: &'a UnitStore) -> Self {
        Self { units }
    }

    /// Order `requested` and everything it needs into a run list.
    ///
    /// Duplicates in `requested` are ignored. Nothing is returned on error,
    /// so a cycle never produces a partial run list.
    pub fn resolve(&self, requested: &[JobId]) -> Result<Vec<JobId>, ResolveError> {
        let mut marks: HashMap<JobId, Mark> = HashMap::new();
        let mut order = Vec::new();
        for id in requested {
            let job = self.units.job(id).ok_or_else(|| ResolveError::UnknownJob(id.clone()))?;
            self.visit(job, &mut marks, &mut order)?;
        }
        debug!(requested = requested.len(), resolved = order.len(), "resolved run list");
        Ok(order)
    }

    fn visit(
        &self,
        job: &JobDefinition,
        marks: &mut HashMap<JobId, Mark>,
        order: &mut Vec<JobId>,
    ) -> Result<(), ResolveError> {
        match marks.get(&job.id) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                return Err(ResolveError::Cycle { path: self.shortest_cycle(&job.id) });
            }
            None => {}
        }
        marks.insert(job.id.clone(), Mark::Visiting);
        for (dep, _) in self.prerequisites(job)? {
            // prerequisites() only returns ids the store knows
            if let Some(dep_job) = self.units.job(&dep) {
                self.visit(dep_job, marks, order)?;
            }
        }
        marks.insert(job.id.clone(), Mark::Done);
        order.push(job.id.clone());
        Ok(())
    }

    /// Direct prerequisites of `job`, in declaration order: `depends`,
    /// then `after`, then bound resource jobs.
    pub fn prerequisites(&self, job: &JobDefinition) -> Result<Vec<(JobId, DependencyKind)>, ResolveError> {
        let mut out: Vec<(JobId, DependencyKind)> = Vec::new();
        let mut push = |id: JobId, kind: DependencyKind| {
            if !self.units.contains(&id) {
                return Err(ResolveError::MissingDependency { job: job.id.clone(), missing: id, kind });
            }
            if !out.iter().any(|(seen, _)| *seen == id) {
                out.push((id, kind));
            }
            Ok(())
        };
        for dep in &job.depends {
            push(dep.clone(), DependencyKind::Direct)?;
        }
        for dep in &job.after {
            push(dep.clone(), DependencyKind::Ordering)?;
        }
        let program = ResourceProgram::for_job(job).map_err(|e| ResolveError::BadExpression {
            job: job.id.clone(),
            text: e.text,
            error: e.source,
        })?;
        for name in program.resource_names() {
            match bind_resource(job, name, |id| self.units.contains(id)) {
                Some(resource) => push(resource, DependencyKind::Resource)?,
                None => debug!(job = %job.id, resource = name, "resource name not bound to a job"),
            }
        }
        Ok(out)
    }

    /// Shortest cycle through `start`, found breadth-first over prerequisite edges.
    fn shortest_cycle(&self, start: &JobId) -> CyclePath {
        let mut parent: HashMap<JobId, JobId> = HashMap::new();
        let mut seen: HashSet<JobId> = HashSet::new();
        let mut queue = VecDeque::from([start.clone()]);
        while let Some(current) = queue.pop_front() {
            let Some(job) = self.units.job(&current) else { continue };
            let deps = self.prerequisites(job).unwrap_or_default();
            for (dep, _) in deps {
                if dep == *start {
                    let mut path = vec![current.clone()];
                    let mut cursor = &current;
                    while let Some(prev) = parent.get(cursor) {
                        path.push(prev.clone());
                        cursor = prev;
                    }
                    path.reverse();
                    if path.first() != Some(start) {
                        path.insert(0, start.clone());
                    }
                    path.push(start.clone());
                    return CyclePath(path);
                }
                if seen.insert(dep.clone()) {
                    parent.insert(dep.clone(), current.clone());
                    queue.push_back(dep);
                }
            }
        }
        CyclePath(vec![start.clone(), start.clone()])
    }
}

/// Resolve `requested` against `units`.
pub fn resolve(requested: &[JobId], units: &UnitStore) -> Result<Vec<JobId>, ResolveError> {
    DependencyResolver::new(units).resolve(requested)
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
