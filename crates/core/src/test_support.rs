// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::job::{JobDefinition, JobId, Plugin};
use crate::result::{IoLogRecord, IoStream, JobState, Outcome};
use crate::unit::UnitStore;

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for job graphs.
pub mod strategies {
    use super::*;
    use proptest::prelude::*;

    /// An acyclic job graph: job `i` may only depend on jobs with a lower
    /// index, and the returned request order is a permutation of all ids.
    pub fn arb_dag(max_jobs: usize) -> impl Strategy<Value = (Vec<JobDefinition>, Vec<JobId>)> {
        (1..=max_jobs)
            .prop_flat_map(|n| {
                let deps = (0..n)
                    .map(|i| proptest::collection::vec(any::<bool>(), i))
                    .collect::<Vec<_>>();
                (deps, Just((0..n).collect::<Vec<_>>()).prop_shuffle())
            })
            .prop_map(|(deps, order)| {
                let jobs: Vec<JobDefinition> = deps
                    .iter()
                    .enumerate()
                    .map(|(i, edges)| {
                        let depends = edges
                            .iter()
                            .enumerate()
                            .filter(|(_, on)| **on)
                            .map(|(j, _)| job_id(j))
                            .collect();
                        JobDefinition::builder().id(job_id(i)).depends(depends).build()
                    })
                    .collect();
                let requested = order.into_iter().map(job_id).collect();
                (jobs, requested)
            })
    }

    fn job_id(i: usize) -> JobId {
        JobId::new(format!("gen::job-{i}"))
    }
}

// ── Factories ───────────────────────────────────────────────────────────────

pub fn shell_job(id: &str, command: &str) -> JobDefinition {
    JobDefinition::builder().id(id).command(Some(command.to_string())).build()
}

pub fn resource_job(id: &str, command: &str) -> JobDefinition {
    JobDefinition::builder()
        .id(id)
        .plugin(Plugin::Resource)
        .command(Some(command.to_string()))
        .build()
}

pub fn manual_job(id: &str) -> JobDefinition {
    JobDefinition::builder().id(id).plugin(Plugin::Manual).command(None).build()
}

/// Store holding the given jobs; panics on duplicates.
pub fn store_of(jobs: impl IntoIterator<Item = JobDefinition>) -> UnitStore {
    let mut store = UnitStore::default();
    for job in jobs {
        if let Err(e) = store.add_job(job) {
            panic!("test store: {e}");
        }
    }
    store
}

/// Passing result whose stdout is `text`.
pub fn passing_with_stdout(text: &str) -> JobState {
    JobState {
        outcome: Outcome::Pass,
        return_code: Some(0),
        io_log: vec![IoLogRecord { delay: 0.0, stream: IoStream::Stdout, data: text.as_bytes().to_vec() }],
        ..JobState::default()
    }
}
