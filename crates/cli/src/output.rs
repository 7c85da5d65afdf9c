// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use ck_core::{JobId, JobState, Outcome, ResumeCandidate, SessionState};
use clap::ValueEnum;
use serde::Serialize;

use crate::color;

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Outcome counts over a session's run list.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct Tally {
    pub pass: usize,
    pub fail: usize,
    pub skip: usize,
    pub not_supported: usize,
    pub undecided: usize,
}

impl Tally {
    pub fn of(state: &SessionState) -> Self {
        let mut tally = Tally::default();
        for id in &state.run_list {
            match state.outcome(id) {
                Outcome::Pass => tally.pass += 1,
                Outcome::Fail => tally.fail += 1,
                Outcome::Skip => tally.skip += 1,
                Outcome::NotSupported => tally.not_supported += 1,
                Outcome::Undecided => tally.undecided += 1,
            }
        }
        tally
    }
}

/// One line per finished job: padded outcome, id, and the comment if any.
pub fn job_line(job_id: &JobId, state: &JobState) -> String {
    let label = format!("{:<13}", state.outcome.to_string());
    let label = label.replacen(&state.outcome.to_string(), &color::outcome(state.outcome), 1);
    match state.comments.as_deref().filter(|c| !c.is_empty()) {
        Some(comment) => format!("{label} {job_id}  {}", color::context(&format!("({comment})"))),
        None => format!("{label} {job_id}"),
    }
}

pub fn print_job(job_id: &JobId, state: &JobState, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => println!("{}", job_line(job_id, state)),
        OutputFormat::Json => {
            let line = serde_json::json!({ "job": job_id, "outcome": state.outcome, "comments": state.comments });
            println!("{}", serde_json::to_string(&line)?);
        }
    }
    Ok(())
}

pub fn summary_line(tally: &Tally) -> String {
    let mut line = format!("{} passed, {} failed, {} skipped", tally.pass, tally.fail, tally.skip);
    if tally.not_supported > 0 {
        line.push_str(&format!(", {} not supported", tally.not_supported));
    }
    if tally.undecided > 0 {
        line.push_str(&format!(", {} not run", tally.undecided));
    }
    line
}

pub fn print_summary(state: &SessionState, format: OutputFormat) -> anyhow::Result<Tally> {
    let tally = Tally::of(state);
    match format {
        OutputFormat::Text => {
            println!();
            println!("{} {}", color::header(&format!("Session {}:", state.id)), summary_line(&tally));
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({ "session": state.id, "tally": tally });
            println!("{}", serde_json::to_string(&obj)?);
        }
    }
    Ok(tally)
}

pub fn print_sessions(sessions: &[ResumeCandidate], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            if sessions.is_empty() {
                println!("No resumable sessions");
                return Ok(());
            }
            let width = sessions.iter().map(|s| s.session_id.len()).max().unwrap_or(0).max("SESSION".len());
            println!("{:<width$} {:<24} RUNNING", "SESSION", "TITLE");
            for s in sessions {
                println!(
                    "{:<width$} {:<24} {}",
                    s.session_id,
                    s.metadata.title.as_deref().unwrap_or("-"),
                    s.metadata.running_job_id.as_ref().map(|j| j.as_str()).unwrap_or("-"),
                );
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(sessions)?),
    }
    Ok(())
}
