// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Asking the operator for the outcome of manual jobs, and which failed
//! jobs to run again.

use async_trait::async_trait;
use ck_core::{JobDefinition, JobId, Outcome};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};

use crate::color;

/// Source of verdicts for jobs awaiting verification.
#[async_trait]
pub trait Verifier: Send {
    /// `None` when the operator is gone (end of input).
    async fn verify(&mut self, job: &JobDefinition) -> Option<(Outcome, Option<String>)>;

    /// Jobs to run again once the session is done. Empty ends the session.
    async fn choose_rerun(&mut self, _candidates: &[JobId]) -> Vec<JobId> {
        Vec::new()
    }
}

/// Operator answer to the verdict prompt.
pub fn parse_answer(answer: &str) -> Option<Outcome> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "p" | "y" | "yes" => Some(Outcome::Pass),
        "f" | "n" | "no" => Some(Outcome::Fail),
        "s" => Some(Outcome::Skip),
        other => Outcome::parse(other).filter(Outcome::is_terminal),
    }
}

/// Operator answer to the rerun prompt: `a`/`all`, or job ids and
/// 1-based positions separated by spaces or commas.
pub fn parse_rerun(answer: &str, candidates: &[JobId]) -> Result<Vec<JobId>, String> {
    let answer = answer.trim();
    if matches!(answer.to_ascii_lowercase().as_str(), "a" | "all") {
        return Ok(candidates.to_vec());
    }
    let mut chosen = Vec::new();
    for word in answer.split(|c: char| c == ',' || c.is_whitespace()).filter(|w| !w.is_empty()) {
        let id = match word.parse::<usize>() {
            Ok(n) => n.checked_sub(1).and_then(|i| candidates.get(i)),
            Err(_) => candidates.iter().find(|c| c.as_str() == word),
        };
        match id {
            Some(id) if !chosen.contains(id) => chosen.push(id.clone()),
            Some(_) => {}
            None => return Err(format!("not a rerun candidate: {word:?}")),
        }
    }
    Ok(chosen)
}

/// Prompts on stderr and reads answers line by line.
pub struct LineVerifier<R> {
    input: R,
}

impl LineVerifier<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self { input: BufReader::new(tokio::io::stdin()) }
    }
}

impl<R: AsyncBufRead + Unpin + Send> LineVerifier<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }

    async fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.input.read_line(&mut line).await {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end().to_string()),
        }
    }
}

fn describe(job: &JobDefinition) {
    eprintln!();
    eprintln!("{}", color::header(&format!("── {} ──", job.id)));
    for (label, text) in
        [("Summary", &job.summary), ("Purpose", &job.purpose), ("Steps", &job.steps), ("Verify", &job.verification)]
    {
        if let Some(text) = text {
            eprintln!("{}: {}", color::context(label), text.trim());
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> Verifier for LineVerifier<R> {
    async fn verify(&mut self, job: &JobDefinition) -> Option<(Outcome, Option<String>)> {
        describe(job);
        let outcome = loop {
            eprint!("Outcome? [p]ass / [f]ail / [s]kip: ");
            let answer = self.read_line().await?;
            match parse_answer(&answer) {
                Some(outcome) => break outcome,
                None => eprintln!("not an outcome: {answer:?}"),
            }
        };
        eprint!("Comment (optional): ");
        let comment = self.read_line().await.filter(|c| !c.is_empty());
        Some((outcome, comment))
    }

    async fn choose_rerun(&mut self, candidates: &[JobId]) -> Vec<JobId> {
        eprintln!();
        eprintln!("{}", color::header("Jobs that did not pass"));
        for (i, id) in candidates.iter().enumerate() {
            eprintln!("{:>3}. {id}", i + 1);
        }
        loop {
            eprint!("Rerun? [a]ll / numbers or ids / enter to finish: ");
            let Some(answer) = self.read_line().await else { return Vec::new() };
            match parse_rerun(&answer, candidates) {
                Ok(chosen) => return chosen,
                Err(e) => eprintln!("{e}"),
            }
        }
    }
}

#[cfg(test)]
#[path = "prompt_tests.rs"]
mod tests;
