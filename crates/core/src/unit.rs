// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The unit store: jobs, templates and test plans loaded from provider files.
//!
//! Provider files are TOML documents holding `[[job]]`, `[[template]]` and
//! `[[test_plan]]` tables. The store is an explicit value handed to the
//! resolver and the session assistant; there is no global registry.

use crate::job::{JobDefinition, JobId};
use crate::resource::Resource;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UnitError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid unit file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("duplicate job id: {0}")]
    DuplicateJob(JobId),
    #[error("duplicate template id: {0}")]
    DuplicateTemplate(String),
    #[error("duplicate test plan id: {0}")]
    DuplicateTestPlan(String),
    #[error("unknown test plan: {0}")]
    UnknownTestPlan(String),
    #[error("invalid pattern {pattern:?} in test plan {plan}: {message}")]
    BadPattern { plan: String, pattern: String, message: String },
    #[error("cannot instantiate template {template}: {message}")]
    Template { template: String, message: String },
}

/// Job factory instantiated once per record of its template resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateUnit {
    pub id: String,
    /// Resource job whose records drive instantiation.
    pub template_resource: JobId,
    /// Resource expression selecting which records instantiate a job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_filter: Option<String>,
    /// Job fields; strings may contain `{field}` placeholders. `{{` and `}}`
    /// stand for literal braces.
    pub job: toml::Table,
}

impl TemplateUnit {
    /// Produce the job definition for one resource record.
    pub fn instantiate(&self, record: &Resource) -> Result<JobDefinition, UnitError> {
        let value = substitute_value(toml::Value::Table(self.job.clone()), record)
            .map_err(|message| UnitError::Template { template: self.id.clone(), message })?;
        value.try_into().map_err(|e: toml::de::Error| UnitError::Template {
            template: self.id.clone(),
            message: e.message().to_string(),
        })
    }
}

fn substitute_value(value: toml::Value, record: &Resource) -> Result<toml::Value, String> {
    Ok(match value {
        toml::Value::String(s) => toml::Value::String(substitute(&s, record)?),
        toml::Value::Array(items) => toml::Value::Array(
            items.into_iter().map(|v| substitute_value(v, record)).collect::<Result<_, _>>()?,
        ),
        toml::Value::Table(table) => toml::Value::Table(
            table
                .into_iter()
                .map(|(k, v)| Ok((k, substitute_value(v, record)?)))
                .collect::<Result<_, String>>()?,
        ),
        other => other,
    })
}

/// Replace `{field}` placeholders with values from the record.
pub fn substitute(text: &str, record: &Resource) -> Result<String, String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => name.push(c),
                        None => return Err(format!("unterminated placeholder in {text:?}")),
                    }
                }
                let value = record
                    .get(name.trim())
                    .ok_or_else(|| format!("record has no field {:?}", name.trim()))?;
                out.push_str(value);
            }
            '}' => return Err(format!("unmatched '}}' in {text:?}")),
            c => out.push(c),
        }
    }
    Ok(out)
}

/// Named selection of jobs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TestPlan {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Jobs run during the bootstrap phase, before the main selection.
    #[serde(default)]
    pub bootstrap_include: Vec<String>,
    /// Always selected; exclusion does not apply.
    #[serde(default)]
    pub mandatory_include: Vec<String>,
}

/// Contents of one provider file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitFile {
    #[serde(default, rename = "job")]
    pub jobs: Vec<JobDefinition>,
    #[serde(default, rename = "template")]
    pub templates: Vec<TemplateUnit>,
    #[serde(default, rename = "test_plan")]
    pub test_plans: Vec<TestPlan>,
}

impl UnitFile {
    pub fn parse(text: &str, path: &Path) -> Result<Self, UnitError> {
        toml::from_str(text).map_err(|source| UnitError::Parse { path: path.to_path_buf(), source })
    }
}

#[derive(Debug, Clone, Default)]
pub struct UnitStore {
    jobs: IndexMap<JobId, JobDefinition>,
    templates: IndexMap<String, TemplateUnit>,
    test_plans: IndexMap<String, TestPlan>,
}

impl UnitStore {
    /// Load every `*.toml` file of a provider directory, in file name order.
    pub fn load_dir(dir: &Path) -> Result<Self, UnitError> {
        let io_err = |source| UnitError::Io { path: dir.to_path_buf(), source };
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(io_err)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        paths.sort();

        let mut store = Self::default();
        for path in paths {
            let text = std::fs::read_to_string(&path)
                .map_err(|source| UnitError::Io { path: path.clone(), source })?;
            store.add_file(UnitFile::parse(&text, &path)?)?;
        }
        tracing::debug!(dir = %dir.display(), jobs = store.jobs.len(), "loaded units");
        Ok(store)
    }

    pub fn add_file(&mut self, file: UnitFile) -> Result<(), UnitError> {
        for job in file.jobs {
            self.add_job(job)?;
        }
        for template in file.templates {
            if self.templates.contains_key(&template.id) {
                return Err(UnitError::DuplicateTemplate(template.id));
            }
            self.templates.insert(template.id.clone(), template);
        }
        for plan in file.test_plans {
            if self.test_plans.contains_key(&plan.id) {
                return Err(UnitError::DuplicateTestPlan(plan.id));
            }
            self.test_plans.insert(plan.id.clone(), plan);
        }
        Ok(())
    }

    /// Add a job. Re-adding an identical definition is a no-op.
    pub fn add_job(&mut self, job: JobDefinition) -> Result<(), UnitError> {
        match self.jobs.get(&job.id) {
            Some(existing) if existing.checksum() == job.checksum() => Ok(()),
            Some(_) => Err(UnitError::DuplicateJob(job.id)),
            None => {
                self.jobs.insert(job.id.clone(), job);
                Ok(())
            }
        }
    }

    /// Insert `job`, overwriting any definition with the same id.
    pub fn replace_job(&mut self, job: JobDefinition) {
        self.jobs.insert(job.id.clone(), job);
    }

    pub fn job(&self, id: &str) -> Option<&JobDefinition> {
        self.jobs.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.jobs.contains_key(id)
    }

    /// Jobs in load order.
    pub fn jobs(&self) -> impl Iterator<Item = &JobDefinition> {
        self.jobs.values()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn templates(&self) -> impl Iterator<Item = &TemplateUnit> {
        self.templates.values()
    }

    pub fn test_plan(&self, id: &str) -> Result<&TestPlan, UnitError> {
        self.test_plans.get(id).ok_or_else(|| UnitError::UnknownTestPlan(id.to_string()))
    }

    pub fn test_plans(&self) -> impl Iterator<Item = &TestPlan> {
        self.test_plans.values()
    }

    /// Jobs of the plan's bootstrap phase.
    pub fn bootstrap_jobs(&self, plan: &TestPlan) -> Result<Vec<JobId>, UnitError> {
        let mut out = Vec::new();
        self.collect(plan, &plan.bootstrap_include, &mut out)?;
        Ok(out)
    }

    /// Jobs selected by the plan for the main phase.
    ///
    /// Mandatory jobs come first, then `include` matches in pattern order
    /// (store order within a pattern). `exclude` drops included jobs but not
    /// mandatory ones. Bootstrap jobs are never part of the main selection.
    pub fn select_jobs(&self, plan: &TestPlan) -> Result<Vec<JobId>, UnitError> {
        let bootstrap = self.bootstrap_jobs(plan)?;
        let mut mandatory = Vec::new();
        self.collect(plan, &plan.mandatory_include, &mut mandatory)?;
        let mut included = Vec::new();
        self.collect(plan, &plan.include, &mut included)?;

        let excludes = compile(plan, &plan.exclude)?;
        let mut out = mandatory;
        for id in included {
            if out.contains(&id) || bootstrap.contains(&id) {
                continue;
            }
            if excludes.iter().any(|p| p.matches(&id)) {
                continue;
            }
            out.push(id);
        }
        Ok(out)
    }

    fn collect(&self, plan: &TestPlan, patterns: &[String], out: &mut Vec<JobId>) -> Result<(), UnitError> {
        for pattern in compile(plan, patterns)? {
            for job in self.jobs.values() {
                if pattern.matches(&job.id) && !out.contains(&job.id) {
                    out.push(job.id.clone());
                }
            }
        }
        Ok(())
    }
}

/// A job id pattern; partial patterns are qualified with the plan's namespace.
struct IdPattern {
    full: glob::Pattern,
    qualified: Option<glob::Pattern>,
}

impl IdPattern {
    fn matches(&self, id: &str) -> bool {
        self.full.matches(id) || self.qualified.as_ref().is_some_and(|q| q.matches(id))
    }
}

fn compile(plan: &TestPlan, patterns: &[String]) -> Result<Vec<IdPattern>, UnitError> {
    let namespace = plan.id.split_once("::").map(|(ns, _)| ns);
    let bad = |pattern: &str, e: glob::PatternError| UnitError::BadPattern {
        plan: plan.id.clone(),
        pattern: pattern.to_string(),
        message: e.to_string(),
    };
    patterns
        .iter()
        .flat_map(|p| p.lines())
        .map(str::trim)
        .filter(|p| !p.is_empty() && !p.starts_with('#'))
        .map(|p| {
            let full = glob::Pattern::new(p).map_err(|e| bad(p, e))?;
            let qualified = match namespace {
                Some(ns) if !p.contains("::") => {
                    Some(glob::Pattern::new(&format!("{ns}::{p}")).map_err(|e| bad(p, e))?)
                }
                _ => None,
            };
            Ok(IdPattern { full, qualified })
        })
        .collect()
}

#[cfg(test)]
#[path = "unit_tests.rs"]
mod tests;
