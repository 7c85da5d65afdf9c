// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::job::Plugin;

const PROVIDER: &str = r#"
[[job]]
id = "ns::cpu/info"
plugin = "resource"
command = "cpuinfo"

[[job]]
id = "ns::cpu/stress"
plugin = "shell"
command = "stress --cpu 4"
depends = ["ns::cpu/info"]

[[job]]
id = "ns::cpu/slow"
plugin = "shell"
command = "sleep 600"

[[job]]
id = "ns::miscellanea/submit"
plugin = "shell"
command = "submit"

[[job]]
id = "ns::device"
plugin = "resource"
command = "udev_resource"

[[template]]
id = "ns::disk-stats"
template_resource = "ns::device"
template_filter = "device.category == 'DISK'"
[template.job]
id = "ns::disk/stats_{name}"
plugin = "shell"
command = "disk_stats /dev/{name} && echo ${{HOME}}"

[[test_plan]]
id = "ns::smoke"
bootstrap_include = ["device"]
mandatory_include = ["miscellanea/submit"]
include = ["cpu/*", "disk/*"]
exclude = ["ns::cpu/slow"]
"#;

fn store() -> UnitStore {
    let mut store = UnitStore::default();
    store.add_file(UnitFile::parse(PROVIDER, Path::new("provider.toml")).unwrap()).unwrap();
    store
}

fn ids(list: &[JobId]) -> Vec<&str> {
    list.iter().map(|id| id.as_str()).collect()
}

#[test]
fn loads_jobs_in_file_order() {
    let store = store();
    let loaded: Vec<_> = store.jobs().map(|j| j.id.as_str()).collect();
    assert_eq!(loaded, vec!["ns::cpu/info", "ns::cpu/stress", "ns::cpu/slow", "ns::miscellanea/submit", "ns::device"]);
    assert_eq!(store.job("ns::cpu/info").map(|j| j.plugin), Some(Plugin::Resource));
}

#[test]
fn select_jobs_puts_mandatory_first_and_applies_exclude() {
    let store = store();
    let plan = store.test_plan("ns::smoke").unwrap();
    let selected = store.select_jobs(plan).unwrap();
    assert_eq!(ids(&selected), vec!["ns::miscellanea/submit", "ns::cpu/info", "ns::cpu/stress"]);
}

#[test]
fn bootstrap_jobs_are_kept_out_of_main_selection() {
    let store = store();
    let plan = store.test_plan("ns::smoke").unwrap().clone();
    assert_eq!(ids(&store.bootstrap_jobs(&plan).unwrap()), vec!["ns::device"]);

    let mut greedy = plan;
    greedy.include.push("*".to_string());
    let selected = store.select_jobs(&greedy).unwrap();
    assert!(!selected.contains(&JobId::new("ns::device")));
}

#[test]
fn mandatory_jobs_ignore_exclude() {
    let store = store();
    let mut plan = store.test_plan("ns::smoke").unwrap().clone();
    plan.exclude.push("miscellanea/*".to_string());
    let selected = store.select_jobs(&plan).unwrap();
    assert_eq!(selected.first().map(|id| id.as_str()), Some("ns::miscellanea/submit"));
}

#[test]
fn unknown_test_plan_is_an_error() {
    assert!(matches!(store().test_plan("ns::nope"), Err(UnitError::UnknownTestPlan(_))));
}

#[test]
fn bad_pattern_is_reported() {
    let store = store();
    let plan = TestPlan { id: "ns::bad".into(), include: vec!["[".into()], ..TestPlan::default() };
    assert!(matches!(store.select_jobs(&plan), Err(UnitError::BadPattern { .. })));
}

#[test]
fn identical_job_is_idempotent_but_conflict_errors() {
    let mut store = store();
    let job = store.job("ns::cpu/info").unwrap().clone();
    store.add_job(job.clone()).unwrap();

    let mut changed = job;
    changed.command = Some("other".into());
    assert!(matches!(store.add_job(changed), Err(UnitError::DuplicateJob(_))));
}

#[test]
fn template_instantiates_from_record() {
    let store = store();
    let template = store.templates().next().unwrap();
    let record: Resource = [("name", "sda"), ("category", "DISK")].into_iter().collect();
    let job = template.instantiate(&record).unwrap();
    assert_eq!(job.id, "ns::disk/stats_sda");
    assert_eq!(job.command.as_deref(), Some("disk_stats /dev/sda && echo ${HOME}"));
}

#[test]
fn template_with_missing_field_fails() {
    let store = store();
    let template = store.templates().next().unwrap();
    let record: Resource = [("category", "DISK")].into_iter().collect();
    assert!(matches!(template.instantiate(&record), Err(UnitError::Template { .. })));
}

#[yare::parameterized(
    plain      = { "x",          Ok("x") },
    field      = { "a-{k}-b",    Ok("a-v-b") },
    escaped    = { "{{k}}",      Ok("{k}") },
    unclosed   = { "{k",         Err(()) },
    stray      = { "k}",         Err(()) },
    missing    = { "{nope}",     Err(()) },
)]
fn substitute_cases(text: &str, expected: Result<&str, ()>) {
    let record: Resource = [("k", "v")].into_iter().collect();
    let got = substitute(text, &record);
    assert_eq!(got.as_deref().map_err(|_| ()), expected);
}

#[test]
fn load_dir_reads_toml_files_only() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.toml"), PROVIDER).unwrap();
    std::fs::write(dir.path().join("notes.txt"), "not a unit").unwrap();
    let store = UnitStore::load_dir(dir.path()).unwrap();
    assert_eq!(store.len(), 5);
}

#[test]
fn load_dir_reports_parse_errors_with_path() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("bad.toml"), "[[job]]\nid = 3\n").unwrap();
    let err = UnitStore::load_dir(dir.path()).unwrap_err();
    assert!(err.to_string().contains("bad.toml"));
}
