// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn job_id_namespace_and_partial() {
    let id = JobId::new("com.example::cpu/info");
    assert_eq!(id.namespace(), Some("com.example"));
    assert_eq!(id.partial(), "cpu/info");

    let bare = JobId::new("cpuinfo");
    assert_eq!(bare.namespace(), None);
    assert_eq!(bare.partial(), "cpuinfo");
}

#[yare::parameterized(
    shell         = { "shell",         Plugin::Shell },
    resource      = { "resource",      Plugin::Resource },
    local         = { "local",         Plugin::Local },
    manual        = { "manual",        Plugin::Manual },
    user_verify   = { "user-verify",   Plugin::UserVerify },
    user_interact = { "user-interact", Plugin::UserInteract },
    attachment    = { "attachment",    Plugin::Attachment },
)]
fn plugin_parse_matches_display(text: &str, plugin: Plugin) {
    assert_eq!(Plugin::parse(text), Some(plugin));
    assert_eq!(plugin.to_string(), text);
}

#[test]
fn plugin_parse_rejects_unknown() {
    assert_eq!(Plugin::parse("qml-ish"), None);
}

#[yare::parameterized(
    shell         = { Plugin::Shell,        false, true },
    manual        = { Plugin::Manual,       true,  false },
    user_verify   = { Plugin::UserVerify,   true,  true },
    user_interact = { Plugin::UserInteract, true,  true },
)]
fn plugin_interactivity(plugin: Plugin, verification: bool, command: bool) {
    assert_eq!(plugin.needs_verification(), verification);
    assert_eq!(plugin.runs_command(), command);
}

#[test]
fn plugin_deserializes_kebab_case() {
    let plugin: Plugin = serde_json::from_str("\"user-verify\"").unwrap();
    assert_eq!(plugin, Plugin::UserVerify);
}

#[test]
fn blank_command_is_none() {
    let job = JobDefinition::builder().command(Some("   \n".to_string())).build();
    assert_eq!(job.command(), None);
}

#[test]
fn requirement_lines_split_multiline_entries() {
    let job = JobDefinition::builder()
        .requires(vec!["cpu.count > '1'\n\n  device.category == 'AUDIO'".to_string()])
        .build();
    let lines: Vec<_> = job.requirement_lines().collect();
    assert_eq!(lines, vec!["cpu.count > '1'", "device.category == 'AUDIO'"]);
}

#[test]
fn checksum_ignores_whitespace_differences() {
    let a = JobDefinition::builder().command(Some("echo   hello\n  world".to_string())).build();
    let b = JobDefinition::builder().command(Some("echo hello world".to_string())).build();
    assert_eq!(a.checksum(), b.checksum());
}

#[test]
fn checksum_changes_with_command() {
    let a = JobDefinition::builder().command(Some("echo one".to_string())).build();
    let b = JobDefinition::builder().command(Some("echo two".to_string())).build();
    assert_ne!(a.checksum(), b.checksum());
}

#[test]
fn checksum_is_hex_sha256() {
    let sum = JobDefinition::builder().build().checksum();
    assert_eq!(sum.len(), 64);
    assert!(sum.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn needs_root_only_for_root_user() {
    assert!(JobDefinition::builder().user(Some("root".into())).build().needs_root());
    assert!(!JobDefinition::builder().user(Some("ubuntu".into())).build().needs_root());
    assert!(!JobDefinition::builder().build().needs_root());
}

#[test]
fn definition_deserializes_from_toml_with_defaults() {
    let job: JobDefinition = toml::from_str(
        r#"
        id = "ns::sensor"
        plugin = "resource"
        command = "cat /proc/cpuinfo"
        "#,
    )
    .unwrap();
    assert_eq!(job.id, "ns::sensor");
    assert_eq!(job.plugin, Plugin::Resource);
    assert!(job.depends.is_empty());
    assert!(job.flags.is_empty());
}
