// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn reconnect_timeout_reads_milliseconds() {
    std::env::remove_var("CK_RECONNECT_TIMEOUT_MS");
    assert_eq!(reconnect_timeout(), Duration::from_secs(600));
    std::env::set_var("CK_RECONNECT_TIMEOUT_MS", "soon");
    assert_eq!(reconnect_timeout(), Duration::from_secs(600));
    std::env::set_var("CK_RECONNECT_TIMEOUT_MS", "1500");
    assert_eq!(reconnect_timeout(), Duration::from_millis(1500));
    std::env::remove_var("CK_RECONNECT_TIMEOUT_MS");
}

#[test]
#[serial]
fn color_switches_only_accept_one() {
    std::env::set_var("NO_COLOR", "0");
    std::env::set_var("COLOR", "yes");
    assert!(!no_color());
    assert!(!force_color());
    std::env::set_var("NO_COLOR", "1");
    std::env::set_var("COLOR", "1");
    assert!(no_color());
    assert!(force_color());
    std::env::remove_var("NO_COLOR");
    std::env::remove_var("COLOR");
}

#[test]
#[serial]
fn log_directives_default_to_warn() {
    std::env::remove_var("CK_LOG");
    assert_eq!(log_directives(), "warn");
    std::env::set_var("CK_LOG", "  ");
    assert_eq!(log_directives(), "warn");
    std::env::set_var("CK_LOG", "ck=debug");
    assert_eq!(log_directives(), "ck=debug");
    std::env::remove_var("CK_LOG");
}
