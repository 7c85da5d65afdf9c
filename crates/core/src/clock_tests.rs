// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_is_monotonic() {
    let clock = SystemClock;
    let t1 = clock.now();
    let t2 = clock.now();
    assert!(t2 >= t1);
    assert!(clock.unix_ms() > 1_600_000_000_000);
}

#[test]
fn fake_clock_advance_moves_both_times() {
    let clock = FakeClock::new();
    let t1 = clock.now();
    let ms1 = clock.unix_ms();
    clock.advance(Duration::from_millis(1500));
    assert_eq!(clock.now().duration_since(t1), Duration::from_millis(1500));
    assert_eq!(clock.unix_ms() - ms1, 1500);
}

#[test]
fn fake_clock_clones_share_time() {
    let a = FakeClock::new();
    let b = a.clone();
    b.advance(Duration::from_secs(30));
    assert_eq!(a.now(), b.now());
    b.set_unix_ms(42);
    assert_eq!(a.unix_ms(), 42);
}

#[test]
fn delay_secs_is_fractional_and_never_negative() {
    let clock = FakeClock::new();
    let t1 = clock.now();
    clock.advance(Duration::from_millis(250));
    let t2 = clock.now();
    assert!((delay_secs(t1, t2) - 0.25).abs() < 1e-9);
    assert_eq!(delay_secs(t2, t1), 0.0);
}
