// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn fake_clock_advances() {
    let start = Utc::now();
    let clock = FakeClock::new(start);
    assert_eq!(clock.now().timestamp_millis(), start.timestamp_millis());
    clock.advance(chrono::Duration::seconds(5));
    assert_eq!(
        clock.now().timestamp_millis(),
        start.timestamp_millis() + 5000
    );
}

#[test]
fn fake_clock_set_is_absolute() {
    let clock = FakeClock::new(Utc::now());
    let target = Utc::now() + chrono::Duration::days(1);
    clock.set(target);
    assert_eq!(clock.now().timestamp_millis(), target.timestamp_millis());
}

#[test]
fn fake_clock_shares_state_across_clones() {
    let clock = FakeClock::new(Utc::now());
    let clone = clock.clone();
    clock.advance(chrono::Duration::seconds(1));
    assert_eq!(clock.now(), clone.now());
}

#[test]
fn system_clock_moves_forward() {
    let clock = SystemClock;
    let a = clock.now();
    let b = clock.now();
    assert!(b >= a);
}
