// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn fake_clock_advances_both_instant_and_epoch() {
    let clock = FakeClock::new();
    let before = clock.now();
    let before_ms = clock.epoch_ms();
    clock.advance(Duration::from_millis(500));
    assert!(clock.now() > before);
    assert_eq!(clock.epoch_ms(), before_ms + 500);
}

#[test]
fn system_clock_epoch_ms_is_plausible() {
    let clock = SystemClock;
    // Any time after 2020-01-01 in epoch ms.
    assert!(clock.epoch_ms() > 1_577_836_800_000);
}
