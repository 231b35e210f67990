// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{format_duration, format_elapsed};
use std::time::Duration;

#[yare::parameterized(
    zero_seconds     = { 0,      "0s" },
    max_seconds      = { 59,     "59s" },
    one_minute       = { 60,     "1m" },
    one_hour         = { 3600,   "1h" },
    hour_and_minutes = { 3660,   "1h1m" },
    almost_a_day     = { 86399,  "23h59m" },
    two_days         = { 172800, "2d" },
)]
fn elapsed(secs: u64, expected: &str) {
    assert_eq!(format_elapsed(secs), expected);
}

#[yare::parameterized(
    millis       = { 850,        "850ms" },
    one_second   = { 1_000,      "1.00sec" },
    seconds      = { 1_250,      "1.25sec" },
    minutes      = { 150_000,    "2.50min" },
    hours        = { 3_960_000,  "1.10hours" },
)]
fn duration(ms: u64, expected: &str) {
    assert_eq!(format_duration(Duration::from_millis(ms)), expected);
}
