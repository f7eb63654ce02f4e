//! Countdown arithmetic for live questions.
//!
//! All functions take `now` explicitly so callers (and tests) control the
//! clock. Wall-clock time is used because question start timestamps are
//! persisted and shared with clients.

use std::time::{Duration, SystemTime};

/// Total paused duration in milliseconds, including an in-progress pause.
pub fn paused_so_far(paused_accum_ms: u64, pause_start: Option<SystemTime>, now: SystemTime) -> u64 {
    let in_progress = pause_start
        .and_then(|start| now.duration_since(start).ok())
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0);
    paused_accum_ms + in_progress
}

/// The instant the countdown reaches zero: question start plus the time limit,
/// slid forward by every paused millisecond.
pub fn deadline(question_start: SystemTime, time_limit_sec: u32, paused_ms: u64) -> SystemTime {
    question_start
        + Duration::from_secs(u64::from(time_limit_sec))
        + Duration::from_millis(paused_ms)
}

/// Remaining whole seconds on the countdown, floored at zero.
///
/// Uses a ceiling division so the display shows the full limit the instant the
/// question starts and hits 0 exactly at the deadline, never before.
pub fn remaining_secs(
    question_start: SystemTime,
    time_limit_sec: u32,
    paused_accum_ms: u64,
    pause_start: Option<SystemTime>,
    now: SystemTime,
) -> u64 {
    let paused_ms = paused_so_far(paused_accum_ms, pause_start, now);
    let deadline = deadline(question_start, time_limit_sec, paused_ms);
    match deadline.duration_since(now) {
        Ok(left) => left.as_millis().div_ceil(1000) as u64,
        Err(_) => 0,
    }
}

/// Milliseconds a player took to answer, excluding paused time, floored at zero.
pub fn elapsed_answer_ms(
    question_start: SystemTime,
    paused_accum_ms: u64,
    pause_start: Option<SystemTime>,
    now: SystemTime,
) -> u64 {
    let raw = now
        .duration_since(question_start)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0);
    raw.saturating_sub(paused_so_far(paused_accum_ms, pause_start, now))
}
