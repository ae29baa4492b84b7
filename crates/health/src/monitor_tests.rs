// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Duration as ChronoDuration;

fn ids() -> (SessionId, MessageId) {
    (SessionId::new("ses_1"), MessageId::new("msg_1"))
}

fn config() -> HealthConfig {
    HealthConfig::default()
}

#[test]
fn fresh_monitor_starts_streaming_in_starting_phase() {
    let (session_id, message_id) = ids();
    let now = Utc::now();
    let monitor = StreamMonitor::new(session_id, message_id, now);
    assert_eq!(monitor.state(), StreamState::Streaming);
    assert_eq!(monitor.phase(), StreamPhase::Starting);
    assert!(!monitor.suspicious);
}

#[test]
fn tick_before_any_threshold_elapses_is_silent() {
    let (session_id, message_id) = ids();
    let now = Utc::now();
    let mut monitor = StreamMonitor::new(session_id, message_id, now);
    monitor.record_activity(StreamPhase::Generating, ActivityKind::TextDelta, 0, now);
    let verdict = monitor.tick(now + ChronoDuration::seconds(1), &config());
    assert_eq!(verdict, None);
    assert_eq!(monitor.state(), StreamState::Streaming);
}

#[test]
fn tick_past_warning_threshold_stalls_once() {
    let (session_id, message_id) = ids();
    let now = Utc::now();
    let mut monitor = StreamMonitor::new(session_id, message_id, now);
    monitor.record_activity(StreamPhase::Generating, ActivityKind::TextDelta, 0, now);

    let warned_at = now + ChronoDuration::seconds(16);
    let verdict = monitor.tick(warned_at, &config());
    assert_eq!(verdict, Some(StallVerdict::Warning));
    assert_eq!(monitor.state(), StreamState::Stalled);

    // Ticking again without new activity does not re-warn.
    let verdict = monitor.tick(warned_at + ChronoDuration::seconds(1), &config());
    assert_eq!(verdict, None);
}

#[test]
fn activity_after_stall_resumes_streaming() {
    let (session_id, message_id) = ids();
    let now = Utc::now();
    let mut monitor = StreamMonitor::new(session_id, message_id, now);
    monitor.record_activity(StreamPhase::Generating, ActivityKind::TextDelta, 0, now);
    monitor.tick(now + ChronoDuration::seconds(16), &config());
    assert_eq!(monitor.state(), StreamState::Stalled);

    monitor.record_activity(
        StreamPhase::Generating,
        ActivityKind::TextDelta,
        0,
        now + ChronoDuration::seconds(17),
    );
    assert_eq!(monitor.state(), StreamState::Streaming);
}

#[test]
fn tick_past_timeout_threshold_times_out() {
    let (session_id, message_id) = ids();
    let now = Utc::now();
    let mut monitor = StreamMonitor::new(session_id, message_id, now);
    monitor.record_activity(StreamPhase::Generating, ActivityKind::TextDelta, 0, now);
    let verdict = monitor.tick(now + ChronoDuration::seconds(61), &config());
    assert_eq!(verdict, Some(StallVerdict::Timeout));
    assert_eq!(monitor.state(), StreamState::TimedOut);
}

#[test]
fn thinking_phase_with_few_events_uses_ordinary_stall_timeout() {
    // isExtendedThinking requires eventsReceived > 10 (spec.md §4.3.3 step
    // 3); a handful of reasoning events doesn't qualify for the 120s
    // no-content grace period, so the ordinary 60s stall_timeout applies.
    let (session_id, message_id) = ids();
    let now = Utc::now();
    let mut monitor = StreamMonitor::new(session_id, message_id, now);
    monitor.record_activity(StreamPhase::Thinking, ActivityKind::Other, 0, now);

    let verdict = monitor.tick(now + ChronoDuration::seconds(61), &config());
    assert_eq!(verdict, Some(StallVerdict::Timeout));
    assert_eq!(monitor.state(), StreamState::TimedOut);
}

#[test]
fn extended_thinking_keeps_elapsed_clock_fresh_but_times_out_on_meaningful_clock() {
    // spec.md §8 scenario 4: 20 reasoning-delta events over 30s+, gaps
    // <= 10s, no meaningful content. `last_event_at` stays fresh (so the
    // plain `elapsed >= stall_timeout` branch never fires) but
    // `last_meaningful_at` is stuck at the start, so the extended-thinking
    // branch must fire once elapsedSinceMeaningful crosses 120s.
    let (session_id, message_id) = ids();
    let now = Utc::now();
    let mut monitor = StreamMonitor::new(session_id, message_id, now);

    let mut clock = now;
    let mut timed_out_at_event = None;
    for i in 1..=20 {
        clock += ChronoDuration::seconds(8);
        monitor.record_activity(StreamPhase::Thinking, ActivityKind::Other, 0, clock);
        let verdict = monitor.tick(clock, &config());
        if verdict == Some(StallVerdict::Timeout) {
            timed_out_at_event = Some(i);
            break;
        }
    }

    // `last_meaningful_at` never moved past `now`, so once enough events
    // have arrived to satisfy eventsReceived > 10, elapsedSinceMeaningful
    // crosses the 120s no-content timeout well before the loop's full 20
    // events / 160s span, even though every single tick saw fresh activity.
    let timed_out_at_event = timed_out_at_event.expect("extended-thinking stream never timed out");
    assert!(timed_out_at_event > 10);
    assert_eq!(monitor.state(), StreamState::TimedOut);
}

#[test]
fn completing_with_no_activity_is_flagged_suspicious() {
    let (session_id, message_id) = ids();
    let now = Utc::now();
    let mut monitor = StreamMonitor::new(session_id, message_id, now);
    monitor.complete(now);
    assert!(monitor.suspicious);
    assert_eq!(monitor.state(), StreamState::Completed);
}

#[test]
fn completing_with_few_events_is_flagged_suspicious() {
    let (session_id, message_id) = ids();
    let now = Utc::now();
    let mut monitor = StreamMonitor::new(session_id, message_id, now);
    // Only tool-call events, but fewer than 5 total: still suspicious.
    for _ in 0..3 {
        monitor.record_activity(StreamPhase::ToolCalling, ActivityKind::ToolCall, 0, now);
    }
    monitor.complete(now);
    assert!(monitor.suspicious);
}

#[test]
fn completing_after_substantial_activity_is_not_suspicious() {
    let (session_id, message_id) = ids();
    let now = Utc::now();
    let mut monitor = StreamMonitor::new(session_id, message_id, now);
    for _ in 0..6 {
        monitor.record_activity(StreamPhase::Generating, ActivityKind::TextDelta, 0, now);
    }
    monitor.complete(now);
    assert!(!monitor.suspicious);
}

#[test]
fn terminal_state_is_not_reticked() {
    let (session_id, message_id) = ids();
    let now = Utc::now();
    let mut monitor = StreamMonitor::new(session_id, message_id, now);
    monitor.complete(now);
    let verdict = monitor.tick(now + ChronoDuration::seconds(1000), &config());
    assert_eq!(verdict, None);
}

#[test]
fn report_reflects_counters_and_last_event_kind() {
    let (session_id, message_id) = ids();
    let now = Utc::now();
    let mut monitor = StreamMonitor::new(session_id.clone(), message_id.clone(), now);
    monitor.record_activity(StreamPhase::Generating, ActivityKind::TextDelta, 100, now);
    monitor.record_activity(
        StreamPhase::ToolCalling,
        ActivityKind::ToolCall,
        0,
        now + ChronoDuration::seconds(1),
    );

    let report = monitor.report();
    assert_eq!(report.session_id, session_id);
    assert_eq!(report.message_id, message_id);
    assert_eq!(report.events_received, 2);
    assert_eq!(report.text_delta_events, 1);
    assert_eq!(report.tool_call_events, 1);
    assert_eq!(report.bytes_received, 100);
    assert_eq!(report.last_event_kind, Some(ActivityKind::ToolCall));
    assert_eq!(report.completed_at, None);
    assert_eq!(report.error, None);
    assert!(!report.suspicious);

    monitor.fail("upstream disconnected".to_string(), now + ChronoDuration::seconds(2));
    let report = monitor.report();
    assert_eq!(report.state, StreamState::Errored);
    assert_eq!(report.completed_at, Some(now + ChronoDuration::seconds(2)));
    assert_eq!(report.error.as_deref(), Some("upstream disconnected"));
}

#[test]
fn report_counts_each_stall_warning() {
    let (session_id, message_id) = ids();
    let now = Utc::now();
    let mut monitor = StreamMonitor::new(session_id, message_id, now);
    monitor.record_activity(StreamPhase::Generating, ActivityKind::TextDelta, 0, now);
    monitor.tick(now + ChronoDuration::seconds(16), &config());
    assert_eq!(monitor.report().stall_warnings, 1);
}
