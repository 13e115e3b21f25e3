//! Tests for `AgentRunTracker` and the agent driving task
//!
//! Timing tests run on a paused clock so stall windows elapse instantly.

use std::sync::Arc;
use std::time::Duration;

use kodegen_debate::driver::{DriverEvent, ScriptedDriver};
use kodegen_debate::tracker::{AgentRun, drive_agent, spawn_agent_run};
use kodegen_debate::{
    AgentDriver, AgentId, AgentRole, AgentRunTracker, AgentStatus, SessionId, StreamEvent,
    StreamMultiplexer,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const STALL: Duration = Duration::from_secs(5);

struct Harness {
    tracker: Arc<AgentRunTracker>,
    mux: Arc<StreamMultiplexer>,
    cancel: CancellationToken,
}

impl Harness {
    fn new(role: AgentRole) -> Self {
        Self {
            tracker: Arc::new(AgentRunTracker::new(AgentId::from("claude"), role)),
            mux: Arc::new(StreamMultiplexer::new(SessionId::from("test-session"))),
            cancel: CancellationToken::new(),
        }
    }

    fn run(&self, driver: ScriptedDriver, max_duration: Option<Duration>) -> AgentRun {
        let driver: Arc<dyn AgentDriver> = Arc::new(driver);
        AgentRun {
            session_id: SessionId::from("test-session"),
            tracker: Arc::clone(&self.tracker),
            driver,
            prompt: "What is 2+2?".to_string(),
            mux: Arc::clone(&self.mux),
            cancel: self.cancel.clone(),
            stall_timeout: STALL,
            max_duration,
        }
    }
}

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

fn assert_elapsed(started: Instant, expected: Duration) {
    let elapsed = started.elapsed();
    assert!(
        elapsed >= expected && elapsed < expected + Duration::from_millis(50),
        "elapsed {elapsed:?}, expected about {expected:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_completes_on_final_chunk() {
    let _ = env_logger::builder().is_test(true).try_init();
    let harness = Harness::new(AgentRole::Responder);
    let driver = ScriptedDriver::new()
        .chunk(secs(1), "Hel")
        .final_chunk(secs(1), "lo");

    let status = drive_agent(harness.run(driver, None)).await;

    assert_eq!(status, AgentStatus::Completed);
    assert_eq!(harness.tracker.final_text(), "Hello");
    assert_eq!(harness.tracker.chunk_count(), 2);

    let snapshot = harness.tracker.snapshot();
    assert!(snapshot.started_at.is_some());
    assert!(snapshot.ended_at.is_some());
    assert!((2000..2050).contains(&snapshot.runtime_ms));
    assert!(snapshot.error.is_none());

    let agent_id = AgentId::from("claude");
    assert_eq!(
        harness.mux.replay(),
        vec![
            StreamEvent::AgentStatus {
                agent_id: agent_id.clone(),
                status: AgentStatus::Streaming,
                error: None,
            },
            StreamEvent::Chunk {
                agent_id: agent_id.clone(),
                sequence: 1,
                text: "Hel".to_string(),
            },
            StreamEvent::Chunk {
                agent_id: agent_id.clone(),
                sequence: 2,
                text: "lo".to_string(),
            },
            StreamEvent::AgentStatus {
                agent_id,
                status: AgentStatus::Completed,
                error: None,
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_stall_times_out_without_chunks() {
    let harness = Harness::new(AgentRole::Responder);
    let started = Instant::now();

    let status = drive_agent(harness.run(ScriptedDriver::stalling(), None)).await;

    assert_eq!(status, AgentStatus::TimedOut);
    assert_elapsed(started, STALL);
    assert_eq!(harness.tracker.chunk_count(), 0);
    let error = harness.tracker.snapshot().error.unwrap_or_default();
    assert!(error.contains("no chunk for 5s"), "unexpected error: {error}");
}

#[tokio::test(start_paused = true)]
async fn test_stall_window_restarts_on_every_chunk() {
    let harness = Harness::new(AgentRole::Responder);
    let driver = ScriptedDriver::new()
        .chunk(secs(4), "a")
        .chunk(secs(4), "b")
        .chunk(secs(4), "c")
        .final_chunk(secs(4), "d");
    let started = Instant::now();

    let status = drive_agent(harness.run(driver, None)).await;

    assert_eq!(status, AgentStatus::Completed);
    assert_elapsed(started, secs(16));
    assert_eq!(harness.tracker.final_text(), "abcd");
}

#[tokio::test(start_paused = true)]
async fn test_stall_after_partial_output_keeps_buffer() {
    let harness = Harness::new(AgentRole::Responder);
    let driver = ScriptedDriver::new().chunk(secs(1), "partial").stall();

    let status = drive_agent(harness.run(driver, None)).await;

    assert_eq!(status, AgentStatus::TimedOut);
    assert_eq!(harness.tracker.final_text(), "partial");
}

#[tokio::test(start_paused = true)]
async fn test_overall_deadline_times_out_a_slow_trickle() {
    let harness = Harness::new(AgentRole::Responder);
    let mut driver = ScriptedDriver::new();
    for _ in 0..10 {
        driver = driver.chunk(secs(1), ".");
    }
    let driver = driver.final_chunk(secs(1), "done");
    let started = Instant::now();

    let status = drive_agent(harness.run(driver, Some(secs(3)))).await;

    assert_eq!(status, AgentStatus::TimedOut);
    assert_elapsed(started, secs(3));
    let error = harness.tracker.snapshot().error.unwrap_or_default();
    assert!(error.contains("no final chunk within 3s"), "unexpected error: {error}");
}

#[tokio::test(start_paused = true)]
async fn test_driver_error_fails_the_run() {
    let harness = Harness::new(AgentRole::Responder);
    let driver = ScriptedDriver::new()
        .chunk(secs(1), "thinking")
        .error(secs(1), "page layout changed");

    let status = drive_agent(harness.run(driver, None)).await;

    assert_eq!(status, AgentStatus::Failed);
    let error = harness.tracker.snapshot().error.unwrap_or_default();
    assert!(error.contains("page layout changed"));

    let last = harness.mux.replay().pop();
    assert!(matches!(
        last,
        Some(StreamEvent::AgentStatus {
            status: AgentStatus::Failed,
            error: Some(_),
            ..
        })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_stream_ending_without_final_chunk_fails() {
    let harness = Harness::new(AgentRole::Responder);
    let driver = ScriptedDriver::new().chunk(secs(1), "cut off");

    let status = drive_agent(harness.run(driver, None)).await;

    assert_eq!(status, AgentStatus::Failed);
    let error = harness.tracker.snapshot().error.unwrap_or_default();
    assert!(error.contains("ended without a final chunk"));
}

#[tokio::test(start_paused = true)]
async fn test_backwards_sequence_is_a_driver_error() {
    let harness = Harness::new(AgentRole::Responder);
    let driver = ScriptedDriver::new()
        .event(secs(1), DriverEvent::chunk(2, "second"))
        .event(secs(1), DriverEvent::chunk(1, "first"))
        .final_chunk(secs(1), "never");

    let status = drive_agent(harness.run(driver, None)).await;

    assert_eq!(status, AgentStatus::Failed);
    assert_eq!(harness.tracker.final_text(), "second");
    let error = harness.tracker.snapshot().error.unwrap_or_default();
    assert!(error.contains("chunk #1 arrived after #2"), "unexpected error: {error}");
}

#[tokio::test(start_paused = true)]
async fn test_repeated_sequence_is_ignored() {
    let harness = Harness::new(AgentRole::Responder);
    let driver = ScriptedDriver::new()
        .event(secs(1), DriverEvent::chunk(1, "a"))
        .event(secs(1), DriverEvent::chunk(1, "a"))
        .final_chunk(secs(1), "b");

    let status = drive_agent(harness.run(driver, None)).await;

    assert_eq!(status, AgentStatus::Completed);
    assert_eq!(harness.tracker.final_text(), "ab");
    let sequences: Vec<u64> = harness
        .tracker
        .chunks()
        .iter()
        .map(|chunk| chunk.sequence)
        .collect();
    assert_eq!(sequences, vec![1, 2]);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_the_run_and_its_chunks() {
    let harness = Harness::new(AgentRole::Responder);
    let driver = ScriptedDriver::new()
        .chunk(secs(1), "one")
        .chunk(secs(10), "two")
        .final_chunk(secs(1), "three");

    let handle = spawn_agent_run(harness.run(driver, None));
    tokio::time::sleep(secs(2)).await;
    assert_eq!(harness.tracker.status(), AgentStatus::Streaming);

    harness.cancel.cancel();
    let status = handle.await.expect("runner panicked");

    assert_eq!(status, AgentStatus::Cancelled);
    assert_eq!(harness.tracker.final_text(), "one");

    // Nothing more is accepted for the agent once it is terminal
    tokio::time::sleep(secs(20)).await;
    let chunks = harness
        .mux
        .replay()
        .into_iter()
        .filter(StreamEvent::is_chunk)
        .count();
    assert_eq!(chunks, 1);
}

#[tokio::test(start_paused = true)]
async fn test_already_cancelled_run_never_streams() {
    let harness = Harness::new(AgentRole::Responder);
    harness.cancel.cancel();

    let status = drive_agent(harness.run(ScriptedDriver::replying(secs(1), "4"), None)).await;

    assert_eq!(status, AgentStatus::Cancelled);
    assert_eq!(harness.tracker.chunk_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_synthesizer_emits_synthesis_chunks_only() {
    let harness = Harness::new(AgentRole::Synthesizer);
    let driver = ScriptedDriver::new()
        .chunk(secs(1), "## Consensus")
        .final_chunk(secs(1), " Points");

    let status = drive_agent(harness.run(driver, None)).await;

    assert_eq!(status, AgentStatus::Completed);
    assert_eq!(
        harness.mux.replay(),
        vec![
            StreamEvent::SynthesisChunk {
                sequence: 1,
                text: "## Consensus".to_string(),
            },
            StreamEvent::SynthesisChunk {
                sequence: 2,
                text: " Points".to_string(),
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_status_watch_follows_transitions() {
    let harness = Harness::new(AgentRole::Responder);
    let mut status_rx = harness.tracker.subscribe_status();
    assert_eq!(*status_rx.borrow(), AgentStatus::Pending);

    let driver = ScriptedDriver::new()
        .chunk(secs(1), "a")
        .final_chunk(secs(5), "b");
    let handle = spawn_agent_run(harness.run(driver, None));

    status_rx
        .wait_for(|status| *status == AgentStatus::Streaming)
        .await
        .expect("tracker dropped");
    status_rx
        .wait_for(|status| status.is_terminal())
        .await
        .expect("tracker dropped");
    assert_eq!(*status_rx.borrow(), AgentStatus::Completed);
    assert_eq!(handle.await.expect("runner panicked"), AgentStatus::Completed);
}

#[test]
fn test_status_transitions_are_monotonic() {
    use AgentStatus::*;

    assert!(Pending.can_transition_to(Streaming));
    assert!(Pending.can_transition_to(TimedOut));
    assert!(Pending.can_transition_to(Cancelled));
    assert!(Streaming.can_transition_to(Completed));
    assert!(Streaming.can_transition_to(Failed));
    assert!(!Streaming.can_transition_to(Pending));
    assert!(!Streaming.can_transition_to(Streaming));
    for terminal in [Completed, Failed, TimedOut, Cancelled] {
        assert!(terminal.is_terminal());
        for next in [Pending, Streaming, Completed, Failed, TimedOut, Cancelled] {
            assert!(!terminal.can_transition_to(next));
        }
    }
}
