//! Tests for completion policies, meta-prompt construction and the
//! synthesis coordinator

use std::sync::Arc;
use std::time::Duration;

use kodegen_debate::driver::ScriptedDriver;
use kodegen_debate::synthesis::{
    CompletionPolicy, PolicyDecision, SynthesisContext, SynthesisCoordinator, build_meta_prompt,
};
use kodegen_debate::tracker::{AgentRun, spawn_agent_run};
use kodegen_debate::{
    AgentDriver, AgentId, AgentRole, AgentRunTracker, AgentStatus, SessionId, StreamEvent,
    StreamMultiplexer, SynthesisState,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const STALL: Duration = Duration::from_secs(120);

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

// ============================================================================
// Completion policy
// ============================================================================

#[test]
fn test_all_terminal_waits_for_everyone() {
    use AgentStatus::{Completed, Failed, Pending, Streaming, TimedOut};
    let policy = CompletionPolicy::AllTerminal;

    assert_eq!(policy.evaluate(&[Completed, Streaming]), PolicyDecision::Wait);
    assert_eq!(policy.evaluate(&[Completed, Pending]), PolicyDecision::Wait);
    assert_eq!(policy.evaluate(&[Completed, TimedOut]), PolicyDecision::Proceed);
    assert_eq!(policy.evaluate(&[Failed, TimedOut]), PolicyDecision::Skip);
}

#[test]
fn test_any_success_and_majority_thresholds() {
    use AgentStatus::{Completed, Failed, Streaming};

    let any = CompletionPolicy::AnySuccess;
    assert_eq!(any.evaluate(&[Streaming, Streaming]), PolicyDecision::Wait);
    assert_eq!(any.evaluate(&[Completed, Streaming]), PolicyDecision::Proceed);

    let majority = CompletionPolicy::Majority;
    assert_eq!(
        majority.evaluate(&[Completed, Streaming, Streaming]),
        PolicyDecision::Wait
    );
    assert_eq!(
        majority.evaluate(&[Completed, Completed, Streaming]),
        PolicyDecision::Proceed
    );
    // Half is not a majority, but everyone terminal falls back to all-terminal
    assert_eq!(
        majority.evaluate(&[Completed, Streaming]),
        PolicyDecision::Wait
    );
    assert_eq!(majority.evaluate(&[Completed, Failed]), PolicyDecision::Proceed);
    assert_eq!(majority.evaluate(&[Failed, Failed]), PolicyDecision::Skip);
}

#[test]
fn test_policy_parsing() {
    assert_eq!("all".parse::<CompletionPolicy>().ok(), Some(CompletionPolicy::AllTerminal));
    assert_eq!("ANY".parse::<CompletionPolicy>().ok(), Some(CompletionPolicy::AnySuccess));
    assert_eq!(
        " majority ".parse::<CompletionPolicy>().ok(),
        Some(CompletionPolicy::Majority)
    );
    assert!("quorum".parse::<CompletionPolicy>().is_err());
    assert_eq!(CompletionPolicy::default(), CompletionPolicy::AllTerminal);
}

// ============================================================================
// Meta-prompt
// ============================================================================

#[test]
fn test_meta_prompt_lists_agents_in_id_order() {
    let responses = vec![
        (AgentId::from("gemini"), "four".to_string()),
        (AgentId::from("claude"), "4".to_string()),
    ];

    let prompt = build_meta_prompt("What is 2+2?", &responses);

    assert!(prompt.starts_with("You are analyzing responses from 2 AI models: claude, gemini."));
    assert!(prompt.contains("## Consensus Points"));
    assert!(prompt.contains("## Key Disagreements"));
    assert!(prompt.contains("## Synthesized Answer"));
    assert!(prompt.contains("---\n\nORIGINAL QUESTION:\nWhat is 2+2?\n\n---"));
    assert!(prompt.ends_with("Now provide your unified analysis:"));

    let claude = prompt.find("CLAUDE'S RESPONSE:\n4").expect("claude section");
    let gemini = prompt.find("GEMINI'S RESPONSE:\nfour").expect("gemini section");
    assert!(claude < gemini);
}

#[test]
fn test_meta_prompt_is_deterministic() {
    let forward = vec![
        (AgentId::from("a"), "alpha".to_string()),
        (AgentId::from("b"), "beta".to_string()),
    ];
    let reversed: Vec<_> = forward.iter().rev().cloned().collect();

    assert_eq!(
        build_meta_prompt("q", &forward),
        build_meta_prompt("q", &reversed)
    );
}

#[test]
fn test_meta_prompt_single_response() {
    let prompt = build_meta_prompt("q", &[(AgentId::from("claude"), " 4 \n".to_string())]);
    assert!(prompt.starts_with("You are analyzing responses from 1 AI model: claude."));
    assert!(prompt.contains("CLAUDE'S RESPONSE:\n4\n\n---"));
}

// ============================================================================
// Coordinator
// ============================================================================

struct Fixture {
    session_id: SessionId,
    mux: Arc<StreamMultiplexer>,
    cancel: CancellationToken,
    trackers: Vec<Arc<AgentRunTracker>>,
    runners: Vec<JoinHandle<AgentStatus>>,
}

impl Fixture {
    fn new(responders: Vec<(&str, ScriptedDriver)>) -> Self {
        let session_id = SessionId::from("synthesis-test");
        let mux = Arc::new(StreamMultiplexer::new(session_id.clone()));
        let cancel = CancellationToken::new();
        let mut trackers = Vec::new();
        let mut runners = Vec::new();

        for (agent, driver) in responders {
            let tracker = Arc::new(AgentRunTracker::new(
                AgentId::from(agent),
                AgentRole::Responder,
            ));
            let driver: Arc<dyn AgentDriver> = Arc::new(driver);
            runners.push(spawn_agent_run(AgentRun {
                session_id: session_id.clone(),
                tracker: Arc::clone(&tracker),
                driver,
                prompt: "What is 2+2?".to_string(),
                mux: Arc::clone(&mux),
                cancel: cancel.child_token(),
                stall_timeout: STALL,
                max_duration: None,
            }));
            trackers.push(tracker);
        }

        Self {
            session_id,
            mux,
            cancel,
            trackers,
            runners,
        }
    }

    fn context(&self, driver: Arc<dyn AgentDriver>) -> SynthesisContext {
        SynthesisContext {
            prompt: "What is 2+2?".to_string(),
            responders: self.trackers.clone(),
            driver,
            synthesis_agent: AgentId::from("synthesis"),
            mux: Arc::clone(&self.mux),
            cancel: self.cancel.clone(),
            stall_timeout: STALL,
            max_duration: None,
        }
    }

    fn synthesis_states(&self) -> Vec<SynthesisState> {
        self.mux
            .replay()
            .into_iter()
            .filter_map(|event| match event {
                StreamEvent::SynthesisStatus { status, .. } => Some(status),
                _ => None,
            })
            .collect()
    }
}

#[tokio::test(start_paused = true)]
async fn test_coordinator_synthesizes_completed_answers_only() {
    let _ = env_logger::builder().is_test(true).try_init();
    let fixture = Fixture::new(vec![
        ("claude", ScriptedDriver::replying(secs(3), "4")),
        ("chatgpt", ScriptedDriver::new().error(secs(1), "rate limited")),
        ("gemini", ScriptedDriver::replying(secs(5), "four")),
    ]);
    let synthesizer = Arc::new(ScriptedDriver::replying(secs(2), "Both agree: 4"));
    let coordinator = SynthesisCoordinator::new(fixture.session_id.clone(), CompletionPolicy::AllTerminal);

    let state = coordinator.run(fixture.context(synthesizer.clone())).await;

    assert_eq!(state, SynthesisState::Done);
    assert_eq!(
        fixture.synthesis_states(),
        vec![SynthesisState::Waiting, SynthesisState::Running, SynthesisState::Done]
    );

    let prompts = synthesizer.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("CLAUDE'S RESPONSE:\n4"));
    assert!(prompts[0].contains("GEMINI'S RESPONSE:\nfour"));
    assert!(!prompts[0].contains("CHATGPT"));

    let snapshot = coordinator.snapshot();
    let tracker = snapshot.tracker.expect("synthesizer tracker");
    assert_eq!(tracker.role, AgentRole::Synthesizer);
    assert_eq!(tracker.status, AgentStatus::Completed);
    assert_eq!(
        coordinator.tracker().map(|t| t.final_text()),
        Some("Both agree: 4".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn test_coordinator_skips_when_nobody_completed() {
    let fixture = Fixture::new(vec![
        ("claude", ScriptedDriver::new().error(secs(1), "logged out")),
        ("gemini", ScriptedDriver::stalling()),
    ]);
    let synthesizer = Arc::new(ScriptedDriver::replying(secs(1), "unused"));
    let coordinator = SynthesisCoordinator::new(fixture.session_id.clone(), CompletionPolicy::AllTerminal);

    let state = coordinator.run(fixture.context(synthesizer.clone())).await;

    assert_eq!(state, SynthesisState::Skipped);
    assert!(synthesizer.prompts().is_empty());
    let snapshot = coordinator.snapshot();
    assert!(snapshot.tracker.is_none());
    assert!(snapshot.error.unwrap_or_default().contains("no responder completed"));
    assert_eq!(fixture.trackers[1].status(), AgentStatus::TimedOut);
}

#[tokio::test(start_paused = true)]
async fn test_any_success_starts_before_slow_responders_finish() {
    let fixture = Fixture::new(vec![
        ("claude", ScriptedDriver::replying(secs(1), "4")),
        ("gemini", ScriptedDriver::replying(secs(60), "four")),
    ]);
    let synthesizer = Arc::new(ScriptedDriver::replying(secs(1), "4"));
    let coordinator = SynthesisCoordinator::new(fixture.session_id.clone(), CompletionPolicy::AnySuccess);

    let state = coordinator.run(fixture.context(synthesizer.clone())).await;

    assert_eq!(state, SynthesisState::Done);
    assert!(!fixture.trackers[1].is_terminal());
    let prompts = synthesizer.prompts();
    assert!(prompts[0].contains("CLAUDE'S RESPONSE"));
    assert!(!prompts[0].contains("GEMINI'S RESPONSE"));

    // The slow responder keeps running to completion on its own
    for runner in fixture.runners {
        runner.await.expect("runner panicked");
    }
    assert_eq!(fixture.trackers[1].status(), AgentStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_coordinator_cancelled_while_waiting() {
    let fixture = Fixture::new(vec![("claude", ScriptedDriver::stalling())]);
    let synthesizer = Arc::new(ScriptedDriver::replying(secs(1), "unused"));
    let coordinator = Arc::new(SynthesisCoordinator::new(
        fixture.session_id.clone(),
        CompletionPolicy::AllTerminal,
    ));

    let task = tokio::spawn({
        let coordinator = Arc::clone(&coordinator);
        let ctx = fixture.context(synthesizer.clone());
        async move { coordinator.run(ctx).await }
    });
    tokio::time::sleep(secs(1)).await;
    assert_eq!(coordinator.state(), SynthesisState::Waiting);

    fixture.cancel.cancel();
    assert_eq!(task.await.expect("coordinator panicked"), SynthesisState::Cancelled);
    assert!(synthesizer.prompts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_synthesizer_failure_is_reported_separately() {
    let fixture = Fixture::new(vec![("claude", ScriptedDriver::replying(secs(1), "4"))]);
    let synthesizer = Arc::new(ScriptedDriver::new().error(secs(1), "response box not found"));
    let coordinator = SynthesisCoordinator::new(fixture.session_id.clone(), CompletionPolicy::AllTerminal);

    let state = coordinator.run(fixture.context(synthesizer)).await;

    assert_eq!(state, SynthesisState::Failed);
    let snapshot = coordinator.snapshot();
    assert!(snapshot.error.unwrap_or_default().contains("response box not found"));
    assert_eq!(fixture.trackers[0].status(), AgentStatus::Completed);
    assert_eq!(fixture.trackers[0].final_text(), "4");
}
