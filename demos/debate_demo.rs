//! Runs one debate over scripted agents and prints the live stream
//!
//! ```text
//! RUST_LOG=info cargo run --example debate_demo
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use kodegen_debate::driver::{DriverSet, ScriptedDriver};
use kodegen_debate::{AgentId, OrchestratorOptions, SessionManager, StreamEvent};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let synthesizer = ScriptedDriver::new()
        .chunk(ms(200), "## Consensus Points\nBoth models answer 4.\n\n")
        .chunk(ms(200), "## Key Disagreements\nNone.\n\n")
        .final_chunk(ms(200), "## Synthesized Answer\n2 + 2 = 4.");
    let drivers = DriverSet::new(Arc::new(synthesizer))
        .with_agent(
            "claude",
            Arc::new(
                ScriptedDriver::new()
                    .chunk(ms(300), "Two plus two ")
                    .final_chunk(ms(300), "is 4."),
            ),
        )
        .with_agent(
            "gemini",
            Arc::new(
                ScriptedDriver::new()
                    .chunk(ms(500), "The answer ")
                    .final_chunk(ms(400), "is four."),
            ),
        )
        .with_agent("chatgpt", Arc::new(ScriptedDriver::stalling()));

    let options = OrchestratorOptions::builder()
        .stall_timeout(Duration::from_secs(2))
        .build();
    let manager = SessionManager::new(drivers, options);

    let agents = ["claude", "gemini", "chatgpt"].map(AgentId::from).to_vec();
    let session_id = manager.start_session("What is 2 + 2?", agents).await?;
    log::info!("Started session {session_id}");

    let mut subscription = manager.subscribe(&session_id).await?;
    while let Some(event) = subscription.recv().await? {
        match event {
            StreamEvent::Chunk { agent_id, text, .. } => log::info!("[{agent_id}] {text}"),
            StreamEvent::SynthesisChunk { text, .. } => log::info!("[synthesis] {text}"),
            other => log::info!("{}", serde_json::to_string(&other)?),
        }
    }

    let snapshot = manager.get_status(&session_id).await?;
    log::info!(
        "Session finished as {:?}:\n{}",
        snapshot.status,
        serde_json::to_string_pretty(&snapshot)?
    );

    manager.shutdown().await?;
    Ok(())
}
