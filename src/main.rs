// Category HTTP Server: Debate gateway
//
// This binary serves multi-agent debate sessions over WebSocket.
// One automation program per agent site, default port 8765.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use kodegen_debate::driver::{CommandDriver, DirProfileStore, DriverSet, MemoryProfileStore};
use kodegen_debate::{AgentId, OrchestratorOptions, SessionManager, gateway};

const DEFAULT_ADDR: &str = "127.0.0.1:8765";

/// Agent whose logged-in profile the synthesis program reuses by default
const DEFAULT_SYNTHESIS_PROFILE: &str = "claude";

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = OrchestratorOptions::from_env()?;
    let addr: SocketAddr = std::env::var("DEBATE_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()
        .context("DEBATE_ADDR is not a socket address")?;

    // Initialize profile store
    let profiles = Arc::new(DirProfileStore::new(profile_root()));
    let synthesis_profile = AgentId::from(
        std::env::var("DEBATE_SYNTHESIS_PROFILE")
            .unwrap_or_else(|_| DEFAULT_SYNTHESIS_PROFILE.to_string()),
    );
    profiles.init(options.default_agents.iter().chain([&synthesis_profile]))?;
    log::info!("Using profiles under {}", profiles.root().display());

    // Synthesis driver reuses one site's profile under its own agent id
    let synthesis_profiles = Arc::new(MemoryProfileStore::new());
    synthesis_profiles.insert(
        options.synthesis_agent.clone(),
        profiles.root().join(synthesis_profile.as_str()),
    );
    let synthesis_program = std::env::var("DEBATE_SYNTHESIS_DRIVER")
        .unwrap_or_else(|_| default_program(&synthesis_profile));
    let synthesizer = CommandDriver::find(options.synthesis_agent.clone(), &synthesis_program)
        .context("synthesis driver is required")?
        .profiles(synthesis_profiles);

    // Initialize one driver per agent
    let mut drivers = DriverSet::new(Arc::new(synthesizer));
    for agent in &options.default_agents {
        let program = std::env::var(driver_env_var(agent)).unwrap_or_else(|_| default_program(agent));
        match CommandDriver::find(agent.clone(), &program) {
            Ok(driver) => drivers.insert(agent.clone(), Arc::new(driver.profiles(profiles.clone()))),
            Err(e) => log::warn!("Skipping agent {agent}: {e}"),
        }
    }

    let manager = Arc::new(SessionManager::new(drivers, options));
    gateway::start_server(addr, manager).await
}

fn profile_root() -> PathBuf {
    if let Ok(root) = std::env::var("DEBATE_PROFILE_ROOT") {
        return PathBuf::from(root);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| String::from("."));
    PathBuf::from(home).join(".debate").join("browser-data")
}

fn driver_env_var(agent: &AgentId) -> String {
    format!("DEBATE_DRIVER_{}", agent.as_str().to_uppercase().replace('-', "_"))
}

fn default_program(agent: &AgentId) -> String {
    format!("debate-driver-{agent}")
}
