//! Tests for the WebSocket gateway frames and HTTP surface
#![cfg(feature = "server")]

use std::sync::Arc;
use std::time::Duration;

use kodegen_debate::driver::ScriptedDriver;
use kodegen_debate::gateway::{self, ClientAction, Outbound, ServerFrame, SessionEventFrame};
use kodegen_debate::{
    AgentId, AgentStatus, DebateError, DriverSet, OrchestratorOptions, SessionId, SessionManager,
    StreamEvent,
};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

#[test]
fn test_client_actions_decode() -> anyhow::Result<()> {
    let start: ClientAction = serde_json::from_value(json!({
        "action": "start",
        "prompt": "What is 2+2?",
        "agents": ["claude", "gemini"],
    }))?;
    assert_eq!(
        start,
        ClientAction::Start {
            prompt: "What is 2+2?".to_string(),
            agents: Some(vec![AgentId::from("claude"), AgentId::from("gemini")]),
        }
    );

    let defaults: ClientAction = serde_json::from_value(json!({"action": "start", "prompt": "q"}))?;
    assert_eq!(
        defaults,
        ClientAction::Start {
            prompt: "q".to_string(),
            agents: None
        }
    );

    let cancel: ClientAction =
        serde_json::from_value(json!({"action": "cancel", "session_id": "s-1"}))?;
    assert_eq!(
        cancel,
        ClientAction::Cancel {
            session_id: SessionId::from("s-1")
        }
    );

    let check: ClientAction = serde_json::from_value(json!({"action": "check_auth"}))?;
    assert_eq!(check, ClientAction::CheckAuth);

    assert!(serde_json::from_value::<ClientAction>(json!({"action": "reboot"})).is_err());
    Ok(())
}

#[test]
fn test_outbound_frames_encode() -> anyhow::Result<()> {
    let started = Outbound::from(ServerFrame::SessionStarted {
        session_id: SessionId::from("s-1"),
        agents: vec![AgentId::from("claude")],
    });
    assert_eq!(
        serde_json::to_value(&started)?,
        json!({"type": "session_started", "session_id": "s-1", "agents": ["claude"]})
    );

    let chunk = Outbound::from(SessionEventFrame {
        session_id: SessionId::from("s-1"),
        event: StreamEvent::Chunk {
            agent_id: AgentId::from("claude"),
            sequence: 3,
            text: "4".to_string(),
        },
    });
    assert_eq!(
        serde_json::to_value(&chunk)?,
        json!({
            "session_id": "s-1",
            "type": "chunk",
            "agent_id": "claude",
            "sequence": 3,
            "text": "4",
        })
    );

    let status = Outbound::from(SessionEventFrame {
        session_id: SessionId::from("s-1"),
        event: StreamEvent::AgentStatus {
            agent_id: AgentId::from("gemini"),
            status: AgentStatus::TimedOut,
            error: Some("no chunk for 120s".to_string()),
        },
    });
    assert_eq!(
        serde_json::to_value(&status)?,
        json!({
            "session_id": "s-1",
            "type": "agent_status",
            "agent_id": "gemini",
            "status": "timed_out",
            "error": "no chunk for 120s",
        })
    );

    let error = ServerFrame::error(None, &DebateError::invalid_request("prompt is empty"));
    assert_eq!(
        serde_json::to_value(&error)?,
        json!({
            "type": "error",
            "code": "invalid_request",
            "message": "Invalid request: prompt is empty",
        })
    );
    assert_eq!(serde_json::to_value(ServerFrame::Pong)?, json!({"type": "pong"}));
    Ok(())
}

#[test]
fn test_session_event_frame_round_trips_through_flatten() -> anyhow::Result<()> {
    let frame: SessionEventFrame = serde_json::from_value(json!({
        "session_id": "s-1",
        "type": "synthesis_chunk",
        "sequence": 1,
        "text": "## Consensus Points",
    }))?;
    assert_eq!(
        frame.event,
        StreamEvent::SynthesisChunk {
            sequence: 1,
            text: "## Consensus Points".to_string()
        }
    );
    Ok(())
}

#[tokio::test]
async fn test_health_endpoint() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let drivers = DriverSet::new(Arc::new(ScriptedDriver::replying(
        Duration::from_millis(10),
        "ok",
    )));
    let manager = Arc::new(SessionManager::new(drivers, OrchestratorOptions::default()));

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(gateway::serve(listener, manager, async {
        let _ = stop_rx.await;
    }));

    let mut stream = TcpStream::connect(addr).await?;
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await?;
    let mut response = String::new();
    stream.read_to_string(&mut response).await?;

    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains(r#""status":"ok""#), "{response}");
    assert!(response.contains(r#""sessions":0"#), "{response}");

    let _ = stop_tx.send(());
    server.await??;
    Ok(())
}
