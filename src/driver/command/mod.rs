//! Driver backed by an external automation program
//!
//! One program per target site (plus a synthesis variant). For each
//! submission the program is spawned with the prompt on stdin and reports
//! its answer as line-delimited JSON on stdout (see [`wire`]).

pub mod config;
pub mod wire;

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_stream::stream;
use futures::StreamExt;
use futures::future::BoxFuture;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, Command};
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::sync::CancellationToken;

use self::config::{
    AGENT_ENV_VAR, CHECK_ARG, DANGEROUS_ENV_VARS, DEFAULT_MAX_LINE_BYTES, KILL_GRACE,
    PROFILE_ENV_VAR, READY_CHECK_TIMEOUT,
};
use self::wire::WireEvent;
use super::profiles::ProfileStore;
use super::{AgentDriver, DriverEvent, DriverStream};
use crate::error::{DebateError, Result};
use crate::types::AgentId;

/// Subprocess driver for one agent
#[derive(Clone)]
pub struct CommandDriver {
    agent: AgentId,
    program: PathBuf,
    args: Vec<String>,
    check_args: Vec<String>,
    env: HashMap<String, String>,
    cwd: Option<PathBuf>,
    profiles: Option<Arc<dyn ProfileStore>>,
    max_line_bytes: usize,
}

impl CommandDriver {
    /// Create a driver running `program` for `agent`
    pub fn new(agent: impl Into<AgentId>, program: impl Into<PathBuf>) -> Self {
        Self {
            agent: agent.into(),
            program: program.into(),
            args: Vec::new(),
            check_args: vec![CHECK_ARG.to_string()],
            env: HashMap::new(),
            cwd: None,
            profiles: None,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }

    /// Create a driver, resolving `program` through `PATH`
    ///
    /// # Errors
    /// Returns `DriverNotFound` if the executable cannot be located
    pub fn find(agent: impl Into<AgentId>, program: &str) -> Result<Self> {
        let path = which::which(program)
            .map_err(|e| DebateError::driver_not_found(format!("{program}: {e}")))?;
        Ok(Self::new(agent, path))
    }

    /// Append one argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Arguments appended (after the regular ones) for readiness checks
    #[must_use]
    pub fn check_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.check_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set an environment variable (dangerous loader variables are ignored)
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the working directory
    #[must_use]
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Consult `store` for the agent's profile directory
    #[must_use]
    pub fn profiles(mut self, store: Arc<dyn ProfileStore>) -> Self {
        self.profiles = Some(store);
        self
    }

    /// Set the maximum accepted stdout line length
    #[must_use]
    pub const fn max_line_bytes(mut self, max: usize) -> Self {
        self.max_line_bytes = max;
        self
    }

    /// Agent this driver serves
    #[must_use]
    pub const fn agent(&self) -> &AgentId {
        &self.agent
    }

    fn command(&self, extra: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).args(extra);

        // Set up environment - filter dangerous variables
        let mut process_env = env::vars().collect::<HashMap<_, _>>();
        for (key, value) in &self.env {
            if !DANGEROUS_ENV_VARS.contains(&key.as_str()) {
                process_env.insert(key.clone(), value.clone());
            }
        }
        process_env.insert(AGENT_ENV_VAR.to_string(), self.agent.to_string());
        if let Some(dir) = self
            .profiles
            .as_ref()
            .and_then(|store| store.profile_dir(&self.agent))
        {
            process_env.insert(PROFILE_ENV_VAR.to_string(), dir.to_string_lossy().to_string());
        }
        cmd.envs(process_env);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd.kill_on_drop(true);
        cmd
    }

    fn spawn(&self) -> Result<Child> {
        let mut cmd = self.command(&[]);
        // stderr is piped, never inherited, so the child cannot touch the
        // parent terminal
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd.spawn().map_err(|e| self.spawn_error(&e))
    }

    fn spawn_error(&self, e: &std::io::Error) -> DebateError {
        if e.kind() == std::io::ErrorKind::NotFound {
            DebateError::driver_not_found(self.program.display().to_string())
        } else {
            DebateError::agent_driver(
                self.agent.as_str(),
                format!("failed to start {}: {e}", self.program.display()),
            )
        }
    }
}

impl std::fmt::Debug for CommandDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDriver")
            .field("agent", &self.agent)
            .field("program", &self.program)
            .field("args", &self.args)
            .field("max_line_bytes", &self.max_line_bytes)
            .finish_non_exhaustive()
    }
}

impl AgentDriver for CommandDriver {
    fn submit(&self, prompt: String, cancel: CancellationToken) -> DriverStream {
        let spawned = self.spawn();
        let agent = self.agent.clone();
        let max_line_bytes = self.max_line_bytes;

        Box::pin(stream! {
            let mut child = match spawned {
                Ok(child) => child,
                Err(e) => {
                    yield DriverEvent::Error(e.to_string());
                    return;
                }
            };

            let (Some(stdin), Some(stdout), Some(stderr)) =
                (child.stdin.take(), child.stdout.take(), child.stderr.take())
            else {
                yield DriverEvent::Error("failed to capture stdio handles".to_string());
                return;
            };

            tokio::spawn(drain_stderr(agent.clone(), stderr));
            tokio::spawn(write_prompt(agent.clone(), stdin, prompt));

            let mut lines = FramedRead::new(stdout, LinesCodec::new_with_max_length(max_line_bytes));
            let mut sequence = 0u64;
            let mut terminal = None;
            let mut cancelled = false;

            loop {
                let next = tokio::select! {
                    biased;
                    () = cancel.cancelled() => None,
                    line = lines.next() => Some(line),
                };
                let Some(line) = next else {
                    cancelled = true;
                    break;
                };

                let event = match line {
                    // EOF
                    None => break,
                    Some(Err(e)) => DriverEvent::Error(format!("reading output: {e}")),
                    Some(Ok(line)) => match wire::parse_line(&line) {
                        Ok(None) => continue,
                        Ok(Some(WireEvent::Chunk { text, is_final })) => {
                            sequence += 1;
                            DriverEvent::Chunk { sequence, text, is_final }
                        }
                        Ok(Some(WireEvent::Error { message })) => DriverEvent::Error(message),
                        Err(e) => DriverEvent::Error(format!("malformed output line: {e}")),
                    },
                };

                if event.is_terminal() {
                    terminal = Some(event);
                    break;
                }
                yield event;
            }

            if cancelled {
                log::debug!("[{agent}] Submission cancelled, killing driver process");
                let _ = child.kill().await;
                return;
            }

            match terminal {
                Some(event) => {
                    // The consumer drops this stream on the terminal event;
                    // the program keeps its grace period to finish up
                    tokio::spawn(async move {
                        let drain = tokio::time::timeout(KILL_GRACE, async {
                            while lines.next().await.is_some() {}
                        });
                        let (_, exit) = tokio::join!(drain, reap(&mut child));
                        log::debug!(
                            "[{agent}] Driver process finished: {}",
                            exit.as_deref().unwrap_or("unknown status")
                        );
                    });
                    yield event;
                }
                None => {
                    let exit = reap(&mut child).await;
                    yield DriverEvent::Error(format!(
                        "driver exited before a final chunk ({})",
                        exit.as_deref().unwrap_or("unknown status")
                    ));
                }
            }
        })
    }

    fn check_ready(&self) -> BoxFuture<'_, Result<bool>> {
        Box::pin(async move {
            let mut cmd = self.command(&self.check_args);
            cmd.stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null());
            let mut child = cmd.spawn().map_err(|e| self.spawn_error(&e))?;

            let waited = tokio::time::timeout(READY_CHECK_TIMEOUT, child.wait()).await;
            match waited {
                Ok(Ok(status)) => {
                    log::debug!("[{}] Readiness check exited with {status}", self.agent);
                    Ok(status.success())
                }
                Ok(Err(e)) => Err(DebateError::Io(e)),
                Err(_) => {
                    let _ = child.kill().await;
                    Err(DebateError::agent_timeout(
                        self.agent.as_str(),
                        "readiness check timed out",
                    ))
                }
            }
        })
    }
}

/// Wait for the program to exit, killing it after [`KILL_GRACE`]
async fn reap(child: &mut Child) -> Option<String> {
    let waited = tokio::time::timeout(KILL_GRACE, child.wait()).await;
    match waited {
        Ok(Ok(status)) => Some(status.to_string()),
        Ok(Err(e)) => {
            log::warn!("Failed to wait for driver process: {e}");
            None
        }
        Err(_) => {
            let _ = child.kill().await;
            Some("killed after grace period".to_string())
        }
    }
}

async fn write_prompt(agent: AgentId, mut stdin: ChildStdin, prompt: String) {
    if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
        log::debug!("[{agent}] Failed to write prompt to driver stdin: {e}");
        return;
    }
    let _ = stdin.shutdown().await;
}

async fn drain_stderr(agent: AgentId, stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        log::debug!("[{agent}] driver stderr: {line}");
    }
}
