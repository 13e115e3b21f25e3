//! Configuration constants for the command driver

use std::time::Duration;

/// Default maximum length of one JSON line on the program's stdout (1MB)
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

/// Dangerous environment variables that should not be passed to the program
///
/// These variables can affect how the subprocess loads and executes code,
/// potentially creating security vulnerabilities.
pub const DANGEROUS_ENV_VARS: &[&str] = &[
    "LD_PRELOAD",
    "LD_LIBRARY_PATH",
    "DYLD_INSERT_LIBRARIES",
    "DYLD_LIBRARY_PATH",
    "PATH",
    "NODE_OPTIONS",
    "PYTHONPATH",
    "PERL5LIB",
    "RUBYLIB",
];

/// Environment variable carrying the agent id
pub const AGENT_ENV_VAR: &str = "DEBATE_AGENT";

/// Environment variable carrying the agent's profile directory
pub const PROFILE_ENV_VAR: &str = "DEBATE_PROFILE_DIR";

/// Argument appended for readiness checks
pub const CHECK_ARG: &str = "--check";

/// How long a readiness check may run
pub const READY_CHECK_TIMEOUT: Duration = Duration::from_secs(30);

/// How long to wait for the program to exit after stdout closes or a cancel
pub const KILL_GRACE: Duration = Duration::from_secs(5);
