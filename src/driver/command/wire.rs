//! Line protocol spoken by automation programs on stdout
//!
//! One JSON object per line:
//!
//! ```text
//! {"type":"chunk","text":"partial answer"}
//! {"type":"chunk","text":" tail","final":true}
//! {"type":"error","message":"login required"}
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One decoded stdout line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireEvent {
    /// Response delta
    Chunk {
        /// Text delta
        text: String,
        /// Terminal chunk marker
        #[serde(default, rename = "final")]
        is_final: bool,
    },
    /// Terminal failure
    Error {
        /// Failure description
        message: String,
    },
}

/// Decode one line; blank lines yield `None`
///
/// # Errors
/// Returns `JsonDecode` if the line is not a valid event
pub fn parse_line(line: &str) -> Result<Option<WireEvent>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(line)?))
}
