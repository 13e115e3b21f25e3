//! Helper functions for session status aggregation
//!
//! Pure functions, kept apart from the supervisor task so they can be
//! reasoned about (and tested) on their own.

use crate::types::{AgentStatus, SessionStatus, SynthesisState};

/// Overall terminal status of a session
///
/// # Arguments
/// * `cancelled` - whether the session's cancellation token fired
/// * `responders` - terminal status of every responder
/// * `synthesis` - terminal coordinator state
pub(crate) fn aggregate_status(
    cancelled: bool,
    responders: &[AgentStatus],
    synthesis: SynthesisState,
) -> SessionStatus {
    let interrupted = responders.contains(&AgentStatus::Cancelled)
        || synthesis == SynthesisState::Cancelled;
    if cancelled && interrupted {
        return SessionStatus::Cancelled;
    }

    let completed = responders.iter().filter(|s| s.is_success()).count();
    match synthesis {
        SynthesisState::Done if completed == responders.len() => SessionStatus::Completed,
        SynthesisState::Done => SessionStatus::PartiallyCompleted,
        SynthesisState::Failed if completed > 0 => SessionStatus::PartiallyCompleted,
        SynthesisState::Cancelled => SessionStatus::Cancelled,
        SynthesisState::Skipped
        | SynthesisState::Failed
        | SynthesisState::Idle
        | SynthesisState::Waiting
        | SynthesisState::Running => SessionStatus::Failed,
    }
}

/// Page through a buffer
///
/// # Pagination Modes
/// - offset >= 0: Start from position N, take `length` items
/// - offset < 0: Tail mode - take last |offset| items
pub(crate) fn paginate<T: Clone>(items: &[T], offset: i64, length: usize) -> Vec<T> {
    if offset >= 0 {
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        items.iter().skip(start).take(length).cloned().collect()
    } else {
        let tail = usize::try_from(offset.unsigned_abs()).unwrap_or(usize::MAX);
        let start = items.len().saturating_sub(tail);
        items[start..].to_vec()
    }
}

/// Whether anything lies beyond the returned page
///
/// Tail reads never report more.
pub(crate) fn calculate_has_more(offset: i64, returned: usize, total: usize) -> bool {
    match usize::try_from(offset) {
        Ok(start) => start.saturating_add(returned) < total,
        Err(_) => false,
    }
}

