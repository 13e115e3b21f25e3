//! Session management
//!
//! Provides `SessionManager` for starting, observing and cancelling
//! concurrent debate sessions, with status aggregation and automatic
//! eviction of finished sessions.
//!
//! # Module Structure
//!
//! - `session_manager` - Core `SessionManager` with public API
//! - `session` - Session state structures
//! - `background` - Session supervisor task
//! - `helpers` - Pure helpers for status aggregation and pagination

mod background;
mod helpers;
mod session;
mod session_manager;

pub use session_manager::SessionManager;
