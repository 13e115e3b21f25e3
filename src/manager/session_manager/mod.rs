//! Session manager implementation
//!
//! This module is organized into logical submodules:
//! - `core`: Core struct, constructors, and lifecycle management
//! - `start`: Session start and request validation
//! - `status`: Snapshots, waiting and output pagination
//! - `control`: Cancellation and subscriptions
//! - `list`: Session listing and driver readiness

mod control;
mod core;
mod list;
mod start;
mod status;

pub use core::SessionManager;
