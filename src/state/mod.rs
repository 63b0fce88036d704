//! State module for tracking session lifecycle
//!
//! # Components
//!
//! - `SessionState`: Running, Stopping or Terminated
//! - `StopReason`: why a session stopped (drained, requested, shutdown)

mod session_state;

// Re-export main types
pub use session_state::{SessionState, StopReason};
