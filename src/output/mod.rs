//! Output module for surfacing crawl progress
//!
//! This module handles:
//! - The `VisitedEvent` contract delivered to session consumers
//! - Writing events as JSON lines for a terminal or pipe consumer
//! - Per-session statistics

mod events;
pub mod stats;

pub use events::{write_event_line, VisitedEvent};
pub use stats::{print_statistics, SessionStats, StatsTracker};
