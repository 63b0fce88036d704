//! Visited events and the JSON-lines event stream adapter

use serde::{Deserialize, Serialize};
use std::io::Write;

/// One completed fetch, as reported to the session's consumer
///
/// `links` holds every in-scope outbound link found on the page, in document
/// order, including links that were not enqueued because of the depth limit or
/// an earlier claim. Consumers do their own aggregation.
///
/// Serializes as `{"visited": url, "depth": n, "links": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitedEvent {
    /// The page that was fetched
    #[serde(rename = "visited")]
    pub url: String,

    /// Hop count from the session root
    pub depth: u32,

    /// Outbound links discovered on the page
    pub links: Vec<String>,
}

impl VisitedEvent {
    pub fn new(url: impl Into<String>, depth: u32, links: Vec<String>) -> Self {
        Self {
            url: url.into(),
            depth,
            links,
        }
    }
}

/// Writes one event as a single JSON line and flushes
///
/// Flushing per event keeps the stream live for a consumer reading a pipe.
pub fn write_event_line<W: Write>(out: &mut W, event: &VisitedEvent) -> std::io::Result<()> {
    serde_json::to_writer(&mut *out, event)?;
    out.write_all(b"\n")?;
    out.flush()
}
