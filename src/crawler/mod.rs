//! Crawl session engine
//!
//! This module contains the core crawling logic, including:
//! - The shared frontier queue, visited registry and backoff coordinator
//! - The fetch worker loop
//! - Session lifecycle and the process-wide session registry
//! - The fetch capability and its reqwest implementation

mod backoff;
mod fetcher;
mod frontier;
mod parser;
mod registry;
mod session;
mod visited;
mod worker;

pub use backoff::{BackoffCoordinator, BackoffState};
pub use fetcher::{build_http_client, Fetcher, HttpFetcher, PageFetch};
pub use frontier::{Frontier, FrontierItem};
pub use parser::extract_links;
pub use registry::SessionRegistry;
pub use session::{validate_max_depth, CrawlSession, SessionKey};
pub use visited::VisitedRegistry;
