//! Configuration module for Sumi-Stream
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every table is optional, so an empty file (or no file at all) yields the defaults.
//!
//! # Example
//!
//! ```no_run
//! use sumi_stream::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sumi-stream.toml")).unwrap();
//! println!("Backoff ceiling: {:?}", config.backoff.max_delay());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{BackoffConfig, Config, CrawlerConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::{validate, validate_worker_count};
