//! URL handling module for Sumi-Stream
//!
//! This module provides the canonicalization used by the visited registry,
//! host extraction for link scoping, and validation of session root URLs.

mod domain;
mod normalize;

use crate::{UrlError, ValidationError};
use url::Url;

// Re-export main functions
pub use domain::{extract_domain, is_same_host};
pub use normalize::{canonical_key, canonicalize};

/// Validates and canonicalizes a session root URL
///
/// This is the synchronous gate a session passes before any worker starts.
///
/// # Examples
///
/// ```
/// use sumi_stream::url::validate_root_url;
///
/// assert!(validate_root_url("https://example.test/a").is_ok());
/// assert!(validate_root_url("mailto:someone@example.test").is_err());
/// ```
pub fn validate_root_url(root: &str) -> Result<Url, ValidationError> {
    canonicalize(root).map_err(|e| match e {
        UrlError::Parse(reason) => ValidationError::InvalidUrl {
            url: root.to_string(),
            reason,
        },
        UrlError::InvalidScheme(scheme) => ValidationError::UnsupportedScheme { scheme },
        UrlError::MissingDomain => ValidationError::MissingHost {
            url: root.to_string(),
        },
    })
}
