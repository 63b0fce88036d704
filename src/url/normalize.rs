use crate::{UrlError, UrlResult};
use url::Url;

/// Canonicalizes a URL into the form used as a visited-set key
///
/// The same canonical form is what gets enqueued and fetched, so two links that
/// canonicalize identically are crawled once.
///
/// # Canonicalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only http and https
/// 3. Scheme and host are lower-cased, default ports dropped (done by `url`)
/// 4. Normalize path:
///    - Remove dot segments (. and ..)
///    - Collapse repeated slashes
///    - Remove trailing slash (except for root /)
///    - Empty path becomes /
/// 5. Remove fragment (everything after #)
/// 6. Remove empty query string (trailing ?)
///
/// Query parameter order is kept and `www.` is not stripped: both can change
/// which resource a server returns.
///
/// # Examples
///
/// ```
/// use sumi_stream::url::canonicalize;
///
/// let url = canonicalize("HTTP://Example.TEST:80/a//b/#top").unwrap();
/// assert_eq!(url.as_str(), "http://example.test/a/b");
/// ```
pub fn canonicalize(url_str: &str) -> UrlResult<Url> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query() == Some("") {
        url.set_query(None);
    }

    Ok(url)
}

/// Canonicalizes a URL and returns it as an owned string key
pub fn canonical_key(url_str: &str) -> UrlResult<String> {
    canonicalize(url_str).map(String::from)
}

/// Normalizes a URL path by removing dot segments, empty segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut normalized_segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            // Skip empty segments (from multiple slashes) and current directory markers
            "" | "." => continue,
            ".." => {
                normalized_segments.pop();
            }
            _ => normalized_segments.push(segment),
        }
    }

    if normalized_segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", normalized_segments.join("/"))
}
