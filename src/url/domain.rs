use url::Url;

/// Extracts the lower-cased host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_stream::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true when `link` is on the same host as `root`
///
/// Ports and schemes are ignored: `http://a.test/x` and `https://a.test:8443/y`
/// are on the same host. Unparseable links are never in scope.
pub fn is_same_host(root: &Url, link: &str) -> bool {
    let Ok(link) = Url::parse(link) else {
        return false;
    };

    match (extract_domain(root), extract_domain(&link)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_subdomain() {
        let url = Url::parse("https://blog.example.com/post").unwrap();
        assert_eq!(extract_domain(&url), Some("blog.example.com".to_string()));
    }

    #[test]
    fn test_extract_with_port() {
        let url = Url::parse("https://example.com:8080/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_same_host() {
        let root = Url::parse("https://example.test/a").unwrap();
        assert!(is_same_host(&root, "https://example.test/b"));
        assert!(is_same_host(&root, "http://EXAMPLE.test:8080/c"));
    }

    #[test]
    fn test_different_host() {
        let root = Url::parse("https://example.test/a").unwrap();
        assert!(!is_same_host(&root, "https://other.test/b"));
        assert!(!is_same_host(&root, "https://sub.example.test/b"));
        assert!(!is_same_host(&root, "not a url"));
    }
}
