//! URL canonicalisation.
//!
//! Two URLs that differ only by tracking parameters, trailing slash, or
//! fragment must compare equal after [`canonicalise`] so the frontier's
//! `seen` set can deduplicate them.

use url::Url;

use crate::{UrlError, UrlResult};

/// Query parameter keys stripped during canonicalisation, lowercased.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "ref",
    "source",
    "ref_source",
    "_hsfp",
    "_hssc",
    "_hstc",
    "gclid",
    "fbclid",
    "e",
];

/// File extensions that are never worth fetching as HTML.
const BLOCKED_EXTENSIONS: &[&str] = &[".jpg", ".png", ".pdf", ".css", ".js", ".zip", ".exe"];

/// Schemes that are rejected outright, independent of the `http`/`https` allow-list.
const BLOCKED_SCHEMES: &[&str] = &["mailto", "tel"];

/// Parses and canonicalises a URL string.
///
/// Canonical form: scheme/host/path unchanged except for a stripped trailing
/// `/` (root `/` is kept), fragment removed, and tracking query parameters
/// removed while the order and multiplicity of the remaining parameters is
/// preserved. Canonicalisation is idempotent: re-running it on its own
/// output is a no-op.
///
/// Rejects anything that isn't `http`/`https`, has an empty host, or whose
/// path or scheme marks it as non-HTML (blocked extension, `mailto:`,
/// `tel:`).
pub fn canonicalise(raw: &str) -> UrlResult<Url> {
    let url = Url::parse(raw).map_err(|e| UrlError::Parse(e.to_string()))?;
    canonicalise_url(url)
}

/// Resolves `href` against `base`, then canonicalises the result.
pub fn resolve_and_canonicalise(href: &str, base: &Url) -> UrlResult<Url> {
    let joined = base
        .join(href)
        .map_err(|e| UrlError::Parse(e.to_string()))?;
    canonicalise_url(joined)
}

fn canonicalise_url(mut url: Url) -> UrlResult<Url> {
    let scheme = url.scheme();
    if BLOCKED_SCHEMES.contains(&scheme) {
        return Err(UrlError::Blocked(scheme.to_string()));
    }
    if scheme != "http" && scheme != "https" {
        return Err(UrlError::InvalidScheme(scheme.to_string()));
    }
    if url.host_str().map(str::is_empty).unwrap_or(true) {
        return Err(UrlError::MissingDomain);
    }

    let path_lower = url.path().to_ascii_lowercase();
    if BLOCKED_EXTENSIONS.iter().any(|ext| path_lower.ends_with(ext)) {
        return Err(UrlError::Blocked(path_lower));
    }

    url.set_fragment(None);

    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !TRACKING_PARAMS.contains(&k.to_ascii_lowercase().as_str()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if retained.is_empty() {
        url.set_query(None);
    } else {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (k, v) in &retained {
            pairs.append_pair(k, v);
        }
        drop(pairs);
    }

    strip_trailing_slash(&mut url);

    Ok(url)
}

fn strip_trailing_slash(url: &mut Url) {
    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/').to_string();
        url.set_path(&trimmed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_trailing_slash() {
        let url = canonicalise("https://example.com/page/").unwrap();
        assert_eq!(url.as_str(), "https://example.com/page");
    }

    #[test]
    fn keeps_root_slash() {
        let url = canonicalise("https://example.com/").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn strips_fragment() {
        let url = canonicalise("https://example.com/page#section").unwrap();
        assert_eq!(url.as_str(), "https://example.com/page");
    }

    #[test]
    fn drops_tracking_params_preserving_order() {
        let url = canonicalise("https://d.test/x?utm_source=a&id=7&fbclid=z").unwrap();
        assert_eq!(url.as_str(), "https://d.test/x?id=7");
    }

    #[test]
    fn dedupes_across_different_tracking_values() {
        let a = canonicalise("https://d.test/x?utm_source=a&id=7").unwrap();
        let b = canonicalise("https://d.test/x?utm_source=b&id=7").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn preserves_multiplicity_and_order_of_kept_params() {
        let url = canonicalise("https://example.com/?b=2&a=1&b=3").unwrap();
        assert_eq!(url.as_str(), "https://example.com/?b=2&a=1&b=3");
    }

    #[test]
    fn rejects_non_http_scheme() {
        assert!(canonicalise("ftp://example.com/").is_err());
    }

    #[test]
    fn rejects_mailto() {
        assert!(canonicalise("mailto:someone@example.com").is_err());
    }

    #[test]
    fn rejects_blocked_extension() {
        assert!(canonicalise("https://example.com/file.pdf").is_err());
    }

    #[test]
    fn rejects_empty_host() {
        assert!(canonicalise("file:///etc/passwd").is_err());
    }

    #[test]
    fn is_idempotent() {
        let once = canonicalise("https://example.com/page/?utm_source=x&id=1#frag").unwrap();
        let twice = canonicalise(once.as_str()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn resolve_relative_href() {
        let base = Url::parse("https://example.com/dir/page").unwrap();
        let resolved = resolve_and_canonicalise("other", &base).unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/dir/other");
    }
}
