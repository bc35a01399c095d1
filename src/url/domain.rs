//! Host and registrable-domain extraction.

use url::Url;

/// Public suffixes longer than one label that the embedded heuristic
/// recognises. Anything not in this list falls back to a last-two-labels
/// guess, which is imprecise for other multi-label suffixes (e.g. `.co.il`)
/// but sufficient for this crawler's scope (see the registrable-domain
/// design note).
const KNOWN_MULTI_LABEL_SUFFIXES: &[&str] = &[
    "co.uk", "com.au", "co.jp", "org.uk", "gov.uk", "ac.uk", "co.nz", "com.br",
];

/// Returns the scheme-qualified authority of a URL, e.g. `https://docs.example.co.uk`.
///
/// This is the robots-cache key: two URLs sharing a host but differing in
/// path share one `robots.txt` fetch.
pub fn extract_host(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(format!("{}://{}", url.scheme(), host))
}

/// Collapses a URL's host to its registrable domain (public-suffix + 1 label),
/// e.g. `docs.example.co.uk` -> `example.co.uk`.
///
/// This is the politeness key used by the rate-limit governor and frontier
/// shuffle: subdomains of the same site share one rate limit.
pub fn extract_registrable_domain(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(registrable_domain_from_host(host))
}

fn registrable_domain_from_host(host: &str) -> String {
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 2 {
        return host.to_string();
    }

    for suffix in KNOWN_MULTI_LABEL_SUFFIXES {
        let suffix_labels: Vec<&str> = suffix.split('.').collect();
        if labels.len() > suffix_labels.len() {
            let tail = &labels[labels.len() - suffix_labels.len()..];
            if tail.iter().zip(suffix_labels.iter()).all(|(a, b)| a.eq_ignore_ascii_case(b)) {
                let reg_labels = &labels[labels.len() - suffix_labels.len() - 1..];
                return reg_labels.join(".");
            }
        }
    }

    labels[labels.len() - 2..].join(".")
}
