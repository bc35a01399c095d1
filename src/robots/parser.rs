//! Robots.txt parsing: `can_fetch` via the `robotstxt` crate, plus a manual
//! scanner for the `Crawl-delay`/`Request-rate` extensions the crate doesn't
//! expose.

use robotstxt::DefaultMatcher;

/// Parsed robots.txt content together with the extensions the `robotstxt`
/// crate does not parse for us.
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    content: String,
    allow_all: bool,
}

impl ParsedRobots {
    /// Builds a `ParsedRobots` from raw robots.txt body text.
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
            allow_all: false,
        }
    }

    /// A permissive instance used when no `robots.txt` exists for a host.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            allow_all: true,
        }
    }

    /// Checks whether `url`'s path is allowed for `user_agent` under RFC 9309 semantics.
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.allow_all || self.content.is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }

    /// Returns the declared `Crawl-delay`, in seconds, for the first block whose
    /// `User-agent` matches (case-insensitively) `user_agent` or `*`.
    ///
    /// `robotstxt::DefaultMatcher` doesn't expose this RFC 9309 extension, so
    /// it's pulled out with a small line-oriented scan over the raw text,
    /// taking the first declared value for the matching block.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        scan_directive(&self.content, user_agent, "crawl-delay").and_then(|v| v.parse().ok())
    }

    /// Returns the declared `Request-rate`, converted to seconds-per-request
    /// (`seconds / requests`), for the first matching block.
    pub fn request_rate(&self, user_agent: &str) -> Option<f64> {
        let raw = scan_directive(&self.content, user_agent, "request-rate")?;
        let (requests, seconds) = raw.split_once('/')?;
        let requests: f64 = requests.trim().parse().ok()?;
        let seconds: f64 = seconds.trim().parse().ok()?;
        if requests <= 0.0 {
            return None;
        }
        Some(seconds / requests)
    }
}

/// Extracts the product token a robots.txt matcher compares `User-agent:`
/// lines against — the portion of a descriptive UA string up to the first
/// `/` or whitespace, per RFC 9309's matching algorithm (`iSearch/1.0
/// (+https://example.com; contact@example.com)` -> `isearch`). Without this,
/// a full descriptive UA would never match a `User-agent: iSearch` group,
/// only the wildcard `*` one.
fn product_token(user_agent: &str) -> String {
    user_agent
        .split(['/', ' '])
        .next()
        .unwrap_or(user_agent)
        .to_ascii_lowercase()
}

/// Scans `content` for the first `directive:` value inside a block addressed
/// to `user_agent` or `*`. A block starts at a `User-agent:` line and runs
/// until the next `User-agent:` line that isn't immediately preceded by
/// another `User-agent:` line (i.e. until the group ends).
fn scan_directive(content: &str, user_agent: &str, directive: &str) -> Option<String> {
    let user_agent = product_token(user_agent);
    let mut current_agents: Vec<String> = Vec::new();
    let mut in_new_group = true;
    let mut block_matches = false;

    for line in content.lines() {
        let line = strip_comment(line).trim();
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        if key == "user-agent" {
            if !in_new_group {
                current_agents.clear();
                block_matches = false;
            }
            current_agents.push(value.to_ascii_lowercase());
            block_matches = current_agents
                .iter()
                .any(|a| a == "*" || *a == user_agent);
            in_new_group = true;
            continue;
        }

        in_new_group = false;

        if block_matches && key == directive {
            return Some(value.to_string());
        }
    }

    None
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}
