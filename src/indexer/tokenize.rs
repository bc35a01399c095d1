//! Phase 2 — tokenisation (§4.I): turns one page's content into a multiset
//! of index terms.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

/// Matches a run of word characters, hyphens, or underscores — the token
/// shape the indexer counts before stopword/length/gibberish filtering.
static TERM_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z0-9_-]+").expect("static regex"));

/// Punctuation stripped before term matching, beyond what the regex already
/// excludes — kept explicit so the set matches the written specification
/// rather than relying on regex negation alone.
const PUNCTUATION: &[char] = &['.', '?', '!', ',', ':', ';', '—', '(', ')', '[', ']', '{', '}', '\'', '"', '/', '*', '&', '~', '+'];

/// Terms of this length or shorter are dropped outright (spec: len <= 1).
const MIN_TERM_LEN: usize = 1;
/// Terms of this length or longer are dropped outright (spec: len >= 30).
const MAX_TERM_LEN: usize = 30;
/// Above this length the gibberish filter (vowel/digit ratio) kicks in.
const GIBBERISH_LEN_THRESHOLD: usize = 20;

/// Counts occurrences of each surviving term in `content`, for one page.
pub fn tokenize(content: &str, stopwords: &HashSet<String>) -> HashMap<String, u32> {
    let ascii_only: String = content.chars().filter(|c| c.is_ascii()).collect();
    let cleaned: String = ascii_only
        .chars()
        .filter(|c| !PUNCTUATION.contains(c))
        .collect();

    let mut counts = HashMap::new();
    for m in TERM_PATTERN.find_iter(&cleaned) {
        let term = m.as_str().to_ascii_lowercase();
        if !keep_term(&term, stopwords) {
            continue;
        }
        *counts.entry(term).or_insert(0u32) += 1;
    }
    counts
}

fn keep_term(term: &str, stopwords: &HashSet<String>) -> bool {
    let len = term.chars().count();
    if len <= MIN_TERM_LEN || len >= MAX_TERM_LEN {
        return false;
    }
    if stopwords.contains(term) {
        return false;
    }
    if len > GIBBERISH_LEN_THRESHOLD && is_gibberish(term, len) {
        return false;
    }
    true
}

/// Drops long tokens dominated by vowels or digits rather than real words —
/// catches things like hashes and filler strings that survive the regex.
///
/// The thresholds follow the original implementation's formula literally
/// (`vowels + 1 < len / 2`, `digits + 1 < len / 2`), not the worked example
/// in this system's own written specification, which describes the
/// opposite direction for an all-vowel token. The original's behavior is
/// the ground truth here; an all-vowel or all-digit run of this length
/// satisfies neither `vowel_heavy` nor `digit_heavy` under this formula and
/// so is *not* dropped by this filter (it is still subject to the
/// MIN_TERM_LEN/MAX_TERM_LEN and stopword checks in `keep_term`).
fn is_gibberish(term: &str, len: usize) -> bool {
    let vowels = term.chars().filter(|c| "aeiouAEIOU".contains(*c)).count();
    let digits = term.chars().filter(|c| c.is_ascii_digit()).count();

    let vowel_heavy = vowels > 7 && vowels + 1 < len / 2;
    let digit_heavy = digits > 5 && digits + 1 < len / 2;
    vowel_heavy || digit_heavy
}

/// Loads a stopword list, one word per line, ignoring blank lines and lines
/// starting with `#`.
pub fn load_stopwords(content: &str) -> HashSet<String> {
    content
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.to_ascii_lowercase())
        .collect()
}
