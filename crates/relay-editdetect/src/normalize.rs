use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://\S+").expect("static URL regex is valid"));

/// Normalizes text for edit-detection comparison: NFKC-fold + lowercase,
/// strip URLs, strip zero-width/variation-selector codepoints, collapse
/// whitespace, trim.
///
/// Deterministic and idempotent: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let no_urls = URL_RE.replace_all(&lowered, "");
    let filtered: String = no_urls.chars().filter(|c| !is_invisible(*c)).collect();
    let collapsed = collapse_whitespace(&filtered);
    collapsed.trim().to_string()
}

fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{200B}'..='\u{200D}' | '\u{FEFF}' | '\u{FE0E}' | '\u{FE0F}'
    )
}

fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_space = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out
}

/// SHA-256 hex digest of normalized text.
pub fn hash(normalized: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

/// Jaccard similarity over word-shingles of size 3.
///
/// Returns 0.0 when either input has fewer than 3 words (no shingles to
/// compare); this is a degenerate-but-safe default, not a match.
pub fn jaccard_shingle_similarity(a: &str, b: &str) -> f64 {
    let shingles_a = word_shingles(a, 3);
    let shingles_b = word_shingles(b, 3);
    if shingles_a.is_empty() || shingles_b.is_empty() {
        return 0.0;
    }

    let intersection = shingles_a.intersection(&shingles_b).count();
    let union = shingles_a.union(&shingles_b).count();
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

fn word_shingles(text: &str, size: usize) -> std::collections::HashSet<Vec<&str>> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut shingles = std::collections::HashSet::new();
    if words.len() < size {
        return shingles;
    }
    for window in words.windows(size) {
        shingles.insert(window.to_vec());
    }
    shingles
}
