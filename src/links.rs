//! Text normalization for user-supplied fields and the site-link list.
//!
//! All functions are pure: no I/O, no allocation of sessions, easy to test.
//!
//! | Input | Rule |
//! |---|---|
//! | Title / description | trim, `<` → `&lt;`, `>` → `&gt;`, nothing else |
//! | Site URL | trim, strip every trailing `/` |
//! | Site links | one per line, trimmed, empty lines dropped, only absolute `http(s)` URLs kept, homepage forced to index 0 |

use reqwest::Url;

/// Trim and escape the two characters that would open markup.
///
/// This is not an HTML sanitizer; it only stops a field from injecting tags
/// into the generated documents.
pub fn sanitize_text(raw: &str) -> String {
    raw.trim().replace('<', "&lt;").replace('>', "&gt;")
}

/// Trim whitespace and strip trailing slashes.
pub fn canonicalize_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

/// Whether `candidate` parses as an absolute `http` or `https` URL with a host.
pub fn is_web_url(candidate: &str) -> bool {
    Url::parse(candidate)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
        .unwrap_or(false)
}

/// Parse the newline-delimited link list against the canonical site URL.
///
/// Lines that do not parse are dropped silently. The result always starts
/// with `canonical`: if no valid line remains it is the only entry, and any
/// homepage line the user wrote (with or without trailing slash) is moved to
/// the front instead of being duplicated.
pub fn parse_site_links(raw: &str, canonical: &str) -> Vec<String> {
    let mut links: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| is_web_url(line))
        .filter(|line| !is_homepage(line, canonical))
        .map(str::to_string)
        .collect();

    links.insert(0, canonical.to_string());
    links
}

fn is_homepage(line: &str, canonical: &str) -> bool {
    line.trim_end_matches('/') == canonical
}

/// Append a trailing slash unless one is already present.
pub fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}
