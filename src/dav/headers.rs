//! WebDAV request header parsing.

use axum::http::HeaderMap;

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Parse the Depth header for LOCK: `0` means the exact path, anything
/// else — including an absent header — means full-subtree inheritance.
pub fn lock_depth(headers: &HeaderMap, max_depth: u32) -> u32 {
    match header_str(headers, "Depth") {
        Some("0") => 0,
        _ => max_depth,
    }
}

/// Parse the Depth header for PROPFIND. Listings are capped at one level,
/// so `0` stays 0 and both `1` and `infinity` become 1.
pub fn propfind_depth(headers: &HeaderMap) -> u32 {
    match header_str(headers, "Depth") {
        Some("0") => 0,
        _ => 1,
    }
}

/// Parse the Timeout header into a lock duration in seconds.
///
/// Accepted forms: `Second-N`, `Infinity` (any case), a bare integer, or a
/// comma-separated list where the first entry wins. An absent header means
/// the default; an unparsable value means the maximum; a zero resets to the
/// default; everything is clamped to the maximum.
pub fn lock_timeout(headers: &HeaderMap, default_secs: u64, max_secs: u64) -> u64 {
    let Some(raw) = header_str(headers, "Timeout") else {
        return default_secs;
    };
    let first = raw.split(',').next().unwrap_or(raw).trim();
    let mut secs = if let Some(number) = first.strip_prefix("Second-") {
        number.parse().unwrap_or(max_secs)
    } else if first.eq_ignore_ascii_case("infinity") {
        max_secs
    } else {
        first.parse().unwrap_or(max_secs)
    };
    if secs == 0 {
        secs = default_secs;
    }
    secs.min(max_secs)
}

/// Concatenated If + Lock-Token header values. Lock tokens are matched by
/// substring containment against this blob, not by parsing the If grammar.
pub fn presented_tokens(headers: &HeaderMap) -> String {
    format!(
        "{}{}",
        header_str(headers, "If").unwrap_or(""),
        header_str(headers, "Lock-Token").unwrap_or("")
    )
}

/// The Lock-Token header value alone; UNLOCK removes only what it names.
pub fn lock_token(headers: &HeaderMap) -> String {
    header_str(headers, "Lock-Token").unwrap_or("").to_string()
}

/// Overwrite header: only a literal `T` (the default when absent) allows
/// replacing an existing destination.
pub fn overwrite(headers: &HeaderMap) -> bool {
    match header_str(headers, "Overwrite") {
        None => true,
        Some(value) => value.eq_ignore_ascii_case("t"),
    }
}

/// Destination header resolved to a canonical local path. A
/// `scheme://host[:port]` prefix is stripped when present.
pub fn destination(headers: &HeaderMap) -> Option<String> {
    let raw = header_str(headers, "Destination")?;
    let local = match raw.find("://") {
        Some(idx) => {
            let rest = &raw[idx + 3..];
            match rest.find('/') {
                Some(slash) => &rest[slash..],
                None => "/",
            }
        }
        None => raw,
    };
    Some(crate::path::normalize(local))
}
