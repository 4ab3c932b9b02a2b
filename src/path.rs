//! Canonical path handling.
//!
//! Every lock and store operation keys on a canonical absolute path: a
//! single leading slash, duplicate slashes collapsed, no trailing slash
//! except for the root itself, and `.`/`..` segments resolved. `..` never
//! escapes the root. Percent-escapes are decoded before normalization so
//! that `/a%20b` and `/a b` address the same resource.

/// Normalize a raw request path into canonical absolute form.
pub fn normalize(raw: &str) -> String {
    let decoded = percent_decode(raw);
    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Split a path into its canonical segment list. The root is the empty list.
pub fn split(path: &str) -> Vec<String> {
    let canonical = normalize(path);
    if canonical == "/" {
        return Vec::new();
    }
    canonical[1..].split('/').map(str::to_string).collect()
}

/// Parent of a canonical path; `None` for the root.
pub fn parent(path: &str) -> Option<String> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/".to_string()),
        Some(idx) => Some(path[..idx].to_string()),
        None => None,
    }
}

/// Append a child name to a canonical directory path.
pub fn join(base: &str, name: &str) -> String {
    if base == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", base, name)
    }
}

/// Decode percent-escapes. Malformed escapes pass through untouched.
fn percent_decode(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && let (Some(hi), Some(lo)) = (
                bytes.get(i + 1).copied().and_then(hex_value),
                bytes.get(i + 2).copied().and_then(hex_value),
            )
        {
            out.push(hi * 16 + lo);
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
