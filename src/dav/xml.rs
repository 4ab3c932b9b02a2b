//! Minimal XML support for the WebDAV wire format.
//!
//! Covers exactly the fragments this server speaks: the lock-discovery and
//! multistatus documents it emits, and the `lockinfo` document a LOCK
//! request carries. Element matching is on the local name, so any namespace
//! prefix is accepted. Nothing here is a general XML implementation.

use crate::locks::LockEntry;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};

const XML_HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// Escape text content.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Fields extracted from a LOCK request body.
#[derive(Debug, Default)]
pub struct LockBody {
    /// Scope string from the first element under `lockscope`.
    pub scope: Option<String>,
    /// Type string from the first element under `locktype`.
    pub lock_type: Option<String>,
    /// Verbatim inner content of the `owner` element, when present.
    pub owner: Option<String>,
}

/// Best-effort extraction of lockscope / locktype / owner from a lockinfo
/// document.
///
/// Returns `None` when the body does not contain a `lockinfo` element at
/// all — the request is then a refresh. A present but incomplete body
/// yields a `LockBody` with the missing fields unset; the handler decides
/// what is fatal.
pub fn parse_lockinfo(body: &str) -> Option<LockBody> {
    let info = element_content(body, "lockinfo")?;
    let mut parsed = LockBody::default();
    if let Some(scope) = element_content(info, "lockscope") {
        parsed.scope = first_element_name(scope);
    }
    if let Some(lock_type) = element_content(info, "locktype") {
        parsed.lock_type = first_element_name(lock_type);
    }
    parsed.owner = element_content(info, "owner").map(|owner| owner.trim().to_string());
    Some(parsed)
}

/// Render the prop/lockdiscovery document for a lock entry.
pub fn lockdiscovery(entry: &LockEntry, max_depth: u32, now: DateTime<Utc>) -> String {
    let mut xml = String::from(XML_HEADER);
    xml.push_str("<D:prop xmlns:D=\"DAV:\"><D:lockdiscovery>");
    write_activelock(&mut xml, entry, max_depth, now);
    xml.push_str("</D:lockdiscovery></D:prop>");
    xml
}

/// Append the activelock fragment for one lock entry.
pub fn write_activelock(out: &mut String, entry: &LockEntry, max_depth: u32, now: DateTime<Utc>) {
    out.push_str("<D:activelock>");
    out.push_str(&format!(
        "<D:locktype><D:{}/></D:locktype>",
        escape(&entry.lock_type)
    ));
    out.push_str(&format!(
        "<D:lockscope><D:{}/></D:lockscope>",
        entry.scope.as_str()
    ));
    let depth = if entry.depth == max_depth { "Infinity" } else { "0" };
    out.push_str(&format!("<D:depth>{}</D:depth>", depth));
    // The owner may itself be an XML fragment supplied at lock time; it is
    // reproduced verbatim.
    out.push_str(&format!("<D:owner>{}</D:owner>", entry.owner));
    let remaining = (entry.expires_at(now) - now).num_seconds().max(0);
    out.push_str(&format!("<D:timeout>Second-{}</D:timeout>", remaining));
    out.push_str("<D:locktoken>");
    let mut tokens: Vec<&String> = entry.tokens.keys().collect();
    tokens.sort();
    for token in tokens {
        out.push_str(&format!(
            "<D:href>opaquelocktoken:{}</D:href>",
            escape(token)
        ));
    }
    out.push_str("</D:locktoken></D:activelock>");
}

/// Render a multistatus document with one response per (href, status) pair.
pub fn multistatus<'a>(entries: impl Iterator<Item = (&'a str, StatusCode)>) -> String {
    let mut xml = String::from(XML_HEADER);
    xml.push_str("<D:multistatus xmlns:D=\"DAV:\">");
    for (href, status) in entries {
        xml.push_str("<D:response>");
        xml.push_str(&format!("<D:href>{}</D:href>", escape(href)));
        xml.push_str(&format!(
            "<D:status>HTTP/1.1 {} {}</D:status>",
            status.as_u16(),
            status.canonical_reason().unwrap_or("")
        ));
        xml.push_str("</D:response>");
    }
    xml.push_str("</D:multistatus>");
    xml
}

/// Render a multistatus document whose responses carry the lock-discovery
/// property for each path.
pub fn propfind_multistatus(
    responses: &[(String, Vec<LockEntry>)],
    max_depth: u32,
    now: DateTime<Utc>,
) -> String {
    let mut xml = String::from(XML_HEADER);
    xml.push_str("<D:multistatus xmlns:D=\"DAV:\">");
    for (href, locks) in responses {
        xml.push_str("<D:response>");
        xml.push_str(&format!("<D:href>{}</D:href>", escape(href)));
        xml.push_str("<D:propstat><D:prop><D:lockdiscovery>");
        for entry in locks {
            write_activelock(&mut xml, entry, max_depth, now);
        }
        xml.push_str("</D:lockdiscovery></D:prop>");
        xml.push_str("<D:status>HTTP/1.1 200 OK</D:status></D:propstat>");
        xml.push_str("</D:response>");
    }
    xml.push_str("</D:multistatus>");
    xml
}

/// Inner content of the first element whose local name matches `local`.
/// Self-closing elements yield an empty string.
///
/// Matching close tags are found by scanning, so an element nested inside
/// another element of the same name is not handled — none of the documents
/// read here nest that way.
fn element_content<'a>(xml: &'a str, local: &str) -> Option<&'a str> {
    let mut search = 0;
    while let Some(rel) = xml[search..].find('<') {
        let start = search + rel;
        let rest = &xml[start + 1..];
        if rest.starts_with('/') || rest.starts_with('?') || rest.starts_with('!') {
            search = start + 1;
            continue;
        }
        let Some(tag_end) = rest.find('>') else {
            return None;
        };
        let tag = &rest[..tag_end];
        let self_closing = tag.ends_with('/');
        let name = tag
            .trim_end_matches('/')
            .split_whitespace()
            .next()
            .unwrap_or("");
        if local_name(name) == local {
            if self_closing {
                return Some("");
            }
            let content = &xml[start + 1 + tag_end + 1..];
            let close = find_close(content, local)?;
            return Some(&content[..close]);
        }
        search = start + 1 + tag_end;
    }
    None
}

/// Byte offset of the close tag for `local` within `xml`.
fn find_close(xml: &str, local: &str) -> Option<usize> {
    let mut search = 0;
    while let Some(rel) = xml[search..].find("</") {
        let start = search + rel;
        let rest = &xml[start + 2..];
        let end = rest.find('>')?;
        if local_name(rest[..end].trim()) == local {
            return Some(start);
        }
        search = start + 2 + end;
    }
    None
}

/// Name of the first child element, namespace prefix stripped.
fn first_element_name(xml: &str) -> Option<String> {
    let start = xml.find('<')?;
    let rest = &xml[start + 1..];
    if rest.starts_with('/') {
        return None;
    }
    let end = rest.find(|c: char| c == '>' || c == '/' || c.is_whitespace())?;
    Some(local_name(&rest[..end]).to_string())
}

fn local_name(name: &str) -> &str {
    match name.rfind(':') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_replaces_markup_characters() {
        assert_eq!(escape("a<b>&\"c\""), "a&lt;b&gt;&amp;&quot;c&quot;");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn parse_plain_lockinfo_body() {
        let body = r#"<?xml version="1.0" encoding="utf-8"?>
<lockinfo xmlns="DAV:">
  <lockscope><exclusive/></lockscope>
  <locktype><write/></locktype>
  <owner>Jane</owner>
</lockinfo>"#;

        let parsed = parse_lockinfo(body).unwrap();
        assert_eq!(parsed.scope.as_deref(), Some("exclusive"));
        assert_eq!(parsed.lock_type.as_deref(), Some("write"));
        assert_eq!(parsed.owner.as_deref(), Some("Jane"));
    }

    #[test]
    fn parse_namespaced_lockinfo_body() {
        let body = r#"<D:lockinfo xmlns:D="DAV:">
  <D:lockscope><D:shared/></D:lockscope>
  <D:locktype><D:write/></D:locktype>
</D:lockinfo>"#;

        let parsed = parse_lockinfo(body).unwrap();
        assert_eq!(parsed.scope.as_deref(), Some("shared"));
        assert_eq!(parsed.lock_type.as_deref(), Some("write"));
        assert!(parsed.owner.is_none());
    }

    #[test]
    fn owner_xml_fragment_is_preserved_verbatim() {
        let body = r#"<D:lockinfo xmlns:D="DAV:">
  <D:lockscope><D:exclusive/></D:lockscope>
  <D:locktype><D:write/></D:locktype>
  <D:owner><D:href>http://example.com/~jane</D:href></D:owner>
</D:lockinfo>"#;

        let parsed = parse_lockinfo(body).unwrap();
        assert_eq!(
            parsed.owner.as_deref(),
            Some("<D:href>http://example.com/~jane</D:href>")
        );
    }

    #[test]
    fn missing_scope_is_reported_not_fatal() {
        let body = r#"<lockinfo xmlns="DAV:"><locktype><write/></locktype></lockinfo>"#;

        let parsed = parse_lockinfo(body).unwrap();
        assert!(parsed.scope.is_none());
        assert_eq!(parsed.lock_type.as_deref(), Some("write"));
    }

    #[test]
    fn non_lockinfo_body_means_refresh() {
        assert!(parse_lockinfo("").is_none());
        assert!(parse_lockinfo("not xml at all").is_none());
        assert!(parse_lockinfo("<propfind xmlns=\"DAV:\"/>").is_none());
    }

    #[test]
    fn multistatus_lists_each_path() {
        let paths = vec!["/a".to_string(), "/a/b".to_string()];
        let xml = multistatus(paths.iter().map(|p| (p.as_str(), StatusCode::LOCKED)));

        assert!(xml.contains("<D:href>/a</D:href>"));
        assert!(xml.contains("<D:href>/a/b</D:href>"));
        assert_eq!(xml.matches("HTTP/1.1 423 Locked").count(), 2);
    }
}
