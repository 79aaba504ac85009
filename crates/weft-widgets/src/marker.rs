//! Inline widget markers.
//!
//! A marker is a self-contained token inside document source:
//!
//! ```text
//! @[github_gist](url="https://gist.github.com/someone/abc123")
//! ```
//!
//! The bracketed part is the widget type, the parenthesised part is an
//! attribute payload (see [`crate::attrs`]). Markers never span lines outside
//! of a quoted value escape, and the scanner honours quotes when looking for
//! the closing parenthesis, so values may contain `)`.
//!
//! All offsets are char offsets into the source.

use std::ops::Range;

use smol_str::SmolStr;

use crate::attrs::{self, Attributes};

pub const MARKER_OPEN: &str = "@[";

/// Characters allowed in a widget type identifier.
pub fn is_type_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/')
}

pub fn is_valid_type(widget_type: &str) -> bool {
    !widget_type.is_empty() && widget_type.chars().all(is_type_char)
}

/// A marker found in source text.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetMarker {
    pub widget_type: SmolStr,
    pub attributes: Attributes,
    /// Char range of the whole marker, `@` through `)`.
    pub range: Range<usize>,
    /// Marker text exactly as it appears in the source.
    pub raw: SmolStr,
}

impl WidgetMarker {
    /// Parse a string that must be exactly one marker.
    pub fn parse(raw: &str) -> Option<WidgetMarker> {
        let chars: Vec<char> = raw.chars().collect();
        let (marker, end) = marker_at(&chars, 0)?;
        (end == chars.len()).then_some(marker)
    }
}

/// Canonical marker text for a type and attributes.
pub fn format_marker(widget_type: &str, attributes: &Attributes) -> String {
    format!("{MARKER_OPEN}{widget_type}]({})", attrs::encode(attributes))
}

/// Find every marker in `text`, in source order.
///
/// Text that starts like a marker but is malformed (bad type characters,
/// missing parenthesis, unterminated payload) is left alone as plain text.
pub fn scan(text: &str) -> Vec<WidgetMarker> {
    let chars: Vec<char> = text.chars().collect();
    let mut markers = Vec::new();
    let mut pos = 0;
    while pos + 1 < chars.len() {
        if chars[pos] == '@' && chars[pos + 1] == '[' {
            if let Some((marker, end)) = marker_at(&chars, pos) {
                markers.push(marker);
                pos = end;
                continue;
            }
        }
        pos += 1;
    }
    markers
}

/// Try to read a marker starting at `start`. Returns it and the char offset
/// just past its closing parenthesis.
fn marker_at(chars: &[char], start: usize) -> Option<(WidgetMarker, usize)> {
    if chars.get(start) != Some(&'@') || chars.get(start + 1) != Some(&'[') {
        return None;
    }

    let type_start = start + 2;
    let mut pos = type_start;
    while chars.get(pos).is_some_and(|c| is_type_char(*c)) {
        pos += 1;
    }
    if pos == type_start || chars.get(pos) != Some(&']') || chars.get(pos + 1) != Some(&'(') {
        return None;
    }
    let type_end = pos;

    let payload_start = pos + 2;
    let payload_end = payload_close(chars, payload_start)?;
    let end = payload_end + 1;

    let widget_type: SmolStr = chars[type_start..type_end].iter().collect::<String>().into();
    let payload: String = chars[payload_start..payload_end].iter().collect();
    let raw: String = chars[start..end].iter().collect();

    Some((
        WidgetMarker {
            widget_type,
            attributes: attrs::decode(&payload),
            range: start..end,
            raw: raw.into(),
        },
        end,
    ))
}

/// Offset of the unquoted `)` closing a payload.
fn payload_close(chars: &[char], from: usize) -> Option<usize> {
    let mut in_quotes = false;
    let mut pos = from;
    while let Some(&c) = chars.get(pos) {
        match c {
            '\n' => return None,
            '\\' if in_quotes => pos += 1,
            '"' => in_quotes = !in_quotes,
            ')' if !in_quotes => return Some(pos),
            _ => {}
        }
        pos += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_finds_markers_with_char_ranges() {
        let text = "héllo @[github_gist](url=\"https://gist.github.com/a/1\") and @[cloud_widget](id=\"w1\")";
        let markers = scan(text);
        assert_eq!(markers.len(), 2);

        let gist = &markers[0];
        assert_eq!(gist.widget_type, "github_gist");
        assert_eq!(gist.attributes.get("url"), Some("https://gist.github.com/a/1"));
        assert_eq!(gist.range.start, 6);
        let from_range: String = text.chars().skip(gist.range.start).take(gist.range.len()).collect();
        assert_eq!(from_range, gist.raw.as_str());

        assert_eq!(markers[1].widget_type, "cloud_widget");
        assert_eq!(markers[1].attributes.get("id"), Some("w1"));
    }

    #[test]
    fn test_scan_honours_quotes() {
        let markers = scan(r#"@[note](text="a (paren) and \"quote)\"")"#);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].attributes.get("text"), Some("a (paren) and \"quote)\""));
    }

    #[test]
    fn test_scan_ignores_malformed() {
        assert!(scan("@[] () @[bad type](x) @[ok] (x) @[ok](unterminated").is_empty());
        assert!(scan("@[ok](a=\"line\nbreak\")").is_empty());
        assert!(scan("email@[example](").is_empty());
    }

    #[test]
    fn test_scan_recovers_after_false_start() {
        let markers = scan("@[@[gist](id=\"1\")");
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].range, 2..17);
    }

    #[test]
    fn test_empty_payload() {
        let marker = WidgetMarker::parse("@[github_gist]()").expect("marker");
        assert!(marker.attributes.is_empty());
        assert_eq!(format_marker("github_gist", &Attributes::new()), "@[github_gist]()");
    }

    #[test]
    fn test_parse_requires_exact_marker() {
        assert!(WidgetMarker::parse("@[a](x=\"1\")").is_some());
        assert!(WidgetMarker::parse("@[a](x=\"1\") trailing").is_none());
        assert!(WidgetMarker::parse(" @[a]()").is_none());
    }

    #[test]
    fn test_format_then_scan() {
        let attrs: Attributes = [("url", "https://gist.github.com/a/b"), ("title", "x) y")].into_iter().collect();
        let text = format!("before {} after", format_marker("github_gist", &attrs));
        let markers = scan(&text);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].attributes, attrs);
    }

    #[test]
    fn test_type_validation() {
        assert!(is_valid_type("github_gist"));
        assert!(is_valid_type("acme/chart.v2"));
        assert!(!is_valid_type(""));
        assert!(!is_valid_type("has space"));
        assert!(!is_valid_type("bracket]"));
    }
}
