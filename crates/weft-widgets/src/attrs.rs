//! Widget attribute mappings and their textual payload encoding.
//!
//! A payload is a whitespace-separated list of `key="value"` pairs:
//!
//! ```text
//! url="https://gist.github.com/someone/abc123" title="a \"quoted\" name"
//! ```
//!
//! Decoding is lenient: bare values (`key=value`) and flags (`key`, decoded to
//! an empty value) are accepted, and malformed tokens are skipped rather than
//! failing the whole payload. Encoding is canonical: every value is quoted and
//! escaped, so `decode(encode(m)) == m` for every mapping `decode` can produce.

use std::fmt;

use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Characters allowed in an attribute key.
pub fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')
}

/// A key is valid when it is non-empty and made only of key characters.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(is_key_char)
}

/// Ordered string-to-string attribute mapping.
///
/// Keys keep first-insertion order; setting an existing key replaces its value
/// in place. Equality ignores order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(IndexMap<SmolStr, String>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Non-empty value for `key`.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Insert or replace. Returns the previous value.
    pub fn set(&mut self, key: impl Into<SmolStr>, value: impl Into<String>) -> Option<String> {
        match self.0.entry(key.into()) {
            Entry::Occupied(mut entry) => Some(entry.insert(value.into())),
            Entry::Vacant(entry) => {
                entry.insert(value.into());
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.shift_remove(key)
    }

    /// Overlay `partial` onto this mapping. Existing keys keep their position.
    pub fn merge(&mut self, partial: &Attributes) {
        for (key, value) in partial.iter() {
            self.set(key.clone(), value);
        }
    }

    pub fn merged(&self, partial: &Attributes) -> Attributes {
        let mut out = self.clone();
        out.merge(partial);
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &str)> {
        self.0.iter().map(|(k, v)| (k, v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &SmolStr> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First key that would not survive encoding, if any.
    pub fn first_invalid_key(&self) -> Option<&SmolStr> {
        self.0.keys().find(|k| !is_valid_key(k))
    }

    /// Parse a payload. See [`decode`].
    pub fn decode(payload: &str) -> Self {
        decode(payload)
    }

    /// Canonical payload text. See [`encode`].
    pub fn encode(&self) -> String {
        encode(self)
    }
}

impl<K, V> FromIterator<(K, V)> for Attributes
where
    K: Into<SmolStr>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (k, v) in iter {
            attrs.set(k, v);
        }
        attrs
    }
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode(self))
    }
}

/// Parse an attribute payload.
///
/// Never fails. Tokens that cannot be read (bad key characters, stray quotes,
/// unterminated quoted values) are dropped. On duplicate keys the last value
/// wins and the key keeps its first position.
pub fn decode(payload: &str) -> Attributes {
    let mut attrs = Attributes::new();
    let mut chars = payload.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(c) = chars.next_if(|c| is_key_char(*c)) {
            key.push(c);
        }

        match chars.peek().copied() {
            _ if key.is_empty() => {
                skip_token(&mut chars);
            }
            None => {
                attrs.set(key, String::new());
            }
            Some(c) if c.is_whitespace() => {
                attrs.set(key, String::new());
            }
            Some('=') => {
                chars.next();
                let value = if chars.next_if_eq(&'"').is_some() {
                    read_quoted(&mut chars)
                } else {
                    read_bare(&mut chars)
                };
                match value {
                    Some(value) => {
                        attrs.set(key, value);
                    }
                    None => {
                        tracing::debug!(target: "weft::attrs", %key, "skipping malformed attribute value");
                        skip_token(&mut chars);
                    }
                }
            }
            Some(_) => {
                tracing::debug!(target: "weft::attrs", %key, "skipping malformed attribute key");
                skip_token(&mut chars);
            }
        }
    }

    attrs
}

/// Canonical payload text: `key="value"` pairs separated by single spaces.
///
/// Keys that fail [`is_valid_key`] are left out so the output always decodes
/// back to the same mapping. An empty mapping encodes to the empty string.
pub fn encode(attrs: &Attributes) -> String {
    let mut out = String::new();
    for (key, value) in attrs.iter() {
        if !is_valid_key(key) {
            tracing::warn!(target: "weft::attrs", %key, "dropping attribute with invalid key");
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(key);
        out.push_str("=\"");
        escape_into(&mut out, value);
        out.push('"');
    }
    out
}

fn escape_into(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
}

type Chars<'a> = std::iter::Peekable<std::str::Chars<'a>>;

/// Read the body of a quoted value, opening quote already consumed.
///
/// `None` when the quote is never closed or the closing quote is followed by
/// something other than whitespace.
fn read_quoted(chars: &mut Chars<'_>) -> Option<String> {
    let mut value = String::new();
    loop {
        match chars.next()? {
            '"' => break,
            '\\' => match chars.next()? {
                'n' => value.push('\n'),
                'r' => value.push('\r'),
                't' => value.push('\t'),
                other => value.push(other),
            },
            c => value.push(c),
        }
    }
    match chars.peek() {
        None => Some(value),
        Some(c) if c.is_whitespace() => Some(value),
        Some(_) => None,
    }
}

/// Read an unquoted value up to the next whitespace. Quotes are not allowed.
fn read_bare(chars: &mut Chars<'_>) -> Option<String> {
    let mut value = String::new();
    while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
        if c == '"' || c == '\\' {
            return None;
        }
        value.push(c);
    }
    Some(value)
}

fn skip_token(chars: &mut Chars<'_>) {
    while chars.next_if(|c| !c.is_whitespace()).is_some() {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pairs(attrs: &Attributes) -> Vec<(String, String)> {
        attrs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_decode_quoted_pairs() {
        let attrs = decode(r#"url="https://gist.github.com/a/1" title="hello world""#);
        assert_eq!(attrs.get("url"), Some("https://gist.github.com/a/1"));
        assert_eq!(attrs.get("title"), Some("hello world"));
        assert_eq!(attrs.len(), 2);
    }

    #[test]
    fn test_decode_escapes() {
        let attrs = decode(r#"a="say \"hi\"" b="back\\slash" c="line\nbreak\ttab" d="\q""#);
        assert_eq!(attrs.get("a"), Some("say \"hi\""));
        assert_eq!(attrs.get("b"), Some("back\\slash"));
        assert_eq!(attrs.get("c"), Some("line\nbreak\ttab"));
        assert_eq!(attrs.get("d"), Some("q"));
    }

    #[test]
    fn test_decode_bare_values_and_flags() {
        let attrs = decode("id=abc123 pinned empty=");
        assert_eq!(attrs.get("id"), Some("abc123"));
        assert_eq!(attrs.get("pinned"), Some(""));
        assert_eq!(attrs.get("empty"), Some(""));
    }

    #[test]
    fn test_decode_skips_malformed_tokens() {
        let attrs = decode(r#"ok="1" $bad="2" ke$y="3" stray"quote="4" open="never closed"#);
        assert_eq!(pairs(&attrs), vec![("ok".into(), "1".into())]);
    }

    #[test]
    fn test_decode_rejects_junk_after_closing_quote() {
        let attrs = decode(r#"a="1"b c="2""#);
        assert_eq!(attrs.get("a"), None);
        assert_eq!(attrs.get("c"), Some("2"));
    }

    #[test]
    fn test_decode_duplicate_last_wins_first_position() {
        let attrs = decode(r#"a="1" b="2" a="3""#);
        assert_eq!(pairs(&attrs), vec![("a".into(), "3".into()), ("b".into(), "2".into())]);
    }

    #[test]
    fn test_decode_empty_and_whitespace() {
        assert!(decode("").is_empty());
        assert!(decode("   \t ").is_empty());
    }

    #[test]
    fn test_encode_is_canonical() {
        let attrs: Attributes = [("id", "x1"), ("title", "a \"b\"\n")].into_iter().collect();
        assert_eq!(encode(&attrs), r#"id="x1" title="a \"b\"\n""#);
        assert_eq!(encode(&Attributes::new()), "");
    }

    #[test]
    fn test_encode_drops_invalid_keys() {
        let attrs: Attributes = [("ok", "1"), ("not ok", "2")].into_iter().collect();
        assert_eq!(encode(&attrs), r#"ok="1""#);
    }

    #[test]
    fn test_merge_keeps_positions() {
        let base: Attributes = [("a", "1"), ("b", "2")].into_iter().collect();
        let partial: Attributes = [("b", "20"), ("c", "3")].into_iter().collect();
        let merged = base.merged(&partial);
        assert_eq!(
            pairs(&merged),
            vec![
                ("a".into(), "1".into()),
                ("b".into(), "20".into()),
                ("c".into(), "3".into())
            ]
        );
    }

    #[test]
    fn test_equality_ignores_order() {
        let a: Attributes = [("x", "1"), ("y", "2")].into_iter().collect();
        let b: Attributes = [("y", "2"), ("x", "1")].into_iter().collect();
        assert_eq!(a, b);
    }

    fn key_strategy() -> impl Strategy<Value = String> {
        "[A-Za-z0-9_.-]{1,12}"
    }

    proptest! {
        #[test]
        fn prop_decode_encode_roundtrip(payload in any::<String>()) {
            let decoded = decode(&payload);
            let again = decode(&encode(&decoded));
            prop_assert_eq!(pairs(&again), pairs(&decoded));
        }

        #[test]
        fn prop_valid_mappings_roundtrip(
            entries in proptest::collection::vec((key_strategy(), any::<String>()), 0..8)
        ) {
            let attrs: Attributes = entries.into_iter().collect();
            let decoded = decode(&encode(&attrs));
            prop_assert_eq!(pairs(&decoded), pairs(&attrs));
        }
    }
}
