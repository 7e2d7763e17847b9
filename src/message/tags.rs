//! IRCv3 message tag splitting and unescaping.

/// A single IRCv3 message tag: key and optional (unescaped) value.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tag(pub String, pub Option<String>);

impl Tag {
    /// The tag key, including any vendor prefix or `+` client marker.
    pub fn key(&self) -> &str {
        &self.0
    }

    /// The unescaped value, if one was sent.
    pub fn value(&self) -> Option<&str> {
        self.1.as_deref()
    }
}

/// Split a raw tags section (without the leading `@`) into tags.
///
/// Empty keys are skipped. An empty value (`key=`) is treated as no value.
pub fn parse_tags(raw: &str) -> Vec<Tag> {
    raw.split(';')
        .filter(|t| !t.is_empty())
        .filter_map(|t| {
            let (key, value) = match t.split_once('=') {
                Some((k, v)) => (k, Some(v)),
                None => (t, None),
            };
            if key.is_empty() {
                return None;
            }
            let value = value.filter(|v| !v.is_empty()).map(unescape_tag_value);
            Some(Tag(key.to_string(), value))
        })
        .collect()
}

/// Unescape a tag value from wire format.
pub fn unescape_tag_value(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut iter = value.chars();
    while let Some(c) = iter.next() {
        let r = if c == '\\' {
            match iter.next() {
                Some(':') => ';',
                Some('s') => ' ',
                Some('\\') => '\\',
                Some('r') => '\r',
                Some('n') => '\n',
                Some(c) => c,
                None => break,
            }
        } else {
            c
        };
        unescaped.push(r);
    }
    unescaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_sequences() {
        assert_eq!(unescape_tag_value("a\\:b"), "a;b");
        assert_eq!(unescape_tag_value("hello\\sworld"), "hello world");
        assert_eq!(unescape_tag_value("path\\\\file"), "path\\file");
        assert_eq!(unescape_tag_value("line\\r\\nend"), "line\r\nend");
    }

    #[test]
    fn test_unescape_trailing_and_unknown() {
        assert_eq!(unescape_tag_value("test\\"), "test");
        assert_eq!(unescape_tag_value("a\\xb"), "axb");
    }

    #[test]
    fn test_parse_tags() {
        let tags = parse_tags("time=2023-01-01T00:00:00Z;+draft/reply=abc;flag;=orphan;empty=");
        assert_eq!(tags.len(), 4);
        assert_eq!(tags[0].key(), "time");
        assert_eq!(tags[0].value(), Some("2023-01-01T00:00:00Z"));
        assert_eq!(tags[1].key(), "+draft/reply");
        assert_eq!(tags[2], Tag("flag".to_string(), None));
        assert_eq!(tags[3].value(), None);
    }
}
