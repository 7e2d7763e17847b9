//! IRC case-mapping.
//!
//! IRC uses a special case-insensitive comparison where some characters
//! are considered equivalent (e.g., `[` and `{`). Which characters are
//! equivalent is negotiated by the server through the `CASEMAPPING`
//! ISUPPORT token, so every identity lookup goes through a [`CaseMapping`]
//! value owned by the connection.
//!
//! Folding always produces the lowercase form. Display strings keep their
//! original case; only registry keys are folded.

use std::fmt;

/// A server-declared case-mapping policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CaseMapping {
    /// Only `A-Z` fold to `a-z`.
    Ascii,
    /// `A-Z` plus `[]\~` fold to `a-z` plus `{}|^`.
    #[default]
    Rfc1459,
    /// `A-Z` plus `[]\` fold to `a-z` plus `{}|`; `~` and `^` stay distinct.
    StrictRfc1459,
}

impl CaseMapping {
    /// Resolve a `CASEMAPPING` token value.
    ///
    /// Unknown names return `None`; callers keep their current mapping.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "ascii" => Some(Self::Ascii),
            "rfc1459" => Some(Self::Rfc1459),
            "strict-rfc1459" => Some(Self::StrictRfc1459),
            _ => None,
        }
    }

    /// The token value a server would advertise for this mapping.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ascii => "ascii",
            Self::Rfc1459 => "rfc1459",
            Self::StrictRfc1459 => "strict-rfc1459",
        }
    }

    /// Fold a single character.
    #[inline]
    pub const fn fold_char(&self, c: char) -> char {
        match (*self, c) {
            (_, 'A'..='Z') => (c as u8 + 32) as char,
            (Self::Rfc1459 | Self::StrictRfc1459, '[') => '{',
            (Self::Rfc1459 | Self::StrictRfc1459, ']') => '}',
            (Self::Rfc1459 | Self::StrictRfc1459, '\\') => '|',
            (Self::Rfc1459, '~') => '^',
            _ => c,
        }
    }

    /// Fold a string into its lookup key.
    pub fn fold(&self, s: &str) -> String {
        s.chars().map(|c| self.fold_char(c)).collect()
    }

    /// Compare two names under this mapping without allocating.
    pub fn equals(&self, a: &str, b: &str) -> bool {
        if a.len() != b.len() {
            return false;
        }

        a.chars()
            .zip(b.chars())
            .all(|(ca, cb)| self.fold_char(ca) == self.fold_char(cb))
    }
}

impl fmt::Display for CaseMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Convert a string to IRC lowercase using RFC 1459 case mapping.
pub fn irc_to_lower(s: &str) -> String {
    CaseMapping::Rfc1459.fold(s)
}

/// Compare two strings using RFC 1459 case-insensitive comparison.
pub fn irc_eq(a: &str, b: &str) -> bool {
    CaseMapping::Rfc1459.equals(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_fold() {
        let m = CaseMapping::Ascii;
        assert_eq!(m.fold("HeLLo"), "hello");
        assert_eq!(m.fold("Nick[1]"), "nick[1]");
        assert!(!m.equals("nick[", "nick{"));
    }

    #[test]
    fn test_rfc1459_fold() {
        let m = CaseMapping::Rfc1459;
        assert_eq!(m.fold("#Channel[1]"), "#channel{1}");
        assert_eq!(m.fold("Nick\\Away"), "nick|away");
        assert_eq!(m.fold("Test~Name"), "test^name");
        assert!(m.equals("nick~", "NICK^"));
    }

    #[test]
    fn test_strict_rfc1459_fold() {
        let m = CaseMapping::StrictRfc1459;
        assert_eq!(m.fold("A[B]C\\"), "a{b}c|");
        assert_eq!(m.fold("x~"), "x~");
        assert!(!m.equals("nick~", "nick^"));
    }

    #[test]
    fn test_fold_is_idempotent() {
        for m in [
            CaseMapping::Ascii,
            CaseMapping::Rfc1459,
            CaseMapping::StrictRfc1459,
        ] {
            let once = m.fold("Mixed[Case]\\Name~^");
            assert_eq!(m.fold(&once), once);
        }
    }

    #[test]
    fn test_from_name() {
        assert_eq!(CaseMapping::from_name("ascii"), Some(CaseMapping::Ascii));
        assert_eq!(CaseMapping::from_name("RFC1459"), Some(CaseMapping::Rfc1459));
        assert_eq!(
            CaseMapping::from_name("strict-rfc1459"),
            Some(CaseMapping::StrictRfc1459)
        );
        assert_eq!(CaseMapping::from_name("rfc7613"), None);
    }

    #[test]
    fn test_irc_eq() {
        assert!(irc_eq("hello", "HELLO"));
        assert!(irc_eq("#channel[1]", "#CHANNEL{1}"));
        assert!(!irc_eq("short", "longer"));
        assert_eq!(irc_to_lower("HELLO"), "hello");
    }
}
