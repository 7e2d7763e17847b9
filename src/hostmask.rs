//! `nick!ident@host` splitting and joining.
//!
//! Parsing is lenient: servers send partial masks (nick only, nick@host,
//! bare server names) and every missing piece simply comes back empty.

use std::fmt;

/// The three components of an IRC hostmask.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Hostmask {
    /// Nickname (or server name for server-originated lines).
    pub nick: String,
    /// Ident / username; empty when not present.
    pub ident: String,
    /// Hostname; empty when not present.
    pub host: String,
}

impl Hostmask {
    /// Create a hostmask from its components.
    pub fn new(nick: impl Into<String>, ident: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            ident: ident.into(),
            host: host.into(),
        }
    }

    /// Parse a raw hostmask. See [`parse_full`].
    pub fn parse(raw: &str) -> Self {
        let (nick, ident, host) = parse_full(raw);
        Self::new(nick, ident, host)
    }

    /// True when this looks like a server name rather than a user.
    pub fn is_server_name(&self) -> bool {
        self.ident.is_empty() && self.host.is_empty() && self.nick.contains('.')
    }
}

impl fmt::Display for Hostmask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join(&self.nick, &self.ident, &self.host))
    }
}

impl From<&str> for Hostmask {
    fn from(s: &str) -> Self {
        Hostmask::parse(s)
    }
}

/// Split a raw hostmask into `(nick, ident, host)`.
///
/// A leading `:` is ignored. The nick ends at the first `!` or `@`; when a
/// `!` comes first the ident runs up to the next `@`; the host is whatever
/// follows that `@`. Never fails.
///
/// ```
/// use slirc_client::hostmask::parse_full;
///
/// assert_eq!(parse_full("nick!user@host"), ("nick", "user", "host"));
/// assert_eq!(parse_full("nick"), ("nick", "", ""));
/// assert_eq!(parse_full("nick@host"), ("nick", "", "host"));
/// ```
pub fn parse_full(raw: &str) -> (&str, &str, &str) {
    let raw = raw.trim_start_matches(':');

    let (before_at, host) = match raw.find(['!', '@']) {
        Some(i) if raw.as_bytes()[i] == b'@' => return (&raw[..i], "", &raw[i + 1..]),
        Some(_) => match raw.split_once('@') {
            Some((before, host)) => (before, host),
            None => (raw, ""),
        },
        None => return (raw, "", ""),
    };

    match before_at.split_once('!') {
        Some((nick, ident)) => (nick, ident, host),
        None => (before_at, "", host),
    }
}

/// Return only the nickname component of a raw hostmask.
pub fn parse_nick(raw: &str) -> &str {
    parse_full(raw).0
}

/// Rebuild a hostmask, omitting empty components.
pub fn join(nick: &str, ident: &str, host: &str) -> String {
    let mut out = String::with_capacity(nick.len() + ident.len() + host.len() + 2);
    out.push_str(nick);
    if !ident.is_empty() {
        out.push('!');
        out.push_str(ident);
    }
    if !host.is_empty() {
        out.push('@');
        out.push_str(host);
    }
    out
}
