//! Server capability announcements (`004` and `005`).
//!
//! Servers spread ISUPPORT over several 005 lines, so [`ServerSupport`]
//! accumulates tokens until the connection is ready. The borrowed token
//! parsers ([`PrefixSpec`], [`ChanModes`]) work on a single token value.

use std::collections::BTreeMap;

use crate::casemap::CaseMapping;

/// Accumulated ISUPPORT tokens for one connection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServerSupport {
    tokens: BTreeMap<String, Option<String>>,
}

impl ServerSupport {
    /// Create an empty token set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the parameters of one 005 line.
    ///
    /// The first parameter (our nickname) and the human-readable trailing
    /// text are skipped. `-TOKEN` removes a previously advertised token.
    pub fn absorb(&mut self, params: &[String]) {
        let mut tokens = params.get(1..).unwrap_or_default();
        if let Some(last) = tokens.last() {
            if last.contains(' ') {
                tokens = &tokens[..tokens.len() - 1];
            }
        }

        for token in tokens {
            if token.is_empty() {
                continue;
            }
            if let Some(negated) = token.strip_prefix('-') {
                self.tokens.remove(&negated.to_ascii_uppercase());
                continue;
            }
            let (key, value) = match token.split_once('=') {
                Some((k, v)) => (k, Some(v.to_string())),
                None => (token.as_str(), None),
            };
            self.tokens.insert(key.to_ascii_uppercase(), value);
        }
    }

    /// `Some(value)` when the token was advertised; the inner option is its value.
    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.tokens
            .get(&key.to_ascii_uppercase())
            .map(|v| v.as_deref())
    }

    /// Value of a token, or `None` when absent or valueless.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.get(key).flatten()
    }

    /// Iterate all tokens in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.tokens.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    /// True when nothing has been advertised yet.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Advertised case mapping, if recognised.
    pub fn casemapping(&self) -> Option<CaseMapping> {
        self.value("CASEMAPPING").and_then(CaseMapping::from_name)
    }

    /// Channel type prefixes; RFC default is `#&`.
    pub fn chantypes(&self) -> &str {
        self.value("CHANTYPES").unwrap_or("#&")
    }

    /// Network name.
    pub fn network(&self) -> Option<&str> {
        self.value("NETWORK")
    }

    /// `PREFIX` token; defaults to `(ov)@+`.
    pub fn prefix(&self) -> PrefixSpec<'_> {
        match self.get("PREFIX") {
            Some(Some(v)) if !v.is_empty() => PrefixSpec::parse(v).unwrap_or(PrefixSpec::DEFAULT),
            // An empty PREFIX= means no prefix modes at all.
            Some(_) => PrefixSpec::EMPTY,
            None => PrefixSpec::DEFAULT,
        }
    }

    /// `CHANMODES` token, if advertised.
    pub fn chanmodes(&self) -> Option<ChanModes<'_>> {
        self.value("CHANMODES").and_then(ChanModes::parse)
    }

    /// Maximum mode changes per MODE command; `MODES` without a value means unlimited.
    pub fn modes_per_line(&self) -> Option<usize> {
        match self.get("MODES") {
            Some(Some(v)) => v.parse().ok(),
            Some(None) => Some(usize::MAX),
            None => None,
        }
    }

    /// Prefixes allowed before a channel name in STATUSMSG targets.
    pub fn statusmsg(&self) -> &str {
        self.value("STATUSMSG").unwrap_or("")
    }

    /// Mode letter for ban exceptions, when supported.
    pub fn excepts_mode(&self) -> Option<char> {
        self.get("EXCEPTS")
            .map(|v| v.and_then(|s| s.chars().next()).unwrap_or('e'))
    }

    /// Mode letter for invite exceptions, when supported.
    pub fn invex_mode(&self) -> Option<char> {
        self.get("INVEX")
            .map(|v| v.and_then(|s| s.chars().next()).unwrap_or('I'))
    }

    /// Numeric of the generic list-mode item reply (`LISTMODE=<n>`).
    ///
    /// The end-of-list reply is the next numeric.
    pub fn listmode_numeric(&self) -> Option<u16> {
        self.value("LISTMODE").and_then(|v| v.parse().ok())
    }
}

/// Contents of `RPL_MYINFO` (004).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MyInfo {
    /// Server name.
    pub server_name: String,
    /// Server software version string.
    pub version: String,
    /// Supported user mode letters.
    pub user_modes: String,
    /// Supported channel mode letters.
    pub channel_modes: String,
}

impl MyInfo {
    /// Build from 004 parameters: `<me> <server> <version> <umodes> <cmodes> ...`.
    pub fn from_params(params: &[String]) -> Self {
        let get = |i: usize| params.get(i).cloned().unwrap_or_default();
        Self {
            server_name: get(1),
            version: get(2),
            user_modes: get(3),
            channel_modes: get(4),
        }
    }
}

/// Server software families whose behaviour differs enough to matter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum ServerType {
    /// freenode's old Hyperion ircd.
    Hyperion,
    /// Dancer, Hyperion's predecessor.
    Dancer,
    /// UnrealIRCd.
    Unreal,
    /// InspIRCd.
    Inspircd,
    /// Charybdis and ircd-seven.
    Charybdis,
    /// ircu / Undernet.
    Ircu,
    /// IRCnet's ircd (2.11).
    Ircnet,
    /// ircd-hybrid and ircd-ratbox.
    Hybrid,
    /// Anything else.
    #[default]
    Unknown,
}

impl ServerType {
    /// Classify a 004 version string.
    pub fn detect(version: &str) -> Self {
        let v = version.to_ascii_lowercase();
        if v.contains("hyperion") {
            Self::Hyperion
        } else if v.contains("dancer") {
            Self::Dancer
        } else if v.contains("unreal") {
            Self::Unreal
        } else if v.contains("inspircd") {
            Self::Inspircd
        } else if v.contains("charybdis") || v.contains("ircd-seven") || v.contains("solanum") {
            Self::Charybdis
        } else if v.starts_with("u2.") || v.contains("ircu") {
            Self::Ircu
        } else if v.starts_with("2.11") || v.contains("ircnet") {
            Self::Ircnet
        } else if v.contains("hybrid") || v.contains("ratbox") {
            Self::Hybrid
        } else {
            Self::Unknown
        }
    }

    /// True for the Hyperion/Dancer family that overloads the ban numerics.
    pub fn overloads_ban_list(&self) -> bool {
        matches!(self, Self::Hyperion | Self::Dancer)
    }
}

/// Parsed `PREFIX` value: mode letters and their glyphs, most important first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrefixSpec<'a> {
    /// Mode letters, e.g. `ov`.
    pub modes: &'a str,
    /// Display glyphs, e.g. `@+`.
    pub prefixes: &'a str,
}

impl<'a> PrefixSpec<'a> {
    /// RFC 1459 behaviour when the server says nothing.
    pub const DEFAULT: PrefixSpec<'static> = PrefixSpec {
        modes: "ov",
        prefixes: "@+",
    };

    /// No prefix modes.
    pub const EMPTY: PrefixSpec<'static> = PrefixSpec {
        modes: "",
        prefixes: "",
    };

    /// Parse `(modes)prefixes`.
    pub fn parse(s: &'a str) -> Option<Self> {
        let open = s.find('(')?;
        let close = open + 1 + s[open + 1..].find(')')?;
        let modes = &s[open + 1..close];
        let prefixes = &s[close + 1..];
        if modes.chars().count() != prefixes.chars().count() {
            return None;
        }
        Some(PrefixSpec { modes, prefixes })
    }

    /// Pairs of (mode letter, glyph), most important first.
    pub fn pairs(&self) -> impl Iterator<Item = (char, char)> + 'a {
        self.modes.chars().zip(self.prefixes.chars())
    }
}

/// Parsed `CHANMODES` value: list, always-parameter, set-parameter and flag groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChanModes<'a> {
    /// Group A: list modes.
    pub a: &'a str,
    /// Group B: parameter on set and unset.
    pub b: &'a str,
    /// Group C: parameter on set only.
    pub c: &'a str,
    /// Group D: no parameter.
    pub d: &'a str,
}

impl<'a> ChanModes<'a> {
    /// Parse `A,B,C,D`. Extra groups beyond the fourth are ignored.
    pub fn parse(s: &'a str) -> Option<Self> {
        let mut parts = s.split(',');
        let (a, b, c, d) = (parts.next()?, parts.next()?, parts.next()?, parts.next()?);
        Some(ChanModes { a, b, c, d })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(line: &[&str]) -> Vec<String> {
        line.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_absorb_multiple_lines() {
        let mut support = ServerSupport::new();
        support.absorb(&params(&[
            "me",
            "CHANTYPES=#",
            "PREFIX=(qaohv)~&@%+",
            "are supported by this server",
        ]));
        support.absorb(&params(&[
            "me",
            "CASEMAPPING=ascii",
            "EXCEPTS",
            "CHANMODES=beI,k,l,imnpst",
            "are supported by this server",
        ]));

        assert_eq!(support.chantypes(), "#");
        assert_eq!(support.casemapping(), Some(CaseMapping::Ascii));
        assert_eq!(support.excepts_mode(), Some('e'));
        assert_eq!(support.invex_mode(), None);
        let prefix = support.prefix();
        assert_eq!(prefix.modes, "qaohv");
        assert_eq!(prefix.pairs().next(), Some(('q', '~')));
        let chanmodes = support.chanmodes().unwrap();
        assert_eq!(chanmodes.a, "beI");
        assert_eq!(chanmodes.d, "imnpst");
    }

    #[test]
    fn test_negated_token() {
        let mut support = ServerSupport::new();
        support.absorb(&params(&["me", "EXCEPTS=e", "LISTMODE=997", "are supported"]));
        assert_eq!(support.listmode_numeric(), Some(997));
        support.absorb(&params(&["me", "-EXCEPTS", "are supported"]));
        assert_eq!(support.excepts_mode(), None);
    }

    #[test]
    fn test_defaults() {
        let support = ServerSupport::new();
        assert_eq!(support.chantypes(), "#&");
        assert_eq!(support.prefix(), PrefixSpec::DEFAULT);
        assert_eq!(support.modes_per_line(), None);
        assert!(support.chanmodes().is_none());
    }

    #[test]
    fn test_prefix_spec_parse() {
        assert_eq!(
            PrefixSpec::parse("(ov)@+"),
            Some(PrefixSpec {
                modes: "ov",
                prefixes: "@+"
            })
        );
        assert_eq!(PrefixSpec::parse("(ov)@"), None);
        assert_eq!(PrefixSpec::parse("@+"), None);
    }

    #[test]
    fn test_server_type_detect() {
        assert_eq!(ServerType::detect("hyperion-1.0.2b"), ServerType::Hyperion);
        assert_eq!(ServerType::detect("dancer-1.0.36"), ServerType::Dancer);
        assert_eq!(ServerType::detect("Unreal3.2.8"), ServerType::Unreal);
        assert_eq!(ServerType::detect("ircd-seven-1.1.9"), ServerType::Charybdis);
        assert_eq!(ServerType::detect("u2.10.12.14"), ServerType::Ircu);
        assert_eq!(ServerType::detect("2.11.2p3"), ServerType::Ircnet);
        assert_eq!(ServerType::detect("mystery-0.1"), ServerType::Unknown);
        assert!(ServerType::Dancer.overloads_ban_list());
        assert!(!ServerType::Unreal.overloads_ban_list());
    }

    #[test]
    fn test_myinfo() {
        let info = MyInfo::from_params(&params(&["me", "irc.example.net", "hyperion-1.0", "iow", "biklmnopstv"]));
        assert_eq!(info.server_name, "irc.example.net");
        assert_eq!(info.version, "hyperion-1.0");
        assert_eq!(info.channel_modes, "biklmnopstv");
    }
}
