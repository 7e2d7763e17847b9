//! Mode letter classification for one connection.
//!
//! Built from `CHANMODES`/`PREFIX` in 005, falling back to the letters in
//! 004 and finally to RFC 1459 defaults.

use std::collections::BTreeMap;

use tracing::warn;

use crate::isupport::{MyInfo, ServerSupport};

/// RFC 1459 channel modes assumed when the server advertises nothing.
const RFC_LIST: &str = "b";
const RFC_DOUBLE: &str = "k";
const RFC_PARAM: &str = "l";
const RFC_BOOLEAN: &str = "imnpst";
const RFC_USER: &str = "iosw";

/// How a channel mode letter behaves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModeKind {
    /// Flag; the value is the bit in the channel's boolean mask.
    Boolean(u64),
    /// Takes a parameter when set only (`CHANMODES` group C).
    Parameter,
    /// Takes a parameter when set and when unset (group B).
    DoubleParameter,
    /// Keeps a list of entries (group A).
    List,
    /// Per-member status shown as a nickname glyph.
    Prefix {
        /// Bit in the member's prefix mask; more important modes have higher bits.
        bit: u64,
        /// Display glyph, e.g. `@`.
        glyph: char,
    },
}

impl ModeKind {
    /// Whether a change with this sign consumes a parameter.
    pub fn takes_param(&self, adding: bool) -> bool {
        match self {
            ModeKind::Boolean(_) => false,
            ModeKind::Parameter => adding,
            ModeKind::DoubleParameter | ModeKind::List | ModeKind::Prefix { .. } => true,
        }
    }
}

/// Mode letter table; fixed until the next capability announcement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModeTable {
    channel: BTreeMap<char, ModeKind>,
    /// (letter, glyph), most important first.
    prefixes: Vec<(char, char)>,
    user: BTreeMap<char, u64>,
}

impl Default for ModeTable {
    fn default() -> Self {
        Self::rfc1459()
    }
}

impl ModeTable {
    /// Table for a server that advertised nothing.
    pub fn rfc1459() -> Self {
        let mut table = Self::empty();
        table.add_groups(RFC_LIST, RFC_DOUBLE, RFC_PARAM, RFC_BOOLEAN);
        table.set_prefixes([('o', '@'), ('v', '+')]);
        table.set_user_modes(RFC_USER);
        table
    }

    fn empty() -> Self {
        Self {
            channel: BTreeMap::new(),
            prefixes: Vec::new(),
            user: BTreeMap::new(),
        }
    }

    /// Build from the accumulated capability tokens and 004.
    pub fn from_server(support: &ServerSupport, myinfo: &MyInfo) -> Self {
        let mut table = Self::empty();

        if let Some(groups) = support.chanmodes() {
            table.add_groups(groups.a, groups.b, groups.c, groups.d);
        } else if !myinfo.channel_modes.is_empty() {
            table.add_myinfo_letters(&myinfo.channel_modes, support);
        } else {
            table.add_groups(RFC_LIST, RFC_DOUBLE, RFC_PARAM, RFC_BOOLEAN);
        }

        for letter in [support.excepts_mode(), support.invex_mode()].into_iter().flatten() {
            table.channel.entry(letter).or_insert(ModeKind::List);
        }

        table.set_prefixes(support.prefix().pairs());

        if myinfo.user_modes.is_empty() {
            table.set_user_modes(RFC_USER);
        } else {
            table.set_user_modes(&myinfo.user_modes);
        }
        table
    }

    fn add_groups(&mut self, list: &str, double: &str, param: &str, boolean: &str) {
        for c in list.chars() {
            self.channel.insert(c, ModeKind::List);
        }
        for c in double.chars() {
            self.channel.insert(c, ModeKind::DoubleParameter);
        }
        for c in param.chars() {
            self.channel.insert(c, ModeKind::Parameter);
        }
        boolean.chars().for_each(|c| self.add_boolean(c));
    }

    /// Classify bare 004 letters using RFC roles for the ones we know.
    fn add_myinfo_letters(&mut self, letters: &str, support: &ServerSupport) {
        let prefix = support.prefix();
        for c in letters.chars() {
            if prefix.modes.contains(c) {
                continue;
            }
            match c {
                'b' | 'e' | 'I' => {
                    self.channel.insert(c, ModeKind::List);
                }
                'k' => {
                    self.channel.insert(c, ModeKind::DoubleParameter);
                }
                'l' => {
                    self.channel.insert(c, ModeKind::Parameter);
                }
                _ => self.add_boolean(c),
            }
        }
    }

    fn add_boolean(&mut self, c: char) {
        if self.channel.contains_key(&c) {
            return;
        }
        let used = self
            .channel
            .values()
            .filter(|k| matches!(k, ModeKind::Boolean(_)))
            .count();
        if used >= 64 {
            warn!(mode = %c, "boolean mode table full, ignoring letter");
            return;
        }
        self.channel.insert(c, ModeKind::Boolean(1 << used));
    }

    fn set_prefixes(&mut self, pairs: impl IntoIterator<Item = (char, char)>) {
        self.prefixes = pairs.into_iter().take(64).collect();
        let count = self.prefixes.len();
        for (i, &(letter, glyph)) in self.prefixes.iter().enumerate() {
            let bit = 1u64 << (count - 1 - i);
            self.channel.insert(letter, ModeKind::Prefix { bit, glyph });
        }
    }

    fn set_user_modes(&mut self, letters: &str) {
        self.user.clear();
        for c in letters.chars().filter(|c| c.is_ascii_alphabetic()) {
            let next = self.user.len();
            if next < 64 && !self.user.contains_key(&c) {
                self.user.insert(c, 1 << next);
            }
        }
    }

    /// Kind of a channel mode letter; `None` when unknown.
    pub fn kind(&self, mode: char) -> Option<ModeKind> {
        self.channel.get(&mode).copied()
    }

    /// Letters of all list modes.
    pub fn list_modes(&self) -> impl Iterator<Item = char> + '_ {
        self.channel
            .iter()
            .filter(|(_, k)| matches!(k, ModeKind::List))
            .map(|(c, _)| *c)
    }

    /// Prefix mode letter for a display glyph, e.g. `@` to `o`.
    pub fn prefix_for_glyph(&self, glyph: char) -> Option<char> {
        self.prefixes
            .iter()
            .find(|(_, g)| *g == glyph)
            .map(|(letter, _)| *letter)
    }

    /// Prefix bit for a status glyph.
    pub fn glyph_bit(&self, glyph: char) -> Option<u64> {
        self.prefix_for_glyph(glyph).and_then(|c| self.prefix_bit(c))
    }

    /// Prefix bit for a mode letter.
    pub fn prefix_bit(&self, mode: char) -> Option<u64> {
        match self.kind(mode) {
            Some(ModeKind::Prefix { bit, .. }) => Some(bit),
            _ => None,
        }
    }

    /// True when `c` is one of the advertised status glyphs.
    pub fn is_prefix_glyph(&self, c: char) -> bool {
        self.prefixes.iter().any(|(_, g)| *g == c)
    }

    /// Glyphs for a member's prefix mask, most important first.
    pub fn glyphs(&self, mask: u64) -> String {
        self.prefixes
            .iter()
            .filter(|(letter, _)| self.prefix_bit(*letter).is_some_and(|b| mask & b != 0))
            .map(|(_, glyph)| *glyph)
            .collect()
    }

    /// The single most important glyph for a mask.
    pub fn highest_glyph(&self, mask: u64) -> Option<char> {
        self.glyphs(mask).chars().next()
    }

    /// Render a boolean mask as `+letters`; `+` alone when empty.
    pub fn boolean_string(&self, mask: u64) -> String {
        let mut out = String::from("+");
        for (c, kind) in &self.channel {
            if let ModeKind::Boolean(bit) = kind {
                if mask & bit != 0 {
                    out.push(*c);
                }
            }
        }
        out
    }

    /// Bit for a user mode letter.
    pub fn user_bit(&self, mode: char) -> Option<u64> {
        self.user.get(&mode).copied()
    }

    /// Render a user-mode mask as `+letters`.
    pub fn user_string(&self, mask: u64) -> String {
        let mut out = String::from("+");
        out.extend(
            self.user
                .iter()
                .filter(|(_, bit)| mask & **bit != 0)
                .map(|(c, _)| *c),
        );
        out
    }
}
