//! Known users.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Stable identity of a known user for the life of one connection.
///
/// Renames keep the id; join records refer to users by id, never by nick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClientId(pub(crate) u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client#{}", self.0)
    }
}

/// A user visible to this connection.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClientInfo {
    pub(crate) id: ClientId,
    pub(crate) nickname: String,
    /// Ident; empty until seen in a hostmask or WHO reply.
    pub ident: String,
    /// Hostname; empty until seen in a hostmask or WHO reply.
    pub host: String,
    /// Real name from WHO/WHOIS, if seen.
    pub realname: Option<String>,
    /// Services account, if known.
    pub account: Option<String>,
    /// User-mode bitmask (bits assigned by the connection's mode table).
    pub user_modes: u64,
    /// Away flag.
    pub away: bool,
    /// Away message, if known.
    pub away_reason: Option<String>,
    /// Free-form annotations for collaborators.
    pub properties: BTreeMap<String, String>,
    pub(crate) keep_alive: bool,
    /// Folded names of channels this client is a member of.
    pub(crate) channels: BTreeSet<String>,
}

impl ClientInfo {
    pub(crate) fn new(id: ClientId, nickname: &str, ident: &str, host: &str) -> Self {
        Self {
            id,
            nickname: nickname.to_string(),
            ident: ident.to_string(),
            host: host.to_string(),
            realname: None,
            account: None,
            user_modes: 0,
            away: false,
            away_reason: None,
            properties: BTreeMap::new(),
            keep_alive: false,
            channels: BTreeSet::new(),
        }
    }

    /// Stable identity.
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Nickname as last seen, original case.
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// `nick!ident@host`, omitting unknown parts.
    pub fn hostmask(&self) -> String {
        crate::hostmask::join(&self.nickname, &self.ident, &self.host)
    }

    /// Number of channels shared with this connection.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Folded channel keys this client is on.
    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(String::as_str)
    }

    /// True when a collaborator asked to keep this record without shared channels.
    pub fn is_kept_alive(&self) -> bool {
        self.keep_alive
    }

    /// Fill in ident/host when previously unknown. Returns true if anything changed.
    pub(crate) fn learn_mask(&mut self, ident: &str, host: &str) -> bool {
        let mut changed = false;
        if !ident.is_empty() && self.ident != ident {
            self.ident = ident.to_string();
            changed = true;
        }
        if !host.is_empty() && self.host != host {
            self.host = host.to_string();
            changed = true;
        }
        changed
    }
}
