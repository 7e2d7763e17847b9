//! Connection-scoped view of the network.
//!
//! [`NetworkState`] owns both registries and everything learned from the
//! server's capability announcements. Handlers mutate it; listeners read it.
//!
//! Join records live in the channel and refer to users by [`ClientId`], so a
//! rename only re-keys the client index:
//!
//! ```
//! use slirc_client::state::NetworkState;
//!
//! let mut state = NetworkState::new();
//! state.join("#rust", "alice!a@host");
//! state.rename_client("alice", "Alice_");
//!
//! let id = state.clients().find_id("alice_").unwrap();
//! assert!(state.channel("#RUST").unwrap().member(id).is_some());
//! ```

mod channel;
mod client;
mod registry;

pub use self::channel::{ChannelClientInfo, ChannelInfo, ListModeItem, Topic};
pub use self::client::{ClientId, ClientInfo};
pub use self::registry::{ChannelRegistry, ClientRegistry};

use tracing::{debug, warn};

use crate::casemap::CaseMapping;
use crate::hostmask;
use crate::isupport::{MyInfo, ServerSupport, ServerType};
use crate::mode::ModeTable;

/// Everything known about one connection's network.
#[derive(Clone, Debug, Default)]
pub struct NetworkState {
    casemap: CaseMapping,
    clients: ClientRegistry,
    channels: ChannelRegistry,
    own: Option<ClientId>,
    pub(crate) support: ServerSupport,
    pub(crate) myinfo: MyInfo,
    pub(crate) server_type: ServerType,
    pub(crate) modes: ModeTable,
}

impl NetworkState {
    /// Empty state with RFC 1459 defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Active case mapping.
    pub fn casemapping(&self) -> CaseMapping {
        self.casemap
    }

    /// Fold a nickname or channel name under the active mapping.
    pub fn fold(&self, s: &str) -> String {
        self.casemap.fold(s)
    }

    /// Compare two names under the active mapping.
    pub fn names_equal(&self, a: &str, b: &str) -> bool {
        self.casemap.equals(a, b)
    }

    /// Switch case mapping, rebuilding every index.
    pub fn set_casemapping(&mut self, casemap: CaseMapping) {
        if casemap == self.casemap {
            return;
        }
        debug!(from = %self.casemap, to = %casemap, "rebuilding registries for new casemapping");
        self.casemap = casemap;
        let collisions = self.clients.rekey(casemap);
        self.channels.rekey(casemap);

        for client in self.clients.iter_mut() {
            client.channels = client.channels.iter().map(|c| casemap.fold(c)).collect();
        }
        for (kept, shadowed) in collisions {
            self.merge_clients(kept, shadowed);
        }
    }

    /// Fold `shadowed` into `kept` after both nicknames came to name one user.
    ///
    /// Our own record always survives.
    fn merge_clients(&mut self, kept: ClientId, shadowed: ClientId) {
        let (survivor, dup) = if self.own == Some(shadowed) {
            (shadowed, kept)
        } else {
            (kept, shadowed)
        };
        self.clients.reindex(survivor);
        let Some(dup_info) = self.clients.remove(dup) else {
            return;
        };
        warn!(%survivor, merged = %dup, nick = %dup_info.nickname, "merging clients that share a nickname");
        for key in &dup_info.channels {
            if let Some(chan) = self.channels.get_mut(key) {
                if let Some(mut member) = chan.members.remove(&dup) {
                    member.client = survivor;
                    chan.merge_member(member);
                }
            }
        }
        if let Some(client) = self.clients.get_mut(survivor) {
            client.channels.extend(dup_info.channels);
            client.keep_alive |= dup_info.keep_alive;
        }
    }

    /// Client registry.
    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    /// Channel registry.
    pub fn channels(&self) -> &ChannelRegistry {
        &self.channels
    }

    /// Look up a client by nickname or hostmask.
    pub fn client(&self, nick: &str) -> Option<&ClientInfo> {
        self.clients.find(nick)
    }

    /// Mutable client lookup by nickname or hostmask.
    pub fn client_mut(&mut self, nick: &str) -> Option<&mut ClientInfo> {
        self.clients.find_mut(nick)
    }

    /// Look up a channel by name.
    pub fn channel(&self, name: &str) -> Option<&ChannelInfo> {
        self.channels.get(name)
    }

    /// Mutable channel lookup.
    pub fn channel_mut(&mut self, name: &str) -> Option<&mut ChannelInfo> {
        self.channels.get_mut(name)
    }

    /// The channel, creating an empty record if unknown.
    pub fn channel_or_create(&mut self, name: &str) -> &mut ChannelInfo {
        self.channels.get_or_create(name)
    }

    /// Member record for `nick` in `channel`.
    pub fn channel_client(&self, channel: &str, nick: &str) -> Option<&ChannelClientInfo> {
        let id = self.clients.find_id(nick)?;
        self.channels.get(channel)?.member(id)
    }

    /// Our own client record, once registration has named it.
    pub fn own_client(&self) -> Option<&ClientInfo> {
        self.own.and_then(|id| self.clients.get(id))
    }

    /// Our current nickname, if known.
    pub fn own_nick(&self) -> Option<&str> {
        self.own_client().map(ClientInfo::nickname)
    }

    /// True when `nick` is us.
    pub fn is_own(&self, nick: &str) -> bool {
        self.own.is_some() && self.clients.find_id(nick) == self.own
    }

    pub(crate) fn own_id(&self) -> Option<ClientId> {
        self.own
    }

    /// Record our own identity, creating the client if needed.
    ///
    /// A later call renames the existing record, so a nickname the server
    /// truncated or changed keeps the identity picked during registration.
    pub(crate) fn set_own(&mut self, mask: &str) -> ClientId {
        let nick = hostmask::parse_nick(mask);
        if let Some(id) = self.own {
            if let Some(current) = self.clients.get(id).map(|c| c.nickname.clone()) {
                if current != nick {
                    self.rename_client(&current, nick);
                }
                return self.clients.get_or_create(mask);
            }
        }
        let id = self.clients.get_or_create(mask);
        self.own = Some(id);
        id
    }

    /// Capability tokens seen so far.
    pub fn support(&self) -> &ServerSupport {
        &self.support
    }

    /// Contents of the 004 line.
    pub fn myinfo(&self) -> &MyInfo {
        &self.myinfo
    }

    /// Server software family.
    pub fn server_type(&self) -> ServerType {
        self.server_type
    }

    /// Active mode table.
    pub fn modes(&self) -> &ModeTable {
        &self.modes
    }

    /// True when `target` starts with one of the server's channel prefixes.
    pub fn is_channel_name(&self, target: &str) -> bool {
        target
            .chars()
            .next()
            .is_some_and(|c| self.support.chantypes().contains(c))
    }

    /// Return the client for a hostmask, creating it on first sighting.
    pub fn get_or_create_client(&mut self, mask: &str) -> ClientId {
        self.clients.get_or_create(mask)
    }

    /// Re-key a client; its join records are untouched.
    ///
    /// Another client still indexed under `new_nick` is stale, since the
    /// server allows one user per nickname. It is removed from every channel
    /// and deleted first.
    pub fn rename_client(&mut self, old: &str, new_nick: &str) -> Option<ClientId> {
        let id = self.clients.find_id(old)?;
        if let Some(stale) = self.clients.find_id(new_nick).filter(|&s| s != id) {
            warn!(%stale, %id, new_nick, "nickname taken over by rename, dropping stale client");
            self.quit(stale);
        }
        self.clients.rename(old, new_nick)
    }

    /// Hold (or release) a client record without shared channels.
    ///
    /// Releasing an orphan deletes it. Returns false for unknown nicknames.
    pub fn set_keep_alive(&mut self, nick: &str, keep: bool) -> bool {
        let Some(client) = self.clients.find_mut(nick) else {
            return false;
        };
        client.keep_alive = keep;
        let id = client.id;
        if !keep {
            self.delete_client_if_orphaned(id);
        }
        true
    }

    /// Delete a client that shares no channel with us and is not held.
    ///
    /// Our own record is never deleted. Returns true if the record went away.
    pub fn delete_client_if_orphaned(&mut self, id: ClientId) -> bool {
        let orphaned = self
            .clients
            .get(id)
            .is_some_and(|c| c.channels.is_empty() && !c.keep_alive);
        if !orphaned || self.own == Some(id) {
            return false;
        }
        debug!(%id, "removing orphaned client");
        self.clients.remove(id).is_some()
    }

    /// Add a member to a channel, creating both records as needed.
    ///
    /// Returns the client's id. An existing membership is kept as is.
    pub fn join(&mut self, channel: &str, mask: &str) -> ClientId {
        let id = self.clients.get_or_create(mask);
        let key = self.channels.key(channel);
        self.channels
            .get_or_create(channel)
            .members
            .entry(id)
            .or_insert_with(|| ChannelClientInfo::new(id));
        if let Some(client) = self.clients.get_mut(id) {
            client.channels.insert(key);
        }
        id
    }

    /// Remove a member from a channel, then garbage-collect the client.
    ///
    /// Returns the removed join record.
    pub fn part(&mut self, channel: &str, id: ClientId) -> Option<ChannelClientInfo> {
        let key = self.channels.key(channel);
        let removed = self.channels.get_mut(channel)?.members.remove(&id);
        if let Some(client) = self.clients.get_mut(id) {
            client.channels.remove(&key);
        }
        self.delete_client_if_orphaned(id);
        removed
    }

    /// Drop a channel and every join record in it.
    pub fn remove_channel(&mut self, channel: &str) -> Option<ChannelInfo> {
        let key = self.channels.key(channel);
        let info = self.channels.remove(channel)?;
        for id in info.members.keys().copied() {
            if let Some(client) = self.clients.get_mut(id) {
                client.channels.remove(&key);
            }
            self.delete_client_if_orphaned(id);
        }
        Some(info)
    }

    /// Remove a client from every channel and delete it.
    ///
    /// Returns the names of the channels it left.
    pub fn quit(&mut self, id: ClientId) -> Vec<String> {
        let keys: Vec<String> = match self.clients.get(id) {
            Some(client) => client.channels.iter().cloned().collect(),
            None => return Vec::new(),
        };
        let mut names = Vec::with_capacity(keys.len());
        for key in &keys {
            if let Some(chan) = self.channels.get_mut(key) {
                chan.members.remove(&id);
                names.push(chan.name.clone());
            }
        }
        if let Some(client) = self.clients.get_mut(id) {
            client.channels.clear();
        }
        if self.own != Some(id) {
            self.clients.remove(id);
        }
        names
    }

    /// Forget every channel and client. Capability data is kept.
    pub fn clear(&mut self) {
        debug!(
            channels = self.channels.len(),
            clients = self.clients.len(),
            "clearing network state"
        );
        self.channels.clear();
        self.clients.clear();
        self.own = None;
    }

    pub(crate) fn clients_mut(&mut self) -> &mut ClientRegistry {
        &mut self.clients
    }

    /// Split borrow for mode processing.
    pub(crate) fn channel_and_clients(
        &mut self,
        channel: &str,
    ) -> Option<(&mut ChannelInfo, &ClientRegistry, &ModeTable)> {
        let chan = self.channels.get_mut(channel)?;
        Some((chan, &self.clients, &self.modes))
    }

    pub(crate) fn channels_mut(&mut self) -> impl Iterator<Item = &mut ChannelInfo> {
        self.channels.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_part_gc() {
        let mut state = NetworkState::new();
        let me = state.set_own("me");
        state.join("#c", "me");
        let a = state.join("#c", "a!u@h");
        state.join("#d", "a!u@h");

        assert_eq!(state.channel("#c").unwrap().member_count(), 2);
        assert_eq!(state.clients().get(a).unwrap().channel_count(), 2);

        state.part("#c", a);
        assert!(state.client("a").is_some());
        state.part("#d", a);
        assert!(state.client("a").is_none());

        state.part("#c", me);
        assert!(state.own_client().is_some());
    }

    #[test]
    fn test_keep_alive() {
        let mut state = NetworkState::new();
        let a = state.join("#c", "query");
        assert!(state.set_keep_alive("QUERY", true));
        state.part("#c", a);
        assert!(state.client("query").is_some());
        assert!(state.set_keep_alive("query", false));
        assert!(state.client("query").is_none());
        assert!(!state.set_keep_alive("query", true));
    }

    #[test]
    fn test_quit_and_remove_channel() {
        let mut state = NetworkState::new();
        let a = state.join("#c", "a");
        state.join("#d", "a");
        let b = state.join("#c", "b");

        let mut left = state.quit(a);
        left.sort();
        assert_eq!(left, vec!["#c", "#d"]);
        assert!(state.client("a").is_none());
        assert_eq!(state.channel("#d").unwrap().member_count(), 0);

        state.remove_channel("#c");
        assert!(state.clients().get(b).is_none());
        assert!(state.channel("#c").is_none());
    }

    #[test]
    fn test_casemapping_change_keeps_membership() {
        let mut state = NetworkState::new();
        state.set_casemapping(CaseMapping::Ascii);
        let a = state.join("#Chan[1]", "Nick[x]");
        state.set_casemapping(CaseMapping::Rfc1459);

        assert_eq!(state.client("nick{X}").map(ClientInfo::id), Some(a));
        assert!(state.channel("#chan{1}").is_some());
        assert!(state.channel_client("#CHAN{1}", "NICK[X]").is_some());
        state.part("#chan{1}", a);
        assert!(state.client("nick[x]").is_none());
    }

    #[test]
    fn test_casemapping_change_merges_colliding_records() {
        let mut state = NetworkState::new();
        state.set_casemapping(CaseMapping::Ascii);
        let me = state.set_own("me");
        state.join("#a[", "me");
        let a = state.join("#a[", "nick[");
        state.join("#a{", "me");
        let b = state.join("#a{", "nick{");
        state.join("#other", "nick{");
        assert_eq!(state.channels().len(), 3);
        assert_eq!(state.clients().len(), 3);

        state.set_casemapping(CaseMapping::Rfc1459);
        assert_eq!(state.channels().len(), 2);
        assert_eq!(state.clients().len(), 2);
        assert!(state.clients().get(b).is_none());
        assert_eq!(state.client("NICK{").map(ClientInfo::id), Some(a));

        let merged = state.channel("#A{").unwrap();
        assert_eq!(merged.name(), "#a[");
        assert_eq!(merged.member_count(), 2);
        assert!(merged.member(me).is_some());
        assert!(state.channel_client("#other", "nick[").is_some());
        assert_eq!(state.clients().get(a).unwrap().channel_count(), 2);

        state.part("#a{", a);
        assert!(state.client("nick[").is_some());
        state.part("#other", a);
        assert!(state.client("nick[").is_none());
    }

    #[test]
    fn test_casemapping_collision_keeps_own_record() {
        let mut state = NetworkState::new();
        state.set_casemapping(CaseMapping::Ascii);
        let other = state.join("#c", "me[");
        let me = state.set_own("me{");
        state.join("#c", "me{");

        state.set_casemapping(CaseMapping::Rfc1459);
        assert_eq!(state.clients().len(), 1);
        assert!(state.clients().get(other).is_none());
        assert_eq!(state.own_id(), Some(me));
        assert!(state.is_own("ME["));
        assert_eq!(state.channel("#c").unwrap().member_count(), 1);
    }

    #[test]
    fn test_rename_onto_known_nick_drops_stale_client() {
        let mut state = NetworkState::new();
        let alice = state.join("#c", "alice");
        let stale = state.join("#c", "bob");
        state.join("#d", "bob");

        assert_eq!(state.rename_client("alice", "bob"), Some(alice));
        assert!(state.clients().get(stale).is_none());
        assert_eq!(state.clients().len(), 1);
        assert_eq!(state.channel("#c").unwrap().member_count(), 1);
        assert_eq!(state.channel("#d").unwrap().member_count(), 0);
        assert_eq!(state.client("BOB").map(ClientInfo::id), Some(alice));
    }

    #[test]
    fn test_clear() {
        let mut state = NetworkState::new();
        state.set_own("me");
        for nick in ["me", "a", "b"] {
            state.join("#c", nick);
        }
        state.clear();
        assert!(state.channels().is_empty());
        assert!(state.clients().is_empty());
        assert!(state.own_nick().is_none());
    }

    #[test]
    fn test_set_own_after_truncation() {
        let mut state = NetworkState::new();
        let asked = state.set_own("averylongnick");
        let confirmed = state.set_own("averylong");
        assert_eq!(asked, confirmed);
        assert_eq!(state.own_nick(), Some("averylong"));
        assert_eq!(state.clients().len(), 1);
    }

    #[test]
    fn test_is_channel_name() {
        let state = NetworkState::new();
        assert!(state.is_channel_name("#rust"));
        assert!(state.is_channel_name("&local"));
        assert!(!state.is_channel_name("nick"));
        assert!(!state.is_channel_name(""));
    }
}
