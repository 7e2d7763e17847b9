//! Case-folded stores for clients and channels.
//!
//! Both registries key records by the folded name under the connection's
//! [`CaseMapping`]. A mapping change rebuilds the index from scratch.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::casemap::CaseMapping;
use crate::hostmask;

use super::channel::ChannelInfo;
use super::client::{ClientId, ClientInfo};

/// All users known to one connection.
#[derive(Clone, Debug, Default)]
pub struct ClientRegistry {
    casemap: CaseMapping,
    next_id: u64,
    clients: BTreeMap<ClientId, ClientInfo>,
    by_nick: BTreeMap<String, ClientId>,
}

impl ClientRegistry {
    /// Create an empty registry.
    pub fn new(casemap: CaseMapping) -> Self {
        Self {
            casemap,
            ..Self::default()
        }
    }

    /// Number of known clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// True when no clients are known.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Look up by id.
    pub fn get(&self, id: ClientId) -> Option<&ClientInfo> {
        self.clients.get(&id)
    }

    /// Mutable lookup by id.
    pub fn get_mut(&mut self, id: ClientId) -> Option<&mut ClientInfo> {
        self.clients.get_mut(&id)
    }

    /// Look up the id for a nickname or hostmask, in any case.
    pub fn find_id(&self, nick_or_mask: &str) -> Option<ClientId> {
        let key = self.casemap.fold(hostmask::parse_nick(nick_or_mask));
        self.by_nick.get(&key).copied()
    }

    /// Look up by nickname or hostmask, in any case.
    pub fn find(&self, nick_or_mask: &str) -> Option<&ClientInfo> {
        self.find_id(nick_or_mask).and_then(|id| self.clients.get(&id))
    }

    /// Mutable lookup by nickname or hostmask.
    pub fn find_mut(&mut self, nick_or_mask: &str) -> Option<&mut ClientInfo> {
        let id = self.find_id(nick_or_mask)?;
        self.clients.get_mut(&id)
    }

    /// Return the client for a hostmask, creating it on first sighting.
    ///
    /// An existing record learns ident/host from the mask when they are present.
    pub fn get_or_create(&mut self, mask: &str) -> ClientId {
        let (nick, ident, host) = hostmask::parse_full(mask);
        let key = self.casemap.fold(nick);

        if let Some(&id) = self.by_nick.get(&key) {
            if let Some(client) = self.clients.get_mut(&id) {
                client.learn_mask(ident, host);
            }
            return id;
        }

        let id = ClientId(self.next_id);
        self.next_id += 1;
        debug!(%id, nick, "new client");
        self.clients.insert(id, ClientInfo::new(id, nick, ident, host));
        self.by_nick.insert(key, id);
        id
    }

    /// Re-key a client under a new nickname, keeping its identity.
    ///
    /// Returns the id, or `None` if `old` is unknown.
    pub fn rename(&mut self, old: &str, new_nick: &str) -> Option<ClientId> {
        let old_key = self.casemap.fold(hostmask::parse_nick(old));
        let new_key = self.casemap.fold(new_nick);
        let id = self.by_nick.remove(&old_key)?;

        if let Some(stale) = self.by_nick.insert(new_key, id) {
            if stale != id {
                warn!(%stale, new_nick, "nickname taken over by rename, dropping stale index entry");
            }
        }
        if let Some(client) = self.clients.get_mut(&id) {
            client.nickname = new_nick.to_string();
        }
        Some(id)
    }

    /// Drop a client record.
    pub fn remove(&mut self, id: ClientId) -> Option<ClientInfo> {
        let client = self.clients.remove(&id)?;
        let key = self.casemap.fold(&client.nickname);
        if self.by_nick.get(&key) == Some(&id) {
            self.by_nick.remove(&key);
        }
        Some(client)
    }

    /// Iterate all clients in id order.
    pub fn iter(&self) -> impl Iterator<Item = &ClientInfo> {
        self.clients.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut ClientInfo> {
        self.clients.values_mut()
    }

    /// Rebuild the nickname index under a new case mapping.
    ///
    /// Nicknames that now fold to the same key keep the oldest client in the
    /// index. Returns `(kept, shadowed)` pairs so the caller can merge the
    /// shadowed records away.
    pub fn rekey(&mut self, casemap: CaseMapping) -> Vec<(ClientId, ClientId)> {
        self.casemap = casemap;
        self.by_nick.clear();
        let mut collisions = Vec::new();
        for client in self.clients.values() {
            let key = casemap.fold(&client.nickname);
            match self.by_nick.get(&key) {
                Some(&kept) => {
                    warn!(%kept, shadowed = %client.id, nick = %client.nickname, "nicknames collide under new casemapping");
                    collisions.push((kept, client.id));
                }
                None => {
                    self.by_nick.insert(key, client.id);
                }
            }
        }
        collisions
    }

    /// Point the index entry for `id`'s nickname at `id`.
    pub(crate) fn reindex(&mut self, id: ClientId) {
        if let Some(client) = self.clients.get(&id) {
            self.by_nick.insert(self.casemap.fold(&client.nickname), id);
        }
    }

    /// Forget every client.
    pub fn clear(&mut self) {
        self.clients.clear();
        self.by_nick.clear();
    }
}

/// All channels known to one connection.
#[derive(Clone, Debug, Default)]
pub struct ChannelRegistry {
    casemap: CaseMapping,
    channels: BTreeMap<String, ChannelInfo>,
}

impl ChannelRegistry {
    /// Create an empty registry.
    pub fn new(casemap: CaseMapping) -> Self {
        Self {
            casemap,
            channels: BTreeMap::new(),
        }
    }

    /// Folded lookup key for a channel name.
    pub fn key(&self, name: &str) -> String {
        self.casemap.fold(name)
    }

    /// Number of known channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// True when no channels are known.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// True when the channel is known.
    pub fn contains(&self, name: &str) -> bool {
        self.channels.contains_key(&self.key(name))
    }

    /// Look up by name, in any case.
    pub fn get(&self, name: &str) -> Option<&ChannelInfo> {
        self.channels.get(&self.key(name))
    }

    /// Mutable lookup by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut ChannelInfo> {
        let key = self.key(name);
        self.channels.get_mut(&key)
    }

    /// Return the channel, creating it if unknown.
    pub fn get_or_create(&mut self, name: &str) -> &mut ChannelInfo {
        let key = self.key(name);
        self.channels.entry(key).or_insert_with(|| {
            debug!(channel = name, "new channel");
            ChannelInfo::new(name)
        })
    }

    /// Drop a channel record.
    pub fn remove(&mut self, name: &str) -> Option<ChannelInfo> {
        let key = self.key(name);
        self.channels.remove(&key)
    }

    /// Iterate `(folded key, channel)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ChannelInfo)> {
        self.channels.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut ChannelInfo> {
        self.channels.values_mut()
    }

    /// Rebuild the channel index under a new case mapping.
    ///
    /// Channels whose names now fold together are merged into the one met
    /// first, so no membership or list entry is lost.
    pub fn rekey(&mut self, casemap: CaseMapping) {
        self.casemap = casemap;
        let old = std::mem::take(&mut self.channels);
        for chan in old.into_values() {
            match self.channels.entry(casemap.fold(&chan.name)) {
                Entry::Vacant(slot) => {
                    slot.insert(chan);
                }
                Entry::Occupied(mut slot) => {
                    warn!(kept = %slot.get().name, merged = %chan.name, "channel names collide under new casemapping");
                    slot.get_mut().absorb(chan);
                }
            }
        }
    }

    /// Forget every channel.
    pub fn clear(&mut self) {
        self.channels.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_is_case_insensitive() {
        let mut reg = ClientRegistry::new(CaseMapping::Rfc1459);
        let a = reg.get_or_create("Nick[A]");
        let b = reg.get_or_create("nick{a}!ident@host");
        assert_eq!(a, b);
        assert_eq!(reg.len(), 1);

        let client = reg.find("NICK{A}").unwrap();
        assert_eq!(client.nickname(), "Nick[A]");
        assert_eq!(client.ident, "ident");
        assert_eq!(client.host, "host");
    }

    #[test]
    fn test_rename_keeps_identity() {
        let mut reg = ClientRegistry::new(CaseMapping::Rfc1459);
        let id = reg.get_or_create("old!u@h");
        assert_eq!(reg.rename("OLD", "New"), Some(id));
        assert!(reg.find("old").is_none());
        assert_eq!(reg.find("new").map(|c| c.id()), Some(id));
        assert_eq!(reg.get(id).unwrap().nickname(), "New");
        assert_eq!(reg.rename("missing", "x"), None);
    }

    #[test]
    fn test_case_only_rename() {
        let mut reg = ClientRegistry::new(CaseMapping::Rfc1459);
        let id = reg.get_or_create("nick");
        assert_eq!(reg.rename("nick", "NICK"), Some(id));
        assert_eq!(reg.find("nick").unwrap().nickname(), "NICK");
    }

    #[test]
    fn test_rekey_preserves_entries() {
        let mut reg = ClientRegistry::new(CaseMapping::Ascii);
        let a = reg.get_or_create("foo[");
        let b = reg.get_or_create("foo{");
        assert_ne!(a, b);
        assert_eq!(reg.rekey(CaseMapping::Rfc1459), vec![(a, b)]);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.find_id("FOO{"), Some(a));
        assert!(reg.get(b).is_some());

        let mut chans = ChannelRegistry::new(CaseMapping::Ascii);
        chans.get_or_create("#Chan[x]");
        chans.rekey(CaseMapping::Rfc1459);
        assert!(chans.contains("#chan{x}"));
        assert_eq!(chans.get("#CHAN[X]").unwrap().name(), "#Chan[x]");
    }

    #[test]
    fn test_rekey_merges_colliding_channels() {
        let mut chans = ChannelRegistry::new(CaseMapping::Ascii);
        chans.get_or_create("#a[").topic.text = "first".into();
        chans.get_or_create("#a{").names_complete = true;
        assert_eq!(chans.len(), 2);

        chans.rekey(CaseMapping::Rfc1459);
        assert_eq!(chans.len(), 1);
        let merged = chans.get("#A{").unwrap();
        assert_eq!(merged.name(), "#a[");
        assert_eq!(merged.topic.text, "first");
        assert!(merged.names_complete);
    }

    #[test]
    fn test_remove() {
        let mut reg = ClientRegistry::new(CaseMapping::Rfc1459);
        let id = reg.get_or_create("gone");
        assert!(reg.remove(id).is_some());
        assert!(reg.find("gone").is_none());
        assert!(reg.is_empty());
    }
}
