//! Channel records and join relationships.

use std::collections::{BTreeMap, BTreeSet};

use super::client::ClientId;

/// One entry of a list mode (ban, exception, invite exception, ...).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ListModeItem {
    /// The mask or value.
    pub item: String,
    /// Who set it; empty when unknown.
    pub setter: String,
    /// Unix seconds; 0 when unknown.
    pub time: i64,
}

impl ListModeItem {
    /// Create a new entry.
    pub fn new(item: impl Into<String>, setter: impl Into<String>, time: i64) -> Self {
        Self {
            item: item.into(),
            setter: setter.into(),
            time,
        }
    }
}

/// Channel topic with its metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Topic {
    /// Topic text; empty when unset.
    pub text: String,
    /// Who set it; empty when unknown.
    pub setter: String,
    /// Unix seconds; 0 when unknown.
    pub time: i64,
}

/// A client's membership in one channel.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelClientInfo {
    pub(crate) client: ClientId,
    /// Prefix-mode bitmask; higher bits are more important.
    pub prefix_modes: u64,
    /// Free-form annotations for collaborators.
    pub properties: BTreeMap<String, String>,
}

impl ChannelClientInfo {
    pub(crate) fn new(client: ClientId) -> Self {
        Self {
            client,
            prefix_modes: 0,
            properties: BTreeMap::new(),
        }
    }

    /// The member's identity.
    pub fn client(&self) -> ClientId {
        self.client
    }
}

/// A joined (or list-mode monitored) channel.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelInfo {
    pub(crate) name: String,
    /// Current topic.
    pub topic: Topic,
    /// Creation time from 329; 0 when unknown.
    pub created: i64,
    /// Boolean-mode bitmask (bits assigned by the mode table).
    pub boolean_modes: u64,
    /// Single-value parameter modes, e.g. `k` and `l`.
    pub param_modes: BTreeMap<char, String>,
    /// List modes by letter, entries in receipt order.
    pub list_modes: BTreeMap<char, Vec<ListModeItem>>,
    /// List-mode letters with a batch in progress.
    pub(crate) list_batches: BTreeSet<char>,
    pub(crate) members: BTreeMap<ClientId, ChannelClientInfo>,
    /// Set once the first NAMES reply has finished (366).
    pub names_complete: bool,
    /// Free-form annotations for collaborators.
    pub properties: BTreeMap<String, String>,
}

impl ChannelInfo {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            topic: Topic::default(),
            created: 0,
            boolean_modes: 0,
            param_modes: BTreeMap::new(),
            list_modes: BTreeMap::new(),
            list_batches: BTreeSet::new(),
            members: BTreeMap::new(),
            names_complete: false,
            properties: BTreeMap::new(),
        }
    }

    /// Channel name as the server first sent it.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entries of one list mode; empty when never seen.
    pub fn list_mode(&self, mode: char) -> &[ListModeItem] {
        self.list_modes.get(&mode).map(Vec::as_slice).unwrap_or_default()
    }

    /// True while a list-mode batch for `mode` is being received.
    pub fn is_receiving_list(&self, mode: char) -> bool {
        self.list_batches.contains(&mode)
    }

    /// Number of members.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Member record for a client.
    pub fn member(&self, client: ClientId) -> Option<&ChannelClientInfo> {
        self.members.get(&client)
    }

    /// Mutable member record for a client.
    pub fn member_mut(&mut self, client: ClientId) -> Option<&mut ChannelClientInfo> {
        self.members.get_mut(&client)
    }

    /// All member records.
    pub fn members(&self) -> impl Iterator<Item = &ChannelClientInfo> {
        self.members.values()
    }

    /// Append an entry unless an identical mask is already listed.
    pub(crate) fn add_list_item(&mut self, mode: char, entry: ListModeItem) {
        let list = self.list_modes.entry(mode).or_default();
        if !list.iter().any(|e| e.item == entry.item) {
            list.push(entry);
        }
    }

    /// Remove every entry whose mask matches. Returns true if one was removed.
    pub(crate) fn remove_list_item(&mut self, mode: char, item: &str) -> bool {
        match self.list_modes.get_mut(&mode) {
            Some(list) => {
                let before = list.len();
                list.retain(|e| e.item != item);
                list.len() != before
            }
            None => false,
        }
    }

    /// Handle one item line of a list-mode reply.
    ///
    /// The first item of a batch clears whatever the list held before, so a
    /// refresh replaces the list instead of appending to it.
    pub(crate) fn receive_list_item(&mut self, mode: char, entry: ListModeItem) {
        if self.list_batches.insert(mode) {
            tracing::debug!(channel = %self.name, mode = %mode, "new list-mode batch, clearing");
            self.list_modes.insert(mode, Vec::new());
        }
        // Reply lines are stored as the server sent them, repeats included.
        self.list_modes.entry(mode).or_default().push(entry);
    }

    /// Fold a membership into this channel, OR'ing prefix bits with any
    /// record the client already has.
    pub(crate) fn merge_member(&mut self, member: ChannelClientInfo) {
        match self.members.get_mut(&member.client) {
            Some(existing) => {
                existing.prefix_modes |= member.prefix_modes;
                for (key, value) in member.properties {
                    existing.properties.entry(key).or_insert(value);
                }
            }
            None => {
                self.members.insert(member.client, member);
            }
        }
    }

    /// Merge another record of the same channel into this one.
    ///
    /// Members and list entries are united. Scalar state already held here
    /// (topic, modes, creation time) wins.
    pub(crate) fn absorb(&mut self, other: ChannelInfo) {
        for member in other.members.into_values() {
            self.merge_member(member);
        }
        for (mode, items) in other.list_modes {
            for entry in items {
                self.add_list_item(mode, entry);
            }
        }
        for (mode, value) in other.param_modes {
            self.param_modes.entry(mode).or_insert(value);
        }
        for (key, value) in other.properties {
            self.properties.entry(key).or_insert(value);
        }
        self.boolean_modes |= other.boolean_modes;
        if self.topic.text.is_empty() {
            self.topic = other.topic;
        }
        if self.created == 0 {
            self.created = other.created;
        }
        self.list_batches.extend(other.list_batches);
        self.names_complete |= other.names_complete;
    }

    /// Handle the end-of-list line. Returns true if a batch was in progress.
    pub(crate) fn end_list_batch(&mut self, mode: char) -> bool {
        self.list_batches.remove(&mode)
    }
}
