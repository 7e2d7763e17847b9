//! Server-specific interpretation of list-mode replies.
//!
//! Some ircds reuse one numeric pair for several list modes. A
//! [`ListModeQuirk`] decides which letter an item belongs to, and which
//! batches an end-of-list line closes. Parsers pick one per connection
//! through a [`QuirkSelector`] keyed on the 004 version string.

use std::fmt;

use crate::isupport::ServerType;

/// Resolution rule for list-mode replies.
pub trait ListModeQuirk: fmt::Debug + Send + Sync {
    /// Short name for diagnostics.
    fn name(&self) -> &'static str;

    /// Map an item line to its logical mode letter and stored mask.
    ///
    /// `mode` is the letter implied by the numeric.
    fn resolve_item<'a>(&self, mode: char, item: &'a str) -> (char, &'a str);

    /// Letters whose batches an end-of-list line for `mode` terminates.
    fn end_modes(&self, mode: char) -> Vec<char>;
}

/// Picks the quirk for a server software version string.
pub type QuirkSelector = fn(&str) -> Box<dyn ListModeQuirk>;

/// Every numeric means what it says.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardQuirk;

impl ListModeQuirk for StandardQuirk {
    fn name(&self) -> &'static str {
        "standard"
    }

    fn resolve_item<'a>(&self, mode: char, item: &'a str) -> (char, &'a str) {
        (mode, item)
    }

    fn end_modes(&self, mode: char) -> Vec<char> {
        vec![mode]
    }
}

/// Hyperion and Dancer send bans, quiets (`%mask`) and `d` (realname bans)
/// through the ban numerics.
#[derive(Clone, Copy, Debug, Default)]
pub struct HyperionQuirk;

impl ListModeQuirk for HyperionQuirk {
    fn name(&self) -> &'static str {
        "hyperion"
    }

    fn resolve_item<'a>(&self, mode: char, item: &'a str) -> (char, &'a str) {
        if mode != 'b' || item.is_empty() {
            return (mode, item);
        }
        if let Some(quiet) = item.strip_prefix('%') {
            return ('q', quiet);
        }
        match (item.find('!'), item.find('@')) {
            (Some(bang), Some(at)) if bang < at => ('b', item),
            _ => ('d', item),
        }
    }

    fn end_modes(&self, mode: char) -> Vec<char> {
        if mode == 'b' {
            vec!['b', 'd', 'q']
        } else {
            vec![mode]
        }
    }
}

/// Default selector: the Hyperion rule for that family, standard otherwise.
pub fn default_quirk_selector(version: &str) -> Box<dyn ListModeQuirk> {
    if ServerType::detect(version).overloads_ban_list() {
        Box::new(HyperionQuirk)
    } else {
        Box::new(StandardQuirk)
    }
}
