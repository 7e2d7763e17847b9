//! Turning MODE lines and list-mode replies into state changes.

use tracing::{debug, trace};

use crate::isupport::ServerSupport;
use crate::response::Response;
use crate::state::{ChannelInfo, ClientRegistry, ListModeItem};

use super::quirks::ListModeQuirk;
use super::table::{ModeKind, ModeTable};

enum PlusMinus {
    Plus,
    Minus,
}

/// One parsed channel mode change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModeChange {
    /// `+` or `-`.
    pub adding: bool,
    /// Mode letter.
    pub mode: char,
    /// Classification at the time of parsing.
    pub kind: ModeKind,
    /// Consumed parameter, if the mode takes one.
    pub param: Option<String>,
}

/// Walk a mode string and its parameters.
///
/// Unknown letters are skipped without consuming a parameter. A change whose
/// required parameter is missing is dropped, except for list modes where that
/// is a list query and also dropped.
pub fn parse_channel_modes<S: AsRef<str>>(table: &ModeTable, pieces: &[S]) -> Vec<ModeChange> {
    use self::PlusMinus::*;

    let mut res = vec![];
    let Some((first, rest)) = pieces.split_first() else {
        return res;
    };
    let mut args = rest.iter().map(AsRef::as_ref);
    let mut cur_mod = Plus;

    for c in first.as_ref().chars() {
        match c {
            '+' => cur_mod = Plus,
            '-' => cur_mod = Minus,
            _ => {
                let adding = matches!(cur_mod, Plus);
                let Some(kind) = table.kind(c) else {
                    trace!(mode = %c, "ignoring unknown channel mode");
                    continue;
                };
                let param = if kind.takes_param(adding) {
                    match args.next() {
                        Some(arg) => Some(arg.to_string()),
                        None => continue,
                    }
                } else {
                    None
                };
                res.push(ModeChange {
                    adding,
                    mode: c,
                    kind,
                    param,
                });
            }
        }
    }

    res
}

/// Apply parsed changes to a channel.
///
/// Prefix changes resolve their nickname through `clients`; changes for
/// non-members are dropped. Returns the changes that took effect.
pub fn apply_channel_modes(
    channel: &mut ChannelInfo,
    clients: &ClientRegistry,
    changes: Vec<ModeChange>,
    setter: &str,
    time: i64,
) -> Vec<ModeChange> {
    let mut applied = Vec::with_capacity(changes.len());

    for change in changes {
        let took_effect = match (change.kind, change.param.as_deref()) {
            (ModeKind::Boolean(bit), _) => {
                if change.adding {
                    channel.boolean_modes |= bit;
                } else {
                    channel.boolean_modes &= !bit;
                }
                true
            }
            (ModeKind::Parameter | ModeKind::DoubleParameter, value) => {
                match (change.adding, value) {
                    (true, Some(v)) => {
                        channel.param_modes.insert(change.mode, v.to_string());
                    }
                    _ => {
                        channel.param_modes.remove(&change.mode);
                    }
                }
                true
            }
            (ModeKind::List, Some(item)) => {
                if change.adding {
                    channel.add_list_item(change.mode, ListModeItem::new(item, setter, time));
                    true
                } else {
                    channel.remove_list_item(change.mode, item)
                }
            }
            (ModeKind::Prefix { bit, .. }, Some(nick)) => {
                let member = clients.find_id(nick).and_then(|id| channel.member_mut(id));
                match member {
                    Some(member) => {
                        if change.adding {
                            member.prefix_modes |= bit;
                        } else {
                            member.prefix_modes &= !bit;
                        }
                        true
                    }
                    None => {
                        debug!(channel = %channel.name(), nick, "prefix change for non-member");
                        false
                    }
                }
            }
            (ModeKind::List | ModeKind::Prefix { .. }, None) => false,
        };

        if took_effect {
            applied.push(change);
        }
    }

    applied
}

/// Apply a user mode string to a mask. Unknown letters are ignored.
pub fn apply_user_modes(table: &ModeTable, mut mask: u64, modes: &str) -> u64 {
    let mut adding = true;
    for c in modes.chars() {
        match c {
            '+' => adding = true,
            '-' => adding = false,
            _ => match table.user_bit(c) {
                Some(bit) if adding => mask |= bit,
                Some(bit) => mask &= !bit,
                None => trace!(mode = %c, "ignoring unknown user mode"),
            },
        }
    }
    mask
}

/// Item or terminator line of a list-mode reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListReply {
    /// One entry.
    Item,
    /// End of the list.
    End,
}

/// What a list-mode numeric carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListNumeric {
    /// Item or end.
    pub reply: ListReply,
    /// Letter implied by the numeric; `None` when it is the parameter after the channel.
    pub mode: Option<char>,
}

impl ListNumeric {
    const fn item(mode: Option<char>) -> Self {
        Self {
            reply: ListReply::Item,
            mode,
        }
    }

    const fn end(mode: Option<char>) -> Self {
        Self {
            reply: ListReply::End,
            mode,
        }
    }
}

/// Recognise a list-mode numeric for this server.
pub fn classify_list_numeric(code: u16, support: &ServerSupport) -> Option<ListNumeric> {
    let excepts = support.excepts_mode().unwrap_or('e');
    let invex = support.invex_mode().unwrap_or('I');

    let standard = match Response::from_code(code) {
        Some(Response::RPL_BANLIST) => Some(ListNumeric::item(Some('b'))),
        Some(Response::RPL_ENDOFBANLIST) => Some(ListNumeric::end(Some('b'))),
        Some(Response::RPL_EXCEPTLIST) => Some(ListNumeric::item(Some(excepts))),
        Some(Response::RPL_ENDOFEXCEPTLIST) => Some(ListNumeric::end(Some(excepts))),
        Some(Response::RPL_INVITELIST) => Some(ListNumeric::item(Some(invex))),
        Some(Response::RPL_ENDOFINVITELIST) => Some(ListNumeric::end(Some(invex))),
        Some(Response::RPL_REOPLIST) => Some(ListNumeric::item(Some('R'))),
        Some(Response::RPL_ENDOFREOPLIST) => Some(ListNumeric::end(Some('R'))),
        Some(Response::RPL_QUIETLIST) => Some(ListNumeric::item(None)),
        Some(Response::RPL_ENDOFQUIETLIST) => Some(ListNumeric::end(None)),
        _ => None,
    };
    if standard.is_some() {
        return standard;
    }

    let base = support.listmode_numeric()?;
    if code == base {
        Some(ListNumeric::item(None))
    } else if Some(code) == base.checked_add(1) {
        Some(ListNumeric::end(None))
    } else {
        None
    }
}

/// Result of feeding one list-mode line to a channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListOutcome {
    /// An entry was recorded under this letter.
    Item(char),
    /// These letters' lists are now complete.
    Ended(Vec<char>),
}

/// Feed one list-mode reply line (`params` starts with our nickname).
///
/// Returns `None` for lines too short to carry a channel, letter or item.
pub fn apply_list_line(
    channel: &mut ChannelInfo,
    quirk: &dyn ListModeQuirk,
    numeric: ListNumeric,
    params: &[String],
) -> Option<ListOutcome> {
    let (mode, rest) = match numeric.mode {
        Some(mode) => (mode, params.get(2..)?),
        None => (params.get(2)?.chars().next()?, params.get(3..)?),
    };

    match numeric.reply {
        ListReply::Item => {
            let raw = rest.first()?;
            let (mode, item) = quirk.resolve_item(mode, raw);
            let setter = rest.get(1).map(String::as_str).unwrap_or("");
            let time = rest.get(2).and_then(|t| t.parse().ok()).unwrap_or(0);
            channel.receive_list_item(mode, ListModeItem::new(item, setter, time));
            Some(ListOutcome::Item(mode))
        }
        ListReply::End => {
            let modes = quirk.end_modes(mode);
            let mut ended = Vec::with_capacity(modes.len());
            for m in modes {
                if channel.end_list_batch(m) || m == mode {
                    ended.push(m);
                }
            }
            debug!(channel = %channel.name(), ?ended, "list-mode batch complete");
            Some(ListOutcome::Ended(ended))
        }
    }
}
