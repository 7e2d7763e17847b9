//! MODE, 324, 221 and list-mode replies.

use tracing::debug;

use crate::config::ClientConfig;
use crate::event::Event;
use crate::message::Line;
use crate::mode::{
    apply_channel_modes, apply_list_line, apply_user_modes, parse_channel_modes, ListNumeric,
    ListOutcome, ModeChange, ModeKind,
};
use crate::state::NetworkState;

use super::{line_time, HandlerCtx};

pub(super) fn mode(ctx: &mut HandlerCtx<'_>, line: &Line) {
    let Some(target) = line.param(0) else {
        return;
    };
    let setter = line.source().nick;

    if ctx.state.is_channel_name(target) {
        let time = line_time(line);
        let changes = channel_changes(ctx, target, &line.params[1..], &setter, time, false);
        emit_channel_changes(ctx, target, &setter, changes);
    } else {
        let modes = line.params[1..].join(" ");
        user_modes(ctx, target, &modes, false);
    }
}

/// 324: `<me> <channel> <modes> [params...]`, a full snapshot.
pub(super) fn channel_mode_is(ctx: &mut HandlerCtx<'_>, line: &Line) {
    let Some(channel) = line.param(1) else {
        return;
    };
    let setter = line.source().nick;
    let time = line_time(line);
    let changes = channel_changes(ctx, channel, &line.params[2..], &setter, time, true);
    emit_channel_changes(ctx, channel, &setter, changes);
}

fn channel_changes(
    ctx: &mut HandlerCtx<'_>,
    channel: &str,
    pieces: &[String],
    setter: &str,
    time: i64,
    snapshot: bool,
) -> Option<Vec<ModeChange>> {
    let Some((chan, clients, table)) = ctx.state.channel_and_clients(channel) else {
        debug!(channel, "mode change for unknown channel");
        return None;
    };
    if snapshot {
        chan.boolean_modes = 0;
        chan.param_modes.clear();
    }
    let parsed = parse_channel_modes(table, pieces);
    Some(apply_channel_modes(chan, clients, parsed, setter, time))
}

fn emit_channel_changes(
    ctx: &mut HandlerCtx<'_>,
    channel: &str,
    setter: &str,
    changes: Option<Vec<ModeChange>>,
) {
    let Some(changes) = changes else {
        return;
    };
    for change in &changes {
        if let (ModeKind::Prefix { .. }, Some(target)) = (change.kind, &change.param) {
            ctx.emit(Event::ChannelUserModeChanged {
                channel: channel.to_string(),
                setter: setter.to_string(),
                target: target.clone(),
                mode: change.mode,
                adding: change.adding,
            });
        }
    }
    ctx.emit(Event::ChannelModeChanged {
        channel: channel.to_string(),
        setter: setter.to_string(),
        changes,
    });
}

/// 221: `<me> <modes>`
pub(super) fn umode_is(ctx: &mut HandlerCtx<'_>, line: &Line) {
    let (Some(nick), Some(modes)) = (line.param(0), line.param(1)) else {
        return;
    };
    user_modes(ctx, nick, modes, true);
}

fn user_modes(ctx: &mut HandlerCtx<'_>, nick: &str, modes: &str, snapshot: bool) {
    let Some(current) = ctx.state.client(nick).map(|c| c.user_modes) else {
        debug!(nick, "user mode for untracked client");
        return;
    };
    let base = if snapshot { 0 } else { current };
    let mask = apply_user_modes(ctx.state.modes(), base, modes);
    if let Some(client) = ctx.state.client_mut(nick) {
        client.user_modes = mask;
    }
    ctx.emit(Event::UserModeChanged {
        nick: nick.to_string(),
        modes: modes.to_string(),
    });
}

/// Item or end line of any list-mode reply.
pub(super) fn list_reply(ctx: &mut HandlerCtx<'_>, line: &Line, numeric: ListNumeric) {
    let Some(channel) = line.param(1) else {
        return;
    };
    let quirk = &*ctx.session.quirk;
    let chan = ctx.state.channel_or_create(channel);
    if let Some(ListOutcome::Ended(modes)) = apply_list_line(chan, quirk, numeric, &line.params) {
        let name = chan.name().to_string();
        for mode in modes {
            ctx.emit(Event::ListModesRetrieved {
                channel: name.clone(),
                mode,
            });
        }
    }
}

/// `MODE <channel> <letters>` lines asking for every list mode, grouped by MODES.
pub(crate) fn list_mode_requests(
    state: &NetworkState,
    config: &ClientConfig,
    channel: &str,
) -> Vec<String> {
    let letters: Vec<char> = match &config.list_mode_chars {
        Some(chars) => chars.chars().collect(),
        None => state.modes().list_modes().collect(),
    };
    if letters.is_empty() {
        return Vec::new();
    }
    let per_line = state.support().modes_per_line().unwrap_or(3).max(1);
    letters
        .chunks(per_line.min(letters.len()))
        .map(|group| format!("MODE {channel} {}", group.iter().collect::<String>()))
        .collect()
}
