//! Channel membership, topics and NAMES.

use tracing::debug;

use crate::event::Event;
use crate::hostmask::Hostmask;
use crate::message::Line;
use crate::state::Topic;

use super::{line_time, list_mode_requests, HandlerCtx};

pub(super) fn join(ctx: &mut HandlerCtx<'_>, line: &Line) {
    let Some(channel) = line.param(0) else {
        return;
    };
    let Some(mask) = line.prefix.as_deref() else {
        return;
    };
    let user = Hostmask::parse(mask);
    let own = ctx.state.is_own(&user.nick);

    if own {
        // A channel we only watched list modes for, or a missed PART.
        let stale: Vec<_> = ctx
            .state
            .channel(channel)
            .map(|c| c.members.keys().copied().collect())
            .unwrap_or_default();
        for member in stale {
            ctx.state.part(channel, member);
        }
        if let Some(chan) = ctx.state.channel_mut(channel) {
            chan.names_complete = false;
        }
    }
    let id = ctx.state.join(channel, mask);

    // extended-join: JOIN #chan account :realname
    if let (Some(account), Some(realname)) = (line.param(1), line.param(2)) {
        if let Some(client) = ctx.state.clients_mut().get_mut(id) {
            client.account = (account != "*").then(|| account.to_string());
            client.realname = Some(realname.to_string());
        }
    }

    let channel = channel.to_string();
    if own {
        debug!(%channel, "joined");
        if ctx.config.request_list_modes_on_join {
            for request in list_mode_requests(ctx.state, ctx.config, &channel) {
                ctx.send(request);
            }
        }
        ctx.emit(Event::ChannelSelfJoin { channel });
    } else {
        ctx.emit(Event::ChannelJoin { channel, user });
    }
}

pub(super) fn part(ctx: &mut HandlerCtx<'_>, line: &Line) {
    let Some(channel) = line.param(0) else {
        return;
    };
    let user = line.source();
    let reason = line.param(1).map(str::to_string);
    leave(ctx, channel, &user.nick);
    ctx.emit(Event::ChannelPart {
        channel: channel.to_string(),
        user,
        reason,
    });
}

pub(super) fn kick(ctx: &mut HandlerCtx<'_>, line: &Line) {
    let (Some(channel), Some(kicked)) = (line.param(0), line.param(1)) else {
        return;
    };
    let reason = line.param(2).map(str::to_string);
    leave(ctx, channel, kicked);
    ctx.emit(Event::ChannelKick {
        channel: channel.to_string(),
        kicker: line.source(),
        kicked: kicked.to_string(),
        reason,
    });
}

/// Drop a membership; our own departure drops the whole channel.
fn leave(ctx: &mut HandlerCtx<'_>, channel: &str, nick: &str) {
    if ctx.state.is_own(nick) {
        debug!(channel, "left channel");
        ctx.state.remove_channel(channel);
    } else if let Some(id) = ctx.state.clients().find_id(nick) {
        ctx.state.part(channel, id);
    }
}

pub(super) fn topic(ctx: &mut HandlerCtx<'_>, line: &Line) {
    let Some(channel) = line.param(0) else {
        return;
    };
    let setter = line.source().nick;
    let time = line_time(line);
    let text = line.param(1).unwrap_or_default().to_string();
    let Some(chan) = ctx.state.channel_mut(channel) else {
        return;
    };
    chan.topic = Topic { text, setter, time };
    let topic = chan.topic.clone();
    ctx.emit(Event::TopicChanged {
        channel: channel.to_string(),
        topic,
        live: true,
    });
}

/// 331 and 332.
pub(super) fn topic_reply(ctx: &mut HandlerCtx<'_>, line: &Line) {
    let Some(channel) = line.param(1) else {
        return;
    };
    let text = if line.command == "331" {
        String::new()
    } else {
        line.param(2).unwrap_or_default().to_string()
    };
    let Some(chan) = ctx.state.channel_mut(channel) else {
        return;
    };
    chan.topic.text = text;
    let topic = chan.topic.clone();
    ctx.emit(Event::TopicChanged {
        channel: channel.to_string(),
        topic,
        live: false,
    });
}

/// 333
pub(super) fn topic_who_time(ctx: &mut HandlerCtx<'_>, line: &Line) {
    let Some(channel) = line.param(1) else {
        return;
    };
    let setter = line.param(2).unwrap_or_default().to_string();
    let time = line.param(3).and_then(|t| t.parse().ok()).unwrap_or(0);
    let Some(chan) = ctx.state.channel_mut(channel) else {
        return;
    };
    chan.topic.setter = setter;
    chan.topic.time = time;
    let topic = chan.topic.clone();
    ctx.emit(Event::TopicChanged {
        channel: channel.to_string(),
        topic,
        live: false,
    });
}

/// 403, 405, 471, 473, 474, 475, 477: `<me> <channel> :<reason>`
pub(super) fn join_failed(ctx: &mut HandlerCtx<'_>, line: &Line) {
    let (Some(channel), Some(code)) = (line.param(1), line.numeric()) else {
        return;
    };
    let reason = line.param(2).unwrap_or_default().to_string();
    debug!(%channel, code, %reason, "join refused");
    ctx.emit(Event::JoinFailed {
        channel: channel.to_string(),
        code,
        reason,
    });
}

/// 353: `<me> <symbol> <channel> :<names>`; some servers omit the symbol.
pub(super) fn names(ctx: &mut HandlerCtx<'_>, line: &Line) {
    let (channel, names) = match line.params.len() {
        n if n >= 4 => (&line.params[2], &line.params[3]),
        3 => (&line.params[1], &line.params[2]),
        _ => return,
    };
    if !ctx.state.channels().contains(channel) {
        debug!(%channel, "NAMES for a channel we are not on");
        return;
    }

    for entry in names.split_whitespace() {
        let modes = ctx.state.modes();
        let mut bits = 0;
        let mut rest = entry;
        while let Some(glyph) = rest.chars().next() {
            match modes.glyph_bit(glyph) {
                Some(bit) => {
                    bits |= bit;
                    rest = &rest[glyph.len_utf8()..];
                }
                None => break,
            }
        }
        if rest.is_empty() {
            continue;
        }

        let id = ctx.state.join(channel, rest);
        if let Some(member) = ctx
            .state
            .channel_mut(channel)
            .and_then(|chan| chan.member_mut(id))
        {
            member.prefix_modes = bits;
        }
    }
}

/// 366
pub(super) fn end_of_names(ctx: &mut HandlerCtx<'_>, line: &Line) {
    let Some(channel) = line.param(1) else {
        return;
    };
    let Some(chan) = ctx.state.channel_mut(channel) else {
        return;
    };
    chan.names_complete = true;
    ctx.emit(Event::NamesComplete {
        channel: channel.to_string(),
    });
}

/// 329
pub(super) fn creation_time(ctx: &mut HandlerCtx<'_>, line: &Line) {
    let (Some(channel), Some(time)) = (line.param(1), line.param(2)) else {
        return;
    };
    if let Some(chan) = ctx.state.channel_mut(channel) {
        chan.created = time.parse().unwrap_or(0);
    }
}

pub(super) fn invite(ctx: &mut HandlerCtx<'_>, line: &Line) {
    let Some(channel) = line.param(1) else {
        return;
    };
    ctx.emit(Event::Invite {
        channel: channel.to_string(),
        sender: line.source(),
    });
}
