//! Nickname changes, quits, WHO/WHOIS and away tracking.

use tracing::debug;

use crate::event::Event;
use crate::message::Line;

use super::HandlerCtx;

pub(super) fn nick(ctx: &mut HandlerCtx<'_>, line: &Line) {
    let Some(new) = line.param(0) else {
        return;
    };
    let old = line.source().nick;
    if ctx.state.rename_client(&old, new).is_none() {
        debug!(%old, %new, "rename of untracked client");
    }
    if ctx.state.is_own(new) {
        ctx.session.attempted_nick = new.to_string();
    }
    ctx.emit(Event::NickChanged {
        old,
        new: new.to_string(),
    });
}

pub(super) fn quit(ctx: &mut HandlerCtx<'_>, line: &Line) {
    let user = line.source();
    let reason = line.param(0).map(str::to_string);

    let channels = match ctx.state.clients().find_id(&user.nick) {
        Some(id) => ctx.state.quit(id),
        None => Vec::new(),
    };
    for channel in channels {
        ctx.emit(Event::ChannelQuit {
            channel,
            user: user.clone(),
            reason: reason.clone(),
        });
    }
    ctx.emit(Event::Quit { user, reason });
}

/// 352: `<me> <channel> <ident> <host> <server> <nick> <flags> :<hops> <realname>`
pub(super) fn who_reply(ctx: &mut HandlerCtx<'_>, line: &Line) {
    if line.params.len() < 7 {
        return;
    }
    let p = &line.params;
    let (channel, ident, host, nick, flags) = (&p[1], &p[2], &p[3], &p[5], &p[6]);
    let realname = p
        .get(7)
        .and_then(|t| t.split_once(' ').map(|(_, name)| name.to_string()));

    let Some(client) = ctx.state.client_mut(nick) else {
        return;
    };
    client.learn_mask(ident, host);
    if flags.starts_with('G') {
        client.away = true;
    } else if flags.starts_with('H') {
        client.away = false;
        client.away_reason = None;
    }
    if realname.is_some() {
        client.realname = realname;
    }
    let id = client.id();

    // H@ / G*+ ...: status glyphs follow the away flag and optional oper star.
    // Without multi-prefix only the highest glyph is shown, so bits are only added.
    let modes = ctx.state.modes();
    let bits = flags
        .chars()
        .filter_map(|c| modes.glyph_bit(c))
        .fold(0, |acc, bit| acc | bit);
    if let Some(member) = ctx
        .state
        .channel_mut(channel)
        .and_then(|chan| chan.member_mut(id))
    {
        member.prefix_modes |= bits;
    }
}

/// 311: `<me> <nick> <ident> <host> * :<realname>`
pub(super) fn whois_user(ctx: &mut HandlerCtx<'_>, line: &Line) {
    let (Some(nick), Some(ident), Some(host)) = (line.param(1), line.param(2), line.param(3)) else {
        return;
    };
    let realname = line.param(5).map(str::to_string);
    if let Some(client) = ctx.state.client_mut(nick) {
        client.learn_mask(ident, host);
        if realname.is_some() {
            client.realname = realname;
        }
    }
}

/// 301
pub(super) fn away_reply(ctx: &mut HandlerCtx<'_>, line: &Line) {
    let Some(nick) = line.param(1) else {
        return;
    };
    let reason = line.param(2).unwrap_or_default().to_string();
    if let Some(client) = ctx.state.client_mut(nick) {
        client.away = true;
        client.away_reason = Some(reason.clone());
    }
    ctx.emit(Event::UserAway {
        nick: nick.to_string(),
        reason,
    });
}

/// 305 and 306.
pub(super) fn own_away(ctx: &mut HandlerCtx<'_>, line: &Line) {
    let away = line.command == "306";
    if let Some(own) = ctx.state.own_id() {
        if let Some(client) = ctx.state.clients_mut().get_mut(own) {
            client.away = away;
            if !away {
                client.away_reason = None;
            }
        }
    }
    ctx.emit(Event::AwayState { away });
}

/// away-notify: `:nick!u@h AWAY [:reason]`
pub(super) fn away_notify(ctx: &mut HandlerCtx<'_>, line: &Line) {
    let nick = line.source().nick;
    let reason = line.param(0).map(str::to_string);
    if let Some(client) = ctx.state.client_mut(&nick) {
        client.away = reason.is_some();
        client.away_reason = reason.clone();
    }
    if let Some(reason) = reason {
        ctx.emit(Event::UserAway { nick, reason });
    }
}

/// 900 and 901.
pub(super) fn logged_in(ctx: &mut HandlerCtx<'_>, line: &Line) {
    let account = (line.command == "900")
        .then(|| line.param(2))
        .flatten()
        .map(str::to_string);
    if let Some(own) = ctx.state.own_id() {
        if let Some(client) = ctx.state.clients_mut().get_mut(own) {
            client.account = account;
        }
    }
}
