//! Registration, capability announcements, MOTD and keepalive.

use tracing::{debug, info, warn};

use crate::connection::ConnectionState;
use crate::event::Event;
use crate::isupport::{MyInfo, ServerType};
use crate::message::Line;
use crate::mode::ModeTable;

use super::HandlerCtx;

/// 001
pub(super) fn welcome(ctx: &mut HandlerCtx<'_>, line: &Line) {
    let nick = line.param(0).unwrap_or(ctx.session.attempted_nick.as_str()).to_string();
    ctx.state.set_own(&nick);
    info!(%nick, "registered");
    // Registering -> Connected; servers occasionally repeat 001.
    if ctx.machine.state() == ConnectionState::Registering {
        ctx.transition(ConnectionState::Connected);
    }
    ctx.emit(Event::Registered { nick });
}

/// 004
pub(super) fn myinfo(ctx: &mut HandlerCtx<'_>, line: &Line) {
    let info = MyInfo::from_params(&line.params);
    ctx.state.server_type = ServerType::detect(&info.version);
    ctx.session.quirk = (ctx.selector)(&info.version);
    debug!(
        server = %info.server_name,
        version = %info.version,
        server_type = ?ctx.state.server_type,
        quirk = ctx.session.quirk.name(),
        "server info"
    );
    ctx.state.modes = ModeTable::from_server(&ctx.state.support, &info);
    ctx.emit(Event::ServerInfo {
        server: info.server_name.clone(),
        version: info.version.clone(),
    });
    ctx.state.myinfo = info;
}

/// 005; the table is rebuilt once the run of 005 lines ends.
pub(super) fn isupport(ctx: &mut HandlerCtx<'_>, line: &Line) {
    ctx.state.support.absorb(&line.params);
    ctx.session.isupport_pending = true;
}

pub(super) fn finish_isupport(ctx: &mut HandlerCtx<'_>) {
    ctx.session.isupport_pending = false;
    if let Some(casemap) = ctx.state.support.casemapping() {
        ctx.state.set_casemapping(casemap);
    } else if let Some(name) = ctx.state.support.value("CASEMAPPING") {
        warn!(casemapping = name, "unknown casemapping, keeping current");
    }
    ctx.state.modes = ModeTable::from_server(&ctx.state.support, &ctx.state.myinfo);
    debug!(tokens = ctx.state.support.iter().count(), "mode table rebuilt from 005");
    ctx.emit(Event::Post005);
}

/// 433 and 437.
pub(super) fn nick_in_use(ctx: &mut HandlerCtx<'_>, line: &Line) {
    let nick = line.param(1).unwrap_or(ctx.session.attempted_nick.as_str()).to_string();

    if !ctx.registered() {
        let next = match &ctx.config.alt_nickname {
            Some(alt) if !ctx.session.tried_alt && !ctx.state.names_equal(alt, &nick) => {
                ctx.session.tried_alt = true;
                alt.clone()
            }
            _ => format!("{}_", ctx.session.attempted_nick),
        };
        debug!(taken = %nick, trying = %next, "nickname in use during registration");
        ctx.session.attempted_nick = next.clone();
        ctx.send(format!("NICK {next}"));
    }

    ctx.emit(Event::NickInUse { nick });
}

/// 375
pub(super) fn motd_start(ctx: &mut HandlerCtx<'_>, line: &Line) {
    let text = line.trailing().unwrap_or_default().to_string();
    ctx.emit(Event::MotdStart { text });
}

/// 372
pub(super) fn motd_line(ctx: &mut HandlerCtx<'_>, line: &Line) {
    let text = line.trailing().unwrap_or_default().to_string();
    ctx.emit(Event::MotdLine { text });
}

/// 376 and 422.
pub(super) fn motd_end(ctx: &mut HandlerCtx<'_>, line: &Line) {
    let missing = line.command == "422";
    ctx.emit(Event::MotdEnd { missing });
    if !ctx.session.ready {
        ctx.session.ready = true;
        ctx.emit(Event::ServerReady);
    }
}

pub(super) fn ping(ctx: &mut HandlerCtx<'_>, line: &Line) {
    let token = line.trailing().unwrap_or_default().to_string();
    ctx.send(format!("PONG :{token}"));
    ctx.emit(Event::ServerPing { token });
}

pub(super) fn pong(ctx: &mut HandlerCtx<'_>, line: &Line) {
    let token = line.trailing().unwrap_or_default();
    if let Some(lag) = ctx.session.ping.pong(token, ctx.now) {
        debug!(?lag, "pong");
        ctx.emit(Event::PingSuccess { lag });
    }
}

pub(super) fn error(ctx: &mut HandlerCtx<'_>, line: &Line) {
    let message = line.trailing().unwrap_or_default().to_string();
    warn!(%message, "server error");
    ctx.emit(Event::ServerError { message });
}
