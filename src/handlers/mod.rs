//! Per-command line handlers.
//!
//! Handlers are the only code that mutates [`NetworkState`]. Each one reads a
//! tokenized [`Line`], updates state and queues the [`Event`]s listeners will
//! see once the whole line has been processed.

mod channel;
mod message;
mod mode;
mod registration;
mod user;

use std::time::Instant;

use tracing::trace;

use crate::config::ClientConfig;
use crate::connection::{ConnectionState, StateMachine};
use crate::event::Event;
use crate::message::Line;
use crate::mode::{classify_list_numeric, ListModeQuirk, QuirkSelector};
use crate::ping::PingTracker;
use crate::response::Response;
use crate::state::NetworkState;

pub(crate) use self::mode::list_mode_requests;

/// Per-connection protocol bookkeeping beyond the network view.
#[derive(Debug)]
pub(crate) struct Session {
    /// Nickname most recently sent with NICK during registration.
    pub attempted_nick: String,
    pub tried_alt: bool,
    /// Set once `ServerReady` has fired.
    pub ready: bool,
    /// 005 lines seen since the mode table was last rebuilt.
    pub isupport_pending: bool,
    pub quirk: Box<dyn ListModeQuirk>,
    pub ping: PingTracker,
}

impl Session {
    pub fn new(config: &ClientConfig, selector: QuirkSelector) -> Self {
        Self {
            attempted_nick: config.nickname.clone(),
            tried_alt: false,
            ready: false,
            isupport_pending: false,
            quirk: selector(""),
            ping: PingTracker::new(config.ping_interval(), config.ping_timeout()),
        }
    }
}

/// Everything a handler may touch.
pub(crate) struct HandlerCtx<'a> {
    pub state: &'a mut NetworkState,
    pub session: &'a mut Session,
    pub machine: &'a mut StateMachine,
    pub config: &'a ClientConfig,
    pub selector: QuirkSelector,
    pub events: &'a mut Vec<Event>,
    pub outbound: &'a mut Vec<String>,
    pub now: Instant,
}

impl HandlerCtx<'_> {
    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn send(&mut self, line: impl Into<String>) {
        self.outbound.push(line.into());
    }

    pub fn registered(&self) -> bool {
        self.machine.state() == ConnectionState::Connected
    }

    /// Move the state machine, emitting the change. Invalid moves are logged and skipped.
    pub fn transition(&mut self, to: ConnectionState) {
        match self.machine.transition(to) {
            Ok(from) => self.emit(Event::StateChanged { from, to }),
            Err(e) => tracing::debug!(error = %e, "ignoring state change"),
        }
    }
}

/// Unix seconds for a line: its `time` tag when present, otherwise now.
pub(crate) fn line_time(line: &Line) -> i64 {
    line.server_time()
        .unwrap_or_else(chrono::Utc::now)
        .timestamp()
}

type Handler = fn(&mut HandlerCtx<'_>, &Line);

fn command_handler(command: &str) -> Option<Handler> {
    Some(match command {
        "PING" => registration::ping,
        "PONG" => registration::pong,
        "ERROR" => registration::error,
        "JOIN" => channel::join,
        "PART" => channel::part,
        "KICK" => channel::kick,
        "TOPIC" => channel::topic,
        "INVITE" => channel::invite,
        "NICK" => user::nick,
        "QUIT" => user::quit,
        "AWAY" => user::away_notify,
        "MODE" => mode::mode,
        "PRIVMSG" => message::privmsg,
        "NOTICE" => message::notice,
        "WALLOPS" => message::wallops,
        _ => return None,
    })
}

fn numeric_handler(code: u16) -> Option<Handler> {
    use Response::*;

    Some(match Response::from_code(code)? {
        response if response.is_join_failure() => channel::join_failed,
        RPL_WELCOME => registration::welcome,
        RPL_MYINFO => registration::myinfo,
        RPL_ISUPPORT => registration::isupport,
        RPL_MOTDSTART => registration::motd_start,
        RPL_MOTD => registration::motd_line,
        RPL_ENDOFMOTD | ERR_NOMOTD => registration::motd_end,
        ERR_NICKNAMEINUSE | ERR_UNAVAILRESOURCE => registration::nick_in_use,
        RPL_NOTOPIC | RPL_TOPIC => channel::topic_reply,
        RPL_TOPICWHOTIME => channel::topic_who_time,
        RPL_NAMREPLY => channel::names,
        RPL_ENDOFNAMES => channel::end_of_names,
        RPL_CREATIONTIME => channel::creation_time,
        RPL_WHOREPLY => user::who_reply,
        RPL_WHOISUSER => user::whois_user,
        RPL_AWAY => user::away_reply,
        RPL_UNAWAY | RPL_NOWAWAY => user::own_away,
        RPL_LOGGEDIN | RPL_LOGGEDOUT => user::logged_in,
        RPL_CHANNELMODEIS => mode::channel_mode_is,
        RPL_UMODEIS => mode::umode_is,
        _ => return None,
    })
}

/// Route one tokenized line.
pub(crate) fn handle(ctx: &mut HandlerCtx<'_>, line: &Line) {
    let numeric = line.numeric();

    if ctx.session.isupport_pending && numeric != Some(Response::RPL_ISUPPORT.code()) {
        registration::finish_isupport(ctx);
    }

    if let Some(code) = numeric {
        ctx.emit(Event::Numeric {
            code,
            params: line.params.clone(),
        });
        if let Some(list) = classify_list_numeric(code, &ctx.state.support) {
            mode::list_reply(ctx, line, list);
            return;
        }
        match numeric_handler(code) {
            Some(handler) => handler(ctx, line),
            None => trace!(code, "no handler for numeric"),
        }
        return;
    }

    match command_handler(&line.command) {
        Some(handler) => handler(ctx, line),
        None => trace!(command = %line.command, "no handler for command"),
    }
}
