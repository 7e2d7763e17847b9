//! The protocol engine: one [`Parser`] per connection.
//!
//! `Parser` is sans-io. Feed it raw lines with [`Parser::dispatch`], drain
//! the lines it wants written with [`Parser::take_outbound`], and drive its
//! keepalive with [`Parser::poll_ping`]. The [`Connection`](crate::connection::Connection)
//! driver does all three over a tokio transport.
//!
//! ```
//! use slirc_client::{ClientConfig, Event, EventKind, ListenerContext, Parser};
//!
//! let mut parser = Parser::new(ClientConfig::new("me")).unwrap();
//! parser
//!     .callbacks_mut()
//!     .subscribe(EventKind::ChannelSelfJoin, |event: &Event, _: &mut ListenerContext<'_>| {
//!         println!("{event:?}");
//!         Ok(())
//!     });
//! parser.connecting().unwrap();
//! parser.connected().unwrap();
//! parser.dispatch(":irc.example.net 001 me :Welcome");
//! parser.dispatch(":me!u@h JOIN #rust");
//! assert!(parser.state().channel("#RUST").is_some());
//! ```

use std::collections::VecDeque;
use std::time::Instant;

use tracing::{debug, trace, warn};

use crate::callback::CallbackManager;
use crate::config::ClientConfig;
use crate::connection::{ConnectionState, StateMachine};
use crate::error::{ClientError, Result};
use crate::event::Event;
use crate::handlers::{self, list_mode_requests, HandlerCtx, Session};
use crate::message::Line;
use crate::mode::{default_quirk_selector, QuirkSelector};
use crate::ping::PingAction;
use crate::state::NetworkState;

/// Protocol state and listeners for a single connection.
pub struct Parser {
    state: NetworkState,
    callbacks: CallbackManager,
    machine: StateMachine,
    session: Session,
    config: ClientConfig,
    selector: QuirkSelector,
    outbound: VecDeque<String>,
}

impl Parser {
    /// Create a parser after validating `config`.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_quirk_selector(config, default_quirk_selector)
    }

    /// Like [`Parser::new`] with a custom list-mode quirk strategy.
    pub fn with_quirk_selector(config: ClientConfig, selector: QuirkSelector) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: NetworkState::new(),
            callbacks: CallbackManager::new(),
            machine: StateMachine::new(),
            session: Session::new(&config, selector),
            config,
            selector,
            outbound: VecDeque::new(),
        })
    }

    pub fn state(&self) -> &NetworkState {
        &self.state
    }

    /// Mutable access for collaborators, e.g. to pin a query partner with
    /// [`NetworkState::set_keep_alive`].
    pub fn state_mut(&mut self) -> &mut NetworkState {
        &mut self.state
    }

    pub fn callbacks_mut(&mut self) -> &mut CallbackManager {
        &mut self.callbacks
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.machine.state()
    }

    /// Nickname we last asked for; the confirmed one is [`NetworkState::own_nick`].
    pub fn attempted_nick(&self) -> &str {
        &self.session.attempted_nick
    }

    /// The transport is being opened.
    pub fn connecting(&mut self) -> Result<()> {
        self.transition(ConnectionState::Connecting)
    }

    /// The transport is up: start registration.
    pub fn connected(&mut self) -> Result<()> {
        let from = self.machine.transition(ConnectionState::Registering)?;
        let mut lines = Vec::new();
        if let Some(pass) = &self.config.password {
            lines.push(format!("PASS {pass}"));
        }
        lines.push(format!("NICK {}", self.config.nickname));
        lines.push(format!(
            "USER {} 0 * :{}",
            self.config.username, self.config.realname
        ));
        let events = vec![Event::StateChanged {
            from,
            to: ConnectionState::Registering,
        }];
        self.flush_events(events, lines);
        Ok(())
    }

    /// Process one raw line from the server.
    pub fn dispatch(&mut self, raw: &str) {
        self.dispatch_at(raw, Instant::now());
    }

    /// [`Parser::dispatch`] with an explicit receive time.
    pub fn dispatch_at(&mut self, raw: &str, now: Instant) {
        let raw = raw.trim_end_matches(['\r', '\n']);
        trace!(line = raw, "<<");
        self.session.ping.activity(now);

        let mut events = vec![Event::DataIn {
            line: raw.to_string(),
        }];
        let mut lines = Vec::new();

        match Line::parse(raw) {
            Ok(line) => {
                let mut ctx = HandlerCtx {
                    state: &mut self.state,
                    session: &mut self.session,
                    machine: &mut self.machine,
                    config: &self.config,
                    selector: self.selector,
                    events: &mut events,
                    outbound: &mut lines,
                    now,
                };
                handlers::handle(&mut ctx, &line);
            }
            Err(error) => {
                let wrapped = ClientError::InvalidLine {
                    line: raw.to_string(),
                    cause: error.clone(),
                };
                warn!(error = %wrapped, "dropping malformed line");
                events.push(Event::Malformed {
                    line: raw.to_string(),
                    error,
                });
            }
        }

        self.flush_events(events, lines);
    }

    /// Queue a raw line for the transport.
    pub fn send_line(&mut self, line: impl Into<String>) {
        self.flush_events(Vec::new(), vec![line.into()]);
    }

    /// Drain every line queued for writing.
    pub fn take_outbound(&mut self) -> Vec<String> {
        self.outbound.drain(..).collect()
    }

    /// Lines waiting for the transport.
    pub fn outbound_len(&self) -> usize {
        self.outbound.len()
    }

    /// Ask the server for every list mode of `channel`.
    pub fn request_list_modes(&mut self, channel: &str) {
        let lines = list_mode_requests(&self.state, &self.config, channel);
        self.flush_events(Vec::new(), lines);
    }

    /// Advance the keepalive timer. `SendPing` has already queued the PING.
    pub fn poll_ping(&mut self, now: Instant) -> PingAction {
        if !self.machine.state().is_active() {
            return PingAction::Idle;
        }
        let action = self.session.ping.poll(now);
        match action {
            PingAction::Idle => {}
            PingAction::SendPing => {
                let token = self.session.ping.start(now);
                let line = format!("PING :{token}");
                self.flush_events(vec![Event::PingSent { token }], vec![line]);
            }
            PingAction::TimedOut => {
                let elapsed = self.session.ping.elapsed(now).unwrap_or_default();
                warn!(?elapsed, "ping timeout");
                self.flush_events(vec![Event::PingFailed { elapsed }], Vec::new());
            }
        }
        action
    }

    /// Close deliberately: QUIT (when registered or registering), then tear down.
    pub fn disconnect(&mut self, reason: &str) {
        if matches!(
            self.machine.state(),
            ConnectionState::Registering | ConnectionState::Connected
        ) {
            let line = if reason.is_empty() {
                "QUIT".to_string()
            } else {
                format!("QUIT :{reason}")
            };
            self.send_line(line);
        }
        self.teardown(Some(reason.to_string()));
    }

    /// The transport failed or the peer closed it.
    pub fn connection_lost(&mut self, reason: Option<String>) {
        self.teardown(reason);
    }

    fn teardown(&mut self, reason: Option<String>) {
        if self.machine.state() == ConnectionState::Disconnected {
            return;
        }
        let mut events = Vec::new();
        for to in [ConnectionState::Closing, ConnectionState::Disconnected] {
            match self.machine.transition(to) {
                Ok(from) => events.push(Event::StateChanged { from, to }),
                Err(e) => debug!(error = %e, "skipping teardown step"),
            }
        }
        self.state.clear();
        debug!(?reason, "connection state cleared");
        events.push(Event::SocketClosed { reason });
        self.flush_events(events, Vec::new());
    }

    fn transition(&mut self, to: ConnectionState) -> Result<()> {
        let from = self.machine.transition(to)?;
        self.flush_events(vec![Event::StateChanged { from, to }], Vec::new());
        Ok(())
    }

    /// Queue `lines`, then fire `events` followed by a `DataOut` for every
    /// line. Lines sent by listeners are queued and announced the same way.
    fn flush_events(&mut self, events: Vec<Event>, lines: Vec<String>) {
        let mut pending: VecDeque<Event> = events.into();
        self.enqueue(lines, &mut pending);

        let mut sent = Vec::new();
        while let Some(event) = pending.pop_front() {
            self.callbacks.fire(&event, &self.state, &mut sent);
            if !sent.is_empty() {
                let lines = std::mem::take(&mut sent);
                self.enqueue(lines, &mut pending);
            }
        }
    }

    fn enqueue(&mut self, lines: Vec<String>, pending: &mut VecDeque<Event>) {
        for line in lines {
            trace!(line = %line, ">>");
            pending.push_back(Event::DataOut { line: line.clone() });
            self.outbound.push_back(line);
        }
    }
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("state", &self.machine.state())
            .field("nick", &self.session.attempted_nick)
            .field("channels", &self.state.channels().len())
            .field("listeners", &self.callbacks.len())
            .field("outbound", &self.outbound.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::ListenerContext;
    use crate::error::LineParseError;
    use crate::event::EventKind;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn registered() -> Parser {
        let mut parser = Parser::new(ClientConfig::new("me")).unwrap();
        parser.connecting().unwrap();
        parser.connected().unwrap();
        parser.dispatch(":irc.test 001 me :Welcome");
        parser.take_outbound();
        parser
    }

    #[test]
    fn test_registration_lines() {
        let mut config = ClientConfig::new("me");
        config.password = Some("hunter2".into());
        config.realname = "Real Name".into();
        let mut parser = Parser::new(config).unwrap();
        parser.connecting().unwrap();
        parser.connected().unwrap();
        assert_eq!(
            parser.take_outbound(),
            vec!["PASS hunter2", "NICK me", "USER slirc 0 * :Real Name"]
        );
        assert_eq!(parser.connection_state(), ConnectionState::Registering);
    }

    #[test]
    fn test_welcome_connects() {
        let parser = registered();
        assert_eq!(parser.connection_state(), ConnectionState::Connected);
        assert_eq!(parser.state().own_nick(), Some("me"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = Parser::new(ClientConfig::new("")).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_server_ping_answered() {
        let mut parser = registered();
        parser.dispatch("PING :abc123");
        assert_eq!(parser.take_outbound(), vec!["PONG :abc123"]);
    }

    #[test]
    fn test_malformed_line_is_reported() {
        let mut parser = registered();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        parser
            .callbacks_mut()
            .subscribe(EventKind::Malformed, move |e: &Event, _: &mut ListenerContext<'_>| {
                sink.lock().unwrap().push(e.clone());
                Ok(())
            });
        parser.dispatch("   ");
        parser.dispatch(":only.a.prefix");
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(matches!(
            &seen[0],
            Event::Malformed { line, error: LineParseError::EmptyLine } if line == "   "
        ));
        assert!(matches!(
            &seen[1],
            Event::Malformed { error: LineParseError::MissingCommand | LineParseError::ParseContext { .. }, .. }
        ));
        assert_eq!(parser.connection_state(), ConnectionState::Connected);
    }

    #[test]
    fn test_listener_can_reply() {
        let mut parser = registered();
        parser.callbacks_mut().subscribe(
            EventKind::PrivateCtcp,
            |e: &Event, ctx: &mut ListenerContext<'_>| {
                if let Event::PrivateCtcp { sender, command, .. } = e {
                    if command == "VERSION" {
                        ctx.send(format!("NOTICE {} :\x01VERSION slirc\x01", sender.nick));
                    }
                }
                Ok(())
            },
        );
        parser.dispatch(":bob!b@host PRIVMSG me :\x01VERSION\x01");
        assert_eq!(
            parser.take_outbound(),
            vec!["NOTICE bob :\x01VERSION slirc\x01"]
        );
    }

    #[test]
    fn test_data_out_follows_sent_lines() {
        let mut parser = registered();
        let kinds = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&kinds);
        parser
            .callbacks_mut()
            .subscribe_all(move |e: &Event, _: &mut ListenerContext<'_>| {
                sink.lock().unwrap().push(e.kind());
                Ok(())
            });
        parser.dispatch("PING :x");
        assert_eq!(
            *kinds.lock().unwrap(),
            vec![EventKind::DataIn, EventKind::ServerPing, EventKind::DataOut]
        );
    }

    #[test]
    fn test_disconnect_clears_state() {
        let mut parser = registered();
        parser.dispatch(":me!u@h JOIN #c");
        parser.dispatch(":irc.test 353 me = #c :me @a +b");
        parser.disconnect("bye");
        assert_eq!(parser.take_outbound(), vec!["QUIT :bye"]);
        assert_eq!(parser.connection_state(), ConnectionState::Disconnected);
        assert!(parser.state().channels().is_empty());
        assert!(parser.state().clients().is_empty());
        assert!(parser.connecting().is_err());
    }

    #[test]
    fn test_connection_lost_sends_nothing() {
        let mut parser = registered();
        parser.connection_lost(Some("reset".into()));
        assert!(parser.take_outbound().is_empty());
        assert_eq!(parser.connection_state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_ping_cycle() {
        let mut config = ClientConfig::new("me");
        config.ping_interval = 10;
        config.ping_timeout = 5;
        let mut parser = Parser::new(config).unwrap();
        parser.connecting().unwrap();
        parser.connected().unwrap();
        let t0 = Instant::now();
        parser.dispatch_at(":irc.test 001 me :Welcome", t0);
        parser.take_outbound();

        let t1 = t0 + Duration::from_secs(10);
        assert_eq!(parser.poll_ping(t1), PingAction::SendPing);
        assert_eq!(parser.take_outbound(), vec!["PING :slirc-1"]);
        assert_eq!(parser.poll_ping(t1 + Duration::from_secs(2)), PingAction::Idle);

        parser.dispatch_at(":irc.test PONG irc.test :slirc-1", t1 + Duration::from_secs(1));
        assert_eq!(parser.poll_ping(t1 + Duration::from_secs(6)), PingAction::Idle);

        let t2 = t1 + Duration::from_secs(11);
        assert_eq!(parser.poll_ping(t2), PingAction::SendPing);
        assert_eq!(
            parser.poll_ping(t2 + Duration::from_secs(5)),
            PingAction::TimedOut
        );
    }

    #[test]
    fn test_alt_nick_then_underscore() {
        let mut config = ClientConfig::new("me");
        config.alt_nickname = Some("me2".into());
        let mut parser = Parser::new(config).unwrap();
        parser.connecting().unwrap();
        parser.connected().unwrap();
        parser.take_outbound();

        parser.dispatch(":irc.test 433 * me :Nickname is already in use");
        assert_eq!(parser.take_outbound(), vec!["NICK me2"]);
        parser.dispatch(":irc.test 433 * me2 :Nickname is already in use");
        assert_eq!(parser.take_outbound(), vec!["NICK me2_"]);
        parser.dispatch(":irc.test 001 me2_ :Welcome");
        assert_eq!(parser.state().own_nick(), Some("me2_"));

        parser.dispatch(":irc.test 433 me2_ other :Nickname is already in use");
        assert!(parser.take_outbound().is_empty());
    }
}
