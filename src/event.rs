//! Typed events produced by line dispatch.
//!
//! Every recognised command or numeric becomes one or more [`Event`]s after
//! the state has been updated, so listeners always see the post-line state.
//! [`EventKind`] is the subscription tag.

use std::fmt;
use std::time::Duration;

use crate::connection::ConnectionState;
use crate::error::LineParseError;
use crate::hostmask::Hostmask;
use crate::mode::ModeChange;
use crate::state::Topic;

/// Something that happened on the connection.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Event {
    /// A raw line arrived.
    DataIn {
        /// The line without its terminator.
        line: String,
    },
    /// A raw line was queued for sending.
    DataOut {
        /// The line without its terminator.
        line: String,
    },
    /// A line could not be tokenized and was dropped.
    Malformed {
        /// The offending line.
        line: String,
        /// Why it was rejected.
        error: LineParseError,
    },
    /// Any numeric reply, recognised or not.
    Numeric {
        /// Numeric code.
        code: u16,
        /// Parameters, starting with our nickname.
        params: Vec<String>,
    },
    /// The connection state machine moved.
    StateChanged {
        /// Previous state.
        from: ConnectionState,
        /// New state.
        to: ConnectionState,
    },
    /// 001 arrived; `nick` is the nickname the server confirmed.
    Registered {
        /// Our nickname.
        nick: String,
    },
    /// 004 arrived.
    ServerInfo {
        /// Server name.
        server: String,
        /// Server software version.
        version: String,
    },
    /// The mode table was rebuilt from the capability announcement.
    Post005,
    /// The MOTD finished (or was missing); the connection is usable.
    ServerReady,
    /// The requested nickname is taken.
    NickInUse {
        /// Nickname that was refused.
        nick: String,
    },
    /// Start of the MOTD.
    MotdStart {
        /// Header text.
        text: String,
    },
    /// One MOTD line.
    MotdLine {
        /// Line text.
        text: String,
    },
    /// End of the MOTD.
    MotdEnd {
        /// True for 422 (no MOTD).
        missing: bool,
    },
    /// We joined a channel.
    ChannelSelfJoin {
        /// Channel name.
        channel: String,
    },
    /// The server refused a JOIN (banned, invite-only, full, bad key, ...).
    JoinFailed {
        /// Channel name.
        channel: String,
        /// Refusing numeric.
        code: u16,
        /// Server-supplied text.
        reason: String,
    },
    /// Someone else joined a channel.
    ChannelJoin {
        /// Channel name.
        channel: String,
        /// Who joined.
        user: Hostmask,
    },
    /// Someone (possibly us) left a channel.
    ChannelPart {
        /// Channel name.
        channel: String,
        /// Who left.
        user: Hostmask,
        /// Part message.
        reason: Option<String>,
    },
    /// Someone (possibly us) was kicked.
    ChannelKick {
        /// Channel name.
        channel: String,
        /// Who kicked.
        kicker: Hostmask,
        /// Nickname of the kicked user.
        kicked: String,
        /// Kick message.
        reason: Option<String>,
    },
    /// A member of a channel quit the network (one event per shared channel).
    ChannelQuit {
        /// Channel name.
        channel: String,
        /// Who quit.
        user: Hostmask,
        /// Quit message.
        reason: Option<String>,
    },
    /// Someone quit the network.
    Quit {
        /// Who quit.
        user: Hostmask,
        /// Quit message.
        reason: Option<String>,
    },
    /// Someone (possibly us) changed nickname.
    NickChanged {
        /// Previous nickname.
        old: String,
        /// New nickname.
        new: String,
    },
    /// A channel topic was set or reported.
    TopicChanged {
        /// Channel name.
        channel: String,
        /// The topic after this line.
        topic: Topic,
        /// True for a live TOPIC command, false for a 332/333 reply.
        live: bool,
    },
    /// The NAMES reply for a channel finished.
    NamesComplete {
        /// Channel name.
        channel: String,
    },
    /// Channel modes changed (MODE or 324).
    ChannelModeChanged {
        /// Channel name.
        channel: String,
        /// Who set them; the server name for 324.
        setter: String,
        /// Changes that took effect.
        changes: Vec<ModeChange>,
    },
    /// A member's prefix mode changed.
    ChannelUserModeChanged {
        /// Channel name.
        channel: String,
        /// Who set it.
        setter: String,
        /// Affected nickname.
        target: String,
        /// Prefix mode letter.
        mode: char,
        /// `+` or `-`.
        adding: bool,
    },
    /// A list-mode batch for a channel completed.
    ListModesRetrieved {
        /// Channel name.
        channel: String,
        /// Mode letter.
        mode: char,
    },
    /// A user's modes changed (221 or user MODE).
    UserModeChanged {
        /// Affected nickname.
        nick: String,
        /// Mode string as received.
        modes: String,
    },
    /// PRIVMSG to a channel.
    ChannelMessage {
        /// Channel name (STATUSMSG prefix stripped).
        channel: String,
        /// Sender.
        sender: Hostmask,
        /// Message text.
        text: String,
    },
    /// CTCP ACTION to a channel.
    ChannelAction {
        /// Channel name.
        channel: String,
        /// Sender.
        sender: Hostmask,
        /// Action text.
        text: String,
    },
    /// CTCP request to a channel.
    ChannelCtcp {
        /// Channel name.
        channel: String,
        /// Sender.
        sender: Hostmask,
        /// CTCP command, uppercased.
        command: String,
        /// Arguments; empty when none.
        args: String,
    },
    /// CTCP reply to a channel.
    ChannelCtcpReply {
        /// Channel name.
        channel: String,
        /// Sender.
        sender: Hostmask,
        /// CTCP command, uppercased.
        command: String,
        /// Arguments; empty when none.
        args: String,
    },
    /// NOTICE to a channel.
    ChannelNotice {
        /// Channel name.
        channel: String,
        /// Sender.
        sender: Hostmask,
        /// Notice text.
        text: String,
    },
    /// PRIVMSG to us.
    PrivateMessage {
        /// Sender.
        sender: Hostmask,
        /// Message text.
        text: String,
    },
    /// CTCP ACTION to us.
    PrivateAction {
        /// Sender.
        sender: Hostmask,
        /// Action text.
        text: String,
    },
    /// CTCP request to us.
    PrivateCtcp {
        /// Sender.
        sender: Hostmask,
        /// CTCP command, uppercased.
        command: String,
        /// Arguments; empty when none.
        args: String,
    },
    /// CTCP reply to us.
    PrivateCtcpReply {
        /// Sender.
        sender: Hostmask,
        /// CTCP command, uppercased.
        command: String,
        /// Arguments; empty when none.
        args: String,
    },
    /// NOTICE from a user to us.
    PrivateNotice {
        /// Sender.
        sender: Hostmask,
        /// Notice text.
        text: String,
    },
    /// NOTICE from a server, or any NOTICE before registration.
    ServerNotice {
        /// Server name or origin.
        source: String,
        /// Notice text.
        text: String,
    },
    /// We were invited to a channel.
    Invite {
        /// Channel name.
        channel: String,
        /// Who invited us.
        sender: Hostmask,
    },
    /// WALLOPS broadcast.
    Wallops {
        /// Sender.
        sender: Hostmask,
        /// Text.
        text: String,
    },
    /// Our own away state changed (305/306).
    AwayState {
        /// True when now away.
        away: bool,
    },
    /// Another user is away (301).
    UserAway {
        /// Nickname.
        nick: String,
        /// Away message.
        reason: String,
    },
    /// The server sent PING; a PONG has been queued.
    ServerPing {
        /// Ping token.
        token: String,
    },
    /// We sent a liveness PING.
    PingSent {
        /// Ping token.
        token: String,
    },
    /// The server answered our PING.
    PingSuccess {
        /// Round-trip time.
        lag: Duration,
    },
    /// Our PING went unanswered for the configured timeout.
    PingFailed {
        /// Time since the PING was sent.
        elapsed: Duration,
    },
    /// ERROR from the server.
    ServerError {
        /// Error text.
        message: String,
    },
    /// The transport closed.
    SocketClosed {
        /// Why, when known.
        reason: Option<String>,
    },
}

/// Subscription tag for an [`Event`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum EventKind {
    DataIn,
    DataOut,
    Malformed,
    Numeric,
    StateChanged,
    Registered,
    ServerInfo,
    Post005,
    ServerReady,
    NickInUse,
    MotdStart,
    MotdLine,
    MotdEnd,
    ChannelSelfJoin,
    JoinFailed,
    ChannelJoin,
    ChannelPart,
    ChannelKick,
    ChannelQuit,
    Quit,
    NickChanged,
    TopicChanged,
    NamesComplete,
    ChannelModeChanged,
    ChannelUserModeChanged,
    ListModesRetrieved,
    UserModeChanged,
    ChannelMessage,
    ChannelAction,
    ChannelCtcp,
    ChannelCtcpReply,
    ChannelNotice,
    PrivateMessage,
    PrivateAction,
    PrivateCtcp,
    PrivateCtcpReply,
    PrivateNotice,
    ServerNotice,
    Invite,
    Wallops,
    AwayState,
    UserAway,
    ServerPing,
    PingSent,
    PingSuccess,
    PingFailed,
    ServerError,
    SocketClosed,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Event {
    /// Subscription tag.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::DataIn { .. } => EventKind::DataIn,
            Event::DataOut { .. } => EventKind::DataOut,
            Event::Malformed { .. } => EventKind::Malformed,
            Event::Numeric { .. } => EventKind::Numeric,
            Event::StateChanged { .. } => EventKind::StateChanged,
            Event::Registered { .. } => EventKind::Registered,
            Event::ServerInfo { .. } => EventKind::ServerInfo,
            Event::Post005 => EventKind::Post005,
            Event::ServerReady => EventKind::ServerReady,
            Event::NickInUse { .. } => EventKind::NickInUse,
            Event::MotdStart { .. } => EventKind::MotdStart,
            Event::MotdLine { .. } => EventKind::MotdLine,
            Event::MotdEnd { .. } => EventKind::MotdEnd,
            Event::ChannelSelfJoin { .. } => EventKind::ChannelSelfJoin,
            Event::JoinFailed { .. } => EventKind::JoinFailed,
            Event::ChannelJoin { .. } => EventKind::ChannelJoin,
            Event::ChannelPart { .. } => EventKind::ChannelPart,
            Event::ChannelKick { .. } => EventKind::ChannelKick,
            Event::ChannelQuit { .. } => EventKind::ChannelQuit,
            Event::Quit { .. } => EventKind::Quit,
            Event::NickChanged { .. } => EventKind::NickChanged,
            Event::TopicChanged { .. } => EventKind::TopicChanged,
            Event::NamesComplete { .. } => EventKind::NamesComplete,
            Event::ChannelModeChanged { .. } => EventKind::ChannelModeChanged,
            Event::ChannelUserModeChanged { .. } => EventKind::ChannelUserModeChanged,
            Event::ListModesRetrieved { .. } => EventKind::ListModesRetrieved,
            Event::UserModeChanged { .. } => EventKind::UserModeChanged,
            Event::ChannelMessage { .. } => EventKind::ChannelMessage,
            Event::ChannelAction { .. } => EventKind::ChannelAction,
            Event::ChannelCtcp { .. } => EventKind::ChannelCtcp,
            Event::ChannelCtcpReply { .. } => EventKind::ChannelCtcpReply,
            Event::ChannelNotice { .. } => EventKind::ChannelNotice,
            Event::PrivateMessage { .. } => EventKind::PrivateMessage,
            Event::PrivateAction { .. } => EventKind::PrivateAction,
            Event::PrivateCtcp { .. } => EventKind::PrivateCtcp,
            Event::PrivateCtcpReply { .. } => EventKind::PrivateCtcpReply,
            Event::PrivateNotice { .. } => EventKind::PrivateNotice,
            Event::ServerNotice { .. } => EventKind::ServerNotice,
            Event::Invite { .. } => EventKind::Invite,
            Event::Wallops { .. } => EventKind::Wallops,
            Event::AwayState { .. } => EventKind::AwayState,
            Event::UserAway { .. } => EventKind::UserAway,
            Event::ServerPing { .. } => EventKind::ServerPing,
            Event::PingSent { .. } => EventKind::PingSent,
            Event::PingSuccess { .. } => EventKind::PingSuccess,
            Event::PingFailed { .. } => EventKind::PingFailed,
            Event::ServerError { .. } => EventKind::ServerError,
            Event::SocketClosed { .. } => EventKind::SocketClosed,
        }
    }

    /// Name a filtered listener matches against.
    ///
    /// Channel events report the channel; private events report the other
    /// party's nickname; nickname-scoped events report that nickname.
    pub fn target(&self) -> Option<&str> {
        match self {
            Event::ChannelSelfJoin { channel }
            | Event::JoinFailed { channel, .. }
            | Event::ChannelJoin { channel, .. }
            | Event::ChannelPart { channel, .. }
            | Event::ChannelKick { channel, .. }
            | Event::ChannelQuit { channel, .. }
            | Event::TopicChanged { channel, .. }
            | Event::NamesComplete { channel }
            | Event::ChannelModeChanged { channel, .. }
            | Event::ChannelUserModeChanged { channel, .. }
            | Event::ListModesRetrieved { channel, .. }
            | Event::ChannelMessage { channel, .. }
            | Event::ChannelAction { channel, .. }
            | Event::ChannelCtcp { channel, .. }
            | Event::ChannelCtcpReply { channel, .. }
            | Event::ChannelNotice { channel, .. }
            | Event::Invite { channel, .. } => Some(channel),
            Event::PrivateMessage { sender, .. }
            | Event::PrivateAction { sender, .. }
            | Event::PrivateCtcp { sender, .. }
            | Event::PrivateCtcpReply { sender, .. }
            | Event::PrivateNotice { sender, .. } => Some(&sender.nick),
            Event::Quit { user, .. } => Some(&user.nick),
            Event::NickChanged { old, .. } => Some(old),
            Event::UserModeChanged { nick, .. }
            | Event::UserAway { nick, .. }
            | Event::NickInUse { nick } => Some(nick),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_target() {
        let ev = Event::ChannelMessage {
            channel: "#rust".into(),
            sender: Hostmask::parse("a!b@c"),
            text: "hi".into(),
        };
        assert_eq!(ev.kind(), EventKind::ChannelMessage);
        assert_eq!(ev.target(), Some("#rust"));

        let ev = Event::PrivateCtcpReply {
            sender: Hostmask::parse("bob!b@c"),
            command: "VERSION".into(),
            args: "x".into(),
        };
        assert_eq!(ev.target(), Some("bob"));
        assert_eq!(Event::ServerReady.target(), None);

        let ev = Event::JoinFailed {
            channel: "#closed".into(),
            code: 474,
            reason: "banned".into(),
        };
        assert_eq!(ev.kind(), EventKind::JoinFailed);
        assert_eq!(ev.target(), Some("#closed"));
        assert_eq!(EventKind::Post005.to_string(), "Post005");
    }
}
