//! Connection lifecycle.
//!
//! [`StateMachine`] enforces the lifecycle
//! `Disconnected -> Connecting -> Registering -> Connected -> Closing -> Disconnected`.
//! One machine covers one connection; reconnecting needs a fresh one.
//!
//! With the `tokio` feature, [`Connection`] drives a [`Parser`](crate::Parser)
//! over any async byte stream using [`LineCodec`].

#[cfg(feature = "tokio")]
mod codec;
#[cfg(feature = "tokio")]
mod driver;

#[cfg(feature = "tokio")]
pub use self::codec::LineCodec;
#[cfg(feature = "tokio")]
pub use self::driver::{Connection, ConnectionHandle};

use std::fmt;

use crate::error::{ClientError, Result};

/// Where a connection is in its lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConnectionState {
    /// No transport.
    #[default]
    Disconnected,
    /// Transport is being established.
    Connecting,
    /// Transport is up; NICK/USER sent, waiting for 001.
    Registering,
    /// Registration complete.
    Connected,
    /// Shutting down; state is being torn down.
    Closing,
}

impl ConnectionState {
    /// Lowercase name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Registering => "registering",
            ConnectionState::Connected => "connected",
            ConnectionState::Closing => "closing",
        }
    }

    /// True while a transport exists.
    pub fn is_active(&self) -> bool {
        !matches!(self, ConnectionState::Disconnected)
    }

    fn allows(self, to: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, to),
            (Disconnected, Connecting)
                | (Connecting, Registering)
                | (Registering, Connected)
                | (Connecting | Registering | Connected, Closing)
                | (Closing, Disconnected)
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Validated lifecycle of a single connection.
#[derive(Clone, Debug, Default)]
pub struct StateMachine {
    state: ConnectionState,
    finished: bool,
}

impl StateMachine {
    /// A machine that has not connected yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// True once the machine has returned to `Disconnected` after a connection.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Move to `to`, returning the previous state.
    pub fn transition(&mut self, to: ConnectionState) -> Result<ConnectionState> {
        let from = self.state;
        if !from.allows(to) || (self.finished && to == ConnectionState::Connecting) {
            return Err(ClientError::InvalidState {
                from: from.name(),
                to: to.name(),
            });
        }
        tracing::debug!(%from, %to, "connection state change");
        self.state = to;
        if to == ConnectionState::Disconnected {
            self.finished = true;
        }
        Ok(from)
    }
}
