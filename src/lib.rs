//! # slirc-client
//!
//! The client half of the IRC protocol: everything between the socket and
//! the user interface.
//!
//! ## Features
//!
//! - Line tokenizing with IRCv3 tags, prefixes and numerics
//! - Client and channel tracking keyed by the server's casemapping
//! - Channel modes driven by 004/005, including list-mode batches and
//!   server-specific numeric quirks
//! - Typed events with generic, per-kind and per-target listeners
//! - A validated connection lifecycle with ping/pong liveness
//! - Optional Tokio driver over any async byte stream

#![deny(clippy::all)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! ## Quick Start
//!
//! ```rust
//! use slirc_client::{ClientConfig, Parser};
//!
//! let mut parser = Parser::new(ClientConfig::new("ferris")).unwrap();
//! parser.connecting().unwrap();
//! parser.connected().unwrap();
//! assert_eq!(parser.take_outbound()[0], "NICK ferris");
//!
//! for line in [
//!     ":irc.example.net 001 ferris :Welcome",
//!     ":irc.example.net 005 ferris PREFIX=(qov)~@+ CHANMODES=b,k,l,imnt :are supported",
//!     ":ferris!f@host JOIN #rust",
//!     ":irc.example.net 353 ferris = #rust :ferris ~alice +bob",
//!     ":alice!a@host MODE #rust +o bob",
//! ] {
//!     parser.dispatch(line);
//! }
//!
//! let bob = parser.state().channel_client("#Rust", "BOB").unwrap();
//! assert_eq!(parser.state().modes().glyphs(bob.prefix_modes), "@+");
//! ```

pub mod callback;
pub mod casemap;
pub mod config;
pub mod connection;
pub mod error;
pub mod event;
mod handlers;
pub mod hostmask;
pub mod isupport;
pub mod message;
pub mod mode;
pub mod parser;
pub mod ping;
pub mod response;
pub mod state;

pub use self::callback::{CallbackManager, Listener, ListenerContext, ListenerId};
pub use self::casemap::{irc_eq, irc_to_lower, CaseMapping};
pub use self::config::ClientConfig;
#[cfg(feature = "tokio")]
pub use self::connection::{Connection, ConnectionHandle, LineCodec};
pub use self::connection::{ConnectionState, StateMachine};
pub use self::error::{ClientError, ConfigError, LineParseError, Result};
pub use self::event::{Event, EventKind};
pub use self::hostmask::Hostmask;
pub use self::isupport::{MyInfo, ServerSupport, ServerType};
pub use self::message::Line;
pub use self::mode::{ModeChange, ModeKind, ModeTable};
pub use self::parser::Parser;
pub use self::ping::{PingAction, PingTracker};
pub use self::response::Response;
pub use self::state::{ChannelInfo, ClientId, ClientInfo, NetworkState};
