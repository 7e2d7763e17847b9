//! Error types for the IRC client engine.
//!
//! Parsing never surfaces these to the read loop: a line that fails to
//! tokenize becomes a diagnostic event instead. The errors here are for
//! configuration, the transport driver, and callers that tokenize lines
//! themselves.

use thiserror::Error;

/// Convenience type alias for Results using [`ClientError`].
pub type Result<T, E = ClientError> = std::result::Result<T, E>;

/// Top-level client errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A raw line could not be tokenized.
    #[error("invalid line: {line}")]
    InvalidLine {
        /// The raw line.
        line: String,
        /// The underlying tokenizer error.
        #[source]
        cause: LineParseError,
    },

    /// The client configuration was rejected.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A connection state transition that the state machine does not allow.
    #[error("invalid state transition: {from} -> {to}")]
    InvalidState {
        /// State the machine was in.
        from: &'static str,
        /// State that was requested.
        to: &'static str,
    },

    /// The connection task is gone and can no longer accept commands.
    #[error("connection closed")]
    ChannelClosed,
}

/// Errors encountered when tokenizing a raw IRC line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LineParseError {
    /// Line was empty (or only a line terminator).
    #[error("empty line")]
    EmptyLine,

    /// Line had a prefix or tags but no command token.
    #[error("missing command")]
    MissingCommand,

    /// Tokenizing failed with position information.
    #[error("parsing failed at position {position}: {context}")]
    ParseContext {
        /// Byte position where tokenizing failed.
        position: usize,
        /// Description of what was being parsed.
        context: String,
    },
}

/// Errors raised while validating or loading a [`ClientConfig`](crate::config::ClientConfig).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// No nickname configured.
    #[error("nickname must not be empty")]
    EmptyNickname,

    /// Nickname contains characters the protocol cannot carry.
    #[error("invalid nickname: {0}")]
    InvalidNickname(String),

    /// No username (ident) configured.
    #[error("username must not be empty")]
    EmptyUsername,

    /// Ping timeout of zero would disconnect immediately.
    #[error("ping timeout must be greater than zero")]
    ZeroPingTimeout,

    /// The configuration document could not be parsed.
    #[error("config parse error: {0}")]
    Parse(String),
}
