//! Channel and user mode handling.
//!
//! - [`ModeTable`] classifies letters from the server's capability tokens.
//! - [`processor`] walks MODE lines and list-mode replies into state changes.
//! - [`quirks`] holds the per-ircd rules for overloaded list numerics.

pub mod processor;
pub mod quirks;
mod table;

pub use self::processor::{
    apply_channel_modes, apply_list_line, apply_user_modes, classify_list_numeric,
    parse_channel_modes, ListNumeric, ListOutcome, ListReply, ModeChange,
};
pub use self::quirks::{default_quirk_selector, HyperionQuirk, ListModeQuirk, QuirkSelector, StandardQuirk};
pub use self::table::{ModeKind, ModeTable};
