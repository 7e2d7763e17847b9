//! PRIVMSG, NOTICE, CTCP and WALLOPS.

use crate::event::Event;
use crate::hostmask::Hostmask;
use crate::message::Line;

use super::HandlerCtx;

const CTCP_DELIM: char = '\x01';

/// Split a `\x01COMMAND args\x01` body into its uppercased command and args.
///
/// The closing delimiter is optional; some clients drop it.
pub(crate) fn split_ctcp(text: &str) -> Option<(String, String)> {
    let body = text.strip_prefix(CTCP_DELIM)?;
    let body = body.strip_suffix(CTCP_DELIM).unwrap_or(body);
    if body.is_empty() {
        return None;
    }
    let (command, args) = body.split_once(' ').unwrap_or((body, ""));
    Some((command.to_ascii_uppercase(), args.to_string()))
}

/// Strip STATUSMSG glyphs (`@#chan`, `+#chan`) when a channel follows them.
///
/// Servers that omit STATUSMSG get the PREFIX glyphs instead.
fn strip_status<'t>(ctx: &HandlerCtx<'_>, target: &'t str) -> &'t str {
    let statusmsg = ctx.state.support().statusmsg();
    let modes = ctx.state.modes();
    let stripped = if statusmsg.is_empty() {
        target.trim_start_matches(|c| modes.is_prefix_glyph(c))
    } else {
        target.trim_start_matches(|c| statusmsg.contains(c))
    };
    if stripped.len() != target.len() && ctx.state.is_channel_name(stripped) {
        stripped
    } else {
        target
    }
}

fn learn_sender(ctx: &mut HandlerCtx<'_>, sender: &Hostmask) {
    if let Some(client) = ctx.state.client_mut(&sender.nick) {
        client.learn_mask(&sender.ident, &sender.host);
    }
}

pub(super) fn privmsg(ctx: &mut HandlerCtx<'_>, line: &Line) {
    let (Some(target), Some(text)) = (line.param(0), line.param(1)) else {
        return;
    };
    let sender = line.source();
    learn_sender(ctx, &sender);
    let target = strip_status(ctx, target);
    let channel = ctx.state.is_channel_name(target).then(|| target.to_string());

    let event = match (split_ctcp(text), channel) {
        (Some((command, args)), Some(channel)) if command == "ACTION" => Event::ChannelAction {
            channel,
            sender,
            text: args,
        },
        (Some((command, args)), None) if command == "ACTION" => {
            Event::PrivateAction { sender, text: args }
        }
        (Some((command, args)), Some(channel)) => Event::ChannelCtcp {
            channel,
            sender,
            command,
            args,
        },
        (Some((command, args)), None) => Event::PrivateCtcp {
            sender,
            command,
            args,
        },
        (None, Some(channel)) => Event::ChannelMessage {
            channel,
            sender,
            text: text.to_string(),
        },
        (None, None) => Event::PrivateMessage {
            sender,
            text: text.to_string(),
        },
    };
    ctx.emit(event);
}

pub(super) fn notice(ctx: &mut HandlerCtx<'_>, line: &Line) {
    let (Some(target), Some(text)) = (line.param(0), line.param(1)) else {
        return;
    };
    let sender = line.source();

    // Servers send NOTICE AUTH / NOTICE * before we have a nick.
    if line.prefix.is_none() || sender.is_server_name() || !ctx.registered() {
        let source = if sender.nick.is_empty() {
            ctx.state.myinfo().server_name.clone()
        } else {
            sender.nick
        };
        ctx.emit(Event::ServerNotice {
            source,
            text: text.to_string(),
        });
        return;
    }

    learn_sender(ctx, &sender);
    let target = strip_status(ctx, target);
    let channel = ctx.state.is_channel_name(target).then(|| target.to_string());

    let event = match (split_ctcp(text), channel) {
        (Some((command, args)), Some(channel)) => Event::ChannelCtcpReply {
            channel,
            sender,
            command,
            args,
        },
        (Some((command, args)), None) => Event::PrivateCtcpReply {
            sender,
            command,
            args,
        },
        (None, Some(channel)) => Event::ChannelNotice {
            channel,
            sender,
            text: text.to_string(),
        },
        (None, None) => Event::PrivateNotice {
            sender,
            text: text.to_string(),
        },
    };
    ctx.emit(event);
}

pub(super) fn wallops(ctx: &mut HandlerCtx<'_>, line: &Line) {
    let text = line.trailing().unwrap_or_default().to_string();
    ctx.emit(Event::Wallops {
        sender: line.source(),
        text,
    });
}
