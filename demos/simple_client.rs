//! Minimal client: connect, join a channel and log what happens there.
//!
//! ```text
//! RUST_LOG=slirc_client=debug cargo run --example simple_client -- irc.libera.chat:6667 ferris '#slirc'
//! ```

use slirc_client::{ClientConfig, Connection, Event, EventKind, ListenerContext, Parser};
use tokio::net::TcpStream;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let mut args = std::env::args().skip(1);
    let addr = args.next().unwrap_or_else(|| "127.0.0.1:6667".to_string());
    let nick = args.next().unwrap_or_else(|| "slirc".to_string());
    let channel = args.next().unwrap_or_else(|| "#slirc".to_string());

    let mut config = ClientConfig::new(nick);
    config.alt_nickname = Some(format!("{}-", config.nickname));
    config.request_list_modes_on_join = true;

    let mut parser = Parser::new(config)?;
    let callbacks = parser.callbacks_mut();

    callbacks.subscribe(
        EventKind::ServerReady,
        move |_: &Event, ctx: &mut ListenerContext<'_>| {
            ctx.send(format!("JOIN {channel}"));
            Ok(())
        },
    );
    callbacks.subscribe(
        EventKind::NamesComplete,
        |event: &Event, ctx: &mut ListenerContext<'_>| {
            if let Event::NamesComplete { channel } = event {
                if let Some(info) = ctx.state().channel(channel) {
                    let modes = ctx.state().modes();
                    let names: Vec<String> = info
                        .members()
                        .filter_map(|m| {
                            let client = ctx.state().clients().get(m.client())?;
                            let glyphs = modes.glyphs(m.prefix_modes);
                            Some(format!("{glyphs}{}", client.nickname()))
                        })
                        .collect();
                    info!(%channel, members = names.len(), "{}", names.join(" "));
                }
            }
            Ok(())
        },
    );
    callbacks.subscribe(
        EventKind::ChannelMessage,
        |event: &Event, _: &mut ListenerContext<'_>| {
            if let Event::ChannelMessage { channel, sender, text } = event {
                info!(%channel, "<{}> {}", sender.nick, text);
            }
            Ok(())
        },
    );
    callbacks.subscribe(
        EventKind::PrivateCtcp,
        |event: &Event, ctx: &mut ListenerContext<'_>| {
            if let Event::PrivateCtcp { sender, command, .. } = event {
                if command == "VERSION" {
                    ctx.send(format!(
                        "NOTICE {} :\x01VERSION slirc-client {}\x01",
                        sender.nick,
                        env!("CARGO_PKG_VERSION")
                    ));
                }
            }
            Ok(())
        },
    );
    callbacks.subscribe(
        EventKind::ListModesRetrieved,
        |event: &Event, ctx: &mut ListenerContext<'_>| {
            if let Event::ListModesRetrieved { channel, mode } = event {
                let count = ctx
                    .state()
                    .channel(channel)
                    .map_or(0, |c| c.list_mode(*mode).len());
                info!(%channel, %mode, count, "list mode retrieved");
            }
            Ok(())
        },
    );

    info!(%addr, "connecting");
    parser.connecting()?;
    let stream = TcpStream::connect(&addr).await?;
    let (conn, handle) = Connection::new(parser);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = handle.disconnect("interrupted");
        }
    });

    let parser = conn.run(stream).await?;
    info!(state = %parser.connection_state(), "done");
    Ok(())
}
