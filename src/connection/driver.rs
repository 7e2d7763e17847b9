//! Tokio read loop around a [`Parser`].

use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, warn};

use super::{ConnectionState, LineCodec};
use crate::error::{ClientError, Result};
use crate::parser::Parser;
use crate::ping::PingAction;

const PING_TICK: Duration = Duration::from_secs(1);

#[derive(Debug)]
enum Command {
    Raw(String),
    Disconnect(String),
}

/// Cloneable handle for queueing lines from other tasks or threads.
#[derive(Clone, Debug)]
pub struct ConnectionHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl ConnectionHandle {
    /// Queue a raw line. It goes out after any line already queued.
    pub fn send_raw(&self, line: impl Into<String>) -> Result<()> {
        self.tx
            .send(Command::Raw(line.into()))
            .map_err(|_| ClientError::ChannelClosed)
    }

    /// Send QUIT and close the transport.
    pub fn disconnect(&self, reason: impl Into<String>) -> Result<()> {
        self.tx
            .send(Command::Disconnect(reason.into()))
            .map_err(|_| ClientError::ChannelClosed)
    }
}

/// Owns a [`Parser`] and runs it over an async transport.
///
/// Reads and dispatch happen in the task calling [`Connection::run`]; writes
/// are serialized through one writer task so they never block reading.
#[derive(Debug)]
pub struct Connection {
    parser: Parser,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl Connection {
    /// Wrap a parser. Register listeners on it first.
    pub fn new(parser: Parser) -> (Self, ConnectionHandle) {
        let (tx, commands) = mpsc::unbounded_channel();
        (Self { parser, commands }, ConnectionHandle { tx })
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    /// Register over `transport` and process lines until the connection ends.
    ///
    /// Transport failures on either half end the loop normally with the
    /// parser torn down; the returned parser is always `Disconnected`.
    pub async fn run<T>(mut self, transport: T) -> Result<Parser>
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        if self.parser.connection_state() == ConnectionState::Disconnected {
            self.parser.connecting()?;
        }
        self.parser.connected()?;

        let (read, write) = tokio::io::split(transport);
        let mut lines = FramedRead::new(read, LineCodec::new());
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let mut writer = spawn_writer(FramedWrite::new(write, LineCodec::new()), out_rx);

        let mut ticker = tokio::time::interval(PING_TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut commands_open = true;
        let mut writer_done = false;

        loop {
            flush(&mut self.parser, &out_tx);

            tokio::select! {
                frame = lines.next() => match frame {
                    Some(Ok(line)) => self.parser.dispatch(&line),
                    Some(Err(e)) => {
                        warn!(error = %e, "read failed");
                        self.parser.connection_lost(Some(e.to_string()));
                        break;
                    }
                    None => {
                        info!("server closed the connection");
                        self.parser.connection_lost(Some("connection closed by peer".to_string()));
                        break;
                    }
                },
                command = self.commands.recv(), if commands_open => match command {
                    Some(Command::Raw(line)) => self.parser.send_line(line),
                    Some(Command::Disconnect(reason)) => {
                        self.parser.disconnect(&reason);
                        break;
                    }
                    None => commands_open = false,
                },
                result = &mut writer => {
                    let reason = match result {
                        Ok(Ok(())) => "writer closed".to_string(),
                        Ok(Err(e)) => format!("write failed: {e}"),
                        Err(e) => format!("writer task failed: {e}"),
                    };
                    warn!(%reason, "lost the write half");
                    self.parser.connection_lost(Some(reason));
                    writer_done = true;
                    break;
                },
                _ = ticker.tick() => {
                    if self.parser.poll_ping(Instant::now()) == PingAction::TimedOut {
                        self.parser.connection_lost(Some("ping timeout".to_string()));
                        break;
                    }
                }
            }
        }

        if !writer_done {
            flush(&mut self.parser, &out_tx);
            drop(out_tx);
            match writer.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!(error = %e, "writer stopped"),
                Err(e) => warn!(error = %e, "writer task failed"),
            }
        }
        Ok(self.parser)
    }
}

fn flush(parser: &mut Parser, out: &mpsc::UnboundedSender<String>) {
    for line in parser.take_outbound() {
        if out.send(line).is_err() {
            debug!("writer gone, dropping outbound lines");
            break;
        }
    }
}

fn spawn_writer<W>(
    mut sink: FramedWrite<W, LineCodec>,
    mut rx: mpsc::UnboundedReceiver<String>,
) -> JoinHandle<Result<()>>
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            sink.send(line).await?;
        }
        sink.close().await?;
        Ok(())
    })
}
