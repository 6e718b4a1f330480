//! One task per accepted connection
//!
//! A session greets the client, then loops: read a line, let the protocol
//! handler answer it, write the reply, and announce the change to everyone
//! else when the board changed. Announcements from other sessions arrive on
//! the session's outbound channel and are written from the same loop, so
//! writes to one socket never interleave.
//!
//! Every board written to a client is rendered at the moment it is written,
//! and the session remembers the generation it last showed. An announcement
//! for a generation the client has already seen is dropped, so the boards a
//! client sees only ever move forward.

use crate::board::Board;
use crate::client_manager::ClientManager;
use crate::config::ServerConfig;
use crate::line_reader::{InputLine, LineReader, MAX_LINE_LENGTH};
use crate::protocol::{self, Disconnect};
use log::{debug, info, warn};
use shared::{hello_message, INVALID_MESSAGE};
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, RwLock};
use tokio::time::{sleep_until, Instant};

/// State shared by the accept loop and every session.
///
/// The board and the registry have separate locks. A session finishes its
/// board operation before it takes the registry lock, and never the reverse.
pub struct SessionContext {
    pub board: Board,
    pub clients: RwLock<ClientManager>,
    pub config: ServerConfig,
}

impl SessionContext {
    pub fn new(board: Board, config: ServerConfig) -> Self {
        Self {
            board,
            clients: RwLock::new(ClientManager::new(config.max_clients)),
            config,
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The client sent `bye`.
    Bye,
    /// The client dug up a bomb outside debug mode.
    Boom,
    /// The client closed its end of the connection.
    PeerClosed,
    ReadFailed,
    WriteFailed,
    /// No input arrived within the configured idle timeout.
    IdleTimeout,
    /// The session was dropped from the registry, e.g. on server shutdown.
    ServerShutdown,
}

impl From<Disconnect> for CloseReason {
    fn from(disconnect: Disconnect) -> Self {
        match disconnect {
            Disconnect::Bye => CloseReason::Bye,
            Disconnect::Boom => CloseReason::Boom,
        }
    }
}

async fn idle(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// One client connection, from greeting to close.
///
/// Generic over the stream so tests can drive it without a socket.
pub struct Session<S> {
    id: u32,
    lines: LineReader<BufReader<ReadHalf<S>>>,
    writer: WriteHalf<S>,
    outbound: mpsc::UnboundedReceiver<u64>,
    context: Arc<SessionContext>,
    /// Generation of the last board written to the client
    shown: Option<u64>,
}

impl<S: AsyncRead + AsyncWrite> Session<S> {
    /// Wraps a connection whose sender half of `outbound` is already
    /// registered in the context's registry under `id`.
    pub fn new(
        stream: S,
        id: u32,
        outbound: mpsc::UnboundedReceiver<u64>,
        context: Arc<SessionContext>,
    ) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            id,
            lines: LineReader::new(BufReader::new(reader)),
            writer,
            outbound,
            context,
            shown: None,
        }
    }

    /// Serves the connection until it closes, then deregisters the session.
    pub async fn run(mut self) -> CloseReason {
        let reason = self.serve().await;

        self.context.clients.write().await.remove_client(&self.id);
        if let Err(e) = self.writer.shutdown().await {
            debug!("Client {}: shutdown failed: {}", self.id, e);
        }

        info!("Client {} session closed: {:?}", self.id, reason);
        reason
    }

    async fn serve(&mut self) -> CloseReason {
        let (width, height) = self.context.board.dimensions();
        let players = self.context.clients.read().await.len();
        if let Err(e) = self.send(&hello_message(width, height, players)).await {
            warn!("Client {}: failed to send greeting: {}", self.id, e);
            return CloseReason::WriteFailed;
        }

        let idle_timeout = self.context.config.idle_timeout;
        let mut deadline = idle_timeout.map(|timeout| Instant::now() + timeout);

        loop {
            tokio::select! {
                line = self.lines.next_line() => match line {
                    Ok(Some(InputLine::Text(line))) => {
                        if let Some(reason) = self.process(line.trim()).await {
                            return reason;
                        }
                        deadline = idle_timeout.map(|timeout| Instant::now() + timeout);
                    }
                    Ok(Some(InputLine::TooLong)) => {
                        warn!("Client {}: line longer than {} bytes", self.id, MAX_LINE_LENGTH);
                        if let Err(e) = self.send(INVALID_MESSAGE).await {
                            warn!("Client {}: failed to send reply: {}", self.id, e);
                            return CloseReason::WriteFailed;
                        }
                        deadline = idle_timeout.map(|timeout| Instant::now() + timeout);
                    }
                    Ok(None) => return CloseReason::PeerClosed,
                    Err(e) => {
                        debug!("Client {}: read failed: {}", self.id, e);
                        return CloseReason::ReadFailed;
                    }
                },

                announced = self.outbound.recv() => match announced {
                    Some(mut generation) => {
                        while let Ok(next) = self.outbound.try_recv() {
                            generation = generation.max(next);
                        }
                        if let Err(e) = self.push_board(generation).await {
                            warn!("Client {}: failed to deliver update: {}", self.id, e);
                            return CloseReason::WriteFailed;
                        }
                    }
                    None => return CloseReason::ServerShutdown,
                },

                _ = idle(deadline) => return CloseReason::IdleTimeout,
            }
        }
    }

    /// Handles one line. Returns Some when the session should end.
    async fn process(&mut self, line: &str) -> Option<CloseReason> {
        debug!("Client {} sent {:?}", self.id, line);

        let reply = protocol::handle_line(&self.context.board, line, self.context.config.debug);

        if let Some(text) = &reply.text {
            if let Err(e) = self.send(text).await {
                warn!("Client {}: failed to send reply: {}", self.id, e);
                return Some(CloseReason::WriteFailed);
            }
        }
        if let Some(generation) = reply.shown {
            self.mark_shown(generation);
        }

        // The board lock was released inside handle_line
        if let Some(generation) = reply.broadcast {
            self.context
                .clients
                .write()
                .await
                .broadcast(generation, Some(self.id));
        }

        reply.disconnect.map(CloseReason::from)
    }

    fn mark_shown(&mut self, generation: u64) {
        self.shown = Some(self.shown.map_or(generation, |shown| shown.max(generation)));
    }

    /// Writes the current board, unless the client has already seen
    /// `generation` or something newer.
    async fn push_board(&mut self, generation: u64) -> io::Result<()> {
        if self.shown.is_some_and(|shown| shown >= generation) {
            debug!("Client {} already has generation {}", self.id, generation);
            return Ok(());
        }

        let (current, view) = self.context.board.snapshot();
        self.send(&view.to_string()).await?;
        self.mark_shown(current);
        Ok(())
    }

    async fn send(&mut self, text: &str) -> io::Result<()> {
        self.writer.write_all(text.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }
}
