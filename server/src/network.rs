//! Server network layer: accepting TCP connections and spawning sessions

use crate::board::Board;
use crate::config::ServerConfig;
use crate::session::{Session, SessionContext};
use log::{error, info, warn};
use shared::SERVER_FULL_MESSAGE;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// Listens for players and hands each connection to its own session task
pub struct Server {
    listener: TcpListener,
    context: Arc<SessionContext>,
}

impl Server {
    pub async fn bind(
        addr: &str,
        board: Board,
        config: ServerConfig,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let (width, height) = board.dimensions();
        info!(
            "Serving a {}x{} board{}",
            width,
            height,
            if config.debug { " in debug mode" } else { "" }
        );

        Ok(Server {
            listener,
            context: Arc::new(SessionContext::new(board, config)),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// State shared with the sessions, including the board.
    pub fn context(&self) -> Arc<SessionContext> {
        Arc::clone(&self.context)
    }

    /// Accepts connections until the listener fails.
    pub async fn run(self) -> std::io::Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Accepts connections until `shutdown` completes or the listener fails.
    ///
    /// On shutdown the listener is closed first, then every session is
    /// dropped from the registry, which makes each of them close its
    /// connection.
    pub async fn run_until(
        self,
        shutdown: impl Future<Output = ()>,
    ) -> std::io::Result<()> {
        tokio::pin!(shutdown);

        let result = loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => self.admit(stream, addr).await,
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        break Err(e);
                    }
                },

                _ = &mut shutdown => break Ok(()),
            }
        };

        let Server { listener, context } = self;
        drop(listener);

        let closed = context.clients.write().await.disconnect_all();
        info!("Server shutting down, closed {} sessions", closed);

        result
    }

    async fn admit(&self, mut stream: TcpStream, addr: SocketAddr) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let client_id = self.context.clients.write().await.add_client(addr, sender);

        match client_id {
            Some(client_id) => {
                let session = Session::new(stream, client_id, receiver, Arc::clone(&self.context));
                tokio::spawn(session.run());
            }
            None => {
                tokio::spawn(async move {
                    let message = format!("{}\n", SERVER_FULL_MESSAGE);
                    if let Err(e) = stream.write_all(message.as_bytes()).await {
                        warn!("Failed to notify {} that the server is full: {}", addr, e);
                    }
                    let _ = stream.shutdown().await;
                });
            }
        }
    }
}
