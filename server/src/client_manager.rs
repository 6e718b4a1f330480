//! Registry of connected sessions and board broadcasting
//!
//! This module keeps track of every session that is currently connected:
//! - Session admission against a capacity limit
//! - The outbound channel of each session, used to announce board changes
//! - Removal on disconnect, and pruning of sessions whose task already ended
//!
//! The registry never touches the board. Callers finish their board operation
//! first and only then take the registry lock to announce the change. A
//! session's channel carries board generations, not renderings; the session
//! renders the board itself when it drains the channel.

use log::{info, warn};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::mpsc;

/// A connected session as seen by the registry
#[derive(Debug)]
pub struct Client {
    /// Unique session identifier assigned by the server
    pub id: u32,
    /// Peer address, kept for logging
    pub addr: SocketAddr,
    /// When the connection was accepted
    pub connected_at: Instant,
    /// Board generations announced to the session task
    sender: mpsc::UnboundedSender<u64>,
}

impl Client {
    pub fn new(id: u32, addr: SocketAddr, sender: mpsc::UnboundedSender<u64>) -> Self {
        Self {
            id,
            addr,
            connected_at: Instant::now(),
            sender,
        }
    }

    /// Tells the session that the board reached `generation`.
    ///
    /// Returns false once the session task is gone and nobody is reading.
    pub fn send(&self, generation: u64) -> bool {
        self.sender.send(generation).is_ok()
    }
}

/// Tracks all connected sessions
///
/// Session IDs start from 1 and are never reused during the lifetime of the
/// server.
pub struct ClientManager {
    /// Connected clients indexed by their unique ID
    clients: HashMap<u32, Client>,
    /// Next available client ID for new connections
    next_client_id: u32,
    /// Maximum number of concurrent clients allowed
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Registers a new session
    ///
    /// Returns Some(client_id) if successful, None if the server is at capacity.
    pub fn add_client(
        &mut self,
        addr: SocketAddr,
        sender: mpsc::UnboundedSender<u64>,
    ) -> Option<u32> {
        if self.clients.len() >= self.max_clients {
            warn!("Rejecting {}: server full ({} clients)", addr, self.max_clients);
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} connected from {}", client_id, addr);
        self.clients
            .insert(client_id, Client::new(client_id, addr, sender));

        Some(client_id)
    }

    /// Removes a session. Returns false if it was already gone.
    pub fn remove_client(&mut self, client_id: &u32) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!(
                "Client {} ({}) disconnected after {:.1}s",
                client.id,
                client.addr,
                client.connected_at.elapsed().as_secs_f32()
            );
            true
        } else {
            false
        }
    }

    /// Announces board `generation` to every client except `exclude`
    ///
    /// A client whose session has already ended is dropped from the registry
    /// without affecting delivery to the others. Returns the IDs that were
    /// dropped.
    pub fn broadcast(&mut self, generation: u64, exclude: Option<u32>) -> Vec<u32> {
        let failed: Vec<u32> = self
            .clients
            .values()
            .filter(|client| Some(client.id) != exclude)
            .filter(|client| !client.send(generation))
            .map(|client| client.id)
            .collect();

        for client_id in &failed {
            warn!("Dropping client {}: session is no longer reading", client_id);
            self.remove_client(client_id);
        }

        failed
    }

    /// Drops every session. Each session notices its channel closing and
    /// shuts its connection down.
    pub fn disconnect_all(&mut self) -> usize {
        let count = self.clients.len();
        self.clients.clear();
        count
    }

    #[cfg(test)]
    pub fn contains(&self, client_id: &u32) -> bool {
        self.clients.contains_key(client_id)
    }

    /// Returns the number of currently connected clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if no clients are currently connected
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
