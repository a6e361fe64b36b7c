//! Connection bookkeeping for the UDP transport
//!
//! This module tracks which network addresses belong to which players:
//! - Player ID assignment on join, with a hard capacity limit
//! - Address lookup so incoming datagrams can be attributed to a player
//! - Activity tracking and timeout detection for silent clients
//!
//! The client manager knows nothing about teams, modes or progression. It only
//! answers "who sent this" and "who has gone quiet"; the network layer turns
//! those answers into calls on the game server.

use log::info;
use shared::PlayerId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Silence after which a client is considered gone.
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// A connected client
///
/// Each client maintains its player ID, the address responses go to, and the
/// time of its last packet.
#[derive(Debug)]
pub struct Client {
    /// Player ID assigned by the server; also the ID used by the game server
    pub id: PlayerId,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
}

impl Client {
    pub fn new(id: PlayerId, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
        }
    }

    /// Records activity from this client
    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Returns true if nothing has arrived from this client within `timeout`
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Manages all connected clients
///
/// The ClientManager enforces server capacity and hands out player IDs.
/// IDs start at 1 and are never reused within a server run, so a late packet
/// from a departed player can never be mistaken for a newcomer.
pub struct ClientManager {
    /// Connected clients indexed by their player ID
    clients: HashMap<PlayerId, Client>,
    /// Next available player ID
    next_client_id: PlayerId,
    /// Maximum number of concurrent clients allowed
    max_clients: usize,
    timeout: Duration,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self::with_timeout(max_clients, CLIENT_TIMEOUT)
    }

    pub fn with_timeout(max_clients: usize, timeout: Duration) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
            timeout,
        }
    }

    /// Attempts to add a new client connection
    ///
    /// Returns Some(player_id) if successful, None if the server is full.
    pub fn add_client(&mut self, addr: SocketAddr) -> Option<PlayerId> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} connected from {}", client_id, addr);
        self.clients.insert(client_id, Client::new(client_id, addr));

        Some(client_id)
    }

    /// Removes a client. Returns false if they were already gone.
    pub fn remove_client(&mut self, client_id: PlayerId) -> bool {
        if let Some(client) = self.clients.remove(&client_id) {
            info!("Client {} disconnected", client.id);
            true
        } else {
            false
        }
    }

    /// Finds a client ID by their network address
    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<PlayerId> {
        self.clients
            .iter()
            .find(|(_, client)| client.addr == addr)
            .map(|(id, _)| *id)
    }

    pub fn addr_of(&self, client_id: PlayerId) -> Option<SocketAddr> {
        self.clients.get(&client_id).map(|client| client.addr)
    }

    /// Updates the activity timestamp. Returns false for unknown IDs.
    pub fn touch(&mut self, client_id: PlayerId) -> bool {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.touch();
            true
        } else {
            false
        }
    }

    /// Checks for and removes timed-out clients
    ///
    /// Returns the removed IDs so the caller can drop them from the game as well.
    pub fn check_timeouts(&mut self) -> Vec<PlayerId> {
        let timed_out: Vec<PlayerId> = self
            .clients
            .iter()
            .filter(|(_, client)| client.is_timed_out(self.timeout))
            .map(|(id, _)| *id)
            .collect();

        for client_id in &timed_out {
            self.remove_client(*client_id);
        }

        timed_out
    }

    /// Gets all client IDs and their network addresses for broadcasting
    pub fn get_client_addrs(&self) -> Vec<(PlayerId, SocketAddr)> {
        self.clients
            .iter()
            .map(|(id, client)| (*id, client.addr))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
