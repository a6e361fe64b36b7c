//! Server network layer handling UDP communications and game loop coordination

use crate::client_manager::ClientManager;
use crate::game::GameServer;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{Packet, PlayerId, Team, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;

/// Longest simulated step per tick. Stalls longer than this are dropped.
pub const MAX_TICK_DELTA: Duration = Duration::from_millis(50);

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    ClientTimeout {
        client_id: PlayerId,
    },
    #[allow(dead_code)]
    Shutdown,
}

/// Messages sent from game loop to network tasks
#[derive(Debug)]
pub enum GameMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    SendToPlayer {
        packet: Packet,
        player_id: PlayerId,
    },
    BroadcastPacket {
        packet: Packet,
        exclude: Option<PlayerId>,
    },
}

/// Seconds to simulate for a tick, capped at [`MAX_TICK_DELTA`].
pub fn tick_delta(elapsed: Duration) -> f32 {
    elapsed.min(MAX_TICK_DELTA).as_secs_f32()
}

/// Main server coordinating networking and the game server
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    game: GameServer,
    tick_duration: Duration,
    tick: u64,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        tick_duration: Duration,
        max_clients: usize,
        mut game: GameServer,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();
        Self::attach_listeners(&mut game, &game_tx);

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(max_clients))),
            game,
            tick_duration,
            tick: 0,
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn game(&self) -> &GameServer {
        &self.game
    }

    /// Forwards progression and round transitions to clients as they happen.
    fn attach_listeners(game: &mut GameServer, game_tx: &mpsc::UnboundedSender<GameMessage>) {
        let tx = game_tx.clone();
        game.quests_mut().set_listener(move |player_id, quest_id, state| {
            let packet = Packet::QuestUpdate { quest_id, state };
            if tx.send(GameMessage::SendToPlayer { packet, player_id }).is_err() {
                debug!("Dropped quest update for player {}", player_id);
            }
        });

        let tx = game_tx.clone();
        game.missions_mut().set_listener(move |player_id, mission_id, state| {
            let packet = Packet::MissionUpdate { mission_id, state };
            if tx.send(GameMessage::SendToPlayer { packet, player_id }).is_err() {
                debug!("Dropped mission update for player {}", player_id);
            }
        });

        let tx = game_tx.clone();
        game.snd_mut().set_listener(Box::new(move |round, winner| {
            let packet = Packet::RoundUpdate {
                round,
                started: winner.is_none(),
            };
            if tx.send(GameMessage::BroadcastPacket { packet, exclude: None }).is_err() {
                debug!("Dropped round {} update", round);
            }
        }));

        let tx = game_tx.clone();
        game.zombies_mut()
            .set_round_listener(Box::new(move |round, started| {
                let packet = Packet::RoundUpdate { round, started };
                if tx.send(GameMessage::BroadcastPacket { packet, exclude: None }).is_err() {
                    debug!("Dropped round {} update", round);
                }
            }));

        let tx = game_tx.clone();
        game.zombies_mut()
            .set_kill_listener(Box::new(move |player_id, zombie_id, kind, points| {
                let packet = Packet::ZombieKilled {
                    zombie_id,
                    kind,
                    points,
                };
                if tx.send(GameMessage::SendToPlayer { packet, player_id }).is_err() {
                    debug!("Dropped zombie kill for player {}", player_id);
                }
            }));
    }

    /// Spawns task that continuously listens for incoming packets
    async fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing packet queue
    async fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::SendToPlayer { packet, player_id } => {
                        let addr = clients.read().await.addr_of(player_id);
                        let Some(addr) = addr else {
                            debug!("No address for player {}, dropping packet", player_id);
                            continue;
                        };
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send to player {}: {}", player_id, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet, exclude } => {
                        let client_addrs = {
                            let clients_guard = clients.read().await;
                            clients_guard.get_client_addrs()
                        };

                        for (client_id, addr) in client_addrs {
                            if Some(client_id) == exclude {
                                continue;
                            }

                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to client {}: {}", client_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that monitors client timeouts
    async fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts()
                };

                for client_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { client_id }) {
                        error!("Failed to send timeout message: {}", e);
                        break;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    fn broadcast_packet(&self, packet: Packet, exclude: Option<PlayerId>) {
        if let Err(e) = self
            .game_tx
            .send(GameMessage::BroadcastPacket { packet, exclude })
        {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    /// Admits a client, replacing any previous session from the same address.
    async fn handle_join(&mut self, client_version: u32, team: Team, addr: SocketAddr) {
        info!(
            "Client joining from {} (version: {}, team: {:?})",
            addr, client_version, team
        );
        if client_version != PROTOCOL_VERSION {
            let reason = "Protocol version mismatch".to_string();
            self.send_packet(Packet::Rejected { reason }, addr);
            return;
        }

        let existing_client_id = self.clients.read().await.find_client_by_addr(addr);
        if let Some(existing_id) = existing_client_id {
            info!("Removing existing client {} from {}", existing_id, addr);
            self.clients.write().await.remove_client(existing_id);
            self.game.remove_player(existing_id);
        }

        let client_id = self.clients.write().await.add_client(addr);
        match client_id {
            Some(player_id) => {
                self.game.add_player(player_id, team);
                self.send_packet(Packet::Joined { player_id }, addr);
            }
            None => {
                let reason = "Server full".to_string();
                self.send_packet(Packet::Rejected { reason }, addr);
            }
        }
    }

    /// Processes incoming packets and updates the game server
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        if let Packet::Join {
            client_version,
            team,
        } = packet
        {
            self.handle_join(client_version, team, addr).await;
            return;
        }

        let client_id = {
            let mut clients = self.clients.write().await;
            let client_id = clients.find_client_by_addr(addr);
            if let Some(id) = client_id {
                clients.touch(id);
            }
            client_id
        };
        let Some(player_id) = client_id else {
            warn!("Packet from unknown client at {}", addr);
            return;
        };

        match packet {
            Packet::Leave => {
                let reason = "Left the server".to_string();
                self.send_packet(Packet::Disconnected { reason }, addr);
                self.clients.write().await.remove_client(player_id);
                self.game.remove_player(player_id);
            }
            Packet::SetTeam { team } => self.game.set_player_team(player_id, team),
            Packet::SelectMode { mode } => self.game.set_mode(mode),
            Packet::StartRound => {
                if !self.game.start_round() {
                    debug!("Player {} could not start a round", player_id);
                }
            }
            Packet::StartQuest { quest_id } => {
                if !self.game.quests_mut().start_quest(player_id, quest_id) {
                    debug!("Player {} could not start quest {}", player_id, quest_id);
                }
            }
            Packet::AbandonQuest { quest_id } => {
                self.game.quests_mut().abandon_quest(player_id, quest_id)
            }
            Packet::StartMission { mission_id } => {
                if !self.game.missions_mut().start_mission(player_id, mission_id) {
                    debug!(
                        "Player {} could not start mission {}",
                        player_id, mission_id
                    );
                }
            }
            Packet::Gameplay(event) => self.game.handle_event(&event),
            Packet::Heartbeat => {}
            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    fn handle_timeout(&mut self, client_id: PlayerId) {
        info!("Client {} timed out", client_id);
        self.game.remove_player(client_id);
    }

    /// Advances the simulation and broadcasts the match summary
    async fn update(&mut self, dt: f32) {
        self.game.tick(dt);
        self.tick += 1;

        let client_count = self.clients.read().await.len();
        if client_count == 0 {
            return;
        }
        self.broadcast_packet(Packet::Match(self.game.match_summary()), None);

        // Periodic performance monitoring
        if self.tick % 60 == 0 {
            debug!(
                "Tick {}: {} clients, {:.1}Hz, mode {:?}",
                self.tick,
                client_count,
                1.0 / dt.max(f32::EPSILON),
                self.game.mode()
            );
        }
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        // Initialize concurrent tasks
        self.spawn_network_receiver().await;
        self.spawn_network_sender().await;
        self.spawn_timeout_checker().await;

        let mut tick_interval = interval(self.tick_duration);
        let mut last_tick = Instant::now();

        info!("Server started successfully");

        loop {
            tokio::select! {
                // Handle network events
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id }) => {
                            self.handle_timeout(client_id);
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                // Handle server tick events
                _ = tick_interval.tick() => {
                    let now = Instant::now();
                    let dt = tick_delta(now.duration_since(last_tick));
                    last_tick = now;

                    self.update(dt).await;
                },
            }
        }

        Ok(())
    }
}
