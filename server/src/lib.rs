//! # Arena Server Library
//!
//! This library provides the authoritative match server for a team-based
//! multiplayer shooter. It owns the roster, runs whichever match mode is
//! active, tracks per-player quest and mission progress, and tells clients
//! about every change that concerns them.
//!
//! ## Core Responsibilities
//!
//! ### Match Orchestration
//! Exactly one mode is active at a time: Team Deathmatch, Domination, Capture
//! the Flag, Search and Destroy or Zombies. Each mode keeps its own copy of
//! the players enrolled in it. Switching modes resets every mode and enrolls
//! the global roster into the new one. Team modes come out of a reset empty,
//! but Zombies keeps its enrolled players, so an inactive Zombies mode can
//! still hold a player until that player leaves the server.
//!
//! ### Progression
//! Gameplay facts (kills, captures, deliveries, locations reached) are fanned
//! out to the quest and mission engines. Both engines report state changes
//! through listeners which the network layer turns into packets.
//!
//! ### Client Management
//! Handles the lifecycle of UDP clients:
//! - Join with protocol version check and capacity limit
//! - Address based attribution of incoming packets
//! - Timeout detection and cleanup
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Game State
//! The [`game::GameServer`] is owned by the main server loop and is never
//! shared between tasks. Network tasks talk to it exclusively through
//! channels, which keeps every mode and engine free of locking.
//!
//! ### Trusted Events
//! The server does not simulate movement or hit detection. Clients report
//! gameplay facts as [`shared::GameEvent`] values and the server applies them
//! to whatever mode is active, ignoring those that do not apply.
//!
//! ## Module Organization
//!
//! ### Progression Module (`progression`)
//! Quest and mission definitions, per-player progress and the notification
//! entry points used by the orchestrator.
//!
//! ### Modes Module (`modes`)
//! The [`modes::MatchMode`] trait and its five implementations.
//!
//! ### Game Module (`game`)
//! The orchestrator: roster, mode selection, tick and event fan-out.
//!
//! ### Catalog Module (`catalog`)
//! JSON quest and mission definitions, validated before they are installed.
//!
//! ### Client Manager Module (`client_manager`)
//! Player ID assignment, address lookup and timeouts.
//!
//! ### Network Module (`network`)
//! UDP socket, packet dispatch and the fixed-rate tick loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::catalog::Catalog;
//! use server::game::GameServer;
//! use server::network::Server;
//! use shared::GameMode;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut game = GameServer::new();
//!     Catalog::bundled()?.install(&mut game);
//!     game.set_mode(GameMode::TeamDeathmatch);
//!
//!     // 30Hz tick rate, at most 32 clients
//!     let mut server = Server::new(
//!         "127.0.0.1:8080",
//!         Duration::from_millis(33),
//!         32,
//!         game,
//!     ).await?;
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! The server runs internal async tasks that handle:
//! - **Network Receiver**: Decodes incoming datagrams into packets
//! - **Network Sender**: Drains the outgoing queue, unicast or broadcast
//! - **Timeout Checker**: Drops clients that have gone silent
//! - **Main Loop**: Applies packets, ticks the active mode, broadcasts the match summary

pub mod catalog;
pub mod client_manager;
pub mod game;
pub mod modes;
pub mod network;
pub mod progression;
pub mod utils;
