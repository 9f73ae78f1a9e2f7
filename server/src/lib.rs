//! # Plantation Server Library
//!
//! This library provides the authoritative server for the turn-based
//! plantation strategy game. It owns every player's ledger, buildings and army,
//! validates each client request against the game rules and tells every
//! connected client what happened.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Rules
//! Clients only ask. The server decides whether a build, upgrade, soldier
//! order or attack is legal, applies it all-or-nothing and replies with a
//! `RESPONSE` carrying either success or the exact reason for refusal.
//!
//! ### Turn Scheduling
//! Players act one at a time. Each cycle the turn order is reshuffled; the
//! acting player's producers and processors run at the start of their turn.
//! After the last cycle the session scores every ledger and names a winner.
//!
//! ### Connection Lifecycle
//! - Join and automatic or operator-triggered session start
//! - Archetype selection before the first cycle
//! - Disconnect cleanup that keeps the turn order consistent
//!
//! ## Architecture Design
//!
//! ### Single-Writer Event Loop
//! One task owns the [`game::GameSession`]. Connection tasks never touch game
//! state; they decode frames and forward [`network::ServerEvent`]s over an
//! unbounded channel. The main loop applies events strictly in arrival order,
//! so two requests can never interleave on the same ledger or turn index.
//!
//! ### TCP Framing
//! Every message is a 4-byte little-endian length followed by an
//! XOR-obfuscated `KIND|JSON` payload. Reassembly tolerates any transport
//! chunking. See `plantation_shared::framing`.
//!
//! ## Module Organization
//!
//! ### Rules (`rules`, `economy`, `combat`, `scoring`)
//! Pure balance tables and the operations built on them. Each operation
//! returns a [`error::RuleError`] without mutating anything when it refuses.
//!
//! ### State (`player`, `registry`, `game`)
//! Player records, the roster keyed by id and connection, and the session
//! state machine `Lobby -> ArchetypeSelection -> TurnActive -> Ended`.
//!
//! ### Network Module (`network`)
//! TCP accept loop, per-connection reader and writer tasks, and routing of
//! session output back to the right sockets.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use plantation_server::config::ServerConfig;
//! use plantation_server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let config = ServerConfig {
//!         port: 5000,
//!         ..ServerConfig::default()
//!     };
//!     let mut server = Server::new(&config).await?;
//!
//!     // Accepts connections and applies requests until shutdown
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod combat;
pub mod config;
pub mod economy;
pub mod error;
pub mod game;
pub mod network;
pub mod player;
pub mod registry;
pub mod rules;
pub mod scoring;
