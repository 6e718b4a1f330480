//! # Minesweeper Server Library
//!
//! This library provides the server side of a shared Minesweeper game. Any
//! number of players connect over TCP, type commands in a line-based text
//! protocol, and all of them play on one board.
//!
//! ## Core Responsibilities
//!
//! ### One Authoritative Board
//! The server holds the only copy of the board. Every dig, flag and deflag is
//! applied to it atomically, and the resulting rendering is what players see.
//!
//! ### Session Management
//! Handles the complete lifecycle of client connections including:
//! - Greeting each new player with the board size and player count
//! - Reading commands and writing replies, one line at a time
//! - Closing the connection on `bye`, on a detonation outside debug mode,
//!   on a broken socket, or when the server shuts down
//!
//! ### Board Broadcasting
//! Whenever a command changes the board, every other connected player is
//! told, and gets the current rendering pushed so all views stay in sync.
//!
//! ## Architecture Design
//!
//! ### One Task Per Connection
//! The accept loop spawns a tokio task for every connection. Sessions never
//! talk to each other directly; they share the board and the registry of
//! connected sessions.
//!
//! ### Two Independent Locks
//! The board sits behind one mutex covering the whole grid, held for exactly
//! one operation. The session registry has its own lock. A session always
//! releases the board before it broadcasts, so the two are never held
//! together.
//!
//! ## Module Organization
//!
//! ### Board Module (`board`)
//! The grid, the dig/flag/deflag/look operations and the flood-fill that opens
//! up empty regions.
//!
//! ### Board File Module (`board_file`)
//! Reads a board from a file or generates a random one.
//!
//! ### Line Reader Module (`line_reader`)
//! Splits client input into bounded lines, tolerating bytes that are not
//! UTF-8.
//!
//! ### Protocol Module (`protocol`)
//! Turns one line of input into a board operation and the reply text.
//!
//! ### Client Manager Module (`client_manager`)
//! The registry of connected sessions, and broadcasting to them.
//!
//! ### Session Module (`session`)
//! The per-connection read/dispatch/write loop.
//!
//! ### Network Module (`network`)
//! The TCP accept loop and shutdown.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::board_file::load_board;
//! use server::config::ServerConfig;
//! use server::network::Server;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let board = load_board(Path::new("boards/board_file_1"))?;
//!     let server = Server::bind("127.0.0.1:4444", board, ServerConfig::default()).await?;
//!
//!     // Serve until Ctrl+C, then close every session
//!     server
//!         .run_until(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod board;
pub mod board_file;
pub mod client_manager;
pub mod config;
pub mod line_reader;
pub mod network;
pub mod protocol;
pub mod session;
