//! # Minesweeper Client Library
//!
//! A terminal client for the Minesweeper server. The protocol is plain text,
//! so the client mostly relays: lines typed by the player go to the server,
//! and every line the server sends, whether a reply or a board pushed after
//! another player's move, is printed as it arrives.
//!
//! ## Module Organization
//!
//! ### Input Module (`input`)
//! Cleans up typed lines and spots `bye`, after which the client stops
//! sending.
//!
//! ### Network Module (`network`)
//! Owns the connection and runs the relay loop until the server hangs up.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Client;
//! use tokio::io::BufReader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::connect("127.0.0.1:4444").await?;
//!     client
//!         .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod input;
pub mod network;
