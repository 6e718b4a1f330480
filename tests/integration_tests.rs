//! Integration tests for the Minesweeper server
//!
//! These tests start a real server on an ephemeral port and play against it
//! over TCP sockets, the way a player's terminal would.

use server::board_file::parse_board;
use server::config::ServerConfig;
use server::network::Server;
use shared::{hello_message, BOOM_MESSAGE, HELP_MESSAGE, INVALID_MESSAGE};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// 6 columns by 7 rows, bombs at (1,1), (4,3), (0,5) and (5,6)
const BOARD_6X7: &str = include_str!("../boards/board_file_2");

const HIDDEN_ROW: &str = "- - - - - -";

async fn start_server(board: &str, config: ServerConfig) -> SocketAddr {
    let board = parse_board(board).unwrap();
    let server = Server::bind("127.0.0.1:0", board, config).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

/// One connected player
struct Player {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Player {
    /// Connects and consumes the hello line.
    async fn join(addr: SocketAddr) -> (Self, String) {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, writer) = stream.into_split();
        let mut player = Player {
            lines: BufReader::new(reader).lines(),
            writer,
        };
        let hello = player.read_line().await.expect("no hello line");
        (player, hello)
    }

    async fn send(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
    }

    async fn read_line(&mut self) -> Option<String> {
        timeout(Duration::from_secs(5), self.lines.next_line())
            .await
            .expect("timed out waiting for the server")
            .unwrap()
    }

    async fn read_board(&mut self, height: usize) -> Vec<String> {
        let mut rows = Vec::with_capacity(height);
        for _ in 0..height {
            rows.push(self.read_line().await.expect("board cut short"));
        }
        rows
    }

    async fn request(&mut self, line: &str, height: usize) -> Vec<String> {
        self.send(line).await;
        self.read_board(height).await
    }
}

fn hidden_rows() -> Vec<String> {
    vec![HIDDEN_ROW.to_string(); 7]
}

fn rows_with(row: usize, replacement: &str) -> Vec<String> {
    (0..7)
        .map(|y| {
            if y == row {
                replacement.to_string()
            } else {
                HIDDEN_ROW.to_string()
            }
        })
        .collect()
}

/// SESSION LIFECYCLE TESTS
mod session_tests {
    use super::*;

    #[tokio::test]
    async fn hello_reports_board_and_players() {
        let addr = start_server(BOARD_6X7, ServerConfig::default()).await;

        let (_first, hello) = Player::join(addr).await;
        assert_eq!(hello, hello_message(6, 7, 1));

        let (_second, hello) = Player::join(addr).await;
        assert_eq!(hello, hello_message(6, 7, 2));
    }

    #[tokio::test]
    async fn help_and_invalid_input() {
        let addr = start_server(BOARD_6X7, ServerConfig::default()).await;
        let (mut player, _) = Player::join(addr).await;

        player.send("help").await;
        assert_eq!(player.read_line().await.as_deref(), Some(HELP_MESSAGE));

        for line in ["dance", "dig 1", "dig x y", "FLAG 1 1"] {
            player.send(line).await;
            assert_eq!(player.read_line().await.as_deref(), Some(INVALID_MESSAGE));
        }

        // Still connected, still untouched
        assert_eq!(player.request("look", 7).await, hidden_rows());
    }

    #[tokio::test]
    async fn bye_closes_only_that_session() {
        let addr = start_server(BOARD_6X7, ServerConfig::default()).await;
        let (mut leaving, _) = Player::join(addr).await;
        let (mut staying, _) = Player::join(addr).await;

        leaving.send("bye").await;
        assert_eq!(leaving.read_line().await, None);

        assert_eq!(staying.request("look", 7).await, hidden_rows());
    }

    #[tokio::test]
    async fn out_of_range_commands_return_the_board() {
        let addr = start_server(BOARD_6X7, ServerConfig::default()).await;
        let (mut player, _) = Player::join(addr).await;

        for line in ["dig 6 0", "dig 0 7", "flag -1 2", "deflag 100 100"] {
            assert_eq!(player.request(line, 7).await, hidden_rows(), "{}", line);
        }
    }
}

/// GAMEPLAY TESTS
mod gameplay_tests {
    use super::*;

    #[tokio::test]
    async fn dig_on_empty_single_cell_board() {
        let addr = start_server("1 1\n0\n", ServerConfig::default()).await;
        let (mut player, hello) = Player::join(addr).await;
        assert_eq!(hello, hello_message(1, 1, 1));

        assert_eq!(player.request("dig 0 0", 1).await, vec![" "]);
    }

    #[tokio::test]
    async fn dig_floods_empty_region() {
        let addr = start_server(BOARD_6X7, ServerConfig::default()).await;
        let (mut player, _) = Player::join(addr).await;

        let rows = player.request("dig 5 0", 7).await;
        assert_eq!(
            rows,
            vec![
                "- - 1      ",
                "- - 1      ",
                "- - 1 1 1 1",
                "- - - - - -",
                "- - - - - -",
                "- - - - - -",
                "- - - - - -",
            ]
        );
    }

    #[tokio::test]
    async fn repeated_flag_is_idempotent() {
        let addr = start_server(BOARD_6X7, ServerConfig::default()).await;
        let (mut player, _) = Player::join(addr).await;

        let flagged = rows_with(1, "- F - - - -");
        assert_eq!(player.request("flag 1 1", 7).await, flagged);
        assert_eq!(player.request("flag 1 1", 7).await, flagged);
        assert_eq!(player.request("look", 7).await, flagged);

        assert_eq!(player.request("deflag 1 1", 7).await, hidden_rows());
    }

    #[tokio::test]
    async fn boom_disconnects_in_normal_mode() {
        let addr = start_server(BOARD_6X7, ServerConfig::default()).await;
        let (mut player, _) = Player::join(addr).await;

        player.send("dig 1 1").await;
        assert_eq!(player.read_line().await.as_deref(), Some(BOOM_MESSAGE));
        assert_eq!(player.read_line().await, None);

        // The bomb is gone for everyone else
        let (mut next, hello) = Player::join(addr).await;
        assert_eq!(hello, hello_message(6, 7, 1));
        assert_eq!(next.request("look", 7).await, rows_with(1, "-   - - - -"));
    }

    #[tokio::test]
    async fn boom_keeps_connection_in_debug_mode() {
        let addr = start_server(BOARD_6X7, ServerConfig::default().debug(true)).await;
        let (mut player, _) = Player::join(addr).await;

        player.send("dig 1 1").await;
        assert_eq!(player.read_line().await.as_deref(), Some(BOOM_MESSAGE));

        // Only the dug cell changed, no flood-fill after a detonation
        assert_eq!(player.request("look", 7).await, rows_with(1, "-   - - - -"));
    }
}

/// MULTIPLAYER TESTS
mod multiplayer_tests {
    use super::*;

    #[tokio::test]
    async fn flag_is_broadcast_and_visible_to_others() {
        let addr = start_server(BOARD_6X7, ServerConfig::default()).await;
        let (mut alice, _) = Player::join(addr).await;
        let (mut bob, _) = Player::join(addr).await;

        let flagged = rows_with(1, "- F - - - -");
        assert_eq!(alice.request("flag 1 1", 7).await, flagged);

        // Bob gets the pushed board, then sees the same thing on look
        assert_eq!(bob.read_board(7).await, flagged);
        assert_eq!(bob.request("look", 7).await, flagged);
    }

    #[tokio::test]
    async fn unchanged_board_is_not_broadcast() {
        let addr = start_server(BOARD_6X7, ServerConfig::default()).await;
        let (mut alice, _) = Player::join(addr).await;
        let (mut bob, _) = Player::join(addr).await;

        alice.request("deflag 0 0", 7).await;
        alice.request("dig 10 10", 7).await;
        alice.request("look", 7).await;

        // Bob's next lines are the answer to his own command
        bob.send("help").await;
        assert_eq!(bob.read_line().await.as_deref(), Some(HELP_MESSAGE));
    }

    #[tokio::test]
    async fn boom_is_broadcast_before_disconnect() {
        let addr = start_server(BOARD_6X7, ServerConfig::default()).await;
        let (mut unlucky, _) = Player::join(addr).await;
        let (mut watcher, _) = Player::join(addr).await;

        unlucky.send("dig 1 1").await;
        assert_eq!(unlucky.read_line().await.as_deref(), Some(BOOM_MESSAGE));
        assert_eq!(unlucky.read_line().await, None);

        assert_eq!(watcher.read_board(7).await, rows_with(1, "-   - - - -"));
    }

    #[tokio::test]
    async fn concurrent_flags_all_land() {
        let addr = start_server(BOARD_6X7, ServerConfig::default()).await;

        let handles: Vec<_> = (0..6)
            .map(|x| {
                tokio::spawn(async move {
                    let (mut player, _) = Player::join(addr).await;
                    player.send(&format!("flag {} 6", x)).await;
                    player.send("bye").await;
                    // Drain replies and broadcasts until the server hangs up
                    while player.read_line().await.is_some() {}
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        let (mut checker, _) = Player::join(addr).await;
        assert_eq!(checker.request("look", 7).await, rows_with(6, "F F F F F F"));
    }
}

/// CLIENT TESTS
mod client_tests {
    use super::*;
    use client::network::Client;

    #[tokio::test]
    async fn client_relays_a_short_session() {
        let addr = start_server(BOARD_6X7, ServerConfig::default()).await;
        let client = Client::connect(&addr.to_string()).await.unwrap();

        let input: &[u8] = b"look\nbye\n";
        let mut output = Vec::new();
        timeout(Duration::from_secs(5), client.run(input, &mut output))
            .await
            .unwrap()
            .unwrap();

        let output = String::from_utf8(output).unwrap();
        let mut lines = output.lines();
        assert_eq!(lines.next(), Some(hello_message(6, 7, 1).as_str()));
        assert_eq!(lines.filter(|line| *line == HIDDEN_ROW).count(), 7);
    }
}
