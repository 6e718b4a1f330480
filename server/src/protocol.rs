//! Translates one line of client input into a board operation and a reply
//!
//! Nothing here touches a socket. The session hands over a trimmed line and
//! gets back the text to answer with, the board generation to announce (if
//! the command changed it) and whether the connection should close
//! afterwards.

use crate::board::{Board, Effect, Outcome};
use log::debug;
use shared::{BoardView, Command, BOOM_MESSAGE, HELP_MESSAGE, INVALID_MESSAGE};

/// Why a command ends the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disconnect {
    Bye,
    Boom,
}

/// Everything the session needs to act on after one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Text for the requesting client. None means send nothing.
    pub text: Option<String>,
    /// Generation of the board rendered in `text`, when `text` is a board.
    pub shown: Option<u64>,
    /// Generation the command moved the board to, for every other session.
    pub broadcast: Option<u64>,
    /// Close the connection once `text` has been sent.
    pub disconnect: Option<Disconnect>,
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            shown: None,
            broadcast: None,
            disconnect: None,
        }
    }

    fn board(generation: u64, view: BoardView) -> Self {
        Self {
            text: Some(view.to_string()),
            shown: Some(generation),
            broadcast: None,
            disconnect: None,
        }
    }
}

/// Maps protocol coordinates to board coordinates. Negative values can never
/// be on the board, so they map to None and the command becomes a no-op.
fn position(x: i64, y: i64) -> Option<(usize, usize)> {
    Some((usize::try_from(x).ok()?, usize::try_from(y).ok()?))
}

fn board_reply(outcome: Outcome) -> Reply {
    Reply {
        broadcast: outcome.effect.changed().then_some(outcome.generation),
        ..Reply::board(outcome.generation, outcome.view)
    }
}

fn apply(
    board: &Board,
    x: i64,
    y: i64,
    operation: impl FnOnce(&Board, usize, usize) -> Outcome,
) -> Outcome {
    match position(x, y) {
        Some((x, y)) => operation(board, x, y),
        None => {
            let (generation, view) = board.snapshot();
            Outcome {
                effect: Effect::Unchanged,
                generation,
                view,
            }
        }
    }
}

/// Handles a single, already trimmed, line of input.
pub fn handle_line(board: &Board, line: &str, debug_mode: bool) -> Reply {
    let command = match line.parse::<Command>() {
        Ok(command) => command,
        Err(e) => {
            debug!("Rejected input {:?}: {}", line, e);
            return Reply::text(INVALID_MESSAGE);
        }
    };

    if command.is_mutating() {
        debug!("Applying {:?}", command);
    }

    match command {
        Command::Look => {
            let (generation, view) = board.snapshot();
            Reply::board(generation, view)
        }
        Command::Help => Reply::text(HELP_MESSAGE),
        Command::Bye => Reply {
            text: None,
            shown: None,
            broadcast: None,
            disconnect: Some(Disconnect::Bye),
        },
        Command::Dig { x, y } => {
            let outcome = apply(board, x, y, Board::dig);
            if outcome.effect == Effect::Boom {
                Reply {
                    text: Some(BOOM_MESSAGE.to_string()),
                    shown: None,
                    broadcast: Some(outcome.generation),
                    disconnect: (!debug_mode).then_some(Disconnect::Boom),
                }
            } else {
                board_reply(outcome)
            }
        }
        Command::Flag { x, y } => board_reply(apply(board, x, y, Board::flag)),
        Command::Deflag { x, y } => board_reply(apply(board, x, y, Board::deflag)),
    }
}
