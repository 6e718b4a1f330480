//! Turning lines typed by the player into protocol lines

use shared::Command;

/// What to do with one line read from the player's terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Forward the line to the server. `bye` marks the last line of the session.
    Send { line: String, bye: bool },
    /// Blank line, nothing to send.
    Skip,
}

/// Trims the line and decides whether it goes to the server.
///
/// Lines are forwarded even when they do not parse as a command, so the
/// server stays the only judge of what is valid.
pub fn classify(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Skip;
    }

    Input::Send {
        line: line.to_string(),
        bye: matches!(line.parse::<Command>(), Ok(Command::Bye)),
    }
}
