//! Board sources: reading a board file or rolling a random board
//!
//! A board file starts with a `WIDTH HEIGHT` line, followed by HEIGHT rows
//! of WIDTH whitespace-separated `0`/`1` tokens, where `1` marks a bomb.

use crate::board::Board;
use log::info;
use rand::Rng;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Chance that any given cell of a random board holds a bomb.
pub const BOMB_PROBABILITY: f64 = 0.25;

pub const DEFAULT_WIDTH: usize = 10;
pub const DEFAULT_HEIGHT: usize = 10;

#[derive(Debug, Error)]
pub enum BoardFileError {
    #[error("failed to read board file: {0}")]
    Io(#[from] std::io::Error),
    #[error("board file is empty")]
    Empty,
    #[error("invalid header `{0}`, expected `WIDTH HEIGHT` with positive integers")]
    Header(String),
    #[error("expected {expected} rows, found {found}")]
    RowCount { expected: usize, found: usize },
    #[error("row {row} has {found} cells, expected {expected}")]
    ColumnCount {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("row {row} contains `{token}`, expected 0 or 1")]
    Token { row: usize, token: String },
}

fn parse_header(line: &str) -> Result<(usize, usize), BoardFileError> {
    let header_error = || BoardFileError::Header(line.trim().to_string());

    let numbers: Vec<usize> = line
        .split_whitespace()
        .map(|token| token.parse::<usize>().map_err(|_| header_error()))
        .collect::<Result<_, _>>()?;

    match numbers.as_slice() {
        [width, height] if *width > 0 && *height > 0 => Ok((*width, *height)),
        _ => Err(header_error()),
    }
}

/// Parses the text of a board file.
pub fn parse_board(contents: &str) -> Result<Board, BoardFileError> {
    let mut lines = contents.lines();
    let header = lines.next().ok_or(BoardFileError::Empty)?;
    let (width, height) = parse_header(header)?;

    let mut rows: Vec<&str> = lines.collect();
    while rows.last().is_some_and(|row| row.trim().is_empty()) {
        rows.pop();
    }

    if rows.len() != height {
        return Err(BoardFileError::RowCount {
            expected: height,
            found: rows.len(),
        });
    }

    // Grows with the rows actually read, never with the header
    let mut bombs = Vec::new();
    for (row, line) in rows.iter().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != width {
            return Err(BoardFileError::ColumnCount {
                row,
                expected: width,
                found: tokens.len(),
            });
        }

        for token in tokens {
            match token {
                "0" => bombs.push(false),
                "1" => bombs.push(true),
                other => {
                    return Err(BoardFileError::Token {
                        row,
                        token: other.to_string(),
                    })
                }
            }
        }
    }

    // Header and rows were checked above, so the shape always matches
    Board::new(width, height, bombs).ok_or(BoardFileError::Header(header.trim().to_string()))
}

/// Reads and parses a board file from disk.
pub fn load_board(path: &Path) -> Result<Board, BoardFileError> {
    let contents = fs::read_to_string(path)?;
    let board = parse_board(&contents)?;
    let (width, height) = board.dimensions();
    info!(
        "Loaded {}x{} board with {} bombs from {}",
        width,
        height,
        board.bomb_count(),
        path.display()
    );
    Ok(board)
}

/// Generates a board where each cell holds a bomb with [`BOMB_PROBABILITY`].
/// Returns None if either dimension is zero.
pub fn random_board<R: Rng>(width: usize, height: usize, rng: &mut R) -> Option<Board> {
    let bombs = (0..width * height)
        .map(|_| rng.gen_bool(BOMB_PROBABILITY))
        .collect();
    Board::new(width, height, bombs)
}
