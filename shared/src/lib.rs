use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 4444;

pub const HELP_MESSAGE: &str = "Commands: look | dig X Y | flag X Y | deflag X Y | help | bye";
pub const BOOM_MESSAGE: &str = "BOOM!";
pub const INVALID_MESSAGE: &str = "Invalid command. Type 'help' for help.";
pub const SERVER_FULL_MESSAGE: &str = "Server full. Try again later.";

/// Greeting sent once, right after a connection is accepted.
pub fn hello_message(width: usize, height: usize, players: usize) -> String {
    format!(
        "Welcome to Minesweeper. Players: {} including you. Board: {} columns by {} rows. Type 'help' for help.",
        players, width, height
    )
}

/// One line of client input, already split into keyword and arguments.
///
/// Coordinates are kept signed: `dig -1 0` is well formed and simply lands
/// outside the board, while `dig a 0` is not a command at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Look,
    Dig { x: i64, y: i64 },
    Flag { x: i64, y: i64 },
    Deflag { x: i64, y: i64 },
    Help,
    Bye,
}

impl Command {
    /// True for commands that can change the board.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Command::Dig { .. } | Command::Flag { .. } | Command::Deflag { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCommandError {
    #[error("empty input")]
    Empty,
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("`{command}` expects {expected} argument(s), got {found}")]
    ArgumentCount {
        command: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("`{0}` is not an integer coordinate")]
    Coordinate(String),
}

fn parse_coordinate(token: &str) -> Result<i64, ParseCommandError> {
    token
        .parse::<i64>()
        .map_err(|_| ParseCommandError::Coordinate(token.to_string()))
}

fn parse_position(
    command: &'static str,
    args: &[&str],
) -> Result<(i64, i64), ParseCommandError> {
    match args {
        [x, y] => Ok((parse_coordinate(x)?, parse_coordinate(y)?)),
        _ => Err(ParseCommandError::ArgumentCount {
            command,
            expected: 2,
            found: args.len(),
        }),
    }
}

fn expect_no_args(command: &'static str, args: &[&str]) -> Result<(), ParseCommandError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(ParseCommandError::ArgumentCount {
            command,
            expected: 0,
            found: args.len(),
        })
    }
}

impl FromStr for Command {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut tokens = line.split_whitespace();
        let keyword = tokens.next().ok_or(ParseCommandError::Empty)?;
        let args: Vec<&str> = tokens.collect();

        // Keywords are case-sensitive
        match keyword {
            "look" => expect_no_args("look", &args).map(|_| Command::Look),
            "help" => expect_no_args("help", &args).map(|_| Command::Help),
            "bye" => expect_no_args("bye", &args).map(|_| Command::Bye),
            "dig" => parse_position("dig", &args).map(|(x, y)| Command::Dig { x, y }),
            "flag" => parse_position("flag", &args).map(|(x, y)| Command::Flag { x, y }),
            "deflag" => parse_position("deflag", &args).map(|(x, y)| Command::Deflag { x, y }),
            other => Err(ParseCommandError::Unknown(other.to_string())),
        }
    }
}

/// What a player can see of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellView {
    Hidden,
    Flagged,
    /// Dug, with the number of bombs among its neighbours.
    Revealed(u8),
}

impl CellView {
    pub fn symbol(&self) -> char {
        match self {
            CellView::Hidden => '-',
            CellView::Flagged => 'F',
            CellView::Revealed(0) => ' ',
            CellView::Revealed(n) => char::from(b'0' + (*n).min(8)),
        }
    }
}

/// A consistent picture of the whole board, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardView {
    width: usize,
    height: usize,
    cells: Vec<CellView>,
}

impl BoardView {
    /// Returns None when `cells` does not hold exactly `width * height` entries.
    pub fn new(width: usize, height: usize, cells: Vec<CellView>) -> Option<Self> {
        if cells.len() != width * height {
            return None;
        }
        Some(Self {
            width,
            height,
            cells,
        })
    }

    /// Builds a view by asking `cell` for every position, row by row.
    pub fn from_fn(width: usize, height: usize, mut cell: impl FnMut(usize, usize) -> CellView) -> Self {
        let mut cells = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                cells.push(cell(x, y));
            }
        }
        Self {
            width,
            height,
            cells,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cell(&self, x: usize, y: usize) -> Option<CellView> {
        if x < self.width && y < self.height {
            Some(self.cells[y * self.width + x])
        } else {
            None
        }
    }

    /// Rendered rows, one string per board row.
    pub fn rows(&self) -> Vec<String> {
        if self.width == 0 {
            return vec![String::new(); self.height];
        }
        self.cells
            .chunks(self.width)
            .map(|row| {
                let mut line = String::with_capacity(row.len() * 2);
                for (i, cell) in row.iter().enumerate() {
                    if i > 0 {
                        line.push(' ');
                    }
                    line.push(cell.symbol());
                }
                line
            })
            .collect()
    }
}

impl fmt::Display for BoardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rows().join("\n"))
    }
}
