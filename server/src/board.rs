//! The shared Minesweeper board
//!
//! The grid lives behind a single mutex and is only reachable through the
//! operations on [`Board`]. Each operation takes the lock once, does all of its
//! work, renders the resulting [`BoardView`] and releases the lock, so a
//! snapshot never shows half of a mutation and a flood-fill never races with
//! another dig or flag.

use log::debug;
use shared::{BoardView, CellView};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Visible state of a cell. A cell is never flagged and revealed at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellState {
    Hidden,
    Flagged,
    Revealed,
}

#[derive(Debug, Clone, Copy)]
struct Cell {
    bomb: bool,
    state: CellState,
}

/// What an operation did to the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Nothing changed: out of range, or the cell was in the wrong state.
    Unchanged,
    /// One or more cells changed.
    Changed,
    /// The dig hit a bomb. The bomb is gone and the cell is revealed.
    Boom,
}

impl Effect {
    /// True when the board is different afterwards, a detonation included.
    pub fn changed(&self) -> bool {
        !matches!(self, Effect::Unchanged)
    }
}

/// Result of a mutating operation together with the board as it stood
/// right after it, taken under the same lock.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub effect: Effect,
    /// Generation of the board shown in `view`. See [`Board::snapshot`].
    pub generation: u64,
    pub view: BoardView,
}

#[derive(Debug)]
struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
    /// Bumped by every operation that changes a cell
    generation: u64,
}

impl Grid {
    fn index(&self, x: usize, y: usize) -> Option<usize> {
        if x < self.width && y < self.height {
            Some(y * self.width + x)
        } else {
            None
        }
    }

    fn neighbours(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        let x = (index % self.width) as i64;
        let y = (index / self.width) as i64;

        (-1..=1i64)
            .flat_map(move |dy| (-1..=1i64).map(move |dx| (x + dx, y + dy)))
            .filter(move |&(nx, ny)| (nx, ny) != (x, y))
            .filter(move |&(nx, ny)| {
                nx >= 0 && ny >= 0 && (nx as usize) < self.width && (ny as usize) < self.height
            })
            .map(move |(nx, ny)| ny as usize * self.width + nx as usize)
    }

    fn adjacent_bombs(&self, index: usize) -> u8 {
        self.neighbours(index)
            .filter(|&n| self.cells[n].bomb)
            .count() as u8
    }

    /// Reveals every hidden cell reachable from `start` through cells with
    /// no adjacent bombs. `start` must already be revealed. Flagged cells
    /// stop the expansion.
    fn flood_reveal(&mut self, start: usize) -> usize {
        let mut frontier = VecDeque::from([start]);
        let mut revealed = 0;

        while let Some(index) = frontier.pop_front() {
            if self.adjacent_bombs(index) != 0 {
                continue;
            }

            let hidden: Vec<usize> = self
                .neighbours(index)
                .filter(|&n| self.cells[n].state == CellState::Hidden)
                .collect();

            // Marking on enqueue keeps each cell in the frontier at most once
            for n in hidden {
                self.cells[n].state = CellState::Revealed;
                revealed += 1;
                frontier.push_back(n);
            }
        }

        revealed
    }

    fn outcome(&mut self, effect: Effect) -> Outcome {
        if effect.changed() {
            self.generation += 1;
        }
        Outcome {
            effect,
            generation: self.generation,
            view: self.view(),
        }
    }

    fn view(&self) -> BoardView {
        BoardView::from_fn(self.width, self.height, |x, y| {
            let index = y * self.width + x;
            match self.cells[index].state {
                CellState::Hidden => CellView::Hidden,
                CellState::Flagged => CellView::Flagged,
                CellState::Revealed => CellView::Revealed(self.adjacent_bombs(index)),
            }
        })
    }
}

/// The board shared by every session.
#[derive(Debug)]
pub struct Board {
    width: usize,
    height: usize,
    grid: Mutex<Grid>,
}

impl Board {
    /// Creates a board from row-major bomb placement. Returns None when
    /// `bombs` does not hold `width * height` entries or a dimension is zero.
    pub fn new(width: usize, height: usize, bombs: Vec<bool>) -> Option<Self> {
        if width == 0 || height == 0 || width.checked_mul(height) != Some(bombs.len()) {
            return None;
        }

        let cells = bombs
            .into_iter()
            .map(|bomb| Cell {
                bomb,
                state: CellState::Hidden,
            })
            .collect();

        Some(Self {
            width,
            height,
            grid: Mutex::new(Grid {
                width,
                height,
                cells,
                generation: 0,
            }),
        })
    }

    /// Creates a board from rows of bomb flags, e.g. as read from a board file.
    pub fn from_rows(rows: Vec<Vec<bool>>) -> Option<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != width) {
            return None;
        }
        Self::new(width, height, rows.into_iter().flatten().collect())
    }

    fn lock(&self) -> MutexGuard<'_, Grid> {
        // Every mutation completes before the guard drops, so the grid behind
        // a poisoned lock is still consistent.
        self.grid.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Board size as `(columns, rows)`.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Renders the current board.
    pub fn look(&self) -> BoardView {
        self.lock().view()
    }

    /// Renders the current board together with its generation.
    ///
    /// The generation starts at 0 and grows by one with every change, so of
    /// two renderings the one with the higher generation is the newer.
    pub fn snapshot(&self) -> (u64, BoardView) {
        let grid = self.lock();
        (grid.generation, grid.view())
    }

    /// Digs at column `x`, row `y`.
    ///
    /// Out-of-range coordinates and cells that are already revealed or
    /// flagged leave the board untouched. A bomb is removed and reported as
    /// [`Effect::Boom`]; otherwise a cell with no adjacent bombs opens up the
    /// surrounding region.
    pub fn dig(&self, x: usize, y: usize) -> Outcome {
        let mut grid = self.lock();

        let Some(index) = grid.index(x, y) else {
            return grid.outcome(Effect::Unchanged);
        };

        if grid.cells[index].state != CellState::Hidden {
            return grid.outcome(Effect::Unchanged);
        }

        grid.cells[index].state = CellState::Revealed;

        let effect = if grid.cells[index].bomb {
            grid.cells[index].bomb = false;
            debug!("Bomb detonated at ({}, {})", x, y);
            Effect::Boom
        } else {
            let opened = grid.flood_reveal(index);
            debug!("Dug ({}, {}), opened {} more cells", x, y, opened);
            Effect::Changed
        };

        grid.outcome(effect)
    }

    /// Flags a hidden cell. Flagging twice is the same as flagging once.
    pub fn flag(&self, x: usize, y: usize) -> Outcome {
        let mut grid = self.lock();

        let effect = match grid.index(x, y) {
            Some(index) if grid.cells[index].state == CellState::Hidden => {
                grid.cells[index].state = CellState::Flagged;
                Effect::Changed
            }
            _ => Effect::Unchanged,
        };

        grid.outcome(effect)
    }

    /// Removes a flag. Cells that are not flagged are left alone.
    pub fn deflag(&self, x: usize, y: usize) -> Outcome {
        let mut grid = self.lock();

        let effect = match grid.index(x, y) {
            Some(index) if grid.cells[index].state == CellState::Flagged => {
                grid.cells[index].state = CellState::Hidden;
                Effect::Changed
            }
            _ => Effect::Unchanged,
        };

        grid.outcome(effect)
    }

    /// Number of bombs still on the board.
    pub fn bomb_count(&self) -> usize {
        self.lock().cells.iter().filter(|cell| cell.bomb).count()
    }
}
