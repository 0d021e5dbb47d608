use std::fmt::Display;
use crate::environments::env::{Action, CategoricalEnv, State, StateCategory, StateSpace};
use crate::error::{LearnError, Result};

pub const GRID_NUM_ACTIONS: usize = 4;
pub const NUM_ROWS: usize = 4;
pub const NUM_COLS: usize = 5;

pub const GOAL_REWARD: f64 = 1.0;
pub const TRAP_REWARD: f64 = -1.0;
pub const STEP_REWARD: f64 = -0.1;

/// Walled grid observed as `(row, col)`. The agent starts top-left; the
/// bottom-right corner is the goal and the top-right corner a trap, both
/// terminal. Moving into a wall leaves the agent in place.
#[derive(Clone, Debug)]
pub struct GridWorld {
    space: StateSpace,
    rows: usize,
    cols: usize,
    row: usize,
    col: usize,
    score: f64,
    is_game_over: bool,
}

impl GridWorld {
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        if rows < 2 || cols < 2 {
            return Err(LearnError::ConfigMismatch(format!("a {rows}x{cols} grid cannot hold start, goal and trap")));
        }
        let categories = vec![StateCategory::new("Row", rows), StateCategory::new("Col", cols)];
        let space = StateSpace::new(categories, GRID_NUM_ACTIONS)?;
        Ok(Self { space, rows, cols, row: 0, col: 0, score: 0.0, is_game_over: false })
    }

    /// The default `NUM_ROWS` x `NUM_COLS` board.
    pub fn standard() -> Result<Self> {
        Self::new(NUM_ROWS, NUM_COLS)
    }

    pub fn goal(&self) -> (usize, usize) { (self.rows - 1, self.cols - 1) }

    pub fn trap(&self) -> (usize, usize) { (0, self.cols - 1) }

    pub fn position(&self) -> (usize, usize) { (self.row, self.col) }
}

impl CategoricalEnv for GridWorld {
    fn space(&self) -> &StateSpace { &self.space }

    fn reset(&mut self) {
        self.row = 0;
        self.col = 0;
        self.score = 0.0;
        self.is_game_over = false;
    }

    fn observe(&self) -> State { State::from([self.row, self.col]) }

    fn step(&mut self, action: Action) -> f64 {
        if self.is_game_over {
            return 0.0;
        }
        match action.index() {
            0 => { // Up
                self.row = self.row.saturating_sub(1);
            }
            1 => { // Down
                self.row = (self.row + 1).min(self.rows - 1);
            }
            2 => { // Left
                self.col = self.col.saturating_sub(1);
            }
            3 => { // Right
                self.col = (self.col + 1).min(self.cols - 1);
            }
            _ => {}
        }

        let reward = if self.position() == self.goal() {
            self.is_game_over = true;
            GOAL_REWARD
        } else if self.position() == self.trap() {
            self.is_game_over = true;
            TRAP_REWARD
        } else {
            STEP_REWARD
        };
        self.score += reward;
        reward
    }

    fn is_game_over(&self) -> bool { self.is_game_over }

    fn score(&self) -> f64 { self.score }
}

impl Display for GridWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in 0..self.rows {
            for col in 0..self.cols {
                let cell = if (row, col) == self.position() {
                    "X "
                } else if (row, col) == self.goal() {
                    "G "
                } else if (row, col) == self.trap() {
                    "T "
                } else {
                    "_ "
                };
                f.write_str(cell)?;
            }
            f.write_str("\n")?;
        }
        f.write_str("\n")?;
        writeln!(f, "Score: {:.2}", self.score)?;
        writeln!(f, "Game Over: {}", self.is_game_over)?;
        Ok(())
    }
}
