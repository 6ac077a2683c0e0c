use std::ops::ControlFlow;
use std::sync::Arc;

use rand::Rng;
use thiserror::Error;

use crate::board::Board;
use crate::config::{BoardConfig, ConfigError};
use crate::generator::{GenerateError, Generator};
use crate::topology::{Topology, TopologyError};

/// Where a game currently stands.
///
/// `Init -> Generating -> Playing -> Won | Lost`, with `reset` returning to
/// `Init` from anywhere. Failed generation also falls back to `Init` so the
/// host can offer a retry.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Phase {
    Init,
    Generating,
    Playing,
    Won,
    Lost,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NewGameError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Topology(#[from] TopologyError),
}

/// Host-level game loop: owns the topology, the live board, and the phase.
///
/// The board does not exist until the first click; that click seeds the
/// generator so the opening is guaranteed safe and the whole board is
/// guaranteed guess-free.
pub struct Game {
    topology: Arc<Topology>,
    config: BoardConfig,
    generator: Generator,
    board: Option<Board>,
    phase: Phase,
}

impl Game {
    pub fn new(config: BoardConfig) -> Result<Self, NewGameError> {
        config.validate()?;
        let topology = Topology::new(config.width, config.height, config.surface)?;
        Ok(Self {
            topology: Arc::new(topology),
            config,
            generator: Generator::default(),
            board: None,
            phase: Phase::Init,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// The live board, once the first click has produced one.
    pub fn board(&self) -> Option<&Board> {
        self.board.as_ref()
    }

    /// Mines not yet flagged, clamped at zero.
    pub fn mines_left(&self) -> usize {
        let flags = self.board.as_ref().map_or(0, Board::count_flags);
        self.config.mines.saturating_sub(flags)
    }

    /// Applies a click. In `Init` this generates the board (synchronously)
    /// with the click as the safe start; afterwards it opens cells, moving
    /// to `Lost` on a mine and `Won` once the last free cell opens. Clicks
    /// in terminal phases do nothing.
    pub fn open<R: Rng>(&mut self, idx: usize, rng: &mut R) -> Result<Phase, GenerateError> {
        match self.phase {
            Phase::Init => {
                self.phase = Phase::Generating;
                let generated = self.generator.generate(
                    &self.topology,
                    &self.config,
                    idx,
                    rng,
                    |_| ControlFlow::Continue(()),
                );
                match generated {
                    Ok(board) => {
                        let won = board.check_win();
                        self.board = Some(board);
                        // A mine-free config is already won by its opening
                        // flood.
                        self.phase = if won { Phase::Won } else { Phase::Playing };
                    }
                    Err(err) => {
                        self.phase = Phase::Init;
                        return Err(err);
                    }
                }
            }
            Phase::Playing => {
                let board = self.board.as_mut().expect("playing phase should have a board");
                if board.open(idx) {
                    self.phase = Phase::Lost;
                } else if board.check_win() {
                    self.phase = Phase::Won;
                }
            }
            Phase::Generating | Phase::Won | Phase::Lost => {}
        }
        Ok(self.phase)
    }

    /// Toggles a flag while playing; ignored in any other phase.
    pub fn toggle_flag(&mut self, idx: usize) {
        if self.phase == Phase::Playing {
            if let Some(board) = self.board.as_mut() {
                board.toggle_flag(idx);
            }
        }
    }

    /// Discards the board and returns to `Init` for a fresh first click.
    pub fn reset(&mut self) {
        self.board = None;
        self.phase = Phase::Init;
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::SmallRng, SeedableRng};

    use super::*;
    use crate::topology::Surface;

    fn game(width: usize, height: usize, mines: usize, surface: Surface) -> Game {
        Game::new(BoardConfig {
            width,
            height,
            mines,
            surface,
        })
        .unwrap()
    }

    #[test]
    fn first_click_generates_and_enters_playing() {
        let mut game = game(9, 9, 10, Surface::Square);
        assert_eq!(game.phase(), Phase::Init);
        assert!(game.board().is_none());

        let mut rng = SmallRng::seed_from_u64(5);
        let phase = game.open(40, &mut rng).unwrap();
        assert_eq!(phase, Phase::Playing);
        let board = game.board().unwrap();
        assert!(!board.is_mine(40));
    }

    #[test]
    fn opening_a_mine_loses() {
        let mut game = game(9, 9, 10, Surface::Torus);
        let mut rng = SmallRng::seed_from_u64(11);
        game.open(40, &mut rng).unwrap();
        let mine = (0..81)
            .find(|&i| game.board().unwrap().is_mine(i))
            .expect("board should have mines");
        assert_eq!(game.open(mine, &mut rng).unwrap(), Phase::Lost);
        // Terminal phases swallow further input.
        assert_eq!(game.open(40, &mut rng).unwrap(), Phase::Lost);
    }

    #[test]
    fn mine_free_board_wins_on_the_first_click() {
        let mut game = game(4, 4, 0, Surface::Square);
        let mut rng = SmallRng::seed_from_u64(0);
        assert_eq!(game.open(0, &mut rng).unwrap(), Phase::Won);
    }

    #[test]
    fn flags_feed_the_mines_left_readout() {
        let mut game = game(9, 9, 10, Surface::Square);
        let mut rng = SmallRng::seed_from_u64(5);
        game.open(40, &mut rng).unwrap();
        assert_eq!(game.mines_left(), 10);
        let hidden = (0..81)
            .find(|&i| game.board().unwrap().status(i) == crate::board::CellState::Hidden)
            .unwrap();
        game.toggle_flag(hidden);
        assert_eq!(game.mines_left(), 9);
    }

    #[test]
    fn reset_returns_to_init() {
        let mut game = game(9, 9, 10, Surface::Square);
        let mut rng = SmallRng::seed_from_u64(5);
        game.open(40, &mut rng).unwrap();
        game.reset();
        assert_eq!(game.phase(), Phase::Init);
        assert!(game.board().is_none());
    }

    #[test]
    fn invalid_configs_are_rejected_up_front() {
        assert!(Game::new(BoardConfig {
            width: 0,
            height: 9,
            mines: 0,
            surface: Surface::Square,
        })
        .is_err());
        assert!(Game::new(BoardConfig {
            width: 1,
            height: 9,
            mines: 0,
            surface: Surface::Mobius,
        })
        .is_err());
    }
}
