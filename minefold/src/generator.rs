use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use thiserror::Error;

use crate::board::Board;
use crate::config::BoardConfig;
use crate::solver::Solver;
use crate::topology::Topology;

/// Attempts before a configuration is declared hopeless.
pub const DEFAULT_MAX_RETRIES: u32 = 2000;

/// Wall-clock interval between progress ticks to the host.
pub const DEFAULT_TIME_SLICE: Duration = Duration::from_millis(15);

/// Passed to the tick callback between attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    /// Placements tried and rejected so far.
    pub attempts: u32,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    /// No guess-free placement was found. With `attempts: 0` the requested
    /// density cannot be placed at all; otherwise a fresh seed usually
    /// succeeds, or the density is too high for the surface.
    #[error("no guess-free placement found in {attempts} attempts")]
    Exhausted { attempts: u32 },
    /// The tick callback asked to stop.
    #[error("generation cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

/// Rejection-samples mine placements until one is provably guess-free.
///
/// Each attempt places mines outside the first click's safe zone and asks a
/// fresh [`Solver`] to open the whole board from that click; placements that
/// leave the solver stuck are thrown away. At high densities most attempts
/// fail, so the loop surrenders control to the host at a bounded wall-clock
/// cadence through the tick callback, which may also cancel the run.
#[derive(Clone, Copy, Debug)]
pub struct Generator {
    max_retries: u32,
    time_slice: Duration,
}

impl Default for Generator {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            time_slice: DEFAULT_TIME_SLICE,
        }
    }
}

impl Generator {
    pub fn new(max_retries: u32, time_slice: Duration) -> Self {
        Self {
            max_retries,
            time_slice,
        }
    }

    /// Produces a board on which every non-mine cell is reachable by forced
    /// deduction from `start_idx`. On success the board comes back with the
    /// solver's openings rewound and only the first click applied.
    ///
    /// `on_tick` fires between attempts once per elapsed time slice;
    /// returning [`ControlFlow::Break`] abandons the run. The callback is a
    /// notification channel only, it cannot influence placement.
    pub fn generate<R: Rng>(
        &self,
        topology: &Arc<Topology>,
        config: &BoardConfig,
        start_idx: usize,
        rng: &mut R,
        mut on_tick: impl FnMut(Progress) -> ControlFlow<()>,
    ) -> Result<Board, GenerateError> {
        // An over-capacity request fails every attempt the same way, so
        // report exhaustion immediately instead of burning the retries.
        let safe_zone = 1 + topology.neighbours(start_idx).len();
        if config.mines > topology.cell_count() - safe_zone {
            return Err(GenerateError::Exhausted { attempts: 0 });
        }

        let mut last_tick = Instant::now();
        for attempt in 1..=self.max_retries {
            if last_tick.elapsed() >= self.time_slice {
                last_tick = Instant::now();
                let progress = Progress {
                    attempts: attempt - 1,
                };
                if on_tick(progress).is_break() {
                    return Err(GenerateError::Cancelled {
                        attempts: attempt - 1,
                    });
                }
            }

            let mut board = Board::new(Arc::clone(topology));
            if board.place_mines(rng, config.mines, start_idx).is_err() {
                // A bounded-draw failure is as good as an unsolvable layout.
                continue;
            }
            let mut solver = Solver::new(&board, config.mines);
            if solver.check_solvability(&mut board, start_idx) {
                board.conceal_all();
                board.open(start_idx);
                return Ok(board);
            }
        }
        Err(GenerateError::Exhausted {
            attempts: self.max_retries,
        })
    }
}

/// [`Generator::generate`] with default limits, thread-local entropy, and no
/// tick handler.
pub fn generate(
    topology: &Arc<Topology>,
    config: &BoardConfig,
    start_idx: usize,
) -> Result<Board, GenerateError> {
    Generator::default().generate(topology, config, start_idx, &mut rand::thread_rng(), |_| {
        ControlFlow::Continue(())
    })
}
