use std::fmt;
use std::sync::Arc;

use bitvec::{bitbox, boxed::BitBox};
use rand::Rng;
use thiserror::Error;

use crate::topology::Topology;

/// What the player sees of a single cell.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub enum CellState {
    #[default]
    Hidden,
    Opened,
    Flagged,
}

/// The mine count requested by [`Board::place_mines`] does not fit outside
/// the first click's safe zone.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot place {requested} mines; only {capacity} cells lie outside the safe zone")]
pub struct PlacementInfeasible {
    pub requested: usize,
    pub capacity: usize,
}

/// One game board on a fixed [`Topology`].
///
/// Owns the hidden mine map, the cached per-cell neighbour mine counts, and
/// the visible per-cell state. Mines and counts are written exactly once by
/// [`Board::place_mines`] (or [`Board::place_mines_at`]); afterwards only
/// `status` ever changes. Cloning deep-copies the mutable arrays and shares
/// the topology.
#[derive(Clone, Debug)]
pub struct Board {
    topology: Arc<Topology>,
    mines: BitBox,
    status: Vec<CellState>,
    /// Mines adjacent to each cell; `-1` on mine cells themselves.
    counts: Vec<i8>,
    placed: bool,
}

impl Board {
    pub fn new(topology: Arc<Topology>) -> Self {
        let cells = topology.cell_count();
        Self {
            topology,
            mines: bitbox![0; cells],
            status: vec![CellState::Hidden; cells],
            counts: vec![0; cells],
            placed: false,
        }
    }

    pub fn topology(&self) -> &Arc<Topology> {
        &self.topology
    }

    pub fn width(&self) -> usize {
        self.topology.width()
    }

    pub fn height(&self) -> usize {
        self.topology.height()
    }

    pub fn cell_count(&self) -> usize {
        self.topology.cell_count()
    }

    pub fn status(&self, idx: usize) -> CellState {
        self.status[idx]
    }

    /// The cached neighbour mine count of `idx`; `-1` if `idx` is a mine.
    pub fn count(&self, idx: usize) -> i8 {
        self.counts[idx]
    }

    /// Ground truth of a single cell.
    ///
    /// Reserved to the generator's acceptance check, tests, and post-game
    /// review. A renderer must not consult this while a game is in progress,
    /// and solver deductions never do.
    pub fn is_mine(&self, idx: usize) -> bool {
        self.mines[idx]
    }

    pub fn mine_count(&self) -> usize {
        self.mines.count_ones()
    }

    /// Places `mine_count` mines uniformly at random outside the safe zone
    /// around `start_idx` (the cell itself plus all its neighbours), then
    /// fills the neighbour count cache.
    ///
    /// Draws are bounded; a run of `20 * cells` rejected draws fails with
    /// [`PlacementInfeasible`] just like an impossible request does.
    ///
    /// # Panics
    ///
    /// Panics if mines were already placed on this board.
    pub fn place_mines<R: Rng>(
        &mut self,
        rng: &mut R,
        mine_count: usize,
        start_idx: usize,
    ) -> Result<(), PlacementInfeasible> {
        assert!(!self.placed, "mines should be placed at most once per board");

        let cells = self.cell_count();
        let mut safe = bitbox![0; cells];
        safe.set(start_idx, true);
        for &n in self.topology.neighbours(start_idx) {
            safe.set(n, true);
        }

        let capacity = cells - safe.count_ones();
        if mine_count > capacity {
            return Err(PlacementInfeasible {
                requested: mine_count,
                capacity,
            });
        }

        let max_draws = 20 * cells;
        let mut placed = 0;
        let mut draws = 0;
        while placed < mine_count {
            if draws == max_draws {
                self.mines.fill(false);
                return Err(PlacementInfeasible {
                    requested: mine_count,
                    capacity,
                });
            }
            draws += 1;
            let idx = rng.gen_range(0..cells);
            if safe[idx] || self.mines[idx] {
                continue;
            }
            self.mines.set(idx, true);
            placed += 1;
        }

        self.fill_counts();
        self.placed = true;
        Ok(())
    }

    /// Places mines at exactly the given indices. Used for replaying a known
    /// layout and for exercising hand-built positions.
    ///
    /// # Panics
    ///
    /// Panics if mines were already placed, or on an out-of-range index.
    pub fn place_mines_at(&mut self, mine_indices: &[usize]) {
        assert!(!self.placed, "mines should be placed at most once per board");
        for &idx in mine_indices {
            self.mines.set(idx, true);
        }
        self.fill_counts();
        self.placed = true;
    }

    fn fill_counts(&mut self) {
        for idx in 0..self.cell_count() {
            self.counts[idx] = if self.mines[idx] {
                -1
            } else {
                let adjacent = self
                    .topology
                    .neighbours(idx)
                    .iter()
                    .filter(|&&n| self.mines[n])
                    .count();
                adjacent as i8
            };
        }
    }

    /// Opens a cell, returning whether a mine exploded.
    ///
    /// Opening anything but a [`CellState::Hidden`] cell is a no-op; in
    /// particular a flag protects its cell from being opened. Opening a
    /// zero-count cell floods outward through an explicit work list, so the
    /// cascade cannot overflow the stack on large boards.
    pub fn open(&mut self, idx: usize) -> bool {
        if self.status[idx] != CellState::Hidden {
            return false;
        }
        if self.mines[idx] {
            self.status[idx] = CellState::Opened;
            return true;
        }

        let mut pending = vec![idx];
        while let Some(idx) = pending.pop() {
            if self.status[idx] != CellState::Hidden {
                continue;
            }
            self.status[idx] = CellState::Opened;
            if self.counts[idx] == 0 {
                // A zero cell has no adjacent mines, so the cascade can never
                // reach into a mine.
                pending.extend(
                    self.topology
                        .neighbours(idx)
                        .iter()
                        .copied()
                        .filter(|&n| self.status[n] == CellState::Hidden),
                );
            }
        }
        false
    }

    /// Toggles a flag on a hidden cell; opened cells are left alone.
    pub fn toggle_flag(&mut self, idx: usize) {
        self.status[idx] = match self.status[idx] {
            CellState::Hidden => CellState::Flagged,
            CellState::Flagged => CellState::Hidden,
            CellState::Opened => CellState::Opened,
        };
    }

    pub fn count_flags(&self) -> usize {
        self.status
            .iter()
            .filter(|&&s| s == CellState::Flagged)
            .count()
    }

    /// Whether every non-mine cell is opened. The state of mine cells is
    /// irrelevant to victory.
    pub fn check_win(&self) -> bool {
        (0..self.cell_count()).all(|idx| self.mines[idx] || self.status[idx] == CellState::Opened)
    }

    /// Returns every cell to [`CellState::Hidden`], erasing opens and flags
    /// while keeping mines and counts. The generator uses this to rewind the
    /// solver's proof before handing the board to the player.
    pub fn conceal_all(&mut self) {
        self.status.fill(CellState::Hidden);
    }
}

fn count_color(count: i8) -> &'static str {
    match count {
        1 => "\x1B[34m",
        2 => "\x1B[32m",
        3 => "\x1B[31m",
        4 => "\x1B[35m",
        _ => "\x1B[33m",
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for idx in 0..self.cell_count() {
            match self.status[idx] {
                CellState::Hidden => write!(f, "\x1B[90m·\x1B[0m ")?,
                CellState::Flagged => write!(f, "🚩")?,
                CellState::Opened if self.counts[idx] < 0 => write!(f, "💥")?,
                CellState::Opened => {
                    let count = self.counts[idx];
                    if count == 0 {
                        write!(f, "  ")?;
                    } else {
                        write!(f, "{}{count}\x1B[0m ", count_color(count))?;
                    }
                }
            }
            if (idx + 1) % self.width() == 0 {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::SmallRng, SeedableRng};

    use super::*;
    use crate::topology::Surface;

    fn board(width: usize, height: usize, surface: Surface) -> Board {
        Board::new(Arc::new(Topology::new(width, height, surface).unwrap()))
    }

    #[test]
    fn flood_opens_everything_but_the_mine() {
        let mut board = board(5, 5, Surface::Square);
        board.place_mines_at(&[0]);
        let exploded = board.open(24);
        assert!(!exploded);
        let opened = (0..25)
            .filter(|&i| board.status(i) == CellState::Opened)
            .count();
        assert_eq!(opened, 24);
        assert_eq!(board.status(0), CellState::Hidden);
        assert!(board.check_win());
    }

    #[test]
    fn opening_a_mine_explodes() {
        let mut board = board(4, 4, Surface::Square);
        board.place_mines_at(&[5]);
        assert!(board.open(5));
        assert_eq!(board.status(5), CellState::Opened);
    }

    #[test]
    fn flags_protect_and_round_trip() {
        let mut board = board(4, 4, Surface::Square);
        board.place_mines_at(&[0]);
        board.toggle_flag(15);
        assert_eq!(board.status(15), CellState::Flagged);
        assert!(!board.open(15));
        assert_eq!(board.status(15), CellState::Flagged);
        board.toggle_flag(15);
        assert_eq!(board.status(15), CellState::Hidden);
        assert_eq!(board.count_flags(), 0);
    }

    #[test]
    fn reopening_is_a_no_op() {
        let mut board = board(4, 4, Surface::Square);
        board.place_mines_at(&[0]);
        board.open(15);
        let before: Vec<_> = (0..16).map(|i| board.status(i)).collect();
        assert!(!board.open(15));
        let after: Vec<_> = (0..16).map(|i| board.status(i)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn flagged_cells_do_not_stop_the_surrounding_flood() {
        let mut board = board(5, 5, Surface::Square);
        board.place_mines_at(&[0]);
        board.toggle_flag(12);
        board.open(24);
        assert_eq!(board.status(12), CellState::Flagged);
        // Everything else away from the mine still opens.
        assert_eq!(board.status(23), CellState::Opened);
        assert_eq!(board.status(7), CellState::Opened);
    }

    #[test]
    fn placement_respects_the_safe_zone() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut board = board(9, 9, Surface::Square);
        board.place_mines(&mut rng, 10, 40).unwrap();
        assert_eq!(board.mine_count(), 10);
        assert!(!board.is_mine(40));
        for &n in board.topology().neighbours(40) {
            assert!(!board.is_mine(n));
        }
    }

    #[test]
    fn placement_fails_when_the_safe_zone_eats_the_board() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut board = board(3, 3, Surface::Square);
        let err = board.place_mines(&mut rng, 1, 4).unwrap_err();
        assert_eq!(err.capacity, 0);
    }

    #[test]
    fn counts_match_the_mine_map() {
        for seed in 0..8 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut board = board(6, 5, Surface::Torus);
            board.place_mines(&mut rng, 7, 14).unwrap();
            for idx in 0..board.cell_count() {
                if board.is_mine(idx) {
                    assert_eq!(board.count(idx), -1);
                } else {
                    let adjacent = board
                        .topology()
                        .neighbours(idx)
                        .iter()
                        .filter(|&&n| board.is_mine(n))
                        .count();
                    assert_eq!(board.count(idx) as usize, adjacent, "cell {idx}");
                }
            }
        }
    }

    #[test]
    fn clones_are_independent() {
        let mut board = board(4, 4, Surface::Square);
        board.place_mines_at(&[3]);
        let mut copy = board.clone();
        copy.open(12);
        copy.toggle_flag(3);
        assert_eq!(board.status(12), CellState::Hidden);
        assert_eq!(board.status(3), CellState::Hidden);
        assert!(copy.status(12) == CellState::Opened);
    }

    #[test]
    fn conceal_all_rewinds_only_visibility() {
        let mut board = board(4, 4, Surface::Square);
        board.place_mines_at(&[0]);
        board.open(15);
        board.toggle_flag(1);
        board.conceal_all();
        assert!((0..16).all(|i| board.status(i) == CellState::Hidden));
        assert!(board.is_mine(0));
        assert_eq!(board.count(5), 1);
    }
}
