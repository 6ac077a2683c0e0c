use bitvec::{bitbox, boxed::BitBox, slice::BitSlice};

use crate::board::{Board, CellState};

/// Proves cells safe or mined from a board's visible state alone.
///
/// The solver reads opened cells and their cached neighbour counts plus the
/// board-wide mine total; it never consults the mine map, so every deduction
/// it makes is one a player could make. Deductions accumulate in two
/// disjoint index sets, `known_mines` and `known_safe`.
///
/// Three inference tiers run in ascending cost order:
///
/// 1. per-cell count constraints, repeated to a fixpoint;
/// 2. the global mine budget over all remaining unknown cells;
/// 3. single-cell contradiction probes over the frontier, each driving a
///    hypothetical copy of the solver to a tier-1/tier-2 fixpoint.
///
/// A hypothetical whose constraints become unsatisfiable drops its `valid`
/// flag; that contradiction is the proof that the probed assumption was
/// wrong. On a truthful board the live solver itself never contradicts.
#[derive(Clone, Debug)]
pub struct Solver {
    total_mines: usize,
    known_mines: BitBox,
    known_safe: BitBox,
    valid: bool,
}

impl Solver {
    pub fn new(board: &Board, total_mines: usize) -> Self {
        let cells = board.cell_count();
        Self {
            total_mines,
            known_mines: bitbox![0; cells],
            known_safe: bitbox![0; cells],
            valid: true,
        }
    }

    /// Cells proven to contain a mine.
    pub fn known_mines(&self) -> &BitSlice {
        &self.known_mines
    }

    /// Cells proven to be free of mines.
    pub fn known_safe(&self) -> &BitSlice {
        &self.known_safe
    }

    /// `false` once the tracked constraints have become unsatisfiable.
    pub fn is_consistent(&self) -> bool {
        self.valid
    }

    /// A hidden cell the solver has no verdict on yet.
    fn is_unknown(&self, board: &Board, idx: usize) -> bool {
        board.status(idx) == CellState::Hidden && !self.known_mines[idx] && !self.known_safe[idx]
    }

    /// Tier 1: applies every opened cell's count constraint until no set
    /// changes. Returns whether anything was deduced.
    pub fn propagate_counts(&mut self, board: &Board) -> bool {
        let mut any = false;
        while self.valid && self.local_pass(board) {
            any = true;
        }
        any
    }

    fn local_pass(&mut self, board: &Board) -> bool {
        let mut progress = false;
        for idx in 0..board.cell_count() {
            if board.status(idx) != CellState::Opened || board.count(idx) <= 0 {
                continue;
            }
            let mut marked = 0usize;
            let mut unknown = 0usize;
            for &n in board.topology().neighbours(idx) {
                if self.known_mines[n] {
                    marked += 1;
                } else if self.is_unknown(board, n) {
                    unknown += 1;
                }
            }
            let remaining = board.count(idx) as isize - marked as isize;
            if remaining < 0 || remaining > unknown as isize {
                self.valid = false;
                return progress;
            }
            if unknown == 0 {
                continue;
            }
            if remaining == 0 {
                self.mark_unknown_neighbours(board, idx, false);
                progress = true;
            } else if remaining == unknown as isize {
                self.mark_unknown_neighbours(board, idx, true);
                progress = true;
            }
        }
        progress
    }

    fn mark_unknown_neighbours(&mut self, board: &Board, idx: usize, as_mine: bool) {
        for &n in board.topology().neighbours(idx) {
            if self.is_unknown(board, n) {
                if as_mine {
                    self.known_mines.set(n, true);
                } else {
                    self.known_safe.set(n, true);
                }
            }
        }
    }

    /// Tier 2: settles all remaining unknown cells at once when the mine
    /// budget pins them down. This is what cracks high-density corners on
    /// bounded boards whose local constraints have gone quiet.
    pub fn apply_mine_budget(&mut self, board: &Board) -> bool {
        if !self.valid {
            return false;
        }
        let unknown: Vec<usize> = (0..board.cell_count())
            .filter(|&idx| self.is_unknown(board, idx))
            .collect();
        let marked = self.known_mines.count_ones();
        if marked > self.total_mines {
            self.valid = false;
            return false;
        }
        let remaining = self.total_mines - marked;
        if remaining > unknown.len() {
            self.valid = false;
            return false;
        }
        if unknown.is_empty() {
            return false;
        }
        if remaining == unknown.len() {
            for idx in unknown {
                self.known_mines.set(idx, true);
            }
            return true;
        }
        if remaining == 0 {
            for idx in unknown {
                self.known_safe.set(idx, true);
            }
            return true;
        }
        false
    }

    /// Tier 3: probes every frontier cell with both hypotheses.
    ///
    /// Assuming a cell mined and reaching a contradiction proves it safe;
    /// assuming it safe and contradicting proves it a mine. Facts learned
    /// mid-pass immediately sharpen the remaining probes.
    pub fn probe_contradictions(&mut self, board: &Board) -> bool {
        let mut any = false;
        for idx in self.frontier(board) {
            // An earlier probe may already have settled this cell.
            if !self.is_unknown(board, idx) {
                continue;
            }
            let mut hypothetical = self.clone();
            hypothetical.known_mines.set(idx, true);
            hypothetical.drive_to_fixpoint(board);
            if !hypothetical.valid {
                self.known_safe.set(idx, true);
                any = true;
                continue;
            }
            let mut hypothetical = self.clone();
            hypothetical.known_safe.set(idx, true);
            hypothetical.drive_to_fixpoint(board);
            if !hypothetical.valid {
                self.known_mines.set(idx, true);
                any = true;
            }
        }
        any
    }

    /// Unknown cells adjacent to at least one opened, numbered cell.
    fn frontier(&self, board: &Board) -> Vec<usize> {
        (0..board.cell_count())
            .filter(|&idx| {
                self.is_unknown(board, idx)
                    && board.topology().neighbours(idx).iter().any(|&n| {
                        board.status(n) == CellState::Opened && board.count(n) > 0
                    })
            })
            .collect()
    }

    /// Alternates tiers 1 and 2 until neither moves or the state contradicts.
    fn drive_to_fixpoint(&mut self, board: &Board) {
        while self.valid {
            let counts = self.propagate_counts(board);
            if !self.valid {
                return;
            }
            let budget = self.apply_mine_budget(board);
            if !counts && !budget {
                return;
            }
        }
    }

    /// Opens every proven-safe cell that is still hidden. Returns whether
    /// any cell was opened.
    fn open_known_safe(&self, board: &mut Board) -> bool {
        let mut opened = false;
        for idx in self.known_safe.iter_ones() {
            if board.status(idx) == CellState::Hidden {
                let exploded = board.open(idx);
                debug_assert!(!exploded, "a proven-safe cell should never explode");
                opened = true;
            }
        }
        opened
    }

    /// Runs one round of the outer deduction loop: tier 1 to fixpoint, tier
    /// 2 once, tier 3 only if the cheaper tiers stalled, then opens every
    /// newly proven safe cell. Returns whether the round made progress.
    pub fn solve_round(&mut self, board: &mut Board) -> bool {
        let mut advanced = self.propagate_counts(board);
        advanced |= self.apply_mine_budget(board);
        if !advanced {
            advanced = self.probe_contradictions(board);
        }
        let opened = self.open_known_safe(board);
        advanced || opened
    }

    /// Whether a player starting at `start_idx` can open every non-mine cell
    /// through forced deductions alone.
    ///
    /// Opens `start_idx`, then repeats [`Solver::solve_round`] until a full
    /// round yields neither a deduction nor an opening. The final verdict is
    /// the board's own win check; solver logic never reads the mine map.
    pub fn check_solvability(&mut self, board: &mut Board, start_idx: usize) -> bool {
        if board.open(start_idx) {
            return false;
        }
        while self.solve_round(board) {}
        board.check_win()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rand::{rngs::SmallRng, SeedableRng};

    use super::*;
    use crate::topology::{Surface, Topology};

    fn board(width: usize, height: usize, surface: Surface) -> Board {
        Board::new(Arc::new(Topology::new(width, height, surface).unwrap()))
    }

    /// 5x5 bounded board whose right column and bottom row stay hidden after
    /// flooding from the top-left corner:
    ///
    /// ```txt
    ///       1 M        M = (4,0)
    ///       2 ?
    ///       1 M        M = (4,2)
    /// 1 1 2 3 ?
    /// ? M ? M M        M = (1,4) (3,4) (4,4)
    /// ```
    ///
    /// No single count constraint is forced and the mine budget (5 of 9
    /// hidden) decides nothing, so only contradiction probes break in.
    fn stalled_board() -> Board {
        let mut board = board(5, 5, Surface::Square);
        board.place_mines_at(&[4, 14, 21, 23, 24]);
        board
    }

    #[test]
    fn contradiction_probes_crack_a_stalled_position() {
        let mut board = stalled_board();
        assert!(!board.open(0));
        let opened = (0..25)
            .filter(|&i| board.status(i) == CellState::Opened)
            .count();
        assert_eq!(opened, 16);

        let mut solver = Solver::new(&board, 5);
        assert!(!solver.propagate_counts(&board));
        assert!(!solver.apply_mine_budget(&board));
        assert!(solver.probe_contradictions(&board));
        assert!(solver.known_safe().count_ones() >= 1);
        assert!(solver.is_consistent());
    }

    #[test]
    fn stalled_position_is_still_fully_solvable() {
        let mut board = stalled_board();
        let mut solver = Solver::new(&board, 5);
        assert!(solver.check_solvability(&mut board, 0));
        assert!(board.check_win());
        for idx in [4, 14, 21, 23, 24] {
            assert_ne!(board.status(idx), CellState::Opened);
        }
    }

    #[test]
    fn mine_budget_settles_the_last_cell() {
        let mut board = board(3, 3, Surface::Square);
        board.place_mines_at(&[0]);
        // Opening the far corner floods everything except the mine.
        board.open(8);
        let mut solver = Solver::new(&board, 1);
        // One unknown cell and one unplaced mine: the budget pins it.
        assert!(solver.apply_mine_budget(&board));
        assert!(solver.known_mines()[0]);
    }

    #[test]
    fn budget_reveals_pockets_once_all_mines_are_found() {
        // Mines at (2,2), (3,2) and (2,3) wall off the corner (3,3). No
        // count constrains the pocket, but once the wall is marked the mine
        // budget is spent and the pocket must be safe.
        let mut board = board(4, 4, Surface::Square);
        board.place_mines_at(&[10, 11, 14]);
        assert!(!board.open(0));
        let mut solver = Solver::new(&board, 3);
        assert!(solver.propagate_counts(&board));
        assert!(!solver.known_safe()[15]);
        assert!(solver.apply_mine_budget(&board));
        assert!(solver.known_safe()[15]);
    }

    #[test]
    fn deductions_are_sound_on_random_boards() {
        for seed in 0..12 {
            for surface in [Surface::Square, Surface::Torus, Surface::Klein] {
                let mut rng = SmallRng::seed_from_u64(seed);
                let mut board = board(8, 8, surface);
                board.place_mines(&mut rng, 12, 27).unwrap();
                let mut solver = Solver::new(&board, 12);
                solver.check_solvability(&mut board, 27);
                assert!(solver.is_consistent());
                for idx in solver.known_mines().iter_ones() {
                    assert!(board.is_mine(idx), "seed {seed}: {idx} marked mine");
                }
                for idx in solver.known_safe().iter_ones() {
                    assert!(!board.is_mine(idx), "seed {seed}: {idx} marked safe");
                }
            }
        }
    }

    #[test]
    fn sets_stay_disjoint() {
        let mut board = stalled_board();
        let mut solver = Solver::new(&board, 5);
        solver.check_solvability(&mut board, 0);
        let overlap = solver
            .known_mines()
            .iter_ones()
            .filter(|&idx| solver.known_safe()[idx])
            .count();
        assert_eq!(overlap, 0);
    }
}
