//! Shadow Puzzle: the 3x3 sliding-tile game.
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Minigame, MinigameId, RoundResult};
use crate::constants::{
    PUZZLE_CELLS, PUZZLE_EFFICIENCY_BASE, PUZZLE_GRID_SIZE, PUZZLE_SCORE_BASE,
    PUZZLE_SCORE_PER_MOVE, PUZZLE_SCORE_PER_SECOND, PUZZLE_SOLVED, PUZZLE_XP_MAX, PUZZLE_XP_MIN,
};
use crate::numbers::{clamp_i64_to_u32, u64_to_i64, whole_seconds};

/// Row-major cells; `0` is the blank.
pub type Board = [u8; PUZZLE_CELLS];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PuzzlePhase {
    #[default]
    Ready,
    Playing,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PuzzleError {
    #[error("board must contain each of 0..=8 exactly once")]
    NotAPermutation,
    #[error("board has an odd inversion count and cannot be solved")]
    Unsolvable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Not adjacent to the blank, out of range, or not playing.
    Ignored,
    Moved,
    Solved,
}

/// Pairs `(i, j)`, `i < j`, of non-blank tiles with `board[i] > board[j]`.
#[must_use]
pub fn inversion_count(board: &Board) -> u32 {
    let mut inversions = 0;
    for i in 0..PUZZLE_CELLS {
        for j in (i + 1)..PUZZLE_CELLS {
            if board[i] != 0 && board[j] != 0 && board[i] > board[j] {
                inversions += 1;
            }
        }
    }
    inversions
}

/// On an odd-width grid a board is solvable iff its inversion count is even.
#[must_use]
pub fn is_solvable(board: &Board) -> bool {
    inversion_count(board) % 2 == 0
}

/// Check that `board` is a solvable permutation of the tiles.
///
/// # Errors
///
/// Returns [`PuzzleError::NotAPermutation`] for missing or repeated tiles and
/// [`PuzzleError::Unsolvable`] for odd inversion parity.
pub fn validate_board(board: &Board) -> Result<(), PuzzleError> {
    let mut seen = [false; PUZZLE_CELLS];
    for &tile in board {
        let slot = seen
            .get_mut(usize::from(tile))
            .ok_or(PuzzleError::NotAPermutation)?;
        if *slot {
            return Err(PuzzleError::NotAPermutation);
        }
        *slot = true;
    }
    if is_solvable(board) {
        Ok(())
    } else {
        Err(PuzzleError::Unsolvable)
    }
}

/// Uniformly permute the solved board, then fix parity if needed by swapping
/// the first two non-blank tiles (one swap flips inversion parity).
pub fn shuffle_board<R: Rng + ?Sized>(rng: &mut R) -> Board {
    let mut board = PUZZLE_SOLVED;
    board.shuffle(rng);
    if !is_solvable(&board) {
        let mut tiles = (0..PUZZLE_CELLS).filter(|&index| board[index] != 0);
        if let (Some(first), Some(second)) = (tiles.next(), tiles.next()) {
            board.swap(first, second);
        }
    }
    board
}

#[must_use]
pub fn blank_index(board: &Board) -> usize {
    board.iter().position(|&tile| tile == 0).unwrap_or(0)
}

/// Orthogonal neighbours on the grid (Manhattan distance 1).
#[must_use]
pub const fn is_adjacent(a: usize, b: usize) -> bool {
    let (a_row, a_col) = (a / PUZZLE_GRID_SIZE, a % PUZZLE_GRID_SIZE);
    let (b_row, b_col) = (b / PUZZLE_GRID_SIZE, b % PUZZLE_GRID_SIZE);
    (a_row.abs_diff(b_row) == 1 && a_col == b_col) || (a_col.abs_diff(b_col) == 1 && a_row == b_row)
}

/// Cells whose tile can slide into the blank.
#[must_use]
pub fn movable_cells(board: &Board) -> Vec<usize> {
    let blank = blank_index(board);
    (0..PUZZLE_CELLS)
        .filter(|&index| is_adjacent(index, blank))
        .collect()
}

/// Slide the tile at `index` into the blank. Returns false if not adjacent.
pub fn slide_tile(board: &mut Board, index: usize) -> bool {
    let blank = blank_index(board);
    if index >= PUZZLE_CELLS || !is_adjacent(index, blank) {
        return false;
    }
    board.swap(index, blank);
    true
}

/// `max(0, 1000 - moves*10 - seconds*5)`.
#[must_use]
pub fn score_for(moves: u32, elapsed_secs: u64) -> u32 {
    let score = PUZZLE_SCORE_BASE
        .saturating_sub(i64::from(moves) * PUZZLE_SCORE_PER_MOVE)
        .saturating_sub(u64_to_i64(elapsed_secs).saturating_mul(PUZZLE_SCORE_PER_SECOND));
    clamp_i64_to_u32(score, 0, u32::MAX)
}

/// `clamp(floor(max(0, 100 - moves - seconds) / 10) + 8, 8, 10)`.
#[must_use]
pub fn xp_for(moves: u32, elapsed_secs: u64) -> u32 {
    let efficiency = (PUZZLE_EFFICIENCY_BASE - i64::from(moves))
        .saturating_sub(u64_to_i64(elapsed_secs))
        .max(0);
    clamp_i64_to_u32(
        efficiency / 10 + i64::from(PUZZLE_XP_MIN),
        PUZZLE_XP_MIN,
        PUZZLE_XP_MAX,
    )
}

/// One sliding-tile round: `ready -> playing -> ended`, restartable.
#[derive(Debug, Clone)]
pub struct SlidingPuzzle<R> {
    rng: R,
    phase: PuzzlePhase,
    board: Board,
    moves: u32,
    clock_ms: u64,
    started_at_ms: u64,
    result: Option<RoundResult>,
}

impl<R: Rng> SlidingPuzzle<R> {
    #[must_use]
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            phase: PuzzlePhase::Ready,
            board: PUZZLE_SOLVED,
            moves: 0,
            clock_ms: 0,
            started_at_ms: 0,
            result: None,
        }
    }

    /// Deal a freshly shuffled board and start playing.
    pub fn start(&mut self) {
        let board = shuffle_board(&mut self.rng);
        self.begin(board);
    }

    /// Start playing from a caller-supplied board.
    ///
    /// # Errors
    ///
    /// Rejects boards that are not solvable permutations.
    pub fn start_with_board(&mut self, board: Board) -> Result<(), PuzzleError> {
        validate_board(&board)?;
        self.begin(board);
        Ok(())
    }

    /// Re-deal after a finished round.
    pub fn reset(&mut self) {
        self.start();
    }

    fn begin(&mut self, board: Board) {
        self.board = board;
        self.moves = 0;
        self.started_at_ms = self.clock_ms;
        self.result = None;
        self.phase = PuzzlePhase::Playing;
        if self.board == PUZZLE_SOLVED {
            self.finish();
        }
    }

    pub fn try_move(&mut self, index: usize) -> MoveOutcome {
        if self.phase != PuzzlePhase::Playing || !slide_tile(&mut self.board, index) {
            return MoveOutcome::Ignored;
        }
        self.moves += 1;
        if self.board == PUZZLE_SOLVED {
            self.finish();
            MoveOutcome::Solved
        } else {
            MoveOutcome::Moved
        }
    }

    fn finish(&mut self) {
        let secs = whole_seconds(self.elapsed_ms());
        let result = RoundResult {
            game: MinigameId::ShadowPuzzle,
            score: score_for(self.moves, secs),
            xp: xp_for(self.moves, secs),
            won: true,
        };
        log::info!(
            "puzzle solved in {} moves / {secs}s: score {} xp {}",
            self.moves,
            result.score,
            result.xp
        );
        self.phase = PuzzlePhase::Ended;
        self.result = Some(result);
    }

    #[must_use]
    pub const fn board(&self) -> &Board {
        &self.board
    }

    #[must_use]
    pub const fn moves(&self) -> u32 {
        self.moves
    }

    #[must_use]
    pub const fn phase(&self) -> PuzzlePhase {
        self.phase
    }

    #[must_use]
    pub fn movable_cells(&self) -> Vec<usize> {
        if self.phase == PuzzlePhase::Playing {
            movable_cells(&self.board)
        } else {
            Vec::new()
        }
    }

    /// Round time so far; frozen once the puzzle is solved.
    #[must_use]
    pub const fn elapsed_ms(&self) -> u64 {
        self.clock_ms.saturating_sub(self.started_at_ms)
    }
}

impl<R: Rng> Minigame for SlidingPuzzle<R> {
    fn id(&self) -> MinigameId {
        MinigameId::ShadowPuzzle
    }

    fn phase_label(&self) -> &'static str {
        match self.phase {
            PuzzlePhase::Ready => "ready",
            PuzzlePhase::Playing => "playing",
            PuzzlePhase::Ended => "ended",
        }
    }

    fn advance(&mut self, elapsed_ms: u64) {
        if self.phase == PuzzlePhase::Playing {
            self.clock_ms = self.clock_ms.saturating_add(elapsed_ms);
        }
    }

    fn clock_ms(&self) -> u64 {
        self.clock_ms
    }

    fn result(&self) -> Option<RoundResult> {
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn puzzle(seed: u64) -> SlidingPuzzle<ChaCha20Rng> {
        SlidingPuzzle::new(ChaCha20Rng::seed_from_u64(seed))
    }

    #[test]
    fn inversions_and_parity() {
        assert_eq!(inversion_count(&PUZZLE_SOLVED), 0);
        assert_eq!(inversion_count(&[2, 1, 3, 4, 5, 6, 7, 8, 0]), 1);
        assert_eq!(inversion_count(&[0, 8, 7, 6, 5, 4, 3, 2, 1]), 28);
        assert!(is_solvable(&[0, 8, 7, 6, 5, 4, 3, 2, 1]));
        assert!(!is_solvable(&[1, 2, 3, 4, 5, 6, 8, 7, 0]));
    }

    #[test]
    fn shuffled_boards_are_solvable_permutations() {
        let mut rng = ChaCha20Rng::seed_from_u64(99);
        for _ in 0..2_000 {
            let board = shuffle_board(&mut rng);
            assert_eq!(validate_board(&board), Ok(()));
        }
    }

    #[test]
    fn adjacency_is_orthogonal_only() {
        assert!(is_adjacent(0, 1));
        assert!(is_adjacent(0, 3));
        assert!(is_adjacent(4, 5));
        assert!(!is_adjacent(0, 4));
        assert!(!is_adjacent(2, 3));
        assert!(!is_adjacent(0, 2));
        assert!(!is_adjacent(4, 4));
        assert_eq!(movable_cells(&PUZZLE_SOLVED), vec![5, 7]);
    }

    #[test]
    fn solved_board_wins_immediately() {
        let mut game = puzzle(1);
        game.start_with_board(PUZZLE_SOLVED).unwrap();
        assert_eq!(game.phase(), PuzzlePhase::Ended);
        let result = game.result().unwrap();
        assert_eq!(game.moves(), 0);
        assert_eq!(result.xp, 10);
        assert_eq!(result.score, 1_000);
        assert!(result.won);
    }

    #[test]
    fn moves_swap_with_blank_and_count() {
        let mut game = puzzle(2);
        // One slide away from solved: blank at 7, tile 8 at 8.
        game.start_with_board([1, 2, 3, 4, 5, 6, 7, 0, 8]).unwrap();
        assert_eq!(game.try_move(0), MoveOutcome::Ignored);
        assert_eq!(game.moves(), 0);

        assert_eq!(game.try_move(4), MoveOutcome::Moved);
        assert_eq!(game.board(), &[1, 2, 3, 4, 0, 6, 7, 5, 8]);
        assert_eq!(game.moves(), 1);

        assert_eq!(game.try_move(7), MoveOutcome::Moved);
        game.advance(12_400);
        assert_eq!(game.try_move(8), MoveOutcome::Solved);
        assert_eq!(game.moves(), 3);
        let result = game.result().unwrap();
        assert_eq!(result.score, 1_000 - 30 - 60);
        assert_eq!(result.xp, 10);

        assert_eq!(game.try_move(7), MoveOutcome::Ignored);
        assert_eq!(game.moves(), 3);
    }

    #[test]
    fn rejects_bad_boards() {
        let mut game = puzzle(3);
        assert_eq!(
            game.start_with_board([1, 1, 3, 4, 5, 6, 7, 8, 0]),
            Err(PuzzleError::NotAPermutation)
        );
        assert_eq!(
            game.start_with_board([1, 2, 3, 4, 5, 6, 7, 8, 9]),
            Err(PuzzleError::NotAPermutation)
        );
        assert_eq!(
            game.start_with_board([2, 1, 3, 4, 5, 6, 7, 8, 0]),
            Err(PuzzleError::Unsolvable)
        );
        assert_eq!(game.phase(), PuzzlePhase::Ready);
    }

    #[test]
    fn scoring_formulas() {
        assert_eq!(score_for(0, 0), 1_000);
        assert_eq!(score_for(40, 60), 300);
        assert_eq!(score_for(200, 200), 0);
        assert_eq!(xp_for(0, 0), 10);
        assert_eq!(xp_for(50, 35), 9);
        assert_eq!(xp_for(80, 15), 8);
        assert_eq!(xp_for(500, 9_000), 8);
        assert_eq!(xp_for(u32::MAX, u64::MAX), 8);
        assert_eq!(score_for(u32::MAX, u64::MAX), 0);
    }

    #[test]
    fn restart_after_win_deals_new_board() {
        let mut game = puzzle(4);
        game.start_with_board(PUZZLE_SOLVED).unwrap();
        assert!(game.is_finished());
        game.reset();
        assert!(matches!(game.phase(), PuzzlePhase::Playing | PuzzlePhase::Ended));
        assert_eq!(game.moves(), 0);
        if game.phase() == PuzzlePhase::Playing {
            assert!(game.result().is_none());
        }
    }
}
