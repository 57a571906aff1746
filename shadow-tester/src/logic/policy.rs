use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use shadow_game::Ghost;
use shadow_game::constants::{CANDLE_COUNT, PUZZLE_GRID_SIZE, PUZZLE_SOLVED};
use shadow_game::minigames::puzzle::{Board, is_solvable, movable_cells, slide_tile};

/// Scripted player driving one simulated session.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// How many times to poke the companion on a home visit.
    fn companion_taps(&mut self) -> u32;

    /// Whether to favourite today's diary whisper.
    fn favorite_whisper(&mut self) -> bool;

    /// Tile to slide next, or `None` to wait.
    fn puzzle_move(&mut self, board: &Board) -> Option<usize>;

    /// Candle to tap when `expected` is the right answer, or `None` to wait.
    fn memory_tap(&mut self, expected: u8) -> Option<u8>;

    /// Ghosts to tap this tick.
    fn ghost_taps(&mut self, ghosts: &[Ghost]) -> Vec<u64>;
}

/// Built-in bot players for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GameplayStrategy {
    /// Never makes a mistake.
    Perfect,
    /// Plays well but slips now and then.
    Sloppy,
    /// Visits daily and never acts.
    Idle,
}

impl GameplayStrategy {
    pub const ALL: [Self; 3] = [Self::Perfect, Self::Sloppy, Self::Idle];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Perfect => "Perfect",
            Self::Sloppy => "Sloppy",
            Self::Idle => "Idle",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy> {
        match self {
            Self::Perfect => Box::new(PerfectPolicy::default()),
            Self::Sloppy => Box::new(SloppyPolicy::new(seed)),
            Self::Idle => Box::new(IdlePolicy),
        }
    }
}

impl fmt::Display for GameplayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Shortest list of tile indices that solves `board`, via A* over the
/// summed Manhattan distance. `None` for unsolvable boards.
#[must_use]
pub fn solve_puzzle(board: &Board) -> Option<Vec<usize>> {
    if !is_solvable(board) {
        return None;
    }
    let mut came_from: HashMap<Board, (Board, usize)> = HashMap::new();
    let mut best: HashMap<Board, u32> = HashMap::from([(*board, 0)]);
    let mut open = BinaryHeap::from([Reverse((manhattan(board), 0_u32, *board))]);

    while let Some(Reverse((_, cost, current))) = open.pop() {
        if current == PUZZLE_SOLVED {
            return Some(rebuild_path(&came_from, current));
        }
        if best.get(&current).is_some_and(|&known| known < cost) {
            continue;
        }
        for index in movable_cells(&current) {
            let mut next = current;
            slide_tile(&mut next, index);
            let next_cost = cost + 1;
            if best.get(&next).is_none_or(|&known| next_cost < known) {
                best.insert(next, next_cost);
                came_from.insert(next, (current, index));
                open.push(Reverse((next_cost + manhattan(&next), next_cost, next)));
            }
        }
    }
    None
}

fn rebuild_path(came_from: &HashMap<Board, (Board, usize)>, mut board: Board) -> Vec<usize> {
    let mut path = Vec::new();
    while let Some(&(previous, index)) = came_from.get(&board) {
        path.push(index);
        board = previous;
    }
    path.reverse();
    path
}

fn manhattan(board: &Board) -> u32 {
    board
        .iter()
        .enumerate()
        .filter(|&(_, &tile)| tile != 0)
        .map(|(index, &tile)| {
            let home = usize::from(tile) - 1;
            let rows = (index / PUZZLE_GRID_SIZE).abs_diff(home / PUZZLE_GRID_SIZE);
            let cols = (index % PUZZLE_GRID_SIZE).abs_diff(home % PUZZLE_GRID_SIZE);
            u32::try_from(rows + cols).unwrap_or(u32::MAX)
        })
        .sum()
}

/// Cached solution that is replanned whenever the board drifts from it.
#[derive(Debug, Default)]
struct PuzzlePlan {
    expected: Option<Board>,
    remaining: Vec<usize>,
}

impl PuzzlePlan {
    fn next_move(&mut self, board: &Board) -> Option<usize> {
        if self.expected != Some(*board) || self.remaining.is_empty() {
            let mut path = solve_puzzle(board)?;
            path.reverse();
            self.remaining = path;
        }
        let index = self.remaining.pop()?;
        let mut after = *board;
        slide_tile(&mut after, index);
        self.expected = Some(after);
        Some(index)
    }
}

#[derive(Debug, Default)]
struct PerfectPolicy {
    puzzle: PuzzlePlan,
}

impl PlayerPolicy for PerfectPolicy {
    fn name(&self) -> &'static str {
        "Perfect"
    }

    fn companion_taps(&mut self) -> u32 {
        10
    }

    fn favorite_whisper(&mut self) -> bool {
        true
    }

    fn puzzle_move(&mut self, board: &Board) -> Option<usize> {
        self.puzzle.next_move(board)
    }

    fn memory_tap(&mut self, expected: u8) -> Option<u8> {
        Some(expected)
    }

    fn ghost_taps(&mut self, ghosts: &[Ghost]) -> Vec<u64> {
        ghosts.iter().map(|ghost| ghost.id).collect()
    }
}

const SLOPPY_PUZZLE_SLIP: f64 = 0.25;
const SLOPPY_MEMORY_SLIP: f64 = 0.08;
const SLOPPY_GHOST_REACH: f64 = 0.35;

struct SloppyPolicy {
    rng: ChaCha20Rng,
    puzzle: PuzzlePlan,
}

impl SloppyPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            puzzle: PuzzlePlan::default(),
        }
    }
}

impl PlayerPolicy for SloppyPolicy {
    fn name(&self) -> &'static str {
        "Sloppy"
    }

    fn companion_taps(&mut self) -> u32 {
        self.rng.gen_range(0..=12)
    }

    fn favorite_whisper(&mut self) -> bool {
        self.rng.gen_bool(0.3)
    }

    fn puzzle_move(&mut self, board: &Board) -> Option<usize> {
        if self.rng.gen_bool(SLOPPY_PUZZLE_SLIP) {
            return movable_cells(board).choose(&mut self.rng).copied();
        }
        self.puzzle.next_move(board)
    }

    fn memory_tap(&mut self, expected: u8) -> Option<u8> {
        if self.rng.gen_bool(SLOPPY_MEMORY_SLIP) {
            let offset = self.rng.gen_range(1..CANDLE_COUNT);
            Some((expected + offset) % CANDLE_COUNT)
        } else {
            Some(expected)
        }
    }

    fn ghost_taps(&mut self, ghosts: &[Ghost]) -> Vec<u64> {
        if ghosts.is_empty() || !self.rng.gen_bool(SLOPPY_GHOST_REACH) {
            return Vec::new();
        }
        ghosts
            .choose(&mut self.rng)
            .map(|ghost| vec![ghost.id])
            .unwrap_or_default()
    }
}

struct IdlePolicy;

impl PlayerPolicy for IdlePolicy {
    fn name(&self) -> &'static str {
        "Idle"
    }

    fn companion_taps(&mut self) -> u32 {
        0
    }

    fn favorite_whisper(&mut self) -> bool {
        false
    }

    fn puzzle_move(&mut self, _board: &Board) -> Option<usize> {
        None
    }

    fn memory_tap(&mut self, _expected: u8) -> Option<u8> {
        None
    }

    fn ghost_taps(&mut self, _ghosts: &[Ghost]) -> Vec<u64> {
        Vec::new()
    }
}
