//! Board and session state shared by the engine, rule sets and both endpoints.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// A player identity within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Side::White => 0,
            Side::Black => 1,
        }
    }

    /// The wire spelling of this side.
    pub fn as_str(self) -> &'static str {
        match self {
            Side::White => "white",
            Side::Black => "black",
        }
    }

    pub fn from_name(name: &str) -> Option<Side> {
        match name {
            "white" => Some(Side::White),
            "black" => Some(Side::Black),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A square on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pos {
    pub x: i8,
    pub y: i8,
}

impl Pos {
    pub fn new(x: i8, y: i8) -> Pos {
        Pos { x, y }
    }

    pub fn offset(self, dx: i8, dy: i8) -> Pos {
        Pos {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// The four orthogonal neighbour offsets.
    pub const ORTHOGONAL: [(i8, i8); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];

    /// The eight surrounding offsets (orthogonal plus diagonal).
    pub const SURROUNDING: [(i8, i8); 8] = [
        (-1, 1),
        (0, 1),
        (1, 1),
        (-1, 0),
        (1, 0),
        (-1, -1),
        (0, -1),
        (1, -1),
    ];
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// What a valid position holds. `count` is the stack height; single-piece
/// games always use 1. `Block` marks an impassable square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Occupant {
    Empty,
    Piece { side: Side, count: u8 },
    Block,
}

impl Occupant {
    pub fn piece(side: Side) -> Occupant {
        Occupant::Piece { side, count: 1 }
    }

    pub fn side(&self) -> Option<Side> {
        match self {
            Occupant::Piece { side, .. } => Some(*side),
            _ => None,
        }
    }
}

/// The playing surface: an ordered map from valid positions to occupants.
///
/// The set of valid positions is fixed when the board is built and can only
/// shrink afterwards. Ordered storage means canonical snapshots fall out of
/// plain iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: BTreeMap<Pos, Occupant>,
}

impl Board {
    /// Creates an empty rectangular board covering `0..width` x `0..height`.
    pub fn rect(width: i8, height: i8) -> Board {
        let mut cells = BTreeMap::new();
        for x in 0..width {
            for y in 0..height {
                cells.insert(Pos::new(x, y), Occupant::Empty);
            }
        }
        Board { cells }
    }

    /// True iff `pos` is still part of the playable area.
    pub fn contains(&self, pos: Pos) -> bool {
        self.cells.contains_key(&pos)
    }

    /// The occupant at `pos`, or `None` for positions outside the playable
    /// area.
    pub fn get(&self, pos: Pos) -> Option<Occupant> {
        self.cells.get(&pos).copied()
    }

    pub fn set(&mut self, pos: Pos, occupant: Occupant) {
        if let Some(cell) = self.cells.get_mut(&pos) {
            *cell = occupant;
        }
    }

    /// Removes `pos` from the playable area entirely, returning whatever
    /// occupied it. Used by shrink events; positions never come back.
    pub fn remove_position(&mut self, pos: Pos) -> Option<Occupant> {
        self.cells.remove(&pos)
    }

    pub fn is_empty_at(&self, pos: Pos) -> bool {
        matches!(self.get(pos), Some(Occupant::Empty))
    }

    pub fn positions(&self) -> impl Iterator<Item = Pos> + '_ {
        self.cells.keys().copied()
    }

    /// All squares holding a piece of `side`, with stack heights, in board
    /// order.
    pub fn pieces(&self, side: Side) -> Vec<(Pos, u8)> {
        self.cells
            .iter()
            .filter_map(|(pos, occ)| match occ {
                Occupant::Piece { side: s, count } if *s == side => Some((*pos, *count)),
                _ => None,
            })
            .collect()
    }

    /// Total units of `side` currently on the board.
    pub fn unit_count(&self, side: Side) -> u32 {
        self.cells
            .values()
            .filter_map(|occ| match occ {
                Occupant::Piece { side: s, count } if *s == side => Some(*count as u32),
                _ => None,
            })
            .sum()
    }

    fn occupied_cells(&self) -> Vec<(Pos, Occupant)> {
        self.cells
            .iter()
            .filter(|(_, occ)| !matches!(occ, Occupant::Empty))
            .map(|(pos, occ)| (*pos, *occ))
            .collect()
    }
}

/// A coarse stage of a session's rule set.
///
/// Phases advance `Opening -> Main -> {Completed, Invalid}`; the two final
/// phases are absorbing. Rule sets without a distinct opening stage start in
/// `Main`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Opening,
    Main,
    Completed,
    Invalid,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Invalid)
    }
}

/// Canonical encoding of a board configuration plus turn parity, used as the
/// key for repetition detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Snapshot {
    cells: Vec<(Pos, Occupant)>,
    parity: u8,
}

/// One game's complete authoritative state.
#[derive(Debug, Clone)]
pub struct Session {
    pub board: Board,
    /// Monotonically increasing count of applied actions.
    pub turns: u32,
    pub phase: Phase,
    scores: [u32; 2],
    history: HashMap<Snapshot, u32>,
}

impl Session {
    /// Builds a session and seeds the repetition history with the starting
    /// position.
    pub fn new(board: Board, phase: Phase, white_units: u32, black_units: u32) -> Session {
        let mut session = Session {
            board,
            turns: 0,
            phase,
            scores: [white_units, black_units],
            history: HashMap::new(),
        };
        let initial = session.snapshot();
        session.history.insert(initial, 1);
        session
    }

    /// Remaining units of `side`.
    pub fn score(&self, side: Side) -> u32 {
        self.scores[side.index()]
    }

    pub fn add_units(&mut self, side: Side, n: u32) {
        self.scores[side.index()] += n;
    }

    pub fn remove_units(&mut self, side: Side, n: u32) {
        let score = &mut self.scores[side.index()];
        *score = score.saturating_sub(n);
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            cells: self.board.occupied_cells(),
            parity: (self.turns % 2) as u8,
        }
    }

    /// Records the current snapshot in the history, returning how many times
    /// it has now occurred.
    pub fn record_snapshot(&mut self) -> u32 {
        let snapshot = self.snapshot();
        let seen = self.history.entry(snapshot).or_insert(0);
        *seen += 1;
        *seen
    }

    /// How many times the current position has occurred so far.
    pub fn repetitions(&self) -> u32 {
        self.history.get(&self.snapshot()).copied().unwrap_or(0)
    }

    /// A copy for lookahead: board, phase and scores, but no repetition
    /// history. Cheap enough to make once per candidate action.
    pub fn speculative(&self) -> Session {
        Session {
            board: self.board.clone(),
            turns: self.turns,
            phase: self.phase,
            scores: self.scores,
            history: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_round_trip() {
        for side in [Side::White, Side::Black] {
            assert_eq!(Side::from_name(side.as_str()), Some(side));
        }
        assert_eq!(Side::from_name("mauve"), None);
        assert_eq!(Side::White.opponent(), Side::Black);
        assert_eq!(Side::Black.opponent(), Side::White);
    }

    #[test]
    fn test_rect_board_positions() {
        let board = Board::rect(8, 8);
        assert_eq!(board.positions().count(), 64);
        assert!(board.contains(Pos::new(0, 0)));
        assert!(board.contains(Pos::new(7, 7)));
        assert!(!board.contains(Pos::new(8, 0)));
        assert!(!board.contains(Pos::new(-1, 3)));
        assert!(board.is_empty_at(Pos::new(3, 3)));
    }

    #[test]
    fn test_set_and_count_units() {
        let mut board = Board::rect(8, 8);
        board.set(Pos::new(1, 1), Occupant::piece(Side::White));
        board.set(Pos::new(2, 2), Occupant::Piece { side: Side::White, count: 3 });
        board.set(Pos::new(5, 5), Occupant::piece(Side::Black));
        assert_eq!(board.unit_count(Side::White), 4);
        assert_eq!(board.unit_count(Side::Black), 1);
        assert_eq!(board.pieces(Side::White).len(), 2);
    }

    #[test]
    fn test_set_outside_board_is_ignored() {
        let mut board = Board::rect(4, 4);
        board.set(Pos::new(9, 9), Occupant::piece(Side::White));
        assert_eq!(board.get(Pos::new(9, 9)), None);
        assert_eq!(board.unit_count(Side::White), 0);
    }

    #[test]
    fn test_remove_position_shrinks_valid_set() {
        let mut board = Board::rect(4, 4);
        board.set(Pos::new(0, 0), Occupant::piece(Side::Black));
        let removed = board.remove_position(Pos::new(0, 0));
        assert_eq!(removed, Some(Occupant::piece(Side::Black)));
        assert!(!board.contains(Pos::new(0, 0)));
        assert_eq!(board.get(Pos::new(0, 0)), None);
        assert!(!board.is_empty_at(Pos::new(0, 0)));
    }

    #[test]
    fn test_snapshot_ignores_empty_cells_and_tracks_parity() {
        let mut session = Session::new(Board::rect(4, 4), Phase::Main, 1, 0);
        session.board.set(Pos::new(1, 2), Occupant::piece(Side::White));
        let a = session.snapshot();
        session.turns += 1;
        let b = session.snapshot();
        assert_ne!(a, b, "parity change must produce a distinct snapshot");
        session.turns += 1;
        assert_eq!(a, session.snapshot());
    }

    #[test]
    fn test_record_snapshot_counts_occurrences() {
        let mut session = Session::new(Board::rect(4, 4), Phase::Main, 0, 0);
        // The starting position is seeded with one occurrence.
        assert_eq!(session.repetitions(), 1);
        assert_eq!(session.record_snapshot(), 2);
        assert_eq!(session.record_snapshot(), 3);
        session.turns += 1;
        assert_eq!(session.record_snapshot(), 1);
    }

    #[test]
    fn test_scores_saturate_at_zero() {
        let mut session = Session::new(Board::rect(4, 4), Phase::Main, 2, 2);
        session.remove_units(Side::White, 5);
        assert_eq!(session.score(Side::White), 0);
        assert_eq!(session.score(Side::Black), 2);
        session.add_units(Side::Black, 1);
        assert_eq!(session.score(Side::Black), 3);
    }
}
