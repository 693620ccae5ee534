//! The "siege" variant: single pieces on an 8x8 board with blocked corners,
//! captured by being sandwiched between two enemies. Play opens with a
//! placement stage, then moves and jumps; the playable area shrinks twice at
//! fixed turn counts.

use crate::board::{Board, Occupant, Phase, Pos, Session, Side};
use crate::protocol::Action;
use crate::rules::{Outcome, RuleSet};

const SIZE: i8 = 8;

/// Turns in the placement stage (12 pieces per side).
const PLACEMENT_TURNS: u32 = 24;

/// Total turn counts at which the playable area shrinks by one ring.
const SHRINK_AT: [u32; 2] = [152, 216];

/// A side with fewer pieces than this has lost.
const MIN_PIECES: u32 = 2;

pub struct Siege;

impl RuleSet for Siege {
    fn name(&self) -> &'static str {
        "siege"
    }

    fn sides(&self) -> &'static [Side] {
        &[Side::White, Side::Black]
    }

    fn initial(&self) -> Session {
        let mut board = Board::rect(SIZE, SIZE);
        for pos in corner_positions(0) {
            board.set(pos, Occupant::Block);
        }
        Session::new(board, Phase::Opening, 0, 0)
    }

    fn legal_actions(&self, state: &Session, side: Side) -> Vec<Action> {
        match state.phase {
            Phase::Opening => {
                let mut actions = Vec::new();
                for pos in state.board.positions() {
                    if state.board.is_empty_at(pos) && in_placement_zone(side, pos) {
                        actions.push(Action::Place(pos));
                    }
                }
                actions
            }
            Phase::Main => {
                let mut actions = Vec::new();
                for (from, _) in state.board.pieces(side) {
                    for (dx, dy) in Pos::ORTHOGONAL {
                        let step = from.offset(dx, dy);
                        if state.board.is_empty_at(step) {
                            actions.push(Action::Step { from, to: step });
                        } else if is_piece(&state.board, step) {
                            // A jump over one occupied intervening square.
                            let jump = from.offset(2 * dx, 2 * dy);
                            if state.board.is_empty_at(jump) {
                                actions.push(Action::Step { from, to: jump });
                            }
                        }
                    }
                }
                if actions.is_empty() {
                    // Forfeiting the turn is legal exactly when stuck.
                    actions.push(Action::Pass);
                }
                actions
            }
            Phase::Completed | Phase::Invalid => Vec::new(),
        }
    }

    fn apply(&self, state: &mut Session, side: Side, action: &Action) {
        match action {
            Action::Place(pos) => {
                state.board.set(*pos, Occupant::piece(side));
                state.add_units(side, 1);
                eliminate_about(state, *pos);
            }
            Action::Step { from, to } => {
                state.board.set(*from, Occupant::Empty);
                state.board.set(*to, Occupant::piece(side));
                eliminate_about(state, *to);
            }
            Action::Pass => {}
            _ => unreachable!("action validated against legal_actions"),
        }
    }

    fn advance(&self, state: &mut Session) {
        if state.phase == Phase::Opening && state.turns == PLACEMENT_TURNS {
            state.phase = Phase::Main;
        }
        if state.phase == Phase::Main {
            if state.turns == SHRINK_AT[0] {
                shrink(state, 0);
            } else if state.turns == SHRINK_AT[1] {
                shrink(state, 1);
            }
        }
    }

    fn terminal(&self, state: &Session) -> Option<Outcome> {
        // Piece counts are only decisive once the placement stage is done.
        if state.phase != Phase::Main {
            return None;
        }
        let white = state.score(Side::White);
        let black = state.score(Side::Black);
        if white >= MIN_PIECES && black >= MIN_PIECES {
            None
        } else if white < MIN_PIECES && black < MIN_PIECES {
            Some(Outcome::Draw(
                "both sides reduced below two pieces".to_string(),
            ))
        } else if white < MIN_PIECES {
            Some(Outcome::Winner(Side::Black))
        } else {
            Some(Outcome::Winner(Side::White))
        }
    }

    fn repetition_threshold(&self) -> u32 {
        4
    }

    fn turn_limit(&self) -> u32 {
        512
    }
}

fn corner_positions(ring: i8) -> [Pos; 4] {
    let near = ring;
    let far = SIZE - 1 - ring;
    [
        Pos::new(near, near),
        Pos::new(far, near),
        Pos::new(near, far),
        Pos::new(far, far),
    ]
}

/// White places in the bottom six rows, black in the top six.
fn in_placement_zone(side: Side, pos: Pos) -> bool {
    match side {
        Side::White => pos.y <= 5,
        Side::Black => pos.y >= 2,
    }
}

fn is_piece(board: &Board, pos: Pos) -> bool {
    matches!(board.get(pos), Some(Occupant::Piece { .. }))
}

/// An occupant that can capture a piece of `side`: an enemy piece or a block.
fn threatens(occupant: Option<Occupant>, side: Side) -> bool {
    match occupant {
        Some(Occupant::Piece { side: other, .. }) => other != side,
        Some(Occupant::Block) => true,
        _ => false,
    }
}

/// True iff the piece at `pos` is sandwiched along the `(dx, dy)` axis.
fn surrounded(board: &Board, pos: Pos, dx: i8, dy: i8) -> bool {
    let side = match board.get(pos) {
        Some(Occupant::Piece { side, .. }) => side,
        _ => return false,
    };
    threatens(board.get(pos.offset(dx, dy)), side) && threatens(board.get(pos.offset(-dx, -dy)), side)
}

/// An occupant has just arrived at `square`: capture any adjacent enemy it
/// now sandwiches, then check whether the arriving piece is itself captured.
fn eliminate_about(state: &mut Session, square: Pos) {
    let arriver = match state.board.get(square) {
        Some(occ @ (Occupant::Piece { .. } | Occupant::Block)) => occ,
        _ => return,
    };

    for (dx, dy) in Pos::ORTHOGONAL {
        let target = square.offset(dx, dy);
        if let Some(Occupant::Piece { side, .. }) = state.board.get(target) {
            let is_enemy = match arriver {
                Occupant::Piece { side: own, .. } => side != own,
                Occupant::Block => true,
                Occupant::Empty => false,
            };
            if is_enemy && surrounded(&state.board, target, dx, dy) {
                state.board.set(target, Occupant::Empty);
                state.remove_units(side, 1);
            }
        }
    }

    if let Some(Occupant::Piece { side, .. }) = state.board.get(square) {
        if surrounded(&state.board, square, 1, 0) || surrounded(&state.board, square, 0, 1) {
            state.board.set(square, Occupant::Empty);
            state.remove_units(side, 1);
        }
    }
}

/// Removes the outermost remaining ring, then blocks the new corners,
/// capturing about each of them.
fn shrink(state: &mut Session, ring: i8) {
    let near = ring;
    let far = SIZE - 1 - ring;
    for i in near..=far {
        for pos in [
            Pos::new(i, near),
            Pos::new(near, i),
            Pos::new(i, far),
            Pos::new(far, i),
        ] {
            if let Some(Occupant::Piece { side, count }) = state.board.remove_position(pos) {
                state.remove_units(side, count as u32);
            }
        }
    }

    for corner in corner_positions(ring + 1) {
        if let Some(Occupant::Piece { side, count }) = state.board.get(corner) {
            state.remove_units(side, count as u32);
        }
        state.board.set(corner, Occupant::Block);
        eliminate_about(state, corner);
    }
}
