//! The "blast" variant: stacks of units on an 8x8 board. A stack may move
//! some of its units up to its height in a straight line, or detonate,
//! removing itself and — through a chain over the 3x3 neighbourhood — every
//! transitively adjacent stack of either side.

use crate::board::{Board, Occupant, Phase, Pos, Session, Side};
use crate::protocol::Action;
use crate::rules::{Outcome, RuleSet};

const SIZE: i8 = 8;

const UNITS_PER_SIDE: u32 = 12;

/// Starting columns; each side fills them on its two home rows.
const START_COLUMNS: [i8; 6] = [0, 1, 3, 4, 6, 7];

pub struct Blast;

impl RuleSet for Blast {
    fn name(&self) -> &'static str {
        "blast"
    }

    fn sides(&self) -> &'static [Side] {
        &[Side::White, Side::Black]
    }

    fn initial(&self) -> Session {
        let mut board = Board::rect(SIZE, SIZE);
        for &x in &START_COLUMNS {
            for y in [0, 1] {
                board.set(Pos::new(x, y), Occupant::piece(Side::White));
            }
            for y in [6, 7] {
                board.set(Pos::new(x, y), Occupant::piece(Side::Black));
            }
        }
        Session::new(board, Phase::Main, UNITS_PER_SIDE, UNITS_PER_SIDE)
    }

    fn legal_actions(&self, state: &Session, side: Side) -> Vec<Action> {
        if state.phase != Phase::Main {
            return Vec::new();
        }
        let mut actions = Vec::new();
        for (from, height) in state.board.pieces(side) {
            actions.push(Action::Detonate(from));
            for (dx, dy) in Pos::ORTHOGONAL {
                for distance in 1..=height as i8 {
                    let to = from.offset(dx * distance, dy * distance);
                    if landable(&state.board, to, side) {
                        for count in 1..=height {
                            actions.push(Action::Shift { count, from, to });
                        }
                    }
                }
            }
        }
        actions
    }

    fn apply(&self, state: &mut Session, _side: Side, action: &Action) {
        match action {
            Action::Shift { count, from, to } => {
                let (side, height) = match state.board.get(*from) {
                    Some(Occupant::Piece { side, count }) => (side, count),
                    _ => unreachable!("action validated against legal_actions"),
                };
                let remaining = height - count;
                if remaining == 0 {
                    state.board.set(*from, Occupant::Empty);
                } else {
                    state
                        .board
                        .set(*from, Occupant::Piece { side, count: remaining });
                }
                let landed = match state.board.get(*to) {
                    Some(Occupant::Piece { count: existing, .. }) => existing + count,
                    _ => *count,
                };
                state.board.set(*to, Occupant::Piece { side, count: landed });
            }
            Action::Detonate(at) => detonate(state, *at),
            _ => unreachable!("action validated against legal_actions"),
        }
    }

    fn advance(&self, _state: &mut Session) {}

    fn terminal(&self, state: &Session) -> Option<Outcome> {
        let white = state.score(Side::White);
        let black = state.score(Side::Black);
        if white == 0 && black == 0 {
            Some(Outcome::Draw("no units remaining".to_string()))
        } else if white == 0 {
            Some(Outcome::Winner(Side::Black))
        } else if black == 0 {
            Some(Outcome::Winner(Side::White))
        } else {
            None
        }
    }

    fn repetition_threshold(&self) -> u32 {
        4
    }

    fn turn_limit(&self) -> u32 {
        500
    }
}

/// Stacks land on empty squares or merge with the mover's own stacks,
/// never onto the enemy.
fn landable(board: &Board, to: Pos, side: Side) -> bool {
    match board.get(to) {
        Some(Occupant::Empty) => true,
        Some(Occupant::Piece { side: other, .. }) => other == side,
        _ => false,
    }
}

/// Work-list fixed point over the 3x3 adjacency relation: detonating a stack
/// removes it and queues every neighbouring stack until nothing is left to
/// trigger.
fn detonate(state: &mut Session, start: Pos) {
    let mut queue = vec![start];
    while let Some(square) = queue.pop() {
        if let Some(Occupant::Piece { side, count }) = state.board.get(square) {
            state.remove_units(side, count as u32);
            state.board.set(square, Occupant::Empty);
            for (dx, dy) in Pos::SURROUNDING {
                let near = square.offset(dx, dy);
                if matches!(state.board.get(near), Some(Occupant::Piece { .. })) {
                    queue.push(near);
                }
            }
        }
    }
}
