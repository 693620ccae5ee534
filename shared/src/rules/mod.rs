//! The pluggable rule-set interface and the built-in game variants.
//!
//! A rule set supplies everything game-specific — the starting position, the
//! turn rotation, the generative legal-action enumeration, the deterministic
//! transition function (cascading effects included), phase thresholds and the
//! terminal test — while the engine in [`crate::game`] supplies everything
//! game-independent: membership validation, the turn counter, repetition and
//! turn-limit draws, and logging. Variants are selected by name when a
//! session is constructed, never through inheritance.

pub mod blast;
pub mod siege;

use crate::board::{Session, Side};
use crate::protocol::Action;

/// How a finished game ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Winner(Side),
    Draw(String),
}

impl Outcome {
    /// The result string announced to every session member.
    pub fn result_string(&self) -> String {
        match self {
            Outcome::Winner(side) => format!("winner: {}", side),
            Outcome::Draw(reason) => format!("draw detected: {}", reason),
        }
    }
}

/// One game variant's rules. Legality and application are pure functions of
/// the session state plus one action; implementations must not consult
/// anything else.
pub trait RuleSet: Send + Sync {
    fn name(&self) -> &'static str;

    /// The sides of a full cohort, in initialisation order.
    fn sides(&self) -> &'static [Side];

    /// The starting session: board, phase and per-side unit counts.
    fn initial(&self) -> Session;

    /// Whose turn it is, by the variant's fixed rotation.
    fn side_to_move(&self, state: &Session) -> Side {
        let sides = self.sides();
        sides[state.turns as usize % sides.len()]
    }

    /// Every action `side` may currently take. This is the authoritative
    /// definition of legality: the engine accepts exactly the members of
    /// this set.
    fn legal_actions(&self, state: &Session, side: Side) -> Vec<Action>;

    /// Applies an action already known to be legal, running any cascading
    /// secondary effects to their fixed point.
    fn apply(&self, state: &mut Session, side: Side, action: &Action);

    /// Advances phase thresholds after a turn: opening/main transitions,
    /// scheduled board shrinks, and the like. Called once per applied
    /// action, after the turn counter has been incremented.
    fn advance(&self, state: &mut Session);

    /// Win or elimination-draw test. Repetition and turn-limit draws are the
    /// engine's job and must not be reported here.
    fn terminal(&self, state: &Session) -> Option<Outcome>;

    /// How many occurrences of one canonical snapshot force a draw.
    fn repetition_threshold(&self) -> u32;

    /// The total turn count at which the game is drawn.
    fn turn_limit(&self) -> u32;
}

/// Looks up a built-in rule set by its variant name.
pub fn ruleset_by_name(name: &str) -> Option<Box<dyn RuleSet>> {
    match name {
        "siege" => Some(Box::new(siege::Siege)),
        "blast" => Some(Box::new(blast::Blast)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ruleset_lookup() {
        assert_eq!(ruleset_by_name("siege").unwrap().name(), "siege");
        assert_eq!(ruleset_by_name("blast").unwrap().name(), "blast");
        assert!(ruleset_by_name("chess").is_none());
    }

    #[test]
    fn test_default_rotation_alternates_sides() {
        let rules = ruleset_by_name("blast").unwrap();
        let mut state = rules.initial();
        assert_eq!(rules.side_to_move(&state), Side::White);
        state.turns = 1;
        assert_eq!(rules.side_to_move(&state), Side::Black);
        state.turns = 2;
        assert_eq!(rules.side_to_move(&state), Side::White);
    }

    #[test]
    fn test_outcome_result_strings() {
        assert_eq!(
            Outcome::Winner(Side::Black).result_string(),
            "winner: black"
        );
        assert_eq!(
            Outcome::Draw("no units remaining".to_string()).result_string(),
            "draw detected: no units remaining"
        );
    }
}
