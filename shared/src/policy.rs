//! Built-in automated players.
//!
//! Policies pick one action from the legal set the engine enumerated; they
//! never see the wire. The server uses them to synthesize opponents on
//! special matchmaking channels, the referee binary plays them against each
//! other, and the client can drive one over the network.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::board::{Session, Side};
use crate::protocol::Action;
use crate::rules::RuleSet;

pub trait Policy: Send {
    /// Picks one of `legal` for `side`. `state` and `rules` allow lookahead
    /// by simulating on a cloned session.
    fn choose(
        &mut self,
        rules: &dyn RuleSet,
        state: &Session,
        side: Side,
        legal: &[Action],
    ) -> Action;
}

/// Picks uniformly at random from the legal set.
pub struct RandomPolicy {
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new() -> RandomPolicy {
        RandomPolicy {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> RandomPolicy {
        RandomPolicy {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl Policy for RandomPolicy {
    fn choose(
        &mut self,
        _rules: &dyn RuleSet,
        _state: &Session,
        _side: Side,
        legal: &[Action],
    ) -> Action {
        legal.choose(&mut self.rng).cloned().unwrap_or(Action::Pass)
    }
}

/// One-ply material greed: simulates every legal action on a cloned session
/// and keeps whichever leaves the best own-minus-opponent unit balance,
/// breaking ties randomly.
pub struct GreedyPolicy {
    rng: StdRng,
}

impl GreedyPolicy {
    pub fn new() -> GreedyPolicy {
        GreedyPolicy {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> GreedyPolicy {
        GreedyPolicy {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for GreedyPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl Policy for GreedyPolicy {
    fn choose(
        &mut self,
        rules: &dyn RuleSet,
        state: &Session,
        side: Side,
        legal: &[Action],
    ) -> Action {
        let mut candidates: Vec<&Action> = legal.iter().collect();
        candidates.shuffle(&mut self.rng);
        candidates
            .into_iter()
            .max_by_key(|action| {
                let mut sim = state.speculative();
                rules.apply(&mut sim, side, action);
                sim.score(side) as i64 - sim.score(side.opponent()) as i64
            })
            .cloned()
            .unwrap_or(Action::Pass)
    }
}

/// Looks up a built-in policy by name.
pub fn policy_by_name(name: &str) -> Option<Box<dyn Policy>> {
    match name {
        "random" => Some(Box::new(RandomPolicy::new())),
        "greedy" => Some(Box::new(GreedyPolicy::new())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, Occupant, Phase, Pos};
    use crate::rules::ruleset_by_name;

    #[test]
    fn test_policy_lookup() {
        assert!(policy_by_name("random").is_some());
        assert!(policy_by_name("greedy").is_some());
        assert!(policy_by_name("perfect").is_none());
    }

    #[test]
    fn test_random_policy_picks_a_legal_action() {
        let rules = ruleset_by_name("blast").unwrap();
        let state = rules.initial();
        let legal = rules.legal_actions(&state, Side::White);
        let mut policy = RandomPolicy::seeded(7);
        for _ in 0..20 {
            let action = policy.choose(rules.as_ref(), &state, Side::White, &legal);
            assert!(legal.contains(&action));
        }
    }

    #[test]
    fn test_random_policy_with_no_actions_passes() {
        let rules = ruleset_by_name("blast").unwrap();
        let state = rules.initial();
        let mut policy = RandomPolicy::seeded(7);
        let action = policy.choose(rules.as_ref(), &state, Side::White, &[]);
        assert_eq!(action, Action::Pass);
    }

    #[test]
    fn test_greedy_policy_prefers_a_winning_trade() {
        let rules = ruleset_by_name("blast").unwrap();
        // One white unit sits next to a black three-stack; a second white
        // stack is far away. Detonating trades one for three.
        let mut board = Board::rect(8, 8);
        board.set(Pos::new(0, 0), Occupant::piece(Side::White));
        board.set(Pos::new(1, 1), Occupant::Piece { side: Side::Black, count: 3 });
        board.set(Pos::new(7, 7), Occupant::Piece { side: Side::White, count: 5 });
        let state = Session::new(board, Phase::Main, 6, 3);

        let legal = rules.legal_actions(&state, Side::White);
        let mut policy = GreedyPolicy::seeded(11);
        for _ in 0..5 {
            let action = policy.choose(rules.as_ref(), &state, Side::White, &legal);
            assert_eq!(action, Action::Detonate(Pos::new(0, 0)));
        }
    }
}
