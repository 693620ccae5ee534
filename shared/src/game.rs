//! The authoritative game-state engine.
//!
//! `Game` owns one session's state and drives it through a rule set:
//! membership-based legality checking, deterministic application, phase
//! advancement, and terminal detection with an explicit precedence — the
//! rule set's win/elimination test first, then the repetition draw, then the
//! turn-limit draw. An illegal action permanently invalidates the session
//! with the offender losing.
//!
//! Each successful or rejected action optionally appends one JSON record to
//! an append-only session log whose lifecycle is tied to the game: opened at
//! construction, closed exactly once when the game ends or is invalidated.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::warn;
use serde::Serialize;

use crate::board::{Phase, Session, Side};
use crate::protocol::Action;
use crate::rules::{Outcome, RuleSet};

/// A rejected action. Carries the full legal set for diagnostics; callers
/// must not forward that set to opponents.
#[derive(Debug)]
pub struct IllegalAction {
    /// The offending (and thereby losing) side.
    pub side: Side,
    pub reason: String,
    pub legal: Vec<Action>,
}

impl fmt::Display for IllegalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal action by {}: {}", self.side, self.reason)
    }
}

impl std::error::Error for IllegalAction {}

#[derive(Serialize)]
struct LogRecord<'a> {
    turn: u32,
    side: &'a str,
    action: String,
    accepted: bool,
    white_units: u32,
    black_units: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

/// Append-only structured session log: one JSON object per line.
pub struct GameLog {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl GameLog {
    pub fn create(path: &Path) -> std::io::Result<GameLog> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        Ok(GameLog {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
        })
    }

    fn write_line(&mut self, value: &impl Serialize) {
        match serde_json::to_string(value) {
            Ok(line) => {
                if writeln!(self.writer, "{}", line).and_then(|_| self.writer.flush()).is_err() {
                    warn!("failed to write session log {}", self.path.display());
                }
            }
            Err(err) => warn!("failed to serialize log record: {}", err),
        }
    }

    fn record(&mut self, record: &LogRecord<'_>) {
        self.write_line(record);
    }

    fn result(&mut self, result: &str) {
        self.write_line(&serde_json::json!({ "result": result }));
    }
}

/// One session's source of truth.
pub struct Game {
    rules: Box<dyn RuleSet>,
    state: Session,
    outcome: Option<Outcome>,
    log: Option<GameLog>,
}

impl Game {
    /// Builds a fresh game. The log, if any, stays attached until the game
    /// finishes and is closed exactly once.
    pub fn new(rules: Box<dyn RuleSet>, log: Option<GameLog>) -> Game {
        let state = rules.initial();
        Game {
            rules,
            state,
            outcome: None,
            log,
        }
    }

    pub fn rules(&self) -> &dyn RuleSet {
        self.rules.as_ref()
    }

    pub fn state(&self) -> &Session {
        &self.state
    }

    pub fn side_to_move(&self) -> Side {
        self.rules.side_to_move(&self.state)
    }

    pub fn legal_actions(&self, side: Side) -> Vec<Action> {
        if self.state.phase.is_terminal() {
            return Vec::new();
        }
        self.rules.legal_actions(&self.state, side)
    }

    /// True once a win, draw or invalidation has been recorded. Repeated
    /// calls without an intervening `apply` always agree.
    pub fn over(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn result_string(&self) -> Option<String> {
        self.outcome.as_ref().map(Outcome::result_string)
    }

    /// Validates and applies one action for `side`.
    ///
    /// The candidate must be a member of the rule set's enumerated legal set
    /// for the acting side. On rejection the session transitions to the
    /// absorbing `Invalid` phase, the opponent is recorded as the winner,
    /// and the error reports the legal set for diagnostics. Every later
    /// `apply` on an ended game is also rejected, without disturbing the
    /// recorded outcome.
    pub fn apply(&mut self, side: Side, action: &Action) -> Result<(), IllegalAction> {
        if self.state.phase.is_terminal() {
            return Err(IllegalAction {
                side,
                reason: "the game is already over".to_string(),
                legal: Vec::new(),
            });
        }

        let to_move = self.rules.side_to_move(&self.state);
        let legal = if side == to_move {
            self.rules.legal_actions(&self.state, side)
        } else {
            Vec::new()
        };
        if !legal.contains(action) {
            let reason = if side != to_move {
                format!("it is not {}'s turn", side)
            } else {
                format!("{} player's action, {}, is not available in the current position", side, action)
            };
            self.log_action(side, action, false, Some(format!("{} legal actions were available", legal.len())));
            self.close_log();
            self.state.phase = Phase::Invalid;
            self.outcome = Some(Outcome::Winner(side.opponent()));
            return Err(IllegalAction {
                side,
                reason,
                legal,
            });
        }

        self.rules.apply(&mut self.state, side, action);
        self.state.turns += 1;
        self.rules.advance(&mut self.state);
        let occurrences = self.state.record_snapshot();
        self.log_action(side, action, true, None);

        let outcome = if let Some(outcome) = self.rules.terminal(&self.state) {
            Some(outcome)
        } else if occurrences >= self.rules.repetition_threshold() {
            Some(Outcome::Draw(format!(
                "same game state occurred {} times",
                occurrences
            )))
        } else if self.state.turns >= self.rules.turn_limit() {
            Some(Outcome::Draw("maximum number of turns reached".to_string()))
        } else {
            None
        };
        if let Some(outcome) = outcome {
            self.state.phase = Phase::Completed;
            if let Some(log) = self.log.as_mut() {
                log.result(&outcome.result_string());
            }
            self.close_log();
            self.outcome = Some(outcome);
        }
        Ok(())
    }

    /// Extracts the result string and releases the log if it is still open.
    /// Safe to call on every exit path; only the first call closes the log.
    pub fn finish(&mut self) -> Option<String> {
        self.close_log();
        self.result_string()
    }

    fn log_action(&mut self, side: Side, action: &Action, accepted: bool, note: Option<String>) {
        if let Some(log) = self.log.as_mut() {
            log.record(&LogRecord {
                turn: self.state.turns,
                side: side.as_str(),
                action: action.to_string(),
                accepted,
                white_units: self.state.score(Side::White),
                black_units: self.state.score(Side::Black),
                note,
            });
        }
    }

    fn close_log(&mut self) {
        self.log = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Pos;
    use crate::rules::ruleset_by_name;

    fn blast_game() -> Game {
        Game::new(ruleset_by_name("blast").unwrap(), None)
    }

    fn first_legal(game: &Game) -> Action {
        let side = game.side_to_move();
        game.legal_actions(side)
            .into_iter()
            .next()
            .expect("live game must offer actions")
    }

    #[test]
    fn test_legal_actions_are_applied() {
        let mut game = blast_game();
        let action = Action::Shift {
            count: 1,
            from: Pos::new(0, 1),
            to: Pos::new(0, 2),
        };
        assert!(game.apply(Side::White, &action).is_ok());
        assert_eq!(game.state().turns, 1);
        assert_eq!(game.side_to_move(), Side::Black);
        assert!(!game.over());
    }

    #[test]
    fn test_illegal_action_invalidates_permanently() {
        let mut game = blast_game();
        // A move far beyond the stack's height.
        let bogus = Action::Shift {
            count: 1,
            from: Pos::new(0, 0),
            to: Pos::new(0, 5),
        };
        let err = game.apply(Side::White, &bogus).unwrap_err();
        assert_eq!(err.side, Side::White);
        assert!(!err.legal.is_empty(), "diagnostics carry the legal set");
        assert_eq!(game.state().phase, Phase::Invalid);
        assert_eq!(game.outcome(), Some(&Outcome::Winner(Side::Black)));

        // Absorbing: even a well-formed action is now rejected, and the
        // recorded outcome does not change.
        let fine = Action::Shift {
            count: 1,
            from: Pos::new(0, 1),
            to: Pos::new(0, 2),
        };
        assert!(game.apply(Side::White, &fine).is_err());
        assert!(game.apply(Side::Black, &fine).is_err());
        assert_eq!(game.outcome(), Some(&Outcome::Winner(Side::Black)));
    }

    #[test]
    fn test_acting_out_of_turn_is_illegal() {
        let mut game = blast_game();
        let action = Action::Detonate(Pos::new(0, 6));
        let err = game.apply(Side::Black, &action).unwrap_err();
        assert_eq!(err.side, Side::Black);
        assert!(err.legal.is_empty());
        assert_eq!(game.outcome(), Some(&Outcome::Winner(Side::White)));
    }

    #[test]
    fn test_terminal_test_is_idempotent() {
        let mut game = blast_game();
        while !game.over() {
            let side = game.side_to_move();
            let action = first_legal(&game);
            game.apply(side, &action).unwrap();
        }
        let first = game.result_string();
        assert_eq!(game.result_string(), first);
        assert!(game.over());
        assert_eq!(game.result_string(), first);
    }

    #[test]
    fn test_repetition_draw_at_threshold() {
        let mut game = blast_game();
        // A four-ply cycle: each side merges two home stacks and splits them
        // back apart, returning to the starting position with equal parity.
        let cycle = [
            (Side::White, Action::Shift { count: 1, from: Pos::new(0, 0), to: Pos::new(0, 1) }),
            (Side::Black, Action::Shift { count: 1, from: Pos::new(0, 7), to: Pos::new(0, 6) }),
            (Side::White, Action::Shift { count: 1, from: Pos::new(0, 1), to: Pos::new(0, 0) }),
            (Side::Black, Action::Shift { count: 1, from: Pos::new(0, 6), to: Pos::new(0, 7) }),
        ];
        // The starting position counts as the first occurrence, so three full
        // cycles reach the threshold of four.
        for _ in 0..3 {
            for (side, action) in &cycle {
                assert!(!game.over());
                game.apply(*side, action).unwrap();
            }
        }
        assert!(game.over());
        assert_eq!(
            game.result_string().unwrap(),
            "draw detected: same game state occurred 4 times"
        );
        assert_eq!(game.state().phase, Phase::Completed);
    }

    /// A stub rule set for exercising the engine's draw machinery in
    /// isolation: every turn is a pass, nothing on the board changes.
    struct Stub {
        wins_after_first_turn: bool,
        turn_limit: u32,
        repetition_threshold: u32,
    }

    impl RuleSet for Stub {
        fn name(&self) -> &'static str {
            "stub"
        }
        fn sides(&self) -> &'static [Side] {
            &[Side::White, Side::Black]
        }
        fn initial(&self) -> Session {
            use crate::board::{Board, Occupant};
            let mut board = Board::rect(2, 2);
            board.set(Pos::new(0, 0), Occupant::piece(Side::White));
            Session::new(board, Phase::Main, 1, 0)
        }
        fn legal_actions(&self, _state: &Session, _side: Side) -> Vec<Action> {
            vec![Action::Pass]
        }
        fn apply(&self, _state: &mut Session, _side: Side, _action: &Action) {}
        fn advance(&self, _state: &mut Session) {}
        fn terminal(&self, state: &Session) -> Option<Outcome> {
            if self.wins_after_first_turn && state.turns > 0 {
                Some(Outcome::Winner(Side::White))
            } else {
                None
            }
        }
        fn repetition_threshold(&self) -> u32 {
            self.repetition_threshold
        }
        fn turn_limit(&self) -> u32 {
            self.turn_limit
        }
    }

    #[test]
    fn test_win_takes_precedence_over_draw() {
        // The first pass both wins (per the rule set) and trips a repetition
        // threshold of one; the win must be the reported outcome.
        let stub = Stub {
            wins_after_first_turn: true,
            turn_limit: 100,
            repetition_threshold: 1,
        };
        let mut game = Game::new(Box::new(stub), None);
        game.apply(Side::White, &Action::Pass).unwrap();
        assert_eq!(game.result_string().unwrap(), "winner: white");
    }

    #[test]
    fn test_turn_limit_draw() {
        let stub = Stub {
            wins_after_first_turn: false,
            turn_limit: 3,
            repetition_threshold: 100,
        };
        let mut game = Game::new(Box::new(stub), None);
        game.apply(Side::White, &Action::Pass).unwrap();
        game.apply(Side::Black, &Action::Pass).unwrap();
        assert!(!game.over());
        game.apply(Side::White, &Action::Pass).unwrap();
        assert_eq!(
            game.result_string().unwrap(),
            "draw detected: maximum number of turns reached"
        );
    }

    #[test]
    fn test_session_log_records_actions() {
        let dir = std::env::temp_dir().join("gridarena-log-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("game-{}.jsonl", std::process::id()));
        let log = GameLog::create(&path).unwrap();
        let mut game = Game::new(ruleset_by_name("blast").unwrap(), Some(log));
        let action = Action::Shift {
            count: 1,
            from: Pos::new(0, 1),
            to: Pos::new(0, 2),
        };
        game.apply(Side::White, &action).unwrap();
        let _ = game.apply(Side::Black, &Action::Detonate(Pos::new(4, 4)));
        game.finish();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"accepted\":true"));
        assert!(lines[1].contains("\"accepted\":false"));
        std::fs::remove_file(&path).ok();
    }
}
