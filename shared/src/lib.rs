//! Everything both endpoints of a game session agree on: the wire protocol
//! and its framed connection type, the board and session data model, the
//! pluggable rule sets, the authoritative game-state engine, and the
//! built-in automated policies.
//!
//! The server composes these into a match-making referee; the client uses
//! the same engine as a local replica so both ends deterministically agree
//! on every position of a game.

pub mod board;
pub mod game;
pub mod net;
pub mod policy;
pub mod protocol;
pub mod rules;

pub use board::{Board, Occupant, Phase, Pos, Session, Side};
pub use game::{Game, GameLog, IllegalAction};
pub use net::{Connection, NetError};
pub use policy::{policy_by_name, GreedyPolicy, Policy, RandomPolicy};
pub use protocol::{Action, Message, MessageKind, ProtocolError};
pub use rules::{ruleset_by_name, Outcome, RuleSet};
