//! The line-oriented wire protocol: typed messages, their single-line text
//! encoding, and parsing with strict field validation.
//!
//! One message per line, head word first, fields separated by single spaces:
//!
//! ```text
//! PLAY <name> <channel>
//! OKAY
//! GAME <side> <name> [<side> <name> ...]
//! INIT <side>
//! TURN <n>
//! ACTN <action>
//! UPDATE <side> <action>
//! OVER <result...>
//! ERROR <side> <reason...>
//! ```
//!
//! Actions use the grammar `PLACE x y`, `MOVE xa ya xb yb`,
//! `STACK n xa ya xb yb`, `BOOM x y` or `PASS`. The codec knows the action
//! vocabulary but nothing about which actions any rule set permits.

use std::fmt;

use crate::board::{Pos, Side};

/// A structurally invalid message: unknown head, wrong field count, or a
/// field that fails type coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolError {
    pub reason: String,
}

impl ProtocolError {
    fn new(reason: impl Into<String>) -> ProtocolError {
        ProtocolError {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "protocol error: {}", self.reason)
    }
}

impl std::error::Error for ProtocolError {}

/// An action descriptor as it appears on the wire. Which of these are
/// meaningful, and when, is decided by the rule set in play.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    /// Put a new piece on an empty square.
    Place(Pos),
    /// Move one piece, either a simple step or a jump.
    Step { from: Pos, to: Pos },
    /// Move `count` units off a stack in a straight line.
    Shift { count: u8, from: Pos, to: Pos },
    /// Detonate the stack at a square.
    Detonate(Pos),
    Pass,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Place(pos) => write!(f, "PLACE {} {}", pos.x, pos.y),
            Action::Step { from, to } => {
                write!(f, "MOVE {} {} {} {}", from.x, from.y, to.x, to.y)
            }
            Action::Shift { count, from, to } => {
                write!(f, "STACK {} {} {} {} {}", count, from.x, from.y, to.x, to.y)
            }
            Action::Detonate(pos) => write!(f, "BOOM {} {}", pos.x, pos.y),
            Action::Pass => write!(f, "PASS"),
        }
    }
}

impl Action {
    /// Parses an action from its wire fields (head word included).
    pub fn parse(fields: &[&str]) -> Result<Action, ProtocolError> {
        match fields {
            ["PLACE", x, y] => Ok(Action::Place(parse_pos(x, y)?)),
            ["MOVE", xa, ya, xb, yb] => Ok(Action::Step {
                from: parse_pos(xa, ya)?,
                to: parse_pos(xb, yb)?,
            }),
            ["STACK", n, xa, ya, xb, yb] => Ok(Action::Shift {
                count: parse_int(n, "stack count")?,
                from: parse_pos(xa, ya)?,
                to: parse_pos(xb, yb)?,
            }),
            ["BOOM", x, y] => Ok(Action::Detonate(parse_pos(x, y)?)),
            ["PASS"] => Ok(Action::Pass),
            [] => Err(ProtocolError::new("missing action descriptor")),
            _ => Err(ProtocolError::new(format!(
                "malformed action descriptor: {}",
                fields.join(" ")
            ))),
        }
    }
}

/// The message kind tag, used to state which kinds a receiver will accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Play,
    Okay,
    Game,
    Init,
    Turn,
    Actn,
    Update,
    Over,
    Error,
}

/// A typed protocol message. Immutable once constructed; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Play { name: String, channel: String },
    Okay,
    Game { roster: Vec<(Side, String)> },
    Init { side: Side },
    Turn { turn: u32 },
    Actn { action: Action },
    Update { side: Side, action: Action },
    Over { result: String },
    Error { side: Side, reason: String },
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Play { .. } => MessageKind::Play,
            Message::Okay => MessageKind::Okay,
            Message::Game { .. } => MessageKind::Game,
            Message::Init { .. } => MessageKind::Init,
            Message::Turn { .. } => MessageKind::Turn,
            Message::Actn { .. } => MessageKind::Actn,
            Message::Update { .. } => MessageKind::Update,
            Message::Over { .. } => MessageKind::Over,
            Message::Error { .. } => MessageKind::Error,
        }
    }

    /// Encodes the message as one line, without the trailing newline.
    pub fn encode(&self) -> String {
        match self {
            Message::Play { name, channel } => format!("PLAY {} {}", name, channel),
            Message::Okay => "OKAY".to_string(),
            Message::Game { roster } => {
                let mut line = "GAME".to_string();
                for (side, name) in roster {
                    line.push(' ');
                    line.push_str(side.as_str());
                    line.push(' ');
                    line.push_str(name);
                }
                line
            }
            Message::Init { side } => format!("INIT {}", side),
            Message::Turn { turn } => format!("TURN {}", turn),
            Message::Actn { action } => format!("ACTN {}", action),
            Message::Update { side, action } => format!("UPDATE {} {}", side, action),
            Message::Over { result } => format!("OVER {}", result),
            Message::Error { side, reason } => format!("ERROR {} {}", side, reason),
        }
    }

    /// Parses one stripped line into a typed message.
    pub fn parse(line: &str) -> Result<Message, ProtocolError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let (head, rest) = match fields.split_first() {
            Some((head, rest)) => (*head, rest),
            None => return Err(ProtocolError::new("empty message")),
        };
        match head {
            "PLAY" => match rest {
                // An absent channel means the open channel, as a convenience
                // for hand-typed clients.
                [name] => Ok(Message::Play {
                    name: name.to_string(),
                    channel: String::new(),
                }),
                [name, channel] => Ok(Message::Play {
                    name: name.to_string(),
                    channel: channel.to_string(),
                }),
                _ => Err(ProtocolError::new("PLAY expects a name and a channel")),
            },
            "OKAY" => match rest {
                [] => Ok(Message::Okay),
                _ => Err(ProtocolError::new("OKAY carries no fields")),
            },
            "GAME" => {
                if rest.is_empty() || rest.len() % 2 != 0 {
                    return Err(ProtocolError::new("GAME expects side/name pairs"));
                }
                let mut roster = Vec::with_capacity(rest.len() / 2);
                for pair in rest.chunks(2) {
                    roster.push((parse_side(pair[0])?, pair[1].to_string()));
                }
                Ok(Message::Game { roster })
            }
            "INIT" => match rest {
                [side] => Ok(Message::Init {
                    side: parse_side(side)?,
                }),
                _ => Err(ProtocolError::new("INIT expects exactly one side")),
            },
            "TURN" => match rest {
                [turn] => Ok(Message::Turn {
                    turn: parse_int(turn, "turn index")?,
                }),
                _ => Err(ProtocolError::new("TURN expects exactly one turn index")),
            },
            "ACTN" => Ok(Message::Actn {
                action: Action::parse(rest)?,
            }),
            "UPDATE" => match rest.split_first() {
                Some((side, action)) => Ok(Message::Update {
                    side: parse_side(side)?,
                    action: Action::parse(action)?,
                }),
                None => Err(ProtocolError::new("UPDATE expects a side and an action")),
            },
            "OVER" => match rest {
                [] => Err(ProtocolError::new("OVER expects a result string")),
                _ => Ok(Message::Over {
                    result: rest.join(" "),
                }),
            },
            "ERROR" => match rest.split_first() {
                Some((side, reason)) if !reason.is_empty() => Ok(Message::Error {
                    side: parse_side(side)?,
                    reason: reason.join(" "),
                }),
                _ => Err(ProtocolError::new("ERROR expects a side and a reason")),
            },
            other => Err(ProtocolError::new(format!("unknown message head {:?}", other))),
        }
    }
}

fn parse_side(field: &str) -> Result<Side, ProtocolError> {
    Side::from_name(field)
        .ok_or_else(|| ProtocolError::new(format!("unknown side {:?}", field)))
}

fn parse_int<T: std::str::FromStr>(field: &str, what: &str) -> Result<T, ProtocolError> {
    field
        .parse()
        .map_err(|_| ProtocolError::new(format!("non-integer {}: {:?}", what, field)))
}

fn parse_pos(x: &str, y: &str) -> Result<Pos, ProtocolError> {
    Ok(Pos::new(
        parse_int(x, "coordinate")?,
        parse_int(y, "coordinate")?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(message: Message) {
        let line = message.encode();
        assert_eq!(Message::parse(&line), Ok(message), "line was {:?}", line);
    }

    #[test]
    fn test_message_round_trips() {
        round_trip(Message::Play {
            name: "crusher".to_string(),
            channel: "practice".to_string(),
        });
        round_trip(Message::Okay);
        round_trip(Message::Game {
            roster: vec![
                (Side::White, "alice".to_string()),
                (Side::Black, "bob".to_string()),
            ],
        });
        round_trip(Message::Init { side: Side::Black });
        round_trip(Message::Turn { turn: 42 });
        round_trip(Message::Actn {
            action: Action::Shift {
                count: 3,
                from: Pos::new(1, 2),
                to: Pos::new(1, 5),
            },
        });
        round_trip(Message::Update {
            side: Side::White,
            action: Action::Detonate(Pos::new(4, 4)),
        });
        round_trip(Message::Over {
            result: "winner: white".to_string(),
        });
        round_trip(Message::Error {
            side: Side::Black,
            reason: "opponent disconnected".to_string(),
        });
    }

    #[test]
    fn test_play_without_channel_defaults_to_open() {
        let message = Message::parse("PLAY solo").unwrap();
        assert_eq!(
            message,
            Message::Play {
                name: "solo".to_string(),
                channel: String::new(),
            }
        );
    }

    #[test]
    fn test_unknown_head_is_rejected() {
        assert!(Message::parse("HELLO world").is_err());
        assert!(Message::parse("").is_err());
    }

    #[test]
    fn test_non_integer_coordinate_is_rejected() {
        let err = Message::parse("ACTN PLACE one 2").unwrap_err();
        assert!(err.reason.contains("non-integer"));
        assert!(Message::parse("TURN soon").is_err());
        assert!(Message::parse("ACTN STACK x 0 0 0 1").is_err());
    }

    #[test]
    fn test_wrong_field_counts_are_rejected() {
        assert!(Message::parse("OKAY fine").is_err());
        assert!(Message::parse("INIT").is_err());
        assert!(Message::parse("INIT white black").is_err());
        assert!(Message::parse("GAME white").is_err());
        assert!(Message::parse("ACTN MOVE 1 2 3").is_err());
        assert!(Message::parse("ERROR white").is_err());
        assert!(Message::parse("OVER").is_err());
    }

    #[test]
    fn test_unknown_side_is_rejected() {
        assert!(Message::parse("INIT magenta").is_err());
        assert!(Message::parse("UPDATE pink PASS").is_err());
    }

    #[test]
    fn test_result_strings_keep_internal_spaces() {
        let message = Message::parse("OVER draw detected: maximum number of turns reached");
        assert_eq!(
            message,
            Ok(Message::Over {
                result: "draw detected: maximum number of turns reached".to_string(),
            })
        );
    }

    #[test]
    fn test_negative_coordinates_parse() {
        // Off-board coordinates are structurally fine; rule sets reject them.
        let message = Message::parse("ACTN BOOM -1 3").unwrap();
        assert_eq!(message, Message::Actn { action: Action::Detonate(Pos::new(-1, 3)) });
    }
}
