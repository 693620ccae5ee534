//! Per-session coordination: agent handles and the control loop that drives
//! one formed cohort's game from roster announcement to conclusion.
//!
//! A session owns its cohort exclusively. All communication with cohort
//! members flows through [`Agent`], which hides whether a member is a remote
//! connection or a server-controlled built-in policy, so the coordinator and
//! the matchmaking pool never special-case either kind.

use std::path::PathBuf;
use std::time::Duration;

use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand::thread_rng;

use shared::game::{Game, GameLog, IllegalAction};
use shared::net::{Connection, NetError};
use shared::policy::Policy;
use shared::protocol::{Action, Message, MessageKind};
use shared::rules::RuleSet;
use shared::Side;

/// One cohort member: a remote agent behind a connection, or a built-in
/// policy synthesized by the server.
pub enum Agent {
    Remote {
        conn: Connection,
        name: String,
    },
    Builtin {
        policy: Box<dyn Policy>,
        name: String,
    },
}

impl Agent {
    pub fn remote(conn: Connection, name: impl Into<String>) -> Agent {
        Agent::Remote {
            conn,
            name: name.into(),
        }
    }

    pub fn builtin(policy: Box<dyn Policy>, name: impl Into<String>) -> Agent {
        Agent::Builtin {
            policy,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Agent::Remote { name, .. } => name,
            Agent::Builtin { name, .. } => name,
        }
    }

    /// Liveness probe: a bounded OKAY round trip. Built-ins are always
    /// alive.
    pub async fn ping(&mut self, timeout: Duration) -> Result<(), NetError> {
        match self {
            Agent::Remote { conn, .. } => {
                conn.send(&Message::Okay).await?;
                conn.recv_timeout(&[MessageKind::Okay], timeout).await?;
                Ok(())
            }
            Agent::Builtin { .. } => Ok(()),
        }
    }

    async fn announce(&mut self, roster: &[(Side, String)]) -> Result<(), NetError> {
        match self {
            Agent::Remote { conn, .. } => {
                conn.send(&Message::Game {
                    roster: roster.to_vec(),
                })
                .await
            }
            Agent::Builtin { .. } => Ok(()),
        }
    }

    async fn init(&mut self, side: Side) -> Result<(), NetError> {
        match self {
            Agent::Remote { conn, .. } => {
                conn.send(&Message::Init { side }).await?;
                conn.recv(&[MessageKind::Okay]).await?;
                Ok(())
            }
            Agent::Builtin { .. } => Ok(()),
        }
    }

    async fn request_action(
        &mut self,
        game: &Game,
        side: Side,
        timeout: Option<Duration>,
    ) -> Result<Action, NetError> {
        match self {
            Agent::Remote { conn, .. } => {
                conn.send(&Message::Turn {
                    turn: game.state().turns,
                })
                .await?;
                let message = match timeout {
                    Some(timeout) => conn.recv_timeout(&[MessageKind::Actn], timeout).await?,
                    None => conn.recv(&[MessageKind::Actn]).await?,
                };
                match message {
                    Message::Actn { action } => Ok(action),
                    _ => Err(NetError::Violation("expected an ACTN message".to_string())),
                }
            }
            Agent::Builtin { policy, .. } => {
                let legal = game.legal_actions(side);
                Ok(policy.choose(game.rules(), game.state(), side, &legal))
            }
        }
    }

    async fn update(&mut self, side: Side, action: &Action) -> Result<(), NetError> {
        match self {
            Agent::Remote { conn, .. } => {
                conn.send(&Message::Update {
                    side,
                    action: action.clone(),
                })
                .await?;
                conn.recv(&[MessageKind::Okay]).await?;
                Ok(())
            }
            // Built-ins re-derive everything they need from the
            // authoritative state when asked to act.
            Agent::Builtin { .. } => Ok(()),
        }
    }

    async fn game_over(&mut self, result: &str) -> Result<(), NetError> {
        match self {
            Agent::Remote { conn, .. } => {
                conn.send(&Message::Over {
                    result: result.to_string(),
                })
                .await
            }
            Agent::Builtin { .. } => Ok(()),
        }
    }

    /// Best-effort error notice; a peer that is itself gone is skipped.
    async fn report_error(&mut self, offender: Side, reason: &str) {
        if let Agent::Remote { conn, .. } = self {
            let _ = conn
                .send(&Message::Error {
                    side: offender,
                    reason: reason.to_string(),
                })
                .await;
        }
    }

    pub async fn disconnect(&mut self) {
        if let Agent::Remote { conn, .. } = self {
            conn.shutdown().await;
        }
    }
}

/// Session-scoped knobs, fixed when the cohort is formed.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Where to write the structured game log; `None` disables logging.
    pub log_path: Option<PathBuf>,
    /// Bound on how long one agent may take over a single action.
    pub action_timeout: Option<Duration>,
    /// Pause between turns, for human-watchable local matches.
    pub turn_delay: Option<Duration>,
}

/// How a session ended, for callers that need an exit status.
#[derive(Debug)]
pub enum SessionEnd {
    /// Clean win or draw; carries the result string.
    Finished(String),
    /// An illegal action by the named side invalidated the game.
    Invalidated(Side),
    /// A peer disconnected or broke protocol.
    Aborted(String),
    /// An external agent supervisor reported a compute or memory budget
    /// overrun. Propagated only; nothing in the coordinator produces it.
    ResourceLimit(String),
}

struct Member {
    side: Side,
    agent: Agent,
}

enum Failure {
    Net { member: usize, error: NetError },
    Illegal(IllegalAction),
}

/// Drives one cohort's game to completion.
pub struct SessionCoordinator {
    members: Vec<Member>,
    game: Game,
    config: SessionConfig,
}

impl SessionCoordinator {
    /// Assigns sides by uniformly random permutation and opens the game log.
    /// The cohort size must match the rule set's side count; the pool is
    /// constructed to guarantee it.
    pub fn new(mut cohort: Vec<Agent>, rules: Box<dyn RuleSet>, config: SessionConfig) -> SessionCoordinator {
        let sides = rules.sides();
        assert_eq!(
            cohort.len(),
            sides.len(),
            "cohort size must match the rule set's side count"
        );
        cohort.shuffle(&mut thread_rng());
        let members: Vec<Member> = sides
            .iter()
            .zip(cohort)
            .map(|(side, agent)| Member { side: *side, agent })
            .collect();

        let log = config.log_path.as_ref().and_then(|path| {
            match GameLog::create(path) {
                Ok(log) => Some(log),
                Err(err) => {
                    warn!("cannot open game log {}: {}", path.display(), err);
                    None
                }
            }
        });
        let game = Game::new(rules, log);
        SessionCoordinator {
            members,
            game,
            config,
        }
    }

    /// Runs the game. Whatever happens, every member is notified of the
    /// ending, every remaining connection is shut down, and the game log is
    /// closed before this returns.
    pub async fn run(mut self) -> SessionEnd {
        let roster = self
            .members
            .iter()
            .map(|m| format!("{} ({})", m.agent.name(), m.side))
            .collect::<Vec<_>>()
            .join(" vs ");
        info!("session start: {}", roster);

        let end = match self.play().await {
            Ok(result) => {
                info!("game over: {}", result);
                for member in &mut self.members {
                    if let Err(err) = member.agent.game_over(&result).await {
                        debug!("could not deliver result to {}: {}", member.agent.name(), err);
                    }
                }
                SessionEnd::Finished(result)
            }
            Err(Failure::Illegal(illegal)) => {
                warn!("{}", illegal);
                for member in &mut self.members {
                    member.agent.report_error(illegal.side, "illegal action").await;
                }
                SessionEnd::Invalidated(illegal.side)
            }
            Err(Failure::Net { member, error }) => {
                let offender = self.members[member].side;
                let reason = match error {
                    NetError::Disconnected => "opponent disconnected",
                    NetError::Violation(_) => "opponent broke protocol",
                };
                warn!(
                    "{} ({}) dropped from session: {}",
                    self.members[member].agent.name(),
                    offender,
                    error
                );
                for (index, other) in self.members.iter_mut().enumerate() {
                    if index != member {
                        other.agent.report_error(offender, reason).await;
                    }
                }
                SessionEnd::Aborted(reason.to_string())
            }
        };

        self.game.finish();
        for member in &mut self.members {
            member.agent.disconnect().await;
        }
        info!("session closed");
        end
    }

    async fn play(&mut self) -> Result<String, Failure> {
        let roster: Vec<(Side, String)> = self
            .members
            .iter()
            .map(|m| (m.side, m.agent.name().to_string()))
            .collect();
        for index in 0..self.members.len() {
            self.members[index]
                .agent
                .announce(&roster)
                .await
                .map_err(|error| Failure::Net { member: index, error })?;
        }
        for index in 0..self.members.len() {
            let side = self.members[index].side;
            self.members[index]
                .agent
                .init(side)
                .await
                .map_err(|error| Failure::Net { member: index, error })?;
        }

        while !self.game.over() {
            if let Some(delay) = self.config.turn_delay {
                tokio::time::sleep(delay).await;
            }
            let side = self.game.side_to_move();
            let index = self
                .members
                .iter()
                .position(|m| m.side == side)
                .expect("every side belongs to a member");
            let action = self.members[index]
                .agent
                .request_action(&self.game, side, self.config.action_timeout)
                .await
                .map_err(|error| Failure::Net { member: index, error })?;
            debug!("turn {}: {} plays {}", self.game.state().turns, side, action);

            self.game.apply(side, &action).map_err(Failure::Illegal)?;

            for index in 0..self.members.len() {
                self.members[index]
                    .agent
                    .update(side, &action)
                    .await
                    .map_err(|error| Failure::Net { member: index, error })?;
            }
        }

        Ok(self
            .game
            .finish()
            .expect("the loop only exits on a recorded outcome"))
    }
}
