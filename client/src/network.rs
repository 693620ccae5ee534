//! Client-side protocol driver.
//!
//! `connect_and_play` walks the whole client half of the protocol: the PLAY
//! handshake, answering the server's liveness probes while waiting for a
//! match, side assignment, and then the TURN/UPDATE loop until the server
//! announces a result. The client keeps a local engine replica — the same
//! deterministic engine the server runs — so the policy always chooses from
//! the authoritative legal-action set.

use std::fmt;

use log::{debug, info};

use shared::game::Game;
use shared::net::{Connection, NetError};
use shared::policy::Policy;
use shared::protocol::{Message, MessageKind};
use shared::rules::ruleset_by_name;
use shared::Side;

#[derive(Debug)]
pub enum ClientError {
    /// Bad local configuration, e.g. an unknown game variant.
    Config(String),
    /// The transport failed or the server broke protocol.
    Net(NetError),
    /// The server reported an error ending the session (an opponent
    /// disconnected, broke protocol, or played an illegal action).
    Server { side: Side, reason: String },
    /// An UPDATE did not apply cleanly to the local replica, so this client
    /// and the server no longer agree on the position.
    Desync(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Config(reason) => write!(f, "configuration error: {}", reason),
            ClientError::Net(err) => write!(f, "{}", err),
            ClientError::Server { side, reason } => {
                write!(f, "server reported an error ({}): {}", side, reason)
            }
            ClientError::Desync(reason) => write!(f, "lost sync with the server: {}", reason),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<NetError> for ClientError {
    fn from(err: NetError) -> ClientError {
        ClientError::Net(err)
    }
}

/// Connects to a server and plays one full game with `policy` deciding every
/// action. Returns the server's result string.
pub async fn connect_and_play(
    mut policy: Box<dyn Policy>,
    name: &str,
    channel: &str,
    host: &str,
    port: u16,
    game_name: &str,
) -> Result<String, ClientError> {
    let rules = ruleset_by_name(game_name)
        .ok_or_else(|| ClientError::Config(format!("unknown game variant {:?}", game_name)))?;

    info!("connecting to {}:{}...", host, port);
    let mut conn = Connection::connect(host, port)
        .await
        .map_err(|_| ClientError::Net(NetError::Disconnected))?;

    conn.send(&Message::Play {
        name: name.to_string(),
        channel: channel.to_string(),
    })
    .await?;
    conn.recv(&[MessageKind::Okay]).await?;
    info!("game request submitted, waiting for opponents on channel {:?}...", channel);

    // While we wait in the pool the server may probe whether we are still
    // here; answer each OKAY until the match announcement arrives.
    let roster = loop {
        match conn.recv(&[MessageKind::Okay, MessageKind::Game]).await? {
            Message::Okay => conn.send(&Message::Okay).await?,
            Message::Game { roster } => break roster,
            _ => unreachable!("recv only returns expected kinds"),
        }
    };
    info!("opponents found!");
    for (side, player) in &roster {
        info!("  {} player: {}", side, player);
    }

    let side = match conn.recv(&[MessageKind::Init]).await? {
        Message::Init { side } => side,
        _ => unreachable!("recv only returns expected kinds"),
    };
    info!("playing as {}", side);
    let mut game = Game::new(rules, None);
    conn.send(&Message::Okay).await?;

    loop {
        let message = conn
            .recv(&[
                MessageKind::Turn,
                MessageKind::Update,
                MessageKind::Over,
                MessageKind::Error,
            ])
            .await?;
        match message {
            Message::Turn { turn } => {
                let legal = game.legal_actions(side);
                let action = policy.choose(game.rules(), game.state(), side, &legal);
                debug!("turn {}: playing {}", turn, action);
                conn.send(&Message::Actn { action }).await?;
            }
            Message::Update { side: actor, action } => {
                game.apply(actor, &action)
                    .map_err(|err| ClientError::Desync(err.to_string()))?;
                conn.send(&Message::Okay).await?;
            }
            Message::Over { result } => {
                info!("game over: {}", result);
                return Ok(result);
            }
            Message::Error { side, reason } => {
                return Err(ClientError::Server { side, reason });
            }
            _ => unreachable!("recv only returns expected kinds"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::policy::RandomPolicy;

    #[test]
    fn test_unknown_variant_is_a_config_error() {
        let result = tokio_test::block_on(connect_and_play(
            Box::new(RandomPolicy::seeded(0)),
            "tester",
            "",
            "127.0.0.1",
            1,
            "tic-tac-toe",
        ));
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_a_net_error() {
        // Port 1 on localhost should refuse the connection immediately.
        let result = connect_and_play(
            Box::new(RandomPolicy::seeded(0)),
            "tester",
            "",
            "127.0.0.1",
            1,
            "blast",
        )
        .await;
        assert!(matches!(result, Err(ClientError::Net(_))));
    }
}
