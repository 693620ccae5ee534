//! Inbound connection handling: accept, handshake, matchmaking, and — for
//! the worker whose submission completes a cohort — running the session.
//!
//! The accept loop never blocks beyond taking the next connection; every
//! accepted stream gets its own spawned worker task, and nothing a worker
//! does (handshake failures, session errors, a misbehaving peer) can take
//! the server process down with it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, error, info};
use tokio::net::{TcpListener, TcpStream};

use shared::net::Connection;
use shared::protocol::{Message, MessageKind};
use shared::rules::ruleset_by_name;

use crate::pool::MatchmakingPool;
use crate::session::{Agent, SessionConfig, SessionCoordinator};

/// A client has this long to open with PLAY before the worker gives up.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// Server-wide state shared by all connection workers.
pub struct ServerContext {
    pub pool: MatchmakingPool,
    /// Rule-set name for every session this server referees.
    pub game: String,
    /// Directory for per-session game logs; `None` disables logging.
    pub log_dir: Option<PathBuf>,
    /// Bound on how long an agent may take over one action.
    pub action_timeout: Option<Duration>,
}

/// Accepts connections forever, spawning one worker per client.
pub async fn serve(listener: TcpListener, context: Arc<ServerContext>) -> std::io::Result<()> {
    info!("listening on {}", listener.local_addr()?);
    loop {
        let (stream, addr) = listener.accept().await?;
        info!("new client connected: {}", addr);
        let context = Arc::clone(&context);
        tokio::spawn(async move {
            handle_connection(stream, context).await;
        });
    }
}

/// One client's worker: PLAY handshake, then matchmaking; if this submission
/// completes a cohort, this worker coordinates the whole session.
async fn handle_connection(stream: TcpStream, context: Arc<ServerContext>) {
    let mut conn = Connection::new(stream);
    let peer = conn.peer();

    let (name, channel) = match conn
        .recv_timeout(&[MessageKind::Play], HANDSHAKE_TIMEOUT)
        .await
    {
        Ok(Message::Play { name, channel }) => (name, channel),
        Ok(_) | Err(_) => {
            debug!("handshake with {} failed, closing", peer);
            conn.shutdown().await;
            return;
        }
    };
    if conn.send(&Message::Okay).await.is_err() {
        debug!("{} vanished during handshake", peer);
        conn.shutdown().await;
        return;
    }
    info!("{} requests a game as {:?} on channel {:?}", peer, name, channel);

    let agent = Agent::remote(conn, name);
    match context.pool.submit(&channel, agent).await {
        None => {
            // Another worker will pick this agent up when the channel fills;
            // this task is done.
            debug!("not enough players on channel {:?}, agent left waiting", channel);
        }
        Some(cohort) => run_session(cohort, &context).await,
    }
}

async fn run_session(cohort: Vec<Agent>, context: &ServerContext) {
    let rules = match ruleset_by_name(&context.game) {
        Some(rules) => rules,
        None => {
            // The binary validates the name at startup; refuse rather than
            // crash if configuration and registry ever disagree.
            error!("unknown rule set {:?}, abandoning session", context.game);
            return;
        }
    };
    let log_path = context
        .log_dir
        .as_ref()
        .map(|dir| dir.join(session_log_name(&cohort)));
    let config = SessionConfig {
        log_path,
        action_timeout: context.action_timeout,
        turn_delay: None,
    };
    let end = SessionCoordinator::new(cohort, rules, config).run().await;
    debug!("session ended: {:?}", end);
}

fn session_log_name(cohort: &[Agent]) -> String {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs();
    let names = cohort
        .iter()
        .map(Agent::name)
        .collect::<Vec<_>>()
        .join("_vs_");
    format!("game_{}_{}.jsonl", stamp, names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::policy::RandomPolicy;

    #[test]
    fn test_session_log_name_includes_all_players() {
        let cohort = vec![
            Agent::builtin(Box::new(RandomPolicy::seeded(0)), "alice"),
            Agent::builtin(Box::new(RandomPolicy::seeded(0)), "bob"),
        ];
        let name = session_log_name(&cohort);
        assert!(name.starts_with("game_"));
        assert!(name.ends_with(".jsonl"));
        assert!(name.contains("alice_vs_bob"));
    }
}
