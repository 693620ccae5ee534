//! The matchmaking pool: per-channel waiting lists shared by every
//! connection worker.
//!
//! The pool is the only state shared across workers. One async mutex
//! serializes the whole purge-then-match-or-deposit unit, so no worker ever
//! observes a half-filtered channel, no agent can land in two cohorts, and
//! the lock is released on every exit path by guard drop. The liveness
//! probe runs while the lock is held — that is the point: a stale entry must
//! be gone before anyone can be matched against it.

use std::collections::HashMap;
use std::time::Duration;

use log::{debug, info};
use tokio::sync::Mutex;

use crate::session::Agent;

/// Builds one server-controlled opponent for a special channel.
pub type OpponentFactory = Box<dyn Fn() -> Agent + Send + Sync>;

/// Default bound on the liveness round trip during a purge.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// A collection of per-channel waiting lists with concurrent access control.
///
/// Stale entries are only purged when somebody submits to their channel; a
/// forgotten channel can therefore hold dead connections until then.
pub struct MatchmakingPool {
    waiting: Mutex<HashMap<String, Vec<Agent>>>,
    special: HashMap<String, OpponentFactory>,
    cohort_size: usize,
    probe_timeout: Duration,
}

impl MatchmakingPool {
    /// Creates a pool forming cohorts of exactly `cohort_size` agents.
    pub fn new(cohort_size: usize) -> MatchmakingPool {
        assert!(cohort_size >= 1, "a cohort needs at least one agent");
        MatchmakingPool {
            waiting: Mutex::new(HashMap::new()),
            special: HashMap::new(),
            cohort_size,
            probe_timeout: PROBE_TIMEOUT,
        }
    }

    pub fn cohort_size(&self) -> usize {
        self.cohort_size
    }

    /// Registers a channel whose cohorts are completed with server-built
    /// opponents instead of waiting for peers.
    pub fn register_special(&mut self, channel: impl Into<String>, factory: OpponentFactory) {
        self.special.insert(channel.into(), factory);
    }

    pub fn set_probe_timeout(&mut self, timeout: Duration) {
        self.probe_timeout = timeout;
    }

    /// Submits `agent` for matchmaking on `channel`.
    ///
    /// Returns a full cohort (including `agent`) if one can be formed, or
    /// `None` after depositing the agent to wait for a later submission.
    /// Waiting entries that fail the liveness probe are closed and dropped
    /// without involving the caller.
    pub async fn submit(&self, channel: &str, agent: Agent) -> Option<Vec<Agent>> {
        if let Some(factory) = self.special.get(channel) {
            info!(
                "channel {:?} is special: completing {}'s cohort with built-in opponents",
                channel,
                agent.name()
            );
            let mut cohort = vec![agent];
            while cohort.len() < self.cohort_size {
                cohort.push(factory());
            }
            return Some(cohort);
        }

        let mut waiting = self.waiting.lock().await;
        let entries = waiting.remove(channel).unwrap_or_default();
        debug!(
            "channel {:?}: {} waiting before purge",
            channel,
            entries.len()
        );

        let mut alive = Vec::with_capacity(entries.len() + 1);
        for mut candidate in entries {
            match candidate.ping(self.probe_timeout).await {
                Ok(()) => alive.push(candidate),
                Err(err) => {
                    info!(
                        "dropping stale agent {} from channel {:?}: {}",
                        candidate.name(),
                        channel,
                        err
                    );
                    candidate.disconnect().await;
                }
            }
        }

        alive.push(agent);
        if alive.len() >= self.cohort_size {
            // Deposits only happen below the cohort size, so this is the
            // exact cohort; the channel entry stays removed.
            debug!("channel {:?}: cohort formed", channel);
            Some(alive)
        } else {
            debug!(
                "channel {:?}: {} waiting, need {}",
                channel,
                alive.len(),
                self.cohort_size
            );
            waiting.insert(channel.to_string(), alive);
            None
        }
    }

    /// How many agents are currently waiting on `channel`.
    pub async fn waiting_count(&self, channel: &str) -> usize {
        self.waiting
            .lock()
            .await
            .get(channel)
            .map_or(0, Vec::len)
    }
}
