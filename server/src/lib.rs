//! # Match-making referee server
//!
//! The server side of the arbitration system: it listens for agent
//! connections, groups agents requesting the same matchmaking channel into
//! cohorts, and referees each cohort's game to completion against the
//! authoritative engine in the `shared` crate.
//!
//! ## Module Organization
//!
//! ### Acceptor Module (`acceptor`)
//! The accept loop and per-connection workers: the PLAY handshake, pool
//! submission, and session startup for the worker that completes a cohort.
//!
//! ### Pool Module (`pool`)
//! The shared matchmaking state: per-channel waiting lists behind one lock,
//! liveness purging of stale entries, and special channels that synthesize
//! built-in opponents.
//!
//! ### Session Module (`session`)
//! Agent handles (remote connections and built-in policies behind one
//! interface) and the coordinator that drives a game: side assignment,
//! roster announcement, the turn/update loop, and failure containment.
//!
//! ## Concurrency Model
//!
//! One tokio task per inbound connection. The pool's waiting lists are the
//! only state shared across tasks, serialized by a single async mutex held
//! for the whole purge-and-match unit. Once a cohort forms it is owned
//! exclusively by the coordinating worker, so sessions run without any
//! locking. Errors never escape a session: a misbehaving or vanished peer
//! ends that session only, with every remaining member notified first.

pub mod acceptor;
pub mod pool;
pub mod session;
