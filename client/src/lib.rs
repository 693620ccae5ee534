//! # Game Client Library
//!
//! The client side of the arbitration system: it connects a decision-making
//! policy to a remote referee server and plays one game over the
//! line-oriented protocol.
//!
//! The client deliberately owns no game rules of its own. It constructs the
//! same deterministic engine the server uses as a local replica, feeds every
//! broadcast update into it, and lets the chosen policy pick from the
//! replica's legal-action set. If the replica ever rejects a server update
//! the client reports a desync rather than guessing.

pub mod network;
