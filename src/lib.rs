//! RoomSync - multiplayer presence synchronization
//!
//! A bounded WebSocket relay plus the client-side session layer that keeps
//! per-scene membership tables converged across peers:
//! - The relay admits up to a configured number of connections and fans
//!   presence events out with per-message routing rules
//! - Sessions own the local participant, react to relay events, and drive
//!   scene hand-offs through an explicit transition state machine
//! - Scene membership records are simulated locally for the participant a
//!   session controls and dead-reckoned from snapshots for everyone else

pub mod application;
pub mod domain;
pub mod infrastructure;
