//! Infrastructure layer - wire protocol, relay server, client transport

pub mod client;
pub mod config;
pub mod protocol;
pub mod relay;
pub mod state;

pub use client::{RelayClient, RelaySender};
pub use config::RelayConfig;
pub use protocol::{ClientMessage, ServerMessage};
pub use relay::{AdmissionError, RelayHub};
pub use state::AppState;
