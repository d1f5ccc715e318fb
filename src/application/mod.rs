//! Application layer - session orchestration and collaborator ports

pub mod ports;
pub mod session;
pub mod transition;

pub use session::{Session, SessionError};
pub use transition::{HandOff, TransitionController};
