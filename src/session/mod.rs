//! Refinement session: the pure state machine and the actor that drives it.

mod controller;
mod state;

pub use controller::{ControllerSettings, SessionHandle, Submission};
pub use state::{CycleId, RemoteCall, Session, SessionEffect, SessionEvent, SessionPhase};
