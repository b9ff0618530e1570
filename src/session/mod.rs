//! Voice session control
//!
//! This module provides the `SessionController` that owns:
//! - Channel membership and the connection state machine
//! - Exponential reconnect backoff
//! - Roster reconciliation against the relay
//! - The local microphone pipeline and remote playback
//!
//! Callers talk to it through a cloneable `SessionControllerHandle`.

mod backoff;
mod channel;
mod config;
mod controller;
mod handle;
mod identity;
mod messages;
mod status;

pub use backoff::Backoff;
pub use channel::{channel_name, validate_channel};
pub use config::SessionConfig;
pub use controller::{SessionController, SessionDeps};
pub use handle::SessionControllerHandle;
pub use identity::{generated_identity, FixedIdentity, IdentityPrompt, NoPrompt};
pub use messages::ControllerMessage;
pub use status::{ConnectionState, SessionStatus};
