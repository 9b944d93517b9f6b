//! Error taxonomy shared by the bridge core and the service façade.
//!
//! None of these are recovered locally; every error propagates to the RPC
//! boundary unchanged and becomes a caller-visible failure. Retry policy, if
//! any, belongs to the remote caller.

use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or contradictory caller-supplied arguments, detected before
    /// any platform operation is invoked.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Operation attempted from a session state that forbids it.
    #[error("Invalid session state: {0}")]
    State(String),

    /// No event arrived within the bound. The in-flight platform operation is
    /// not cancelled; the caller may re-wait on the same correlation id.
    #[error("Timed out waiting ({timeout_ms} ms) for event '{name}' on callback id '{correlation_id}'")]
    Timeout {
        correlation_id: String,
        name: String,
        timeout_ms: u64,
    },

    /// The native operation reported failure through its callback.
    #[error("Platform action failed with reason {reason}: {message}")]
    PlatformAction { reason: i32, message: String },

    /// An event arrived whose shape does not match the outcome contract.
    /// Should-not-happen path; signals an adapter or bridge bug.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Immediate failure from the native stack.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
