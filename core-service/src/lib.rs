//! # Wi-Fi Direct Control Service
//!
//! The operation surface exposed to the remote-control transport. This crate
//! ties the pieces together:
//!
//! - [`session`] - The channel lifecycle state machine
//!   (uninitialized → initialized → closed).
//! - [`service`] - The operation facade: one method per remotely invokable
//!   operation, binding callback adapters from `core-events` to the native
//!   stack from `bridge-traits`.
//! - [`config`] - Caller-supplied JSON configuration decoding and validation.
//! - [`socket`] - A small TCP bridge for data-path checks over a formed
//!   group, reporting through the shared event registry.
//! - [`logging`] - `tracing-subscriber` bootstrap.
//!
//! ## Architecture
//!
//! ```text
//!  transport ──► P2pService ──► WifiDirectStack (platform / sim)
//!                   │                  │ callbacks on dispatch threads
//!                   │                  ▼
//!                   │            outcome adapters
//!                   │                  │ post
//!                   ▼                  ▼
//!               wait/verify ◄──  EventRegistry
//! ```

pub mod config;
pub mod logging;
pub mod service;
pub mod session;
pub mod socket;

pub use config::{ConnectConfig, LocalServiceConfig, ServiceRequestConfig};
pub use logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
pub use service::P2pService;
pub use session::P2pSession;
pub use socket::{SocketBridge, SOCKET_CONNECTION_EVENT};

pub use core_events::{Error, Result};
