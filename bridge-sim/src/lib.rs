//! Simulated Wi-Fi Direct Stack
//!
//! An in-process [`WifiDirectStack`] implementation with scriptable behavior,
//! used by the integration tests and as the reference host adapter. Every
//! callback is dispatched from a freshly spawned OS thread, matching how the
//! real platform invokes listeners from its own dispatch threads rather than
//! from the caller's stack.
//!
//! Behavior is scripted up front through [`SimBehavior`]: which operations
//! fail and with what reason code, what the local device looks like, and
//! which peers and persistent groups the platform reports. Service-discovery
//! responses and ambient broadcasts are injected explicitly through the
//! `deliver_*` / `fire_*` test hooks.

pub mod stack;

pub use stack::{SimBehavior, SimOp, SimStack};
