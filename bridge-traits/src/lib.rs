//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each Wi-Fi Direct
//! host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the bridge core and the native
//! Wi-Fi Direct stack. The native stack is callback-based: every operation
//! returns immediately and reports its eventual outcome by invoking a
//! listener object from a platform dispatch thread. The core converts those
//! listener invocations into queued, pollable events (see `core-events`); the
//! traits here only describe the native surface.
//!
//! ## Traits
//!
//! ### Operations
//! - [`WifiDirectStack`](p2p::WifiDirectStack) - The full native operation
//!   set: channel lifecycle, peer discovery, connection and group management,
//!   local services and service discovery requests.
//!
//! ### Callback interfaces
//! - [`ActionListener`](p2p::ActionListener) - Uniform success/failure shape
//!   shared by most operations.
//! - [`DeviceInfoListener`](p2p::DeviceInfoListener),
//!   [`PeerListListener`](p2p::PeerListListener),
//!   [`PersistentGroupInfoListener`](p2p::PersistentGroupInfoListener) -
//!   Data-bearing one-shot callbacks.
//! - [`UpnpServiceResponseListener`](p2p::UpnpServiceResponseListener),
//!   [`DnsSdServiceResponseListener`](p2p::DnsSdServiceResponseListener),
//!   [`DnsSdTxtRecordListener`](p2p::DnsSdTxtRecordListener) - Discovery
//!   listeners that may fire many times, once per responding device.
//! - [`BroadcastListener`](p2p::BroadcastListener) - Ambient state
//!   transitions delivered for the lifetime of a channel.
//!
//! ## Thread Safety
//!
//! All callback traits require `Send + Sync`: the platform may invoke them
//! from any number of concurrent dispatch threads, and implementations must
//! tolerate that. A listener must never block the dispatch thread for long;
//! posting to an event queue is the expected amount of work.
//!
//! ## Error Handling
//!
//! `WifiDirectStack` methods return [`BridgeError`](error::BridgeError) only
//! for immediate failures (channel already closed, stack unavailable).
//! Asynchronous failures always arrive through the listener, carrying a
//! platform reason code.

pub mod error;
pub mod p2p;

pub use error::BridgeError;

// Re-export commonly used types
pub use p2p::{
    ActionListener, BroadcastListener, ChannelHandle, ConnectRequest, ConnectionChange,
    DeviceInfoListener, DnsSdServiceResponseListener, DnsSdTxtRecordListener, LocalService,
    P2pDevice, P2pGroup, P2pInfo, PeerListListener, PeerStatus, PersistentGroupInfoListener,
    ServiceRequest, UpnpServiceResponseListener, WifiDirectStack,
};
