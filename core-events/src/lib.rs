//! # Callback-to-Poll Event Bridge
//!
//! Converts the native stack's callback interfaces into named, queued events
//! that a remote caller can poll by correlation id.
//!
//! ## Overview
//!
//! The bridge consists of:
//! - **Event model**: [`CallbackEvent`](event::CallbackEvent), an immutable
//!   record of correlation id, event name and an ordered field mapping.
//! - **Registry**: [`EventRegistry`](registry::EventRegistry), a shared map
//!   from `(correlation id, event name)` to a FIFO queue, safe under
//!   concurrent post and blocking consume.
//! - **Adapters**: one per native callback interface, each translating a
//!   callback invocation into exactly one posted event.
//! - **Wait protocol**: [`wait_for_event`](wait::wait_for_event) and
//!   [`verify_succeeded`](wait::verify_succeeded), the blocking
//!   read-with-timeout entry points the RPC boundary builds on.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐  on_success /   ┌───────────────────┐
//! │ platform dispatch│  on_failure     │ ActionEventAdapter│
//! │ thread           ├────────────────>│ (bound to id, name├──┐
//! └──────────────────┘                 └───────────────────┘  │ post
//!                                                             ▼
//! ┌──────────────────┐  on_upnp_...    ┌───────────────────┐ ┌─────────────┐
//! │ discovery thread ├────────────────>│ UpnpResponseAdapter├>│EventRegistry│
//! └──────────────────┘  (filtered)     └───────────────────┘ │ (id, name) →│
//!                                                            │  FIFO queue │
//! ┌──────────────────┐       poll(id, name, timeout)         └──────┬──────┘
//! │ caller task      │<──────────────────────────────────────────────┘
//! └──────────────────┘
//! ```
//!
//! ## Concurrency contract
//!
//! Multiple OS threads may post concurrently; posting never blocks and never
//! drops an event. Polling is bounded by a timeout and wakes immediately on a
//! concurrent post to the same key. FIFO order holds per key; no ordering is
//! implied across keys. Correlation ids must not be reused for two in-flight
//! operations; an event posted after a timed-out wait stays queued and will
//! be handed to the next poller of the same key.

pub mod adapter;
pub mod error;
pub mod event;
pub mod outcome;
pub mod registry;
pub mod wait;

pub use adapter::{
    ActionEventAdapter, BroadcastAdapter, DeviceInfoAdapter, DnsSdResponseAdapter,
    DnsSdTxtRecordAdapter, PeerListAdapter, PersistentGroupAdapter, UpnpResponseAdapter,
};
pub use error::{Error, Result};
pub use event::{fields, CallbackEvent, FieldMap, QueueKey};
pub use outcome::{reason_message, Outcome, ACTION_LISTENER_EVENT};
pub use registry::EventRegistry;
pub use wait::{verify_succeeded, wait_for_event, DEFAULT_TIMEOUT_MS};
