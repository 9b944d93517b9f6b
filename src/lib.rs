//! Workspace placeholder crate.
//!
//! This crate exists so host applications can depend on
//! `wifi-bridge-workspace` and pull in the service façade without wiring each
//! workspace crate individually. The actual functionality lives in
//! `core-service` (operation façade), `core-events` (the callback-to-poll
//! event bridge) and `bridge-traits` (the platform contract).

pub use core_service;
