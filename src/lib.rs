//! modemsync: port registry reconciliation for a modem control server
//!
//! This crate keeps a local, persistent registry of modem ports in step with
//! a remote control server. The server answers one-shot requests (scan,
//! disconnect, modem info) and pushes incremental updates over long-lived
//! event streams (connect, monitor).
//!
//! # Consistency Model
//!
//! Updates are applied in arrival order, last write wins. A consumer that has
//! been stopped or superseded can never touch the registry again: every
//! update carries the generation of the run that produced it and stale
//! generations are dropped under the session lock.
//!
//! # Architecture
//!
//! - **Stream**: Incremental `data:` frame parser over chunked bodies
//! - **Registry**: Ordered port records with merge/remove semantics
//! - **Persist**: Key/value state store for the registry and display prefs
//! - **Transport**: HTTP backend for the control server
//! - **Sources**: Scan, connect and monitor consumers
//! - **Controller**: Connect/disconnect orchestration
//! - **Telemetry**: Session events and the activity log

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod cli;
pub mod cli_handler;
pub mod config;
pub mod controller;
pub mod persist;
pub mod registry;
pub mod session;
pub mod sources;
pub mod stream;
pub mod telemetry;
pub mod transport;
