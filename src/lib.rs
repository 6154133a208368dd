//! A concurrent in-memory key/value store, served one line-oriented command
//! at a time over TCP.
//!
//! [`Server`] is the entry point: it owns the index, the pause gate and the
//! live-client registry behind one `Arc`, so a binary (or a test) can spin
//! one up, hand it to [`listener::spawn`] and [`signal::SignalReactor`],
//! drive its [`operator`] loop, and tear it down again.

pub mod command;
pub mod error;
mod index;
pub mod listener;
pub mod operator;
mod pause;
mod registry;
pub mod server;
pub mod session;
pub mod signal;
pub mod transport;

pub use error::{Error, Result};
pub use index::{Index, Inserted, Removed};
pub use server::Server;
