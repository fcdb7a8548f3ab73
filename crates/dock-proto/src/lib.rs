//! Shared protocol crate for the StreamDock console: wire types, the REST
//! client core, configuration and platform paths.

pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod format;
pub mod notify;
pub mod platform;
pub mod protocol;
pub mod retry;
pub mod transport;

pub use client::{ApiClient, Connectivity};
pub use error::ApiError;
pub use notify::{Notifier, Severity};
