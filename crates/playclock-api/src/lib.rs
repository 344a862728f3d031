//! Protocol types for playclockd IPC
//!
//! This crate defines the stable API between playclockd and clients:
//! - Commands (activity reports and queries from clients)
//! - Responses
//! - Events (service -> clients)
//! - Versioning

mod commands;
mod events;
mod types;

pub use commands::*;
pub use events::*;
pub use types::*;

/// Current API version
pub const API_VERSION: u32 = 1;
