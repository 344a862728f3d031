//! Shared utilities for playclockd
//!
//! This crate provides:
//! - ID types (UserId, ClientId)
//! - Time utilities (mockable wall clock, time-of-day, duration formatting)
//! - The `Clock` abstraction consumed by the core engine
//! - Error types
//! - Default paths for socket, config, and data directories

mod clock;
mod error;
mod ids;
mod paths;
mod time;

pub use clock::*;
pub use error::*;
pub use ids::*;
pub use paths::*;
pub use time::*;
