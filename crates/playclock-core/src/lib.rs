//! Online time tracking engine for playclockd
//!
//! This crate is the heart of playclockd, containing:
//! - Per-user time accumulation (idle / active sessions)
//! - Daily window boundaries in a configured zone
//! - An indexed priority set of active users, ordered by nearest deadline
//! - The deadline scheduler, which keeps a single timer armed for the user
//!   who will run out of time first

mod active_set;
mod events;
mod scheduler;
mod tracker;
mod window;

pub use active_set::*;
pub use events::*;
pub use scheduler::*;
pub use tracker::TimeTracker;
pub use window::*;
