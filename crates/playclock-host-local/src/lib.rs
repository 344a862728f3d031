//! Local collaborators for playclockd
//!
//! Provides:
//! - `TokioTimers`: one-shot timers on the tokio runtime, fires delivered
//!   over a channel
//! - `BanAction`: records a ban until the end of the window
//! - `CommandAction`: runs a configured external command

mod actions;
mod timers;

pub use actions::*;
pub use timers::*;
