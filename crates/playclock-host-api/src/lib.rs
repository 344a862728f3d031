//! Collaborator contracts for the playclock engine
//!
//! This crate defines the interface between the deadline scheduler and the
//! things it drives or is driven by: the one-shot timer facility, the
//! punishment applied when a user runs out of time, and the activity
//! notifications coming from the host platform. It contains no platform code
//! itself.

mod handle;
mod mock;
mod traits;

pub use handle::*;
pub use mock::*;
pub use traits::*;
