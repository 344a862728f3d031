//! Timer handle abstraction

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle to an armed one-shot timer
///
/// Handed out by a `TimerService` at arm time and delivered back to the
/// control loop when the timer fires. Handles are compared by value, so a
/// fire carrying a handle that is no longer the armed one can be recognised
/// as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_compare_by_value() {
        assert_eq!(TimerHandle::new(3), TimerHandle::new(3));
        assert_ne!(TimerHandle::new(3), TimerHandle::new(4));
        assert_eq!(TimerHandle::new(12).to_string(), "timer#12");
    }

    #[test]
    fn handle_serialization() {
        let json = serde_json::to_string(&TimerHandle::new(9)).unwrap();
        assert_eq!(json, "9");
    }
}
