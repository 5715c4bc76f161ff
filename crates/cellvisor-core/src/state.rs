//! Dispatch loop state.

use serde::{Deserialize, Serialize};

/// State of the shared dispatch loop.
///
/// Moves strictly forward: Idle -> Running -> Interrupted -> Stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum LoopState {
    /// Not started.
    Idle = 0,
    /// Scanning and draining unassociated queues.
    Running = 1,
    /// Interrupt flag observed, loop is exiting.
    Interrupted = 2,
    /// Loop has exited.
    Stopped = 3,
}

impl From<u8> for LoopState {
    fn from(v: u8) -> Self {
        match v {
            0 => LoopState::Idle,
            1 => LoopState::Running,
            2 => LoopState::Interrupted,
            3 => LoopState::Stopped,
            _ => LoopState::Idle,
        }
    }
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopState::Idle => write!(f, "idle"),
            LoopState::Running => write!(f, "running"),
            LoopState::Interrupted => write!(f, "interrupted"),
            LoopState::Stopped => write!(f, "stopped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_u8() {
        assert_eq!(LoopState::from(0), LoopState::Idle);
        assert_eq!(LoopState::from(1), LoopState::Running);
        assert_eq!(LoopState::from(2), LoopState::Interrupted);
        assert_eq!(LoopState::from(3), LoopState::Stopped);
        assert_eq!(LoopState::from(99), LoopState::Idle);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(LoopState::Running.to_string(), "running");
        assert_eq!(LoopState::Interrupted.to_string(), "interrupted");
    }
}
