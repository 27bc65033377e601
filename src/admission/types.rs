/*!
 * Admission Types
 * Circuit breaker states, attempt records, and statistics
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum BreakerState {
    /// Normal operation; admissions flow
    Closed = 0,
    /// Bulk admission halted
    Open = 1,
    /// Probing recovery with rate-limited trial admissions
    HalfOpen = 2,
}

impl BreakerState {
    #[inline]
    pub(crate) const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Closed,
            1 => Self::Open,
            2 => Self::HalfOpen,
            _ => unreachable!(),
        }
    }

    #[inline]
    pub(crate) const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for BreakerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half-open",
        };
        f.write_str(name)
    }
}

/// One admission attempt outcome in the sliding window
#[derive(Debug, Clone, Copy)]
pub(crate) struct AttemptRecord {
    pub at: Instant,
    pub success: bool,
}

/// Circuit breaker statistics snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BreakerStats {
    pub state: BreakerState,
    /// Attempts currently retained in the sliding window
    pub window_size: usize,
    /// Failed share of the window, in percent (0 when the window is empty)
    pub failure_rate_pct: f64,
    pub total_attempts: u64,
    pub total_failures: u64,
    pub consecutive_failures: u32,
    pub time_in_state_micros: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(BreakerState::Closed.to_string(), "closed");
        assert_eq!(BreakerState::HalfOpen.to_string(), "half-open");
    }

    #[test]
    fn test_state_word_round_trip() {
        for state in [BreakerState::Closed, BreakerState::Open, BreakerState::HalfOpen] {
            assert_eq!(BreakerState::from_u8(state.as_u8()), state);
        }
    }
}
