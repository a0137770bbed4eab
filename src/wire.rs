//! The single data line shared by host and sensor, plus the clock used to time it.
//!
//! Everything the decoder needs from the hardware goes through [`Wire`], so the
//! protocol code never touches a GPIO driver directly.

use core::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Logic level of the data line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// Direction of the line from the host's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Host drives the line.
    Output,
    /// Line released; the pull-up or the sensor sets the level.
    Input,
}

/// GPIO line plus microsecond clock.
///
/// `read_level` and `now_us` are called in tight busy loops, so implementations
/// must not sleep or allocate in them.
pub trait Wire {
    type Error: fmt::Display;

    fn set_mode(&mut self, mode: Mode) -> Result<(), Self::Error>;

    fn set_level(&mut self, level: Level) -> Result<(), Self::Error>;

    fn read_level(&mut self) -> Level;

    /// Monotonic microseconds since an arbitrary origin.
    fn now_us(&mut self) -> u64;

    /// Busy delay, microsecond resolution.
    fn delay_us(&mut self, us: u32);

    /// Coarse delay, may yield to the scheduler.
    fn delay_ms(&mut self, ms: u32);

    /// Wall clock seconds used to stamp readings.
    fn unix_time(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_conversions() {
        assert_eq!(Level::from(true), Level::High);
        assert_eq!(Level::from(false), Level::Low);
        assert!(Level::High.is_high());
    }
}
