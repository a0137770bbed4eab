use core::fmt;

use crate::wire::{Level, Wire};

/// The line did not reach the expected level in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeout {
    pub waited_us: u64,
}

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gave up after {}us", self.waited_us)
    }
}

/// Busy-poll the line until it reads `target`.
///
/// Returns microseconds elapsed since entry. Elapsed time is measured against
/// the wire's monotonic clock on every poll, so a preempted poll loop times out
/// late rather than never.
pub fn wait_for_level<W: Wire + ?Sized>(
    wire: &mut W,
    target: Level,
    timeout_us: u32,
) -> Result<u32, Timeout> {
    let start = wire.now_us();
    loop {
        let level = wire.read_level();
        let elapsed = wire.now_us().saturating_sub(start);
        if level == target {
            return Ok(u32::try_from(elapsed).unwrap_or(u32::MAX));
        }
        if elapsed > u64::from(timeout_us) {
            return Err(Timeout { waited_us: elapsed });
        }
    }
}

/// Length of the high pulse the line is currently in.
///
/// The caller must have just observed the line high.
pub fn measure_high<W: Wire + ?Sized>(wire: &mut W, timeout_us: u32) -> Result<u32, Timeout> {
    wait_for_level(wire, Level::Low, timeout_us)
}
