//! Scripted data line for tests.
//!
//! Time is virtual: every `read_level` costs one microsecond and delays advance
//! the clock instantly. Each switch to input mode replays the next script from
//! its start, so one wire can play a different sensor answer per attempt.

use core::fmt;

use crate::wire::{Level, Mode, Wire};

pub const SIM_UNIX_TIME: u64 = 1_760_000_000;

// Nominal sensor timings in microseconds.
pub const REACTION_US: u32 = 20;
pub const ACK_LOW_US: u32 = 80;
pub const ACK_HIGH_US: u32 = 80;
pub const BIT_LOW_US: u32 = 50;
pub const ZERO_HIGH_US: u32 = 26;
pub const ONE_HIGH_US: u32 = 70;

/// Injected driver error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimFault;

impl fmt::Display for SimFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("simulated GPIO fault")
    }
}

#[derive(Debug, Clone)]
pub struct Script {
    pub segments: Vec<(Level, u32)>,
    pub hold: Level,
}

pub struct SimWire {
    scripts: Vec<Script>,
    attempts: usize,
    now: u64,
    mode: Mode,
    driven: Level,
    input_since: u64,
    fail_at_write: Option<usize>,
    pub writes: Vec<(u64, Level)>,
    pub modes: Vec<(u64, Mode)>,
}

impl SimWire {
    pub fn new(segments: Vec<(Level, u32)>, hold: Level) -> Self {
        Self::scripted(vec![Script { segments, hold }])
    }

    /// One script per attempt; the last one repeats.
    pub fn scripted(scripts: Vec<Script>) -> Self {
        assert!(!scripts.is_empty());
        Self {
            scripts,
            attempts: 0,
            now: 0,
            mode: Mode::Output,
            driven: Level::High,
            input_since: 0,
            fail_at_write: None,
            writes: Vec::new(),
            modes: Vec::new(),
        }
    }

    /// A sensor that answers with `bytes`.
    pub fn responding(bytes: [u8; 5]) -> Self {
        Self::new(response(bytes), Level::High)
    }

    /// A line that never moves after the host releases it.
    pub fn stuck(level: Level) -> Self {
        Self::new(Vec::new(), level)
    }

    /// `set_level` call number `index` (0-based, counting successful writes) fails.
    pub fn failing_write(mut self, index: usize) -> Self {
        self.fail_at_write = Some(index);
        self
    }

    /// Number of times the host released the line, i.e. decode attempts.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    fn script(&self) -> &Script {
        let idx = self.attempts.saturating_sub(1).min(self.scripts.len() - 1);
        &self.scripts[idx]
    }

    fn level_at(&self, t: u64) -> Level {
        let script = self.script();
        let mut offset = t - self.input_since;
        for &(level, len) in &script.segments {
            if offset < u64::from(len) {
                return level;
            }
            offset -= u64::from(len);
        }
        script.hold
    }
}

impl Wire for SimWire {
    type Error = SimFault;

    fn set_mode(&mut self, mode: Mode) -> Result<(), SimFault> {
        if mode == Mode::Input && self.mode == Mode::Output {
            self.attempts += 1;
            self.input_since = self.now;
        }
        self.mode = mode;
        self.modes.push((self.now, mode));
        Ok(())
    }

    fn set_level(&mut self, level: Level) -> Result<(), SimFault> {
        if self.fail_at_write == Some(self.writes.len()) {
            return Err(SimFault);
        }
        self.driven = level;
        self.writes.push((self.now, level));
        Ok(())
    }

    fn read_level(&mut self) -> Level {
        let level = match self.mode {
            Mode::Output => self.driven,
            Mode::Input => self.level_at(self.now),
        };
        self.now += 1;
        level
    }

    fn now_us(&mut self) -> u64 {
        self.now
    }

    fn delay_us(&mut self, us: u32) {
        self.now += u64::from(us);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.now += u64::from(ms) * 1000;
    }

    fn unix_time(&self) -> u64 {
        SIM_UNIX_TIME
    }
}

/// Handshake plus 40 data bits with nominal pulse widths.
pub fn response(bytes: [u8; 5]) -> Vec<(Level, u32)> {
    response_with_widths(bytes, ZERO_HIGH_US, ONE_HIGH_US)
}

pub fn response_with_widths(bytes: [u8; 5], zero_us: u32, one_us: u32) -> Vec<(Level, u32)> {
    let mut segments = handshake();
    for byte in bytes {
        for shift in (0..8).rev() {
            let width = if (byte >> shift) & 1 == 1 { one_us } else { zero_us };
            segments.push((Level::Low, BIT_LOW_US));
            segments.push((Level::High, width));
        }
    }
    segments.push((Level::Low, BIT_LOW_US));
    segments
}

/// Reaction delay and the low/high acknowledgement, up to the first bit's low.
pub fn handshake() -> Vec<(Level, u32)> {
    vec![
        (Level::High, REACTION_US),
        (Level::Low, ACK_LOW_US),
        (Level::High, ACK_HIGH_US),
    ]
}
