//! Outer loop: read until the sensor answers, store, sleep, repeat.

use core::fmt;
use core::num::NonZeroU32;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::dht11::Dht11;
use crate::error::DecodeError;
use crate::reading::Reading;
use crate::store::Sink;
use crate::wire::Wire;

pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(120);
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Consecutive failures between "sensor may be disconnected" warnings.
const STALL_WARN_EVERY: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub backoff: Duration,
    /// `None` retries forever.
    pub max_attempts: Option<NonZeroU32>,
}

impl RetryPolicy {
    pub fn unbounded(backoff: Duration) -> Self {
        Self {
            backoff,
            max_attempts: None,
        }
    }

    pub fn bounded(backoff: Duration, max_attempts: NonZeroU32) -> Self {
        Self {
            backoff,
            max_attempts: Some(max_attempts),
        }
    }

    fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max.get())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unbounded(DEFAULT_BACKOFF)
    }
}

/// A bounded retry policy ran out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exhausted {
    pub attempts: u32,
    pub last: DecodeError,
}

impl fmt::Display for Exhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no reading after {} attempts, last: {}", self.attempts, self.last)
    }
}

impl std::error::Error for Exhausted {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub attempts: u64,
    pub readings: u64,
    pub failures: u64,
    pub store_errors: u64,
}

pub struct Sampler<W: Wire, S: Sink> {
    sensor: Dht11<W>,
    sink: S,
    retry: RetryPolicy,
    interval: Duration,
    consecutive_failures: u64,
    stats: Stats,
}

impl<W: Wire, S: Sink> Sampler<W, S> {
    pub fn new(sensor: Dht11<W>, sink: S, retry: RetryPolicy, interval: Duration) -> Self {
        Self {
            sensor,
            sink,
            retry,
            interval,
            consecutive_failures: 0,
            stats: Stats::default(),
        }
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sensor_mut(&mut self) -> &mut Dht11<W> {
        &mut self.sensor
    }

    /// Retry the decoder with backoff until it yields a reading.
    pub fn acquire(&mut self) -> Result<Reading, Exhausted> {
        let mut attempts = 0u32;
        loop {
            attempts = attempts.saturating_add(1);
            self.stats.attempts += 1;

            match self.sensor.read() {
                Ok(reading) => {
                    self.stats.readings += 1;
                    if self.consecutive_failures > 0 {
                        debug!("DHT11 read ok after {} failed attempts", self.consecutive_failures);
                    }
                    self.consecutive_failures = 0;
                    return Ok(reading);
                }
                Err(err) => {
                    self.stats.failures += 1;
                    self.consecutive_failures += 1;
                    warn!("DHT11 read failed ({}): {}, retrying", err.kind(), err);
                    if self.consecutive_failures % STALL_WARN_EVERY == 0 {
                        warn!(
                            "{} consecutive DHT11 failures, check wiring and pin number",
                            self.consecutive_failures
                        );
                    }
                    if self.retry.exhausted(attempts) {
                        return Err(Exhausted {
                            attempts,
                            last: err,
                        });
                    }
                    self.pause(self.retry.backoff);
                }
            }
        }
    }

    /// One sample period: acquire, store, sleep. Returns the reading if one was decoded.
    pub fn cycle(&mut self) -> Option<Reading> {
        let reading = match self.acquire() {
            Ok(reading) => {
                match self.sink.store(&reading) {
                    Ok(()) => info!(
                        "Data updated: humidity {}%, temperature {}°C",
                        reading.humidity(),
                        reading.temperature()
                    ),
                    Err(err) => {
                        self.stats.store_errors += 1;
                        error!("{:#}", err);
                    }
                }
                Some(reading)
            }
            Err(err) => {
                error!("{}", err);
                None
            }
        };
        self.pause(self.interval);
        reading
    }

    pub fn run(&mut self) -> ! {
        loop {
            self.cycle();
        }
    }

    // `delay_ms` takes u32, so long pauses go in slices.
    fn pause(&mut self, duration: Duration) {
        let mut remaining = duration.as_millis();
        while remaining > 0 {
            let slice = u32::try_from(remaining).unwrap_or(u32::MAX);
            self.sensor.wire_mut().delay_ms(slice);
            remaining -= u128::from(slice);
        }
    }
}
