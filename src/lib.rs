//! DHT11 temperature/humidity monitor.
//!
//! Bit-bangs the DHT11 single-wire protocol on one GPIO line and keeps a JSON
//! file with the latest reading up to date.
//!
//! Pin map (classic setup):
//!   DATA = wiringPi 3 (GPIO22 on a Raspberry Pi), with pull-up to 3V3.
//!   Other boards (Orange Pi, ...) select the line by chip offset or name.
//!
//! Layers, bottom up:
//! - [`wire`]: GPIO line plus microsecond clock, the only hardware seam
//! - [`timing`]: level waits and pulse measurement
//! - [`dht11`]: handshake, 40-bit sampling, checksum and range checks
//! - [`sampler`]: retry with backoff, store, sleep
//! - [`store`]: JSON data file
//! - [`board`], [`realtime`]: platform backends

pub mod board;
pub mod config;
pub mod dht11;
pub mod error;
pub mod reading;
pub mod realtime;
pub mod sampler;
pub mod store;
pub mod timing;
pub mod wire;

#[cfg(test)]
mod sim;

pub use dht11::{DecoderConfig, Dht11, FractionPolicy, RawFrame};
pub use error::{AckPhase, BitPhase, DecodeError};
pub use reading::Reading;
pub use sampler::{RetryPolicy, Sampler};
pub use store::{JsonFileSink, Sink};
pub use wire::{Level, Mode, Wire};
