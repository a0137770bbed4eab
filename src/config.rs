use core::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use clap::{Parser, ValueEnum};

use crate::dht11::{DecoderConfig, FractionPolicy, DEFAULT_THRESHOLD_US};
use crate::sampler::{RetryPolicy, DEFAULT_INTERVAL};

pub const DEFAULT_PIN: i32 = 3;
pub const MAX_PIN: i32 = 64;
pub const DEFAULT_OUTPUT_FILE: &str = "/tmp/temperature_humidity.json";
pub const DEFAULT_CHIP: &str = "/dev/gpiochip0";
pub const DEFAULT_RT_PRIORITY: i32 = 10;
/// A day; anything longer is a misconfiguration.
pub const MAX_INTERVAL_SECS: u64 = 86_400;
pub const MAX_BACKOFF_MS: u64 = 60_000;

/// DHT11 temperature/humidity monitor.
///
/// Reads the sensor every interval and rewrites OUTPUT_FILE with the latest
/// reading as JSON.
#[derive(Debug, Parser)]
#[command(version)]
pub struct Args {
    /// Data pin, wiringPi numbering (Raspberry Pi layout) unless --line is given
    #[arg(value_name = "PIN", default_value_t = DEFAULT_PIN, allow_negative_numbers = true)]
    pub pin: i32,

    /// Data file, rewritten after every successful read
    #[arg(value_name = "OUTPUT_FILE", default_value = DEFAULT_OUTPUT_FILE)]
    pub output: PathBuf,

    /// High pulses longer than this many microseconds decode as 1
    #[arg(value_name = "THRESHOLD_US", default_value_t = DEFAULT_THRESHOLD_US)]
    pub threshold_us: u32,

    /// Interpret PIN as a line offset on --chip (the BCM number on a Raspberry Pi)
    #[arg(long, visible_alias = "bcm")]
    pub line: bool,

    /// Select the data line by its name on --chip instead of by PIN (e.g. PA6)
    #[arg(long, value_name = "NAME")]
    pub line_name: Option<String>,

    /// GPIO character device holding the data line
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CHIP)]
    pub chip: PathBuf,

    /// GPIO driver
    #[arg(long, value_enum, default_value_t = Backend::Cdev)]
    pub backend: Backend,

    /// Seconds between samples
    #[arg(
        long,
        value_name = "SECS",
        default_value_t = DEFAULT_INTERVAL.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..=MAX_INTERVAL_SECS)
    )]
    pub interval: u64,

    /// Pause between failed attempts, milliseconds
    #[arg(
        long,
        value_name = "MS",
        default_value_t = 120,
        value_parser = clap::value_parser!(u64).range(1..=MAX_BACKOFF_MS)
    )]
    pub backoff_ms: u64,

    /// Give up a sample period after this many failed attempts (default: never)
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<NonZeroU32>,

    /// Accept frames with non-zero fraction bytes and report the integer parts
    #[arg(long)]
    pub allow_fraction: bool,

    /// Do not request real-time scheduling
    #[arg(long)]
    pub no_realtime: bool,

    /// SCHED_FIFO priority for the sampling loop
    #[arg(
        long,
        value_name = "PRIO",
        default_value_t = DEFAULT_RT_PRIORITY,
        value_parser = clap::value_parser!(i32).range(1..=99)
    )]
    pub rt_priority: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Linux GPIO character device, works on any SoC
    Cdev,
    /// Raspberry Pi register access (needs the `rpi` feature)
    Rppal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinNumbering {
    WiringPi,
    /// Offset on the GPIO chip.
    Line,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinSpec {
    pub number: u8,
    pub numbering: PinNumbering,
}

impl PinSpec {
    /// Line offset on the GPIO chip, if this pin has one.
    pub fn line(&self) -> Option<u32> {
        match self.numbering {
            PinNumbering::Line => Some(u32::from(self.number)),
            PinNumbering::WiringPi => wiringpi_to_bcm(self.number).map(u32::from),
        }
    }
}

/// How the backend finds the data line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineSelect {
    Offset(u32),
    Name(String),
}

/// wiringPi pin to BCM GPIO on rev2 and later Raspberry Pi boards (40-pin
/// header plus P5). BCM numbers are also the line offsets on `gpiochip0`.
pub fn wiringpi_to_bcm(pin: u8) -> Option<u8> {
    const TABLE: [u8; 32] = [
        17, 18, 27, 22, 23, 24, 25, 4, // 0-7
        2, 3, 8, 7, 10, 9, 11, 14, // 8-15
        15, 28, 29, 30, 31, 5, 6, 13, // 16-23
        19, 26, 12, 16, 20, 21, 0, 1, // 24-31
    ];
    TABLE.get(usize::from(pin)).copied()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub pin: PinSpec,
    pub line_name: Option<String>,
    pub chip: PathBuf,
    pub backend: Backend,
    pub output: PathBuf,
    pub decoder: DecoderConfig,
    pub retry: RetryPolicy,
    pub interval: Duration,
    pub realtime: bool,
    pub rt_priority: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pin: PinSpec {
                number: DEFAULT_PIN as u8,
                numbering: PinNumbering::WiringPi,
            },
            line_name: None,
            chip: PathBuf::from(DEFAULT_CHIP),
            backend: Backend::Cdev,
            output: PathBuf::from(DEFAULT_OUTPUT_FILE),
            decoder: DecoderConfig::default(),
            retry: RetryPolicy::default(),
            interval: DEFAULT_INTERVAL,
            realtime: true,
            rt_priority: DEFAULT_RT_PRIORITY,
        }
    }
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self> {
        if !(0..=MAX_PIN).contains(&args.pin) {
            bail!("invalid pin number: {} (expected 0..={MAX_PIN})", args.pin);
        }
        let pin = PinSpec {
            number: args.pin as u8,
            numbering: if args.line {
                PinNumbering::Line
            } else {
                PinNumbering::WiringPi
            },
        };

        let decoder = DecoderConfig {
            threshold_us: args.threshold_us,
            fraction: if args.allow_fraction {
                FractionPolicy::Ignore
            } else {
                FractionPolicy::Reject
            },
            ..DecoderConfig::default()
        };

        let backoff = Duration::from_millis(args.backoff_ms);
        let retry = match args.max_attempts {
            Some(max) => RetryPolicy::bounded(backoff, max),
            None => RetryPolicy::unbounded(backoff),
        };

        Ok(Self {
            pin,
            line_name: args.line_name,
            chip: args.chip,
            backend: args.backend,
            output: args.output,
            decoder,
            retry,
            interval: Duration::from_secs(args.interval),
            realtime: !args.no_realtime,
            rt_priority: args.rt_priority,
        })
    }

    /// The data line: by name when one was given, else PIN mapped to an offset.
    pub fn line(&self) -> Result<LineSelect> {
        if let Some(name) = &self.line_name {
            return Ok(LineSelect::Name(name.clone()));
        }
        self.pin
            .line()
            .map(LineSelect::Offset)
            .ok_or_else(|| anyhow!("wiringPi pin {} has no GPIO line", self.pin.number))
    }
}
