//! DHT11 single-wire protocol.
//!
//! The host pulls the line low to request a sample, then the sensor answers
//! with a low/high acknowledgement followed by 40 bits. Each bit is ~50us low
//! then a high pulse whose width carries the value: ~26us for 0, ~70us for 1.
//! Bytes arrive MSB first: humidity, humidity fraction, temperature,
//! temperature fraction, checksum.

use log::trace;

use crate::error::{AckPhase, BitPhase, DecodeError};
use crate::reading::Reading;
use crate::timing::{measure_high, wait_for_level, Timeout};
use crate::wire::{Level, Mode, Wire};

pub const FRAME_BITS: usize = 40;
pub const MAX_HUMIDITY: u8 = 100;
pub const MAX_TEMPERATURE: u8 = 80;
pub const DEFAULT_THRESHOLD_US: u32 = 45;

/// What to do with a frame whose fraction bytes are not zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FractionPolicy {
    /// Fail the attempt with `UnsupportedVariant`.
    #[default]
    Reject,
    /// Report the integer bytes and drop the fractions.
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    /// High pulses strictly longer than this decode as 1.
    pub threshold_us: u32,
    /// Line held high before the request so the sensor sees a clean edge.
    pub settle_ms: u32,
    /// Request pulse, must be at least 18ms.
    pub request_low_ms: u32,
    /// High time after the request before the host lets go.
    pub release_us: u32,
    /// Each of the three acknowledgement waits.
    pub ack_timeout_us: u32,
    pub rise_timeout_us: u32,
    pub fall_timeout_us: u32,
    pub interbit_timeout_us: u32,
    pub fraction: FractionPolicy,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            threshold_us: DEFAULT_THRESHOLD_US,
            settle_ms: 50,
            request_low_ms: 20,
            release_us: 30,
            ack_timeout_us: 2000,
            rise_timeout_us: 1000,
            fall_timeout_us: 2000,
            interbit_timeout_us: 1000,
            fraction: FractionPolicy::Reject,
        }
    }
}

/// 1 when the high pulse is longer than the threshold. Equal counts as 0.
#[inline]
pub fn decode_bit(high_us: u32, threshold_us: u32) -> bool {
    high_us > threshold_us
}

/// Low byte of the sum of the four data bytes.
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |sum, b| sum.wrapping_add(*b))
}

/// The five bytes of one transmission, filled bit by bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawFrame([u8; 5]);

impl RawFrame {
    pub fn new(bytes: [u8; 5]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> [u8; 5] {
        self.0
    }

    /// Shift bit `index` (0..40) into its byte, MSB first.
    pub fn push_bit(&mut self, index: usize, bit: bool) {
        let byte = &mut self.0[index / 8];
        *byte = (*byte << 1) | u8::from(bit);
    }

    /// Checksum, then range, then fraction bytes.
    ///
    /// Returns `(humidity, temperature)`.
    pub fn validate(&self, fraction: FractionPolicy) -> Result<(u8, u8), DecodeError> {
        let [humidity, humidity_fraction, temperature, temperature_fraction, received] = self.0;

        let computed = checksum(&self.0[..4]);
        if computed != received {
            return Err(DecodeError::ChecksumMismatch { computed, received });
        }

        if humidity > MAX_HUMIDITY || temperature > MAX_TEMPERATURE {
            return Err(DecodeError::RangeImplausible {
                humidity,
                temperature,
            });
        }

        if fraction == FractionPolicy::Reject && (humidity_fraction != 0 || temperature_fraction != 0)
        {
            return Err(DecodeError::UnsupportedVariant {
                humidity_fraction,
                temperature_fraction,
            });
        }

        Ok((humidity, temperature))
    }
}

/// DHT11 on one data line. Owns the line; attempts never overlap.
pub struct Dht11<W: Wire> {
    wire: W,
    config: DecoderConfig,
}

impl<W: Wire> Dht11<W> {
    pub fn new(wire: W, config: DecoderConfig) -> Self {
        Self { wire, config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn wire_mut(&mut self) -> &mut W {
        &mut self.wire
    }

    pub fn into_inner(self) -> W {
        self.wire
    }

    /// One complete attempt: request, acknowledgement, 40 bits, validation.
    pub fn read(&mut self) -> Result<Reading, DecodeError> {
        self.request()?;
        self.await_ack()?;
        let frame = self.read_frame()?;
        trace!("DHT11 frame {:?}", frame.bytes());

        let (humidity, temperature) = frame.validate(self.config.fraction)?;
        Ok(Reading::new(humidity, temperature, self.wire.unix_time()))
    }

    // The only phase where the host drives the line. On a driver error the
    // line is released so it is not left pulled low.
    fn request(&mut self) -> Result<(), DecodeError> {
        self.drive_request().map_err(|err| {
            let _ = self.wire.set_mode(Mode::Input);
            DecodeError::Gpio(err.to_string())
        })
    }

    fn drive_request(&mut self) -> Result<(), W::Error> {
        self.wire.set_mode(Mode::Output)?;
        self.wire.set_level(Level::High)?;
        self.wire.delay_ms(self.config.settle_ms);
        self.wire.set_level(Level::Low)?;
        self.wire.delay_ms(self.config.request_low_ms);
        self.wire.set_level(Level::High)?;
        self.wire.delay_us(self.config.release_us);
        self.wire.set_mode(Mode::Input)
    }

    // Sensor response: ~80us low, ~80us high, then the first bit's low.
    fn await_ack(&mut self) -> Result<(), DecodeError> {
        let timeout = self.config.ack_timeout_us;
        for (level, phase) in [
            (Level::Low, AckPhase::Low),
            (Level::High, AckPhase::High),
            (Level::Low, AckPhase::DataLow),
        ] {
            wait_for_level(&mut self.wire, level, timeout)
                .map_err(|_| DecodeError::SensorUnresponsive(phase))?;
        }
        Ok(())
    }

    fn read_frame(&mut self) -> Result<RawFrame, DecodeError> {
        let mut frame = RawFrame::default();
        for i in 0..FRAME_BITS {
            let timeout = |phase: BitPhase| {
                move |_: Timeout| DecodeError::BitTimeout {
                    bit: i as u8,
                    phase,
                }
            };

            wait_for_level(&mut self.wire, Level::High, self.config.rise_timeout_us)
                .map_err(timeout(BitPhase::Rise))?;
            let high_us = measure_high(&mut self.wire, self.config.fall_timeout_us)
                .map_err(timeout(BitPhase::Fall))?;
            frame.push_bit(i, decode_bit(high_us, self.config.threshold_us));
            wait_for_level(&mut self.wire, Level::Low, self.config.interbit_timeout_us)
                .map_err(timeout(BitPhase::Interbit))?;
        }
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_threshold_boundary() {
        assert!(!decode_bit(44, 45));
        assert!(!decode_bit(45, 45));
        assert!(decode_bit(46, 45));
        assert!(!decode_bit(0, 0));
        assert!(decode_bit(u32::MAX, 45));
    }

    #[test]
    fn bits_fill_msb_first() {
        let mut frame = RawFrame::default();
        // 0b0011_0111 = 55
        for (i, bit) in [false, false, true, true, false, true, true, true].into_iter().enumerate() {
            frame.push_bit(i, bit);
        }
        frame.push_bit(39, true);
        assert_eq!(frame.bytes(), [55, 0, 0, 0, 1]);
    }

    #[test]
    fn checksum_wraps() {
        assert_eq!(checksum(&[55, 0, 26, 0]), 81);
        assert_eq!(checksum(&[200, 100, 0, 0]), 44);
    }

    #[test]
    fn every_single_bit_flip_in_data_is_caught() {
        let good = [55u8, 0, 26, 0, 81];
        assert_eq!(RawFrame::new(good).validate(FractionPolicy::Reject), Ok((55, 26)));

        for byte in 0..4 {
            for bit in 0..8 {
                let mut bytes = good;
                bytes[byte] ^= 1 << bit;
                let result = RawFrame::new(bytes).validate(FractionPolicy::Ignore);
                assert!(
                    matches!(result, Err(DecodeError::ChecksumMismatch { .. })),
                    "flip of byte {byte} bit {bit} accepted: {result:?}"
                );
            }
        }
    }

    #[test]
    fn checksum_is_checked_before_range() {
        let result = RawFrame::new([101, 0, 26, 0, 0]).validate(FractionPolicy::Reject);
        assert_eq!(
            result,
            Err(DecodeError::ChecksumMismatch {
                computed: 127,
                received: 0
            })
        );
    }

    #[test]
    fn range_limits_are_inclusive() {
        assert_eq!(
            RawFrame::new([100, 0, 80, 0, 180]).validate(FractionPolicy::Reject),
            Ok((100, 80))
        );
        assert_eq!(
            RawFrame::new([40, 0, 81, 0, 121]).validate(FractionPolicy::Reject),
            Err(DecodeError::RangeImplausible {
                humidity: 40,
                temperature: 81
            })
        );
    }

    #[test]
    fn fraction_bytes_follow_policy() {
        let frame = RawFrame::new([55, 0, 26, 3, 84]);
        assert_eq!(
            frame.validate(FractionPolicy::Reject),
            Err(DecodeError::UnsupportedVariant {
                humidity_fraction: 0,
                temperature_fraction: 3
            })
        );
        assert_eq!(frame.validate(FractionPolicy::Ignore), Ok((55, 26)));
    }
}
