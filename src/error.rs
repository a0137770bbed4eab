use core::fmt;

/// Which acknowledgement edge the sensor failed to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckPhase {
    /// Sensor never pulled the released line low.
    Low,
    /// Sensor never let the line back up.
    High,
    /// Sensor never dropped the line to start the first bit.
    DataLow,
}

/// Which wait inside a data bit ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitPhase {
    /// Waiting for the bit's high pulse to start.
    Rise,
    /// Waiting for the high pulse to end.
    Fall,
    /// Waiting for the line to settle low before the next bit.
    Interbit,
}

impl fmt::Display for AckPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => f.write_str("ack low"),
            Self::High => f.write_str("ack high"),
            Self::DataLow => f.write_str("data preamble"),
        }
    }
}

impl fmt::Display for BitPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rise => f.write_str("rise"),
            Self::Fall => f.write_str("fall"),
            Self::Interbit => f.write_str("interbit"),
        }
    }
}

/// Why one read attempt produced no reading. Every variant is worth a retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    SensorUnresponsive(AckPhase),
    BitTimeout { bit: u8, phase: BitPhase },
    ChecksumMismatch { computed: u8, received: u8 },
    RangeImplausible { humidity: u8, temperature: u8 },
    /// Non-zero fraction bytes: not the integer-only DHT11 frame.
    UnsupportedVariant {
        humidity_fraction: u8,
        temperature_fraction: u8,
    },
    /// The GPIO driver refused to drive the request pulse.
    Gpio(String),
}

impl DecodeError {
    /// Short stable label for logs and counters.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SensorUnresponsive(_) => "sensor-unresponsive",
            Self::BitTimeout { .. } => "bit-timeout",
            Self::ChecksumMismatch { .. } => "checksum-mismatch",
            Self::RangeImplausible { .. } => "range-implausible",
            Self::UnsupportedVariant { .. } => "unsupported-variant",
            Self::Gpio(_) => "gpio",
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SensorUnresponsive(phase) => {
                write!(f, "sensor not responding (timeout waiting for {phase})")
            }
            Self::BitTimeout { bit, phase } => {
                write!(f, "timeout on bit {bit} ({phase})")
            }
            Self::ChecksumMismatch { computed, received } => {
                write!(f, "checksum mismatch: computed {computed} != received {received}")
            }
            Self::RangeImplausible {
                humidity,
                temperature,
            } => write!(
                f,
                "implausible data: humidity {humidity}%, temperature {temperature}°C"
            ),
            Self::UnsupportedVariant {
                humidity_fraction,
                temperature_fraction,
            } => write!(
                f,
                "unsupported sensor variant: fraction bytes {humidity_fraction}/{temperature_fraction}"
            ),
            Self::Gpio(err) => write!(f, "GPIO error: {err}"),
        }
    }
}

impl std::error::Error for DecodeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_failing_wait() {
        let err = DecodeError::BitTimeout {
            bit: 17,
            phase: BitPhase::Interbit,
        };
        assert_eq!(err.to_string(), "timeout on bit 17 (interbit)");
        assert_eq!(err.kind(), "bit-timeout");

        let err = DecodeError::SensorUnresponsive(AckPhase::DataLow);
        assert_eq!(
            err.to_string(),
            "sensor not responding (timeout waiting for data preamble)"
        );
    }
}
