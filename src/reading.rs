use serde::Serialize;

/// A validated sensor sample. Only the decoder builds these after a frame
/// passes checksum and range checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    humidity: u8,
    temperature: u8,
    timestamp: u64,
}

impl Reading {
    pub fn new(humidity: u8, temperature: u8, timestamp: u64) -> Self {
        Self {
            humidity,
            temperature,
            timestamp,
        }
    }

    /// Relative humidity, percent.
    pub fn humidity(&self) -> u8 {
        self.humidity
    }

    /// Degrees Celsius.
    pub fn temperature(&self) -> u8 {
        self.temperature
    }

    /// Unix seconds at decode time.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Compact JSON document written to the data file.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&Payload::from(self))
    }
}

#[derive(Serialize)]
struct Payload {
    timestamp: u64,
    humidity: u8,
    temperature: u8,
    unit: Unit,
}

#[derive(Serialize)]
struct Unit {
    humidity: &'static str,
    temperature: &'static str,
}

impl From<&Reading> for Payload {
    fn from(reading: &Reading) -> Self {
        Self {
            timestamp: reading.timestamp,
            humidity: reading.humidity,
            temperature: reading.temperature,
            unit: Unit {
                humidity: "%",
                temperature: "°C",
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_layout_is_exact() {
        let json = Reading::new(55, 26, 1_760_000_123).to_json().unwrap();
        assert_eq!(
            json,
            r#"{"timestamp":1760000123,"humidity":55,"temperature":26,"unit":{"humidity":"%","temperature":"°C"}}"#
        );
    }
}
