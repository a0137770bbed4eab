//! Hardware behind [`Wire`](crate::wire::Wire).
//!
//! Every backend needs a pull-up on the data line (internal where the driver
//! can set one, otherwise external ~4.7k): the host and the sensor only ever
//! pull it low.

#[cfg(target_os = "linux")]
fn spin_us(us: u32) {
    use std::time::{Duration, Instant};

    // Kernel sleeps overshoot by tens of microseconds; spin instead.
    let until = Instant::now() + Duration::from_micros(u64::from(us));
    while Instant::now() < until {
        core::hint::spin_loop();
    }
}

#[cfg(target_os = "linux")]
fn micros_since(epoch: std::time::Instant) -> u64 {
    u64::try_from(epoch.elapsed().as_micros()).unwrap_or(u64::MAX)
}

/// Any SoC with a GPIO character device (Orange Pi, Raspberry Pi, ...).
#[cfg(target_os = "linux")]
pub mod cdev {
    use std::path::Path;
    use std::thread;
    use std::time::{Duration, Instant};

    use anyhow::{anyhow, bail, Context, Result};
    use gpio_cdev::{Chip, Line, LineHandle, LineRequestFlags};
    use log::info;

    use crate::config::LineSelect;
    use crate::wire::{Level, Mode, Wire};

    const CONSUMER: &str = "dht11-monitor";

    /// One line of `/dev/gpiochipN`.
    ///
    /// The v1 uAPI cannot change direction in place, so every mode switch
    /// releases the line and requests it again.
    pub struct CdevWire {
        line: Line,
        handle: Option<LineHandle>,
        driven: Level,
        epoch: Instant,
    }

    /// Claim the sensor line on `chip`, by offset or by name.
    pub fn open(chip: &Path, select: &LineSelect) -> Result<CdevWire> {
        let mut gpio = Chip::new(chip).with_context(|| format!("cannot open {}", chip.display()))?;
        let line = match select {
            LineSelect::Offset(offset) => gpio
                .get_line(*offset)
                .with_context(|| format!("{} has no line {}", chip.display(), offset))?,
            LineSelect::Name(name) => find_line(&mut gpio, name)?,
        };
        let handle = line
            .request(LineRequestFlags::OUTPUT, 1, CONSUMER)
            .with_context(|| format!("cannot claim line {} on {}", line.offset(), chip.display()))?;
        info!("DHT11 sensor on {} line {}", gpio.name(), line.offset());
        Ok(CdevWire {
            line,
            handle: Some(handle),
            driven: Level::High,
            epoch: Instant::now(),
        })
    }

    fn find_line(chip: &mut Chip, name: &str) -> Result<Line> {
        for offset in 0..chip.num_lines() {
            let line = chip.get_line(offset)?;
            if line.info()?.name() == Some(name) {
                return Ok(line);
            }
        }
        bail!("no line named {:?} on {}", name, chip.name())
    }

    impl CdevWire {
        fn handle(&self) -> Result<&LineHandle> {
            self.handle
                .as_ref()
                .ok_or_else(|| anyhow!("line {} is not requested", self.line.offset()))
        }
    }

    impl Wire for CdevWire {
        type Error = anyhow::Error;

        fn set_mode(&mut self, mode: Mode) -> Result<()> {
            let (flags, initial) = match mode {
                Mode::Output => (LineRequestFlags::OUTPUT, u8::from(self.driven.is_high())),
                Mode::Input => (LineRequestFlags::INPUT, 0),
            };
            // The kernel refuses a second request while the old handle is open.
            self.handle = None;
            self.handle = Some(self.line.request(flags, initial, CONSUMER)?);
            Ok(())
        }

        fn set_level(&mut self, level: Level) -> Result<()> {
            self.driven = level;
            self.handle()?.set_value(u8::from(level.is_high()))?;
            Ok(())
        }

        fn read_level(&mut self) -> Level {
            // A failed read looks like an idle line, so the wait in progress times out.
            self.handle
                .as_ref()
                .and_then(|handle| handle.get_value().ok())
                .map_or(Level::High, |value| Level::from(value != 0))
        }

        fn now_us(&mut self) -> u64 {
            super::micros_since(self.epoch)
        }

        fn delay_us(&mut self, us: u32) {
            super::spin_us(us);
        }

        fn delay_ms(&mut self, ms: u32) {
            thread::sleep(Duration::from_millis(u64::from(ms)));
        }
    }

}

/// Raspberry Pi only: `rppal` refuses to start on other boards.
#[cfg(all(target_os = "linux", feature = "rpi"))]
pub mod rpi {
    use core::convert::Infallible;
    use std::thread;
    use std::time::{Duration, Instant};

    use anyhow::{Context, Result};
    use log::info;
    use rppal::gpio::{Bias, Gpio, IoPin, Level as PinLevel, Mode as PinMode};

    use crate::wire::{Level, Mode, Wire};

    /// Raspberry Pi GPIO line through `/dev/gpiomem`.
    pub struct RpiWire {
        pin: IoPin,
        epoch: Instant,
    }

    /// Claim BCM line `bcm` for the sensor.
    pub fn open(bcm: u8) -> Result<RpiWire> {
        let gpio = Gpio::new().context("cannot open GPIO")?;
        let mut pin = gpio
            .get(bcm)
            .with_context(|| format!("cannot claim GPIO{bcm}"))?
            .into_io(PinMode::Output);
        pin.set_bias(Bias::PullUp);
        pin.set_high();
        info!("DHT11 sensor on GPIO{}", bcm);
        Ok(RpiWire {
            pin,
            epoch: Instant::now(),
        })
    }

    impl Wire for RpiWire {
        type Error = Infallible;

        fn set_mode(&mut self, mode: Mode) -> Result<(), Infallible> {
            self.pin.set_mode(match mode {
                Mode::Output => PinMode::Output,
                Mode::Input => PinMode::Input,
            });
            Ok(())
        }

        fn set_level(&mut self, level: Level) -> Result<(), Infallible> {
            match level {
                Level::Low => self.pin.set_low(),
                Level::High => self.pin.set_high(),
            }
            Ok(())
        }

        fn read_level(&mut self) -> Level {
            match self.pin.read() {
                PinLevel::Low => Level::Low,
                PinLevel::High => Level::High,
            }
        }

        fn now_us(&mut self) -> u64 {
            super::micros_since(self.epoch)
        }

        fn delay_us(&mut self, us: u32) {
            super::spin_us(us);
        }

        fn delay_ms(&mut self, ms: u32) {
            thread::sleep(Duration::from_millis(u64::from(ms)));
        }
    }
}

#[cfg(target_os = "espidf")]
pub mod esp {
    use anyhow::Result;
    use esp_idf_hal::delay::{Ets, FreeRtos};
    use esp_idf_hal::gpio::{AnyIOPin, InputOutput, Pin, PinDriver, Pull};
    use esp_idf_hal::sys::EspError;
    use esp_idf_sys as sys;
    use log::info;

    use crate::wire::{Level, Mode, Wire};

    /// Delays up to this long busy-wait; FreeRTOS ticks are too coarse for the
    /// 18ms request pulse.
    const BUSY_DELAY_MAX_MS: u32 = 50;

    /// Open-drain pin: "input" just means released high.
    pub struct EspWire<'d> {
        pin: PinDriver<'d, AnyIOPin, InputOutput>,
    }

    pub fn open(pin: AnyIOPin) -> Result<EspWire<'static>> {
        let gpio = pin.pin();
        let mut pin = PinDriver::input_output_od(pin)?;
        pin.set_pull(Pull::Up)?;
        pin.set_high()?;
        info!("DHT11 sensor on GPIO{}", gpio);
        Ok(EspWire { pin })
    }

    impl<'d> Wire for EspWire<'d> {
        type Error = EspError;

        fn set_mode(&mut self, mode: Mode) -> Result<(), EspError> {
            match mode {
                Mode::Output => Ok(()),
                Mode::Input => self.pin.set_high(),
            }
        }

        fn set_level(&mut self, level: Level) -> Result<(), EspError> {
            match level {
                Level::Low => self.pin.set_low(),
                Level::High => self.pin.set_high(),
            }
        }

        fn read_level(&mut self) -> Level {
            Level::from(self.pin.is_high())
        }

        // ESP timer in microseconds for tight pulse timing.
        fn now_us(&mut self) -> u64 {
            unsafe { sys::esp_timer_get_time() as u64 }
        }

        fn delay_us(&mut self, us: u32) {
            Ets::delay_us(us);
        }

        fn delay_ms(&mut self, ms: u32) {
            if ms <= BUSY_DELAY_MAX_MS {
                Ets::delay_ms(ms);
            } else {
                FreeRtos::delay_ms(ms);
            }
        }
    }
}
