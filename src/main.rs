// main.rs
// DHT11 temperature/humidity monitor.
//
// Samples the sensor every 30s (retrying every 120ms until a frame passes the
// checksum) and rewrites the data file with the latest reading:
//   {"timestamp":...,"humidity":55,"temperature":26,"unit":{"humidity":"%","temperature":"°C"}}
//
// Pin map:
//   Linux SBC:    DATA = wiringPi 3 (GPIO22 on a Raspberry Pi) by default; on
//                 other boards pick the line with --line or --line-name
//   ESP32:        DATA = GPIO4, open-drain with pull-up

#[cfg(target_os = "linux")]
fn main() -> anyhow::Result<()> {
    use anyhow::Context;
    use clap::Parser;

    use dht11_monitor::board::cdev;
    use dht11_monitor::config::{Args, Backend, Config};

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_args(Args::parse())?;
    let line = config.line().context("GPIO initialization failed")?;

    match config.backend {
        Backend::Cdev => {
            let wire = cdev::open(&config.chip, &line).context("GPIO initialization failed")?;
            monitor(wire, config)
        }
        Backend::Rppal => {
            let wire = open_rppal(&line).context("GPIO initialization failed")?;
            monitor(wire, config)
        }
    }
}

#[cfg(all(target_os = "linux", feature = "rpi"))]
fn open_rppal(line: &dht11_monitor::config::LineSelect) -> anyhow::Result<impl dht11_monitor::Wire> {
    use anyhow::{anyhow, bail};
    use dht11_monitor::board::rpi;
    use dht11_monitor::config::LineSelect;

    let bcm = match line {
        LineSelect::Offset(offset) => {
            u8::try_from(*offset).map_err(|_| anyhow!("no GPIO{} on a Raspberry Pi", offset))?
        }
        LineSelect::Name(name) => bail!("--line-name {} needs the cdev backend", name),
    };
    rpi::open(bcm)
}

#[cfg(all(target_os = "linux", not(feature = "rpi")))]
fn open_rppal(_: &dht11_monitor::config::LineSelect) -> anyhow::Result<dht11_monitor::board::cdev::CdevWire> {
    anyhow::bail!("built without the rppal backend, rebuild with --features rpi")
}

#[cfg(target_os = "linux")]
fn monitor<W: dht11_monitor::Wire>(wire: W, config: dht11_monitor::config::Config) -> anyhow::Result<()> {
    use log::{info, warn};

    use dht11_monitor::realtime::{FifoScheduler, NoRealtime, Realtime};
    use dht11_monitor::{Dht11, JsonFileSink, Sampler};

    let mut realtime: Box<dyn Realtime> = if config.realtime {
        Box::new(FifoScheduler::new(config.rt_priority))
    } else {
        Box::new(NoRealtime)
    };
    if let Err(err) = realtime.elevate() {
        warn!("{:#}; bit timing may suffer from preemption", err);
    }

    let sensor = Dht11::new(wire, config.decoder);
    let sink = JsonFileSink::new(config.output);
    info!(
        "Temperature/humidity monitor started, data file: {}, bit threshold {}us",
        sink.path().display(),
        sensor.config().threshold_us
    );

    let mut sampler = Sampler::new(sensor, sink, config.retry, config.interval);
    sampler.run()
}

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    use esp_idf_hal::gpio::AnyIOPin;
    use esp_idf_hal::prelude::*;
    use esp_idf_svc::log::EspLogger;
    use esp_idf_sys as sys;
    use log::{info, warn};

    use dht11_monitor::board::esp;
    use dht11_monitor::config::Config;
    use dht11_monitor::realtime::{Realtime, TaskPriority};
    use dht11_monitor::{Dht11, JsonFileSink, Sampler};

    // Needs a mounted VFS (SPIFFS/FAT) at this path.
    const OUTPUT_FILE: &str = match option_env!("DHT_OUTPUT_FILE") {
        Some(v) => v,
        None => "/spiffs/temperature_humidity.json",
    };

    sys::link_patches();
    EspLogger::initialize_default();

    let config = Config {
        output: OUTPUT_FILE.into(),
        ..Config::default()
    };

    let peripherals = Peripherals::take()?;
    let wire = esp::open(AnyIOPin::from(peripherals.pins.gpio4))?;

    if let Err(err) = TaskPriority::default().elevate() {
        warn!("{:#}", err);
    }

    info!("Temperature/humidity monitor started, data file: {}", OUTPUT_FILE);

    let sensor = Dht11::new(wire, config.decoder);
    let sink = JsonFileSink::new(config.output);
    let mut sampler = Sampler::new(sensor, sink, config.retry, config.interval);
    sampler.run()
}

#[cfg(not(any(target_os = "linux", target_os = "espidf")))]
fn main() -> anyhow::Result<()> {
    anyhow::bail!("no GPIO backend for this platform");
}
