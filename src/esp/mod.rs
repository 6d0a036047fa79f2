//! Board bring-up on ESP-IDF: storage, logging, I2C display, WiFi and
//! HTTP, then hands over to [`App`](crate::app::App).

pub mod http;
pub mod storage;
pub mod time_sync;
pub mod wifi;

use crate::app::{self, App};
use crate::clock::SystemClock;
use crate::config::{Config, LcdConfig};
use crate::display::{Display, Screen, BOOT_DWELL_MS};
use crate::lcd::{self, Hd44780, DEFAULT_ADDRESS};
use crate::logger::FileLogger;
use anyhow::{bail, Result};
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::{
        delay::Ets,
        gpio::AnyIOPin,
        i2c::{I2c, I2cConfig, I2cDriver},
        peripheral::Peripheral,
        prelude::Peripherals,
        units::Hertz,
    },
};
use log::LevelFilter;

const I2C_BAUDRATE: u32 = 50_000;

type Lcd = Hd44780<I2cDriver<'static>, Ets>;

/// Firmware entry point. Never returns: a fatal error is logged and the
/// device parks until an external reset.
pub fn start() -> ! {
    esp_idf_svc::sys::link_patches();
    let clock = SystemClock::new();

    init_logging(clock);
    install_panic_hook();

    if let Err(err) = run(clock) {
        log::error!("FATAL: {err:#}");
    }
    app::halt(&clock)
}

fn init_logging(clock: SystemClock) {
    let logger = match storage::mount() {
        Ok(()) => FileLogger::create(storage::LOG_PATH, clock, LevelFilter::Info),
        Err(err) => {
            println!("storage mount failed: {err:#}");
            FileLogger::console_only(clock, LevelFilter::Info)
        }
    };
    let has_file = logger.has_file();
    if let Err(err) = logger.install() {
        println!("logger not installed: {err}");
    }
    if !has_file {
        log::warn!("log file unavailable, console only");
    }
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        log::error!("FATAL: {info}");
        app::halt(&SystemClock::new());
    }));
}

fn run(clock: SystemClock) -> Result<()> {
    log::info!("BOOT");
    let config = Config::load(storage::CONFIG_PATH)?;
    log::info!("Config {}", config.summary());

    let peripherals = Peripherals::take()?;
    let event_loop = EspSystemEventLoop::take()?;

    let i2c = match config.lcd.bus_id {
        0 => open_i2c(peripherals.i2c0, &config.lcd),
        #[cfg(not(any(esp32c2, esp32c3, esp32c6, esp32h2)))]
        1 => open_i2c(peripherals.i2c1, &config.lcd),
        other => Err(anyhow::anyhow!("no I2C bus {other}")),
    };
    let display = match i2c {
        Ok(i2c) => open_display(i2c, &config.lcd, clock),
        Err(err) => {
            log::error!("I2C init failed: {err:#}");
            Display::headless(config.lcd.cols, clock)
        }
    };

    let radio = wifi::EspRadio::new(event_loop, peripherals.modem)?;
    let _sntp = match config.ntp.as_ref() {
        Some(ntp) => match time_sync::start(ntp) {
            Ok(sntp) => Some(sntp),
            Err(err) => {
                log::warn!("SNTP unavailable: {err:#}");
                None
            }
        },
        None => None,
    };

    App::new(&config, radio, http::EspHttp::new(), display, clock).run()
}

fn open_i2c<I: I2c>(
    i2c: impl Peripheral<P = I> + 'static,
    config: &LcdConfig,
) -> Result<I2cDriver<'static>> {
    if config.sda_pin < 0 || config.scl_pin < 0 {
        bail!("bad I2C pins sda={} scl={}", config.sda_pin, config.scl_pin);
    }
    log::info!(
        "I2C{} sda={} scl={} at {} Hz",
        config.bus_id,
        config.sda_pin,
        config.scl_pin,
        I2C_BAUDRATE
    );
    // SAFETY: the pins come from configuration and are not handed out
    // anywhere else.
    let (sda, scl) = unsafe { (AnyIOPin::new(config.sda_pin), AnyIOPin::new(config.scl_pin)) };
    let i2c_config = I2cConfig::new().baudrate(Hertz(I2C_BAUDRATE));
    Ok(I2cDriver::new(i2c, sda, scl, &i2c_config)?)
}

/// Scans the bus, initializes the LCD and shows the boot screen. Any
/// failure leaves the device headless.
fn open_display(
    mut i2c: I2cDriver<'static>,
    config: &LcdConfig,
    clock: SystemClock,
) -> Display<Lcd, SystemClock> {
    let devices = lcd::scan(&mut i2c);
    let found: Vec<String> = devices.iter().map(|address| format!("{address:#04x}")).collect();
    log::info!("I2C scan: [{}]", found.join(", "));

    let address = config
        .i2c_address
        .or_else(|| devices.first().copied())
        .unwrap_or(DEFAULT_ADDRESS);
    let lcd = match Hd44780::new(i2c, Ets, address) {
        Ok(lcd) => {
            log::info!("LCD OK at {address:#04x}");
            Some(lcd)
        }
        Err(err) => {
            log::error!("LCD init failed: {err}");
            None
        }
    };

    let mut display = Display::new(lcd, config.cols, clock);
    display.clear();
    display.show_for(&Screen::boot(&devices), BOOT_DWELL_MS);
    display
}
