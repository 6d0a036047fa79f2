//! Two-line screens and the timed cycle that shows them.
//!
//! Every line goes to the device padded or truncated to exactly `cols`
//! characters, so a new screen fully overwrites the previous one without
//! clearing. A device error is logged and the frame is dropped; with no
//! device attached the controller keeps its timing and only logs.

use crate::clock::{format_time_of_day, Clock};
use crate::geo::GeoLocation;
use crate::lcd::CharDisplay;
use crate::weather::WeatherSample;

pub const SCREEN_DWELL_MS: u64 = 2_000;
pub const HEARTBEAT_DWELL_MS: u64 = 1_000;
pub const ERROR_DWELL_MS: u64 = 2_000;
pub const NOTICE_DWELL_MS: u64 = 2_000;
pub const COORDS_DWELL_MS: u64 = 3_000;
pub const BOOT_DWELL_MS: u64 = 1_000;

/// Truncate or right-pad with spaces to exactly `width` characters.
pub fn pad_right(text: &str, width: usize) -> String {
    let mut line: String = text.chars().take(width).collect();
    let len = line.chars().count();
    line.extend(std::iter::repeat(' ').take(width - len));
    line
}

pub fn clamp(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub top: String,
    pub bottom: String,
}

impl Screen {
    pub fn new(top: impl Into<String>, bottom: impl Into<String>) -> Self {
        Self {
            top: top.into(),
            bottom: bottom.into(),
        }
    }

    pub fn boot(devices: &[u8]) -> Self {
        let first = devices
            .first()
            .map(|address| format!("{address:#04x}"))
            .unwrap_or_else(|| "none".to_string());
        Self::new("BOOT OK", format!("I2C: {first}"))
    }

    pub fn connecting() -> Self {
        Self::new("Connecting to", "WiFi...")
    }

    pub fn wifi_wait() -> Self {
        Self::new("Connecting WiFi", "Please wait...")
    }

    pub fn error(message: &str) -> Self {
        Self::new("ERROR", message)
    }

    pub fn cached_notice() -> Self {
        Self::new("API warn", "using cached")
    }

    pub fn heartbeat(count: u64) -> Self {
        Self::new("Running...", format!("HB {count}"))
    }

    pub fn coordinates(geo: &GeoLocation) -> Self {
        Self::new("Coords lat/lon", format!("{:.4} {:.4}", geo.lat, geo.lon))
    }

    pub fn clock(time: &str) -> Self {
        Self::new("Time", time)
    }

    pub fn location(geo: &GeoLocation, weather: &WeatherSample) -> Self {
        Self::new(geo.label(), format!("Temp: {:.1}C", weather.temp))
    }

    pub fn conditions(weather: &WeatherSample) -> Self {
        let humidity = match weather.humidity {
            Some(humidity) => format!("Hum: {humidity}%"),
            None => "Hum: --%".to_string(),
        };
        Self::new(weather.description.as_str(), humidity)
    }

    pub fn wind(weather: &WeatherSample) -> Self {
        let wind = match weather.wind_speed {
            Some(speed) => format!("Wind: {speed:.1} m/s"),
            None => "Wind: -- m/s".to_string(),
        };
        let pressure = match weather.pressure {
            Some(pressure) => format!("Pres: {pressure} hPa"),
            None => "Pres: ----hPa".to_string(),
        };
        Self::new(wind, pressure)
    }
}

/// Clock, location+temperature, description+humidity, wind+pressure.
pub fn weather_screens(time: &str, geo: &GeoLocation, weather: &WeatherSample) -> [Screen; 4] {
    [
        Screen::clock(time),
        Screen::location(geo, weather),
        Screen::conditions(weather),
        Screen::wind(weather),
    ]
}

pub struct Display<D, C> {
    lcd: Option<D>,
    cols: usize,
    clock: C,
}

impl<D: CharDisplay, C: Clock> Display<D, C> {
    pub fn new(lcd: Option<D>, cols: usize, clock: C) -> Self {
        Self { lcd, cols, clock }
    }

    pub fn headless(cols: usize, clock: C) -> Self {
        Self::new(None, cols, clock)
    }

    pub fn is_attached(&self) -> bool {
        self.lcd.is_some()
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn lcd(&self) -> Option<&D> {
        self.lcd.as_ref()
    }

    /// Draw without waiting. Returns whether the frame reached the device.
    pub fn show(&mut self, screen: &Screen) -> bool {
        let Some(lcd) = self.lcd.as_mut() else {
            return false;
        };
        let top = pad_right(&screen.top, self.cols);
        let bottom = pad_right(&screen.bottom, self.cols);
        let result = lcd
            .set_cursor(0, 0)
            .and_then(|_| lcd.write_str(&top))
            .and_then(|_| lcd.set_cursor(0, 1))
            .and_then(|_| lcd.write_str(&bottom));
        match result {
            Ok(()) => true,
            Err(err) => {
                log::warn!("LCD write failed ('{}'): {err}", screen.top);
                false
            }
        }
    }

    pub fn show_for(&mut self, screen: &Screen, dwell_ms: u64) {
        self.show(screen);
        self.clock.sleep_ms(dwell_ms);
    }

    pub fn clear(&mut self) {
        if let Some(lcd) = self.lcd.as_mut() {
            if let Err(err) = lcd.clear() {
                log::warn!("LCD clear failed: {err}");
            }
        }
    }

    pub fn show_error(&mut self, message: &str) {
        log::error!("ERROR: {message}");
        let screen = Screen::error(&clamp(message, self.cols));
        self.show_for(&screen, ERROR_DWELL_MS);
    }

    pub fn show_cached_notice(&mut self) {
        self.show_for(&Screen::cached_notice(), NOTICE_DWELL_MS);
    }

    pub fn show_coordinates(&mut self, geo: &GeoLocation) {
        if self.show(&Screen::coordinates(geo)) {
            log::info!("LCD: showed coords");
        }
        self.clock.sleep_ms(COORDS_DWELL_MS);
    }

    pub fn show_heartbeat(&mut self, count: u64) {
        log::info!("Heartbeat {count}");
        self.show_for(&Screen::heartbeat(count), HEARTBEAT_DWELL_MS);
    }

    /// One pass over the weather screens, each held for the fixed dwell.
    /// The clock screen reads the time when it is drawn.
    pub fn weather_cycle(&mut self, geo: &GeoLocation, weather: &WeatherSample) {
        let time = format_time_of_day(self.clock.time_of_day());
        for screen in weather_screens(&time, geo, weather) {
            self.show_for(&screen, SCREEN_DWELL_MS);
        }
    }
}
