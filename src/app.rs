//! Main control loop as an explicit state machine.
//!
//! One thread, strictly sequential. Each [`App::step`] runs one iteration of
//! the current [`Phase`]; [`App::run`] steps forever.

use crate::cadence::{Cadence, WEATHER_INTERVAL_MS};
use crate::clock::Clock;
use crate::config::Config;
use crate::connectivity::{ConnectivityManager, Radio};
use crate::display::{Display, Screen};
use crate::geo::{GeoLocation, GeoResolver};
use crate::http::HttpClient;
use crate::lcd::CharDisplay;
use crate::weather::{WeatherResolver, WeatherSample};

pub const GEO_RETRIES: u32 = 5;
pub const RETRY_PAUSE_MS: u64 = 2_000;
pub const IDLE_PAUSE_MS: u64 = 100;
const HALT_SLEEP_MS: u64 = 1_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// First connection after boot.
    Connecting,
    /// Bounded remedies exhausted; one `ensure_connected` per step until the
    /// link comes back.
    Offline,
    /// Geolocation; `attempt` 0 is the initial lookup, then retries.
    Locating { attempt: u32 },
    /// Geolocation retries exhausted. Left only once connectivity and a
    /// lookup both succeed.
    NoLocation,
    Running,
}

pub struct App<R, H, D, C> {
    clock: C,
    wifi: ConnectivityManager<R, C>,
    http: H,
    display: Display<D, C>,
    geo: GeoResolver,
    weather: WeatherResolver,
    phase: Phase,
    location: Option<GeoLocation>,
    last_weather: Option<WeatherSample>,
    cadence: Option<Cadence>,
    heartbeat: u64,
}

impl<R, H, D, C> App<R, H, D, C>
where
    R: Radio,
    H: HttpClient,
    D: CharDisplay,
    C: Clock + Clone,
{
    pub fn new(config: &Config, radio: R, http: H, display: Display<D, C>, clock: C) -> Self {
        Self {
            wifi: ConnectivityManager::new(radio, clock.clone(), &config.wifi),
            clock,
            http,
            display,
            geo: GeoResolver::new(&config.geolocation),
            weather: WeatherResolver::new(&config.weather),
            phase: Phase::Connecting,
            location: None,
            last_weather: None,
            cadence: None,
            heartbeat: 0,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn location(&self) -> Option<&GeoLocation> {
        self.location.as_ref()
    }

    pub fn last_weather(&self) -> Option<&WeatherSample> {
        self.last_weather.as_ref()
    }

    pub fn cadence(&self) -> Option<&Cadence> {
        self.cadence.as_ref()
    }

    pub fn heartbeat(&self) -> u64 {
        self.heartbeat
    }

    pub fn connectivity(&self) -> &ConnectivityManager<R, C> {
        &self.wifi
    }

    pub fn run(&mut self) -> ! {
        loop {
            self.step();
        }
    }

    pub fn step(&mut self) {
        match self.phase.clone() {
            Phase::Connecting => self.connecting(),
            Phase::Offline => self.offline(),
            Phase::Locating { attempt } => self.locating(attempt),
            Phase::NoLocation => self.no_location(),
            Phase::Running => self.running(),
        }
    }

    fn enter(&mut self, phase: Phase) {
        if self.phase != phase {
            log::debug!("phase {:?} -> {:?}", self.phase, phase);
        }
        self.phase = phase;
    }

    fn after_connect(&self) -> Phase {
        if self.location.is_some() {
            Phase::Running
        } else {
            Phase::Locating { attempt: 0 }
        }
    }

    fn connecting(&mut self) {
        self.display.show(&Screen::connecting());
        if self.wifi.ensure_connected(&mut self.display) {
            let next = self.after_connect();
            self.enter(next);
        } else {
            self.display.show_error("WiFi failed");
            self.enter(Phase::Offline);
        }
    }

    fn offline(&mut self) {
        if self.wifi.ensure_connected(&mut self.display) {
            log::info!("WiFi recovered");
            let next = self.after_connect();
            self.enter(next);
        } else {
            self.clock.sleep_ms(RETRY_PAUSE_MS);
        }
    }

    fn locating(&mut self, attempt: u32) {
        if attempt > 0 {
            log::info!("Geo retry {attempt}");
            self.clock.sleep_ms(RETRY_PAUSE_MS);
        }

        match self.geo.resolve_location(&mut self.http) {
            Ok(geo) => self.located(geo),
            Err(err) => {
                if attempt == 0 {
                    self.display.show_error(&err.to_string());
                } else {
                    log::warn!("Geo retry {attempt} failed: {err}");
                }
                if attempt >= GEO_RETRIES {
                    self.enter(Phase::NoLocation);
                } else {
                    self.enter(Phase::Locating {
                        attempt: attempt + 1,
                    });
                }
            }
        }
    }

    fn no_location(&mut self) {
        self.display.show_error("No GEO data");
        let connected = self.wifi.ensure_connected(&mut self.display);
        self.clock.sleep_ms(RETRY_PAUSE_MS);
        if !connected {
            return;
        }
        match self.geo.resolve_location(&mut self.http) {
            Ok(geo) => {
                log::info!("Geolocation recovered");
                self.located(geo);
            }
            Err(err) => log::warn!("Geolocation still failing: {err}"),
        }
    }

    fn located(&mut self, geo: GeoLocation) {
        self.display.show_coordinates(&geo);
        self.location = Some(geo);
        if self.cadence.is_none() {
            self.cadence = Some(Cadence::starting_at(
                self.clock.now_ms(),
                WEATHER_INTERVAL_MS,
            ));
        }
        self.enter(Phase::Running);
    }

    fn running(&mut self) {
        self.wifi.ensure_connected(&mut self.display);
        self.poll_weather();

        match (&self.location, &self.last_weather) {
            (Some(geo), Some(weather)) if self.display.is_attached() => {
                self.display.weather_cycle(geo, weather);
            }
            _ => {
                self.heartbeat += 1;
                self.display.show_heartbeat(self.heartbeat);
            }
        }

        self.clock.sleep_ms(IDLE_PAUSE_MS);
    }

    /// At most one fetch per interval. The deadline advances after every
    /// attempt, successful or not.
    fn poll_weather(&mut self) {
        let Some(geo) = self.location.as_ref() else {
            return;
        };
        let (lat, lon) = (geo.lat, geo.lon);
        let due = self
            .cadence
            .as_ref()
            .is_some_and(|cadence| cadence.is_due(self.clock.now_ms()));
        if !due {
            return;
        }

        log::info!("Weather fetch start");
        match self.weather.resolve_weather(&mut self.http, lat, lon) {
            Ok(sample) => self.last_weather = Some(sample),
            Err(err) => {
                log::warn!("Weather fetch failed: {err}");
                if self.last_weather.is_some() {
                    self.display.show_cached_notice();
                } else {
                    self.display.show_error(&err.to_string());
                }
            }
        }

        let now = self.clock.now_ms();
        if let Some(cadence) = self.cadence.as_mut() {
            cadence.advance(now);
            log::info!("Next fetch in {}min", cadence.interval_ms() / 60_000);
        }
    }
}

/// Fail-safe halt: park forever, waiting for an external reset.
pub fn halt(clock: &impl Clock) -> ! {
    loop {
        clock.sleep_ms(HALT_SLEEP_MS);
    }
}
