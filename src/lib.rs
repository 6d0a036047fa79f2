//! Weather station firmware: WiFi, IP geolocation, OpenWeatherMap polling
//! and a two-line character LCD.
//!
//! Everything outside [`esp`] is hardware independent and talks to the
//! device through the [`clock::Clock`], [`connectivity::Radio`],
//! [`http::HttpClient`] and [`lcd::CharDisplay`] traits.

pub mod app;
pub mod cadence;
pub mod clock;
pub mod config;
pub mod connectivity;
pub mod display;
pub mod geo;
pub mod http;
pub mod lcd;
pub mod logger;
pub mod weather;

#[cfg(target_os = "espidf")]
pub mod esp;

#[cfg(test)]
mod testing;
