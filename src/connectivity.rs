//! WiFi station bring-up with escalating remedies.
//!
//! `ensure_connected` is cheap when the link is up and is called before
//! every network operation. When the link is down it makes up to
//! [`RetryPolicy::attempts`] bounded connect attempts, then one hard reset of
//! the radio followed by a final attempt with a longer timeout. Unbounded
//! retrying is left to the caller.

use crate::clock::Clock;
use crate::config::WifiConfig;
use crate::display::{Display, Screen};
use crate::lcd::CharDisplay;
use anyhow::Context;
use std::net::{IpAddr, ToSocketAddrs};

const DNS_PROBES: [(&str, u16); 2] = [("ip-api.com", 80), ("api.openweathermap.org", 443)];

/// Interface configuration as reported by the station interface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionState {
    pub is_connected: bool,
    pub ip: Option<String>,
    pub mask: Option<String>,
    pub gateway: Option<String>,
    pub dns: Option<String>,
}

pub trait Radio {
    fn is_active(&self) -> bool;
    fn set_active(&mut self, active: bool) -> anyhow::Result<()>;
    /// Start associating. Completion is observed through `is_connected`.
    fn connect(&mut self, ssid: &str, password: &str) -> anyhow::Result<()>;
    fn disconnect(&mut self) -> anyhow::Result<()>;
    /// Associated and holding an IP address.
    fn is_connected(&self) -> bool;
    fn state(&self) -> ConnectionState;

    fn resolve_host(&self, host: &str, port: u16) -> anyhow::Result<IpAddr> {
        (host, port)
            .to_socket_addrs()?
            .next()
            .map(|addr| addr.ip())
            .with_context(|| format!("no address for {host}"))
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub attempt_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub retry_pause_ms: u64,
    pub reset_pause_ms: u64,
    pub reset_timeout_ms: u64,
    pub settle_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            attempt_timeout_ms: 20_000,
            poll_interval_ms: 300,
            retry_pause_ms: 500,
            reset_pause_ms: 200,
            reset_timeout_ms: 25_000,
            settle_ms: 1_000,
        }
    }
}

pub struct ConnectivityManager<R, C> {
    radio: R,
    clock: C,
    ssid: String,
    password: String,
    policy: RetryPolicy,
}

impl<R: Radio, C: Clock> ConnectivityManager<R, C> {
    pub fn new(radio: R, clock: C, wifi: &WifiConfig) -> Self {
        Self::with_policy(radio, clock, wifi, RetryPolicy::default())
    }

    pub fn with_policy(radio: R, clock: C, wifi: &WifiConfig, policy: RetryPolicy) -> Self {
        Self {
            radio,
            clock,
            ssid: wifi.ssid.clone(),
            password: wifi.password.clone(),
            policy,
        }
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn is_connected(&self) -> bool {
        self.radio.is_connected()
    }

    pub fn state(&self) -> ConnectionState {
        self.radio.state()
    }

    /// Returns `false` only after every remedy in this call failed.
    pub fn ensure_connected<D: CharDisplay, DC: Clock>(
        &mut self,
        display: &mut Display<D, DC>,
    ) -> bool {
        if self.radio.is_connected() {
            return true;
        }

        for attempt in 1..=self.policy.attempts {
            log::info!("WiFi reconnect attempt {attempt}");
            if self.connect(display, self.policy.attempt_timeout_ms) {
                return true;
            }
            self.clock.sleep_ms(self.policy.retry_pause_ms);
        }

        self.hard_reset();
        self.connect(display, self.policy.reset_timeout_ms)
    }

    fn connect<D: CharDisplay, DC: Clock>(
        &mut self,
        display: &mut Display<D, DC>,
        timeout_ms: u64,
    ) -> bool {
        if !self.radio.is_active() {
            if let Err(err) = self.radio.set_active(true) {
                log::warn!("WiFi activate failed: {err:#}");
            }
        }
        if self.radio.is_connected() {
            return true;
        }

        log::info!("WiFi connect() -> ssid='{}'", self.ssid);
        if let Err(err) = self.radio.connect(&self.ssid, &self.password) {
            log::warn!("WiFi connect request failed: {err:#}");
            return false;
        }

        let start = self.clock.now_ms();
        while !self.radio.is_connected() {
            display.show(&Screen::wifi_wait());
            if self.clock.now_ms().saturating_sub(start) > timeout_ms {
                log::warn!("WiFi connect TIMEOUT");
                return false;
            }
            self.clock.sleep_ms(self.policy.poll_interval_ms);
        }

        self.on_fresh_connection();
        true
    }

    fn hard_reset(&mut self) {
        log::warn!("WiFi hard reset interface");
        let pause = self.policy.reset_pause_ms;
        if let Err(err) = self.radio.disconnect() {
            log::debug!("WiFi disconnect before reset: {err:#}");
        }
        self.clock.sleep_ms(pause);
        if let Err(err) = self.radio.set_active(false) {
            log::warn!("WiFi deactivate failed: {err:#}");
        }
        self.clock.sleep_ms(pause);
        if let Err(err) = self.radio.set_active(true) {
            log::warn!("WiFi activate failed: {err:#}");
        }
        self.clock.sleep_ms(pause);
    }

    /// Diagnostics only; nothing here can fail the connection.
    fn on_fresh_connection(&self) {
        let state = self.radio.state();
        log::info!(
            "WiFi connected, IP={}",
            state.ip.as_deref().unwrap_or("?")
        );
        log::info!(
            "IFCONFIG ip={} mask={} gw={} dns={}",
            state.ip.as_deref().unwrap_or("?"),
            state.mask.as_deref().unwrap_or("?"),
            state.gateway.as_deref().unwrap_or("?"),
            state.dns.as_deref().unwrap_or("?"),
        );

        self.clock.sleep_ms(self.policy.settle_ms);
        for (host, port) in DNS_PROBES {
            match self.radio.resolve_host(host, port) {
                Ok(ip) => log::info!("DNS OK {host} -> {ip}"),
                Err(err) => log::warn!("DNS FAIL {host} -> {err:#}"),
            }
        }
    }
}
