use crate::connectivity::{ConnectionState, Radio};
use anyhow::{anyhow, Result};
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::modem::Modem,
    nvs::EspDefaultNvsPartition,
    wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi, WifiDeviceId},
};
use std::net::Ipv4Addr;

/// Station-mode WiFi driver.
pub struct EspRadio {
    mac_address: [u8; 6],
    wifi: EspWifi<'static>,
}

impl EspRadio {
    pub fn new(event_loop: EspSystemEventLoop, modem: Modem) -> Result<Self> {
        log::info!("Creating wifi");
        let wifi = EspWifi::new(modem, event_loop, Some(EspDefaultNvsPartition::take()?))?;
        let mac_address = wifi.get_mac(WifiDeviceId::Sta)?;
        log::info!("WiFi MAC {}", format_mac(&mac_address));

        Ok(Self { mac_address, wifi })
    }

    pub fn mac_address(&self) -> [u8; 6] {
        self.mac_address
    }
}

fn format_mac(mac: &[u8; 6]) -> String {
    mac.iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

fn prefix_to_mask(prefix: u8) -> Ipv4Addr {
    let bits = u32::MAX
        .checked_shl(32 - u32::from(prefix.min(32)))
        .unwrap_or(0);
    Ipv4Addr::from(bits)
}

fn client_configuration(ssid: &str, password: &str) -> Result<Configuration> {
    let auth_method = if password.is_empty() {
        AuthMethod::None
    } else {
        AuthMethod::WPA2Personal
    };
    Ok(Configuration::Client(ClientConfiguration {
        ssid: heapless::String::try_from(ssid).map_err(|_| anyhow!("SSID too long"))?,
        password: heapless::String::try_from(password)
            .map_err(|_| anyhow!("WiFi password too long"))?,
        auth_method,
        channel: None,
        ..Default::default()
    }))
}

impl Radio for EspRadio {
    fn is_active(&self) -> bool {
        self.wifi.is_started().unwrap_or(false)
    }

    fn set_active(&mut self, active: bool) -> Result<()> {
        if active {
            if !self.is_active() {
                // The driver refuses to start without a mode.
                self.wifi
                    .set_configuration(&Configuration::Client(ClientConfiguration::default()))?;
            }
            self.wifi.start()?;
        } else {
            self.wifi.stop()?;
        }
        Ok(())
    }

    fn connect(&mut self, ssid: &str, password: &str) -> Result<()> {
        if let Err(err) = self.wifi.disconnect() {
            log::debug!("WiFi disconnect before connect: {err}");
        }
        self.wifi
            .set_configuration(&client_configuration(ssid, password)?)?;
        self.wifi.connect()?;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        self.wifi.disconnect()?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.wifi.is_up().unwrap_or(false)
    }

    fn state(&self) -> ConnectionState {
        let is_connected = self.is_connected();
        match self.wifi.sta_netif().get_ip_info() {
            Ok(info) => ConnectionState {
                is_connected,
                ip: Some(info.ip.to_string()),
                mask: Some(prefix_to_mask(info.subnet.mask.0).to_string()),
                gateway: Some(info.subnet.gateway.to_string()),
                dns: info.dns.map(|dns| dns.to_string()),
            },
            Err(err) => {
                log::debug!("get_ip_info failed: {err}");
                ConnectionState {
                    is_connected,
                    ..Default::default()
                }
            }
        }
    }
}
