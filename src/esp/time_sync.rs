use crate::config::NtpConfig;
use anyhow::Result;
use esp_idf_svc::sntp::{EspSntp, OperatingMode, SntpConf, SyncMode};

/// Starts the SNTP client. It syncs in the background once the station
/// link is up; the returned handle must stay alive for periodic re-sync.
/// Until then the clock screen shows time since boot.
pub fn start(ntp: &NtpConfig) -> Result<EspSntp<'static>> {
    if let Some(tz) = ntp.timezone.as_deref() {
        log::info!("Timezone {tz}");
        std::env::set_var("TZ", tz);
    }

    let conf = SntpConf {
        servers: core::array::from_fn(|_| ntp.server.as_str()),
        sync_mode: SyncMode::Immediate,
        operating_mode: OperatingMode::Poll,
    };
    log::info!("SNTP start, server {}", ntp.server);
    let sntp = EspSntp::new_with_callback(&conf, |_| log::info!("SNTP synced"))?;
    Ok(sntp)
}
