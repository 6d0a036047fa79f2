use anyhow::Result;
use esp_idf_svc::sys::{esp, esp_vfs_spiffs_conf_t, esp_vfs_spiffs_register};

pub const MOUNT_POINT: &str = "/spiffs";
pub const CONFIG_PATH: &str = "/spiffs/CONFIGURATION.txt";
pub const LOG_PATH: &str = "/spiffs/log.txt";

const MAX_OPEN_FILES: usize = 4;

/// Registers the `storage` SPIFFS partition under [`MOUNT_POINT`] so the
/// std file API can reach it.
pub fn mount() -> Result<()> {
    let conf = esp_vfs_spiffs_conf_t {
        base_path: c"/spiffs".as_ptr(),
        partition_label: c"storage".as_ptr(),
        max_files: MAX_OPEN_FILES,
        format_if_mount_failed: false,
    };
    // SAFETY: `conf` and the C strings it points at outlive the call; the
    // VFS layer copies what it keeps.
    esp!(unsafe { esp_vfs_spiffs_register(&conf) })?;
    Ok(())
}
