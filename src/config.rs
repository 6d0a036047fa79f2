use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_GEO_PRIMARY_URL: &str = "http://ip-api.com/json/";
pub const DEFAULT_GEO_FALLBACK_URL: &str = "http://208.95.112.1/json/";
const DEFAULT_WEATHER_LANG: &str = "cs";

const DEFAULT_LCD_BUS_ID: u8 = 0;
const DEFAULT_LCD_SDA_PIN: i32 = 0;
const DEFAULT_LCD_SCL_PIN: i32 = 1;
const DEFAULT_LCD_COLS: usize = 16;
const DEFAULT_LCD_ROWS: usize = 2;
const MAX_LCD_COLS: usize = 40;
const MAX_LCD_ROWS: usize = 4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Device configuration, loaded once at boot and never mutated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub wifi: WifiConfig,
    #[serde(default, rename = "openweathermap")]
    pub weather: WeatherApiConfig,
    #[serde(default)]
    pub lcd: LcdConfig,
    #[serde(default)]
    pub geolocation: GeolocationConfig,
    #[serde(default)]
    pub ntp: Option<NtpConfig>,
}

/// Missing credentials decode as empty strings; the connect attempt
/// then fails and surfaces the problem on the display.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WifiConfig {
    #[serde(default)]
    pub ssid: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherApiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_weather_lang")]
    pub lang: String,
}

impl Default for WeatherApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            lang: default_weather_lang(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LcdConfig {
    #[serde(default = "default_lcd_bus_id", rename = "i2c_id")]
    pub bus_id: u8,
    #[serde(default = "default_lcd_sda_pin")]
    pub sda_pin: i32,
    #[serde(default = "default_lcd_scl_pin")]
    pub scl_pin: i32,
    #[serde(default = "default_lcd_cols")]
    pub cols: usize,
    #[serde(default = "default_lcd_rows")]
    pub rows: usize,
    #[serde(default)]
    pub i2c_address: Option<u8>,
}

impl Default for LcdConfig {
    fn default() -> Self {
        Self {
            bus_id: DEFAULT_LCD_BUS_ID,
            sda_pin: DEFAULT_LCD_SDA_PIN,
            scl_pin: DEFAULT_LCD_SCL_PIN,
            cols: DEFAULT_LCD_COLS,
            rows: DEFAULT_LCD_ROWS,
            i2c_address: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeolocationConfig {
    #[serde(default = "default_geo_primary_url")]
    pub primary_url: String,
    #[serde(default = "default_geo_fallback_url")]
    pub fallback_url: String,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            primary_url: default_geo_primary_url(),
            fallback_url: default_geo_fallback_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NtpConfig {
    pub server: String,
    #[serde(default)]
    pub timezone: Option<String>,
}

fn default_weather_lang() -> String {
    DEFAULT_WEATHER_LANG.to_string()
}

fn default_lcd_bus_id() -> u8 {
    DEFAULT_LCD_BUS_ID
}

fn default_lcd_sda_pin() -> i32 {
    DEFAULT_LCD_SDA_PIN
}

fn default_lcd_scl_pin() -> i32 {
    DEFAULT_LCD_SCL_PIN
}

fn default_lcd_cols() -> usize {
    DEFAULT_LCD_COLS
}

fn default_lcd_rows() -> usize {
    DEFAULT_LCD_ROWS
}

fn default_geo_primary_url() -> String {
    DEFAULT_GEO_PRIMARY_URL.to_string()
}

fn default_geo_fallback_url() -> String {
    DEFAULT_GEO_FALLBACK_URL.to_string()
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_LCD_COLS).contains(&self.lcd.cols) {
            return Err(ConfigError::Invalid(format!(
                "lcd.cols must be 1..={MAX_LCD_COLS}, got {}",
                self.lcd.cols
            )));
        }
        if !(1..=MAX_LCD_ROWS).contains(&self.lcd.rows) {
            return Err(ConfigError::Invalid(format!(
                "lcd.rows must be 1..={MAX_LCD_ROWS}, got {}",
                self.lcd.rows
            )));
        }
        Ok(())
    }

    /// One-line summary for the boot log. Secrets are reduced to lengths.
    pub fn summary(&self) -> String {
        format!(
            "ssid='{}' pass=<{} chars> api_key=<{} chars> i2c_id={} sda={} scl={} cols={} rows={}",
            self.wifi.ssid,
            self.wifi.password.len(),
            self.weather.api_key.len(),
            self.lcd.bus_id,
            self.lcd.sda_pin,
            self.lcd.scl_pin,
            self.lcd.cols,
            self.lcd.rows,
        )
    }
}
