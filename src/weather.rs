use crate::config::WeatherApiConfig;
use crate::http::{get_json, lenient, FetchError, HttpClient, Numeric};
use serde::Deserialize;

const OWM_CURRENT_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Current conditions in metric units.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSample {
    pub temp: f64,
    pub humidity: Option<i32>,
    pub pressure: Option<i32>,
    pub wind_speed: Option<f64>,
    pub description: String,
}

// ── OWM JSON structures ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct OwmCurrentRoot {
    #[serde(default, deserialize_with = "lenient")]
    main: Option<OwmMain>,
    #[serde(default, deserialize_with = "lenient")]
    wind: Option<OwmWind>,
    #[serde(default, deserialize_with = "lenient")]
    weather: Option<Vec<OwmCondition>>,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    #[serde(default, deserialize_with = "lenient")]
    temp: Option<Numeric>,
    #[serde(default, deserialize_with = "lenient")]
    humidity: Option<Numeric>,
    #[serde(default, deserialize_with = "lenient")]
    pressure: Option<Numeric>,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    #[serde(default, deserialize_with = "lenient")]
    speed: Option<Numeric>,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    #[serde(default, deserialize_with = "lenient")]
    description: Option<String>,
}

fn number(field: &Option<Numeric>) -> Option<f64> {
    field.as_ref().and_then(Numeric::as_f64)
}

impl TryFrom<OwmCurrentRoot> for WeatherSample {
    type Error = FetchError;

    fn try_from(root: OwmCurrentRoot) -> Result<Self, Self::Error> {
        let main = root.main;
        let temp = main
            .as_ref()
            .and_then(|main| number(&main.temp))
            .ok_or(FetchError::Invalid("Bad temp"))?;
        let humidity = main.as_ref().and_then(|main| number(&main.humidity));
        let pressure = main.as_ref().and_then(|main| number(&main.pressure));
        let wind_speed = root.wind.and_then(|wind| number(&wind.speed));
        let description = root
            .weather
            .and_then(|conditions| conditions.into_iter().next())
            .and_then(|condition| condition.description)
            .unwrap_or_default();

        Ok(WeatherSample {
            temp,
            humidity: humidity.map(|value| value as i32),
            pressure: pressure.map(|value| value as i32),
            wind_speed,
            description,
        })
    }
}

/// OpenWeatherMap current-weather client. One request per call; retry
/// pacing belongs to the caller.
pub struct WeatherResolver {
    base_url: String,
    api_key: String,
    lang: String,
}

impl WeatherResolver {
    pub fn new(config: &WeatherApiConfig) -> Self {
        Self {
            base_url: OWM_CURRENT_URL.to_string(),
            api_key: config.api_key.clone(),
            lang: config.lang.clone(),
        }
    }

    pub fn url(&self, lat: f64, lon: f64) -> String {
        format!(
            "{}?lat={}&lon={}&appid={}&units=metric&lang={}",
            self.base_url, lat, lon, self.api_key, self.lang
        )
    }

    pub fn resolve_weather(
        &self,
        http: &mut impl HttpClient,
        lat: f64,
        lon: f64,
    ) -> Result<WeatherSample, FetchError> {
        let root: OwmCurrentRoot = get_json(http, &self.url(lat, lon))?;
        let sample = WeatherSample::try_from(root)?;
        log::info!(
            "WEATHER OK temp={} desc='{}'",
            sample.temp,
            sample.description
        );
        Ok(sample)
    }
}
