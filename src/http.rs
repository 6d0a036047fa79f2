use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

pub const HTTP_TIMEOUT_MS: u64 = 10_000;
const STATUS_OK: u16 = 200;

pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Blocking HTTP GET. Implementations bound each request by
/// [`HTTP_TIMEOUT_MS`]; transport failures come back as `Err`.
pub trait HttpClient {
    fn get(&mut self, url: &str) -> anyhow::Result<Response>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    NoData,
    BadResponse,
    Network,
}

/// Recoverable upstream failure. `Display` is short enough for the
/// second LCD line.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("No data")]
    NoData,
    #[error("HTTP {0}")]
    Status(u16),
    #[error("Bad JSON")]
    BadJson,
    #[error("{0}")]
    Invalid(&'static str),
    #[error("NET {0}")]
    Network(String),
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::NoData => FetchErrorKind::NoData,
            FetchError::Status(_) | FetchError::BadJson | FetchError::Invalid(_) => {
                FetchErrorKind::BadResponse
            }
            FetchError::Network(_) => FetchErrorKind::Network,
        }
    }
}

/// GET `url` and decode the body as JSON. A `null` body is `NoData`.
pub fn get_json<T: DeserializeOwned>(
    client: &mut impl HttpClient,
    url: &str,
) -> Result<T, FetchError> {
    log::info!("HTTP GET {}", redact_query(url));
    let response = client
        .get(url)
        .map_err(|err| FetchError::Network(format!("{err:#}")))?;
    log::info!("HTTP status {}", response.status);

    if response.status != STATUS_OK {
        return Err(FetchError::Status(response.status));
    }

    let body: Option<T> =
        serde_json::from_slice(&response.body).map_err(|_| FetchError::BadJson)?;
    body.ok_or(FetchError::NoData)
}

/// Masks the `appid` query parameter so API keys stay out of the log.
pub fn redact_query(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };
    let query = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some(("appid", _)) => "appid=***".to_string(),
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&");
    format!("{base}?{query}")
}

/// Number that may arrive as a JSON number or a numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Numeric::Number(value) => *value,
            Numeric::Text(text) => text.trim().parse().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

/// Field decoder that turns a present-but-mistyped value into `None`
/// instead of failing the whole document.
pub fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}
