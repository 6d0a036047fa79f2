use crate::config::GeolocationConfig;
use crate::http::{get_json, lenient, FetchError, HttpClient, Numeric};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq)]
pub struct GeoLocation {
    pub lat: f64,
    pub lon: f64,
    pub city: Option<String>,
    pub country: Option<String>,
}

impl GeoLocation {
    /// `"<city> <country>"`, or `"Unknown"` when the city is missing.
    pub fn label(&self) -> String {
        let city = self.city.as_deref().filter(|city| !city.is_empty());
        let country = self.country.as_deref().unwrap_or_default();
        format!("{} {}", city.unwrap_or("Unknown"), country)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    #[serde(default, deserialize_with = "lenient")]
    lat: Option<Numeric>,
    #[serde(default, deserialize_with = "lenient")]
    lon: Option<Numeric>,
    #[serde(default, deserialize_with = "lenient")]
    city: Option<String>,
    #[serde(default, rename = "countryCode", deserialize_with = "lenient")]
    country_code: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    country: Option<String>,
}

impl TryFrom<IpApiResponse> for GeoLocation {
    type Error = FetchError;

    fn try_from(response: IpApiResponse) -> Result<Self, Self::Error> {
        let lat = response.lat.as_ref().and_then(Numeric::as_f64);
        let lon = response.lon.as_ref().and_then(Numeric::as_f64);
        let (Some(lat), Some(lon)) = (lat, lon) else {
            return Err(FetchError::Invalid("Missing lat/lon"));
        };
        let country = response
            .country_code
            .filter(|code| !code.is_empty())
            .or(response.country);
        Ok(GeoLocation {
            lat,
            lon,
            city: response.city,
            country,
        })
    }
}

/// IP geolocation with one fallback endpoint. The fallback is normally a
/// literal address so a broken resolver does not block the lookup.
pub struct GeoResolver {
    primary_url: String,
    fallback_url: String,
}

impl GeoResolver {
    pub fn new(config: &GeolocationConfig) -> Self {
        Self {
            primary_url: config.primary_url.clone(),
            fallback_url: config.fallback_url.clone(),
        }
    }

    pub fn resolve_location(&self, http: &mut impl HttpClient) -> Result<GeoLocation, FetchError> {
        let geo = match Self::fetch(http, &self.primary_url) {
            Ok(geo) => geo,
            Err(err) => {
                log::warn!("Geo primary failed: {err}");
                Self::fetch(http, &self.fallback_url)?
            }
        };
        log::info!(
            "GEO OK lat={} lon={} city={:?} country={:?}",
            geo.lat,
            geo.lon,
            geo.city,
            geo.country
        );
        Ok(geo)
    }

    fn fetch(http: &mut impl HttpClient, url: &str) -> Result<GeoLocation, FetchError> {
        get_json::<IpApiResponse>(http, url)?.try_into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::FetchErrorKind;
    use crate::testing::FakeHttp;

    const PRIMARY: &str = "http://ip-api.com/json/";
    const FALLBACK: &str = "http://208.95.112.1/json/";

    fn resolver() -> GeoResolver {
        GeoResolver::new(&GeolocationConfig::default())
    }

    #[test]
    fn primary_response_is_used() {
        let mut http = FakeHttp::new();
        http.respond(
            PRIMARY,
            200,
            r#"{"status":"success","lat":50.08,"lon":14.43,"city":"Prague","countryCode":"CZ","country":"Czechia"}"#,
        );

        let geo = resolver().resolve_location(&mut http).unwrap();
        assert_eq!(
            geo,
            GeoLocation {
                lat: 50.08,
                lon: 14.43,
                city: Some("Prague".into()),
                country: Some("CZ".into()),
            }
        );
        assert_eq!(http.requests(), vec![PRIMARY.to_string()]);
    }

    #[test]
    fn string_typed_coordinates_are_coerced() {
        let mut http = FakeHttp::new();
        http.respond(PRIMARY, 200, r#"{"lat":"50.08","lon":14.43}"#);

        let geo = resolver().resolve_location(&mut http).unwrap();
        assert_eq!(geo.lat, 50.08);
        assert_eq!(geo.lon, 14.43);
        assert_eq!(geo.city, None);
        assert_eq!(geo.country, None);
    }

    #[test]
    fn country_name_used_without_code() {
        let mut http = FakeHttp::new();
        http.respond(PRIMARY, 200, r#"{"lat":1,"lon":2,"country":"Czechia"}"#);
        let geo = resolver().resolve_location(&mut http).unwrap();
        assert_eq!(geo.country.as_deref(), Some("Czechia"));
    }

    #[test]
    fn network_failure_falls_back() {
        let mut http = FakeHttp::new();
        http.fail(PRIMARY, "dns lookup failed");
        http.respond(FALLBACK, 200, r#"{"lat":48.2,"lon":16.37,"city":"Vienna"}"#);

        let geo = resolver().resolve_location(&mut http).unwrap();
        assert_eq!(geo.city.as_deref(), Some("Vienna"));
        assert_eq!(http.requests(), vec![PRIMARY.to_string(), FALLBACK.to_string()]);
    }

    #[test]
    fn malformed_primary_falls_back() {
        let mut http = FakeHttp::new();
        http.respond(PRIMARY, 200, "not json");
        http.respond(FALLBACK, 200, r#"{"lat":1.5,"lon":2.5}"#);

        let geo = resolver().resolve_location(&mut http).unwrap();
        assert_eq!((geo.lat, geo.lon), (1.5, 2.5));
    }

    #[test]
    fn both_failing_reports_fallback_error() {
        let mut http = FakeHttp::new();
        http.respond(PRIMARY, 503, "");
        http.fail(FALLBACK, "timeout");

        let err = resolver().resolve_location(&mut http).unwrap_err();
        assert_eq!(err.kind(), FetchErrorKind::Network);
    }

    #[test]
    fn missing_coordinates_are_rejected() {
        let mut http = FakeHttp::new();
        let body = r#"{"status":"fail","message":"private range"}"#;
        http.respond(PRIMARY, 200, body);
        http.respond(FALLBACK, 200, body);

        let err = resolver().resolve_location(&mut http).unwrap_err();
        assert_eq!(err, FetchError::Invalid("Missing lat/lon"));
        assert_eq!(err.to_string(), "Missing lat/lon");
    }

    #[test]
    fn fallback_url_comes_from_config() {
        let config = GeolocationConfig {
            primary_url: PRIMARY.into(),
            fallback_url: "http://10.1.1.1/json/".into(),
        };
        let mut http = FakeHttp::new();
        http.fail(PRIMARY, "down");
        http.respond("http://10.1.1.1/json/", 200, r#"{"lat":0,"lon":0}"#);

        assert!(GeoResolver::new(&config).resolve_location(&mut http).is_ok());
    }

    #[test]
    fn label_joins_city_and_country() {
        let mut geo = GeoLocation {
            lat: 0.0,
            lon: 0.0,
            city: Some("Brno".into()),
            country: Some("CZ".into()),
        };
        assert_eq!(geo.label(), "Brno CZ");
        geo.country = None;
        assert_eq!(geo.label(), "Brno");
        geo.city = None;
        assert_eq!(geo.label(), "Unknown");
    }
}
