use std::net::IpAddr;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::{UpstreamError, UpstreamResult};
use crate::models::weather::{describe_code, GeoLocation, WeatherReport};
use crate::upstream::endpoints::{IP_API_FIELDS, OPEN_METEO_CURRENT_FIELDS};
use crate::upstream::ensure_success;

pub const PROVIDER: &str = "open-meteo";

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: CurrentConditions,
}

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    temperature_2m: f64,
    apparent_temperature: f64,
    weather_code: u8,
    relative_humidity_2m: f64,
    wind_speed_10m: f64,
    is_day: u8,
}

/// Loopback, private and link-local addresses cannot be geolocated.
/// Anything that does not parse as an IP is treated the same way.
pub fn is_private_ip(ip: &str) -> bool {
    match ip.trim().parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => v4.is_private() || v4.is_loopback() || v4.is_link_local() || v4.is_unspecified(),
        Ok(IpAddr::V6(v6)) => {
            let first = v6.segments()[0];
            v6.is_loopback() || v6.is_unspecified() || (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80
        }
        Err(_) => true,
    }
}

pub struct WeatherClient {
    http: Client,
    open_meteo_url: String,
    ip_api_url: String,
    lookup_timeout: Duration,
    default_location: GeoLocation,
}

impl WeatherClient {
    pub fn new(
        http: Client,
        open_meteo_url: impl Into<String>,
        ip_api_url: impl Into<String>,
        lookup_timeout: Duration,
        default_location: GeoLocation,
    ) -> Self {
        Self {
            http,
            open_meteo_url: open_meteo_url.into(),
            ip_api_url: ip_api_url.into(),
            lookup_timeout,
            default_location,
        }
    }

    pub fn from_config(http: Client, config: &AppConfig) -> Self {
        Self::new(
            http,
            config.open_meteo_url.clone(),
            config.ip_api_url.clone(),
            config.lookup_timeout,
            GeoLocation {
                lat: config.weather_default_lat,
                lon: config.weather_default_lon,
                city: config.weather_default_city.clone(),
                timezone: config.weather_default_timezone.clone(),
            },
        )
    }

    pub fn default_location(&self) -> &GeoLocation {
        &self.default_location
    }

    /// Best-effort IP lookup. Every failure, including the timeout, yields `None`.
    pub async fn geolocate(&self, ip: &str) -> Option<GeoLocation> {
        if is_private_ip(ip) {
            debug!("Skipping geolocation for private address {}", ip);
            return None;
        }

        let response = self
            .http
            .get(format!("{}/{}", self.ip_api_url, urlencoding::encode(ip.trim())))
            .query(&[("fields", IP_API_FIELDS)])
            .timeout(self.lookup_timeout)
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            return None;
        }

        let body: IpApiResponse = response.json().await.ok()?;
        if body.status != "success" {
            debug!("ip-api could not locate {}", ip);
            return None;
        }

        let location = GeoLocation {
            lat: body.lat?,
            lon: body.lon?,
            city: body.city.unwrap_or_else(|| self.default_location.city.clone()),
            timezone: body.timezone.unwrap_or_else(|| self.default_location.timezone.clone()),
        };
        info!(
            "Geolocated to {}, {}",
            location.city,
            body.country.as_deref().unwrap_or("?")
        );
        Some(location)
    }

    pub async fn fetch_current(&self, location: &GeoLocation) -> UpstreamResult<WeatherReport> {
        debug!("Fetching weather for {} ({}, {})", location.city, location.lat, location.lon);

        let response = self
            .http
            .get(&self.open_meteo_url)
            .query(&[
                ("latitude", location.lat.to_string()),
                ("longitude", location.lon.to_string()),
                ("current", OPEN_METEO_CURRENT_FIELDS.to_string()),
                ("timezone", location.timezone.clone()),
            ])
            .send()
            .await
            .map_err(UpstreamError::unreachable(PROVIDER))?;

        let response = ensure_success(PROVIDER, response).await?;
        let forecast: ForecastResponse = response.json().await.map_err(UpstreamError::decode(PROVIDER))?;
        let current = forecast.current;
        let (description, icon) = describe_code(current.weather_code);

        Ok(WeatherReport {
            temperature: current.temperature_2m.round() as i64,
            apparent_temperature: current.apparent_temperature.round() as i64,
            weather_code: current.weather_code,
            description: description.to_string(),
            icon: icon.to_string(),
            humidity: current.relative_humidity_2m,
            wind_speed: current.wind_speed_10m.round() as i64,
            is_day: current.is_day == 1,
            location: location.city.clone(),
        })
    }

    /// Weather at the caller's location when it can be resolved, otherwise at
    /// the configured default.
    pub async fn fetch_for_client(&self, client_ip: Option<&str>) -> UpstreamResult<WeatherReport> {
        let located = match client_ip {
            Some(ip) => {
                info!("Detected client IP: {}", ip);
                self.geolocate(ip).await
            }
            None => None,
        };

        let location = located.as_ref().unwrap_or(&self.default_location);
        self.fetch_current(location).await
    }
}
