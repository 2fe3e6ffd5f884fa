use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Unix timestamps below this value (2000-01-01 in milliseconds) are in seconds.
const MILLIS_CUTOFF: i64 = 946_684_800_000;

/// A location sample as Dawarich sends it. Coordinates may arrive as numbers or strings.
#[derive(Debug, Deserialize)]
pub struct RawPoint {
    #[serde(default, deserialize_with = "parse_f64_option")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "parse_f64_option")]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default, deserialize_with = "parse_f64_option")]
    pub velocity: Option<f64>,
    #[serde(default, deserialize_with = "parse_f64_option")]
    pub altitude: Option<f64>,
    #[serde(default, deserialize_with = "parse_f64_option")]
    pub accuracy: Option<f64>,
    #[serde(default, deserialize_with = "parse_f64_option")]
    pub battery: Option<f64>,
}

/// `/api/v1/points` answers either with a bare array or `{ "data": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PointsResponse {
    Wrapped { data: Vec<RawPoint> },
    Bare(Vec<RawPoint>),
}

impl PointsResponse {
    pub fn into_points(self) -> Vec<RawPoint> {
        match self {
            PointsResponse::Wrapped { data } => data,
            PointsResponse::Bare(points) => points,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    pub velocity: Option<f64>,
    pub altitude: Option<f64>,
    pub accuracy: Option<f64>,
    pub battery: Option<f64>,
}

impl GpsPoint {
    pub fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            timestamp,
            velocity: None,
            altitude: None,
            accuracy: None,
            battery: None,
        }
    }

    /// Returns `None` when the sample lacks a usable position or time.
    pub fn from_raw(raw: &RawPoint) -> Option<Self> {
        let (Some(latitude), Some(longitude)) = (raw.latitude, raw.longitude) else {
            return None;
        };
        let timestamp = raw.timestamp.as_ref().and_then(parse_timestamp)?;

        Some(Self {
            latitude,
            longitude,
            timestamp,
            velocity: raw.velocity,
            altitude: raw.altitude,
            accuracy: raw.accuracy,
            battery: raw.battery,
        })
    }
}

/// Accepts unix seconds, unix milliseconds, numeric strings of either, or RFC 3339.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(from_unix),
        Value::String(s) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(n) => from_unix(n),
                Err(_) => DateTime::parse_from_rfc3339(s)
                    .ok()
                    .map(|t| t.with_timezone(&Utc)),
            }
        }
        _ => None,
    }
}

fn from_unix(n: i64) -> Option<DateTime<Utc>> {
    let millis = if n < MILLIS_CUTOFF { n.checked_mul(1000)? } else { n };
    Utc.timestamp_millis_opt(millis).single()
}

fn parse_f64_option<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrFloat {
        String(String),
        Float(f64),
    }

    let v: Option<StringOrFloat> = Option::deserialize(deserializer)?;
    match v {
        Some(StringOrFloat::Float(f)) => Ok(Some(f)),
        // Unparseable strings are treated as missing; the point is dropped later.
        Some(StringOrFloat::String(s)) => Ok(s.trim().parse::<f64>().ok()),
        None => Ok(None),
    }
}
