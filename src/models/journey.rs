use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopLabel {
    Start,
    Stop,
    End,
    Now,
}

impl StopLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            StopLabel::Start => "START",
            StopLabel::Stop => "STOP",
            StopLabel::End => "END",
            StopLabel::Now => "NOW",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            StopLabel::Start => "home",
            _ => "pin",
        }
    }
}

/// `location` is a free string so mock payloads can carry place names.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyStop {
    pub time: String,
    pub location: String,
    pub icon: String,
    pub lat: f64,
    pub lon: f64,
    pub is_current: bool,
}

impl JourneyStop {
    pub fn labeled(time: String, label: StopLabel, lat: f64, lon: f64, is_current: bool) -> Self {
        Self {
            time,
            location: label.as_str().to_string(),
            icon: label.icon().to_string(),
            lat,
            lon,
            is_current,
        }
    }

    pub fn mock(time: &str, location: &str, icon: &str, is_current: bool) -> Self {
        Self {
            time: time.to_string(),
            location: location.to_string(),
            icon: icon.to_string(),
            lat: 0.0,
            lon: 0.0,
            is_current,
        }
    }

    pub fn is_labeled(&self, label: StopLabel) -> bool {
        self.location == label.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackPoint {
    pub lat: f64,
    pub lon: f64,
    pub time: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyStats {
    pub total_distance: f64,
    pub stop_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point_count: Option<usize>,
}

/// Response body of the journey endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct Journey {
    pub data: Vec<JourneyStop>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track: Option<Vec<TrackPoint>>,
    pub bounds: Option<Bounds>,
    pub stats: JourneyStats,
}

impl Journey {
    /// Shown when no Dawarich key is configured.
    pub fn demo() -> Self {
        Self {
            data: vec![
                JourneyStop::mock("09:23", "HOME", "home", false),
                JourneyStop::mock("10:15", "CAFE", "coffee", false),
                JourneyStop::mock("12:20", "PARK", "park", false),
                JourneyStop::mock("13:25", "NOW", "pin", true),
            ],
            track: None,
            bounds: None,
            stats: JourneyStats {
                total_distance: 9.2,
                stop_count: 3,
                point_count: None,
            },
        }
    }

    /// Shown when Dawarich is configured but the call failed.
    pub fn unavailable() -> Self {
        Self {
            data: vec![
                JourneyStop::mock("09:23", "HOME", "home", false),
                JourneyStop::mock("13:25", "NOW", "pin", true),
            ],
            track: None,
            bounds: None,
            stats: JourneyStats {
                total_distance: 0.0,
                stop_count: 1,
                point_count: None,
            },
        }
    }
}
