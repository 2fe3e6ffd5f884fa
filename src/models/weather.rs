use serde::Serialize;

#[derive(Debug, Clone, PartialEq)]
pub struct GeoLocation {
    pub lat: f64,
    pub lon: f64,
    pub city: String,
    pub timezone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    pub temperature: i64,
    pub apparent_temperature: i64,
    pub weather_code: u8,
    pub description: String,
    pub icon: String,
    pub humidity: f64,
    pub wind_speed: i64,
    pub is_day: bool,
    pub location: String,
}

impl WeatherReport {
    /// Placeholder body for when the forecast call failed.
    pub fn unavailable(location: &str) -> Self {
        let (description, icon) = describe_code(u8::MAX);
        Self {
            temperature: 0,
            apparent_temperature: 0,
            weather_code: u8::MAX,
            description: description.to_string(),
            icon: icon.to_string(),
            humidity: 0.0,
            wind_speed: 0,
            is_day: true,
            location: location.to_string(),
        }
    }
}

/// WMO weather interpretation code to description and icon.
pub fn describe_code(code: u8) -> (&'static str, &'static str) {
    match code {
        0 => ("Clear sky", "☀️"),
        1 => ("Mainly clear", "🌤️"),
        2 => ("Partly cloudy", "⛅"),
        3 => ("Overcast", "☁️"),
        45 => ("Fog", "🌫️"),
        48 => ("Depositing rime fog", "🌫️"),
        51 => ("Light drizzle", "🌧️"),
        53 => ("Moderate drizzle", "🌧️"),
        55 => ("Dense drizzle", "🌧️"),
        56 => ("Light freezing drizzle", "🌨️"),
        57 => ("Dense freezing drizzle", "🌨️"),
        61 => ("Slight rain", "🌧️"),
        63 => ("Moderate rain", "🌧️"),
        65 => ("Heavy rain", "🌧️"),
        66 => ("Light freezing rain", "🌨️"),
        67 => ("Heavy freezing rain", "🌨️"),
        71 => ("Slight snow", "❄️"),
        73 => ("Moderate snow", "❄️"),
        75 => ("Heavy snow", "❄️"),
        77 => ("Snow grains", "❄️"),
        80 => ("Slight rain showers", "🌦️"),
        81 => ("Moderate rain showers", "🌦️"),
        82 => ("Violent rain showers", "⛈️"),
        85 => ("Slight snow showers", "🌨️"),
        86 => ("Heavy snow showers", "🌨️"),
        95 => ("Thunderstorm", "⛈️"),
        96 => ("Thunderstorm with slight hail", "⛈️"),
        99 => ("Thunderstorm with heavy hail", "⛈️"),
        _ => ("Unknown", "❓"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wmo_codes() {
        assert_eq!(describe_code(0), ("Clear sky", "☀️"));
        assert_eq!(describe_code(95).0, "Thunderstorm");
        assert_eq!(describe_code(42), ("Unknown", "❓"));
    }

    #[test]
    fn test_unavailable_report_serializes_camel_case() {
        let value = serde_json::to_value(WeatherReport::unavailable("Sydney")).unwrap();
        assert_eq!(value["description"], "Unknown");
        assert_eq!(value["location"], "Sydney");
        assert!(value.get("apparentTemperature").is_some());
        assert!(value.get("isDay").is_some());
    }
}
