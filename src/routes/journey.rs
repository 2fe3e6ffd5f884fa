use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::info;

use crate::error::{UpstreamError, UpstreamResult};
use crate::fallback::{fetch_with_fallback, Envelope};
use crate::models::journey::Journey;
use crate::processor::stop_clustering::summarize;
use crate::routes::{parse_day, today_in};
use crate::state::AppState;
use crate::upstream::dawarich;

#[derive(Debug, Default, Deserialize)]
pub struct JourneyQuery {
    pub date: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Whole local days `[first 00:00, last 23:59:59.999]` expressed in UTC.
#[derive(Debug, PartialEq)]
pub struct DayRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub is_today: bool,
}

fn local_instant(tz: Tz, day: NaiveDate, time: NaiveTime) -> UpstreamResult<DateTime<Utc>> {
    tz.from_local_datetime(&day.and_time(time))
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| UpstreamError::InvalidQuery(format!("{} does not exist in {}", day, tz)))
}

/// `from`+`to` wins over `date`; with neither, the range is today.
pub fn resolve_range(query: &JourneyQuery, tz: Tz, today: NaiveDate) -> UpstreamResult<DayRange> {
    let (first, last) = match (&query.from, &query.to, &query.date) {
        (Some(from), Some(to), _) => (parse_day(from)?, parse_day(to)?),
        (_, _, Some(date)) => {
            let day = parse_day(date)?;
            (day, day)
        }
        _ => (today, today),
    };

    if first > last {
        return Err(UpstreamError::InvalidQuery(format!("range starts after it ends: {} > {}", first, last)));
    }

    let end_of_day = NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
        .ok_or_else(|| UpstreamError::InvalidQuery("end of day".to_string()))?;

    Ok(DayRange {
        start: local_instant(tz, first, NaiveTime::MIN)?,
        end: local_instant(tz, last, end_of_day)?,
        is_today: first == today,
    })
}

pub async fn get_journey(
    State(state): State<Arc<AppState>>,
    Query(query): Query<JourneyQuery>,
) -> Json<Envelope<Journey>> {
    let tz = state.config.display_timezone;

    let primary = async {
        let range = resolve_range(&query, tz, today_in(tz))?;
        let points = state.dawarich.fetch_points(range.start, range.end).await?;
        info!("Dawarich returned {} points", points.len());
        Ok::<_, UpstreamError>(summarize(points, range.is_today, tz))
    };

    let envelope = fetch_with_fallback(dawarich::PROVIDER, primary, |e| {
        if e.is_not_configured() {
            Journey::demo()
        } else {
            Journey::unavailable()
        }
    })
    .await;

    Json(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{get, router_with};
    use axum::http::StatusCode;
    use chrono_tz::Australia::Sydney;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_range_is_today_in_display_timezone() {
        let today = day(2025, 3, 1);
        let range = resolve_range(&JourneyQuery::default(), Sydney, today).unwrap();

        // Sydney is UTC+11 in March
        assert_eq!(range.start.to_rfc3339(), "2025-02-28T13:00:00+00:00");
        assert_eq!(range.end.timestamp_millis() - range.start.timestamp_millis(), 86_400_000 - 1);
        assert!(range.is_today);
    }

    #[test]
    fn test_explicit_range_and_date() {
        let today = day(2025, 3, 10);

        let query = JourneyQuery {
            from: Some("2025-03-01".to_string()),
            to: Some("2025-03-03".to_string()),
            date: Some("2025-01-01".to_string()),
        };
        let range = resolve_range(&query, Sydney, today).unwrap();
        assert_eq!(range.start.with_timezone(&Sydney).date_naive(), day(2025, 3, 1));
        assert_eq!(range.end.with_timezone(&Sydney).date_naive(), day(2025, 3, 3));
        assert!(!range.is_today);

        let query = JourneyQuery {
            date: Some("2025-03-10".to_string()),
            ..Default::default()
        };
        assert!(resolve_range(&query, Sydney, today).unwrap().is_today);
    }

    #[test]
    fn test_invalid_dates_are_rejected() {
        let today = day(2025, 3, 10);
        let bad = JourneyQuery {
            date: Some("yesterday".to_string()),
            ..Default::default()
        };
        assert!(matches!(resolve_range(&bad, Sydney, today), Err(UpstreamError::InvalidQuery(_))));

        let reversed = JourneyQuery {
            from: Some("2025-03-05".to_string()),
            to: Some("2025-03-01".to_string()),
            date: None,
        };
        assert!(resolve_range(&reversed, Sydney, today).is_err());
    }

    #[tokio::test]
    async fn test_unconfigured_serves_demo_journey() {
        let (status, body) = get(router_with(&[]), "/api/dawarich").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["source"], "mock");
        assert_eq!(body["data"].as_array().unwrap().len(), 4);
        assert_eq!(body["stats"]["totalDistance"], 9.2);
        assert_eq!(body["stats"]["stopCount"], 3);
        assert!(body["bounds"].is_null());
    }

    #[tokio::test]
    async fn test_invalid_date_serves_error_fallback() {
        let router = router_with(&[("DAWARICH_API_KEY", "key")]);
        let (status, body) = get(router, "/api/dawarich?date=nope").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(body["source"], "mock");
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
        assert_eq!(body["stats"]["stopCount"], 1);
        assert!(body["error"].as_str().unwrap().contains("invalid date"));
    }

    #[tokio::test]
    async fn test_live_journey() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/points"))
            .and(query_param("start_at", "2025-02-28T13:00:00.000Z"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [
                { "latitude": -33.8688, "longitude": 151.2093, "timestamp": 1740805200 },
                { "latitude": -33.9000, "longitude": 151.2400, "timestamp": 1740808800 }
            ] })))
            .mount(&server)
            .await;

        let uri = server.uri();
        let router = router_with(&[("DAWARICH_URL", uri.as_str()), ("DAWARICH_API_KEY", "key")]);
        let (status, body) = get(router, "/api/dawarich?date=2025-03-01").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["source"], "dawarich");
        assert_eq!(body["data"][0]["location"], "START");
        assert_eq!(body["data"][1]["location"], "END");
        assert_eq!(body["data"][1]["isCurrent"], true);
        assert_eq!(body["stats"]["pointCount"], 2);
        assert_eq!(body["track"].as_array().unwrap().len(), 2);
        assert!(body["bounds"]["minLat"].is_number());
    }

    #[tokio::test]
    async fn test_upstream_failure_serves_unavailable_journey() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let uri = server.uri();
        let router = router_with(&[("DAWARICH_URL", uri.as_str()), ("DAWARICH_API_KEY", "key")]);
        let (_, body) = get(router, "/api/dawarich").await;

        assert_eq!(body["success"], false);
        assert_eq!(body["stats"]["totalDistance"], 0.0);
        assert_eq!(body["error"], "dawarich API error: 500");
    }
}
