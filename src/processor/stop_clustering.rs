//! Turns a day of GPS samples into a short timeline of stops.
//!
//! A stop is a place where the tracker stayed within [`STAY_RADIUS_METERS`] of a
//! fixed anchor point for at least [`STAY_MIN_MINUTES`]. The anchor does not
//! move while points remain inside the radius.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

use crate::models::journey::{Bounds, Journey, JourneyStats, JourneyStop, StopLabel, TrackPoint};
use crate::models::point::GpsPoint;

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;
pub const STAY_RADIUS_METERS: f64 = 100.0;
pub const STAY_MIN_MINUTES: i64 = 5;

/// Great-circle distance in meters on a spherical Earth.
pub fn haversine_m(a: &GpsPoint, b: &GpsPoint) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Path length in kilometers, rounded to one decimal.
pub fn total_distance_km(points: &[GpsPoint]) -> f64 {
    let meters: f64 = points.windows(2).map(|w| haversine_m(&w[0], &w[1])).sum();
    (meters / 100.0).round() / 10.0
}

pub fn format_time(timestamp: DateTime<Utc>, tz: Tz) -> String {
    timestamp.with_timezone(&tz).format("%H:%M").to_string()
}

/// Single left-to-right pass over `points`, which must already be sorted by time.
pub fn cluster_stops(points: &[GpsPoint], tz: Tz) -> Vec<JourneyStop> {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Vec::new();
    };

    let mut stops = vec![JourneyStop::labeled(
        format_time(first.timestamp, tz),
        StopLabel::Start,
        first.latitude,
        first.longitude,
        false,
    )];

    let mut anchor_idx = 0;
    let mut last_member = first;

    for (idx, point) in points.iter().enumerate().skip(1) {
        let anchor = &points[anchor_idx];

        if haversine_m(anchor, point) < STAY_RADIUS_METERS {
            last_member = point;
            continue;
        }

        let dwell = last_member.timestamp - anchor.timestamp;
        if dwell >= Duration::minutes(STAY_MIN_MINUTES) && anchor_idx != 0 {
            stops.push(JourneyStop::labeled(
                format_time(anchor.timestamp, tz),
                StopLabel::Stop,
                anchor.latitude,
                anchor.longitude,
                false,
            ));
        }

        anchor_idx = idx;
        last_member = point;
    }

    if haversine_m(first, last) > STAY_RADIUS_METERS || points.len() == 1 {
        stops.push(JourneyStop::labeled(
            format_time(last.timestamp, tz),
            StopLabel::End,
            last.latitude,
            last.longitude,
            true,
        ));
    }

    stops
}

/// Final naming pass: the live position becomes `NOW` (today) or `END`, the
/// first stop is always `START`, everything else is a plain `STOP`.
pub fn label_stops(stops: Vec<JourneyStop>, is_today: bool) -> Vec<JourneyStop> {
    stops
        .into_iter()
        .enumerate()
        .map(|(i, stop)| {
            let label = if stop.is_current {
                if is_today {
                    StopLabel::Now
                } else {
                    StopLabel::End
                }
            } else if i == 0 {
                StopLabel::Start
            } else {
                StopLabel::Stop
            };

            JourneyStop {
                location: label.as_str().to_string(),
                icon: label.icon().to_string(),
                ..stop
            }
        })
        .collect()
}

pub fn bounds(points: &[GpsPoint]) -> Option<Bounds> {
    let first = points.first()?;
    let init = Bounds {
        min_lat: first.latitude,
        max_lat: first.latitude,
        min_lon: first.longitude,
        max_lon: first.longitude,
    };

    Some(points.iter().fold(init, |b, p| Bounds {
        min_lat: b.min_lat.min(p.latitude),
        max_lat: b.max_lat.max(p.latitude),
        min_lon: b.min_lon.min(p.longitude),
        max_lon: b.max_lon.max(p.longitude),
    }))
}

/// Sorts the trace and derives everything the journey endpoint reports.
pub fn summarize(mut points: Vec<GpsPoint>, is_today: bool, tz: Tz) -> Journey {
    points.sort_by_key(|p| p.timestamp);

    let total_distance = total_distance_km(&points);
    let stops = label_stops(cluster_stops(&points, tz), is_today);
    let stop_count = stops.iter().filter(|s| s.is_labeled(StopLabel::Stop)).count();

    let track = points
        .iter()
        .map(|p| TrackPoint {
            lat: p.latitude,
            lon: p.longitude,
            time: p.timestamp.to_rfc3339(),
        })
        .collect();

    Journey {
        data: stops,
        track: Some(track),
        bounds: bounds(&points),
        stats: JourneyStats {
            total_distance,
            stop_count,
            point_count: Some(points.len()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Australia::Sydney;

    // ~0.0009 degrees of latitude is ~100 m
    const HOME: (f64, f64) = (-33.8688, 151.2093);
    const CAFE: (f64, f64) = (-33.8800, 151.2200);
    const PARK: (f64, f64) = (-33.9000, 151.2400);
    const BEACH: (f64, f64) = (-33.9200, 151.2600);

    fn at(pos: (f64, f64), minute: i64) -> GpsPoint {
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        GpsPoint::new(pos.0, pos.1, base + Duration::minutes(minute))
    }

    fn nudge(pos: (f64, f64), meters: f64) -> (f64, f64) {
        (pos.0 + meters / 111_000.0, pos.1)
    }

    fn labels(stops: &[JourneyStop]) -> Vec<&str> {
        stops.iter().map(|s| s.location.as_str()).collect()
    }

    #[test]
    fn test_haversine_known_distance() {
        // One degree of latitude along a meridian
        let a = GpsPoint::new(0.0, 0.0, Utc::now());
        let b = GpsPoint::new(1.0, 0.0, Utc::now());
        let d = haversine_m(&a, &b);
        assert!((d - 111_195.0).abs() < 1.0, "got {}", d);
        assert_eq!(haversine_m(&a, &a), 0.0);
    }

    #[test]
    fn test_empty_trace() {
        let journey = summarize(Vec::new(), true, Sydney);
        assert!(journey.data.is_empty());
        assert_eq!(journey.stats.total_distance, 0.0);
        assert_eq!(journey.stats.stop_count, 0);
        assert!(journey.bounds.is_none());
    }

    #[test]
    fn test_single_point_yields_start_and_current() {
        let journey = summarize(vec![at(HOME, 0)], false, Sydney);

        assert_eq!(labels(&journey.data), vec!["START", "END"]);
        assert_eq!(journey.data[0].lat, journey.data[1].lat);
        assert_eq!(journey.data[0].lon, journey.data[1].lon);
        assert!(!journey.data[0].is_current);
        assert!(journey.data[1].is_current);
        assert_eq!(journey.stats.total_distance, 0.0);
        assert_eq!(journey.stats.stop_count, 0);
    }

    #[test]
    fn test_points_within_radius_never_produce_a_stop() {
        let points: Vec<GpsPoint> = (0..12_i64)
            .map(|i| at(nudge(HOME, (i % 3) as f64 * 20.0), i * 10))
            .collect();
        let stops = label_stops(cluster_stops(&points, Sydney), true);

        // last point is within 100 m of the first, so no current stop either
        assert_eq!(labels(&stops), vec!["START"]);
    }

    #[test]
    fn test_dwell_after_start_becomes_stop() {
        let points = vec![
            at(HOME, 0),
            at(CAFE, 10),
            at(nudge(CAFE, 30.0), 13),
            at(nudge(CAFE, 60.0), 16),
            at(PARK, 30),
            at(BEACH, 45),
        ];
        let journey = summarize(points, true, Sydney);

        assert_eq!(labels(&journey.data), vec!["START", "STOP", "NOW"]);
        assert_eq!(journey.data[1].lat, CAFE.0);
        assert_eq!(journey.data[1].icon, "pin");
        assert_eq!(journey.data[0].icon, "home");
        assert_eq!(journey.stats.stop_count, 1);
        assert_eq!(journey.stats.point_count, Some(6));
        assert_eq!(journey.data.iter().filter(|s| s.is_current).count(), 1);
    }

    #[test]
    fn test_short_dwell_is_ignored() {
        let points = vec![at(HOME, 0), at(CAFE, 10), at(nudge(CAFE, 10.0), 14), at(PARK, 20)];
        let stops = cluster_stops(&points, Sydney);
        assert_eq!(labels(&stops), vec!["START", "END"]);
    }

    #[test]
    fn test_dwell_at_first_point_does_not_duplicate_start() {
        let points = vec![at(HOME, 0), at(nudge(HOME, 10.0), 30), at(PARK, 40)];
        let stops = cluster_stops(&points, Sydney);
        assert_eq!(labels(&stops), vec!["START", "END"]);
    }

    #[test]
    fn test_open_cluster_at_end_is_not_promoted() {
        // Long stay at the park that is still ongoing
        let points = vec![at(HOME, 0), at(PARK, 10), at(nudge(PARK, 20.0), 60)];
        let stops = label_stops(cluster_stops(&points, Sydney), true);
        assert_eq!(labels(&stops), vec!["START", "NOW"]);
    }

    #[test]
    fn test_anchor_is_fixed_not_rolling() {
        // Each hop is 60 m from the previous but the third is 120 m from the anchor
        let points = vec![
            at(HOME, 0),
            at(CAFE, 5),
            at(nudge(CAFE, 60.0), 8),
            at(nudge(CAFE, 120.0), 20),
            at(PARK, 30),
        ];
        let stops = cluster_stops(&points, Sydney);
        // The CAFE cluster closes at minute 8 (3 min dwell), so no stop is recorded there,
        // and the cluster anchored at minute 20 closes with zero dwell.
        assert_eq!(labels(&stops), vec!["START", "END"]);
    }

    #[test]
    fn test_distance_is_monotonic_when_appending() {
        let mut points = vec![at(HOME, 0)];
        let mut last = total_distance_km(&points);
        for (i, pos) in [CAFE, PARK, BEACH, HOME, CAFE].iter().enumerate() {
            points.push(at(*pos, (i as i64 + 1) * 10));
            let now = total_distance_km(&points);
            assert!(now >= last);
            last = now;
        }
        assert!(last > 0.0);
    }

    #[test]
    fn test_unsorted_input_is_sorted_first() {
        let points = vec![at(BEACH, 45), at(HOME, 0), at(PARK, 30)];
        let journey = summarize(points, false, Sydney);
        assert_eq!(journey.data[0].lat, HOME.0);
        assert_eq!(journey.data.last().unwrap().lat, BEACH.0);
        assert_eq!(journey.data.last().unwrap().location, "END");
    }

    #[test]
    fn test_time_uses_display_timezone() {
        // 00:00 UTC on 1 March is 11:00 in Sydney (daylight saving)
        let stops = cluster_stops(&[at(HOME, 0)], Sydney);
        assert_eq!(stops[0].time, "11:00");
    }

    #[test]
    fn test_bounds() {
        let b = bounds(&[at(HOME, 0), at(PARK, 5), at(CAFE, 10)]).unwrap();
        assert_eq!(b.min_lat, PARK.0);
        assert_eq!(b.max_lat, HOME.0);
        assert_eq!(b.min_lon, HOME.1);
        assert_eq!(b.max_lon, PARK.1);
    }
}
