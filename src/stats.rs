//! Summaries computed from an already-decoded document.

use chrono::{DateTime, Duration, Utc};

use crate::extensions::TrackPointExtension;
use crate::gpx::{Document, Point, Segment};
use crate::units::Meters;

/// Great-circle distance between two points, ignoring elevation.
pub fn distance(a: &Point, b: &Point) -> Meters {
    // Yes, the Earth is not a sphere, but computing an ellipsoid distance is a pain, and besides,
    // distances are normally given without regard to land elevation, which is a bigger factor than
    // not using an ellipsoid. So this is fine.
    const P: f64 = std::f64::consts::PI / 180.;
    const R: f64 = 6371000.; // approximate earth radius in meters
    let h = 0.5 - ((a.latitude - b.latitude) * P).cos() / 2.
        + ((a.latitude * P).cos()
            * (b.latitude * P).cos()
            * (1. - ((a.longitude - b.longitude) * P).cos())
            / 2.);
    Meters(2. * R * h.sqrt().asin())
}

impl Segment {
    /// Sum of the distances between consecutive points.
    pub fn distance(&self) -> Meters {
        self.points
            .windows(2)
            .map(|w| distance(&w[0], &w[1]))
            .fold(Meters(0.), |acc, d| acc + d)
    }
}

impl Document {
    pub fn distance(&self) -> Meters {
        self.tracks
            .iter()
            .flat_map(|t| t.segments.iter())
            .map(Segment::distance)
            .fold(Meters(0.), |acc, d| acc + d)
    }

    /// Time of the first point that has one.
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.points().find_map(|p| p.time)
    }

    /// Time of the last point that has one.
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.points().filter_map(|p| p.time).last()
    }

    pub fn duration(&self) -> Option<Duration> {
        Some(self.end()? - self.start()?)
    }
}

/// Thresholds that keep GPS jitter out of the totals.
#[derive(Debug, Clone, Copy)]
pub struct StatsOptions {
    /// Minimum change in elevation for a point to contribute to elevation gain.
    pub min_elevation_gain: Meters,
    /// Minimum change in position for a point to contribute to distance.
    pub min_distance: Meters,
    /// Time without moving `min_distance` after which points stop counting as moving time.
    pub standstill_time: Duration,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self {
            min_elevation_gain: Meters(5.),
            min_distance: Meters(1.),
            standstill_time: Duration::seconds(10),
        }
    }
}

impl StatsOptions {
    /// Slowest speed, in meters per second, that still counts as moving.
    pub fn min_moving_speed(&self) -> f64 {
        self.min_distance.0 / self.standstill_time.num_milliseconds() as f64 * 1000.
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentStats {
    pub points: usize,
    pub elevation_start: Meters,
    pub elevation_end: Meters,
    pub elevation_min: Meters,
    pub elevation_max: Meters,
    pub elevation_gain: Meters,
    pub distance: Meters,
    pub total_time: Duration,
    pub moving_time: Duration,
    /// Averages over points carrying Garmin's TrackPoint extension.
    pub heart_rate: Option<f64>,
    pub cadence: Option<f64>,
}

impl SegmentStats {
    /// Returns `None` for a segment with no points.
    pub fn compute(segment: &Segment, options: &StatsOptions) -> Option<Self> {
        let first = segment.points.first()?;
        let min_moving_speed = options.min_moving_speed();

        let mut stats = SegmentStats {
            points: segment.points.len(),
            elevation_start: Meters(first.elevation),
            elevation_end: Meters(first.elevation),
            elevation_min: Meters(first.elevation),
            elevation_max: Meters(first.elevation),
            elevation_gain: Meters(0.),
            distance: Meters(0.),
            total_time: Duration::zero(),
            moving_time: Duration::zero(),
            heart_rate: None,
            cadence: None,
        };

        let mut ele_last = Meters(first.elevation);
        let mut dist_last = first;
        for point in &segment.points[1..] {
            let e = Meters(point.elevation);
            if e < stats.elevation_min {
                stats.elevation_min = e;
            }
            if e > stats.elevation_max {
                stats.elevation_max = e;
            }
            stats.elevation_end = e;
            if (e - ele_last).abs() >= options.min_elevation_gain {
                if e > ele_last {
                    stats.elevation_gain += e - ele_last;
                }
                ele_last = e;
            }

            let dist = distance(dist_last, point);
            if dist >= options.min_distance {
                stats.distance += dist;
                if let (Some(a), Some(b)) = (dist_last.time, point.time) {
                    let time = if a > b { a - b } else { b - a };
                    let speed = dist.0 / time.num_milliseconds() as f64 * 1000.;
                    if speed >= min_moving_speed {
                        stats.moving_time = stats.moving_time + time;
                    }
                }
                dist_last = point;
            }
        }

        let times = || segment.points.iter().filter_map(|p| p.time);
        if let (Some(start), Some(end)) = (times().next(), times().last()) {
            stats.total_time = end - start;
        }

        let exts: Vec<TrackPointExtension> = segment
            .points
            .iter()
            .filter_map(|p| p.extension().ok())
            .collect();
        stats.heart_rate = average(exts.iter().filter_map(|e| e.heart_rate));
        stats.cadence = average(exts.iter().filter_map(|e| e.cadence));

        Some(stats)
    }
}

fn average(values: impl Iterator<Item = u32>) -> Option<f64> {
    let (sum, n) = values.fold((0u64, 0u32), |(sum, n), v| (sum + u64::from(v), n + 1));
    if n == 0 {
        None
    } else {
        Some(sum as f64 / f64::from(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn point(lat: f64, lon: f64, ele: f64, secs: Option<i64>) -> Point {
        Point {
            latitude: lat,
            longitude: lon,
            elevation: ele,
            time: secs.map(|s| Utc.timestamp_opt(1_450_031_718 + s, 0).unwrap()),
            ..Point::default()
        }
    }

    #[test]
    fn one_degree_of_longitude_at_equator() {
        let d = distance(&point(0., 0., 0., None), &point(0., 1., 0., None));
        assert!((d.0 - 111_194.93).abs() < 1., "got {}", d);
    }

    #[test]
    fn segment_stats() {
        let segment = Segment {
            points: vec![
                point(0., 0., 100., Some(0)),
                point(0., 0.0001, 103., Some(5)),   // ~11 m; +3 m is under the gain threshold
                point(0., 0.0002, 110., Some(10)),  // +10 m from 100
                point(0., 0.0002, 90., Some(600)),  // no movement; long stop
                point(0., 0.0003, 95., Some(605)),
            ],
        };
        let stats = SegmentStats::compute(&segment, &StatsOptions::default()).unwrap();
        assert_eq!(stats.points, 5);
        assert_eq!(stats.elevation_start, Meters(100.));
        assert_eq!(stats.elevation_end, Meters(95.));
        assert_eq!(stats.elevation_min, Meters(90.));
        assert_eq!(stats.elevation_max, Meters(110.));
        // 100 -> 110 counts, 110 -> 90 is a loss, 90 -> 95 counts.
        assert_eq!(stats.elevation_gain, Meters(15.));
        assert!((stats.distance.0 - 33.36).abs() < 0.1, "got {}", stats.distance);
        assert_eq!(stats.total_time, Duration::seconds(605));
        // The third step spans the stop and is too slow to count.
        assert_eq!(stats.moving_time, Duration::seconds(10));
        assert_eq!(stats.heart_rate, None);
    }

    #[test]
    fn empty_segment() {
        assert!(SegmentStats::compute(&Segment::default(), &StatsOptions::default()).is_none());
    }

    #[test]
    fn document_times() {
        let doc = Document {
            tracks: vec![crate::gpx::Track {
                segments: vec![Segment {
                    points: vec![
                        point(0., 0., 0., None),
                        point(0., 0., 0., Some(0)),
                        point(0., 0., 0., Some(2359)),
                        point(0., 0., 0., None),
                    ],
                }],
                ..Default::default()
            }],
            ..Default::default()
        };
        assert_eq!(doc.duration(), Some(Duration::seconds(2359)));
        assert_eq!(doc.start(), Some(Utc.timestamp_opt(1_450_031_718, 0).unwrap()));
        assert_eq!(doc.distance(), Meters(0.));
    }
}
