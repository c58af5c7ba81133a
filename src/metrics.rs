//! Per-segment metrics.
//!
//! Metrics are pure reductions over the inclusive point range a segment's
//! schedule entry selects. Numeric outputs are rounded to two decimals.
//! A segment covering no distance has an undefined grade (`None`), never
//! `inf`/`NaN`.

use chrono::NaiveDate;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{OptionExt, Result, SegmentationError};
use crate::segmentation::Segment;
use crate::{GpsPoint, RoutePoint, TrackPoint};

/// Round to two decimal places, half away from zero. Never returns `-0.0`.
pub fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Arithmetic mean of the values present, `None` if there are none.
pub fn mean<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Grade in percent: `gain_altitude * 100 / distance`, rounded.
///
/// The sign always matches the gain: a nonzero gain too small to survive
/// rounding gives `±0.01`.
///
/// Errors with [`SegmentationError::DegenerateSegment`] when `distance` is 0.
pub fn grade(gain_altitude: f64, distance: f64, segment_id: u32) -> Result<f64> {
    if distance == 0.0 || !distance.is_finite() {
        return Err(SegmentationError::DegenerateSegment { segment_id });
    }
    let rounded = round2(gain_altitude * 100.0 / distance);
    if rounded == 0.0 && gain_altitude != 0.0 {
        return Ok(0.01_f64.copysign(gain_altitude));
    }
    Ok(rounded)
}

/// Grade with a degenerate segment surfaced as `None`.
fn grade_or_undefined(gain_altitude: f64, distance: f64, segment_id: u32) -> Option<f64> {
    match grade(gain_altitude, distance, segment_id) {
        Ok(g) => Some(g),
        Err(err) => {
            warn!("[Metrics] {}", err);
            None
        }
    }
}

/// Classification of the segment that precedes a given segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviousSegmentType {
    /// No previous segment
    #[default]
    Start,
    Uphill,
    Downhill,
    Flat,
}

impl PreviousSegmentType {
    /// Type from the previous segment's altitude gain (`None` for the first segment).
    pub fn from_previous_gain(previous_gain: Option<f64>) -> Self {
        match previous_gain {
            None => PreviousSegmentType::Start,
            Some(g) if g < 0.0 => PreviousSegmentType::Downhill,
            Some(g) if g > 0.0 => PreviousSegmentType::Uphill,
            Some(_) => PreviousSegmentType::Flat,
        }
    }
}

/// Segment metrics that can be typed by their predecessor.
pub trait PreviousTyped {
    fn gain_altitude(&self) -> f64;
    fn set_type_previous_segment(&mut self, kind: PreviousSegmentType);
}

/// Assign `type_previous_segment` from each predecessor's gain.
pub fn assign_previous_types<S: PreviousTyped>(segments: &mut [S]) {
    let mut previous_gain = None;
    for segment in segments.iter_mut() {
        segment.set_type_previous_segment(PreviousSegmentType::from_previous_gain(previous_gain));
        previous_gain = Some(segment.gain_altitude());
    }
}

/// Metrics of one segment of a full-resolution ride.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentMetrics {
    pub id: u32,
    pub start_index: usize,
    pub end_index: usize,
    /// Date of the first point (UTC)
    pub date: NaiveDate,
    /// Seconds between first and last point
    pub duration: i64,
    /// Watts
    pub average_power: Option<f64>,
    /// km/h
    pub average_speed: Option<f64>,
    /// bpm, truncated to whole beats
    pub average_heart_rate: Option<f64>,
    /// rpm, truncated to whole revolutions
    pub average_cadence: Option<f64>,
    /// Meters
    pub distance: f64,
    /// Meters, signed
    pub gain_altitude: f64,
    /// Percent, `None` when the segment covers no distance
    pub vertical_drop: Option<f64>,
    pub type_previous_segment: PreviousSegmentType,
}

impl PreviousTyped for SegmentMetrics {
    fn gain_altitude(&self) -> f64 {
        self.gain_altitude
    }

    fn set_type_previous_segment(&mut self, kind: PreviousSegmentType) {
        self.type_previous_segment = kind;
    }
}

fn range_of<'a, T>(points: &'a [T], segment: &Segment) -> Result<&'a [T]> {
    if segment.start_index > segment.end_index {
        return Err(SegmentationError::Internal {
            message: format!(
                "segment {} starts after it ends ({} > {})",
                segment.id, segment.start_index, segment.end_index
            ),
        });
    }
    points
        .get(segment.start_index..=segment.end_index)
        .ok_or_internal("segment range outside of trace")
}

/// Compute the metrics of one ride segment.
///
/// `first_segment` selects the distance rule: the first segment reports the
/// cumulative distance of its last point, the others the delta across their
/// range. `type_previous_segment` is left at `Start`, see
/// [`assign_previous_types`].
pub fn aggregate_segment(
    segment: &Segment,
    points: &[TrackPoint],
    first_segment: bool,
) -> Result<SegmentMetrics> {
    let range = range_of(points, segment)?;
    let first = range.first().ok_or_internal("empty segment range")?;
    let last = range.last().ok_or_internal("empty segment range")?;

    let duration = (last.timestamp - first.timestamp).num_seconds();
    if duration < 0 || (duration == 0 && range.len() > 1) {
        return Err(SegmentationError::NonMonotonicTime {
            segment_id: segment.id,
            duration,
        });
    }

    let gain_altitude = round2(last.altitude - first.altitude);
    let distance = if first_segment {
        round2(last.distance)
    } else {
        round2(last.distance - first.distance)
    };

    Ok(SegmentMetrics {
        id: segment.id,
        start_index: segment.start_index,
        end_index: segment.end_index,
        date: first.timestamp.date_naive(),
        duration,
        average_power: mean(range.iter().filter_map(|p| p.power)).map(round2),
        average_speed: mean(range.iter().filter_map(|p| p.speed)).map(|v| round2(v * 3.6)),
        average_heart_rate: mean(range.iter().filter_map(|p| p.heart_rate))
            .map(|v| round2(v.trunc())),
        average_cadence: mean(range.iter().filter_map(|p| p.cadence)).map(|v| round2(v.trunc())),
        distance,
        gain_altitude,
        vertical_drop: grade_or_undefined(gain_altitude, distance, segment.id),
        type_previous_segment: PreviousSegmentType::Start,
    })
}

/// Metrics of one segment of a GPX route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSegment {
    pub id: u32,
    pub start_index: usize,
    pub end_index: usize,
    /// First point of the range
    pub start: GpsPoint,
    /// Last point of the range
    pub end: GpsPoint,
    /// Meters
    pub distance: f64,
    /// Meters, signed
    pub gain_altitude: f64,
    /// Percent, `None` when the segment covers no distance
    pub vertical_drop: Option<f64>,
    pub type_previous_segment: PreviousSegmentType,
}

impl PreviousTyped for RouteSegment {
    fn gain_altitude(&self) -> f64 {
        self.gain_altitude
    }

    fn set_type_previous_segment(&mut self, kind: PreviousSegmentType) {
        self.type_previous_segment = kind;
    }
}

/// Compute the metrics of one route segment.
///
/// `distances` holds the cumulative distance of every point of `points`.
pub fn aggregate_route_segment(
    segment: &Segment,
    points: &[RoutePoint],
    distances: &[f64],
    first_segment: bool,
) -> Result<RouteSegment> {
    let range = range_of(points, segment)?;
    let first = range.first().ok_or_internal("empty segment range")?;
    let last = range.last().ok_or_internal("empty segment range")?;
    let start_distance = distances
        .get(segment.start_index)
        .ok_or_internal("missing cumulative distance")?;
    let end_distance = distances
        .get(segment.end_index)
        .ok_or_internal("missing cumulative distance")?;

    let gain_altitude = round2(last.elevation - first.elevation);
    let distance = if first_segment {
        round2(*end_distance)
    } else {
        round2(end_distance - start_distance)
    };

    Ok(RouteSegment {
        id: segment.id,
        start_index: segment.start_index,
        end_index: segment.end_index,
        start: first.position(),
        end: last.position(),
        distance,
        gain_altitude,
        vertical_drop: grade_or_undefined(gain_altitude, distance, segment.id),
        type_previous_segment: PreviousSegmentType::Start,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 6, 12, 8, 30, 0).unwrap()
    }

    fn point(sec: i64, altitude: f64, distance: f64) -> TrackPoint {
        TrackPoint::new(t0() + Duration::seconds(sec), altitude, distance)
    }

    fn seg(id: u32, start_index: usize, end_index: usize) -> Segment {
        Segment {
            id,
            start_index,
            end_index,
        }
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.234), 1.23);
        assert_eq!(round2(-1.235_1), -1.24);
        assert_eq!(round2(12.0), 12.0);
        assert!(round2(-0.001).is_sign_positive());
        assert_eq!(serde_json::to_string(&round2(-0.004)).unwrap(), "0.0");
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(vec![1.0, 2.0, 3.0]), Some(2.0));
        assert_eq!(mean(Vec::<f64>::new()), None);
    }

    #[test]
    fn test_grade_guards_zero_distance() {
        assert_eq!(grade(5.0, 100.0, 0), Ok(5.0));
        assert_eq!(
            grade(5.0, 0.0, 3),
            Err(SegmentationError::DegenerateSegment { segment_id: 3 })
        );
    }

    #[test]
    fn test_grade_sign_follows_gain() {
        for &gain in &[12.5, -3.0, 0.0] {
            let g = grade(gain, 250.0, 0).unwrap();
            assert_eq!(g > 0.0, gain > 0.0);
            assert_eq!(g < 0.0, gain < 0.0);
            assert_eq!(g == 0.0, gain == 0.0);
        }
    }

    #[test]
    fn test_near_flat_grade_keeps_sign() {
        assert_eq!(grade(0.01, 1000.0, 0), Ok(0.01));
        assert_eq!(grade(-0.01, 1000.0, 0), Ok(-0.01));
        let flat = grade(0.0, 1000.0, 0).unwrap();
        assert_eq!(flat, 0.0);
        assert!(flat.is_sign_positive());
    }

    #[test]
    fn test_first_segment_distance_is_absolute() {
        let points = vec![
            point(0, 100.0, 0.0),
            point(1, 101.0, 5.0),
            point(2, 102.0, 12.0),
            point(3, 101.0, 20.0),
        ];
        let first = aggregate_segment(&seg(0, 0, 2), &points, true).unwrap();
        assert_eq!(first.distance, 12.0);

        let second = aggregate_segment(&seg(1, 2, 3), &points, false).unwrap();
        assert_eq!(second.distance, 8.0);
        assert_eq!(second.gain_altitude, -1.0);
        assert_eq!(second.vertical_drop, Some(-12.5));
    }

    #[test]
    fn test_first_segment_distance_includes_offset() {
        // The device had already covered 1.85 m at the first record
        let points = vec![point(0, 88.8, 1.85), point(20, 98.2, 367.4)];
        let metrics = aggregate_segment(&seg(0, 0, 1), &points, true).unwrap();
        assert_eq!(metrics.distance, 367.4);
        assert_eq!(metrics.gain_altitude, 9.4);
        assert_eq!(metrics.duration, 20);
    }

    #[test]
    fn test_channel_averages() {
        let points = vec![
            point(0, 100.0, 0.0)
                .with_power(200.0)
                .with_speed(10.0)
                .with_heart_rate(140.0)
                .with_cadence(85.0),
            point(1, 100.5, 10.0)
                .with_power(251.0)
                .with_speed(10.5)
                .with_heart_rate(141.0)
                .with_cadence(90.0),
        ];
        let metrics = aggregate_segment(&seg(0, 0, 1), &points, true).unwrap();

        assert_eq!(metrics.date, NaiveDate::from_ymd_opt(2021, 6, 12).unwrap());
        assert_eq!(metrics.duration, 1);
        assert_eq!(metrics.average_power, Some(225.5));
        assert_eq!(metrics.average_speed, Some(36.9));
        // 140.5 and 87.5 are truncated before rounding
        assert_eq!(metrics.average_heart_rate, Some(140.0));
        assert_eq!(metrics.average_cadence, Some(87.0));
        assert_eq!(metrics.vertical_drop, Some(5.0));
    }

    #[test]
    fn test_missing_channels_are_none() {
        let points = vec![point(0, 100.0, 0.0), point(5, 101.0, 30.0).with_power(180.0)];
        let metrics = aggregate_segment(&seg(0, 0, 1), &points, true).unwrap();

        assert_eq!(metrics.average_power, Some(180.0));
        assert_eq!(metrics.average_speed, None);
        assert_eq!(metrics.average_heart_rate, None);
        assert_eq!(metrics.average_cadence, None);
    }

    #[test]
    fn test_zero_distance_gives_undefined_grade() {
        let points = vec![point(0, 100.0, 50.0), point(10, 100.0, 50.0)];
        let metrics = aggregate_segment(&seg(1, 0, 1), &points, false).unwrap();
        assert_eq!(metrics.distance, 0.0);
        assert_eq!(metrics.vertical_drop, None);
    }

    #[test]
    fn test_non_monotonic_time() {
        let points = vec![point(10, 100.0, 0.0), point(0, 101.0, 10.0)];
        let result = aggregate_segment(&seg(2, 0, 1), &points, false);
        assert_eq!(
            result,
            Err(SegmentationError::NonMonotonicTime {
                segment_id: 2,
                duration: -10
            })
        );

        let points = vec![point(3, 100.0, 0.0), point(3, 101.0, 10.0)];
        assert!(matches!(
            aggregate_segment(&seg(0, 0, 1), &points, false),
            Err(SegmentationError::NonMonotonicTime { duration: 0, .. })
        ));
    }

    #[test]
    fn test_out_of_range_segment() {
        let points = vec![point(0, 100.0, 0.0)];
        assert!(matches!(
            aggregate_segment(&seg(0, 0, 4), &points, true),
            Err(SegmentationError::Internal { .. })
        ));
    }

    #[test]
    fn test_previous_segment_types() {
        let mut segments: Vec<RouteSegment> = [12.0, -5.0, 0.0]
            .iter()
            .enumerate()
            .map(|(i, &gain)| RouteSegment {
                id: i as u32,
                start_index: i,
                end_index: i + 1,
                start: GpsPoint::new(45.0, 6.0),
                end: GpsPoint::new(45.0, 6.0),
                distance: 100.0,
                gain_altitude: gain,
                vertical_drop: None,
                type_previous_segment: PreviousSegmentType::Start,
            })
            .collect();

        assign_previous_types(&mut segments);

        let kinds: Vec<PreviousSegmentType> =
            segments.iter().map(|s| s.type_previous_segment).collect();
        assert_eq!(
            kinds,
            vec![
                PreviousSegmentType::Start,
                PreviousSegmentType::Uphill,
                PreviousSegmentType::Downhill,
            ]
        );
    }

    #[test]
    fn test_previous_type_flat_and_serialization() {
        assert_eq!(
            PreviousSegmentType::from_previous_gain(Some(0.0)),
            PreviousSegmentType::Flat
        );
        assert_eq!(
            serde_json::to_string(&PreviousSegmentType::Downhill).unwrap(),
            "\"downhill\""
        );
    }

    #[test]
    fn test_route_segment_metrics() {
        let points = vec![
            RoutePoint::new(45.000, 6.0, 200.0),
            RoutePoint::new(45.001, 6.0, 210.0),
            RoutePoint::new(45.002, 6.0, 205.0),
        ];
        let distances = vec![0.0, 111.19, 222.39];

        let first = aggregate_route_segment(&seg(0, 0, 1), &points, &distances, true).unwrap();
        assert_eq!(first.distance, 111.19);
        assert_eq!(first.gain_altitude, 10.0);
        assert_eq!(first.start, GpsPoint::new(45.0, 6.0));

        let second = aggregate_route_segment(&seg(1, 1, 2), &points, &distances, false).unwrap();
        assert_eq!(second.distance, 111.2);
        assert_eq!(second.gain_altitude, -5.0);
        assert_eq!(second.vertical_drop, Some(-4.5));
    }
}
