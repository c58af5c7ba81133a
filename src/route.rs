//! # Route
//!
//! A planned route (GPX export): positions and elevations only, no time or
//! sensor channels. Points are coarse, so the gain signal is a rolling-window
//! delta and no decimation happens. Cumulative distance is derived from the
//! positions.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SegmentationError};
use crate::geo_utils::cumulative_distances;
use crate::metrics::{aggregate_route_segment, assign_previous_types, round2, RouteSegment};
use crate::segmentation::{build_schedule, extract_spans, label_points, Segment};
use crate::signal::{altitude_gains, GainMode};
use crate::{gpx_import, GpsPoint, RoutePoint, SegmentationConfig};

/// Route-level totals derived from the segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub segment_count: usize,
    /// Meters along the whole route
    pub total_distance: f64,
    /// Sum of the positive segment gains, meters
    pub positive_gain: f64,
    /// Sum of the negative segment gains, meters (negative)
    pub negative_gain: f64,
}

/// A segmented GPX route.
#[derive(Debug, Clone)]
pub struct Route {
    id: String,
    points: Vec<RoutePoint>,
    distances: Vec<f64>,
    labels: Vec<u32>,
    schedule: Vec<Segment>,
    segments: Vec<RouteSegment>,
}

impl Route {
    /// Segment a route from its points.
    pub fn from_points(
        id: &str,
        points: Vec<RoutePoint>,
        config: &SegmentationConfig,
    ) -> Result<Self> {
        config.validate()?;
        if let Some(i) = points.iter().position(|p| !p.position().is_valid()) {
            return Err(SegmentationError::MalformedTrace {
                trace_id: id.to_string(),
                message: format!("invalid coordinates at point {}", i),
            });
        }

        let positions: Vec<GpsPoint> = points.iter().map(RoutePoint::position).collect();
        let distances = cumulative_distances(&positions);

        let elevations: Vec<f64> = points.iter().map(|p| p.elevation).collect();
        let mode = GainMode::RollingWindow {
            window: config.rolling_window,
        };
        let gains = altitude_gains(&elevations, mode);
        let labels = label_points(id, &gains)?;
        debug!(
            "[Route] {}: first {} points have no gain, labeled 0",
            id,
            mode.undefined_head().min(points.len())
        );

        let schedule = build_schedule(&extract_spans(&labels), config.route_boundary);
        let mut segments = schedule
            .iter()
            .enumerate()
            .map(|(k, segment)| aggregate_route_segment(segment, &points, &distances, k == 0))
            .collect::<Result<Vec<_>>>()?;
        assign_previous_types(&mut segments);

        info!(
            "[Route] {}: {} points, {:.0} m -> {} segments",
            id,
            points.len(),
            distances.last().copied().unwrap_or(0.0),
            segments.len()
        );

        Ok(Self {
            id: id.to_string(),
            points,
            distances,
            labels,
            schedule,
            segments,
        })
    }

    /// Decode a GPX document and segment it.
    pub fn from_gpx_bytes(id: &str, bytes: &[u8], config: &SegmentationConfig) -> Result<Self> {
        let points = gpx_import::parse_gpx(id, bytes)?;
        Self::from_points(id, points, config)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn points(&self) -> &[RoutePoint] {
        &self.points
    }

    /// Cumulative distance of every point, meters.
    pub fn distances(&self) -> &[f64] {
        &self.distances
    }

    /// Total route length in meters.
    pub fn total_distance(&self) -> f64 {
        self.distances.last().copied().unwrap_or(0.0)
    }

    /// Segment id of every point.
    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    pub fn schedule(&self) -> &[Segment] {
        &self.schedule
    }

    pub fn segments(&self) -> &[RouteSegment] {
        &self.segments
    }

    pub fn into_segments(self) -> Vec<RouteSegment> {
        self.segments
    }

    /// Route-level totals.
    pub fn summary(&self) -> RouteSummary {
        let gains = self.segments.iter().map(|s| s.gain_altitude);
        RouteSummary {
            segment_count: self.segments.len(),
            total_distance: round2(self.total_distance()),
            positive_gain: round2(gains.clone().filter(|&g| g > 0.0).sum()),
            negative_gain: round2(gains.filter(|&g| g < 0.0).sum()),
        }
    }

    /// Segments as a JSON array.
    pub fn segments_json(&self) -> String {
        serde_json::to_string(&self.segments).unwrap_or_else(|_| "[]".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BoundaryPolicy, PreviousSegmentType};

    fn route_from_elevations(elevations: &[f64]) -> Vec<RoutePoint> {
        elevations
            .iter()
            .enumerate()
            .map(|(i, &ele)| RoutePoint::new(45.0 + i as f64 * 0.001, 6.0 + i as f64 * 0.0005, ele))
            .collect()
    }

    fn col() -> Vec<RoutePoint> {
        route_from_elevations(&[
            200.0, 204.0, 209.0, 215.0, 221.0, 226.0, 230.0, 233.0, 233.0, 229.0, 222.0, 216.0,
            210.0, 205.0, 201.0, 199.0, 199.0, 199.0, 199.0, 199.0, 199.0, 199.0,
        ])
    }

    #[test]
    fn test_rolling_window_head_is_segment_zero() {
        let route = Route::from_points("col", col(), &SegmentationConfig::default()).unwrap();
        assert!(route.labels()[..5].iter().all(|&id| id == 0));
        assert_eq!(route.labels().len(), 22);
    }

    #[test]
    fn test_climb_descent_flat() {
        let route = Route::from_points("col", col(), &SegmentationConfig::default()).unwrap();

        // Window-6 gains from index 5:
        //  26 26 24 18 8 -4 -14 -23 -28 -28 -23 -17 -11 -6 -2 0 0
        assert_eq!(
            route.labels(),
            &[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 2, 2]
        );
        let segments = route.segments();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].gain_altitude, 229.0 - 200.0);
        assert_eq!(segments[1].gain_altitude, 199.0 - 229.0);
        assert_eq!(segments[2].gain_altitude, 0.0);
        assert_eq!(segments[2].vertical_drop, Some(0.0));
        assert_eq!(
            segments[1].type_previous_segment,
            PreviousSegmentType::Uphill
        );
        assert_eq!(
            segments[2].type_previous_segment,
            PreviousSegmentType::Downhill
        );
    }

    #[test]
    fn test_segment_distances_add_up_to_route_length() {
        let elevations: Vec<f64> = (0..80)
            .map(|i| 300.0 + ((i as f64) * 0.35).sin() * 40.0 + (i % 7) as f64)
            .collect();
        let route = Route::from_points(
            "hills",
            route_from_elevations(&elevations),
            &SegmentationConfig::default(),
        )
        .unwrap();

        assert!(route.segments().len() > 2);
        let summed: f64 = route.segments().iter().map(|s| s.distance).sum();
        let tolerance = 0.01 * route.segments().len() as f64;
        assert!(
            (summed - route.total_distance()).abs() <= tolerance,
            "summed {} vs total {}",
            summed,
            route.total_distance()
        );
    }

    #[test]
    fn test_own_span_policy() {
        let config = SegmentationConfig {
            route_boundary: BoundaryPolicy::OwnSpan,
            ..SegmentationConfig::default()
        };
        let route = Route::from_points("col", col(), &config).unwrap();
        let schedule = route.schedule();
        assert_eq!(schedule[1].start_index, schedule[0].end_index + 1);
    }

    #[test]
    fn test_flat_route_has_undefined_grade_only_without_distance() {
        // Same position repeated: no distance, flat
        let points = vec![RoutePoint::new(45.0, 6.0, 100.0); 10];
        let route = Route::from_points("stuck", points, &SegmentationConfig::default()).unwrap();
        assert_eq!(route.segments().len(), 1);
        assert_eq!(route.segments()[0].distance, 0.0);
        assert_eq!(route.segments()[0].vertical_drop, None);
    }

    #[test]
    fn test_too_short_for_window() {
        let result = Route::from_points(
            "short",
            route_from_elevations(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            &SegmentationConfig::default(),
        );
        assert!(matches!(
            result,
            Err(SegmentationError::InsufficientPoints { point_count: 1, .. })
        ));
    }

    #[test]
    fn test_invalid_coordinates() {
        let mut points = col();
        points[3].latitude = 123.0;
        assert!(matches!(
            Route::from_points("bad", points, &SegmentationConfig::default()),
            Err(SegmentationError::MalformedTrace { .. })
        ));
    }

    #[test]
    fn test_summary() {
        let route = Route::from_points("col", col(), &SegmentationConfig::default()).unwrap();
        let summary = route.summary();
        assert_eq!(summary.segment_count, 3);
        assert_eq!(summary.positive_gain, 29.0);
        assert_eq!(summary.negative_gain, -30.0);
        assert!(summary.total_distance > 2000.0);
    }
}
