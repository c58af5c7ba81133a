//! Geographic utilities: great-circle distance and cumulative distance along a path.

use geo::{Distance, Haversine, Point};

use crate::GpsPoint;

/// Great-circle distance between two GPS points in meters.
///
/// # Example
/// ```
/// use ride_segmenter::GpsPoint;
/// use ride_segmenter::geo_utils::haversine_distance;
///
/// let london = GpsPoint::new(51.5074, -0.1278);
/// let paris = GpsPoint::new(48.8566, 2.3522);
/// let d = haversine_distance(&london, &paris);
/// assert!((d - 343_500.0).abs() < 2_000.0);
/// ```
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Total length of a polyline in meters.
pub fn polyline_length(points: &[GpsPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// Running distance along a path: `result[0] = 0`, `result[i]` is the summed
/// great-circle distance from the first point to point `i`.
pub fn cumulative_distances(points: &[GpsPoint]) -> Vec<f64> {
    let mut distances = Vec::with_capacity(points.len());
    let mut total = 0.0;
    for (i, point) in points.iter().enumerate() {
        if i > 0 {
            total += haversine_distance(&points[i - 1], point);
        }
        distances.push(total);
    }
    distances
}
