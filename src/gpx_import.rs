//! GPX route decoding.
//!
//! Track points are read first (all tracks, all segments, in document order);
//! a document without any falls back to its route points. Every point must
//! carry an elevation.

use std::io::Cursor;

use log::debug;

use crate::error::{Result, SegmentationError};
use crate::RoutePoint;

fn parse_error(message: impl ToString) -> SegmentationError {
    SegmentationError::Parse {
        format: "gpx".to_string(),
        message: message.to_string(),
    }
}

fn to_route_point(trace_id: &str, waypoint: &gpx::Waypoint) -> Result<RoutePoint> {
    let point = waypoint.point();
    let elevation = waypoint
        .elevation
        .ok_or_else(|| SegmentationError::MissingChannel {
            trace_id: trace_id.to_string(),
            channel: "elevation".to_string(),
        })?;
    Ok(RoutePoint::new(point.y(), point.x(), elevation))
}

/// Decode the points of a GPX document.
pub fn parse_gpx(trace_id: &str, bytes: &[u8]) -> Result<Vec<RoutePoint>> {
    let document = gpx::read(Cursor::new(bytes)).map_err(parse_error)?;

    let mut points: Vec<RoutePoint> = document
        .tracks
        .iter()
        .flat_map(|track| track.segments.iter())
        .flat_map(|segment| segment.points.iter())
        .map(|waypoint| to_route_point(trace_id, waypoint))
        .collect::<Result<_>>()?;

    if points.is_empty() {
        points = document
            .routes
            .iter()
            .flat_map(|route| route.points.iter())
            .map(|waypoint| to_route_point(trace_id, waypoint))
            .collect::<Result<_>>()?;
    }

    if points.is_empty() {
        return Err(SegmentationError::InsufficientPoints {
            trace_id: trace_id.to_string(),
            point_count: 0,
            minimum_required: 1,
        });
    }

    debug!("[GpxImport] {}: {} points", trace_id, points.len());
    Ok(points)
}

/// Name of the first track (or route) of a GPX document, if any.
pub fn extract_name(bytes: &[u8]) -> Option<String> {
    let document = gpx::read(Cursor::new(bytes)).ok()?;
    document
        .tracks
        .iter()
        .find_map(|t| t.name.clone())
        .or_else(|| document.routes.iter().find_map(|r| r.name.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>Col de la Madone</name>
    <trkseg>
      <trkpt lat="43.7850" lon="7.4200"><ele>45.0</ele></trkpt>
      <trkpt lat="43.7860" lon="7.4210"><ele>52.5</ele></trkpt>
    </trkseg>
    <trkseg>
      <trkpt lat="43.7870" lon="7.4220"><ele>61.0</ele></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

    const ROUTE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <rte>
    <name>Planned</name>
    <rtept lat="45.1000" lon="6.0500"><ele>720.0</ele></rtept>
    <rtept lat="45.1010" lon="6.0510"><ele>731.0</ele></rtept>
  </rte>
</gpx>"#;

    #[test]
    fn test_track_points_in_order() {
        let points = parse_gpx("madone", TRACK.as_bytes()).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0], RoutePoint::new(43.785, 7.42, 45.0));
        assert_eq!(points[2].elevation, 61.0);
    }

    #[test]
    fn test_route_points_fallback() {
        let points = parse_gpx("planned", ROUTE.as_bytes()).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].latitude, 45.101);
        assert_eq!(points[1].longitude, 6.051);
    }

    #[test]
    fn test_missing_elevation() {
        let gpx = TRACK.replace("<ele>52.5</ele>", "");
        assert!(matches!(
            parse_gpx("flat", gpx.as_bytes()),
            Err(SegmentationError::MissingChannel { ref channel, .. }) if channel == "elevation"
        ));
    }

    #[test]
    fn test_not_gpx() {
        assert!(parse_gpx("junk", b"<html></html>").is_err());
        assert!(parse_gpx("junk", b"not xml at all <").is_err());
    }

    #[test]
    fn test_extract_name() {
        assert_eq!(
            extract_name(TRACK.as_bytes()),
            Some("Col de la Madone".to_string())
        );
        assert_eq!(extract_name(ROUTE.as_bytes()), Some("Planned".to_string()));
    }
}
