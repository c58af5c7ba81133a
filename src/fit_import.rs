//! `.fit` activity decoding.
//!
//! Only `record` messages are read. A record must carry a timestamp, an
//! altitude and a cumulative distance to become a [`TrackPoint`]; records
//! missing any of them are skipped. Plain fields win over their `enhanced_*`
//! counterparts when a record has both.

use chrono::{DateTime, Utc};
use fitparser::profile::MesgNum;
use fitparser::Value;
use log::debug;

use crate::error::{Result, SegmentationError};
use crate::{GpsPoint, TrackPoint};

const SEMICIRCLES_TO_DEGREES: f64 = 180.0 / 2_147_483_648.0;

/// Channels collected from one `record` message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFields {
    pub timestamp: Option<DateTime<Utc>>,
    pub altitude: Option<f64>,
    pub enhanced_altitude: Option<f64>,
    pub distance: Option<f64>,
    /// Semicircles
    pub position_lat: Option<f64>,
    /// Semicircles
    pub position_long: Option<f64>,
    pub power: Option<f64>,
    pub speed: Option<f64>,
    pub enhanced_speed: Option<f64>,
    pub heart_rate: Option<f64>,
    pub cadence: Option<f64>,
}

impl RecordFields {
    /// Build a sample, `None` if a mandatory channel is missing.
    pub fn into_track_point(self) -> Option<TrackPoint> {
        let timestamp = self.timestamp?;
        let altitude = self.altitude.or(self.enhanced_altitude)?;
        let distance = self.distance?;

        let mut point = TrackPoint::new(timestamp, altitude, distance);
        if let (Some(lat), Some(lon)) = (self.position_lat, self.position_long) {
            let position = GpsPoint::new(lat * SEMICIRCLES_TO_DEGREES, lon * SEMICIRCLES_TO_DEGREES);
            if position.is_valid() {
                point.position = Some(position);
            }
        }
        point.power = self.power;
        point.speed = self.speed.or(self.enhanced_speed);
        point.heart_rate = self.heart_rate;
        point.cadence = self.cadence;
        Some(point)
    }
}

fn fit_value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Float32(v) => Some(*v as f64),
        Value::Float64(v) => Some(*v),
        Value::SInt8(v) => Some(*v as f64),
        Value::UInt8(v) => Some(*v as f64),
        Value::UInt8z(v) => Some(*v as f64),
        Value::Byte(v) => Some(*v as f64),
        Value::SInt16(v) => Some(*v as f64),
        Value::UInt16(v) => Some(*v as f64),
        Value::UInt16z(v) => Some(*v as f64),
        Value::SInt32(v) => Some(*v as f64),
        Value::UInt32(v) => Some(*v as f64),
        Value::UInt32z(v) => Some(*v as f64),
        Value::SInt64(v) => Some(*v as f64),
        Value::UInt64(v) => Some(*v as f64),
        Value::UInt64z(v) => Some(*v as f64),
        Value::Array(values) => values.iter().find_map(fit_value_to_f64),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// Decode the samples of a `.fit` file.
///
/// Fails with [`SegmentationError::Parse`] if the bytes are not a FIT file,
/// and with [`SegmentationError::InsufficientPoints`] if no usable record
/// remains.
pub fn parse_fit(trace_id: &str, bytes: &[u8]) -> Result<Vec<TrackPoint>> {
    let messages = fitparser::from_bytes(bytes).map_err(|e| SegmentationError::Parse {
        format: "fit".to_string(),
        message: e.to_string(),
    })?;

    let mut points = Vec::new();
    let mut records = 0usize;
    for message in messages {
        if message.kind() != MesgNum::Record {
            continue;
        }
        records += 1;

        let mut fields = RecordFields::default();
        for field in message.fields() {
            let value = field.value();
            match field.name() {
                "timestamp" => {
                    if let Value::Timestamp(ts) = value {
                        fields.timestamp = Some(ts.with_timezone(&Utc));
                    }
                }
                "altitude" => fields.altitude = fit_value_to_f64(value),
                "enhanced_altitude" => fields.enhanced_altitude = fit_value_to_f64(value),
                "distance" => fields.distance = fit_value_to_f64(value),
                "position_lat" => fields.position_lat = fit_value_to_f64(value),
                "position_long" => fields.position_long = fit_value_to_f64(value),
                "power" => fields.power = fit_value_to_f64(value),
                "speed" => fields.speed = fit_value_to_f64(value),
                "enhanced_speed" => fields.enhanced_speed = fit_value_to_f64(value),
                "heart_rate" => fields.heart_rate = fit_value_to_f64(value),
                "cadence" => fields.cadence = fit_value_to_f64(value),
                _ => {}
            }
        }

        if let Some(point) = fields.into_track_point() {
            points.push(point);
        }
    }

    if points.len() < records {
        debug!(
            "[FitImport] {}: skipped {} of {} records without timestamp, altitude or distance",
            trace_id,
            records - points.len(),
            records
        );
    }

    if points.is_empty() {
        return Err(SegmentationError::InsufficientPoints {
            trace_id: trace_id.to_string(),
            point_count: 0,
            minimum_required: 1,
        });
    }

    debug!("[FitImport] {}: {} samples", trace_id, points.len());
    Ok(points)
}
