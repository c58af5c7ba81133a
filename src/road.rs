//! # Road
//!
//! A recorded ride at full resolution (one sample per second from a `.fit`
//! file), split into climb/descent/flat segments.
//!
//! Segmentation decisions are made on a decimated copy of the ride (one point
//! every `decimation_step` samples, pointwise gains); the resulting boundaries
//! are then mapped back onto the full-resolution samples, and metrics are
//! computed there. Every segment after the first starts at the previous
//! segment's last sample.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{OptionExt, Result};
use crate::metrics::{aggregate_segment, assign_previous_types, mean, round2, SegmentMetrics};
use crate::segmentation::{build_schedule, extract_spans, label_points, BoundaryPolicy, Segment};
use crate::signal::{altitude_gains, decimated_indices, GainMode};
use crate::{fit_import, SegmentationConfig, TrackPoint};

/// Ride-level totals derived from the segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideSummary {
    pub segment_count: usize,
    /// Seconds
    pub total_duration: i64,
    /// Meters
    pub total_distance: f64,
    /// km/h, `None` for a ride without duration
    pub average_speed: Option<f64>,
    /// Sum of the non-negative segment gains, meters
    pub positive_gain: f64,
    /// Mean of the segment power averages, watts
    pub average_power: Option<f64>,
    /// Mean of the segment cadence averages, rpm
    pub average_cadence: Option<f64>,
}

/// A segmented full-resolution ride.
#[derive(Debug, Clone)]
pub struct Road {
    id: String,
    points: Vec<TrackPoint>,
    coarse_labels: Vec<u32>,
    schedule: Vec<Segment>,
    segments: Vec<SegmentMetrics>,
}

impl Road {
    /// Segment a ride from its samples.
    ///
    /// Fails if the decimated ride has fewer than two defined gains, or if a
    /// segment's timestamps are not increasing.
    pub fn from_points(
        id: &str,
        points: Vec<TrackPoint>,
        config: &SegmentationConfig,
    ) -> Result<Self> {
        config.validate()?;
        points
            .first()
            .ok_or_insufficient_points(id, 0, 1 + 2 * config.decimation_step)?;

        let coarse = decimated_indices(points.len(), config.decimation_step);
        let altitudes: Vec<f64> = coarse.iter().map(|&i| points[i].altitude).collect();
        let gains = altitude_gains(&altitudes, GainMode::Pointwise);
        let coarse_labels = label_points(id, &gains)?;

        let spans = extract_spans(&coarse_labels);
        let mut schedule: Vec<Segment> = build_schedule(&spans, BoundaryPolicy::SharedBoundary)
            .into_iter()
            .map(|s| Segment {
                id: s.id,
                start_index: coarse[s.start_index],
                end_index: coarse[s.end_index],
            })
            .collect();

        if config.extend_final_segment {
            if let Some(last) = schedule.last_mut() {
                if last.end_index + 1 < points.len() {
                    debug!(
                        "[Road] {}: extending segment {} over {} trailing samples",
                        id,
                        last.id,
                        points.len() - 1 - last.end_index
                    );
                    last.end_index = points.len() - 1;
                }
            }
        }

        let mut segments = schedule
            .iter()
            .enumerate()
            .map(|(k, segment)| aggregate_segment(segment, &points, k == 0))
            .collect::<Result<Vec<_>>>()?;
        assign_previous_types(&mut segments);

        info!(
            "[Road] {}: {} samples ({} after decimation) -> {} segments",
            id,
            points.len(),
            coarse.len(),
            segments.len()
        );

        Ok(Self {
            id: id.to_string(),
            points,
            coarse_labels,
            schedule,
            segments,
        })
    }

    /// Decode a `.fit` file and segment it.
    pub fn from_fit_bytes(id: &str, bytes: &[u8], config: &SegmentationConfig) -> Result<Self> {
        let points = fit_import::parse_fit(id, bytes)?;
        Self::from_points(id, points, config)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Full-resolution samples.
    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    /// Segment id of every decimated point.
    pub fn coarse_labels(&self) -> &[u32] {
        &self.coarse_labels
    }

    /// Full-resolution point range of every segment.
    pub fn schedule(&self) -> &[Segment] {
        &self.schedule
    }

    pub fn segments(&self) -> &[SegmentMetrics] {
        &self.segments
    }

    pub fn into_segments(self) -> Vec<SegmentMetrics> {
        self.segments
    }

    /// Ride-level totals.
    pub fn summary(&self) -> RideSummary {
        let total_duration: i64 = self.segments.iter().map(|s| s.duration).sum();
        let total_distance: f64 = self.segments.iter().map(|s| s.distance).sum();
        let average_speed = if total_duration > 0 {
            Some(round2(total_distance * 3.6 / total_duration as f64))
        } else {
            None
        };

        RideSummary {
            segment_count: self.segments.len(),
            total_duration,
            total_distance: round2(total_distance),
            average_speed,
            positive_gain: round2(
                self.segments
                    .iter()
                    .map(|s| s.gain_altitude)
                    .filter(|&g| g >= 0.0)
                    .sum(),
            ),
            average_power: mean(self.segments.iter().filter_map(|s| s.average_power)).map(round2),
            average_cadence: mean(self.segments.iter().filter_map(|s| s.average_cadence))
                .map(round2),
        }
    }

    /// Segments as a JSON array.
    pub fn segments_json(&self) -> String {
        serde_json::to_string(&self.segments).unwrap_or_else(|_| "[]".to_string())
    }
}
