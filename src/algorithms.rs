//! # Algorithm Toolbox
//!
//! Flat access to the pure functions behind [`Road`](crate::Road) and
//! [`Route`](crate::Route). Use these to run individual steps (gain signal,
//! labeling, boundary extraction, metrics) on your own data without the
//! orchestration types.
//!
//! ## Pipeline
//!
//! 1. **Gain signal**: [`altitude_gains`] (pointwise or rolling window)
//! 2. **Labeling**: [`label_points`] / [`segment_gains`]
//! 3. **Boundaries**: [`extract_spans`] then [`build_schedule`]
//! 4. **Metrics**: [`aggregate_segment`] / [`aggregate_route_segment`], then
//!    [`assign_previous_types`]
//!
//! # Example
//!
//! ```rust
//! use ride_segmenter::algorithms::{
//!     altitude_gains, build_schedule, extract_spans, label_points,
//!     BoundaryPolicy, GainMode,
//! };
//!
//! let altitudes = [100.0, 102.0, 105.0, 105.0, 105.0, 103.0, 100.0];
//! let gains = altitude_gains(&altitudes, GainMode::Pointwise);
//! let labels = label_points("demo", &gains).unwrap();
//! assert_eq!(labels, vec![0, 0, 0, 1, 1, 2, 2]);
//!
//! let schedule = build_schedule(&extract_spans(&labels), BoundaryPolicy::SharedBoundary);
//! assert_eq!(schedule.len(), 3);
//! assert_eq!(schedule[1].start_index, 2);
//! ```

// =============================================================================
// Core Types (re-exported from lib)
// =============================================================================

pub use crate::{
    BoundaryPolicy, GainMode, GpsPoint, PreviousSegmentType, RoutePoint, RouteSegment,
    Segment, SegmentMetrics, SegmentSpan, SegmentationConfig, TrackPoint,
};

// =============================================================================
// Geographic Utilities
// =============================================================================

pub use crate::geo_utils::{cumulative_distances, haversine_distance, polyline_length};

// =============================================================================
// Gain Signal
// =============================================================================

pub use crate::signal::{
    altitude_gains, decimated_indices, pointwise_gains, rolling_window_gains,
};

#[cfg(feature = "parallel")]
pub use crate::signal::pointwise_gains_parallel;

// =============================================================================
// Segmentation
// =============================================================================

pub use crate::segmentation::{
    build_schedule, extract_spans, gain_sign, label_points, segment_gains, SegmentLabeler,
    MIN_DEFINED_GAINS,
};

// =============================================================================
// Metrics
// =============================================================================

pub use crate::metrics::{
    aggregate_route_segment, aggregate_segment, assign_previous_types, grade, mean, round2,
};

/// Label the points of an altitude profile in one call.
///
/// Equivalent to [`altitude_gains`] followed by [`label_points`].
pub fn label_altitudes(trace_id: &str, altitudes: &[f64], mode: GainMode) -> crate::Result<Vec<u32>> {
    label_points(trace_id, &altitude_gains(altitudes, mode))
}
