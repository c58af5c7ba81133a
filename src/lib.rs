//! # Ride Segmenter
//!
//! Splits cycling traces into climb, descent and flat segments and computes
//! per-segment metrics.
//!
//! This library provides:
//! - Sign-based run-length segmentation of an altitude-gain signal
//! - Per-segment distance, elevation gain, grade, duration and sensor averages
//! - `.fit` activity and GPX route decoding
//! - A storage port for activities and routes, with an in-memory and a SQLite backend
//!
//! ## Features
//!
//! - **`parallel`** - Compute gain signals of long traces with rayon
//! - **`persistence`** - SQLite repositories
//! - **`cli`** - The `segment-trace` command line tool
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use ride_segmenter::{Route, RoutePoint, SegmentationConfig};
//!
//! // A climb followed by a descent, one point every ~111 m
//! let elevations = [200.0, 204.0, 209.0, 215.0, 221.0, 226.0, 230.0,
//!                   226.0, 219.0, 213.0, 208.0, 204.0, 201.0];
//! let points: Vec<RoutePoint> = elevations
//!     .iter()
//!     .enumerate()
//!     .map(|(i, &ele)| RoutePoint::new(45.0 + i as f64 * 0.001, 6.0, ele))
//!     .collect();
//!
//! let route = Route::from_points("col", points, &SegmentationConfig::default()).unwrap();
//! for segment in route.segments() {
//!     println!("{} m at {:?}%", segment.distance, segment.vertical_drop);
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, Result, SegmentationError};

// Geographic utilities (haversine, cumulative distance)
pub mod geo_utils;

// Altitude-gain signal preparation
pub mod signal;
pub use signal::GainMode;

// Run-length segmentation state machine and boundary extraction
pub mod segmentation;
pub use segmentation::{BoundaryPolicy, Segment, SegmentSpan};

// Per-segment metrics
pub mod metrics;
pub use metrics::{PreviousSegmentType, RouteSegment, SegmentMetrics};

// Full-resolution ride (.fit) orchestration
pub mod road;
pub use road::{RideSummary, Road};

// GPX route orchestration
pub mod route;
pub use route::{Route, RouteSummary};

// Input decoding
pub mod fit_import;
pub mod gpx_import;

// Storage port and documents
pub mod store;
pub use store::{
    ActivityRecord, Document, GeneralInfo, MemoryRepository, Repository, RouteRecord,
};

// SQLite repositories
#[cfg(feature = "persistence")]
pub mod persistence;
#[cfg(feature = "persistence")]
pub use persistence::SqliteRepository;

// LRU cache for computed route segmentations
pub mod cache;

// Import orchestration over injected repositories
pub mod service;
pub use service::{ActivityMeta, ImportOutcome, ImportService};

// Algorithm toolbox - flat access to the pure functions
pub mod algorithms;

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// One sample of a full-resolution ride (typically one per second).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub timestamp: DateTime<Utc>,
    /// Meters
    pub altitude: f64,
    /// Cumulative meters since the start of the recording
    pub distance: f64,
    pub position: Option<GpsPoint>,
    /// Watts
    pub power: Option<f64>,
    /// m/s
    pub speed: Option<f64>,
    /// bpm
    pub heart_rate: Option<f64>,
    /// rpm
    pub cadence: Option<f64>,
}

impl TrackPoint {
    /// Create a sample with only the mandatory channels.
    pub fn new(timestamp: DateTime<Utc>, altitude: f64, distance: f64) -> Self {
        Self {
            timestamp,
            altitude,
            distance,
            position: None,
            power: None,
            speed: None,
            heart_rate: None,
            cadence: None,
        }
    }

    pub fn with_position(mut self, position: GpsPoint) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_power(mut self, power: f64) -> Self {
        self.power = Some(power);
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_heart_rate(mut self, heart_rate: f64) -> Self {
        self.heart_rate = Some(heart_rate);
        self
    }

    pub fn with_cadence(mut self, cadence: f64) -> Self {
        self.cadence = Some(cadence);
        self
    }
}

/// One point of a planned route: position and elevation only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Meters
    pub elevation: f64,
}

impl RoutePoint {
    pub fn new(latitude: f64, longitude: f64, elevation: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation,
        }
    }

    pub fn position(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }
}

/// Configuration for segmentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Keep one point every N before segmenting a full-resolution ride.
    /// Default: 20 (one point every 20 s for 1 Hz recordings)
    pub decimation_step: usize,

    /// Look-back of the rolling-window gain used for routes, in points.
    /// Default: 6
    pub rolling_window: usize,

    /// Metric ranges of route segments.
    /// Default: shared boundary (segment distances add up to the route distance).
    /// `OwnSpan` measures each segment from its own first to its own last
    /// point, the layout of the reference route segmentation.
    pub route_boundary: BoundaryPolicy,

    /// Stretch the last segment of a decimated ride to the final sample.
    /// Default: true
    pub extend_final_segment: bool,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            decimation_step: 20,
            rolling_window: 6,
            route_boundary: BoundaryPolicy::SharedBoundary,
            extend_final_segment: true,
        }
    }
}

impl SegmentationConfig {
    /// Check that the values are usable.
    pub fn validate(&self) -> Result<()> {
        if self.decimation_step == 0 {
            return Err(SegmentationError::Config {
                message: "decimation_step must be at least 1".to_string(),
            });
        }
        if self.rolling_window < 2 {
            return Err(SegmentationError::Config {
                message: format!(
                    "rolling_window must be at least 2, got {}",
                    self.rolling_window
                ),
            });
        }
        Ok(())
    }

    /// Parse a (possibly partial) JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| SegmentationError::Config {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Tests
// ============================================================================
