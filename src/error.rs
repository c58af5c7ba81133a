//! Unified error handling for the ride-segmenter library.
//!
//! Every fallible operation in the crate returns [`SegmentationError`]. A trace
//! that cannot be segmented fails as a whole: there is no partial result and
//! nothing is retried.

use thiserror::Error;

/// Unified error type for segmentation operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SegmentationError {
    /// Trace cannot be segmented (ordering or shape problem)
    #[error("Trace '{trace_id}' is malformed: {message}")]
    MalformedTrace { trace_id: String, message: String },
    /// Trace has too few usable points
    #[error("Trace '{trace_id}' has {point_count} usable points, minimum {minimum_required} required")]
    InsufficientPoints {
        trace_id: String,
        point_count: usize,
        minimum_required: usize,
    },
    /// A channel the requested mode depends on is absent
    #[error("Trace '{trace_id}' is missing the '{channel}' channel")]
    MissingChannel { trace_id: String, channel: String },
    /// Segment covers zero distance, so its grade is undefined
    #[error("Segment {segment_id} covers no distance, grade is undefined")]
    DegenerateSegment { segment_id: u32 },
    /// Timestamps run backwards (or stand still) inside a segment
    #[error("Segment {segment_id} has non-increasing timestamps (duration {duration}s)")]
    NonMonotonicTime { segment_id: u32, duration: i64 },
    /// Input file could not be decoded
    #[error("Failed to parse {format} input: {message}")]
    Parse { format: String, message: String },
    /// Persistence/storage error
    #[error("Persistence error: {message}")]
    Persistence { message: String },
    /// Requested document does not exist
    #[error("No {kind} with id {id}")]
    NotFound { kind: String, id: u64 },
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },
    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Result type alias for segmentation operations.
pub type Result<T> = std::result::Result<T, SegmentationError>;

/// Extension trait for converting Option to SegmentationError.
pub trait OptionExt<T> {
    /// Convert Option to Result with insufficient points error.
    fn ok_or_insufficient_points(
        self,
        trace_id: &str,
        point_count: usize,
        minimum: usize,
    ) -> Result<T>;

    /// Convert Option to Result with not-found error.
    fn ok_or_not_found(self, kind: &str, id: u64) -> Result<T>;

    /// Convert Option to Result with generic internal error.
    fn ok_or_internal(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_insufficient_points(
        self,
        trace_id: &str,
        point_count: usize,
        minimum: usize,
    ) -> Result<T> {
        self.ok_or_else(|| SegmentationError::InsufficientPoints {
            trace_id: trace_id.to_string(),
            point_count,
            minimum_required: minimum,
        })
    }

    fn ok_or_not_found(self, kind: &str, id: u64) -> Result<T> {
        self.ok_or_else(|| SegmentationError::NotFound {
            kind: kind.to_string(),
            id,
        })
    }

    fn ok_or_internal(self, message: &str) -> Result<T> {
        self.ok_or_else(|| SegmentationError::Internal {
            message: message.to_string(),
        })
    }
}
