//! Sign-based run-length segmentation of an altitude-gain signal.
//!
//! Each point is labeled with a segment id by comparing the sign of its gain
//! with the sign of the previous gain (zero is a sign of its own):
//!
//! - same sign → same segment
//! - sign change → new segment
//! - a single zero after a slope is absorbed into that slope
//! - two or more consecutive zeros form a flat segment of their own; the first
//!   zero of the run, provisionally absorbed into the previous slope, is moved
//!   into the new flat segment
//!
//! The labels are kept in an append-only buffer; only the slot immediately
//! before the current one is ever rewritten.
//!
//! ## Example
//! ```
//! use ride_segmenter::segmentation::segment_gains;
//!
//! let ids = segment_gains(&[1.0, 50.0, 2.0, 0.0, -1.0, -20.0, 2.0, 0.0, 0.0, 0.0]);
//! assert_eq!(ids, vec![0, 0, 0, 0, 1, 1, 2, 3, 3, 3]);
//! ```

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SegmentationError};

/// Minimum number of defined gains needed to segment a trace.
pub const MIN_DEFINED_GAINS: usize = 2;

/// Sign of a gain with zero as a distinct class.
pub fn gain_sign(gain: f64) -> i8 {
    if gain > 0.0 {
        1
    } else if gain < 0.0 {
        -1
    } else {
        0
    }
}

/// Online segment labeler over a stream of defined gains.
#[derive(Debug, Default, Clone)]
pub struct SegmentLabeler {
    ids: Vec<u32>,
    prev: Option<f64>,
    prev_two_back: Option<f64>,
}

impl SegmentLabeler {
    /// Create an empty labeler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty labeler with room for `capacity` labels.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Labels assigned so far.
    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    /// Consume the next gain and label it.
    pub fn push(&mut self, gain: f64) {
        let Some(prev) = self.prev else {
            self.ids.push(0);
            self.prev = Some(gain);
            return;
        };

        let n = self.ids.len();
        let current = self.ids[n - 1];

        let id = if gain_sign(gain) == gain_sign(prev) {
            if gain == 0.0 && prev == 0.0 {
                match self.prev_two_back {
                    // Second element: nothing two back to look at
                    None => current,
                    // Start of a genuine flat run
                    Some(two_back) if two_back != 0.0 => {
                        self.ids[n - 1] = current + 1;
                        current + 1
                    }
                    // Already inside a run of zeros
                    Some(_) => current,
                }
            } else {
                current
            }
        } else if gain == 0.0 {
            // Lone zero after a slope stays with that slope
            current
        } else {
            current + 1
        };

        self.ids.push(id);
        self.prev_two_back = Some(prev);
        self.prev = Some(gain);
    }

    /// Finish and return the labels.
    pub fn finish(self) -> Vec<u32> {
        self.ids
    }
}

/// Label a stream of defined gains. Ids start at 0 and never decrease.
pub fn segment_gains(gains: &[f64]) -> Vec<u32> {
    let mut labeler = SegmentLabeler::with_capacity(gains.len());
    for &gain in gains {
        labeler.push(gain);
    }
    labeler.finish()
}

/// Label every point of a trace from its (partially undefined) gain signal.
///
/// The leading run of undefined gains is assigned segment 0; the remaining
/// gains are labeled with [`segment_gains`], whose own ids also start at 0, so
/// the head merges into the first real segment.
///
/// Fails when fewer than [`MIN_DEFINED_GAINS`] gains are defined, when an
/// undefined gain follows a defined one, or when a gain is not finite.
pub fn label_points(trace_id: &str, gains: &[Option<f64>]) -> Result<Vec<u32>> {
    let head = gains.iter().take_while(|g| g.is_none()).count();

    let mut defined = Vec::with_capacity(gains.len() - head);
    for (offset, gain) in gains[head..].iter().enumerate() {
        match gain {
            Some(g) if g.is_finite() => defined.push(*g),
            Some(g) => {
                return Err(SegmentationError::MalformedTrace {
                    trace_id: trace_id.to_string(),
                    message: format!("non-finite gain {} at point {}", g, head + offset),
                })
            }
            None => {
                return Err(SegmentationError::MalformedTrace {
                    trace_id: trace_id.to_string(),
                    message: format!("undefined gain at point {}", head + offset),
                })
            }
        }
    }

    if defined.len() < MIN_DEFINED_GAINS {
        return Err(SegmentationError::InsufficientPoints {
            trace_id: trace_id.to_string(),
            point_count: defined.len(),
            minimum_required: MIN_DEFINED_GAINS,
        });
    }

    let mut labels = vec![0u32; head];
    labels.extend(segment_gains(&defined));

    debug!(
        "[Segmentation] {}: {} points ({} undefined head) -> {} segments",
        trace_id,
        labels.len(),
        head,
        labels.last().map(|id| id + 1).unwrap_or(0)
    );

    Ok(labels)
}

/// First and last position of one segment id in a label sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentSpan {
    pub id: u32,
    pub first: usize,
    pub last: usize,
}

/// Extract the span of every segment id from non-decreasing labels.
pub fn extract_spans(labels: &[u32]) -> Vec<SegmentSpan> {
    let mut spans: Vec<SegmentSpan> = Vec::new();
    for (i, &id) in labels.iter().enumerate() {
        match spans.last_mut() {
            Some(span) if span.id == id => span.last = i,
            _ => spans.push(SegmentSpan {
                id,
                first: i,
                last: i,
            }),
        }
    }
    spans
}

/// Which point range a segment's metrics are computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// Segment 0 spans its own points; every later segment starts at the
    /// previous segment's last point, so adjacent ranges share one point
    #[default]
    SharedBoundary,
    /// Every segment spans exactly its own points
    OwnSpan,
}

/// One entry of the segment schedule: an inclusive point range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub id: u32,
    pub start_index: usize,
    pub end_index: usize,
}

impl Segment {
    /// Number of points in the range.
    pub fn point_count(&self) -> usize {
        self.end_index - self.start_index + 1
    }
}

/// Turn spans into metric ranges according to the boundary policy.
pub fn build_schedule(spans: &[SegmentSpan], policy: BoundaryPolicy) -> Vec<Segment> {
    spans
        .iter()
        .enumerate()
        .map(|(k, span)| {
            let start_index = match policy {
                BoundaryPolicy::SharedBoundary if k > 0 => spans[k - 1].last,
                _ => span.first,
            };
            Segment {
                id: span.id,
                start_index,
                end_index: span.last,
            }
        })
        .collect()
}
