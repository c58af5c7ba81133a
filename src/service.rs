//! # Import Service
//!
//! Orchestrates imports over injected repositories:
//!
//! - `.fit` activities are segmented once at import time and stored with their
//!   segments
//! - routes are stored as GPX and segmented on demand; results are kept in an
//!   LRU [`SegmentCache`] until the route is saved again
//!
//! The service holds no global state; every collaborator is passed in.

use std::sync::Arc;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::cache::{CacheStats, SegmentCache, DEFAULT_CAPACITY};
use crate::error::{Result, SegmentationError};
use crate::metrics::{round2, RouteSegment, SegmentMetrics};
use crate::road::Road;
use crate::route::{Route, RouteSummary};
use crate::store::{ActivityRecord, GeneralInfo, Repository, RouteRecord};
use crate::{SegmentationConfig, TrackPoint};

/// Identity of an activity being imported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityMeta {
    pub id: u64,
    pub athlete_id: u64,
    pub name: String,
}

impl ActivityMeta {
    pub fn new(id: u64, athlete_id: u64, name: &str) -> Self {
        Self {
            id,
            athlete_id,
            name: name.to_string(),
        }
    }
}

/// Result of an activity import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportOutcome {
    /// Stored with this many segments
    Imported { segment_count: usize },
    /// An activity with the same id was already stored; nothing was done
    AlreadyPresent,
}

/// Build the stored record of a segmented ride.
fn activity_record(meta: &ActivityMeta, road: &Road) -> Result<ActivityRecord> {
    let (first, last) = match (road.points().first(), road.points().last()) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            return Err(SegmentationError::Internal {
                message: format!("segmented ride {} has no samples", meta.id),
            })
        }
    };
    let summary = road.summary();

    Ok(ActivityRecord {
        id: meta.id,
        athlete_id: meta.athlete_id,
        name: meta.name.clone(),
        start_date: first.timestamp,
        distance: round2(last.distance),
        elapsed_time: (last.timestamp - first.timestamp).num_seconds(),
        total_elevation_gain: summary.positive_gain,
        segments: road.segments().to_vec(),
    })
}

/// Import orchestration over an activity and a route repository.
pub struct ImportService<A, R> {
    activities: A,
    routes: R,
    config: SegmentationConfig,
    route_cache: SegmentCache,
}

impl<A, R> ImportService<A, R>
where
    A: Repository<ActivityRecord>,
    R: Repository<RouteRecord>,
{
    /// Create a service with the default cache capacity.
    pub fn new(activities: A, routes: R, config: SegmentationConfig) -> Result<Self> {
        Self::with_cache_capacity(activities, routes, config, DEFAULT_CAPACITY)
    }

    /// Create a service caching at most `capacity` route segmentations.
    pub fn with_cache_capacity(
        activities: A,
        routes: R,
        config: SegmentationConfig,
        capacity: usize,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            activities,
            routes,
            config,
            route_cache: SegmentCache::new(capacity),
        })
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    pub fn activities(&self) -> &A {
        &self.activities
    }

    pub fn routes(&self) -> &R {
        &self.routes
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.route_cache.stats()
    }

    // ========================================================================
    // Activities
    // ========================================================================

    /// Decode, segment and store a `.fit` activity.
    pub fn import_fit(&mut self, meta: &ActivityMeta, bytes: &[u8]) -> Result<ImportOutcome> {
        if self.activities.search_if_exist(meta.id)? {
            debug!("[Import] Activity {} already stored, skipping", meta.id);
            return Ok(ImportOutcome::AlreadyPresent);
        }
        let road = Road::from_fit_bytes(&meta.id.to_string(), bytes, &self.config)?;
        self.store_activity(meta, &road)
    }

    /// Segment and store an activity from already decoded samples.
    pub fn import_points(
        &mut self,
        meta: &ActivityMeta,
        points: Vec<TrackPoint>,
    ) -> Result<ImportOutcome> {
        if self.activities.search_if_exist(meta.id)? {
            debug!("[Import] Activity {} already stored, skipping", meta.id);
            return Ok(ImportOutcome::AlreadyPresent);
        }
        let road = Road::from_points(&meta.id.to_string(), points, &self.config)?;
        self.store_activity(meta, &road)
    }

    fn store_activity(&mut self, meta: &ActivityMeta, road: &Road) -> Result<ImportOutcome> {
        let record = activity_record(meta, road)?;
        self.activities.save(&record)?;
        info!(
            "[Import] Activity {} '{}': {} segments, {:.0} m",
            record.id,
            record.name,
            record.segments.len(),
            record.distance
        );
        Ok(ImportOutcome::Imported {
            segment_count: record.segments.len(),
        })
    }

    /// Stored segments of an activity.
    pub fn activity_segments(&self, activity_id: u64) -> Result<Vec<SegmentMetrics>> {
        Ok(self.activities.get(activity_id)?.segments)
    }

    pub fn activities_info(&self) -> Result<Option<GeneralInfo>> {
        self.activities.get_general_info()
    }

    // ========================================================================
    // Routes
    // ========================================================================

    /// Store a route after checking that its GPX can be segmented.
    ///
    /// Missing totals (`distance`, `elevation_gain` at 0) are filled in from
    /// the segmentation.
    pub fn import_route(&mut self, mut record: RouteRecord) -> Result<RouteSummary> {
        let route = Route::from_gpx_bytes(&record.id.to_string(), record.gpx.as_bytes(), &self.config)?;
        let summary = route.summary();

        if record.distance == 0.0 {
            record.distance = summary.total_distance;
        }
        if record.elevation_gain == 0.0 {
            record.elevation_gain = summary.positive_gain;
        }

        self.routes.save(&record)?;
        self.route_cache.insert(record.id, route.into_segments());

        info!(
            "[Import] Route {} '{}': {} segments, {:.0} m",
            record.id, record.name, summary.segment_count, summary.total_distance
        );
        Ok(summary)
    }

    /// Segments of a stored route, computed on first use.
    pub fn route_segments(&mut self, route_id: u64) -> Result<Arc<Vec<RouteSegment>>> {
        if let Some(segments) = self.route_cache.get(route_id) {
            return Ok(segments);
        }

        let record = self.routes.get(route_id)?;
        let route = Route::from_gpx_bytes(&route_id.to_string(), record.gpx.as_bytes(), &self.config)?;
        debug!("[Import] Route {} segmented on demand", route_id);
        Ok(self.route_cache.insert(route_id, route.into_segments()))
    }

    /// All stored routes, newest first.
    pub fn routes_desc(&self) -> Result<Vec<RouteRecord>> {
        self.routes.get_all_desc()
    }

    pub fn routes_info(&self) -> Result<Option<GeneralInfo>> {
        self.routes.get_general_info()
    }
}
