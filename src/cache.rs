//! # Segment Cache
//!
//! Least Recently Used cache of computed route segmentations, keyed by route
//! id. Segmenting a route means parsing its GPX document again, so the import
//! service keeps the latest results here and drops an entry whenever the
//! route it was computed from is saved again.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use crate::metrics::RouteSegment;

/// Default number of routes kept.
pub const DEFAULT_CAPACITY: usize = 50;

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// LRU cache of route segmentations.
///
/// A capacity of 0 disables caching.
#[derive(Debug)]
pub struct SegmentCache {
    /// `None` when caching is disabled
    entries: Option<LruCache<u64, Arc<Vec<RouteSegment>>>>,
    hits: u64,
    misses: u64,
}

impl SegmentCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(LruCache::new),
            hits: 0,
            misses: 0,
        }
    }

    /// Segments of a route, refreshing its recency.
    pub fn get(&mut self, route_id: u64) -> Option<Arc<Vec<RouteSegment>>> {
        let found = self
            .entries
            .as_mut()
            .and_then(|cache| cache.get(&route_id))
            .map(Arc::clone);
        match found {
            Some(_) => self.hits += 1,
            None => self.misses += 1,
        }
        found
    }

    /// Store the segments of a route, replacing any previous entry and
    /// evicting the least recently used route when full.
    pub fn insert(&mut self, route_id: u64, segments: Vec<RouteSegment>) -> Arc<Vec<RouteSegment>> {
        let segments = Arc::new(segments);
        if let Some(cache) = self.entries.as_mut() {
            cache.put(route_id, Arc::clone(&segments));
        }
        segments
    }

    /// Forget a route.
    pub fn invalidate(&mut self, route_id: u64) {
        if let Some(cache) = self.entries.as_mut() {
            cache.pop(&route_id);
        }
    }

    pub fn clear(&mut self) {
        if let Some(cache) = self.entries.as_mut() {
            cache.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, LruCache::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, route_id: u64) -> bool {
        self.entries
            .as_ref()
            .is_some_and(|cache| cache.contains(&route_id))
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.len(),
        }
    }
}

impl Default for SegmentCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GpsPoint, PreviousSegmentType};

    fn segments(gain: f64) -> Vec<RouteSegment> {
        vec![RouteSegment {
            id: 0,
            start_index: 0,
            end_index: 9,
            start: GpsPoint::new(45.0, 6.0),
            end: GpsPoint::new(45.01, 6.0),
            distance: 1_111.95,
            gain_altitude: gain,
            vertical_drop: Some(gain * 100.0 / 1_111.95),
            type_previous_segment: PreviousSegmentType::Start,
        }]
    }

    #[test]
    fn test_get_and_stats() {
        let mut cache = SegmentCache::new(3);
        cache.insert(1, segments(10.0));

        assert_eq!(cache.get(1).unwrap()[0].gain_altitude, 10.0);
        assert!(cache.get(2).is_none());
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                entries: 1
            }
        );
    }

    #[test]
    fn test_least_recently_used_is_evicted() {
        let mut cache = SegmentCache::new(3);
        cache.insert(1, segments(1.0));
        cache.insert(2, segments(2.0));
        cache.insert(3, segments(3.0));

        // Route 1 becomes the most recent
        cache.get(1);
        cache.insert(4, segments(4.0));

        assert!(cache.contains(1));
        assert!(!cache.contains(2));
        assert!(cache.contains(3));
        assert!(cache.contains(4));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_replace_does_not_evict() {
        let mut cache = SegmentCache::new(2);
        cache.insert(1, segments(1.0));
        cache.insert(2, segments(2.0));
        cache.insert(2, segments(20.0));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(2).unwrap()[0].gain_altitude, 20.0);
        assert!(cache.contains(1));
    }

    #[test]
    fn test_invalidate_and_clear() {
        let mut cache = SegmentCache::default();
        cache.insert(1, segments(1.0));
        cache.insert(2, segments(2.0));

        cache.invalidate(1);
        assert!(!cache.contains(1));
        assert!(cache.contains(2));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity_disables_caching() {
        let mut cache = SegmentCache::new(0);
        let stored = cache.insert(1, segments(5.0));
        assert_eq!(stored.len(), 1);
        assert!(cache.is_empty());
        assert!(cache.get(1).is_none());
        assert_eq!(cache.stats().misses, 1);
    }
}
