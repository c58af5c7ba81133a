//! # Storage Port
//!
//! Stored documents (activities and routes) and the repository abstraction the
//! import service depends on. Implementations are injected, so the same
//! service runs against [`MemoryRepository`] in tests and against a SQLite
//! repository (feature `persistence`) in production.
//!
//! ## Example
//! ```
//! use chrono::{TimeZone, Utc};
//! use ride_segmenter::{MemoryRepository, Repository, RouteRecord};
//!
//! let mut routes: MemoryRepository<RouteRecord> = MemoryRepository::new();
//! assert!(routes.is_empty().unwrap());
//!
//! let created_at = Utc.with_ymd_and_hms(2023, 4, 2, 18, 0, 0).unwrap();
//! routes.save(&RouteRecord::new(7, 1, "Galibier", created_at, String::new())).unwrap();
//!
//! let info = routes.get_general_info().unwrap().unwrap();
//! assert_eq!(info.count, 1);
//! assert_eq!(info.last_name, "Galibier");
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{OptionExt, Result};
use crate::metrics::SegmentMetrics;

// ============================================================================
// Documents
// ============================================================================

/// A stored document with a numeric id and a date it is ordered by.
pub trait Document: Clone + Serialize + DeserializeOwned {
    /// Human readable kind, used in errors and logs.
    const KIND: &'static str;
    /// Table (or collection) name.
    const TABLE: &'static str;

    fn id(&self) -> u64;
    fn name(&self) -> &str;
    /// Newest first ordering key.
    fn sort_key(&self) -> DateTime<Utc>;
}

/// An imported ride with its computed segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: u64,
    pub athlete_id: u64,
    pub name: String,
    pub start_date: DateTime<Utc>,
    /// Meters
    pub distance: f64,
    /// Seconds
    pub elapsed_time: i64,
    /// Meters
    pub total_elevation_gain: f64,
    pub segments: Vec<SegmentMetrics>,
}

impl Document for ActivityRecord {
    const KIND: &'static str = "activity";
    const TABLE: &'static str = "activities";

    fn id(&self) -> u64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn sort_key(&self) -> DateTime<Utc> {
        self.start_date
    }
}

/// A planned route kept as its GPX document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRecord {
    pub id: u64,
    pub athlete_id: u64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Meters
    pub distance: f64,
    /// Meters
    pub elevation_gain: f64,
    /// Seconds, if the route planner provided one
    pub estimated_moving_time: Option<i64>,
    /// Raw GPX document
    pub gpx: String,
}

impl RouteRecord {
    /// A route with no precomputed totals.
    pub fn new(id: u64, athlete_id: u64, name: &str, created_at: DateTime<Utc>, gpx: String) -> Self {
        Self {
            id,
            athlete_id,
            name: name.to_string(),
            created_at,
            distance: 0.0,
            elevation_gain: 0.0,
            estimated_moving_time: None,
            gpx,
        }
    }
}

impl Document for RouteRecord {
    const KIND: &'static str = "route";
    const TABLE: &'static str = "routes";

    fn id(&self) -> u64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn sort_key(&self) -> DateTime<Utc> {
        self.created_at
    }
}

// ============================================================================
// Repository
// ============================================================================

/// How many documents are stored and which one is the most recent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralInfo {
    pub count: usize,
    pub last_name: String,
    pub last_date: DateTime<Utc>,
}

impl GeneralInfo {
    /// Summarize documents already sorted newest first.
    pub fn from_sorted<T: Document>(documents: &[T]) -> Option<Self> {
        documents.first().map(|last| GeneralInfo {
            count: documents.len(),
            last_name: last.name().to_string(),
            last_date: last.sort_key(),
        })
    }
}

/// Storage port for one document kind.
pub trait Repository<T: Document> {
    /// Load a document. Fails with `NotFound` if absent.
    fn get(&self, id: u64) -> Result<T>;

    /// Insert or replace a document.
    fn save(&mut self, document: &T) -> Result<()>;

    fn search_if_exist(&self, id: u64) -> Result<bool>;

    /// All documents, newest first.
    fn get_all_desc(&self) -> Result<Vec<T>>;

    /// `None` when the repository is empty.
    fn get_general_info(&self) -> Result<Option<GeneralInfo>> {
        Ok(GeneralInfo::from_sorted(&self.get_all_desc()?))
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.get_general_info()?.is_none())
    }
}

/// In-memory repository.
#[derive(Debug, Clone)]
pub struct MemoryRepository<T> {
    documents: BTreeMap<u64, T>,
}

impl<T> MemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            documents: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }
}

impl<T> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Document> Repository<T> for MemoryRepository<T> {
    fn get(&self, id: u64) -> Result<T> {
        self.documents.get(&id).cloned().ok_or_not_found(T::KIND, id)
    }

    fn save(&mut self, document: &T) -> Result<()> {
        self.documents.insert(document.id(), document.clone());
        Ok(())
    }

    fn search_if_exist(&self, id: u64) -> Result<bool> {
        Ok(self.documents.contains_key(&id))
    }

    fn get_all_desc(&self) -> Result<Vec<T>> {
        let mut documents: Vec<T> = self.documents.values().cloned().collect();
        // Stable sort: equal dates keep ascending id order
        documents.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
        Ok(documents)
    }
}
