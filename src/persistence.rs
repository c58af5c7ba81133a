//! # SQLite Repositories
//!
//! [`Repository`] implementation backed by SQLite. Each document kind gets its
//! own table; the document itself is stored as a MessagePack blob next to the
//! few columns needed for lookups and ordering:
//!
//! | column     | content                              |
//! |------------|--------------------------------------|
//! | `id`       | document id                          |
//! | `name`     | display name                         |
//! | `sort_key` | ordering date, milliseconds (UTC)    |
//! | `data`     | the full document (`rmp-serde`)      |
//!
//! Several repositories may point at the same database file.

use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, SegmentationError};
use crate::store::{Document, GeneralInfo, Repository};

impl From<rusqlite::Error> for SegmentationError {
    fn from(e: rusqlite::Error) -> Self {
        SegmentationError::Persistence {
            message: e.to_string(),
        }
    }
}

fn encoding_error(e: impl ToString) -> SegmentationError {
    SegmentationError::Persistence {
        message: format!("document encoding: {}", e.to_string()),
    }
}

fn row_id(id: u64) -> Result<i64> {
    i64::try_from(id).map_err(|_| SegmentationError::Persistence {
        message: format!("id {} does not fit in an SQLite integer", id),
    })
}

fn date_from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| SegmentationError::Persistence {
        message: format!("invalid stored date {}", millis),
    })
}

/// SQLite-backed repository for one document kind.
pub struct SqliteRepository<T> {
    db: Connection,
    _documents: PhantomData<T>,
}

impl<T: Document> SqliteRepository<T> {
    /// Open (or create) the database at `db_path`.
    pub fn new(db_path: &str) -> Result<Self> {
        let db = Connection::open(db_path)?;
        Self::init_schema(&db)?;
        debug!("[Persistence] {} table ready in {}", T::TABLE, db_path);
        Ok(Self {
            db,
            _documents: PhantomData,
        })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::new(":memory:")
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                sort_key INTEGER NOT NULL,
                data BLOB NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_{table}_sort_key ON {table}(sort_key);
        "#,
            table = T::TABLE
        ))?;
        Ok(())
    }

    /// Remove every document of this kind.
    pub fn clear(&mut self) -> Result<()> {
        self.db
            .execute_batch(&format!("DELETE FROM {};", T::TABLE))?;
        Ok(())
    }

    fn decode(blob: &[u8]) -> Result<T> {
        rmp_serde::from_slice(blob).map_err(encoding_error)
    }
}

impl<T: Document> Repository<T> for SqliteRepository<T> {
    fn get(&self, id: u64) -> Result<T> {
        let blob: Option<Vec<u8>> = self
            .db
            .query_row(
                &format!("SELECT data FROM {} WHERE id = ?", T::TABLE),
                params![row_id(id)?],
                |row| row.get(0),
            )
            .optional()?;

        match blob {
            Some(blob) => Self::decode(&blob),
            None => Err(SegmentationError::NotFound {
                kind: T::KIND.to_string(),
                id,
            }),
        }
    }

    fn save(&mut self, document: &T) -> Result<()> {
        let data = rmp_serde::to_vec_named(document).map_err(encoding_error)?;
        self.db.execute(
            &format!(
                "INSERT OR REPLACE INTO {} (id, name, sort_key, data) VALUES (?, ?, ?, ?)",
                T::TABLE
            ),
            params![
                row_id(document.id())?,
                document.name(),
                document.sort_key().timestamp_millis(),
                data
            ],
        )?;
        Ok(())
    }

    fn search_if_exist(&self, id: u64) -> Result<bool> {
        let found: Option<i64> = self
            .db
            .query_row(
                &format!("SELECT 1 FROM {} WHERE id = ?", T::TABLE),
                params![row_id(id)?],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn get_all_desc(&self) -> Result<Vec<T>> {
        let mut stmt = self.db.prepare(&format!(
            "SELECT data FROM {} ORDER BY sort_key DESC, id ASC",
            T::TABLE
        ))?;
        let blobs = stmt
            .query_map([], |row| row.get::<_, Vec<u8>>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        blobs.iter().map(|blob| Self::decode(blob)).collect()
    }

    fn get_general_info(&self) -> Result<Option<GeneralInfo>> {
        let count: i64 = self.db.query_row(
            &format!("SELECT COUNT(*) FROM {}", T::TABLE),
            [],
            |row| row.get(0),
        )?;

        let last: Option<(String, i64)> = self
            .db
            .query_row(
                &format!(
                    "SELECT name, sort_key FROM {} ORDER BY sort_key DESC, id ASC LIMIT 1",
                    T::TABLE
                ),
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match last {
            Some((last_name, millis)) => Ok(Some(GeneralInfo {
                count: count as usize,
                last_name,
                last_date: date_from_millis(millis)?,
            })),
            None => Ok(None),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
