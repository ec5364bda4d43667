//! Persistence for items, movers, and the mission log.
//!
//! The engine talks to storage through the traits defined here. [`Storage`]
//! implements them over a single `SQLite` file under the data directory.
//! Tests also get `MemoryStorage`, which keeps everything in process.
//!
//! ```text
//! <root>/
//!   haul.sqlite    # items, movers, mission_log
//! ```

mod item;
#[cfg(test)]
mod memory;
mod mission_log;
mod mover;
mod transition;

use std::{
    fs, io,
    path::PathBuf,
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use rusqlite::Connection;
use tracing::debug;

use crate::model::{Item, ItemId, MissionLogEntry, Mover, MoverId, MoverRanking};

#[cfg(test)]
pub use memory::MemoryStorage;

/// File name of the fleet database inside the storage root.
pub const DB_FILE: &str = "haul.sqlite";

/// How long a writer waits on a locked database before giving up.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("mover not found: {0}")]
    MoverNotFound(MoverId),

    #[error("item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("record already exists: {0}")]
    AlreadyExists(String),

    #[error("mover {id} was modified concurrently (expected revision {expected})")]
    Conflict { id: MoverId, expected: u64 },

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StorageError {
    /// Whether retrying the same call later might succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable(_) | Self::Io(_) => true,
            Self::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

pub type Result<T> = core::result::Result<T, StorageError>;

/// Durable collection of items.
pub trait ItemStore {
    /// Inserts a new item. Fails if the id is already taken.
    fn create_item(&self, item: &Item) -> Result<()>;

    /// Loads one item.
    fn item(&self, id: ItemId) -> Result<Item>;

    /// Loads every item whose id appears in `ids`.
    ///
    /// Missing ids are silently omitted; the caller decides what that means.
    fn items_by_ids(&self, ids: &[ItemId]) -> Result<Vec<Item>>;

    /// All items in creation order.
    fn items(&self) -> Result<Vec<Item>>;
}

/// Durable collection of movers.
pub trait MoverStore {
    /// Inserts a new mover. Fails if the id is already taken.
    fn create_mover(&self, mover: &Mover) -> Result<()>;

    /// Loads one mover.
    fn mover(&self, id: MoverId) -> Result<Mover>;

    /// All movers in creation order.
    fn movers(&self) -> Result<Vec<Mover>>;

    /// Replaces a stored mover.
    ///
    /// `mover.revision` must equal the stored revision, which is then bumped
    /// by one. A mismatch fails with [`StorageError::Conflict`]. The engine
    /// goes through [`FleetStore::commit_transition`] instead.
    #[cfg_attr(not(test), allow(dead_code))]
    fn save_mover(&self, mover: &Mover) -> Result<()>;

    /// Up to `limit` movers by completed missions, most first. Ties keep
    /// creation order.
    fn top_movers(&self, limit: usize) -> Result<Vec<MoverRanking>>;
}

/// Append-only collection of mission log entries.
pub trait MissionLogStore {
    /// Appends an entry. The referenced mover must exist. The engine goes
    /// through [`FleetStore::commit_transition`] instead.
    #[cfg_attr(not(test), allow(dead_code))]
    fn append_entry(&self, entry: &MissionLogEntry) -> Result<()>;

    /// A mover's entries in append order.
    fn entries_for(&self, mover_id: MoverId) -> Result<Vec<MissionLogEntry>>;
}

/// Everything the lifecycle engine needs, plus an atomic transition commit.
pub trait FleetStore: ItemStore + MoverStore + MissionLogStore {
    /// Saves `mover` (with the same revision check as
    /// [`MoverStore::save_mover`]) and appends `entry`, both or neither.
    fn commit_transition(&self, mover: &Mover, entry: &MissionLogEntry) -> Result<()>;
}

/// `SQLite`-backed storage rooted at a directory.
pub struct Storage {
    root: PathBuf,
    conn: Mutex<Connection>,
}

impl Storage {
    /// Opens the fleet database with [`DEFAULT_BUSY_TIMEOUT`].
    #[cfg(test)]
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        Self::with_busy_timeout(root, DEFAULT_BUSY_TIMEOUT)
    }

    /// Opens (or creates) the fleet database under `root`, waiting up to
    /// `busy_timeout` whenever another connection holds the write lock.
    ///
    /// The directory is created if it doesn't exist.
    pub fn with_busy_timeout(root: impl Into<PathBuf>, busy_timeout: Duration) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let path = root.join(DB_FILE);
        debug!(path = %path.display(), "opening fleet database");

        let conn = Connection::open(&path)?;
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(&schema())?;

        Ok(Self {
            root,
            conn: Mutex::new(conn),
        })
    }

    /// Returns the default storage root: `~/.haul/`.
    pub fn default_root() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".haul"))
    }

    /// The directory this storage lives in.
    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Unavailable("connection lock poisoned".into()))
    }
}

/// Table definitions. Idempotent, run on every open.
///
/// Every table carries an autoincrement `seq` so listings can follow
/// insertion order.
fn schema() -> String {
    let completed = mover::COMPLETED_MISSIONS;
    format!(
        "CREATE TABLE IF NOT EXISTS items (
             seq    INTEGER PRIMARY KEY AUTOINCREMENT,
             id     TEXT NOT NULL UNIQUE,
             name   TEXT NOT NULL,
             weight REAL NOT NULL
         );
         CREATE TABLE IF NOT EXISTS movers (
             seq          INTEGER PRIMARY KEY AUTOINCREMENT,
             id           TEXT NOT NULL UNIQUE,
             name         TEXT NOT NULL,
             weight_limit REAL NOT NULL,
             {completed}  INTEGER NOT NULL DEFAULT 0,
             state        TEXT NOT NULL,
             current_load TEXT NOT NULL,
             revision     INTEGER NOT NULL DEFAULT 0
         );
         CREATE INDEX IF NOT EXISTS movers_by_missions ON movers ({completed} DESC, seq);
         CREATE TABLE IF NOT EXISTS mission_log (
             seq       INTEGER PRIMARY KEY AUTOINCREMENT,
             id        TEXT NOT NULL UNIQUE,
             mover_id  TEXT NOT NULL REFERENCES movers (id),
             action    TEXT NOT NULL,
             items     TEXT NOT NULL,
             timestamp TEXT NOT NULL
         );
         CREATE INDEX IF NOT EXISTS mission_log_by_mover ON mission_log (mover_id, seq);"
    )
}

/// Converts a counter to the signed integer `SQLite` stores.
fn to_sql_int(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| StorageError::Corrupt(format!("counter out of range: {value}")))
}

/// Converts a stored integer back to a counter.
fn from_sql_int(value: i64, column: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| StorageError::Corrupt(format!("negative {column}: {value}")))
}

/// Maps a uniqueness violation to [`StorageError::AlreadyExists`].
fn map_insert_err(err: rusqlite::Error, what: impl FnOnce() -> String) -> StorageError {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
            StorageError::AlreadyExists(what())
        }
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    #[test]
    fn new_creates_root_and_database() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("nested").join("haul");

        let storage = Storage::new(&root).unwrap();

        assert!(root.join(DB_FILE).is_file());
        assert_eq!(storage.root(), &root);
    }

    #[test]
    fn reopening_keeps_schema_and_data() {
        let dir = TempDir::new().unwrap();
        let mover = Mover::new("Atlas", 100.0);
        {
            let storage = Storage::new(dir.path()).unwrap();
            storage.create_mover(&mover).unwrap();
        }

        let storage = Storage::new(dir.path()).unwrap();
        assert_eq!(storage.mover(mover.id).unwrap().name, "Atlas");
    }

    #[test]
    fn counters_outside_sql_range_are_rejected() {
        assert!(to_sql_int(u64::MAX).is_err());
        assert!(from_sql_int(-1, "revision").is_err());
        assert_eq!(from_sql_int(7, "revision").unwrap(), 7);
    }

    #[test]
    fn only_busy_and_io_errors_are_transient() {
        assert!(StorageError::Unavailable("down".into()).is_transient());
        assert!(!StorageError::MoverNotFound(MoverId::new()).is_transient());
        assert!(
            !StorageError::Conflict {
                id: MoverId::new(),
                expected: 3
            }
            .is_transient()
        );
    }
}
