//! Mission log storage: append and load log entries.
//!
//! The log only grows. There is no update or delete.

use rusqlite::{Connection, params};

use crate::model::{EntryId, ItemId, MissionAction, MissionLogEntry, MoverId};

use super::{MissionLogStore, Result, Storage, StorageError, map_insert_err, mover::mover_exists};

impl MissionLogStore for Storage {
    fn append_entry(&self, entry: &MissionLogEntry) -> Result<()> {
        let conn = self.conn()?;
        insert_entry(&conn, entry)
    }

    fn entries_for(&self, mover_id: MoverId) -> Result<Vec<MissionLogEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, mover_id, action, items, timestamp
             FROM mission_log WHERE mover_id = ?1 ORDER BY seq",
        )?;
        let rows = stmt.query_map([mover_id.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, mover, action, items, timestamp) = row?;
            entries.push(MissionLogEntry {
                id: id
                    .parse::<EntryId>()
                    .map_err(|e| StorageError::Corrupt(format!("invalid entry id: {e}")))?,
                mover_id: mover
                    .parse::<MoverId>()
                    .map_err(|e| StorageError::Corrupt(format!("invalid mover id: {e}")))?,
                action: action
                    .parse::<MissionAction>()
                    .map_err(StorageError::Corrupt)?,
                items: serde_json::from_str::<Vec<ItemId>>(&items)?,
                timestamp: timestamp
                    .parse::<jiff::Timestamp>()
                    .map_err(|e| StorageError::Corrupt(format!("invalid timestamp: {e}")))?,
            });
        }
        Ok(entries)
    }
}

/// Appends one entry through an open connection or transaction.
pub(super) fn insert_entry(conn: &Connection, entry: &MissionLogEntry) -> Result<()> {
    if !mover_exists(conn, entry.mover_id)? {
        return Err(StorageError::MoverNotFound(entry.mover_id));
    }
    let items = serde_json::to_string(&entry.items)?;
    conn.execute(
        "INSERT INTO mission_log (id, mover_id, action, items, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            entry.id.to_string(),
            entry.mover_id.to_string(),
            entry.action.as_str(),
            items,
            entry.timestamp.to_string(),
        ],
    )
    .map_err(|e| map_insert_err(e, || format!("mission log entry {}", entry.id)))?;
    Ok(())
}
