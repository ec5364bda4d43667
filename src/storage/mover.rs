//! Mover storage: create, load, save, list, and rank movers.

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::model::{ItemId, Mover, MoverId, MoverRanking, MoverState};

use super::{MoverStore, Result, Storage, StorageError, from_sql_int, map_insert_err, to_sql_int};

/// The ranking column. The schema, its index, and the leaderboard query
/// all name it through this constant.
pub(super) const COMPLETED_MISSIONS: &str = "completed_missions";

impl MoverStore for Storage {
    fn create_mover(&self, mover: &Mover) -> Result<()> {
        let conn = self.conn()?;
        let load = serde_json::to_string(&mover.current_load)?;
        conn.execute(
            &format!(
                "INSERT INTO movers (id, name, weight_limit, {COMPLETED_MISSIONS}, state, current_load, revision)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
            ),
            params![
                mover.id.to_string(),
                &mover.name,
                mover.weight_limit,
                to_sql_int(mover.completed_missions)?,
                mover.state.as_str(),
                load,
                to_sql_int(mover.revision)?,
            ],
        )
        .map_err(|e| map_insert_err(e, || format!("mover {}", mover.id)))?;
        Ok(())
    }

    fn mover(&self, id: MoverId) -> Result<Mover> {
        let conn = self.conn()?;
        load_mover(&conn, id)
    }

    fn movers(&self) -> Result<Vec<Mover>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&select_movers("ORDER BY seq"))?;
        let rows = stmt.query_map([], read_row)?;
        let mut movers = Vec::new();
        for raw in rows {
            movers.push(raw?.into_mover()?);
        }
        Ok(movers)
    }

    fn save_mover(&self, mover: &Mover) -> Result<()> {
        let conn = self.conn()?;
        update_mover(&conn, mover)
    }

    fn top_movers(&self, limit: usize) -> Result<Vec<MoverRanking>> {
        let conn = self.conn()?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = conn.prepare(&format!(
            "SELECT name, {COMPLETED_MISSIONS} FROM movers
             ORDER BY {COMPLETED_MISSIONS} DESC, seq ASC
             LIMIT ?1"
        ))?;
        let rows = stmt.query_map([limit], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut ranking = Vec::new();
        for row in rows {
            let (name, completed) = row?;
            ranking.push(MoverRanking {
                name,
                completed_missions: from_sql_int(completed, COMPLETED_MISSIONS)?,
            });
        }
        Ok(ranking)
    }
}

/// Loads one mover through an open connection or transaction.
pub(super) fn load_mover(conn: &Connection, id: MoverId) -> Result<Mover> {
    let raw = conn
        .query_row(&select_movers("WHERE id = ?1"), [id.to_string()], read_row)
        .optional()?;
    match raw {
        Some(raw) => raw.into_mover(),
        None => Err(StorageError::MoverNotFound(id)),
    }
}

/// Writes `mover` if its revision still matches, bumping the stored revision.
pub(super) fn update_mover(conn: &Connection, mover: &Mover) -> Result<()> {
    let load = serde_json::to_string(&mover.current_load)?;
    let rows = conn.execute(
        &format!(
            "UPDATE movers
             SET name = ?1, weight_limit = ?2, {COMPLETED_MISSIONS} = ?3, state = ?4,
                 current_load = ?5, revision = revision + 1
             WHERE id = ?6 AND revision = ?7"
        ),
        params![
            &mover.name,
            mover.weight_limit,
            to_sql_int(mover.completed_missions)?,
            mover.state.as_str(),
            load,
            mover.id.to_string(),
            to_sql_int(mover.revision)?,
        ],
    )?;
    if rows == 0 {
        // Gone, or someone else wrote first.
        return Err(if mover_exists(conn, mover.id)? {
            StorageError::Conflict {
                id: mover.id,
                expected: mover.revision,
            }
        } else {
            StorageError::MoverNotFound(mover.id)
        });
    }
    Ok(())
}

pub(super) fn mover_exists(conn: &Connection, id: MoverId) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM movers WHERE id = ?1", [id.to_string()], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

fn select_movers(tail: &str) -> String {
    format!(
        "SELECT id, name, weight_limit, {COMPLETED_MISSIONS}, state, current_load, revision
         FROM movers {tail}"
    )
}

/// Column values of one `movers` row, before parsing.
struct RawMover {
    id: String,
    name: String,
    weight_limit: f64,
    completed_missions: i64,
    state: String,
    current_load: String,
    revision: i64,
}

impl RawMover {
    fn into_mover(self) -> Result<Mover> {
        let id = self
            .id
            .parse::<MoverId>()
            .map_err(|e| StorageError::Corrupt(format!("invalid mover id: {e}")))?;
        let state = self
            .state
            .parse::<MoverState>()
            .map_err(StorageError::Corrupt)?;
        let current_load: Vec<ItemId> = serde_json::from_str(&self.current_load)?;
        Ok(Mover {
            id,
            name: self.name,
            weight_limit: self.weight_limit,
            completed_missions: from_sql_int(self.completed_missions, COMPLETED_MISSIONS)?,
            state,
            current_load,
            revision: from_sql_int(self.revision, "revision")?,
        })
    }
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawMover> {
    Ok(RawMover {
        id: row.get(0)?,
        name: row.get(1)?,
        weight_limit: row.get(2)?,
        completed_missions: row.get(3)?,
        state: row.get(4)?,
        current_load: row.get(5)?,
        revision: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn test_storage() -> (TempDir, Storage) {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path().join("haul")).unwrap();
        (dir, storage)
    }

    #[test]
    fn create_and_load_mover() {
        let (_dir, storage) = test_storage();
        let mover = Mover::new("Atlas", 100.0);

        storage.create_mover(&mover).unwrap();
        let loaded = storage.mover(mover.id).unwrap();

        assert_eq!(loaded, mover);
    }

    #[test]
    fn create_duplicate_mover_fails() {
        let (_dir, storage) = test_storage();
        let mover = Mover::new("Atlas", 100.0);

        storage.create_mover(&mover).unwrap();
        let err = storage.create_mover(&mover).unwrap_err();

        assert!(matches!(err, StorageError::AlreadyExists(_)));
    }

    #[test]
    fn load_nonexistent_mover_fails() {
        let (_dir, storage) = test_storage();
        let err = storage.mover(MoverId::new()).unwrap_err();

        assert!(matches!(err, StorageError::MoverNotFound(_)));
    }

    #[test]
    fn save_bumps_revision_and_replaces_fields() {
        let (_dir, storage) = test_storage();
        let mut mover = Mover::new("Atlas", 100.0);
        storage.create_mover(&mover).unwrap();

        mover.state = MoverState::Loading;
        mover.current_load = vec![ItemId::new()];
        storage.save_mover(&mover).unwrap();

        let loaded = storage.mover(mover.id).unwrap();
        assert_eq!(loaded.state, MoverState::Loading);
        assert_eq!(loaded.current_load, mover.current_load);
        assert_eq!(loaded.revision, 1);
    }

    #[test]
    fn save_with_stale_revision_conflicts() {
        let (_dir, storage) = test_storage();
        let mover = Mover::new("Atlas", 100.0);
        storage.create_mover(&mover).unwrap();

        let mut first = mover.clone();
        first.state = MoverState::Loading;
        storage.save_mover(&first).unwrap();

        // Still carries revision 0.
        let mut second = mover.clone();
        second.name = "Stale".into();
        let err = storage.save_mover(&second).unwrap_err();

        assert!(matches!(err, StorageError::Conflict { expected: 0, .. }));
        assert_eq!(storage.mover(mover.id).unwrap().name, "Atlas");
    }

    #[test]
    fn save_nonexistent_mover_fails() {
        let (_dir, storage) = test_storage();
        let err = storage.save_mover(&Mover::new("Ghost", 1.0)).unwrap_err();

        assert!(matches!(err, StorageError::MoverNotFound(_)));
    }

    #[test]
    fn movers_listed_in_creation_order() {
        let (_dir, storage) = test_storage();
        storage.create_mover(&Mover::new("First", 1.0)).unwrap();
        storage.create_mover(&Mover::new("Second", 1.0)).unwrap();

        let names: Vec<String> = storage.movers().unwrap().into_iter().map(|m| m.name).collect();
        assert_eq!(names, ["First", "Second"]);
    }

    #[test]
    fn top_movers_sorted_by_completed_missions() {
        let (_dir, storage) = test_storage();
        for (name, missions) in [("Low", 1), ("High", 9), ("Tied-a", 4), ("Tied-b", 4)] {
            let mut mover = Mover::new(name, 10.0);
            mover.completed_missions = missions;
            storage.create_mover(&mover).unwrap();
        }

        let ranking = storage.top_movers(20).unwrap();
        let names: Vec<&str> = ranking.iter().map(|r| r.name.as_str()).collect();

        assert_eq!(names, ["High", "Tied-a", "Tied-b", "Low"]);
        assert_eq!(ranking[0].completed_missions, 9);
    }

    #[test]
    fn top_movers_respects_limit() {
        let (_dir, storage) = test_storage();
        for i in 0..5 {
            storage.create_mover(&Mover::new(format!("m{i}"), 10.0)).unwrap();
        }

        assert_eq!(storage.top_movers(3).unwrap().len(), 3);
    }
}
