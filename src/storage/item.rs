//! Item storage: create and look up items.

use rusqlite::{Connection, Row, params};

use crate::model::{Item, ItemId};

use super::{ItemStore, Result, Storage, StorageError, map_insert_err};

impl ItemStore for Storage {
    fn create_item(&self, item: &Item) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO items (id, name, weight) VALUES (?1, ?2, ?3)",
            params![item.id.to_string(), &item.name, item.weight],
        )
        .map_err(|e| map_insert_err(e, || format!("item {}", item.id)))?;
        Ok(())
    }

    fn item(&self, id: ItemId) -> Result<Item> {
        let conn = self.conn()?;
        let raw = conn.query_row(
            "SELECT id, name, weight FROM items WHERE id = ?1",
            [id.to_string()],
            read_row,
        );
        match raw {
            Ok(raw) => raw.into_item(),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(StorageError::ItemNotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    fn items_by_ids(&self, ids: &[ItemId]) -> Result<Vec<Item>> {
        let conn = self.conn()?;
        select_by_ids(&conn, ids, MAX_IDS_PER_QUERY)
    }

    fn items(&self) -> Result<Vec<Item>> {
        let conn = self.conn()?;
        query_items(&conn, "SELECT id, name, weight FROM items ORDER BY seq", [])
    }
}

/// Ids bound per `IN (...)` query, well under `SQLite`'s variable limit.
const MAX_IDS_PER_QUERY: usize = 500;

/// Looks `ids` up `chunk` at a time and returns the hits in creation order.
fn select_by_ids(conn: &Connection, ids: &[ItemId], chunk: usize) -> Result<Vec<Item>> {
    let mut found: Vec<(i64, Item)> = Vec::new();
    for batch in ids.chunks(chunk) {
        let placeholders = vec!["?"; batch.len()].join(", ");
        let sql = format!("SELECT seq, id, name, weight FROM items WHERE id IN ({placeholders})");
        let keys: Vec<String> = batch.iter().map(ToString::to_string).collect();

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(keys.iter()), |row| {
            let seq: i64 = row.get(0)?;
            let raw = RawItem {
                id: row.get(1)?,
                name: row.get(2)?,
                weight: row.get(3)?,
            };
            Ok((seq, raw))
        })?;
        for row in rows {
            let (seq, raw) = row?;
            found.push((seq, raw.into_item()?));
        }
    }
    found.sort_by_key(|(seq, _)| *seq);
    Ok(found.into_iter().map(|(_, item)| item).collect())
}

/// Column values of one `items` row, before parsing.
struct RawItem {
    id: String,
    name: String,
    weight: f64,
}

impl RawItem {
    fn into_item(self) -> Result<Item> {
        let id = self
            .id
            .parse::<ItemId>()
            .map_err(|e| StorageError::Corrupt(format!("invalid item id: {e}")))?;
        Ok(Item {
            id,
            name: self.name,
            weight: self.weight,
        })
    }
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawItem> {
    Ok(RawItem {
        id: row.get(0)?,
        name: row.get(1)?,
        weight: row.get(2)?,
    })
}

fn query_items(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Item>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, read_row)?;
    let mut items = Vec::new();
    for raw in rows {
        items.push(raw?.into_item()?);
    }
    Ok(items)
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

    fn sample_item(name: &str, weight: f64) -> Item {
        Item {
            id: ItemId::new(),
            name: name.into(),
            weight,
        }
    }

    #[test]
    fn create_and_load_item() {
        let (_dir, storage) = test_storage();
        let item = sample_item("Crate of apples", 12.5);

        storage.create_item(&item).unwrap();
        let loaded = storage.item(item.id).unwrap();

        assert_eq!(loaded, item);
    }

    #[test]
    fn create_duplicate_item_fails() {
        let (_dir, storage) = test_storage();
        let item = sample_item("Crate of apples", 12.5);

        storage.create_item(&item).unwrap();
        let err = storage.create_item(&item).unwrap_err();

        assert!(matches!(err, StorageError::AlreadyExists(_)));
    }

    #[test]
    fn load_nonexistent_item_fails() {
        let (_dir, storage) = test_storage();
        let err = storage.item(ItemId::new()).unwrap_err();

        assert!(matches!(err, StorageError::ItemNotFound(_)));
    }

    #[test]
    fn items_by_ids_omits_missing() {
        let (_dir, storage) = test_storage();
        let a = sample_item("A", 1.0);
        let b = sample_item("B", 2.0);
        storage.create_item(&a).unwrap();
        storage.create_item(&b).unwrap();

        let found = storage.items_by_ids(&[b.id, ItemId::new(), a.id]).unwrap();

        // Creation order, not request order.
        assert_eq!(found, vec![a, b]);
    }

    #[test]
    fn items_by_ids_spans_query_batches() {
        let (_dir, storage) = test_storage();
        let created: Vec<Item> = (0..5)
            .map(|n| {
                let item = sample_item(&format!("item {n}"), 1.0);
                storage.create_item(&item).unwrap();
                item
            })
            .collect();
        let request: Vec<ItemId> = created.iter().rev().map(|i| i.id).collect();

        let conn = storage.conn().unwrap();
        let found = select_by_ids(&conn, &request, 2).unwrap();

        assert_eq!(found, created);
    }

    #[test]
    fn items_by_ids_accepts_more_ids_than_one_query_binds() {
        let (_dir, storage) = test_storage();
        let kept = sample_item("kept", 1.0);
        storage.create_item(&kept).unwrap();
        let mut request: Vec<ItemId> = (0..MAX_IDS_PER_QUERY * 3).map(|_| ItemId::new()).collect();
        request.push(kept.id);

        let found = storage.items_by_ids(&request).unwrap();

        assert_eq!(found, vec![kept]);
    }

    #[test]
    fn items_by_ids_empty_request() {
        let (_dir, storage) = test_storage();
        assert!(storage.items_by_ids(&[]).unwrap().is_empty());
    }

    #[test]
    fn items_listed_in_creation_order() {
        let (_dir, storage) = test_storage();
        let first = sample_item("First", 1.0);
        let second = sample_item("Second", 2.0);
        storage.create_item(&first).unwrap();
        storage.create_item(&second).unwrap();

        let names: Vec<String> = storage.items().unwrap().into_iter().map(|i| i.name).collect();
        assert_eq!(names, ["First", "Second"]);
    }
}
