//! In-process storage for tests. Not durable.

use std::{
    cmp::Reverse,
    sync::{Mutex, MutexGuard},
};

use crate::model::{Item, ItemId, MissionLogEntry, Mover, MoverId, MoverRanking};

use super::{FleetStore, ItemStore, MissionLogStore, MoverStore, Result, StorageError};

/// Keeps every collection in a `Vec`, so insertion order is creation order.
#[derive(Default)]
pub struct MemoryStorage {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    items: Vec<Item>,
    movers: Vec<Mover>,
    log: Vec<MissionLogEntry>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StorageError::Unavailable("memory storage lock poisoned".into()))
    }
}

impl Inner {
    fn mover_index(&self, id: MoverId) -> Option<usize> {
        self.movers.iter().position(|m| m.id == id)
    }

    fn update_mover(&mut self, mover: &Mover) -> Result<()> {
        let idx = self
            .mover_index(mover.id)
            .ok_or(StorageError::MoverNotFound(mover.id))?;
        let stored = &mut self.movers[idx];
        if stored.revision != mover.revision {
            return Err(StorageError::Conflict {
                id: mover.id,
                expected: mover.revision,
            });
        }
        *stored = Mover {
            revision: mover.revision + 1,
            ..mover.clone()
        };
        Ok(())
    }

    fn check_entry(&self, entry: &MissionLogEntry) -> Result<()> {
        if self.mover_index(entry.mover_id).is_none() {
            return Err(StorageError::MoverNotFound(entry.mover_id));
        }
        if self.log.iter().any(|e| e.id == entry.id) {
            return Err(StorageError::AlreadyExists(format!(
                "mission log entry {}",
                entry.id
            )));
        }
        Ok(())
    }
}

impl ItemStore for MemoryStorage {
    fn create_item(&self, item: &Item) -> Result<()> {
        let mut inner = self.inner()?;
        if inner.items.iter().any(|i| i.id == item.id) {
            return Err(StorageError::AlreadyExists(format!("item {}", item.id)));
        }
        inner.items.push(item.clone());
        Ok(())
    }

    fn item(&self, id: ItemId) -> Result<Item> {
        let inner = self.inner()?;
        inner
            .items
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or(StorageError::ItemNotFound(id))
    }

    fn items_by_ids(&self, ids: &[ItemId]) -> Result<Vec<Item>> {
        let inner = self.inner()?;
        Ok(inner
            .items
            .iter()
            .filter(|i| ids.contains(&i.id))
            .cloned()
            .collect())
    }

    fn items(&self) -> Result<Vec<Item>> {
        Ok(self.inner()?.items.clone())
    }
}

impl MoverStore for MemoryStorage {
    fn create_mover(&self, mover: &Mover) -> Result<()> {
        let mut inner = self.inner()?;
        if inner.mover_index(mover.id).is_some() {
            return Err(StorageError::AlreadyExists(format!("mover {}", mover.id)));
        }
        inner.movers.push(mover.clone());
        Ok(())
    }

    fn mover(&self, id: MoverId) -> Result<Mover> {
        let inner = self.inner()?;
        inner
            .mover_index(id)
            .map(|idx| inner.movers[idx].clone())
            .ok_or(StorageError::MoverNotFound(id))
    }

    fn movers(&self) -> Result<Vec<Mover>> {
        Ok(self.inner()?.movers.clone())
    }

    fn save_mover(&self, mover: &Mover) -> Result<()> {
        self.inner()?.update_mover(mover)
    }

    fn top_movers(&self, limit: usize) -> Result<Vec<MoverRanking>> {
        let inner = self.inner()?;
        let mut ranked: Vec<&Mover> = inner.movers.iter().collect();
        // Stable sort: ties keep creation order.
        ranked.sort_by_key(|m| Reverse(m.completed_missions));
        Ok(ranked
            .into_iter()
            .take(limit)
            .map(MoverRanking::from)
            .collect())
    }
}

impl MissionLogStore for MemoryStorage {
    fn append_entry(&self, entry: &MissionLogEntry) -> Result<()> {
        let mut inner = self.inner()?;
        inner.check_entry(entry)?;
        inner.log.push(entry.clone());
        Ok(())
    }

    fn entries_for(&self, mover_id: MoverId) -> Result<Vec<MissionLogEntry>> {
        let inner = self.inner()?;
        Ok(inner
            .log
            .iter()
            .filter(|e| e.mover_id == mover_id)
            .cloned()
            .collect())
    }
}

impl FleetStore for MemoryStorage {
    fn commit_transition(&self, mover: &Mover, entry: &MissionLogEntry) -> Result<()> {
        let mut inner = self.inner()?;
        // Check the entry before touching the mover so a failure leaves both untouched.
        inner.check_entry(entry)?;
        inner.update_mover(mover)?;
        inner.log.push(entry.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::{MissionAction, MoverState};

    #[test]
    fn new_storage_is_empty() {
        let storage = MemoryStorage::new();
        assert!(storage.items().unwrap().is_empty());
        assert!(storage.movers().unwrap().is_empty());
        assert!(storage.top_movers(20).unwrap().is_empty());
    }

    #[test]
    fn create_and_get_mover() {
        let storage = MemoryStorage::new();
        let mover = Mover::new("Atlas", 100.0);
        storage.create_mover(&mover).unwrap();

        assert_eq!(storage.mover(mover.id).unwrap(), mover);
        assert!(matches!(
            storage.create_mover(&mover).unwrap_err(),
            StorageError::AlreadyExists(_)
        ));
    }

    #[test]
    fn get_missing_item() {
        let storage = MemoryStorage::new();
        let err = storage.item(ItemId::new()).unwrap_err();
        assert!(matches!(err, StorageError::ItemNotFound(_)));
    }

    #[test]
    fn items_by_ids_omits_missing() {
        let storage = MemoryStorage::new();
        let item = Item {
            id: ItemId::new(),
            name: "Anvil".into(),
            weight: 40.0,
        };
        storage.create_item(&item).unwrap();

        let found = storage.items_by_ids(&[ItemId::new(), item.id]).unwrap();
        assert_eq!(found, vec![item]);
    }

    #[test]
    fn save_checks_revision() {
        let storage = MemoryStorage::new();
        let mut mover = Mover::new("Atlas", 100.0);
        storage.create_mover(&mover).unwrap();

        mover.state = MoverState::Loading;
        storage.save_mover(&mover).unwrap();
        assert_eq!(storage.mover(mover.id).unwrap().revision, 1);

        let err = storage.save_mover(&mover).unwrap_err();
        assert!(matches!(err, StorageError::Conflict { expected: 0, .. }));
    }

    #[test]
    fn top_movers_ties_keep_creation_order() {
        let storage = MemoryStorage::new();
        for (name, missions) in [("a", 2), ("b", 5), ("c", 2)] {
            let mut mover = Mover::new(name, 1.0);
            mover.completed_missions = missions;
            storage.create_mover(&mover).unwrap();
        }

        let names: Vec<String> = storage
            .top_movers(20)
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, ["b", "a", "c"]);
    }

    #[test]
    fn failed_commit_leaves_mover_untouched() {
        let storage = MemoryStorage::new();
        let mut mover = Mover::new("Atlas", 100.0);
        storage.create_mover(&mover).unwrap();
        let entry = MissionLogEntry::new(mover.id, MissionAction::Loading, vec![]);
        storage.append_entry(&entry).unwrap();

        mover.state = MoverState::Loading;
        assert!(storage.commit_transition(&mover, &entry).is_err());

        assert_eq!(storage.mover(mover.id).unwrap().state, MoverState::Resting);
        assert_eq!(storage.entries_for(mover.id).unwrap().len(), 1);
    }
}
