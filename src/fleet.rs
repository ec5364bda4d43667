//! The mover lifecycle engine.
//!
//! A mover cycles `resting → loading → on-mission → resting`. Each
//! transition is a read-check-commit against the store: the mover is read
//! fresh, its state and load are checked, and the updated mover is committed
//! together with its mission log entry. Nothing is cached between calls.
//!
//! Two guards keep writers on one mover from racing. Within a process, a
//! per-mover lock serializes operations. Across processes sharing a
//! database, the store rejects a commit whose revision has gone stale.

mod error;
mod locks;

use std::collections::HashSet;

use crate::model::{Item, ItemId, MissionAction, MissionLogEntry, Mover, MoverId, MoverRanking, MoverState};
use crate::storage::FleetStore;

pub use error::{ErrorKind, FleetError, Transition};

use locks::MoverLocks;

pub type Result<T> = core::result::Result<T, FleetError>;

/// How many movers the leaderboard shows.
pub const TOP_MOVERS_LIMIT: usize = 20;

/// Lifecycle operations over a fleet store.
pub struct Fleet<S> {
    store: S,
    locks: MoverLocks,
}

impl<S: FleetStore> Fleet<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: MoverLocks::default(),
        }
    }

    /// The underlying store.
    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Registers a new resting mover with no missions.
    pub fn create_mover(&self, name: &str, weight_limit: f64) -> Result<Mover> {
        let name = require_name(name)?;
        if !is_positive(weight_limit) {
            return Err(FleetError::InvalidInput(
                "weight limit must be a positive number".into(),
            ));
        }
        let mover = Mover::new(name, weight_limit);
        self.store.create_mover(&mover)?;
        Ok(mover)
    }

    /// Registers a new item.
    pub fn create_item(&self, name: &str, weight: f64) -> Result<Item> {
        let name = require_name(name)?;
        if !is_positive(weight) {
            return Err(FleetError::InvalidInput(
                "weight must be a positive number".into(),
            ));
        }
        let item = Item {
            id: ItemId::new(),
            name: name.to_string(),
            weight,
        };
        self.store.create_item(&item)?;
        Ok(item)
    }

    /// Puts `item_ids` aboard a resting mover.
    ///
    /// The mover is checked first: it must exist and be resting. Then every
    /// id must name an existing item, and no id may repeat. The total weight
    /// is checked against the mover's limit before anything is written.
    pub fn load_mover(&self, mover_id: MoverId, item_ids: &[ItemId]) -> Result<Mover> {
        self.locks.with(mover_id, || -> Result<Mover> {
            let mut mover = self.store.mover(mover_id)?;
            match mover.state {
                MoverState::Resting => {}
                MoverState::Loading | MoverState::OnMission => {
                    return Err(FleetError::InvalidStateTransition(Transition::Load));
                }
            }

            let mut seen = HashSet::with_capacity(item_ids.len());
            if let Some(dup) = item_ids.iter().find(|id| !seen.insert(**id)) {
                return Err(FleetError::InvalidInput(format!(
                    "item {dup} is listed more than once"
                )));
            }

            let items = self.store.items_by_ids(item_ids)?;
            if items.len() != item_ids.len() {
                let unknown = item_ids
                    .iter()
                    .filter(|id| !items.iter().any(|item| item.id == **id))
                    .copied()
                    .collect();
                return Err(FleetError::UnknownItems(unknown));
            }

            let total: f64 = items.iter().map(|item| item.weight).sum();
            if total > mover.weight_limit {
                return Err(FleetError::CapacityExceeded {
                    total,
                    limit: mover.weight_limit,
                });
            }

            mover.current_load = item_ids.to_vec();
            mover.state = MoverState::Loading;
            let entry = MissionLogEntry::new(mover.id, MissionAction::Loading, item_ids.to_vec());
            self.commit(mover, &entry)
        })
    }

    /// Sends a loaded mover out. Counts the mission as completed now.
    pub fn start_mission(&self, mover_id: MoverId) -> Result<Mover> {
        self.locks.with(mover_id, || -> Result<Mover> {
            let mut mover = self.store.mover(mover_id)?;
            match mover.state {
                MoverState::Loading => {}
                MoverState::Resting | MoverState::OnMission => {
                    return Err(FleetError::InvalidStateTransition(
                        Transition::StartMission,
                    ));
                }
            }

            mover.state = MoverState::OnMission;
            mover.completed_missions += 1;
            let entry = MissionLogEntry::new(mover.id, MissionAction::StartMission, Vec::new());
            self.commit(mover, &entry)
        })
    }

    /// Brings a mover home and releases its load.
    pub fn end_mission(&self, mover_id: MoverId) -> Result<Mover> {
        self.locks.with(mover_id, || -> Result<Mover> {
            let mut mover = self.store.mover(mover_id)?;
            match mover.state {
                MoverState::OnMission => {}
                MoverState::Resting | MoverState::Loading => {
                    return Err(FleetError::InvalidStateTransition(Transition::EndMission));
                }
            }

            let released = std::mem::take(&mut mover.current_load);
            mover.state = MoverState::Resting;
            let entry = MissionLogEntry::new(mover.id, MissionAction::EndMission, released);
            self.commit(mover, &entry)
        })
    }

    /// The leaderboard: up to [`TOP_MOVERS_LIMIT`] movers by completed missions.
    pub fn top_movers(&self) -> Result<Vec<MoverRanking>> {
        Ok(self.store.top_movers(TOP_MOVERS_LIMIT)?)
    }

    /// Loads one mover.
    pub fn mover(&self, mover_id: MoverId) -> Result<Mover> {
        Ok(self.store.mover(mover_id)?)
    }

    /// All movers in creation order.
    pub fn movers(&self) -> Result<Vec<Mover>> {
        Ok(self.store.movers()?)
    }

    /// Loads one item.
    pub fn item(&self, item_id: ItemId) -> Result<Item> {
        Ok(self.store.item(item_id)?)
    }

    /// All items in creation order.
    pub fn items(&self) -> Result<Vec<Item>> {
        Ok(self.store.items()?)
    }

    /// A mover's mission log, oldest first.
    pub fn mission_log(&self, mover_id: MoverId) -> Result<Vec<MissionLogEntry>> {
        // Distinguish "no entries yet" from "no such mover".
        self.store.mover(mover_id)?;
        Ok(self.store.entries_for(mover_id)?)
    }

    /// Writes the mover and its entry, returning the mover as now stored.
    fn commit(&self, mut mover: Mover, entry: &MissionLogEntry) -> Result<Mover> {
        self.store.commit_transition(&mover, entry)?;
        mover.revision += 1;
        Ok(mover)
    }
}

fn require_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FleetError::InvalidInput("name is required".into()));
    }
    Ok(name)
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
