//! Transition commits: a mover write and its log entry in one transaction.

use rusqlite::TransactionBehavior;

use crate::model::{MissionLogEntry, Mover};

use super::{FleetStore, Result, Storage, mission_log::insert_entry, mover::update_mover};

impl FleetStore for Storage {
    fn commit_transition(&self, mover: &Mover, entry: &MissionLogEntry) -> Result<()> {
        let mut conn = self.conn()?;
        // Immediate: take the write lock up front so a second process waits
        // on `busy_timeout` instead of failing halfway through.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        update_mover(&tx, mover)?;
        insert_entry(&tx, entry)?;
        tx.commit()?;
        Ok(())
    }
}
