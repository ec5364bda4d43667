//! Mission log types: the immutable record of every lifecycle transition.

use std::{fmt, str::FromStr};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::{EntryId, ItemId, MoverId};

/// One lifecycle transition of one mover.
///
/// Written once, never updated or deleted. `items` is a snapshot of the
/// load at the time of the transition, not a live reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionLogEntry {
    pub id: EntryId,
    pub mover_id: MoverId,
    pub action: MissionAction,
    pub items: Vec<ItemId>,
    pub timestamp: Timestamp,
}

impl MissionLogEntry {
    /// A new entry stamped with the current time.
    #[must_use]
    pub fn new(mover_id: MoverId, action: MissionAction, items: Vec<ItemId>) -> Self {
        Self {
            id: EntryId::new(),
            mover_id,
            action,
            items,
            timestamp: Timestamp::now(),
        }
    }
}

/// Which transition an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissionAction {
    /// Cargo went aboard. Carries the loaded item ids.
    Loading,

    /// The mover departed. Carries no items.
    StartMission,

    /// The mover returned. Carries the released item ids.
    EndMission,
}

impl MissionAction {
    /// Stable text form, used for storage and display.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::StartMission => "start-mission",
            Self::EndMission => "end-mission",
        }
    }
}

impl fmt::Display for MissionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MissionAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "loading" => Ok(Self::Loading),
            "start-mission" => Ok(Self::StartMission),
            "end-mission" => Ok(Self::EndMission),
            other => Err(format!("unknown mission action: {other}")),
        }
    }
}
