//! Mover types: capacity-bounded units that carry items on missions.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::{ItemId, MoverId};

/// A capacity-bounded unit that is loaded with items and sent on missions.
///
/// A resting mover carries nothing. While loading or on a mission the
/// current load never weighs more than `weight_limit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mover {
    pub id: MoverId,
    pub name: String,
    pub weight_limit: f64,

    /// Bumped when a mission starts, not when it ends.
    pub completed_missions: u64,

    pub state: MoverState,
    pub current_load: Vec<ItemId>,

    /// Write guard. A save only lands if the stored revision still matches.
    pub revision: u64,
}

impl Mover {
    /// A new resting mover with no missions and nothing loaded.
    #[must_use]
    pub fn new(name: impl Into<String>, weight_limit: f64) -> Self {
        Self {
            id: MoverId::new(),
            name: name.into(),
            weight_limit,
            completed_missions: 0,
            state: MoverState::Resting,
            current_load: Vec::new(),
            revision: 0,
        }
    }
}

/// Where a mover stands in its lifecycle.
///
/// `Resting → Loading → OnMission → Resting`, repeating. There is no
/// terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MoverState {
    /// Idle and empty. The only state that accepts a load.
    Resting,

    /// Cargo is aboard; waiting to depart.
    Loading,

    /// Out on a mission with its cargo.
    OnMission,
}

impl MoverState {
    /// Stable text form, used for storage and display.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resting => "resting",
            Self::Loading => "loading",
            Self::OnMission => "on-mission",
        }
    }
}

impl fmt::Display for MoverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MoverState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "resting" => Ok(Self::Resting),
            "loading" => Ok(Self::Loading),
            "on-mission" => Ok(Self::OnMission),
            other => Err(format!("unknown mover state: {other}")),
        }
    }
}

/// A mover's standing in the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoverRanking {
    pub name: String,
    pub completed_missions: u64,
}

impl From<&Mover> for MoverRanking {
    fn from(mover: &Mover) -> Self {
        Self {
            name: mover.name.clone(),
            completed_missions: mover.completed_missions,
        }
    }
}
