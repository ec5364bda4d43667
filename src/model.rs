//! Core data model for Haul.
//!
//! These types represent the fleet: items of cargo, the movers that carry
//! them, and the append-only mission log that records every transition.

mod ids;
mod item;
mod mission_log;
mod mover;

pub use ids::{EntryId, ItemId, MoverId};
pub use item::Item;
pub use mission_log::{MissionAction, MissionLogEntry};
pub use mover::{Mover, MoverRanking, MoverState};
