//! Item types: the cargo movers carry.

use serde::{Deserialize, Serialize};

use super::ItemId;

/// A discrete unit of cargo with a fixed weight.
///
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub weight: f64,
}
