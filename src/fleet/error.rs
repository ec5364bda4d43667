//! Engine failures and how callers should treat them.

use std::fmt;

use crate::model::{ItemId, MoverId};
use crate::storage::StorageError;

/// A lifecycle transition, named for the error it produces when the mover
/// is in the wrong state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Load,
    StartMission,
    EndMission,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Load => "mover must be resting to load items",
            Self::StartMission => "mover must be loaded to start a mission",
            Self::EndMission => "mover must be on mission to end it",
        })
    }
}

/// Why an engine operation failed.
#[derive(Debug, thiserror::Error)]
pub enum FleetError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("unknown item ids: {}", join_ids(.0))]
    UnknownItems(Vec<ItemId>),

    #[error("mover not found: {0}")]
    MoverNotFound(MoverId),

    #[error("item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("{0}")]
    InvalidStateTransition(Transition),

    #[error("total weight {total} exceeds mover limit {limit}")]
    CapacityExceeded { total: f64, limit: f64 },

    #[error("mover {0} was modified concurrently; re-read and try again")]
    Conflict(MoverId),

    #[error(transparent)]
    Store(StorageError),
}

impl From<StorageError> for FleetError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::MoverNotFound(id) => Self::MoverNotFound(id),
            StorageError::ItemNotFound(id) => Self::ItemNotFound(id),
            StorageError::Conflict { id, .. } => Self::Conflict(id),
            other => Self::Store(other),
        }
    }
}

/// Coarse classification of a [`FleetError`], stable across messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or out-of-range arguments. A caller bug; never retried.
    InvalidInput,
    /// The referenced mover or item does not exist.
    NotFound,
    /// The mover is in the wrong lifecycle state.
    InvalidStateTransition,
    /// The requested load is heavier than the mover's limit.
    CapacityExceeded,
    /// Another writer changed the mover between read and write.
    Conflict,
    /// The store failed. Retrying later may help.
    StoreUnavailable,
}

impl FleetError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) | Self::UnknownItems(_) => ErrorKind::InvalidInput,
            Self::MoverNotFound(_) | Self::ItemNotFound(_) => ErrorKind::NotFound,
            Self::InvalidStateTransition(_) => ErrorKind::InvalidStateTransition,
            Self::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Store(_) => ErrorKind::StoreUnavailable,
        }
    }

    /// Whether the same call might succeed if simply repeated.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(e) => e.is_transient(),
            _ => false,
        }
    }
}

fn join_ids(ids: &[ItemId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
