//! Lifecycle commands: load, start, end, plus the leaderboard and log.

use tracing::{info, warn};

use super::{CliError, Output, format};
use crate::fleet::{Fleet, FleetError};
use crate::model::{ItemId, MoverId};
use crate::storage::FleetStore;

pub(super) fn cmd_load<S: FleetStore>(
    fleet: &Fleet<S>,
    out: &Output,
    mover_id: MoverId,
    item_ids: &[ItemId],
) -> Result<(), CliError> {
    let mover = fleet.load_mover(mover_id, item_ids).inspect_err(note_rejection)?;
    info!(mover = %mover.id, items = item_ids.len(), "mover loaded");
    out.success("Mover loaded", &mover, || format::format_mover(&mover))
}

pub(super) fn cmd_start<S: FleetStore>(
    fleet: &Fleet<S>,
    out: &Output,
    mover_id: MoverId,
) -> Result<(), CliError> {
    let mover = fleet.start_mission(mover_id).inspect_err(note_rejection)?;
    info!(mover = %mover.id, missions = mover.completed_missions, "mission started");
    out.success("Mission started", &mover, || format::format_mover(&mover))
}

pub(super) fn cmd_end<S: FleetStore>(
    fleet: &Fleet<S>,
    out: &Output,
    mover_id: MoverId,
) -> Result<(), CliError> {
    let mover = fleet.end_mission(mover_id).inspect_err(note_rejection)?;
    info!(mover = %mover.id, "mission ended");
    out.success("Mission ended", &mover, || format::format_mover(&mover))
}

pub(super) fn cmd_top<S: FleetStore>(fleet: &Fleet<S>, out: &Output) -> Result<(), CliError> {
    let rankings = fleet.top_movers()?;
    out.success("Top movers retrieved", &rankings, || {
        format::format_rankings(&rankings)
    })
}

pub(super) fn cmd_log<S: FleetStore>(
    fleet: &Fleet<S>,
    out: &Output,
    mover_id: MoverId,
) -> Result<(), CliError> {
    let entries = fleet.mission_log(mover_id)?;
    out.success("Mission log retrieved", &entries, || {
        if entries.is_empty() {
            return "No log entries.".to_string();
        }
        entries
            .iter()
            .map(format::format_entry)
            .collect::<Vec<_>>()
            .join("\n")
    })
}

/// Rejected transitions are expected traffic; store failures are not.
fn note_rejection(err: &FleetError) {
    if err.is_retryable() {
        warn!(error = %err, "transition failed on a transient store error");
    } else {
        info!(kind = ?err.kind(), error = %err, "transition rejected");
    }
}
