//! Mover commands: register, list, inspect.

use clap::Subcommand;
use tracing::info;

use super::{CliError, Output, format, resolve_mover};
use crate::fleet::Fleet;
use crate::storage::FleetStore;

#[derive(Debug, Subcommand)]
pub enum MoverCommand {
    /// Register a new mover. Prints its ID.
    New {
        /// Display name.
        name: String,

        /// Heaviest total load the mover can carry.
        #[arg(long)]
        limit: f64,
    },

    /// List all movers in creation order.
    List,

    /// Show one mover in detail.
    Show {
        /// Mover ID or prefix.
        mover: String,
    },
}

pub(super) fn run<S: FleetStore>(
    command: MoverCommand,
    fleet: &Fleet<S>,
    out: &Output,
) -> Result<(), CliError> {
    match command {
        MoverCommand::New { name, limit } => {
            let mover = fleet.create_mover(&name, limit)?;
            info!(mover = %mover.id, name = %mover.name, "mover registered");
            out.success("Mover added", &mover, || mover.id.to_string())
        }
        MoverCommand::List => {
            let movers = fleet.movers()?;
            out.success("Movers retrieved", &movers, || {
                if movers.is_empty() {
                    return "No movers.".to_string();
                }
                movers
                    .iter()
                    .map(format::format_mover)
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        MoverCommand::Show { mover } => {
            let id = resolve_mover(fleet, &mover)?;
            let mover = fleet.mover(id)?;
            out.success("Mover retrieved", &mover, || {
                format::format_mover_detail(&mover)
            })
        }
    }
}
