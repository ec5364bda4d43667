//! Item commands: register, list, inspect.

use clap::Subcommand;
use tracing::info;

use super::{CliError, Output, format, resolve_item};
use crate::fleet::Fleet;
use crate::storage::FleetStore;

#[derive(Debug, Subcommand)]
pub enum ItemCommand {
    /// Register a new item. Prints its ID.
    New {
        /// Display name.
        name: String,

        /// Item weight, in the same unit as mover limits.
        #[arg(long)]
        weight: f64,
    },

    /// List all items in creation order.
    List,

    /// Show one item.
    Show {
        /// Item ID or prefix.
        item: String,
    },
}

pub(super) fn run<S: FleetStore>(
    command: ItemCommand,
    fleet: &Fleet<S>,
    out: &Output,
) -> Result<(), CliError> {
    match command {
        ItemCommand::New { name, weight } => {
            let item = fleet.create_item(&name, weight)?;
            info!(item = %item.id, weight = item.weight, "item registered");
            out.success("Item added", &item, || item.id.to_string())
        }
        ItemCommand::List => {
            let items = fleet.items()?;
            out.success("Items retrieved", &items, || {
                if items.is_empty() {
                    return "No items.".to_string();
                }
                items
                    .iter()
                    .map(format::format_item)
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        ItemCommand::Show { item } => {
            let id = resolve_item(fleet, &item)?;
            let item = fleet.item(id)?;
            out.success("Item retrieved", &item, || format::format_item(&item))
        }
    }
}
