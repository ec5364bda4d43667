//! CLI interface for Haul.
//!
//! Each subcommand is non-interactive: arguments in, structured output out.
//! The CLI is the transport around the lifecycle engine. It resolves id
//! references, calls exactly one engine operation, prints the result, and
//! maps failures to stable exit codes.
//!
//! Movers and items are referenced by full UUID or unambiguous prefix.

mod format;
mod item;
mod mission;
mod mover;

use std::{
    cell::RefCell,
    fmt,
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};

use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::config::ConfigError;
use crate::fleet::{ErrorKind, Fleet, FleetError};
use crate::model::{ItemId, MoverId};
use crate::storage::FleetStore;

pub use item::ItemCommand;
pub use mover::MoverCommand;

/// Haul: load movers, send them on missions, keep the log.
#[derive(Debug, Parser)]
#[command(name = "haul", version, after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    /// Directory holding `haul.sqlite`. Overrides `HAUL_DATA_DIR` and the config file.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Print a JSON envelope instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r"Workflow: one mission
  1. haul mover new Atlas --limit 100       → prints a mover ID (e.g. 3f2a9c01)
  2. haul item new crate --weight 60        → prints an item ID (e.g. b71e0d44)
  3. haul load 3f2 b71
  4. haul start 3f2
  5. haul end 3f2
  6. haul log 3f2                           → loading, start-mission, end-mission

Leaderboard:
  haul top";

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage movers: create, list, inspect.
    Mover {
        #[command(subcommand)]
        command: MoverCommand,
    },

    /// Manage items: create, list, inspect.
    Item {
        #[command(subcommand)]
        command: ItemCommand,
    },

    /// Load items onto a resting mover.
    Load {
        /// Mover ID or prefix.
        mover: String,

        /// Item IDs or prefixes. The total weight must fit the mover's limit.
        items: Vec<String>,
    },

    /// Send a loaded mover on its mission.
    Start {
        /// Mover ID or prefix.
        mover: String,
    },

    /// End a mover's mission and release its load.
    End {
        /// Mover ID or prefix.
        mover: String,
    },

    /// Show the movers with the most missions.
    Top,

    /// Show a mover's mission log, oldest first.
    Log {
        /// Mover ID or prefix.
        mover: String,
    },
}

/// Failures the CLI reports.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Fleet(#[from] FleetError),

    #[error("{0}")]
    NoMatch(String),

    #[error("{0}")]
    Ambiguous(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to serialize output: {0}")]
    Output(#[from] serde_json::Error),

    #[error("failed to write output: {0}")]
    Write(#[from] io::Error),
}

impl CliError {
    /// Stable process exit code for this failure.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        let code = match self {
            Self::Fleet(e) => match e.kind() {
                ErrorKind::InvalidInput => 2,
                ErrorKind::NotFound => 3,
                ErrorKind::InvalidStateTransition => 4,
                ErrorKind::CapacityExceeded => 5,
                ErrorKind::Conflict => 6,
                ErrorKind::StoreUnavailable => 7,
            },
            Self::Ambiguous(_) => 2,
            Self::NoMatch(_) => 3,
            Self::Config(_) | Self::Output(_) | Self::Write(_) => 1,
        };
        ExitCode::from(code)
    }

    /// Short label for the failure, used in JSON output.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Fleet(e) => match e.kind() {
                ErrorKind::InvalidInput => "invalid-input",
                ErrorKind::NotFound => "not-found",
                ErrorKind::InvalidStateTransition => "invalid-state-transition",
                ErrorKind::CapacityExceeded => "capacity-exceeded",
                ErrorKind::Conflict => "conflict",
                ErrorKind::StoreUnavailable => "store-unavailable",
            },
            Self::Ambiguous(_) => "invalid-input",
            Self::NoMatch(_) => "not-found",
            Self::Config(_) => "config",
            Self::Output(_) | Self::Write(_) => "internal",
        }
    }
}

/// Where command results go.
///
/// Results are written to stdout, or to any writer in tests. Text-mode
/// failures always go to stderr.
pub struct Output {
    json: bool,
    writer: RefCell<Box<dyn Write>>,
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    message: &'a str,
    data: T,
    success: bool,
}

impl Output {
    #[must_use]
    pub fn new(json: bool) -> Self {
        Self::with_writer(json, io::stdout())
    }

    fn with_writer(json: bool, writer: impl Write + 'static) -> Self {
        Self {
            json,
            writer: RefCell::new(Box::new(writer)),
        }
    }

    /// Print a successful result: the JSON envelope, or `human` as text.
    fn success<T: Serialize>(
        &self,
        message: &str,
        data: &T,
        human: impl FnOnce() -> String,
    ) -> Result<(), CliError> {
        if self.json {
            let envelope = Envelope {
                message,
                data,
                success: true,
            };
            let body = serde_json::to_string_pretty(&envelope)?;
            self.write_line(&body)
        } else {
            self.write_line(&human())
        }
    }

    /// Print a failure. JSON goes to the result writer so scripts can parse
    /// it; text goes to stderr.
    pub fn failure(&self, err: &CliError) {
        if !self.json {
            eprintln!("Error: {err}");
            return;
        }
        let body = serde_json::json!({
            "message": err.to_string(),
            "type": err.label(),
            "success": false,
        });
        if let Err(e) = self.write_line(&format!("{body:#}")) {
            eprintln!("Error: {err} ({e})");
        }
    }

    fn write_line(&self, line: &str) -> Result<(), CliError> {
        let mut writer = self.writer.borrow_mut();
        writeln!(writer, "{line}")?;
        writer.flush()?;
        Ok(())
    }
}

/// Run one parsed command against the fleet.
pub fn run<S: FleetStore>(command: Command, fleet: &Fleet<S>, out: &Output) -> Result<(), CliError> {
    match command {
        Command::Mover { command } => mover::run(command, fleet, out),
        Command::Item { command } => item::run(command, fleet, out),
        Command::Load { mover, items } => {
            let mover_id = resolve_mover(fleet, &mover)?;
            let item_ids = items
                .iter()
                .map(|reference| resolve_item(fleet, reference))
                .collect::<Result<Vec<_>, _>>()?;
            mission::cmd_load(fleet, out, mover_id, &item_ids)
        }
        Command::Start { mover } => {
            let mover_id = resolve_mover(fleet, &mover)?;
            mission::cmd_start(fleet, out, mover_id)
        }
        Command::End { mover } => {
            let mover_id = resolve_mover(fleet, &mover)?;
            mission::cmd_end(fleet, out, mover_id)
        }
        Command::Top => mission::cmd_top(fleet, out),
        Command::Log { mover } => {
            let mover_id = resolve_mover(fleet, &mover)?;
            mission::cmd_log(fleet, out, mover_id)
        }
    }
}

/// Resolve a mover reference (full UUID or unambiguous prefix) to an id.
fn resolve_mover<S: FleetStore>(fleet: &Fleet<S>, reference: &str) -> Result<MoverId, CliError> {
    // A full UUID is taken as-is; the engine reports it if it doesn't exist.
    if let Ok(id) = reference.parse::<MoverId>() {
        return Ok(id);
    }
    let ids: Vec<MoverId> = fleet.movers()?.iter().map(|m| m.id).collect();
    resolve_prefix("mover", reference, &ids)
}

/// Resolve an item reference (full UUID or unambiguous prefix) to an id.
fn resolve_item<S: FleetStore>(fleet: &Fleet<S>, reference: &str) -> Result<ItemId, CliError> {
    if let Ok(id) = reference.parse::<ItemId>() {
        return Ok(id);
    }
    let ids: Vec<ItemId> = fleet.items()?.iter().map(|i| i.id).collect();
    resolve_prefix("item", reference, &ids)
}

fn resolve_prefix<T: Copy + fmt::Display>(kind: &str, reference: &str, ids: &[T]) -> Result<T, CliError> {
    if reference.is_empty() {
        return Err(CliError::NoMatch(format!("empty {kind} reference")));
    }

    let matches: Vec<T> = ids
        .iter()
        .copied()
        .filter(|id| id.to_string().starts_with(reference))
        .collect();

    match matches.as_slice() {
        [] => Err(CliError::NoMatch(format!("no {kind} matching '{reference}'"))),
        [id] => Ok(*id),
        many => {
            let short: Vec<String> = many.iter().map(|id| format::short_id(id)).collect();
            Err(CliError::Ambiguous(format!(
                "'{reference}' is ambiguous: matches {} {kind}s: {}",
                many.len(),
                short.join(", ")
            )))
        }
    }
}
