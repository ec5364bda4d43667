//! Output formatting for CLI display.

use std::fmt::Display;

use crate::model::{Item, MissionLogEntry, Mover, MoverRanking};

/// First eight characters of an id, enough to reference it on the command line.
pub(super) fn short_id(id: &impl Display) -> String {
    id.to_string().chars().take(8).collect()
}

/// One line per mover: id, state, name, limit, missions, load size.
pub(super) fn format_mover(mover: &Mover) -> String {
    format!(
        "{}  [{}]  {}  limit {}  missions {}  load {}",
        short_id(&mover.id),
        mover.state,
        mover.name,
        mover.weight_limit,
        mover.completed_missions,
        pluralize(mover.current_load.len(), "item"),
    )
}

pub(super) fn format_item(item: &Item) -> String {
    format!("{}  {}  weight {}", short_id(&item.id), item.name, item.weight)
}

/// Rank, missions, name. Rank is 1-based.
pub(super) fn format_rankings(rankings: &[MoverRanking]) -> String {
    if rankings.is_empty() {
        return "No movers.".to_string();
    }
    rankings
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{:>3}. {:>5}  {}", i + 1, r.completed_missions, r.name))
        .collect::<Vec<_>>()
        .join("\n")
}

pub(super) fn format_entry(entry: &MissionLogEntry) -> String {
    let time = entry.timestamp.strftime("%Y-%m-%d %H:%M:%S");
    if entry.items.is_empty() {
        return format!("{time}  {}", entry.action);
    }
    let items: Vec<String> = entry.items.iter().map(short_id).collect();
    format!("{time}  {}  [{}]", entry.action, items.join(", "))
}

/// Full detail for one mover, used by `mover show`.
pub(super) fn format_mover_detail(mover: &Mover) -> String {
    let mut out = format!(
        "Mover {}\n  name:      {}\n  state:     {}\n  limit:     {}\n  missions:  {}\n  revision:  {}",
        mover.id,
        mover.name,
        mover.state,
        mover.weight_limit,
        mover.completed_missions,
        mover.revision,
    );
    if mover.current_load.is_empty() {
        out.push_str("\n  load:      (empty)");
    } else {
        out.push_str("\n  load:");
        for id in &mover.current_load {
            out.push_str("\n    ");
            out.push_str(&id.to_string());
        }
    }
    out
}

fn pluralize(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {noun}")
    } else {
        format!("{count} {noun}s")
    }
}
