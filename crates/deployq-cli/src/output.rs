use deployq_core::{CommandOutcome, ListKind};
use serde::Serialize;
use std::time::Duration;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.len());
        }
    }

    let line = |cells: Vec<String>| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{cell:w$}"))
            .collect();
        println!("{}", padded.join("  ").trim_end());
    };

    line(headers.iter().map(|h| h.to_string()).collect());
    line(widths.iter().map(|&w| "-".repeat(w)).collect());
    for row in rows {
        line(row);
    }
}

/// `4m 10s`, `1h 2m`, `12s`.
pub fn format_idle(d: Duration) -> String {
    let secs = d.as_secs();
    match (secs / 3600, (secs % 3600) / 60, secs % 60) {
        (0, 0, s) => format!("{s}s"),
        (0, m, s) => format!("{m}m {s}s"),
        (h, m, _) => format!("{h}h {m}m"),
    }
}

fn list_label(list: ListKind) -> &'static str {
    match list {
        ListKind::Queue => "the queue",
        ListKind::Running => "running",
        ListKind::Done => "done",
    }
}

pub fn describe_outcome(user: &str, outcome: &CommandOutcome) -> String {
    match outcome {
        CommandOutcome::Created { card, list } => {
            format!("Added '{}' to {} ({})", card.name, list_label(*list), card.id)
        }
        CommandOutcome::Moved { card, to } => {
            format!("Moved '{}' to {} ({})", card.name, list_label(*to), card.id)
        }
        CommandOutcome::AlreadyRunning { card } => {
            format!("'{}' is already deploying ({})", card.name, card.id)
        }
        CommandOutcome::NoMatch => format!("No running deploy for '{user}'; nothing changed"),
    }
}
