//! Read-only views over a persistent substrate
//!
//! Rendering is kept apart from printing so the output can be asserted on.

use std::fmt::Write as _;

use chrono::{DateTime, Duration, Utc};
use domain::{Draft, DraftLock, DraftSnapshot};

/// One line per draft, most recently updated first
pub fn render_list(drafts: &[Draft]) -> String {
    if drafts.is_empty() {
        return "No drafts stored.\n".to_string();
    }

    let mut out = String::new();
    for draft in drafts {
        let _ = writeln!(
            out,
            "{}  {}  {}",
            draft.id,
            draft.updated_at.format("%Y-%m-%d %H:%M:%S"),
            draft.display_title()
        );
    }
    out
}

/// Full draft record as pretty JSON
pub fn render_draft(draft: &Draft) -> serde_json::Result<String> {
    serde_json::to_string_pretty(draft)
}

/// Snapshot history, oldest first
pub fn render_snapshots(snapshots: &[DraftSnapshot]) -> String {
    if snapshots.is_empty() {
        return "No snapshots.\n".to_string();
    }

    let mut out = String::new();
    for (index, snapshot) in snapshots.iter().enumerate() {
        let _ = writeln!(
            out,
            "#{:<3} {}  {}  {}",
            index + 1,
            snapshot.id.short(),
            snapshot.timestamp.format("%Y-%m-%d %H:%M:%S"),
            snapshot.draft.display_title()
        );
    }
    out
}

/// Lock holder and liveness as seen at `now`
pub fn render_lock(lock: Option<&DraftLock>, now: DateTime<Utc>, ttl: Duration) -> String {
    let Some(lock) = lock else {
        return "Unlocked.\n".to_string();
    };

    let state = match lock.remaining_at(now, ttl) {
        Some(remaining) => format!("live, lapses in {}s", remaining.num_seconds()),
        None => "expired".to_string(),
    };

    format!(
        "Held by tab {} since {} ({state})\n",
        lock.tab_id,
        lock.timestamp.format("%Y-%m-%d %H:%M:%S")
    )
}
