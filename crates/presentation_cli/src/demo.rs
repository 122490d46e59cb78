//! Two tabs editing the same draft
//!
//! Walks through the lock conflict protocol on one substrate and prints what
//! each tab sees at every step.

use std::time::Duration;

use application::{
    ApplicationError, DraftServices, DraftSession, DraftSyncSettings, SessionCallbacks, SessionStatus,
};
use domain::{DraftForm, TabId};
use infrastructure::Storage;
use tracing::info;

/// Time given to cross-tab events to reach the other session
const PROPAGATION_DELAY: Duration = Duration::from_millis(50);

fn describe(status: &SessionStatus) -> String {
    let mut line = status.save_status.to_string();
    if let Some(lock) = status.conflict.as_ref().and_then(|c| c.lock.as_ref()) {
        line.push_str(&format!(" (locked by tab {})", lock.tab_id.short()));
    }
    if status.has_snapshots() {
        line.push_str(&format!(", {} snapshot(s)", status.snapshot_count));
    }
    if let Some(error) = &status.last_error {
        line.push_str(&format!(", last error: {error}"));
    }
    line
}

fn open_tab(
    storage: &Storage,
    settings: DraftSyncSettings,
    name: &'static str,
) -> Result<DraftSession, ApplicationError> {
    let tab_id = TabId::new();
    println!("[{name}] opened as tab {}", tab_id.short());

    let callbacks = SessionCallbacks::new()
        .on_draft_id_change(move |id| println!("[{name}] draft id is now {id}"))
        .on_conflict_detected(move |conflict| {
            let holder = conflict.lock.map(|l| l.tab_id.short()).unwrap_or_default();
            println!("[{name}] conflict: draft is being edited in tab {holder}");
        })
        .on_remote_update(move |draft| {
            println!("[{name}] remote update: \"{}\"", draft.display_title());
        });

    let services = DraftServices::new(storage.context(), tab_id, &settings);
    DraftSession::start(services, settings, callbacks, None)
}

fn report(name: &str, session: &DraftSession) {
    println!("[{name}] status: {}", describe(&session.status()));
}

async fn settle() {
    tokio::time::sleep(PROPAGATION_DELAY).await;
}

/// Run the scenario; returns once both tabs are closed
pub async fn run(storage: &Storage, settings: DraftSyncSettings) -> anyhow::Result<()> {
    info!("Starting two-tab demo");

    let tab_a = open_tab(storage, settings, "A")?;
    tab_a.update_form(DraftForm::new("Launch post", "First paragraph."));
    let draft = tab_a
        .save_draft_now()?
        .ok_or_else(|| anyhow::anyhow!("tab A did not save"))?;
    settle().await;
    report("A", &tab_a);

    println!("\n-- tab B opens the same draft --");
    let tab_b = open_tab(storage, settings, "B")?;
    tab_b.set_draft_id(Some(draft.id));
    settle().await;
    report("B", &tab_b);

    println!("\n-- tab B tries to save while conflicted --");
    tab_b.update_form(DraftForm::new("Overwrite attempt", "From B."));
    let saved = tab_b.save_draft_now()?;
    println!("[B] save {}", if saved.is_some() { "written" } else { "suppressed" });

    println!("\n-- tab A keeps editing --");
    tab_a.update_form(DraftForm::new("Launch post, v2", "First paragraph. Second."));
    tab_a.save_draft_now()?;
    tab_a.create_snapshot()?;
    settle().await;
    report("A", &tab_a);
    report("B", &tab_b);

    println!("\n-- tab B dismisses the conflict and takes over --");
    tab_b.dismiss_conflict()?;
    settle().await;
    report("A", &tab_a);
    report("B", &tab_b);

    println!("\n-- tab B restores the latest snapshot --");
    if let Some(snapshot) = tab_b.snapshots().last() {
        tab_b.restore_snapshot(snapshot.id)?;
        println!("[B] form is now \"{}\"", tab_b.form().title);
    }

    println!("\n-- both tabs close --");
    tab_a.teardown();
    tab_b.teardown();
    settle().await;
    println!("Draft {} left unlocked.", draft.id);

    Ok(())
}
