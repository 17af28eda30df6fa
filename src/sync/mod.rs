//! Persistence scheduling core.
//!
//! Everything here is browser-free so it can be driven from native tests:
//! the reactive controller in `state::outline_sync` owns the timers and
//! window listeners and calls into these pieces.

use crate::api::{ApiResult, ProgressStore};
use crate::cache::{load_outline_snapshot, load_saved_at, save_outline_snapshot};
use crate::models::{Exhibit, Outline, ProgressData, SaveStatus, TimerState};
use crate::outline::merge::{merge_progress, OrphanSubsections};
use crate::storage::KeyValueStore;

/// Schema version stamped on every progress blob.
pub const PROGRESS_VERSION: &str = "1.0";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncConfig {
    /// Quiet period after the last change before a save fires.
    pub debounce_ms: i32,
    pub autosave_interval_ms: i32,
    /// Background saves are held off this long after a section reorder.
    pub suppress_after_reorder_ms: i64,
    pub long_press_ms: i32,
    pub clock_tick_ms: i32,
    pub orphan_subsections: OrphanSubsections,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 1_000,
            autosave_interval_ms: 30_000,
            suppress_after_reorder_ms: 2_000,
            long_press_ms: 500,
            clock_tick_ms: 1_000,
            orphan_subsections: OrphanSubsections::Preserve,
        }
    }
}

/// Why a save was started.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveTrigger {
    Debounced,
    Periodic,
    BeforeUnload,
    Unmount,
    Manual,
    SectionReorder,
    TimerToggle,
    Reset,
}

impl SaveTrigger {
    /// Saves nobody asked for explicitly. These yield to the suppression
    /// window that follows a section reorder.
    pub fn is_background(self) -> bool {
        matches!(self, Self::Debounced | Self::Periodic | Self::Unmount)
    }
}

/// Handed out by [`SaveTracker::begin`] and returned to
/// [`SaveTracker::settle`] when the remote call finishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SaveTicket {
    id: u64,
    edits_at_issue: u64,
}

/// Save-status state machine.
///
/// Saves may overlap and complete in any order. The remote store keeps
/// whichever write lands last; the tracker only decides what the indicator
/// shows. A result older than one already settled is ignored, and a success
/// does not read as `Saved` while edits made after its snapshot are pending.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SaveTracker {
    pub status: SaveStatus,
    /// ISO-8601 time of the last successful save.
    pub last_saved: Option<String>,
    issued: u64,
    settled: u64,
    edits: u64,
    suppress_until_ms: i64,
}

impl SaveTracker {
    pub fn with_last_saved(last_saved: Option<String>) -> Self {
        Self {
            last_saved,
            ..Self::default()
        }
    }

    pub fn mark_dirty(&mut self) {
        self.edits += 1;
        if self.status != SaveStatus::Saving {
            self.status = SaveStatus::Unsaved;
        }
    }

    pub fn begin(&mut self) -> SaveTicket {
        self.issued += 1;
        self.status = SaveStatus::Saving;
        SaveTicket {
            id: self.issued,
            edits_at_issue: self.edits,
        }
    }

    pub fn in_flight(&self) -> bool {
        self.issued > self.settled
    }

    /// Records the outcome of a save. Returns false if the result was stale.
    pub fn settle(&mut self, ticket: SaveTicket, ok: bool, saved_at: Option<String>) -> bool {
        if ticket.id <= self.settled {
            return false;
        }
        self.settled = ticket.id;

        if ok && saved_at.is_some() {
            self.last_saved = saved_at;
        }

        self.status = if self.in_flight() {
            SaveStatus::Saving
        } else if !ok || self.edits > ticket.edits_at_issue {
            SaveStatus::Unsaved
        } else {
            SaveStatus::Saved
        };
        true
    }

    pub fn suppress(&mut self, now_ms: i64, window_ms: i64) {
        self.suppress_until_ms = self.suppress_until_ms.max(now_ms + window_ms);
    }

    pub fn is_suppressed(&self, now_ms: i64) -> bool {
        now_ms < self.suppress_until_ms
    }

    pub fn allows(&self, trigger: SaveTrigger, now_ms: i64) -> bool {
        !(trigger.is_background() && self.is_suppressed(now_ms))
    }
}

/// Leaving now would lose work that has not reached the remote store.
pub fn should_warn_before_unload(status: SaveStatus) -> bool {
    matches!(status, SaveStatus::Unsaved | SaveStatus::Saving)
}

/// Writes the blob remotely, hands the outcome to `settle`, and mirrors the
/// outline into local storage only when the save succeeded and `settle`
/// reports it as current. A late result from an older save must not clobber
/// the mirror of a newer one.
pub async fn persist_progress(
    store: &impl ProgressStore,
    kv: &impl KeyValueStore,
    deposition_id: &str,
    progress: &ProgressData,
    settle: impl FnOnce(bool) -> bool,
) -> ApiResult<()> {
    let result = store.save_progress(deposition_id, progress).await;
    let current = settle(result.is_ok());
    if let Err(e) = result {
        leptos::logging::error!("saving progress for {deposition_id} failed: {e}");
        return Err(e);
    }

    if current {
        let saved_at = progress.last_updated.as_deref().unwrap_or_default();
        save_outline_snapshot(kv, deposition_id, &progress.sections, saved_at);
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadSource {
    Remote,
    Local,
    Template,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoadedOutline {
    pub outline: Outline,
    pub exhibits: Vec<Exhibit>,
    pub timer: TimerState,
    pub source: LoadSource,
    pub last_saved: Option<String>,
}

/// Remote progress, then the local mirror, then the bare template. Every
/// path yields a usable outline.
pub async fn load_outline(
    store: &impl ProgressStore,
    kv: &impl KeyValueStore,
    deposition_id: &str,
    template: &Outline,
    orphans: OrphanSubsections,
) -> LoadedOutline {
    let last_saved = load_saved_at(kv, deposition_id);
    let from_template = |last_saved: Option<String>| LoadedOutline {
        outline: merge_progress(template, None, orphans),
        exhibits: vec![],
        timer: TimerState::default(),
        source: LoadSource::Template,
        last_saved,
    };

    if deposition_id.trim().is_empty() {
        return from_template(None);
    }

    match store.load_progress(deposition_id).await {
        Ok(Some(progress)) if !progress.sections.is_empty() => {
            return LoadedOutline {
                outline: merge_progress(template, Some(&progress.sections), orphans),
                exhibits: progress.exhibits,
                timer: progress.timer,
                source: LoadSource::Remote,
                last_saved,
            };
        }
        Ok(_) => {}
        Err(e) => {
            leptos::logging::warn!("loading progress for {deposition_id} failed, trying local copy: {e}");
        }
    }

    match load_outline_snapshot(kv, deposition_id) {
        Some(snap) if !snap.outline.is_empty() => LoadedOutline {
            outline: merge_progress(template, Some(&snap.outline), orphans),
            exhibits: vec![],
            timer: TimerState::default(),
            source: LoadSource::Local,
            last_saved,
        },
        _ => from_template(last_saved),
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use crate::api::{ApiError, ApiErrorKind, ApiResult, ProgressStore};
    use crate::models::ProgressData;
    use async_trait::async_trait;
    use std::cell::{Cell, RefCell};

    /// Records saves; load answers come from `stored` unless `fail_loads`.
    #[derive(Default)]
    pub struct FakeStore {
        pub saves: RefCell<Vec<(String, ProgressData)>>,
        pub stored: RefCell<Option<ProgressData>>,
        pub fail_saves: Cell<bool>,
        pub fail_loads: Cell<bool>,
    }

    fn offline() -> ApiError {
        ApiError {
            kind: ApiErrorKind::Network,
            message: "offline".to_string(),
        }
    }

    #[async_trait(?Send)]
    impl ProgressStore for FakeStore {
        async fn save_progress(&self, deposition_id: &str, progress: &ProgressData) -> ApiResult<()> {
            if self.fail_saves.get() {
                return Err(offline());
            }
            self.saves
                .borrow_mut()
                .push((deposition_id.to_string(), progress.clone()));
            *self.stored.borrow_mut() = Some(progress.clone());
            Ok(())
        }

        async fn load_progress(&self, _deposition_id: &str) -> ApiResult<Option<ProgressData>> {
            if self.fail_loads.get() {
                return Err(offline());
            }
            Ok(self.stored.borrow().clone())
        }
    }
}
