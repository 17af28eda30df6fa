use crate::api::ApiClient;
use crate::models::{Outline, QuestionScope, SaveStatus};
use crate::outline::indent::DragPreview;
use crate::outline::ProgressSummary;
use crate::state::OutlineSession;
use crate::storage::BrowserStorage;
use crate::sync::{
    load_outline, persist_progress, should_warn_before_unload, SaveTracker, SaveTrigger, SyncConfig,
};
use crate::template::default_template;
use crate::util::{make_custom_question_id, make_exhibit_id, make_section_id, now_iso, now_ms};
use leptos::ev;
use leptos::logging::{log, warn};
use leptos::prelude::*;
use leptos::task::spawn_local;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use wasm_bindgen::JsCast;

type TimerSlot = Arc<Mutex<Option<i32>>>;

fn clear_timeout_slot(slot: &TimerSlot) {
    let Ok(mut tid) = slot.lock() else {
        return;
    };
    if let (Some(id), Some(win)) = (tid.take(), web_sys::window()) {
        win.clear_timeout_with_handle(id);
    }
}

fn clear_interval_slot(slot: &TimerSlot) {
    let Ok(mut tid) = slot.lock() else {
        return;
    };
    if let (Some(id), Some(win)) = (tid.take(), web_sys::window()) {
        win.clear_interval_with_handle(id);
    }
}

/// Per-deposition persistence controller.
///
/// Owns the editing session signal and the save-status tracker, and drives
/// the save triggers:
/// - trailing debounce after every document change
/// - periodic autosave while loaded
/// - best-effort save on `beforeunload`, warning first if work is unsaved
/// - a final save when the owning view is torn down
/// - immediate saves after section reorder, timer toggle and reset
///
/// Saves may overlap; the remote store is last-write-wins.
#[derive(Clone)]
pub struct OutlineSyncController {
    deposition_id: String,
    config: SyncConfig,
    template: Arc<Outline>,
    api_client: ApiClient,
    storage: BrowserStorage,

    session: RwSignal<OutlineSession>,
    tracker: RwSignal<SaveTracker>,

    debounce_timer: TimerSlot,
    autosave_timer: TimerSlot,
    clock_timer: TimerSlot,
    long_press_timer: TimerSlot,
    unload_handle: Arc<Mutex<Option<WindowListenerHandle>>>,
    disposed: Arc<AtomicBool>,
}

impl OutlineSyncController {
    pub fn new(deposition_id: String, api_client: ApiClient, config: SyncConfig) -> Self {
        Self {
            deposition_id,
            config,
            template: Arc::new(default_template().clone()),
            api_client,
            storage: BrowserStorage,
            session: RwSignal::new(OutlineSession::default()),
            tracker: RwSignal::new(SaveTracker::default()),
            debounce_timer: Arc::new(Mutex::new(None)),
            autosave_timer: Arc::new(Mutex::new(None)),
            clock_timer: Arc::new(Mutex::new(None)),
            long_press_timer: Arc::new(Mutex::new(None)),
            unload_handle: Arc::new(Mutex::new(None)),
            disposed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_template(mut self, template: Outline) -> Self {
        self.template = Arc::new(template);
        self
    }

    // Read side for the UI.

    pub fn session(&self) -> ReadSignal<OutlineSession> {
        self.session.read_only()
    }

    pub fn save_status(&self) -> Signal<SaveStatus> {
        let tracker = self.tracker;
        Signal::derive(move || tracker.with(|t| t.status))
    }

    pub fn last_saved(&self) -> Signal<Option<String>> {
        let tracker = self.tracker;
        Signal::derive(move || tracker.with(|t| t.last_saved.clone()))
    }

    pub fn drag_preview(&self) -> Signal<Option<DragPreview>> {
        let session = self.session;
        Signal::derive(move || session.with(|s| s.drag_preview()))
    }

    pub fn progress(&self) -> Signal<ProgressSummary> {
        let session = self.session;
        Signal::derive(move || session.with(|s| s.outline.progress()))
    }

    // Lifecycle.

    /// Loads the outline and arms every trigger. Call inside the owning
    /// view so teardown runs the unmount save.
    pub fn start(&self) {
        let s = self.clone();
        spawn_local(async move {
            let loaded = load_outline(
                &s.api_client,
                &s.storage,
                &s.deposition_id,
                &s.template,
                s.config.orphan_subsections,
            )
            .await;
            if s.is_disposed() {
                return;
            }
            log!("outline {} loaded from {:?}", s.deposition_id, loaded.source);
            s.tracker.set(SaveTracker::with_last_saved(loaded.last_saved.clone()));
            s.session.set(OutlineSession::from_loaded(loaded));
        });

        self.start_autosave();
        self.start_clock();
        self.start_unload_listener();

        let s = self.clone();
        on_cleanup(move || s.teardown());
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn start_autosave(&self) {
        let Some(win) = web_sys::window() else {
            return;
        };
        let s = self.clone();
        let cb = wasm_bindgen::closure::Closure::wrap(Box::new(move || {
            s.save(SaveTrigger::Periodic);
        }) as Box<dyn FnMut()>);

        let tid = win
            .set_interval_with_callback_and_timeout_and_arguments_0(
                cb.as_ref().unchecked_ref(),
                self.config.autosave_interval_ms,
            )
            .ok();
        if let Ok(mut slot) = self.autosave_timer.lock() {
            *slot = tid;
        }
        cb.forget();
    }

    fn start_clock(&self) {
        let Some(win) = web_sys::window() else {
            return;
        };
        let session = self.session;
        let cb = wasm_bindgen::closure::Closure::wrap(Box::new(move || {
            session.try_update(|s| {
                if s.timer.is_running {
                    s.tick_timer();
                }
            });
        }) as Box<dyn FnMut()>);

        let tid = win
            .set_interval_with_callback_and_timeout_and_arguments_0(
                cb.as_ref().unchecked_ref(),
                self.config.clock_tick_ms,
            )
            .ok();
        if let Ok(mut slot) = self.clock_timer.lock() {
            *slot = tid;
        }
        cb.forget();
    }

    fn start_unload_listener(&self) {
        let s = self.clone();
        let handle = window_event_listener(ev::beforeunload, move |ev: web_sys::BeforeUnloadEvent| {
            let status = s
                .tracker
                .try_with_untracked(|t| t.status)
                .unwrap_or_default();
            if should_warn_before_unload(status) {
                ev.prevent_default();
                ev.set_return_value("You have unsaved changes.");
            }
            s.save(SaveTrigger::BeforeUnload);
        });
        if let Ok(mut slot) = self.unload_handle.lock() {
            *slot = Some(handle);
        }
    }

    fn teardown(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        clear_timeout_slot(&self.debounce_timer);
        clear_timeout_slot(&self.long_press_timer);
        clear_interval_slot(&self.autosave_timer);
        clear_interval_slot(&self.clock_timer);
        if let Some(handle) = self.unload_handle.lock().ok().and_then(|mut h| h.take()) {
            handle.remove();
        }
        self.unmount_save();
    }

    /// Fire-and-forget. Reads the signals once and never writes them, since
    /// the view that owns them is going away.
    fn unmount_save(&self) {
        let now = now_ms();
        let allowed = self
            .tracker
            .try_with_untracked(|t| t.allows(SaveTrigger::Unmount, now))
            .unwrap_or(false);
        let payload = self
            .session
            .try_with_untracked(|s| s.is_loaded.then(|| s.payload(now_iso())))
            .flatten();
        let (true, Some(payload)) = (allowed, payload) else {
            return;
        };
        if self.deposition_id.trim().is_empty() {
            return;
        }

        let api_client = self.api_client.clone();
        let storage = self.storage;
        let deposition_id = self.deposition_id.clone();
        spawn_local(async move {
            let _ = persist_progress(&api_client, &storage, &deposition_id, &payload, |_| true).await;
        });
    }

    // Saving.

    fn schedule_debounced_save(&self) {
        let Some(win) = web_sys::window() else {
            return;
        };
        clear_timeout_slot(&self.debounce_timer);

        let s = self.clone();
        let cb = wasm_bindgen::closure::Closure::once_into_js(move || {
            if let Ok(mut slot) = s.debounce_timer.lock() {
                *slot = None;
            }
            s.save(SaveTrigger::Debounced);
        });
        let tid = win
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                cb.unchecked_ref(),
                self.config.debounce_ms,
            )
            .ok();
        if let Ok(mut slot) = self.debounce_timer.lock() {
            *slot = tid;
        }
    }

    fn save(&self, trigger: SaveTrigger) {
        let s = self.clone();
        spawn_local(async move {
            let _ = s.run_save(trigger).await;
        });
    }

    /// Returns whether the remote store accepted the write. A save that is
    /// skipped (not loaded, suppressed, torn down) reports false.
    async fn run_save(&self, trigger: SaveTrigger) -> bool {
        if self.is_disposed() || self.deposition_id.trim().is_empty() {
            return false;
        }
        let now = now_ms();
        let allowed = self
            .tracker
            .try_with_untracked(|t| t.allows(trigger, now))
            .unwrap_or(false);
        if !allowed {
            return false;
        }
        let Some(payload) = self
            .session
            .try_with_untracked(|s| s.is_loaded.then(|| s.payload(now_iso())))
            .flatten()
        else {
            return false;
        };
        let Some(ticket) = self.tracker.try_update(|t| t.begin()) else {
            return false;
        };

        let saved_at = payload.last_updated.clone();
        let result = persist_progress(&self.api_client, &self.storage, &self.deposition_id, &payload, |ok| {
            self.tracker
                .try_update(|t| t.settle(ticket, ok, saved_at))
                .unwrap_or(false)
        })
        .await;
        let ok = result.is_ok();
        if !ok {
            warn!("{trigger:?} save for {} did not reach the server", self.deposition_id);
        }
        ok
    }

    /// Explicit save with direct feedback.
    pub async fn manual_save(&self) -> bool {
        clear_timeout_slot(&self.debounce_timer);
        self.run_save(SaveTrigger::Manual).await
    }

    /// Applies an intent; a document change marks the tracker dirty and
    /// restarts the debounce.
    fn mutate(&self, intent: impl FnOnce(&mut OutlineSession) -> bool) -> bool {
        let changed = self.session.try_update(intent).unwrap_or(false);
        if changed {
            self.tracker.update(|t| t.mark_dirty());
            self.schedule_debounced_save();
        }
        changed
    }

    /// Like `mutate`, but saves right away instead of debouncing.
    fn mutate_and_save(&self, intent: impl FnOnce(&mut OutlineSession) -> bool, trigger: SaveTrigger) -> bool {
        let changed = self.session.try_update(intent).unwrap_or(false);
        if changed {
            self.tracker.update(|t| t.mark_dirty());
            clear_timeout_slot(&self.debounce_timer);
            self.save(trigger);
        }
        changed
    }

    // Document intents.

    pub fn toggle_asked(&self, scope: &QuestionScope, question_id: &str) -> bool {
        self.mutate(|s| s.toggle_asked(scope, question_id))
    }

    pub fn toggle_flagged(&self, scope: &QuestionScope, question_id: &str) -> bool {
        self.mutate(|s| s.toggle_flagged(scope, question_id))
    }

    pub fn add_custom_question(&self, scope: &QuestionScope, text: &str) -> bool {
        let id = make_custom_question_id();
        self.mutate(|s| s.add_custom_question(scope, &id, text))
    }

    pub fn remove_custom_question(&self, scope: &QuestionScope, question_id: &str) -> bool {
        self.mutate(|s| s.remove_custom_question(scope, question_id))
    }

    pub fn update_notes(&self, section_id: &str, subsection_id: Option<&str>, notes: &str) -> bool {
        self.mutate(|s| s.update_notes(section_id, subsection_id, notes))
    }

    pub fn toggle_section_selected(&self, section_id: &str) -> bool {
        self.mutate(|s| s.toggle_section_selected(section_id))
    }

    pub fn toggle_subsection_selected(&self, section_id: &str, subsection_id: &str) -> bool {
        self.mutate(|s| s.toggle_subsection_selected(section_id, subsection_id))
    }

    pub fn add_section(&self) -> bool {
        let id = make_section_id();
        self.mutate(|s| s.add_section(&id))
    }

    pub fn delete_section(&self, section_id: &str) -> bool {
        self.mutate(|s| s.delete_section(section_id))
    }

    pub fn reset_progress(&self) -> bool {
        let template = self.template.clone();
        self.mutate_and_save(|s| s.reset_progress(&template), SaveTrigger::Reset)
    }

    // Inline editing.

    pub fn begin_question_edit(&self, scope: &QuestionScope, question_id: &str) -> bool {
        self.session
            .try_update(|s| s.begin_question_edit(scope, question_id))
            .unwrap_or(false)
    }

    pub fn set_question_draft(&self, text: &str) {
        self.session.update(|s| s.set_question_draft(text));
    }

    pub fn commit_question_edit(&self) -> bool {
        self.mutate(|s| s.commit_question_edit())
    }

    pub fn begin_section_edit(&self, section_id: &str) -> bool {
        self.session
            .try_update(|s| s.begin_section_edit(section_id))
            .unwrap_or(false)
    }

    pub fn set_section_drafts(&self, title: &str, questions: &str) {
        self.session.update(|s| s.set_section_drafts(title, questions));
    }

    pub fn commit_section_edit(&self) -> bool {
        self.mutate(|s| s.commit_section_edit())
    }

    pub fn cancel_edit(&self) {
        self.session.update(|s| s.cancel_edit());
    }

    // Section reordering.

    pub fn enter_section_reorder(&self) {
        self.session.update(|s| s.enter_section_reorder());
    }

    pub fn exit_section_reorder(&self) {
        clear_timeout_slot(&self.long_press_timer);
        self.session.update(|s| s.exit_section_reorder());
    }

    /// Starts the long-press timer. Entering reorder mode this way buzzes
    /// the device where vibration is supported.
    pub fn section_press_started(&self) {
        let accepted = self
            .session
            .try_update(|s| s.section_press_started(now_ms()))
            .unwrap_or(false);
        if !accepted {
            return;
        }
        let Some(win) = web_sys::window() else {
            return;
        };
        clear_timeout_slot(&self.long_press_timer);

        let s = self.clone();
        let cb = wasm_bindgen::closure::Closure::once_into_js(move || {
            if let Ok(mut slot) = s.long_press_timer.lock() {
                *slot = None;
            }
            let entered = s
                .session
                .try_update(|st| st.poll_long_press(now_ms()))
                .unwrap_or(false);
            if entered {
                if let Some(win) = web_sys::window() {
                    let _ = win.navigator().vibrate_with_duration(50);
                }
            }
        });
        let tid = win
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                cb.unchecked_ref(),
                self.config.long_press_ms,
            )
            .ok();
        if let Ok(mut slot) = self.long_press_timer.lock() {
            *slot = tid;
        }
    }

    pub fn section_press_released(&self) {
        clear_timeout_slot(&self.long_press_timer);
        self.session.update(|s| s.section_press_released());
    }

    pub fn begin_section_drag(&self, section_id: &str) -> bool {
        self.session
            .try_update(|s| s.begin_section_drag(section_id))
            .unwrap_or(false)
    }

    pub fn section_drag_over(&self, section_id: Option<&str>) {
        self.session.update(|s| s.section_drag_over(section_id));
    }

    /// Commits a section move, holds background saves off briefly, and
    /// saves immediately.
    pub fn drop_section(&self, target_id: Option<&str>) -> bool {
        let changed = self
            .session
            .try_update(|s| s.drop_section(target_id))
            .unwrap_or(false);
        if changed {
            let window = self.config.suppress_after_reorder_ms;
            self.tracker.update(|t| {
                t.mark_dirty();
                t.suppress(now_ms(), window);
            });
            clear_timeout_slot(&self.debounce_timer);
            self.save(SaveTrigger::SectionReorder);
        }
        changed
    }

    pub fn cancel_section_drag(&self) {
        self.session.update(|s| s.cancel_section_drag());
    }

    // Question reordering and indenting.

    pub fn enter_question_reorder(&self, scope: QuestionScope) -> bool {
        self.session
            .try_update(|s| s.enter_question_reorder(scope))
            .unwrap_or(false)
    }

    pub fn exit_question_reorder(&self) {
        self.session.update(|s| s.exit_question_reorder());
    }

    pub fn begin_question_drag(&self, scope: &QuestionScope, question_id: &str) -> bool {
        self.session
            .try_update(|s| s.begin_question_drag(scope, question_id))
            .unwrap_or(false)
    }

    pub fn update_question_drag(&self, cumulative_dx: f64) -> Option<DragPreview> {
        self.session
            .try_update(|s| s.update_question_drag(cumulative_dx))
            .flatten()
    }

    pub fn drag_question_over(&self, over_id: Option<&str>) -> Option<DragPreview> {
        self.session
            .try_update(|s| s.drag_question_over(over_id))
            .flatten()
    }

    pub fn drop_question(&self, over_id: Option<&str>) -> bool {
        self.mutate(|s| s.drop_question(over_id))
    }

    pub fn cancel_question_drag(&self) {
        self.session.update(|s| s.cancel_question_drag());
    }

    // Exhibits and the deposition clock.

    pub fn add_exhibit(&self, number: &str, description: &str) -> bool {
        let id = make_exhibit_id();
        self.mutate(|s| s.add_exhibit(&id, number, description))
    }

    pub fn toggle_exhibit_introduced(&self, id: &str) -> bool {
        self.mutate(|s| s.toggle_exhibit_introduced(id))
    }

    pub fn remove_exhibit(&self, id: &str) -> bool {
        self.mutate(|s| s.remove_exhibit(id))
    }

    pub fn toggle_timer(&self) -> bool {
        self.mutate_and_save(|s| s.toggle_timer(), SaveTrigger::TimerToggle)
    }
}

/// Creates the controller for `deposition_id`, starts it under the current
/// owner, and makes it available to descendants.
pub fn provide_outline_sync(deposition_id: String, api_client: ApiClient) -> OutlineSyncController {
    let controller = OutlineSyncController::new(deposition_id, api_client, SyncConfig::default());
    controller.start();
    provide_context(controller.clone());
    controller
}

pub fn use_outline_sync() -> Option<OutlineSyncController> {
    use_context::<OutlineSyncController>()
}
