//! Deposition outline engine: the outline document, question drag-to-indent,
//! section reordering, template/progress merging and the save scheduler that
//! keeps a remote and a local copy of the work in step.

pub mod api;
pub mod cache;
pub mod models;
pub mod outline;
pub mod state;
pub mod storage;
pub mod sync;
pub mod template;
mod util;

pub use api::{ApiClient, ApiError, ApiErrorKind, ApiResult, EnvConfig, ProgressStore};
pub use models::{
    Exhibit, Outline, ProgressData, Question, QuestionScope, SaveStatus, Section, Subsection,
    TimerState,
};
pub use outline::indent::{apply_question_drop, DragPreview, QuestionDrag};
pub use outline::merge::{merge_progress, OrphanSubsections};
pub use outline::sections::{reorder_sections, SectionReorderState};
pub use outline::ProgressSummary;
pub use state::{provide_outline_sync, use_outline_sync, EditState, OutlineSession, OutlineSyncController};
pub use sync::{SaveTracker, SaveTrigger, SyncConfig};
pub use template::default_template;

// Needed for `#[wasm_bindgen(start)]` on the wasm entrypoint.
#[cfg(all(target_arch = "wasm32", not(test)))]
use wasm_bindgen::prelude::wasm_bindgen;

// Only register the WASM start function for normal builds (not for tests),
// otherwise wasm-bindgen-test will end up with multiple entry symbols.
#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() {
    console_error_panic_hook::set_once();
}
