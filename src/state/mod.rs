pub mod outline_sync;

pub use outline_sync::{provide_outline_sync, use_outline_sync, OutlineSyncController};

use crate::models::{Exhibit, Outline, ProgressData, QuestionScope, TimerState};
use crate::outline::indent::{DragPreview, QuestionDrag};
use crate::outline::sections::{reorder_sections, SectionReorderState};
use crate::sync::{LoadedOutline, PROGRESS_VERSION};

/// What the user is typing into right now. At most one thing at a time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum EditState {
    #[default]
    Idle,
    Section {
        section_id: String,
        title_draft: String,
        /// One question per line.
        questions_draft: String,
    },
    Question {
        scope: QuestionScope,
        question_id: String,
        draft: String,
    },
}

/// One editing session over one deposition's outline.
///
/// Intent methods return `true` when the persisted document changed, which
/// is the caller's cue to schedule a save. Gesture bookkeeping (reorder
/// modes, drag state, drafts) never counts as a change.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OutlineSession {
    pub outline: Outline,
    pub exhibits: Vec<Exhibit>,
    pub timer: TimerState,
    pub edit: EditState,
    pub section_reorder: SectionReorderState,
    /// Scope whose questions are currently draggable.
    pub question_reorder: Option<QuestionScope>,
    pub question_drag: Option<QuestionDrag>,
    pub is_loaded: bool,
}

impl OutlineSession {
    pub fn from_loaded(loaded: LoadedOutline) -> Self {
        Self {
            outline: loaded.outline,
            exhibits: loaded.exhibits,
            timer: loaded.timer,
            is_loaded: true,
            ..Self::default()
        }
    }

    fn commit(&mut self, next: Option<Outline>) -> bool {
        match next {
            Some(outline) => {
                self.outline = outline;
                true
            }
            None => false,
        }
    }

    /// The blob handed to the remote store.
    pub fn payload(&self, last_updated: String) -> ProgressData {
        ProgressData {
            sections: self.outline.clone(),
            exhibits: self.exhibits.clone(),
            timer: self.timer,
            last_updated: Some(last_updated),
            version: Some(PROGRESS_VERSION.to_string()),
        }
    }

    pub fn toggle_asked(&mut self, scope: &QuestionScope, question_id: &str) -> bool {
        let next = self.outline.toggle_asked(scope, question_id);
        self.commit(next)
    }

    pub fn toggle_flagged(&mut self, scope: &QuestionScope, question_id: &str) -> bool {
        let next = self.outline.toggle_flagged(scope, question_id);
        self.commit(next)
    }

    pub fn add_custom_question(&mut self, scope: &QuestionScope, id: &str, text: &str) -> bool {
        let next = self.outline.add_custom_question(scope, id, text);
        self.commit(next)
    }

    pub fn remove_custom_question(&mut self, scope: &QuestionScope, question_id: &str) -> bool {
        let next = self.outline.remove_custom_question(scope, question_id);
        self.commit(next)
    }

    pub fn update_notes(&mut self, section_id: &str, subsection_id: Option<&str>, notes: &str) -> bool {
        let next = self.outline.update_notes(section_id, subsection_id, notes);
        self.commit(next)
    }

    pub fn toggle_section_selected(&mut self, section_id: &str) -> bool {
        let next = self.outline.toggle_section_selected(section_id);
        let changed = self.commit(next);
        self.release_inactive_question_reorder();
        changed
    }

    pub fn toggle_subsection_selected(&mut self, section_id: &str, subsection_id: &str) -> bool {
        let next = self.outline.toggle_subsection_selected(section_id, subsection_id);
        let changed = self.commit(next);
        self.release_inactive_question_reorder();
        changed
    }

    fn release_inactive_question_reorder(&mut self) {
        let inactive = self
            .question_reorder
            .as_ref()
            .is_some_and(|scope| self.outline.active_questions_in(scope).is_none());
        if inactive {
            self.exit_question_reorder();
        }
    }

    pub fn add_section(&mut self, id: &str) -> bool {
        let next = self.outline.add_section(id);
        self.commit(next)
    }

    pub fn delete_section(&mut self, section_id: &str) -> bool {
        let changed = {
            let next = self.outline.delete_section(section_id);
            self.commit(next)
        };
        if changed {
            if matches!(&self.edit, EditState::Section { section_id: s, .. } if s == section_id)
                || matches!(&self.edit, EditState::Question { scope, .. } if scope.section_id == section_id)
            {
                self.edit = EditState::Idle;
            }
            if self
                .question_reorder
                .as_ref()
                .is_some_and(|s| s.section_id == section_id)
            {
                self.exit_question_reorder();
            }
        }
        changed
    }

    /// Back to template order and a clean slate; notes and custom
    /// questions survive. Always counts as a change.
    pub fn reset_progress(&mut self, template: &Outline) -> bool {
        self.outline = self.outline.reset_progress(template);
        self.edit = EditState::Idle;
        self.section_reorder.exit();
        self.exit_question_reorder();
        true
    }

    // Inline editing.

    pub fn is_editing_section(&self) -> bool {
        matches!(self.edit, EditState::Section { .. })
    }

    pub fn begin_question_edit(&mut self, scope: &QuestionScope, question_id: &str) -> bool {
        let Some(q) = self.outline.find_question(scope, question_id) else {
            return false;
        };
        self.edit = EditState::Question {
            scope: scope.clone(),
            question_id: q.id.clone(),
            draft: q.text.clone(),
        };
        true
    }

    pub fn set_question_draft(&mut self, text: &str) {
        if let EditState::Question { draft, .. } = &mut self.edit {
            *draft = text.to_string();
        }
    }

    /// Applies the draft and leaves edit mode. A blank or unchanged draft
    /// leaves the question as it was.
    pub fn commit_question_edit(&mut self) -> bool {
        if !matches!(self.edit, EditState::Question { .. }) {
            return false;
        }
        let EditState::Question {
            scope,
            question_id,
            draft,
        } = std::mem::take(&mut self.edit)
        else {
            return false;
        };
        let next = self.outline.update_question_text(&scope, &question_id, &draft);
        self.commit(next)
    }

    pub fn begin_section_edit(&mut self, section_id: &str) -> bool {
        let Some(section) = self.outline.section(section_id) else {
            return false;
        };
        let questions_draft = section
            .questions
            .iter()
            .map(|q| q.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        self.edit = EditState::Section {
            section_id: section.id.clone(),
            title_draft: section.title.clone(),
            questions_draft,
        };
        true
    }

    pub fn set_section_drafts(&mut self, title: &str, questions: &str) {
        if let EditState::Section {
            title_draft,
            questions_draft,
            ..
        } = &mut self.edit
        {
            *title_draft = title.to_string();
            *questions_draft = questions.to_string();
        }
    }

    /// Rejected drafts (blank title or no questions) keep the editor open.
    pub fn commit_section_edit(&mut self) -> bool {
        let EditState::Section {
            section_id,
            title_draft,
            questions_draft,
        } = &self.edit
        else {
            return false;
        };
        let Some(next) = self
            .outline
            .rewrite_section(section_id, title_draft.trim(), questions_draft)
        else {
            return false;
        };
        self.outline = next;
        self.edit = EditState::Idle;
        true
    }

    pub fn cancel_edit(&mut self) {
        self.edit = EditState::Idle;
    }

    // Section reordering.

    pub fn enter_section_reorder(&mut self) {
        self.section_reorder.enter();
    }

    pub fn exit_section_reorder(&mut self) {
        self.section_reorder.exit();
    }

    /// Ignored while a section is being edited.
    pub fn section_press_started(&mut self, now_ms: i64) -> bool {
        if self.is_editing_section() {
            return false;
        }
        self.section_reorder.press_started(now_ms);
        true
    }

    pub fn section_press_released(&mut self) {
        self.section_reorder.press_released();
    }

    /// True on the transition into reorder mode.
    pub fn poll_long_press(&mut self, now_ms: i64) -> bool {
        if self.is_editing_section() {
            self.section_reorder.press_released();
            return false;
        }
        self.section_reorder.poll_long_press(now_ms)
    }

    pub fn begin_section_drag(&mut self, section_id: &str) -> bool {
        self.outline.section(section_id).is_some() && self.section_reorder.begin_drag(section_id)
    }

    pub fn section_drag_over(&mut self, section_id: Option<&str>) {
        self.section_reorder.drag_over(section_id);
    }

    /// Drops the dragged section on `target_id`, or on whatever it was last
    /// dragged over.
    pub fn drop_section(&mut self, target_id: Option<&str>) -> bool {
        let target = target_id
            .map(str::to_string)
            .or_else(|| self.section_reorder.over.clone());
        let Some(dragged) = self.section_reorder.take_drop() else {
            return false;
        };
        let Some(target) = target else {
            return false;
        };
        let next = reorder_sections(&self.outline, &dragged, &target);
        self.commit(next)
    }

    pub fn cancel_section_drag(&mut self) {
        let _ = self.section_reorder.take_drop();
    }

    // Question reordering and indenting.

    pub fn enter_question_reorder(&mut self, scope: QuestionScope) -> bool {
        if self.outline.active_questions_in(&scope).is_none() {
            return false;
        }
        self.question_drag = None;
        self.question_reorder = Some(scope);
        true
    }

    pub fn exit_question_reorder(&mut self) {
        self.question_reorder = None;
        self.question_drag = None;
    }

    pub fn begin_question_drag(&mut self, scope: &QuestionScope, question_id: &str) -> bool {
        if self.question_reorder.as_ref() != Some(scope) {
            return false;
        }
        self.question_drag = QuestionDrag::start(&self.outline, scope, question_id);
        self.question_drag.is_some()
    }

    pub fn update_question_drag(&mut self, cumulative_dx: f64) -> Option<DragPreview> {
        self.question_drag.as_mut().map(|d| d.update(cumulative_dx))
    }

    pub fn drag_question_over(&mut self, over_id: Option<&str>) -> Option<DragPreview> {
        let outline = &self.outline;
        self.question_drag.as_mut().map(|d| d.drag_over(outline, over_id))
    }

    pub fn drag_preview(&self) -> Option<DragPreview> {
        self.question_drag.as_ref().map(QuestionDrag::preview)
    }

    /// Ends the gesture. The preview is gone afterwards whether or not
    /// anything was committed.
    pub fn drop_question(&mut self, over_id: Option<&str>) -> bool {
        let Some(drag) = self.question_drag.take() else {
            return false;
        };
        let next = drag.finish(&self.outline, over_id);
        self.commit(next)
    }

    pub fn cancel_question_drag(&mut self) {
        self.question_drag = None;
    }

    // Exhibits.

    pub fn add_exhibit(&mut self, id: &str, number: &str, description: &str) -> bool {
        let (number, description) = (number.trim(), description.trim());
        if number.is_empty() || description.is_empty() || id.trim().is_empty() {
            return false;
        }
        if self.exhibits.iter().any(|e| e.id == id) {
            return false;
        }
        self.exhibits.push(Exhibit {
            id: id.to_string(),
            number: number.to_string(),
            description: description.to_string(),
            is_introduced: false,
        });
        true
    }

    pub fn toggle_exhibit_introduced(&mut self, id: &str) -> bool {
        match self.exhibits.iter_mut().find(|e| e.id == id) {
            Some(e) => {
                e.is_introduced = !e.is_introduced;
                true
            }
            None => false,
        }
    }

    pub fn remove_exhibit(&mut self, id: &str) -> bool {
        let before = self.exhibits.len();
        self.exhibits.retain(|e| e.id != id);
        self.exhibits.len() != before
    }

    // Deposition clock.

    pub fn toggle_timer(&mut self) -> bool {
        self.timer.is_running = !self.timer.is_running;
        true
    }

    /// One second of clock time. Not a document change.
    pub fn tick_timer(&mut self) {
        self.timer.tick();
    }
}
