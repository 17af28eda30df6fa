//! Drag-to-indent for questions.
//!
//! A question drag carries two independent results: where the question lands
//! (optional, needs a drop target) and how deep it sits (always). Depth comes
//! from the cumulative horizontal displacement of the whole gesture, one level
//! per `INDENT_STEP_PX`, applied to the depth the question had when the
//! gesture started.

use super::move_to_target;
use crate::models::{clamp_indent, Outline, QuestionScope};

pub const INDENT_STEP_PX: f64 = 50.0;

/// Whole indent steps for a cumulative horizontal delta.
///
/// Halves round toward positive infinity, so a 25px nudge right indents one
/// level while a 25px nudge left stays put.
pub fn indent_steps(delta_x: f64) -> i64 {
    if !delta_x.is_finite() {
        return 0;
    }
    (delta_x / INDENT_STEP_PX + 0.5).floor() as i64
}

pub fn target_indent_level(original: u8, delta_x: f64) -> u8 {
    clamp_indent((original as i64).saturating_add(indent_steps(delta_x)))
}

/// What the UI renders while a question is being dragged.
#[derive(Clone, Debug, PartialEq)]
pub struct DragPreview {
    pub question_id: String,
    pub target_indent_level: u8,
    /// Raw cumulative horizontal offset, for positioning the ghost.
    pub offset_px: f64,
    /// Offset of the snapped indent relative to where the question started.
    pub snap_offset_px: f64,
    /// The question currently hovered, if it belongs to the same list.
    pub over_id: Option<String>,
    /// Index the question would land at if dropped now.
    pub target_index: Option<usize>,
}

/// Volatile per-gesture state. Never part of the persisted outline.
#[derive(Clone, Debug, PartialEq)]
pub struct QuestionDrag {
    pub scope: QuestionScope,
    pub question_id: String,
    pub original_indent: u8,
    pub delta_x: f64,
    pub over_id: Option<String>,
    pub target_index: Option<usize>,
}

impl QuestionDrag {
    /// Starts a gesture on a question of the scope's ordered list.
    pub fn start(outline: &Outline, scope: &QuestionScope, question_id: &str) -> Option<Self> {
        let questions = outline.active_questions_in(scope)?;
        let (index, question) = questions
            .iter()
            .enumerate()
            .find(|(_, q)| q.id == question_id)?;

        Some(Self {
            scope: scope.clone(),
            question_id: question.id.clone(),
            original_indent: question.indent_level,
            delta_x: 0.0,
            over_id: None,
            target_index: Some(index),
        })
    }

    /// `cumulative_dx` is measured from the drag origin, not per frame.
    pub fn update(&mut self, cumulative_dx: f64) -> DragPreview {
        if cumulative_dx.is_finite() {
            self.delta_x = cumulative_dx;
        }
        self.preview()
    }

    /// Tracks the hovered question. The dragged question takes the index its
    /// target holds now; an unknown target leaves it where it is.
    pub fn drag_over(&mut self, outline: &Outline, over_id: Option<&str>) -> DragPreview {
        let questions = outline.active_questions_in(&self.scope).unwrap_or_default();
        let own = questions.iter().position(|q| q.id == self.question_id);
        let over = over_id.and_then(|id| questions.iter().position(|q| q.id == id));
        match over {
            Some(index) => {
                self.over_id = Some(questions[index].id.clone());
                self.target_index = Some(index);
            }
            None => {
                self.over_id = None;
                self.target_index = own;
            }
        }
        self.preview()
    }

    pub fn target_indent_level(&self) -> u8 {
        target_indent_level(self.original_indent, self.delta_x)
    }

    pub fn preview(&self) -> DragPreview {
        let target = self.target_indent_level();
        DragPreview {
            question_id: self.question_id.clone(),
            target_indent_level: target,
            offset_px: self.delta_x,
            snap_offset_px: (target as f64 - self.original_indent as f64) * INDENT_STEP_PX,
            over_id: self.over_id.clone(),
            target_index: self.target_index,
        }
    }

    /// Consumes the gesture. `None` means the outline is unchanged.
    pub fn finish(self, outline: &Outline, over_id: Option<&str>) -> Option<Outline> {
        let level = self.target_indent_level();
        drop_question(outline, &self.scope, &self.question_id, over_id, level)
    }
}

/// Commits a drop without gesture state, using the question's current depth
/// as the starting point.
pub fn apply_question_drop(
    outline: &Outline,
    scope: &QuestionScope,
    active_id: &str,
    over_id: Option<&str>,
    delta_x: f64,
) -> Option<Outline> {
    let current = outline
        .active_questions_in(scope)?
        .iter()
        .find(|q| q.id == active_id)?
        .indent_level;
    drop_question(
        outline,
        scope,
        active_id,
        over_id,
        target_indent_level(current, delta_x),
    )
}

fn drop_question(
    outline: &Outline,
    scope: &QuestionScope,
    active_id: &str,
    over_id: Option<&str>,
    target_level: u8,
) -> Option<Outline> {
    let before = outline.active_questions_in(scope)?;
    let from = before.iter().position(|q| q.id == active_id)?;

    let mut questions = before.to_vec();
    questions[from].indent_level = clamp_indent(target_level as i64);

    if let Some(over) = over_id.filter(|o| *o != active_id) {
        // An unknown target is the same as no target: indent only.
        let _ = move_to_target(&mut questions, from, |q| q.id == over);
    }

    if questions.as_slice() == before {
        return None;
    }

    let mut next = outline.clone();
    *next.questions_in_mut(scope)? = questions;
    Some(next)
}
