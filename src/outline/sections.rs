//! Top-level section reordering.
//!
//! Section titles carry a positional ordinal (`"IV. EXHIBITS"`). After every
//! move the ordinals are regenerated from array order; the rest of the title
//! is left byte-for-byte alone.

use super::move_to_target;
use crate::models::{Outline, Section};

pub const ORDINAL_LABELS: [&str; 27] = [
    "I", "II", "III", "IV", "V", "VI", "VII", "VIII", "IX", "X", "XI", "XII", "XIII", "XIV", "XV",
    "XVI", "XVII", "XVIII", "XIX", "XX", "XXI", "XXII", "XXIII", "XXIV", "XXV", "XXVI", "XXVII",
];

/// Hold time before a press on a section enters reorder mode.
pub const LONG_PRESS_MS: i64 = 500;

/// Roman numerals for the first 27 positions, then 1-based Arabic numbers.
pub fn ordinal_label(index: usize) -> String {
    ORDINAL_LABELS
        .get(index)
        .map(|s| s.to_string())
        .unwrap_or_else(|| (index + 1).to_string())
}

/// Swaps the token before the first `.` for the ordinal of `index`.
/// Titles without a `.` have no ordinal and are returned as-is.
pub fn renumbered_title(title: &str, index: usize) -> String {
    match title.split_once('.') {
        Some((_, rest)) => format!("{}.{}", ordinal_label(index), rest),
        None => title.to_string(),
    }
}

pub fn renumber_sections(sections: &mut [Section]) {
    for (i, section) in sections.iter_mut().enumerate() {
        section.title = renumbered_title(&section.title, i);
    }
}

/// Moves `dragged_id` into the slot `target_id` occupies, shifting the
/// sections in between by one, then renumbers every title.
pub fn reorder_sections(outline: &Outline, dragged_id: &str, target_id: &str) -> Option<Outline> {
    if dragged_id == target_id {
        return None;
    }
    let from = outline.sections.iter().position(|s| s.id == dragged_id)?;
    outline.section(target_id)?;

    let mut sections = outline.sections.clone();
    move_to_target(&mut sections, from, |s| s.id == target_id)?;
    renumber_sections(&mut sections);
    Some(Outline::new(sections))
}

/// Gate and bookkeeping for section drags. Drags are ignored unless reorder
/// mode is on; the mode is entered by a long press or an explicit toggle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SectionReorderState {
    pub enabled: bool,
    pub dragged: Option<String>,
    pub over: Option<String>,
    press_started_ms: Option<i64>,
}

impl SectionReorderState {
    pub fn enter(&mut self) {
        self.enabled = true;
        self.press_started_ms = None;
    }

    pub fn exit(&mut self) {
        *self = Self::default();
    }

    pub fn press_started(&mut self, now_ms: i64) {
        self.press_started_ms = Some(now_ms);
    }

    pub fn press_released(&mut self) {
        self.press_started_ms = None;
    }

    pub fn is_pressing(&self) -> bool {
        self.press_started_ms.is_some()
    }

    /// Enters reorder mode if the press has been held long enough.
    /// Returns true only on the transition.
    pub fn poll_long_press(&mut self, now_ms: i64) -> bool {
        match self.press_started_ms {
            Some(start) if now_ms - start >= LONG_PRESS_MS && !self.enabled => {
                self.enter();
                true
            }
            _ => false,
        }
    }

    pub fn begin_drag(&mut self, section_id: &str) -> bool {
        if !self.enabled {
            return false;
        }
        self.dragged = Some(section_id.to_string());
        true
    }

    pub fn drag_over(&mut self, section_id: Option<&str>) {
        if self.enabled {
            self.over = section_id.map(str::to_string);
        }
    }

    /// Ends the current drag and hands back the dragged id, if any.
    pub fn take_drop(&mut self) -> Option<String> {
        self.over = None;
        self.dragged.take()
    }
}
