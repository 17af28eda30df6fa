//! Outline document operations.
//!
//! Every operation is a functional update: it takes the current outline by
//! reference and returns `Some(next)` with the change applied, or `None` when
//! the input does not resolve (unknown ids, rejected text, cap reached).
//! Callers swap the whole value, which keeps any snapshot already handed to
//! an in-flight save untouched.

pub mod indent;
pub mod merge;
pub mod sections;

use crate::models::{Outline, Question, QuestionScope, Section, MAX_CUSTOM_QUESTIONS};
use sections::{ordinal_label, renumber_sections};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProgressSummary {
    pub total: usize,
    pub asked: usize,
    /// Rounded to the nearest whole percent; 0 when there are no questions.
    pub percentage: u8,
}

/// Moves the item at `from` into the index `target` held before the move,
/// so the moved item ends up exactly where the target was. Returns `None`
/// (leaving `items` untouched) if `target` is missing.
pub(crate) fn move_to_target<T>(
    items: &mut Vec<T>,
    from: usize,
    is_target: impl Fn(&T) -> bool,
) -> Option<()> {
    if from >= items.len() {
        return None;
    }
    let to = items.iter().position(is_target)?;
    let moved = items.remove(from);
    items.insert(to, moved);
    Some(())
}

fn toggled(list: &mut [Question], question_id: &str, flip: impl Fn(&mut Question)) -> bool {
    match list.iter_mut().find(|q| q.id == question_id) {
        Some(q) => {
            flip(q);
            true
        }
        None => false,
    }
}

impl Outline {
    fn updated(&self, apply: impl FnOnce(&mut Outline) -> bool) -> Option<Outline> {
        let mut next = self.clone();
        apply(&mut next).then_some(next)
    }

    /// The ordered (non-custom) question list a scope points at.
    pub fn questions_in(&self, scope: &QuestionScope) -> Option<&[Question]> {
        let section = self.section(&scope.section_id)?;
        match &scope.subsection_id {
            Some(sub_id) => section.subsection(sub_id).map(|s| s.questions.as_slice()),
            None => Some(section.questions.as_slice()),
        }
    }

    /// Like [`Outline::questions_in`], but only while the section and, for a
    /// subsection scope, the subsection are selected. Deselected scopes take
    /// no part in reordering or indenting.
    pub fn active_questions_in(&self, scope: &QuestionScope) -> Option<&[Question]> {
        let section = self.section(&scope.section_id).filter(|s| s.is_selected)?;
        match &scope.subsection_id {
            Some(sub_id) => section
                .subsection(sub_id)
                .filter(|s| s.is_selected)
                .map(|s| s.questions.as_slice()),
            None => Some(section.questions.as_slice()),
        }
    }

    pub(crate) fn questions_in_mut(&mut self, scope: &QuestionScope) -> Option<&mut Vec<Question>> {
        let section = self.section_mut(&scope.section_id)?;
        match &scope.subsection_id {
            Some(sub_id) => section.subsection_mut(sub_id).map(|s| &mut s.questions),
            None => Some(&mut section.questions),
        }
    }

    pub fn custom_questions_in(&self, scope: &QuestionScope) -> Option<&[Question]> {
        let section = self.section(&scope.section_id)?;
        match &scope.subsection_id {
            Some(sub_id) => section
                .subsection(sub_id)
                .map(|s| s.custom_questions.as_slice()),
            None => Some(section.custom_questions.as_slice()),
        }
    }

    fn custom_questions_in_mut(&mut self, scope: &QuestionScope) -> Option<&mut Vec<Question>> {
        let section = self.section_mut(&scope.section_id)?;
        match &scope.subsection_id {
            Some(sub_id) => section.subsection_mut(sub_id).map(|s| &mut s.custom_questions),
            None => Some(&mut section.custom_questions),
        }
    }

    /// Looks in the scope's regular questions first, then its custom ones.
    pub fn find_question(&self, scope: &QuestionScope, question_id: &str) -> Option<&Question> {
        self.questions_in(scope)
            .and_then(|qs| qs.iter().find(|q| q.id == question_id))
            .or_else(|| {
                self.custom_questions_in(scope)
                    .and_then(|qs| qs.iter().find(|q| q.id == question_id))
            })
    }

    fn with_question(
        &self,
        scope: &QuestionScope,
        question_id: &str,
        apply: impl Fn(&mut Question),
    ) -> Option<Outline> {
        self.find_question(scope, question_id)?;
        self.updated(|o| {
            let in_regular = o
                .questions_in_mut(scope)
                .is_some_and(|qs| toggled(qs, question_id, &apply));
            in_regular
                || o.custom_questions_in_mut(scope)
                    .is_some_and(|qs| toggled(qs, question_id, &apply))
        })
    }

    pub fn toggle_asked(&self, scope: &QuestionScope, question_id: &str) -> Option<Outline> {
        self.with_question(scope, question_id, |q| q.is_asked = !q.is_asked)
    }

    pub fn toggle_flagged(&self, scope: &QuestionScope, question_id: &str) -> Option<Outline> {
        self.with_question(scope, question_id, |q| q.is_flagged = !q.is_flagged)
    }

    pub fn update_question_text(
        &self,
        scope: &QuestionScope,
        question_id: &str,
        text: &str,
    ) -> Option<Outline> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let current = self.find_question(scope, question_id)?;
        if current.text == text {
            return None;
        }
        self.with_question(scope, question_id, |q| q.text = text.to_string())
    }

    /// Appends a custom question. Rejected once the list holds
    /// `MAX_CUSTOM_QUESTIONS`, for blank text, or for a duplicate id.
    pub fn add_custom_question(
        &self,
        scope: &QuestionScope,
        id: &str,
        text: &str,
    ) -> Option<Outline> {
        let text = text.trim();
        if text.is_empty() || id.trim().is_empty() {
            return None;
        }
        let existing = self.custom_questions_in(scope)?;
        if existing.len() >= MAX_CUSTOM_QUESTIONS {
            return None;
        }
        if self.find_question(scope, id).is_some() {
            return None;
        }
        self.updated(|o| match o.custom_questions_in_mut(scope) {
            Some(list) => {
                list.push(Question::custom(id, text));
                true
            }
            None => false,
        })
    }

    pub fn remove_custom_question(&self, scope: &QuestionScope, question_id: &str) -> Option<Outline> {
        let existing = self.custom_questions_in(scope)?;
        if !existing.iter().any(|q| q.id == question_id) {
            return None;
        }
        self.updated(|o| match o.custom_questions_in_mut(scope) {
            Some(list) => {
                list.retain(|q| q.id != question_id);
                true
            }
            None => false,
        })
    }

    pub fn update_notes(
        &self,
        section_id: &str,
        subsection_id: Option<&str>,
        notes: &str,
    ) -> Option<Outline> {
        let section = self.section(section_id)?;
        let current = match subsection_id {
            Some(sub_id) => &section.subsection(sub_id)?.notes,
            None => &section.notes,
        };
        if current == notes {
            return None;
        }
        self.updated(|o| {
            let Some(section) = o.section_mut(section_id) else {
                return false;
            };
            match subsection_id {
                Some(sub_id) => match section.subsection_mut(sub_id) {
                    Some(sub) => {
                        sub.notes = notes.to_string();
                        true
                    }
                    None => false,
                },
                None => {
                    section.notes = notes.to_string();
                    true
                }
            }
        })
    }

    pub fn toggle_section_selected(&self, section_id: &str) -> Option<Outline> {
        self.section(section_id)?;
        self.updated(|o| match o.section_mut(section_id) {
            Some(s) => {
                s.is_selected = !s.is_selected;
                true
            }
            None => false,
        })
    }

    pub fn toggle_subsection_selected(&self, section_id: &str, subsection_id: &str) -> Option<Outline> {
        self.section(section_id)?.subsection(subsection_id)?;
        self.updated(|o| {
            match o
                .section_mut(section_id)
                .and_then(|s| s.subsection_mut(subsection_id))
            {
                Some(sub) => {
                    sub.is_selected = !sub.is_selected;
                    true
                }
                None => false,
            }
        })
    }

    /// Appends an empty, selected section titled with the next ordinal.
    pub fn add_section(&self, id: &str) -> Option<Outline> {
        if id.trim().is_empty() || self.section(id).is_some() {
            return None;
        }
        let title = format!("{}. NEW SECTION", ordinal_label(self.sections.len()));
        self.updated(|o| {
            o.sections.push(Section::new(id, title));
            true
        })
    }

    pub fn delete_section(&self, section_id: &str) -> Option<Outline> {
        self.section(section_id)?;
        self.updated(|o| {
            o.sections.retain(|s| s.id != section_id);
            renumber_sections(&mut o.sections);
            true
        })
    }

    /// Replaces a section's title and its question list with one question per
    /// non-blank line. Regenerated questions start unasked and unflagged.
    pub fn rewrite_section(&self, section_id: &str, title: &str, questions_text: &str) -> Option<Outline> {
        if title.trim().is_empty() || questions_text.trim().is_empty() {
            return None;
        }
        self.section(section_id)?;
        let questions: Vec<Question> = questions_text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(i, line)| Question::new(format!("question-{section_id}-{i}"), line))
            .collect();

        self.updated(|o| match o.section_mut(section_id) {
            Some(s) => {
                s.title = title.to_string();
                s.questions = questions;
                true
            }
            None => false,
        })
    }

    /// Totals over selected sections and their selected subsections,
    /// counting custom questions alongside template ones.
    pub fn progress(&self) -> ProgressSummary {
        let mut total = 0;
        let mut asked = 0;
        let mut count = |qs: &[Question]| {
            total += qs.len();
            asked += qs.iter().filter(|q| q.is_asked).count();
        };

        for section in self.sections.iter().filter(|s| s.is_selected) {
            count(section.questions.as_slice());
            count(section.custom_questions.as_slice());
            for sub in section.subsections.iter().filter(|s| s.is_selected) {
                count(sub.questions.as_slice());
                count(sub.custom_questions.as_slice());
            }
        }

        let percentage = if total == 0 {
            0
        } else {
            ((asked as f64 / total as f64) * 100.0).round() as u8
        };

        ProgressSummary {
            total,
            asked,
            percentage,
        }
    }

    /// Back to template order with every question unasked and unflagged.
    /// Notes and custom questions survive; custom questions are reset too.
    pub fn reset_progress(&self, template: &Outline) -> Outline {
        fn cleared(qs: &[Question]) -> Vec<Question> {
            qs.iter()
                .map(|q| Question {
                    is_asked: false,
                    is_flagged: false,
                    ..q.clone()
                })
                .collect()
        }

        let sections = template
            .sections
            .iter()
            .map(|original| {
                let current = self.section(&original.id);
                let mut section = original.clone();
                section.questions = cleared(&original.questions);
                section.notes = current.map(|c| c.notes.clone()).unwrap_or_default();
                section.custom_questions = current
                    .map(|c| cleared(&c.custom_questions))
                    .unwrap_or_default();
                for sub in section.subsections.iter_mut() {
                    let current_sub = current.and_then(|c| c.subsection(&sub.id));
                    sub.questions = cleared(&sub.questions);
                    sub.notes = current_sub.map(|c| c.notes.clone()).unwrap_or_default();
                    sub.custom_questions = current_sub
                        .map(|c| cleared(&c.custom_questions))
                        .unwrap_or_default();
                }
                section
            })
            .collect();

        Outline::new(sections)
    }
}
