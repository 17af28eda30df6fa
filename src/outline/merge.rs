//! Reconciling the shipped template with saved progress.
//!
//! The template owns question wording and the per-section question list.
//! Saved progress owns section order, ask/flag state, indent levels, notes,
//! selection and custom questions. Merging runs once per load.

use crate::models::{Outline, Question, Section, Subsection};

/// What to do with a saved subsection whose id no longer exists in the
/// matching template section.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OrphanSubsections {
    /// Keep it, after the template's subsections, in saved order.
    #[default]
    Preserve,
    /// Drop it along with its notes and answers.
    Discard,
}

/// The template as a fresh working copy: every question starts at depth 0.
pub fn with_default_indents(template: &Outline) -> Outline {
    fn reset(qs: &mut [Question]) {
        qs.iter_mut().for_each(|q| q.indent_level = 0);
    }

    let mut out = template.clone();
    for section in out.sections.iter_mut() {
        reset(&mut section.questions);
        reset(&mut section.custom_questions);
        for sub in section.subsections.iter_mut() {
            reset(&mut sub.questions);
            reset(&mut sub.custom_questions);
        }
    }
    out
}

pub fn merge_progress(
    template: &Outline,
    progress: Option<&Outline>,
    orphans: OrphanSubsections,
) -> Outline {
    let Some(progress) = progress.filter(|p| !p.is_empty()) else {
        return with_default_indents(template);
    };

    let sections = progress
        .sections
        .iter()
        .map(|saved| match template.section(&saved.id) {
            Some(original) => merge_section(original, saved, orphans),
            // Sections the user added have no template counterpart.
            None => saved.clone(),
        })
        .collect();

    Outline::new(sections)
}

/// Template order and wording; saved state wherever the id matches.
fn merge_questions(template: &[Question], saved: &[Question]) -> Vec<Question> {
    template
        .iter()
        .map(|original| match saved.iter().find(|q| q.id == original.id) {
            Some(s) => Question {
                text: original.text.clone(),
                ..s.clone()
            },
            None => Question {
                indent_level: 0,
                ..original.clone()
            },
        })
        .collect()
}

fn merge_section(original: &Section, saved: &Section, orphans: OrphanSubsections) -> Section {
    let mut subsections: Vec<Subsection> = original
        .subsections
        .iter()
        .map(|orig_sub| match saved.subsection(&orig_sub.id) {
            Some(saved_sub) => Subsection {
                questions: merge_questions(&orig_sub.questions, &saved_sub.questions),
                ..saved_sub.clone()
            },
            None => orig_sub.clone(),
        })
        .collect();

    if orphans == OrphanSubsections::Preserve {
        subsections.extend(
            saved
                .subsections
                .iter()
                .filter(|s| original.subsection(&s.id).is_none())
                .cloned(),
        );
    }

    Section {
        questions: merge_questions(&original.questions, &saved.questions),
        subsections,
        ..saved.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuestionScope;
    use crate::outline::test_support::*;

    fn template() -> Outline {
        let mut s2 = section("background", "II. BACKGROUND", &["b1", "b2"]);
        s2.subsections.push(sub("education", &["e1", "e2"]));
        s2.subsections.push(sub("language", &["l1"]));
        Outline::new(vec![
            section("intro", "I. INTRODUCTION", &["q1", "q2", "q3"]),
            s2,
            section("rules", "III. GROUND RULES", &["r1"]),
        ])
    }

    #[test]
    fn test_no_progress_returns_template_with_zero_indents() {
        let mut t = template();
        t.sections[0].questions[1].indent_level = 2;
        let merged = merge_progress(&t, None, OrphanSubsections::Preserve);
        assert!(merged.sections[0].questions.iter().all(|q| q.indent_level == 0));
        assert_eq!(merged.section_ids(), t.section_ids());

        // Empty progress behaves like no progress.
        let empty = Outline::default();
        assert_eq!(merge_progress(&t, Some(&empty), OrphanSubsections::Preserve), merged);
    }

    #[test]
    fn test_new_template_question_scenario() {
        let t = template();
        let mut progress = Outline::new(vec![section("intro", "I. INTRODUCTION", &["q1", "q3"])]);
        progress.sections[0].questions[0].is_asked = true;

        let merged = merge_progress(&t, Some(&progress), OrphanSubsections::Preserve);
        let qs = &merged.sections[0].questions;
        assert_eq!(ids(qs), vec!["q1", "q2", "q3"]);
        assert!(qs[0].is_asked);
        assert!(!qs[1].is_asked);
        assert_eq!(qs[1].indent_level, 0);
        assert!(!qs[2].is_asked);
    }

    #[test]
    fn test_template_text_wins_and_state_is_kept() {
        let t = template();
        let mut progress = t.clone();
        {
            let q = &mut progress.sections[0].questions[1];
            q.text = "Old wording".to_string();
            q.is_flagged = true;
            q.indent_level = 3;
        }
        let merged = merge_progress(&t, Some(&progress), OrphanSubsections::Preserve);
        let q = &merged.sections[0].questions[1];
        assert_eq!(q.text, t.sections[0].questions[1].text);
        assert!(q.is_flagged);
        assert_eq!(q.indent_level, 3);
    }

    #[test]
    fn test_saved_section_order_is_kept() {
        let t = template();
        let mut progress = t.clone();
        progress.sections.rotate_left(1);
        progress.sections[0].title = "I. BACKGROUND".to_string();

        let merged = merge_progress(&t, Some(&progress), OrphanSubsections::Preserve);
        assert_eq!(merged.section_ids(), vec!["background", "rules", "intro"]);
        assert_eq!(merged.sections[0].title, "I. BACKGROUND");
    }

    #[test]
    fn test_saved_only_state_survives() {
        let t = template();
        let scope = QuestionScope::section("intro");
        let progress = t
            .add_custom_question(&scope, "custom_1", "Mine")
            .and_then(|o| o.update_notes("intro", None, "notes"))
            .and_then(|o| o.toggle_section_selected("rules"))
            .expect("should update");

        let merged = merge_progress(&t, Some(&progress), OrphanSubsections::Preserve);
        assert_eq!(merged.sections[0].custom_questions.len(), 1);
        assert_eq!(merged.sections[0].notes, "notes");
        assert!(!merged.sections[2].is_selected);
    }

    #[test]
    fn test_user_sections_pass_through() {
        let t = template();
        let mut progress = t.clone();
        let mut extra = section("section-1700000000000", "IV. NEW SECTION", &["x1"]);
        extra.questions[0].is_asked = true;
        progress.sections.push(extra.clone());

        let merged = merge_progress(&t, Some(&progress), OrphanSubsections::Preserve);
        assert_eq!(merged.sections[3], extra);
    }

    #[test]
    fn test_subsections_follow_template_and_fall_back_to_raw_template() {
        let t = template();
        let mut progress = t.clone();
        progress.sections[1].subsections.retain(|s| s.id == "education");
        progress.sections[1].subsections[0].questions[0].is_asked = true;
        progress.sections[1].subsections[0].notes = "BA".to_string();

        let merged = merge_progress(&t, Some(&progress), OrphanSubsections::Preserve);
        let subs = &merged.sections[1].subsections;
        assert_eq!(subs.len(), 2);
        assert!(subs[0].questions[0].is_asked);
        assert_eq!(subs[0].notes, "BA");
        assert_eq!(subs[1], t.sections[1].subsections[1]);
    }

    #[test]
    fn test_orphan_subsection_policy() {
        let t = template();
        let mut progress = t.clone();
        let mut orphan = sub("retired", &["z1"]);
        orphan.notes = "do not lose".to_string();
        progress.sections[1].subsections.insert(0, orphan.clone());

        let kept = merge_progress(&t, Some(&progress), OrphanSubsections::Preserve);
        let subs = &kept.sections[1].subsections;
        assert_eq!(subs.len(), 3);
        assert_eq!(subs[2], orphan);

        let dropped = merge_progress(&t, Some(&progress), OrphanSubsections::Discard);
        assert_eq!(dropped.sections[1].subsections.len(), 2);
        assert!(dropped.sections[1].subsection("retired").is_none());
    }

    #[test]
    fn test_progress_questions_missing_from_template_are_dropped() {
        let t = template();
        let mut progress = t.clone();
        progress.sections[2].questions.push(q("gone"));
        let merged = merge_progress(&t, Some(&progress), OrphanSubsections::Preserve);
        assert_eq!(ids(&merged.sections[2].questions), vec!["r1"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let t = template();
        let mut progress = Outline::new(vec![
            section("rules", "I. GROUND RULES", &["r1"]),
            section("intro", "II. INTRODUCTION", &["q3", "q1"]),
            t.sections[1].clone(),
            section("mine", "IV. NEW SECTION", &["m1"]),
        ]);
        progress.sections[1].questions[0].indent_level = 2;
        progress.sections[2].subsections.truncate(1);
        progress.sections[2].subsections.push(sub("orphan", &["o1"]));

        for policy in [OrphanSubsections::Preserve, OrphanSubsections::Discard] {
            let once = merge_progress(&t, Some(&progress), policy);
            let twice = merge_progress(&t, Some(&once), policy);
            assert_eq!(once, twice, "policy {policy:?}");
        }
    }
}
