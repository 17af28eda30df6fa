use std::sync::OnceLock;

use crate::models::Outline;

/// Bumped whenever the bundled question set changes shape.
pub const TEMPLATE_VERSION: &str = "1.0";

const DEFAULT_TEMPLATE_JSON: &str = include_str!("../../templates/deposition_outline.json");

static DEFAULT_TEMPLATE: OnceLock<Outline> = OnceLock::new();

/// Parses a template supplied as a JSON array of sections.
pub fn template_from_json(raw: &str) -> Result<Outline, serde_json::Error> {
    serde_json::from_str(raw)
}

/// The outline shipped with the crate. Parsed once; a broken bundle logs
/// and yields an empty outline rather than taking the editor down.
pub fn default_template() -> &'static Outline {
    DEFAULT_TEMPLATE.get_or_init(|| match template_from_json(DEFAULT_TEMPLATE_JSON) {
        Ok(outline) => outline,
        Err(e) => {
            leptos::logging::error!("bundled outline template is invalid: {e}");
            Outline::default()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::sections::ORDINAL_LABELS;
    use std::collections::HashSet;

    #[test]
    fn test_bundled_template_parses() {
        let t = template_from_json(DEFAULT_TEMPLATE_JSON).expect("bundled template should parse");
        assert_eq!(t.sections.len(), 27);
        assert_eq!(t.sections[0].id, "introduction");
        assert_eq!(t.sections[0].subsections[0].id, "previous_depositions");
        assert_eq!(&t, default_template());
    }

    #[test]
    fn test_bundled_template_is_fresh() {
        let t = default_template();
        for s in &t.sections {
            assert!(s.is_selected);
            assert!(s.custom_questions.is_empty());
            let all = s
                .questions
                .iter()
                .chain(s.subsections.iter().flat_map(|sub| sub.questions.iter()));
            for q in all {
                assert!(!q.is_asked && !q.is_flagged && !q.is_custom, "{}", q.id);
                assert_eq!(q.indent_level, 0);
            }
        }
    }

    #[test]
    fn test_bundled_titles_carry_positional_ordinals() {
        for (i, s) in default_template().sections.iter().enumerate() {
            let (label, _) = s.title.split_once('.').expect("title has an ordinal");
            assert_eq!(label, ORDINAL_LABELS[i], "section {}", s.id);
        }
    }

    #[test]
    fn test_ids_unique_within_each_list() {
        let t = default_template();
        let section_ids: HashSet<_> = t.sections.iter().map(|s| &s.id).collect();
        assert_eq!(section_ids.len(), t.sections.len());

        for s in &t.sections {
            let own: HashSet<_> = s.questions.iter().map(|q| &q.id).collect();
            assert_eq!(own.len(), s.questions.len(), "section {}", s.id);
            for sub in &s.subsections {
                let ids: HashSet<_> = sub.questions.iter().map(|q| &q.id).collect();
                assert_eq!(ids.len(), sub.questions.len(), "{}/{}", s.id, sub.id);
            }
        }
    }

    #[test]
    fn test_template_from_json_rejects_garbage() {
        assert!(template_from_json("{\"sections\": 1}").is_err());
        let t = template_from_json("[]").expect("empty list is a valid template");
        assert!(t.is_empty());
    }
}
