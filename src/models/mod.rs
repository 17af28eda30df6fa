use serde::{Deserialize, Deserializer, Serialize};

/// Deepest indent a question can take.
pub const MAX_INDENT_LEVEL: u8 = 3;

/// Custom questions allowed per section and per subsection.
pub const MAX_CUSTOM_QUESTIONS: usize = 10;

pub fn clamp_indent(level: i64) -> u8 {
    level.clamp(0, MAX_INDENT_LEVEL as i64) as u8
}

/// Saved blobs come from a JS front-end, so indent levels may be floats,
/// negative, null or missing. Anything readable is clamped into range.
fn deserialize_indent_level<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?;
    Ok(match raw {
        Some(v) if v.is_finite() => clamp_indent(v.round() as i64),
        _ => 0,
    })
}

fn default_selected() -> bool {
    true
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub text: String,

    #[serde(default)]
    pub is_asked: bool,

    #[serde(default)]
    pub is_flagged: bool,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_custom: bool,

    /// Organizational nesting under the previous question, 0..=3.
    /// Persisted with progress so layout survives a reload.
    #[serde(default, deserialize_with = "deserialize_indent_level")]
    pub indent_level: u8,
}

impl Question {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            is_asked: false,
            is_flagged: false,
            is_custom: false,
            indent_level: 0,
        }
    }

    pub fn custom(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            is_custom: true,
            ..Self::new(id, text)
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Subsection {
    pub id: String,
    pub title: String,

    #[serde(default)]
    pub questions: Vec<Question>,

    #[serde(default)]
    pub custom_questions: Vec<Question>,

    #[serde(default = "default_selected")]
    pub is_selected: bool,

    #[serde(default)]
    pub notes: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,

    /// `"<ordinal>. <NAME>"`. The ordinal is derived from position.
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub questions: Vec<Question>,

    #[serde(default)]
    pub custom_questions: Vec<Question>,

    #[serde(default)]
    pub subsections: Vec<Subsection>,

    #[serde(default = "default_selected")]
    pub is_selected: bool,

    #[serde(default)]
    pub notes: String,
}

impl Section {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            questions: vec![],
            custom_questions: vec![],
            subsections: vec![],
            is_selected: true,
            notes: String::new(),
        }
    }

    pub fn subsection(&self, id: &str) -> Option<&Subsection> {
        self.subsections.iter().find(|s| s.id == id)
    }

    pub fn subsection_mut(&mut self, id: &str) -> Option<&mut Subsection> {
        self.subsections.iter_mut().find(|s| s.id == id)
    }
}

/// The whole outline document: an ordered list of top-level sections.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct Outline {
    pub sections: Vec<Section>,
}

impl Outline {
    pub fn new(sections: Vec<Section>) -> Self {
        Self { sections }
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    pub fn section_mut(&mut self, id: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.id == id)
    }

    pub fn section_ids(&self) -> Vec<String> {
        self.sections.iter().map(|s| s.id.clone()).collect()
    }
}

/// Which question list a gesture or edit applies to: a section's own list,
/// or one of its subsections' lists.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct QuestionScope {
    pub section_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsection_id: Option<String>,
}

impl QuestionScope {
    pub fn section(section_id: impl Into<String>) -> Self {
        Self {
            section_id: section_id.into(),
            subsection_id: None,
        }
    }

    pub fn subsection(section_id: impl Into<String>, subsection_id: impl Into<String>) -> Self {
        Self {
            section_id: section_id.into(),
            subsection_id: Some(subsection_id.into()),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Exhibit {
    pub id: String,
    pub number: String,
    pub description: String,

    #[serde(default)]
    pub is_introduced: bool,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    /// Seconds on the deposition clock.
    #[serde(default)]
    pub elapsed_time: u64,

    #[serde(default)]
    pub is_running: bool,
}

impl TimerState {
    pub fn tick(&mut self) {
        if self.is_running {
            self.elapsed_time = self.elapsed_time.saturating_add(1);
        }
    }
}

/// The progress blob written to and read back from the remote store.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressData {
    pub sections: Outline,

    #[serde(default)]
    pub exhibits: Vec<Exhibit>,

    #[serde(default)]
    pub timer: TimerState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SaveStatus {
    #[default]
    Saved,
    Saving,
    Unsaved,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_contract_deserialize_with_missing_fields() {
        // Template entries often omit isFlagged and indentLevel.
        let json = r#"{ "id": "intro_2", "text": "Please state your name.", "isAsked": false }"#;
        let q: Question = serde_json::from_str(json).expect("question should parse");
        assert_eq!(q.id, "intro_2");
        assert!(!q.is_flagged);
        assert!(!q.is_custom);
        assert_eq!(q.indent_level, 0);
    }

    #[test]
    fn test_indent_level_is_clamped_on_read() {
        let cases = [
            (r#"{"id":"a","text":"t","indentLevel":7}"#, 3),
            (r#"{"id":"a","text":"t","indentLevel":-2}"#, 0),
            (r#"{"id":"a","text":"t","indentLevel":1.6}"#, 2),
            (r#"{"id":"a","text":"t","indentLevel":null}"#, 0),
        ];
        for (json, expected) in cases {
            let q: Question = serde_json::from_str(json).expect("question should parse");
            assert_eq!(q.indent_level, expected, "input: {json}");
        }
    }

    #[test]
    fn test_indent_level_is_always_serialized() {
        let mut q = Question::new("q1", "text");
        q.indent_level = 2;
        let v = serde_json::to_value(&q).expect("should serialize");
        assert_eq!(v["indentLevel"], 2);
        assert_eq!(v["isAsked"], false);
        // isCustom only appears for custom questions.
        assert!(v.get("isCustom").is_none());

        let c = serde_json::to_value(Question::custom("c1", "mine")).expect("should serialize");
        assert_eq!(c["isCustom"], true);
        assert_eq!(c["indentLevel"], 0);
    }

    #[test]
    fn test_section_defaults() {
        let json = r#"{ "id": "s1", "title": "I. INTRODUCTION" }"#;
        let s: Section = serde_json::from_str(json).expect("section should parse");
        assert!(s.is_selected);
        assert!(s.questions.is_empty());
        assert!(s.custom_questions.is_empty());
        assert!(s.subsections.is_empty());
        assert_eq!(s.notes, "");
    }

    #[test]
    fn test_progress_data_contract() {
        let json = r#"{
            "sections": [
                { "id": "s1", "title": "I. A", "isSelected": true, "notes": "n",
                  "questions": [{ "id": "q1", "text": "t", "isAsked": true, "indentLevel": 1 }],
                  "customQuestions": [],
                  "subsections": [] }
            ],
            "exhibits": [{ "id": "e1", "number": "1", "description": "Photo", "isIntroduced": true }],
            "timer": { "elapsedTime": 125, "isRunning": false },
            "lastUpdated": "2024-05-01T10:00:00.000Z",
            "version": "1.0"
        }"#;
        let p: ProgressData = serde_json::from_str(json).expect("progress should parse");
        assert_eq!(p.sections.sections.len(), 1);
        assert_eq!(p.sections.sections[0].questions[0].indent_level, 1);
        assert!(p.exhibits[0].is_introduced);
        assert_eq!(p.timer.elapsed_time, 125);
        assert_eq!(p.version.as_deref(), Some("1.0"));

        // Sections serialize as a bare array, not a wrapper object.
        let v = serde_json::to_value(&p).expect("should serialize");
        assert!(v["sections"].is_array());
        assert_eq!(v["sections"][0]["questions"][0]["indentLevel"], 1);
    }

    #[test]
    fn test_save_status_serializes_lowercase() {
        let v = serde_json::to_value(SaveStatus::Unsaved).expect("should serialize");
        assert_eq!(v, "unsaved");
    }

    #[test]
    fn test_timer_tick_only_while_running() {
        let mut t = TimerState::default();
        t.tick();
        assert_eq!(t.elapsed_time, 0);
        t.is_running = true;
        t.tick();
        t.tick();
        assert_eq!(t.elapsed_time, 2);
    }
}
