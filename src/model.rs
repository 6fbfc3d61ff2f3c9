//! Wire and domain types shared by the backend client, the session and the presenter.

use serde::{Deserialize, Deserializer, Serialize};

/// Longest question, in characters, that is ever sent to the backend.
pub const MAX_QUESTION_CHARS: usize = 500;

/// A simulated expert viewpoint selected by the backend for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    /// Display identifier, unique within one persona set
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub background: String,
    #[serde(default)]
    pub core_expertise: Vec<String>,
    #[serde(default)]
    pub cognitive_approach: String,
    #[serde(default)]
    pub values_and_motivations: String,
    #[serde(default)]
    pub communication_style: String,
    #[serde(default)]
    pub notable_trait: String,
    /// Why the backend picked this persona for the question
    #[serde(default)]
    pub rationale: String,
}

impl Persona {
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            background: String::new(),
            core_expertise: Vec::new(),
            cognitive_approach: String::new(),
            values_and_motivations: String::new(),
            communication_style: String::new(),
            notable_trait: String::new(),
            rationale: String::new(),
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }

    pub fn with_expertise(mut self, expertise: &[&str]) -> Self {
        self.core_expertise = expertise.iter().map(|s| s.to_string()).collect();
        self
    }
}

/// Names that occur more than once in a persona set, in first-seen order.
pub fn duplicate_persona_names(personas: &[Persona]) -> Vec<&str> {
    let mut seen = std::collections::HashSet::new();
    let mut dupes = Vec::new();
    for persona in personas {
        if !seen.insert(persona.name.as_str()) && !dupes.contains(&persona.name.as_str()) {
            dupes.push(persona.name.as_str());
        }
    }
    dupes
}

/// Outcome of one improvement cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinementResult {
    pub improved_question: String,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub final_answer: String,
    /// Narrative of how the reasoning evolved
    #[serde(default)]
    pub summary: String,
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub harmony_principle: Option<String>,
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub individual_answers: Option<String>,
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub new_dimensions: Option<String>,
}

impl RefinementResult {
    pub fn new(improved_question: impl Into<String>) -> Self {
        Self {
            improved_question: improved_question.into(),
            rationale: String::new(),
            final_answer: String::new(),
            summary: String::new(),
            harmony_principle: None,
            individual_answers: None,
            new_dimensions: None,
        }
    }
}

/// Treat `null`, missing and blank strings alike as "absent".
fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// Body of `POST /select-personas`.
#[derive(Debug, Serialize)]
pub struct SelectPersonasRequest<'a> {
    pub text: &'a str,
}

/// Success body of `POST /select-personas`.
#[derive(Debug, Deserialize)]
pub struct SelectPersonasResponse {
    pub personas: Vec<Persona>,
}

/// Body of `POST /improve-question`.
#[derive(Debug, Serialize)]
pub struct ImproveQuestionRequest<'a> {
    pub text: &'a str,
    pub personas: &'a [Persona],
}

/// Success body of `GET /test`.
#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub message: String,
}

/// Normalise raw user input into the text sent to the backend.
///
/// Returns `None` for blank input. Longer input is cut to
/// [`MAX_QUESTION_CHARS`] characters; whitespace is otherwise left alone.
pub fn normalize_question(raw: &str) -> Option<String> {
    if raw.trim().is_empty() {
        return None;
    }
    Some(raw.chars().take(MAX_QUESTION_CHARS).collect())
}
