//! Read-only projection of a completed cycle for display.
//!
//! A [`ResultView`] exists only while the session is `Complete`. The
//! rationale and the two optional long-form sections (individual answers,
//! new dimensions) are wrapped in [`Disclosure`]s so their markup is parsed
//! only when the user asks to see them.

pub mod markup;

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::Persona;
use crate::session::{Session, SessionPhase};
use markup::Span;

/// Text that stays collapsed until revealed.
#[derive(Debug, Default)]
pub struct Disclosure {
    text: Option<String>,
    spans: OnceLock<Vec<Span>>,
}

impl Disclosure {
    pub fn new(text: Option<String>) -> Self {
        Self {
            text: text.filter(|t| !t.trim().is_empty()),
            spans: OnceLock::new(),
        }
    }

    /// Whether there is anything to reveal.
    pub fn is_available(&self) -> bool {
        self.text.is_some()
    }

    pub fn is_revealed(&self) -> bool {
        self.spans.get().is_some()
    }

    /// Parse (once) and return the content. Empty when unavailable.
    pub fn reveal(&self) -> &[Span] {
        self.spans
            .get_or_init(|| self.text.as_deref().map(markup::parse_bold).unwrap_or_default())
    }

    pub fn raw(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

/// Everything the presenter shows for one completed cycle.
#[derive(Debug)]
pub struct ResultView {
    pub question: String,
    pub improved_question: String,
    pub rationale: Disclosure,
    pub final_answer: String,
    pub harmony_principle: Option<String>,
    pub summary: String,
    pub personas: Vec<Persona>,
    pub iteration: u32,
    pub celebrating: bool,
    pub individual_answers: Disclosure,
    pub new_dimensions: Disclosure,
}

impl ResultView {
    /// Build a view, or `None` unless the session is `Complete`.
    pub fn from_session(session: &Session) -> Option<Self> {
        let SessionPhase::Complete {
            personas,
            result,
            celebrating,
            ..
        } = session.phase()
        else {
            return None;
        };

        Some(Self {
            question: session.question().to_string(),
            improved_question: result.improved_question.clone(),
            rationale: Disclosure::new(Some(result.rationale.clone())),
            final_answer: result.final_answer.clone(),
            harmony_principle: result.harmony_principle.clone(),
            summary: result.summary.clone(),
            personas: personas.clone(),
            iteration: session.iteration(),
            celebrating: *celebrating,
            individual_answers: Disclosure::new(result.individual_answers.clone()),
            new_dimensions: Disclosure::new(result.new_dimensions.clone()),
        })
    }

    /// Serializable summary for `--ui json`.
    pub fn report(&self) -> ResultReport {
        ResultReport {
            question: self.question.clone(),
            improved_question: self.improved_question.clone(),
            rationale: self.rationale.raw().unwrap_or_default().to_string(),
            final_answer: self.final_answer.clone(),
            harmony_principle: self.harmony_principle.clone(),
            summary: self.summary.clone(),
            personas: self.personas.iter().map(|p| p.name.clone()).collect(),
            iteration: self.iteration,
            individual_answers: self.individual_answers.raw().map(str::to_string),
            new_dimensions: self.new_dimensions.raw().map(str::to_string),
            generated_at: Utc::now(),
        }
    }
}

/// JSON shape of a completed cycle.
#[derive(Debug, Clone, Serialize)]
pub struct ResultReport {
    pub question: String,
    pub improved_question: String,
    pub rationale: String,
    pub final_answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub harmony_principle: Option<String>,
    pub summary: String,
    pub personas: Vec<String>,
    pub iteration: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub individual_answers: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_dimensions: Option<String>,
    pub generated_at: DateTime<Utc>,
}
