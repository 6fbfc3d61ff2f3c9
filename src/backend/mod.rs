//! Client side of the reasoning backend.
//!
//! The session controller only talks to the [`ReasoningBackend`] trait; the
//! production implementation is [`HttpBackend`], which speaks JSON over HTTP.

mod http;

use async_trait::async_trait;

use crate::errors::BackendError;
use crate::model::{Persona, RefinementResult};

pub use http::HttpBackend;

/// The two remote calls that make up one refinement cycle.
#[async_trait]
pub trait ReasoningBackend: Send + Sync + 'static {
    /// Pick the personas that will reason about `question`.
    async fn select_personas(&self, question: &str) -> Result<Vec<Persona>, BackendError>;

    /// Run the multi-persona reasoning and return the refined question.
    async fn improve_question(
        &self,
        question: &str,
        personas: &[Persona],
    ) -> Result<RefinementResult, BackendError>;
}
