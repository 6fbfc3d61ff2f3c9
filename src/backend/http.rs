use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::ReasoningBackend;
use crate::errors::BackendError;
use crate::model::{
    HealthResponse, ImproveQuestionRequest, Persona, RefinementResult, SelectPersonasRequest,
    SelectPersonasResponse, duplicate_persona_names,
};

const SELECT_PERSONAS_PATH: &str = "/select-personas";
const IMPROVE_QUESTION_PATH: &str = "/improve-question";
const HEALTH_PATH: &str = "/test";
const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);

/// [`ReasoningBackend`] over JSON/HTTP.
///
/// Each call carries its own timeout; a timeout surfaces as
/// [`BackendError::Timeout`] so the session can route it to `Errored`.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    selection_timeout: Duration,
    improvement_timeout: Duration,
}

impl HttpBackend {
    pub fn new(
        base_url: &str,
        selection_timeout: Duration,
        improvement_timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = Client::builder()
            .user_agent(concat!("refiner/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BackendError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            selection_timeout,
            improvement_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json<B, R>(&self, path: &str, body: &B, timeout: Duration) -> Result<R, BackendError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.url(path);
        debug!(%url, "sending backend request");

        let resp = self
            .client
            .post(&url)
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| BackendError::from_reqwest(e, timeout))?;

        let status = resp.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "backend returned error status");
            return Err(BackendError::Status {
                status: status.as_u16(),
            });
        }

        resp.json::<R>()
            .await
            .map_err(|e| BackendError::from_reqwest(e, timeout))
    }

    /// Probe `GET /test` and return the backend's greeting.
    pub async fn ping(&self) -> Result<String, BackendError> {
        let resp = self
            .client
            .get(self.url(HEALTH_PATH))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
            .map_err(|e| BackendError::from_reqwest(e, HEALTH_TIMEOUT))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
            });
        }

        let health = resp
            .json::<HealthResponse>()
            .await
            .map_err(|e| BackendError::from_reqwest(e, HEALTH_TIMEOUT))?;
        Ok(health.message)
    }
}

#[async_trait]
impl ReasoningBackend for HttpBackend {
    async fn select_personas(&self, question: &str) -> Result<Vec<Persona>, BackendError> {
        let resp: SelectPersonasResponse = self
            .post_json(
                SELECT_PERSONAS_PATH,
                &SelectPersonasRequest { text: question },
                self.selection_timeout,
            )
            .await?;

        let dupes = duplicate_persona_names(&resp.personas);
        if !dupes.is_empty() {
            warn!(?dupes, "backend returned duplicate persona names");
        }
        debug!(count = resp.personas.len(), "personas selected");
        Ok(resp.personas)
    }

    async fn improve_question(
        &self,
        question: &str,
        personas: &[Persona],
    ) -> Result<RefinementResult, BackendError> {
        let mut result: RefinementResult = self
            .post_json(
                IMPROVE_QUESTION_PATH,
                &ImproveQuestionRequest {
                    text: question,
                    personas,
                },
                self.improvement_timeout,
            )
            .await?;

        let trimmed = result.improved_question.trim();
        if trimmed.is_empty() {
            return Err(BackendError::EmptyImprovedQuestion);
        }
        if trimmed.len() != result.improved_question.len() {
            result.improved_question = trimmed.to_string();
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let backend = HttpBackend::new(
            "http://localhost:8000/",
            Duration::from_secs(1),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(backend.base_url(), "http://localhost:8000");
        assert_eq!(
            backend.url(SELECT_PERSONAS_PATH),
            "http://localhost:8000/select-personas"
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        // Port 9 (discard) on localhost is closed in practice.
        let backend = HttpBackend::new(
            "http://127.0.0.1:9",
            Duration::from_secs(5),
            Duration::from_secs(5),
        )
        .unwrap();
        let err = backend.select_personas("Why?").await.unwrap_err();
        assert!(
            matches!(err, BackendError::Transport(_) | BackendError::Timeout { .. }),
            "unexpected error: {:?}",
            err
        );
        assert!(err.user_message().starts_with("An error occurred: "));
    }
}
