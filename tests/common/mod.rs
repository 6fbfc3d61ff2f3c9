//! Local mock of the reasoning backend, served by axum on `127.0.0.1:0`.

#![allow(dead_code)]

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Knobs for one mock backend instance.
#[derive(Debug, Clone, Default)]
pub struct MockBehavior {
    /// Respond to `/select-personas` with this status instead of personas
    pub select_status: Option<u16>,
    /// Respond to `/improve-question` with this status instead of a result
    pub improve_status: Option<u16>,
    /// Delay before answering `/improve-question`
    pub improve_delay: Duration,
    /// Serve this body from `/improve-question` instead of the usual result
    pub improve_body: Option<MockBody>,
}

/// A canned `/improve-question` reply.
#[derive(Debug, Clone)]
pub enum MockBody {
    Json(Value),
    /// Sent verbatim with a JSON content type
    Raw(&'static str),
}

#[derive(Default)]
struct Recorded {
    select_bodies: Vec<Value>,
    improve_bodies: Vec<Value>,
}

struct MockState {
    behavior: MockBehavior,
    recorded: Mutex<Recorded>,
}

pub struct MockBackend {
    pub url: String,
    state: Arc<MockState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

pub fn personas_json() -> Value {
    json!([
        {
            "name": "Aristotle",
            "role": "Philosopher",
            "background": "Ancient Greek philosopher",
            "core_expertise": ["Ethics", "Logic"],
            "rationale": "Virtue ethics speaks to happiness"
        },
        {
            "name": "Maslow",
            "role": "Psychologist",
            "core_expertise": ["Motivation"]
        },
        {
            "name": "Buddha",
            "role": "Spiritual teacher"
        }
    ])
}

/// Deterministic improvement: append " (refined)" to the incoming text.
fn improvement_for(text: &str) -> Value {
    json!({
        "improved_question": format!("{} (refined)", text),
        "final_answer": "A life of **virtue** and connection",
        "summary": "The personas moved from pleasure to purpose",
        "rationale": "It asks about **meaning** rather than feeling",
        "harmony_principle": "Connection",
        "new_dimensions": "Time, community",
        "individual_answers": "**Aristotle**: eudaimonia"
    })
}

async fn select_personas(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.recorded.lock().unwrap().select_bodies.push(body);
    if let Some(status) = state.behavior.select_status {
        return StatusCode::from_u16(status).unwrap().into_response();
    }
    Json(json!({ "personas": personas_json() })).into_response()
}

async fn improve_question(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    let text = body["text"].as_str().unwrap_or_default().to_string();
    state.recorded.lock().unwrap().improve_bodies.push(body);
    tokio::time::sleep(state.behavior.improve_delay).await;
    if let Some(status) = state.behavior.improve_status {
        return StatusCode::from_u16(status).unwrap().into_response();
    }
    match &state.behavior.improve_body {
        Some(MockBody::Json(value)) => Json(value.clone()).into_response(),
        Some(MockBody::Raw(raw)) => (
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            *raw,
        )
            .into_response(),
        None => Json(improvement_for(&text)).into_response(),
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "message": "Test successful" }))
}

impl MockBackend {
    /// Start serving. Returns `None` when binding is not permitted (sandboxed runs).
    pub async fn start(behavior: MockBehavior) -> Option<Self> {
        let listener = match TcpListener::bind("127.0.0.1:0").await {
            Ok(listener) => listener,
            Err(e) => {
                eprintln!("Skipping mock backend (sandbox): {:?}", e);
                return None;
            }
        };
        let addr = listener.local_addr().ok()?;

        let state = Arc::new(MockState {
            behavior,
            recorded: Mutex::new(Recorded::default()),
        });
        let app = Router::new()
            .route("/select-personas", post(select_personas))
            .route("/improve-question", post(improve_question))
            .route("/test", get(health))
            .with_state(state.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        Some(Self {
            url: format!("http://{}", addr),
            state,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn select_bodies(&self) -> Vec<Value> {
        self.state.recorded.lock().unwrap().select_bodies.clone()
    }

    pub fn improve_bodies(&self) -> Vec<Value> {
        self.state.recorded.lock().unwrap().improve_bodies.clone()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
