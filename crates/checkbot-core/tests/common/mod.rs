//! Local stand-in for provider HTTP APIs.

#![allow(dead_code)]

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::{Json, Router};
use serde_json::Value;
use std::sync::{Arc, Mutex};

type Responder = Box<dyn Fn(&str, &Value) -> (u16, Value) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub headers: HeaderMap,
    pub body: Value,
}

struct MockState {
    requests: Mutex<Vec<RecordedRequest>>,
    responder: Responder,
}

pub struct MockUpstream {
    pub base_url: String,
    state: Arc<MockState>,
}

impl MockUpstream {
    /// Serve every request with `responder(path, body)`.
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&str, &Value) -> (u16, Value) + Send + Sync + 'static,
    {
        let state = Arc::new(MockState {
            requests: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        });

        let app = Router::new().fallback(handle).with_state(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}/v1"),
            state,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }
}

async fn handle(
    State(state): State<Arc<MockState>>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let path = uri.path().to_string();
    let (status, reply) = (state.responder)(&path, &body);
    state.requests.lock().unwrap().push(RecordedRequest { path, headers, body });
    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(reply),
    )
}

/// OpenAI-style completion body with plain text.
pub fn text_completion(content: &str) -> Value {
    serde_json::json!({
        "choices": [{
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 120, "completion_tokens": 30, "total_tokens": 150}
    })
}

/// OpenAI-style error body.
pub fn error_body(message: &str) -> Value {
    serde_json::json!({"error": {"message": message, "type": "invalid_request_error"}})
}
