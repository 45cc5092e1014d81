//! Local upstream stub for tests

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct StubResponse {
    status: StatusCode,
    body: Value,
    delay: Duration,
}

impl StubResponse {
    pub fn ok(body: Value) -> Self {
        Self::status(StatusCode::OK, body)
    }

    pub fn status(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            body,
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub uri: String,
    pub authorization: Option<String>,
    pub accept_language: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Clone)]
struct StubState {
    response: StubResponse,
    hits: Arc<AtomicUsize>,
    last_request: Arc<Mutex<Option<RecordedRequest>>>,
}

pub struct StubServer {
    pub url: String,
    hits: Arc<AtomicUsize>,
    last_request: Arc<Mutex<Option<RecordedRequest>>>,
}

impl StubServer {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

/// Serve `response` for every path on an ephemeral local port
pub async fn spawn_stub(response: StubResponse) -> StubServer {
    let state = StubState {
        response,
        hits: Arc::new(AtomicUsize::new(0)),
        last_request: Arc::new(Mutex::new(None)),
    };
    let hits = Arc::clone(&state.hits);
    let last_request = Arc::clone(&state.last_request);

    let app = Router::new().fallback(respond).with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    StubServer {
        url: format!("http://{}", addr),
        hits,
        last_request,
    }
}

async fn respond(State(state): State<StubState>, uri: Uri, headers: HeaderMap) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    *state.last_request.lock().unwrap() = Some(RecordedRequest {
        uri: uri.to_string(),
        authorization: header_value(header::AUTHORIZATION),
        accept_language: header_value(header::ACCEPT_LANGUAGE),
        content_type: header_value(header::CONTENT_TYPE),
    });

    if !state.response.delay.is_zero() {
        tokio::time::sleep(state.response.delay).await;
    }

    (state.response.status, Json(state.response.body.clone())).into_response()
}
