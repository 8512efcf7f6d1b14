//! In-process stand-in for the backend, used by tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};

use axum::Json;
use axum::Router;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::{Value, json};

use super::Gateway;
use crate::backend::BackendLocator;
use crate::host::{HostMode, MockHostBridge};

#[derive(Default)]
struct FakeState {
    stats_status: AtomicU16,
    uploaded: Mutex<Vec<(String, usize)>>,
}

pub(crate) struct FakeBackend {
    port: u16,
    state: Arc<FakeState>,
}

impl FakeBackend {
    pub async fn spawn() -> Self {
        let state = Arc::new(FakeState {
            stats_status: AtomicU16::new(200),
            ..Default::default()
        });

        let app = Router::new()
            .route("/api/search", get(search))
            .route("/api/stats", get(stats))
            .route("/api/upload", post(upload))
            .route("/api/open_file", post(open_file))
            .layer(DefaultBodyLimit::disable())
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { port, state }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Standalone gateway pointed at this backend.
    pub fn gateway(&self) -> Gateway {
        let mut host = MockHostBridge::new();
        host.expect_invoke().never();
        let locator =
            BackendLocator::new(HostMode::Standalone, Arc::new(host)).with_default_port(self.port);
        Gateway::new(Arc::new(locator))
    }

    pub fn set_stats_status(&self, status: u16) {
        self.state.stats_status.store(status, Ordering::SeqCst);
    }

    pub fn uploaded(&self) -> Vec<(String, usize)> {
        self.state.uploaded.lock().unwrap().clone()
    }
}

async fn search(Query(params): Query<HashMap<String, String>>) -> Response {
    let query = params.get("query").cloned().unwrap_or_default();
    if query == "explode" {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let top_k: usize = params
        .get("top_k")
        .and_then(|k| k.parse().ok())
        .unwrap_or(10);

    let hits: Vec<Value> = (0..top_k)
        .map(|i| {
            json!({
                "id": i,
                "file_name": format!("doc-{i}.pdf"),
                "chunk_text": query,
                "rrf_score": 1.0 / (i as f64 + 1.0),
            })
        })
        .collect();
    Json(hits).into_response()
}

async fn stats(State(state): State<Arc<FakeState>>) -> Response {
    let status = state.stats_status.load(Ordering::SeqCst);
    if status != 200 {
        let code = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return code.into_response();
    }
    Json(json!({"total_documents": 12})).into_response()
}

async fn upload(State(state): State<Arc<FakeState>>, mut multipart: Multipart) -> Response {
    let mut count = 0;
    while let Some(field) = multipart.next_field().await.unwrap() {
        if field.name() != Some("files") {
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await.unwrap();
        state.uploaded.lock().unwrap().push((name, data.len()));
        count += 1;
    }
    Json(json!({"message": format!("Uploaded {count} files")})).into_response()
}

async fn open_file(Json(body): Json<Value>) -> Response {
    match body.get("filename").and_then(Value::as_str) {
        Some("report.pdf") => b"%PDF-1.4 fake".to_vec().into_response(),
        Some("broken.pdf") => (StatusCode::INTERNAL_SERVER_ERROR, "oops").into_response(),
        _ => (StatusCode::NOT_FOUND, Json(json!({"detail": "not found"}))).into_response(),
    }
}
