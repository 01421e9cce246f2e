//! Scripted HTTP backend served over a real socket

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures_util::stream;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Response bodies go out in writes this small so frames straddle reads
const CHUNK_SIZE: usize = 7;

/// One canned response, matched on method and path
#[derive(Debug, Clone)]
pub struct Route {
    method: Method,
    path: String,
    status: StatusCode,
    content_type: &'static str,
    body: String,
    delay: Option<Duration>,
}

impl Route {
    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_owned(),
            status: StatusCode::OK,
            content_type: "application/json",
            body: "{}".to_owned(),
            delay: None,
        }
    }

    /// Whole JSON body
    pub fn json(mut self, body: &Value) -> Self {
        self.content_type = "application/json";
        self.body = body.to_string();
        self
    }

    /// Server-sent events; each frame is sent as given, followed by a blank line
    pub fn sse<'a>(mut self, frames: impl IntoIterator<Item = &'a str>) -> Self {
        self.content_type = "text/event-stream";
        self.body = frames.into_iter().map(|frame| format!("{frame}\n\n")).collect();
        self
    }

    /// Newline-delimited JSON
    pub fn ndjson(mut self, lines: &[Value]) -> Self {
        self.content_type = "application/x-ndjson";
        self.body = lines.iter().map(|line| format!("{line}\n")).collect();
        self
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = StatusCode::from_u16(status).expect("valid status code");
        self
    }

    pub fn text(mut self, body: &str) -> Self {
        self.content_type = "text/plain";
        body.clone_into(&mut self.body);
        self
    }

    /// Hold the response back before sending headers
    pub const fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// `data: <json>` frame
pub fn data(value: &Value) -> String {
    format!("data: {value}")
}

/// Named SSE frame, the way Anthropic sends them
pub fn event(name: &str, value: &Value) -> String {
    format!("event: {name}\ndata: {value}")
}

/// A request the backend received
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Value,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

struct MockState {
    routes: Vec<Route>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Mock LLM backend bound to an ephemeral localhost port
pub struct MockBackend {
    addr: SocketAddr,
    state: Arc<MockState>,
    shutdown: CancellationToken,
}

impl MockBackend {
    /// Start serving `routes`; anything else answers 404
    pub async fn start(routes: Vec<Route>) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            routes,
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new().fallback(respond).with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await
                .ok();
        });

        Ok(Self { addr, state, shutdown })
    }

    /// Absolute URL for `path` on this backend
    pub fn url(&self, path: &str) -> String {
        format!("http://{}/{}", self.addr, path.trim_start_matches('/'))
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().expect("request log poisoned").clone()
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.requests().pop().expect("backend received no request")
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn respond(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.requests.lock().expect("request log poisoned").push(RecordedRequest {
        method: method.clone(),
        path: uri.path().to_owned(),
        headers,
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    let Some(route) = state
        .routes
        .iter()
        .find(|route| route.method == method && route.path == uri.path())
        .cloned()
    else {
        return (StatusCode::NOT_FOUND, "no such route").into_response();
    };

    if let Some(delay) = route.delay {
        tokio::time::sleep(delay).await;
    }

    let chunks: Vec<Result<Bytes, Infallible>> = route
        .body
        .as_bytes()
        .chunks(CHUNK_SIZE)
        .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
        .collect();

    (
        route.status,
        [(header::CONTENT_TYPE, route.content_type)],
        Body::from_stream(stream::iter(chunks)),
    )
        .into_response()
}
