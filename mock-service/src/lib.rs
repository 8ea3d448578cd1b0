//! Stand-in for the sciencebuddy service.
//!
//! `/chat` and `/summary` behave like the real endpoints as far as a load test can tell: chat
//! validates its JSON body and opens a session cookie, summary refuses to summarize a session
//! that never chatted. Status codes can be overridden at runtime, and every request is recorded
//! for assertions.
use axum::{
    debug_handler,
    extract::{RawQuery, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
#[allow(unused)]
use metrics::{counter, gauge, histogram};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::{
    num::NonZeroU32,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError, RwLock,
    },
    time::{Duration, Instant},
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

const SESSION_COOKIE: &str = "session";

#[derive(Debug, Clone)]
pub struct MockConfig {
    pub chat_status: u16,
    /// `None` answers like the real service: 400 without a session, 200 with one.
    pub summary_status: Option<u16>,
    pub delay: Duration,
    /// Chat requests above this rate are answered with 500.
    pub chat_max_tps: Option<NonZeroU32>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            chat_status: 200,
            summary_status: None,
            delay: Duration::ZERO,
            chat_max_tps: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub content_type: Option<String>,
    pub body: String,
    pub query: Option<String>,
    pub cookie: Option<String>,
    pub received: Instant,
}

impl RecordedRequest {
    pub fn session(&self) -> Option<&str> {
        self.cookie.as_deref()?.split(';').find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == SESSION_COOKIE).then_some(value)
        })
    }
}

pub struct MockState {
    config: RwLock<MockConfig>,
    chat_limiter: Option<DefaultDirectRateLimiter>,
    sessions: AtomicU64,
    jobs: AtomicU64,
    chat: Mutex<Vec<RecordedRequest>>,
    summary: Mutex<Vec<RecordedRequest>>,
}

impl MockState {
    pub fn new(config: MockConfig) -> Self {
        Self {
            chat_limiter: config.chat_max_tps.map(rate_limiter),
            config: RwLock::new(config),
            sessions: AtomicU64::new(0),
            jobs: AtomicU64::new(0),
            chat: Mutex::new(vec![]),
            summary: Mutex::new(vec![]),
        }
    }

    fn config(&self) -> MockConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_chat_status(&self, status: u16) {
        self.config
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .chat_status = status;
    }

    pub fn set_summary_status(&self, status: Option<u16>) {
        self.config
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .summary_status = status;
    }

    pub fn chat_requests(&self) -> Vec<RecordedRequest> {
        self.chat
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn summary_requests(&self) -> Vec<RecordedRequest> {
        self.summary
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, log: &Mutex<Vec<RecordedRequest>>, request: RecordedRequest) {
        log.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
    }
}

pub fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/summary", post(summary))
        .route("/api/test", get(api_test))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve forever on `addr`.
pub async fn run(addr: SocketAddr, config: MockConfig) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    let app = router(Arc::new(MockState::new(config)));
    axum::serve(listener, app).await?;
    Ok(())
}

/// A mock bound to an ephemeral localhost port, shut down on drop.
pub struct MockService {
    addr: SocketAddr,
    state: Arc<MockState>,
    task: JoinHandle<()>,
}

pub async fn spawn(config: MockConfig) -> anyhow::Result<MockService> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = Arc::new(MockState::new(config));
    let app = router(state.clone());

    let task = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            error!("Mock service stopped: {err}");
        }
    });

    Ok(MockService { addr, state, task })
}

impl MockService {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn state(&self) -> &MockState {
        &self.state
    }

    pub fn chat_requests(&self) -> Vec<RecordedRequest> {
        self.state.chat_requests()
    }

    pub fn summary_requests(&self) -> Vec<RecordedRequest> {
        self.state.summary_requests()
    }
}

impl Drop for MockService {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[debug_handler]
async fn chat(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: String,
) -> Response {
    TPS_MEASURE.fetch_add(1, Ordering::Relaxed);
    counter!("mock-service.chat").increment(1);

    let request = recorded(&headers, query, body);
    state.record(&state.chat, request.clone());

    let config = state.config();
    tokio::time::sleep(config.delay).await;

    let is_json = request
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.contains("application/json"));
    if !is_json {
        return error_response(StatusCode::BAD_REQUEST, "Content-Type must be application/json");
    }

    let message = serde_json::from_str::<Value>(&request.body)
        .ok()
        .and_then(|body| body.get("message")?.as_str().map(str::to_owned))
        .filter(|message| !message.is_empty());
    let Some(message) = message else {
        return error_response(StatusCode::BAD_REQUEST, "message is required");
    };

    if let Some(limiter) = &state.chat_limiter {
        if limiter.check().is_err() {
            debug!("MOCK SERVER ___ CHAT OVER LIMIT");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "AI backend overloaded");
        }
    }

    let status = status_code(config.chat_status);

    // Only a successful chat opens a conversation.
    let mut response_headers = HeaderMap::new();
    if status.is_success() && request.session().is_none() {
        let id = state.sessions.fetch_add(1, Ordering::Relaxed) + 1;
        if let Ok(cookie) = HeaderValue::from_str(&format!("{SESSION_COOKIE}={id}; Path=/")) {
            response_headers.insert(header::SET_COOKIE, cookie);
        }
    }

    (
        status,
        response_headers,
        Json(json!({ "response": format!("「{message}」と予想したんだね。") })),
    )
        .into_response()
}

#[debug_handler]
async fn summary(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: String,
) -> Response {
    TPS_MEASURE.fetch_add(1, Ordering::Relaxed);
    counter!("mock-service.summary").increment(1);

    let request = recorded(&headers, query, body);
    state.record(&state.summary, request.clone());

    let config = state.config();
    tokio::time::sleep(config.delay).await;

    if let Some(status) = config.summary_status {
        let status = status_code(status);
        return (status, Json(json!({ "status": status.as_u16() }))).into_response();
    }

    if request.session().is_none() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "まだ何も話していないようです。",
                "is_insufficient": true,
            })),
        )
            .into_response();
    }

    let job = state.jobs.fetch_add(1, Ordering::Relaxed) + 1;
    Json(json!({ "job_id": format!("job-{job}"), "status": "queued" })).into_response()
}

async fn api_test() -> Json<Value> {
    TPS_MEASURE.fetch_add(1, Ordering::Relaxed);
    Json(json!({ "status": "ok" }))
}

fn recorded(headers: &HeaderMap, query: Option<String>, body: String) -> RecordedRequest {
    let header = |name| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    };
    RecordedRequest {
        content_type: header(header::CONTENT_TYPE),
        body,
        query,
        cookie: header(header::COOKIE),
        received: Instant::now(),
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/** Utils **/

pub fn rate_limiter(tps: NonZeroU32) -> DefaultDirectRateLimiter {
    RateLimiter::direct(Quota::per_second(tps))
}

/** TPS Printer **/

static TPS_MEASURE: AtomicU64 = AtomicU64::new(0);

pub async fn tps_measure_task() {
    loop {
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let transactions = TPS_MEASURE.swap(0, Ordering::Relaxed);
        println!("{transactions} TPS");
        gauge!("mock-server.tps").set(transactions as f64);
    }
}
