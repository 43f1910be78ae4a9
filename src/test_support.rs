//! Scripted fake printer used by the HTTP-facing tests.

use crate::analytics::ANALYTIC_METRICS;
use crate::config::AthenaConfig;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Clone)]
pub(crate) enum StatusReply {
    Json(Value),
    Raw(u16, String),
    Delayed(Duration, Value),
}

#[derive(Clone)]
pub(crate) enum AnalyticReply {
    Body(String),
    Status(u16),
    Delayed(Duration),
}

#[derive(Default)]
struct FakeState {
    status: Mutex<Option<StatusReply>>,
    analytics: Mutex<HashMap<u8, AnalyticReply>>,
    stream_chunks: Mutex<Vec<Vec<u8>>>,
    stream_delay: Mutex<Option<Duration>>,
    command_status: Mutex<u16>,
    commands: Mutex<Vec<String>>,
    status_hits: AtomicUsize,
    analytic_hits: AtomicUsize,
    stream_hits: AtomicUsize,
}

pub(crate) struct FakePrinter {
    addr: SocketAddr,
    state: Arc<FakeState>,
    handle: JoinHandle<()>,
}

impl FakePrinter {
    pub(crate) async fn start() -> Self {
        let state = Arc::new(FakeState::default());
        *state.status.lock() = Some(StatusReply::Json(default_status()));
        *state.command_status.lock() = 200;

        let app = Router::new()
            .route("/status", get(status_handler))
            .route("/analytic/value/:id", get(analytic_handler))
            .route("/athena-camera/stream", get(stream_handler))
            .route("/printer/*path", get(command_handler))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Configuration pointing at this printer with test-sized timeouts
    pub(crate) fn config(&self) -> AthenaConfig {
        let mut config = AthenaConfig::for_host(self.addr.ip().to_string(), self.addr.port());
        config.printer.command_timeout_ms = 1_000;
        config.polling.status_timeout_ms = 1_000;
        config.polling.analytic_timeout_ms = 300;
        config.polling.analytic_concurrency = 8;
        config.camera.stream_timeout_ms = 1_000;
        config
    }

    pub(crate) async fn shutdown(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }

    pub(crate) fn set_status(&self, reply: StatusReply) {
        *self.state.status.lock() = Some(reply);
    }

    pub(crate) fn set_analytic(&self, metric_id: u8, reply: AnalyticReply) {
        self.state.analytics.lock().insert(metric_id, reply);
    }

    pub(crate) fn set_stream(&self, chunks: Vec<Vec<u8>>) {
        *self.state.stream_chunks.lock() = chunks;
    }

    /// Hold every stream response back by `delay`
    pub(crate) fn set_stream_delay(&self, delay: Duration) {
        *self.state.stream_delay.lock() = Some(delay);
    }

    pub(crate) fn set_command_status(&self, status: u16) {
        *self.state.command_status.lock() = status;
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        self.state.commands.lock().clone()
    }

    pub(crate) fn status_hits(&self) -> usize {
        self.state.status_hits.load(Ordering::SeqCst)
    }

    pub(crate) fn analytic_hits(&self) -> usize {
        self.state.analytic_hits.load(Ordering::SeqCst)
    }

    pub(crate) fn stream_hits(&self) -> usize {
        self.state.stream_hits.load(Ordering::SeqCst)
    }
}

pub(crate) fn default_status() -> Value {
    json!({
        "Status": "Idle",
        "Printing": false,
        "Paused": false,
        "LayerID": 0,
        "LayersCount": 0,
        "CurrentHeight": 42550,
        "disk": "49%",
        "mem": "23%",
        "proc": "7%",
        "temp": "41.35°C",
        "Hostname": "athena",
        "Version": "2.1.0",
    })
}

/// Value the fake printer reports for an analytic metric by default
pub(crate) fn default_analytic_value(metric_id: u8) -> f64 {
    metric_id as f64 + 0.5
}

/// A real, decodable JPEG of the given size
pub(crate) fn tiny_jpeg(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 40) as u8, (y * 40) as u8, 128])
    });
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, 90)
        .encode(image.as_raw(), width, height, image::ColorType::Rgb8)
        .unwrap();
    buf
}

/// One multipart MJPEG part wrapping `jpeg`
pub(crate) fn mjpeg_part(jpeg: &[u8]) -> Vec<u8> {
    let mut part = format!(
        "--frame\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        jpeg.len()
    )
    .into_bytes();
    part.extend_from_slice(jpeg);
    part.extend_from_slice(b"\r\n");
    part
}

async fn status_handler(State(state): State<Arc<FakeState>>) -> Response {
    state.status_hits.fetch_add(1, Ordering::SeqCst);
    let reply = state.status.lock().clone();

    match reply {
        Some(StatusReply::Json(value)) => axum::Json(value).into_response(),
        Some(StatusReply::Raw(status, body)) => (code(status), body).into_response(),
        Some(StatusReply::Delayed(delay, value)) => {
            tokio::time::sleep(delay).await;
            axum::Json(value).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn analytic_handler(
    State(state): State<Arc<FakeState>>,
    Path(metric_id): Path<u8>,
) -> Response {
    state.analytic_hits.fetch_add(1, Ordering::SeqCst);
    if !ANALYTIC_METRICS.iter().any(|(id, _)| *id == metric_id) {
        return StatusCode::NOT_FOUND.into_response();
    }

    let reply = state.analytics.lock().get(&metric_id).cloned();
    match reply {
        Some(AnalyticReply::Body(body)) => body.into_response(),
        Some(AnalyticReply::Status(status)) => code(status).into_response(),
        Some(AnalyticReply::Delayed(delay)) => {
            tokio::time::sleep(delay).await;
            default_analytic_value(metric_id).to_string().into_response()
        }
        None => default_analytic_value(metric_id).to_string().into_response(),
    }
}

async fn stream_handler(State(state): State<Arc<FakeState>>) -> Response {
    state.stream_hits.fetch_add(1, Ordering::SeqCst);
    let delay = *state.stream_delay.lock();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    let chunks: Vec<Result<Bytes, Infallible>> = state
        .stream_chunks
        .lock()
        .iter()
        .map(|chunk| Ok(Bytes::from(chunk.clone())))
        .collect();

    Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            "multipart/x-mixed-replace; boundary=frame",
        )
        .body(Body::from_stream(futures::stream::iter(chunks)))
        .unwrap()
}

async fn command_handler(State(state): State<Arc<FakeState>>, Path(path): Path<String>) -> Response {
    state.commands.lock().push(format!("/printer/{}", path));
    let status = *state.command_status.lock();
    code(status).into_response()
}

fn code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
