//! The inspect HTTP API for the application front-end.
//!
//! An inspect request is submitted to the dispatcher and the handler blocks
//! (sampling, not holding the lock) until the back-end completes it, then
//! replies with the accumulated reports.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tracing::info;

use devnode_model::{CompletionStatus, Dispatcher, InspectInput};

use crate::hex;

/// 2^20 bytes, the size of the machine's receive buffer in production.
pub const PAYLOAD_SIZE_LIMIT: usize = 1 << 20;
/// Pause between two completion samples.
pub const INSPECT_POLL_INTERVAL: Duration = Duration::from_millis(50);
/// How many samples before the request gives up with 408.
pub const INSPECT_RETRIES: usize = 600;

/// Router serving the inspect API at `/inspect`.
pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    info!("serving inspect API");
    Router::new()
        .route(
            "/inspect",
            post(inspect_post).get(|| async { StatusCode::NOT_FOUND }),
        )
        .route("/inspect/{*payload}", get(inspect_get))
        .with_state(dispatcher)
}

#[derive(Debug, Serialize)]
struct InspectResult {
    status: &'static str,
    reports: Vec<ReportResult>,
    exception_payload: String,
    processed_input_count: u64,
}

#[derive(Debug, Serialize)]
struct ReportResult {
    payload: String,
}

impl From<InspectInput> for InspectResult {
    fn from(input: InspectInput) -> Self {
        let status = match input.status {
            CompletionStatus::Accepted => "Accepted",
            CompletionStatus::Rejected => "Rejected",
            CompletionStatus::Exception => "Exception",
            // The poll loop only converts terminal inputs.
            CompletionStatus::Unprocessed => unreachable!("unprocessed input from poll"),
        };
        Self {
            status,
            reports: input
                .reports
                .iter()
                .map(|report| ReportResult {
                    payload: hex::encode(&report.payload),
                })
                .collect(),
            exception_payload: hex::encode(&input.exception),
            processed_input_count: input.processed_input_count as u64,
        }
    }
}

/// `POST /inspect` with the raw payload as the request body.
async fn inspect_post(State(dispatcher): State<Arc<Dispatcher>>, body: Body) -> Response {
    let payload = match axum::body::to_bytes(body, PAYLOAD_SIZE_LIMIT).await {
        Ok(payload) => payload,
        Err(_) => return (StatusCode::BAD_REQUEST, "Payload reached size limit").into_response(),
    };
    inspect(&dispatcher, payload.to_vec()).await
}

/// `GET /inspect/<payload>` with a URL-escaped payload in the path. The
/// path extractor hands over the decoded byte string.
async fn inspect_get(
    State(dispatcher): State<Arc<Dispatcher>>,
    Path(payload): Path<String>,
) -> Response {
    inspect(&dispatcher, payload.into_bytes()).await
}

/// Submit the payload and wait for the back-end to complete it.
async fn inspect(dispatcher: &Dispatcher, payload: Vec<u8>) -> Response {
    let index = dispatcher.add_inspect_input(payload.into());

    for _ in 0..INSPECT_RETRIES {
        match dispatcher.get_inspect_input(index) {
            Some(input) if input.status.is_terminal() => {
                return (StatusCode::OK, Json(InspectResult::from(input))).into_response();
            }
            Some(_) => {}
            None => {
                return (StatusCode::INTERNAL_SERVER_ERROR, "inspect input vanished")
                    .into_response();
            }
        }
        tokio::time::sleep(INSPECT_POLL_INTERVAL).await;
    }
    (StatusCode::REQUEST_TIMEOUT, "inspect request timed out").into_response()
}
