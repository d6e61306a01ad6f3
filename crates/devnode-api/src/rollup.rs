//! The rollup HTTP API polled by the application back-end.
//!
//! One finish cycle: the back-end calls `POST /finish` to commit the result
//! of the current input and long-poll for the next one, emitting outputs
//! through `/voucher`, `/notice`, `/report`, and `/exception` in between.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes as BodyBytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use devnode_model::{Dispatcher, RollupInput};

use crate::hex;

/// How many times `/finish` samples the dispatcher before giving up.
pub const FINISH_RETRIES: usize = 50;
/// Pause between two `/finish` samples.
pub const FINISH_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Router serving the rollup API. The caller decides the mount point.
pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    info!("serving rollup API");
    Router::new()
        .route("/finish", post(finish))
        .route("/voucher", post(add_voucher))
        .route("/notice", post(add_notice))
        .route("/report", post(add_report))
        .route("/exception", post(register_exception))
        .with_state(dispatcher)
}

#[derive(Debug, Deserialize)]
struct FinishRequest {
    status: String,
}

#[derive(Debug, Deserialize)]
struct VoucherRequest {
    destination: String,
    payload: String,
}

#[derive(Debug, Deserialize)]
struct PayloadRequest {
    payload: String,
}

#[derive(Debug, Serialize)]
struct IndexResponse {
    index: u64,
}

/// Input handed back to the back-end from `/finish`.
#[derive(Debug, Serialize)]
#[serde(tag = "request_type", content = "data", rename_all = "snake_case")]
enum RollupRequest {
    AdvanceState {
        metadata: AdvanceMetadata,
        payload: String,
    },
    InspectState {
        payload: String,
    },
}

#[derive(Debug, Serialize)]
struct AdvanceMetadata {
    msg_sender: String,
    block_number: u64,
    input_index: u64,
    timestamp: u64,
}

impl From<RollupInput> for RollupRequest {
    fn from(input: RollupInput) -> Self {
        match input {
            RollupInput::Advance(advance) => Self::AdvanceState {
                metadata: AdvanceMetadata {
                    msg_sender: hex::encode(advance.msg_sender.as_slice()),
                    block_number: advance.block_number,
                    input_index: advance.index as u64,
                    timestamp: advance.timestamp,
                },
                payload: hex::encode(&advance.payload),
            },
            RollupInput::Inspect(inspect) => Self::InspectState {
                payload: hex::encode(&inspect.payload),
            },
        }
    }
}

/// The rollup API requires the content type to be exactly
/// `application/json`.
fn check_content_type(headers: &HeaderMap) -> Result<(), Response> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .map(|value| value.as_bytes() == b"application/json")
        .unwrap_or(false);
    if is_json {
        Ok(())
    } else {
        Err((StatusCode::UNSUPPORTED_MEDIA_TYPE, "invalid content type").into_response())
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, Response> {
    serde_json::from_slice(body)
        .map_err(|_| (StatusCode::BAD_REQUEST, "invalid request body").into_response())
}

async fn finish(
    State(dispatcher): State<Arc<Dispatcher>>,
    headers: HeaderMap,
    body: BodyBytes,
) -> Response {
    if let Err(response) = check_content_type(&headers) {
        return response;
    }
    let request: FinishRequest = match parse_body(&body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let accepted = match request.status.as_str() {
        "accept" => true,
        "reject" => false,
        _ => return (StatusCode::BAD_REQUEST, "invalid value for status").into_response(),
    };

    // Long poll: sample the dispatcher, sleeping between samples so the
    // lock is never held while waiting. A dropped connection drops this
    // future at an await point, abandoning the poll.
    for _ in 0..FINISH_RETRIES {
        if let Some(input) = dispatcher.finish_and_get_next(accepted) {
            return (StatusCode::OK, Json(RollupRequest::from(input))).into_response();
        }
        tokio::time::sleep(FINISH_POLL_INTERVAL).await;
    }
    (StatusCode::ACCEPTED, "no rollup request available").into_response()
}

async fn add_voucher(
    State(dispatcher): State<Arc<Dispatcher>>,
    headers: HeaderMap,
    body: BodyBytes,
) -> Response {
    if let Err(response) = check_content_type(&headers) {
        return response;
    }
    let request: VoucherRequest = match parse_body(&body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let destination = match hex::decode_address(&request.destination) {
        Ok(destination) => destination,
        Err(message) => return (StatusCode::BAD_REQUEST, message).into_response(),
    };
    let payload = match hex::decode_payload(&request.payload) {
        Ok(payload) => payload,
        Err(message) => return (StatusCode::BAD_REQUEST, message).into_response(),
    };

    match dispatcher.add_voucher(destination, payload) {
        Ok(index) => (
            StatusCode::OK,
            Json(IndexResponse {
                index: index as u64,
            }),
        )
            .into_response(),
        Err(err) => (StatusCode::FORBIDDEN, err.to_string()).into_response(),
    }
}

async fn add_notice(
    State(dispatcher): State<Arc<Dispatcher>>,
    headers: HeaderMap,
    body: BodyBytes,
) -> Response {
    if let Err(response) = check_content_type(&headers) {
        return response;
    }
    let request: PayloadRequest = match parse_body(&body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let payload = match hex::decode_payload(&request.payload) {
        Ok(payload) => payload,
        Err(message) => return (StatusCode::BAD_REQUEST, message).into_response(),
    };

    match dispatcher.add_notice(payload) {
        Ok(index) => (
            StatusCode::OK,
            Json(IndexResponse {
                index: index as u64,
            }),
        )
            .into_response(),
        Err(err) => (StatusCode::FORBIDDEN, err.to_string()).into_response(),
    }
}

async fn add_report(
    State(dispatcher): State<Arc<Dispatcher>>,
    headers: HeaderMap,
    body: BodyBytes,
) -> Response {
    if let Err(response) = check_content_type(&headers) {
        return response;
    }
    let request: PayloadRequest = match parse_body(&body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let payload = match hex::decode_payload(&request.payload) {
        Ok(payload) => payload,
        Err(message) => return (StatusCode::BAD_REQUEST, message).into_response(),
    };

    match dispatcher.add_report(payload) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => (StatusCode::FORBIDDEN, err.to_string()).into_response(),
    }
}

async fn register_exception(
    State(dispatcher): State<Arc<Dispatcher>>,
    headers: HeaderMap,
    body: BodyBytes,
) -> Response {
    if let Err(response) = check_content_type(&headers) {
        return response;
    }
    let request: PayloadRequest = match parse_body(&body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let payload = match hex::decode_payload(&request.payload) {
        Ok(payload) => payload,
        Err(message) => return (StatusCode::BAD_REQUEST, message).into_response(),
    };

    match dispatcher.register_exception(payload) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => (StatusCode::FORBIDDEN, err.to_string()).into_response(),
    }
}
