//! # Echo Back-end
//!
//! A minimal application back-end that echoes every input payload back as
//! outputs: an advance produces a voucher (to the input sender), a notice,
//! and a report; an inspect produces a report. Useful when testing a
//! front-end without a working back-end.
//!
//! The echo drives the node through the rollup HTTP API rather than the
//! dispatcher directly, so it exercises the same path as an external
//! application.

#![warn(clippy::all)]
#![deny(unsafe_code)]

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, info};

use devnode_supervisor::{CancelToken, Worker, WorkerError};

#[derive(Debug, Serialize)]
struct FinishRequest {
    status: &'static str,
}

/// Input received from `/finish`. Payloads stay hex-encoded; the echo
/// passes them through untouched.
#[derive(Debug, Deserialize)]
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

#[derive(Debug, Deserialize)]
struct AdvanceMetadata {
    msg_sender: String,
}

#[derive(Debug, Serialize)]
struct VoucherRequest<'a> {
    destination: &'a str,
    payload: &'a str,
}

#[derive(Debug, Serialize)]
struct PayloadRequest<'a> {
    payload: &'a str,
}

/// The echo back-end as a supervised worker.
pub struct EchoWorker {
    /// Base URL of the rollup API, e.g. `http://127.0.0.1:8080/rollup`.
    pub endpoint: String,
}

impl EchoWorker {
    async fn run(&self, client: &reqwest::Client) -> Result<(), WorkerError> {
        loop {
            let response = client
                .post(format!("{}/finish", self.endpoint))
                .json(&FinishRequest { status: "accept" })
                .send()
                .await
                .map_err(|err| WorkerError::Fatal(format!("echo: {err}")))?;

            // No input became available within the long poll; ask again.
            if response.status() == StatusCode::ACCEPTED {
                continue;
            }
            if response.status() != StatusCode::OK {
                return Err(WorkerError::Fatal(format!(
                    "echo: unexpected finish status {}",
                    response.status()
                )));
            }

            let request: RollupRequest = response
                .json()
                .await
                .map_err(|err| WorkerError::Fatal(format!("echo: invalid finish body: {err}")))?;
            match request {
                RollupRequest::AdvanceState { metadata, payload } => {
                    debug!(%payload, "echoing advance");
                    self.post(
                        client,
                        "voucher",
                        &VoucherRequest {
                            destination: &metadata.msg_sender,
                            payload: &payload,
                        },
                    )
                    .await?;
                    self.post(client, "notice", &PayloadRequest { payload: &payload })
                        .await?;
                    self.post(client, "report", &PayloadRequest { payload: &payload })
                        .await?;
                }
                RollupRequest::InspectState { payload } => {
                    debug!(%payload, "echoing inspect");
                    self.post(client, "report", &PayloadRequest { payload: &payload })
                        .await?;
                }
            }
        }
    }

    async fn post<T: Serialize>(
        &self,
        client: &reqwest::Client,
        route: &str,
        body: &T,
    ) -> Result<(), WorkerError> {
        let response = client
            .post(format!("{}/{route}", self.endpoint))
            .json(body)
            .send()
            .await
            .map_err(|err| WorkerError::Fatal(format!("echo: {err}")))?;
        if response.status() != StatusCode::OK {
            return Err(WorkerError::Fatal(format!(
                "echo: failed to add {route}: {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Worker for EchoWorker {
    fn name(&self) -> &str {
        "echo"
    }

    async fn start(
        &self,
        ctx: CancelToken,
        ready: oneshot::Sender<()>,
    ) -> Result<(), WorkerError> {
        let client = reqwest::Client::new();
        let _ = ready.send(());
        info!(endpoint = %self.endpoint, "starting built-in echo application");

        tokio::select! {
            _ = ctx.cancelled() => Err(WorkerError::Cancelled),
            result = self.run(&client) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_body_deserializes_both_variants() {
        let advance: RollupRequest = serde_json::from_str(
            r#"{
                "request_type": "advance_state",
                "data": {
                    "metadata": {
                        "msg_sender": "0x1111111111111111111111111111111111111111",
                        "block_number": 1,
                        "input_index": 0,
                        "timestamp": 1000
                    },
                    "payload": "0xdeadbeef"
                }
            }"#,
        )
        .unwrap();
        let RollupRequest::AdvanceState { metadata, payload } = advance else {
            panic!("expected an advance");
        };
        assert_eq!(payload, "0xdeadbeef");
        assert!(metadata.msg_sender.starts_with("0x11"));

        let inspect: RollupRequest = serde_json::from_str(
            r#"{"request_type": "inspect_state", "data": {"payload": "0x68690a"}}"#,
        )
        .unwrap();
        assert!(matches!(inspect, RollupRequest::InspectState { .. }));
    }
}
