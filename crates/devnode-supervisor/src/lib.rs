//! # Worker Supervision
//!
//! A small supervisor for the devnode service topology. Workers are started
//! in order, each one gated on a readiness signal, and all of them share a
//! single cancellation group: an outer cancel, a worker failure, and an
//! explicit shutdown all collapse to the same signal.
//!
//! The crate also ships the worker flavors the node is built from:
//!
//! - [`CommandWorker`] runs a subprocess, forwarding its output to the log
//!   and tearing it down with the platform's termination signal.
//! - [`ServerWorker`] wraps a command whose readiness is observed from the
//!   outside by probing a TCP port.
//! - [`HttpWorker`] serves an axum router with graceful shutdown.
//! - [`SupervisorWorker`] composes workers and is itself a worker, so
//!   topologies nest.

#![warn(clippy::all)]
#![deny(unsafe_code)]

mod cancel;
mod command;
mod http;
mod supervisor;
mod worker;

pub use cancel::{CancelGroup, CancelToken};
pub use command::{CommandWorker, ServerWorker};
pub use http::HttpWorker;
pub use supervisor::{SupervisorWorker, DEFAULT_SUPERVISOR_TIMEOUT};
pub use worker::{Worker, WorkerError};
