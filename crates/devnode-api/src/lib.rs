//! # HTTP APIs for the application
//!
//! Two surfaces over the dispatcher model:
//!
//! - the **rollup API** (`/rollup/*`), polled by the application back-end to
//!   receive inputs and emit outputs, and
//! - the **inspect API** (`/inspect`), called by the application front-end
//!   to run a read-only query and synchronously wait for its result.
//!
//! Both are plain axum routers sharing an [`devnode_model::Dispatcher`];
//! the runtime merges them into the node's HTTP server.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod inspect;
pub mod rollup;

mod hex;
