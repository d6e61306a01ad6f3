//! # devnode
//!
//! A development node for rollups-style optimistic execution applications.
//! The application back-end runs on the host machine and drives the node
//! through the rollup HTTP API; inputs come from an embedded development
//! chain (or an external RPC endpoint), and the results are served back to
//! the front-end over the GraphQL and inspect APIs.
//!
//! This crate wires the pieces together; the run function lives here, apart
//! from the binary, so integration tests can assemble the same node.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod node;
