//! # Dispatcher Model
//!
//! In-memory model of the rollup inputs and outputs, shared by every devnode
//! service. The model orders advance and inspect inputs, matches the
//! back-end's finish cycle to the next pending input, and accumulates the
//! outputs (vouchers, notices, reports, exceptions) produced while an input
//! is active.
//!
//! ## Architecture
//!
//! ```text
//!  Input Watcher ──add_advance_input──▶ ┌──────────────────┐
//!  Inspect API ───add_inspect_input──▶  │    Dispatcher    │
//!                                       │  advances[]      │
//!  Rollup API ──finish_and_get_next──▶  │  inspects[]      │
//!             ──add_voucher/notice/──▶  │  state: Idle |   │
//!               report/exception        │   Advance |      │
//!                                       │   Inspect        │
//!  Reader ─────get_* / count_*───────▶  └──────────────────┘
//! ```
//!
//! All access goes through a single coarse mutex; every operation is a short
//! in-memory critical section, so callers that need to wait (long polls)
//! sample and sleep outside the lock.

#![warn(clippy::all)]
#![deny(unsafe_code)]

mod dispatcher;
mod entities;
mod state;

pub use dispatcher::{Dispatcher, StateError};
pub use entities::{
    AdvanceInput, CompletionStatus, InputFilter, InspectInput, Notice, OutputFilter, Report,
    RollupInput, Voucher,
};
