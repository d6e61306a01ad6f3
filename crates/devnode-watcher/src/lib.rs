//! # Input Watcher and Devnet
//!
//! Bridges the chain to the dispatcher: the [`InputWatcher`] worker reads
//! `InputAdded` events from the InputBox contract (a historical scan
//! followed by a live subscription) and feeds them to the model as advance
//! inputs. The [`DevnetWorker`] runs the embedded development chain the
//! watcher points at by default.

#![warn(clippy::all)]
#![deny(unsafe_code)]

mod contracts;
mod devnet;
mod watcher;

pub use contracts::InputAdded;
pub use devnet::{DevnetWorker, ANVIL_DEFAULT_PORT, APPLICATION_ADDRESS, INPUT_BOX_ADDRESS};
pub use watcher::InputWatcher;
