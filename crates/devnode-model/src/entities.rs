//! Entities stored by the dispatcher model.

use alloy::primitives::{Address, Bytes};

/// Completion status of an input.
///
/// Every input starts as `Unprocessed` and moves exactly once to one of the
/// terminal values; there is no transition out of a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    /// Not yet delivered to the back-end, or still being processed.
    Unprocessed,
    /// The back-end finished the input with an accept.
    Accepted,
    /// The back-end finished the input with a reject.
    Rejected,
    /// The back-end reported an exception while the input was active.
    Exception,
}

impl CompletionStatus {
    /// Whether the status is one of the terminal values.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Unprocessed)
    }
}

/// Output describing a base-layer transaction the application wants to
/// authorize. Only visible if the producing advance ended `Accepted`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voucher {
    /// Index within the owning input.
    pub index: usize,
    /// Index of the owning advance input.
    pub input_index: usize,
    /// Target contract of the transaction.
    pub destination: Address,
    pub payload: Bytes,
}

/// Output asserting a verifiable fact. Same visibility rule as vouchers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub index: usize,
    pub input_index: usize,
    pub payload: Bytes,
}

/// Application diagnostic, retained whatever the terminal status of the
/// owning input. Reports exist on both advances and inspects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub index: usize,
    pub input_index: usize,
    pub payload: Bytes,
}

/// A request that mutates application state, sourced from an on-chain
/// `InputAdded` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvanceInput {
    pub index: usize,
    pub status: CompletionStatus,
    pub msg_sender: Address,
    pub payload: Bytes,
    pub block_number: u64,
    /// Seconds since the Unix epoch, from the enclosing block header.
    pub timestamp: u64,
    pub vouchers: Vec<Voucher>,
    pub notices: Vec<Notice>,
    pub reports: Vec<Report>,
    pub exception: Bytes,
}

/// A read-only query against current application state, submitted off-chain
/// via HTTP. Indexed independently of advances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectInput {
    pub index: usize,
    pub status: CompletionStatus,
    pub payload: Bytes,
    /// Snapshot taken when the inspect completed: length of the prefix of
    /// advances that already had a terminal status.
    pub processed_input_count: usize,
    pub reports: Vec<Report>,
    pub exception: Bytes,
}

/// Input handed to the back-end by a finish cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollupInput {
    Advance(AdvanceInput),
    Inspect(InspectInput),
}

/// Filter for advance input queries.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputFilter {
    pub index_greater_than: Option<usize>,
    pub index_lower_than: Option<usize>,
}

impl InputFilter {
    pub fn matches(&self, index: usize) -> bool {
        if let Some(greater) = self.index_greater_than {
            if index <= greater {
                return false;
            }
        }
        if let Some(lower) = self.index_lower_than {
            if index >= lower {
                return false;
            }
        }
        true
    }
}

/// Filter for output queries (vouchers, notices, and reports).
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputFilter {
    pub input_index: Option<usize>,
}

impl OutputFilter {
    pub fn matches(&self, input_index: usize) -> bool {
        match self.input_index {
            Some(wanted) => input_index == wanted,
            None => true,
        }
    }
}
