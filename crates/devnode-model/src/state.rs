//! Dispatcher state as a tagged variant.

use alloy::primitives::{Address, Bytes};

use crate::entities::{Notice, Report, Voucher};

/// State of the dispatcher with respect to the back-end's finish cycle.
///
/// While an input is active its outputs accumulate here, pending, and are
/// only attached to the input record when the cycle terminates. Rejected
/// advances drop their pending vouchers and notices at that point.
#[derive(Debug)]
pub(crate) enum RollupState {
    /// Waiting for a finish request with no active input.
    Idle,
    /// Accumulating the outputs of the advance at `input_index`.
    Advance {
        input_index: usize,
        vouchers: Vec<Voucher>,
        notices: Vec<Notice>,
        reports: Vec<Report>,
    },
    /// Accumulating the reports of the inspect at `input_index`.
    Inspect {
        input_index: usize,
        reports: Vec<Report>,
    },
}

impl Default for RollupState {
    fn default() -> Self {
        Self::Idle
    }
}

impl RollupState {
    pub(crate) fn advance(input_index: usize) -> Self {
        Self::Advance {
            input_index,
            vouchers: Vec::new(),
            notices: Vec::new(),
            reports: Vec::new(),
        }
    }

    pub(crate) fn inspect(input_index: usize) -> Self {
        Self::Inspect {
            input_index,
            reports: Vec::new(),
        }
    }

    /// Append a voucher to the pending outputs, returning its index within
    /// the input. Only valid in the advance state.
    pub(crate) fn push_voucher(&mut self, destination: Address, payload: Bytes) -> Option<usize> {
        match self {
            Self::Advance {
                input_index,
                vouchers,
                ..
            } => {
                let index = vouchers.len();
                vouchers.push(Voucher {
                    index,
                    input_index: *input_index,
                    destination,
                    payload,
                });
                Some(index)
            }
            _ => None,
        }
    }

    /// Append a notice to the pending outputs, returning its index within
    /// the input. Only valid in the advance state.
    pub(crate) fn push_notice(&mut self, payload: Bytes) -> Option<usize> {
        match self {
            Self::Advance {
                input_index,
                notices,
                ..
            } => {
                let index = notices.len();
                notices.push(Notice {
                    index,
                    input_index: *input_index,
                    payload,
                });
                Some(index)
            }
            _ => None,
        }
    }

    /// Append a report to the pending outputs. Valid in the advance and
    /// inspect states.
    pub(crate) fn push_report(&mut self, payload: Bytes) -> Option<usize> {
        let (input_index, reports) = match self {
            Self::Idle => return None,
            Self::Advance {
                input_index,
                reports,
                ..
            } => (*input_index, reports),
            Self::Inspect {
                input_index,
                reports,
            } => (*input_index, reports),
        };
        let index = reports.len();
        reports.push(Report {
            index,
            input_index,
            payload,
        });
        Some(index)
    }
}
