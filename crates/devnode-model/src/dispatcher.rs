//! The dispatcher state machine.

use alloy::primitives::{Address, Bytes};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::info;

use crate::entities::{
    AdvanceInput, CompletionStatus, InputFilter, InspectInput, Notice, OutputFilter, Report,
    RollupInput, Voucher,
};
use crate::state::RollupState;

/// Error returned when an output is submitted in a state that does not
/// accept it. Not fatal; the back-end is expected to restructure its calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("cannot add voucher in current state")]
    Voucher,
    #[error("cannot add notice in current state")]
    Notice,
    #[error("cannot add report in current state")]
    Report,
    #[error("cannot register exception in current state")]
    Exception,
}

#[derive(Debug, Default)]
struct Inner {
    advances: Vec<AdvanceInput>,
    inspects: Vec<InspectInput>,
    state: RollupState,
}

/// Dispatcher model shared among the devnode services.
///
/// Thread-safe under a single mutex; every method is a bounded in-memory
/// critical section. Query results are copies, so callers never observe a
/// record mid-mutation.
#[derive(Debug, Default)]
pub struct Dispatcher {
    inner: Mutex<Inner>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------------------------------------------------------------
    // Input ingestion
    // ---------------------------------------------------------------------

    /// Append an advance input, assigning it the next dense index.
    pub fn add_advance_input(
        &self,
        msg_sender: Address,
        payload: Bytes,
        block_number: u64,
        timestamp: u64,
    ) {
        let mut inner = self.inner.lock();
        let index = inner.advances.len();
        info!(index, sender = %msg_sender, payload = %payload, "added advance input");
        inner.advances.push(AdvanceInput {
            index,
            status: CompletionStatus::Unprocessed,
            msg_sender,
            payload,
            block_number,
            timestamp,
            vouchers: Vec::new(),
            notices: Vec::new(),
            reports: Vec::new(),
            exception: Bytes::new(),
        });
    }

    /// Append an inspect input and return the index to poll on.
    pub fn add_inspect_input(&self, payload: Bytes) -> usize {
        let mut inner = self.inner.lock();
        let index = inner.inspects.len();
        info!(index, payload = %payload, "added inspect input");
        inner.inspects.push(InspectInput {
            index,
            status: CompletionStatus::Unprocessed,
            payload,
            processed_input_count: 0,
            reports: Vec::new(),
            exception: Bytes::new(),
        });
        index
    }

    /// Snapshot of the inspect input at `index`.
    pub fn get_inspect_input(&self, index: usize) -> Option<InspectInput> {
        self.inner.lock().inspects.get(index).cloned()
    }

    // ---------------------------------------------------------------------
    // Finish cycle
    // ---------------------------------------------------------------------

    /// Terminate the active input, if any, and return the next one.
    ///
    /// The active input receives `Accepted` or `Rejected` according to
    /// `accepted`; a rejected advance drops its pending vouchers and
    /// notices, but keeps its reports. Unprocessed inspects take priority
    /// over unprocessed advances; advances still run strictly in index
    /// order. Returns `None`, leaving the dispatcher idle, when there is
    /// nothing left to process.
    pub fn finish_and_get_next(&self, accepted: bool) -> Option<RollupInput> {
        let mut inner = self.inner.lock();

        let status = if accepted {
            CompletionStatus::Accepted
        } else {
            CompletionStatus::Rejected
        };

        match std::mem::replace(&mut inner.state, RollupState::Idle) {
            RollupState::Idle => {}
            RollupState::Advance {
                input_index,
                vouchers,
                notices,
                reports,
            } => {
                let input = &mut inner.advances[input_index];
                input.status = status;
                if accepted {
                    input.vouchers = vouchers;
                    input.notices = notices;
                }
                input.reports = reports;
                info!(index = input_index, ?status, "finished advance input");
            }
            RollupState::Inspect {
                input_index,
                reports,
            } => {
                let processed = processed_input_count(&inner.advances);
                let input = &mut inner.inspects[input_index];
                input.status = status;
                input.processed_input_count = processed;
                input.reports = reports;
                info!(index = input_index, ?status, "finished inspect input");
            }
        }

        if let Some(input) = inner
            .inspects
            .iter()
            .find(|input| input.status == CompletionStatus::Unprocessed)
            .cloned()
        {
            info!(index = input.index, "processing inspect input");
            inner.state = RollupState::inspect(input.index);
            return Some(RollupInput::Inspect(input));
        }

        if let Some(input) = inner
            .advances
            .iter()
            .find(|input| input.status == CompletionStatus::Unprocessed)
            .cloned()
        {
            info!(index = input.index, "processing advance input");
            inner.state = RollupState::advance(input.index);
            return Some(RollupInput::Advance(input));
        }

        inner.state = RollupState::Idle;
        None
    }

    /// Add a voucher to the active advance, returning its index within the
    /// input.
    pub fn add_voucher(&self, destination: Address, payload: Bytes) -> Result<usize, StateError> {
        let mut inner = self.inner.lock();
        let index = inner
            .state
            .push_voucher(destination, payload)
            .ok_or(StateError::Voucher)?;
        info!(index, "added voucher");
        Ok(index)
    }

    /// Add a notice to the active advance, returning its index within the
    /// input.
    pub fn add_notice(&self, payload: Bytes) -> Result<usize, StateError> {
        let mut inner = self.inner.lock();
        let index = inner
            .state
            .push_notice(payload)
            .ok_or(StateError::Notice)?;
        info!(index, "added notice");
        Ok(index)
    }

    /// Add a report to the active advance or inspect.
    pub fn add_report(&self, payload: Bytes) -> Result<(), StateError> {
        let mut inner = self.inner.lock();
        let index = inner
            .state
            .push_report(payload)
            .ok_or(StateError::Report)?;
        info!(index, "added report");
        Ok(())
    }

    /// Terminate the active input with an exception. Pending vouchers and
    /// notices are discarded; pending reports are kept. The dispatcher
    /// returns to idle.
    pub fn register_exception(&self, payload: Bytes) -> Result<(), StateError> {
        let mut inner = self.inner.lock();
        match std::mem::replace(&mut inner.state, RollupState::Idle) {
            RollupState::Idle => Err(StateError::Exception),
            RollupState::Advance {
                input_index,
                reports,
                ..
            } => {
                let input = &mut inner.advances[input_index];
                input.status = CompletionStatus::Exception;
                input.reports = reports;
                input.exception = payload;
                info!(index = input_index, "finished advance input with exception");
                Ok(())
            }
            RollupState::Inspect {
                input_index,
                reports,
            } => {
                let processed = processed_input_count(&inner.advances);
                let input = &mut inner.inspects[input_index];
                input.status = CompletionStatus::Exception;
                input.processed_input_count = processed;
                input.reports = reports;
                input.exception = payload;
                info!(index = input_index, "finished inspect input with exception");
                Ok(())
            }
        }
    }

    // ---------------------------------------------------------------------
    // Query surface for the reader
    // ---------------------------------------------------------------------

    pub fn get_advance_input(&self, index: usize) -> Option<AdvanceInput> {
        self.inner.lock().advances.get(index).cloned()
    }

    pub fn get_voucher(&self, voucher_index: usize, input_index: usize) -> Option<Voucher> {
        let inner = self.inner.lock();
        inner
            .advances
            .get(input_index)
            .and_then(|input| input.vouchers.get(voucher_index))
            .cloned()
    }

    pub fn get_notice(&self, notice_index: usize, input_index: usize) -> Option<Notice> {
        let inner = self.inner.lock();
        inner
            .advances
            .get(input_index)
            .and_then(|input| input.notices.get(notice_index))
            .cloned()
    }

    pub fn get_report(&self, report_index: usize, input_index: usize) -> Option<Report> {
        let inner = self.inner.lock();
        inner
            .advances
            .get(input_index)
            .and_then(|input| input.reports.get(report_index))
            .cloned()
    }

    /// Advance inputs matching `filter`, paginated.
    pub fn get_inputs(
        &self,
        filter: InputFilter,
        offset: usize,
        limit: usize,
    ) -> Vec<AdvanceInput> {
        let inner = self.inner.lock();
        let matches: Vec<_> = inner
            .advances
            .iter()
            .filter(|input| filter.matches(input.index))
            .cloned()
            .collect();
        paginate(&matches, offset, limit)
    }

    pub fn get_vouchers(&self, filter: OutputFilter, offset: usize, limit: usize) -> Vec<Voucher> {
        let inner = self.inner.lock();
        let matches: Vec<_> = inner
            .advances
            .iter()
            .flat_map(|input| input.vouchers.iter())
            .filter(|voucher| filter.matches(voucher.input_index))
            .cloned()
            .collect();
        paginate(&matches, offset, limit)
    }

    pub fn get_notices(&self, filter: OutputFilter, offset: usize, limit: usize) -> Vec<Notice> {
        let inner = self.inner.lock();
        let matches: Vec<_> = inner
            .advances
            .iter()
            .flat_map(|input| input.notices.iter())
            .filter(|notice| filter.matches(notice.input_index))
            .cloned()
            .collect();
        paginate(&matches, offset, limit)
    }

    pub fn get_reports(&self, filter: OutputFilter, offset: usize, limit: usize) -> Vec<Report> {
        let inner = self.inner.lock();
        let matches: Vec<_> = inner
            .advances
            .iter()
            .flat_map(|input| input.reports.iter())
            .filter(|report| filter.matches(report.input_index))
            .cloned()
            .collect();
        paginate(&matches, offset, limit)
    }

    pub fn count_inputs(&self, filter: InputFilter) -> usize {
        let inner = self.inner.lock();
        inner
            .advances
            .iter()
            .filter(|input| filter.matches(input.index))
            .count()
    }

    pub fn count_vouchers(&self, filter: OutputFilter) -> usize {
        let inner = self.inner.lock();
        inner
            .advances
            .iter()
            .flat_map(|input| input.vouchers.iter())
            .filter(|voucher| filter.matches(voucher.input_index))
            .count()
    }

    pub fn count_notices(&self, filter: OutputFilter) -> usize {
        let inner = self.inner.lock();
        inner
            .advances
            .iter()
            .flat_map(|input| input.notices.iter())
            .filter(|notice| filter.matches(notice.input_index))
            .count()
    }

    pub fn count_reports(&self, filter: OutputFilter) -> usize {
        let inner = self.inner.lock();
        inner
            .advances
            .iter()
            .flat_map(|input| input.reports.iter())
            .filter(|report| filter.matches(report.input_index))
            .count()
    }
}

/// Length of the prefix of advances that already reached a terminal status.
///
/// This stops at the first unprocessed advance on purpose: the count tells
/// the front-end how many advances an inspect result is guaranteed to
/// reflect, which is exactly the contiguous processed prefix.
fn processed_input_count(advances: &[AdvanceInput]) -> usize {
    advances
        .iter()
        .take_while(|input| input.status.is_terminal())
        .count()
}

/// Slice `items` by `offset` and `limit`, clamped to the sequence bounds.
fn paginate<T: Clone>(items: &[T], offset: usize, limit: usize) -> Vec<T> {
    if offset >= items.len() {
        return Vec::new();
    }
    let upper = usize::min(offset + limit, items.len());
    items[offset..upper].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender() -> Address {
        Address::repeat_byte(0x11)
    }

    fn destination() -> Address {
        Address::repeat_byte(0x22)
    }

    fn payload(byte: u8) -> Bytes {
        Bytes::from(vec![byte])
    }

    fn add_advance(dispatcher: &Dispatcher, byte: u8) {
        dispatcher.add_advance_input(sender(), payload(byte), 1, 1000);
    }

    #[test]
    fn test_advance_indices_are_dense() {
        let dispatcher = Dispatcher::new();
        for byte in 0..5 {
            add_advance(&dispatcher, byte);
        }
        for index in 0..5 {
            let input = dispatcher.get_advance_input(index).unwrap();
            assert_eq!(input.index, index);
            assert_eq!(input.status, CompletionStatus::Unprocessed);
        }
        assert!(dispatcher.get_advance_input(5).is_none());
    }

    #[test]
    fn test_inspect_indices_are_dense() {
        let dispatcher = Dispatcher::new();
        assert_eq!(dispatcher.add_inspect_input(payload(0)), 0);
        assert_eq!(dispatcher.add_inspect_input(payload(1)), 1);
        assert_eq!(dispatcher.get_inspect_input(1).unwrap().index, 1);
        assert!(dispatcher.get_inspect_input(2).is_none());
    }

    #[test]
    fn test_finish_with_nothing_to_do() {
        let dispatcher = Dispatcher::new();
        assert!(dispatcher.finish_and_get_next(true).is_none());
        assert!(dispatcher.finish_and_get_next(false).is_none());
    }

    #[test]
    fn test_happy_advance() {
        let dispatcher = Dispatcher::new();
        dispatcher.add_advance_input(sender(), Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]), 1, 1000);

        let Some(RollupInput::Advance(input)) = dispatcher.finish_and_get_next(true) else {
            panic!("expected the advance input");
        };
        assert_eq!(input.index, 0);
        assert_eq!(input.block_number, 1);
        assert_eq!(input.timestamp, 1000);

        assert_eq!(dispatcher.add_voucher(destination(), payload(0xaa)), Ok(0));
        assert_eq!(dispatcher.add_notice(payload(0xbb)), Ok(0));
        assert_eq!(dispatcher.add_report(payload(0xcc)), Ok(()));
        assert!(dispatcher.finish_and_get_next(true).is_none());

        let input = dispatcher.get_advance_input(0).unwrap();
        assert_eq!(input.status, CompletionStatus::Accepted);
        assert_eq!(input.vouchers.len(), 1);
        assert_eq!(input.vouchers[0].destination, destination());
        assert_eq!(input.vouchers[0].payload, payload(0xaa));
        assert_eq!(input.notices.len(), 1);
        assert_eq!(input.notices[0].payload, payload(0xbb));
        assert_eq!(input.reports.len(), 1);
        assert_eq!(input.reports[0].payload, payload(0xcc));
        assert!(input.exception.is_empty());
    }

    #[test]
    fn test_rejected_advance_discards_vouchers_and_notices() {
        let dispatcher = Dispatcher::new();
        add_advance(&dispatcher, 0);
        dispatcher.finish_and_get_next(true).unwrap();
        dispatcher.add_voucher(destination(), payload(0xaa)).unwrap();
        dispatcher.add_notice(payload(0xbb)).unwrap();
        dispatcher.add_report(payload(0xcc)).unwrap();
        assert!(dispatcher.finish_and_get_next(false).is_none());

        let input = dispatcher.get_advance_input(0).unwrap();
        assert_eq!(input.status, CompletionStatus::Rejected);
        assert!(input.vouchers.is_empty());
        assert!(input.notices.is_empty());
        assert_eq!(input.reports.len(), 1);
    }

    #[test]
    fn test_exception_mid_advance() {
        let dispatcher = Dispatcher::new();
        add_advance(&dispatcher, 0);
        dispatcher.finish_and_get_next(true).unwrap();
        dispatcher.add_voucher(destination(), payload(0xaa)).unwrap();
        dispatcher.add_notice(payload(0xbb)).unwrap();
        dispatcher.add_report(payload(0xcc)).unwrap();
        dispatcher.add_report(payload(0xcd)).unwrap();
        dispatcher.register_exception(payload(0xff)).unwrap();

        let input = dispatcher.get_advance_input(0).unwrap();
        assert_eq!(input.status, CompletionStatus::Exception);
        assert!(input.vouchers.is_empty());
        assert!(input.notices.is_empty());
        assert_eq!(input.reports.len(), 2);
        assert_eq!(input.exception, payload(0xff));

        // The dispatcher is idle again, so outputs are refused.
        assert_eq!(
            dispatcher.add_report(payload(0x00)),
            Err(StateError::Report)
        );
    }

    #[test]
    fn test_status_is_set_exactly_once() {
        let dispatcher = Dispatcher::new();
        add_advance(&dispatcher, 0);
        dispatcher.finish_and_get_next(true).unwrap();
        assert!(dispatcher.finish_and_get_next(false).is_none());
        let first = dispatcher.get_advance_input(0).unwrap().status;
        assert_eq!(first, CompletionStatus::Rejected);

        // Further finish cycles must not revisit the terminated input.
        assert!(dispatcher.finish_and_get_next(true).is_none());
        assert_eq!(
            dispatcher.get_advance_input(0).unwrap().status,
            CompletionStatus::Rejected
        );
    }

    #[test]
    fn test_outputs_refused_outside_active_input() {
        let dispatcher = Dispatcher::new();
        assert_eq!(
            dispatcher.add_voucher(destination(), payload(0)),
            Err(StateError::Voucher)
        );
        assert_eq!(dispatcher.add_notice(payload(0)), Err(StateError::Notice));
        assert_eq!(dispatcher.add_report(payload(0)), Err(StateError::Report));
        assert_eq!(
            dispatcher.register_exception(payload(0)),
            Err(StateError::Exception)
        );

        // Vouchers and notices are advance-only.
        dispatcher.add_inspect_input(payload(1));
        dispatcher.finish_and_get_next(true).unwrap();
        assert_eq!(
            dispatcher.add_voucher(destination(), payload(0)),
            Err(StateError::Voucher)
        );
        assert_eq!(dispatcher.add_notice(payload(0)), Err(StateError::Notice));
        assert_eq!(dispatcher.add_report(payload(2)), Ok(()));
    }

    #[test]
    fn test_inspect_priority_over_advances() {
        let dispatcher = Dispatcher::new();
        add_advance(&dispatcher, 0);
        dispatcher.add_inspect_input(payload(1));
        add_advance(&dispatcher, 2);

        let Some(RollupInput::Inspect(inspect)) = dispatcher.finish_and_get_next(true) else {
            panic!("expected the inspect first");
        };
        assert_eq!(inspect.index, 0);

        let Some(RollupInput::Advance(advance)) = dispatcher.finish_and_get_next(true) else {
            panic!("expected advance 0");
        };
        assert_eq!(advance.index, 0);

        let Some(RollupInput::Advance(advance)) = dispatcher.finish_and_get_next(true) else {
            panic!("expected advance 1");
        };
        assert_eq!(advance.index, 1);

        assert!(dispatcher.finish_and_get_next(true).is_none());
    }

    #[test]
    fn test_processed_input_count_snapshot() {
        let dispatcher = Dispatcher::new();
        for byte in 0..3 {
            add_advance(&dispatcher, byte);
        }
        for _ in 0..3 {
            dispatcher.finish_and_get_next(true).unwrap();
        }
        dispatcher.add_inspect_input(payload(9));
        dispatcher.finish_and_get_next(true).unwrap();
        assert!(dispatcher.finish_and_get_next(true).is_none());

        let inspect = dispatcher.get_inspect_input(0).unwrap();
        assert_eq!(inspect.status, CompletionStatus::Accepted);
        assert_eq!(inspect.processed_input_count, 3);
    }

    #[test]
    fn test_processed_input_count_is_a_prefix_count() {
        let dispatcher = Dispatcher::new();
        // Advance 0 terminates; advance 1 stays unprocessed while the
        // inspect jumps the queue, so the prefix count is 1 even though a
        // second advance exists.
        add_advance(&dispatcher, 0);
        dispatcher.finish_and_get_next(true).unwrap();
        dispatcher.finish_and_get_next(true);
        add_advance(&dispatcher, 1);
        dispatcher.add_inspect_input(payload(9));
        let Some(RollupInput::Inspect(_)) = dispatcher.finish_and_get_next(true) else {
            panic!("expected the inspect");
        };
        dispatcher.finish_and_get_next(true);

        let inspect = dispatcher.get_inspect_input(0).unwrap();
        assert_eq!(inspect.processed_input_count, 1);
    }

    #[test]
    fn test_voucher_visibility_requires_accept() {
        let dispatcher = Dispatcher::new();
        add_advance(&dispatcher, 0);
        dispatcher.finish_and_get_next(true).unwrap();
        dispatcher.add_voucher(destination(), payload(0xaa)).unwrap();
        // Still active: nothing visible yet.
        assert!(dispatcher.get_voucher(0, 0).is_none());
        assert_eq!(dispatcher.count_vouchers(OutputFilter::default()), 0);

        dispatcher.finish_and_get_next(true);
        assert!(dispatcher.get_voucher(0, 0).is_some());
        assert_eq!(dispatcher.count_vouchers(OutputFilter::default()), 1);
    }

    #[test]
    fn test_query_filters_and_pagination() {
        let dispatcher = Dispatcher::new();
        for byte in 0..6 {
            add_advance(&dispatcher, byte);
        }
        let filter = InputFilter {
            index_greater_than: Some(0),
            index_lower_than: Some(5),
        };
        assert_eq!(dispatcher.count_inputs(filter), 4);

        let page = dispatcher.get_inputs(filter, 1, 2);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].index, 2);
        assert_eq!(page[1].index, 3);

        // Offset past the end yields an empty page.
        assert!(dispatcher.get_inputs(filter, 10, 2).is_empty());
    }

    #[test]
    fn test_output_queries_by_input_index() {
        let dispatcher = Dispatcher::new();
        for byte in 0..2 {
            add_advance(&dispatcher, byte);
        }
        dispatcher.finish_and_get_next(true).unwrap();
        dispatcher.add_report(payload(0x01)).unwrap();
        dispatcher.finish_and_get_next(true).unwrap();
        dispatcher.add_report(payload(0x02)).unwrap();
        dispatcher.add_report(payload(0x03)).unwrap();
        dispatcher.finish_and_get_next(true);

        assert_eq!(dispatcher.count_reports(OutputFilter::default()), 3);
        let filter = OutputFilter {
            input_index: Some(1),
        };
        let reports = dispatcher.get_reports(filter, 0, 10);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].index, 0);
        assert_eq!(reports[1].index, 1);
        assert_eq!(dispatcher.get_report(1, 1).unwrap().payload, payload(0x03));
    }

    #[test]
    fn test_paginate_bounds() {
        let items = vec![0, 1, 2, 3];
        assert_eq!(paginate(&items, 0, 10), vec![0, 1, 2, 3]);
        assert_eq!(paginate(&items, 2, 10), vec![2, 3]);
        assert_eq!(paginate(&items, 1, 2), vec![1, 2]);
        assert!(paginate(&items, 4, 1).is_empty());
    }
}
