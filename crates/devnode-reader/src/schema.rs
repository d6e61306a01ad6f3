//! GraphQL schema projecting the dispatcher model.

use std::sync::Arc;

use alloy::primitives::hex;
use async_graphql::{Context, EmptyMutation, EmptySubscription, Enum, InputObject, Object, Result, Schema, SimpleObject};

use devnode_model::{self as model, Dispatcher, InputFilter, OutputFilter};

use crate::pagination::{compute_page, Connection};

pub type ReaderSchema = Schema<Query, EmptyMutation, EmptySubscription>;

/// Build the schema over a dispatcher.
pub fn build_schema(dispatcher: Arc<Dispatcher>) -> ReaderSchema {
    Schema::build(Query, EmptyMutation, EmptySubscription)
        .data(dispatcher)
        .finish()
}

/// Completion status of an input, as exposed to the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
pub enum CompletionStatus {
    Unprocessed,
    Accepted,
    Rejected,
    Exception,
}

impl From<model::CompletionStatus> for CompletionStatus {
    fn from(status: model::CompletionStatus) -> Self {
        match status {
            model::CompletionStatus::Unprocessed => Self::Unprocessed,
            model::CompletionStatus::Accepted => Self::Accepted,
            model::CompletionStatus::Rejected => Self::Rejected,
            model::CompletionStatus::Exception => Self::Exception,
        }
    }
}

/// An advance input. Byte fields are `0x`-prefixed hex strings.
#[derive(Debug, SimpleObject)]
pub struct Input {
    pub index: i32,
    pub status: CompletionStatus,
    pub msg_sender: String,
    pub payload: String,
    pub block_number: i64,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
}

impl From<model::AdvanceInput> for Input {
    fn from(input: model::AdvanceInput) -> Self {
        Self {
            index: input.index as i32,
            status: input.status.into(),
            msg_sender: hex::encode_prefixed(input.msg_sender.as_slice()),
            payload: hex::encode_prefixed(&input.payload),
            block_number: input.block_number as i64,
            timestamp: input.timestamp as i64,
        }
    }
}

#[derive(Debug, SimpleObject)]
pub struct Voucher {
    pub index: i32,
    pub input_index: i32,
    pub destination: String,
    pub payload: String,
}

impl From<model::Voucher> for Voucher {
    fn from(voucher: model::Voucher) -> Self {
        Self {
            index: voucher.index as i32,
            input_index: voucher.input_index as i32,
            destination: hex::encode_prefixed(voucher.destination.as_slice()),
            payload: hex::encode_prefixed(&voucher.payload),
        }
    }
}

#[derive(Debug, SimpleObject)]
pub struct Notice {
    pub index: i32,
    pub input_index: i32,
    pub payload: String,
}

impl From<model::Notice> for Notice {
    fn from(notice: model::Notice) -> Self {
        Self {
            index: notice.index as i32,
            input_index: notice.input_index as i32,
            payload: hex::encode_prefixed(&notice.payload),
        }
    }
}

#[derive(Debug, SimpleObject)]
pub struct Report {
    pub index: i32,
    pub input_index: i32,
    pub payload: String,
}

impl From<model::Report> for Report {
    fn from(report: model::Report) -> Self {
        Self {
            index: report.index as i32,
            input_index: report.input_index as i32,
            payload: hex::encode_prefixed(&report.payload),
        }
    }
}

/// Filter for the `inputs` connection.
#[derive(Debug, Default, InputObject)]
pub struct InputWhere {
    pub index_greater_than: Option<i32>,
    pub index_lower_than: Option<i32>,
}

impl InputWhere {
    fn to_filter(&self) -> InputFilter {
        InputFilter {
            // A negative lower bound excludes nothing, so it folds away;
            // a negative upper bound clamps to zero and excludes all.
            index_greater_than: self
                .index_greater_than
                .and_then(|index| usize::try_from(index).ok()),
            index_lower_than: self.index_lower_than.map(|index| index.max(0) as usize),
        }
    }
}

pub struct Query;

#[Object]
impl Query {
    /// Advance input with the given index.
    async fn input(&self, ctx: &Context<'_>, index: i32) -> Result<Input> {
        let dispatcher = ctx.data::<Arc<Dispatcher>>()?;
        dispatcher
            .get_advance_input(index as usize)
            .map(Input::from)
            .ok_or_else(|| "input not found".into())
    }

    /// Voucher produced by the advance input at `input_index`.
    async fn voucher(
        &self,
        ctx: &Context<'_>,
        voucher_index: i32,
        input_index: i32,
    ) -> Result<Voucher> {
        let dispatcher = ctx.data::<Arc<Dispatcher>>()?;
        dispatcher
            .get_voucher(voucher_index as usize, input_index as usize)
            .map(Voucher::from)
            .ok_or_else(|| "voucher not found".into())
    }

    /// Notice produced by the advance input at `input_index`.
    async fn notice(
        &self,
        ctx: &Context<'_>,
        notice_index: i32,
        input_index: i32,
    ) -> Result<Notice> {
        let dispatcher = ctx.data::<Arc<Dispatcher>>()?;
        dispatcher
            .get_notice(notice_index as usize, input_index as usize)
            .map(Notice::from)
            .ok_or_else(|| "notice not found".into())
    }

    /// Report produced by the input at `input_index`.
    async fn report(
        &self,
        ctx: &Context<'_>,
        report_index: i32,
        input_index: i32,
    ) -> Result<Report> {
        let dispatcher = ctx.data::<Arc<Dispatcher>>()?;
        dispatcher
            .get_report(report_index as usize, input_index as usize)
            .map(Report::from)
            .ok_or_else(|| "report not found".into())
    }

    /// Paginated advance inputs.
    async fn inputs(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        last: Option<i32>,
        after: Option<String>,
        before: Option<String>,
        #[graphql(name = "where")] filter: Option<InputWhere>,
    ) -> Result<Connection<Input>> {
        let dispatcher = ctx.data::<Arc<Dispatcher>>()?;
        let filter = filter.unwrap_or_default().to_filter();
        let total = dispatcher.count_inputs(filter);
        let (offset, limit) =
            compute_page(first, last, after.as_deref(), before.as_deref(), total)?;
        let nodes = dispatcher
            .get_inputs(filter, offset, limit)
            .into_iter()
            .map(Input::from)
            .collect();
        Ok(Connection::new(offset, total, nodes))
    }

    /// Paginated vouchers, optionally restricted to one input.
    async fn vouchers(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        last: Option<i32>,
        after: Option<String>,
        before: Option<String>,
        input_index: Option<i32>,
    ) -> Result<Connection<Voucher>> {
        let dispatcher = ctx.data::<Arc<Dispatcher>>()?;
        let filter = OutputFilter {
            input_index: input_index.map(|index| index as usize),
        };
        let total = dispatcher.count_vouchers(filter);
        let (offset, limit) =
            compute_page(first, last, after.as_deref(), before.as_deref(), total)?;
        let nodes = dispatcher
            .get_vouchers(filter, offset, limit)
            .into_iter()
            .map(Voucher::from)
            .collect();
        Ok(Connection::new(offset, total, nodes))
    }

    /// Paginated notices, optionally restricted to one input.
    async fn notices(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        last: Option<i32>,
        after: Option<String>,
        before: Option<String>,
        input_index: Option<i32>,
    ) -> Result<Connection<Notice>> {
        let dispatcher = ctx.data::<Arc<Dispatcher>>()?;
        let filter = OutputFilter {
            input_index: input_index.map(|index| index as usize),
        };
        let total = dispatcher.count_notices(filter);
        let (offset, limit) =
            compute_page(first, last, after.as_deref(), before.as_deref(), total)?;
        let nodes = dispatcher
            .get_notices(filter, offset, limit)
            .into_iter()
            .map(Notice::from)
            .collect();
        Ok(Connection::new(offset, total, nodes))
    }

    /// Paginated reports, optionally restricted to one input.
    async fn reports(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        last: Option<i32>,
        after: Option<String>,
        before: Option<String>,
        input_index: Option<i32>,
    ) -> Result<Connection<Report>> {
        let dispatcher = ctx.data::<Arc<Dispatcher>>()?;
        let filter = OutputFilter {
            input_index: input_index.map(|index| index as usize),
        };
        let total = dispatcher.count_reports(filter);
        let (offset, limit) =
            compute_page(first, last, after.as_deref(), before.as_deref(), total)?;
        let nodes = dispatcher
            .get_reports(filter, offset, limit)
            .into_iter()
            .map(Report::from)
            .collect();
        Ok(Connection::new(offset, total, nodes))
    }
}
