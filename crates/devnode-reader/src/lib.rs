//! # Reader Queries
//!
//! Cursor-paginated projections over the dispatcher model, exposed to the
//! application front-end as a GraphQL API at `/graphql`.
//!
//! Pagination follows the connection convention: `first`/`after` paginate
//! forward, `last`/`before` paginate backward, cursors are opaque strings,
//! and every connection carries `totalCount` and `pageInfo`. Filtering is
//! applied before pagination, so totals reflect the filter but not the
//! page.

#![warn(clippy::all)]
#![deny(unsafe_code)]

mod pagination;
mod schema;
mod service;

pub use pagination::{compute_page, Connection, Edge, PageError, PageInfo, DEFAULT_PAGINATION_LIMIT};
pub use schema::{build_schema, Query, ReaderSchema};
pub use service::router;
