//! Connection pagination.

use async_graphql::{OutputType, SimpleObject};
use base64::prelude::{Engine, BASE64_STANDARD};
use thiserror::Error;

use crate::schema::{Input, Notice, Report, Voucher};

/// Page size used when neither `first` nor `last` is given.
pub const DEFAULT_PAGINATION_LIMIT: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    #[error(
        "cannot mix forward pagination (first, after) with backward pagination (last, before)"
    )]
    MixedPagination,

    #[error("invalid pagination cursor")]
    InvalidCursor,

    #[error("limit cannot be negative")]
    NegativeLimit,
}

/// Compute `(offset, limit)` from the connection arguments.
///
/// Forward pagination is the default when no argument is given. `after`
/// starts the page at the following element; `before` ends it at the
/// cursor, clamping the start at zero.
pub fn compute_page(
    first: Option<i32>,
    last: Option<i32>,
    after: Option<&str>,
    before: Option<&str>,
    total: usize,
) -> Result<(usize, usize), PageError> {
    let forward = first.is_some() || after.is_some();
    let backward = last.is_some() || before.is_some();
    if forward && backward {
        return Err(PageError::MixedPagination);
    }
    if backward {
        compute_backward_page(last, before, total)
    } else {
        compute_forward_page(first, after, total)
    }
}

fn limit_argument(value: Option<i32>) -> Result<usize, PageError> {
    match value {
        Some(limit) if limit < 0 => Err(PageError::NegativeLimit),
        Some(limit) => Ok(limit as usize),
        None => Ok(DEFAULT_PAGINATION_LIMIT),
    }
}

fn compute_forward_page(
    first: Option<i32>,
    after: Option<&str>,
    total: usize,
) -> Result<(usize, usize), PageError> {
    let mut limit = limit_argument(first)?;
    let offset = match after {
        Some(cursor) => decode_cursor(cursor, total)? + 1,
        None => 0,
    };
    limit = limit.min(total - offset);
    Ok((offset, limit))
}

fn compute_backward_page(
    last: Option<i32>,
    before: Option<&str>,
    total: usize,
) -> Result<(usize, usize), PageError> {
    let mut limit = limit_argument(last)?;
    let before_offset = match before {
        Some(cursor) => decode_cursor(cursor, total)?,
        None => total,
    };
    let offset = before_offset.saturating_sub(limit);
    limit = limit.min(total - offset);
    Ok((offset, limit))
}

/// Encode a pagination offset as an opaque cursor.
pub(crate) fn encode_cursor(offset: usize) -> String {
    BASE64_STANDARD.encode(offset.to_string())
}

/// Decode a cursor back into an offset, validating it against `total`.
pub(crate) fn decode_cursor(cursor: &str, total: usize) -> Result<usize, PageError> {
    let bytes = BASE64_STANDARD
        .decode(cursor)
        .map_err(|_| PageError::InvalidCursor)?;
    let text = String::from_utf8(bytes).map_err(|_| PageError::InvalidCursor)?;
    let offset: usize = text.parse().map_err(|_| PageError::InvalidCursor)?;
    if offset >= total {
        return Err(PageError::InvalidCursor);
    }
    Ok(offset)
}

/// A page of nodes plus the metadata needed to continue paginating.
#[derive(Debug, SimpleObject)]
#[graphql(concrete(name = "InputConnection", params(Input)))]
#[graphql(concrete(name = "VoucherConnection", params(Voucher)))]
#[graphql(concrete(name = "NoticeConnection", params(Notice)))]
#[graphql(concrete(name = "ReportConnection", params(Report)))]
pub struct Connection<T: OutputType>
where
    Edge<T>: OutputType,
{
    /// Number of entries matching the filter, ignoring pagination.
    pub total_count: i32,
    pub edges: Vec<Edge<T>>,
    pub page_info: PageInfo,
}

#[derive(Debug, SimpleObject)]
#[graphql(concrete(name = "InputEdge", params(Input)))]
#[graphql(concrete(name = "VoucherEdge", params(Voucher)))]
#[graphql(concrete(name = "NoticeEdge", params(Notice)))]
#[graphql(concrete(name = "ReportEdge", params(Report)))]
pub struct Edge<T: OutputType> {
    pub node: T,
    pub cursor: String,
}

#[derive(Debug, Default, SimpleObject)]
pub struct PageInfo {
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl<T: OutputType> Connection<T>
where
    Edge<T>: OutputType,
{
    /// Build the connection for nodes starting at `offset` within a
    /// filtered sequence of `total` entries.
    pub fn new(offset: usize, total: usize, nodes: Vec<T>) -> Self {
        let edges: Vec<Edge<T>> = nodes
            .into_iter()
            .enumerate()
            .map(|(i, node)| Edge {
                node,
                cursor: encode_cursor(offset + i),
            })
            .collect();
        let page_info = if edges.is_empty() {
            PageInfo::default()
        } else {
            let last_offset = offset + edges.len() - 1;
            PageInfo {
                start_cursor: Some(encode_cursor(offset)),
                end_cursor: Some(encode_cursor(last_offset)),
                has_next_page: last_offset + 1 < total,
                has_previous_page: offset > 0,
            }
        };
        Self {
            total_count: total as i32,
            edges,
            page_info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_pagination_is_an_error() {
        let cursor = encode_cursor(0);
        assert_eq!(
            compute_page(Some(1), Some(1), None, None, 10),
            Err(PageError::MixedPagination)
        );
        assert_eq!(
            compute_page(None, None, Some(&cursor), Some(&cursor), 10),
            Err(PageError::MixedPagination)
        );
    }

    #[test]
    fn test_negative_limits_are_rejected() {
        assert_eq!(
            compute_page(Some(-1), None, None, None, 10),
            Err(PageError::NegativeLimit)
        );
        assert_eq!(
            compute_page(None, Some(-1), None, None, 10),
            Err(PageError::NegativeLimit)
        );
    }

    #[test]
    fn test_forward_defaults() {
        assert_eq!(compute_page(None, None, None, None, 10), Ok((0, 10)));
        assert_eq!(
            compute_page(None, None, None, None, 2000),
            Ok((0, DEFAULT_PAGINATION_LIMIT))
        );
        assert_eq!(compute_page(Some(3), None, None, None, 10), Ok((0, 3)));
    }

    #[test]
    fn test_forward_after_cursor() {
        let cursor = encode_cursor(4);
        assert_eq!(
            compute_page(Some(3), None, Some(&cursor), None, 10),
            Ok((5, 3))
        );
        // Page clamped at the end of the sequence.
        let cursor = encode_cursor(8);
        assert_eq!(
            compute_page(Some(5), None, Some(&cursor), None, 10),
            Ok((9, 1))
        );
    }

    #[test]
    fn test_backward_before_cursor() {
        let cursor = encode_cursor(7);
        assert_eq!(
            compute_page(None, Some(3), None, Some(&cursor), 10),
            Ok((4, 3))
        );
        // Start clamped at zero.
        let cursor = encode_cursor(1);
        assert_eq!(
            compute_page(None, Some(5), None, Some(&cursor), 10),
            Ok((0, 5))
        );
    }

    #[test]
    fn test_backward_without_cursor_takes_the_tail() {
        assert_eq!(compute_page(None, Some(3), None, None, 10), Ok((7, 3)));
        assert_eq!(compute_page(None, Some(20), None, None, 10), Ok((0, 10)));
    }

    #[test]
    fn test_cursor_roundtrip_and_validation() {
        let cursor = encode_cursor(42);
        assert_eq!(decode_cursor(&cursor, 100), Ok(42));
        assert_eq!(decode_cursor(&cursor, 42), Err(PageError::InvalidCursor));
        assert_eq!(decode_cursor("!!!", 100), Err(PageError::InvalidCursor));
        let not_a_number = BASE64_STANDARD.encode("nope");
        assert_eq!(
            decode_cursor(&not_a_number, 100),
            Err(PageError::InvalidCursor)
        );
    }

    #[test]
    fn test_connection_page_info() {
        let connection = Connection::new(2, 10, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(connection.total_count, 10);
        assert_eq!(connection.edges.len(), 2);
        assert_eq!(connection.edges[0].cursor, encode_cursor(2));
        assert_eq!(connection.edges[1].cursor, encode_cursor(3));
        let info = &connection.page_info;
        assert_eq!(info.start_cursor.as_deref(), Some(encode_cursor(2).as_str()));
        assert_eq!(info.end_cursor.as_deref(), Some(encode_cursor(3).as_str()));
        assert!(info.has_next_page);
        assert!(info.has_previous_page);
    }

    #[test]
    fn test_empty_connection_page_info() {
        let connection = Connection::<String>::new(0, 0, vec![]);
        assert_eq!(connection.total_count, 0);
        assert!(connection.edges.is_empty());
        assert!(connection.page_info.start_cursor.is_none());
        assert!(!connection.page_info.has_next_page);
        assert!(!connection.page_info.has_previous_page);
    }
}
