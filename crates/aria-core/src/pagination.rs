//! # Pagination
//!
//! Limit/offset pages with `next` / `previous` links.
//!
//! ## Response Shape
//! ```text
//! GET /api/products?limit=2&offset=2&search=flis
//!
//! {
//!   "count": 7,
//!   "next": "https://host/api/products?search=flis&limit=2&offset=4",
//!   "previous": "https://host/api/products?search=flis&limit=2",
//!   "results": [ ... 2 rows ... ]
//! }
//! ```
//!
//! The first page's `previous` link omits `offset` entirely so clients can
//! compare it with the URL they started from.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

/// Query parameters accepted by every list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_LIMIT
}

impl Default for PageParams {
    fn default() -> Self {
        PageParams {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

impl PageParams {
    pub fn new(limit: i64, offset: i64) -> Self {
        PageParams { limit, offset }.clamped()
    }

    /// Forces `1 <= limit <= MAX_PAGE_LIMIT` and `offset >= 0`.
    pub fn clamped(self) -> Self {
        PageParams {
            limit: self.limit.clamp(1, MAX_PAGE_LIMIT),
            offset: self.offset.max(0),
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Builds a page and its links.
    ///
    /// ## Arguments
    /// * `results` - Rows for this page
    /// * `count` - Total rows matching the query
    /// * `params` - The (clamped) params used for the query
    /// * `base_url` - Absolute URL of the endpoint, without query string
    /// * `extra_query` - Other query parameters to carry over, in order
    pub fn new(
        results: Vec<T>,
        count: i64,
        params: PageParams,
        base_url: &str,
        extra_query: &[(String, String)],
    ) -> Self {
        let next = if params.offset + params.limit < count {
            Some(build_url(
                base_url,
                extra_query,
                params.limit,
                Some(params.offset + params.limit),
            ))
        } else {
            None
        };

        let previous = if params.offset > 0 {
            let previous_offset = params.offset - params.limit;
            let offset = if previous_offset > 0 {
                Some(previous_offset)
            } else {
                None
            };
            Some(build_url(base_url, extra_query, params.limit, offset))
        } else {
            None
        };

        Page {
            count,
            next,
            previous,
            results,
        }
    }

    /// Converts the rows while keeping count and links.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

fn build_url(
    base_url: &str,
    extra_query: &[(String, String)],
    limit: i64,
    offset: Option<i64>,
) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.extend_pairs(
        extra_query
            .iter()
            .filter(|(key, _)| key != "limit" && key != "offset"),
    );

    query.append_pair("limit", &limit.to_string());
    if let Some(offset) = offset {
        query.append_pair("offset", &offset.to_string());
    }

    format!("{}?{}", base_url, query.finish())
}

/// Form-encodes `pairs` into a query string without the leading `?`.
pub fn query_string<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

// =============================================================================
// Unit Tests
// =============================================================================
