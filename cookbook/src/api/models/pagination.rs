//! Page-based pagination for list endpoints.

use serde::Deserialize;
use serde_with::{DisplayFromStr, serde_as};

/// Default number of items to return per page.
pub const DEFAULT_LIMIT: i64 = 10;

/// Maximum number of items that can be requested per page.
pub const MAX_LIMIT: i64 = 100;

/// `page` is 1-based. Both values are clamped to at least 1 and `limit` to at most [`MAX_LIMIT`],
/// so out-of-range input never produces an error.
#[serde_as]
#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub page: Option<i64>,

    #[serde_as(as = "Option<DisplayFromStr>")]
    pub limit: Option<i64>,
}

impl Pagination {
    #[inline]
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    #[inline]
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    /// Rows to skip before this page
    #[inline]
    pub fn skip(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    /// Number of pages needed for `total` rows
    pub fn total_pages(&self, total: i64) -> i64 {
        let limit = self.limit();
        (total.max(0) + limit - 1) / limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;

    #[test]
    fn test_defaults() {
        let p = Pagination::default();
        assert_eq!((p.page(), p.limit(), p.skip()), (1, 10, 0));
    }

    #[test]
    fn test_clamping() {
        let p = Pagination {
            page: Some(0),
            limit: Some(0),
        };
        assert_eq!((p.page(), p.limit()), (1, 1));

        let p = Pagination {
            page: Some(-3),
            limit: Some(5000),
        };
        assert_eq!((p.page(), p.limit()), (1, MAX_LIMIT));
    }

    #[test]
    fn test_skip_and_total_pages() {
        let p = Pagination {
            page: Some(3),
            limit: Some(4),
        };
        assert_eq!(p.skip(), 8);
        assert_eq!(p.total_pages(0), 0);
        assert_eq!(p.total_pages(4), 1);
        assert_eq!(p.total_pages(9), 3);
    }

    #[test]
    fn test_query_string_parsing() {
        let uri = "/recipes?page=2&limit=25".parse().unwrap();
        let Query(p) = Query::<Pagination>::try_from_uri(&uri).unwrap();
        assert_eq!((p.page(), p.limit()), (2, 25));

        let uri = "/recipes".parse().unwrap();
        let Query(p) = Query::<Pagination>::try_from_uri(&uri).unwrap();
        assert_eq!((p.page(), p.limit()), (1, 10));

        let uri = "/recipes?page=two".parse().unwrap();
        assert!(Query::<Pagination>::try_from_uri(&uri).is_err());
    }
}
