//! Paging inputs and results.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The offset/count pair for a paged query, or the [`PagingOptions::None`]
/// sentinel meaning "no paging requested".
///
/// Passing `None` into a paging operation is a caller contract violation
/// surfaced as [`Error::PagingOptionsNone`], not a generic argument error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PagingOptions {
    /// No paging.
    #[default]
    None,
    /// Skip `skip` rows, then take `take` rows.
    SkipTake {
        /// Rows to skip before the page starts.
        skip: i64,
        /// Rows in the page.
        take: i64,
    },
}

impl PagingOptions {
    /// Paging options for a one-based page number with a fixed page size.
    ///
    /// Page 1 with 25 per page skips 0 and takes 25; page 10 skips 225.
    pub fn for_page(page: i64, results_per_page: i64) -> Result<Self> {
        if page < 1 {
            return Err(Error::invalid_argument(
                "page",
                "the first page which can be requested is page 1",
            ));
        }

        if results_per_page < 1 {
            return Err(Error::invalid_argument(
                "results_per_page",
                "there must be at least 1 result per page",
            ));
        }

        Ok(PagingOptions::SkipTake {
            skip: (page - 1) * results_per_page,
            take: results_per_page,
        })
    }

    /// Paging options from an explicit skip/take pair.
    pub fn skip_take(skip: i64, take: i64) -> Result<Self> {
        if skip < 0 {
            return Err(Error::invalid_argument(
                "skip",
                "it is not possible to skip less than 0 results",
            ));
        }

        if take < 1 {
            return Err(Error::invalid_argument(
                "take",
                "at least 1 result must be returned",
            ));
        }

        Ok(PagingOptions::SkipTake { skip, take })
    }

    /// The number of rows skipped, when paging is requested.
    #[must_use]
    pub const fn offset(self) -> Option<i64> {
        match self {
            PagingOptions::None => None,
            PagingOptions::SkipTake { skip, .. } => Some(skip),
        }
    }

    /// The number of rows in the page, when paging is requested.
    #[must_use]
    pub const fn count(self) -> Option<i64> {
        match self {
            PagingOptions::None => None,
            PagingOptions::SkipTake { take, .. } => Some(take),
        }
    }
}

/// The result of a paged query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedResult<T> {
    page: i64,
    results: Vec<T>,
    results_per_page: i64,
    total_results: i64,
}

impl<T> PagedResult<T> {
    /// Create a paged result.
    #[must_use]
    pub fn new(page: i64, results: Vec<T>, results_per_page: i64, total_results: i64) -> Self {
        Self {
            page,
            results,
            results_per_page,
            total_results,
        }
    }

    /// The one-based page number of these results.
    #[must_use]
    pub const fn page(&self) -> i64 {
        self.page
    }

    /// The rows in this page, in query order.
    #[must_use]
    pub fn results(&self) -> &[T] {
        &self.results
    }

    /// Consume the result, yielding the rows.
    #[must_use]
    pub fn into_results(self) -> Vec<T> {
        self.results
    }

    /// The page size the query was run with.
    #[must_use]
    pub const fn results_per_page(&self) -> i64 {
        self.results_per_page
    }

    /// The total number of rows the unpaged query matches.
    #[must_use]
    pub const fn total_results(&self) -> i64 {
        self.total_results
    }

    /// The total number of pages available.
    #[must_use]
    pub const fn total_pages(&self) -> i64 {
        ((self.total_results - 1) / self.results_per_page) + 1
    }

    /// Whether this page contains any rows.
    #[must_use]
    pub fn has_results(&self) -> bool {
        !self.results.is_empty()
    }

    /// Whether pages beyond this one are available.
    #[must_use]
    pub const fn more_results_available(&self) -> bool {
        self.page < self.total_pages()
    }
}
