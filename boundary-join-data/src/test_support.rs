//! Test utilities for record sources.
//!
//! [`StubPageFetcher`] serves pre-configured pages without network access,
//! recording every `(offset, limit)` request it receives.

use boundary_join_core::PointRecord;
use serde_json::Value;

use crate::{FetchError, PageFetcher};

/// Deterministic [`PageFetcher`] for pagination tests.
///
/// Page `n` is served for any request whose offset equals `n * limit`;
/// offsets past the last page yield an empty page.
///
/// # Example
///
/// ```
/// use boundary_join_core::PointSource;
/// use boundary_join_data::PagedRecordSource;
/// use boundary_join_data::test_support::StubPageFetcher;
/// use serde_json::json;
///
/// let fetcher = StubPageFetcher::with_pages(vec![vec![json!({"id": 1})]]);
/// let mut source = PagedRecordSource::new(fetcher, 10).unwrap();
/// assert_eq!(source.next_batch().unwrap().map(|page| page.len()), Some(1));
/// assert_eq!(source.next_batch().unwrap(), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StubPageFetcher {
    pages: Vec<Vec<PointRecord>>,
    failure: Option<(usize, FetchError)>,
    requests: Vec<(usize, usize)>,
}

impl StubPageFetcher {
    /// Serve `pages` in order. Non-object entries are skipped.
    #[must_use]
    pub fn with_pages(pages: Vec<Vec<Value>>) -> Self {
        let records = pages
            .into_iter()
            .map(|page| {
                page.into_iter()
                    .filter_map(|entry| match entry {
                        Value::Object(attributes) => Some(PointRecord::new(attributes)),
                        _ => None,
                    })
                    .collect()
            })
            .collect();
        Self {
            pages: records,
            ..Self::default()
        }
    }

    /// Fail with `error` when asked for page number `page`.
    #[must_use]
    pub fn failing_at(mut self, page: usize, error: FetchError) -> Self {
        self.failure = Some((page, error));
        self
    }

    /// Every `(offset, limit)` pair requested so far.
    #[must_use]
    pub fn requests(&self) -> &[(usize, usize)] {
        &self.requests
    }
}

impl PageFetcher for StubPageFetcher {
    fn fetch_page(&mut self, offset: usize, limit: usize) -> Result<Vec<PointRecord>, FetchError> {
        self.requests.push((offset, limit));
        let page = offset.checked_div(limit).unwrap_or_default();
        if let Some((failing, error)) = &self.failure {
            if *failing == page {
                return Err(error.clone());
            }
        }
        Ok(self.pages.get(page).cloned().unwrap_or_default())
    }
}
