//! Offset-based pagination for listing endpoints.
//!
//! Listing endpoints take a 1-based `startIndex` and a `count`, and report
//! `{startIndex, itemsPerPage, totalResults}` alongside each page of
//! `resources`. [`paginate`] keeps requesting pages until the server says
//! the last one has been served.

use std::future::Future;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::client::Client;
use crate::error::Error;
use crate::request::RequestSpec;
use crate::types::null_default;

/// Page size requested from listing endpoints.
pub const PAGE_SIZE: u64 = 100;

/// The window requested for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// 1-based index of the first item.
    pub start_index: u64,
    pub count: u64,
}

/// One page of a listing response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default, deserialize_with = "null_default")]
    pub total_results: u64,
    #[serde(default, deserialize_with = "null_default")]
    pub items_per_page: u64,
    #[serde(default, deserialize_with = "null_default")]
    pub start_index: u64,
    #[serde(
        default = "Vec::new",
        deserialize_with = "null_default",
        bound(deserialize = "T: Deserialize<'de>")
    )]
    pub resources: Vec<T>,
}

impl<T> Page<T> {
    /// True when this page reaches the end of the result set.
    pub fn is_last(&self) -> bool {
        // start_index + items_per_page - 1 >= total_results
        self.start_index.saturating_add(self.items_per_page) > self.total_results
    }
}

/// Fetches pages until the server reports the end, accumulating resources.
///
/// Empty pages do not end the listing; it only stops early once the next
/// window would start beyond the reported total.
///
/// Any failed page aborts the listing; the items gathered so far are
/// discarded.
pub async fn paginate<T, F, Fut>(mut fetch: F) -> Result<Vec<T>, Error>
where
    F: FnMut(PageWindow) -> Fut,
    Fut: Future<Output = Result<Page<T>, Error>>,
{
    let mut items = Vec::new();
    let mut window = PageWindow {
        start_index: 1,
        count: PAGE_SIZE,
    };

    loop {
        let page = fetch(window).await?;
        let last = page.is_last();
        let total = page.total_results;
        items.extend(page.resources);

        if last {
            break;
        }
        // Past the reported total nothing more can be owed.
        match window.start_index.checked_add(window.count) {
            Some(next) if next <= total => window.start_index = next,
            _ => {
                warn!(
                    start_index = window.start_index,
                    total_results = total,
                    collected = items.len(),
                    "listing ended before the server reported its last page"
                );
                break;
            }
        }
    }

    Ok(items)
}

impl Client {
    /// Lists every resource under a paginated endpoint.
    pub async fn list_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, Error> {
        paginate(move |window| {
            let spec = RequestSpec::get(path)
                .query("startIndex", window.start_index.to_string())
                .query("count", window.count.to_string());
            self.execute::<Page<T>>(spec)
        })
        .await
    }
}
