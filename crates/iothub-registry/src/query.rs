//! Paged twin queries.

use std::sync::Arc;

use futures::{stream, Stream, TryStreamExt};

use crate::error::RegistryError;
use crate::registry::DeviceRegistry;
use crate::twin::Twin;

/// Query selecting every device twin.
pub const ALL_DEVICES_QUERY: &str = "select * from devices";

/// A lazily paged twin query.
///
/// Each [`next_page`](Self::next_page) call issues one request. The query
/// cannot be rewound; create a new one to start over.
pub struct TwinQuery {
    registry: Arc<dyn DeviceRegistry>,
    query: String,
    page_size: Option<u32>,
    continuation: Option<String>,
    has_more: bool,
}

impl TwinQuery {
    /// Creates a query. No request is made until the first page is read.
    #[must_use]
    pub fn new(registry: Arc<dyn DeviceRegistry>, query: impl Into<String>) -> Self {
        Self {
            registry,
            query: query.into(),
            page_size: None,
            continuation: None,
            has_more: true,
        }
    }

    /// Limits the number of twins per page.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Returns the query text.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Returns true until the service reports the last page.
    #[must_use]
    pub const fn has_more_results(&self) -> bool {
        self.has_more
    }

    /// Fetches the next page of twins.
    ///
    /// Returns an empty batch without contacting the service once the query
    /// is exhausted.
    ///
    /// # Errors
    ///
    /// Propagates the registry error; the query position is unchanged.
    pub async fn next_page(&mut self) -> Result<Vec<Twin>, RegistryError> {
        if !self.has_more {
            return Ok(Vec::new());
        }

        let page = self
            .registry
            .query_twins(&self.query, self.page_size, self.continuation.as_deref())
            .await?;

        tracing::debug!(
            query = %self.query,
            count = page.twins.len(),
            more = page.continuation_token.is_some(),
            "Fetched twin page"
        );

        self.has_more = page.continuation_token.is_some();
        self.continuation = page.continuation_token;
        Ok(page.twins)
    }

    /// Drains all remaining pages into one vector.
    ///
    /// # Errors
    ///
    /// Returns the first registry error encountered.
    pub async fn collect_all(mut self) -> Result<Vec<Twin>, RegistryError> {
        let mut twins = Vec::new();
        while self.has_more_results() {
            twins.extend(self.next_page().await?);
        }
        Ok(twins)
    }

    /// Converts the query into a stream of twins, fetching pages on demand.
    pub fn into_stream(self) -> impl Stream<Item = Result<Twin, RegistryError>> + Send {
        stream::try_unfold(self, |mut query| async move {
            if !query.has_more_results() {
                return Ok::<_, RegistryError>(None);
            }
            let twins = query.next_page().await?;
            Ok(Some((stream::iter(twins.into_iter().map(Ok)), query)))
        })
        .try_flatten()
    }
}

impl std::fmt::Debug for TwinQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwinQuery")
            .field("query", &self.query)
            .field("page_size", &self.page_size)
            .field("has_more", &self.has_more)
            .finish_non_exhaustive()
    }
}
