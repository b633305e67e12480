//! Shared, read-only state injected into every handler.

use crate::negotiate::{SessionCookies, UpstreamCaller, UpstreamConfig};

pub const DEFAULT_BULK_CONCURRENCY: usize = 4;
pub const DEFAULT_BULK_MAX_QUERIES: usize = 200;

#[derive(Debug)]
pub struct AppState {
    caller: UpstreamCaller,
    cookies: SessionCookies,
    bulk_concurrency: usize,
    bulk_max_queries: usize,
}

impl AppState {
    #[must_use]
    pub fn new(caller: UpstreamCaller, cookies: SessionCookies) -> Self {
        Self {
            caller,
            cookies,
            bulk_concurrency: DEFAULT_BULK_CONCURRENCY,
            bulk_max_queries: DEFAULT_BULK_MAX_QUERIES,
        }
    }

    #[must_use]
    pub fn with_bulk_concurrency(mut self, concurrency: usize) -> Self {
        self.bulk_concurrency = concurrency.max(1);
        self
    }

    #[must_use]
    pub fn with_bulk_max_queries(mut self, max_queries: usize) -> Self {
        self.bulk_max_queries = max_queries.max(1);
        self
    }

    #[must_use]
    pub fn caller(&self) -> &UpstreamCaller {
        &self.caller
    }

    #[must_use]
    pub fn config(&self) -> &UpstreamConfig {
        self.caller.config()
    }

    #[must_use]
    pub fn cookies(&self) -> &SessionCookies {
        &self.cookies
    }

    #[must_use]
    pub fn bulk_concurrency(&self) -> usize {
        self.bulk_concurrency
    }

    #[must_use]
    pub fn bulk_max_queries(&self) -> usize {
        self.bulk_max_queries
    }
}
