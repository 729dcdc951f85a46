//! Asset store module
//!
//! Abstraction over the place deployed static files live. A missing asset
//! is reported as a 404 response; `StoreError` is reserved for lookups
//! that could not be answered at all.

pub mod directory;
pub mod memory;
pub mod request;

use std::time::Duration;

use hyper::Response;

use crate::http::Body;

pub use directory::DirectoryStore;
pub use memory::MemoryStore;
pub use request::AssetRequest;

/// Failure to answer a lookup
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("asset store did not answer within {0:?}")]
    Timeout(Duration),
    #[error("asset store backend failure: {0}")]
    Backend(String),
}

/// Fetch semantics keyed by request path
#[allow(async_fn_in_trait)]
pub trait AssetStore {
    async fn fetch(&self, request: &AssetRequest) -> Result<Response<Body>, StoreError>;
}
