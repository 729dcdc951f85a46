//! In-memory asset store
//!
//! A path-keyed namespace of assets, the analogue of an edge KV binding.
//! Used for embedding prebuilt bundles and in tests.

use std::collections::HashMap;

use hyper::body::Bytes;
use hyper::Response;

use super::{AssetRequest, AssetStore, StoreError};
use crate::http::{self, cache, mime, Body};

const INDEX_FILE: &str = "index.html";

#[derive(Debug, Clone)]
struct Asset {
    content_type: &'static str,
    data: Bytes,
    etag: String,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    assets: HashMap<String, Asset>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an asset, deriving its content type from the path
    pub fn insert(&mut self, path: &str, data: impl Into<Bytes>) -> &mut Self {
        let content_type = mime::content_type_for_path(path);
        self.insert_with_type(path, content_type, data)
    }

    pub fn insert_with_type(
        &mut self,
        path: &str,
        content_type: &'static str,
        data: impl Into<Bytes>,
    ) -> &mut Self {
        let data = data.into();
        let etag = cache::generate_etag(&data);
        self.assets.insert(
            path.to_string(),
            Asset {
                content_type,
                data,
                etag,
            },
        );
        self
    }

    /// Builder-style `insert`
    #[must_use]
    pub fn with(mut self, path: &str, data: impl Into<Bytes>) -> Self {
        self.insert(path, data);
        self
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Exact key first; a directory path (`/docs/`) maps to its index file.
    /// Keys are matched against the percent-decoded path.
    fn lookup(&self, raw_path: &str) -> Option<&Asset> {
        let path = urlencoding::decode(raw_path).ok()?;
        let path = path.as_ref();
        self.assets.get(path).or_else(|| {
            path.ends_with('/')
                .then(|| format!("{path}{INDEX_FILE}"))
                .and_then(|p| self.assets.get(&p))
        })
    }
}

impl AssetStore for MemoryStore {
    async fn fetch(&self, request: &AssetRequest) -> Result<Response<Body>, StoreError> {
        let Some(asset) = self.lookup(request.path()) else {
            return Ok(http::build_404_response());
        };

        if cache::check_etag_match(request.header("if-none-match"), &asset.etag) {
            return Ok(http::build_304_response(&asset.etag));
        }

        Ok(http::build_asset_response(
            asset.data.clone(),
            asset.content_type,
            &asset.etag,
            request.is_head(),
        ))
    }
}
