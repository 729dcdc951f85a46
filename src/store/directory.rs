//! Filesystem asset store
//!
//! Serves the built application directory (e.g. `dist/`) with index file
//! resolution, traversal protection and `ETag` revalidation.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use hyper::body::Bytes;
use hyper::Response;
use tokio::fs;

use super::{AssetRequest, AssetStore, StoreError};
use crate::http::{self, cache, mime, Body};
use crate::logger;

#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
    index_files: Vec<String>,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>, index_files: Vec<String>) -> Self {
        Self {
            root: root.into(),
            index_files,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a URL path to a file inside the root.
    ///
    /// `Ok(None)` means the asset does not exist (or is not reachable from
    /// the root); only a broken root is an error.
    async fn resolve(&self, url_path: &str) -> Result<Option<PathBuf>, StoreError> {
        let Ok(decoded) = urlencoding::decode(url_path) else {
            return Ok(None);
        };

        let relative = Path::new(decoded.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            logger::log_warning(&format!("Path traversal attempt blocked: {url_path}"));
            return Ok(None);
        }

        let root = fs::canonicalize(&self.root)
            .await
            .map_err(|source| StoreError::Io {
                path: self.root.display().to_string(),
                source,
            })?;

        let mut file_path = root.join(relative);
        if decoded.ends_with('/') || is_dir(&file_path).await {
            let mut found = None;
            for index_file in &self.index_files {
                let candidate = file_path.join(index_file);
                if is_file(&candidate).await {
                    found = Some(candidate);
                    break;
                }
            }
            match found {
                Some(index_path) => file_path = index_path,
                None => return Ok(None),
            }
        }

        // Missing files are the common case, not worth a warning
        let Ok(canonical) = fs::canonicalize(&file_path).await else {
            return Ok(None);
        };
        if !canonical.starts_with(&root) {
            logger::log_warning(&format!(
                "Path traversal attempt blocked: {} -> {}",
                url_path,
                canonical.display()
            ));
            return Ok(None);
        }

        Ok(Some(canonical))
    }
}

impl AssetStore for DirectoryStore {
    async fn fetch(&self, request: &AssetRequest) -> Result<Response<Body>, StoreError> {
        let Some(file_path) = self.resolve(request.path()).await? else {
            return Ok(http::build_404_response());
        };

        let content = match fs::read(&file_path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(http::build_404_response()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: file_path.display().to_string(),
                    source,
                })
            }
        };

        let etag = cache::generate_etag(&content);
        if cache::check_etag_match(request.header("if-none-match"), &etag) {
            return Ok(http::build_304_response(&etag));
        }

        let content_type = mime::get_content_type(file_path.extension().and_then(|e| e.to_str()));
        Ok(http::build_asset_response(
            Bytes::from(content),
            content_type,
            &etag,
            request.is_head(),
        ))
    }
}

async fn is_dir(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|m| m.is_dir())
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|m| m.is_file())
}
