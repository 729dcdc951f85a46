//! Asset request module
//!
//! The method, URI and headers of an inbound request, detached from its
//! body so the router can replay it against the store.

use hyper::header::HeaderMap;
use hyper::http::request::Parts;
use hyper::{Method, Uri};

#[derive(Debug, Clone)]
pub struct AssetRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
}

impl AssetRequest {
    pub const fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        Self {
            method,
            uri,
            headers,
        }
    }

    pub fn from_parts(parts: &Parts) -> Self {
        Self::new(parts.method.clone(), parts.uri.clone(), parts.headers.clone())
    }

    /// Plain `GET` for `path` with no headers
    pub fn get(path: &str) -> Result<Self, hyper::http::Error> {
        let uri = Uri::builder().path_and_query(path).build()?;
        Ok(Self::new(Method::GET, uri, HeaderMap::new()))
    }

    pub const fn method(&self) -> &Method {
        &self.method
    }

    pub const fn uri(&self) -> &Uri {
        &self.uri
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn is_head(&self) -> bool {
        self.method == Method::HEAD
    }

    /// Header value as a string, if present and visible ASCII
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Synthetic request for a fixed path on the same origin.
    ///
    /// Method and headers are carried over; the query string is dropped.
    pub fn with_path(&self, path: &str) -> Result<Self, hyper::http::Error> {
        let mut builder = Uri::builder();
        if let Some(scheme) = self.uri.scheme() {
            builder = builder.scheme(scheme.clone());
        }
        if let Some(authority) = self.uri.authority() {
            builder = builder.authority(authority.clone());
        }
        let uri = builder.path_and_query(path).build()?;
        Ok(Self::new(self.method.clone(), uri, self.headers.clone()))
    }
}
