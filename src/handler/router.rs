//! Edge asset router
//!
//! Decides, per request, between serving the literal asset and serving the
//! application's root document so client-side routing can take over:
//!
//! 1. paths with a static asset extension go straight to the store, and the
//!    store's answer (including its 404) is final;
//! 2. any other path is tried directly, and a status below 400 is final;
//! 3. otherwise the fallback document is fetched once and returned.
//!
//! `handle` always produces a response; store failures end in a 404 or 500.

use std::collections::HashSet;
use std::time::Duration;

use hyper::{Method, Response, StatusCode};

use crate::config::{normalize_extension, RouterConfig};
use crate::http::{self, cache, mime, Body};
use crate::logger;
use crate::store::{AssetRequest, AssetStore, StoreError};

const GENERIC_ERROR_BODY: &str = "Internal Error";

/// Terminal state a request ended in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Served straight from the store
    Direct,
    /// Served the root document in place of a missing route
    Fallback,
    /// Method not served by the edge (OPTIONS or 405)
    Rejected,
    /// Neither the asset nor the fallback could be served
    Error,
}

impl RouteOutcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Fallback => "fallback",
            Self::Rejected => "rejected",
            Self::Error => "error",
        }
    }
}

/// Response paired with the outcome that produced it
#[derive(Debug)]
pub struct Routed {
    pub response: Response<Body>,
    pub outcome: RouteOutcome,
}

impl Routed {
    fn new(response: Response<Body>, outcome: RouteOutcome) -> Self {
        Self { response, outcome }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("cannot build fallback request for '{path}': {source}")]
    InvalidUri {
        path: String,
        #[source]
        source: hyper::http::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct EdgeRouter<S> {
    config: RouterConfig,
    extensions: HashSet<String>,
    enable_cors: bool,
    store: S,
}

impl<S: AssetStore> EdgeRouter<S> {
    pub fn new(config: RouterConfig, store: S) -> Self {
        let extensions = config
            .asset_extensions
            .iter()
            .map(|e| normalize_extension(e))
            .filter(|e| !e.is_empty())
            .collect();
        Self {
            config,
            extensions,
            enable_cors: false,
            store,
        }
    }

    #[must_use]
    pub fn with_cors(mut self, enable_cors: bool) -> Self {
        self.enable_cors = enable_cors;
        self
    }

    pub const fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Whether `path` ends in a static asset extension (case-insensitive)
    pub fn is_asset_path(&self, path: &str) -> bool {
        mime::path_extension(path)
            .is_some_and(|ext| self.extensions.contains(&ext.to_ascii_lowercase()))
    }

    /// Answer a request. Never fails.
    pub async fn handle(&self, request: &AssetRequest) -> Response<Body> {
        self.route(request).await.response
    }

    /// Answer a request and report which path of the policy served it
    pub async fn route(&self, request: &AssetRequest) -> Routed {
        match request.method() {
            &Method::GET | &Method::HEAD => {}
            &Method::OPTIONS => {
                return Routed::new(
                    http::build_options_response(self.enable_cors),
                    RouteOutcome::Rejected,
                );
            }
            method => {
                logger::log_warning(&format!("Method not allowed: {method}"));
                return Routed::new(http::build_405_response(), RouteOutcome::Rejected);
            }
        }

        if self.is_asset_path(request.path()) {
            return self.serve_asset(request).await;
        }

        match self.fetch(request).await {
            Ok(response) if is_success(response.status()) => {
                return Routed::new(self.finish_direct(response), RouteOutcome::Direct);
            }
            Ok(_) => {}
            Err(e) => {
                logger::log_warning(&format!(
                    "Direct fetch failed for {}, serving fallback: {e}",
                    request.path()
                ));
            }
        }

        self.serve_fallback(request).await
    }

    /// Static asset paths: the store's answer is final
    async fn serve_asset(&self, request: &AssetRequest) -> Routed {
        match self.fetch(request).await {
            Ok(response) => Routed::new(self.finish_direct(response), RouteOutcome::Direct),
            Err(e) => {
                let err = RouterError::from(e);
                logger::log_error(&format!("Asset fetch failed for {}: {err}", request.path()));
                Routed::new(self.error_response(&err), RouteOutcome::Error)
            }
        }
    }

    async fn serve_fallback(&self, request: &AssetRequest) -> Routed {
        let path = &self.config.fallback_path;
        let fallback_request = match request.with_path(path) {
            Ok(r) => r,
            Err(source) => {
                let err = RouterError::InvalidUri {
                    path: path.clone(),
                    source,
                };
                logger::log_error(&err.to_string());
                return Routed::new(self.error_response(&err), RouteOutcome::Error);
            }
        };

        match self.fetch(&fallback_request).await {
            Ok(mut response) if is_success(response.status()) => {
                // 304 has no body to promote
                if self.config.force_fallback_status_200
                    && response.status() != StatusCode::NOT_MODIFIED
                {
                    *response.status_mut() = StatusCode::OK;
                }
                Routed::new(response, RouteOutcome::Fallback)
            }
            Ok(response) => {
                logger::log_error(&format!(
                    "Fallback document {path} unavailable: status {}",
                    response.status()
                ));
                Routed::new(http::build_404_response(), RouteOutcome::Error)
            }
            Err(e) => {
                logger::log_error(&format!("Fallback document {path} unavailable: {e}"));
                Routed::new(http::build_404_response(), RouteOutcome::Error)
            }
        }
    }

    /// One store fetch, bounded by `fetch_timeout_ms` (0 disables the bound)
    async fn fetch(&self, request: &AssetRequest) -> Result<Response<Body>, StoreError> {
        if self.config.fetch_timeout_ms == 0 {
            return self.store.fetch(request).await;
        }
        let budget = Duration::from_millis(self.config.fetch_timeout_ms);
        tokio::time::timeout(budget, self.store.fetch(request))
            .await
            .map_err(|_| StoreError::Timeout(budget))?
    }

    fn finish_direct(&self, mut response: Response<Body>) -> Response<Body> {
        if let Some(value) = &self.config.cache_control {
            if !self.config.debug && is_success(response.status()) {
                cache::apply_cache_control(&mut response, value);
            }
        }
        response
    }

    fn error_response(&self, err: &RouterError) -> Response<Body> {
        if self.config.debug {
            http::build_500_response(&err.to_string())
        } else {
            http::build_500_response(GENERIC_ERROR_BODY)
        }
    }
}

fn is_success(status: StatusCode) -> bool {
    status.as_u16() < 400
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::build_asset_response;
    use crate::store::MemoryStore;
    use http_body_util::BodyExt;
    use hyper::body::Bytes;
    use hyper::header::{HeaderMap, CACHE_CONTROL};
    use std::collections::HashMap;
    use std::sync::Mutex;

    const INDEX: &str = "<!doctype html><div id=root></div>";

    enum Behavior {
        Respond(u16, &'static str),
        Fail,
        Hang,
    }

    /// Store answering from a script and recording every path it was asked for
    #[derive(Default)]
    struct ScriptedStore {
        script: HashMap<&'static str, Behavior>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedStore {
        fn on(mut self, path: &'static str, behavior: Behavior) -> Self {
            self.script.insert(path, behavior);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl AssetStore for ScriptedStore {
        async fn fetch(&self, request: &AssetRequest) -> Result<Response<Body>, StoreError> {
            self.calls.lock().unwrap().push(request.path().to_string());
            match self.script.get(request.path()) {
                Some(Behavior::Respond(status, body)) => {
                    let mut resp = build_asset_response(
                        Bytes::from_static(body.as_bytes()),
                        "text/html",
                        "\"t\"",
                        false,
                    );
                    *resp.status_mut() = StatusCode::from_u16(*status).unwrap();
                    Ok(resp)
                }
                Some(Behavior::Fail) => Err(StoreError::Backend("connection reset".into())),
                Some(Behavior::Hang) => std::future::pending().await,
                None => Ok(http::build_404_response()),
            }
        }
    }

    fn router(store: ScriptedStore) -> EdgeRouter<ScriptedStore> {
        EdgeRouter::new(RouterConfig::default(), store)
    }

    fn get(path: &str) -> AssetRequest {
        AssetRequest::get(path).unwrap()
    }

    fn request(method: Method, path: &str) -> AssetRequest {
        AssetRequest::new(method, path.parse().unwrap(), HeaderMap::new())
    }

    async fn body(resp: Response<Body>) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_missing_route_serves_index() {
        let router = router(ScriptedStore::default().on("/index.html", Behavior::Respond(200, INDEX)));
        let routed = router.route(&get("/dashboard")).await;
        assert_eq!(routed.outcome, RouteOutcome::Fallback);
        assert_eq!(routed.response.status(), StatusCode::OK);
        assert_eq!(body(routed.response).await, INDEX);
        assert_eq!(router.store().calls(), vec!["/dashboard", "/index.html"]);
    }

    #[tokio::test]
    async fn test_existing_asset_served_directly() {
        let store = MemoryStore::new()
            .with("/logo.png", vec![1u8, 2, 3])
            .with("/index.html", INDEX);
        let router = EdgeRouter::new(RouterConfig::default(), store);
        let resp = router.handle(&get("/logo.png")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["Content-Type"], "image/png");
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], &[1, 2, 3]);
    }

    #[tokio::test]
    async fn test_missing_asset_returns_store_404_without_fallback() {
        let router = router(ScriptedStore::default().on("/index.html", Behavior::Respond(200, INDEX)));
        let routed = router.route(&get("/logo.png")).await;
        assert_eq!(routed.outcome, RouteOutcome::Direct);
        assert_eq!(routed.response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(routed.response).await, "Not Found");
        assert_eq!(router.store().calls(), vec!["/logo.png"]);
    }

    #[tokio::test]
    async fn test_store_error_serves_fallback() {
        let router = router(
            ScriptedStore::default()
                .on("/profile", Behavior::Fail)
                .on("/index.html", Behavior::Respond(200, INDEX)),
        );
        let routed = router.route(&get("/profile")).await;
        assert_eq!(routed.outcome, RouteOutcome::Fallback);
        assert_eq!(body(routed.response).await, INDEX);
        assert_eq!(router.store().calls(), vec!["/profile", "/index.html"]);
    }

    #[tokio::test]
    async fn test_success_below_400_returned_verbatim() {
        let router = router(
            ScriptedStore::default()
                .on("/about", Behavior::Respond(203, "about page"))
                .on("/moved", Behavior::Respond(301, "")),
        );
        let resp = router.handle(&get("/about")).await;
        assert_eq!(resp.status(), StatusCode::NON_AUTHORITATIVE_INFORMATION);
        assert_eq!(body(resp).await, "about page");

        let resp = router.handle(&get("/moved")).await;
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(router.store().calls(), vec!["/about", "/moved"]);
    }

    #[tokio::test]
    async fn test_server_error_status_triggers_fallback() {
        let router = router(
            ScriptedStore::default()
                .on("/meals", Behavior::Respond(503, "busy"))
                .on("/index.html", Behavior::Respond(200, INDEX)),
        );
        let routed = router.route(&get("/meals")).await;
        assert_eq!(routed.outcome, RouteOutcome::Fallback);
        assert_eq!(body(routed.response).await, INDEX);
    }

    #[tokio::test]
    async fn test_fallback_status_forced_to_200() {
        let store = || {
            ScriptedStore::default().on("/index.html", Behavior::Respond(203, INDEX))
        };

        let resp = router(store()).handle(&get("/fitness")).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let config = RouterConfig {
            force_fallback_status_200: false,
            ..RouterConfig::default()
        };
        let resp = EdgeRouter::new(config, store()).handle(&get("/fitness")).await;
        assert_eq!(resp.status(), StatusCode::NON_AUTHORITATIVE_INFORMATION);
    }

    #[tokio::test]
    async fn test_fallback_not_modified_kept() {
        let router = router(ScriptedStore::default().on("/index.html", Behavior::Respond(304, "")));
        let resp = router.handle(&get("/community")).await;
        assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn test_root_fallback_path() {
        let config = RouterConfig {
            fallback_path: "/".to_string(),
            ..RouterConfig::default()
        };
        let router = EdgeRouter::new(
            config,
            ScriptedStore::default().on("/", Behavior::Respond(200, INDEX)),
        );
        let resp = router.handle(&get("/onboarding?step=2")).await;
        assert_eq!(body(resp).await, INDEX);
        assert_eq!(router.store().calls(), vec!["/onboarding", "/"]);
    }

    #[tokio::test]
    async fn test_missing_fallback_is_terminal_404() {
        let router = router(ScriptedStore::default());
        let routed = router.route(&get("/dashboard")).await;
        assert_eq!(routed.outcome, RouteOutcome::Error);
        assert_eq!(routed.response.status(), StatusCode::NOT_FOUND);
        assert_eq!(router.store().calls(), vec!["/dashboard", "/index.html"]);
    }

    #[tokio::test]
    async fn test_failing_fallback_is_terminal_404() {
        let router = router(
            ScriptedStore::default()
                .on("/dashboard", Behavior::Fail)
                .on("/index.html", Behavior::Fail),
        );
        let routed = router.route(&get("/dashboard")).await;
        assert_eq!(routed.outcome, RouteOutcome::Error);
        assert_eq!(routed.response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_asset_store_error_is_500() {
        let router = router(ScriptedStore::default().on("/app.js", Behavior::Fail));
        let routed = router.route(&get("/app.js")).await;
        assert_eq!(routed.outcome, RouteOutcome::Error);
        assert_eq!(routed.response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body(routed.response).await, GENERIC_ERROR_BODY);
        assert_eq!(router.store().calls(), vec!["/app.js"]);
    }

    #[tokio::test]
    async fn test_debug_exposes_error_detail() {
        let config = RouterConfig {
            debug: true,
            ..RouterConfig::default()
        };
        let router = EdgeRouter::new(config, ScriptedStore::default().on("/app.css", Behavior::Fail));
        let resp = router.handle(&get("/app.css")).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body(resp).await.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_unbuildable_fallback_request_is_500() {
        let config = RouterConfig {
            fallback_path: "/bad path".to_string(),
            ..RouterConfig::default()
        };
        let router = EdgeRouter::new(config.clone(), ScriptedStore::default());
        let routed = router.route(&get("/dashboard")).await;
        assert_eq!(routed.outcome, RouteOutcome::Error);
        assert_eq!(routed.response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body(routed.response).await, GENERIC_ERROR_BODY);
        assert_eq!(router.store().calls(), vec!["/dashboard"]);

        let debug = RouterConfig {
            debug: true,
            ..config
        };
        let resp = EdgeRouter::new(debug, ScriptedStore::default())
            .handle(&get("/dashboard"))
            .await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body(resp)
            .await
            .contains("cannot build fallback request for '/bad path'"));
    }

    #[tokio::test]
    async fn test_dotted_extensions_still_short_circuit() {
        let config = RouterConfig {
            asset_extensions: vec![".JS".to_string(), " .css ".to_string()],
            ..RouterConfig::default()
        };
        let store = MemoryStore::new().with("/index.html", INDEX);
        let router = EdgeRouter::new(config, store);
        assert!(router.is_asset_path("/missing.js"));
        assert!(router.is_asset_path("/theme.css"));

        let routed = router.route(&get("/missing.js")).await;
        assert_eq!(routed.outcome, RouteOutcome::Direct);
        assert_eq!(routed.response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(routed.response).await, "Not Found");
    }

    #[tokio::test]
    async fn test_hung_fetch_times_out_into_fallback() {
        let config = RouterConfig {
            fetch_timeout_ms: 20,
            ..RouterConfig::default()
        };
        let router = EdgeRouter::new(
            config,
            ScriptedStore::default()
                .on("/progress", Behavior::Hang)
                .on("/index.html", Behavior::Respond(200, INDEX)),
        );
        let routed = router.route(&get("/progress")).await;
        assert_eq!(routed.outcome, RouteOutcome::Fallback);
        assert_eq!(body(routed.response).await, INDEX);
    }

    #[tokio::test]
    async fn test_hung_fallback_times_out_into_404() {
        let config = RouterConfig {
            fetch_timeout_ms: 20,
            ..RouterConfig::default()
        };
        let router = EdgeRouter::new(
            config,
            ScriptedStore::default().on("/index.html", Behavior::Hang),
        );
        let resp = router.handle(&get("/progress")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_non_get_methods_rejected() {
        let router = router(ScriptedStore::default());
        let routed = router.route(&request(Method::POST, "/dashboard")).await;
        assert_eq!(routed.outcome, RouteOutcome::Rejected);
        assert_eq!(routed.response.status(), StatusCode::METHOD_NOT_ALLOWED);

        let resp = router.handle(&request(Method::OPTIONS, "/dashboard")).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(router.store().calls().is_empty());
    }

    #[tokio::test]
    async fn test_head_follows_same_policy() {
        let router = router(ScriptedStore::default().on("/index.html", Behavior::Respond(200, INDEX)));
        let routed = router.route(&request(Method::HEAD, "/meals")).await;
        assert_eq!(routed.outcome, RouteOutcome::Fallback);
        assert_eq!(router.store().calls(), vec!["/meals", "/index.html"]);
    }

    #[tokio::test]
    async fn test_cache_control_applied_to_direct_success_only() {
        let config = RouterConfig {
            cache_control: Some("public, max-age=3600".to_string()),
            ..RouterConfig::default()
        };
        let store = MemoryStore::new().with("/app.js", "x").with("/index.html", INDEX);
        let router = EdgeRouter::new(config.clone(), store.clone());

        let resp = router.handle(&get("/app.js")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[CACHE_CONTROL], "public, max-age=3600");
        assert_eq!(body(resp).await, "x");

        let resp = router.handle(&get("/missing.js")).await;
        assert!(resp.headers().get(CACHE_CONTROL).is_none());

        let resp = router.handle(&get("/dashboard")).await;
        assert!(resp.headers().get(CACHE_CONTROL).is_none());

        let debug = RouterConfig {
            debug: true,
            ..config
        };
        let resp = EdgeRouter::new(debug, store).handle(&get("/app.js")).await;
        assert!(resp.headers().get(CACHE_CONTROL).is_none());
    }

    #[test]
    fn test_extension_match_is_case_insensitive_and_last_segment_only() {
        let router = router(ScriptedStore::default());
        assert!(router.is_asset_path("/static/app.JS"));
        assert!(router.is_asset_path("/fonts/inter.woff2"));
        assert!(!router.is_asset_path("/assets.js/page"));
        assert!(!router.is_asset_path("/report.pdf"));
        assert!(!router.is_asset_path("/dashboard"));
    }

    #[tokio::test]
    async fn test_repeated_requests_route_identically() {
        let router = router(
            ScriptedStore::default()
                .on("/profile", Behavior::Fail)
                .on("/index.html", Behavior::Respond(200, INDEX)),
        );
        for _ in 0..3 {
            let routed = router.route(&get("/profile")).await;
            assert_eq!(routed.outcome, RouteOutcome::Fallback);
            assert_eq!(routed.response.status(), StatusCode::OK);
        }
        assert_eq!(router.store().calls().len(), 6);
    }
}
