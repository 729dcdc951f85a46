// Connection module
// Accepts TCP connections and serves HTTP/1 requests through the edge router

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hyper::body::{Body as _, Incoming};
use hyper::header::{HeaderValue, REFERER, SERVER, USER_AGENT};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, Version};
use hyper_util::rt::TokioIo;

use super::ServerState;
use crate::http::Body;
use crate::logger::{self, AccessLogEntry};
use crate::store::{AssetRequest, AssetStore};

/// Accept a connection, enforcing the connection limit.
///
/// The counter is incremented before the limit check so concurrent accepts
/// cannot both slip under it.
pub fn accept_connection<S: AssetStore + 'static>(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<ServerState<S>>,
) {
    let prev_count = state.active_connections.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            state.active_connections.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection rejected."
            ));
            drop(stream);
            return;
        }
    }

    if let Err(e) = stream.set_nodelay(true) {
        logger::log_warning(&format!("Failed to set TCP_NODELAY for {peer_addr}: {e}"));
    }
    logger::log_connection_accepted(&peer_addr);

    handle_connection(stream, peer_addr, Arc::clone(state));
}

/// Serve one connection on the local task set, bounded by the larger of the
/// read and write timeouts.
fn handle_connection<S: AssetStore + 'static>(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: Arc<ServerState<S>>,
) {
    tokio::task::spawn_local(async move {
        let io = TokioIo::new(stream);
        let perf = &state.config.performance;
        let timeout_duration =
            Duration::from_secs(std::cmp::max(perf.read_timeout, perf.write_timeout));

        let mut builder = http1::Builder::new();
        builder.keep_alive(perf.keep_alive_timeout > 0);

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req: Request<Incoming>| {
                let state = Arc::clone(&service_state);
                async move { Ok::<_, Infallible>(serve_request(req, peer_addr, &state).await) }
            }),
        );

        match tokio::time::timeout(timeout_duration, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => logger::log_warning(&format!(
                "Connection from {peer_addr} timed out after {} seconds",
                timeout_duration.as_secs()
            )),
        }

        state.active_connections.fetch_sub(1, Ordering::SeqCst);
    });
}

/// Hyper entry point: the request body is never read
async fn serve_request<S: AssetStore>(
    req: Request<Incoming>,
    peer_addr: SocketAddr,
    state: &ServerState<S>,
) -> Response<Body> {
    let (parts, _body) = req.into_parts();
    let request = AssetRequest::from_parts(&parts);
    respond(&request, parts.version, peer_addr, state).await
}

/// Route one request, stamp the `Server` header and write the access log
pub async fn respond<S: AssetStore>(
    request: &AssetRequest,
    version: Version,
    peer_addr: SocketAddr,
    state: &ServerState<S>,
) -> Response<Body> {
    let started = Instant::now();
    let routed = state.router.route(request).await;
    let mut response = routed.response;

    if let Ok(server_name) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, server_name);
    }

    let logging = &state.config.logging;
    if logging.access_log {
        let mut entry = AccessLogEntry::new(
            peer_addr.ip().to_string(),
            request.method().to_string(),
            request.path().to_string(),
        );
        entry.query = request.uri().query().map(ToString::to_string);
        entry.http_version = version_label(version).to_string();
        entry.status = response.status().as_u16();
        entry.body_bytes = response.body().size_hint().exact().unwrap_or(0);
        entry.referer = request.header(REFERER.as_str()).map(ToString::to_string);
        entry.user_agent = request.header(USER_AGENT.as_str()).map(ToString::to_string);
        entry.route = routed.outcome.as_str();
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &logging.access_log_format);
    }

    response
}

const fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
