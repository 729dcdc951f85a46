// Server module entry point
// Accept loop, connection handling and graceful shutdown

pub mod connection;
pub mod listener;
pub mod signal;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::Notify;

use crate::config::Config;
use crate::handler::EdgeRouter;
use crate::logger;
use crate::store::AssetStore;

pub use listener::create_reusable_listener;

/// Poll interval while waiting for connections to drain
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// State shared by every connection
pub struct ServerState<S> {
    pub config: Config,
    pub router: EdgeRouter<S>,
    pub active_connections: AtomicUsize,
    pub shutdown: Arc<Notify>,
}

impl<S: AssetStore> ServerState<S> {
    pub fn new(config: Config, router: EdgeRouter<S>) -> Self {
        Self {
            config,
            router,
            active_connections: AtomicUsize::new(0),
            shutdown: Arc::new(Notify::new()),
        }
    }
}

/// Accept connections until shutdown is requested, then wait up to the
/// write timeout for in-flight connections to finish.
///
/// Must run inside a `tokio::task::LocalSet`.
pub async fn run<S: AssetStore + 'static>(
    listener: TcpListener,
    state: Arc<ServerState<S>>,
) -> Result<(), Box<dyn std::error::Error>> {
    signal::start_signal_handler(Arc::clone(&state.shutdown));

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        connection::accept_connection(stream, peer_addr, &state);
                    }
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }
            () = state.shutdown.notified() => break,
        }
    }

    drop(listener);
    let active = state.active_connections.load(Ordering::SeqCst);
    logger::log_shutdown(active);

    let grace = Duration::from_secs(state.config.performance.write_timeout);
    let deadline = tokio::time::Instant::now() + grace;
    while state.active_connections.load(Ordering::SeqCst) > 0
        && tokio::time::Instant::now() < deadline
    {
        tokio::time::sleep(DRAIN_POLL).await;
    }

    logger::log_info("Server stopped");
    Ok(())
}
