use std::sync::Arc;

use spa_edge_router::config::Config;
use spa_edge_router::handler::EdgeRouter;
use spa_edge_router::logger;
use spa_edge_router::server::{self, ServerState};
use spa_edge_router::store::DirectoryStore;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::load()?;
    logger::init(&cfg)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_reusable_listener(addr)?;

    let store = DirectoryStore::new(&cfg.store.root, cfg.store.index_files.clone());
    if !store.root().is_dir() {
        logger::log_warning(&format!(
            "Asset root '{}' is not a directory; every request will end in an error response",
            cfg.store.root
        ));
    }
    let router = EdgeRouter::new(cfg.router.clone(), store).with_cors(cfg.http.enable_cors);

    logger::log_server_start(&addr, &cfg);
    let state = Arc::new(ServerState::new(cfg, router));

    // Connections are served with spawn_local
    let local = tokio::task::LocalSet::new();
    local.run_until(server::run(listener, state)).await
}
