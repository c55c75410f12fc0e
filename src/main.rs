use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use crate::assets::{AssetCache, EmbeddedStore};
use crate::config::{AppState, Config};
use crate::server::ShutdownSignal;

mod assets;
mod config;
mod handler;
mod http;
mod logger;
mod server;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::load()?;
    logger::init(&cfg)?;

    // Build the Tokio runtime, honoring the configured worker count
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
    let listener = server::create_listener(addr)?;

    let cache = Arc::new(AssetCache::new(Arc::new(EmbeddedStore), cfg.cache_policy()));
    let shutdown = Arc::new(ShutdownSignal::new());
    let sweeper = cache.spawn_sweeper(
        Arc::clone(&shutdown.notify),
        Arc::clone(&shutdown.requested),
    );

    server::start_signal_handler(Arc::clone(&shutdown));
    logger::log_server_start(&addr, &cfg);

    let state = Arc::new(AppState::new(cfg, Arc::clone(&cache)));
    let connections = Arc::new(AtomicUsize::new(0));

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        server::accept_connection(stream, peer_addr, &state, &connections);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            _ = shutdown.notify.notified() => break,
        }
    }

    // The sweeper observes the same shutdown signal
    sweeper.await?;
    logger::log_shutdown();

    Ok(())
}
