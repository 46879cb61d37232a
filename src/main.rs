use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;

mod config;
mod handler;
mod http;
mod logger;
mod render;
mod routing;
mod server;
mod wiki;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Optional first argument: config file path (extension may be omitted)
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::Config::load_from(&config_path)?;
    logger::init(&cfg)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;

    // Templates are parsed once here; a broken template set stops startup
    let state = Arc::new(config::AppState::new(&cfg)?);
    state.store.ensure_dir().await?;

    let listener = server::create_reusable_listener(addr)?;
    let signals = Arc::new(server::SignalHandler::new());
    server::start_signal_handler(Arc::clone(&signals))?;

    logger::log_server_start(&addr, &cfg);

    let active_connections = Arc::new(AtomicUsize::new(0));
    server::start_server_loop(
        listener,
        state,
        Arc::clone(&active_connections),
        Arc::clone(&signals.shutdown),
    )
    .await?;

    // In-flight saves finish before the runtime is dropped
    let timeout = Duration::from_secs(cfg.performance.shutdown_timeout);
    let open = server::drain_connections(&active_connections, timeout).await;
    if open > 0 {
        logger::log_warning(&format!(
            "{open} connection(s) still open after {}s, closing them",
            timeout.as_secs()
        ));
    }

    if signals.is_shutdown_requested() {
        logger::log_info("Wiki server stopped");
    }
    Ok(())
}
