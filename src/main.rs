//! line-echo server entry point.

use line_echo::config::Config;
use line_echo::error::ServerError;
use line_echo::server::Server;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), ServerError> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        port = config.port,
        idle_timeout_secs = config.idle_timeout.as_secs(),
        log_dir = %config.log_dir.display(),
        workers = ?config.workers,
        "Starting line-echo server"
    );

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    if let Some(workers) = config.workers {
        builder.worker_threads(workers);
    }
    let runtime = builder.enable_all().build().map_err(ServerError::Runtime)?;

    runtime.block_on(async {
        let server = Server::bind(&config).await?;
        server.run().await;
        Ok::<(), ServerError>(())
    })
}
