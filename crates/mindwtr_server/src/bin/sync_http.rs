#![forbid(unsafe_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use mindwtr_server::{bind_addr_from_env, router, AppState, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();
    if let Err(reason) = config.ensure_data_dir() {
        // A data dir we cannot write to means every request would fail;
        // refuse to start instead.
        return Err(reason.into());
    }
    if config.allowed_tokens.is_none() {
        tracing::warn!("no auth tokens configured; every bearer token is accepted");
    }

    let bind = bind_addr_from_env();
    let addr: SocketAddr = bind.parse()?;
    let sweep_interval_ms = config.sweep_interval_ms;
    let state = Arc::new(AppState::new(config));

    let state_for_sweeper = state.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(sweep_interval_ms));
        loop {
            ticker.tick().await;
            let now_ms = state_for_sweeper.now_ms();
            state_for_sweeper.rate_limiter.sweep(now_ms);
            state_for_sweeper.write_locks.prune();
        }
    });

    let app = router(state);

    tracing::info!("mindwtr_sync_http listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
