use std::net::SocketAddr;
use std::time::Duration;
use axum::Router;
use axum_server::Handle;
use tracing::{info, warn};

/// Serves `app` until ctrl-c, then drains in-flight requests.
pub async fn serve(addr: SocketAddr, app: Router) -> anyhow::Result<()> {
    let handle = Handle::new();
    let handle_clone = handle.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Could not listen for ctrl-c: {}", e);
            return;
        }
        info!("Shutdown requested, draining connections...");
        handle_clone.graceful_shutdown(Some(Duration::from_secs(10)));
    });

    info!("PlantGo API listening on http://{}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;

    info!("HTTP server shut down.");
    Ok(())
}
