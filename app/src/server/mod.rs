pub mod api;
pub mod router;

use anyhow::Result;

use crate::app::SharedState;

/// Start the axum HTTP server. Returns once the shutdown token fires and
/// in-flight requests have finished.
pub async fn start_server(state: SharedState) -> Result<()> {
    let port = state.server_port();
    let shutdown_token = state.shutdown_token().clone();
    let app = router::create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Overlay server listening on http://{}", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move { shutdown_token.cancelled().await })
        .await?;

    tracing::info!("Overlay server stopped");
    Ok(())
}
