pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use deployq_core::{monitor, BoardGateway, Config, Coordinator, Sink};
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(app_state: state::AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Events (SSE)
        .route("/api/events", get(routes::events::sse_events))
        // State
        .route("/api/state", get(routes::state::get_state))
        .route("/api/tick", post(routes::tick::run_tick))
        // Commands
        .route("/api/queue", post(routes::deploys::enqueue))
        .route("/api/deploys/{user}/start", post(routes::deploys::start))
        .route("/api/deploys/{user}/success", post(routes::deploys::success))
        .route("/api/deploys/{user}/failure", post(routes::deploys::failure))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Bind `0.0.0.0:{port}` and run the queue service until `shutdown`
/// resolves.
pub async fn serve<F>(
    config: Config,
    board: Arc<dyn BoardGateway>,
    port: u16,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    serve_on(config, board, listener, shutdown).await
}

/// Run the queue service on a pre-bound listener.
///
/// Resolves the board's lists first; a missing list aborts start-up. The tick
/// monitor runs alongside the HTTP server and is stopped after the server has
/// drained.
pub async fn serve_on<F>(
    config: Config,
    board: Arc<dyn BoardGateway>,
    listener: tokio::net::TcpListener,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let actual_port = listener.local_addr()?.port();
    let coordinator = Arc::new(Coordinator::connect(board, &config, Sink::new().with_logging()).await?);
    let app = build_router(state::AppState::new(coordinator.clone()));

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let monitor = monitor::spawn(coordinator, config.tick_interval(), async {
        let _ = stop_rx.await;
    });

    tracing::info!("deploy queue server listening on http://localhost:{actual_port}");
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;

    let _ = stop_tx.send(());
    if let Err(e) = monitor.await {
        tracing::warn!(error = %e, "queue monitor task failed");
    }
    served?;
    Ok(())
}
