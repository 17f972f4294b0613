pub mod control;
pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tbm_core::catalog::Catalog;
use tbm_core::clock::SystemClock;
use tbm_core::config::EngineConfig;
use tbm_core::engine::Engine;
use tbm_core::telemetry::SimulatedSource;
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
        // Snapshot
        .route("/api/state", get(routes::state::get_state))
        // Interlocks
        .route("/api/interlocks", get(routes::interlocks::list_interlocks))
        .route(
            "/api/interlocks/{id}",
            get(routes::interlocks::get_interlock),
        )
        .route(
            "/api/interlocks/{id}/trip",
            post(routes::interlocks::trip_interlock),
        )
        .route(
            "/api/interlocks/{id}/reset",
            post(routes::interlocks::reset_interlock),
        )
        .route(
            "/api/interlocks/{id}/clear",
            post(routes::interlocks::clear_interlock),
        )
        // Actuators
        .route("/api/actuators", get(routes::actuators::list_actuators))
        .route("/api/actuators/{id}", post(routes::actuators::set_actuator))
        // Fault
        .route("/api/fault/ack", post(routes::fault::acknowledge_fault))
        // Catalog / config
        .route("/api/catalog", get(routes::catalog::get_catalog))
        .route("/api/config", get(routes::config::get_config))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Build the engine, start the control loop and return the router serving it.
///
/// Telemetry comes from the simulated plant: there is no field-bus driver.
fn start(config: EngineConfig, catalog: Catalog) -> anyhow::Result<Router> {
    for w in config.validate(Some(&catalog)) {
        tracing::warn!(level = ?w.level, "{}", w.message);
    }
    let engine = Engine::new(catalog, config, Box::new(SystemClock))?;
    let app_state = state::AppState::new(&engine);
    let source = SimulatedSource::tbm(None, Arc::new(SystemClock));
    control::spawn(engine, Box::new(source), app_state.event_tx.clone());
    Ok(build_router(app_state))
}

/// Start the control loop and HTTP server on `port`.
pub async fn serve(config: EngineConfig, catalog: Catalog, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(config, catalog, listener).await
}

/// Start the control loop and HTTP server on a pre-bound listener.
///
/// Unlike `serve`, this accepts a `TcpListener` that was already bound so the
/// caller can read the actual port before starting (useful when `port = 0` and
/// the OS picks a free port).
pub async fn serve_on(
    config: EngineConfig,
    catalog: Catalog,
    listener: tokio::net::TcpListener,
) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = start(config, catalog)?;

    tracing::info!("TBM control server listening on http://localhost:{actual_port}");

    axum::serve(listener, app).await?;
    Ok(())
}
