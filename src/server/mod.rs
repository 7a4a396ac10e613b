mod handlers;
mod state;

use axum::routing::get;
use axum::Router;
use state::AppState;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::reference::GeoResolver;

pub fn build_router(resolver: Arc<GeoResolver>) -> Router {
    let state = Arc::new(AppState { resolver });

    Router::new()
        .route("/api/countries", get(handlers::countries))
        .route("/api/subdivisions", get(handlers::subdivisions))
        .route("/api/cities", get(handlers::cities))
        .route("/api/bounds", get(handlers::bounds))
        .route("/api/resolve", get(handlers::resolve))
        .route("/api/status", get(handlers::status))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start(host: &str, port: u16, resolver: Arc<GeoResolver>) -> std::io::Result<()> {
    let app = build_router(resolver);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(%addr, "server listening");
    eprintln!("  georef server listening on http://{}", addr);
    eprintln!("  Press Ctrl+C to stop.");

    axum::serve(listener, app).await
}
