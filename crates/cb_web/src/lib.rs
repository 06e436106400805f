use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

pub mod handlers;
pub mod state;

pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/api/trigger", post(handlers::trigger))
        .route("/api/jobs/:id", get(handlers::get_job))
        .route("/api/articles", get(handlers::list_articles))
        .route("/api/archive/:year/:week", get(handlers::get_newsletter))
        .layer(cors)
        .with_state(Arc::new(state))
}

pub async fn serve(state: AppState, port: u16) -> cb_core::Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("🌐 Listening on port {}", port);
    axum::serve(listener, app).await?;
    Ok(())
}

pub mod prelude {
    pub use crate::{create_app, serve, AppState};
    pub use cb_core::{Error, Result};
}
