pub mod error;
pub mod handlers;

use std::sync::Arc;

use anyhow::{Result, Context};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::catalog::service::CatalogService;

/// Upper bound for an upload request, photo included.
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogService>,
}

fn cors_layer(front_url: &str) -> Result<CorsLayer> {
    let origin: HeaderValue = front_url
        .parse()
        .with_context(|| format!("Invalid front-end origin: {}", front_url))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any))
}

pub fn router(catalog: Arc<CatalogService>, front_url: &str) -> Result<Router> {
    let state = AppState { catalog };

    Ok(Router::new()
        .route("/", get(handlers::root))
        .route("/items", get(handlers::list_items).post(handlers::add_item))
        .route("/search", get(handlers::search_items))
        .route("/categories", get(handlers::list_categories))
        .route("/image/{filename}", get(handlers::get_image))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors_layer(front_url)?)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

pub async fn serve(app: Router, port: u16) -> Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Catalog API listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await
        .context("Server error")?;
    Ok(())
}
