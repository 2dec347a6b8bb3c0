use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    response::Json,
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, warn};

use crate::db::BlockStore;
use crate::error::{AppError, AppResult};
use crate::types::BlockRecord;

// App state to hold the storage seam
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BlockStore>,
}

// Create the main router with all endpoints
pub fn create_router(store: Arc<dyn BlockStore>, allowed_origin: &str) -> Router {
    let state = AppState { store };

    Router::new()
        .route("/api/btc-block", get(get_latest_block))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(allowed_origin)),
        )
}

// Single configured origin, not permissive
fn cors_layer(allowed_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    match allowed_origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(e) => {
            warn!("Invalid CORS origin {allowed_origin:?}, cross-origin requests disabled: {e}");
            cors
        }
    }
}

// Liveness probe: always OK, independent of database state
async fn health_check() -> &'static str {
    "OK"
}

// Latest stored row, newest first by insertion order
async fn get_latest_block(State(state): State<AppState>) -> AppResult<Json<BlockRecord>> {
    let row = state.store.latest_block().await.map_err(|e| {
        error!("Latest-block query failed: {e:#}");
        AppError::Internal(e)
    })?;

    match row {
        Some(block) => Ok(Json(block)),
        None => Err(AppError::NotFound("No block data found".to_string())),
    }
}
