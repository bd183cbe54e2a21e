pub mod aspect;
pub mod auth;
pub mod cleanup;
pub mod config;
pub mod db;
pub mod error;
pub mod ffmpeg;
pub mod handlers;
pub mod ingest;
pub mod keys;
pub mod models;
pub mod staging;
pub mod storage;
pub mod system_info;

use axum::{
    routing::{get, post},
    Router,
};
use models::AppState;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

pub fn build_router(state: Arc<AppState>) -> Router {
    let assets = ServeDir::new(&state.config.assets_root);

    Router::new()
        .route("/api/videos", post(handlers::create_video_handler))
        .route("/api/videos/:video_id", get(handlers::get_video_handler))
        .route(
            "/api/video_upload/:video_id",
            post(handlers::upload_video_handler),
        )
        .route(
            "/api/thumbnail_upload/:video_id",
            post(handlers::upload_thumbnail_handler),
        )
        .nest_service("/assets", assets)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
