use crate::{
    auth::bearer_token,
    error::IngestError,
    models::{AppState, CreateVideoRequest, VideoRecord},
};
use axum::{
    body::Body,
    extract::{Path, Request, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::Json,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

fn parse_video_id(raw: &str) -> Result<Uuid, IngestError> {
    Uuid::parse_str(raw).map_err(|_| IngestError::Validation("Invalid ID".to_string()))
}

fn request_content_type(request: &Request<Body>) -> Option<String> {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

/// Create an empty video record owned by the caller
pub async fn create_video_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreateVideoRequest>,
) -> Result<(StatusCode, Json<VideoRecord>), IngestError> {
    let user_id = state.auth.validate(bearer_token(&headers)?)?;

    if request.title.trim().is_empty() {
        return Err(IngestError::Validation("title is required".to_string()));
    }

    let video = state
        .videos
        .create(VideoRecord::new(user_id, request.title, request.description))
        .await?;

    info!(video_id = %video.id, user_id = %user_id, "[POST /api/videos] created");
    Ok((StatusCode::CREATED, Json(video)))
}

pub async fn get_video_handler(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
) -> Result<Json<VideoRecord>, IngestError> {
    let video_id = parse_video_id(&video_id)?;
    let video = state.videos.get(video_id).await?;
    Ok(Json(video))
}

/// Upload, remux and store the video file for a record
pub async fn upload_video_handler(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
    request: Request<Body>,
) -> Result<Json<VideoRecord>, IngestError> {
    let video_id = parse_video_id(&video_id)?;
    let token = bearer_token(&headers)?;
    let content_type = request_content_type(&request);

    let video = state
        .ingest
        .ingest_video(
            video_id,
            token,
            content_type.as_deref(),
            request.into_body().into_data_stream(),
        )
        .await?;

    Ok(Json(video))
}

/// Store a thumbnail image for a record
pub async fn upload_thumbnail_handler(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
    request: Request<Body>,
) -> Result<Json<VideoRecord>, IngestError> {
    let video_id = parse_video_id(&video_id)?;
    let token = bearer_token(&headers)?;
    let content_type = request_content_type(&request);

    let video = state
        .ingest
        .ingest_thumbnail(
            video_id,
            token,
            content_type.as_deref(),
            request.into_body().into_data_stream(),
        )
        .await?;

    Ok(Json(video))
}
