use crate::{
    auth::AuthError,
    db::StoreError,
    ffmpeg::{ProbeError, RemuxError},
    keys::KeyError,
    models::ErrorResponse,
    staging::StagingError,
    storage::UploadError,
};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{0}")]
    Validation(String),

    #[error("upload exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: u64 },

    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("user {user_id} does not own video {video_id}")]
    NotOwner { user_id: Uuid, video_id: Uuid },

    #[error("video {0} not found")]
    NotFound(Uuid),

    #[error("failed to probe video: {0}")]
    Probe(#[from] ProbeError),

    #[error("failed to process video for fast start: {0}")]
    Remux(#[from] RemuxError),

    #[error("failed to generate object key: {0}")]
    Key(#[from] KeyError),

    #[error("failed to upload video: {0}")]
    Upload(#[from] UploadError),

    #[error("failed to update video metadata: {0}")]
    Store(String),

    #[error("failed to stage upload: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for IngestError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => IngestError::NotFound(id),
            StoreError::Backend(message) => IngestError::Store(message),
        }
    }
}

impl From<StagingError> for IngestError {
    fn from(err: StagingError) -> Self {
        match err {
            StagingError::TooLarge { limit } => IngestError::PayloadTooLarge { limit },
            StagingError::Io(e) => IngestError::Io(e),
            other => IngestError::Validation(other.to_string()),
        }
    }
}

impl IngestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            IngestError::Validation(_) => StatusCode::BAD_REQUEST,
            IngestError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            IngestError::Auth(AuthError::Signing(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            IngestError::Auth(_) | IngestError::NotOwner { .. } => StatusCode::UNAUTHORIZED,
            IngestError::NotFound(_) => StatusCode::NOT_FOUND,
            IngestError::Probe(_)
            | IngestError::Remux(_)
            | IngestError::Key(_)
            | IngestError::Upload(_)
            | IngestError::Store(_)
            | IngestError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            IngestError::Validation(_) => "VALIDATION_ERROR",
            IngestError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            IngestError::Auth(_) => "UNAUTHORIZED",
            IngestError::NotOwner { .. } => "NOT_OWNER",
            IngestError::NotFound(_) => "NOT_FOUND",
            IngestError::Probe(_) | IngestError::Remux(_) => "PROCESSING_ERROR",
            IngestError::Key(_) => "KEY_ERROR",
            IngestError::Upload(_) => "UPLOAD_ERROR",
            IngestError::Store(_) => "STORE_ERROR",
            IngestError::Io(_) => "STAGING_ERROR",
        }
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        if status.is_server_error() {
            error!(error = %self, code, "request failed");
        } else {
            warn!(error = %self, code, "request rejected");
        }

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
