//! Upload ingestion: authorize, stage, probe, remux, upload, commit.
//!
//! Every temporary file is held by a [`TempPath`] guard owned by the running
//! request, so it is deleted on success, on any error, and when the request
//! future is dropped mid-upload.

use crate::{
    aspect,
    auth::Authenticator,
    config::Config,
    db::VideoStore,
    error::IngestError,
    ffmpeg::{Prober, Remuxer},
    keys,
    models::VideoRecord,
    staging::{self, THUMBNAIL_STAGING_PREFIX, VIDEO_STAGING_PREFIX},
    storage::ObjectUploader,
};
use bytes::Bytes;
use chrono::Utc;
use futures::Stream;
use std::{fmt, sync::Arc, time::Instant};
use tempfile::TempPath;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const VIDEO_FIELD: &str = "video";
pub const THUMBNAIL_FIELD: &str = "thumbnail";
pub const VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// Position of a video ingestion in its pipeline, recorded for failure logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Authorizing,
    ReceivingUpload,
    Staged,
    Probed,
    Remuxed,
    KeyAssigned,
    Uploaded,
    Committed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Authorizing => "authorizing",
            Stage::ReceivingUpload => "receiving_upload",
            Stage::Staged => "staged",
            Stage::Probed => "probed",
            Stage::Remuxed => "remuxed",
            Stage::KeyAssigned => "key_assigned",
            Stage::Uploaded => "uploaded",
            Stage::Committed => "committed",
        };
        f.write_str(name)
    }
}

/// File extension for an accepted thumbnail MIME type.
pub fn thumbnail_extension(media_type: &str) -> Option<&'static str> {
    match media_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        _ => None,
    }
}

pub struct IngestService {
    config: Arc<Config>,
    auth: Arc<dyn Authenticator>,
    videos: Arc<dyn VideoStore>,
    prober: Arc<dyn Prober>,
    remuxer: Arc<dyn Remuxer>,
    uploader: ObjectUploader,
}

impl IngestService {
    pub fn new(
        config: Arc<Config>,
        auth: Arc<dyn Authenticator>,
        videos: Arc<dyn VideoStore>,
        prober: Arc<dyn Prober>,
        remuxer: Arc<dyn Remuxer>,
        uploader: ObjectUploader,
    ) -> Self {
        Self {
            config,
            auth,
            videos,
            prober,
            remuxer,
            uploader,
        }
    }

    /// Resolve the caller and load the record they must own. Runs before any
    /// byte of the body is read.
    async fn authorize(&self, video_id: Uuid, token: &str) -> Result<VideoRecord, IngestError> {
        let user_id = self.auth.validate(token)?;
        let video = self.videos.get(video_id).await?;

        if video.user_id != user_id {
            return Err(IngestError::NotOwner { user_id, video_id });
        }

        Ok(video)
    }

    /// Ingest a `video/mp4` upload and point the record's `video_url` at the
    /// remuxed object.
    pub async fn ingest_video<S, O, E>(
        &self,
        video_id: Uuid,
        token: &str,
        content_type: Option<&str>,
        body: S,
    ) -> Result<VideoRecord, IngestError>
    where
        S: Stream<Item = Result<O, E>> + Send + 'static,
        O: Into<Bytes> + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    {
        let start = Instant::now();
        let mut stage = Stage::Authorizing;

        let result = self
            .run_video(video_id, token, content_type, body, &mut stage)
            .await;

        match &result {
            Ok(video) => info!(
                video_id = %video_id,
                stage = %stage,
                url = video.video_url.as_deref().unwrap_or_default(),
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "[video_upload] ingestion complete"
            ),
            Err(e) => warn!(
                video_id = %video_id,
                stage = %stage,
                error = %e,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "[video_upload] ingestion failed"
            ),
        }

        result
    }

    async fn run_video<S, O, E>(
        &self,
        video_id: Uuid,
        token: &str,
        content_type: Option<&str>,
        body: S,
        stage: &mut Stage,
    ) -> Result<VideoRecord, IngestError>
    where
        S: Stream<Item = Result<O, E>> + Send + 'static,
        O: Into<Bytes> + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    {
        let mut video = self.authorize(video_id, token).await?;

        *stage = Stage::ReceivingUpload;
        let mut multipart =
            staging::open_multipart(content_type, body, self.config.max_upload_bytes)?;
        let mut field = staging::find_field(&mut multipart, VIDEO_FIELD)
            .await?
            .ok_or_else(|| {
                IngestError::Validation(format!("missing \"{}\" file part", VIDEO_FIELD))
            })?;

        let media_type = field
            .content_type()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_default();
        if media_type != VIDEO_CONTENT_TYPE {
            return Err(IngestError::Validation(format!(
                "invalid file type \"{}\", expected {}",
                media_type, VIDEO_CONTENT_TYPE
            )));
        }

        info!(video_id = %video_id, user_id = %video.user_id, "[video_upload] uploading video");

        let (staged, size) = staging::stage_field(
            &mut field,
            &self.config.temp_dir,
            VIDEO_STAGING_PREFIX,
            ".mp4",
        )
        .await?;
        drop(field);
        *stage = Stage::Staged;
        debug!(video_id = %video_id, path = ?staged, size_bytes = size, "[video_upload] staged");

        let geometry = self.prober.probe(&staged).await?;
        let orientation = aspect::classify(geometry.width, geometry.height);
        *stage = Stage::Probed;
        debug!(
            video_id = %video_id,
            width = geometry.width,
            height = geometry.height,
            orientation = %orientation,
            "[video_upload] probed"
        );

        let remuxed = self.remuxer.remux(&staged).await?;
        let remuxed = TempPath::try_from_path(remuxed).map_err(IngestError::Io)?;
        *stage = Stage::Remuxed;
        debug!(video_id = %video_id, path = ?remuxed, "[video_upload] remuxed for fast start");

        let key = keys::derive_object_key(orientation)?;
        *stage = Stage::KeyAssigned;

        let file = tokio::fs::File::open(&remuxed).await?;
        self.uploader.upload(&key, file, VIDEO_CONTENT_TYPE).await?;
        *stage = Stage::Uploaded;
        debug!(video_id = %video_id, bucket = self.uploader.bucket(), key = %key, "[video_upload] uploaded");

        // The previous object, if any, is left in the bucket.
        video.video_url = Some(self.uploader.object_url(&key));
        video.updated_at = Utc::now();
        self.videos.update(&video).await.map_err(|e| {
            warn!(
                video_id = %video_id,
                key = %key,
                "[video_upload] object stored but metadata commit failed"
            );
            IngestError::from(e)
        })?;
        *stage = Stage::Committed;

        Ok(video)
    }

    /// Ingest a JPEG/PNG thumbnail into the local assets root and point the
    /// record's `thumbnail_url` at it.
    pub async fn ingest_thumbnail<S, O, E>(
        &self,
        video_id: Uuid,
        token: &str,
        content_type: Option<&str>,
        body: S,
    ) -> Result<VideoRecord, IngestError>
    where
        S: Stream<Item = Result<O, E>> + Send + 'static,
        O: Into<Bytes> + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    {
        let result = self
            .run_thumbnail(video_id, token, content_type, body)
            .await;

        match &result {
            Ok(video) => info!(
                video_id = %video_id,
                url = video.thumbnail_url.as_deref().unwrap_or_default(),
                "[thumbnail_upload] thumbnail stored"
            ),
            Err(e) => warn!(video_id = %video_id, error = %e, "[thumbnail_upload] failed"),
        }

        result
    }

    async fn run_thumbnail<S, O, E>(
        &self,
        video_id: Uuid,
        token: &str,
        content_type: Option<&str>,
        body: S,
    ) -> Result<VideoRecord, IngestError>
    where
        S: Stream<Item = Result<O, E>> + Send + 'static,
        O: Into<Bytes> + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    {
        let mut video = self.authorize(video_id, token).await?;

        let mut multipart =
            staging::open_multipart(content_type, body, self.config.max_thumbnail_bytes)?;
        let mut field = staging::find_field(&mut multipart, THUMBNAIL_FIELD)
            .await?
            .ok_or_else(|| {
                IngestError::Validation(format!("missing \"{}\" file part", THUMBNAIL_FIELD))
            })?;

        let media_type = field
            .content_type()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_default();
        let extension = thumbnail_extension(&media_type).ok_or_else(|| {
            IngestError::Validation(format!("unsupported file type \"{}\"", media_type))
        })?;

        info!(video_id = %video_id, user_id = %video.user_id, "[thumbnail_upload] uploading thumbnail");

        let suffix = format!(".{}", extension);
        let (staged, size) = staging::stage_field(
            &mut field,
            &self.config.assets_root,
            THUMBNAIL_STAGING_PREFIX,
            &suffix,
        )
        .await?;

        let filename = format!("{}.{}", video_id, extension);
        let destination = self.config.assets_root.join(&filename);
        staged.persist(&destination).map_err(|e| IngestError::Io(e.error))?;
        debug!(video_id = %video_id, path = ?destination, size_bytes = size, "[thumbnail_upload] written");

        video.thumbnail_url = Some(format!(
            "{}/assets/{}",
            self.config.public_base_url, filename
        ));
        video.updated_at = Utc::now();
        self.videos.update(&video).await?;

        Ok(video)
    }
}
