//! Shared fixtures for ingestion tests: fake ffprobe/ffmpeg, an in-memory
//! bucket and a record store seeded with one video.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Duration;
use object_store::memory::InMemory;
use object_store::ObjectStore;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;
use video_ingest_backend::{
    auth::JwtAuthenticator,
    config::{Config, S3Config},
    db::{InMemoryVideoStore, StoreError, VideoStore},
    ffmpeg::{fast_start_output_path, Geometry, ProbeError, Prober, RemuxError, Remuxer},
    ingest::IngestService,
    models::{AppState, VideoRecord},
    storage::ObjectUploader,
};

pub const BOUNDARY: &str = "------------------------tubely-test";
pub const JWT_SECRET: &str = "test-secret";
pub const BUCKET: &str = "tubely-test";
pub const REGION: &str = "us-east-2";

/// `ftyp` box of an ISO base media file; enough for the fakes, which never decode.
pub fn tiny_mp4() -> Vec<u8> {
    let mut data = vec![0x00, 0x00, 0x00, 0x18];
    data.extend_from_slice(b"ftypisom");
    data.extend_from_slice(&[0x00, 0x00, 0x02, 0x00]);
    data.extend_from_slice(b"isomiso2");
    data.extend_from_slice(&[0u8; 256]);
    data
}

pub struct Part<'a> {
    pub name: &'a str,
    pub filename: &'a str,
    pub content_type: &'a str,
    pub data: &'a [u8],
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut out = Vec::new();
    for part in parts {
        out.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        out.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                part.name, part.filename
            )
            .as_bytes(),
        );
        out.extend_from_slice(format!("Content-Type: {}\r\n\r\n", part.content_type).as_bytes());
        out.extend_from_slice(part.data);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    out
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}

/// Split a body into small chunks so staging sees a real stream.
pub fn chunked(
    body: Vec<u8>,
) -> impl futures::Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
    let chunks: Vec<Result<Bytes, std::io::Error>> = body
        .chunks(97)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    futures::stream::iter(chunks)
}

pub struct FakeProber {
    pub geometry: Option<Geometry>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl Prober for FakeProber {
    async fn probe(&self, path: &Path) -> Result<Geometry, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(path.exists(), "probe ran on a missing file");
        self.geometry
            .ok_or_else(|| ProbeError::NoVideoStream(path.to_path_buf()))
    }
}

/// Copies the input to the fast-start path instead of running ffmpeg.
pub struct CopyRemuxer {
    pub fail: bool,
    pub calls: AtomicUsize,
}

#[async_trait]
impl Remuxer for CopyRemuxer {
    async fn remux(&self, input: &Path) -> Result<PathBuf, RemuxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RemuxError::Failed("moov atom not found".to_string()));
        }
        let output = fast_start_output_path(input);
        tokio::fs::copy(input, &output)
            .await
            .map_err(RemuxError::Spawn)?;
        Ok(output)
    }
}

/// Record store whose updates always fail.
pub struct ReadOnlyVideoStore {
    pub inner: InMemoryVideoStore,
}

#[async_trait]
impl VideoStore for ReadOnlyVideoStore {
    async fn create(&self, video: VideoRecord) -> Result<VideoRecord, StoreError> {
        self.inner.create(video).await
    }

    async fn get(&self, id: Uuid) -> Result<VideoRecord, StoreError> {
        self.inner.get(id).await
    }

    async fn update(&self, _video: &VideoRecord) -> Result<(), StoreError> {
        Err(StoreError::Backend("database is read-only".to_string()))
    }
}

pub struct Harness {
    pub config: Arc<Config>,
    pub service: Arc<IngestService>,
    pub videos: Arc<dyn VideoStore>,
    pub auth: Arc<JwtAuthenticator>,
    pub bucket: Arc<InMemory>,
    pub prober: Arc<FakeProber>,
    pub remuxer: Arc<CopyRemuxer>,
    pub owner: Uuid,
    pub video: VideoRecord,
    pub temp_dir: TempDir,
    pub assets_dir: TempDir,
}

pub struct HarnessOptions {
    pub geometry: Option<Geometry>,
    pub remux_fails: bool,
    pub read_only_store: bool,
    pub max_upload_bytes: u64,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            geometry: Some(Geometry {
                width: 1920,
                height: 1080,
            }),
            remux_fails: false,
            read_only_store: false,
            max_upload_bytes: 1 << 20,
        }
    }
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_options(HarnessOptions::default()).await
    }

    pub async fn with_options(options: HarnessOptions) -> Self {
        let temp_dir = tempfile::tempdir().unwrap();
        let assets_dir = tempfile::tempdir().unwrap();

        let config = Arc::new(Config {
            temp_dir: temp_dir.path().to_path_buf(),
            assets_root: assets_dir.path().to_path_buf(),
            public_base_url: "http://localhost:8091".to_string(),
            max_upload_bytes: options.max_upload_bytes,
            jwt_secret: JWT_SECRET.to_string(),
            s3: S3Config {
                bucket: BUCKET.to_string(),
                region: REGION.to_string(),
                endpoint: None,
                distribution: None,
            },
            ..Config::default()
        });

        let videos: Arc<dyn VideoStore> = if options.read_only_store {
            Arc::new(ReadOnlyVideoStore {
                inner: InMemoryVideoStore::new(),
            })
        } else {
            Arc::new(InMemoryVideoStore::new())
        };

        let owner = Uuid::new_v4();
        let video = videos
            .create(VideoRecord::new(owner, "Boots in the Wild", "a test video"))
            .await
            .unwrap();

        let auth = Arc::new(JwtAuthenticator::new(JWT_SECRET, config.jwt_issuer.clone()));
        let bucket = Arc::new(InMemory::new());
        let prober = Arc::new(FakeProber {
            geometry: options.geometry,
            calls: AtomicUsize::new(0),
        });
        let remuxer = Arc::new(CopyRemuxer {
            fail: options.remux_fails,
            calls: AtomicUsize::new(0),
        });

        let service = Arc::new(IngestService::new(
            config.clone(),
            auth.clone(),
            videos.clone(),
            prober.clone(),
            remuxer.clone(),
            ObjectUploader::new(bucket.clone(), &config.s3),
        ));

        Self {
            config,
            service,
            videos,
            auth,
            bucket,
            prober,
            remuxer,
            owner,
            video,
            temp_dir,
            assets_dir,
        }
    }

    pub fn token_for(&self, user_id: Uuid) -> String {
        self.auth.issue(user_id, Duration::hours(1)).unwrap()
    }

    pub fn owner_token(&self) -> String {
        self.token_for(self.owner)
    }

    pub fn app_state(&self) -> Arc<AppState> {
        Arc::new(AppState {
            config: self.config.clone(),
            videos: self.videos.clone(),
            auth: self.auth.clone(),
            ingest: self.service.clone(),
        })
    }

    pub fn temp_files(&self) -> Vec<String> {
        std::fs::read_dir(self.temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect()
    }

    pub fn asset_files(&self) -> Vec<String> {
        std::fs::read_dir(self.assets_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect()
    }

    pub async fn objects(&self) -> Vec<object_store::ObjectMeta> {
        use futures::TryStreamExt;
        self.bucket.list(None).try_collect().await.unwrap()
    }

    pub fn probe_calls(&self) -> usize {
        self.prober.calls.load(Ordering::SeqCst)
    }

    pub fn remux_calls(&self) -> usize {
        self.remuxer.calls.load(Ordering::SeqCst)
    }
}
