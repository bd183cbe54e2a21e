use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use video_ingest_backend::{
    auth::JwtAuthenticator,
    build_router, cleanup,
    config::Config,
    db::InMemoryVideoStore,
    ffmpeg::{FfmpegRemuxer, FfprobeProber},
    ingest::IngestService,
    models::AppState,
    storage::{build_s3_store, ObjectUploader},
    system_info,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "video_ingest_backend=debug,tower_http=debug".into()),
        )
        .init();

    let config = Arc::new(Config::load()?);

    tokio::fs::create_dir_all(&config.assets_root).await?;
    tokio::fs::create_dir_all(&config.temp_dir).await?;

    system_info::print_startup_info(&config).await;

    let store = build_s3_store(&config.s3)?;
    let uploader = ObjectUploader::new(store, &config.s3);
    let auth = Arc::new(JwtAuthenticator::new(&config.jwt_secret, config.jwt_issuer.clone()));
    let videos = Arc::new(InMemoryVideoStore::new());

    let ingest = Arc::new(IngestService::new(
        config.clone(),
        auth.clone(),
        videos.clone(),
        Arc::new(FfprobeProber::new(config.tools.ffprobe_path.clone())),
        Arc::new(FfmpegRemuxer::new(config.tools.ffmpeg_path.clone())),
        uploader,
    ));

    let app_state = Arc::new(AppState {
        config: config.clone(),
        videos,
        auth,
        ingest,
    });

    cleanup::start_cleanup_task(config.clone());

    let app = build_router(app_state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("✅ Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
