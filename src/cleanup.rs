use crate::config::Config;
use crate::staging::{THUMBNAIL_STAGING_PREFIX, VIDEO_STAGING_PREFIX};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::{error, info, warn};

/// Remove staging files left behind by crashed processes or by remux
/// subprocesses that outlived their request. Live requests clean up after
/// themselves; only files older than `max_age` are touched.
pub async fn sweep_stale_staging(config: &Config, max_age: Duration) -> anyhow::Result<usize> {
    let now = SystemTime::now();
    let mut total_deleted = 0;
    let mut total_size_freed = 0u64;

    if let Err(e) = sweep_directory(
        &config.temp_dir,
        VIDEO_STAGING_PREFIX,
        max_age,
        now,
        &mut total_deleted,
        &mut total_size_freed,
    )
    .await
    {
        error!("[cleanup] Error sweeping temp directory: {}", e);
    }

    if let Err(e) = sweep_directory(
        &config.assets_root,
        THUMBNAIL_STAGING_PREFIX,
        max_age,
        now,
        &mut total_deleted,
        &mut total_size_freed,
    )
    .await
    {
        error!("[cleanup] Error sweeping assets directory: {}", e);
    }

    if total_deleted > 0 {
        info!(
            "[cleanup] Sweep complete: {} stale staging files deleted, {:.2} MB freed",
            total_deleted,
            total_size_freed as f64 / 1024.0 / 1024.0
        );
    }

    Ok(total_deleted)
}

async fn sweep_directory(
    dir: &Path,
    prefix: &str,
    max_age: Duration,
    now: SystemTime,
    total_deleted: &mut usize,
    total_size_freed: &mut u64,
) -> anyhow::Result<()> {
    if !dir.exists() {
        return Ok(());
    }

    let mut entries = fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(prefix) {
            continue;
        }

        let path = entry.path();
        let metadata = match fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) => {
                warn!("[cleanup] Failed to get metadata for {:?}: {}", path, e);
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }

        let modified = match metadata.modified() {
            Ok(m) => m,
            Err(e) => {
                warn!("[cleanup] Failed to get modification time for {:?}: {}", path, e);
                continue;
            }
        };

        // Clock skew can put mtime in the future
        let Ok(age) = now.duration_since(modified) else {
            continue;
        };

        if age > max_age {
            match fs::remove_file(&path).await {
                Ok(()) => {
                    *total_deleted += 1;
                    *total_size_freed += metadata.len();
                    info!(
                        "[cleanup] Deleted stale staging file: {:?} (age: {:.1} min)",
                        path,
                        age.as_secs_f64() / 60.0
                    );
                }
                Err(e) => {
                    error!("[cleanup] Failed to delete {:?}: {}", path, e);
                }
            }
        }
    }

    Ok(())
}

/// Start a background task that periodically sweeps stale staging files
pub fn start_cleanup_task(config: Arc<Config>) -> tokio::task::JoinHandle<()> {
    let max_age = Duration::from_secs(config.staging.max_age_seconds);
    let sweep_interval = Duration::from_secs(config.staging.sweep_interval_seconds.max(1));

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(
            "[cleanup] Starting staging sweep (interval: {:.1} min, max age: {:.1} min)",
            sweep_interval.as_secs_f64() / 60.0,
            max_age.as_secs_f64() / 60.0
        );

        loop {
            interval.tick().await;

            if let Err(e) = sweep_stale_staging(&config, max_age).await {
                error!("[cleanup] Periodic sweep error: {}", e);
            }
        }
    })
}
