use crate::config::Config;
use crate::ffmpeg::tool_version;
use serde::Serialize;
use sysinfo::System;

#[derive(Serialize, Debug)]
pub struct SystemInfo {
    pub version: String,
    pub platform: String,
    pub arch: String,
    pub cpus: usize,
    pub cpu_model: String,
    pub memory_total_gb: f64,
    pub memory_free_gb: f64,
    pub ffmpeg: Option<String>,
    pub ffprobe: Option<String>,
}

pub async fn get_system_info(config: &Config) -> SystemInfo {
    let mut system = System::new();
    system.refresh_memory();
    system.refresh_cpu();

    let cpu_model = system
        .cpus()
        .first()
        .map(|cpu| cpu.brand().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    SystemInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        platform: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        cpus: system.cpus().len(),
        cpu_model,
        memory_total_gb: system.total_memory() as f64 / 1024.0 / 1024.0 / 1024.0,
        memory_free_gb: system.available_memory() as f64 / 1024.0 / 1024.0 / 1024.0,
        ffmpeg: tool_version(&config.tools.ffmpeg_path).await,
        ffprobe: tool_version(&config.tools.ffprobe_path).await,
    }
}

pub async fn print_startup_info(config: &Config) {
    let info = get_system_info(config).await;

    println!("{}", "=".repeat(60));
    println!("🚀 Video Ingest Backend v{}", info.version);
    println!("{}", "=".repeat(60));
    println!("  Platform: {} ({})", info.platform, info.arch);
    println!("  CPUs: {} ({})", info.cpus, info.cpu_model);
    println!(
        "  Memory: {:.2} GB total, {:.2} GB available",
        info.memory_total_gb, info.memory_free_gb
    );
    println!(
        "  FFmpeg: {}",
        info.ffmpeg.as_deref().unwrap_or("not available")
    );
    println!(
        "  FFprobe: {}",
        info.ffprobe.as_deref().unwrap_or("not available")
    );
    println!("  Assets Root: {:?}", config.assets_root);
    println!("  Temp Dir: {:?}", config.temp_dir);
    println!("  Bucket: {} ({})", config.s3.bucket, config.s3.region);
    println!("{}", "=".repeat(60));

    if info.ffmpeg.is_none() || info.ffprobe.is_none() {
        tracing::warn!("ffmpeg/ffprobe not found; video uploads will fail until they are installed");
    }
}
