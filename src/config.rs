use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 8091;
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 1 << 30;
pub const DEFAULT_MAX_THUMBNAIL_BYTES: u64 = 10 << 20;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ServerFileConfig {
    pub port: Option<u16>,
    pub assets_root: Option<String>,
    pub temp_dir: Option<String>,
    pub public_base_url: Option<String>,
    pub max_upload_bytes: Option<u64>,
    pub max_thumbnail_bytes: Option<u64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct S3FileConfig {
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub distribution: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AuthFileConfig {
    pub jwt_secret: Option<String>,
    pub jwt_issuer: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ToolsFileConfig {
    pub ffmpeg_path: Option<String>,
    pub ffprobe_path: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct StagingFileConfig {
    pub max_age_seconds: Option<u64>,
    pub sweep_interval_seconds: Option<u64>,
}

/// Layout of the optional `config.toml`. Every value can be overridden by
/// the matching environment variable.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub server: ServerFileConfig,
    pub s3: S3FileConfig,
    pub auth: AuthFileConfig,
    pub tools: ToolsFileConfig,
    pub staging: StagingFileConfig,
}

#[derive(Clone, Debug)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    /// S3-compatible endpoint (MinIO, Spaces, ...). `None` targets AWS.
    pub endpoint: Option<String>,
    /// Front-door host (e.g. a CloudFront domain) used for playback URLs.
    pub distribution: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ToolsConfig {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
}

#[derive(Clone, Debug)]
pub struct StagingConfig {
    pub max_age_seconds: u64,
    pub sweep_interval_seconds: u64,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub assets_root: PathBuf,
    pub temp_dir: PathBuf,
    pub public_base_url: String,
    pub max_upload_bytes: u64,
    pub max_thumbnail_bytes: u64,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub s3: S3Config,
    pub tools: ToolsConfig,
    pub staging: StagingConfig,
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.parse().ok())
}

fn resolve_dir(base_dir: &std::path::Path, value: String) -> PathBuf {
    let path = PathBuf::from(value);
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        // A missing .env is fine; the process environment may already be complete.
        let _ = dotenvy::dotenv();

        let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

        let config_path = base_dir.join("config.toml");
        let file = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<ConfigFile>(&content)?
        } else {
            ConfigFile::default()
        };

        Self::from_sources(&base_dir, file)
    }

    /// Merge a parsed config file with environment overrides.
    pub fn from_sources(base_dir: &std::path::Path, file: ConfigFile) -> anyhow::Result<Self> {
        let port = env_parsed("PORT")
            .or(file.server.port)
            .unwrap_or(DEFAULT_PORT);

        let assets_root = env_string("ASSETS_ROOT")
            .or(file.server.assets_root)
            .unwrap_or_else(|| "assets".to_string());

        let temp_dir = env_string("TEMP_DIR")
            .or(file.server.temp_dir)
            .map(|dir| resolve_dir(base_dir, dir))
            .unwrap_or_else(std::env::temp_dir);

        let public_base_url = env_string("PUBLIC_BASE_URL")
            .or(file.server.public_base_url)
            .unwrap_or_else(|| format!("http://localhost:{}", port));

        let max_upload_bytes = env_parsed("MAX_UPLOAD_BYTES")
            .or(file.server.max_upload_bytes)
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        let max_thumbnail_bytes = env_parsed("MAX_THUMBNAIL_BYTES")
            .or(file.server.max_thumbnail_bytes)
            .unwrap_or(DEFAULT_MAX_THUMBNAIL_BYTES);

        let jwt_secret = env_string("JWT_SECRET")
            .or(file.auth.jwt_secret)
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET must be set"))?;

        let jwt_issuer = env_string("JWT_ISSUER")
            .or(file.auth.jwt_issuer)
            .unwrap_or_else(|| "tubely-access".to_string());

        let bucket = env_string("S3_BUCKET")
            .or(file.s3.bucket)
            .ok_or_else(|| anyhow::anyhow!("S3_BUCKET must be set"))?;

        let s3 = S3Config {
            bucket,
            region: env_string("S3_REGION")
                .or(file.s3.region)
                .unwrap_or_else(|| "us-east-1".to_string()),
            endpoint: env_string("S3_ENDPOINT").or(file.s3.endpoint),
            distribution: env_string("S3_CF_DISTRO").or(file.s3.distribution),
        };

        let tools = ToolsConfig {
            ffmpeg_path: env_string("FFMPEG_PATH")
                .or(file.tools.ffmpeg_path)
                .unwrap_or_else(|| "ffmpeg".to_string()),
            ffprobe_path: env_string("FFPROBE_PATH")
                .or(file.tools.ffprobe_path)
                .unwrap_or_else(|| "ffprobe".to_string()),
        };

        let staging = StagingConfig {
            max_age_seconds: env_parsed("STAGING_MAX_AGE_SECS")
                .or(file.staging.max_age_seconds)
                .unwrap_or(3600),
            sweep_interval_seconds: env_parsed("STAGING_SWEEP_INTERVAL_SECS")
                .or(file.staging.sweep_interval_seconds)
                .unwrap_or(600),
        };

        Ok(Self {
            port,
            assets_root: resolve_dir(base_dir, assets_root),
            temp_dir,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            max_upload_bytes,
            max_thumbnail_bytes,
            jwt_secret,
            jwt_issuer,
            s3,
            tools,
            staging,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

        Self {
            port: DEFAULT_PORT,
            assets_root: base_dir.join("assets"),
            temp_dir: std::env::temp_dir(),
            public_base_url: format!("http://localhost:{}", DEFAULT_PORT),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_thumbnail_bytes: DEFAULT_MAX_THUMBNAIL_BYTES,
            jwt_secret: String::new(),
            jwt_issuer: "tubely-access".to_string(),
            s3: S3Config {
                bucket: String::new(),
                region: "us-east-1".to_string(),
                endpoint: None,
                distribution: None,
            },
            tools: ToolsConfig {
                ffmpeg_path: "ffmpeg".to_string(),
                ffprobe_path: "ffprobe".to_string(),
            },
            staging: StagingConfig {
                max_age_seconds: 3600,
                sweep_interval_seconds: 600,
            },
        }
    }
}
