use anyhow::Context;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Server settings, read from `STEGO_*` environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub key_path: PathBuf,
    /// Root of the per-request workspaces.
    pub work_dir: PathBuf,
    pub ffmpeg: PathBuf,
    pub timeout: Duration,
    pub max_upload_bytes: usize,
    /// Encode/decode jobs allowed on the blocking pool at once.
    pub max_jobs: usize,
    /// Optional JSON file with codec settings.
    pub stego_config: Option<PathBuf>,
    /// `None` allows any origin.
    pub allowed_origins: Option<Vec<String>>,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let non_empty = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind = non_empty("STEGO_BIND")
            .unwrap_or_else(|| "0.0.0.0:5000".to_string())
            .parse()
            .context("STEGO_BIND must be host:port")?;
        let timeout_secs: u64 = match non_empty("STEGO_TIMEOUT_SECS") {
            Some(v) => v.parse().context("STEGO_TIMEOUT_SECS must be an integer")?,
            None => 120,
        };
        let max_upload_mb: usize = match non_empty("STEGO_MAX_UPLOAD_MB") {
            Some(v) => v.parse().context("STEGO_MAX_UPLOAD_MB must be an integer")?,
            None => 200,
        };
        let max_jobs: usize = match non_empty("STEGO_MAX_JOBS") {
            Some(v) => v.parse().context("STEGO_MAX_JOBS must be an integer")?,
            None => 4,
        };
        if max_jobs == 0 {
            anyhow::bail!("STEGO_MAX_JOBS must be > 0");
        }
        let allowed_origins = non_empty("ALLOWED_ORIGINS").map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
        });

        Ok(Self {
            bind,
            key_path: non_empty("STEGO_KEY_PATH")
                .unwrap_or_else(|| "data/stego.key".to_string())
                .into(),
            work_dir: non_empty("STEGO_WORK_DIR").unwrap_or_else(|| "tmp".to_string()).into(),
            ffmpeg: non_empty("STEGO_FFMPEG").unwrap_or_else(|| "ffmpeg".to_string()).into(),
            timeout: Duration::from_secs(timeout_secs),
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            max_jobs,
            stego_config: non_empty("STEGO_CONFIG").map(PathBuf::from),
            allowed_origins,
        })
    }
}
