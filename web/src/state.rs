use crate::config::ServerConfig;
use std::path::Path;
use std::sync::Arc;
use stegoframe::{AeadCipher, Ffmpeg, KeyHandle, StegoConfig, VideoStego};
use tokio::sync::Semaphore;
use tracing::info;

pub struct AppState {
    pub stego: VideoStego<AeadCipher>,
    pub config: ServerConfig,
    /// Held by a blocking job until it returns, not until its request ends.
    pub jobs: Arc<Semaphore>,
}

impl AppState {
    /// Load codec settings and the key once at startup.
    pub fn new(config: ServerConfig) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.work_dir)?;

        let stego_config = match &config.stego_config {
            Some(path) => {
                info!("Loading codec settings from {}", path.display());
                StegoConfig::from_json_file(path)?
            }
            None => StegoConfig::default(),
        };
        let key = KeyHandle::load_or_generate(&config.key_path)?;
        let stego = VideoStego::new(stego_config, AeadCipher::new(&key))?;

        let jobs = Arc::new(Semaphore::new(config.max_jobs));

        Ok(Self { stego, config, jobs })
    }

    /// ffmpeg driver whose scratch files live in `dir`.
    pub fn ffmpeg_in(&self, dir: &Path) -> Ffmpeg {
        Ffmpeg::new(&self.config.ffmpeg, dir)
    }
}
