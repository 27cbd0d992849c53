use crate::state::AppState;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Workspaces older than this are removed by the background sweep.
const MAX_AGE: Duration = Duration::from_secs(3600);
const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Per-request directory, removed when the request finishes.
#[derive(Debug)]
pub struct RequestWorkspace {
    id: Uuid,
    path: PathBuf,
}

impl RequestWorkspace {
    pub async fn create(root: &Path) -> std::io::Result<Self> {
        let id = Uuid::new_v4();
        let path = root.join(id.to_string());
        tokio::fs::create_dir_all(&path).await?;
        Ok(Self { id, path })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for RequestWorkspace {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove workspace {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Background cleanup task
///
/// Catches workspaces left behind by a crashed or killed worker.
pub async fn run_cleanup_task(state: Arc<AppState>) {
    info!("🧹 Starting background cleanup task");

    loop {
        sleep(SWEEP_INTERVAL).await;

        match sweep_stale(&state.config.work_dir, MAX_AGE).await {
            Ok(0) => {}
            Ok(n) => info!("Removed {} stale workspaces", n),
            Err(e) => error!("Cleanup task failed: {}", e),
        }
    }
}

/// Remove directories under `root` last modified at least `max_age` ago.
pub async fn sweep_stale(root: &Path, max_age: Duration) -> std::io::Result<usize> {
    let mut removed = 0;
    let mut entries = tokio::fs::read_dir(root).await?;
    while let Some(entry) = entries.next_entry().await? {
        let meta = entry.metadata().await?;
        if !meta.is_dir() {
            continue;
        }
        let age = meta
            .modified()
            .ok()
            .and_then(|m| m.elapsed().ok())
            .unwrap_or_default();
        if age >= max_age {
            match tokio::fs::remove_dir_all(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) => error!("Failed to delete workspace {}: {}", entry.path().display(), e),
            }
        }
    }
    Ok(removed)
}
