use crate::error::{AppError, Result};
use crate::models::*;
use crate::state::AppState;
use crate::workspace::RequestWorkspace;
use axum::{
    body::Bytes,
    extract::{Multipart, State},
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use std::path::PathBuf;
use std::sync::Arc;
use stegoframe::Recovery;
use tracing::{debug, info, warn};

const DEFAULT_STEM: &str = "video";
const DEFAULT_EXTENSION: &str = "mp4";

/// Index page
pub async fn serve_index() -> &'static str {
    "Video Steganography API"
}

struct VideoUpload {
    file_name: String,
    data: Bytes,
}

#[derive(Default)]
struct Form {
    video: Option<VideoUpload>,
    text: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<Form> {
    let mut form = Form::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::InvalidInput("Invalid multipart form".to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "video" => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|_| AppError::InvalidInput("Invalid video".to_string()))?;
                form.video = Some(VideoUpload { file_name, data });
            }
            "text" => {
                form.text = Some(
                    field
                        .text()
                        .await
                        .map_err(|_| AppError::InvalidInput("Invalid text".to_string()))?,
                );
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Upload file name reduced to a safe stem, e.g. `"../My Clip!.mov"` → `"MyClip"`.
fn safe_stem(file_name: &str) -> String {
    let stem = std::path::Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("");
    let cleaned: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(64)
        .collect();
    if cleaned.is_empty() {
        DEFAULT_STEM.to_string()
    } else {
        cleaned
    }
}

fn safe_extension(file_name: &str) -> String {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 5 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

async fn store_upload(workspace: &RequestWorkspace, upload: &VideoUpload) -> Result<PathBuf> {
    if upload.data.is_empty() {
        return Err(AppError::InvalidInput("Uploaded video is empty".to_string()));
    }
    let path = workspace.file(&format!("input.{}", safe_extension(&upload.file_name)));
    tokio::fs::write(&path, &upload.data).await?;
    Ok(path)
}

/// Run `job` on the blocking pool.
///
/// The job owns `workspace` and a slot of `state.jobs`. When the request
/// times out and this future is dropped, the job still finishes in its
/// own directory, and the slot and directory are released only then.
async fn run_job<T, F>(state: &Arc<AppState>, workspace: RequestWorkspace, job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&AppState, &RequestWorkspace) -> Result<T> + Send + 'static,
{
    let permit = Arc::clone(&state.jobs)
        .acquire_owned()
        .await
        .map_err(|_| AppError::Internal("job queue closed".to_string()))?;
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || {
        let _permit = permit;
        job(&state, &workspace)
    })
    .await?
}

struct EncodeOutput {
    frames: usize,
    shard_frames: Vec<usize>,
    lossless: Vec<u8>,
    mp4: Option<Vec<u8>>,
}

/// Hide `text` in the uploaded `video`.
pub async fn encrypt(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<EncryptResponse>> {
    let form = read_form(multipart).await?;
    let upload = form
        .video
        .ok_or(AppError::InvalidInput("No video file provided".to_string()))?;
    let text = form
        .text
        .filter(|t| !t.is_empty())
        .ok_or(AppError::InvalidInput("No text provided".to_string()))?;

    let workspace = RequestWorkspace::create(&state.config.work_dir).await?;
    debug!(
        "Encrypt request {}: video_size={}, text_len={}",
        workspace.id(),
        upload.data.len(),
        text.len()
    );
    let input = store_upload(&workspace, &upload).await?;

    let request_id = workspace.id();
    let output = run_job(&state, workspace, move |state, workspace| {
        let ffmpeg = state.ffmpeg_in(workspace.path());
        let lossless = workspace.file("encoded.mkv");
        let report = state
            .stego
            .hide_video(&ffmpeg, &ffmpeg, &input, &lossless, &text)?;

        let preview = workspace.file("encoded.mp4");
        let mp4 = match ffmpeg.transcode_preview(&lossless, &preview) {
            Ok(()) => Some(std::fs::read(&preview)?),
            Err(e) => {
                warn!("Playback copy unavailable: {}", e);
                None
            }
        };

        Ok(EncodeOutput {
            frames: report.frames.len(),
            shard_frames: report.shard_frames,
            lossless: std::fs::read(&lossless)?,
            mp4,
        })
    })
    .await?;

    let stem = safe_stem(&upload.file_name);
    info!(
        "Encryption successful: request={}, frames={}",
        request_id,
        output.frames
    );

    Ok(Json(EncryptResponse {
        mp4: output.mp4.map(|b| general_purpose::STANDARD.encode(b)),
        mp4_filename: format!("{}_stego.mp4", stem),
        lossless: general_purpose::STANDARD.encode(&output.lossless),
        lossless_filename: format!("{}_stego.mkv", stem),
        frames: output.frames,
        shard_frames: output.shard_frames,
    }))
}

/// Recover the hidden text from the uploaded `video`.
pub async fn decrypt(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<DecryptResponse>> {
    let form = read_form(multipart).await?;
    let upload = form
        .video
        .ok_or(AppError::InvalidInput("No video file provided".to_string()))?;

    let workspace = RequestWorkspace::create(&state.config.work_dir).await?;
    debug!(
        "Decrypt request {}: video_size={}",
        workspace.id(),
        upload.data.len()
    );
    let input = store_upload(&workspace, &upload).await?;

    let request_id = workspace.id();
    let recovery = run_job(&state, workspace, move |state, workspace| {
        let ffmpeg = state.ffmpeg_in(workspace.path());
        Ok(state.stego.recover_video(&ffmpeg, &input)?)
    })
    .await?;

    let source = recovery.source();
    match recovery {
        Recovery::NotFound => Err(AppError::NotFound),
        Recovery::Decrypted(text) | Recovery::Border(text) | Recovery::Raw(text) => {
            info!("Decryption finished: request={}, source={}", request_id, source);
            Ok(Json(DecryptResponse {
                border_data: text,
                source,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use std::time::Duration;

    fn test_state(tag: &str) -> (Arc<AppState>, PathBuf) {
        let root = std::env::temp_dir().join(format!("stegoframe-api-{}-{}", tag, std::process::id()));
        let work_dir = root.join("work").to_string_lossy().into_owned();
        let key_path = root.join("stego.key").to_string_lossy().into_owned();
        let config = ServerConfig::from_lookup(|k| match k {
            "STEGO_WORK_DIR" => Some(work_dir.clone()),
            "STEGO_KEY_PATH" => Some(key_path.clone()),
            "STEGO_MAX_JOBS" => Some("1".to_string()),
            _ => None,
        })
        .unwrap();
        (Arc::new(AppState::new(config).unwrap()), root)
    }

    #[tokio::test]
    async fn test_job_outlives_abandoned_request() {
        let (state, root) = test_state("job");
        let workspace = RequestWorkspace::create(&state.config.work_dir).await.unwrap();
        let dir = workspace.path().to_path_buf();
        let (release, wait) = std::sync::mpsc::channel::<()>();
        let (seen_tx, seen_rx) = tokio::sync::oneshot::channel();

        let call = run_job(&state, workspace, move |_, workspace| {
            wait.recv().ok();
            seen_tx.send(workspace.path().exists()).ok();
            Ok(())
        });
        // the request gives up while the job is still running
        assert!(tokio::time::timeout(Duration::from_millis(50), call).await.is_err());
        assert!(dir.exists());
        assert_eq!(state.jobs.available_permits(), 0);

        release.send(()).unwrap();
        assert!(seen_rx.await.unwrap());
        for _ in 0..100 {
            if !dir.exists() && state.jobs.available_permits() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!dir.exists());
        assert_eq!(state.jobs.available_permits(), 1);
        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_safe_stem() {
        assert_eq!(safe_stem("holiday.mp4"), "holiday");
        assert_eq!(safe_stem("../My Clip!.mov"), "MyClip");
        assert_eq!(safe_stem(""), "video");
        assert_eq!(safe_stem("???.mp4"), "video");
    }

    #[test]
    fn test_safe_extension() {
        assert_eq!(safe_extension("clip.MOV"), "mov");
        assert_eq!(safe_extension("clip"), "mp4");
        assert_eq!(safe_extension("clip.tar.gz;rm"), "mp4");
        assert_eq!(safe_extension("clip.verylongext"), "mp4");
    }
}
