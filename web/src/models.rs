use serde::Serialize;

/// Response of `POST /encrypt`. File bodies are base64.
#[derive(Debug, Serialize)]
pub struct EncryptResponse {
    /// Lossy playback copy; `None` when transcoding failed.
    pub mp4: Option<String>,
    pub mp4_filename: String,
    /// FFV1 artifact that keeps both channels intact.
    pub lossless: String,
    pub lossless_filename: String,
    pub frames: usize,
    pub shard_frames: Vec<usize>,
}

/// Response of `POST /decrypt`.
#[derive(Debug, Serialize)]
pub struct DecryptResponse {
    pub border_data: String,
    /// `lsb`, `border` or `raw`
    pub source: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names() {
        let value = serde_json::to_value(DecryptResponse {
            border_data: "hi".to_string(),
            source: "border",
        })
        .unwrap();
        assert_eq!(value["border_data"], "hi");
        assert_eq!(value["source"], "border");

        let value = serde_json::to_value(EncryptResponse {
            mp4: None,
            mp4_filename: "clip_stego.mp4".to_string(),
            lossless: "AAAA".to_string(),
            lossless_filename: "clip_stego.mkv".to_string(),
            frames: 4,
            shard_frames: vec![0, 1, 2],
        })
        .unwrap();
        assert!(value["mp4"].is_null());
        assert_eq!(value["shard_frames"], serde_json::json!([0, 1, 2]));
    }
}
