//! Frames and the collaborators that move them in and out of containers.

use crate::error::{Result, StegoError};
use image::RgbImage;
use std::path::Path;

/// One decoded video frame.
///
/// `index` is the frame's position in the ordered sequence and stays stable
/// while encoders mutate `image` in place.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: usize,
    pub image: RgbImage,
}

impl Frame {
    pub fn new(index: usize, image: RgbImage) -> Self {
        Self { index, image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Outcome of reading one channel from one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameRead {
    /// A payload was found.
    Payload(String),
    /// The frame carries nothing on this channel.
    Empty,
    /// Something was there but it could not be read back intact.
    Failed(String),
}

impl FrameRead {
    pub fn payload(self) -> Option<String> {
        match self {
            FrameRead::Payload(text) => Some(text),
            FrameRead::Empty | FrameRead::Failed(_) => None,
        }
    }
}

/// Yields the ordered frames of a video. Decoding must be lossless.
pub trait FrameSource {
    fn extract(&self, video: &Path) -> Result<Vec<Frame>>;

    /// Like [`extract`](Self::extract), but fails with
    /// [`StegoError::TooManyFrames`] once the video holds more than `limit`
    /// frames. Sources override this to stop before decoding the excess.
    fn extract_bounded(&self, video: &Path, limit: usize) -> Result<Vec<Frame>> {
        let frames = self.extract(video)?;
        check_frame_limit(frames.len(), limit)?;
        Ok(frames)
    }
}

/// Writes frames back into a playable container without altering a single
/// pixel value. `reference` is the original input, used for timing and audio.
pub trait FrameSink {
    fn assemble(&self, frames: &[Frame], reference: &Path, output: &Path) -> Result<()>;
}

pub fn check_frame_limit(found: usize, limit: usize) -> Result<()> {
    if found > limit {
        return Err(StegoError::TooManyFrames { found, limit });
    }
    Ok(())
}

/// Re-sequence `index` after frames were appended or reordered.
pub fn reindex(frames: &mut [Frame]) {
    for (i, frame) in frames.iter_mut().enumerate() {
        frame.index = i;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_read_payload() {
        assert_eq!(
            FrameRead::Payload("abc".into()).payload(),
            Some("abc".to_string())
        );
        assert_eq!(FrameRead::Empty.payload(), None);
        assert_eq!(FrameRead::Failed("bad utf-8".into()).payload(), None);
    }

    #[test]
    fn test_reindex() {
        let mut frames = vec![
            Frame::new(7, RgbImage::new(2, 2)),
            Frame::new(3, RgbImage::new(2, 2)),
        ];
        reindex(&mut frames);
        assert_eq!(frames[0].index, 0);
        assert_eq!(frames[1].index, 1);
        assert_eq!(frames[1].width(), 2);
    }

    struct Blank(usize);

    impl FrameSource for Blank {
        fn extract(&self, _video: &Path) -> Result<Vec<Frame>> {
            Ok((0..self.0).map(|i| Frame::new(i, RgbImage::new(2, 2))).collect())
        }
    }

    #[test]
    fn test_extract_bounded_default() {
        let video = Path::new("clip");
        assert_eq!(Blank(3).extract_bounded(video, 3).unwrap().len(), 3);
        assert!(matches!(
            Blank(4).extract_bounded(video, 3),
            Err(StegoError::TooManyFrames { found: 4, limit: 3 })
        ));
    }
}
