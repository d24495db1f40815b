use crate::error::{CaptureError, DetectionError, DisplayError};
use image::imageops::{self, FilterType};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

/// A captured RGB camera frame.
#[derive(Clone)]
pub struct Frame {
    pub image: RgbImage,
    pub sequence: u32,
    pub timestamp: Instant,
}

impl Frame {
    pub fn new(image: RgbImage, sequence: u32) -> Self {
        Self {
            image,
            sequence,
            timestamp: Instant::now(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Bilinear copy scaled by `factor` on both axes, never smaller than 1x1.
    ///
    /// A factor of 1.0 or more returns an unscaled copy.
    pub fn downscaled(&self, factor: f32) -> RgbImage {
        if !(factor > 0.0 && factor < 1.0) {
            return self.image.clone();
        }
        let width = ((self.width() as f32 * factor).round() as u32).max(1);
        let height = ((self.height() as f32 * factor).round() as u32).max(1);
        imageops::resize(&self.image, width, height, FilterType::Triangle)
    }
}

/// One gallery candidate returned by a [`FaceMatcher`].
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Path of the reference image this candidate was matched against.
    pub identity: PathBuf,
    /// Cosine similarity to the probe face [-1, 1]. Higher = more similar.
    pub similarity: f32,
}

/// Candidates for one face, best first.
pub type MatchSet = Vec<Candidate>;

/// Colour class of an overlay message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayTone {
    Muted,
    Alert,
    Success,
}

impl OverlayTone {
    pub fn rgb(self) -> [u8; 3] {
        match self {
            OverlayTone::Muted => [100, 100, 100],
            OverlayTone::Alert => [255, 0, 0],
            OverlayTone::Success => [0, 255, 0],
        }
    }
}

/// Text drawn over the displayed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlay {
    pub text: String,
    pub tone: OverlayTone,
}

impl Overlay {
    pub fn new(text: impl Into<String>, tone: OverlayTone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }
}

/// What the display reported after showing a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplaySignal {
    Continue,
    Quit,
}

/// Supplies frames, blocking until the next one is available.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Frame, CaptureError>;
}

/// Counts faces in an image. Only the number of regions drives decisions.
pub trait FaceCounter {
    fn count_faces(&mut self, image: &RgbImage) -> Result<Vec<BoundingBox>, DetectionError>;
}

/// Looks up the faces in an image against the known-identity gallery.
///
/// Returns one [`MatchSet`] per face found, each ranked best first. An empty
/// result (or an empty first set) means no confident match.
pub trait FaceMatcher {
    fn find(&mut self, image: &RgbImage) -> Result<Vec<MatchSet>, DetectionError>;
}

/// Shows a frame and polls for the quit signal.
pub trait FrameSink {
    fn present(
        &mut self,
        frame: &Frame,
        overlay: Option<&Overlay>,
    ) -> Result<DisplaySignal, DisplayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downscaled_half() {
        let frame = Frame::new(RgbImage::new(640, 480), 0);
        let small = frame.downscaled(0.5);
        assert_eq!(small.dimensions(), (320, 240));
    }

    #[test]
    fn test_downscaled_never_empty() {
        let frame = Frame::new(RgbImage::new(1, 1), 0);
        let small = frame.downscaled(0.1);
        assert_eq!(small.dimensions(), (1, 1));
    }

    #[test]
    fn test_downscaled_unit_factor_is_copy() {
        let frame = Frame::new(RgbImage::from_pixel(4, 2, image::Rgb([9, 8, 7])), 3);
        let copy = frame.downscaled(1.0);
        assert_eq!(copy, frame.image);
    }

    #[test]
    fn test_overlay_tone_colours() {
        assert_eq!(OverlayTone::Success.rgb(), [0, 255, 0]);
        assert_eq!(OverlayTone::Alert.rgb(), [255, 0, 0]);
        assert_eq!(OverlayTone::Muted.rgb(), [100, 100, 100]);
    }
}
