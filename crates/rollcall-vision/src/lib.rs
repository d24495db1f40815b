//! rollcall-vision: face detection and gallery matching.
//!
//! SCRFD counts and locates faces; ArcFace embeds landmark-aligned crops,
//! which are ranked by cosine similarity against the enrolled gallery. Both
//! models run on CPU through ONNX Runtime.

pub mod alignment;
pub mod detector;
pub mod embedding;
pub mod matcher;
pub mod recognizer;

pub use detector::{DetectorError, FaceDetector};
pub use embedding::{Embedding, GalleryEntry};
pub use matcher::{GalleryMatcher, MatcherError};
pub use recognizer::{FaceRecognizer, RecognizerError};

/// SCRFD detection model file name inside the model directory.
pub const SCRFD_MODEL_FILE: &str = "det_10g.onnx";

/// ArcFace recognition model file name inside the model directory.
pub const ARCFACE_MODEL_FILE: &str = "w600k_r50.onnx";
