//! Errors raised by the collaborators the attendance loop depends on.

use thiserror::Error;

/// The video source could not supply a frame. Always fatal to the loop.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("video source exhausted")]
    Exhausted,
    #[error("capture device failed: {0}")]
    Device(String),
}

/// The face counter or face matcher failed on a frame.
///
/// Recovered per frame: the loop logs it and moves on to the next frame.
#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("face count failed: {0}")]
    Count(String),
    #[error("face match failed: {0}")]
    Match(String),
}

/// The display surface could not show a frame.
#[derive(Error, Debug)]
#[error("display failed: {0}")]
pub struct DisplayError(pub String);
