//! rollcall-hw: Hardware abstraction for webcam capture.
//!
//! Opens a V4L2 device, keeps a streaming queue alive for the life of the
//! session and hands out RGB frames to the attendance loop.

pub mod camera;
pub mod frame;

pub use camera::{Camera, CameraError, DeviceInfo, PixelFormat};
pub use frame::FrameError;
