//! rollcall-core: attendance decision engine.
//!
//! Scans the known-identity gallery, owns the append-only attendance log and
//! drives the per-frame decision loop. Face detection, face matching, frame
//! capture and display are reached through the traits in [`types`], so the
//! loop runs the same against a webcam or against in-memory fakes.

pub mod controller;
pub mod error;
pub mod gallery;
pub mod ledger;
pub mod session;
pub mod types;

pub use controller::{AttendanceLoop, FrameOutcome, LoopError, LoopSettings, RunSummary, Step};
pub use error::{CaptureError, DetectionError, DisplayError};
pub use gallery::{identity_key, Gallery, GalleryError, KnownIdentity};
pub use ledger::{AttendanceLog, AttendanceRecord, Clock, LocalClock, LogWriteError, UnknownFaces};
pub use session::SessionState;
pub use types::{
    BoundingBox, Candidate, DisplaySignal, FaceCounter, FaceMatcher, Frame, FrameSink, FrameSource,
    MatchSet, Overlay, OverlayTone,
};
