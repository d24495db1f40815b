//! Per-frame attendance decision loop.
//!
//! Each frame goes through a face-count gate on a downscaled copy; exactly one
//! face proceeds to identity lookup on the full frame. The outcome decides the
//! log mutation and the overlay shown with the frame. Detection failures stay
//! inside the frame they happened on; capture, storage and display failures
//! end the loop.

use crate::error::{CaptureError, DetectionError, DisplayError};
use crate::gallery::identity_key;
use crate::ledger::{
    AttendanceLog, AttendanceRecord, Clock, LocalClock, LogWriteError, UnknownFaces,
    KNOWN_PROGRAM, UNKNOWN_PROGRAM,
};
use crate::session::SessionState;
use crate::types::{
    DisplaySignal, FaceCounter, FaceMatcher, Frame, FrameSink, FrameSource, Overlay, OverlayTone,
};
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_DETECT_SCALE: f32 = 0.5;

/// Errors that terminate the loop.
#[derive(Error, Debug)]
pub enum LoopError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Storage(#[from] LogWriteError),
    #[error(transparent)]
    Display(#[from] DisplayError),
}

/// What happened to one frame.
#[derive(Debug)]
pub enum FrameOutcome {
    NoFace,
    MultipleFaces { count: usize },
    /// A known identity was recognized for the first time this session.
    Marked { name: String },
    /// A known identity that already has a row this session.
    AlreadyMarked { name: String },
    /// A single face the matcher could not place in the gallery.
    Unknown { label: String, snapshot: PathBuf },
    DetectionFailed(DetectionError),
}

impl FrameOutcome {
    /// Overlay drawn on the displayed frame, if any.
    pub fn overlay(&self) -> Option<Overlay> {
        match self {
            FrameOutcome::NoFace => Some(Overlay::new("No face detected", OverlayTone::Muted)),
            FrameOutcome::MultipleFaces { .. } => {
                Some(Overlay::new("Only 1 person allowed", OverlayTone::Alert))
            }
            FrameOutcome::Marked { name } => Some(Overlay::new(
                format!("{} - Attendance Marked", name.to_uppercase()),
                OverlayTone::Success,
            )),
            FrameOutcome::Unknown { .. } => {
                Some(Overlay::new("UNKNOWN - Marked", OverlayTone::Alert))
            }
            FrameOutcome::AlreadyMarked { .. } | FrameOutcome::DetectionFailed(_) => None,
        }
    }

    /// Whether this outcome appended a row to the attendance log.
    pub fn wrote_record(&self) -> bool {
        matches!(self, FrameOutcome::Marked { .. } | FrameOutcome::Unknown { .. })
    }
}

/// Result of one full capture → decide → display iteration.
#[derive(Debug)]
pub struct Step {
    pub outcome: FrameOutcome,
    pub quit: bool,
}

/// Tallies over a whole run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub marked: u64,
    pub unknowns: u64,
    pub multiple_faces: u64,
    pub detection_errors: u64,
    /// Rows appended to the attendance log.
    pub rows_written: u64,
}

impl RunSummary {
    fn record(&mut self, outcome: &FrameOutcome) {
        self.frames += 1;
        if outcome.wrote_record() {
            self.rows_written += 1;
        }
        match outcome {
            FrameOutcome::Marked { .. } => self.marked += 1,
            FrameOutcome::Unknown { .. } => self.unknowns += 1,
            FrameOutcome::MultipleFaces { .. } => self.multiple_faces += 1,
            FrameOutcome::DetectionFailed(_) => self.detection_errors += 1,
            FrameOutcome::NoFace | FrameOutcome::AlreadyMarked { .. } => {}
        }
    }
}

/// Knobs for the decision loop.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    /// Scale factor of the copy handed to the face counter.
    pub detect_scale: f32,
    /// Program column written for recognized identities.
    pub program: String,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            detect_scale: DEFAULT_DETECT_SCALE,
            program: KNOWN_PROGRAM.to_string(),
        }
    }
}

/// The attendance loop controller. Owns the session state and both sinks
/// (attendance log and unknown-face directory).
pub struct AttendanceLoop<C, M, K = LocalClock> {
    counter: C,
    matcher: M,
    log: AttendanceLog,
    unknowns: UnknownFaces,
    session: SessionState,
    settings: LoopSettings,
    summary: RunSummary,
    clock: K,
}

impl<C: FaceCounter, M: FaceMatcher> AttendanceLoop<C, M, LocalClock> {
    pub fn new(
        counter: C,
        matcher: M,
        log: AttendanceLog,
        unknowns: UnknownFaces,
        settings: LoopSettings,
    ) -> Self {
        Self {
            counter,
            matcher,
            log,
            unknowns,
            session: SessionState::new(),
            settings,
            summary: RunSummary::default(),
            clock: LocalClock,
        }
    }
}

impl<C: FaceCounter, M: FaceMatcher, K: Clock> AttendanceLoop<C, M, K> {
    /// Replace the timestamp source.
    pub fn with_clock<K2: Clock>(self, clock: K2) -> AttendanceLoop<C, M, K2> {
        AttendanceLoop {
            counter: self.counter,
            matcher: self.matcher,
            log: self.log,
            unknowns: self.unknowns,
            session: self.session,
            settings: self.settings,
            summary: self.summary,
            clock,
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn log(&self) -> &AttendanceLog {
        &self.log
    }

    /// Tallies of every frame handled by [`run`](Self::run) so far, also
    /// after it returned an error.
    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    /// Decide the outcome of one frame and apply its side effects.
    ///
    /// Detection failures come back as [`FrameOutcome::DetectionFailed`]; only
    /// storage failures are errors.
    pub fn process(&mut self, frame: &Frame) -> Result<FrameOutcome, LoopError> {
        let small = frame.downscaled(self.settings.detect_scale);
        let faces = match self.counter.count_faces(&small) {
            Ok(faces) => faces,
            Err(e) => return Ok(detection_failed(frame, e)),
        };

        match faces.len() {
            0 => Ok(FrameOutcome::NoFace),
            1 => self.identify(frame),
            count => {
                tracing::warn!(seq = frame.sequence, count, "more than one face, skipping recognition");
                Ok(FrameOutcome::MultipleFaces { count })
            }
        }
    }

    fn identify(&mut self, frame: &Frame) -> Result<FrameOutcome, LoopError> {
        let results = match self.matcher.find(&frame.image) {
            Ok(results) => results,
            Err(e) => return Ok(detection_failed(frame, e)),
        };

        let Some(best) = results.first().and_then(|set| set.first()) else {
            return self.mark_unknown(frame);
        };

        let Some(name) = identity_key(&best.identity) else {
            let err = DetectionError::Match(format!(
                "candidate {} has no usable file name",
                best.identity.display()
            ));
            return Ok(detection_failed(frame, err));
        };

        if self.session.is_marked(&name) {
            tracing::debug!(seq = frame.sequence, name = %name, "already marked this session");
            return Ok(FrameOutcome::AlreadyMarked { name });
        }

        let record = AttendanceRecord::at(&name, &self.settings.program, self.clock.now());
        self.log.append(&record)?;
        self.session.mark(name.clone());

        tracing::info!(
            seq = frame.sequence,
            name = %name,
            similarity = best.similarity,
            "recognized, attendance marked"
        );
        Ok(FrameOutcome::Marked { name })
    }

    fn mark_unknown(&mut self, frame: &Frame) -> Result<FrameOutcome, LoopError> {
        let label = self.session.next_unknown_label();
        let snapshot = self.unknowns.save(&label, &frame.image)?;

        let record = AttendanceRecord::at(&label, UNKNOWN_PROGRAM, self.clock.now());
        self.log.append(&record)?;
        self.session.advance_unknown();

        tracing::warn!(
            seq = frame.sequence,
            label = %label,
            snapshot = %snapshot.display(),
            "unknown face detected"
        );
        Ok(FrameOutcome::Unknown { label, snapshot })
    }

    /// Capture one frame, decide its outcome and show it.
    pub fn step<S, D>(&mut self, source: &mut S, sink: &mut D) -> Result<Step, LoopError>
    where
        S: FrameSource,
        D: FrameSink,
    {
        let frame = source.next_frame()?;
        let outcome = self.process(&frame)?;
        let overlay = outcome.overlay();
        let signal = sink.present(&frame, overlay.as_ref())?;
        Ok(Step {
            outcome,
            quit: signal == DisplaySignal::Quit,
        })
    }

    /// Run until the display reports quit or a fatal error occurs.
    pub fn run<S, D>(&mut self, source: &mut S, sink: &mut D) -> Result<RunSummary, LoopError>
    where
        S: FrameSource,
        D: FrameSink,
    {
        loop {
            let step = match self.step(source, sink) {
                Ok(step) => step,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        frames = self.summary.frames,
                        rows_written = self.summary.rows_written,
                        "attendance loop failed"
                    );
                    return Err(e);
                }
            };
            self.summary.record(&step.outcome);
            if step.quit {
                tracing::info!(frames = self.summary.frames, "quit requested");
                return Ok(self.summary);
            }
        }
    }
}

fn detection_failed(frame: &Frame, err: DetectionError) -> FrameOutcome {
    tracing::warn!(seq = frame.sequence, error = %err, "detection error");
    FrameOutcome::DetectionFailed(err)
}
