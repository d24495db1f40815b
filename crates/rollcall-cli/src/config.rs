use clap::Args;
use rollcall_core::ledger::KNOWN_PROGRAM;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const FONT_CANDIDATES: [&str; 3] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
];

/// Runtime configuration, loaded from `ROLLCALL_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    pub capture_width: u32,
    pub capture_height: u32,
    /// Directory of known-identity reference images.
    pub known_dir: PathBuf,
    /// Directory receiving unknown-face snapshots.
    pub unknown_dir: PathBuf,
    pub attendance_file: PathBuf,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// Cosine similarity threshold for a gallery match.
    pub similarity_threshold: f32,
    /// Scale of the copy used for the face-count gate.
    pub detect_scale: f32,
    /// Frames discarded after opening the camera (auto exposure settling).
    pub warmup_frames: usize,
    /// TrueType font for the overlay text; title bar only when absent.
    pub overlay_font: Option<PathBuf>,
    /// Program column for recognized identities.
    pub program: String,
}

/// Command-line overrides for [`Config`].
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// V4L2 capture device
    #[arg(long)]
    pub camera: Option<String>,
    /// Directory of known-identity reference images (.jpg/.png)
    #[arg(long)]
    pub known_dir: Option<PathBuf>,
    /// Directory for unknown-face snapshots
    #[arg(long)]
    pub unknown_dir: Option<PathBuf>,
    /// Attendance CSV file
    #[arg(long)]
    pub attendance_file: Option<PathBuf>,
    /// Directory containing det_10g.onnx and w600k_r50.onnx
    #[arg(long)]
    pub model_dir: Option<PathBuf>,
    /// Cosine similarity needed for a match
    #[arg(long)]
    pub threshold: Option<f32>,
}

impl Config {
    /// Load configuration from `ROLLCALL_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let path = |key: &str, default: &str| {
            lookup(key)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(default))
        };

        let model_dir = lookup("ROLLCALL_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| default_model_dir(&lookup));

        let overlay_font = lookup("ROLLCALL_OVERLAY_FONT")
            .map(PathBuf::from)
            .or_else(|| {
                FONT_CANDIDATES
                    .iter()
                    .map(Path::new)
                    .find(|p| p.exists())
                    .map(Path::to_path_buf)
            });

        Self {
            camera_device: lookup("ROLLCALL_CAMERA_DEVICE")
                .unwrap_or_else(|| "/dev/video0".to_string()),
            capture_width: parse_var(&lookup, "ROLLCALL_CAPTURE_WIDTH").unwrap_or(640),
            capture_height: parse_var(&lookup, "ROLLCALL_CAPTURE_HEIGHT").unwrap_or(480),
            known_dir: path("ROLLCALL_KNOWN_DIR", "images"),
            unknown_dir: path("ROLLCALL_UNKNOWN_DIR", "unknown_faces"),
            attendance_file: path("ROLLCALL_ATTENDANCE_FILE", "attendance.csv"),
            model_dir,
            similarity_threshold: parse_var(&lookup, "ROLLCALL_SIMILARITY_THRESHOLD").unwrap_or(0.40),
            detect_scale: parse_var(&lookup, "ROLLCALL_DETECT_SCALE").unwrap_or(0.5),
            warmup_frames: parse_var(&lookup, "ROLLCALL_WARMUP_FRAMES").unwrap_or(4),
            overlay_font,
            program: lookup("ROLLCALL_PROGRAM").unwrap_or_else(|| KNOWN_PROGRAM.to_string()),
        }
    }

    /// Apply command-line flags on top of the environment.
    pub fn with_overrides(mut self, args: RunArgs) -> Self {
        if let Some(camera) = args.camera {
            self.camera_device = camera;
        }
        if let Some(dir) = args.known_dir {
            self.known_dir = dir;
        }
        if let Some(dir) = args.unknown_dir {
            self.unknown_dir = dir;
        }
        if let Some(file) = args.attendance_file {
            self.attendance_file = file;
        }
        if let Some(dir) = args.model_dir {
            self.model_dir = dir;
        }
        if let Some(threshold) = args.threshold {
            self.similarity_threshold = threshold;
        }
        self
    }

    /// Path to the SCRFD detection model.
    pub fn scrfd_model_path(&self) -> PathBuf {
        self.model_dir.join(rollcall_vision::SCRFD_MODEL_FILE)
    }

    /// Path to the ArcFace recognition model.
    pub fn arcface_model_path(&self) -> PathBuf {
        self.model_dir.join(rollcall_vision::ARCFACE_MODEL_FILE)
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

fn default_model_dir(lookup: &impl Fn(&str) -> Option<String>) -> PathBuf {
    lookup("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("rollcall/models")
}
