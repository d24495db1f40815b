use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rollcall_core::{AttendanceLog, AttendanceLoop, Gallery, LoopSettings, UnknownFaces};
use rollcall_hw::Camera;
use rollcall_vision::{FaceDetector, FaceRecognizer, GalleryMatcher};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod config;
mod display;

use config::{Config, RunArgs};
use display::Window;

#[derive(Parser)]
#[command(name = "rollcall", about = "Webcam attendance logger")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the camera and mark attendance (default)
    Run(RunArgs),
    /// List the identities found in the known-faces directory
    Gallery {
        /// Directory to scan instead of ROLLCALL_KNOWN_DIR
        #[arg(long)]
        known_dir: Option<PathBuf>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// List V4L2 capture devices
    Devices,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command.unwrap_or(Commands::Run(RunArgs::default())) {
        Commands::Run(args) => run(config.with_overrides(args)),
        Commands::Gallery { known_dir, json } => {
            list_gallery(known_dir.unwrap_or(config.known_dir), json)
        }
        Commands::Devices => {
            list_devices();
            Ok(())
        }
    }
}

fn run(config: Config) -> Result<()> {
    tracing::info!(
        known_dir = %config.known_dir.display(),
        attendance_file = %config.attendance_file.display(),
        model_dir = %config.model_dir.display(),
        threshold = config.similarity_threshold,
        "attendance system starting"
    );

    let gallery = Gallery::scan(&config.known_dir).context("failed to load known faces")?;
    if gallery.is_empty() {
        tracing::warn!(dir = %config.known_dir.display(), "no known faces, every face will be logged as unknown");
    } else {
        tracing::info!(identities = gallery.len(), "known faces loaded");
    }

    let log = AttendanceLog::open(&config.attendance_file)
        .context("failed to open attendance log")?;
    let unknowns = UnknownFaces::create(&config.unknown_dir)
        .context("failed to create unknown-faces directory")?;

    let scrfd = config.scrfd_model_path();
    let arcface = config.arcface_model_path();
    let counter = FaceDetector::load(&scrfd)
        .with_context(|| format!("failed to load face detector from {}", scrfd.display()))?;
    let matcher = GalleryMatcher::build(
        FaceDetector::load(&scrfd)
            .with_context(|| format!("failed to load face detector from {}", scrfd.display()))?,
        FaceRecognizer::load(&arcface)
            .with_context(|| format!("failed to load face recognizer from {}", arcface.display()))?,
        &gallery,
        config.similarity_threshold,
    );
    if matcher.enrolled() < gallery.len() {
        tracing::warn!(
            enrolled = matcher.enrolled(),
            identities = gallery.len(),
            "some known faces could not be enrolled"
        );
    }

    let mut camera = Camera::open(
        &config.camera_device,
        config.capture_width,
        config.capture_height,
    )
    .with_context(|| format!("failed to open camera {}", config.camera_device))?;
    tracing::info!(
        width = camera.width,
        height = camera.height,
        pixel_format = ?camera.pixel_format(),
        "camera ready"
    );
    camera
        .discard_frames(config.warmup_frames)
        .context("camera warmup failed")?;

    let mut window = Window::open(camera.width, camera.height, config.overlay_font.as_deref())
        .context("failed to open preview window")?;

    let settings = LoopSettings {
        detect_scale: config.detect_scale,
        program: config.program.clone(),
    };
    let mut attendance = AttendanceLoop::new(counter, matcher, log, unknowns, settings);

    tracing::info!("attendance system running, press 'q' to quit");
    let result = attendance.run(&mut camera, &mut window);

    let summary = attendance.summary();
    tracing::info!(
        frames = summary.frames,
        marked = summary.marked,
        unknowns = summary.unknowns,
        multiple_faces = summary.multiple_faces,
        detection_errors = summary.detection_errors,
        rows_written = summary.rows_written,
        "attendance system stopped"
    );
    result.context("attendance loop stopped")?;
    Ok(())
}

fn list_gallery(dir: PathBuf, json: bool) -> Result<()> {
    let gallery = Gallery::scan(&dir)
        .with_context(|| format!("failed to scan {}", dir.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(gallery.identities())?);
        return Ok(());
    }

    if gallery.is_empty() {
        println!("No known faces in {}", dir.display());
        return Ok(());
    }
    println!("{:<24} REFERENCE", "NAME");
    for identity in gallery.identities() {
        println!("{:<24} {}", identity.name, identity.reference.display());
    }
    Ok(())
}

fn list_devices() {
    let devices = Camera::list_devices();
    if devices.is_empty() {
        println!("No V4L2 capture devices found");
        return;
    }
    for device in devices {
        println!("{}  {} ({}, {})", device.path, device.name, device.driver, device.bus);
    }
}
