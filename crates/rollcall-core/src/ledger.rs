//! Append-only attendance log and the unknown-face snapshot directory.
//!
//! The log is a CSV file opened, appended and closed for every record.
//! There is no file locking: only one process may write a given log.

use chrono::NaiveDateTime;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Header row written once when the log file is created.
pub const HEADER: [&str; 4] = ["Student Name", "Time", "Date", "Program"];

/// Program column for a recognized known identity.
pub const KNOWN_PROGRAM: &str = "The Creator";

/// Program column for an unknown-face event.
pub const UNKNOWN_PROGRAM: &str = "Unknown Entry";

#[derive(Error, Debug)]
pub enum LogWriteError {
    #[error("attendance log {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("attendance log {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("cannot create unknown-face directory {path}: {source}")]
    SnapshotDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot save unknown-face snapshot {path}: {source}")]
    Snapshot {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

/// Source of wall-clock time for record timestamps.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Local system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// One attendance row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    #[serde(rename = "Student Name")]
    pub name: String,
    /// `HH:MM:SS`
    #[serde(rename = "Time")]
    pub time: String,
    /// `YYYY-MM-DD`
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Program")]
    pub program: String,
}

impl AttendanceRecord {
    pub fn at(name: impl Into<String>, program: impl Into<String>, now: NaiveDateTime) -> Self {
        Self {
            name: name.into(),
            time: now.format("%H:%M:%S").to_string(),
            date: now.format("%Y-%m-%d").to_string(),
            program: program.into(),
        }
    }
}

/// Handle to the attendance CSV file.
#[derive(Debug, Clone)]
pub struct AttendanceLog {
    path: PathBuf,
}

impl AttendanceLog {
    /// Open the log, creating it with a header row if it does not exist yet.
    ///
    /// An existing file is left untouched, header included.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LogWriteError> {
        let log = Self {
            path: path.as_ref().to_path_buf(),
        };

        if log.path.exists() {
            tracing::info!(path = %log.path.display(), "using existing attendance log");
            return Ok(log);
        }

        if let Some(parent) = log.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| log.io_error(e))?;
        }

        let mut writer = csv::Writer::from_path(&log.path).map_err(|e| log.csv_error(e))?;
        writer.write_record(HEADER).map_err(|e| log.csv_error(e))?;
        writer.flush().map_err(|e| log.io_error(e))?;

        tracing::info!(path = %log.path.display(), "created attendance log");
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row. Fields containing commas or quotes are quoted.
    ///
    /// A last line left without a newline (hand-edited logs) is terminated
    /// first so the new row starts on its own line.
    pub fn append(&self, record: &AttendanceRecord) -> Result<(), LogWriteError> {
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        if missing_final_newline(&mut file).map_err(|e| self.io_error(e))? {
            tracing::debug!(path = %self.path.display(), "terminating unfinished last line");
            file.write_all(b"\n").map_err(|e| self.io_error(e))?;
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.serialize(record).map_err(|e| self.csv_error(e))?;
        writer.flush().map_err(|e| self.io_error(e))?;

        tracing::debug!(name = %record.name, program = %record.program, "attendance row appended");
        Ok(())
    }

    /// Read every row back, skipping the header.
    pub fn records(&self) -> Result<Vec<AttendanceRecord>, LogWriteError> {
        let mut reader = csv::Reader::from_path(&self.path).map_err(|e| self.csv_error(e))?;
        reader
            .deserialize()
            .collect::<Result<Vec<AttendanceRecord>, _>>()
            .map_err(|e| self.csv_error(e))
    }

    fn io_error(&self, source: std::io::Error) -> LogWriteError {
        LogWriteError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn csv_error(&self, source: csv::Error) -> LogWriteError {
        LogWriteError::Csv {
            path: self.path.display().to_string(),
            source,
        }
    }
}

fn missing_final_newline(file: &mut File) -> std::io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

/// Directory receiving one JPEG snapshot per unknown-face event.
#[derive(Debug, Clone)]
pub struct UnknownFaces {
    dir: PathBuf,
}

impl UnknownFaces {
    /// Use `dir`, creating it if absent.
    pub fn create(dir: impl AsRef<Path>) -> Result<Self, LogWriteError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|source| LogWriteError::SnapshotDir {
            path: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a snapshot for `label` is written to.
    pub fn path_for(&self, label: &str) -> PathBuf {
        self.dir.join(format!("{label}.jpg"))
    }

    /// Save `image` as `<dir>/<label>.jpg`, replacing any file left by an earlier run.
    pub fn save(&self, label: &str, image: &RgbImage) -> Result<PathBuf, LogWriteError> {
        let path = self.path_for(label);
        image.save(&path).map_err(|source| LogWriteError::Snapshot {
            path: path.display().to_string(),
            source,
        })?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 7)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_record_formats_time_and_date() {
        let record = AttendanceRecord::at("bob", KNOWN_PROGRAM, at(9, 5, 3));
        assert_eq!(record.time, "09:05:03");
        assert_eq!(record.date, "2024-03-07");
        assert_eq!(record.program, "The Creator");
    }

    #[test]
    fn test_open_creates_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attendance.csv");
        let log = AttendanceLog::open(&path).unwrap();
        assert_eq!(log.path(), path);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "Student Name,Time,Date,Program\n");
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/2024/attendance.csv");
        AttendanceLog::open(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_open_existing_never_rewrites_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attendance.csv");
        std::fs::write(
            &path,
            "Student Name,Time,Date,Program\nalice,08:00:00,2024-03-06,The Creator\n",
        )
        .unwrap();

        let log = AttendanceLog::open(&path).unwrap();
        log.append(&AttendanceRecord::at("bob", KNOWN_PROGRAM, at(9, 0, 0)))
            .unwrap();
        let log = AttendanceLog::open(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("Student Name").count(), 1);
        assert_eq!(
            text,
            "Student Name,Time,Date,Program\n\
             alice,08:00:00,2024-03-06,The Creator\n\
             bob,09:00:00,2024-03-07,The Creator\n"
        );
        assert_eq!(log.records().unwrap().len(), 2);
    }

    #[test]
    fn test_append_after_unterminated_last_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attendance.csv");
        std::fs::write(
            &path,
            "Student Name,Time,Date,Program\nalice,08:00:00,2024-03-06,The Creator",
        )
        .unwrap();

        let log = AttendanceLog::open(&path).unwrap();
        log.append(&AttendanceRecord::at("bob", KNOWN_PROGRAM, at(8, 30, 0)))
            .unwrap();
        log.append(&AttendanceRecord::at("carol", KNOWN_PROGRAM, at(8, 31, 0)))
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "Student Name,Time,Date,Program\n\
             alice,08:00:00,2024-03-06,The Creator\n\
             bob,08:30:00,2024-03-07,The Creator\n\
             carol,08:31:00,2024-03-07,The Creator\n"
        );
        let names: Vec<String> = log.records().unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn test_append_to_empty_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attendance.csv");
        std::fs::write(&path, "").unwrap();

        let log = AttendanceLog::open(&path).unwrap();
        log.append(&AttendanceRecord::at("bob", KNOWN_PROGRAM, at(8, 30, 0)))
            .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "bob,08:30:00,2024-03-07,The Creator\n");
    }

    #[test]
    fn test_append_quotes_commas() {
        let dir = tempfile::tempdir().unwrap();
        let log = AttendanceLog::open(dir.path().join("a.csv")).unwrap();
        log.append(&AttendanceRecord::at("doe, jane", KNOWN_PROGRAM, at(10, 0, 0)))
            .unwrap();

        let text = std::fs::read_to_string(log.path()).unwrap();
        assert!(text.ends_with("\"doe, jane\",10:00:00,2024-03-07,The Creator\n"));

        let records = log.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "doe, jane");
    }

    #[test]
    fn test_append_to_vanished_log_fails() {
        let dir = tempfile::tempdir().unwrap();
        let log = AttendanceLog::open(dir.path().join("a.csv")).unwrap();
        std::fs::remove_file(log.path()).unwrap();
        let err = log
            .append(&AttendanceRecord::at("bob", KNOWN_PROGRAM, at(10, 0, 0)))
            .unwrap_err();
        assert!(matches!(err, LogWriteError::Io { .. }));
    }

    #[test]
    fn test_unknown_faces_creates_dir_and_saves_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let unknowns = UnknownFaces::create(dir.path().join("unknown_faces")).unwrap();
        assert!(unknowns.dir().is_dir());

        let image = RgbImage::from_pixel(16, 16, image::Rgb([200, 10, 10]));
        let path = unknowns.save("unknown_1", &image).unwrap();
        assert_eq!(path, dir.path().join("unknown_faces/unknown_1.jpg"));

        let reloaded = image::open(&path).unwrap();
        assert_eq!((reloaded.width(), reloaded.height()), (16, 16));
    }
}
