//! Known-identity gallery: a flat directory of reference images.
//!
//! Each `.jpg`/`.png` file is one enrolled person. The lower-cased file stem
//! is that person's attendance key, so `Alice.jpg` marks `alice`.
//!
//! Extensions match case-insensitively: `Erin.JPG` and `frank.Png` are
//! enrolled too. `.jpeg` files are not.

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

const REFERENCE_EXTENSIONS: [&str; 2] = ["jpg", "png"];

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("cannot read gallery directory {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A person enrolled via a reference image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KnownIdentity {
    pub name: String,
    pub reference: PathBuf,
}

/// Identities loaded once at startup; read-only afterwards.
#[derive(Debug, Clone)]
pub struct Gallery {
    dir: PathBuf,
    identities: Vec<KnownIdentity>,
}

impl Gallery {
    /// Scan `dir` for reference images. Subdirectories and other files are ignored.
    pub fn scan(dir: impl AsRef<Path>) -> Result<Self, GalleryError> {
        let dir = dir.as_ref();
        let unreadable = |source| GalleryError::Unreadable {
            path: dir.display().to_string(),
            source,
        };

        let mut identities = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(unreadable)? {
            let path = entry.map_err(unreadable)?.path();
            if !path.is_file() || !is_reference_image(&path) {
                continue;
            }
            let Some(name) = identity_key(&path) else {
                continue;
            };
            identities.push(KnownIdentity {
                name,
                reference: path,
            });
        }
        // read_dir order is platform-defined; keep scans reproducible.
        identities.sort_by(|a, b| a.reference.cmp(&b.reference));

        tracing::info!(
            dir = %dir.display(),
            count = identities.len(),
            "gallery scanned"
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            identities,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn identities(&self) -> &[KnownIdentity] {
        &self.identities
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

/// Attendance key for a reference image: lower-cased file name without extension.
pub fn identity_key(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() {
        return None;
    }
    Some(stem.to_lowercase())
}

fn is_reference_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            REFERENCE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_identity_key_lowercases_and_strips_extension() {
        assert_eq!(identity_key(Path::new("images/Alice.jpg")).as_deref(), Some("alice"));
        assert_eq!(identity_key(Path::new("BOB.PNG")).as_deref(), Some("bob"));
        assert_eq!(identity_key(Path::new("mary.jane.png")).as_deref(), Some("mary.jane"));
    }

    #[test]
    fn test_identity_key_no_file_name() {
        assert_eq!(identity_key(Path::new("/")), None);
    }

    #[test]
    fn test_scan_keeps_only_reference_images() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Alice.jpg"), b"x").unwrap();
        fs::write(dir.path().join("bob.png"), b"x").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        fs::write(dir.path().join("carol.jpeg"), b"x").unwrap();
        fs::create_dir(dir.path().join("dave.jpg")).unwrap();

        let gallery = Gallery::scan(dir.path()).unwrap();
        let names: Vec<&str> = gallery.identities().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob"]);
        assert_eq!(gallery.identities()[0].reference, dir.path().join("Alice.jpg"));
    }

    #[test]
    fn test_scan_matches_extension_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Erin.JPG"), b"x").unwrap();
        fs::write(dir.path().join("frank.Png"), b"x").unwrap();
        fs::write(dir.path().join("gina.JPEG"), b"x").unwrap();

        let gallery = Gallery::scan(dir.path()).unwrap();
        let names: Vec<&str> = gallery.identities().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["erin", "frank"]);
    }

    #[test]
    fn test_scan_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = Gallery::scan(dir.path()).unwrap();
        assert!(gallery.is_empty());
        assert_eq!(gallery.dir(), dir.path());
    }

    #[test]
    fn test_scan_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = Gallery::scan(dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, GalleryError::Unreadable { .. }));
    }
}
