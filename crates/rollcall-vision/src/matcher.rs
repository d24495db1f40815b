//! Gallery matcher: embeds every reference image once at startup, then ranks
//! the faces of each probe frame against those embeddings.

use crate::detector::{DetectorError, FaceDetector};
use crate::embedding::{rank, Embedding, GalleryEntry};
use crate::recognizer::{FaceRecognizer, RecognizerError};
use image::RgbImage;
use rollcall_core::{BoundingBox, DetectionError, FaceMatcher, Gallery, MatchSet};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatcherError {
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),
}

/// Face matcher over a fixed set of enrolled reference embeddings.
pub struct GalleryMatcher {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
    entries: Vec<GalleryEntry>,
    threshold: f32,
}

impl GalleryMatcher {
    /// Embed each gallery image. Images that cannot be read, contain no face
    /// or fail inference are skipped with a warning; they can never be matched.
    pub fn build(
        mut detector: FaceDetector,
        mut recognizer: FaceRecognizer,
        gallery: &Gallery,
        threshold: f32,
    ) -> Self {
        let entries = enroll(gallery, |image| {
            let faces = detector.detect(image)?;
            let Some(face) = faces.iter().find(|f| f.landmarks.is_some()) else {
                return Ok(None);
            };
            if faces.len() > 1 {
                tracing::debug!(
                    faces = faces.len(),
                    "several faces in reference image, using the most confident"
                );
            }
            Ok(Some(recognizer.extract(image, face)?))
        });

        tracing::info!(
            enrolled = entries.len(),
            skipped = gallery.len() - entries.len(),
            threshold,
            "gallery embeddings ready"
        );

        Self {
            detector,
            recognizer,
            entries,
            threshold,
        }
    }

    /// Number of gallery images with a usable embedding.
    pub fn enrolled(&self) -> usize {
        self.entries.len()
    }

    fn embed_faces(
        &mut self,
        image: &RgbImage,
        faces: &[BoundingBox],
    ) -> Result<Vec<Embedding>, MatcherError> {
        faces
            .iter()
            .filter(|face| face.landmarks.is_some())
            .map(|face| self.recognizer.extract(image, face).map_err(MatcherError::from))
            .collect()
    }

    fn search(&mut self, image: &RgbImage) -> Result<Vec<MatchSet>, MatcherError> {
        let faces = self.detector.detect(image)?;
        let probes = self.embed_faces(image, &faces)?;
        Ok(probes
            .iter()
            .map(|probe| rank(probe, &self.entries, self.threshold))
            .collect())
    }
}

impl FaceMatcher for GalleryMatcher {
    fn find(&mut self, image: &RgbImage) -> Result<Vec<MatchSet>, DetectionError> {
        self.search(image)
            .map_err(|e| DetectionError::Match(e.to_string()))
    }
}

/// Load and embed every gallery image with `embed`, which returns `None` when
/// the image holds no usable face.
fn enroll<F>(gallery: &Gallery, mut embed: F) -> Vec<GalleryEntry>
where
    F: FnMut(&RgbImage) -> Result<Option<Embedding>, MatcherError>,
{
    let mut entries = Vec::with_capacity(gallery.len());

    for identity in gallery.identities() {
        let image = match image::open(&identity.reference) {
            Ok(img) => img.to_rgb8(),
            Err(e) => {
                tracing::warn!(
                    name = %identity.name,
                    path = %identity.reference.display(),
                    error = %e,
                    "unreadable reference image, skipping"
                );
                continue;
            }
        };

        match embed(&image) {
            Ok(Some(embedding)) => entries.push(GalleryEntry {
                reference: identity.reference.clone(),
                embedding,
            }),
            Ok(None) => tracing::warn!(
                name = %identity.name,
                path = %identity.reference.display(),
                "no face in reference image, skipping"
            ),
            Err(e) => tracing::warn!(
                name = %identity.name,
                path = %identity.reference.display(),
                error = %e,
                "cannot embed reference image, skipping"
            ),
        }
    }

    entries
}
