//! SCRFD face detector via ONNX Runtime.
//!
//! Letterboxes the RGB frame into the 640x640 model input, decodes the three
//! anchor-free stride heads and suppresses overlapping boxes.

use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use rollcall_core::{BoundingBox, DetectionError, FaceCounter};
use std::path::Path;
use thiserror::Error;

const SCRFD_INPUT_SIZE: u32 = 640;
const SCRFD_MEAN: f32 = 127.5;
const SCRFD_STD: f32 = 128.0;
const SCRFD_CONFIDENCE_THRESHOLD: f32 = 0.5;
const SCRFD_NMS_THRESHOLD: f32 = 0.4;
const SCRFD_STRIDES: [usize; 3] = [8, 16, 32];
const SCRFD_ANCHORS_PER_CELL: usize = 2;
const SCRFD_MIN_OUTPUTS: usize = 9;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0}; download det_10g.onnx from insightface into the model directory")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Placement of the source frame inside the square model input.
#[derive(Debug, Clone, Copy)]
struct Letterbox {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
    width: u32,
    height: u32,
}

impl Letterbox {
    fn fit(src_width: u32, src_height: u32, target: u32) -> Self {
        let scale = (target as f32 / src_width as f32).min(target as f32 / src_height as f32);
        let width = ((src_width as f32 * scale).round() as u32).clamp(1, target);
        let height = ((src_height as f32 * scale).round() as u32).clamp(1, target);
        Self {
            scale,
            pad_x: ((target - width) / 2) as f32,
            pad_y: ((target - height) / 2) as f32,
            width,
            height,
        }
    }

    /// Map a point in model-input space back to source-frame space.
    fn to_source(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// Output tensor indices for one stride: (score, bbox, kps).
type StrideOutputs = (usize, usize, usize);

/// Raw head outputs for one stride level.
struct StrideHead<'a> {
    stride: usize,
    scores: &'a [f32],
    bboxes: &'a [f32],
    kps: &'a [f32],
}

/// SCRFD-based face detector.
pub struct FaceDetector {
    session: Session,
    strides: [StrideOutputs; 3],
}

impl FaceDetector {
    /// Load the SCRFD ONNX model from the given path.
    pub fn load(model_path: &Path) -> Result<Self, DetectorError> {
        if !model_path.exists() {
            return Err(DetectorError::ModelNotFound(model_path.display().to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        let output_names: Vec<String> = session
            .outputs()
            .iter()
            .map(|o| o.name().to_string())
            .collect();

        tracing::info!(
            path = %model_path.display(),
            outputs = ?output_names,
            "loaded SCRFD model"
        );

        if output_names.len() < SCRFD_MIN_OUTPUTS {
            return Err(DetectorError::InferenceFailed(format!(
                "SCRFD needs {SCRFD_MIN_OUTPUTS} outputs (score/bbox/kps per stride), got {}",
                output_names.len()
            )));
        }

        let strides = map_outputs(&output_names);
        tracing::debug!(?strides, "SCRFD output mapping");

        Ok(Self { session, strides })
    }

    /// Detect faces in an RGB image, most confident first.
    pub fn detect(&mut self, image: &RgbImage) -> Result<Vec<BoundingBox>, DetectorError> {
        if image.width() == 0 || image.height() == 0 {
            return Ok(Vec::new());
        }

        let letterbox = Letterbox::fit(image.width(), image.height(), SCRFD_INPUT_SIZE);
        let input = preprocess(image, &letterbox);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let mut candidates = Vec::new();
        for (slot, &stride) in SCRFD_STRIDES.iter().enumerate() {
            let (score_idx, bbox_idx, kps_idx) = self.strides[slot];
            let extract = |idx: usize, what: &str| {
                outputs[idx]
                    .try_extract_tensor::<f32>()
                    .map(|(_, data)| data)
                    .map_err(|e| DetectorError::InferenceFailed(format!("{what} stride {stride}: {e}")))
            };

            let head = StrideHead {
                stride,
                scores: extract(score_idx, "scores")?,
                bboxes: extract(bbox_idx, "bboxes")?,
                kps: extract(kps_idx, "kps")?,
            };
            candidates.extend(decode_head(&head, &letterbox, SCRFD_CONFIDENCE_THRESHOLD));
        }

        Ok(nms(candidates, SCRFD_NMS_THRESHOLD))
    }
}

impl FaceCounter for FaceDetector {
    fn count_faces(&mut self, image: &RgbImage) -> Result<Vec<BoundingBox>, DetectionError> {
        self.detect(image)
            .map_err(|e| DetectionError::Count(e.to_string()))
    }
}

/// Letterbox an RGB image into a normalized NCHW tensor.
///
/// Padding uses the mean value so it normalizes to 0.0.
fn preprocess(image: &RgbImage, letterbox: &Letterbox) -> Array4<f32> {
    let size = SCRFD_INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));

    let resized = imageops::resize(image, letterbox.width, letterbox.height, FilterType::Triangle);
    let x0 = letterbox.pad_x as u32;
    let y0 = letterbox.pad_y as u32;

    for y in 0..SCRFD_INPUT_SIZE {
        for x in 0..SCRFD_INPUT_SIZE {
            let inside = x >= x0 && x < x0 + letterbox.width && y >= y0 && y < y0 + letterbox.height;
            let rgb = if inside {
                resized.get_pixel(x - x0, y - y0).0.map(f32::from)
            } else {
                [SCRFD_MEAN; 3]
            };
            for (c, value) in rgb.iter().enumerate() {
                tensor[[0, c, y as usize, x as usize]] = (value - SCRFD_MEAN) / SCRFD_STD;
            }
        }
    }

    tensor
}

/// Map output tensors to stride slots.
///
/// Uses `score_8`/`bbox_8`/`kps_8`-style names when every one is present,
/// otherwise the insightface export order: scores 0-2, bboxes 3-5, kps 6-8.
fn map_outputs(names: &[String]) -> [StrideOutputs; 3] {
    let position = |prefix: &str, stride: usize| {
        let wanted = format!("{prefix}_{stride}");
        names.iter().position(|n| *n == wanted)
    };

    let named: Option<Vec<StrideOutputs>> = SCRFD_STRIDES
        .iter()
        .map(|&stride| {
            Some((
                position("score", stride)?,
                position("bbox", stride)?,
                position("kps", stride)?,
            ))
        })
        .collect();

    match named {
        Some(found) => [found[0], found[1], found[2]],
        None => [(0, 3, 6), (1, 4, 7), (2, 5, 8)],
    }
}

/// Decode one stride head into boxes in source-frame coordinates.
fn decode_head(head: &StrideHead<'_>, letterbox: &Letterbox, threshold: f32) -> Vec<BoundingBox> {
    let input = SCRFD_INPUT_SIZE as usize;
    let grid_w = input / head.stride;
    let grid_h = input / head.stride;
    let anchors = grid_w * grid_h * SCRFD_ANCHORS_PER_CELL;
    let stride = head.stride as f32;

    let mut boxes = Vec::new();
    for idx in 0..anchors.min(head.scores.len()) {
        let score = head.scores[idx];
        if score <= threshold {
            continue;
        }
        let Some(dist) = head.bboxes.get(idx * 4..idx * 4 + 4) else {
            continue;
        };

        let cell = idx / SCRFD_ANCHORS_PER_CELL;
        let cx = (cell % grid_w) as f32 * stride;
        let cy = (cell / grid_w) as f32 * stride;

        let (x1, y1) = letterbox.to_source(cx - dist[0] * stride, cy - dist[1] * stride);
        let (x2, y2) = letterbox.to_source(cx + dist[2] * stride, cy + dist[3] * stride);

        let landmarks = head.kps.get(idx * 10..idx * 10 + 10).map(|kps| {
            std::array::from_fn(|i| {
                letterbox.to_source(cx + kps[i * 2] * stride, cy + kps[i * 2 + 1] * stride)
            })
        });

        boxes.push(BoundingBox {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
            confidence: score,
            landmarks,
        });
    }
    boxes
}

/// Greedy non-maximum suppression; result is sorted by confidence.
fn nms(mut boxes: Vec<BoundingBox>, iou_threshold: f32) -> Vec<BoundingBox> {
    boxes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<BoundingBox> = Vec::with_capacity(boxes.len());
    for candidate in boxes {
        if kept.iter().all(|k| iou(k, &candidate) <= iou_threshold) {
            kept.push(candidate);
        }
    }
    kept
}

/// Intersection-over-Union of two boxes.
fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let inter_w = ((a.x + a.width).min(b.x + b.width) - a.x.max(b.x)).max(0.0);
    let inter_h = ((a.y + a.height).min(b.y + b.height) - a.y.max(b.y)).max(0.0);
    let inter = inter_w * inter_h;
    let union = a.width * a.height + b.width * b.height - inter;
    if union > 0.0 { inter / union } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x: f32, y: f32, w: f32, h: f32, confidence: f32) -> BoundingBox {
        BoundingBox { x, y, width: w, height: h, confidence, landmarks: None }
    }

    #[test]
    fn test_iou_identical() {
        let a = bbox(0.0, 0.0, 100.0, 100.0, 1.0);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_disjoint() {
        let a = bbox(0.0, 0.0, 10.0, 10.0, 1.0);
        let b = bbox(20.0, 20.0, 10.0, 10.0, 1.0);
        assert_eq!(iou(&a, &b), 0.0);
    }

    #[test]
    fn test_iou_half_overlap() {
        let a = bbox(0.0, 0.0, 10.0, 10.0, 1.0);
        let b = bbox(5.0, 0.0, 10.0, 10.0, 1.0);
        assert!((iou(&a, &b) - 50.0 / 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_nms_keeps_best_of_overlapping_pair() {
        let result = nms(
            vec![
                bbox(5.0, 5.0, 100.0, 100.0, 0.8),
                bbox(200.0, 200.0, 50.0, 50.0, 0.7),
                bbox(0.0, 0.0, 100.0, 100.0, 0.9),
            ],
            0.4,
        );
        let confidences: Vec<f32> = result.iter().map(|b| b.confidence).collect();
        assert_eq!(confidences, vec![0.9, 0.7]);
    }

    #[test]
    fn test_nms_empty() {
        assert!(nms(Vec::new(), 0.4).is_empty());
    }

    #[test]
    fn test_letterbox_landscape() {
        let lb = Letterbox::fit(640, 480, 640);
        assert_eq!((lb.width, lb.height), (640, 480));
        assert_eq!(lb.pad_x, 0.0);
        assert_eq!(lb.pad_y, 80.0);
    }

    #[test]
    fn test_letterbox_maps_back_to_source() {
        let lb = Letterbox::fit(320, 240, 640);
        let (x, y) = (100.0f32, 50.0f32);
        let (bx, by) = lb.to_source(x * lb.scale + lb.pad_x, y * lb.scale + lb.pad_y);
        assert!((bx - x).abs() < 1e-3, "x: {bx}");
        assert!((by - y).abs() < 1e-3, "y: {by}");
    }

    #[test]
    fn test_preprocess_padding_is_zero() {
        let image = RgbImage::from_pixel(640, 320, image::Rgb([255, 255, 255]));
        let lb = Letterbox::fit(640, 320, SCRFD_INPUT_SIZE);
        let tensor = preprocess(&image, &lb);
        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        // Top rows are padding.
        assert_eq!(tensor[[0, 0, 0, 0]], 0.0);
        // Centre is image content.
        let expected = (255.0 - SCRFD_MEAN) / SCRFD_STD;
        assert!((tensor[[0, 2, 320, 320]] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_map_outputs_named_any_order() {
        let names: Vec<String> = [
            "bbox_8", "kps_8", "score_8",
            "bbox_16", "kps_16", "score_16",
            "bbox_32", "kps_32", "score_32",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(map_outputs(&names), [(2, 0, 1), (5, 3, 4), (8, 6, 7)]);
    }

    #[test]
    fn test_map_outputs_positional_fallback() {
        let names: Vec<String> = (448..457).map(|i: usize| i.to_string()).collect();
        assert_eq!(map_outputs(&names), [(0, 3, 6), (1, 4, 7), (2, 5, 8)]);
    }

    #[test]
    fn test_decode_head_single_anchor() {
        let lb = Letterbox::fit(640, 640, SCRFD_INPUT_SIZE);
        let cells = (640 / 32) * (640 / 32) * SCRFD_ANCHORS_PER_CELL;
        let mut scores = vec![0.0f32; cells];
        let mut bboxes = vec![0.0f32; cells * 4];
        let kps = vec![0.0f32; cells * 10];

        // Anchor 2 = cell 1 = grid (x=1, y=0) → centre (32, 0).
        scores[2] = 0.9;
        bboxes[8..12].copy_from_slice(&[0.5, 0.0, 0.5, 1.0]);

        let head = StrideHead { stride: 32, scores: &scores, bboxes: &bboxes, kps: &kps };
        let boxes = decode_head(&head, &lb, 0.5);
        assert_eq!(boxes.len(), 1);
        let b = &boxes[0];
        assert!((b.x - 16.0).abs() < 1e-4);
        assert!((b.width - 32.0).abs() < 1e-4);
        assert!((b.height - 32.0).abs() < 1e-4);
        assert_eq!(b.landmarks.unwrap()[0], (32.0, 0.0));
    }
}
