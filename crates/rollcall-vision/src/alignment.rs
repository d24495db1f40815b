//! Face alignment via a 4-DOF similarity transform.
//!
//! Maps the five detected landmarks onto the ArcFace reference positions and
//! warps the face into a 112x112 RGB crop.

use image::{Rgb, RgbImage};

/// ArcFace reference landmarks for a 112x112 output.
const REFERENCE_LANDMARKS_112: [(f32, f32); 5] = [
    (38.2946, 51.6963), // left eye
    (73.5318, 51.5014), // right eye
    (56.0252, 71.7366), // nose
    (41.5493, 92.3655), // left mouth
    (70.7299, 92.2041), // right mouth
];

pub const ALIGNED_SIZE: u32 = 112;

/// Similarity transform `dst = [a -b; b a] * src + [tx; ty]`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Similarity {
    a: f32,
    b: f32,
    tx: f32,
    ty: f32,
}

impl Similarity {
    /// Least-squares fit from `src` to `dst` (closed form on centred points).
    fn estimate(src: &[(f32, f32); 5], dst: &[(f32, f32); 5]) -> Self {
        let n = src.len() as f32;
        let mean = |pts: &[(f32, f32); 5]| {
            let (sx, sy) = pts.iter().fold((0.0, 0.0), |(ax, ay), &(x, y)| (ax + x, ay + y));
            (sx / n, sy / n)
        };
        let (smx, smy) = mean(src);
        let (dmx, dmy) = mean(dst);

        let mut dot = 0.0f32;
        let mut cross = 0.0f32;
        let mut norm = 0.0f32;
        for (&(sx, sy), &(dx, dy)) in src.iter().zip(dst.iter()) {
            let (sx, sy) = (sx - smx, sy - smy);
            let (dx, dy) = (dx - dmx, dy - dmy);
            dot += sx * dx + sy * dy;
            cross += sx * dy - sy * dx;
            norm += sx * sx + sy * sy;
        }

        let (a, b) = if norm > f32::EPSILON {
            (dot / norm, cross / norm)
        } else {
            (1.0, 0.0)
        };

        Self {
            a,
            b,
            tx: dmx - (a * smx - b * smy),
            ty: dmy - (b * smx + a * smy),
        }
    }

    fn apply(&self, (x, y): (f32, f32)) -> (f32, f32) {
        (
            self.a * x - self.b * y + self.tx,
            self.b * x + self.a * y + self.ty,
        )
    }

    /// Map a destination point back to the source; `None` for a degenerate transform.
    fn invert(&self, (x, y): (f32, f32)) -> Option<(f32, f32)> {
        let det = self.a * self.a + self.b * self.b;
        if det <= f32::EPSILON {
            return None;
        }
        let (x, y) = (x - self.tx, y - self.ty);
        Some(((self.a * x + self.b * y) / det, (-self.b * x + self.a * y) / det))
    }
}

/// Warp the face described by `landmarks` into an aligned 112x112 crop.
///
/// Pixels that fall outside the source frame are black.
pub fn align_face(image: &RgbImage, landmarks: &[(f32, f32); 5]) -> RgbImage {
    let transform = Similarity::estimate(landmarks, &REFERENCE_LANDMARKS_112);
    RgbImage::from_fn(ALIGNED_SIZE, ALIGNED_SIZE, |u, v| {
        transform
            .invert((u as f32, v as f32))
            .map(|(x, y)| sample_bilinear(image, x, y))
            .unwrap_or(Rgb([0, 0, 0]))
    })
}

fn sample_bilinear(image: &RgbImage, x: f32, y: f32) -> Rgb<u8> {
    let (w, h) = (image.width() as i64, image.height() as i64);
    if w == 0 || h == 0 || x < -1.0 || y < -1.0 || x > w as f32 || y > h as f32 {
        return Rgb([0, 0, 0]);
    }

    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let at = |px: i64, py: i64| -> [f32; 3] {
        if px < 0 || py < 0 || px >= w || py >= h {
            [0.0; 3]
        } else {
            image.get_pixel(px as u32, py as u32).0.map(f32::from)
        }
    };

    let (tl, tr, bl, br) = (at(x0, y0), at(x0 + 1, y0), at(x0, y0 + 1), at(x0 + 1, y0 + 1));
    let mut out = [0u8; 3];
    for c in 0..3 {
        let top = tl[c] * (1.0 - fx) + tr[c] * fx;
        let bottom = bl[c] * (1.0 - fx) + br[c] * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: (f32, f32), b: (f32, f32)) -> bool {
        (a.0 - b.0).abs() < 1e-3 && (a.1 - b.1).abs() < 1e-3
    }

    #[test]
    fn test_estimate_identity() {
        let t = Similarity::estimate(&REFERENCE_LANDMARKS_112, &REFERENCE_LANDMARKS_112);
        assert!((t.a - 1.0).abs() < 1e-5);
        assert!(t.b.abs() < 1e-5);
        assert!(t.tx.abs() < 1e-3 && t.ty.abs() < 1e-3);
    }

    #[test]
    fn test_estimate_recovers_scale_and_shift() {
        let src: [(f32, f32); 5] =
            REFERENCE_LANDMARKS_112.map(|(x, y)| (x * 2.0 + 40.0, y * 2.0 + 10.0));
        let t = Similarity::estimate(&src, &REFERENCE_LANDMARKS_112);
        for (s, d) in src.iter().zip(REFERENCE_LANDMARKS_112.iter()) {
            assert!(close(t.apply(*s), *d), "{:?} -> {:?}", s, t.apply(*s));
        }
    }

    #[test]
    fn test_invert_round_trips() {
        let t = Similarity { a: 0.8, b: 0.3, tx: 5.0, ty: -2.0 };
        let p = (17.0, 42.0);
        let back = t.invert(t.apply(p)).unwrap();
        assert!(close(back, p));
    }

    #[test]
    fn test_invert_degenerate() {
        let t = Similarity { a: 0.0, b: 0.0, tx: 0.0, ty: 0.0 };
        assert!(t.invert((1.0, 1.0)).is_none());
    }

    #[test]
    fn test_align_uniform_face_stays_uniform() {
        let image = RgbImage::from_pixel(400, 400, Rgb([90, 120, 150]));
        let landmarks: [(f32, f32); 5] =
            REFERENCE_LANDMARKS_112.map(|(x, y)| (x * 1.5 + 100.0, y * 1.5 + 100.0));
        let aligned = align_face(&image, &landmarks);
        assert_eq!(aligned.dimensions(), (ALIGNED_SIZE, ALIGNED_SIZE));
        assert!(aligned.pixels().all(|p| *p == Rgb([90, 120, 150])));
    }

    #[test]
    fn test_align_outside_frame_is_black() {
        let image = RgbImage::from_pixel(10, 10, Rgb([255, 255, 255]));
        let landmarks: [(f32, f32); 5] =
            REFERENCE_LANDMARKS_112.map(|(x, y)| (x + 1000.0, y + 1000.0));
        let aligned = align_face(&image, &landmarks);
        assert_eq!(*aligned.get_pixel(56, 56), Rgb([0, 0, 0]));
    }
}
