use rollcall_core::{Candidate, MatchSet};
use std::path::PathBuf;

/// Face embedding vector (512-dimensional for ArcFace).
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    /// Build an L2-normalized embedding. A zero vector is kept as is.
    pub fn normalized(raw: Vec<f32>) -> Self {
        let norm = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
        let values = if norm > 0.0 {
            raw.into_iter().map(|x| x / norm).collect()
        } else {
            raw
        };
        Self { values }
    }

    /// Cosine similarity in [-1, 1]. Higher = more similar.
    pub fn similarity(&self, other: &Embedding) -> f32 {
        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;
        for (a, b) in self.values.iter().zip(other.values.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }
        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom > 0.0 { dot / denom } else { 0.0 }
    }
}

/// An enrolled reference image and its embedding.
#[derive(Debug, Clone)]
pub struct GalleryEntry {
    pub reference: PathBuf,
    pub embedding: Embedding,
}

/// Gallery entries at or above `threshold`, best first.
pub fn rank(probe: &Embedding, gallery: &[GalleryEntry], threshold: f32) -> MatchSet {
    let mut ranked: MatchSet = gallery
        .iter()
        .map(|entry| Candidate {
            identity: entry.reference.clone(),
            similarity: probe.similarity(&entry.embedding),
        })
        .filter(|c| c.similarity >= threshold)
        .collect();
    ranked.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, values: Vec<f32>) -> GalleryEntry {
        GalleryEntry {
            reference: PathBuf::from(format!("images/{name}.jpg")),
            embedding: Embedding { values },
        }
    }

    #[test]
    fn test_similarity_identical() {
        let a = Embedding { values: vec![1.0, 0.0, 0.0] };
        assert!((a.similarity(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_similarity_orthogonal_and_opposite() {
        let a = Embedding { values: vec![1.0, 0.0] };
        let b = Embedding { values: vec![0.0, 1.0] };
        let c = Embedding { values: vec![-1.0, 0.0] };
        assert!(a.similarity(&b).abs() < 1e-6);
        assert!((a.similarity(&c) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_similarity_zero_vector() {
        let a = Embedding { values: vec![0.0, 0.0] };
        let b = Embedding { values: vec![1.0, 0.0] };
        assert_eq!(a.similarity(&b), 0.0);
    }

    #[test]
    fn test_normalized_unit_length() {
        let e = Embedding::normalized(vec![3.0, 4.0]);
        assert!((e.values[0] - 0.6).abs() < 1e-6);
        assert!((e.values[1] - 0.8).abs() < 1e-6);
        assert_eq!(Embedding::normalized(vec![0.0, 0.0]).values, vec![0.0, 0.0]);
    }

    #[test]
    fn test_rank_orders_and_filters() {
        let probe = Embedding { values: vec![1.0, 0.0, 0.0] };
        let gallery = vec![
            entry("decoy", vec![0.0, 1.0, 0.0]),
            entry("close", vec![0.8, 0.6, 0.0]),
            entry("exact", vec![1.0, 0.0, 0.0]),
        ];
        let ranked = rank(&probe, &gallery, 0.5);
        let names: Vec<_> = ranked
            .iter()
            .map(|c| c.identity.file_stem().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["exact", "close"]);
        assert!((ranked[0].similarity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_rank_empty_gallery() {
        let probe = Embedding { values: vec![1.0, 0.0] };
        assert!(rank(&probe, &[], 0.4).is_empty());
    }
}
