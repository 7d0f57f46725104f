use artrack_types::{SparseBow, Target};

use crate::tree::Vocabulary;

/// One scored candidate from a vocabulary query, ordered by descending
/// similarity then ascending (lexicographic) target id for a stable tie
/// break.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub target_id: String,
    pub similarity: f32,
}

impl Vocabulary {
    fn idf_table(&self) -> Vec<f32> {
        self.words().iter().map(|w| w.idf).collect()
    }

    /// Top-K targets by TF-IDF weighted cosine similarity against
    /// `frame_bow`, at or above `min_similarity`. If fewer than `top_k`
    /// targets are registered at all, the query is bypassed: every
    /// registered target is returned regardless of `min_similarity`, still
    /// sorted by the usual tie-break order (the "K-bypass" rule).
    pub fn query(&self, frame_bow: &SparseBow, targets: &[Target], top_k: usize, min_similarity: f32) -> Vec<Candidate> {
        let idf = self.idf_table();
        let frame_norm = frame_bow.weighted_norm(&idf);
        let bypass_threshold = targets.len() < top_k;

        let mut candidates: Vec<Candidate> = targets
            .iter()
            .filter_map(|target| {
                let similarity = cosine_similarity(frame_bow, &target.bow, &idf, frame_norm);
                if bypass_threshold || similarity >= min_similarity {
                    Some(Candidate {
                        target_id: target.id.clone(),
                        similarity,
                    })
                } else {
                    None
                }
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.target_id.cmp(&b.target_id))
        });

        // Fewer registered targets than `top_k` already returned everything
        // above via the bypass; `truncate` is a no-op in that case too.
        candidates.truncate(top_k);
        candidates
    }
}

fn cosine_similarity(frame_bow: &SparseBow, target_bow: &SparseBow, idf: &[f32], frame_norm: f32) -> f32 {
    let target_norm = target_bow.weighted_norm(idf);
    if frame_norm <= 0.0 || target_norm <= 0.0 {
        return 0.0;
    }
    let dot = frame_bow.weighted_dot(target_bow, idf);
    (dot / (frame_norm * target_norm)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{build, TargetSource};
    use artrack_features::reference::ReferenceExtractor;
    use artrack_features::FeatureExtractor;
    use artrack_types::GrayImage;

    fn checkerboard(size: u32, phase: u32) -> GrayImage {
        let mut data = vec![0u8; (size * size) as usize];
        for y in 0..size {
            for x in 0..size {
                let on = ((x / 8) + (y / 8) + phase) % 2 == 0;
                data[(y * size + x) as usize] = if on { 230 } else { 15 };
            }
        }
        GrayImage {
            data,
            width: size,
            height: size,
        }
    }

    #[test]
    fn querying_a_target_with_itself_scores_highest() {
        let sources = vec![
            TargetSource {
                id: "a".into(),
                image: checkerboard(128, 0),
            },
            TargetSource {
                id: "b".into(),
                image: checkerboard(128, 1),
            },
        ];
        let extractor = ReferenceExtractor::new(32);
        let (vocab, targets, _report) = build(&sources, &extractor, 4, 2).unwrap();

        let query_bow = vocab.quantize(&targets[0].descriptors);
        let candidates = vocab.query(&query_bow, &targets, 3, 0.0);
        assert_eq!(candidates[0].target_id, "a");
    }

    #[test]
    fn k_bypass_returns_fewer_than_top_k_when_few_targets() {
        let sources = vec![TargetSource {
            id: "solo".into(),
            image: checkerboard(128, 0),
        }];
        let extractor = ReferenceExtractor::new(32);
        let (vocab, targets, _report) = build(&sources, &extractor, 4, 2).unwrap();
        let query_bow = vocab.quantize(&targets[0].descriptors);
        let candidates = vocab.query(&query_bow, &targets, 3, 0.0);
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn k_bypass_ignores_min_similarity_when_few_targets() {
        let sources = vec![TargetSource {
            id: "solo".into(),
            image: checkerboard(128, 0),
        }];
        let extractor = ReferenceExtractor::new(32);
        let (vocab, targets, _report) = build(&sources, &extractor, 4, 2).unwrap();

        // A query BoW unrelated to "solo" scores near zero against it, well
        // below the default min_similarity (0.05). With only one registered
        // target and top_k = 3, the bypass must still return it.
        let extractor = ReferenceExtractor::new(vocab.descriptor_length());
        let unrelated_image = checkerboard(128, 1);
        let unrelated_keypoints = extractor.detect(&unrelated_image);
        let unrelated_descriptors = extractor.compute(&unrelated_image, &unrelated_keypoints);
        let unrelated_bow = vocab.quantize(&unrelated_descriptors);

        let candidates = vocab.query(&unrelated_bow, &targets, 3, 0.05);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].target_id, "solo");
    }

    #[test]
    fn min_similarity_filters_out_unrelated_targets() {
        let sources = vec![
            TargetSource {
                id: "a".into(),
                image: checkerboard(128, 0),
            },
            TargetSource {
                id: "b".into(),
                image: checkerboard(128, 1),
            },
        ];
        let extractor = ReferenceExtractor::new(32);
        let (vocab, targets, _report) = build(&sources, &extractor, 4, 2).unwrap();
        let query_bow = vocab.quantize(&targets[0].descriptors);
        // top_k == targets.len() here, so the K-bypass does not apply and
        // min_similarity is actually enforced.
        let candidates = vocab.query(&query_bow, &targets, 2, 1.1);
        assert!(candidates.is_empty());
    }
}
