use artrack_features::FeatureExtractor;
use artrack_types::wire::{Database, Header, WireBowEntry, WireKeypoint, WireTarget, WireWord, SCHEMA_VERSION};
use artrack_types::{Descriptor, GrayImage, Keypoint, SparseBow, Target};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::tree::{Vocabulary, Word};

/// Fixed seed for the clustering RNG so a given corpus always produces the
/// same vocabulary, word-for-word.
pub const VOCAB_BUILD_SEED: u64 = 0xA0CA_B000;

/// Targets with fewer keypoints than this are still indexed, but flagged
/// with a [`BuildWarning`] since their BoW will be sparse and noisy.
pub const MIN_KEYPOINTS_FOR_QUERY: usize = 10;

const KMEANS_ITERATIONS: usize = 15;

/// One reference image to index, already decoded to grayscale by the caller.
pub struct TargetSource {
    pub id: String,
    pub image: GrayImage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildWarning {
    pub target_id: String,
    pub num_keypoints: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    pub warnings: Vec<BuildWarning>,
    pub num_words: usize,
    pub num_descriptors: usize,
}

/// Builds a vocabulary and the corresponding [`Target`]s from a set of
/// reference images. Runs `extractor` once per image, pools every resulting
/// descriptor, and partitions the pool via hierarchical k-means (Hamming
/// distance, majority-vote byte centroids) down to `levels` deep with
/// `branching_factor` children per node.
pub fn build(
    sources: &[TargetSource],
    extractor: &dyn FeatureExtractor,
    branching_factor: u32,
    levels: u32,
) -> Result<(Vocabulary, Vec<Target>, BuildReport)> {
    if branching_factor < 2 {
        return Err(Error::InvalidBranchingFactor(branching_factor));
    }
    if levels == 0 {
        return Err(Error::InvalidLevels(levels));
    }

    let mut warnings = Vec::new();
    let mut per_target: Vec<(String, u32, u32, Vec<Keypoint>, Vec<Descriptor>)> = Vec::with_capacity(sources.len());
    let mut pool: Vec<Descriptor> = Vec::new();

    for source in sources {
        let keypoints = extractor.detect(&source.image);
        let descriptors = extractor.compute(&source.image, &keypoints);
        debug!(target = %source.id, num_keypoints = keypoints.len(), "extracted target features");
        if keypoints.len() < MIN_KEYPOINTS_FOR_QUERY {
            warn!(target = %source.id, num_keypoints = keypoints.len(), "target has few keypoints");
            warnings.push(BuildWarning {
                target_id: source.id.clone(),
                num_keypoints: keypoints.len(),
            });
        }
        pool.extend(descriptors.iter().cloned());
        per_target.push((source.id.clone(), source.image.width, source.image.height, keypoints, descriptors));
    }

    if pool.is_empty() {
        return Err(Error::EmptyCorpus);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(VOCAB_BUILD_SEED);
    let centroids = recurse(&pool, levels, branching_factor, &mut rng);
    let descriptor_length = extractor.descriptor_length();
    let words: Vec<Word> = centroids
        .into_iter()
        .map(|centroid| Word { centroid, idf: 0.0 })
        .collect();
    let mut vocabulary = Vocabulary::new(words, branching_factor, levels, descriptor_length);

    let mut targets = Vec::with_capacity(per_target.len());
    let mut bows = Vec::with_capacity(per_target.len());
    for (id, width, height, keypoints, descriptors) in per_target {
        let bow = vocabulary.quantize(&descriptors);
        bows.push(bow.clone());
        targets.push(Target::new(id, width, height, keypoints, descriptors, bow));
    }

    apply_idf(&mut vocabulary, &bows);

    let report = BuildReport {
        warnings,
        num_words: vocabulary.len(),
        num_descriptors: pool.len(),
    };
    Ok((vocabulary, targets, report))
}

/// Encodes a built vocabulary and its targets as a wire-format [`Database`],
/// ready for `bincode` serialization to disk. The inverse of what
/// `artrack-registry::Registry::load` expects.
pub fn to_database(vocab: &Vocabulary, targets: &[Target]) -> Database {
    let header = Header {
        schema_version: SCHEMA_VERSION,
        descriptor_length: vocab.descriptor_length() as u32,
        num_targets: targets.len() as u32,
        vocab_size: vocab.len() as u32,
        branching_factor: vocab.branching_factor(),
        levels: vocab.levels(),
    };
    let vocabulary = vocab.words().iter().map(|w| WireWord { centroid: w.centroid.as_bytes().to_vec() }).collect();
    let idf = vocab.words().iter().map(|w| w.idf).collect();
    let wire_targets = targets
        .iter()
        .map(|t| WireTarget {
            id: t.id.clone(),
            ref_width: t.ref_width,
            ref_height: t.ref_height,
            keypoints: t.keypoints.iter().map(|k| WireKeypoint { x: k.position.x, y: k.position.y, response: k.response }).collect(),
            descriptors: t.descriptors.iter().flat_map(|d| d.as_bytes().to_vec()).collect(),
            bow: t.bow.iter().map(|(word_id, count)| WireBowEntry { word_id, count }).collect(),
        })
        .collect();
    Database { header, vocabulary, idf, targets: wire_targets }
}

/// Document frequency over targets: `idf_w = ln(N / n_w)`, where `n_w` is
/// the number of targets whose BoW has a non-zero count for word `w`. Never
/// negative since `n_w <= N` always holds.
fn apply_idf(vocabulary: &mut Vocabulary, bows: &[SparseBow]) {
    let n = bows.len() as f32;
    let mut document_frequency = vec![0u32; vocabulary.len()];
    for bow in bows {
        for (word_id, _) in bow.iter() {
            if let Some(slot) = document_frequency.get_mut(word_id as usize) {
                *slot += 1;
            }
        }
    }
    vocabulary.set_idf(|word_id| {
        let n_w = document_frequency[word_id];
        if n_w == 0 {
            0.0
        } else {
            (n / n_w as f32).ln()
        }
    });
}

/// Recursively partitions `descriptors` via k-means down to `levels` deep,
/// returning the leaf centroids in a stable, deterministic order.
fn recurse(descriptors: &[Descriptor], levels: u32, branching_factor: u32, rng: &mut ChaCha8Rng) -> Vec<Descriptor> {
    if levels == 0 || descriptors.len() <= branching_factor as usize {
        return vec![majority_centroid(descriptors)];
    }

    let clusters = kmeans(descriptors, branching_factor as usize, rng);
    let mut leaves = Vec::new();
    for cluster in clusters {
        if cluster.is_empty() {
            continue;
        }
        leaves.extend(recurse(&cluster, levels - 1, branching_factor, rng));
    }
    if leaves.is_empty() {
        leaves.push(majority_centroid(descriptors));
    }
    leaves
}

/// Lloyd's algorithm over Hamming distance: centroids are recomputed each
/// iteration as the bitwise majority vote of their assigned cluster.
fn kmeans(descriptors: &[Descriptor], k: usize, rng: &mut ChaCha8Rng) -> Vec<Vec<Descriptor>> {
    let k = k.min(descriptors.len()).max(1);
    let mut centroids: Vec<Descriptor> = descriptors
        .choose_multiple(rng, k)
        .cloned()
        .collect();

    let mut assignment = vec![0usize; descriptors.len()];
    for _ in 0..KMEANS_ITERATIONS {
        let mut changed = false;
        for (i, d) in descriptors.iter().enumerate() {
            let nearest = centroids
                .iter()
                .enumerate()
                .min_by_key(|(_, c)| c.hamming_distance(d))
                .map(|(idx, _)| idx)
                .unwrap_or(0);
            if assignment[i] != nearest {
                assignment[i] = nearest;
                changed = true;
            }
        }

        let mut clusters: Vec<Vec<Descriptor>> = vec![Vec::new(); centroids.len()];
        for (i, d) in descriptors.iter().enumerate() {
            clusters[assignment[i]].push(d.clone());
        }
        for (centroid, cluster) in centroids.iter_mut().zip(clusters.iter()) {
            if !cluster.is_empty() {
                *centroid = majority_centroid(cluster);
            }
        }
        if !changed {
            break;
        }
    }

    let mut clusters: Vec<Vec<Descriptor>> = vec![Vec::new(); centroids.len()];
    for (i, d) in descriptors.iter().enumerate() {
        clusters[assignment[i]].push(d.clone());
    }
    clusters
}

/// Bitwise majority vote across a cluster of same-length descriptors, bit by
/// bit. Ties (exact half) round to 1.
fn majority_centroid(descriptors: &[Descriptor]) -> Descriptor {
    assert!(!descriptors.is_empty(), "cannot compute a centroid of zero descriptors");
    let length = descriptors[0].len();
    let n = descriptors.len();
    let mut counts = vec![0u32; length * 8];
    for d in descriptors {
        for (byte_idx, byte) in d.as_bytes().iter().enumerate() {
            for bit in 0..8 {
                if byte & (1 << bit) != 0 {
                    counts[byte_idx * 8 + bit] += 1;
                }
            }
        }
    }
    let mut bytes = vec![0u8; length];
    for (bit_idx, &count) in counts.iter().enumerate() {
        if (count as usize) * 2 >= n {
            bytes[bit_idx / 8] |= 1 << (bit_idx % 8);
        }
    }
    Descriptor::new(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use artrack_features::reference::ReferenceExtractor;

    fn checkerboard(size: u32) -> GrayImage {
        let mut data = vec![0u8; (size * size) as usize];
        for y in 0..size {
            for x in 0..size {
                let on = ((x / 8) + (y / 8)) % 2 == 0;
                data[(y * size + x) as usize] = if on { 220 } else { 20 };
            }
        }
        GrayImage {
            data,
            width: size,
            height: size,
        }
    }

    #[test]
    fn builds_a_nonempty_vocabulary() {
        let sources = vec![
            TargetSource {
                id: "a".into(),
                image: checkerboard(128),
            },
            TargetSource {
                id: "b".into(),
                image: checkerboard(160),
            },
        ];
        let extractor = ReferenceExtractor::new(32);
        let (vocab, targets, report) = build(&sources, &extractor, 4, 2).unwrap();
        assert!(!vocab.is_empty());
        assert_eq!(targets.len(), 2);
        assert_eq!(report.num_words, vocab.len());
    }

    #[test]
    fn idf_is_never_negative() {
        let sources = vec![
            TargetSource {
                id: "a".into(),
                image: checkerboard(128),
            },
            TargetSource {
                id: "b".into(),
                image: checkerboard(160),
            },
        ];
        let extractor = ReferenceExtractor::new(32);
        let (vocab, _targets, _report) = build(&sources, &extractor, 4, 2).unwrap();
        for word in vocab.words() {
            assert!(word.idf >= 0.0);
        }
    }

    #[test]
    fn build_is_deterministic() {
        let sources = vec![TargetSource {
            id: "a".into(),
            image: checkerboard(128),
        }];
        let extractor = ReferenceExtractor::new(32);
        let (vocab1, _, _) = build(&sources, &extractor, 4, 2).unwrap();
        let (vocab2, _, _) = build(&sources, &extractor, 4, 2).unwrap();
        assert_eq!(vocab1, vocab2);
    }

    #[test]
    fn rejects_invalid_branching_factor() {
        let extractor = ReferenceExtractor::new(32);
        let err = build(&[], &extractor, 1, 2).unwrap_err();
        assert_eq!(err, Error::InvalidBranchingFactor(1));
    }
}
