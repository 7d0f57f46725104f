use artrack_types::{Descriptor, GrayImage, Keypoint};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::traits::FeatureExtractor;

const PATCH_RADIUS: i32 = 15;

/// A deterministic synthetic corner detector + BRIEF-style binary descriptor.
///
/// This is **not** a production BRISK implementation — the spec treats the
/// BRISK-family detector/descriptor as an external primitive
/// (`FeatureExtractor`) the caller links against. `ReferenceExtractor` exists
/// so the rest of the pipeline (vocabulary, detector, flow, scheduler) has
/// something deterministic and dependency-free to test against; it detects
/// corners by local intensity variance and samples a fixed set of
/// pixel-intensity comparisons for the descriptor, the same family of
/// technique as ORB/BRIEF.
pub struct ReferenceExtractor {
    descriptor_length: usize,
    test_pairs: Vec<((i32, i32), (i32, i32))>,
}

impl ReferenceExtractor {
    pub fn new(descriptor_length: usize) -> Self {
        Self::with_seed(descriptor_length, 0xBEA7_5EED)
    }

    pub fn with_seed(descriptor_length: usize, seed: u64) -> Self {
        let num_bits = descriptor_length * 8;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let test_pairs = (0..num_bits)
            .map(|_| {
                let sample = |rng: &mut ChaCha8Rng| {
                    (
                        rng.random_range(-PATCH_RADIUS..=PATCH_RADIUS),
                        rng.random_range(-PATCH_RADIUS..=PATCH_RADIUS),
                    )
                };
                (sample(&mut rng), sample(&mut rng))
            })
            .collect();
        Self {
            descriptor_length,
            test_pairs,
        }
    }

    fn variance_at(image: &GrayImage, x: i32, y: i32, radius: i32) -> f32 {
        let mut sum = 0.0f64;
        let mut sum_sq = 0.0f64;
        let mut n = 0.0f64;
        for dy in -radius..=radius {
            let py = y + dy;
            if py < 0 || py >= image.height as i32 {
                continue;
            }
            for dx in -radius..=radius {
                let px = x + dx;
                if px < 0 || px >= image.width as i32 {
                    continue;
                }
                let v = image.pixel(px as u32, py as u32) as f64;
                sum += v;
                sum_sq += v * v;
                n += 1.0;
            }
        }
        if n == 0.0 {
            return 0.0;
        }
        let mean = sum / n;
        ((sum_sq / n) - mean * mean).max(0.0) as f32
    }

    fn sample(image: &GrayImage, kx: f32, ky: f32, dx: i32, dy: i32) -> u8 {
        let x = (kx as i32 + dx).clamp(0, image.width as i32 - 1) as u32;
        let y = (ky as i32 + dy).clamp(0, image.height as i32 - 1) as u32;
        image.pixel(x, y)
    }
}

impl FeatureExtractor for ReferenceExtractor {
    fn detect(&self, image: &GrayImage) -> Vec<Keypoint> {
        const STEP: i32 = 6;
        const BORDER: i32 = PATCH_RADIUS + 1;
        let mut keypoints = Vec::new();
        let w = image.width as i32;
        let h = image.height as i32;
        let mut y = BORDER;
        while y < h - BORDER {
            let mut x = BORDER;
            while x < w - BORDER {
                let response = Self::variance_at(image, x, y, 3);
                if response > 4.0 {
                    keypoints.push(Keypoint::new(x as f32, y as f32, response));
                }
                x += STEP;
            }
            y += STEP;
        }
        keypoints
    }

    fn compute(&self, image: &GrayImage, keypoints: &[Keypoint]) -> Vec<Descriptor> {
        keypoints
            .iter()
            .map(|kp| {
                let mut bytes = vec![0u8; self.descriptor_length];
                for (bit_idx, &((x1, y1), (x2, y2))) in self.test_pairs.iter().enumerate() {
                    let v1 = Self::sample(image, kp.position.x, kp.position.y, x1, y1);
                    let v2 = Self::sample(image, kp.position.x, kp.position.y, x2, y2);
                    if v1 < v2 {
                        let byte_idx = bit_idx / 8;
                        let bit = bit_idx % 8;
                        bytes[byte_idx] |= 1 << bit;
                    }
                }
                Descriptor::new(bytes)
            })
            .collect()
    }

    fn descriptor_length(&self) -> usize {
        self.descriptor_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard(size: u32) -> GrayImage {
        let mut data = vec![0u8; (size * size) as usize];
        for y in 0..size {
            for x in 0..size {
                let on = ((x / 8) + (y / 8)) % 2 == 0;
                data[(y * size + x) as usize] = if on { 240 } else { 10 };
            }
        }
        GrayImage {
            data,
            width: size,
            height: size,
        }
    }

    #[test]
    fn detects_some_keypoints_on_checkerboard() {
        let image = checkerboard(128);
        let extractor = ReferenceExtractor::new(64);
        let kps = extractor.detect(&image);
        assert!(!kps.is_empty());
    }

    #[test]
    fn compute_is_deterministic() {
        let image = checkerboard(128);
        let extractor = ReferenceExtractor::new(64);
        let kps = extractor.detect(&image);
        let d1 = extractor.compute(&image, &kps);
        let d2 = extractor.compute(&image, &kps);
        assert_eq!(d1, d2);
    }

    #[test]
    fn descriptor_has_configured_length() {
        let image = checkerboard(64);
        let extractor = ReferenceExtractor::new(32);
        let kps = extractor.detect(&image);
        let descriptors = extractor.compute(&image, &kps);
        for d in descriptors {
            assert_eq!(d.len(), 32);
        }
    }
}
