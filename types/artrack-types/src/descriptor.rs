use serde::{Deserialize, Serialize};

/// A fixed-length binary keypoint descriptor (BRISK family: 64 bytes).
///
/// The engine never inspects individual bits; the only operation it performs
/// on a descriptor is a Hamming distance against another of the same length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor(Vec<u8>);

impl Descriptor {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Hamming distance (popcount of XOR) between two descriptors.
    ///
    /// Panics if the two descriptors have different lengths; mixing
    /// descriptors from detectors with different byte lengths is a
    /// programming error, not a recoverable runtime condition.
    pub fn hamming_distance(&self, other: &Descriptor) -> u32 {
        assert_eq!(
            self.0.len(),
            other.0.len(),
            "descriptor length mismatch: {} vs {}",
            self.0.len(),
            other.0.len()
        );
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hamming_distance_zero_for_equal() {
        let a = Descriptor::new(vec![0b10101010, 0b11110000]);
        let b = Descriptor::new(vec![0b10101010, 0b11110000]);
        assert_eq!(a.hamming_distance(&b), 0);
    }

    #[test]
    fn hamming_distance_counts_bits() {
        let a = Descriptor::new(vec![0b0000_0000]);
        let b = Descriptor::new(vec![0b1111_1111]);
        assert_eq!(a.hamming_distance(&b), 8);
    }

    #[test]
    #[should_panic]
    fn hamming_distance_mismatched_length_panics() {
        let a = Descriptor::new(vec![0u8; 4]);
        let b = Descriptor::new(vec![0u8; 8]);
        let _ = a.hamming_distance(&b);
    }
}
