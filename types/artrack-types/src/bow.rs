use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sparse bag-of-words histogram over visual word ids.
///
/// A `BTreeMap` keeps the word ids sorted, which both gives a deterministic
/// iteration order (needed for the determinism law in the spec's testable
/// properties) and a compact on-disk form for the `(wordId, count)` wire list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseBow {
    counts: BTreeMap<u32, u32>,
}

impl SparseBow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, word_id: u32) {
        *self.counts.entry(word_id).or_insert(0) += 1;
    }

    pub fn get(&self, word_id: u32) -> u32 {
        self.counts.get(&word_id).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.counts.iter().map(|(&w, &c)| (w, c))
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (u32, u32)>) -> Self {
        Self {
            counts: pairs.into_iter().collect(),
        }
    }

    /// Weighted L2 norm `||bow .* idf||_2` over the given IDF table.
    pub fn weighted_norm(&self, idf: &[f32]) -> f32 {
        self.counts
            .iter()
            .map(|(&w, &c)| {
                let weight = c as f32 * idf.get(w as usize).copied().unwrap_or(0.0);
                weight * weight
            })
            .sum::<f32>()
            .sqrt()
    }

    /// TF-IDF weighted dot product against another BoW over the shared IDF
    /// table. Only words present in both histograms contribute.
    pub fn weighted_dot(&self, other: &SparseBow, idf: &[f32]) -> f32 {
        let (smaller, larger) = if self.counts.len() <= other.counts.len() {
            (self, other)
        } else {
            (other, self)
        };
        smaller
            .counts
            .iter()
            .filter_map(|(&w, &c)| {
                let other_c = larger.counts.get(&w)?;
                let weight = idf.get(w as usize).copied().unwrap_or(0.0);
                Some((c as f32 * weight) * (*other_c as f32 * weight))
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_accumulates_counts() {
        let mut bow = SparseBow::new();
        bow.increment(3);
        bow.increment(3);
        bow.increment(7);
        assert_eq!(bow.get(3), 2);
        assert_eq!(bow.get(7), 1);
        assert_eq!(bow.get(9), 0);
    }

    #[test]
    fn weighted_dot_only_counts_shared_words() {
        let a = SparseBow::from_pairs([(1, 2), (2, 1)]);
        let b = SparseBow::from_pairs([(2, 3), (3, 5)]);
        let idf = vec![0.0, 1.0, 2.0, 1.0];
        // only word 2 is shared: (1*2) * (3*2) = 12
        assert_eq!(a.weighted_dot(&b, &idf), 12.0);
    }
}
