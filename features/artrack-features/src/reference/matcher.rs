use artrack_types::Descriptor;

use crate::traits::{DescriptorMatch, DescriptorMatcher};

/// Brute-force Hamming-distance KNN matcher. O(|query| * |train|); fine for
/// the descriptor counts this crate deals with (hundreds per target), not
/// meant to scale to a full image database.
#[derive(Debug, Default, Clone, Copy)]
pub struct BruteForceMatcher;

impl DescriptorMatcher for BruteForceMatcher {
    fn knn_match(&self, query: &[Descriptor], train: &[Descriptor], k: usize) -> Vec<Vec<DescriptorMatch>> {
        query
            .iter()
            .enumerate()
            .map(|(query_idx, q)| {
                let mut distances: Vec<DescriptorMatch> = train
                    .iter()
                    .enumerate()
                    .map(|(train_idx, t)| DescriptorMatch {
                        query_idx,
                        train_idx,
                        distance: q.hamming_distance(t),
                    })
                    .collect();
                distances.sort_by_key(|m| m.distance);
                distances.truncate(k);
                distances
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_closest_first() {
        let query = vec![Descriptor::new(vec![0b0000_0000])];
        let train = vec![
            Descriptor::new(vec![0b1111_1111]),
            Descriptor::new(vec![0b0000_0001]),
            Descriptor::new(vec![0b0000_0000]),
        ];
        let matcher = BruteForceMatcher;
        let result = matcher.knn_match(&query, &train, 2);
        assert_eq!(result[0][0].train_idx, 2);
        assert_eq!(result[0][0].distance, 0);
        assert_eq!(result[0][1].train_idx, 1);
        assert_eq!(result[0][1].distance, 1);
    }

    #[test]
    fn caps_at_k() {
        let query = vec![Descriptor::new(vec![0])];
        let train = vec![Descriptor::new(vec![0]); 5];
        let matcher = BruteForceMatcher;
        let result = matcher.knn_match(&query, &train, 2);
        assert_eq!(result[0].len(), 2);
    }

    #[test]
    fn fewer_train_than_k_returns_all() {
        let query = vec![Descriptor::new(vec![0])];
        let train = vec![Descriptor::new(vec![1])];
        let matcher = BruteForceMatcher;
        let result = matcher.knn_match(&query, &train, 5);
        assert_eq!(result[0].len(), 1);
    }
}
