use artrack_types::Point2D;
use nalgebra::{DMatrix, DVector};
use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::traits::{HomographyEstimator, HomographyMatrix};

/// RANSAC homography estimator with a direct linear transform (DLT) solver
/// for both the minimal 4-point sample and the final refit over inliers.
///
/// The RANSAC sampling order is seeded (see [`RansacHomography::with_seed`])
/// so that `estimate` is a pure function of its inputs — required by the
/// determinism guarantee the scheduler relies on when replaying a frame
/// sequence.
#[derive(Debug, Clone)]
pub struct RansacHomography {
    iterations: usize,
    min_inliers: usize,
    seed: u64,
}

impl Default for RansacHomography {
    fn default() -> Self {
        Self {
            iterations: 500,
            min_inliers: 8,
            seed: 0x5EED_F00D,
        }
    }
}

impl RansacHomography {
    pub fn new(iterations: usize, min_inliers: usize) -> Self {
        Self {
            iterations,
            min_inliers,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Direct linear transform: solves for the homography minimizing algebraic
/// reprojection error over `>= 4` correspondences via the SVD null space of
/// the stacked constraint matrix.
fn fit_dlt(src: &[Point2D], dst: &[Point2D]) -> Option<HomographyMatrix> {
    if src.len() < 4 || src.len() != dst.len() {
        return None;
    }
    let n = src.len();
    let mut a = DMatrix::<f64>::zeros(2 * n, 9);
    for i in 0..n {
        let (x, y) = (src[i].x as f64, src[i].y as f64);
        let (xp, yp) = (dst[i].x as f64, dst[i].y as f64);
        a.set_row(
            2 * i,
            &DVector::from_vec(vec![-x, -y, -1.0, 0.0, 0.0, 0.0, x * xp, y * xp, xp]).transpose(),
        );
        a.set_row(
            2 * i + 1,
            &DVector::from_vec(vec![0.0, 0.0, 0.0, -x, -y, -1.0, x * yp, y * yp, yp]).transpose(),
        );
    }
    let svd = nalgebra::linalg::SVD::new(a, true, true);
    let v_t = svd.v_t?;
    let h = v_t.row(v_t.nrows() - 1).transpose();
    if h[8].abs() < 1e-12 {
        return None;
    }
    let mut m = [[0.0f64; 3]; 3];
    for r in 0..3 {
        for c in 0..3 {
            m[r][c] = h[r * 3 + c] / h[8];
        }
    }
    Some(m)
}

fn apply(h: &HomographyMatrix, p: Point2D) -> Point2D {
    let x = p.x as f64;
    let y = p.y as f64;
    let w = h[2][0] * x + h[2][1] * y + h[2][2];
    let px = (h[0][0] * x + h[0][1] * y + h[0][2]) / w;
    let py = (h[1][0] * x + h[1][1] * y + h[1][2]) / w;
    Point2D::new(px as f32, py as f32)
}

impl HomographyEstimator for RansacHomography {
    fn estimate(&self, src: &[Point2D], dst: &[Point2D], reproj_threshold: f32) -> Option<(HomographyMatrix, Vec<bool>)> {
        if src.len() < 4 || src.len() != dst.len() {
            return None;
        }
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let indices: Vec<usize> = (0..src.len()).collect();

        let mut best_inliers: Vec<bool> = Vec::new();
        let mut best_count = 0usize;

        for _ in 0..self.iterations {
            let sample: Vec<usize> = indices
                .choose_multiple(&mut rng, 4)
                .copied()
                .collect();
            if sample.len() < 4 {
                continue;
            }
            let sample_src: Vec<Point2D> = sample.iter().map(|&i| src[i]).collect();
            let sample_dst: Vec<Point2D> = sample.iter().map(|&i| dst[i]).collect();
            let Some(h) = fit_dlt(&sample_src, &sample_dst) else {
                continue;
            };
            let inliers: Vec<bool> = src
                .iter()
                .zip(dst.iter())
                .map(|(&s, &d)| apply(&h, s).distance(&d) <= reproj_threshold)
                .collect();
            let count = inliers.iter().filter(|&&b| b).count();
            if count > best_count {
                best_count = count;
                best_inliers = inliers;
            }
        }

        if best_count < self.min_inliers.min(4) {
            return None;
        }

        let inlier_src: Vec<Point2D> = src
            .iter()
            .zip(best_inliers.iter())
            .filter(|(_, &keep)| keep)
            .map(|(&p, _)| p)
            .collect();
        let inlier_dst: Vec<Point2D> = dst
            .iter()
            .zip(best_inliers.iter())
            .filter(|(_, &keep)| keep)
            .map(|(&p, _)| p)
            .collect();

        let refit = fit_dlt(&inlier_src, &inlier_dst)?;
        Some((refit, best_inliers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point2D> {
        vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 0.0),
            Point2D::new(10.0, 10.0),
            Point2D::new(0.0, 10.0),
        ]
    }

    #[test]
    fn identity_mapping_recovers_identity() {
        let src = square();
        let dst = square();
        let estimator = RansacHomography::new(50, 4);
        let (h, inliers) = estimator.estimate(&src, &dst, 1.0).unwrap();
        assert!(inliers.iter().all(|&b| b));
        for &p in &src {
            let projected = apply(&h, p);
            assert!(projected.distance(&p) < 1e-3);
        }
    }

    #[test]
    fn translation_is_recovered() {
        let src = square();
        let dst: Vec<Point2D> = src.iter().map(|p| Point2D::new(p.x + 5.0, p.y + 3.0)).collect();
        let estimator = RansacHomography::new(50, 4);
        let (h, _) = estimator.estimate(&src, &dst, 1.0).unwrap();
        let projected = apply(&h, src[0]);
        assert!((projected.x - 5.0).abs() < 1e-2);
        assert!((projected.y - 3.0).abs() < 1e-2);
    }

    #[test]
    fn too_few_points_returns_none() {
        let src = vec![Point2D::new(0.0, 0.0); 3];
        let dst = vec![Point2D::new(0.0, 0.0); 3];
        let estimator = RansacHomography::default();
        assert!(estimator.estimate(&src, &dst, 1.0).is_none());
    }

    #[test]
    fn same_seed_is_deterministic() {
        let src = square();
        let dst = square();
        let a = RansacHomography::new(50, 4).with_seed(7);
        let b = RansacHomography::new(50, 4).with_seed(7);
        let (ha, _) = a.estimate(&src, &dst, 1.0).unwrap();
        let (hb, _) = b.estimate(&src, &dst, 1.0).unwrap();
        assert_eq!(ha, hb);
    }
}
