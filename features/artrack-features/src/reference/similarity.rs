use artrack_types::Point2D;
use nalgebra::{Matrix2, Vector2};

use crate::traits::{HomographyMatrix, SimilarityEstimator};

/// Least-squares similarity transform (uniform scale, rotation, translation)
/// fit via Umeyama's method, used as a fallback when RANSAC homography
/// estimation is unavailable or degenerate for the small point sets the flow
/// tracker works with.
#[derive(Debug, Default, Clone, Copy)]
pub struct UmeyamaSimilarity;

impl SimilarityEstimator for UmeyamaSimilarity {
    fn fit(&self, src: &[Point2D], dst: &[Point2D]) -> Option<HomographyMatrix> {
        if src.len() < 2 || src.len() != dst.len() {
            return None;
        }
        let n = src.len() as f64;

        let src_centroid = src.iter().fold(Vector2::zeros(), |acc, p| acc + Vector2::new(p.x as f64, p.y as f64)) / n;
        let dst_centroid = dst.iter().fold(Vector2::zeros(), |acc, p| acc + Vector2::new(p.x as f64, p.y as f64)) / n;

        let mut cov = Matrix2::zeros();
        let mut src_var = 0.0f64;
        for (s, d) in src.iter().zip(dst.iter()) {
            let sc = Vector2::new(s.x as f64, s.y as f64) - src_centroid;
            let dc = Vector2::new(d.x as f64, d.y as f64) - dst_centroid;
            cov += dc * sc.transpose();
            src_var += sc.norm_squared();
        }
        cov /= n;
        src_var /= n;
        if src_var < 1e-9 {
            return None;
        }

        let svd = cov.svd(true, true);
        let u = svd.u?;
        let v_t = svd.v_t?;
        let mut d = Matrix2::identity();
        if (u * v_t).determinant() < 0.0 {
            d[(1, 1)] = -1.0;
        }
        let r = u * d * v_t;
        let scale = (svd.singular_values[0] * d[(0, 0)] + svd.singular_values[1] * d[(1, 1)]) / src_var;
        let t = dst_centroid - scale * r * src_centroid;

        Some([
            [scale * r[(0, 0)], scale * r[(0, 1)], t.x],
            [scale * r[(1, 0)], scale * r[(1, 1)], t.y],
            [0.0, 0.0, 1.0],
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_pure_translation() {
        let src = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 0.0),
            Point2D::new(0.0, 10.0),
        ];
        let dst: Vec<Point2D> = src.iter().map(|p| Point2D::new(p.x + 4.0, p.y - 2.0)).collect();
        let h = UmeyamaSimilarity.fit(&src, &dst).unwrap();
        assert!((h[0][2] - 4.0).abs() < 1e-6);
        assert!((h[1][2] + 2.0).abs() < 1e-6);
        assert!((h[0][0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn recovers_uniform_scale() {
        let src = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 0.0),
            Point2D::new(0.0, 10.0),
        ];
        let dst: Vec<Point2D> = src.iter().map(|p| Point2D::new(p.x * 2.0, p.y * 2.0)).collect();
        let h = UmeyamaSimilarity.fit(&src, &dst).unwrap();
        assert!((h[0][0] - 2.0).abs() < 1e-6);
        assert!((h[1][1] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn too_few_points_returns_none() {
        let src = vec![Point2D::new(0.0, 0.0)];
        let dst = vec![Point2D::new(0.0, 0.0)];
        assert!(UmeyamaSimilarity.fit(&src, &dst).is_none());
    }
}
