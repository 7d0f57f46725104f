use crate::keypoint::Point2D;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ordered corners of a target's projected quadrilateral: `[TL, TR, BR, BL]`.
///
/// A `Quad` is a plain value; nothing here enforces the invariants described
/// in the module docs at construction time. Call [`Quad::validate`] against a
/// [`QuadBounds`] wherever the spec requires invariant-checked output (the
/// detector and the flow tracker both do this before returning a result).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quad {
    pub corners: [Point2D; 4],
}

/// Configured bounds a [`Quad`] must satisfy to be considered valid.
#[derive(Debug, Clone, Copy)]
pub struct QuadBounds {
    pub min_aspect: f32,
    pub max_aspect: f32,
    pub min_side_length: f32,
}

impl Default for QuadBounds {
    fn default() -> Self {
        Self {
            min_aspect: 0.1,
            max_aspect: 10.0,
            min_side_length: 4.0,
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum QuadError {
    #[error("quad is self-intersecting")]
    SelfIntersecting,
    #[error("quad signed area is not positive")]
    NonPositiveArea,
    #[error("quad is not convex")]
    NotConvex,
    #[error("quad aspect ratio out of bounds")]
    AspectOutOfBounds,
    #[error("quad has a side shorter than the configured minimum")]
    SideTooShort,
}

impl Quad {
    pub fn new(tl: Point2D, tr: Point2D, br: Point2D, bl: Point2D) -> Self {
        Self {
            corners: [tl, tr, br, bl],
        }
    }

    /// Project a reference rectangle `(0,0)-(w,h)` through a row-major 3x3
    /// homography, producing the candidate quad `[TL, TR, BR, BL]`.
    pub fn from_homography(h: &[[f64; 3]; 3], ref_width: f32, ref_height: f32) -> Option<Quad> {
        let corners_ref = [
            (0.0, 0.0),
            (ref_width as f64, 0.0),
            (ref_width as f64, ref_height as f64),
            (0.0, ref_height as f64),
        ];
        let mut projected = [Point2D::new(0.0, 0.0); 4];
        for (i, (x, y)) in corners_ref.iter().enumerate() {
            let w = h[2][0] * x + h[2][1] * y + h[2][2];
            if w.abs() < 1e-12 {
                return None;
            }
            let px = (h[0][0] * x + h[0][1] * y + h[0][2]) / w;
            let py = (h[1][0] * x + h[1][1] * y + h[1][2]) / w;
            projected[i] = Point2D::new(px as f32, py as f32);
        }
        Some(Quad {
            corners: projected,
        })
    }

    pub fn centroid(&self) -> Point2D {
        let sum = self
            .corners
            .iter()
            .fold(Point2D::new(0.0, 0.0), |acc, p| acc + *p);
        sum * (1.0 / 4.0)
    }

    /// Twice the signed area (shoelace formula); positive for
    /// counter-clockwise-wound-in-image-coordinates (y-down) corner order.
    fn signed_area_x2(&self) -> f32 {
        let c = &self.corners;
        let mut sum = 0.0f32;
        for i in 0..4 {
            let p0 = c[i];
            let p1 = c[(i + 1) % 4];
            sum += p0.x * p1.y - p1.x * p0.y;
        }
        sum
    }

    pub fn signed_area(&self) -> f32 {
        self.signed_area_x2() / 2.0
    }

    fn is_convex(&self) -> bool {
        let c = &self.corners;
        let mut sign = 0.0f32;
        for i in 0..4 {
            let p0 = c[i];
            let p1 = c[(i + 1) % 4];
            let p2 = c[(i + 2) % 4];
            let v1 = p1 - p0;
            let v2 = p2 - p1;
            let cross = v1.x * v2.y - v1.y * v2.x;
            if cross.abs() > f32::EPSILON {
                if sign == 0.0 {
                    sign = cross.signum();
                } else if cross.signum() != sign {
                    return false;
                }
            }
        }
        true
    }

    fn min_side_length(&self) -> f32 {
        let c = &self.corners;
        (0..4)
            .map(|i| c[i].distance(&c[(i + 1) % 4]))
            .fold(f32::INFINITY, f32::min)
    }

    /// Width/height ratio derived from the mean of the two horizontal edges
    /// over the mean of the two vertical edges.
    pub fn aspect(&self) -> f32 {
        let c = &self.corners;
        let top = c[0].distance(&c[1]);
        let bottom = c[3].distance(&c[2]);
        let left = c[0].distance(&c[3]);
        let right = c[1].distance(&c[2]);
        let width = (top + bottom) / 2.0;
        let height = (left + right) / 2.0;
        if height <= f32::EPSILON {
            f32::INFINITY
        } else {
            width / height
        }
    }

    /// Mean distance from each corner to the centroid; used as the "scale"
    /// parameter fed to the flow tracker's Kalman filter.
    pub fn mean_corner_distance(&self) -> f32 {
        let centroid = self.centroid();
        self.corners.iter().map(|p| p.distance(&centroid)).sum::<f32>() / 4.0
    }

    /// Rotation of the quad: angle of the TL->TR edge.
    pub fn rotation(&self) -> f32 {
        let edge = self.corners[1] - self.corners[0];
        edge.y.atan2(edge.x)
    }

    pub fn validate(&self, bounds: &QuadBounds) -> Result<(), QuadError> {
        if self.signed_area() <= 0.0 {
            return Err(QuadError::NonPositiveArea);
        }
        if !self.is_convex() {
            return Err(QuadError::NotConvex);
        }
        let aspect = self.aspect();
        if !aspect.is_finite() || aspect < bounds.min_aspect || aspect > bounds.max_aspect {
            return Err(QuadError::AspectOutOfBounds);
        }
        if self.min_side_length() < bounds.min_side_length {
            return Err(QuadError::SideTooShort);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(side: f32) -> Quad {
        Quad::new(
            Point2D::new(0.0, 0.0),
            Point2D::new(side, 0.0),
            Point2D::new(side, side),
            Point2D::new(0.0, side),
        )
    }

    #[test]
    fn unit_square_is_valid() {
        let q = square(100.0);
        assert!(q.validate(&QuadBounds::default()).is_ok());
        assert!(q.signed_area() > 0.0);
    }

    #[test]
    fn degenerate_quad_fails_area_check() {
        let q = Quad::new(
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 0.0),
            Point2D::new(0.0, 0.0),
            Point2D::new(-10.0, 0.0),
        );
        assert_eq!(
            q.validate(&QuadBounds::default()),
            Err(QuadError::NonPositiveArea)
        );
    }

    #[test]
    fn too_thin_quad_fails_aspect_check() {
        let q = Quad::new(
            Point2D::new(0.0, 0.0),
            Point2D::new(100.0, 0.0),
            Point2D::new(100.0, 1.0),
            Point2D::new(0.0, 1.0),
        );
        assert_eq!(
            q.validate(&QuadBounds::default()),
            Err(QuadError::AspectOutOfBounds)
        );
    }

    #[test]
    fn nonconvex_quad_is_rejected() {
        // "dart" shape: one corner pushed into the interior.
        let q = Quad::new(
            Point2D::new(0.0, 0.0),
            Point2D::new(100.0, 0.0),
            Point2D::new(50.0, 50.0),
            Point2D::new(0.0, 100.0),
        );
        assert_eq!(q.validate(&QuadBounds::default()), Err(QuadError::NotConvex));
    }

    #[test]
    fn centroid_of_square_is_its_center() {
        let q = square(10.0);
        let c = q.centroid();
        assert!((c.x - 5.0).abs() < 1e-6);
        assert!((c.y - 5.0).abs() < 1e-6);
    }

    #[test]
    fn identity_homography_round_trips_rectangle() {
        let h = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let q = Quad::from_homography(&h, 50.0, 30.0).unwrap();
        assert_eq!(q.corners[0], Point2D::new(0.0, 0.0));
        assert_eq!(q.corners[2], Point2D::new(50.0, 30.0));
    }
}
