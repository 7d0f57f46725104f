use artrack_features::HomographyMatrix;
use artrack_types::{Point2D, Quad};

/// Projects a point through a row-major 3x3 homography.
pub fn apply_homography(h: &HomographyMatrix, p: Point2D) -> Point2D {
    let x = p.x as f64;
    let y = p.y as f64;
    let w = h[2][0] * x + h[2][1] * y + h[2][2];
    let px = (h[0][0] * x + h[0][1] * y + h[0][2]) / w;
    let py = (h[1][0] * x + h[1][1] * y + h[1][2]) / w;
    Point2D::new(px as f32, py as f32)
}

/// The three Kalman-smoothed shape parameters the flow tracker carries
/// between frames: mean corner-to-centroid distance, TL->TR edge angle
/// (radians) and width/height ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeParams {
    pub scale: f32,
    pub rotation: f32,
    pub aspect: f32,
}

impl ShapeParams {
    pub fn of(quad: &Quad) -> Self {
        Self {
            scale: quad.mean_corner_distance(),
            rotation: quad.rotation(),
            aspect: quad.aspect(),
        }
    }
}

/// Rebuilds a quad centered at `centroid` (left unsmoothed by the Kalman
/// filters) from a smoothed `(scale, rotation, aspect)` triple. `scale` is
/// the half-diagonal; `aspect` is width/height.
pub fn reconstruct(params: ShapeParams, centroid: Point2D) -> Quad {
    let diag = params.scale.max(0.0);
    let aspect = params.aspect.max(1e-6);
    let half_height = diag / (aspect * aspect + 1.0).sqrt();
    let half_width = aspect * half_height;

    let (sin_t, cos_t) = params.rotation.sin_cos();
    let ex = Point2D::new(cos_t, sin_t) * half_width;
    let ey = Point2D::new(-sin_t, cos_t) * half_height;

    let tl = centroid - ex - ey;
    let tr = centroid + ex - ey;
    let br = centroid + ex + ey;
    let bl = centroid - ex + ey;
    Quad::new(tl, tr, br, bl)
}
