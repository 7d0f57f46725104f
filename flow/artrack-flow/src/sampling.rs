use artrack_types::{Point2D, Quad};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Fixed seed for tracking-point jitter. Sampling only ever depends on the
/// previous quad's geometry, never on wall-clock time, so re-running the
/// tracker on the same input reproduces the same sample set.
const FLOW_SAMPLE_SEED: u64 = 0xF70C_5EED;

/// Samples up to `max_points` locations to track from `quad`: its four
/// corners (the highest-confidence points available) followed by a jittered
/// grid filling out the rest, all clamped to `quad`'s axis-aligned bounding
/// box intersected with the frame bounds.
pub fn sample_points(quad: &Quad, max_points: usize, frame_width: u32, frame_height: u32) -> Vec<Point2D> {
    if max_points == 0 {
        return Vec::new();
    }

    let min_x = quad.corners.iter().map(|p| p.x).fold(f32::INFINITY, f32::min).max(0.0);
    let max_x = quad
        .corners
        .iter()
        .map(|p| p.x)
        .fold(f32::NEG_INFINITY, f32::max)
        .min(frame_width as f32 - 1.0);
    let min_y = quad.corners.iter().map(|p| p.y).fold(f32::INFINITY, f32::min).max(0.0);
    let max_y = quad
        .corners
        .iter()
        .map(|p| p.y)
        .fold(f32::NEG_INFINITY, f32::max)
        .min(frame_height as f32 - 1.0);

    if max_x <= min_x || max_y <= min_y {
        return Vec::new();
    }

    let mut points: Vec<Point2D> = Vec::with_capacity(max_points);
    for c in &quad.corners {
        let clamped = Point2D::new(c.x.clamp(min_x, max_x), c.y.clamp(min_y, max_y));
        points.push(clamped);
        if points.len() >= max_points {
            return points;
        }
    }

    let remaining = max_points - points.len();
    let side = (remaining as f32).sqrt().ceil().max(1.0) as usize;
    let step_x = (max_x - min_x) / side as f32;
    let step_y = (max_y - min_y) / side as f32;
    let jitter_x = (step_x * 0.25).max(0.01);
    let jitter_y = (step_y * 0.25).max(0.01);

    let mut rng = ChaCha8Rng::seed_from_u64(FLOW_SAMPLE_SEED);
    'outer: for row in 0..side {
        for col in 0..side {
            if points.len() >= max_points {
                break 'outer;
            }
            let cx = min_x + (col as f32 + 0.5) * step_x + rng.random_range(-jitter_x..=jitter_x);
            let cy = min_y + (row as f32 + 0.5) * step_y + rng.random_range(-jitter_y..=jitter_y);
            points.push(Point2D::new(cx.clamp(min_x, max_x), cy.clamp(min_y, max_y)));
        }
    }

    points
}
