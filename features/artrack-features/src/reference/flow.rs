use artrack_types::{GrayImage, Point2D};

use crate::traits::{FlowPoint, OpticalFlow};

/// Single-level Lucas-Kanade tracker with a forward-backward consistency
/// check. The spec calls for *pyramidal* LK (`artrack-flow`'s consumer of
/// this trait handles the pyramid by calling down into successively
/// downscaled `GrayImage`s); this reference implementation only needs to get
/// one level right.
#[derive(Debug, Clone, Copy)]
pub struct LucasKanadeFlow {
    window_radius: i32,
    max_iterations: usize,
    epsilon: f32,
}

impl Default for LucasKanadeFlow {
    fn default() -> Self {
        Self {
            window_radius: 7,
            max_iterations: 20,
            epsilon: 0.01,
        }
    }
}

impl LucasKanadeFlow {
    pub fn new(window_radius: i32, max_iterations: usize, epsilon: f32) -> Self {
        Self {
            window_radius,
            max_iterations,
            epsilon,
        }
    }

    fn sample_bilinear(image: &GrayImage, x: f32, y: f32) -> Option<f32> {
        if x < 0.0 || y < 0.0 || x >= (image.width - 1) as f32 || y >= (image.height - 1) as f32 {
            return None;
        }
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (x0, y0) = (x0 as u32, y0 as u32);
        let p00 = image.pixel(x0, y0) as f32;
        let p10 = image.pixel(x0 + 1, y0) as f32;
        let p01 = image.pixel(x0, y0 + 1) as f32;
        let p11 = image.pixel(x0 + 1, y0 + 1) as f32;
        Some(
            p00 * (1.0 - fx) * (1.0 - fy)
                + p10 * fx * (1.0 - fy)
                + p01 * (1.0 - fx) * fy
                + p11 * fx * fy,
        )
    }

    /// Tracks a single point via iterative Lucas-Kanade, returning the
    /// refined position if the window stayed in bounds and accumulated a
    /// well-conditioned gradient structure tensor.
    fn track_one(&self, prev: &GrayImage, curr: &GrayImage, start: Point2D) -> Option<Point2D> {
        let r = self.window_radius;
        let mut gxx = 0.0f64;
        let mut gxy = 0.0f64;
        let mut gyy = 0.0f64;
        let mut samples = Vec::with_capacity(((2 * r + 1) * (2 * r + 1)) as usize);
        for dy in -r..=r {
            for dx in -r..=r {
                let px = start.x + dx as f32;
                let py = start.y + dy as f32;
                let ix = Self::sample_bilinear(prev, px - 1.0, py)?;
                let ix2 = Self::sample_bilinear(prev, px + 1.0, py)?;
                let iy = Self::sample_bilinear(prev, px, py - 1.0)?;
                let iy2 = Self::sample_bilinear(prev, px, py + 1.0)?;
                let i0 = Self::sample_bilinear(prev, px, py)?;
                let gx = (ix2 - ix) / 2.0;
                let gy = (iy2 - iy) / 2.0;
                gxx += (gx * gx) as f64;
                gxy += (gx * gy) as f64;
                gyy += (gy * gy) as f64;
                samples.push((dx, dy, gx, gy, i0));
            }
        }
        let det = gxx * gyy - gxy * gxy;
        if det.abs() < 1e-6 {
            return None;
        }

        let mut position = start;
        for _ in 0..self.max_iterations {
            let mut bx = 0.0f64;
            let mut by = 0.0f64;
            for &(dx, dy, gx, gy, i0) in &samples {
                let cx = position.x + dx as f32;
                let cy = position.y + dy as f32;
                let i1 = Self::sample_bilinear(curr, cx, cy)?;
                let diff = (i0 - i1) as f64;
                bx += diff * gx as f64;
                by += diff * gy as f64;
            }
            let du = ((gyy * bx - gxy * by) / det) as f32;
            let dv = ((gxx * by - gxy * bx) / det) as f32;
            position.x += du;
            position.y += dv;
            if (du * du + dv * dv).sqrt() < self.epsilon {
                break;
            }
        }
        Some(position)
    }
}

impl OpticalFlow for LucasKanadeFlow {
    fn track(&self, prev: &GrayImage, curr: &GrayImage, prev_points: &[Point2D]) -> Vec<FlowPoint> {
        prev_points
            .iter()
            .map(|&p| match self.track_one(prev, curr, p) {
                Some(forward) => match self.track_one(curr, prev, forward) {
                    Some(back) => {
                        let fb_error = back.distance(&p);
                        FlowPoint {
                            point: forward,
                            status: true,
                            fb_error,
                        }
                    }
                    None => FlowPoint {
                        point: p,
                        status: false,
                        fb_error: f32::INFINITY,
                    },
                },
                None => FlowPoint {
                    point: p,
                    status: false,
                    fb_error: f32::INFINITY,
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A plaid of two independent sinusoids, shifted by `offset_x` along x.
    /// A pure 1D ramp has a rank-1 gradient field (the aperture problem) no
    /// matter which direction it runs, which makes the structure tensor
    /// singular everywhere; this pattern varies independently in x and y so
    /// the tracker has a well-conditioned window to solve at every pixel.
    fn gradient_image(width: u32, height: u32, offset_x: i32) -> GrayImage {
        let mut data = vec![0u8; (width * height) as usize];
        for y in 0..height {
            for x in 0..width {
                let sx = (x as i32 - offset_x) as f32;
                let v = 128.0 + 60.0 * (sx * 0.25).sin() + 60.0 * (y as f32 * 0.25).cos();
                data[(y * width + x) as usize] = v.clamp(0.0, 255.0) as u8;
            }
        }
        GrayImage { data, width, height }
    }

    #[test]
    fn tracks_a_shifted_ramp() {
        let prev = gradient_image(64, 64, 0);
        let curr = gradient_image(64, 64, 3);
        let flow = LucasKanadeFlow::default();
        let result = flow.track(&prev, &curr, &[Point2D::new(32.0, 32.0)]);
        assert!(result[0].status);
        assert!((result[0].point.x - 35.0).abs() < 1.5);
    }

    #[test]
    fn point_near_border_fails() {
        let prev = gradient_image(64, 64, 0);
        let curr = gradient_image(64, 64, 0);
        let flow = LucasKanadeFlow::default();
        let result = flow.track(&prev, &curr, &[Point2D::new(1.0, 1.0)]);
        assert!(!result[0].status);
    }
}
