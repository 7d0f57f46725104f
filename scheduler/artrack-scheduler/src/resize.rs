use artrack_types::Frame;

/// Downscales `frame` so its longer side is at most `max_dimension`, via
/// nearest-neighbor sampling. Returns `frame` unchanged (cloned) if it
/// already fits. `artrack-scheduler` only ever needs a cheap decimation
/// before handing pixels to the detector/flow primitives, not a
/// photometrically faithful resize.
pub fn downscale(frame: &Frame, max_dimension: u32) -> Frame {
    let longer = frame.width.max(frame.height);
    if longer <= max_dimension || longer == 0 {
        return frame.clone();
    }

    let scale = max_dimension as f64 / longer as f64;
    let new_width = ((frame.width as f64 * scale).round() as u32).max(1);
    let new_height = ((frame.height as f64 * scale).round() as u32).max(1);
    let channels = frame.channels as usize;

    let mut data = vec![0u8; new_width as usize * new_height as usize * channels];
    for y in 0..new_height {
        let src_y = ((y as f64 + 0.5) / scale).floor().min(frame.height as f64 - 1.0) as u32;
        for x in 0..new_width {
            let src_x = ((x as f64 + 0.5) / scale).floor().min(frame.width as f64 - 1.0) as u32;
            let src_offset = (src_y as usize * frame.width as usize + src_x as usize) * channels;
            let dst_offset = (y as usize * new_width as usize + x as usize) * channels;
            data[dst_offset..dst_offset + channels].copy_from_slice(&frame.data[src_offset..src_offset + channels]);
        }
    }

    Frame::new(data, new_width, new_height, frame.channels, frame.acquired_at_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_small_frames_untouched() {
        let frame = Frame::new(vec![1, 2, 3, 4], 2, 2, 1, 0);
        let out = downscale(&frame, 640);
        assert_eq!(out, frame);
    }

    #[test]
    fn shrinks_the_longer_side_to_the_limit() {
        let data = vec![7u8; 1280 * 720 * 3];
        let frame = Frame::new(data, 1280, 720, 3, 0);
        let out = downscale(&frame, 640);
        assert_eq!(out.width, 640);
        assert_eq!(out.height, 360);
    }
}
