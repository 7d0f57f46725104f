use crate::keypoint::Point2D;
use serde::{Deserialize, Serialize};

/// A single acquired video frame: row-major pixel bytes plus geometry.
///
/// Channels is 3 (RGB) or 4 (RGBA); the scheduler converts to single-channel
/// 8-bit grayscale internally before handing pixels to the detector or flow
/// primitives. `Frame` owns its buffer — callers that need to retain a frame
/// past the call that produced it must keep their own `Frame` (e.g. via
/// `clone`), matching the "exclusively owned by the scheduler" resource rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub acquired_at_ms: u64,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, acquired_at_ms: u64) -> Self {
        assert_eq!(
            data.len(),
            width as usize * height as usize * channels as usize,
            "frame buffer size does not match width*height*channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            acquired_at_ms,
        }
    }

    /// Convert to single-channel 8-bit grayscale via the standard Rec. 601
    /// luma weighting, matching what the `image` crate's `Luma8` conversion
    /// does for RGB/RGBA sources.
    pub fn to_grayscale(&self) -> GrayImage {
        let mut out = vec![0u8; (self.width * self.height) as usize];
        let ch = self.channels as usize;
        for (px, chunk) in out.iter_mut().zip(self.data.chunks_exact(ch)) {
            *px = match ch {
                1 => chunk[0],
                3 | 4 => {
                    let r = chunk[0] as f32;
                    let g = chunk[1] as f32;
                    let b = chunk[2] as f32;
                    (0.299 * r + 0.587 * g + 0.114 * b).round() as u8
                }
                _ => chunk[0],
            };
        }
        GrayImage {
            data: out,
            width: self.width,
            height: self.height,
        }
    }
}

/// Single-channel 8-bit image, the only pixel format the detection pipeline
/// operates on internally.
#[derive(Debug, Clone, PartialEq)]
pub struct GrayImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl GrayImage {
    pub fn pixel(&self, x: u32, y: u32) -> u8 {
        self.data[(y * self.width + x) as usize]
    }
}

/// Which pipeline stage produced a [`PerTarget`] result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Detection,
    Flow,
}

/// Outcome of attempting to locate one target in one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerTarget {
    pub target_id: String,
    pub success: bool,
    pub corners: Option<[Point2D; 4]>,
    pub score: Option<f32>,
    pub mode: Mode,
    pub reason: Option<String>,
}

impl PerTarget {
    pub fn success(target_id: impl Into<String>, corners: [Point2D; 4], score: f32, mode: Mode) -> Self {
        Self {
            target_id: target_id.into(),
            success: true,
            corners: Some(corners),
            score: Some(score),
            mode,
            reason: None,
        }
    }

    pub fn failure(target_id: impl Into<String>, mode: Mode, reason: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            success: false,
            corners: None,
            score: None,
            mode,
            reason: Some(reason.into()),
        }
    }
}

/// Published once per processed frame to the render sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameResult {
    pub frame_index: u64,
    pub processing_width: u32,
    pub processing_height: u32,
    pub results: Vec<PerTarget>,
    pub active_target_id: Option<String>,
}
