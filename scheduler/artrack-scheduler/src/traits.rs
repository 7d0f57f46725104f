use artrack_types::{Frame, FrameResult};

/// Pulls frames for `Engine::run` to process. Returning `None` ends the run
/// loop; there is no requirement that a source ever terminates.
pub trait FrameSource {
    fn next_frame(&mut self) -> Option<Frame>;
}

/// Receives one [`FrameResult`] per processed frame.
pub trait RenderSink {
    fn publish(&mut self, result: &FrameResult);
}
