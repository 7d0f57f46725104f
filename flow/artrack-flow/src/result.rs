use artrack_types::PerTarget;

/// Outcome of tracking one target for one frame. `should_redetect` is a
/// scheduler-facing signal, independent of `per_target.success`: a tracker
/// can report success this frame and still ask for a redetect next frame
/// (e.g. because the survivor count is thinning), and a failure always asks
/// for one.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowResult {
    pub per_target: PerTarget,
    pub should_redetect: bool,
}
