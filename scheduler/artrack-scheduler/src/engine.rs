use std::collections::HashMap;
use std::sync::Arc;

use artrack_detect::Detector;
use artrack_features::{DescriptorMatcher, FeatureExtractor, HomographyEstimator, OpticalFlow, SimilarityEstimator};
use artrack_flow::{FlowTracker, TrackerState};
use artrack_registry::{Registry, RuntimeState};
use artrack_types::{Config, Frame, FrameResult, GrayImage, Mode, PerTarget, Point2D, Quad, Target, TargetStatus};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::resize::downscale;
use crate::selection::{select_active, SelectionInput};
use crate::stats::Stats;
use crate::traits::{FrameSource, RenderSink};

/// Per-frame orchestrator. Generic over the detector's
/// [`FeatureExtractor`]/[`DescriptorMatcher`]/[`HomographyEstimator`] (`E`,
/// `M`, `DH`) and the flow tracker's [`OpticalFlow`]/[`SimilarityEstimator`]/
/// [`HomographyEstimator`] (`O`, `S`, `FH`) — two independent homography
/// estimators since the detector and the flow tracker each own one.
///
/// `process_frame` takes `&mut self`, so a second concurrent call on the same
/// `Engine` is a compile-time borrow error rather than a dropped frame; the
/// "skip this frame under load" policy named in the resource model is the
/// caller's to implement by choosing whether to call `process_frame` at all.
pub struct Engine<E, M, DH, O, S, FH> {
    registry: Registry,
    detector: Detector<E, M, DH>,
    flow_tracker: FlowTracker<O, S, FH>,
    config: Config,
    tracking: HashMap<String, TrackerState>,
    active_target_id: Option<String>,
    last_switch_at_ms: Option<u64>,
    detect_counter: u64,
    frame_index: u64,
    stopped: bool,
    stats: Stats,
}

impl<E, M, DH, O, S, FH> Engine<E, M, DH, O, S, FH>
where
    E: FeatureExtractor,
    M: DescriptorMatcher,
    DH: HomographyEstimator,
    O: OpticalFlow,
    S: SimilarityEstimator,
    FH: HomographyEstimator,
{
    pub fn new(registry: Registry, detector: Detector<E, M, DH>, flow_tracker: FlowTracker<O, S, FH>, config: Config) -> Self {
        Self {
            registry,
            detector,
            flow_tracker,
            config,
            tracking: HashMap::new(),
            active_target_id: None,
            last_switch_at_ms: None,
            detect_counter: 0,
            frame_index: 0,
            stopped: false,
            stats: Stats::default(),
        }
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn active_target_id(&self) -> Option<&str> {
        self.active_target_id.as_deref()
    }

    /// Releases all per-target tracking state (and every `prevFrame` it
    /// holds) and drops the engine into a stopped state. Every subsequent
    /// `process_frame` call returns [`Error::Stopped`].
    pub fn stop(&mut self) {
        self.tracking.clear();
        self.active_target_id = None;
        self.registry.reset_runtime_state();
        self.stopped = true;
        info!("engine stopped");
    }

    /// Orientation-event reset: releases all tracking state and the active
    /// target, same as `stop`, but leaves the engine able to process further
    /// frames starting from a cold-start state.
    pub fn reset(&mut self) {
        self.tracking.clear();
        self.active_target_id = None;
        self.last_switch_at_ms = None;
        self.detect_counter = 0;
        self.registry.reset_runtime_state();
        info!("engine reset");
    }

    /// Pulls frames from `source` until it's exhausted, publishing one
    /// `FrameResult` per processed frame to `sink`.
    pub fn run(&mut self, source: &mut dyn FrameSource, sink: &mut dyn RenderSink) -> Result<()> {
        while let Some(frame) = source.next_frame() {
            let result = self.process_frame(&frame)?;
            sink.publish(&result);
        }
        Ok(())
    }

    /// Runs one iteration of the per-frame procedure: downscale, the
    /// detect-vs-flow branch, active target selection, and runtime state
    /// transitions. Never returns `Err` for a per-target failure — those
    /// become a `reason` on that target's `PerTarget` — only for a fatal
    /// scheduler-level condition.
    pub fn process_frame(&mut self, frame: &Frame) -> Result<FrameResult> {
        if self.stopped {
            return Err(Error::Stopped);
        }

        let processing = downscale(frame, self.config.max_dimension);
        let gray = processing.to_grayscale();

        let should_detect =
            self.detect_counter % self.config.detection_interval.max(1) as u64 == 0 || !self.config.use_optical_flow || self.tracking.is_empty();

        let mut should_redetect_by_target: HashMap<String, bool> = HashMap::new();

        let final_results = if should_detect {
            self.run_detect_branch(&processing, &gray, &mut should_redetect_by_target)
        } else {
            self.run_flow_branch(&gray, &processing, &mut should_redetect_by_target)
        };

        self.update_active_target(&final_results, &processing);
        self.update_age_stats(&final_results);

        if let Some(active_id) = &self.active_target_id {
            if should_redetect_by_target.get(active_id).copied().unwrap_or(false) {
                self.detect_counter = self.config.detection_interval.saturating_sub(1) as u64;
            }
        }
        self.detect_counter = self.detect_counter.wrapping_add(1);

        self.stats.frames_processed += 1;
        let frame_index = self.frame_index;
        self.frame_index += 1;

        Ok(FrameResult {
            frame_index,
            processing_width: processing.width,
            processing_height: processing.height,
            results: final_results,
            active_target_id: self.active_target_id.clone(),
        })
    }

    fn run_detect_branch(
        &mut self,
        processing: &Frame,
        gray: &GrayImage,
        should_redetect_by_target: &mut HashMap<String, bool>,
    ) -> Vec<PerTarget> {
        let targets: Vec<Arc<Target>> = self.registry.targets().cloned().collect();

        let detection_results = match self.detector.extract_frame_features(processing) {
            Ok((keypoints, descriptors)) => {
                let bow = self.registry.vocabulary().quantize(&descriptors);
                let query_targets = self.bow_only_targets();
                let candidates = self.registry.vocabulary().query(&bow, &query_targets, self.config.vocab_candidates, self.config.min_similarity);
                self.detector.verify_candidates(&targets, &candidates, &keypoints, &descriptors)
            }
            Err(err) => {
                warn!(%err, "frame feature extraction failed; every target misses this frame");
                targets.iter().map(|t| PerTarget::failure(t.id.clone(), Mode::Detection, err.to_string())).collect()
            }
        };
        self.stats.detections_run += 1;

        let mut final_results = Vec::with_capacity(detection_results.len());
        for result in detection_results {
            if result.success {
                let quad = Quad { corners: result.corners.unwrap() };
                self.tracking.insert(result.target_id.clone(), TrackerState::from_detection(gray.clone(), quad));
                self.mark_tracked(&result.target_id, result.score.unwrap_or(0.0), processing.acquired_at_ms);
                final_results.push(result);
                continue;
            }

            if self.config.use_optical_flow && self.tracking.contains_key(&result.target_id) {
                let target_id = result.target_id.clone();
                let mut state = self.tracking.remove(&target_id).expect("just checked contains_key");
                let flow_result = self.flow_tracker.track(&mut state, &target_id, gray.clone(), &self.config);
                self.stats.flow_runs += 1;
                should_redetect_by_target.insert(target_id.clone(), flow_result.should_redetect);

                if flow_result.per_target.success {
                    self.tracking.insert(target_id.clone(), state);
                    self.mark_tracked(&target_id, flow_result.per_target.score.unwrap_or(0.0), processing.acquired_at_ms);
                } else {
                    self.mark_lost(&target_id);
                }
                final_results.push(flow_result.per_target);
            } else {
                if self.tracking.remove(&result.target_id).is_some() {
                    self.mark_lost(&result.target_id);
                }
                final_results.push(result);
            }
        }
        final_results
    }

    fn run_flow_branch(&mut self, gray: &GrayImage, processing: &Frame, should_redetect_by_target: &mut HashMap<String, bool>) -> Vec<PerTarget> {
        let mut final_results = Vec::new();

        if let Some(active_id) = self.active_target_id.clone() {
            if let Some(mut state) = self.tracking.remove(&active_id) {
                let flow_result = self.flow_tracker.track(&mut state, &active_id, gray.clone(), &self.config);
                self.stats.flow_runs += 1;
                should_redetect_by_target.insert(active_id.clone(), flow_result.should_redetect);

                if flow_result.per_target.success {
                    self.tracking.insert(active_id.clone(), state);
                    self.mark_tracked(&active_id, flow_result.per_target.score.unwrap_or(0.0), processing.acquired_at_ms);
                } else {
                    self.mark_lost(&active_id);
                }
                final_results.push(flow_result.per_target);
            }
        }

        let stale: Vec<String> = self
            .tracking
            .keys()
            .filter(|id| Some(id.as_str()) != self.active_target_id.as_deref())
            .cloned()
            .collect();
        for id in stale {
            self.tracking.remove(&id);
            self.mark_idle(&id);
        }

        final_results
    }

    fn update_active_target(&mut self, final_results: &[PerTarget], processing: &Frame) {
        let center = Point2D::new(processing.width as f32 / 2.0, processing.height as f32 / 2.0);
        let successes: Vec<(String, f32)> = final_results
            .iter()
            .filter(|r| r.success)
            .map(|r| {
                let quad = Quad { corners: r.corners.unwrap() };
                (r.target_id.clone(), quad.centroid().distance(&center))
            })
            .collect();

        let current_active_succeeded = self
            .active_target_id
            .as_ref()
            .map(|id| successes.iter().any(|(tid, _)| tid == id))
            .unwrap_or(false);
        let current_distance = self
            .active_target_id
            .as_ref()
            .and_then(|id| successes.iter().find(|(tid, _)| tid == id).map(|(_, d)| *d))
            .unwrap_or(0.0);
        let candidates: Vec<(String, f32)> = successes
            .iter()
            .filter(|(tid, _)| Some(tid.as_str()) != self.active_target_id.as_deref())
            .cloned()
            .collect();
        let delay_elapsed = self
            .last_switch_at_ms
            .map(|t| processing.acquired_at_ms.saturating_sub(t) >= self.config.min_switch_delay_ms)
            .unwrap_or(true);

        let new_active = select_active(SelectionInput {
            current_active: self.active_target_id.as_deref(),
            current_active_succeeded,
            current_distance,
            candidates: &candidates,
            switch_hysteresis: self.config.switch_hysteresis,
            delay_elapsed,
        });

        if new_active != self.active_target_id {
            self.last_switch_at_ms = Some(processing.acquired_at_ms);
        }
        self.active_target_id = new_active;
    }

    fn update_age_stats(&mut self, final_results: &[PerTarget]) {
        for target in self.registry.targets() {
            let succeeded = final_results.iter().any(|r| r.target_id == target.id && r.success);
            if succeeded {
                self.stats.frames_since_last_seen.insert(target.id.clone(), 0);
            } else if let Some(age) = self.stats.frames_since_last_seen.get_mut(&target.id) {
                *age += 1;
            }
        }
    }

    /// Vocabulary queries only read `id` and `bow`; building stand-ins rather
    /// than cloning every target's full keypoint/descriptor arrays avoids a
    /// full-corpus copy on every detection frame.
    fn bow_only_targets(&self) -> Vec<Target> {
        self.registry.targets().map(|t| Target::new(t.id.clone(), 0, 0, Vec::new(), Vec::new(), t.bow.clone())).collect()
    }

    fn mark_tracked(&mut self, id: &str, score: f32, seen_at_ms: u64) {
        self.registry.set_runtime_state(
            id,
            RuntimeState {
                status: TargetStatus::Tracked,
                last_seen_at: Some(seen_at_ms),
                last_score: score,
            },
        );
    }

    fn mark_lost(&mut self, id: &str) {
        if let Some(prev) = self.registry.runtime_state(id).copied() {
            self.registry.set_runtime_state(id, RuntimeState { status: TargetStatus::Lost, ..prev });
        }
    }

    fn mark_idle(&mut self, id: &str) {
        if let Some(prev) = self.registry.runtime_state(id).copied() {
            self.registry.set_runtime_state(id, RuntimeState { status: TargetStatus::Idle, ..prev });
        }
    }
}
