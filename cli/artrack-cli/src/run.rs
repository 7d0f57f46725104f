use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use artrack_detect::Detector;
use artrack_features::reference::{BruteForceMatcher, LucasKanadeFlow, RansacHomography, ReferenceExtractor, UmeyamaSimilarity};
use artrack_flow::FlowTracker;
use artrack_registry::Registry;
use artrack_scheduler::{Engine, FrameSource, RenderSink};
use artrack_types::wire::Database;
use artrack_types::{Config, Frame, FrameResult};
use tracing::{info, warn};

use crate::images::{list_image_files, load_gray};

pub struct RunArgs {
    pub database: PathBuf,
    pub frames_dir: PathBuf,
    pub config: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub frame_interval_ms: u64,
}

/// Reads frames from a directory of image files, in filename order.
/// Unreadable files are skipped with a warning rather than aborting the run.
struct DirFrameSource {
    paths: std::vec::IntoIter<PathBuf>,
    next_index: u64,
    frame_interval_ms: u64,
}

impl FrameSource for DirFrameSource {
    fn next_frame(&mut self) -> Option<Frame> {
        loop {
            let path = self.paths.next()?;
            match load_gray(&path) {
                Ok(gray) => {
                    let acquired_at_ms = self.next_index * self.frame_interval_ms;
                    self.next_index += 1;
                    return Some(Frame::new(gray.data, gray.width, gray.height, 1, acquired_at_ms));
                }
                Err(err) => {
                    warn!(path = %path.display(), %err, "skipping unreadable frame");
                }
            }
        }
    }
}

/// Writes one JSON-encoded `FrameResult` per line, to a file or stdout.
struct JsonlSink {
    writer: Box<dyn Write>,
}

impl RenderSink for JsonlSink {
    fn publish(&mut self, result: &FrameResult) {
        match serde_json::to_string(result) {
            Ok(line) => {
                if let Err(err) = writeln!(self.writer, "{line}") {
                    tracing::error!(%err, "failed writing frame result");
                }
            }
            Err(err) => tracing::error!(%err, "failed serializing frame result"),
        }
    }
}

/// Loads a database built by `build-db`, configures an `Engine` using the
/// reference detection/flow primitives, and runs it over every frame found
/// in `frames_dir`, publishing one JSON line per frame.
pub fn run(args: RunArgs) -> Result<()> {
    let db_bytes = std::fs::read(&args.database).with_context(|| format!("reading database {}", args.database.display()))?;
    let db: Database = bincode::deserialize(&db_bytes).context("decoding database")?;
    let descriptor_length = db.header.descriptor_length as usize;
    let registry = Registry::load(&db)?;

    let config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
            Config::from_toml_str(&text)?
        }
        None => Config::default(),
    };

    let paths = list_image_files(&args.frames_dir).with_context(|| format!("listing frames in {}", args.frames_dir.display()))?;
    if paths.is_empty() {
        anyhow::bail!("no frames found in {}", args.frames_dir.display());
    }
    info!(num_frames = paths.len(), "processing frame sequence");

    let mut source = DirFrameSource { paths: paths.into_iter(), next_index: 0, frame_interval_ms: args.frame_interval_ms };

    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?),
        None => Box::new(std::io::stdout()),
    };
    let mut sink = JsonlSink { writer };

    let detector = Detector::new(ReferenceExtractor::new(descriptor_length), BruteForceMatcher, RansacHomography::default(), config.clone());
    let flow_tracker = FlowTracker::new(LucasKanadeFlow::default(), UmeyamaSimilarity, RansacHomography::default());
    let mut engine = Engine::new(registry, detector, flow_tracker, config);

    engine.run(&mut source, &mut sink)?;
    info!(stats = ?engine.stats(), "finished processing");
    Ok(())
}
