use std::path::PathBuf;

use anyhow::{Context, Result};
use artrack_features::reference::ReferenceExtractor;
use artrack_vocab::builder::{build, to_database, TargetSource};
use tracing::{info, warn};

use crate::images::{list_image_files, load_gray};

pub struct BuildDbArgs {
    pub images_dir: PathBuf,
    pub output: PathBuf,
    pub branching_factor: u32,
    pub levels: u32,
    pub descriptor_length: usize,
}

/// Indexes every image in `images_dir` as one target (the filename stem
/// becomes the target id) and writes the resulting vocabulary + target set
/// to `output` as a bincode-encoded [`artrack_types::wire::Database`].
pub fn run(args: BuildDbArgs) -> Result<()> {
    let files = list_image_files(&args.images_dir).with_context(|| format!("listing target images in {}", args.images_dir.display()))?;
    if files.is_empty() {
        anyhow::bail!("no target images found in {}", args.images_dir.display());
    }

    let sources = files
        .iter()
        .map(|path| {
            let image = load_gray(path)?;
            let id = path.file_stem().and_then(|s| s.to_str()).unwrap_or("target").to_string();
            Ok(TargetSource { id, image })
        })
        .collect::<Result<Vec<_>>>()?;

    let extractor = ReferenceExtractor::new(args.descriptor_length);
    let (vocab, targets, report) = build(&sources, &extractor, args.branching_factor, args.levels)?;

    for warning in &report.warnings {
        warn!(target = %warning.target_id, num_keypoints = warning.num_keypoints, "target indexed with few keypoints, its bag-of-words will be sparse");
    }
    info!(num_targets = targets.len(), num_words = report.num_words, num_descriptors = report.num_descriptors, "built vocabulary");

    let db = to_database(&vocab, &targets);
    let bytes = bincode::serialize(&db).context("encoding database")?;
    std::fs::write(&args.output, &bytes).with_context(|| format!("writing {}", args.output.display()))?;
    info!(path = %args.output.display(), bytes = bytes.len(), "wrote database");
    Ok(())
}
