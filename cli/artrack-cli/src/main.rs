use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod build_db;
mod images;
mod run;

#[derive(Debug, Parser)]
#[command(name = "artrack", author, version, about = "Offline demo harness for the planar AR target-tracking engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build a target database from a folder of reference images.
    BuildDb {
        /// Folder of target reference images; each file's stem becomes its target id.
        images_dir: PathBuf,

        /// Output database path (bincode-encoded).
        #[arg(short, long, default_value = "targets.artrackdb")]
        output: PathBuf,

        /// Vocabulary tree branching factor.
        #[arg(long, default_value_t = 10)]
        branching_factor: u32,

        /// Vocabulary tree depth.
        #[arg(long, default_value_t = 6)]
        levels: u32,

        /// Descriptor length in bytes for the reference feature extractor.
        #[arg(long, default_value_t = 32)]
        descriptor_length: usize,
    },

    /// Run the engine over a folder of frame images against a built database.
    Run {
        /// Path to a database built with `build-db`.
        database: PathBuf,

        /// Folder of frame images, processed in filename order.
        frames_dir: PathBuf,

        /// Optional TOML config file overriding `Config::default()`.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write one JSON `FrameResult` per line to this path instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Milliseconds between consecutive frames, for `Frame::acquired_at_ms`.
        #[arg(long, default_value_t = 33)]
        frame_interval_ms: u64,
    },
}

fn main() -> Result<()> {
    let _tracing_guard = env_tracing_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::BuildDb { images_dir, output, branching_factor, levels, descriptor_length } => {
            build_db::run(build_db::BuildDbArgs { images_dir, output, branching_factor, levels, descriptor_length })
        }
        Command::Run { database, frames_dir, config, output, frame_interval_ms } => {
            run::run(run::RunArgs { database, frames_dir, config, output, frame_interval_ms })
        }
    }
}
