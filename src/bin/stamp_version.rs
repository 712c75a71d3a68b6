use std::path::PathBuf;

use clap::Parser;
use garden_deploy::config::ProjectLayout;
use garden_deploy::versioning::{VersionStamper, DEFAULT_VERSION_PREFIX};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "stamp_version")]
#[command(about = "Increment the firmware build number and regenerate include/version.h")]
struct Args {
    /// PlatformIO project directory
    #[arg(short, long, default_value = ".")]
    project_dir: PathBuf,

    /// Build counter file (relative to the project directory)
    #[arg(long)]
    counter_file: Option<PathBuf>,

    /// Generated header (relative to the project directory)
    #[arg(long)]
    version_header: Option<PathBuf>,

    /// Prefix prepended to the build number in DEVICE_VERSION
    #[arg(long, default_value = DEFAULT_VERSION_PREFIX)]
    version_prefix: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

// Example usage (PlatformIO pre-build hook):
// cargo run --bin stamp_version -- --project-dir ../smart-garden

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "garden_deploy={0},stamp_version={0}",
            args.log_level
        ))
        .init();

    let mut layout = ProjectLayout::new(&args.project_dir);
    if let Some(path) = &args.counter_file {
        layout = layout.with_counter_file(path);
    }
    if let Some(path) = &args.version_header {
        layout = layout.with_version_header(path);
    }

    let header = VersionStamper::new(&layout)
        .with_prefix(args.version_prefix)
        .stamp();

    info!("✅ Firmware {} (build {})", header.version, header.build_number);
}
