use std::path::PathBuf;

use clap::Parser;
use garden_deploy::config::{ConfigOverrides, ProjectLayout};
use garden_deploy::publisher::{AuthOptions, FirmwarePublisher};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "publish_firmware")]
#[command(about = "Upload the compiled firmware to the device's database node and request an OTA update")]
struct Args {
    /// PlatformIO project directory
    #[arg(short, long, default_value = ".")]
    project_dir: PathBuf,

    /// Compiled firmware image (relative to the project directory)
    #[arg(short, long)]
    firmware: Option<PathBuf>,

    /// Service account key (relative to the project directory)
    #[arg(long)]
    credentials: Option<PathBuf>,

    /// Database URL, instead of DATABASE_URL from include/secret.h
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Account email, instead of USER_EMAIL from include/secret.h
    #[arg(long, env = "USER_EMAIL")]
    user_email: Option<String>,

    /// Device name, instead of DEVICE_NAME from src/main.cpp
    #[arg(long, env = "DEVICE_NAME")]
    device_name: Option<String>,

    /// Pre-issued OAuth2 access token (skips the service account key)
    #[arg(long, env = "FIREBASE_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Firebase project id (required with --access-token)
    #[arg(long, env = "FIREBASE_PROJECT_ID")]
    project_id: Option<String>,

    /// Identity Toolkit base URL
    #[arg(long, env = "FIREBASE_IDENTITY_URL")]
    identity_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

// Example usage:
// cargo run --bin publish_firmware -- --project-dir ../smart-garden
// FIREBASE_ACCESS_TOKEN=$(gcloud auth print-access-token) FIREBASE_PROJECT_ID=garden \
//     cargo run --bin publish_firmware -- --project-dir ../smart-garden

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenv::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "garden_deploy={0},publish_firmware={0}",
            args.log_level
        ))
        .init();

    let mut layout = ProjectLayout::new(&args.project_dir);
    if let Some(path) = &args.firmware {
        layout = layout.with_firmware_bin(path);
    }
    if let Some(path) = &args.credentials {
        layout = layout.with_credentials(path);
    }

    info!("🚀 Publishing firmware from {}", args.project_dir.display());

    let publisher = FirmwarePublisher::new(layout)
        .with_overrides(ConfigOverrides {
            database_url: args.database_url,
            user_email: args.user_email,
            device_name: args.device_name,
        })
        .with_auth(AuthOptions {
            access_token: args.access_token,
            project_id: args.project_id,
            identity_url: args.identity_url,
        });

    match publisher.publish().await {
        Ok(report) => {
            info!(
                "✅ Firmware {} (build {}, {} bytes) published to {}",
                report.version, report.build_number, report.firmware_size, report.device_path
            );
        }
        Err(e) => {
            error!("❌ {}", e);
            std::process::exit(1);
        }
    }
}
