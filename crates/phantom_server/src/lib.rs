//! # Phantom Server
//!
//! Demo host for the phantom replication core. A simulated world of walking
//! viewers is driven from a tokio tick loop, with wandering mobs, fake
//! players and a per-viewer greeting sign replicated to every viewer in
//! range.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration
//! phantom_server
//!
//! # Specify custom configuration
//! phantom_server --config demo.toml
//!
//! # Override specific settings
//! phantom_server --viewers 12 --tick-ms 20 --log-level debug
//!
//! # JSON logging
//! phantom_server --json-logs
//! ```
//!
//! ## Configuration
//!
//! The host loads configuration from a TOML file (default: `config.toml`).
//! If the file doesn't exist, a default configuration will be created.
//!
//! ## Signal Handling
//!
//! SIGINT and SIGTERM start a short countdown, after which every phantom is
//! despawned and the process exits.

use tracing::error;

pub mod app;
pub mod cli;
pub mod config;
pub mod host;
pub mod logging;
pub mod signals;
pub mod textures;

use app::Application;
use cli::CliArgs;
use config::AppConfig;

pub use config::{DemoSettings, LoggingSettings, ServerSettings};

/// Parses the CLI, sets up logging and runs the application.
///
/// Exits the process with code 1 on startup or runtime failure.
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Logging settings come from the file before anything else is loaded.
    let mut config = AppConfig::load_from_file(&args.config_path)
        .await
        .unwrap_or_default();
    config.apply_cli(&args);

    if let Err(e) = logging::setup_logging(&config.logging, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}
