//! Configuration management for the phantom demo host.
//!
//! Loads the TOML configuration, writing a default file when none exists,
//! and validates the merged result before the host starts.

use crate::cli::CliArgs;
use phantom_replication::ReplicationConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// Default tick interval for serde deserialization
fn default_tick_interval() -> u64 {
    50 // 20 ticks per second
}

fn default_status_interval_ticks() -> u64 { 200 }
fn default_shutdown_grace_ticks() -> u64 { 20 }
fn default_log_level() -> String { "info".to_string() }

fn default_viewers() -> usize { 4 }
fn default_mobs() -> usize { 6 }
fn default_npc_names() -> Vec<String> {
    vec!["Banker".to_string(), "Guide".to_string()]
}
fn default_worlds() -> Vec<String> {
    vec!["overworld".to_string(), "nether".to_string()]
}
fn default_wander_radius() -> f64 { 50.0 }
fn default_world_hop_interval_ticks() -> u64 { 400 }
fn default_churn_interval_ticks() -> u64 { 900 }
fn default_click_interval_ticks() -> u64 { 60 }
fn default_native_entities() -> i32 { 128 }

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Tick loop settings
    #[serde(default)]
    pub server: ServerSettings,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Settings handed to the replication core
    #[serde(default)]
    pub replication: ReplicationConfig,
    /// The simulated world the demo drives
    #[serde(default)]
    pub demo: DemoSettings,
}

/// Tick loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Server tick interval in milliseconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Ticks between status reports
    #[serde(default = "default_status_interval_ticks")]
    pub status_interval_ticks: u64,
    /// Ticks between a shutdown request and the final despawn
    #[serde(default = "default_shutdown_grace_ticks")]
    pub shutdown_grace_ticks: u64,
    /// Stop on its own after this many ticks (0 runs until signalled)
    #[serde(default)]
    pub run_ticks: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            status_interval_ticks: default_status_interval_ticks(),
            shutdown_grace_ticks: default_shutdown_grace_ticks(),
            run_ticks: 0,
        }
    }
}

/// Logging configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

/// Settings of the simulated world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoSettings {
    /// Simulated viewers connected at startup
    #[serde(default = "default_viewers")]
    pub viewers: usize,
    /// Wandering mobs spawned at startup
    #[serde(default = "default_mobs")]
    pub mobs: usize,
    /// Names of the fake players standing around spawn
    #[serde(default = "default_npc_names")]
    pub npc_names: Vec<String>,
    /// Loaded worlds; the first one hosts every phantom
    #[serde(default = "default_worlds")]
    pub worlds: Vec<String>,
    /// Radius of the circle viewers walk along
    #[serde(default = "default_wander_radius")]
    pub wander_radius: f64,
    /// Ticks between world hops of a viewer (0 disables)
    #[serde(default = "default_world_hop_interval_ticks")]
    pub world_hop_interval_ticks: u64,
    /// Ticks between one viewer quitting and a fresh one joining (0 disables)
    #[serde(default = "default_churn_interval_ticks")]
    pub churn_interval_ticks: u64,
    /// Ticks between simulated clicks on a fake player (0 disables)
    #[serde(default = "default_click_interval_ticks")]
    pub click_interval_ticks: u64,
    /// Host-simulated entities occupying ids `1..=native_entities` in every world
    #[serde(default = "default_native_entities")]
    pub native_entities: i32,
    /// JSON file mapping player names to signed textures
    #[serde(default)]
    pub texture_file: Option<String>,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            viewers: default_viewers(),
            mobs: default_mobs(),
            npc_names: default_npc_names(),
            worlds: default_worlds(),
            wander_radius: default_wander_radius(),
            world_hop_interval_ticks: default_world_hop_interval_ticks(),
            churn_interval_ticks: default_churn_interval_ticks(),
            click_interval_ticks: default_click_interval_ticks(),
            native_entities: default_native_entities(),
            texture_file: None,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at the
    /// specified path and returns the default configuration.
    pub async fn load_from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Applies command-line overrides on top of the file settings.
    pub fn apply_cli(&mut self, args: &CliArgs) {
        if let Some(log_level) = &args.log_level {
            self.logging.level = log_level.clone();
        }
        if args.json_logs {
            self.logging.json_format = true;
        }
        if let Some(tick_ms) = args.tick_ms {
            self.server.tick_interval_ms = tick_ms;
        }
        if let Some(viewers) = args.viewers {
            self.demo.viewers = viewers;
        }
    }

    /// Validates the configuration.
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.tick_interval_ms == 0 {
            return Err("server.tick_interval_ms must be greater than 0".to_string());
        }

        if self.server.status_interval_ticks == 0 {
            return Err("server.status_interval_ticks must be greater than 0".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        if self.demo.worlds.is_empty() {
            return Err("demo.worlds must name at least one world".to_string());
        }

        if self.demo.worlds.iter().any(|world| world.trim().is_empty()) {
            return Err("demo.worlds must not contain empty names".to_string());
        }

        if !self.demo.wander_radius.is_finite() || self.demo.wander_radius < 0.0 {
            return Err("demo.wander_radius must be a non-negative number".to_string());
        }

        if self.demo.native_entities < 0 {
            return Err("demo.native_entities must not be negative".to_string());
        }

        self.replication
            .validate()
            .map_err(|e| format!("replication: {e}"))
    }
}
