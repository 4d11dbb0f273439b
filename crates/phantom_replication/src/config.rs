//! Replication configuration.
//!
//! Every field has a serde default so partial TOML tables deserialize
//! cleanly in the host application.

use crate::error::ConfigValidationError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_render_distance() -> f64 { 60.0 }
fn default_entity_id_floor() -> i32 { 1_000_000 }
fn default_teleport_threshold_squared() -> f64 { 16.0 }
fn default_max_custom_name_length() -> usize { 64 }
fn default_sweep_interval_ticks() -> u64 { 10 }
fn default_tab_list_min_connection_age_ms() -> u64 { 3000 }
fn default_hidden_name_team() -> String { "phantom-hidden".to_string() }

/// Tunables for the replication core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicationConfig {
    /// Maximum viewer-to-entity distance at which an entity is shown
    #[serde(default = "default_render_distance")]
    pub render_distance: f64,
    /// First id handed out by the identity registry
    #[serde(default = "default_entity_id_floor")]
    pub entity_id_floor: i32,
    /// Squared move distance above which a teleport replaces a relative move
    #[serde(default = "default_teleport_threshold_squared")]
    pub teleport_threshold_squared: f64,
    /// Custom names are truncated to this many characters
    #[serde(default = "default_max_custom_name_length")]
    pub max_custom_name_length: usize,
    /// Ticks between tab-list sweeps
    #[serde(default = "default_sweep_interval_ticks")]
    pub sweep_interval_ticks: u64,
    /// Viewers younger than this keep their tab-list entries queued
    #[serde(default = "default_tab_list_min_connection_age_ms")]
    pub tab_list_min_connection_age_ms: u64,
    /// Team used to hide name tags of humanoid phantoms
    #[serde(default = "default_hidden_name_team")]
    pub hidden_name_team: String,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            render_distance: default_render_distance(),
            entity_id_floor: default_entity_id_floor(),
            teleport_threshold_squared: default_teleport_threshold_squared(),
            max_custom_name_length: default_max_custom_name_length(),
            sweep_interval_ticks: default_sweep_interval_ticks(),
            tab_list_min_connection_age_ms: default_tab_list_min_connection_age_ms(),
            hidden_name_team: default_hidden_name_team(),
        }
    }
}

impl ReplicationConfig {
    /// Minimum connection age before tab-list removals are sent.
    pub fn tab_list_min_connection_age(&self) -> Duration {
        Duration::from_millis(self.tab_list_min_connection_age_ms)
    }

    /// Validates the configuration for consistency.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !self.render_distance.is_finite() || self.render_distance <= 0.0 {
            return Err(ConfigValidationError::InvalidValue(
                "render_distance must be a positive number".to_string(),
            ));
        }

        if self.entity_id_floor < 0 {
            return Err(ConfigValidationError::InvalidValue(
                "entity_id_floor must not be negative".to_string(),
            ));
        }

        if self.teleport_threshold_squared < 0.0 {
            return Err(ConfigValidationError::InvalidValue(
                "teleport_threshold_squared must be >= 0.0".to_string(),
            ));
        }

        if self.max_custom_name_length == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "max_custom_name_length must be > 0".to_string(),
            ));
        }

        if self.sweep_interval_ticks == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "sweep_interval_ticks must be > 0".to_string(),
            ));
        }

        if self.hidden_name_team.is_empty() || self.hidden_name_team.len() > 16 {
            return Err(ConfigValidationError::InvalidValue(format!(
                "hidden_name_team must be 1-16 characters, got {:?}",
                self.hidden_name_team
            )));
        }

        Ok(())
    }
}
