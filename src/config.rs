//! Configuration loading for FurrowNav

use crate::error::{FurrowError, Result};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Clone, Debug, Deserialize, Default)]
pub struct FurrowConfig {
    #[serde(default)]
    pub scanner: ScannerTuning,
    #[serde(default)]
    pub maneuver: ManeuverTuning,
}

/// Clustering engine tuning
#[derive(Clone, Debug, Deserialize)]
pub struct ScannerTuning {
    /// Neighbor-inclusion radius for the clustering pass, in millimeters.
    /// Zero or negative yields no neighbors: every candidate cluster is a
    /// discarded singleton. That is a valid (degenerate) setting.
    #[serde(default = "default_epsilon")]
    pub epsilon_mm: f64,

    /// Only points within this range of the robot seed new clusters, in
    /// millimeters. Expansion may still absorb points beyond it.
    #[serde(default = "default_max_seed_range")]
    pub max_seed_range_mm: f64,
}

/// Maneuver state machine tuning
#[derive(Clone, Debug, Deserialize)]
pub struct ManeuverTuning {
    /// Obstacle-detection count that must be exceeded to leave Wait.
    #[serde(default = "default_wait_threshold")]
    pub wait_detection_threshold: usize,

    /// Forward speed command while approaching along the row.
    #[serde(default = "default_approach_speed")]
    pub approach_speed: i8,

    /// Steering magnitude for row-following corrections, in degrees.
    #[serde(default = "default_steer_angle")]
    pub steer_angle: i8,

    /// Speed command magnitude during the headland turn.
    #[serde(default = "default_turn_speed")]
    pub turn_speed: i8,

    /// Steering command magnitude during the headland turn.
    #[serde(default = "default_turn_steer")]
    pub turn_steer: i8,

    /// Wheel/track constant for the two outbound turn phases, in odometer
    /// distance units per phase step.
    #[serde(default = "default_track_constant_out")]
    pub track_constant_out: f64,

    /// Wheel/track constant for the two inbound turn phases.
    #[serde(default = "default_track_constant_in")]
    pub track_constant_in: f64,

    /// Initial "not found" distance for the steering heuristic's two
    /// near-line slots, in millimeters.
    #[serde(default = "default_near_point_range")]
    pub near_point_range_mm: f64,

    /// Gap between the two near-line distances below which a row-following
    /// correction is applied, in millimeters.
    #[serde(default = "default_adjust_gap")]
    pub adjust_gap_mm: f64,
}

impl Default for ScannerTuning {
    fn default() -> Self {
        Self {
            epsilon_mm: default_epsilon(),
            max_seed_range_mm: default_max_seed_range(),
        }
    }
}

impl Default for ManeuverTuning {
    fn default() -> Self {
        Self {
            wait_detection_threshold: default_wait_threshold(),
            approach_speed: default_approach_speed(),
            steer_angle: default_steer_angle(),
            turn_speed: default_turn_speed(),
            turn_steer: default_turn_steer(),
            track_constant_out: default_track_constant_out(),
            track_constant_in: default_track_constant_in(),
            near_point_range_mm: default_near_point_range(),
            adjust_gap_mm: default_adjust_gap(),
        }
    }
}

// Default value functions
fn default_epsilon() -> f64 {
    500.0
}
fn default_max_seed_range() -> f64 {
    1000.0
}
fn default_wait_threshold() -> usize {
    1
}
fn default_approach_speed() -> i8 {
    60
}
fn default_steer_angle() -> i8 {
    60
}
fn default_turn_speed() -> i8 {
    125
}
fn default_turn_steer() -> i8 {
    125
}
fn default_track_constant_out() -> f64 {
    6.645
}
fn default_track_constant_in() -> f64 {
    6.465
}
fn default_near_point_range() -> f64 {
    4000.0
}
fn default_adjust_gap() -> f64 {
    300.0
}

impl FurrowConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| FurrowError::Config(format!("Failed to read config file: {}", e)))?;
        let config: FurrowConfig = toml::from_str(&content)?;
        Ok(config)
    }
}
