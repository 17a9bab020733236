//! Immutable configuration shared by the tracker and the frame pipeline.
//!
//! Every section has defaults, so a JSON document only needs to name the
//! values it overrides:
//!
//! ```
//! use skypulse_track::Config;
//!
//! let config = Config::from_json_str(r#"{ "tracking": { "max_missed_frames": 20 } }"#).unwrap();
//! assert_eq!(config.tracking.max_missed_frames, 20);
//! assert_eq!(config.pipeline.frame_queue_capacity, 5);
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tracking: TrackingConfig,
    pub distance: DistanceConfig,
    pub pipeline: PipelineConfig,
    /// Detector class ids worth tracking, mapped to their labels.
    pub target_classes: TargetClasses,
}

impl Config {
    /// Parse a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }
}

/// Configuration for the track manager and its state estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// A track is destroyed once its consecutive misses exceed this.
    pub max_missed_frames: u32,
    /// Minimum IoU (exclusive) for a track/detection pairing to be accepted.
    pub iou_threshold: f32,
    /// Diagonal of the estimator's process noise covariance.
    pub process_noise: f64,
    /// Diagonal of the estimator's measurement noise covariance.
    pub measurement_noise: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            max_missed_frames: 10,
            iou_threshold: 0.3,
            process_noise: 0.03,
            measurement_noise: 0.1,
        }
    }
}

impl TrackingConfig {
    /// Largest assignment cost (`1 - IoU`) that is still accepted, exclusive.
    pub fn max_match_cost(&self) -> f32 {
        1.0 - self.iou_threshold
    }
}

/// Configuration for distance estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceConfig {
    /// Camera focal length in pixels.
    pub focal_length: f32,
    /// Real-world size in meters of the largest dimension, per class label.
    pub reference_sizes: BTreeMap<String, f32>,
    /// Empirical multiplier applied to size-based estimates, per class label.
    /// Classes not listed use 1.0.
    pub correction_factors: BTreeMap<String, f32>,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Weight of the size-based estimate when fusing; the position-based
    /// estimate gets the remainder.
    pub size_weight: f32,
    /// Distances at or below this are critical.
    pub critical_distance: f32,
    /// Distances at or below this (and above critical) are a warning.
    pub warning_distance: f32,
}

impl Default for DistanceConfig {
    fn default() -> Self {
        let reference_sizes = [
            ("person", 1.7),
            ("car", 4.5),
            ("truck", 12.0),
            ("bus", 12.0),
            ("motorcycle", 2.0),
            ("bicycle", 1.8),
        ];
        let correction_factors = [("person", 0.9), ("car", 1.1), ("truck", 1.1)];

        Self {
            focal_length: 800.0,
            reference_sizes: reference_sizes
                .into_iter()
                .map(|(label, size)| (label.to_string(), size))
                .collect(),
            correction_factors: correction_factors
                .into_iter()
                .map(|(label, factor)| (label.to_string(), factor))
                .collect(),
            min_distance: 0.5,
            max_distance: 500.0,
            size_weight: 0.7,
            critical_distance: 5.0,
            warning_distance: 10.0,
        }
    }
}

/// Configuration for the frame pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub frame_queue_capacity: usize,
    pub result_queue_capacity: usize,
    /// Number of recent raw frames retained for temporal context.
    pub frame_buffer_size: usize,
    /// Number of inter-frame deltas averaged by the FPS counter.
    pub fps_window: usize,
    /// The FPS counter reports zero until it holds more samples than this.
    pub fps_min_samples: usize,
    /// Emit a performance log line every this many consumed results.
    pub performance_log_interval: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_queue_capacity: 5,
            result_queue_capacity: 5,
            frame_buffer_size: 3,
            fps_window: 30,
            fps_min_samples: 5,
            performance_log_interval: 100,
        }
    }
}

/// Detector class ids kept by the pipeline, with their labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetClasses(pub BTreeMap<u32, String>);

impl Default for TargetClasses {
    fn default() -> Self {
        // COCO class ids
        let classes = [
            (0, "person"),
            (1, "bicycle"),
            (2, "car"),
            (3, "motorcycle"),
            (5, "bus"),
            (7, "truck"),
        ];
        Self(
            classes
                .into_iter()
                .map(|(id, label)| (id, label.to_string()))
                .collect(),
        )
    }
}

impl TargetClasses {
    pub fn label(&self, class_id: u32) -> Option<&str> {
        self.0.get(&class_id).map(String::as_str)
    }
}
