//! Monocular distance estimation.
//!
//! Two independent estimates are combined: a pinhole-camera estimate from the
//! apparent size of an object of known real-world size, and a coarse
//! estimate from how low the object sits in the frame.

use serde::{Deserialize, Serialize};

use crate::config::DistanceConfig;
use crate::tracker::rect::Rect;

/// How close an object is relative to the configured safety thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProximityLevel {
    Critical,
    Warning,
    Clear,
}

#[derive(Debug, Clone)]
pub struct DistanceEstimator {
    config: DistanceConfig,
}

impl Default for DistanceEstimator {
    fn default() -> Self {
        Self::new(DistanceConfig::default())
    }
}

impl DistanceEstimator {
    pub fn new(config: DistanceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DistanceConfig {
        &self.config
    }

    /// Distance in meters from the apparent size of a box.
    ///
    /// Returns `None` when the class has no reference size or the box has no
    /// positive extent.
    pub fn estimate_by_size(&self, width: f32, height: f32, class_name: &str) -> Option<f32> {
        let real_size = *self.config.reference_sizes.get(class_name)?;

        let apparent_size = width.max(height);
        if apparent_size.is_nan() || apparent_size <= 0.0 {
            return None;
        }

        let correction = self
            .config
            .correction_factors
            .get(class_name)
            .copied()
            .unwrap_or(1.0);
        let distance = real_size * self.config.focal_length / apparent_size * correction;

        Some(distance.clamp(self.config.min_distance, self.config.max_distance))
    }

    /// Distance in meters from the vertical position of the box's bottom edge.
    ///
    /// Objects lower in the frame are closer. The result is one of four fixed
    /// bands.
    pub fn estimate_by_position(&self, bbox: &Rect, frame_height: u32) -> f32 {
        if frame_height == 0 {
            return 20.0;
        }

        let relative_position = bbox.y2 / frame_height as f32;
        if relative_position > 0.8 {
            2.0
        } else if relative_position > 0.6 {
            5.0
        } else if relative_position > 0.4 {
            10.0
        } else {
            20.0
        }
    }

    /// Weighted fusion of the size and position estimates.
    ///
    /// Falls back to the position estimate alone when the size estimate is
    /// unavailable.
    pub fn fuse(&self, bbox: &Rect, class_name: &str, frame_height: u32) -> f32 {
        let by_position = self.estimate_by_position(bbox, frame_height);
        match self.estimate_by_size(bbox.width(), bbox.height(), class_name) {
            Some(by_size) => {
                self.config.size_weight * by_size + (1.0 - self.config.size_weight) * by_position
            }
            None => by_position,
        }
    }

    pub fn proximity(&self, distance: f32) -> ProximityLevel {
        if distance <= self.config.critical_distance {
            ProximityLevel::Critical
        } else if distance <= self.config.warning_distance {
            ProximityLevel::Warning
        } else {
            ProximityLevel::Clear
        }
    }
}
