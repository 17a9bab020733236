//! Single object track for multi-object tracking.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tracker::distance::{DistanceEstimator, ProximityLevel};
use crate::tracker::kalman_filter::{BoxEstimator, KalmanFilter};
use crate::tracker::matching::Detection;
use crate::tracker::rect::Rect;
use crate::tracker::track_state::TrackState;

/// Unique track identifier.
///
/// Issued by a [`TrackManager`](crate::tracker::TrackManager) from a
/// monotonic counter, so an identity is never handed out twice by the same
/// manager. Displays as a short hex token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// Single object track.
#[derive(Debug, Clone, Serialize)]
pub struct Track {
    /// Unique track identifier
    pub id: TrackId,
    /// Box of the most recent matched detection
    pub bbox: Rect,
    pub class_id: u32,
    pub class_name: String,
    /// Confidence of the most recent matched detection
    pub confidence: f32,
    /// Distance in meters
    pub distance: f32,
    /// Center velocity in pixels per frame
    pub velocity: (f32, f32),
    /// Number of successful matches since creation
    pub age: u32,
    /// Consecutive frames without a matched detection
    pub missed_frames: u32,
    pub state: TrackState,
    #[serde(skip)]
    estimator: BoxEstimator,
}

impl Track {
    /// Start a new track from an unmatched detection.
    ///
    /// Distance is fused from the detection's box once, here; later matches do
    /// not re-run the fusion.
    pub(crate) fn new(
        id: TrackId,
        detection: &Detection,
        frame_height: u32,
        kalman_filter: &KalmanFilter,
        distance_estimator: &DistanceEstimator,
    ) -> Self {
        let distance =
            distance_estimator.fuse(&detection.bbox, &detection.class_name, frame_height);

        Self {
            id,
            bbox: detection.bbox,
            class_id: detection.class_id,
            class_name: detection.class_name.clone(),
            confidence: detection.confidence,
            distance,
            velocity: (0.0, 0.0),
            age: 0,
            missed_frames: 0,
            state: TrackState::New,
            estimator: BoxEstimator::new(kalman_filter, &detection.bbox),
        }
    }

    /// Advance the estimator one frame and return the predicted box.
    pub(crate) fn predict(&mut self, kalman_filter: &KalmanFilter) -> Rect {
        let predicted = self.estimator.predict(kalman_filter);
        self.velocity = self.estimator.velocity();
        predicted
    }

    /// Fold a matched detection into the track.
    pub(crate) fn update(&mut self, detection: &Detection, kalman_filter: &KalmanFilter) {
        self.estimator.correct(kalman_filter, &detection.bbox);
        self.velocity = self.estimator.velocity();

        self.bbox = detection.bbox;
        self.class_id = detection.class_id;
        self.class_name.clone_from(&detection.class_name);
        self.confidence = detection.confidence;
        if let Some(distance) = detection.distance {
            self.distance = distance;
        }
        self.missed_frames = 0;
        self.age += 1;
        self.state = TrackState::Tracked;
    }

    /// Record a frame without a matching detection.
    ///
    /// `bbox` stays at the last matched detection; the extrapolated box is
    /// available from [`Track::estimated_bbox`].
    pub(crate) fn mark_missed(&mut self) {
        self.missed_frames += 1;
        self.state = TrackState::Coasting;
    }

    /// Box the estimator currently believes in.
    pub fn estimated_bbox(&self) -> Rect {
        self.estimator.bbox()
    }

    pub fn is_coasting(&self) -> bool {
        self.state == TrackState::Coasting
    }

    pub fn proximity(&self, distance_estimator: &DistanceEstimator) -> ProximityLevel {
        distance_estimator.proximity(self.distance)
    }
}
