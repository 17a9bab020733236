//! Track lifecycle: predict, associate, update, create and prune.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::config::{Config, DistanceConfig, TrackingConfig};
use crate::tracker::distance::DistanceEstimator;
use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::matching::{self, AssignmentResult, Detection};
use crate::tracker::rect::Rect;
use crate::tracker::track::{Track, TrackId};

/// Owns every live track, keyed by identity.
///
/// One call to [`update`](Self::update) is one time step; the manager has no
/// notion of wall-clock time. It is not meant to be shared between threads.
pub struct TrackManager {
    tracks: BTreeMap<TrackId, Track>,
    next_id: u64,
    frame_id: u64,
    config: TrackingConfig,
    kalman_filter: KalmanFilter,
    distance_estimator: DistanceEstimator,
}

impl Default for TrackManager {
    fn default() -> Self {
        Self::new(TrackingConfig::default(), DistanceConfig::default())
    }
}

impl TrackManager {
    pub fn new(config: TrackingConfig, distance_config: DistanceConfig) -> Self {
        Self {
            tracks: BTreeMap::new(),
            next_id: 0,
            frame_id: 0,
            kalman_filter: KalmanFilter::new(&config),
            distance_estimator: DistanceEstimator::new(distance_config),
            config,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.tracking.clone(), config.distance.clone())
    }

    /// Process one frame of detections and return the live tracks.
    ///
    /// `frame_height` is used by the position-based distance estimate of
    /// newly created tracks. The order of the returned tracks is unspecified.
    pub fn update(&mut self, detections: &[Detection], frame_height: u32) -> Vec<Track> {
        self.frame_id += 1;

        // Step 1: Predict every track, matched or not
        let track_ids: Vec<TrackId> = self.tracks.keys().copied().collect();
        let kalman_filter = &self.kalman_filter;
        let predicted: Vec<Rect> = self
            .tracks
            .values_mut()
            .map(|track| track.predict(kalman_filter))
            .collect();

        // Step 2: Associate predicted boxes with detections
        let AssignmentResult {
            matches,
            unmatched_tracks,
            unmatched_detections,
        } = if track_ids.is_empty() || detections.is_empty() {
            AssignmentResult {
                matches: vec![],
                unmatched_tracks: (0..track_ids.len()).collect(),
                unmatched_detections: (0..detections.len()).collect(),
            }
        } else {
            let det_rects: Vec<Rect> = detections.iter().map(|d| d.bbox).collect();
            let dists = matching::iou_distance(&predicted, &det_rects);
            matching::linear_assignment(&dists, self.config.max_match_cost())
        };

        // Step 3: Correct matched tracks
        for (itracked, idet) in matches {
            if let Some(track) = self.tracks.get_mut(&track_ids[itracked]) {
                track.update(&detections[idet], &self.kalman_filter);
            }
        }

        // Step 4: Coast unmatched tracks
        for itracked in unmatched_tracks {
            if let Some(track) = self.tracks.get_mut(&track_ids[itracked]) {
                track.mark_missed();
                trace!(id = %track.id, missed = track.missed_frames, "track coasting");
            }
        }

        // Step 5: Init new tracks
        for idet in unmatched_detections {
            let id = self.next_track_id();
            let track = Track::new(
                id,
                &detections[idet],
                frame_height,
                &self.kalman_filter,
                &self.distance_estimator,
            );
            debug!(
                %id,
                class = %track.class_name,
                distance = track.distance,
                frame = self.frame_id,
                "track created"
            );
            self.tracks.insert(id, track);
        }

        // Step 6: Remove stale tracks
        let max_missed = self.config.max_missed_frames;
        self.tracks.retain(|id, track| {
            let keep = track.missed_frames <= max_missed;
            if !keep {
                debug!(%id, age = track.age, "track destroyed");
            }
            keep
        });

        self.tracks.values().cloned().collect()
    }

    fn next_track_id(&mut self) -> TrackId {
        self.next_id += 1;
        TrackId(self.next_id)
    }

    /// Iterate over the live tracks.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(&id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Number of `update` calls so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_id
    }

    pub fn distance_estimator(&self) -> &DistanceEstimator {
        &self.distance_estimator
    }

    /// Drop every track. Identities keep advancing, so none is ever reused.
    pub fn reset(&mut self) {
        self.tracks.clear();
        self.frame_id = 0;
    }
}
