mod distance;
mod kalman_filter;
mod matching;
mod rect;
mod track;
mod track_manager;
mod track_state;

pub use distance::{DistanceEstimator, ProximityLevel};
pub use kalman_filter::{BoxEstimator, KalmanFilter};
pub use matching::{AssignmentResult, Detection, iou_distance, linear_assignment};
pub use rect::Rect;
pub use track::{Track, TrackId};
pub use track_manager::TrackManager;
pub use track_state::TrackState;
