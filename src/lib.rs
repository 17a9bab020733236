//! Real-time multi-object tracking for drone camera feeds.
//!
//! The [`tracker`] module turns per-frame detections into identity-stable
//! tracks (Kalman prediction, optimal IoU assignment, lifecycle, distance
//! fusion). The [`integration`] module runs detection and tracking on a worker
//! thread behind bounded frame queues.

pub mod config;
pub mod error;
pub mod integration;
pub mod tracker;

pub use config::{Config, DistanceConfig, PipelineConfig, TargetClasses, TrackingConfig};
pub use error::{Error, Result};
pub use integration::{
    DetectionBuilder, DetectionSource, FpsCounter, Frame, FrameBuffer, FramePipeline, FrameQueue,
    FrameResult, FrameSource, PipelineStats, StreamEvent, TargetClassFilter, run_stream,
};
pub use tracker::{
    Detection, DistanceEstimator, ProximityLevel, Rect, Track, TrackId, TrackManager, TrackState,
};
