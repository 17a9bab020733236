//! Integration of detection backends and capture sources with the tracker.
//!
//! A [`FramePipeline`] runs a [`DetectionSource`] and a
//! [`TrackManager`](crate::tracker::TrackManager) on a worker thread behind
//! bounded queues; [`run_stream`] drives it from a [`FrameSource`].

mod builder;
mod detector;
mod fps;
mod frame;
mod pipeline;
mod queue;
mod stream;

pub use builder::DetectionBuilder;
pub use detector::{DetectionSource, TargetClassFilter};
pub use fps::FpsCounter;
pub use frame::{Frame, FrameBuffer};
pub use pipeline::{FramePipeline, FrameResult, PipelineStats};
pub use queue::FrameQueue;
pub use stream::{FrameSource, StreamEvent, run_stream};
