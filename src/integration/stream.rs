//! Capture loop driving a [`FramePipeline`] from a frame source.

use std::ops::ControlFlow;

use tracing::{error, info};

use crate::config::Config;
use crate::error::Result;
use crate::integration::detector::DetectionSource;
use crate::integration::fps::FpsCounter;
use crate::integration::frame::{Frame, FrameBuffer};
use crate::integration::pipeline::{FramePipeline, FrameResult, PipelineStats};

/// A capture device or video file.
pub trait FrameSource {
    /// Open the device. Failing here is fatal for the stream.
    fn open(&mut self) -> Result<()>;

    /// Read the next frame; `Ok(None)` at end of stream.
    fn read(&mut self) -> Result<Option<Frame>>;

    /// Release the device. Called once the worker has exited.
    fn release(&mut self) {}
}

/// What the consumer sees for each result taken off the pipeline.
pub struct StreamEvent<'a> {
    pub result: FrameResult,
    /// Smoothed rate at which results are consumed
    pub fps: f64,
    /// Most recently captured raw frames
    pub recent_frames: &'a FrameBuffer,
}

/// Run the capture loop until the source is exhausted or the consumer breaks.
///
/// The loop never blocks on the pipeline: each captured frame is offered to
/// the worker (and dropped if its queue is full), then at most one finished
/// result is handed to `consumer`. The worker is stopped and joined before
/// the source is released.
pub fn run_stream<S, D, F>(
    source: &mut S,
    detector: D,
    config: &Config,
    mut consumer: F,
) -> Result<PipelineStats>
where
    S: FrameSource,
    D: DetectionSource + Send + 'static,
    F: FnMut(StreamEvent<'_>) -> ControlFlow<()>,
{
    source.open()?;

    let mut pipeline = match FramePipeline::start(detector, config) {
        Ok(pipeline) => pipeline,
        Err(err) => {
            source.release();
            return Err(err);
        }
    };

    let recent_frames = FrameBuffer::new(config.pipeline.frame_buffer_size);
    let mut fps_counter = FpsCounter::from_config(&config.pipeline);
    let log_interval = config.pipeline.performance_log_interval.max(1);
    let mut consumed: u64 = 0;
    let mut detections: u64 = 0;

    loop {
        let frame = match source.read() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!("end of stream");
                break;
            }
            Err(err) => {
                error!(%err, "frame capture failed, ending stream");
                break;
            }
        };

        recent_frames.push(frame.clone());
        pipeline.submit(frame);

        let Some(result) = pipeline.try_recv() else {
            continue;
        };
        let fps = fps_counter.tick();
        consumed += 1;
        detections += result.detection_count as u64;
        if consumed % log_interval == 0 {
            info!(fps, frames = consumed, detections, "performance");
        }

        let event = StreamEvent {
            result,
            fps,
            recent_frames: &recent_frames,
        };
        if consumer(event).is_break() {
            info!("stream stopped by consumer");
            break;
        }
    }

    let stats = pipeline.stop();
    source.release();
    stats
}
