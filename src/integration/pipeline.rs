//! FramePipeline: detection and tracking on a dedicated worker thread.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, select};
use tracing::{error, info, trace};

use crate::config::{Config, PipelineConfig};
use crate::error::{Error, Result};
use crate::integration::detector::DetectionSource;
use crate::integration::frame::Frame;
use crate::integration::queue::FrameQueue;
use crate::tracker::{Track, TrackManager};

/// Output of one processed frame.
#[derive(Debug, Clone)]
pub struct FrameResult {
    pub frame: Frame,
    pub tracks: Vec<Track>,
    /// Number of detections the detector returned for this frame
    pub detection_count: usize,
}

/// Throughput counters, collected when the pipeline stops.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineStats {
    pub frames_submitted: u64,
    /// Frames rejected because the inbound queue was full
    pub frames_dropped: u64,
    pub frames_processed: u64,
    /// Frames whose detection failed or panicked
    pub frames_failed: u64,
    /// Results discarded because the outbound queue was full
    pub results_dropped: u64,
    pub detection_count: u64,
    /// Exponential moving average of detector latency
    pub avg_detection_time: Duration,
}

impl PipelineStats {
    fn record_detection_time(&mut self, elapsed: Duration) {
        self.avg_detection_time = self.avg_detection_time.mul_f64(0.9) + elapsed.mul_f64(0.1);
    }
}

/// A detector and a [`TrackManager`] running on their own thread.
///
/// The caller submits frames and collects results without ever blocking:
/// a full inbound queue drops the frame, a full outbound queue drops the
/// result. Frames are processed in submission order.
///
/// Stopping (explicitly or on drop) waits for the worker to exit.
pub struct FramePipeline {
    frames: FrameQueue<Frame>,
    results: FrameQueue<FrameResult>,
    shutdown: Option<Sender<()>>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<PipelineStats>>,
    frames_submitted: u64,
    frames_dropped: u64,
}

impl FramePipeline {
    /// Start a pipeline with a fresh tracker built from `config`.
    pub fn start<D>(detector: D, config: &Config) -> Result<Self>
    where
        D: DetectionSource + Send + 'static,
    {
        Self::with_tracker(detector, TrackManager::from_config(config), &config.pipeline)
    }

    /// Start a pipeline around an existing tracker.
    pub fn with_tracker<D>(
        detector: D,
        tracker: TrackManager,
        config: &PipelineConfig,
    ) -> Result<Self>
    where
        D: DetectionSource + Send + 'static,
    {
        let frames = FrameQueue::new(config.frame_queue_capacity);
        let results = FrameQueue::new(config.result_queue_capacity);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(0);
        let running = Arc::new(AtomicBool::new(true));

        let worker = Worker {
            detector,
            tracker,
            frames: frames.clone(),
            results: results.clone(),
            shutdown: shutdown_rx,
            running: Arc::clone(&running),
        };
        let handle = thread::Builder::new()
            .name("skypulse-worker".into())
            .spawn(move || worker.run())
            .map_err(Error::WorkerSpawn)?;

        info!(
            frame_queue = frames.capacity(),
            result_queue = results.capacity(),
            "pipeline started"
        );

        Ok(Self {
            frames,
            results,
            shutdown: Some(shutdown_tx),
            running,
            worker: Some(handle),
            frames_submitted: 0,
            frames_dropped: 0,
        })
    }

    /// Queue a frame for processing. Returns `false` if it was dropped
    /// because the inbound queue is full.
    pub fn submit(&mut self, frame: Frame) -> bool {
        self.frames_submitted += 1;
        match self.frames.try_push(frame) {
            Ok(()) => true,
            Err(frame) => {
                self.frames_dropped += 1;
                trace!(frame = frame.index, "frame queue full, dropping frame");
                false
            }
        }
    }

    /// Take the oldest finished result, if any.
    pub fn try_recv(&self) -> Option<FrameResult> {
        self.results.try_pop()
    }

    /// Take the oldest finished result, waiting at most `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<FrameResult> {
        self.results.pop_timeout(timeout)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Frames waiting for the worker.
    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    /// Signal the worker to exit, wait for it and return the final counters.
    pub fn stop(mut self) -> Result<PipelineStats> {
        self.shutdown_and_join()
    }

    fn shutdown_and_join(&mut self) -> Result<PipelineStats> {
        // Disconnecting the shutdown channel wakes the worker's select.
        drop(self.shutdown.take());

        let Some(handle) = self.worker.take() else {
            return Ok(PipelineStats::default());
        };
        let mut stats = handle.join().map_err(|_| Error::WorkerPanicked)?;
        stats.frames_submitted = self.frames_submitted;
        stats.frames_dropped = self.frames_dropped;

        info!(
            processed = stats.frames_processed,
            dropped = stats.frames_dropped,
            failed = stats.frames_failed,
            detections = stats.detection_count,
            "pipeline stopped"
        );
        Ok(stats)
    }
}

impl Drop for FramePipeline {
    fn drop(&mut self) {
        if self.worker.is_some() {
            if let Err(err) = self.shutdown_and_join() {
                error!(%err, "pipeline worker did not shut down cleanly");
            }
        }
    }
}

struct Worker<D> {
    detector: D,
    tracker: TrackManager,
    frames: FrameQueue<Frame>,
    results: FrameQueue<FrameResult>,
    shutdown: Receiver<()>,
    running: Arc<AtomicBool>,
}

impl<D: DetectionSource> Worker<D> {
    fn run(mut self) -> PipelineStats {
        let mut stats = PipelineStats::default();
        let frames = self.frames.receiver().clone();
        let shutdown = self.shutdown.clone();

        loop {
            select! {
                recv(frames) -> frame => match frame {
                    Ok(frame) => self.process(frame, &mut stats),
                    Err(_) => break,
                },
                recv(shutdown) -> _ => break,
            }
        }

        self.running.store(false, Ordering::Release);
        stats
    }

    fn process(&mut self, frame: Frame, stats: &mut PipelineStats) {
        let index = frame.index;
        match catch_iteration(index, || self.step(frame)) {
            Some(Some(outcome)) => {
                stats.record_detection_time(outcome.detection_time);
                stats.frames_processed += 1;
                stats.detection_count += outcome.detection_count as u64;
                if outcome.result_dropped {
                    stats.results_dropped += 1;
                }
            }
            Some(None) | None => stats.frames_failed += 1,
        }
    }

    /// Detect, track and publish one frame. `None` if detection failed.
    fn step(&mut self, frame: Frame) -> Option<FrameOutcome> {
        let started = Instant::now();
        let detections = match self.detector.detect(&frame) {
            Ok(detections) => detections,
            Err(err) => {
                error!(frame = frame.index, %err, "detection failed");
                return None;
            }
        };
        let detection_time = started.elapsed();

        let tracks = self.tracker.update(&detections, frame.height);
        let result = FrameResult {
            frame,
            tracks,
            detection_count: detections.len(),
        };
        let result_dropped = match self.results.try_push(result) {
            Ok(()) => false,
            Err(result) => {
                trace!(frame = result.frame.index, "result queue full, dropping result");
                true
            }
        };

        Some(FrameOutcome {
            detection_count: detections.len(),
            detection_time,
            result_dropped,
        })
    }
}

struct FrameOutcome {
    detection_count: usize,
    detection_time: Duration,
    result_dropped: bool,
}

/// Run one worker iteration, turning a panic into `None`.
fn catch_iteration<T>(frame_index: u64, iteration: impl FnOnce() -> T) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(iteration)) {
        Ok(value) => Some(value),
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
                .unwrap_or("unknown panic");
            error!(frame = frame_index, reason, "worker iteration panicked");
            None
        }
    }
}
