//! Smoothed frames-per-second measurement.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::config::PipelineConfig;

/// Sliding-window FPS counter.
///
/// Each [`tick`](Self::tick) records the time since the previous tick. The
/// reported rate is the reciprocal of the mean delta over the window, and zero
/// until more than `min_samples` deltas have been recorded.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    window: usize,
    min_samples: usize,
    deltas: VecDeque<Duration>,
    last: Option<Instant>,
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new(30, 5)
    }
}

impl FpsCounter {
    pub fn new(window: usize, min_samples: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            min_samples,
            deltas: VecDeque::with_capacity(window),
            last: None,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.fps_window, config.fps_min_samples)
    }

    /// Record a frame now and return the current rate.
    pub fn tick(&mut self) -> f64 {
        self.tick_at(Instant::now())
    }

    /// Record a frame at `now` and return the current rate.
    pub fn tick_at(&mut self, now: Instant) -> f64 {
        if let Some(last) = self.last {
            self.deltas.push_back(now.saturating_duration_since(last));
            if self.deltas.len() > self.window {
                self.deltas.pop_front();
            }
        }
        self.last = Some(now);
        self.fps()
    }

    /// Current rate without recording a frame.
    pub fn fps(&self) -> f64 {
        if self.deltas.len() <= self.min_samples {
            return 0.0;
        }
        let total: Duration = self.deltas.iter().sum();
        let mean = total.as_secs_f64() / self.deltas.len() as f64;
        if mean > 0.0 { 1.0 / mean } else { 0.0 }
    }

    pub fn reset(&mut self) {
        self.deltas.clear();
        self.last = None;
    }
}
