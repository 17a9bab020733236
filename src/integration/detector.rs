//! Trait for object detection backends.

use std::fmt;

use crate::config::TargetClasses;
use crate::integration::frame::Frame;
use crate::tracker::Detection;

/// Trait for object detection inference backends.
///
/// Implement this trait to feed any detection model into the pipeline.
/// Detections are expected without a distance; the tracker estimates it.
///
/// # Example
///
/// ```ignore
/// use skypulse_track::{Detection, DetectionSource, Frame};
///
/// struct MyDetector {
///     // Your model here
/// }
///
/// impl DetectionSource for MyDetector {
///     type Error = std::io::Error;
///
///     fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Self::Error> {
///         // Run inference and return detections
///         Ok(vec![])
///     }
/// }
/// ```
pub trait DetectionSource {
    /// Error type for detection failures.
    type Error: fmt::Display;

    /// Run inference on one frame.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Self::Error>;
}

impl<D: DetectionSource + ?Sized> DetectionSource for Box<D> {
    type Error = D::Error;

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Self::Error> {
        (**self).detect(frame)
    }
}

/// Keeps only detections of the configured target classes.
///
/// Surviving detections get their class label from the target class map, so
/// labels always match the distance estimator's reference sizes.
pub struct TargetClassFilter<D> {
    inner: D,
    classes: TargetClasses,
}

impl<D: DetectionSource> TargetClassFilter<D> {
    pub fn new(inner: D, classes: TargetClasses) -> Self {
        Self { inner, classes }
    }

    pub fn into_inner(self) -> D {
        self.inner
    }
}

impl<D: DetectionSource> DetectionSource for TargetClassFilter<D> {
    type Error = D::Error;

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Self::Error> {
        let detections = self.inner.detect(frame)?;
        Ok(detections
            .into_iter()
            .filter_map(|mut det| {
                let label = self.classes.label(det.class_id)?;
                det.class_name = label.to_string();
                Some(det)
            })
            .collect())
    }
}
