//! Builder for creating Detection objects from various input formats.

use crate::tracker::{Detection, Rect};

/// Builder for creating `Detection` objects from various input formats.
#[derive(Debug, Clone, Default)]
pub struct DetectionBuilder {
    bbox: Rect,
    confidence: f32,
    class_id: u32,
    class_name: String,
    distance: Option<f32>,
}

impl DetectionBuilder {
    /// Create a new detection builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bounding box in TLBR format (x1, y1, x2, y2).
    pub fn tlbr(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.bbox = Rect::from_tlbr(x1, y1, x2, y2);
        self
    }

    /// Set bounding box in XYWH format (center_x, center_y, width, height).
    pub fn xywh(mut self, cx: f32, cy: f32, w: f32, h: f32) -> Self {
        self.bbox = Rect::from_cxcywh(cx, cy, w, h);
        self
    }

    /// Set bounding box in TLWH format (left, top, width, height).
    pub fn tlwh(mut self, x: f32, y: f32, w: f32, h: f32) -> Self {
        self.bbox = Rect::from_tlwh(x, y, w, h);
        self
    }

    /// Set the confidence score.
    pub fn confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    /// Set the class id and label.
    pub fn class(mut self, class_id: u32, class_name: impl Into<String>) -> Self {
        self.class_id = class_id;
        self.class_name = class_name.into();
        self
    }

    /// Attach a distance already measured by the detector, in meters.
    pub fn distance(mut self, distance: f32) -> Self {
        self.distance = Some(distance);
        self
    }

    /// Build the final `Detection`.
    pub fn build(self) -> Detection {
        let mut detection =
            Detection::from_rect(self.bbox, self.confidence, self.class_id, self.class_name);
        detection.distance = self.distance;
        detection
    }
}
