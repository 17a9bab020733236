//! Matching utilities for multi-object tracking.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::tracker::rect::Rect;

/// Cost assigned to padding cells when the cost matrix is squared up.
const PADDING_COST: f64 = 1e6;

/// One detector output for a single frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Bounding box in TLBR format (x1, y1, x2, y2)
    pub bbox: Rect,
    /// Detection confidence in [0, 1]
    pub confidence: f32,
    pub class_id: u32,
    pub class_name: String,
    /// Distance in meters, if the detector already estimated one
    pub distance: Option<f32>,
}

impl Detection {
    pub fn new(
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        confidence: f32,
        class_id: u32,
        class_name: impl Into<String>,
    ) -> Self {
        Self::from_rect(Rect::from_tlbr(x1, y1, x2, y2), confidence, class_id, class_name)
    }

    pub fn from_rect(
        bbox: Rect,
        confidence: f32,
        class_id: u32,
        class_name: impl Into<String>,
    ) -> Self {
        Self {
            bbox,
            confidence,
            class_id,
            class_name: class_name.into(),
            distance: None,
        }
    }
}

/// Compute IoU distance matrix between tracks and detections.
pub fn iou_distance(track_boxes: &[Rect], det_boxes: &[Rect]) -> Array2<f32> {
    Array2::from_shape_fn((track_boxes.len(), det_boxes.len()), |(i, j)| {
        1.0 - track_boxes[i].iou(&det_boxes[j])
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentResult {
    /// Accepted (row, column) pairings
    pub matches: Vec<(usize, usize)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

/// Minimum-total-cost one-to-one assignment of rows to columns.
///
/// The optimal assignment is computed over the whole matrix first; a pairing
/// is then kept only if its cost is strictly below `max_cost`. Rows and
/// columns of rejected pairings are reported as unmatched.
pub fn linear_assignment(cost_matrix: &Array2<f32>, max_cost: f32) -> AssignmentResult {
    let (num_rows, num_cols) = cost_matrix.dim();

    if num_rows == 0 || num_cols == 0 {
        return AssignmentResult {
            matches: vec![],
            unmatched_tracks: (0..num_rows).collect(),
            unmatched_detections: (0..num_cols).collect(),
        };
    }

    let size = num_rows.max(num_cols);
    let padded = Array2::<f64>::from_shape_fn((size, size), |(i, j)| {
        if i < num_rows && j < num_cols {
            f64::from(cost_matrix[[i, j]])
        } else {
            PADDING_COST
        }
    });

    let mut matches = vec![];
    let mut unmatched_tracks = vec![];
    let mut unmatched_detections_mask = vec![true; num_cols];

    match lapjv::lapjv(&padded) {
        Ok((row_to_col, _)) => {
            for (row_idx, &col_idx) in row_to_col.iter().enumerate().take(num_rows) {
                if col_idx < num_cols && cost_matrix[[row_idx, col_idx]] < max_cost {
                    matches.push((row_idx, col_idx));
                    unmatched_detections_mask[col_idx] = false;
                } else {
                    unmatched_tracks.push(row_idx);
                }
            }
        }
        Err(err) => {
            warn!(?err, num_rows, num_cols, "assignment solver failed, leaving all unmatched");
            unmatched_tracks = (0..num_rows).collect();
        }
    }

    let unmatched_detections = unmatched_detections_mask
        .iter()
        .enumerate()
        .filter_map(|(i, &u)| u.then_some(i))
        .collect();

    AssignmentResult {
        matches,
        unmatched_tracks,
        unmatched_detections,
    }
}
