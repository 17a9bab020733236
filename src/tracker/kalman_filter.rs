//! Constant-velocity Kalman filter for bounding box tracking using ndarray and
//! a nalgebra-based 4x4 inverse.
//!
//! The 8-dimensional state is (cx, cy, w, h, vcx, vcy, vw, vh). Only the first
//! four components are observed; velocities are inferred from successive
//! corrections. Process and measurement noise are fixed isotropic constants,
//! which favors smooth tracks over fast reaction.

use ndarray::{Array1, Array2};
use tracing::warn;

use crate::config::TrackingConfig;
use crate::tracker::rect::Rect;

const NDIM: usize = 4;

/// Filter model: transition, observation and noise matrices.
///
/// The model carries no per-track state and is shared by every track of a
/// manager. Per-track state lives in [`BoxEstimator`].
#[derive(Debug, Clone)]
pub struct KalmanFilter {
    motion_mat: Array2<f64>,
    update_mat: Array2<f64>,
    process_cov: Array2<f64>,
    measurement_cov: Array2<f64>,
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new(&TrackingConfig::default())
    }
}

impl KalmanFilter {
    pub fn new(config: &TrackingConfig) -> Self {
        let mut motion_mat = Array2::eye(2 * NDIM);
        for i in 0..NDIM {
            motion_mat[[i, NDIM + i]] = 1.0;
        }

        let mut update_mat = Array2::zeros((NDIM, 2 * NDIM));
        for i in 0..NDIM {
            update_mat[[i, i]] = 1.0;
        }

        Self {
            motion_mat,
            update_mat,
            process_cov: Array2::<f64>::eye(2 * NDIM) * config.process_noise,
            measurement_cov: Array2::<f64>::eye(NDIM) * config.measurement_noise,
        }
    }

    /// Create the state for a new track: position from the box, zero velocity,
    /// zero covariance.
    pub fn initiate(&self, measurement: [f64; 4]) -> (Array1<f64>, Array2<f64>) {
        let mut mean = Array1::zeros(2 * NDIM);
        for i in 0..NDIM {
            mean[i] = measurement[i];
        }
        (mean, Array2::zeros((2 * NDIM, 2 * NDIM)))
    }

    /// Advance the state by one frame.
    pub fn predict(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
    ) -> (Array1<f64>, Array2<f64>) {
        let new_mean = self.motion_mat.dot(mean);
        let new_covariance =
            self.motion_mat.dot(covariance).dot(&self.motion_mat.t()) + &self.process_cov;

        (new_mean, new_covariance)
    }

    /// Project the state into measurement space.
    pub fn project(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
    ) -> (Array1<f64>, Array2<f64>) {
        let mean_proj = self.update_mat.dot(mean);
        let covariance_proj =
            self.update_mat.dot(covariance).dot(&self.update_mat.t()) + &self.measurement_cov;

        (mean_proj, covariance_proj)
    }

    /// Fold a measurement into the state.
    ///
    /// Returns `None` if the innovation covariance is singular, which cannot
    /// happen with a positive measurement noise.
    pub fn update(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
        measurement: [f64; 4],
    ) -> Option<(Array1<f64>, Array2<f64>)> {
        let (projected_mean, projected_cov) = self.project(mean, covariance);

        let measurement_arr = Array1::from_vec(measurement.to_vec());
        let innovation = measurement_arr - projected_mean;

        // K = P * H^T * S^-1
        let s_inv = invert_4x4(&projected_cov)?;
        let pht = covariance.dot(&self.update_mat.t()); // 8x4
        let kalman_gain = pht.dot(&s_inv); // 8x4

        let new_mean = mean + &kalman_gain.dot(&innovation);
        // P - K * H * P
        let new_covariance = covariance - &kalman_gain.dot(&self.update_mat).dot(covariance);

        Some((new_mean, new_covariance))
    }
}

/// Invert a 4x4 matrix using nalgebra (pure Rust).
fn invert_4x4(m: &Array2<f64>) -> Option<Array2<f64>> {
    let nm = nalgebra::Matrix4::from_fn(|i, j| m[[i, j]]);
    let inv = nm.try_inverse()?;
    Some(Array2::from_shape_fn((NDIM, NDIM), |(i, j)| inv[(i, j)]))
}

fn measurement_of(bbox: &Rect) -> [f64; 4] {
    bbox.to_cxcywh().map(f64::from)
}

/// Per-track filter state.
#[derive(Debug, Clone)]
pub struct BoxEstimator {
    mean: Array1<f64>,
    covariance: Array2<f64>,
}

impl BoxEstimator {
    /// Start estimating from an initial box.
    pub fn new(kalman_filter: &KalmanFilter, bbox: &Rect) -> Self {
        let (mean, covariance) = kalman_filter.initiate(measurement_of(bbox));
        Self { mean, covariance }
    }

    /// Advance one time step and return the predicted box.
    pub fn predict(&mut self, kalman_filter: &KalmanFilter) -> Rect {
        let (mean, covariance) = kalman_filter.predict(&self.mean, &self.covariance);
        self.mean = mean;
        self.covariance = covariance;
        self.bbox()
    }

    /// Fold an observed box into the state.
    pub fn correct(&mut self, kalman_filter: &KalmanFilter, bbox: &Rect) {
        match kalman_filter.update(&self.mean, &self.covariance, measurement_of(bbox)) {
            Some((mean, covariance)) => {
                self.mean = mean;
                self.covariance = covariance;
            }
            None => warn!(?bbox, "singular innovation covariance, skipping correction"),
        }
    }

    /// Box described by the current state.
    pub fn bbox(&self) -> Rect {
        Rect::from_cxcywh(
            self.mean[0] as f32,
            self.mean[1] as f32,
            self.mean[2] as f32,
            self.mean[3] as f32,
        )
    }

    /// Center velocity (vx, vy) in pixels per frame.
    pub fn velocity(&self) -> (f32, f32) {
        (self.mean[4] as f32, self.mean[5] as f32)
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn covariance(&self) -> &Array2<f64> {
        &self.covariance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initiate() {
        let kf = KalmanFilter::default();
        let (mean, cov) = kf.initiate([100.0, 200.0, 50.0, 40.0]);
        assert_eq!(mean.to_vec(), vec![100.0, 200.0, 50.0, 40.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(cov.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_predict_integrates_velocity() {
        let kf = KalmanFilter::default();
        let mut mean = Array1::from_vec(vec![10.0, 20.0, 5.0, 5.0, 2.0, -1.0, 0.0, 0.0]);
        let cov = Array2::zeros((8, 8));

        let (predicted, predicted_cov) = kf.predict(&mean, &cov);
        assert_eq!(predicted[0], 12.0);
        assert_eq!(predicted[1], 19.0);
        assert_eq!(predicted[4], 2.0);
        assert!((predicted_cov[[0, 0]] - 0.03).abs() < 1e-12);

        mean = predicted;
        let (predicted, _) = kf.predict(&mean, &predicted_cov);
        assert_eq!(predicted[0], 14.0);
    }

    #[test]
    fn test_stationary_box_stays_put() {
        let kf = KalmanFilter::default();
        let bbox = Rect::from_tlbr(100.0, 100.0, 200.0, 200.0);
        let mut estimator = BoxEstimator::new(&kf, &bbox);

        for _ in 0..5 {
            let predicted = estimator.predict(&kf);
            assert!((predicted.x1 - 100.0).abs() < 1e-3);
            estimator.correct(&kf, &bbox);
        }
        let (vx, vy) = estimator.velocity();
        assert!(vx.abs() < 1e-6 && vy.abs() < 1e-6);

        let mean = estimator.mean();
        assert!((mean[0] - 150.0).abs() < 1e-6);
        assert!((mean[2] - 100.0).abs() < 1e-6);

        // Corrections keep the covariance symmetric with positive variances.
        let cov = estimator.covariance();
        for i in 0..8 {
            assert!(cov[[i, i]] > 0.0);
            for j in 0..8 {
                assert!((cov[[i, j]] - cov[[j, i]]).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_velocity_is_inferred_from_corrections() {
        let kf = KalmanFilter::default();
        let mut estimator = BoxEstimator::new(&kf, &Rect::from_tlwh(0.0, 0.0, 20.0, 20.0));

        for step in 1..=30 {
            estimator.predict(&kf);
            let x = 4.0 * step as f32;
            estimator.correct(&kf, &Rect::from_tlwh(x, 0.0, 20.0, 20.0));
        }

        let (vx, vy) = estimator.velocity();
        assert!(vx > 3.0 && vx < 5.0, "vx = {vx}");
        assert!(vy.abs() < 0.5, "vy = {vy}");

        // Correction pulls the estimate toward the observation without jumping onto it.
        let observed = Rect::from_tlwh(124.0, 0.0, 20.0, 20.0);
        let predicted = estimator.predict(&kf);
        estimator.correct(&kf, &observed);
        let corrected = estimator.bbox();
        assert!((corrected.x1 - observed.x1).abs() <= (predicted.x1 - observed.x1).abs());
    }
}
