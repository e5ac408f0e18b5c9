//! Per-channel z-score statistics fitted on the train partition.

use ndarray::{Array3, Axis};
use serde::{Deserialize, Serialize};

use super::DatasetError;

/// Lower bound on a channel's standard deviation.
pub const STD_FLOOR: f64 = 1e-8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureStats {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl FeatureStats {
    /// Mean and population std per channel over all examples and timesteps
    /// of `features` (`[N, F, T]`).
    pub fn fit(features: &Array3<f64>) -> Result<Self, DatasetError> {
        let (n, num_features, time_steps) = features.dim();
        if n == 0 || time_steps == 0 {
            return Err(DatasetError::EmptyPartition { partition: "train" });
        }
        let count = (n * time_steps) as f64;

        let mut mean = Vec::with_capacity(num_features);
        let mut std = Vec::with_capacity(num_features);
        for channel in features.axis_iter(Axis(1)) {
            let m = channel.sum() / count;
            let variance = channel.iter().map(|x| (x - m).powi(2)).sum::<f64>() / count;
            mean.push(m);
            std.push(variance.sqrt().max(STD_FLOOR));
        }
        Ok(Self { mean, std })
    }

    pub fn num_features(&self) -> usize {
        self.mean.len()
    }

    /// Standardize `features` in place with these statistics.
    pub fn apply(&self, features: &mut Array3<f64>) -> Result<(), DatasetError> {
        let channels = features.len_of(Axis(1));
        if channels != self.num_features() {
            return Err(DatasetError::ShapeMismatch {
                expected: vec![self.num_features()],
                actual: vec![channels],
            });
        }
        for (f, mut channel) in features.axis_iter_mut(Axis(1)).enumerate() {
            let (m, sd) = (self.mean[f], self.std[f]);
            channel.mapv_inplace(|x| (x - m) / sd);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::assert_approx;

    #[test]
    fn fit_then_apply_standardizes_train() {
        let mut features = Array3::from_shape_fn((10, 3, 4), |(n, f, t)| {
            (n * 4 + t) as f64 * (f as f64 + 1.0) + f as f64 * 10.0
        });
        let stats = FeatureStats::fit(&features).unwrap();
        stats.apply(&mut features).unwrap();
        let after = FeatureStats::fit(&features).unwrap();
        for f in 0..3 {
            assert_approx(after.mean[f], 0.0, 1e-9);
            assert_approx(after.std[f], 1.0, 1e-9);
        }
    }

    #[test]
    fn constant_channel_std_is_floored() {
        let mut features = Array3::from_elem((4, 1, 2), 3.0);
        let stats = FeatureStats::fit(&features).unwrap();
        assert_eq!(stats.std[0], STD_FLOOR);
        stats.apply(&mut features).unwrap();
        assert!(features.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn empty_train_cannot_be_fitted() {
        let features = Array3::<f64>::zeros((0, 2, 2));
        assert!(FeatureStats::fit(&features).is_err());
    }

    #[test]
    fn channel_count_must_match() {
        let stats = FeatureStats {
            mean: vec![0.0; 2],
            std: vec![1.0; 2],
        };
        let mut features = Array3::<f64>::zeros((1, 3, 2));
        assert!(stats.apply(&mut features).is_err());
    }
}
