//! Example construction, chronological splitting, normalization and caching.
//!
//! Pipeline: [`ExampleBuilder`] turns each valid anchor into an [`Example`],
//! [`DatasetSplitter`] partitions them in time order into a [`Dataset`], and
//! [`TensorCache`] persists the result keyed by a data-version tag.

pub mod builder;
pub mod cache;
pub mod features;
pub mod labels;
pub mod normalize;
pub mod partition;
pub mod splitter;

pub use builder::{Example, ExampleBuilder};
pub use cache::{CacheError, CacheMeta, TensorCache};
pub use features::{FeatureSet, WindowNormalization};
pub use labels::{BarrierClass, LabelPolicy};
pub use normalize::FeatureStats;
pub use partition::{Dataset, Partition};
pub use splitter::{DatasetSplitter, Oversampling, SplitBounds, SplitConfig};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shape and labeling of the examples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExampleConfig {
    /// Bars per feature window.
    pub time_steps: usize,
    /// Forward horizon of the label.
    pub max_future_ticks: usize,
    /// Bars reserved for indicator warm-up before the first window.
    pub max_indicator_period: usize,
    pub feature_set: FeatureSet,
    pub window_normalization: WindowNormalization,
    pub label_policy: LabelPolicy,
}

impl Default for ExampleConfig {
    fn default() -> Self {
        Self {
            time_steps: 30,
            max_future_ticks: 12,
            max_indicator_period: 200,
            feature_set: FeatureSet::Extended,
            window_normalization: WindowNormalization::RelativeToFirst,
            label_policy: LabelPolicy::default(),
        }
    }
}

impl ExampleConfig {
    pub fn num_features(&self) -> usize {
        self.feature_set.num_features()
    }

    pub fn num_outputs(&self) -> usize {
        self.label_policy.num_outputs()
    }

    /// First anchor index that may carry an example.
    pub fn warmup(&self) -> usize {
        self.max_indicator_period + self.time_steps
    }

    /// Bar index of test example 0 given the chronological train and val
    /// sizes.
    pub fn test_start_index(&self, train_len: usize, val_len: usize) -> usize {
        train_len + val_len + self.warmup()
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum DatasetError {
    #[error("no examples could be built from {bars} bars (warm-up {warmup}, horizon {horizon})")]
    NoExamples {
        bars: usize,
        warmup: usize,
        horizon: usize,
    },

    #[error("invalid split ratios: train {train}, val {val}")]
    InvalidSplit { train: f64, val: f64 },

    #[error("{partition} partition is empty")]
    EmptyPartition { partition: &'static str },

    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
}
