use ndarray::{s, Array2, Array3, ArrayView2, ArrayView3, Axis};

use super::builder::Example;
use super::labels::{argmax, LabelPolicy};
use super::normalize::FeatureStats;
use super::DatasetError;

/// A contiguous block of examples as tensors: features `[N, F, T]`, labels
/// `[N, O]` and the anchor bar index of each row.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub features: Array3<f64>,
    pub labels: Array2<f64>,
    pub anchors: Vec<usize>,
}

impl Partition {
    /// Stack examples; every example must have the given shapes.
    pub fn from_examples(
        examples: &[Example],
        num_features: usize,
        time_steps: usize,
        num_outputs: usize,
    ) -> Result<Self, DatasetError> {
        let n = examples.len();
        let mut features = Array3::zeros((n, num_features, time_steps));
        let mut labels = Array2::zeros((n, num_outputs));
        let mut anchors = Vec::with_capacity(n);

        for (i, example) in examples.iter().enumerate() {
            if example.features.dim() != (num_features, time_steps) {
                return Err(DatasetError::ShapeMismatch {
                    expected: vec![num_features, time_steps],
                    actual: example.features.shape().to_vec(),
                });
            }
            if example.label.len() != num_outputs {
                return Err(DatasetError::ShapeMismatch {
                    expected: vec![num_outputs],
                    actual: vec![example.label.len()],
                });
            }
            features.index_axis_mut(Axis(0), i).assign(&example.features);
            labels.row_mut(i).assign(&example.label);
            anchors.push(example.anchor);
        }

        Ok(Self {
            features,
            labels,
            anchors,
        })
    }

    pub fn len(&self) -> usize {
        self.features.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_features(&self) -> usize {
        self.features.len_of(Axis(1))
    }

    pub fn time_steps(&self) -> usize {
        self.features.len_of(Axis(2))
    }

    pub fn num_outputs(&self) -> usize {
        self.labels.len_of(Axis(1))
    }

    /// Rows in the given order; indices may repeat.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            features: self.features.select(Axis(0), indices),
            labels: self.labels.select(Axis(0), indices),
            anchors: indices.iter().map(|&i| self.anchors[i]).collect(),
        }
    }

    /// Consecutive `(features, labels)` views of at most `batch_size` rows.
    pub fn batches(&self, batch_size: usize) -> impl Iterator<Item = (ArrayView3<'_, f64>, ArrayView2<'_, f64>)> {
        let size = batch_size.max(1);
        let n = self.len();
        (0..n).step_by(size).map(move |start| {
            let end = (start + size).min(n);
            (
                self.features.slice(s![start..end, .., ..]),
                self.labels.slice(s![start..end, ..]),
            )
        })
    }

    /// Row count per argmax label column.
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.num_outputs()];
        for row in self.labels.rows() {
            if let Some((class, _)) = argmax(row) {
                counts[class] += 1;
            }
        }
        counts
    }
}

/// Train, validation and test partitions in time order plus the statistics
/// fitted on train.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub train: Partition,
    pub val: Partition,
    pub test: Partition,
    pub stats: FeatureStats,
    pub label_policy: LabelPolicy,
    /// Train size before oversampling.
    pub train_chronological_len: usize,
    /// Bar index of test example 0; simulation step `s` is bar
    /// `test_start_index + s`.
    pub test_start_index: usize,
}
