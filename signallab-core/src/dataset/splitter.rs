//! Chronological split, minority oversampling of train and normalization.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::builder::Example;
use super::labels::{argmax, BarrierClass};
use super::normalize::FeatureStats;
use super::partition::{Dataset, Partition};
use super::{DatasetError, ExampleConfig};
use crate::rng::RngHierarchy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Oversampling {
    None,
    /// Oversample the least frequent class present in train.
    Auto,
    Class(BarrierClass),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub train_ratio: f64,
    pub val_ratio: f64,
    /// Only applied to classification labels.
    pub oversampling: Oversampling,
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            train_ratio: 0.70,
            val_ratio: 0.15,
            oversampling: Oversampling::Auto,
            seed: 42,
        }
    }
}

/// Example-count boundaries: train is `..train_end`, val is
/// `train_end..val_end`, test is `val_end..total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitBounds {
    pub train_end: usize,
    pub val_end: usize,
    pub total: usize,
}

impl SplitBounds {
    pub fn compute(total: usize, train_ratio: f64, val_ratio: f64) -> Result<Self, DatasetError> {
        let valid = train_ratio > 0.0
            && train_ratio < 1.0
            && (0.0..1.0).contains(&val_ratio)
            && train_ratio + val_ratio < 1.0;
        if !valid {
            return Err(DatasetError::InvalidSplit {
                train: train_ratio,
                val: val_ratio,
            });
        }
        let train_end = (total as f64 * train_ratio).floor() as usize;
        let val_end = train_end + (total as f64 * val_ratio).floor() as usize;
        Ok(Self {
            train_end,
            val_end: val_end.min(total),
            total,
        })
    }

    pub fn train_len(&self) -> usize {
        self.train_end
    }

    pub fn val_len(&self) -> usize {
        self.val_end - self.train_end
    }

    pub fn test_len(&self) -> usize {
        self.total - self.val_end
    }
}

/// Class to oversample, by label column.
pub fn resolve_minority(oversampling: Oversampling, counts: &[usize]) -> Option<usize> {
    match oversampling {
        Oversampling::None => None,
        Oversampling::Class(class) => Some(class.index()),
        Oversampling::Auto => counts
            .iter()
            .enumerate()
            .filter(|(_, &c)| c > 0)
            .min_by_key(|(_, &c)| c)
            .map(|(i, _)| i),
    }
}

/// Duplicate random rows of class `minority` (with replacement) until it
/// matches the majority count, then shuffle the enlarged partition.
pub fn oversample(partition: &Partition, minority: usize, rng: &mut StdRng) -> Partition {
    let counts = partition.class_counts();
    let majority = counts.iter().copied().max().unwrap_or(0);
    let Some(&minority_count) = counts.get(minority) else {
        return partition.clone();
    };

    let minority_rows: Vec<usize> = partition
        .labels
        .rows()
        .into_iter()
        .enumerate()
        .filter(|(_, row)| argmax(row.view()).map(|(c, _)| c) == Some(minority))
        .map(|(i, _)| i)
        .collect();

    let mut indices: Vec<usize> = (0..partition.len()).collect();
    if !minority_rows.is_empty() {
        for _ in minority_count..majority {
            indices.push(minority_rows[rng.gen_range(0..minority_rows.len())]);
        }
    }
    indices.shuffle(rng);
    partition.select(&indices)
}

pub struct DatasetSplitter {
    examples: ExampleConfig,
    split: SplitConfig,
    data_version: String,
}

impl DatasetSplitter {
    pub fn new(examples: ExampleConfig, split: SplitConfig, data_version: impl Into<String>) -> Self {
        Self {
            examples,
            split,
            data_version: data_version.into(),
        }
    }

    /// Partition time-ordered examples into a normalized [`Dataset`].
    ///
    /// Only train is oversampled and shuffled; val and test keep anchor
    /// order. Statistics are fitted on the final train partition.
    pub fn split(&self, examples: &[Example]) -> Result<Dataset, DatasetError> {
        let bounds = SplitBounds::compute(examples.len(), self.split.train_ratio, self.split.val_ratio)?;
        if bounds.train_len() == 0 {
            return Err(DatasetError::EmptyPartition { partition: "train" });
        }
        if bounds.test_len() == 0 {
            return Err(DatasetError::EmptyPartition { partition: "test" });
        }

        let (f, t, o) = (
            self.examples.num_features(),
            self.examples.time_steps,
            self.examples.num_outputs(),
        );
        let mut train = Partition::from_examples(&examples[..bounds.train_end], f, t, o)?;
        let mut val = Partition::from_examples(&examples[bounds.train_end..bounds.val_end], f, t, o)?;
        let mut test = Partition::from_examples(&examples[bounds.val_end..], f, t, o)?;

        let policy = self.examples.label_policy;
        if policy.is_classification() {
            let before = train.class_counts();
            if let Some(minority) = resolve_minority(self.split.oversampling, &before) {
                let mut rng = RngHierarchy::new(self.split.seed).rng_for(&self.data_version, "oversample");
                train = oversample(&train, minority, &mut rng);
                info!(
                    minority,
                    before = ?before,
                    after = ?train.class_counts(),
                    "oversampled train partition"
                );
                if before.get(minority) == Some(&0) {
                    warn!(minority, "designated minority class absent from train; nothing duplicated");
                }
            }
        } else if self.split.oversampling != Oversampling::None {
            debug!("oversampling ignored for regression labels");
        }

        let stats = FeatureStats::fit(&train.features)?;
        stats.apply(&mut train.features)?;
        stats.apply(&mut val.features)?;
        stats.apply(&mut test.features)?;

        let test_start_index = self
            .examples
            .test_start_index(bounds.train_len(), bounds.val_len());
        info!(
            train = train.len(),
            val = val.len(),
            test = test.len(),
            test_start_index,
            "dataset split"
        );

        Ok(Dataset {
            train,
            val,
            test,
            stats,
            label_policy: policy,
            train_chronological_len: bounds.train_len(),
            test_start_index,
        })
    }
}
