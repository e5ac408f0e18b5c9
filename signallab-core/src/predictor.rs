//! Boundary to the external price-movement predictor.
//!
//! The predictor is stateless batch inference: `[N, F, T]` feature windows in,
//! `[N, O]` prediction rows out. Whether rows are regression values or class
//! probabilities is decided by the [`LabelPolicy`](crate::dataset::LabelPolicy)
//! the model was trained with.

use std::collections::HashMap;

use ndarray::{concatenate, Array2, ArrayView2, ArrayView3, Axis};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PredictError {
    #[error("predictor returned {actual} outputs per row, expected {expected}")]
    OutputWidth { expected: usize, actual: usize },

    #[error("predictor returned {actual} rows for a batch of {expected}")]
    RowCount { expected: usize, actual: usize },

    #[error("no replayed prediction for window {position} of the batch")]
    UnknownWindow { position: usize },

    #[error("prediction failed: {0}")]
    Failed(String),
}

pub trait Predictor: Send + Sync {
    /// Width of each prediction row.
    fn num_outputs(&self) -> usize;

    fn predict(&self, batch: ArrayView3<f64>) -> Result<Array2<f64>, PredictError>;
}

/// Serves prediction rows produced elsewhere for a known set of feature
/// windows.
///
/// Each row is keyed by the content of the window it was produced for, so
/// `predict` is a pure function of its input: any batch of known windows, in
/// any order and any number of times, gets the same rows back.
pub struct ReplayPredictor {
    rows: Array2<f64>,
    index: HashMap<blake3::Hash, usize>,
}

impl ReplayPredictor {
    /// Pair `windows[i]` with `rows[i]`. Identical windows keep the row of
    /// their first occurrence.
    pub fn new(windows: ArrayView3<f64>, rows: Array2<f64>) -> Result<Self, PredictError> {
        let n = windows.len_of(Axis(0));
        if rows.nrows() != n {
            return Err(PredictError::RowCount {
                expected: n,
                actual: rows.nrows(),
            });
        }
        let mut index = HashMap::with_capacity(n);
        for (i, window) in windows.outer_iter().enumerate() {
            index.entry(window_key(window)).or_insert(i);
        }
        Ok(Self { rows, index })
    }

    pub fn rows(&self) -> ArrayView2<'_, f64> {
        self.rows.view()
    }
}

impl Predictor for ReplayPredictor {
    fn num_outputs(&self) -> usize {
        self.rows.ncols()
    }

    fn predict(&self, batch: ArrayView3<f64>) -> Result<Array2<f64>, PredictError> {
        let indices = batch
            .outer_iter()
            .enumerate()
            .map(|(position, window)| {
                self.index
                    .get(&window_key(window))
                    .copied()
                    .ok_or(PredictError::UnknownWindow { position })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.rows.select(Axis(0), &indices))
    }
}

/// Hash of a window's shape and values in logical order.
fn window_key(window: ArrayView2<f64>) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    let (f, t) = window.dim();
    hasher.update(&(f as u64).to_le_bytes());
    hasher.update(&(t as u64).to_le_bytes());
    for value in window.iter() {
        hasher.update(&value.to_bits().to_le_bytes());
    }
    hasher.finalize()
}

/// Run `predictor` over `features` in batches of `batch_size` and stack the
/// outputs, checking row counts and widths.
pub fn predict_in_batches(
    predictor: &dyn Predictor,
    features: ArrayView3<f64>,
    batch_size: usize,
) -> Result<Array2<f64>, PredictError> {
    let width = predictor.num_outputs();
    let n = features.len_of(Axis(0));
    let size = batch_size.max(1);

    let mut outputs = Vec::with_capacity(n.div_ceil(size));
    for start in (0..n).step_by(size) {
        let end = (start + size).min(n);
        let batch = features.slice(ndarray::s![start..end, .., ..]);
        let out = predictor.predict(batch)?;
        if out.nrows() != end - start {
            return Err(PredictError::RowCount {
                expected: end - start,
                actual: out.nrows(),
            });
        }
        if out.ncols() != width {
            return Err(PredictError::OutputWidth {
                expected: width,
                actual: out.ncols(),
            });
        }
        outputs.push(out);
    }

    if outputs.is_empty() {
        return Ok(Array2::zeros((0, width)));
    }
    let views: Vec<ArrayView2<f64>> = outputs.iter().map(|o| o.view()).collect();
    concatenate(Axis(0), &views).map_err(|e| PredictError::Failed(e.to_string()))
}
