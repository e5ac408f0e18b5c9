//! SignalLab Core: price bars to training examples, and a regime-adaptive
//! backtest engine that trades on a predictor's output.
//!
//! - Domain types (bars, positions, ids)
//! - Classical indicator recurrences and the fixed [`indicators::IndicatorSet`]
//! - Feature windows, label policies, chronological splitting, normalization
//!   and the tensor cache
//! - The predictor boundary
//! - The single-position backtest engine

pub mod dataset;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod predictor;
pub mod rng;
