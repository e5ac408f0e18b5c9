//! Backtest orchestration over a prepared dataset.

use anyhow::{Context, Result};
use ndarray::ArrayView2;
use rayon::prelude::*;
use tracing::{info, warn};

use signallab_core::engine::{BacktestEngine, EngineConfig, RegimeTable, SimulationResult};
use signallab_core::predictor::Predictor;

use crate::pipeline::PreparedData;

/// Predict the test partition in batches and simulate it once.
pub fn run_backtest(
    prepared: &PreparedData,
    predictor: &dyn Predictor,
    regimes: RegimeTable,
    engine_config: &EngineConfig,
    batch_size: usize,
) -> Result<SimulationResult> {
    let market = prepared.market()?;
    let mut engine = BacktestEngine::new(
        engine_config.clone(),
        regimes,
        prepared.dataset.label_policy,
    );
    let result = engine
        .run_with_predictor(
            &market,
            prepared.dataset.test.features.view(),
            predictor,
            batch_size,
        )
        .context("backtest failed")?;

    info!(
        trades = result.total_trades,
        final_balance = result.final_balance,
        net_return = result.net_return(),
        "backtest complete"
    );
    Ok(result)
}

/// Simulate the same predictions under every table in `tables`, in
/// parallel. Results are returned in the order of `tables`.
///
/// Each table gets its own engine, so runs share nothing but the read-only
/// market data and predictions.
pub fn evaluate_tables(
    prepared: &PreparedData,
    predictions: ArrayView2<f64>,
    tables: &[RegimeTable],
    engine_config: &EngineConfig,
) -> Result<Vec<SimulationResult>> {
    let market = prepared.market()?;
    if predictions.nrows() != prepared.dataset.test.len() {
        warn!(
            predictions = predictions.nrows(),
            test_examples = prepared.dataset.test.len(),
            "prediction count differs from test partition size"
        );
    }

    let results = tables
        .par_iter()
        .enumerate()
        .map(|(i, table)| {
            let mut engine = BacktestEngine::new(
                engine_config.clone(),
                *table,
                prepared.dataset.label_policy,
            );
            engine
                .run(&market, predictions)
                .with_context(|| format!("simulation with table {i} failed"))
        })
        .collect::<Result<Vec<_>>>()?;

    info!(tables = tables.len(), "evaluated parameter tables");
    Ok(results)
}
