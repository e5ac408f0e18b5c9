//! SignalLab Runner: configuration, dataset preparation, backtest
//! orchestration and reporting.
//!
//! This crate builds on `signallab-core` to provide:
//! - TOML pipeline configuration with validation and fingerprinting
//! - Dataset preparation with tensor-cache hit/miss handling
//! - Single backtests against a `Predictor`
//! - Parallel evaluation of many regime parameter tables
//! - Results summary and CSV trade-log export

pub mod config;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod simulate;

pub use config::{ConfigError, ConfigFingerprint, PipelineConfig};
pub use pipeline::{build_dataset, prepare_dataset, PreparedData};
pub use report::{summary_text, write_trade_log_csv};
pub use simulate::{evaluate_tables, run_backtest};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn pipeline_config_is_send_sync() {
        assert_send::<PipelineConfig>();
        assert_sync::<PipelineConfig>();
    }

    #[test]
    fn prepared_data_is_send_sync() {
        assert_send::<PreparedData>();
        assert_sync::<PreparedData>();
    }
}
