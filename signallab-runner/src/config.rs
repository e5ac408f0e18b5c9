//! Pipeline configuration loaded from TOML.
//!
//! Every section is optional; missing sections and fields fall back to the
//! defaults of the corresponding core config type.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use signallab_core::dataset::{ExampleConfig, SplitConfig};
use signallab_core::engine::{BotParameters, EngineConfig, RegimeTable};
use signallab_core::indicators::IndicatorConfig;

/// Content hash of a configuration, hex encoded.
pub type ConfigFingerprint = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {field} {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Tag naming the cached dataset; bump it whenever the inputs change.
    pub data_version: String,
    pub cache_dir: PathBuf,
    pub indicators: IndicatorConfig,
    pub examples: ExampleConfig,
    pub split: SplitConfig,
    pub engine: EngineConfig,
    pub regimes: RegimeTable,
    /// Rows per predictor call.
    pub batch_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_version: "v1".to_string(),
            cache_dir: PathBuf::from("cache"),
            indicators: IndicatorConfig::default(),
            examples: ExampleConfig::default(),
            split: SplitConfig::default(),
            engine: EngineConfig::default(),
            regimes: RegimeTable::default(),
            batch_size: 512,
        }
    }
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_version.trim().is_empty() {
            return Err(ConfigError::invalid("data_version", "must not be empty"));
        }
        if self.data_version.contains(['/', '\\']) || self.data_version.contains("..") {
            return Err(ConfigError::invalid(
                "data_version",
                "must be usable as a directory name",
            ));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::invalid("batch_size", "must be positive"));
        }

        let ind = &self.indicators;
        for (field, period) in [
            ("indicators.rsi_period", ind.rsi_period),
            ("indicators.atr_short_period", ind.atr_short_period),
            ("indicators.atr_long_period", ind.atr_long_period),
            ("indicators.adx_period", ind.adx_period),
            ("indicators.trend_period", ind.trend_period),
            ("indicators.macd_fast", ind.macd_fast),
            ("indicators.macd_signal", ind.macd_signal),
            ("indicators.bollinger_period", ind.bollinger_period),
            ("indicators.stoch_k_period", ind.stoch_k_period),
            ("indicators.stoch_d_period", ind.stoch_d_period),
            ("indicators.regime_filter_period", ind.regime_filter_period),
        ] {
            if period == 0 {
                return Err(ConfigError::invalid(field, "must be positive"));
            }
        }
        if ind.macd_fast >= ind.macd_slow {
            return Err(ConfigError::invalid(
                "indicators.macd_slow",
                format!("must exceed macd_fast ({})", ind.macd_fast),
            ));
        }
        if !(ind.bollinger_multiplier > 0.0) {
            return Err(ConfigError::invalid(
                "indicators.bollinger_multiplier",
                "must be positive",
            ));
        }

        if self.examples.time_steps == 0 {
            return Err(ConfigError::invalid("examples.time_steps", "must be positive"));
        }
        if self.examples.max_future_ticks == 0 {
            return Err(ConfigError::invalid(
                "examples.max_future_ticks",
                "must be positive",
            ));
        }

        let split = &self.split;
        if !(split.train_ratio > 0.0 && split.val_ratio >= 0.0)
            || split.train_ratio + split.val_ratio >= 1.0
        {
            return Err(ConfigError::invalid(
                "split",
                format!(
                    "train_ratio ({}) and val_ratio ({}) must leave room for a test partition",
                    split.train_ratio, split.val_ratio
                ),
            ));
        }

        let engine = &self.engine;
        if !(engine.initial_balance > 0.0) {
            return Err(ConfigError::invalid("engine.initial_balance", "must be positive"));
        }
        if !(engine.commission_rate >= 0.0) {
            return Err(ConfigError::invalid(
                "engine.commission_rate",
                "must be non-negative",
            ));
        }
        if engine.lot_size == 0 {
            return Err(ConfigError::invalid("engine.lot_size", "must be positive"));
        }

        validate_params("regimes.high", &self.regimes.high)?;
        validate_params("regimes.low", &self.regimes.low)?;
        Ok(())
    }

    /// Deterministic hash of the full configuration.
    ///
    /// Two configs with the same fingerprint produce the same dataset and
    /// the same simulation.
    pub fn fingerprint(&self) -> Result<ConfigFingerprint, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

fn validate_params(section: &str, params: &BotParameters) -> Result<(), ConfigError> {
    if !(params.atr_stop_multiplier > 0.0) {
        return Err(ConfigError::invalid(
            format!("{section}.atr_stop_multiplier"),
            "must be positive",
        ));
    }
    if !(params.risk_reward_ratio > 0.0) {
        return Err(ConfigError::invalid(
            format!("{section}.risk_reward_ratio"),
            "must be positive",
        ));
    }
    if !(params.risk_percent > 0.0 && params.risk_percent <= 1.0) {
        return Err(ConfigError::invalid(
            format!("{section}.risk_percent"),
            "must be in (0, 1]",
        ));
    }
    Ok(())
}
