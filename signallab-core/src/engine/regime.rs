//! Volatility regimes and the per-regime trading parameters.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::indicators::IndicatorSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    High,
    Low,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::High => write!(f, "HIGH"),
            Regime::Low => write!(f, "LOW"),
        }
    }
}

/// Risk, stop and signal settings used while a regime is active.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BotParameters {
    /// Stop distance in multiples of the short ATR.
    pub atr_stop_multiplier: f64,
    /// Target distance in multiples of the stop distance.
    pub risk_reward_ratio: f64,
    pub signal_threshold: f64,
    /// Fraction of balance risked per trade.
    pub risk_percent: f64,
}

/// Parameters per regime. The engine always takes one explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeTable {
    pub high: BotParameters,
    pub low: BotParameters,
}

impl Default for RegimeTable {
    fn default() -> Self {
        Self {
            high: BotParameters {
                atr_stop_multiplier: 4.0,
                risk_reward_ratio: 2.5,
                signal_threshold: 0.5,
                risk_percent: 0.03,
            },
            low: BotParameters {
                atr_stop_multiplier: 2.0,
                risk_reward_ratio: 1.5,
                signal_threshold: 0.6,
                risk_percent: 0.05,
            },
        }
    }
}

impl RegimeTable {
    /// The same parameters in both regimes.
    pub fn uniform(params: BotParameters) -> Self {
        Self {
            high: params,
            low: params,
        }
    }

    pub fn params(&self, regime: Regime) -> &BotParameters {
        match regime {
            Regime::High => &self.high,
            Regime::Low => &self.low,
        }
    }
}

/// HIGH when the short ATR exceeds `threshold` times its rolling mean at
/// `bar_index`; LOW otherwise, including while either is undefined.
pub fn detect_regime(indicators: &IndicatorSet, bar_index: usize, threshold: f64) -> Regime {
    match (
        indicators.atr_short.value(bar_index),
        indicators.atr_regime_mean.value(bar_index),
    ) {
        (Some(current), Some(mean)) if current > threshold * mean => Regime::High,
        _ => Regime::Low,
    }
}
