//! The fixed record of indicators consumed by feature building, labeling and
//! the backtest engine.

use serde::{Deserialize, Serialize};

use super::bollinger::bollinger_bands;
use super::macd::macd_lines;
use super::sma::sma_of_series;
use super::{Adx, Atr, Ema, IndicatorSeries, Rsi, Sma, Stochastic, StochasticLine};
use crate::domain::BarSeries;

/// Periods of every indicator in an [`IndicatorSet`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub rsi_period: usize,
    pub atr_short_period: usize,
    pub atr_long_period: usize,
    pub adx_period: usize,
    /// Period of the trend EMA and SMA.
    pub trend_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger_period: usize,
    pub bollinger_multiplier: f64,
    pub stoch_k_period: usize,
    pub stoch_d_period: usize,
    /// Window of the mean short ATR used for regime detection.
    pub regime_filter_period: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            atr_short_period: 14,
            atr_long_period: 100,
            adx_period: 14,
            trend_period: 200,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bollinger_period: 20,
            bollinger_multiplier: 2.0,
            stoch_k_period: 14,
            stoch_d_period: 3,
            regime_filter_period: 100,
        }
    }
}

/// Indicator series computed once per [`BarSeries`].
#[derive(Debug, Clone)]
pub struct IndicatorSet {
    pub rsi: IndicatorSeries,
    pub atr_short: IndicatorSeries,
    pub atr_long: IndicatorSeries,
    pub atr_regime_mean: IndicatorSeries,
    pub adx: IndicatorSeries,
    pub ema_trend: IndicatorSeries,
    pub sma_trend: IndicatorSeries,
    pub macd: IndicatorSeries,
    pub macd_signal: IndicatorSeries,
    pub bb_upper: IndicatorSeries,
    pub bb_middle: IndicatorSeries,
    pub bb_lower: IndicatorSeries,
    pub stoch_k: IndicatorSeries,
    pub stoch_d: IndicatorSeries,
}

impl IndicatorSet {
    pub fn compute(series: &BarSeries, config: &IndicatorConfig) -> Self {
        let bars = series.bars();
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

        let atr_short = IndicatorSeries::compute(&Atr::new(config.atr_short_period), bars);
        let regime_period = config.regime_filter_period.max(1);
        let atr_regime_mean = IndicatorSeries::from_values(
            format!("atr_{}_mean_{regime_period}", config.atr_short_period),
            atr_short.lookback() + regime_period - 1,
            sma_of_series(atr_short.raw(), regime_period),
        );

        let (fast, slow, signal) = (config.macd_fast, config.macd_slow, config.macd_signal);
        let (macd, macd_signal) = macd_lines(&closes, fast, slow, signal);

        let bb_period = config.bollinger_period;
        let (upper, middle, lower) =
            bollinger_bands(&closes, bb_period, config.bollinger_multiplier);
        let bb_lookback = bb_period.saturating_sub(1);

        Self {
            rsi: IndicatorSeries::compute(&Rsi::new(config.rsi_period), bars),
            atr_long: IndicatorSeries::compute(&Atr::new(config.atr_long_period), bars),
            atr_short,
            atr_regime_mean,
            adx: IndicatorSeries::compute(&Adx::new(config.adx_period), bars),
            ema_trend: IndicatorSeries::compute(&Ema::new(config.trend_period), bars),
            sma_trend: IndicatorSeries::compute(&Sma::new(config.trend_period), bars),
            macd: IndicatorSeries::from_values(format!("macd_{fast}_{slow}"), slow - 1, macd),
            macd_signal: IndicatorSeries::from_values(
                format!("macd_signal_{fast}_{slow}_{signal}"),
                slow + signal - 2,
                macd_signal,
            ),
            bb_upper: IndicatorSeries::from_values(format!("bb_upper_{bb_period}"), bb_lookback, upper),
            bb_middle: IndicatorSeries::from_values(format!("bb_middle_{bb_period}"), bb_lookback, middle),
            bb_lower: IndicatorSeries::from_values(format!("bb_lower_{bb_period}"), bb_lookback, lower),
            stoch_k: IndicatorSeries::compute(
                &Stochastic::new(config.stoch_k_period, config.stoch_d_period, StochasticLine::K),
                bars,
            ),
            stoch_d: IndicatorSeries::compute(
                &Stochastic::new(config.stoch_k_period, config.stoch_d_period, StochasticLine::D),
                bars,
            ),
        }
    }

    pub fn all(&self) -> [&IndicatorSeries; 14] {
        [
            &self.rsi,
            &self.atr_short,
            &self.atr_long,
            &self.atr_regime_mean,
            &self.adx,
            &self.ema_trend,
            &self.sma_trend,
            &self.macd,
            &self.macd_signal,
            &self.bb_upper,
            &self.bb_middle,
            &self.bb_lower,
            &self.stoch_k,
            &self.stoch_d,
        ]
    }

    /// Longest warm-up across the set.
    pub fn warmup(&self) -> usize {
        self.all().iter().map(|s| s.lookback()).max().unwrap_or(0)
    }

    /// Number of bars every series is aligned to.
    pub fn len(&self) -> usize {
        self.rsi.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rsi.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn small_config() -> IndicatorConfig {
        IndicatorConfig {
            rsi_period: 3,
            atr_short_period: 3,
            atr_long_period: 6,
            adx_period: 3,
            trend_period: 10,
            macd_fast: 3,
            macd_slow: 6,
            macd_signal: 3,
            bollinger_period: 5,
            bollinger_multiplier: 2.0,
            stoch_k_period: 4,
            stoch_d_period: 2,
            regime_filter_period: 5,
        }
    }

    #[test]
    fn every_series_is_aligned_to_bars() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.7).sin() * 3.0).collect();
        let series = BarSeries::new(make_bars(&closes)).unwrap();
        let set = IndicatorSet::compute(&series, &small_config());
        for s in set.all() {
            assert_eq!(s.len(), 60, "{} misaligned", s.name());
        }
    }

    #[test]
    fn series_defined_from_lookback() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.7).sin() * 3.0).collect();
        let series = BarSeries::new(make_bars(&closes)).unwrap();
        let set = IndicatorSet::compute(&series, &small_config());
        for s in set.all() {
            let lb = s.lookback();
            assert!(s.value(lb).is_some(), "{} undefined at {lb}", s.name());
            if lb > 0 {
                assert!(s.value(lb - 1).is_none(), "{} defined at {}", s.name(), lb - 1);
            }
        }
        assert_eq!(set.warmup(), 9);
    }

    #[test]
    fn default_periods() {
        let config = IndicatorConfig::default();
        assert_eq!(config.atr_long_period, 100);
        assert_eq!(config.trend_period, 200);
        assert_eq!((config.macd_fast, config.macd_slow, config.macd_signal), (12, 26, 9));
    }
}
