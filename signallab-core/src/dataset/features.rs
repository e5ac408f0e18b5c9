//! Per-bar feature channels and the fixed-shape feature window.
//!
//! Channel order is positional and part of the dataset contract: predictors
//! trained on one ordering are meaningless on another.

use chrono::{Datelike, Timelike};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::indicators::IndicatorSet;

/// Denominators below this produce a 0.0 ratio instead of a blow-up.
const RATIO_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSet {
    /// Price action, volume, RSI, ATR and calendar channels.
    Basic,
    /// Basic plus MACD, Bollinger, Stochastic, trend and ADX channels.
    Extended,
}

impl FeatureSet {
    pub fn num_features(self) -> usize {
        match self {
            FeatureSet::Basic => 9,
            FeatureSet::Extended => 18,
        }
    }

    pub fn channel_names(self) -> &'static [&'static str] {
        const NAMES: [&str; 18] = [
            "close_return",
            "open_to_close",
            "high_to_close",
            "low_to_close",
            "volume_change",
            "rsi",
            "atr_short",
            "day_of_week",
            "hour_of_day",
            "macd_hist",
            "bb_width",
            "bb_position",
            "stoch_k",
            "stoch_d",
            "close_to_sma_trend",
            "atr_ratio",
            "adx",
            "close_to_ema_trend",
        ];
        &NAMES[..self.num_features()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowNormalization {
    /// Each channel becomes `x / x0 - 1` against its first timestep, or
    /// `x - x0` when `|x0|` is near zero.
    RelativeToFirst,
    None,
}

/// `current / previous - 1`, or 0.0 when `previous` is near zero.
pub fn pct_change(current: f64, previous: f64) -> f64 {
    if previous.abs() < RATIO_EPSILON {
        0.0
    } else {
        (current - previous) / previous
    }
}

fn ratio_minus_one(numerator: f64, denominator: Option<f64>) -> f64 {
    match denominator {
        Some(d) if d.abs() >= RATIO_EPSILON => numerator / d - 1.0,
        _ => 0.0,
    }
}

/// Feature channels of bar `index`. `index` must be at least 1.
pub fn bar_features(
    bars: &[Bar],
    indicators: &IndicatorSet,
    index: usize,
    feature_set: FeatureSet,
) -> Vec<f64> {
    let bar = &bars[index];
    let prev = &bars[index - 1];

    let mut row = Vec::with_capacity(feature_set.num_features());
    row.push(pct_change(bar.close, prev.close));
    row.push(pct_change(bar.open, bar.close));
    row.push(pct_change(bar.high, bar.close));
    row.push(pct_change(bar.low, bar.close));
    row.push(pct_change(bar.volume, prev.volume));
    row.push(indicators.rsi.value_or_zero(index));
    row.push(indicators.atr_short.value_or_zero(index));
    row.push(bar.timestamp.weekday().number_from_monday() as f64 / 7.0);
    row.push(bar.timestamp.hour() as f64 / 23.0);

    if feature_set == FeatureSet::Extended {
        let macd_hist = match (indicators.macd.value(index), indicators.macd_signal.value(index)) {
            (Some(m), Some(s)) => m - s,
            _ => 0.0,
        };
        row.push(macd_hist);

        let bands = (
            indicators.bb_upper.value(index),
            indicators.bb_middle.value(index),
            indicators.bb_lower.value(index),
        );
        let (width, position) = match bands {
            (Some(upper), Some(middle), Some(lower)) => {
                let spread = upper - lower;
                let width = if middle.abs() < RATIO_EPSILON { 0.0 } else { spread / middle };
                let position = if spread.abs() < RATIO_EPSILON {
                    0.5
                } else {
                    (bar.close - lower) / spread
                };
                (width, position)
            }
            _ => (0.0, 0.5),
        };
        row.push(width);
        row.push(position);

        row.push(indicators.stoch_k.value_or_zero(index));
        row.push(indicators.stoch_d.value_or_zero(index));
        row.push(ratio_minus_one(bar.close, indicators.sma_trend.value(index)));
        let atr_ratio = match (indicators.atr_short.value(index), indicators.atr_long.value(index)) {
            (Some(short), Some(long)) if long.abs() >= RATIO_EPSILON => short / long,
            _ => 0.0,
        };
        row.push(atr_ratio);
        row.push(indicators.adx.value_or_zero(index));
        row.push(ratio_minus_one(bar.close, indicators.ema_trend.value(index)));
    }

    row
}

/// Feature window `[num_features, time_steps]` covering bars
/// `anchor - time_steps + 1 ..= anchor`.
///
/// Returns `None` when the window would reach bar 0 (no previous bar).
pub fn feature_window(
    bars: &[Bar],
    indicators: &IndicatorSet,
    anchor: usize,
    time_steps: usize,
    feature_set: FeatureSet,
    normalization: WindowNormalization,
) -> Option<Array2<f64>> {
    if time_steps == 0 || anchor >= bars.len() || anchor < time_steps {
        return None;
    }
    let first = anchor + 1 - time_steps;

    let mut window = Array2::zeros((feature_set.num_features(), time_steps));
    for (t, index) in (first..=anchor).enumerate() {
        let row = bar_features(bars, indicators, index, feature_set);
        for (f, value) in row.into_iter().enumerate() {
            window[[f, t]] = value;
        }
    }

    if normalization == WindowNormalization::RelativeToFirst {
        for mut channel in window.rows_mut() {
            let x0 = channel[0];
            if x0.abs() < RATIO_EPSILON {
                channel.mapv_inplace(|x| x - x0);
            } else {
                channel.mapv_inplace(|x| x / x0 - 1.0);
            }
        }
    }

    Some(window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BarSeries;
    use crate::indicators::{assert_approx, make_bars, IndicatorConfig, DEFAULT_EPSILON};

    fn fixture() -> (BarSeries, IndicatorSet) {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + (i as f64 * 0.4).sin() * 5.0 + i as f64 * 0.1).collect();
        let series = BarSeries::new(make_bars(&closes)).unwrap();
        let config = IndicatorConfig {
            rsi_period: 5,
            atr_short_period: 5,
            atr_long_period: 10,
            adx_period: 5,
            trend_period: 20,
            macd_fast: 3,
            macd_slow: 8,
            macd_signal: 4,
            bollinger_period: 10,
            bollinger_multiplier: 2.0,
            stoch_k_period: 5,
            stoch_d_period: 3,
            regime_filter_period: 10,
        };
        let set = IndicatorSet::compute(&series, &config);
        (series, set)
    }

    #[test]
    fn window_shape_follows_feature_set() {
        let (series, set) = fixture();
        for fs in [FeatureSet::Basic, FeatureSet::Extended] {
            let w = feature_window(series.bars(), &set, 50, 7, fs, WindowNormalization::None).unwrap();
            assert_eq!(w.dim(), (fs.num_features(), 7));
            assert_eq!(fs.channel_names().len(), fs.num_features());
        }
    }

    #[test]
    fn raw_channels_match_bar_values() {
        let (series, set) = fixture();
        let bars = series.bars();
        let w = feature_window(bars, &set, 50, 4, FeatureSet::Extended, WindowNormalization::None).unwrap();
        // last column is the anchor bar
        assert_approx(w[[0, 3]], bars[50].close / bars[49].close - 1.0, DEFAULT_EPSILON);
        assert_approx(w[[5, 3]], set.rsi.value(50).unwrap(), DEFAULT_EPSILON);
        assert_approx(w[[16, 3]], set.adx.value(50).unwrap(), DEFAULT_EPSILON);
        // first column is anchor - 3
        assert_approx(w[[6, 0]], set.atr_short.value(47).unwrap(), DEFAULT_EPSILON);
    }

    #[test]
    fn undefined_indicators_are_zero_not_nan() {
        let (series, set) = fixture();
        let w = feature_window(series.bars(), &set, 3, 3, FeatureSet::Extended, WindowNormalization::None).unwrap();
        assert!(w.iter().all(|v| v.is_finite()));
        assert_eq!(w[[14, 0]], 0.0); // sma_trend undefined this early
    }

    #[test]
    fn relative_normalization_zeroes_first_column() {
        let (series, set) = fixture();
        let w = feature_window(series.bars(), &set, 60, 6, FeatureSet::Extended, WindowNormalization::RelativeToFirst).unwrap();
        for f in 0..18 {
            assert_approx(w[[f, 0]], 0.0, DEFAULT_EPSILON);
        }
        let raw = feature_window(series.bars(), &set, 60, 6, FeatureSet::Extended, WindowNormalization::None).unwrap();
        assert_approx(w[[5, 3]], raw[[5, 3]] / raw[[5, 0]] - 1.0, 1e-9);
    }

    #[test]
    fn window_must_not_touch_bar_zero() {
        let (series, set) = fixture();
        assert!(feature_window(series.bars(), &set, 4, 5, FeatureSet::Basic, WindowNormalization::None).is_none());
        assert!(feature_window(series.bars(), &set, 5, 5, FeatureSet::Basic, WindowNormalization::None).is_some());
    }

    #[test]
    fn pct_change_guards_zero_denominator() {
        assert_eq!(pct_change(5.0, 0.0), 0.0);
        assert_approx(pct_change(110.0, 100.0), 0.1, DEFAULT_EPSILON);
    }
}
