use ndarray::{Array1, Array2};
use tracing::{debug, warn};

use super::features::feature_window;
use super::{DatasetError, ExampleConfig};
use crate::domain::BarSeries;
use crate::indicators::IndicatorSet;

/// One training example: a `[num_features, time_steps]` window ending at
/// `anchor` and the label of the bars after it.
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    pub features: Array2<f64>,
    pub label: Array1<f64>,
    pub anchor: usize,
}

pub struct ExampleBuilder<'a> {
    series: &'a BarSeries,
    indicators: &'a IndicatorSet,
    config: &'a ExampleConfig,
}

impl<'a> ExampleBuilder<'a> {
    pub fn new(series: &'a BarSeries, indicators: &'a IndicatorSet, config: &'a ExampleConfig) -> Self {
        if indicators.warmup() > config.max_indicator_period {
            warn!(
                indicator_warmup = indicators.warmup(),
                max_indicator_period = config.max_indicator_period,
                "indicator warm-up exceeds reserved period; early windows carry zero-filled channels"
            );
        }
        Self {
            series,
            indicators,
            config,
        }
    }

    /// Anchors `i` with `i >= warmup` and `i + max_future_ticks < len - 1`.
    pub fn anchor_range(&self) -> std::ops::Range<usize> {
        let start = self.config.warmup();
        let end = self
            .series
            .len()
            .saturating_sub(self.config.max_future_ticks + 1);
        start..end.max(start)
    }

    pub fn is_valid_anchor(&self, anchor: usize) -> bool {
        self.anchor_range().contains(&anchor)
    }

    /// Example for one anchor, or `None` when the anchor is out of range or
    /// its label is undefined.
    pub fn build(&self, anchor: usize) -> Option<Example> {
        if !self.is_valid_anchor(anchor) {
            return None;
        }
        let bars = self.series.bars();
        let label = self.config.label_policy.label(
            bars,
            &self.indicators.atr_short,
            anchor,
            self.config.max_future_ticks,
        )?;
        let features = feature_window(
            bars,
            self.indicators,
            anchor,
            self.config.time_steps,
            self.config.feature_set,
            self.config.window_normalization,
        )?;
        Some(Example {
            features,
            label,
            anchor,
        })
    }

    /// Every example in anchor order. Fails only when none could be built.
    pub fn build_all(&self) -> Result<Vec<Example>, DatasetError> {
        let range = self.anchor_range();
        let candidates = range.len();
        let examples: Vec<Example> = range.filter_map(|anchor| self.build(anchor)).collect();

        debug!(
            candidates,
            built = examples.len(),
            skipped = candidates - examples.len(),
            "built examples"
        );

        if examples.is_empty() {
            return Err(DatasetError::NoExamples {
                bars: self.series.len(),
                warmup: self.config.warmup(),
                horizon: self.config.max_future_ticks,
            });
        }
        Ok(examples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{FeatureSet, LabelPolicy, WindowNormalization};
    use crate::indicators::{make_bars, IndicatorConfig};

    fn small_indicators() -> IndicatorConfig {
        IndicatorConfig {
            rsi_period: 3,
            atr_short_period: 3,
            atr_long_period: 5,
            adx_period: 3,
            trend_period: 5,
            macd_fast: 2,
            macd_slow: 4,
            macd_signal: 2,
            bollinger_period: 4,
            bollinger_multiplier: 2.0,
            stoch_k_period: 3,
            stoch_d_period: 2,
            regime_filter_period: 3,
        }
    }

    fn small_examples() -> ExampleConfig {
        ExampleConfig {
            time_steps: 4,
            max_future_ticks: 3,
            max_indicator_period: 6,
            feature_set: FeatureSet::Basic,
            window_normalization: WindowNormalization::None,
            label_policy: LabelPolicy::VolatilityRegression,
        }
    }

    fn series(n: usize) -> BarSeries {
        let closes: Vec<f64> = (0..n).map(|i| 50.0 + (i as f64 * 0.9).cos() * 2.0).collect();
        BarSeries::new(make_bars(&closes)).unwrap()
    }

    #[test]
    fn anchor_range_bounds() {
        let s = series(30);
        let ind = IndicatorSet::compute(&s, &small_indicators());
        let cfg = small_examples();
        let builder = ExampleBuilder::new(&s, &ind, &cfg);
        // warmup = 10, last anchor must satisfy i + 3 < 29
        assert_eq!(builder.anchor_range(), 10..26);
        assert!(!builder.is_valid_anchor(9));
        assert!(builder.is_valid_anchor(25));
        assert!(!builder.is_valid_anchor(26));
    }

    #[test]
    fn build_all_yields_fixed_shapes_in_anchor_order() {
        let s = series(40);
        let ind = IndicatorSet::compute(&s, &small_indicators());
        let cfg = small_examples();
        let examples = ExampleBuilder::new(&s, &ind, &cfg).build_all().unwrap();
        assert_eq!(examples.len(), 26);
        for (k, ex) in examples.iter().enumerate() {
            assert_eq!(ex.anchor, 10 + k);
            assert_eq!(ex.features.dim(), (9, 4));
            assert_eq!(ex.label.len(), 2);
        }
    }

    #[test]
    fn too_short_series_is_an_error() {
        let s = series(12);
        let ind = IndicatorSet::compute(&s, &small_indicators());
        let cfg = small_examples();
        let err = ExampleBuilder::new(&s, &ind, &cfg).build_all().unwrap_err();
        assert!(matches!(err, DatasetError::NoExamples { bars: 12, .. }));
    }
}
