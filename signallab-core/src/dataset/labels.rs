//! Label policies: how a forward window becomes a training target, and how a
//! predictor output for that target becomes a trade direction.

use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Side};
use crate::indicators::IndicatorSeries;

/// ATR below this makes an anchor unlabelable.
pub const MIN_LABEL_ATR: f64 = 1e-6;

/// Outcome classes of the triple-barrier policy, in one-hot column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarrierClass {
    Up,
    Down,
    Sideways,
}

impl BarrierClass {
    pub const ALL: [BarrierClass; 3] = [BarrierClass::Up, BarrierClass::Down, BarrierClass::Sideways];

    pub fn index(self) -> usize {
        match self {
            BarrierClass::Up => 0,
            BarrierClass::Down => 1,
            BarrierClass::Sideways => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn one_hot(self) -> Array1<f64> {
        let mut label = Array1::zeros(3);
        label[self.index()] = 1.0;
        label
    }

    /// Trade direction this class calls for.
    pub fn side(self) -> Option<Side> {
        match self {
            BarrierClass::Up => Some(Side::Long),
            BarrierClass::Down => Some(Side::Short),
            BarrierClass::Sideways => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LabelPolicy {
    /// `[gain, loss]` of the forward window, in units of the anchor's ATR.
    VolatilityRegression,
    /// One-hot over UP/DOWN/SIDEWAYS by the first ATR-scaled barrier touched.
    TripleBarrier { up_atr: f64, down_atr: f64 },
}

impl Default for LabelPolicy {
    fn default() -> Self {
        LabelPolicy::TripleBarrier {
            up_atr: 1.5,
            down_atr: 1.5,
        }
    }
}

impl LabelPolicy {
    pub fn num_outputs(&self) -> usize {
        match self {
            LabelPolicy::VolatilityRegression => 2,
            LabelPolicy::TripleBarrier { .. } => 3,
        }
    }

    pub fn is_classification(&self) -> bool {
        matches!(self, LabelPolicy::TripleBarrier { .. })
    }

    /// Label for `anchor` from bars `anchor + 1 ..= anchor + horizon`.
    ///
    /// `None` when the horizon runs past the series or the anchor ATR is
    /// undefined or below [`MIN_LABEL_ATR`].
    pub fn label(
        &self,
        bars: &[Bar],
        atr: &IndicatorSeries,
        anchor: usize,
        horizon: usize,
    ) -> Option<Array1<f64>> {
        let end = anchor.checked_add(horizon)?;
        if horizon == 0 || end >= bars.len() {
            return None;
        }
        let current_atr = atr.value(anchor)?;
        if current_atr < MIN_LABEL_ATR {
            return None;
        }
        let close = bars[anchor].close;
        let future = &bars[anchor + 1..=end];

        match *self {
            LabelPolicy::VolatilityRegression => {
                let max_high = future.iter().map(|b| b.high).fold(close, f64::max);
                let min_low = future.iter().map(|b| b.low).fold(close, f64::min);
                Some(Array1::from(vec![
                    (max_high - close) / current_atr,
                    (close - min_low) / current_atr,
                ]))
            }
            LabelPolicy::TripleBarrier { up_atr, down_atr } => {
                let class = triple_barrier_class(
                    future,
                    close + up_atr * current_atr,
                    close - down_atr * current_atr,
                );
                Some(class.one_hot())
            }
        }
    }

    /// Trade direction for one prediction row, or `None` for no trade.
    pub fn signal(&self, prediction: ArrayView1<f64>, threshold: f64) -> Option<Side> {
        match self {
            LabelPolicy::VolatilityRegression => {
                let (up, down) = (*prediction.get(0)?, *prediction.get(1)?);
                if up > down && up > threshold {
                    Some(Side::Long)
                } else if down > up && down > threshold {
                    Some(Side::Short)
                } else {
                    None
                }
            }
            LabelPolicy::TripleBarrier { .. } => {
                let (class, prob) = argmax(prediction)?;
                if prob < threshold {
                    return None;
                }
                BarrierClass::from_index(class)?.side()
            }
        }
    }
}

/// First barrier touched, scanning bar by bar. Within one bar the down
/// barrier is checked first.
pub fn triple_barrier_class(future: &[Bar], up_target: f64, down_target: f64) -> BarrierClass {
    for bar in future {
        if bar.low <= down_target {
            return BarrierClass::Down;
        }
        if bar.high >= up_target {
            return BarrierClass::Up;
        }
    }
    BarrierClass::Sideways
}

/// Index and value of the largest entry; the first one wins ties.
pub fn argmax(values: ArrayView1<f64>) -> Option<(usize, f64)> {
    values
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_ohlc_bars, DEFAULT_EPSILON};
    use ndarray::array;

    fn flat_atr(n: usize, value: f64) -> IndicatorSeries {
        IndicatorSeries::from_values("atr", 0, vec![value; n])
    }

    #[test]
    fn regression_label_in_atr_units() {
        let bars = make_ohlc_bars(&[
            (100.0, 100.5, 99.5, 100.0),
            (100.0, 104.0, 99.0, 103.0),
            (103.0, 103.5, 97.0, 98.0),
            (98.0, 99.0, 96.0, 97.0),
        ]);
        let label = LabelPolicy::VolatilityRegression
            .label(&bars, &flat_atr(4, 2.0), 0, 2)
            .unwrap();
        assert_approx(label[0], 2.0, DEFAULT_EPSILON);
        assert_approx(label[1], 1.5, DEFAULT_EPSILON);
    }

    #[test]
    fn up_barrier_hit_first() {
        let bars = make_ohlc_bars(&[
            (100.0, 100.5, 99.5, 100.0),
            (100.0, 101.0, 99.0, 100.5),
            (100.5, 102.0, 100.0, 101.5),
            (101.5, 101.6, 97.0, 97.5),
        ]);
        let policy = LabelPolicy::TripleBarrier { up_atr: 1.5, down_atr: 1.5 };
        let label = policy.label(&bars, &flat_atr(4, 1.0), 0, 3).unwrap();
        assert_eq!(label, BarrierClass::Up.one_hot());
    }

    #[test]
    fn both_barriers_in_one_bar_resolve_down() {
        let bars = make_ohlc_bars(&[(100.0, 100.5, 99.5, 100.0), (100.0, 105.0, 95.0, 100.0)]);
        let policy = LabelPolicy::TripleBarrier { up_atr: 1.5, down_atr: 1.5 };
        let label = policy.label(&bars, &flat_atr(2, 1.0), 0, 1).unwrap();
        assert_eq!(label, BarrierClass::Down.one_hot());
    }

    #[test]
    fn no_breach_is_sideways() {
        let bars = make_ohlc_bars(&[(100.0, 100.5, 99.5, 100.0), (100.0, 100.4, 99.6, 100.1)]);
        let policy = LabelPolicy::default();
        let label = policy.label(&bars, &flat_atr(2, 1.0), 0, 1).unwrap();
        assert_eq!(label, BarrierClass::Sideways.one_hot());
    }

    #[test]
    fn unlabelable_anchors() {
        let bars = make_ohlc_bars(&[(1.0, 1.0, 1.0, 1.0); 4]);
        let policy = LabelPolicy::VolatilityRegression;
        assert!(policy.label(&bars, &flat_atr(4, 1.0), 2, 2).is_none());
        assert!(policy.label(&bars, &flat_atr(4, 0.0), 0, 2).is_none());
        let warmup = IndicatorSeries::from_values("atr", 3, vec![f64::NAN; 4]);
        assert!(policy.label(&bars, &warmup, 0, 2).is_none());
    }

    #[test]
    fn regression_signal() {
        let policy = LabelPolicy::VolatilityRegression;
        assert_eq!(policy.signal(array![1.2, 0.4].view(), 1.0), Some(Side::Long));
        assert_eq!(policy.signal(array![0.4, 1.2].view(), 1.0), Some(Side::Short));
        assert_eq!(policy.signal(array![0.9, 0.4].view(), 1.0), None);
        assert_eq!(policy.signal(array![1.5, 1.5].view(), 1.0), None);
    }

    #[test]
    fn classification_signal() {
        let policy = LabelPolicy::default();
        assert_eq!(policy.signal(array![0.7, 0.2, 0.1].view(), 0.6), Some(Side::Long));
        assert_eq!(policy.signal(array![0.1, 0.8, 0.1].view(), 0.6), Some(Side::Short));
        assert_eq!(policy.signal(array![0.1, 0.1, 0.8].view(), 0.6), None);
        assert_eq!(policy.signal(array![0.5, 0.3, 0.2].view(), 0.6), None);
        assert_eq!(policy.signal(array![0.6, 0.3, 0.1].view(), 0.6), Some(Side::Long));
    }

    #[test]
    fn argmax_prefers_first_on_tie() {
        assert_eq!(argmax(array![0.4, 0.4, 0.2].view()), Some((0, 0.4)));
        assert_eq!(argmax(Array1::<f64>::zeros(0).view()), None);
    }
}
