use std::fmt;

use super::Indicator;
use crate::domain::Bar;

/// A computed indicator aligned 1:1 with bar indices.
#[derive(Clone)]
pub struct IndicatorSeries {
    name: String,
    lookback: usize,
    values: Vec<f64>,
}

impl IndicatorSeries {
    pub fn compute(indicator: &dyn Indicator, bars: &[Bar]) -> Self {
        Self::from_values(indicator.name(), indicator.lookback(), indicator.compute(bars))
    }

    pub fn from_values(name: impl Into<String>, lookback: usize, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            lookback,
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `index`, or `None` during warm-up, for non-finite values or
    /// out of range.
    pub fn value(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().filter(|v| v.is_finite())
    }

    /// Value at `index` with undefined positions mapped to 0.0.
    pub fn value_or_zero(&self, index: usize) -> f64 {
        self.value(index).unwrap_or(0.0)
    }

    pub fn raw(&self) -> &[f64] {
        &self.values
    }
}

impl fmt::Debug for IndicatorSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndicatorSeries")
            .field("name", &self.name)
            .field("lookback", &self.lookback)
            .field("len", &self.values.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_hides_warmup_and_out_of_range() {
        let series = IndicatorSeries::from_values("x", 1, vec![f64::NAN, 2.0, f64::INFINITY]);
        assert_eq!(series.value(0), None);
        assert_eq!(series.value(1), Some(2.0));
        assert_eq!(series.value(2), None);
        assert_eq!(series.value(3), None);
        assert_eq!(series.value_or_zero(0), 0.0);
    }
}
