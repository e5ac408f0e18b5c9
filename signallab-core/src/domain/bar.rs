//! Bar and BarSeries: the immutable price history everything else reads.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV bar for a single instrument at a single timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(
        timestamp: NaiveDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// True when every OHLCV field is a finite number.
    pub fn is_finite(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite()
    }
}

/// Structured errors for bar series construction.
#[derive(Debug, Error, PartialEq)]
pub enum BarError {
    #[error("bar series is empty")]
    Empty,

    #[error("timestamps decrease at index {index}: {previous} > {current}")]
    NonMonotonic {
        index: usize,
        previous: NaiveDateTime,
        current: NaiveDateTime,
    },

    #[error("bar {index} has a non-finite OHLCV field")]
    NonFinite { index: usize },
}

/// Ordered, immutable OHLCV history.
///
/// Timestamps are non-decreasing. Sorting and deduplication belong to the
/// ingestion side; this type only verifies the ordering it is handed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(bars: Vec<Bar>) -> Result<Self, BarError> {
        if bars.is_empty() {
            return Err(BarError::Empty);
        }
        for (index, bar) in bars.iter().enumerate() {
            if !bar.is_finite() {
                return Err(BarError::NonFinite { index });
            }
            if index > 0 && bars[index - 1].timestamp > bar.timestamp {
                return Err(BarError::NonMonotonic {
                    index,
                    previous: bars[index - 1].timestamp,
                    current: bar.timestamp,
                });
            }
        }
        Ok(Self { bars })
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Close price at `index`, if the index exists.
    pub fn close(&self, index: usize) -> Option<f64> {
        self.bars.get(index).map(|b| b.close)
    }

    /// Content hash of the series (BLAKE3 over the little-endian fields).
    ///
    /// Used as the data fingerprint stored next to cached tensors.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for bar in &self.bars {
            hasher.update(&bar.timestamp.and_utc().timestamp().to_le_bytes());
            hasher.update(&bar.open.to_le_bytes());
            hasher.update(&bar.high.to_le_bytes());
            hasher.update(&bar.low.to_le_bytes());
            hasher.update(&bar.close.to_le_bytes());
            hasher.update(&bar.volume.to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(10, minute, 0)
            .unwrap()
    }

    fn sample_bar(minute: u32) -> Bar {
        Bar::new(ts(minute), 100.0, 105.0, 98.0, 103.0, 50_000.0)
    }

    #[test]
    fn series_accepts_equal_timestamps() {
        let series = BarSeries::new(vec![sample_bar(0), sample_bar(0), sample_bar(5)]).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.close(2), Some(103.0));
        assert_eq!(series.close(3), None);
    }

    #[test]
    fn series_rejects_decreasing_timestamps() {
        let err = BarSeries::new(vec![sample_bar(5), sample_bar(0)]).unwrap_err();
        assert!(matches!(err, BarError::NonMonotonic { index: 1, .. }));
    }

    #[test]
    fn series_rejects_empty_and_nan() {
        assert_eq!(BarSeries::new(vec![]).unwrap_err(), BarError::Empty);
        let mut bar = sample_bar(0);
        bar.close = f64::NAN;
        assert_eq!(
            BarSeries::new(vec![bar]).unwrap_err(),
            BarError::NonFinite { index: 0 }
        );
    }

    #[test]
    fn content_hash_tracks_prices() {
        let a = BarSeries::new(vec![sample_bar(0), sample_bar(5)]).unwrap();
        let mut changed = a.bars().to_vec();
        changed[1].close = 104.0;
        let b = BarSeries::new(changed).unwrap();
        assert_eq!(a.content_hash(), a.clone().content_hash());
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn bar_serialization_roundtrip() {
        let bar = sample_bar(0);
        let json = serde_json::to_string(&bar).unwrap();
        let deser: Bar = serde_json::from_str(&json).unwrap();
        assert_eq!(bar, deser);
    }
}
