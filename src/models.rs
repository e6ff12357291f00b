use crate::errors::RateError;
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

/// A single observed rate. Construction validates, so every value of this
/// type carries a finite positive rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateSnapshot {
    rate: f64,
    timestamp: i64,
}

impl RateSnapshot {
    pub fn new(rate: f64, timestamp: i64) -> Result<Self, RateError> {
        if !is_valid_rate(rate) {
            return Err(RateError::invalid_rate());
        }
        Ok(Self { rate, timestamp })
    }

    /// Snapshot stamped with the current wall-clock time.
    pub fn now(rate: f64) -> Result<Self, RateError> {
        Self::new(rate, now_ms())
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Epoch milliseconds.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

pub type FetchResult = Result<RateSnapshot, RateError>;

pub fn is_valid_rate(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0
}

pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// Movement of the current rate relative to the saved one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChangeInfo {
    pub delta: f64,
    pub percent: f64,
    pub is_positive: bool,
}

impl ChangeInfo {
    pub fn between(current: &RateSnapshot, saved: &RateSnapshot) -> Self {
        let delta = current.rate - saved.rate;
        Self {
            delta,
            percent: delta / saved.rate * 100.0,
            is_positive: delta >= 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(rate: f64) -> RateSnapshot {
        RateSnapshot::new(rate, 1_700_000_000_000).unwrap()
    }

    #[test]
    fn rejects_non_finite_and_non_positive_rates() {
        for rate in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 0.0, -1.0] {
            assert_eq!(
                RateSnapshot::new(rate, 0),
                Err(RateError::invalid_rate()),
                "rate {rate} should be rejected"
            );
        }
    }

    #[test]
    fn change_when_price_went_up() {
        let change = ChangeInfo::between(&snap(65_000.0), &snap(64_000.0));
        assert_eq!(change.delta, 1_000.0);
        assert!((change.percent - 1.5625).abs() < 1e-9);
        assert!(change.is_positive);
    }

    #[test]
    fn change_when_price_went_down() {
        let change = ChangeInfo::between(&snap(64_000.0), &snap(65_000.0));
        assert_eq!(change.delta, -1_000.0);
        assert!((change.percent - -1.5385).abs() < 1e-4);
        assert!(!change.is_positive);
    }

    #[test]
    fn unchanged_rate_counts_as_positive() {
        let change = ChangeInfo::between(&snap(64_000.0), &snap(64_000.0));
        assert_eq!(change.delta, 0.0);
        assert!(change.is_positive);
    }
}
