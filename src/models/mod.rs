// Market data shapes cached alongside plain prices and volumes

use serde::{Deserialize, Serialize};

use crate::validation::{validate_positive, ValidationError};

/// Market overview for a coin as returned by the price source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub price: f64,
    pub market_cap: f64,
    pub volume_24h: f64,
    pub change_24h_pct: f64,
}

impl MarketSnapshot {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_positive(self.price)?;
        // Non-finite floats serialize as null and would not survive a reload
        let fields = [
            ("market cap", self.market_cap),
            ("volume", self.volume_24h),
            ("24h change", self.change_24h_pct),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ValidationError::InvalidValue(format!("{} is {}", name, value)));
        }
        if self.market_cap < 0.0 || self.volume_24h < 0.0 {
            return Err(ValidationError::InvalidValue(
                "market cap and volume must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// One open/high/low/close bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp_millis: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for price in [self.open, self.high, self.low, self.close] {
            validate_positive(price)?;
        }
        if self.low > self.high {
            return Err(ValidationError::InvalidValue(format!(
                "candle low {} above high {}",
                self.low, self.high
            )));
        }
        Ok(())
    }
}

/// An OHLC series is cacheable when it has at least one bar and every bar is sane
pub fn validate_candles(candles: &[Candle]) -> Result<(), ValidationError> {
    if candles.is_empty() {
        return Err(ValidationError::InvalidValue("empty OHLC series".to_string()));
    }
    candles.iter().try_for_each(Candle::validate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(low: f64, high: f64) -> Candle {
        Candle {
            timestamp_millis: 0,
            open: low,
            high,
            low,
            close: high,
        }
    }

    #[test]
    fn test_candle_series_validation() {
        assert!(validate_candles(&[candle(1.0, 2.0)]).is_ok());
        assert!(validate_candles(&[]).is_err());
        assert!(validate_candles(&[candle(1.0, 2.0), candle(3.0, 2.0)]).is_err());
        assert!(validate_candles(&[candle(-1.0, 2.0)]).is_err());
    }

    #[test]
    fn test_snapshot_requires_positive_price() {
        let mut snapshot = MarketSnapshot {
            price: 65_000.0,
            market_cap: 1.2e12,
            volume_24h: 3.0e10,
            change_24h_pct: -1.5,
        };
        assert!(snapshot.validate().is_ok());

        snapshot.price = 0.0;
        assert!(snapshot.validate().is_err());
    }

    #[test]
    fn test_snapshot_rejects_non_finite_fields() {
        let valid = MarketSnapshot {
            price: 10.0,
            market_cap: 1.0e9,
            volume_24h: 5.0e6,
            change_24h_pct: 0.5,
        };
        let broken = [
            MarketSnapshot { market_cap: f64::NAN, ..valid.clone() },
            MarketSnapshot { volume_24h: f64::INFINITY, ..valid.clone() },
            MarketSnapshot { change_24h_pct: f64::NEG_INFINITY, ..valid.clone() },
        ];
        for snapshot in broken {
            assert!(matches!(
                snapshot.validate(),
                Err(ValidationError::InvalidValue(_))
            ));
        }
        assert!(valid.validate().is_ok());
    }
}
