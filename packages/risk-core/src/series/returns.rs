//! Per-period return series from closing prices.

use serde::{Deserialize, Serialize};

use crate::config::ReturnMode;
use crate::types::PriceSeries;
use crate::{Error, Result};

/// Per-period returns derived from a price series, oldest first.
///
/// Length is always one less than the price series it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReturnSeries {
    /// How the returns were derived
    pub mode: ReturnMode,
    /// Return for each period
    pub values: Vec<f64>,
}

impl ReturnSeries {
    /// Wrap already computed returns.
    pub fn new(mode: ReturnMode, values: Vec<f64>) -> Self {
        Self { mode, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Arithmetic mean of the period returns.
    pub fn mean(&self) -> Result<f64> {
        if self.values.is_empty() {
            return Err(Error::InvalidInput("return series is empty".to_string()));
        }
        Ok(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }

    /// Keep only the newest `n` returns.
    pub fn tail(&self, n: usize) -> Self {
        let start = self.values.len().saturating_sub(n);
        Self {
            mode: self.mode,
            values: self.values[start..].to_vec(),
        }
    }
}

/// Calculate returns for a price series.
///
/// The benchmark series goes through the same routine as any asset.
///
/// # Errors
///
/// `InvalidInput` when the series has fewer than 2 prices.
pub fn returns(prices: &PriceSeries, mode: ReturnMode) -> Result<ReturnSeries> {
    returns_from_closes(&prices.closes(), mode).map_err(|e| match e {
        Error::InvalidInput(msg) => Error::InvalidInput(format!("{}: {}", prices.symbol(), msg)),
        other => other,
    })
}

/// Calculate returns from raw closes, oldest first.
///
/// # Errors
///
/// `InvalidInput` when fewer than 2 prices are given or any price is not
/// strictly positive.
///
/// # Example
///
/// ```rust
/// use risk_core::{returns_from_closes, ReturnMode};
///
/// let simple = returns_from_closes(&[100.0, 110.0], ReturnMode::Simple).unwrap();
/// assert!((simple.values[0] - 0.10).abs() < 1e-12);
///
/// let log = returns_from_closes(&[100.0, 110.0], ReturnMode::Log).unwrap();
/// assert!((log.values[0] - 1.1_f64.ln()).abs() < 1e-12);
/// ```
pub fn returns_from_closes(closes: &[f64], mode: ReturnMode) -> Result<ReturnSeries> {
    if closes.len() < 2 {
        return Err(Error::InvalidInput(format!(
            "need at least 2 prices to compute returns, got {}",
            closes.len()
        )));
    }
    if let Some(bad) = closes.iter().find(|&&p| !(p > 0.0)) {
        return Err(Error::InvalidInput(format!(
            "prices must be positive, got {}",
            bad
        )));
    }

    let values = closes
        .windows(2)
        .map(|w| match mode {
            ReturnMode::Simple => (w[1] - w[0]) / w[0],
            ReturnMode::Log => (w[1] / w[0]).ln(),
        })
        .collect();

    Ok(ReturnSeries { mode, values })
}

/// Rebuild prices from a starting price and a return series.
///
/// Inverse of [`returns_from_closes`]: the result has one more element than
/// the return series and starts with `first_price`.
pub fn reconstruct_prices(first_price: f64, series: &ReturnSeries) -> Vec<f64> {
    let mut prices = Vec::with_capacity(series.len() + 1);
    prices.push(first_price);

    match series.mode {
        ReturnMode::Log => {
            let mut cumulative = 0.0;
            for r in &series.values {
                cumulative += r;
                prices.push(first_price * cumulative.exp());
            }
        }
        ReturnMode::Simple => {
            let mut price = first_price;
            for r in &series.values {
                price *= 1.0 + r;
                prices.push(price);
            }
        }
    }

    prices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PricePoint;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    #[test]
    fn test_simple_returns() {
        let series = returns_from_closes(&[100.0, 102.0, 101.0, 105.0], ReturnMode::Simple).unwrap();

        assert_eq!(series.len(), 3);
        assert_relative_eq!(series.values[0], 0.02, epsilon = 1e-12);
        assert_relative_eq!(series.values[1], -1.0 / 102.0, epsilon = 1e-12);
        assert_relative_eq!(series.values[2], 4.0 / 101.0, epsilon = 1e-12);
    }

    #[test]
    fn test_log_returns() {
        let series = returns_from_closes(&[100.0, 102.0, 101.0], ReturnMode::Log).unwrap();

        assert_relative_eq!(series.values[0], (1.02_f64).ln(), epsilon = 1e-12);
        assert_relative_eq!(series.values[1], (101.0_f64 / 102.0).ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_returns_insufficient_data() {
        let result = returns_from_closes(&[100.0], ReturnMode::Simple);
        assert!(matches!(result, Err(Error::InvalidInput(_))));

        let result = returns_from_closes(&[], ReturnMode::Log);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_returns_non_positive_price() {
        let result = returns_from_closes(&[100.0, 0.0, 101.0], ReturnMode::Simple);
        assert!(matches!(result, Err(Error::InvalidInput(_))));

        let result = returns_from_closes(&[100.0, -5.0], ReturnMode::Log);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_returns_from_price_series() {
        let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        let prices = PriceSeries::new(
            "spy",
            vec![PricePoint::new(day(3), 110.0), PricePoint::new(day(2), 100.0)],
        )
        .unwrap();

        let series = returns(&prices, ReturnMode::Simple).unwrap();
        assert_relative_eq!(series.values[0], 0.10, epsilon = 1e-12);

        let short = PriceSeries::new("spy", vec![PricePoint::new(day(2), 100.0)]).unwrap();
        let err = returns(&short, ReturnMode::Simple).unwrap_err();
        assert!(err.to_string().contains("SPY"));
    }

    #[test]
    fn test_mean_and_tail() {
        let series = ReturnSeries::new(ReturnMode::Simple, vec![0.01, 0.02, 0.03, 0.06]);
        assert_relative_eq!(series.mean().unwrap(), 0.03, epsilon = 1e-12);
        assert_eq!(series.tail(2).values, vec![0.03, 0.06]);
        assert!(ReturnSeries::new(ReturnMode::Log, vec![]).mean().is_err());
    }

    #[test]
    fn test_reconstruct_prices_log_round_trip() {
        let prices = vec![100.0, 102.0, 101.0, 105.0, 98.5];
        let series = returns_from_closes(&prices, ReturnMode::Log).unwrap();
        let rebuilt = reconstruct_prices(prices[0], &series);

        assert_eq!(rebuilt.len(), prices.len());
        for (a, b) in prices.iter().zip(&rebuilt) {
            assert_relative_eq!(*a, *b, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_reconstruct_prices_simple_round_trip() {
        let prices = vec![50.0, 55.0, 44.0];
        let series = returns_from_closes(&prices, ReturnMode::Simple).unwrap();
        let rebuilt = reconstruct_prices(prices[0], &series);

        for (a, b) in prices.iter().zip(&rebuilt) {
            assert_relative_eq!(*a, *b, max_relative = 1e-12);
        }
    }
}
