//! Core data types for the risk engine.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A holding in the portfolio.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Asset {
    /// Ticker symbol (uppercase), the stable key used throughout the engine
    #[serde(deserialize_with = "uppercase")]
    pub symbol: String,
    /// Display name
    pub name: String,
    /// Quantity held
    pub quantity: f64,
    /// Date the position was opened
    pub purchase_date: NaiveDate,
    /// Price paid per unit
    pub purchase_price: f64,
    /// Latest known price per unit
    pub current_price: f64,
}

impl Asset {
    /// Create a new asset. The symbol is normalized to uppercase.
    pub fn new(
        symbol: &str,
        name: &str,
        quantity: f64,
        purchase_date: NaiveDate,
        purchase_price: f64,
        current_price: f64,
    ) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            name: name.to_string(),
            quantity,
            purchase_date,
            purchase_price,
            current_price,
        }
    }

    /// Market value at the current price.
    pub fn market_value(&self) -> f64 {
        self.quantity * self.current_price
    }

    /// Return since purchase as a decimal (0.05 = 5%).
    pub fn holding_return(&self) -> Result<f64> {
        if self.purchase_price <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "{}: purchase price must be positive, got {}",
                self.symbol, self.purchase_price
            )));
        }
        Ok((self.current_price - self.purchase_price) / self.purchase_price)
    }

    /// Check the price invariants: both prices strictly positive, quantity non-negative.
    pub fn validate(&self) -> Result<()> {
        if self.symbol.is_empty() {
            return Err(Error::InvalidInput("asset symbol is empty".to_string()));
        }
        if !(self.quantity >= 0.0) {
            return Err(Error::InvalidInput(format!(
                "{}: quantity must be non-negative, got {}",
                self.symbol, self.quantity
            )));
        }
        if !(self.purchase_price > 0.0) || !(self.current_price > 0.0) {
            return Err(Error::InvalidInput(format!(
                "{}: prices must be positive (purchase {}, current {})",
                self.symbol, self.purchase_price, self.current_price
            )));
        }
        Ok(())
    }
}

fn uppercase<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    String::deserialize(deserializer).map(|s| s.to_uppercase())
}

/// A set of assets sharing one owner.
///
/// The total value is derived on every call and never cached, so a price
/// refresh on any asset is reflected immediately.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Portfolio {
    /// Held assets
    pub assets: Vec<Asset>,
}

impl Portfolio {
    /// Create a portfolio from a list of assets.
    pub fn new(assets: Vec<Asset>) -> Self {
        Self { assets }
    }

    /// Total market value across all assets.
    pub fn total_value(&self) -> f64 {
        self.assets.iter().map(Asset::market_value).sum()
    }

    /// Assets with a positive quantity.
    pub fn held_assets(&self) -> impl Iterator<Item = &Asset> {
        self.assets.iter().filter(|a| a.quantity > 0.0)
    }

    /// Find an asset by symbol (case insensitive).
    pub fn find(&self, symbol: &str) -> Option<&Asset> {
        let symbol_upper = symbol.to_uppercase();
        self.assets.iter().find(|a| a.symbol == symbol_upper)
    }

    /// Update the current price of an asset.
    pub fn set_price(&mut self, symbol: &str, price: f64) -> Result<()> {
        let symbol_upper = symbol.to_uppercase();
        match self.assets.iter_mut().find(|a| a.symbol == symbol_upper) {
            Some(asset) => {
                asset.current_price = price;
                Ok(())
            }
            None => Err(Error::InvalidInput(format!(
                "asset not in portfolio: {}",
                symbol_upper
            ))),
        }
    }

    /// Earliest purchase date across all assets.
    pub fn earliest_purchase_date(&self) -> Option<NaiveDate> {
        self.assets.iter().map(|a| a.purchase_date).min()
    }
}

/// A single daily close.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Closing prices for one symbol, held oldest-first.
///
/// Construction sorts the points chronologically, so callers may supply
/// either ordering. Duplicate dates and non-positive prices are rejected.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PriceSeries {
    symbol: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a validated, chronologically ordered series.
    pub fn new(symbol: &str, mut points: Vec<PricePoint>) -> Result<Self> {
        let symbol = symbol.to_uppercase();
        points.sort_by_key(|p| p.date);

        for pair in points.windows(2) {
            if pair[0].date == pair[1].date {
                return Err(Error::InvalidInput(format!(
                    "{}: duplicate price for {}",
                    symbol, pair[0].date
                )));
            }
        }
        if let Some(bad) = points.iter().find(|p| !(p.close > 0.0)) {
            return Err(Error::InvalidInput(format!(
                "{}: non-positive price {} on {}",
                symbol, bad.close, bad.date
            )));
        }

        Ok(Self { symbol, points })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    /// Closing prices, oldest first.
    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Price on an exact date, if the series has one.
    pub fn price_on(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|idx| self.points[idx].close)
    }

    /// The newest `n` points.
    pub fn tail(&self, n: usize) -> Self {
        let start = self.points.len().saturating_sub(n);
        Self {
            symbol: self.symbol.clone(),
            points: self.points[start..].to_vec(),
        }
    }

    /// Points with `start <= date <= end`.
    pub fn window(&self, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            symbol: self.symbol.clone(),
            points: self
                .points
                .iter()
                .filter(|p| p.date >= start && p.date <= end)
                .copied()
                .collect(),
        }
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }
}

#[derive(Deserialize)]
struct RawPriceSeries {
    symbol: String,
    points: Vec<PricePoint>,
}

impl<'de> Deserialize<'de> for PriceSeries {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawPriceSeries::deserialize(deserializer)?;
        PriceSeries::new(&raw.symbol, raw.points).map_err(serde::de::Error::custom)
    }
}

/// Risk snapshot for one portfolio at one point in time.
///
/// Each recomputation produces a fresh value; earlier snapshots are replaced,
/// never merged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskMetric {
    /// Portfolio volatility with correlation (annualized when configured)
    pub volatility: f64,
    /// Per-period Sharpe ratio
    pub sharpe_ratio: f64,
    /// Weight-blended beta against the benchmark
    pub beta: f64,
    /// Annualized CAPM alpha (decimal)
    pub alpha: f64,
    /// Maximum drawdown of the portfolio value series (decimal)
    pub max_drawdown: f64,
    /// Parametric Value at Risk as an annualized return (decimal)
    pub value_at_risk: f64,
    /// Confidence level used for VaR
    pub confidence_level: f64,
    /// When the snapshot was computed
    pub calculated_at: DateTime<Utc>,
}

/// API response wrapper for success cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response.
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }
}
