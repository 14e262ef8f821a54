//! Market-value weights.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::Portfolio;
use crate::{Error, Result};

/// Fractional weight of each held asset, keyed by symbol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Weights {
    by_symbol: BTreeMap<String, f64>,
}

impl Weights {
    /// Weight of one symbol.
    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.by_symbol.get(symbol).copied()
    }

    /// Held symbols in sorted order.
    pub fn symbols(&self) -> impl Iterator<Item = &String> {
        self.by_symbol.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, f64)> {
        self.by_symbol.iter().map(|(s, w)| (s, *w))
    }

    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }

    /// Sum of all weights (1.0 up to rounding).
    pub fn total(&self) -> f64 {
        self.by_symbol.values().sum()
    }

    /// Weights in the given symbol order; unknown symbols get 0.
    pub fn ordered(&self, symbols: &[String]) -> Vec<f64> {
        symbols
            .iter()
            .map(|s| self.get(s).unwrap_or(0.0))
            .collect()
    }
}

/// Calculate the weight of each asset with positive quantity.
///
/// Weight = market value / total portfolio market value. Assets sharing a
/// symbol are combined. The total is recomputed from current prices on every
/// call.
///
/// # Errors
///
/// - `InvalidInput` if a held asset has a non-positive price
/// - `EmptyPortfolio` if nothing is held or the total value is zero
pub fn weights(portfolio: &Portfolio) -> Result<Weights> {
    let mut values: BTreeMap<String, f64> = BTreeMap::new();
    for asset in portfolio.held_assets() {
        asset.validate()?;
        *values.entry(asset.symbol.clone()).or_insert(0.0) += asset.market_value();
    }

    let total: f64 = values.values().sum();
    if values.is_empty() || total <= 0.0 {
        return Err(Error::EmptyPortfolio);
    }

    let by_symbol = values
        .into_iter()
        .map(|(symbol, value)| (symbol, value / total))
        .collect();

    Ok(Weights { by_symbol })
}
