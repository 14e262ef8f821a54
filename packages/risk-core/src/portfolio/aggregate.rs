//! Portfolio-level aggregation of per-asset figures.
//!
//! Combines asset return series and weights into portfolio volatility (with
//! correlation), mean return, annualized return and the historical value
//! series used for drawdown.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::Weights;
use crate::config::ReturnMode;
use crate::series::{CovarianceMatrix, ReturnSeries};
use crate::types::{Portfolio, PriceSeries};
use crate::{Error, Result};

/// Portfolio value on one date.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ValuePoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Portfolio volatility including cross-asset correlation.
///
/// `σ_p = sqrt(Σ_i Σ_j w_i · w_j · Cov(i, j))`, multiplied by
/// `sqrt(periods_per_year)` when annualizing.
pub fn portfolio_volatility(
    matrix: &CovarianceMatrix,
    weights: &Weights,
    periods_per_year: Option<usize>,
) -> Result<f64> {
    if matrix.is_empty() {
        return Err(Error::InvalidInput("covariance matrix is empty".to_string()));
    }
    let ordered = weights.ordered(matrix.symbols());
    // rounding can push a zero variance slightly negative
    let variance = matrix.quadratic_form(&ordered)?.max(0.0);
    let volatility = variance.sqrt();

    Ok(match periods_per_year {
        Some(periods) => volatility * (periods as f64).sqrt(),
        None => volatility,
    })
}

/// Weighted average of each asset's mean period return.
///
/// # Errors
///
/// `InvalidInput` if a weighted asset has no return series or an empty one.
pub fn mean_return(asset_returns: &BTreeMap<String, ReturnSeries>, weights: &Weights) -> Result<f64> {
    let mut total = 0.0;
    for (symbol, weight) in weights.iter() {
        let series = asset_returns.get(symbol).ok_or_else(|| {
            Error::InvalidInput(format!("no return series for {}", symbol))
        })?;
        total += weight * series.mean()?;
    }
    Ok(total)
}

/// Per-period portfolio returns: `r_p[t] = Σ_i w_i · r_i[t]`.
///
/// All weighted series must already share one window length.
pub fn portfolio_returns(
    asset_returns: &BTreeMap<String, ReturnSeries>,
    weights: &Weights,
) -> Result<ReturnSeries> {
    let mut combined: Option<Vec<f64>> = None;
    let mut mode = ReturnMode::Simple;

    for (symbol, weight) in weights.iter() {
        let series = asset_returns.get(symbol).ok_or_else(|| {
            Error::InvalidInput(format!("no return series for {}", symbol))
        })?;
        mode = series.mode;

        let acc = combined.get_or_insert_with(|| vec![0.0; series.len()]);
        if acc.len() != series.len() {
            return Err(Error::InvalidInput(format!(
                "{}: return series length {} differs from window {}",
                symbol,
                series.len(),
                acc.len()
            )));
        }
        for (total, r) in acc.iter_mut().zip(series.values()) {
            *total += weight * r;
        }
    }

    match combined {
        Some(values) if !values.is_empty() => Ok(ReturnSeries::new(mode, values)),
        _ => Err(Error::InvalidInput(
            "no portfolio returns in window".to_string(),
        )),
    }
}

/// Portfolio return over the window.
///
/// For log returns: `exp(Σ r_i · (periods_per_year / n)) - 1`.
/// For simple returns: the arithmetic mean of the period returns.
pub fn annualized_return(returns: &ReturnSeries, periods_per_year: usize) -> Result<f64> {
    match returns.mode {
        ReturnMode::Log => {
            if returns.is_empty() {
                return Err(Error::InvalidInput("return series is empty".to_string()));
            }
            let scale = periods_per_year as f64 / returns.len() as f64;
            let exponent: f64 = returns.values().iter().map(|r| r * scale).sum();
            Ok(exponent.exp() - 1.0)
        }
        ReturnMode::Simple => returns.mean(),
    }
}

/// Historical portfolio value for every date any held asset has a price.
///
/// Current quantities are applied to every historical date. An asset without
/// a price on a date contributes nothing to that date; the date itself is
/// kept. The engine passes series already cut to the common return window,
/// so only gaps inside that window are skipped.
///
/// # Errors
///
/// `InvalidInput` if none of the held assets has any price data.
pub fn portfolio_value_series(
    portfolio: &Portfolio,
    prices: &[PriceSeries],
) -> Result<Vec<ValuePoint>> {
    let held: Vec<(&str, f64, Option<&PriceSeries>)> = portfolio
        .held_assets()
        .map(|a| {
            let series = prices.iter().find(|p| p.symbol() == a.symbol);
            (a.symbol.as_str(), a.quantity, series)
        })
        .collect();

    let dates: BTreeSet<NaiveDate> = held
        .iter()
        .filter_map(|(_, _, series)| *series)
        .flat_map(|s| s.points().iter().map(|p| p.date))
        .collect();

    if dates.is_empty() {
        return Err(Error::InvalidInput(
            "no price data for any held asset".to_string(),
        ));
    }

    let mut skipped = 0usize;
    let values = dates
        .into_iter()
        .map(|date| {
            let mut value = 0.0;
            for (symbol, quantity, series) in &held {
                match series.and_then(|s| s.price_on(date)) {
                    Some(price) => value += quantity * price,
                    None => {
                        skipped += 1;
                        tracing::debug!(symbol = %symbol, %date, "no price, skipping for date");
                    }
                }
            }
            ValuePoint { date, value }
        })
        .collect();

    if skipped > 0 {
        tracing::warn!(
            skipped,
            "portfolio value series has missing asset prices"
        );
    }

    Ok(values)
}

/// Weighted return since purchase across held assets.
pub fn holding_period_return(portfolio: &Portfolio, weights: &Weights) -> Result<f64> {
    let mut total = 0.0;
    for asset in portfolio.held_assets() {
        let weight = weights.get(&asset.symbol).unwrap_or(0.0);
        let value_share = if weight > 0.0 {
            // split a combined symbol weight by each lot's share of its value
            let symbol_value: f64 = portfolio
                .held_assets()
                .filter(|a| a.symbol == asset.symbol)
                .map(|a| a.market_value())
                .sum();
            weight * asset.market_value() / symbol_value
        } else {
            0.0
        };
        total += value_share * asset.holding_return()?;
    }
    Ok(total)
}

/// Benchmark return from the first to the last price in the series.
pub fn market_return(benchmark: &PriceSeries) -> Result<f64> {
    match (benchmark.first(), benchmark.last()) {
        (Some(first), Some(last)) if benchmark.len() >= 2 => {
            Ok((last.close - first.close) / first.close)
        }
        _ => Err(Error::InvalidInput(format!(
            "{}: need at least 2 prices for market return",
            benchmark.symbol()
        ))),
    }
}
