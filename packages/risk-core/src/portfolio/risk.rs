//! Portfolio risk metrics calculation.
//!
//! Provides Sharpe ratio, beta, alpha, parametric VaR and max drawdown. Every
//! function here works on a single time basis; the caller decides whether
//! inputs are per period or annualized and must not mix the two.

use std::collections::BTreeMap;

use super::Weights;
use crate::config::z_score;
use crate::series::{covariance, is_negligible_variance, ReturnSeries};
use crate::{Error, Result};

/// Calculate the Sharpe ratio from period returns.
///
/// # Arguments
///
/// * `returns` - Portfolio period returns
/// * `risk_free_rate` - Annual risk-free rate in percent (2.0 = 2%)
/// * `annual_volatility` - Annualized portfolio volatility
/// * `periods_per_year` - Annualization constant (typically 252)
///
/// # Returns
///
/// `(mean - rf_period) / (annual_volatility / sqrt(periods_per_year))`, a
/// per-period ratio.
pub fn sharpe_ratio(
    returns: &[f64],
    risk_free_rate: f64,
    annual_volatility: f64,
    periods_per_year: usize,
) -> Result<f64> {
    if returns.is_empty() {
        return Err(Error::InvalidInput(
            "returns list cannot be empty".to_string(),
        ));
    }

    let periods = periods_per_year as f64;
    let period_rf = risk_free_rate / (periods * 100.0);
    let period_volatility = annual_volatility / periods.sqrt();

    // volatility that is only rounding noise would blow the ratio up
    if !(period_volatility > 0.0) || is_negligible_variance(period_volatility.powi(2), returns) {
        return Err(Error::UndefinedStatistic(
            "Sharpe ratio needs non-zero volatility".to_string(),
        ));
    }

    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    Ok((mean - period_rf) / period_volatility)
}

/// Calculate beta of one return series against the market.
///
/// `Cov(asset, market) / Var(market)`, both population statistics.
///
/// # Errors
///
/// - `InvalidInput` if the series are empty or differ in length
/// - `UndefinedStatistic` if the market has zero variance over the window,
///   rounding noise included
pub fn beta(asset_returns: &[f64], market_returns: &[f64]) -> Result<f64> {
    if asset_returns.len() != market_returns.len() {
        return Err(Error::InvalidInput(format!(
            "asset and market returns differ in length ({} vs {})",
            asset_returns.len(),
            market_returns.len()
        )));
    }

    let cov = covariance(asset_returns, market_returns)?;
    let market_variance = covariance(market_returns, market_returns)?;

    if is_negligible_variance(market_variance, market_returns) {
        return Err(Error::UndefinedStatistic(
            "market variance is zero, beta is undefined".to_string(),
        ));
    }

    Ok(cov / market_variance)
}

/// Weight-blended beta: each asset's beta against the market, summed by weight.
pub fn portfolio_beta(
    asset_returns: &BTreeMap<String, ReturnSeries>,
    market_returns: &ReturnSeries,
    weights: &Weights,
) -> Result<f64> {
    let mut total = 0.0;
    for (symbol, weight) in weights.iter() {
        let series = asset_returns.get(symbol).ok_or_else(|| {
            Error::InvalidInput(format!("no return series for {}", symbol))
        })?;
        let asset_beta = beta(series.values(), market_returns.values())?;
        tracing::debug!(symbol = %symbol, beta = asset_beta, "asset beta");
        total += weight * asset_beta;
    }
    Ok(total)
}

/// CAPM alpha: `portfolio - (rf + beta * (market - rf))`.
///
/// All three returns must be on the same basis (all per period or all
/// annualized) and expressed as decimals.
pub fn alpha(portfolio_return: f64, market_return: f64, risk_free_rate: f64, beta: f64) -> f64 {
    portfolio_return - (risk_free_rate + beta * (market_return - risk_free_rate))
}

/// Calculate parametric Value at Risk.
///
/// `annual_mean_return - z * annual_volatility` for the z-score of the
/// confidence level. A negative result is a loss.
///
/// # Errors
///
/// `UnsupportedConfidenceLevel` unless the level is 0.90, 0.95 or 0.99.
pub fn value_at_risk(
    annual_mean_return: f64,
    annual_volatility: f64,
    confidence_level: f64,
) -> Result<f64> {
    let z = z_score(confidence_level)?;
    Ok(annual_mean_return - z * annual_volatility)
}

/// Calculate maximum drawdown from a series of portfolio values.
///
/// Single pass tracking the running peak. Returns the largest
/// `(peak - value) / peak` as a decimal (0.15 = 15%).
pub fn max_drawdown(values: &[f64]) -> Result<f64> {
    let Some(&first) = values.first() else {
        return Err(Error::InvalidInput(
            "portfolio values cannot be empty".to_string(),
        ));
    };

    let mut peak = first;
    let mut max_drawdown = 0.0_f64;

    for &value in values {
        if value > peak {
            peak = value;
        }
        if !(peak > 0.0) {
            return Err(Error::InvalidInput(format!(
                "portfolio value must be positive, peak is {}",
                peak
            )));
        }
        let drawdown = (peak - value) / peak;
        max_drawdown = max_drawdown.max(drawdown);
    }

    Ok(max_drawdown)
}
