//! The risk metric pipeline.
//!
//! price series -> return series -> weights/covariance -> aggregated
//! portfolio statistics -> derived risk metrics -> composite score.
//!
//! All internal math is per period. Only the reported [`RiskMetric`] is
//! annualized: volatility (when configured), VaR, and alpha.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::aggregate::{self, ValuePoint};
use super::risk;
use super::score::{evaluate, RiskEvaluation};
use super::weights::{weights, Weights};
use crate::config::EngineConfig;
use crate::series::{covariance_matrix, returns, CovarianceMatrix, ReturnSeries};
use crate::types::{Portfolio, PriceSeries, RiskMetric};
use crate::{Error, Result};

/// Everything produced by one recomputation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskReport {
    /// The risk snapshot
    pub metric: RiskMetric,
    /// Score and explanations for the snapshot
    pub evaluation: RiskEvaluation,
    /// Market-value weights used for blending
    pub weights: Weights,
    /// Asset covariance matrix over the common window
    pub covariance: CovarianceMatrix,
    /// Portfolio return over the window (see `aggregate::annualized_return`)
    pub portfolio_return: f64,
    /// Weighted return since purchase
    pub holding_period_return: f64,
    /// Benchmark first-to-last return over its window
    pub market_return: f64,
    /// Portfolio value over the common window, used for drawdown
    pub value_series: Vec<ValuePoint>,
    /// Number of return periods in the common window
    pub window: usize,
}

/// Synchronous, stateless risk engine.
///
/// Holds only its configuration, so one engine can serve any number of
/// portfolios, including from several threads at once.
#[derive(Debug, Clone)]
pub struct RiskEngine {
    config: EngineConfig,
}

impl RiskEngine {
    /// Create an engine after validating the configuration.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compute the risk report for a portfolio.
    ///
    /// # Arguments
    ///
    /// * `portfolio` - Holdings with current quantities and prices
    /// * `prices` - One price series per held symbol
    /// * `benchmark` - Market index series over the same window
    ///
    /// # Errors
    ///
    /// Any engine error aborts the whole computation; no metric is replaced
    /// with a placeholder value.
    pub fn compute(
        &self,
        portfolio: &Portfolio,
        prices: &[PriceSeries],
        benchmark: &PriceSeries,
    ) -> Result<RiskReport> {
        let cfg = &self.config;
        let periods = cfg.trading_days_per_year;

        let weights = weights(portfolio)?;
        let prices: Vec<PriceSeries> = prices.iter().map(|p| self.apply_lookback(p)).collect();
        let benchmark = self.apply_lookback(benchmark);

        let mut asset_returns = BTreeMap::new();
        let mut held_prices = Vec::with_capacity(weights.len());
        for symbol in weights.symbols() {
            let series = prices
                .iter()
                .find(|p| p.symbol() == symbol.as_str())
                .ok_or_else(|| Error::InvalidInput(format!("no price series for {}", symbol)))?;
            asset_returns.insert(symbol.clone(), returns(series, cfg.return_mode)?);
            held_prices.push(series);
        }
        let market_returns = returns(&benchmark, cfg.return_mode)?;

        let (asset_returns, market_returns) = align_with_market(asset_returns, market_returns);
        let window = market_returns.len();
        tracing::debug!(assets = asset_returns.len(), window, "aligned return series");

        let covariance = covariance_matrix(&asset_returns)?;
        let period_volatility = aggregate::portfolio_volatility(&covariance, &weights, None)?;
        let annual_volatility = period_volatility * cfg.annualization_factor();

        let portfolio_returns = aggregate::portfolio_returns(&asset_returns, &weights)?;
        let mean_return = aggregate::mean_return(&asset_returns, &weights)?;

        let sharpe_ratio = risk::sharpe_ratio(
            portfolio_returns.values(),
            cfg.risk_free_rate,
            annual_volatility,
            periods,
        )?;

        let beta = risk::portfolio_beta(&asset_returns, &market_returns, &weights)?;
        let period_alpha = risk::alpha(
            mean_return,
            market_returns.mean()?,
            cfg.period_risk_free_rate(),
            beta,
        );

        let value_at_risk = risk::value_at_risk(
            mean_return * periods as f64,
            annual_volatility,
            cfg.confidence_level,
        )?;

        let (start, end) = window_dates(&held_prices, &benchmark, window)?;
        let window_prices: Vec<PriceSeries> =
            held_prices.iter().map(|p| p.window(start, end)).collect();
        let value_series = aggregate::portfolio_value_series(portfolio, &window_prices)?;
        let values: Vec<f64> = value_series.iter().map(|p| p.value).collect();
        let max_drawdown = risk::max_drawdown(&values)?;

        let metric = RiskMetric {
            volatility: if cfg.annualize_volatility {
                annual_volatility
            } else {
                period_volatility
            },
            sharpe_ratio,
            beta,
            alpha: period_alpha * periods as f64,
            max_drawdown,
            value_at_risk,
            confidence_level: cfg.confidence_level,
            calculated_at: Utc::now(),
        };
        let evaluation = evaluate(&metric);

        tracing::info!(
            assets = weights.len(),
            window,
            volatility = metric.volatility,
            beta = metric.beta,
            score = evaluation.score,
            "computed portfolio risk"
        );

        Ok(RiskReport {
            portfolio_return: aggregate::annualized_return(&portfolio_returns, periods)?,
            holding_period_return: aggregate::holding_period_return(portfolio, &weights)?,
            market_return: aggregate::market_return(&benchmark)?,
            metric,
            evaluation,
            weights,
            covariance,
            value_series,
            window,
        })
    }

    fn apply_lookback(&self, series: &PriceSeries) -> PriceSeries {
        match self.config.lookback_days {
            Some(n) => series.tail(n),
            None => series.clone(),
        }
    }
}

/// First and last date of the common return window.
///
/// Each series contributes the dates of its newest `window + 1` prices; the
/// window is where all of them overlap, so no series ends early inside it.
fn window_dates(
    held: &[&PriceSeries],
    benchmark: &PriceSeries,
    window: usize,
) -> Result<(NaiveDate, NaiveDate)> {
    let mut start: Option<NaiveDate> = None;
    let mut end: Option<NaiveDate> = None;

    for series in held.iter().copied().chain(std::iter::once(benchmark)) {
        let points = series.points();
        let first = points.get(points.len().saturating_sub(window + 1));
        let (Some(first), Some(last)) = (first, points.last()) else {
            continue;
        };
        start = Some(start.map_or(first.date, |d| d.max(first.date)));
        end = Some(end.map_or(last.date, |d| d.min(last.date)));
    }

    match (start, end) {
        (Some(start), Some(end)) if start <= end => Ok((start, end)),
        _ => Err(Error::InvalidInput(
            "price series share no common date window".to_string(),
        )),
    }
}

/// Truncate asset and market returns to one common window of newest periods.
fn align_with_market(
    asset_returns: BTreeMap<String, ReturnSeries>,
    market_returns: ReturnSeries,
) -> (BTreeMap<String, ReturnSeries>, ReturnSeries) {
    let common = asset_returns
        .values()
        .map(ReturnSeries::len)
        .chain(std::iter::once(market_returns.len()))
        .min()
        .unwrap_or(0);

    let trim = |name: &str, series: ReturnSeries| {
        if series.len() > common {
            tracing::warn!(
                symbol = name,
                from = series.len(),
                to = common,
                "truncating return series to common window"
            );
            series.tail(common)
        } else {
            series
        }
    };

    let market = trim("benchmark", market_returns);
    let assets = asset_returns
        .into_iter()
        .map(|(symbol, series)| {
            let series = trim(symbol.as_str(), series);
            (symbol, series)
        })
        .collect();

    (assets, market)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReturnMode;
    use crate::types::{Asset, PricePoint};
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn series(symbol: &str, closes: &[f64]) -> PriceSeries {
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PricePoint::new(day(i as u32 + 1), c))
            .collect();
        PriceSeries::new(symbol, points).unwrap()
    }

    fn holding(symbol: &str, quantity: f64, price: f64) -> Asset {
        Asset::new(symbol, symbol, quantity, day(1), price, price)
    }

    #[test]
    fn test_engine_rejects_invalid_config() {
        let config = EngineConfig {
            confidence_level: 0.5,
            ..Default::default()
        };
        assert!(matches!(
            RiskEngine::new(config),
            Err(Error::UnsupportedConfidenceLevel(_))
        ));
    }

    #[test]
    fn test_portfolio_tracking_benchmark() {
        let closes = [100.0, 103.0, 99.0, 104.0, 108.0, 102.0];
        let portfolio = Portfolio::new(vec![holding("IDX", 5.0, 102.0)]);
        let engine = RiskEngine::new(EngineConfig::default()).unwrap();

        let report = engine
            .compute(&portfolio, &[series("IDX", &closes)], &series("SPY", &closes))
            .unwrap();

        assert_abs_diff_eq!(report.metric.beta, 1.0, epsilon = 1e-12);
        // tracking the market exactly with rf = 0 leaves no alpha
        assert_abs_diff_eq!(report.metric.alpha, 0.0, epsilon = 1e-12);
        assert_eq!(report.window, 5);
        assert_abs_diff_eq!(report.metric.max_drawdown, 6.0 / 108.0, epsilon = 1e-12);
        assert!((1..=5).contains(&report.evaluation.score));
    }

    #[test]
    fn test_missing_price_series_is_error() {
        let portfolio = Portfolio::new(vec![holding("A", 1.0, 10.0), holding("B", 1.0, 10.0)]);
        let engine = RiskEngine::new(EngineConfig::default()).unwrap();

        let result = engine.compute(
            &portfolio,
            &[series("A", &[10.0, 11.0, 10.5])],
            &series("SPY", &[1.0, 1.1, 1.05]),
        );
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_flat_market_has_undefined_beta() {
        let portfolio = Portfolio::new(vec![holding("A", 1.0, 10.0)]);
        let engine = RiskEngine::new(EngineConfig::default()).unwrap();

        let result = engine.compute(
            &portfolio,
            &[series("A", &[10.0, 11.0, 10.5])],
            &series("SPY", &[100.0, 100.0, 100.0]),
        );
        assert!(matches!(result, Err(Error::UndefinedStatistic(_))));
    }

    #[test]
    fn test_flat_portfolio_has_undefined_sharpe() {
        let portfolio = Portfolio::new(vec![holding("CASH", 100.0, 1.0)]);
        let engine = RiskEngine::new(EngineConfig::default()).unwrap();

        let result = engine.compute(
            &portfolio,
            &[series("CASH", &[1.0, 1.0, 1.0, 1.0])],
            &series("SPY", &[100.0, 101.0, 99.0, 100.0]),
        );
        assert!(matches!(result, Err(Error::UndefinedStatistic(_))));
    }

    #[test]
    fn test_empty_portfolio() {
        let engine = RiskEngine::new(EngineConfig::default()).unwrap();
        let result = engine.compute(
            &Portfolio::default(),
            &[],
            &series("SPY", &[100.0, 101.0, 99.0]),
        );
        assert!(matches!(result, Err(Error::EmptyPortfolio)));
    }

    #[test]
    fn test_shorter_benchmark_truncates_assets() {
        let portfolio = Portfolio::new(vec![holding("A", 1.0, 10.0)]);
        let engine = RiskEngine::new(EngineConfig::default()).unwrap();

        let asset = series("A", &[10.0, 10.5, 10.2, 10.8, 11.0, 10.9]);
        let benchmark = PriceSeries::new(
            "SPY",
            vec![
                PricePoint::new(day(4), 400.0),
                PricePoint::new(day(5), 404.0),
                PricePoint::new(day(6), 401.0),
            ],
        )
        .unwrap();

        let report = engine.compute(&portfolio, &[asset], &benchmark).unwrap();
        assert_eq!(report.window, 2);
        assert_eq!(report.value_series.len(), 3);
        assert_eq!(report.value_series[0].date, day(4));
    }

    #[test]
    fn test_drawdown_ignores_crash_before_window() {
        let portfolio = Portfolio::new(vec![holding("A", 1.0, 52.0)]);
        let engine = RiskEngine::new(EngineConfig::default()).unwrap();

        let asset = series("A", &[100.0, 50.0, 50.5, 51.0, 51.5, 52.0]);
        let benchmark = PriceSeries::new(
            "SPY",
            vec![
                PricePoint::new(day(4), 400.0),
                PricePoint::new(day(5), 404.0),
                PricePoint::new(day(6), 401.0),
            ],
        )
        .unwrap();

        let report = engine.compute(&portfolio, &[asset], &benchmark).unwrap();
        assert_eq!(report.window, 2);
        assert_eq!(report.metric.max_drawdown, 0.0);
    }

    #[test]
    fn test_series_ending_early_is_not_a_drawdown() {
        let portfolio = Portfolio::new(vec![holding("A", 1.0, 101.0), holding("B", 1.0, 100.0)]);
        let engine = RiskEngine::new(EngineConfig::default()).unwrap();

        let a = series("A", &[100.0, 100.5, 100.2, 100.8, 101.0]);
        // B's feed stops a day before A's
        let b = series("B", &[100.0, 100.0, 100.5, 100.3]);
        let market = series("SPY", &[400.0, 402.0, 401.0, 404.0, 405.0]);

        let report = engine.compute(&portfolio, &[a, b], &market).unwrap();
        assert_eq!(report.window, 3);
        assert_eq!(report.value_series.last().unwrap().date, day(4));
        assert!(report.value_series.iter().all(|p| p.value > 190.0));
        assert!(report.metric.max_drawdown < 0.01);
    }

    #[test]
    fn test_lookback_limits_window() {
        let config = EngineConfig {
            lookback_days: Some(4),
            return_mode: ReturnMode::Log,
            ..Default::default()
        };
        let engine = RiskEngine::new(config).unwrap();
        let closes = [50.0, 10.0, 100.0, 101.0, 99.0, 102.0];
        let portfolio = Portfolio::new(vec![holding("A", 1.0, 102.0)]);

        let report = engine
            .compute(&portfolio, &[series("A", &closes)], &series("SPY", &closes))
            .unwrap();

        assert_eq!(report.window, 3);
        assert_eq!(report.value_series.len(), 4);
        // the crash from 50 to 10 is outside the lookback
        assert_abs_diff_eq!(report.metric.max_drawdown, 2.0 / 101.0, epsilon = 1e-12);
    }

    #[test]
    fn test_volatility_reporting_basis() {
        let closes = [100.0, 102.0, 101.0, 105.0];
        let portfolio = Portfolio::new(vec![holding("A", 10.0, 105.0)]);
        let market = series("SPY", &[400.0, 404.0, 402.0, 410.0]);

        let annual = RiskEngine::new(EngineConfig::default())
            .unwrap()
            .compute(&portfolio, &[series("A", &closes)], &market)
            .unwrap();
        let daily = RiskEngine::new(EngineConfig {
            annualize_volatility: false,
            ..Default::default()
        })
        .unwrap()
        .compute(&portfolio, &[series("A", &closes)], &market)
        .unwrap();

        assert_abs_diff_eq!(
            annual.metric.volatility,
            daily.metric.volatility * 252f64.sqrt(),
            epsilon = 1e-12
        );
        // Sharpe and VaR do not depend on the reporting basis
        assert_abs_diff_eq!(annual.metric.sharpe_ratio, daily.metric.sharpe_ratio, epsilon = 1e-12);
        assert_abs_diff_eq!(annual.metric.value_at_risk, daily.metric.value_at_risk, epsilon = 1e-12);
    }
}
