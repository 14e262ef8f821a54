//! Risk Core - Portfolio risk metric engine.
//!
//! This crate turns per-asset historical price series into portfolio-level
//! risk statistics:
//!
//! - **Return series**: simple and logarithmic returns from closing prices
//! - **Weights and covariance**: market-value weights, population covariance matrix
//! - **Aggregation**: correlated portfolio volatility, mean return, value series
//! - **Risk metrics**: Sharpe ratio, beta, alpha, parametric VaR, max drawdown
//! - **Risk scoring**: composite 1-5 score with per-metric explanations
//!
//! The engine performs no I/O. Prices, quantities and the benchmark series are
//! resolved by the caller and passed in together with an [`EngineConfig`].
//!
//! # Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use risk_core::{Asset, EngineConfig, Portfolio, PricePoint, PriceSeries, RiskEngine};
//!
//! let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
//! let points = vec![
//!     PricePoint::new(day(2), 100.0),
//!     PricePoint::new(day(3), 102.0),
//!     PricePoint::new(day(4), 101.0),
//!     PricePoint::new(day(5), 105.0),
//! ];
//!
//! let asset = Asset::new("ACME", "Acme Corp", 10.0, day(2), 100.0, 105.0);
//! let portfolio = Portfolio::new(vec![asset]);
//! let series = PriceSeries::new("ACME", points.clone()).unwrap();
//! let benchmark = PriceSeries::new("SPY", points).unwrap();
//!
//! let engine = RiskEngine::new(EngineConfig::default()).unwrap();
//! let report = engine.compute(&portfolio, &[series], &benchmark).unwrap();
//! assert!((report.metric.beta - 1.0).abs() < 1e-9);
//! assert!((1..=5).contains(&report.evaluation.score));
//! ```

pub mod config;
pub mod portfolio;
pub mod series;
pub mod types;

// Re-export commonly used types
pub use config::{z_score, EngineConfig, ReturnMode, TRADING_DAYS_PER_YEAR};
pub use types::{ApiResponse, Asset, Portfolio, PricePoint, PriceSeries, RiskMetric};

// Re-export main functionality
pub use portfolio::{
    alpha, beta, evaluate, max_drawdown, portfolio_beta, sharpe_ratio, value_at_risk, weights,
    RiskEngine, RiskEvaluation, RiskReport, Weights,
};
pub use series::{
    covariance, covariance_matrix, reconstruct_prices, returns, returns_from_closes,
    CovarianceMatrix, ReturnSeries,
};

/// Error types for risk-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Portfolio has no assets with positive market value")]
    EmptyPortfolio,

    #[error("Undefined statistic: {0}")]
    UndefinedStatistic(String),

    #[error("Unsupported confidence level: {0}")]
    UnsupportedConfidenceLevel(f64),
}

/// Result type for risk-core operations.
pub type Result<T> = std::result::Result<T, Error>;
