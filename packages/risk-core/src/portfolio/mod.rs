//! Portfolio risk module.
//!
//! Provides weighting, aggregation, risk metrics, scoring, and the pipeline
//! that ties them together.

pub mod aggregate;
mod engine;
pub mod risk;
mod score;
mod weights;

pub use aggregate::{
    annualized_return, holding_period_return, market_return, mean_return, portfolio_returns,
    portfolio_value_series, portfolio_volatility, ValuePoint,
};
pub use engine::{RiskEngine, RiskReport};
pub use risk::{alpha, beta, max_drawdown, portfolio_beta, sharpe_ratio, value_at_risk};
pub use score::{
    evaluate, risk_message, score_from_composite, NormalizedMetrics, RiskEvaluation,
};
pub use weights::{weights, Weights};
