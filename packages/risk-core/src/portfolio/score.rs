//! Composite risk scoring.
//!
//! Each metric is normalized to `[0, 1]` (1 = most risky) against a fixed
//! reference scale, blended with fixed weights, and mapped to an integer
//! score from 1 (very high risk) to 5 (very low risk).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::RiskMetric;

const VOLATILITY_CEILING: f64 = 0.5;
const DRAWDOWN_CEILING: f64 = 0.5;
const VAR_CEILING: f64 = 0.5;
const ALPHA_FLOOR: f64 = -0.05;

/// Metric normalized to `[0, 1]`, 1 being the riskiest end of the scale.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NormalizedMetrics {
    pub volatility: f64,
    /// Sharpe mapped from `[-1, 1]` to `[0, 1]`; higher is better
    pub sharpe: f64,
    pub beta_deviation: f64,
    pub alpha_deviation: f64,
    pub max_drawdown: f64,
    pub value_at_risk: f64,
}

impl NormalizedMetrics {
    /// Normalize a risk snapshot against the reference scales.
    pub fn from_metric(metric: &RiskMetric) -> Self {
        Self {
            volatility: unit(metric.volatility / VOLATILITY_CEILING),
            sharpe: unit((metric.sharpe_ratio + 1.0) / 2.0),
            beta_deviation: unit((metric.beta - 1.0).abs()),
            alpha_deviation: unit(metric.alpha / ALPHA_FLOOR),
            max_drawdown: unit(metric.max_drawdown / DRAWDOWN_CEILING),
            value_at_risk: unit(metric.value_at_risk.abs() / VAR_CEILING),
        }
    }

    /// Weighted composite in `[0, 1]`.
    pub fn composite(&self) -> f64 {
        0.25 * self.volatility
            + 0.20 * (1.0 - self.sharpe)
            + 0.20 * self.beta_deviation
            + 0.15 * self.alpha_deviation
            + 0.10 * self.max_drawdown
            + 0.10 * self.value_at_risk
    }
}

/// Result of scoring a risk snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskEvaluation {
    /// 1 (very high risk) to 5 (very low risk)
    pub score: u8,
    /// Weighted composite risk in `[0, 1]`
    pub composite_risk: f64,
    pub normalized: NormalizedMetrics,
    /// Metric name -> qualitative explanation
    pub explanations: BTreeMap<String, String>,
}

/// Score a risk snapshot and explain each metric.
pub fn evaluate(metric: &RiskMetric) -> RiskEvaluation {
    let normalized = NormalizedMetrics::from_metric(metric);
    let composite_risk = normalized.composite();
    let score = score_from_composite(composite_risk);

    let mut explanations = BTreeMap::new();
    explanations.insert(
        "Overall Risk Score".to_string(),
        format!("{} - {}", score, risk_message(score)),
    );
    explanations.insert(
        "Volatility".to_string(),
        if metric.volatility > 0.3 {
            "Your portfolio is highly volatile, meaning significant price fluctuations."
        } else {
            "Your portfolio has low volatility, indicating stable price movements."
        }
        .to_string(),
    );
    explanations.insert(
        "Sharpe Ratio".to_string(),
        if metric.sharpe_ratio > 0.0 {
            "Your portfolio efficiently balances return and risk."
        } else {
            "Your portfolio has low risk-adjusted returns. Consider safer assets."
        }
        .to_string(),
    );
    explanations.insert(
        "Beta".to_string(),
        if metric.beta > 1.0 {
            "Your portfolio amplifies market movements, rising and falling more than the benchmark."
        } else {
            "Your portfolio is defensive and moves less than the market."
        }
        .to_string(),
    );
    explanations.insert(
        "Alpha".to_string(),
        if metric.alpha > 0.0 {
            "Your portfolio is outperforming the market, indicating strong returns."
        } else {
            "Your portfolio is underperforming the market, suggesting suboptimal asset selection."
        }
        .to_string(),
    );
    explanations.insert(
        "Max Drawdown".to_string(),
        if metric.max_drawdown > 0.3 {
            "Your portfolio has experienced large losses in the past, which indicates higher downside risk."
        } else {
            "Your portfolio has low historical losses, making it relatively stable."
        }
        .to_string(),
    );
    explanations.insert(
        "Value at Risk (VaR)".to_string(),
        if metric.value_at_risk < -0.3 {
            "Your portfolio is exposed to significant potential losses under adverse conditions."
        } else {
            "Your portfolio has low expected losses, indicating strong risk control."
        }
        .to_string(),
    );

    RiskEvaluation {
        score,
        composite_risk,
        normalized,
        explanations,
    }
}

/// `clamp(ceil((1 - composite) * 5), 1, 5)`
pub fn score_from_composite(composite_risk: f64) -> u8 {
    let raw = ((1.0 - composite_risk) * 5.0).ceil();
    if raw.is_nan() {
        return 1;
    }
    raw.clamp(1.0, 5.0) as u8
}

/// Fixed message for each score.
pub fn risk_message(score: u8) -> &'static str {
    match score {
        1 => "Very High Risk: Your portfolio is highly volatile. Consider safer assets.",
        2 => "High Risk: Be cautious, your portfolio carries above-average risk.",
        3 => "Moderate Risk: Balanced portfolio, but review allocations.",
        4 => "Low Risk: Stable portfolio with controlled risk.",
        5 => "Very Low Risk: Highly stable, consider growth opportunities.",
        _ => "Unknown Risk Level.",
    }
}

/// Clamp to `[0, 1]`; NaN counts as the riskiest value.
fn unit(x: f64) -> f64 {
    if x.is_nan() {
        1.0
    } else {
        x.clamp(0.0, 1.0)
    }
}
