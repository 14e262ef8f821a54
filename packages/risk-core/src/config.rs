//! Engine configuration.
//!
//! Settings are passed explicitly into [`crate::RiskEngine`]; nothing here is
//! process-wide. A TOML file can supply them:
//!
//! ```toml
//! trading_days_per_year = 252
//! confidence_level = 0.95
//! risk_free_rate = 4.25
//! return_mode = "log"
//! annualize_volatility = true
//! lookback_days = 252
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Conventional number of trading days per year.
pub const TRADING_DAYS_PER_YEAR: usize = 252;

/// Confidence levels with a known one-tailed z-score.
const Z_SCORES: [(f64, f64); 3] = [(0.90, 1.28), (0.95, 1.645), (0.99, 2.33)];

/// How per-period returns are derived from prices.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReturnMode {
    /// `(p[i] - p[i-1]) / p[i-1]`
    #[default]
    Simple,
    /// `ln(p[i] / p[i-1])`
    Log,
}

impl std::str::FromStr for ReturnMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "log" => Ok(Self::Log),
            other => Err(Error::InvalidInput(format!(
                "unknown return mode: {} (expected simple or log)",
                other
            ))),
        }
    }
}

/// Risk engine settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Annualization constant
    pub trading_days_per_year: usize,
    /// VaR confidence level (0.90, 0.95 or 0.99)
    pub confidence_level: f64,
    /// Annual risk-free rate in percent (2.0 = 2%)
    pub risk_free_rate: f64,
    /// Return derivation for every series in one computation
    pub return_mode: ReturnMode,
    /// Scale reported volatility by `sqrt(trading_days_per_year)`
    pub annualize_volatility: bool,
    /// Keep only the newest N price points of each series
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookback_days: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            trading_days_per_year: TRADING_DAYS_PER_YEAR,
            confidence_level: 0.95,
            risk_free_rate: 0.0,
            return_mode: ReturnMode::Simple,
            annualize_volatility: true,
            lookback_days: None,
        }
    }
}

impl EngineConfig {
    /// Get the default config file path.
    ///
    /// Default path: `~/.config/risk-core/config.toml`
    /// Can be overridden with `RISK_ENGINE_CONFIG` environment variable.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var("RISK_ENGINE_CONFIG") {
            return PathBuf::from(path);
        }

        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".config/risk-core/config.toml"))
            .unwrap_or_else(|| PathBuf::from("risk-core.toml"))
    }

    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded engine config");
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise use defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Reject settings the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.trading_days_per_year == 0 {
            return Err(Error::InvalidInput(
                "trading_days_per_year must be positive".to_string(),
            ));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(Error::InvalidInput(format!(
                "risk_free_rate must be finite, got {}",
                self.risk_free_rate
            )));
        }
        if self.lookback_days.is_some_and(|n| n < 2) {
            return Err(Error::InvalidInput(
                "lookback_days must cover at least 2 prices".to_string(),
            ));
        }
        z_score(self.confidence_level)?;
        Ok(())
    }

    /// Risk-free rate per period as a decimal.
    pub fn period_risk_free_rate(&self) -> f64 {
        self.risk_free_rate / (self.trading_days_per_year as f64 * 100.0)
    }

    /// `sqrt(trading_days_per_year)`
    pub fn annualization_factor(&self) -> f64 {
        (self.trading_days_per_year as f64).sqrt()
    }
}

/// One-tailed z-score for a supported confidence level.
pub fn z_score(confidence_level: f64) -> Result<f64> {
    Z_SCORES
        .iter()
        .find(|(level, _)| (level - confidence_level).abs() < 1e-9)
        .map(|&(_, z)| z)
        .ok_or(Error::UnsupportedConfidenceLevel(confidence_level))
}
