//! riskctl - Command line interface for the risk engine.
//!
//! Reads scenarios as JSON and prints `ApiResponse` JSON on stdout. Logs go
//! to stderr so the output stays machine readable.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use risk_core::{
    evaluate, returns, ApiResponse, EngineConfig, Portfolio, PricePoint, PriceSeries, ReturnMode,
    RiskEngine, RiskMetric,
};

#[derive(Parser)]
#[command(name = "riskctl")]
#[command(about = "Portfolio risk metrics and scoring")]
#[command(version)]
struct Cli {
    /// Config file (defaults to RISK_ENGINE_CONFIG or ~/.config/risk-core/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the full risk report for a scenario
    Compute {
        /// Scenario JSON with portfolio, prices and benchmark
        #[arg(short, long)]
        input: PathBuf,
        /// Confidence level for VaR (0.90, 0.95 or 0.99)
        #[arg(long)]
        confidence: Option<f64>,
        /// Annual risk-free rate in percent (2.0 = 2%)
        #[arg(long)]
        risk_free_rate: Option<f64>,
        /// Return mode: simple or log
        #[arg(long)]
        mode: Option<ReturnMode>,
    },
    /// Score an existing risk metric snapshot
    Evaluate {
        /// RiskMetric JSON
        #[arg(short, long)]
        metric: PathBuf,
    },
    /// Derive the return series of one price series
    Returns {
        /// PriceSeries JSON (`{"symbol", "points"}`)
        #[arg(short, long)]
        prices: PathBuf,
        /// Return mode: simple or log
        #[arg(long)]
        mode: Option<ReturnMode>,
    },
    /// Print the effective configuration
    Config,
}

/// Input for `compute`.
#[derive(Deserialize)]
struct Scenario {
    portfolio: Portfolio,
    prices: BTreeMap<String, Vec<PricePoint>>,
    benchmark: PriceSeries,
}

impl Scenario {
    fn price_series(&self) -> risk_core::Result<Vec<PriceSeries>> {
        self.prices
            .iter()
            .map(|(symbol, points)| PriceSeries::new(symbol, points.clone()))
            .collect()
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let output = match run(cli) {
        Ok(data) => ApiResponse::ok(data),
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            ApiResponse::err(format!("{:#}", e))
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    if !output.ok {
        std::process::exit(1);
    }
    Ok(())
}

fn run(cli: Cli) -> Result<serde_json::Value> {
    let config_path = cli.config.unwrap_or_else(EngineConfig::default_path);
    let mut config = EngineConfig::load_or_default(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    match cli.command {
        Commands::Compute {
            input,
            confidence,
            risk_free_rate,
            mode,
        } => {
            if let Some(level) = confidence {
                config.confidence_level = level;
            }
            if let Some(rate) = risk_free_rate {
                config.risk_free_rate = rate;
            }
            if let Some(mode) = mode {
                config.return_mode = mode;
            }
            handle_compute(&input, config)
        }
        Commands::Evaluate { metric } => handle_evaluate(&metric),
        Commands::Returns { prices, mode } => {
            handle_returns(&prices, mode.unwrap_or(config.return_mode))
        }
        Commands::Config => Ok(json!({
            "path": config_path,
            "config": config,
        })),
    }
}

fn handle_compute(input: &Path, config: EngineConfig) -> Result<serde_json::Value> {
    let scenario: Scenario = read_json(input)?;
    let prices = scenario.price_series()?;

    let engine = RiskEngine::new(config)?;
    let report = engine.compute(&scenario.portfolio, &prices, &scenario.benchmark)?;

    Ok(serde_json::to_value(report)?)
}

fn handle_evaluate(path: &Path) -> Result<serde_json::Value> {
    let metric: RiskMetric = read_json(path)?;
    Ok(serde_json::to_value(evaluate(&metric))?)
}

fn handle_returns(path: &Path, mode: ReturnMode) -> Result<serde_json::Value> {
    let series: PriceSeries = read_json(path)?;
    let returns = returns(&series, mode)?;
    Ok(json!({
        "symbol": series.symbol(),
        "mode": returns.mode,
        "returns": returns.values(),
        "mean": returns.mean()?,
    }))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}
