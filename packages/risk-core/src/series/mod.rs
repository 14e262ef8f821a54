//! Return series and covariance.
//!
//! Leaf-level numerical routines over price and return series:
//!
//! - **Returns**: simple or logarithmic per-period returns
//! - **Covariance**: pairwise population covariance and the asset covariance matrix

mod covariance;
mod returns;

pub use covariance::{
    align_tails, covariance, covariance_matrix, is_negligible_variance, CovarianceMatrix,
};
pub use returns::{reconstruct_prices, returns, returns_from_closes, ReturnSeries};
