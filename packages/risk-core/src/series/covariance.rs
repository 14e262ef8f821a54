//! Population covariance and the asset covariance matrix.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ReturnSeries;
use crate::{Error, Result};

/// Variance at or below this fraction of a series' mean square is rounding
/// noise around zero.
const VARIANCE_NOISE: f64 = 1e-12;

/// Square, symmetric covariance matrix indexed by asset symbol.
///
/// Row and column order follow `symbols`. Diagonal entries are each asset's
/// own variance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CovarianceMatrix {
    symbols: Vec<String>,
    values: Vec<Vec<f64>>,
}

impl CovarianceMatrix {
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Row/column index of a symbol.
    pub fn index_of(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }

    /// Entry at `(i, j)`. Panics if out of range, like slice indexing.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i][j]
    }

    /// Covariance between two symbols.
    pub fn between(&self, a: &str, b: &str) -> Option<f64> {
        Some(self.values[self.index_of(a)?][self.index_of(b)?])
    }

    /// Variance of one symbol (the diagonal entry).
    pub fn variance(&self, symbol: &str) -> Option<f64> {
        self.between(symbol, symbol)
    }

    /// `Σ_i Σ_j w_i · w_j · Cov(i, j)` for weights in row order.
    pub fn quadratic_form(&self, weights: &[f64]) -> Result<f64> {
        if weights.len() != self.len() {
            return Err(Error::InvalidInput(format!(
                "weights length ({}) does not match matrix size ({})",
                weights.len(),
                self.len()
            )));
        }

        let mut total = 0.0;
        for (i, wi) in weights.iter().enumerate() {
            for (j, wj) in weights.iter().enumerate() {
                total += wi * wj * self.values[i][j];
            }
        }
        Ok(total)
    }
}

/// Population covariance of two equal-length series (divides by n).
///
/// # Errors
///
/// `InvalidInput` if the series are empty or differ in length.
pub fn covariance(a: &[f64], b: &[f64]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(Error::InvalidInput(format!(
            "series lengths differ ({} vs {})",
            a.len(),
            b.len()
        )));
    }
    if a.is_empty() {
        return Err(Error::InvalidInput(
            "cannot compute covariance of empty series".to_string(),
        ));
    }

    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let sum: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| (x - mean_a) * (y - mean_b))
        .sum();

    Ok(sum / n)
}

/// Whether `variance` is indistinguishable from zero for the series it was
/// computed from.
///
/// A series that is constant in exact arithmetic, like steady 10% growth,
/// comes out with a variance around 1e-32 rather than 0.
pub fn is_negligible_variance(variance: f64, values: &[f64]) -> bool {
    if values.is_empty() {
        return true;
    }
    let mean_square = values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64;
    variance <= VARIANCE_NOISE * mean_square
}

/// Truncate every series to the shortest common length, keeping the newest
/// returns.
///
/// Assets with different listing histories end up on the same window. A
/// warning is logged whenever anything is dropped.
pub fn align_tails(series: &BTreeMap<String, ReturnSeries>) -> BTreeMap<String, ReturnSeries> {
    let Some(shortest) = series.values().map(ReturnSeries::len).min() else {
        return BTreeMap::new();
    };

    series
        .iter()
        .map(|(symbol, returns)| {
            if returns.len() > shortest {
                tracing::warn!(
                    symbol = %symbol,
                    from = returns.len(),
                    to = shortest,
                    "truncating return series to common window"
                );
                (symbol.clone(), returns.tail(shortest))
            } else {
                (symbol.clone(), returns.clone())
            }
        })
        .collect()
}

/// Build the covariance matrix for a set of assets.
///
/// Series of unequal length are truncated to the newest common window (see
/// [`align_tails`]). An asset with zero variance, including variance that is
/// only rounding noise, keeps an all-zero row and column.
///
/// # Errors
///
/// `InvalidInput` if no series are given or the common window is empty.
pub fn covariance_matrix(
    asset_returns: &BTreeMap<String, ReturnSeries>,
) -> Result<CovarianceMatrix> {
    if asset_returns.is_empty() {
        return Err(Error::InvalidInput(
            "no return series for covariance matrix".to_string(),
        ));
    }

    let aligned = align_tails(asset_returns);
    let symbols: Vec<String> = aligned.keys().cloned().collect();
    let rows: Vec<&[f64]> = aligned.values().map(ReturnSeries::values).collect();
    let n = symbols.len();

    let mut flat = Vec::with_capacity(n);
    for row in &rows {
        flat.push(is_negligible_variance(covariance(row, row)?, row));
    }

    let mut values = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in i..n {
            if flat[i] || flat[j] {
                continue;
            }
            let cov = covariance(rows[i], rows[j])?;
            values[i][j] = cov;
            values[j][i] = cov;
        }
    }

    tracing::debug!(assets = n, window = rows[0].len(), "built covariance matrix");
    Ok(CovarianceMatrix { symbols, values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReturnMode;
    use crate::series::returns_from_closes;
    use approx::assert_abs_diff_eq;

    fn series(values: &[f64]) -> ReturnSeries {
        ReturnSeries::new(ReturnMode::Simple, values.to_vec())
    }

    #[test]
    fn test_covariance_population() {
        // means 2 and 4; centered products: 2, 0, 2 -> 4 / 3
        let cov = covariance(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap();
        assert_abs_diff_eq!(cov, 4.0 / 3.0, epsilon = 1e-12);

        let var = covariance(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).unwrap();
        assert_abs_diff_eq!(var, 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_covariance_errors() {
        assert!(matches!(
            covariance(&[1.0, 2.0], &[1.0]),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(covariance(&[], &[]), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_matrix_symmetric_with_variance_diagonal() {
        let mut input = BTreeMap::new();
        input.insert("AAA".to_string(), series(&[0.01, -0.02, 0.03, 0.00]));
        input.insert("BBB".to_string(), series(&[0.02, 0.01, -0.01, 0.04]));
        input.insert("CCC".to_string(), series(&[-0.01, 0.00, 0.02, 0.01]));

        let matrix = covariance_matrix(&input).unwrap();
        assert_eq!(matrix.len(), 3);
        assert_eq!(matrix.symbols(), ["AAA", "BBB", "CCC"]);

        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(matrix.get(i, j), matrix.get(j, i));
            }
        }

        let var_a = covariance(&input["AAA"].values, &input["AAA"].values).unwrap();
        assert_abs_diff_eq!(matrix.variance("AAA").unwrap(), var_a, epsilon = 1e-15);
        assert!(matrix.between("AAA", "ZZZ").is_none());
    }

    #[test]
    fn test_matrix_zero_variance_row_is_zero() {
        let mut input = BTreeMap::new();
        input.insert("CASH".to_string(), series(&[0.0, 0.0, 0.0]));
        input.insert("RISK".to_string(), series(&[0.05, -0.03, 0.02]));

        let matrix = covariance_matrix(&input).unwrap();
        let idx = matrix.index_of("CASH").unwrap();
        for j in 0..matrix.len() {
            assert_eq!(matrix.get(idx, j), 0.0);
            assert_eq!(matrix.get(j, idx), 0.0);
        }
        assert!(matrix.variance("RISK").unwrap() > 0.0);
    }

    #[test]
    fn test_matrix_constant_growth_row_is_zero() {
        let mut input = BTreeMap::new();
        let growth = returns_from_closes(&[100.0, 110.0, 121.0, 133.1], ReturnMode::Simple).unwrap();
        input.insert("GROW".to_string(), growth);
        input.insert("RISK".to_string(), series(&[0.05, -0.03, 0.02]));

        let matrix = covariance_matrix(&input).unwrap();
        assert_eq!(matrix.variance("GROW").unwrap(), 0.0);
        assert_eq!(matrix.between("GROW", "RISK").unwrap(), 0.0);
        assert!(matrix.variance("RISK").unwrap() > 0.0);
    }

    #[test]
    fn test_negligible_variance() {
        assert!(is_negligible_variance(0.0, &[0.0, 0.0]));
        assert!(is_negligible_variance(1e-32, &[0.1, 0.1, 0.1]));
        assert!(!is_negligible_variance(1e-8, &[0.001, -0.0002, 0.0015]));
        assert!(is_negligible_variance(0.0, &[]));
    }

    #[test]
    fn test_matrix_truncates_to_newest_common_window() {
        let mut input = BTreeMap::new();
        input.insert("OLD".to_string(), series(&[0.50, -0.50, 0.01, 0.02, 0.03]));
        input.insert("NEW".to_string(), series(&[0.01, 0.02, 0.03]));

        let aligned = align_tails(&input);
        assert_eq!(aligned["OLD"].values, vec![0.01, 0.02, 0.03]);

        let matrix = covariance_matrix(&input).unwrap();
        assert_abs_diff_eq!(
            matrix.between("OLD", "NEW").unwrap(),
            matrix.variance("NEW").unwrap(),
            epsilon = 1e-15
        );
    }

    #[test]
    fn test_matrix_empty_input() {
        let input = BTreeMap::new();
        assert!(matches!(
            covariance_matrix(&input),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_quadratic_form() {
        let mut input = BTreeMap::new();
        input.insert("A".to_string(), series(&[0.01, -0.01]));
        input.insert("B".to_string(), series(&[-0.01, 0.01]));

        // perfectly anti-correlated, equal weights: variance cancels
        let matrix = covariance_matrix(&input).unwrap();
        assert_abs_diff_eq!(matrix.quadratic_form(&[0.5, 0.5]).unwrap(), 0.0, epsilon = 1e-18);
        assert!(matrix.quadratic_form(&[1.0]).is_err());
    }
}
