use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::ComplianceError;
use crate::models::RegressionScores;

/// Singular values below this fraction of the largest are treated as zero.
const RANK_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq)]
struct FittedParams {
    coefficients: DVector<f64>,
    intercept: f64,
}

#[derive(Debug, Clone, Default)]
pub struct LinearRegression {
    fitted: Option<FittedParams>,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, features: &[Vec<f64>], targets: &[f64]) -> Result<(), ComplianceError> {
        if features.len() != targets.len() {
            return Err(ComplianceError::DimensionMismatch {
                expected: features.len(),
                actual: targets.len(),
            });
        }
        let width = features.first().map(Vec::len).unwrap_or(0);
        if let Some(row) = features.iter().find(|row| row.len() != width) {
            return Err(ComplianceError::DimensionMismatch {
                expected: width,
                actual: row.len(),
            });
        }

        let distinct = distinct_rows(features);
        if distinct < 2 {
            return Err(ComplianceError::InsufficientSamples(distinct));
        }

        let samples = features.len() as f64;
        let design = DMatrix::from_fn(features.len(), width, |i, j| features[i][j]);
        let feature_means = design.row_mean();
        let target_mean = targets.iter().sum::<f64>() / samples;

        // Centering absorbs the intercept; the one-hot columns stay collinear,
        // so the SVD drops the null direction instead of inverting it.
        let centered_design =
            DMatrix::from_fn(features.len(), width, |i, j| design[(i, j)] - feature_means[j]);
        let centered_targets =
            DVector::from_iterator(targets.len(), targets.iter().map(|y| y - target_mean));

        let svd = centered_design.svd(true, true);
        let cutoff = RANK_TOLERANCE * svd.singular_values.max();
        let coefficients = svd
            .solve(&centered_targets, cutoff)
            .map_err(|e| ComplianceError::Numerical(e.to_string()))?;
        let intercept = target_mean - feature_means.transpose().dot(&coefficients);

        tracing::debug!(
            samples = features.len(),
            width,
            intercept,
            "fitted linear regression"
        );

        self.fitted = Some(FittedParams {
            coefficients,
            intercept,
        });
        Ok(())
    }

    pub fn coefficients(&self) -> Option<&[f64]> {
        self.fitted.as_ref().map(|p| p.coefficients.as_slice())
    }

    pub fn intercept(&self) -> Option<f64> {
        self.fitted.as_ref().map(|p| p.intercept)
    }

    pub fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ComplianceError> {
        let params = self.fitted.as_ref().ok_or(ComplianceError::UnfittedModel)?;
        let width = params.coefficients.len();
        if let Some(row) = features.iter().find(|row| row.len() != width) {
            return Err(ComplianceError::DimensionMismatch {
                expected: width,
                actual: row.len(),
            });
        }

        let design = DMatrix::from_fn(features.len(), width, |i, j| features[i][j]);
        let predictions = design * &params.coefficients;
        Ok(predictions.iter().map(|y| y + params.intercept).collect())
    }

    pub fn evaluate(
        &self,
        features: &[Vec<f64>],
        targets: &[f64],
    ) -> Result<RegressionScores, ComplianceError> {
        if features.len() != targets.len() {
            return Err(ComplianceError::DimensionMismatch {
                expected: features.len(),
                actual: targets.len(),
            });
        }
        if targets.is_empty() {
            return Err(ComplianceError::InsufficientSamples(0));
        }
        let predictions = self.predict(features)?;
        Ok(regression_scores(targets, &predictions))
    }
}

/// RMSE, MAE and R² of `predicted` against `actual`.
///
/// When the targets are constant, R² is 1 for a perfect fit and 0 otherwise.
pub fn regression_scores(actual: &[f64], predicted: &[f64]) -> RegressionScores {
    let n = actual.len() as f64;
    let mean = actual.iter().sum::<f64>() / n;

    let mut ss_res = 0.0;
    let mut abs_err = 0.0;
    let mut ss_tot = 0.0;
    for (y, y_hat) in actual.iter().zip(predicted) {
        let residual = y - y_hat;
        ss_res += residual * residual;
        abs_err += residual.abs();
        ss_tot += (y - mean) * (y - mean);
    }

    let r2 = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res == 0.0 {
        1.0
    } else {
        0.0
    };

    RegressionScores {
        rmse: (ss_res / n).sqrt(),
        mae: abs_err / n,
        r2,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffles `0..len` with a seeded RNG and holds out `ceil(len * test_fraction)` indices.
pub fn train_test_split(
    len: usize,
    test_fraction: f64,
    seed: u64,
) -> Result<TrainTestSplit, ComplianceError> {
    let test_len = (len as f64 * test_fraction).ceil() as usize;
    if test_len == 0 || test_len >= len {
        return Err(ComplianceError::InsufficientSamples(len));
    }

    let mut indices: Vec<usize> = (0..len).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let mut train = indices.split_off(test_len);
    let mut test = indices;
    train.sort_unstable();
    test.sort_unstable();
    Ok(TrainTestSplit { train, test })
}

fn distinct_rows(features: &[Vec<f64>]) -> usize {
    let mut keys: Vec<Vec<u64>> = features
        .iter()
        .map(|row| row.iter().map(|v| v.to_bits()).collect())
        .collect();
    keys.sort_unstable();
    keys.dedup();
    keys.len()
}
