//! Empirical check of the central limit theorem for a function's sample mean.
//!
//! For batch size `n`, the mean of `n` draws of `f(X)` should have mean
//! `E[f(X)]` and variance `Var[f(X)] / n`. [`CltValidator::run`] draws `m`
//! batches, estimates the mean and variance of the `m` batch means, and
//! compares them with a reference computed from `N ≫ n` draws.

use std::fmt;

use log::{debug, warn};
use rand::Rng;

use crate::distributions::{Distribution, Samples};
use crate::functions::{Function, FunctionError};
use crate::stats::MonteCarloApproximator;
use crate::vector::FixedVector;

/// Batch layout for a CLT check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CltValidator {
    /// Draws per batch (`n`).
    pub batch_size: usize,
    /// Number of batches (`m`).
    pub batches: usize,
    /// Draws used for the reference statistics (`N`).
    pub reference_size: usize,
}

impl Default for CltValidator {
    fn default() -> Self {
        Self {
            batch_size: 100,
            batches: 100,
            reference_size: 100_000,
        }
    }
}

/// Outcome of [`CltValidator::run`]. Errors are percentages.
#[derive(Debug, Clone, PartialEq)]
pub struct CltReport {
    pub batch_size: usize,
    pub batches: usize,
    pub reference_size: usize,
    /// Mean of the batch means.
    pub mean_of_means: FixedVector,
    /// Variance of the batch means.
    pub var_of_means: FixedVector,
    /// E[f(X)] estimated from the reference draws.
    pub reference_mean: FixedVector,
    /// Var[f(X)] / n estimated from the reference draws.
    pub reference_var: FixedVector,
    pub mean_error: FixedVector,
    pub var_error: FixedVector,
}

impl CltValidator {
    pub fn new(batch_size: usize, batches: usize, reference_size: usize) -> Self {
        Self {
            batch_size,
            batches,
            reference_size,
        }
    }

    /// Runs the check for `f` under `dist`.
    ///
    /// # Errors
    /// Propagates [`FunctionError`] from sampling and estimation, e.g. a
    /// dimension mismatch between `f` and `dist` or a zero batch count.
    pub fn run<F, D, R>(&self, f: &F, dist: &D, rng: &mut R) -> Result<CltReport, FunctionError>
    where
        F: Function,
        D: Distribution,
        R: Rng + ?Sized,
    {
        debug!(
            "CltValidator::run(n = {}, m = {}, N = {})",
            self.batch_size, self.batches, self.reference_size
        );
        let means: Samples = (0..self.batches)
            .map(|_| f.mean(self.batch_size, dist, rng))
            .collect::<Result<Vec<_>, _>>()?
            .into();
        let sampling = MonteCarloApproximator::new(means)?;
        let mean_of_means = sampling.mean();
        let var_of_means = sampling.var();

        let reference = f.mca(self.reference_size, dist, rng)?;
        let reference_mean = reference.mean();
        let reference_var = reference.var() / self.batch_size as f64;

        Ok(CltReport {
            batch_size: self.batch_size,
            batches: self.batches,
            reference_size: self.reference_size,
            mean_error: relative_error(&mean_of_means, &reference_mean),
            var_error: relative_error(&var_of_means, &reference_var),
            mean_of_means,
            var_of_means,
            reference_mean,
            reference_var,
        })
    }
}

/// Per-element `100 · |actual − reference| / |reference|`.
///
/// Where the reference is zero the absolute error (times 100) is reported
/// instead, with a warning.
///
/// # Panics
/// Panics if the dimensions differ.
///
/// # Examples
/// ```
/// use mc_moments::clt::relative_error;
/// use mc_moments::vector::FixedVector;
/// let e = relative_error(&FixedVector::from([1.1, 0.5]), &FixedVector::from([1.0, 0.0]));
/// assert!((e[0] - 10.0).abs() < 1e-9);
/// assert_eq!(e[1], 50.0);
/// ```
pub fn relative_error(actual: &FixedVector, reference: &FixedVector) -> FixedVector {
    assert_eq!(actual.dim(), reference.dim(), "relative error of vectors of different dimension");
    FixedVector::from_fn(actual.dim(), |d| {
        let diff = (actual[d] - reference[d]).abs();
        if reference[d] == 0.0 {
            warn!("reference value is zero in dimension {d}, reporting absolute error");
            100.0 * diff
        } else {
            100.0 * diff / reference[d].abs()
        }
    })
}

impl fmt::Display for CltReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "CLT check: {} batches of {} samples, reference from {} samples",
            self.batches, self.batch_size, self.reference_size
        )?;
        writeln!(f, "Mean of means: {}", self.mean_of_means)?;
        writeln!(f, "Reference mean: {}", self.reference_mean)?;
        writeln!(f, "Mean error (%): {}", self.mean_error)?;
        writeln!(f, "Variance of means: {}", self.var_of_means)?;
        writeln!(f, "Reference variance / n: {}", self.reference_var)?;
        write!(f, "Variance error (%): {}", self.var_error)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::Uniform;
    use crate::functions::Polynomial;
    use crate::random::create_rng;
    use crate::stats::MomentError;
    use test_log::test;

    fn affine() -> Polynomial {
        // 1 + 2u
        Polynomial::new(vec![FixedVector::from([1.0]), FixedVector::from([2.0])]).unwrap()
    }

    #[test]
    fn test_mean_converges() {
        let dist = Uniform::broadcast(1, 0.0, 1.0).unwrap();
        let mut rng = create_rng(42);
        let report = CltValidator::new(1_000, 50, 200_000)
            .run(&affine(), &dist, &mut rng)
            .unwrap();
        assert!(report.mean_error[0] < 1.0, "{report}");
        // Var[1 + 2U] / n = (1/3) / 1000
        assert!((report.reference_var[0] - 1.0 / 3000.0).abs() < 2e-5);
        assert!(report.var_error[0] < 100.0, "{report}");
    }

    #[test]
    fn test_mean_error_shrinks_with_batch_size() {
        // 1 + 2U has mean 2 and variance 1/3
        let (mu, sigma2) = (2.0, 1.0 / 3.0);
        let (batches, reference_size) = (100, 500_000);
        let dist = Uniform::broadcast(1, 0.0, 1.0).unwrap();
        let mut rng = create_rng(42);

        let mut previous: Option<f64> = None;
        for n in [10, 100, 1_000, 10_000] {
            let report = CltValidator::new(n, batches, reference_size)
                .run(&affine(), &dist, &mut rng)
                .unwrap();
            let error = report.mean_error[0];
            // Standard error of the difference, in %
            let se = 100.0 * (sigma2 * (1.0 / (n * batches) as f64 + 1.0 / reference_size as f64)).sqrt() / mu;
            assert!(error <= 4.0 * se, "n = {n}: {error}% exceeds {}%", 4.0 * se);
            if let Some(prev) = previous {
                assert!(error <= prev + 4.0 * se, "n = {n}: {error}% after {prev}%");
            }
            previous = Some(error);
        }
        // Four standard errors at n = 10 is about 3.6%
        assert!(previous.is_some_and(|e| e < 0.25));
    }

    #[test]
    fn test_constant_function_uses_absolute_error() {
        let constant = Polynomial::new(vec![FixedVector::from([4.0])]).unwrap();
        let dist = Uniform::broadcast(1, 0.0, 1.0).unwrap();
        let mut rng = create_rng(42);
        let report = CltValidator::new(10, 5, 100).run(&constant, &dist, &mut rng).unwrap();
        assert_eq!(report.mean_of_means[0], 4.0);
        assert_eq!(report.mean_error[0], 0.0);
        assert_eq!(report.var_error[0], 0.0);
    }

    #[test]
    fn test_zero_batches_is_an_error() {
        let dist = Uniform::broadcast(1, 0.0, 1.0).unwrap();
        let mut rng = create_rng(42);
        let err = CltValidator::new(10, 0, 100).run(&affine(), &dist, &mut rng).unwrap_err();
        assert!(matches!(err, FunctionError::Moment(MomentError::Empty)));
    }

    #[test]
    fn test_report_display() {
        let dist = Uniform::broadcast(1, 0.0, 1.0).unwrap();
        let mut rng = create_rng(7);
        let report = CltValidator::new(10, 10, 1_000).run(&affine(), &dist, &mut rng).unwrap();
        let text = report.to_string();
        assert!(text.starts_with("CLT check: 10 batches of 10 samples"));
        assert!(text.contains("Variance error (%): "));
    }

    #[test]
    fn test_default_layout() {
        let v = CltValidator::default();
        assert_eq!((v.batch_size, v.batches, v.reference_size), (100, 100, 100_000));
    }
}
