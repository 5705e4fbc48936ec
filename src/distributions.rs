//! Multivariate sampling distributions.
//!
//! A [`Distribution`] draws each dimension independently through
//! [`Distribution::sample_dim`] and assembles the draws into a
//! [`FixedVector`]. Batches of draws are returned as [`Samples`], a shared
//! immutable slice that several approximators can observe without copying.
//!
//! # Supported Distributions
//!
//! | Distribution | Parameters | Mean | Variance |
//! |---|---|---|---|
//! | [`Uniform`] | lower, upper (per dimension) | (a+b)/2 | (b−a)²/12 |
//! | [`Normal`] | mean, covariance | μ | diag(Σ) |

use std::sync::Arc;

use log::debug;
use rand::Rng;

use crate::random::unit_draw;
use crate::special::ErfInv;
use crate::vector::FixedVector;

/// A shared, immutable collection of samples.
pub type Samples = Arc<[FixedVector]>;

/// Error type for invalid distribution parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum DistributionError {
    /// Parameters violate distribution constraints.
    InvalidParameters(String),
}

impl std::fmt::Display for DistributionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistributionError::InvalidParameters(msg) => {
                write!(f, "invalid distribution parameters: {msg}")
            }
        }
    }
}

impl std::error::Error for DistributionError {}

/// A fixed-dimension distribution sampled one dimension at a time.
pub trait Distribution {
    /// Dimension of the samples.
    fn dim(&self) -> usize;

    /// Draws one element of a sample in dimension `d`.
    ///
    /// # Panics
    /// Panics if `d >= self.dim()`.
    fn sample_dim<R: Rng + ?Sized>(&self, d: usize, rng: &mut R) -> f64;

    /// Analytical mean of each dimension.
    fn mean(&self) -> FixedVector;

    /// Analytical variance of each dimension.
    fn var(&self) -> FixedVector;

    /// Draws a single sample.
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> FixedVector {
        FixedVector::from_fn(self.dim(), |d| self.sample_dim(d, rng))
    }

    /// Draws `n` independent samples.
    ///
    /// # Examples
    /// ```
    /// use mc_moments::distributions::{Distribution, Uniform};
    /// use mc_moments::random::create_rng;
    /// let u = Uniform::broadcast(2, 0.0, 1.0).unwrap();
    /// let samples = u.samples(10, &mut create_rng(42));
    /// assert_eq!(samples.len(), 10);
    /// assert!(samples.iter().all(|s| s.dim() == 2));
    /// ```
    fn samples<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Samples {
        (0..n).map(|_| self.sample(rng)).collect()
    }
}

fn require_dim(name: &str, dim: usize) -> Result<(), DistributionError> {
    if dim == 0 {
        return Err(DistributionError::InvalidParameters(format!(
            "{name} requires at least one dimension"
        )));
    }
    Ok(())
}

// ============================================================================
// Uniform Distribution
// ============================================================================

/// Continuous uniform distribution on the box `[lower, upper]`.
///
/// # Mathematical Definition
/// - Sample: x_d = lower_d + u·(upper_d − lower_d), u ~ U[0, 1)
/// - Mean: (lower_d + upper_d)/2
/// - Variance: (upper_d − lower_d)²/12
#[derive(Debug, Clone, PartialEq)]
pub struct Uniform {
    lower: FixedVector,
    upper: FixedVector,
}

impl Uniform {
    /// Creates a uniform distribution with per-dimension bounds.
    ///
    /// # Errors
    /// Returns `Err` if the bound vectors are empty or of different length,
    /// if any bound is not finite, or if `lower[d] >= upper[d]`.
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Result<Self, DistributionError> {
        require_dim("Uniform", lower.len())?;
        if lower.len() != upper.len() {
            return Err(DistributionError::InvalidParameters(format!(
                "Uniform bounds have different lengths: {} and {}",
                lower.len(),
                upper.len()
            )));
        }
        for (d, (&a, &b)) in lower.iter().zip(upper.iter()).enumerate() {
            if !a.is_finite() || !b.is_finite() || a >= b {
                return Err(DistributionError::InvalidParameters(format!(
                    "Uniform requires lower < upper, got lower={a}, upper={b} in dimension {d}"
                )));
            }
        }
        debug!("Uniform::new(lower = {lower:?}, upper = {upper:?})");
        Ok(Self {
            lower: lower.into(),
            upper: upper.into(),
        })
    }

    /// Creates a uniform distribution with the same bounds in every dimension.
    ///
    /// # Errors
    /// Same conditions as [`Uniform::new`].
    pub fn broadcast(dim: usize, lower: f64, upper: f64) -> Result<Self, DistributionError> {
        Self::new(vec![lower; dim], vec![upper; dim])
    }

    pub fn lower(&self) -> &FixedVector {
        &self.lower
    }

    pub fn upper(&self) -> &FixedVector {
        &self.upper
    }
}

impl Distribution for Uniform {
    fn dim(&self) -> usize {
        self.lower.dim()
    }

    fn sample_dim<R: Rng + ?Sized>(&self, d: usize, rng: &mut R) -> f64 {
        let z = unit_draw(rng);
        self.lower[d] + z * (self.upper[d] - self.lower[d])
    }

    fn mean(&self) -> FixedVector {
        (&self.lower + &self.upper) / 2.0
    }

    fn var(&self) -> FixedVector {
        (&self.upper - &self.lower).powi(2) / 12.0
    }
}

// ============================================================================
// Normal Distribution
// ============================================================================

/// Normal distribution N(μ, Σ) with independently sampled dimensions.
///
/// Each dimension is drawn by inverse-transform sampling:
/// `x_d = μ_d + √Σ_dd · √2 · erfinv(2u − 1)` with `u ~ U[0, 1)`.
///
/// Only the diagonal of Σ affects sampling. Off-diagonal entries are
/// accepted and stored but ignored, so samples come from the product of
/// the marginals rather than from a correlated multivariate normal.
#[derive(Debug, Clone, PartialEq)]
pub struct Normal {
    mean: FixedVector,
    covariance: Vec<Vec<f64>>,
    std_dev: FixedVector,
    erfinv: ErfInv,
}

impl Normal {
    /// Creates a normal distribution from a mean vector and a covariance matrix.
    ///
    /// # Errors
    /// Returns `Err` if the matrix is not `dim × dim`, if any entry is not
    /// finite, or if a diagonal entry is not positive.
    pub fn new(mean: Vec<f64>, covariance: Vec<Vec<f64>>) -> Result<Self, DistributionError> {
        let dim = mean.len();
        require_dim("Normal", dim)?;
        if covariance.len() != dim || covariance.iter().any(|row| row.len() != dim) {
            return Err(DistributionError::InvalidParameters(format!(
                "Normal requires a {dim}x{dim} covariance matrix"
            )));
        }
        if !mean.iter().all(|m| m.is_finite())
            || !covariance.iter().flatten().all(|c| c.is_finite())
        {
            return Err(DistributionError::InvalidParameters(
                "Normal requires finite mean and covariance".to_string(),
            ));
        }
        if let Some(d) = (0..dim).find(|&d| covariance[d][d] <= 0.0) {
            return Err(DistributionError::InvalidParameters(format!(
                "Normal requires positive variance, got {} in dimension {d}",
                covariance[d][d]
            )));
        }
        let std_dev = FixedVector::from_fn(dim, |d| covariance[d][d].sqrt());
        debug!("Normal::new(mean = {mean:?}, std_dev = {std_dev})");
        Ok(Self {
            mean: mean.into(),
            covariance,
            std_dev,
            erfinv: ErfInv::default(),
        })
    }

    /// Creates a normal distribution with a diagonal covariance matrix.
    ///
    /// # Errors
    /// Same conditions as [`Normal::new`], plus mismatched lengths.
    pub fn with_variance(mean: Vec<f64>, variance: Vec<f64>) -> Result<Self, DistributionError> {
        if mean.len() != variance.len() {
            return Err(DistributionError::InvalidParameters(format!(
                "Normal mean and variance have different lengths: {} and {}",
                mean.len(),
                variance.len()
            )));
        }
        let dim = variance.len();
        let covariance = (0..dim)
            .map(|i| {
                let mut row = vec![0.0; dim];
                row[i] = variance[i];
                row
            })
            .collect();
        Self::new(mean, covariance)
    }

    /// Creates a normal distribution with the same mean and variance in
    /// every dimension and no covariance.
    ///
    /// # Errors
    /// Same conditions as [`Normal::new`].
    pub fn isotropic(dim: usize, mean: f64, variance: f64) -> Result<Self, DistributionError> {
        Self::with_variance(vec![mean; dim], vec![variance; dim])
    }

    /// Replaces the inverse error function settings used for sampling.
    pub fn with_erfinv(mut self, erfinv: ErfInv) -> Self {
        self.erfinv = erfinv;
        self
    }

    pub fn covariance(&self) -> &[Vec<f64>] {
        &self.covariance
    }

    pub fn std_dev(&self) -> &FixedVector {
        &self.std_dev
    }
}

impl Distribution for Normal {
    fn dim(&self) -> usize {
        self.mean.dim()
    }

    fn sample_dim<R: Rng + ?Sized>(&self, d: usize, rng: &mut R) -> f64 {
        let u = unit_draw(rng);
        self.mean[d] + self.std_dev[d] * self.erfinv.normal_quantile(u)
    }

    fn mean(&self) -> FixedVector {
        self.mean.clone()
    }

    fn var(&self) -> FixedVector {
        FixedVector::from_fn(self.dim(), |d| self.covariance[d][d])
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::create_rng;
    use test_log::test;

    fn uniform_5d() -> Uniform {
        Uniform::new(
            vec![0.0, 1.0, 2.0, 3.0, 4.0],
            vec![1.0, 3.0, 5.0, 7.0, 9.0],
        )
        .unwrap()
    }

    fn column_mean(samples: &Samples, d: usize) -> f64 {
        samples.iter().map(|s| s[d]).sum::<f64>() / samples.len() as f64
    }

    fn column_var(samples: &Samples, d: usize) -> f64 {
        let m = column_mean(samples, d);
        samples.iter().map(|s| (s[d] - m).powi(2)).sum::<f64>() / samples.len() as f64
    }

    // --- Uniform ---

    #[test]
    fn test_uniform_samples_within_bounds() {
        let u = uniform_5d();
        let samples = u.samples(1000, &mut create_rng(42));
        assert_eq!(samples.len(), 1000);
        for s in samples.iter() {
            for d in 0..5 {
                assert!(s[d] >= u.lower()[d] && s[d] <= u.upper()[d]);
            }
        }
    }

    #[test]
    fn test_uniform_mean() {
        let expected = [0.5, 2.0, 3.5, 5.0, 6.5];
        let mean = uniform_5d().mean();
        for d in 0..5 {
            assert!((mean[d] - expected[d]).abs() < 1e-15);
        }
    }

    #[test]
    fn test_uniform_variance() {
        let expected = [1.0 / 12.0, 4.0 / 12.0, 9.0 / 12.0, 16.0 / 12.0, 25.0 / 12.0];
        let var = uniform_5d().var();
        for d in 0..5 {
            assert!((var[d] - expected[d]).abs() < 1e-15);
        }
    }

    #[test]
    fn test_uniform_broadcast() {
        let u = Uniform::broadcast(3, 5.0, 10.0).unwrap();
        assert_eq!(u.dim(), 3);
        assert_eq!(u.mean().as_slice(), &[7.5, 7.5, 7.5]);
    }

    #[test]
    fn test_uniform_invalid() {
        assert!(Uniform::broadcast(2, 5.0, 5.0).is_err());
        assert!(Uniform::broadcast(2, 5.0, 3.0).is_err());
        assert!(Uniform::broadcast(2, f64::NAN, 5.0).is_err());
        assert!(Uniform::broadcast(0, 0.0, 1.0).is_err());
        assert!(Uniform::new(vec![0.0, 0.0], vec![1.0]).is_err());
    }

    #[test]
    fn test_uniform_sample_moments() {
        let u = Uniform::broadcast(1, 2.0, 8.0).unwrap();
        let samples = u.samples(20_000, &mut create_rng(7));
        assert!((column_mean(&samples, 0) - 5.0).abs() < 0.1);
        assert!((column_var(&samples, 0) - 3.0).abs() < 0.15);
    }

    // --- Normal ---

    #[test]
    fn test_normal_variance_uses_diagonal() {
        let covariance = vec![
            vec![1.0, 2.0, 3.0, 4.0, 5.0],
            vec![2.0, 1.0, 2.0, 3.0, 4.0],
            vec![3.0, 2.0, 1.0, 2.0, 3.0],
            vec![4.0, 3.0, 2.0, 1.0, 2.0],
            vec![5.0, 4.0, 3.0, 2.0, 1.0],
        ];
        let n = Normal::new(vec![0.0, 1.0, 2.0, 3.0, 4.0], covariance).unwrap();
        let var = n.var();
        for d in 0..5 {
            assert!((var[d] - 1.0).abs() < 1e-15);
        }
        assert_eq!(n.covariance()[0][4], 5.0);
        assert_eq!(n.mean().as_slice(), &[0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_normal_sample_moments() {
        let n = Normal::with_variance(vec![10.0, -3.0], vec![4.0, 0.25]).unwrap();
        let samples = n.samples(20_000, &mut create_rng(11));
        assert!((column_mean(&samples, 0) - 10.0).abs() < 0.1);
        assert!((column_mean(&samples, 1) + 3.0).abs() < 0.025);
        assert!((column_var(&samples, 0) - 4.0).abs() < 0.2);
        assert!((column_var(&samples, 1) - 0.25).abs() < 0.0125);
    }

    #[test]
    fn test_normal_samples_are_finite() {
        let n = Normal::isotropic(3, 0.0, 1.0).unwrap();
        let samples = n.samples(5000, &mut create_rng(3));
        assert!(samples.iter().all(|s| s.iter().all(|x| x.is_finite())));
    }

    #[test]
    fn test_normal_clipped_tails() {
        let cfg = ErfInv {
            max_abs: 1.0,
            ..ErfInv::default()
        };
        let n = Normal::isotropic(1, 0.0, 1.0).unwrap().with_erfinv(cfg);
        let bound = std::f64::consts::SQRT_2;
        let samples = n.samples(2000, &mut create_rng(5));
        assert!(samples.iter().all(|s| s[0].abs() <= bound + 1e-12));
    }

    #[test]
    fn test_normal_invalid() {
        assert!(Normal::isotropic(2, 0.0, 0.0).is_err());
        assert!(Normal::isotropic(2, 0.0, -1.0).is_err());
        assert!(Normal::isotropic(2, f64::INFINITY, 1.0).is_err());
        assert!(Normal::with_variance(vec![0.0], vec![1.0, 1.0]).is_err());
        assert!(Normal::new(vec![0.0, 0.0], vec![vec![1.0, 0.0]]).is_err());
    }

    #[test]
    fn test_samples_deterministic_for_seed() {
        let n = Normal::isotropic(2, 0.0, 1.0).unwrap();
        let a = n.samples(50, &mut create_rng(42));
        let b = n.samples(50, &mut create_rng(42));
        assert_eq!(a, b);
    }
}
