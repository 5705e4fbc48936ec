//! Monte Carlo moment estimation.
//!
//! [`MonteCarloApproximator`] holds a shared, read-only collection of
//! samples and estimates per-dimension moments from it:
//!
//! ```text
//! raw:           E[x^k]          ≈ (1/N) Σ xᵢ^k
//! central:       E[(x−μ)^k]      ≈ (1/N) Σ (xᵢ−μ)^k
//! standardized:  E[((x−μ)/σ)^k]  ≈ (1/N) Σ ((xᵢ−μ)/σ)^k
//! ```
//!
//! where μ and σ are the sample mean and the population standard
//! deviation of the dimension. Every statistic is recomputed from the
//! stored samples on each call; nothing is cached.
//!
//! # Algorithms
//!
//! - **Sums**: Neumaier compensated summation for O(ε) error independent of N.
//! - **Central moments**: two-pass, the mean is computed first and the
//!   deviations are accumulated in a second sweep.

use std::fmt;
use std::str::FromStr;

use log::debug;

use crate::distributions::Samples;
use crate::vector::FixedVector;

/// Error type for moment estimation.
#[derive(Debug, Clone, PartialEq)]
pub enum MomentError {
    /// The approximator was given no samples.
    Empty,
    /// A sample does not have the dimension of the first one.
    DimensionMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },
    /// A per-dimension order list does not match the sample dimension.
    OrderCount { expected: usize, found: usize },
    /// Standardization is undefined because the dimension has zero variance.
    Degenerate { dim: usize },
    /// A moment order below zero was requested.
    InvalidOrder(i64),
    /// A moment mode or statistic name was not recognised.
    Unsupported(String),
}

impl fmt::Display for MomentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MomentError::Empty => write!(f, "cannot estimate moments from an empty sample set"),
            MomentError::DimensionMismatch {
                index,
                expected,
                found,
            } => write!(
                f,
                "sample {index} has dimension {found}, expected {expected}"
            ),
            MomentError::OrderCount { expected, found } => {
                write!(f, "expected {expected} moment orders, got {found}")
            }
            MomentError::Degenerate { dim } => write!(
                f,
                "standardized moment undefined: zero variance in dimension {dim}"
            ),
            MomentError::InvalidOrder(k) => {
                write!(f, "moment order must be an integer in 0..={MAX_ORDER}, got {k}")
            }
            MomentError::Unsupported(what) => write!(f, "unsupported: {what}"),
        }
    }
}

impl std::error::Error for MomentError {}

/// Largest supported moment order; powers are taken with `f64::powi`.
pub const MAX_ORDER: u32 = i32::MAX as u32;

/// Validates a signed moment order coming from user input.
///
/// # Errors
/// Returns [`MomentError::InvalidOrder`] for negative orders or orders
/// above [`MAX_ORDER`].
pub fn moment_order(k: i64) -> Result<u32, MomentError> {
    u32::try_from(k)
        .ok()
        .filter(|&k| k <= MAX_ORDER)
        .ok_or(MomentError::InvalidOrder(k))
}

/// Which moment to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MomentMode {
    Raw,
    Central,
    Standardized,
}

impl FromStr for MomentMode {
    type Err = MomentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(MomentMode::Raw),
            "central" => Ok(MomentMode::Central),
            "standardized" => Ok(MomentMode::Standardized),
            other => Err(MomentError::Unsupported(format!("moment mode \"{other}\""))),
        }
    }
}

impl fmt::Display for MomentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MomentMode::Raw => "raw",
            MomentMode::Central => "central",
            MomentMode::Standardized => "standardized",
        })
    }
}

/// A named statistic, as selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statistic {
    /// Generic moment; the order and mode are supplied separately.
    Moment,
    Mean,
    Variance,
    Std,
    Skewness,
    Kurtosis,
    Hyperskewness,
    Hypertailedness,
}

impl FromStr for Statistic {
    type Err = MomentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "moment" => Ok(Statistic::Moment),
            "mean" => Ok(Statistic::Mean),
            "variance" | "var" => Ok(Statistic::Variance),
            "std" => Ok(Statistic::Std),
            "skewness" => Ok(Statistic::Skewness),
            "kurtosis" => Ok(Statistic::Kurtosis),
            "hyperskewness" => Ok(Statistic::Hyperskewness),
            "hypertailedness" => Ok(Statistic::Hypertailedness),
            other => Err(MomentError::Unsupported(format!("statistic \"{other}\""))),
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Statistic::Moment => "Moment",
            Statistic::Mean => "Mean",
            Statistic::Variance => "Variance",
            Statistic::Std => "Standard deviation",
            Statistic::Skewness => "Skewness",
            Statistic::Kurtosis => "Kurtosis",
            Statistic::Hyperskewness => "Hyperskewness",
            Statistic::Hypertailedness => "Hypertailedness",
        })
    }
}

// ---------------------------------------------------------------------------
// Kahan compensated summation
// ---------------------------------------------------------------------------

/// Neumaier compensated summation for O(ε) error independent of `n`.
///
/// This is an improved variant of Kahan summation that also handles the
/// case where the addend is larger in magnitude than the running sum.
///
/// Reference: Neumaier (1974), "Rundungsfehleranalyse einiger Verfahren
/// zur Summation endlicher Summen", *Zeitschrift für Angewandte
/// Mathematik und Mechanik* 54(1), pp. 39–51.
///
/// # Complexity
/// Time: O(n), Space: O(1)
///
/// # Examples
/// ```
/// use mc_moments::stats::kahan_sum;
/// assert_eq!(kahan_sum([1e16, 1.0, -1e16]), 1.0);
/// ```
pub fn kahan_sum<I: IntoIterator<Item = f64>>(data: I) -> f64 {
    let mut sum = 0.0_f64;
    let mut c = 0.0_f64;
    for x in data {
        let t = sum + x;
        if sum.abs() >= x.abs() {
            c += (sum - t) + x;
        } else {
            c += (x - t) + sum;
        }
        sum = t;
    }
    sum + c
}

// ---------------------------------------------------------------------------
// Scalar moments
// ---------------------------------------------------------------------------

/// Arithmetic mean, or `None` if `data` is empty.
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(kahan_sum(data.iter().copied()) / data.len() as f64)
}

/// k-th raw moment (1/N) Σ xᵢ^k, or `None` if `data` is empty or
/// `k > MAX_ORDER`.
///
/// # Examples
/// ```
/// use mc_moments::stats::raw_moment;
/// assert_eq!(raw_moment(&[1.0, 2.0, 3.0], 0), Some(1.0));
/// assert_eq!(raw_moment(&[1.0, 2.0, 3.0], 2), Some(14.0 / 3.0));
/// ```
pub fn raw_moment(data: &[f64], k: u32) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    if k == 0 {
        return Some(1.0);
    }
    let k = i32::try_from(k).ok()?;
    Some(kahan_sum(data.iter().map(|x| x.powi(k))) / data.len() as f64)
}

/// k-th central moment (1/N) Σ (xᵢ−μ)^k, or `None` if `data` is empty or
/// `k > MAX_ORDER`.
pub fn central_moment(data: &[f64], k: u32) -> Option<f64> {
    let mu = mean(data)?;
    if k == 0 {
        return Some(1.0);
    }
    let k = i32::try_from(k).ok()?;
    Some(kahan_sum(data.iter().map(|x| (x - mu).powi(k))) / data.len() as f64)
}

/// k-th standardized moment (1/N) Σ ((xᵢ−μ)/σ)^k with the population σ.
///
/// # Returns
/// - `None` if `data` is empty, if `k > MAX_ORDER` or, for `k > 0`, if
///   the data is constant.
///
/// # Examples
/// ```
/// use mc_moments::stats::standardized_moment;
/// // Symmetric data has zero skewness
/// let s = standardized_moment(&[1.0, 2.0, 3.0, 4.0, 5.0], 3).unwrap();
/// assert!(s.abs() < 1e-15);
/// assert_eq!(standardized_moment(&[2.0, 2.0], 3), None);
/// assert_eq!(standardized_moment(&[0.1, 0.1, 0.1], 3), None);
/// ```
pub fn standardized_moment(data: &[f64], k: u32) -> Option<f64> {
    let mu = mean(data)?;
    if k == 0 {
        return Some(1.0);
    }
    let k = i32::try_from(k).ok()?;
    // The rounded mean of a constant column can miss the value by an ulp
    if data.iter().all(|&x| x == data[0]) {
        return None;
    }
    let var = kahan_sum(data.iter().map(|x| (x - mu) * (x - mu))) / data.len() as f64;
    if var == 0.0 {
        return None;
    }
    let sigma = var.sqrt();
    Some(kahan_sum(data.iter().map(|x| ((x - mu) / sigma).powi(k))) / data.len() as f64)
}

fn moment_of(data: &[f64], k: u32, mode: MomentMode) -> Option<f64> {
    match mode {
        MomentMode::Raw => raw_moment(data, k),
        MomentMode::Central => central_moment(data, k),
        MomentMode::Standardized => standardized_moment(data, k),
    }
}

// ---------------------------------------------------------------------------
// Approximator
// ---------------------------------------------------------------------------

/// Per-dimension moment estimates over a shared sample collection.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use mc_moments::stats::{MomentMode, MonteCarloApproximator};
/// use mc_moments::vector::FixedVector;
///
/// let samples: Arc<[FixedVector]> = vec![
///     FixedVector::from([1.0, 2.0]),
///     FixedVector::from([3.0, 4.0]),
///     FixedVector::from([10.0, 11.0]),
///     FixedVector::from([12.0, 13.0]),
///     FixedVector::from([20.0, 26.0]),
/// ]
/// .into();
/// let mca = MonteCarloApproximator::new(samples).unwrap();
/// assert_eq!(mca.mean().as_slice(), &[9.2, 11.2]);
/// assert_eq!(mca.moment(1, MomentMode::Raw).unwrap(), mca.mean());
/// ```
#[derive(Debug, Clone)]
pub struct MonteCarloApproximator {
    samples: Samples,
    dim: usize,
}

impl MonteCarloApproximator {
    /// Takes shared ownership of `samples`.
    ///
    /// # Errors
    /// - [`MomentError::Empty`] if there are no samples.
    /// - [`MomentError::DimensionMismatch`] if the samples disagree on dimension.
    pub fn new(samples: Samples) -> Result<Self, MomentError> {
        let dim = samples.first().ok_or(MomentError::Empty)?.dim();
        if let Some((index, s)) = samples.iter().enumerate().find(|(_, s)| s.dim() != dim) {
            return Err(MomentError::DimensionMismatch {
                index,
                expected: dim,
                found: s.dim(),
            });
        }
        debug!("MonteCarloApproximator::new(n = {}, dim = {dim})", samples.len());
        Ok(Self { samples, dim })
    }

    /// The underlying samples.
    pub fn data(&self) -> &Samples {
        &self.samples
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always `false`; construction rejects empty collections.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    fn column(&self, d: usize) -> Vec<f64> {
        self.samples.iter().map(|s| s[d]).collect()
    }

    fn moment_dim(&self, d: usize, order: u32, mode: MomentMode) -> Result<f64, MomentError> {
        if order > MAX_ORDER {
            return Err(MomentError::InvalidOrder(i64::from(order)));
        }
        moment_of(&self.column(d), order, mode).ok_or(MomentError::Degenerate { dim: d })
    }

    /// Moment of the same `order` in every dimension.
    ///
    /// # Errors
    /// - [`MomentError::InvalidOrder`] if `order > MAX_ORDER`.
    /// - [`MomentError::Degenerate`] when `mode` is standardized, `order > 0`
    ///   and some dimension is constant.
    pub fn moment(&self, order: u32, mode: MomentMode) -> Result<FixedVector, MomentError> {
        (0..self.dim)
            .map(|d| self.moment_dim(d, order, mode))
            .collect::<Result<Vec<_>, _>>()
            .map(FixedVector::from)
    }

    /// Moment with a separate order per dimension.
    ///
    /// # Errors
    /// - [`MomentError::OrderCount`] if `orders.len() != self.dim()`.
    /// - [`MomentError::InvalidOrder`] and [`MomentError::Degenerate`] as for
    ///   [`moment`](Self::moment).
    pub fn moment_per_dim(&self, orders: &[u32], mode: MomentMode) -> Result<FixedVector, MomentError> {
        if orders.len() != self.dim {
            return Err(MomentError::OrderCount {
                expected: self.dim,
                found: orders.len(),
            });
        }
        orders
            .iter()
            .enumerate()
            .map(|(d, &k)| self.moment_dim(d, k, mode))
            .collect::<Result<Vec<_>, _>>()
            .map(FixedVector::from)
    }

    /// First raw moment.
    pub fn mean(&self) -> FixedVector {
        FixedVector::from_fn(self.dim, |d| {
            raw_moment(&self.column(d), 1).unwrap_or(f64::NAN)
        })
    }

    /// Second central moment (population variance).
    pub fn var(&self) -> FixedVector {
        FixedVector::from_fn(self.dim, |d| {
            central_moment(&self.column(d), 2).unwrap_or(f64::NAN)
        })
    }

    /// Square root of [`var`](Self::var).
    pub fn std(&self) -> FixedVector {
        self.var().sqrt()
    }

    /// Third standardized moment.
    pub fn skewness(&self) -> Result<FixedVector, MomentError> {
        self.moment(3, MomentMode::Standardized)
    }

    /// Fourth standardized moment (not excess kurtosis).
    pub fn kurtosis(&self) -> Result<FixedVector, MomentError> {
        self.moment(4, MomentMode::Standardized)
    }

    /// Fifth standardized moment.
    pub fn hyperskewness(&self) -> Result<FixedVector, MomentError> {
        self.moment(5, MomentMode::Standardized)
    }

    /// Sixth standardized moment.
    pub fn hypertailedness(&self) -> Result<FixedVector, MomentError> {
        self.moment(6, MomentMode::Standardized)
    }

    /// Evaluates a named statistic; `order` and `mode` only apply to
    /// [`Statistic::Moment`].
    pub fn statistic(&self, stat: Statistic, order: u32, mode: MomentMode) -> Result<FixedVector, MomentError> {
        match stat {
            Statistic::Moment => self.moment(order, mode),
            Statistic::Mean => Ok(self.mean()),
            Statistic::Variance => Ok(self.var()),
            Statistic::Std => Ok(self.std()),
            Statistic::Skewness => self.skewness(),
            Statistic::Kurtosis => self.kurtosis(),
            Statistic::Hyperskewness => self.hyperskewness(),
            Statistic::Hypertailedness => self.hypertailedness(),
        }
    }

    /// All named statistics at once.
    ///
    /// # Errors
    /// [`MomentError::Degenerate`] if any dimension has zero variance.
    pub fn summary(&self) -> Result<Summary, MomentError> {
        Ok(Summary {
            n: self.len(),
            mean: self.mean(),
            var: self.var(),
            std: self.std(),
            skewness: self.skewness()?,
            kurtosis: self.kurtosis()?,
            hyperskewness: self.hyperskewness()?,
            hypertailedness: self.hypertailedness()?,
        })
    }
}

/// Snapshot of the named statistics of a sample collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub n: usize,
    pub mean: FixedVector,
    pub var: FixedVector,
    pub std: FixedVector,
    pub skewness: FixedVector,
    pub kurtosis: FixedVector,
    pub hyperskewness: FixedVector,
    pub hypertailedness: FixedVector,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Samples: {}", self.n)?;
        writeln!(f, "Mean: {}", self.mean)?;
        writeln!(f, "Variance: {}", self.var)?;
        writeln!(f, "Standard deviation: {}", self.std)?;
        writeln!(f, "Skewness: {}", self.skewness)?;
        writeln!(f, "Kurtosis: {}", self.kurtosis)?;
        writeln!(f, "Hyperskewness: {}", self.hyperskewness)?;
        write!(f, "Hypertailedness: {}", self.hypertailedness)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use test_log::test;

    fn fixture() -> MonteCarloApproximator {
        let samples: Samples = vec![
            FixedVector::from([1.0, 2.0]),
            FixedVector::from([3.0, 4.0]),
            FixedVector::from([10.0, 11.0]),
            FixedVector::from([12.0, 13.0]),
            FixedVector::from([20.0, 26.0]),
        ]
        .into();
        MonteCarloApproximator::new(samples).unwrap()
    }

    fn assert_close(actual: &FixedVector, expected: &[f64]) {
        assert_eq!(actual.dim(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!(
                (a - e).abs() <= 1e-10 * e.abs().max(1.0),
                "expected {expected:?}, got {actual}"
            );
        }
    }

    // --- kahan_sum ---

    #[test]
    fn test_kahan_sum_basic() {
        assert!((kahan_sum([1.0, 2.0, 3.0]) - 6.0).abs() < 1e-15);
    }

    #[test]
    fn test_kahan_sum_precision() {
        let result = kahan_sum([1e16, 1.0, -1e16]);
        assert!(
            (result - 1.0).abs() < 1e-10,
            "Kahan sum should preserve the 1.0: got {result}"
        );
    }

    // --- approximator ---

    #[test]
    fn test_mean_exact() {
        assert_eq!(fixture().mean().as_slice(), &[9.2, 11.2]);
    }

    #[test]
    fn test_var() {
        assert_close(&fixture().var(), &[46.16, 71.76]);
    }

    #[test]
    fn test_std() {
        assert_close(&fixture().std(), &[6.7941151005852, 8.4711274338189]);
    }

    #[test]
    fn test_raw_moments() {
        let mca = fixture();
        assert_close(&mca.moment(2, MomentMode::Raw).unwrap(), &[130.8, 197.2]);
        assert_close(&mca.moment(3, MomentMode::Raw).unwrap(), &[2151.2, 4235.2]);
        assert_close(&mca.moment(4, MomentMode::Raw).unwrap(), &[38163.6, 100090.0]);
    }

    #[test]
    fn test_standardized_statistics() {
        let mca = fixture();
        assert_close(&mca.skewness().unwrap(), &[0.3140652553488, 0.6894953146694]);
        assert_close(&mca.kurtosis().unwrap(), &[1.8458905652557, 2.2464457891970]);
        assert_close(&mca.hyperskewness().unwrap(), &[1.3935649003221, 2.8648065866564]);
        assert_close(&mca.hypertailedness().unwrap(), &[3.9614845940708, 6.0915113577404]);
    }

    #[test]
    fn test_named_moments_agree() {
        let mca = fixture();
        assert_eq!(mca.moment(1, MomentMode::Raw).unwrap(), mca.mean());
        assert_eq!(mca.moment(2, MomentMode::Central).unwrap(), mca.var());
        assert_eq!(
            mca.statistic(Statistic::Kurtosis, 0, MomentMode::Raw).unwrap(),
            mca.kurtosis().unwrap()
        );
    }

    #[test]
    fn test_order_zero_is_one() {
        let mca = fixture();
        for mode in [MomentMode::Raw, MomentMode::Central, MomentMode::Standardized] {
            assert_eq!(mca.moment(0, mode).unwrap().as_slice(), &[1.0, 1.0]);
        }
    }

    #[test]
    fn test_first_central_moment_is_zero() {
        let c1 = fixture().moment(1, MomentMode::Central).unwrap();
        assert!(c1.iter().all(|x| x.abs() < 1e-12));
    }

    #[test]
    fn test_moment_per_dim() {
        let mca = fixture();
        let m = mca.moment_per_dim(&[1, 2], MomentMode::Raw).unwrap();
        assert_close(&m, &[9.2, 197.2]);
        assert_eq!(
            mca.moment_per_dim(&[1], MomentMode::Raw),
            Err(MomentError::OrderCount { expected: 2, found: 1 })
        );
    }

    #[test]
    fn test_degenerate_dimension() {
        let samples: Samples = vec![
            FixedVector::from([1.0, 5.0]),
            FixedVector::from([2.0, 5.0]),
            FixedVector::from([3.0, 5.0]),
        ]
        .into();
        let mca = MonteCarloApproximator::new(samples).unwrap();
        assert_eq!(mca.skewness(), Err(MomentError::Degenerate { dim: 1 }));
        assert!(mca.summary().is_err());
        assert_eq!(mca.var()[1], 0.0);
    }

    #[test]
    fn test_constant_columns_without_exact_binary_form() {
        for value in [0.1, 0.7, 1.1] {
            for n in [3, 7, 10] {
                let samples: Samples = (0..n).map(|_| FixedVector::from([value, value])).collect();
                let mca = MonteCarloApproximator::new(samples).unwrap();
                assert_eq!(mca.skewness(), Err(MomentError::Degenerate { dim: 0 }), "{n} x {value}");
                assert_eq!(
                    mca.moment(2, MomentMode::Standardized),
                    Err(MomentError::Degenerate { dim: 0 })
                );
                assert_eq!(mca.moment(0, MomentMode::Standardized).unwrap().as_slice(), &[1.0, 1.0]);
            }
        }
    }

    #[test]
    fn test_empty_and_mismatched() {
        let empty: Samples = Vec::new().into();
        assert_eq!(MonteCarloApproximator::new(empty).err(), Some(MomentError::Empty));

        let ragged: Samples = vec![FixedVector::from([1.0, 2.0]), FixedVector::from([1.0])].into();
        assert_eq!(
            MonteCarloApproximator::new(ragged).err(),
            Some(MomentError::DimensionMismatch {
                index: 1,
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn test_shared_samples() {
        let mca = fixture();
        let other = MonteCarloApproximator::new(Arc::clone(mca.data())).unwrap();
        assert!(Arc::ptr_eq(mca.data(), other.data()));
        assert_eq!(mca.var(), other.var());
        assert_eq!(Arc::strong_count(mca.data()), 2);
    }

    #[test]
    fn test_single_sample() {
        let samples: Samples = vec![FixedVector::from([4.0])].into();
        let mca = MonteCarloApproximator::new(samples).unwrap();
        assert_eq!(mca.mean()[0], 4.0);
        assert_eq!(mca.var()[0], 0.0);
        assert_eq!(mca.moment(2, MomentMode::Raw).unwrap()[0], 16.0);
    }

    #[test]
    fn test_parse_mode_and_statistic() {
        assert_eq!("central".parse::<MomentMode>(), Ok(MomentMode::Central));
        assert!("weird".parse::<MomentMode>().is_err());
        assert_eq!("var".parse::<Statistic>(), Ok(Statistic::Variance));
        assert_eq!("variance".parse::<Statistic>(), Ok(Statistic::Variance));
        assert!("median".parse::<Statistic>().is_err());
    }

    #[test]
    fn test_moment_order() {
        assert_eq!(moment_order(3), Ok(3));
        assert_eq!(moment_order(-1), Err(MomentError::InvalidOrder(-1)));
        assert_eq!(moment_order(i64::from(i32::MAX)), Ok(MAX_ORDER));
        assert_eq!(
            moment_order(4_294_967_295),
            Err(MomentError::InvalidOrder(4_294_967_295))
        );
        assert_eq!(
            moment_order(i64::from(i32::MAX) + 1),
            Err(MomentError::InvalidOrder(2_147_483_648))
        );
    }

    #[test]
    fn test_order_beyond_powi_range() {
        let samples: Samples = vec![FixedVector::from([2.0]), FixedVector::from([2.0])].into();
        let mca = MonteCarloApproximator::new(samples).unwrap();
        for mode in [MomentMode::Raw, MomentMode::Central, MomentMode::Standardized] {
            assert_eq!(
                mca.moment(u32::MAX, mode),
                Err(MomentError::InvalidOrder(4_294_967_295))
            );
        }
        assert_eq!(
            mca.moment_per_dim(&[MAX_ORDER + 1], MomentMode::Raw),
            Err(MomentError::InvalidOrder(2_147_483_648))
        );
        assert_eq!(raw_moment(&[2.0, 2.0], u32::MAX), None);
    }

    #[test]
    fn test_summary_display() {
        let text = fixture().summary().unwrap().to_string();
        assert!(text.starts_with("Samples: 5\nMean: 9.2 11.2"));
        assert!(text.contains("Kurtosis: "));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Strategy for generating finite f64 vectors of reasonable size.
    fn finite_vec(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
        proptest::collection::vec(-1e3_f64..1e3, min_len..=max_len)
    }

    fn approximator(data: &[f64]) -> MonteCarloApproximator {
        let samples: Samples = data.iter().map(|&x| FixedVector::from([x])).collect();
        MonteCarloApproximator::new(samples).unwrap()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        #[test]
        fn variance_non_negative(data in finite_vec(1, 100)) {
            let var = approximator(&data).var()[0];
            prop_assert!(var >= 0.0, "variance must be >= 0, got {}", var);
        }

        #[test]
        fn standardized_moment_is_scale_invariant(
            data in finite_vec(3, 60),
            scale in 0.01_f64..100.0,
            k in 1_u32..7,
        ) {
            let scaled: Vec<f64> = data.iter().map(|x| x * scale).collect();
            match (standardized_moment(&data, k), standardized_moment(&scaled, k)) {
                (Some(a), Some(b)) => {
                    let tol = 1e-6 * a.abs().max(1.0);
                    prop_assert!((a - b).abs() < tol, "k={}: {} vs {}", k, a, b);
                }
                (None, None) => {}
                (a, b) => prop_assert!(false, "degeneracy differs: {:?} vs {:?}", a, b),
            }
        }

        #[test]
        fn mean_is_shift_equivariant(data in finite_vec(1, 100), shift in -100.0_f64..100.0) {
            let shifted: Vec<f64> = data.iter().map(|x| x + shift).collect();
            let m = mean(&data).unwrap();
            let ms = mean(&shifted).unwrap();
            prop_assert!((ms - (m + shift)).abs() < 1e-9);
        }

        #[test]
        fn central_second_equals_var(data in finite_vec(1, 100)) {
            let mca = approximator(&data);
            prop_assert_eq!(mca.moment(2, MomentMode::Central).unwrap(), mca.var());
        }
    }
}
