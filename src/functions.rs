//! Parametric functions of random vectors and their composition algebra.
//!
//! A [`Function`] maps an input [`FixedVector`] of dimension `dim_inp` to
//! an output of dimension `dim_out`. Four coefficient-driven leaf families
//! are provided:
//!
//! | Family | Output | Formula |
//! |---|---|---|
//! | [`Polynomial`] | scalar | Σₖ Σ_d cₖ[d]·u_d^k |
//! | [`SumExponential`] | scalar | Σₖ Σ_d cₖ[d]·exp(k·u_d) |
//! | [`SumLogarithm`] | scalar | Σₖ Σ_d cₖ[d]·ln((k+1)·u_d) |
//! | [`MultivariatePolynomial`] | vector | b + Σₖ Aₖ·u^k, k ≥ 1 |
//!
//! Leaves are combined into an [`Expr`] tree with `+ - * /`. Every node
//! holds its operands through `Arc`, so a combination can never outlive
//! what it evaluates. Evaluation is lazy: a combined expression computes
//! both operands at call time and merges the outputs element-wise.
//!
//! Chains group to the left, both for operators and for the variadic
//! constructors: `f1 - f2 - f3` and `Expr::difference([f1, f2, f3])` both
//! evaluate `(f1 - f2) - f3`.

use std::fmt;
use std::ops::{Add, Div, Mul, Sub};
use std::sync::Arc;

use log::debug;
use rand::Rng;

use crate::distributions::{Distribution, Samples};
use crate::io::ParseError;
use crate::stats::{kahan_sum, MomentError, MonteCarloApproximator};
use crate::vector::FixedVector;

/// Error type for building and evaluating functions.
#[derive(Debug)]
pub enum FunctionError {
    /// Two dimensions that must agree do not.
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },
    /// Coefficients are missing or ragged.
    InvalidCoefficients(String),
    /// A variadic combination was given no operands.
    NoOperands,
    /// Moment estimation over the outputs failed.
    Moment(MomentError),
    /// A definition file could not be read.
    Parse(ParseError),
}

impl fmt::Display for FunctionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionError::DimensionMismatch {
                context,
                expected,
                found,
            } => write!(f, "{context}: expected dimension {expected}, found {found}"),
            FunctionError::InvalidCoefficients(msg) => write!(f, "invalid coefficients: {msg}"),
            FunctionError::NoOperands => write!(f, "cannot combine an empty list of functions"),
            FunctionError::Moment(e) => write!(f, "moment estimation failed: {e}"),
            FunctionError::Parse(e) => write!(f, "cannot load function: {e}"),
        }
    }
}

impl std::error::Error for FunctionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FunctionError::Moment(e) => Some(e),
            FunctionError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MomentError> for FunctionError {
    fn from(e: MomentError) -> Self {
        FunctionError::Moment(e)
    }
}

impl From<ParseError> for FunctionError {
    fn from(e: ParseError) -> Self {
        FunctionError::Parse(e)
    }
}

/// A deterministic mapping from `dim_inp`-vectors to `dim_out`-vectors.
pub trait Function: fmt::Debug + Send + Sync {
    fn dim_inp(&self) -> usize;

    fn dim_out(&self) -> usize;

    /// Short label used in logs and in the `Display` of expressions.
    fn name(&self) -> &'static str {
        "function"
    }

    /// Evaluates the function at a single point.
    ///
    /// # Panics
    /// Implementations panic if `x.dim() != self.dim_inp()`.
    fn call(&self, x: &FixedVector) -> FixedVector;

    /// Evaluates the function at every sample, preserving order.
    fn apply(&self, samples: &[FixedVector]) -> Samples {
        samples.iter().map(|x| self.call(x)).collect()
    }

    /// Draws `n` inputs from `dist`, evaluates the function on them and
    /// wraps the outputs in a [`MonteCarloApproximator`].
    ///
    /// # Errors
    /// - [`FunctionError::DimensionMismatch`] if `dist.dim() != self.dim_inp()`.
    /// - [`FunctionError::Moment`] with [`MomentError::Empty`] if `n == 0`.
    fn mca<D, R>(&self, n: usize, dist: &D, rng: &mut R) -> Result<MonteCarloApproximator, FunctionError>
    where
        Self: Sized,
        D: Distribution,
        R: Rng + ?Sized,
    {
        if dist.dim() != self.dim_inp() {
            return Err(FunctionError::DimensionMismatch {
                context: "distribution",
                expected: self.dim_inp(),
                found: dist.dim(),
            });
        }
        let inputs = dist.samples(n, rng);
        Ok(MonteCarloApproximator::new(self.apply(&inputs))?)
    }

    /// Monte Carlo estimate of E[f(X)] from `n` draws.
    fn mean<D, R>(&self, n: usize, dist: &D, rng: &mut R) -> Result<FixedVector, FunctionError>
    where
        Self: Sized,
        D: Distribution,
        R: Rng + ?Sized,
    {
        Ok(self.mca(n, dist, rng)?.mean())
    }

    /// Monte Carlo estimate of Var[f(X)] from `n` draws.
    fn var<D, R>(&self, n: usize, dist: &D, rng: &mut R) -> Result<FixedVector, FunctionError>
    where
        Self: Sized,
        D: Distribution,
        R: Rng + ?Sized,
    {
        Ok(self.mca(n, dist, rng)?.var())
    }
}

// ============================================================================
// Scalar leaves
// ============================================================================

/// Checks that a coefficient table is non-empty and rectangular, and
/// returns its row dimension.
fn coefficient_dim(name: &str, coefficients: &[FixedVector]) -> Result<usize, FunctionError> {
    let first = coefficients
        .first()
        .ok_or_else(|| FunctionError::InvalidCoefficients(format!("{name} needs at least one coefficient row")))?;
    let dim = first.dim();
    if dim == 0 {
        return Err(FunctionError::InvalidCoefficients(format!(
            "{name} coefficient rows must not be empty"
        )));
    }
    if let Some(row) = coefficients.iter().find(|c| c.dim() != dim) {
        return Err(FunctionError::DimensionMismatch {
            context: "coefficient row",
            expected: dim,
            found: row.dim(),
        });
    }
    Ok(dim)
}

/// Σₖ Σ_d cₖ[d]·basis(k, x)[d], accumulated in increasing `k`.
fn weighted_basis_sum(coefficients: &[FixedVector], x: &FixedVector, basis: impl Fn(usize, &FixedVector) -> FixedVector) -> FixedVector {
    let y = kahan_sum(
        coefficients
            .iter()
            .enumerate()
            .map(|(k, c)| (c * &basis(k, x)).sum()),
    );
    FixedVector::from([y])
}

/// Scalar polynomial `p(u) = Σₖ Σ_d cₖ[d]·u_d^k`.
///
/// Row `k` of the coefficient table weights the k-th power of every input
/// component; the per-dimension terms are summed into one output value.
///
/// # Examples
/// ```
/// use mc_moments::functions::{Function, Polynomial};
/// use mc_moments::vector::FixedVector;
///
/// // p(u) = 1 + 2u + 3u²
/// let p = Polynomial::new(vec![
///     FixedVector::from([1.0]),
///     FixedVector::from([2.0]),
///     FixedVector::from([3.0]),
/// ])
/// .unwrap();
/// assert_eq!(p.call(&FixedVector::from([2.0]))[0], 17.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    coefficients: Vec<FixedVector>,
}

impl Polynomial {
    /// # Errors
    /// [`FunctionError::InvalidCoefficients`] or
    /// [`FunctionError::DimensionMismatch`] for an empty or ragged table.
    pub fn new(coefficients: Vec<FixedVector>) -> Result<Self, FunctionError> {
        let dim = coefficient_dim("polynomial", &coefficients)?;
        debug!("Polynomial::new(dim_inp = {dim}, order = {})", coefficients.len() - 1);
        Ok(Self { coefficients })
    }

    /// Highest power.
    pub fn order(&self) -> usize {
        self.coefficients.len() - 1
    }

    pub fn coefficients(&self) -> &[FixedVector] {
        &self.coefficients
    }
}

impl Function for Polynomial {
    fn dim_inp(&self) -> usize {
        self.coefficients[0].dim()
    }

    fn dim_out(&self) -> usize {
        1
    }

    fn name(&self) -> &'static str {
        "polynomial"
    }

    fn call(&self, x: &FixedVector) -> FixedVector {
        weighted_basis_sum(&self.coefficients, x, |k, x| x.powi(k as i32))
    }
}

/// Scalar sum of exponentials `f(u) = Σₖ Σ_d cₖ[d]·exp(k·u_d)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SumExponential {
    coefficients: Vec<FixedVector>,
}

impl SumExponential {
    /// # Errors
    /// Same conditions as [`Polynomial::new`].
    pub fn new(coefficients: Vec<FixedVector>) -> Result<Self, FunctionError> {
        let dim = coefficient_dim("sum of exponentials", &coefficients)?;
        debug!("SumExponential::new(dim_inp = {dim}, order = {})", coefficients.len() - 1);
        Ok(Self { coefficients })
    }

    pub fn order(&self) -> usize {
        self.coefficients.len() - 1
    }
}

impl Function for SumExponential {
    fn dim_inp(&self) -> usize {
        self.coefficients[0].dim()
    }

    fn dim_out(&self) -> usize {
        1
    }

    fn name(&self) -> &'static str {
        "exponential"
    }

    fn call(&self, x: &FixedVector) -> FixedVector {
        weighted_basis_sum(&self.coefficients, x, |k, x| (x * k as f64).exp())
    }
}

/// Scalar sum of logarithms `f(u) = Σₖ Σ_d cₖ[d]·ln((k+1)·u_d)`.
///
/// Non-positive inputs are not guarded and produce `-inf` or NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct SumLogarithm {
    coefficients: Vec<FixedVector>,
}

impl SumLogarithm {
    /// # Errors
    /// Same conditions as [`Polynomial::new`].
    pub fn new(coefficients: Vec<FixedVector>) -> Result<Self, FunctionError> {
        let dim = coefficient_dim("sum of logarithms", &coefficients)?;
        debug!("SumLogarithm::new(dim_inp = {dim}, order = {})", coefficients.len() - 1);
        Ok(Self { coefficients })
    }

    pub fn order(&self) -> usize {
        self.coefficients.len() - 1
    }
}

impl Function for SumLogarithm {
    fn dim_inp(&self) -> usize {
        self.coefficients[0].dim()
    }

    fn dim_out(&self) -> usize {
        1
    }

    fn name(&self) -> &'static str {
        "logarithm"
    }

    fn call(&self, x: &FixedVector) -> FixedVector {
        weighted_basis_sum(&self.coefficients, x, |k, x| (x * (k + 1) as f64).ln())
    }
}

// ============================================================================
// Vector leaf
// ============================================================================

/// Vector-valued polynomial `p(u) = b + Σₖ Aₖ·u^k` for `k = 1..=order`.
///
/// `b` has `dim_out` entries and every `Aₖ` is a `dim_out × dim_inp`
/// matrix stored as `dim_out` rows. The power `u^k` is element-wise.
///
/// # Examples
/// ```
/// use mc_moments::functions::{Function, MultivariatePolynomial};
/// use mc_moments::vector::FixedVector;
///
/// // L(u) = b + A·u
/// let l = MultivariatePolynomial::linear(
///     FixedVector::from([1.0, 0.0]),
///     vec![FixedVector::from([1.0, 2.0]), FixedVector::from([0.0, -1.0])],
/// )
/// .unwrap();
/// let y = l.call(&FixedVector::from([3.0, 4.0]));
/// assert_eq!(y.as_slice(), &[12.0, -4.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MultivariatePolynomial {
    bias: FixedVector,
    weights: Vec<Vec<FixedVector>>,
}

impl MultivariatePolynomial {
    /// Builds `b + Σₖ Aₖ·u^k` where `weights[k - 1]` is `Aₖ`.
    ///
    /// # Errors
    /// - [`FunctionError::InvalidCoefficients`] if `bias` is empty or no
    ///   weight matrix is given.
    /// - [`FunctionError::DimensionMismatch`] if a matrix does not have
    ///   `bias.dim()` rows or the rows disagree on length.
    pub fn new(bias: FixedVector, weights: Vec<Vec<FixedVector>>) -> Result<Self, FunctionError> {
        if bias.dim() == 0 {
            return Err(FunctionError::InvalidCoefficients(
                "bias vector must not be empty".into(),
            ));
        }
        let first = weights.first().ok_or_else(|| {
            FunctionError::InvalidCoefficients("at least one weight matrix is required".into())
        })?;
        let dim_inp = coefficient_dim("weight matrix", first)?;
        for matrix in &weights {
            if matrix.len() != bias.dim() {
                return Err(FunctionError::DimensionMismatch {
                    context: "weight matrix rows",
                    expected: bias.dim(),
                    found: matrix.len(),
                });
            }
            if let Some(row) = matrix.iter().find(|r| r.dim() != dim_inp) {
                return Err(FunctionError::DimensionMismatch {
                    context: "weight matrix columns",
                    expected: dim_inp,
                    found: row.dim(),
                });
            }
        }
        debug!(
            "MultivariatePolynomial::new(dim_inp = {dim_inp}, dim_out = {}, order = {})",
            bias.dim(),
            weights.len()
        );
        Ok(Self { bias, weights })
    }

    /// Affine map `b + A·u`.
    pub fn linear(bias: FixedVector, weights: Vec<FixedVector>) -> Result<Self, FunctionError> {
        Self::new(bias, vec![weights])
    }

    pub fn order(&self) -> usize {
        self.weights.len()
    }

    pub fn bias(&self) -> &FixedVector {
        &self.bias
    }
}

impl Function for MultivariatePolynomial {
    fn dim_inp(&self) -> usize {
        self.weights[0][0].dim()
    }

    fn dim_out(&self) -> usize {
        self.bias.dim()
    }

    fn name(&self) -> &'static str {
        if self.weights.len() == 1 {
            "linear"
        } else {
            "multipolynomial"
        }
    }

    fn call(&self, x: &FixedVector) -> FixedVector {
        let powers: Vec<FixedVector> = (1..=self.weights.len()).map(|k| x.powi(k as i32)).collect();
        FixedVector::from_fn(self.dim_out(), |i| {
            let terms = self.weights.iter().zip(&powers).map(|(matrix, power)| matrix[i].dot(power));
            kahan_sum(std::iter::once(self.bias[i]).chain(terms))
        })
    }
}

// ============================================================================
// Expression tree
// ============================================================================

/// Element-wise arithmetic operator joining two sub-expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn eval(self, lhs: &FixedVector, rhs: &FixedVector) -> FixedVector {
        match self {
            BinaryOp::Add => lhs + rhs,
            BinaryOp::Sub => lhs - rhs,
            BinaryOp::Mul => lhs * rhs,
            BinaryOp::Div => lhs / rhs,
        }
    }

    fn symbol(self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div => '/',
        }
    }
}

/// A function built from leaves and element-wise operators.
///
/// Cloning is cheap: sub-trees and leaves are reference counted.
///
/// # Examples
/// ```
/// use mc_moments::functions::{Expr, Function, Polynomial};
/// use mc_moments::vector::FixedVector;
///
/// let f = Expr::leaf(Polynomial::new(vec![FixedVector::from([1.0]), FixedVector::from([1.0])]).unwrap());
/// let g = Expr::leaf(Polynomial::new(vec![FixedVector::from([0.0]), FixedVector::from([2.0])]).unwrap());
/// let h = &f * &g - &f; // (1 + u)·2u - (1 + u)
/// assert_eq!(h.call(&FixedVector::from([1.0]))[0], 2.0);
/// ```
#[derive(Debug, Clone)]
pub enum Expr {
    Leaf(Arc<dyn Function>),
    Binary {
        op: BinaryOp,
        lhs: Arc<Expr>,
        rhs: Arc<Expr>,
    },
}

impl Expr {
    /// Wraps a function as a leaf.
    pub fn leaf(f: impl Function + 'static) -> Self {
        Expr::Leaf(Arc::new(f))
    }

    /// Joins two expressions with `op`.
    ///
    /// # Errors
    /// [`FunctionError::DimensionMismatch`] if the operands differ in input
    /// or output dimension.
    pub fn combine(op: BinaryOp, lhs: Expr, rhs: Expr) -> Result<Self, FunctionError> {
        if lhs.dim_inp() != rhs.dim_inp() {
            return Err(FunctionError::DimensionMismatch {
                context: "operand input",
                expected: lhs.dim_inp(),
                found: rhs.dim_inp(),
            });
        }
        if lhs.dim_out() != rhs.dim_out() {
            return Err(FunctionError::DimensionMismatch {
                context: "operand output",
                expected: lhs.dim_out(),
                found: rhs.dim_out(),
            });
        }
        Ok(Expr::Binary {
            op,
            lhs: Arc::new(lhs),
            rhs: Arc::new(rhs),
        })
    }

    fn fold(op: BinaryOp, operands: impl IntoIterator<Item = Expr>) -> Result<Self, FunctionError> {
        let mut operands = operands.into_iter();
        let first = operands.next().ok_or(FunctionError::NoOperands)?;
        operands.try_fold(first, |acc, e| Expr::combine(op, acc, e))
    }

    /// `f1 + f2 + … + fn`.
    pub fn sum(operands: impl IntoIterator<Item = Expr>) -> Result<Self, FunctionError> {
        Self::fold(BinaryOp::Add, operands)
    }

    /// `((f1 - f2) - f3) - …`.
    pub fn difference(operands: impl IntoIterator<Item = Expr>) -> Result<Self, FunctionError> {
        Self::fold(BinaryOp::Sub, operands)
    }

    /// `f1 * f2 * … * fn`.
    pub fn product(operands: impl IntoIterator<Item = Expr>) -> Result<Self, FunctionError> {
        Self::fold(BinaryOp::Mul, operands)
    }

    /// `((f1 / f2) / f3) / …`.
    pub fn quotient(operands: impl IntoIterator<Item = Expr>) -> Result<Self, FunctionError> {
        Self::fold(BinaryOp::Div, operands)
    }

    /// Number of leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        match self {
            Expr::Leaf(_) => 1,
            Expr::Binary { lhs, rhs, .. } => lhs.leaf_count() + rhs.leaf_count(),
        }
    }
}

impl Function for Expr {
    fn dim_inp(&self) -> usize {
        match self {
            Expr::Leaf(f) => f.dim_inp(),
            Expr::Binary { lhs, .. } => lhs.dim_inp(),
        }
    }

    fn dim_out(&self) -> usize {
        match self {
            Expr::Leaf(f) => f.dim_out(),
            Expr::Binary { lhs, .. } => lhs.dim_out(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Expr::Leaf(f) => f.name(),
            Expr::Binary { .. } => "expression",
        }
    }

    fn call(&self, x: &FixedVector) -> FixedVector {
        match self {
            Expr::Leaf(f) => f.call(x),
            Expr::Binary { op, lhs, rhs } => op.eval(&lhs.call(x), &rhs.call(x)),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Leaf(leaf) => f.write_str(leaf.name()),
            Expr::Binary { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
        }
    }
}

fn combine_or_panic(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    match Expr::combine(op, lhs, rhs) {
        Ok(e) => e,
        Err(err) => panic!("cannot combine functions: {err}"),
    }
}

// Operators on expressions. Dimension mismatches panic; use
// `Expr::combine` to handle them as errors.
macro_rules! impl_expr_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl $trait<Expr> for Expr {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                combine_or_panic($op, self, rhs)
            }
        }

        impl $trait<&Expr> for &Expr {
            type Output = Expr;

            fn $method(self, rhs: &Expr) -> Expr {
                combine_or_panic($op, self.clone(), rhs.clone())
            }
        }

        impl $trait<&Expr> for Expr {
            type Output = Expr;

            fn $method(self, rhs: &Expr) -> Expr {
                combine_or_panic($op, self, rhs.clone())
            }
        }

        impl $trait<Expr> for &Expr {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                combine_or_panic($op, self.clone(), rhs)
            }
        }
    };
}

impl_expr_op!(Add, add, BinaryOp::Add);
impl_expr_op!(Sub, sub, BinaryOp::Sub);
impl_expr_op!(Mul, mul, BinaryOp::Mul);
impl_expr_op!(Div, div, BinaryOp::Div);

// ============================================================================
// Tests
// ============================================================================
