//! Fixed-dimension numeric vectors.
//!
//! [`FixedVector`] is the value type passed between every other module:
//! distribution samples, function inputs and outputs, and per-dimension
//! statistics are all `FixedVector`s.
//!
//! The dimension is chosen at construction and never changes. Binary
//! operators between two vectors require equal dimensions and panic
//! otherwise; use [`FixedVector::try_zip`] for a fallible variant.

use std::fmt;
use std::ops::{Add, Div, Index, IndexMut, Mul, Neg, Sub};

use crate::stats::kahan_sum;

/// Error type for vector construction.
#[derive(Debug, Clone, PartialEq)]
pub enum VectorError {
    /// The number of values does not match the requested dimension.
    SizeMismatch { expected: usize, found: usize },
}

impl fmt::Display for VectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VectorError::SizeMismatch { expected, found } => {
                write!(f, "size mismatch: expected {expected} elements, found {found}")
            }
        }
    }
}

impl std::error::Error for VectorError {}

/// An ordered, fixed-length sequence of `f64` values.
///
/// # Examples
/// ```
/// use mc_moments::vector::FixedVector;
/// let a = FixedVector::from(vec![1.0, 2.0, 3.0]);
/// let b = FixedVector::splat(3, 1.0);
/// let c = &a + &b;
/// assert_eq!(c.as_slice(), &[2.0, 3.0, 4.0]);
/// assert_eq!((&c * 2.0).as_slice(), &[4.0, 6.0, 8.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FixedVector {
    data: Box<[f64]>,
}

impl FixedVector {
    /// Creates a vector of dimension `dim` with every element set to `value`.
    pub fn splat(dim: usize, value: f64) -> Self {
        Self {
            data: vec![value; dim].into_boxed_slice(),
        }
    }

    /// Creates a zero vector of dimension `dim`.
    pub fn zeros(dim: usize) -> Self {
        Self::splat(dim, 0.0)
    }

    /// Creates a vector of dimension `dim` from `values`.
    ///
    /// # Errors
    /// Returns [`VectorError::SizeMismatch`] if `values.len() != dim`.
    pub fn with_dim(dim: usize, values: Vec<f64>) -> Result<Self, VectorError> {
        if values.len() != dim {
            return Err(VectorError::SizeMismatch {
                expected: dim,
                found: values.len(),
            });
        }
        Ok(Self::from(values))
    }

    /// Builds a vector by evaluating `f` at every index.
    pub fn from_fn(dim: usize, f: impl FnMut(usize) -> f64) -> Self {
        Self {
            data: (0..dim).map(f).collect(),
        }
    }

    pub fn dim(&self) -> usize {
        self.data.len()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.data.to_vec()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.data.iter()
    }

    /// Returns the element at `idx`, or `None` when out of range.
    pub fn get(&self, idx: usize) -> Option<f64> {
        self.data.get(idx).copied()
    }

    /// Applies `f` to every element.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            data: self.data.iter().map(|&x| f(x)).collect(),
        }
    }

    /// Combines two vectors element-wise with `f`.
    ///
    /// # Errors
    /// Returns [`VectorError::SizeMismatch`] if the dimensions differ.
    pub fn try_zip(&self, other: &Self, f: impl Fn(f64, f64) -> f64) -> Result<Self, VectorError> {
        if self.dim() != other.dim() {
            return Err(VectorError::SizeMismatch {
                expected: self.dim(),
                found: other.dim(),
            });
        }
        Ok(Self {
            data: self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(&a, &b)| f(a, b))
                .collect(),
        })
    }

    fn zip(&self, other: &Self, f: impl Fn(f64, f64) -> f64) -> Self {
        assert_eq!(
            self.dim(),
            other.dim(),
            "element-wise operation on vectors of different dimension"
        );
        Self {
            data: self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(&a, &b)| f(a, b))
                .collect(),
        }
    }

    pub fn abs(&self) -> Self {
        self.map(f64::abs)
    }

    pub fn exp(&self) -> Self {
        self.map(f64::exp)
    }

    /// Element-wise natural logarithm. Non-positive elements yield `-inf` or NaN.
    pub fn ln(&self) -> Self {
        self.map(f64::ln)
    }

    pub fn sqrt(&self) -> Self {
        self.map(f64::sqrt)
    }

    /// Element-wise integer power.
    pub fn powi(&self, k: i32) -> Self {
        self.map(|x| x.powi(k))
    }

    /// Sum of all elements, compensated with [`kahan_sum`].
    pub fn sum(&self) -> f64 {
        kahan_sum(self.data.iter().copied())
    }

    /// Inner product.
    ///
    /// # Panics
    /// Panics if the dimensions differ.
    pub fn dot(&self, other: &Self) -> f64 {
        assert_eq!(self.dim(), other.dim(), "dot product of vectors of different dimension");
        kahan_sum(self.data.iter().zip(other.data.iter()).map(|(a, b)| a * b))
    }
}

impl From<Vec<f64>> for FixedVector {
    fn from(values: Vec<f64>) -> Self {
        Self {
            data: values.into_boxed_slice(),
        }
    }
}

impl From<&[f64]> for FixedVector {
    fn from(values: &[f64]) -> Self {
        Self { data: values.into() }
    }
}

impl<const N: usize> From<[f64; N]> for FixedVector {
    fn from(values: [f64; N]) -> Self {
        Self {
            data: Box::new(values),
        }
    }
}

impl FromIterator<f64> for FixedVector {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().collect(),
        }
    }
}

impl Index<usize> for FixedVector {
    type Output = f64;

    fn index(&self, idx: usize) -> &f64 {
        &self.data[idx]
    }
}

impl IndexMut<usize> for FixedVector {
    fn index_mut(&mut self, idx: usize) -> &mut f64 {
        &mut self.data[idx]
    }
}

impl<'a> IntoIterator for &'a FixedVector {
    type Item = &'a f64;
    type IntoIter = std::slice::Iter<'a, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

impl fmt::Display for FixedVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, x) in self.data.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{x}")?;
        }
        Ok(())
    }
}

impl Neg for &FixedVector {
    type Output = FixedVector;

    fn neg(self) -> FixedVector {
        self.map(|x| -x)
    }
}

impl Neg for FixedVector {
    type Output = FixedVector;

    fn neg(self) -> FixedVector {
        -&self
    }
}

// Element-wise arithmetic between vectors and with scalars. The by-value
// forms forward to the by-reference ones.
macro_rules! impl_elementwise {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait<&FixedVector> for &FixedVector {
            type Output = FixedVector;

            fn $method(self, rhs: &FixedVector) -> FixedVector {
                self.zip(rhs, |a, b| a $op b)
            }
        }

        impl $trait<FixedVector> for FixedVector {
            type Output = FixedVector;

            fn $method(self, rhs: FixedVector) -> FixedVector {
                (&self).$method(&rhs)
            }
        }

        impl $trait<&FixedVector> for FixedVector {
            type Output = FixedVector;

            fn $method(self, rhs: &FixedVector) -> FixedVector {
                (&self).$method(rhs)
            }
        }

        impl $trait<f64> for &FixedVector {
            type Output = FixedVector;

            fn $method(self, rhs: f64) -> FixedVector {
                self.map(|a| a $op rhs)
            }
        }

        impl $trait<f64> for FixedVector {
            type Output = FixedVector;

            fn $method(self, rhs: f64) -> FixedVector {
                (&self).$method(rhs)
            }
        }
    };
}

impl_elementwise!(Add, add, +);
impl_elementwise!(Sub, sub, -);
impl_elementwise!(Mul, mul, *);
impl_elementwise!(Div, div, /);
