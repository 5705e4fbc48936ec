//! # mc-moments
//!
//! Monte Carlo estimation of statistical moments of `Y = f(X)`, where `X`
//! follows a known distribution and `f` has no closed-form moments.
//!
//! The pipeline has three layers:
//!
//! 1. **Sampling**: [`distributions`] draws independent vectors from
//!    [`Uniform`](distributions::Uniform) or [`Normal`](distributions::Normal)
//!    by inverse-transform sampling.
//! 2. **Evaluation**: [`functions`] maps samples through parametric leaves
//!    combined with `+ - * /` into an [`Expr`](functions::Expr) tree.
//! 3. **Estimation**: [`stats`] computes raw, central and standardized
//!    moments per output dimension.
//!
//! ## Modules
//!
//! - [`vector`] — Fixed-dimension vectors with element-wise arithmetic
//! - [`special`] — Error function and its inverse
//! - [`random`] — Seeded generators
//! - [`distributions`] — Uniform and normal samplers
//! - [`functions`] — Parametric functions and their composition
//! - [`stats`] — Moment estimation with compensated summation
//! - [`io`] — Definition files and CSV export
//! - [`clt`] — Central limit theorem check
//!
//! ## Example
//!
//! ```
//! use mc_moments::distributions::Uniform;
//! use mc_moments::functions::{Expr, Function, Polynomial};
//! use mc_moments::random::create_rng;
//! use mc_moments::vector::FixedVector;
//!
//! // f(u) = u² on U(0, 1): E[f] = 1/3
//! let f = Expr::leaf(Polynomial::new(vec![
//!     FixedVector::from([0.0]),
//!     FixedVector::from([0.0]),
//!     FixedVector::from([1.0]),
//! ])?);
//! let dist = Uniform::broadcast(1, 0.0, 1.0)?;
//! let mut rng = create_rng(42);
//! let mca = f.mca(20_000, &dist, &mut rng)?;
//! assert!((mca.mean()[0] - 1.0 / 3.0).abs() < 0.01);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Design Philosophy
//!
//! - **Numerical stability first**: Neumaier summation for every moment
//! - **Explicit randomness**: every sampling call takes its generator
//! - **Property-based testing**: Mathematical invariants verified via proptest

pub mod clt;
pub mod distributions;
pub mod functions;
pub mod io;
pub mod random;
pub mod special;
pub mod stats;
pub mod vector;
