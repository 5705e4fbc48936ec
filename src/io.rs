//! Function definition files and CSV export.
//!
//! # Definition file format
//!
//! ```text
//! polynomial          <- kind keyword
//! 3 1 2               <- dim_inp dim_out [order]
//!                     <- blank separator
//! 1.0 0.5 0.0         <- coefficient rows
//! 2.0 1.0 1.0
//! 3.0 0.0 0.5
//! ```
//!
//! Coefficient rows depend on the kind:
//!
//! - `polynomial`, `exponential`/`sumexponential`, `logarithm`/`sumlogarithm`:
//!   `order + 1` rows of `dim_inp` values; `dim_out` must be 1.
//! - `linear`: one bias row of `dim_out` values, then `dim_out` rows of
//!   `dim_inp` values.
//! - `multipolynomial`: one bias row, then `order` blocks of `dim_out` rows
//!   of `dim_inp` values, block `k` holding the weights of `u^k`.
//!
//! When the order is omitted it is inferred from the number of rows. Blank
//! lines in the coefficient section are ignored.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, warn};

use crate::functions::{Expr, FunctionError, MultivariatePolynomial, Polynomial, SumExponential, SumLogarithm};
use crate::vector::FixedVector;

/// Error type for reading definition files.
#[derive(Debug)]
pub enum ParseError {
    Io(std::io::Error),
    /// The kind keyword on the first line is not recognised.
    UnknownKind { line: usize, kind: String },
    /// The dimension line is missing or malformed.
    MalformedHeader { line: usize, reason: String },
    /// A coefficient token is not a number (strict mode only).
    InvalidToken { line: usize, token: String },
    /// The coefficient rows do not fit the declared dimensions.
    Shape(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Io(e) => write!(f, "I/O error: {e}"),
            ParseError::UnknownKind { line, kind } => {
                write!(f, "line {line}: unknown function kind \"{kind}\"")
            }
            ParseError::MalformedHeader { line, reason } => write!(f, "line {line}: {reason}"),
            ParseError::InvalidToken { line, token } => {
                write!(f, "line {line}: cannot parse \"{token}\" as a coefficient")
            }
            ParseError::Shape(msg) => write!(f, "bad coefficient layout: {msg}"),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ParseError {
    fn from(e: std::io::Error) -> Self {
        ParseError::Io(e)
    }
}

/// How to treat coefficient tokens that are not numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Skip the offending row and log a warning.
    #[default]
    Lenient,
    /// Fail with [`ParseError::InvalidToken`].
    Strict,
}

/// Function family named on the first line of a definition file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    Polynomial,
    SumExponential,
    SumLogarithm,
    Linear,
    MultivariatePolynomial,
}

impl FromStr for FunctionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "polynomial" => Ok(FunctionKind::Polynomial),
            "exponential" | "sumexponential" => Ok(FunctionKind::SumExponential),
            "logarithm" | "sumlogarithm" => Ok(FunctionKind::SumLogarithm),
            "linear" => Ok(FunctionKind::Linear),
            "multipolynomial" => Ok(FunctionKind::MultivariatePolynomial),
            _ => Err(s.to_string()),
        }
    }
}

/// Parsed contents of a definition file, before any shape checks.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionFile {
    pub kind: FunctionKind,
    pub dim_inp: usize,
    pub dim_out: usize,
    pub order: Option<usize>,
    pub rows: Vec<Vec<f64>>,
}

impl FunctionFile {
    /// Parses the text of a definition file.
    ///
    /// # Errors
    /// [`ParseError::UnknownKind`], [`ParseError::MalformedHeader`], or in
    /// strict mode [`ParseError::InvalidToken`].
    pub fn parse(text: &str, mode: ParseMode) -> Result<Self, ParseError> {
        let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l.trim()));

        let (line, keyword) = lines.next().unwrap_or((1, ""));
        let kind = keyword
            .split_whitespace()
            .next()
            .unwrap_or("")
            .parse::<FunctionKind>()
            .map_err(|kind| ParseError::UnknownKind { line, kind })?;

        let (line, dims) = lines.next().ok_or(ParseError::MalformedHeader {
            line: 2,
            reason: "missing dimension line".into(),
        })?;
        let header = dims
            .split_whitespace()
            .map(|t| t.parse::<usize>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ParseError::MalformedHeader {
                line,
                reason: format!("dimensions must be non-negative integers ({e})"),
            })?;
        let (dim_inp, dim_out, order) = match header.as_slice() {
            [i, o] => (*i, *o, None),
            [i, o, k] => (*i, *o, Some(*k)),
            _ => {
                return Err(ParseError::MalformedHeader {
                    line,
                    reason: format!("expected \"dim_inp dim_out [order]\", got \"{dims}\""),
                })
            }
        };
        if dim_inp == 0 || dim_out == 0 {
            return Err(ParseError::MalformedHeader {
                line,
                reason: "dimensions must be positive".into(),
            });
        }

        let mut rows = Vec::new();
        for (line, text) in lines.filter(|(_, l)| !l.is_empty()) {
            match parse_row(text) {
                Ok(row) => rows.push(row),
                Err(token) => match mode {
                    ParseMode::Strict => return Err(ParseError::InvalidToken { line, token }),
                    ParseMode::Lenient => {
                        warn!("Cannot parse \"{token}\" as a coefficient (line {line}), skipping row");
                    }
                },
            }
        }

        debug!(
            "FunctionFile::parse(kind = {kind:?}, dim_inp = {dim_inp}, dim_out = {dim_out}, rows = {})",
            rows.len()
        );
        Ok(Self {
            kind,
            dim_inp,
            dim_out,
            order,
            rows,
        })
    }

    /// Reads and parses a definition file.
    pub fn read(path: impl AsRef<Path>, mode: ParseMode) -> Result<Self, ParseError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, mode)
    }

    /// Builds the function described by this file.
    ///
    /// # Errors
    /// [`ParseError::Shape`] (wrapped in [`FunctionError::Parse`]) when the
    /// rows do not match the declared dimensions and order.
    pub fn build(&self) -> Result<Expr, FunctionError> {
        match self.kind {
            FunctionKind::Polynomial | FunctionKind::SumExponential | FunctionKind::SumLogarithm => {
                if self.dim_out != 1 {
                    return Err(shape(format!(
                        "{:?} has scalar output, declared dim_out = {}",
                        self.kind, self.dim_out
                    )));
                }
                if let Some(order) = self.order {
                    self.expect_rows(order + 1)?;
                }
                let coefficients = self.vectors(&self.rows, self.dim_inp)?;
                Ok(match self.kind {
                    FunctionKind::Polynomial => Expr::leaf(Polynomial::new(coefficients)?),
                    FunctionKind::SumExponential => Expr::leaf(SumExponential::new(coefficients)?),
                    _ => Expr::leaf(SumLogarithm::new(coefficients)?),
                })
            }
            FunctionKind::Linear | FunctionKind::MultivariatePolynomial => {
                let order = match (self.kind, self.order) {
                    (FunctionKind::Linear, Some(k)) if k != 1 => {
                        return Err(shape(format!("linear function must have order 1, got {k}")));
                    }
                    (FunctionKind::Linear, _) => 1,
                    (_, Some(k)) => k,
                    (_, None) => self.rows.len().saturating_sub(1) / self.dim_out,
                };
                if order == 0 {
                    return Err(shape("at least one weight block is required".into()));
                }
                self.expect_rows(1 + order * self.dim_out)?;
                let bias = self.vectors(&self.rows[..1], self.dim_out)?.remove(0);
                let weights = self.rows[1..]
                    .chunks(self.dim_out)
                    .map(|block| self.vectors(block, self.dim_inp))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Expr::leaf(MultivariatePolynomial::new(bias, weights)?))
            }
        }
    }

    fn expect_rows(&self, expected: usize) -> Result<(), FunctionError> {
        if self.rows.len() != expected {
            return Err(shape(format!(
                "{:?} needs {expected} coefficient rows, found {}",
                self.kind,
                self.rows.len()
            )));
        }
        Ok(())
    }

    fn vectors(&self, rows: &[Vec<f64>], dim: usize) -> Result<Vec<FixedVector>, FunctionError> {
        rows.iter()
            .map(|r| {
                FixedVector::with_dim(dim, r.clone()).map_err(|e| shape(format!("{:?} row: {e}", self.kind)))
            })
            .collect()
    }
}

fn shape(msg: String) -> FunctionError {
    FunctionError::Parse(ParseError::Shape(msg))
}

/// Splits a row into numbers, returning the first bad token on failure.
fn parse_row(text: &str) -> Result<Vec<f64>, String> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(|t| t.parse::<f64>().map_err(|_| t.to_string()))
        .collect()
}

/// Loads a function from a definition file.
///
/// # Examples
/// ```no_run
/// use mc_moments::functions::Function;
/// use mc_moments::io::{load_function, ParseMode};
///
/// let f = load_function("poly.dat", ParseMode::Lenient)?;
/// println!("{} -> {}", f.dim_inp(), f.dim_out());
/// # Ok::<(), mc_moments::functions::FunctionError>(())
/// ```
pub fn load_function(path: impl AsRef<Path>, mode: ParseMode) -> Result<Expr, FunctionError> {
    let path = path.as_ref();
    debug!("load_function({})", path.display());
    FunctionFile::read(path, mode)?.build()
}

/// Writes one sample per row, comma separated, without a header.
///
/// Returns the path of the written file, `dir/name`.
pub fn write_csv(dir: impl AsRef<Path>, name: &str, samples: &[FixedVector]) -> std::io::Result<PathBuf> {
    let path = dir.as_ref().join(name);
    let mut out = BufWriter::new(File::create(&path)?);
    for sample in samples {
        for (i, x) in sample.iter().enumerate() {
            if i > 0 {
                out.write_all(b",")?;
            }
            write!(out, "{x}")?;
        }
        out.write_all(b"\n")?;
    }
    out.flush()?;
    debug!("write_csv({}, rows = {})", path.display(), samples.len());
    Ok(path)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::Function;
    use test_log::test;

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data").join(name)
    }

    #[test]
    fn test_load_polynomial() {
        let f = load_function(fixture("poly.dat"), ParseMode::Strict).unwrap();
        assert_eq!((f.dim_inp(), f.dim_out()), (3, 1));
        assert_eq!(f.name(), "polynomial");
        assert_eq!(f.call(&FixedVector::splat(3, 1.0))[0], 9.0);
        assert_eq!(f.call(&FixedVector::from([2.0, 0.0, 1.0]))[0], 19.0);
    }

    #[test]
    fn test_load_sum_exponential() {
        let f = load_function(fixture("sumexp.dat"), ParseMode::Strict).unwrap();
        let y = f.call(&FixedVector::from([2.0, 0.0, 1.0]))[0];
        let expected = 3.0 + 0.5 * 2.0_f64.exp() + 2.0 * 1.0_f64.exp();
        assert!((y - expected).abs() < 1e-12);
    }

    #[test]
    fn test_load_sum_logarithm() {
        let f = load_function(fixture("sumlog.dat"), ParseMode::Strict).unwrap();
        let y = f.call(&FixedVector::splat(3, 1.0))[0];
        let expected = 2.0 * 2.0_f64.ln() + 3.0 * 3.0_f64.ln();
        assert!((y - expected).abs() < 1e-12);
    }

    #[test]
    fn test_load_linear() {
        let f = load_function(fixture("linear.dat"), ParseMode::Strict).unwrap();
        assert_eq!((f.dim_inp(), f.dim_out()), (3, 4));
        let y = f.call(&FixedVector::from([1.0, 0.0, 1.0]));
        assert_eq!(y.as_slice(), &[7.2, 1.2, 4.5, 3.5]);
    }

    #[test]
    fn test_load_multipolynomial() {
        let f = load_function(fixture("multipoly.dat"), ParseMode::Strict).unwrap();
        assert_eq!((f.dim_inp(), f.dim_out()), (3, 2));
        let y = f.call(&FixedVector::from([2.0, 3.0, 1.0]));
        assert_eq!(y.as_slice(), &[17.0, 10.0]);
    }

    #[test]
    fn test_missing_file() {
        let err = load_function(fixture("does-not-exist.dat"), ParseMode::Lenient).unwrap_err();
        assert!(matches!(err, FunctionError::Parse(ParseError::Io(_))));
    }

    #[test]
    fn test_unknown_kind() {
        let err = FunctionFile::parse("spline\n1 1\n\n1\n", ParseMode::Lenient).unwrap_err();
        assert!(matches!(err, ParseError::UnknownKind { line: 1, ref kind } if kind == "spline"));
    }

    #[test]
    fn test_malformed_header() {
        for text in ["polynomial\n", "polynomial\n1\n", "polynomial\na b\n", "polynomial\n0 1\n"] {
            let err = FunctionFile::parse(text, ParseMode::Lenient).unwrap_err();
            assert!(matches!(err, ParseError::MalformedHeader { line: 2, .. }), "{text:?}: {err}");
        }
    }

    #[test]
    fn test_lenient_skips_bad_rows() {
        let text = "polynomial\n1 1\n\n1.0\nabc\n2.0\n";
        let file = FunctionFile::parse(text, ParseMode::Lenient).unwrap();
        assert_eq!(file.rows, vec![vec![1.0], vec![2.0]]);
        let f = file.build().unwrap();
        assert_eq!(f.call(&FixedVector::from([3.0]))[0], 7.0);
    }

    #[test]
    fn test_strict_rejects_bad_token() {
        let text = "polynomial\n1 1\n\n1.0\n2.0 x\n";
        let err = FunctionFile::parse(text, ParseMode::Strict).unwrap_err();
        assert!(matches!(err, ParseError::InvalidToken { line: 5, ref token } if token == "x"));
    }

    #[test]
    fn test_declared_order_must_match_rows() {
        let file = FunctionFile::parse("polynomial\n1 1 3\n\n1\n2\n", ParseMode::Strict).unwrap();
        assert!(matches!(file.build(), Err(FunctionError::Parse(ParseError::Shape(_)))));
    }

    #[test]
    fn test_scalar_kind_rejects_vector_output() {
        let file = FunctionFile::parse("exponential\n1 2\n\n1\n", ParseMode::Strict).unwrap();
        assert!(matches!(file.build(), Err(FunctionError::Parse(ParseError::Shape(_)))));
    }

    #[test]
    fn test_ragged_row() {
        let file = FunctionFile::parse("polynomial\n2 1\n\n1 2\n3\n", ParseMode::Strict).unwrap();
        assert!(matches!(file.build(), Err(FunctionError::Parse(ParseError::Shape(_)))));
    }

    #[test]
    fn test_inferred_multipolynomial_order() {
        let text = "multipolynomial\n1 1\n\n0.5\n1\n2\n";
        let f = FunctionFile::parse(text, ParseMode::Strict).unwrap().build().unwrap();
        // 0.5 + u + 2u²
        assert_eq!(f.call(&FixedVector::from([2.0]))[0], 10.5);
    }

    #[test]
    fn test_kind_aliases() {
        assert_eq!("sumexponential".parse(), Ok(FunctionKind::SumExponential));
        assert_eq!("Logarithm".parse(), Ok(FunctionKind::SumLogarithm));
        assert!("cubic".parse::<FunctionKind>().is_err());
    }

    #[test]
    fn test_write_csv() {
        let dir = std::env::temp_dir().join(format!("mc-moments-csv-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let samples = vec![FixedVector::from([1.0, 2.5]), FixedVector::from([-3.0, 0.125])];
        let path = write_csv(&dir, "samples.csv", &samples).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "1,2.5\n-3,0.125\n");
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
