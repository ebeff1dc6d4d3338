use std::error::Error;
use std::fmt;

pub use self::matrix::Matrix;
pub use self::parse::ParseError;

mod matrix;
mod parse;

pub type Value = f64;

pub trait ValueType {
    const ZERO: Self;
    const ONE: Self;
}

impl ValueType for f64 {
    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;
}

/// Raised when the operands of a matrix operation have incompatible dimensions.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ShapeError {
    /// Two operands whose `[rows, columns]` cannot be combined by `operation`.
    Mismatch {
        operation: &'static str,
        left: [usize; 2],
        right: [usize; 2],
    },
    /// A row of a nested array differs in length from the first row.
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    /// A flat buffer doesn't hold exactly the number of values required.
    Length { expected: usize, found: usize },
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mismatch {
                operation,
                left,
                right,
            } => write!(
                f,
                "cannot {operation} a {}x{} matrix with a {}x{} matrix",
                left[0], left[1], right[0], right[1],
            ),
            Self::Ragged {
                row,
                expected,
                found,
            } => write!(f, "row {row} has {found} values, expected {expected}"),
            Self::Length { expected, found } => {
                write!(f, "expected {expected} values, found {found}")
            }
        }
    }
}

impl Error for ShapeError {}
