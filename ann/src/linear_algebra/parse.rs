use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;

use super::{Matrix, Value};

/// Reads whitespace-separated values, one matrix row per line.
///
/// Reading stops at the first blank line, so trailing content after a blank
/// line is ignored.
impl FromStr for Matrix {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut values = Vec::new();
        let mut rows = 0;
        let mut columns = None;

        for (line_number, line) in s.lines().enumerate() {
            if line.trim().is_empty() {
                break;
            }

            let start = values.len();
            for token in line.split_whitespace() {
                let value = token.parse::<Value>().map_err(|_| ParseError::Value {
                    line: line_number + 1,
                    token: token.to_owned(),
                })?;
                values.push(value);
            }

            let found = values.len() - start;
            match columns {
                None => columns = Some(found),
                Some(expected) if expected != found => {
                    return Err(ParseError::Ragged {
                        line: line_number + 1,
                        expected,
                        found,
                    });
                }
                _ => {}
            }

            rows += 1;
        }

        Ok(Matrix {
            values,
            dim: [rows, columns.unwrap_or(0)],
        })
    }
}

impl Matrix {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        fs::read_to_string(path)?.parse()
    }
}

#[derive(Debug)]
pub enum ParseError {
    Io(io::Error),
    Value { line: usize, token: String },
    Ragged {
        line: usize,
        expected: usize,
        found: usize,
    },
}

impl From<io::Error> for ParseError {
    fn from(error: io::Error) -> Self {
        Self::Io(error)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(error) => write!(f, "could not read matrix: {error}"),
            Self::Value { line, token } => write!(f, "line {line}: invalid number {token:?}"),
            Self::Ragged {
                line,
                expected,
                found,
            } => write!(f, "line {line}: found {found} values, expected {expected}"),
        }
    }
}

impl Error for ParseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(error) => Some(error),
            _ => None,
        }
    }
}
