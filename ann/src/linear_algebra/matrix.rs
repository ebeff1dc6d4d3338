use std::fmt;
use std::ops::{
    Add, AddAssign, Div, DivAssign, Index, IndexMut, Mul, MulAssign, Neg, Range, Sub, SubAssign,
};

use super::{ShapeError, Value, ValueType};

/// A dense matrix, stored row by row.
#[derive(Clone, Default, PartialEq)]
pub struct Matrix {
    pub(super) values: Vec<Value>,
    pub(super) dim: [usize; 2],
}

impl Matrix {
    pub fn zeros(rows: usize, columns: usize) -> Self {
        Self {
            values: vec![Value::ZERO; rows * columns],
            dim: [rows, columns],
        }
    }

    pub fn ones(rows: usize, columns: usize) -> Self {
        Self {
            values: vec![Value::ONE; rows * columns],
            dim: [rows, columns],
        }
    }

    pub fn from_vec(rows: usize, columns: usize, values: Vec<Value>) -> Result<Self, ShapeError> {
        if values.len() != rows * columns {
            return Err(ShapeError::Length {
                expected: rows * columns,
                found: values.len(),
            });
        }

        Ok(Self {
            values,
            dim: [rows, columns],
        })
    }

    /// Builds a matrix from nested rows. Every row must be as long as the first.
    pub fn from_rows<R: AsRef<[Value]>>(rows: &[R]) -> Result<Self, ShapeError> {
        let columns = rows.first().map_or(0, |row| row.as_ref().len());

        let mut values = Vec::with_capacity(rows.len() * columns);
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != columns {
                return Err(ShapeError::Ragged {
                    row: i,
                    expected: columns,
                    found: row.len(),
                });
            }
            values.extend_from_slice(row);
        }

        Ok(Self {
            values,
            dim: [rows.len(), columns],
        })
    }

    pub fn rows(&self) -> usize {
        self.dim[0]
    }

    pub fn columns(&self) -> usize {
        self.dim[1]
    }

    pub fn dim(&self) -> [usize; 2] {
        self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn row(&self, row: usize) -> &[Value] {
        let columns = self.columns();
        &self.values[row * columns..(row + 1) * columns]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [Value] {
        let columns = self.columns();
        &mut self.values[row * columns..(row + 1) * columns]
    }

    pub fn iter(&self) -> impl Iterator<Item = &[Value]> {
        (0..self.rows()).map(move |row| self.row(row))
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Value> {
        self.values.iter_mut()
    }

    pub fn to_rows(&self) -> Vec<Vec<Value>> {
        self.iter().map(<[Value]>::to_vec).collect()
    }

    /// Applies `f` to every element.
    pub fn map(&self, f: impl Fn(Value) -> Value) -> Self {
        Self {
            values: self.values.iter().map(|&x| f(x)).collect(),
            dim: self.dim,
        }
    }

    /// The sum of every element.
    pub fn sum(&self) -> Value {
        self.values.iter().sum()
    }

    pub fn transpose(&self) -> Self {
        let [rows, columns] = self.dim;
        let mut result = Self::zeros(columns, rows);
        for row in 0..rows {
            for column in 0..columns {
                result[column][row] = self[row][column];
            }
        }
        result
    }

    /// The matrix product `self · rhs`.
    pub fn matmul(&self, rhs: &Self) -> Result<Self, ShapeError> {
        self.check(rhs, "multiply", self.columns() == rhs.rows())?;

        let mut result = Self::zeros(self.rows(), rhs.columns());
        for row in 0..self.rows() {
            let out = result.row_mut(row);
            for (inner, &a) in self.row(row).iter().enumerate() {
                out.iter_mut()
                    .zip(rhs.row(inner))
                    .for_each(|(o, &b)| *o += a * b);
            }
        }
        Ok(result)
    }

    /// The matrix product `self · rhsᵗ`, without materializing the transpose.
    pub fn matmul_transpose(&self, rhs: &Self) -> Result<Self, ShapeError> {
        self.check(rhs, "multiply-transpose", self.columns() == rhs.columns())?;

        let mut result = Self::zeros(self.rows(), rhs.rows());
        for row in 0..self.rows() {
            for column in 0..rhs.rows() {
                result[row][column] = dot(self.row(row), rhs.row(column));
            }
        }
        Ok(result)
    }

    pub fn add_elements(&self, rhs: &Self) -> Result<Self, ShapeError> {
        self.zip_with(rhs, "add", |a, b| a + b)
    }

    pub fn sub_elements(&self, rhs: &Self) -> Result<Self, ShapeError> {
        self.zip_with(rhs, "subtract", |a, b| a - b)
    }

    /// The elementwise (Hadamard) product.
    pub fn mul_elements(&self, rhs: &Self) -> Result<Self, ShapeError> {
        self.zip_with(rhs, "multiply elementwise", |a, b| a * b)
    }

    fn zip_with(
        &self,
        rhs: &Self,
        operation: &'static str,
        f: impl Fn(Value, Value) -> Value,
    ) -> Result<Self, ShapeError> {
        self.check(rhs, operation, self.dim == rhs.dim)?;

        Ok(Self {
            values: self
                .values
                .iter()
                .zip(&rhs.values)
                .map(|(&a, &b)| f(a, b))
                .collect(),
            dim: self.dim,
        })
    }

    fn check(&self, rhs: &Self, operation: &'static str, ok: bool) -> Result<(), ShapeError> {
        match ok {
            true => Ok(()),
            false => Err(ShapeError::Mismatch {
                operation,
                left: self.dim,
                right: rhs.dim,
            }),
        }
    }

    /// Prepends a column of ones.
    pub fn with_bias(&self) -> Self {
        let [rows, columns] = self.dim;
        let mut values = Vec::with_capacity(rows * (columns + 1));
        for row in self.iter() {
            values.push(Value::ONE);
            values.extend_from_slice(row);
        }

        Self {
            values,
            dim: [rows, columns + 1],
        }
    }

    /// Drops the first column.
    pub fn without_bias(&self) -> Result<Self, ShapeError> {
        let [rows, columns] = self.dim;
        if columns == 0 {
            return Err(ShapeError::Mismatch {
                operation: "strip the bias column of",
                left: self.dim,
                right: [rows, 1],
            });
        }

        let mut values = Vec::with_capacity(rows * (columns - 1));
        for row in self.iter() {
            values.extend_from_slice(&row[1..]);
        }

        Ok(Self {
            values,
            dim: [rows, columns - 1],
        })
    }

    /// A copy with every element of the first column set to zero.
    pub fn with_zeroed_bias(&self) -> Self {
        let mut result = self.clone();
        if self.columns() > 0 {
            for row in 0..self.rows() {
                result[row][0] = Value::ZERO;
            }
        }
        result
    }

    /// A copy of the contiguous rows in `range`.
    pub fn slice_rows(&self, range: Range<usize>) -> Self {
        let columns = self.columns();
        Self {
            values: self.values[range.start * columns..range.end * columns].to_vec(),
            dim: [range.len(), columns],
        }
    }

    /// A copy whose row `i` is row `indices[i]` of this matrix.
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let mut values = Vec::with_capacity(indices.len() * self.columns());
        for &i in indices {
            values.extend_from_slice(self.row(i));
        }

        Self {
            values,
            dim: [indices.len(), self.columns()],
        }
    }
}

pub(crate) fn dot(a: &[Value], b: &[Value]) -> Value {
    a.iter().zip(b).map(|(a, b)| a * b).sum()
}

impl Index<usize> for Matrix {
    type Output = [Value];

    fn index(&self, row: usize) -> &Self::Output {
        self.row(row)
    }
}

impl IndexMut<usize> for Matrix {
    fn index_mut(&mut self, row: usize) -> &mut Self::Output {
        self.row_mut(row)
    }
}

macro_rules! value_op_impl {
    ($op:ident, $op_method:ident, $op_assign:ident, $op_assign_method:ident) => {
        impl $op<Value> for Matrix {
            type Output = Matrix;

            fn $op_method(mut self, rhs: Value) -> Self::Output {
                self.$op_assign_method(rhs);
                self
            }
        }

        impl $op<Value> for &Matrix {
            type Output = Matrix;

            fn $op_method(self, rhs: Value) -> Self::Output {
                self.clone().$op_method(rhs)
            }
        }

        impl $op_assign<Value> for Matrix {
            fn $op_assign_method(&mut self, rhs: Value) {
                for x in self.values.iter_mut() {
                    (*x).$op_assign_method(rhs)
                }
            }
        }
    };
}

value_op_impl!(Add, add, AddAssign, add_assign);
value_op_impl!(Sub, sub, SubAssign, sub_assign);
value_op_impl!(Mul, mul, MulAssign, mul_assign);
value_op_impl!(Div, div, DivAssign, div_assign);

impl Neg for Matrix {
    type Output = Matrix;

    fn neg(self) -> Self::Output {
        self * -Value::ONE
    }
}

impl Neg for &Matrix {
    type Output = Matrix;

    fn neg(self) -> Self::Output {
        self * -Value::ONE
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [rows, columns] = self.dim;
        if rows == 0 {
            return write!(f, "[]");
        }

        for row in 0..rows {
            write!(f, "{}", if row == 0 { "[" } else { " " })?;
            for column in 0..columns {
                write!(f, "{:?}", self[row][column])?;
                if column < columns - 1 {
                    write!(f, " ")?;
                }
            }
            write!(f, "{}", if row < rows - 1 { "\n" } else { "]" })?;
        }
        Ok(())
    }
}
