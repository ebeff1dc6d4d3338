use crate::linear_algebra::{Matrix, ShapeError, Value};

/// Calculates the binary cross-entropy summed over every output and averaged over the examples.
pub fn cross_entropy(outputs: &Matrix, labels: &Matrix) -> Result<Value, ShapeError> {
    if outputs.dim() != labels.dim() {
        return Err(ShapeError::Mismatch {
            operation: "compare",
            left: outputs.dim(),
            right: labels.dim(),
        });
    }

    let error = labels
        .values()
        .zip(outputs.values())
        .map(|(&y, &h)| xlogy(y, h) + xlogy(1.0 - y, 1.0 - h))
        .sum::<Value>();

    Ok(-error / outputs.rows() as Value)
}

/// Calculates the derivative of the cross-entropy with respect to the output layer's
/// pre-activations, assuming sigmoid outputs.
pub fn cross_entropy_prime(outputs: &Matrix, labels: &Matrix) -> Result<Matrix, ShapeError> {
    outputs.sub_elements(labels)
}

/// Sums the squares of every weight except those in the bias column.
pub fn l2_penalty<'a>(layers: impl IntoIterator<Item = &'a Matrix>) -> Value {
    layers
        .into_iter()
        .map(|weights| {
            weights
                .iter()
                .flat_map(|row| row.iter().skip(1))
                .map(|w| w * w)
                .sum::<Value>()
        })
        .sum()
}

/// `x · ln(y)`, taken as zero whenever `x` is zero.
fn xlogy(x: Value, y: Value) -> Value {
    if x == 0.0 {
        0.0
    } else {
        x * y.ln()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(rows: &[&[Value]]) -> Matrix {
        Matrix::from_rows(rows).unwrap()
    }

    #[test]
    fn cross_entropy_average() {
        let outputs = m(&[&[0.5, 0.5], &[0.5, 0.5]]);
        let labels = m(&[&[1.0, 0.0], &[0.0, 1.0]]);

        let error = cross_entropy(&outputs, &labels).unwrap();
        assert!((error - 2.0 * 2.0f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn saturated_outputs() {
        let labels = m(&[&[1.0, 0.0]]);

        assert_eq!(cross_entropy(&m(&[&[1.0, 0.0]]), &labels).unwrap(), 0.0);
        assert_eq!(
            cross_entropy(&m(&[&[0.0, 0.0]]), &labels).unwrap(),
            Value::INFINITY,
        );
    }

    #[test]
    fn penalty_skips_bias() {
        let weights = m(&[&[100.0, 1.0, 2.0], &[-100.0, 0.0, -3.0]]);
        assert_eq!(l2_penalty([&weights]), 14.0);

        let bias_only = m(&[&[1e6, 0.0], &[-1e6, 0.0]]);
        assert_eq!(l2_penalty([&bias_only, &bias_only]), 0.0);
    }
}
