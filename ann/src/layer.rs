use crate::activation::sigmoid;
use crate::linear_algebra::{Matrix, ShapeError, Value};

/// Computes `bias(inputs) · weightsᵗ`, one row per example.
pub fn fully_connected_forward(inputs: &Matrix, weights: &Matrix) -> Result<Matrix, ShapeError> {
    inputs.with_bias().matmul_transpose(weights)
}

/// Returns the gradients of the weights (bias column included) and of the inputs.
pub fn fully_connected_backward(
    inputs: &Matrix,
    output_gradients: &Matrix,
    weights: &Matrix,
) -> Result<(Matrix, Matrix), ShapeError> {
    let weight_gradients = output_gradients.transpose().matmul(&inputs.with_bias())?;

    let input_gradients = output_gradients.matmul(weights)?.without_bias()?;

    Ok((weight_gradients, input_gradients))
}

pub fn activation_forward(inputs: &Matrix, activation: impl Fn(Value) -> Value) -> Matrix {
    inputs.map(activation)
}

pub fn activation_backward(
    inputs: &Matrix,
    output_gradients: &Matrix,
    activation_prime: impl Fn(Value) -> Value,
) -> Result<Matrix, ShapeError> {
    output_gradients.mul_elements(&inputs.map(activation_prime))
}

/// Runs `inputs` through every layer and returns the final activations.
pub fn propagate_forward(layers: &[Matrix], inputs: &Matrix) -> Result<Matrix, ShapeError> {
    layers.iter().try_fold(inputs.clone(), |activations, weights| {
        let fully_connected = fully_connected_forward(&activations, weights)?;
        Ok(activation_forward(&fully_connected, sigmoid))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_uses_bias_column() {
        let inputs = Matrix::from_rows(&[[2.0, 3.0]]).unwrap();
        let weights = Matrix::from_rows(&[[1.0, 0.5, -1.0], [0.0, 1.0, 1.0]]).unwrap();

        let outputs = fully_connected_forward(&inputs, &weights).unwrap();
        assert_eq!(outputs.to_rows(), vec![vec![-1.0, 5.0]]);
    }

    #[test]
    fn forward_shape_mismatch() {
        let inputs = Matrix::zeros(1, 3);
        let weights = Matrix::zeros(2, 3);
        assert!(fully_connected_forward(&inputs, &weights).is_err());
        assert!(propagate_forward(&[weights], &inputs).is_err());
    }

    #[test]
    fn backward_shapes() {
        let inputs = Matrix::ones(4, 3);
        let weights = Matrix::ones(2, 4);
        let output_gradients = Matrix::ones(4, 2);

        let (weight_gradients, input_gradients) =
            fully_connected_backward(&inputs, &output_gradients, &weights).unwrap();

        assert_eq!(weight_gradients.dim(), [2, 4]);
        assert_eq!(input_gradients.dim(), [4, 3]);
        // Every entry sums one gradient per example.
        assert!(weight_gradients.values().all(|&x| x == 4.0));
        assert!(input_gradients.values().all(|&x| x == 2.0));
    }
}
