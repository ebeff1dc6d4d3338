use crate::activation::{sigmoid, sigmoid_prime};
use crate::layer::{
    activation_backward, activation_forward, fully_connected_backward, fully_connected_forward,
};
use crate::linear_algebra::{Matrix, Value};
use crate::loss::{cross_entropy, cross_entropy_prime, l2_penalty};
use crate::model::{Dataset, ModelError};
use crate::weights::Weights;

/// Computes the regularized cross-entropy cost of `weights` over `data`, and when
/// `want_gradient` is set, its gradient with respect to every weight.
///
/// The bias column of each layer is excluded from regularization. The gradient has the same
/// shape as `weights`.
pub fn cost(
    data: &Dataset,
    weights: &Weights,
    lambda: Value,
    want_gradient: bool,
) -> Result<(Value, Option<Weights>), ModelError> {
    if want_gradient {
        let (j, gradient) = cost_and_gradient(data, weights, lambda)?;
        Ok((j, Some(gradient)))
    } else {
        check_arguments(data, weights, lambda)?;
        let propagation = Propagation::forward(data.x(), weights)?;
        Ok((regularized_cost(data, weights, lambda, &propagation)?, None))
    }
}

/// Like [`cost`], but always computes the gradient.
pub fn cost_and_gradient(
    data: &Dataset,
    weights: &Weights,
    lambda: Value,
) -> Result<(Value, Weights), ModelError> {
    check_arguments(data, weights, lambda)?;

    let propagation = Propagation::forward(data.x(), weights)?;
    let j = regularized_cost(data, weights, lambda, &propagation)?;
    let gradient = propagation.backward(data, weights, lambda)?;

    Ok((j, gradient))
}

fn check_arguments(data: &Dataset, weights: &Weights, lambda: Value) -> Result<(), ModelError> {
    if !(lambda.is_finite() && lambda >= 0.0) {
        return Err(ModelError::Lambda(lambda));
    }

    if data.is_empty() {
        return Err(ModelError::Empty("evaluated"));
    }

    data.check_weights(weights)
}

fn regularized_cost(
    data: &Dataset,
    weights: &Weights,
    lambda: Value,
    propagation: &Propagation,
) -> Result<Value, ModelError> {
    let m = data.len() as Value;
    Ok(cross_entropy(&propagation.outputs, data.y())?
        + lambda / (2.0 * m) * l2_penalty(weights))
}

/// Every intermediate value of a forward pass, kept for backpropagation.
struct Propagation {
    /// The inputs to each layer, without the bias column.
    layer_inputs: Vec<Matrix>,
    /// Each layer's values before activation.
    layer_fully_connected: Vec<Matrix>,
    outputs: Matrix,
}

impl Propagation {
    fn forward(inputs: &Matrix, weights: &Weights) -> Result<Self, ModelError> {
        let mut layer_inputs = Vec::with_capacity(weights.len());
        let mut layer_fully_connected = Vec::with_capacity(weights.len());

        let mut activations = inputs.clone();
        for layer_weights in weights.iter() {
            let fully_connected = fully_connected_forward(&activations, layer_weights)?;
            let next_activations = activation_forward(&fully_connected, sigmoid);

            layer_inputs.push(activations);
            layer_fully_connected.push(fully_connected);
            activations = next_activations;
        }

        Ok(Self {
            layer_inputs,
            layer_fully_connected,
            outputs: activations,
        })
    }

    fn backward(
        &self,
        data: &Dataset,
        weights: &Weights,
        lambda: Value,
    ) -> Result<Weights, ModelError> {
        let m = data.len() as Value;

        let mut gradients = vec![Matrix::default(); weights.len()];

        let mut output_gradients = cross_entropy_prime(&self.outputs, data.y())?;

        for layer in (0..weights.len()).rev() {
            let (weight_gradients, input_gradients) = fully_connected_backward(
                &self.layer_inputs[layer],
                &output_gradients,
                &weights[layer],
            )?;

            let regularization = weights[layer].with_zeroed_bias() * (lambda / m);
            gradients[layer] = (weight_gradients / m).add_elements(&regularization)?;

            if layer > 0 {
                output_gradients = activation_backward(
                    &self.layer_fully_connected[layer - 1],
                    &input_gradients,
                    sigmoid_prime,
                )?;
            }
        }

        Ok(Weights::new(gradients)?)
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn random_problem(layer_sizes: &[usize], examples: usize, seed: u64) -> (Dataset, Weights) {
        let mut rng = StdRng::seed_from_u64(seed);

        let inputs = layer_sizes[0];
        let outputs = layer_sizes[layer_sizes.len() - 1];

        let x = (0..examples)
            .map(|_| (0..inputs).map(|_| rng.gen_range(-1.0..1.0)).collect())
            .collect::<Vec<Vec<Value>>>();
        let y = (0..examples)
            .map(|_| {
                (0..outputs)
                    .map(|_| if rng.gen_bool(0.5) { 1.0 } else { 0.0 })
                    .collect()
            })
            .collect::<Vec<Vec<Value>>>();

        let data = Dataset::from_rows(&x, &y).unwrap();
        let weights = Weights::random(layer_sizes, &mut rng).unwrap();
        (data, weights)
    }

    fn check_gradient(layer_sizes: &[usize], lambda: Value, seed: u64) {
        let (data, weights) = random_problem(layer_sizes, 5, seed);

        let (_, gradient) = cost(&data, &weights, lambda, true).unwrap();
        let gradient = gradient.unwrap().roll();

        let epsilon = 1e-5;
        let values = weights.roll();
        for i in 0..values.len() {
            let mut plus = values.clone();
            plus[i] += epsilon;
            let mut minus = values.clone();
            minus[i] -= epsilon;

            let (j_plus, _) = cost(&data, &weights.unroll(&plus).unwrap(), lambda, false).unwrap();
            let (j_minus, _) =
                cost(&data, &weights.unroll(&minus).unwrap(), lambda, false).unwrap();

            let numerical = (j_plus - j_minus) / (2.0 * epsilon);
            assert!(
                (numerical - gradient[i]).abs() < 1e-4,
                "component {i}: numerical {numerical}, analytical {}",
                gradient[i],
            );
        }
    }

    #[test]
    fn gradient_check_single_hidden_layer() {
        check_gradient(&[3, 5, 3], 0.0, 11);
        check_gradient(&[3, 5, 3], 1.0, 12);
    }

    #[test]
    fn gradient_check_deep() {
        check_gradient(&[4, 3, 4, 2], 0.3, 13);
    }

    #[test]
    fn gradient_check_no_hidden_layer() {
        check_gradient(&[2, 1], 0.5, 14);
    }

    #[test]
    fn gradient_has_weight_shapes() {
        let (data, weights) = random_problem(&[3, 4, 2], 6, 15);
        let (_, gradient) = cost(&data, &weights, 1.0, true).unwrap();
        let gradient = gradient.unwrap();

        assert_eq!(gradient.layer_sizes(), weights.layer_sizes());
        for (g, w) in gradient.iter().zip(weights.iter()) {
            assert_eq!(g.dim(), w.dim());
        }
    }

    #[test]
    fn no_gradient_unless_requested() {
        let (data, weights) = random_problem(&[3, 4, 2], 6, 16);
        let (j, gradient) = cost(&data, &weights, 1.0, false).unwrap();
        assert!(gradient.is_none());
        assert_eq!(j, cost(&data, &weights, 1.0, true).unwrap().0);
    }

    #[test]
    fn cost_non_negative_and_grows_with_lambda() {
        for seed in 0..5 {
            let (data, weights) = random_problem(&[4, 6, 3], 8, seed);

            let mut last = 0.0;
            for lambda in [0.0, 0.01, 0.1, 1.0, 10.0] {
                let (j, _) = cost(&data, &weights, lambda, false).unwrap();
                assert!(j >= 0.0);
                assert!(j >= last);
                last = j;
            }
        }
    }

    #[test]
    fn bias_weights_are_not_regularized() {
        let (data, _) = random_problem(&[2, 3, 1], 4, 17);

        let mut hidden = Matrix::zeros(3, 3);
        let mut output = Matrix::zeros(1, 4);
        for row in 0..3 {
            hidden[row][0] = 50.0;
        }
        output[0][0] = -50.0;
        let weights = Weights::new(vec![hidden, output]).unwrap();

        let (unregularized, _) = cost(&data, &weights, 0.0, false).unwrap();
        let (regularized, gradient) = cost(&data, &weights, 100.0, true).unwrap();
        assert_eq!(unregularized, regularized);
        assert_eq!(l2_penalty(&weights), 0.0);

        // The regularization term of the gradient ignores the bias column too.
        let (_, plain_gradient) = cost(&data, &weights, 0.0, true).unwrap();
        assert_eq!(gradient, plain_gradient);
    }

    #[test]
    fn rejects_invalid_lambda() {
        let (data, weights) = random_problem(&[2, 2, 1], 3, 18);
        assert_eq!(
            cost(&data, &weights, -1.0, false),
            Err(ModelError::Lambda(-1.0))
        );
        assert!(cost(&data, &weights, Value::NAN, false).is_err());
        assert!(cost(&data, &weights, Value::INFINITY, true).is_err());
    }

    #[test]
    fn rejects_empty_data() {
        let (data, weights) = random_problem(&[2, 2, 1], 3, 19);
        let empty = data.slice(0..0);
        assert_eq!(
            cost(&empty, &weights, 0.0, false),
            Err(ModelError::Empty("evaluated"))
        );
    }

    #[test]
    fn rejects_mismatched_weights() {
        let (data, _) = random_problem(&[2, 2, 1], 3, 20);
        let (_, weights) = random_problem(&[3, 2, 1], 3, 20);
        assert!(matches!(
            cost(&data, &weights, 0.0, true),
            Err(ModelError::Weights { .. })
        ));
    }
}
