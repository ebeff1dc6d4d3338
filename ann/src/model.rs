use std::error::Error;
use std::fmt;
use std::ops::Range;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::instrument;

use crate::cost::cost;
use crate::gradient_descent::AdaptiveGradientDescent;
use crate::layer::propagate_forward;
use crate::linear_algebra::{Matrix, ShapeError, Value};
use crate::weights::{TopologyError, Weights};

/// Computes the network's outputs for every row of `inputs`, each in `(0, 1)`.
pub fn hypothesis(weights: &Weights, inputs: &Matrix) -> Result<Matrix, ShapeError> {
    propagate_forward(weights, inputs)
}

/// Paired example inputs (`x`) and targets (`y`), one example per row.
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    x: Matrix,
    y: Matrix,
}

impl Dataset {
    pub fn new(x: Matrix, y: Matrix) -> Result<Self, ModelError> {
        if x.rows() != y.rows() {
            return Err(ModelError::ExampleCount {
                inputs: x.rows(),
                targets: y.rows(),
            });
        }

        Ok(Self { x, y })
    }

    pub fn from_rows<X, Y>(x: &[X], y: &[Y]) -> Result<Self, ModelError>
    where
        X: AsRef<[Value]>,
        Y: AsRef<[Value]>,
    {
        Self::new(Matrix::from_rows(x)?, Matrix::from_rows(y)?)
    }

    pub fn x(&self) -> &Matrix {
        &self.x
    }

    pub fn y(&self) -> &Matrix {
        &self.y
    }

    /// The number of examples.
    pub fn len(&self) -> usize {
        self.x.rows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The width of each input row.
    pub fn inputs(&self) -> usize {
        self.x.columns()
    }

    /// The width of each target row.
    pub fn outputs(&self) -> usize {
        self.y.columns()
    }

    /// A copy of the contiguous examples in `range`.
    pub fn slice(&self, range: Range<usize>) -> Self {
        Self {
            x: self.x.slice_rows(range.clone()),
            y: self.y.slice_rows(range),
        }
    }

    /// A copy with the examples in a uniformly random order. Inputs stay paired with their
    /// targets.
    pub fn shuffled(&self, rng: &mut impl Rng) -> Self {
        let mut order = (0..self.len()).collect::<Vec<_>>();
        order.shuffle(rng);

        Self {
            x: self.x.select_rows(&order),
            y: self.y.select_rows(&order),
        }
    }

    /// Ensures `weights` map this dataset's inputs onto its targets.
    pub fn check_weights(&self, weights: &Weights) -> Result<(), ModelError> {
        if weights.inputs() != self.inputs() || weights.outputs() != self.outputs() {
            return Err(ModelError::Weights {
                inputs: self.inputs(),
                outputs: self.outputs(),
                layer_sizes: weights.layer_sizes(),
            });
        }

        Ok(())
    }
}

/// A dataset together with the weights of the network being trained on it.
#[derive(Clone, Debug)]
pub struct Model {
    data: Dataset,
    weights: Weights,
}

impl Model {
    pub fn new(data: Dataset, weights: Weights) -> Result<Self, ModelError> {
        data.check_weights(&weights)?;
        Ok(Self { data, weights })
    }

    /// Builds a model from raw nested arrays. `theta` holds one `units_out × (units_in + 1)`
    /// array per layer.
    pub fn from_rows(
        x: &[Vec<Value>],
        y: &[Vec<Value>],
        theta: &[Vec<Vec<Value>>],
    ) -> Result<Self, ModelError> {
        let layers = theta
            .iter()
            .map(|layer| Matrix::from_rows(layer))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(Dataset::from_rows(x, y)?, Weights::new(layers)?)
    }

    pub fn data(&self) -> &Dataset {
        &self.data
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    /// Replaces the weights wholesale. The current weights are kept if the new ones don't fit
    /// the dataset.
    pub fn set_weights(&mut self, weights: Weights) -> Result<(), ModelError> {
        self.data.check_weights(&weights)?;
        self.weights = weights;
        Ok(())
    }

    /// Computes the network's output for a single input row.
    pub fn predict(&self, inputs: &[Value]) -> Result<Vec<Value>, ModelError> {
        let inputs = Matrix::from_vec(1, inputs.len(), inputs.to_vec())?;
        let outputs = hypothesis(&self.weights, &inputs)?;
        Ok(outputs.row(0).to_vec())
    }

    /// Computes the network's outputs for every row of `inputs`.
    pub fn hypothesis(&self, inputs: &Matrix) -> Result<Matrix, ModelError> {
        Ok(hypothesis(&self.weights, inputs)?)
    }

    /// Computes the regularized cost over the whole dataset, and its gradient if requested.
    pub fn cost(
        &self,
        lambda: Value,
        want_gradient: bool,
    ) -> Result<(Value, Option<Weights>), ModelError> {
        cost(&self.data, &self.weights, lambda, want_gradient)
    }

    /// Trains the weights on the whole dataset and returns the final cost. On error, the
    /// weights are left as they were.
    #[instrument(level = "trace", skip(self))]
    pub fn minimize(
        &mut self,
        lambda: Value,
        max_iters: usize,
        verbose: bool,
    ) -> Result<Value, ModelError> {
        let (weights, cost) = AdaptiveGradientDescent::default().minimize(
            &self.data,
            &self.weights,
            lambda,
            max_iters,
            verbose,
        )?;

        self.weights = weights;
        Ok(cost)
    }
}

#[derive(Debug, PartialEq)]
pub enum ModelError {
    /// `x` and `y` hold different numbers of examples.
    ExampleCount { inputs: usize, targets: usize },
    /// The weights don't connect the dataset's inputs to its targets.
    Weights {
        inputs: usize,
        outputs: usize,
        layer_sizes: Vec<usize>,
    },
    /// Regularization strength must be finite and non-negative.
    Lambda(Value),
    /// There are no examples to evaluate. Holds the name of the empty set.
    Empty(&'static str),
    /// Model selection was given no regularization strengths to try.
    NoCandidates,
    Shape(ShapeError),
    Topology(TopologyError),
}

impl From<ShapeError> for ModelError {
    fn from(error: ShapeError) -> Self {
        Self::Shape(error)
    }
}

impl From<TopologyError> for ModelError {
    fn from(error: TopologyError) -> Self {
        Self::Topology(error)
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExampleCount { inputs, targets } => {
                write!(f, "found {inputs} input rows but {targets} target rows")
            }
            Self::Weights {
                inputs,
                outputs,
                layer_sizes,
            } => write!(
                f,
                "layer sizes {layer_sizes:?} don't map {inputs} inputs to {outputs} outputs",
            ),
            Self::Lambda(lambda) => write!(f, "invalid regularization strength: {lambda}"),
            Self::Empty(set) => write!(f, "the {set} set has no examples"),
            Self::NoCandidates => write!(f, "no regularization strengths to try"),
            Self::Shape(error) => write!(f, "{error}"),
            Self::Topology(error) => write!(f, "{error}"),
        }
    }
}

impl Error for ModelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Shape(error) => Some(error),
            Self::Topology(error) => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn xor() -> (Vec<Vec<Value>>, Vec<Vec<Value>>) {
        let x = vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
        ];
        let y = vec![vec![0.0], vec![1.0], vec![1.0], vec![0.0]];
        (x, y)
    }

    #[test]
    fn dataset_rejects_mismatched_counts() {
        let (x, y) = xor();
        assert_eq!(
            Dataset::from_rows(&x, &y[..3]),
            Err(ModelError::ExampleCount {
                inputs: 4,
                targets: 3
            }),
        );
    }

    #[test]
    fn dataset_rejects_ragged_rows() {
        let x = vec![vec![0.0, 0.0], vec![1.0]];
        let y = vec![vec![0.0], vec![1.0]];
        assert!(matches!(
            Dataset::from_rows(&x, &y),
            Err(ModelError::Shape(ShapeError::Ragged { row: 1, .. }))
        ));
    }

    #[test]
    fn model_rejects_mismatched_weights() {
        let (x, y) = xor();
        let theta = vec![vec![vec![0.0, 0.0, 0.0, 0.0]]];
        assert!(matches!(
            Model::from_rows(&x, &y, &theta),
            Err(ModelError::Weights { inputs: 2, outputs: 1, .. })
        ));

        let theta = vec![vec![vec![0.0, 0.0, 0.0]]];
        assert!(Model::from_rows(&x, &y, &theta).is_ok());
    }

    #[test]
    fn set_weights_keeps_old_on_error() {
        let (x, y) = xor();
        let mut rng = StdRng::seed_from_u64(5);
        let weights = Weights::random(&[2, 3, 1], &mut rng).unwrap();
        let mut model = Model::new(Dataset::from_rows(&x, &y).unwrap(), weights.clone()).unwrap();

        let wrong = Weights::random(&[3, 3, 1], &mut rng).unwrap();
        assert!(model.set_weights(wrong).is_err());
        assert_eq!(model.weights(), &weights);
    }

    #[test]
    fn predict_single_row() {
        let (x, y) = xor();
        let theta = vec![vec![vec![0.0, 1.0, -1.0]]];
        let model = Model::from_rows(&x, &y, &theta).unwrap();

        assert_eq!(model.predict(&[1.0, 1.0]).unwrap(), vec![0.5]);
        assert!(model.predict(&[1.0, 1.0, 1.0]).is_err());
    }

    #[test]
    fn shuffle_keeps_pairs() {
        let x = (0..20).map(|i| vec![i as Value]).collect::<Vec<_>>();
        let y = (0..20).map(|i| vec![-(i as Value)]).collect::<Vec<_>>();
        let data = Dataset::from_rows(&x, &y).unwrap();

        let shuffled = data.shuffled(&mut StdRng::seed_from_u64(9));
        assert_eq!(shuffled.len(), 20);
        assert_ne!(shuffled, data);

        for (x, y) in shuffled.x().iter().zip(shuffled.y().iter()) {
            assert_eq!(x[0], -y[0]);
        }

        let mut seen = shuffled.x().values().map(|&v| v as usize).collect::<Vec<_>>();
        seen.sort_unstable();
        assert_eq!(seen, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn slice_copies_rows() {
        let (x, y) = xor();
        let data = Dataset::from_rows(&x, &y).unwrap();
        let slice = data.slice(1..3);
        assert_eq!(slice.len(), 2);
        assert_eq!(slice.x().to_rows(), x[1..3].to_vec());
        assert_eq!(slice.y().to_rows(), y[1..3].to_vec());
    }
}
