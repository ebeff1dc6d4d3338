use std::error::Error;
use std::fmt;
use std::ops::Deref;

use rand::distributions::{Distribution, Uniform};
use rand::Rng;

use crate::linear_algebra::{Matrix, ShapeError, Value};

/// The weights of every layer of a network, input layer first.
///
/// Layer `l` is a `units_out × (units_in + 1)` matrix whose first column holds the bias
/// weights. Each layer consumes exactly the outputs of the one before it.
#[derive(Clone, Debug, PartialEq)]
pub struct Weights(Vec<Matrix>);

impl Weights {
    pub fn new(layers: Vec<Matrix>) -> Result<Self, TopologyError> {
        if layers.is_empty() {
            return Err(TopologyError::TooFewLayers(layers.len() + 1));
        }

        for (layer, weights) in layers.iter().enumerate() {
            if weights.rows() == 0 || weights.columns() < 2 {
                return Err(TopologyError::ZeroWidth(layer));
            }

            if layer > 0 {
                let expected_columns = layers[layer - 1].rows() + 1;
                if weights.columns() != expected_columns {
                    return Err(TopologyError::Disconnected {
                        layer,
                        expected_columns,
                        found_columns: weights.columns(),
                    });
                }
            }
        }

        Ok(Self(layers))
    }

    /// Draws every weight uniformly from `[-ε, ε]`, with `ε = √6 / √(n₀ + n_L)`.
    ///
    /// `layer_sizes` lists the unit count of every layer, input first and output last.
    pub fn random(layer_sizes: &[usize], rng: &mut impl Rng) -> Result<Self, TopologyError> {
        if layer_sizes.len() < 2 {
            return Err(TopologyError::TooFewLayers(layer_sizes.len()));
        }

        if let Some(layer) = layer_sizes.iter().position(|&size| size == 0) {
            return Err(TopologyError::ZeroWidth(layer));
        }

        let inputs = layer_sizes[0];
        let outputs = layer_sizes[layer_sizes.len() - 1];
        let epsilon = (6.0 as Value).sqrt() / ((inputs + outputs) as Value).sqrt();
        let uniform_distribution = Uniform::new_inclusive(-epsilon, epsilon);

        let mut layers = Vec::with_capacity(layer_sizes.len() - 1);
        for pair in layer_sizes.windows(2) {
            let mut weights = Matrix::zeros(pair[1], pair[0] + 1);
            weights
                .values_mut()
                .for_each(|x| *x = uniform_distribution.sample(rng));
            layers.push(weights);
        }

        Ok(Self(layers))
    }

    /// The number of units in every layer, input first.
    pub fn layer_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![self.inputs()];
        sizes.extend(self.iter().map(Matrix::rows));
        sizes
    }

    pub fn inputs(&self) -> usize {
        self.0[0].columns() - 1
    }

    pub fn outputs(&self) -> usize {
        self.0[self.0.len() - 1].rows()
    }

    /// Returns `self - step · gradient`.
    pub fn descend(&self, gradient: &Weights, step: Value) -> Result<Weights, ShapeError> {
        if gradient.len() != self.len() {
            return Err(ShapeError::Length {
                expected: self.len(),
                found: gradient.len(),
            });
        }

        self.iter()
            .zip(gradient.iter())
            .map(|(weights, gradient)| weights.sub_elements(&(gradient * step)))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// Flattens every layer into one sequence. Within a layer, values are ordered by input
    /// unit first and output unit second, i.e. column by column.
    pub fn roll(&self) -> Vec<Value> {
        let mut values = Vec::with_capacity(self.iter().map(|w| w.rows() * w.columns()).sum());
        for weights in self.iter() {
            for column in 0..weights.columns() {
                for row in 0..weights.rows() {
                    values.push(weights[row][column]);
                }
            }
        }
        values
    }

    /// Rebuilds weights shaped like `self` from values flattened by [`Weights::roll`].
    pub fn unroll(&self, values: &[Value]) -> Result<Weights, ShapeError> {
        let expected = self.iter().map(|w| w.rows() * w.columns()).sum();
        if values.len() != expected {
            return Err(ShapeError::Length {
                expected,
                found: values.len(),
            });
        }

        let mut offset = 0;
        let layers = self
            .iter()
            .map(|template| {
                let rows = template.rows();
                let len = rows * template.columns();

                let mut weights = Matrix::zeros(rows, template.columns());
                for (i, &value) in values[offset..offset + len].iter().enumerate() {
                    weights[i % rows][i / rows] = value;
                }

                offset += len;
                weights
            })
            .collect();

        Ok(Self(layers))
    }
}

impl Deref for Weights {
    type Target = [Matrix];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'a> IntoIterator for &'a Weights {
    type Item = &'a Matrix;
    type IntoIter = std::slice::Iter<'a, Matrix>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Weights> for Vec<Matrix> {
    fn from(weights: Weights) -> Self {
        weights.0
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TopologyError {
    /// A network needs an input and an output layer; holds the number of layers given.
    TooFewLayers(usize),
    /// The layer at this index has no units.
    ZeroWidth(usize),
    /// A layer's column count doesn't match the previous layer's unit count plus bias.
    Disconnected {
        layer: usize,
        expected_columns: usize,
        found_columns: usize,
    },
}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewLayers(count) => {
                write!(f, "a network needs at least 2 layers, found {count}")
            }
            Self::ZeroWidth(layer) => write!(f, "layer {layer} has no units"),
            Self::Disconnected {
                layer,
                expected_columns,
                found_columns,
            } => write!(
                f,
                "layer {layer} has {found_columns} columns, expected {expected_columns}",
            ),
        }
    }
}

impl Error for TopologyError {}
