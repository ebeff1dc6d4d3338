use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

pub use self::cost::{cost, cost_and_gradient};
pub use self::gradient_descent::AdaptiveGradientDescent;
pub use self::linear_algebra::{Matrix, ParseError, ShapeError, Value};
pub use self::model::{hypothesis, Dataset, Model, ModelError};
pub use self::selection::{accuracy, train, CvLambda, Partitions, Report, TrainConfig, Trial};
pub use self::weights::{TopologyError, Weights};

pub mod linear_algebra;
pub mod loss;

mod activation;
mod cost;
mod gradient_descent;
mod layer;
mod model;
mod selection;
mod weights;

/// A random number generator for initializing weights and shuffling examples. Seeded from the
/// OS when `seed` is `None`.
pub fn rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => {
            debug!(seed, "Seeding rng.");
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    }
}
