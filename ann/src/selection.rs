use std::panic;
use std::thread;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::cost::cost;
use crate::gradient_descent::AdaptiveGradientDescent;
use crate::linear_algebra::Value;
use crate::model::{hypothesis, Dataset, Model, ModelError};
use crate::rng;
use crate::weights::Weights;

/// The share of examples used for training; the next 20% is for cross-validation.
const TRAINING_SHARE: f64 = 0.6;
const CROSS_VALIDATION_END: f64 = 0.8;

/// Mixed into the shuffle's seed, apart from weight initialization seeded with the same value.
const SHUFFLE_STREAM: u64 = 0x9e37_79b9_7f4a_7c15;

/// The regularization strength used to score trained weights on the cross-validation set.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CvLambda {
    /// Score the bare cross-entropy.
    #[default]
    Zero,
    /// Score with the lambda the weights were trained with.
    Training,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Candidate regularization strengths. One set of weights is trained per candidate.
    pub lambdas: Vec<Value>,
    pub max_iters: usize,
    /// Unused; step sizes are searched by `descent` on every iteration.
    pub step: Value,
    pub shuffle: bool,
    /// Seeds the shuffle. Uses OS entropy when unset.
    pub seed: Option<u64>,
    pub cv_lambda: CvLambda,
    /// Train each candidate on its own thread.
    pub parallel: bool,
    pub verbose: bool,
    pub descent: AdaptiveGradientDescent,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            lambdas: vec![1.0],
            max_iters: 50,
            step: 0.0,
            shuffle: false,
            seed: None,
            cv_lambda: CvLambda::default(),
            parallel: false,
            verbose: false,
            descent: AdaptiveGradientDescent::default(),
        }
    }
}

/// The outcome of training with one candidate lambda.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Trial {
    pub lambda: Value,
    pub training_cost: Value,
    pub cv_cost: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Report {
    /// Unregularized cost of the selected weights on the test set.
    pub cost: Value,
    /// Fraction of test examples whose every thresholded output matches its target.
    pub accuracy: Value,
    /// The lambda the selected weights were trained with.
    pub lambda: Value,
    pub cv_cost: Value,
    pub trials: Vec<Trial>,
}

/// Contiguous training, cross-validation and test sets, in that order.
#[derive(Clone, Debug)]
pub struct Partitions {
    pub training: Dataset,
    pub cross_validation: Dataset,
    pub test: Dataset,
}

impl Partitions {
    /// Splits `data` into its first 60%, the next 20%, and the remaining examples.
    pub fn new(data: &Dataset) -> Result<Self, ModelError> {
        let m = data.len();
        let training_end = (m as f64 * TRAINING_SHARE) as usize;
        let cross_validation_end = (m as f64 * CROSS_VALIDATION_END) as usize;

        let partitions = Self {
            training: data.slice(0..training_end),
            cross_validation: data.slice(training_end..cross_validation_end),
            test: data.slice(cross_validation_end..m),
        };

        for (name, set) in [
            ("training", &partitions.training),
            ("cross-validation", &partitions.cross_validation),
            ("test", &partitions.test),
        ] {
            if set.is_empty() {
                return Err(ModelError::Empty(name));
            }
        }

        Ok(partitions)
    }
}

/// Trains one set of weights per candidate lambda, keeps the one that scores best on the
/// cross-validation set, and reports its performance on the test set.
///
/// Every candidate starts from the model's current weights. On success the model's weights
/// are replaced with the selected ones; on error they're left untouched.
#[instrument(level = "trace", skip_all)]
pub fn train(model: &mut Model, config: &TrainConfig) -> Result<Report, ModelError> {
    if config.lambdas.is_empty() {
        return Err(ModelError::NoCandidates);
    }

    if let Some(&lambda) = config
        .lambdas
        .iter()
        .find(|lambda| !(lambda.is_finite() && **lambda >= 0.0))
    {
        return Err(ModelError::Lambda(lambda));
    }

    let data = if config.shuffle {
        model.data().shuffled(&mut shuffle_rng(config.seed))
    } else {
        model.data().clone()
    };

    let partitions = Partitions::new(&data)?;

    info!(
        training = partitions.training.len(),
        cross_validation = partitions.cross_validation.len(),
        test = partitions.test.len(),
        lambdas = ?config.lambdas,
        "Training...",
    );

    let initial_weights = model.weights();

    let results = if config.parallel {
        thread::scope(|scope| {
            let handles = config
                .lambdas
                .iter()
                .map(|&lambda| {
                    let partitions = &partitions;
                    scope.spawn(move || run_trial(partitions, initial_weights, lambda, config))
                })
                .collect::<Vec<_>>();

            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or_else(|error| panic::resume_unwind(error)))
                .collect::<Result<Vec<_>, _>>()
        })?
    } else {
        config
            .lambdas
            .iter()
            .map(|&lambda| run_trial(&partitions, initial_weights, lambda, config))
            .collect::<Result<Vec<_>, _>>()?
    };

    // Ties go to the earlier candidate.
    let mut best = 0;
    for (i, (trial, _)) in results.iter().enumerate() {
        let best_cv_cost = results[best].0.cv_cost;
        if trial.cv_cost < best_cv_cost || (best_cv_cost.is_nan() && !trial.cv_cost.is_nan()) {
            best = i;
        }
    }

    let trials = results.iter().map(|(trial, _)| *trial).collect::<Vec<_>>();
    let (best_trial, best_weights) = results.into_iter().nth(best).ok_or(ModelError::NoCandidates)?;

    let (test_cost, _) = cost(&partitions.test, &best_weights, 0.0, false)?;
    let test_accuracy = accuracy(&partitions.test, &best_weights)?;

    model.set_weights(best_weights)?;

    info!(
        lambda = best_trial.lambda,
        cv_cost = best_trial.cv_cost,
        cost = test_cost,
        accuracy = test_accuracy,
        "Selected weights.",
    );

    Ok(Report {
        cost: test_cost,
        accuracy: test_accuracy,
        lambda: best_trial.lambda,
        cv_cost: best_trial.cv_cost,
        trials,
    })
}

fn shuffle_rng(seed: Option<u64>) -> StdRng {
    rng(seed.map(|seed| seed ^ SHUFFLE_STREAM))
}

fn run_trial(
    partitions: &Partitions,
    initial_weights: &Weights,
    lambda: Value,
    config: &TrainConfig,
) -> Result<(Trial, Weights), ModelError> {
    let (weights, training_cost) = config.descent.minimize(
        &partitions.training,
        initial_weights,
        lambda,
        config.max_iters,
        config.verbose,
    )?;

    let scoring_lambda = match config.cv_lambda {
        CvLambda::Zero => 0.0,
        CvLambda::Training => lambda,
    };
    let (cv_cost, _) = cost(&partitions.cross_validation, &weights, scoring_lambda, false)?;

    debug!(lambda, training_cost, cv_cost, "Trial finished.");

    Ok((
        Trial {
            lambda,
            training_cost,
            cv_cost,
        },
        weights,
    ))
}

/// The fraction of examples for which every output, thresholded at 0.5, equals its target.
pub fn accuracy(data: &Dataset, weights: &Weights) -> Result<Value, ModelError> {
    if data.is_empty() {
        return Err(ModelError::Empty("evaluated"));
    }

    data.check_weights(weights)?;

    let outputs = hypothesis(weights, data.x())?;

    let matches = outputs
        .iter()
        .zip(data.y().iter())
        .filter(|(outputs, targets)| {
            outputs
                .iter()
                .zip(targets.iter())
                .all(|(&h, &y)| threshold(h) == y)
        })
        .count();

    Ok(matches as Value / data.len() as Value)
}

fn threshold(h: Value) -> Value {
    if h >= 0.5 {
        1.0
    } else {
        0.0
    }
}
