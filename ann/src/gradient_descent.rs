use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::cost::{cost, cost_and_gradient};
use crate::linear_algebra::Value;
use crate::model::{Dataset, ModelError};
use crate::weights::Weights;

/// Full-batch gradient descent with a doubling step search.
///
/// Each iteration takes a fresh gradient, then tries steps of `2s, 4s, 8s, ...` along it
/// (`s` being `initial_step`), keeping every step that lowers the cost. The first step that
/// doesn't is halved, which lands back on the last step that did.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct AdaptiveGradientDescent {
    pub initial_step: Value,
    /// The most step sizes tried in one iteration. Reaching it keeps the last improvement.
    pub max_doublings: u32,
}

impl Default for AdaptiveGradientDescent {
    fn default() -> Self {
        Self {
            initial_step: 0.001,
            max_doublings: 64,
        }
    }
}

impl AdaptiveGradientDescent {
    /// Runs exactly `max_iters` iterations starting from `weights`, and returns the trained
    /// weights with their cost. `weights` itself is never modified.
    #[instrument(level = "trace", skip(self, data, weights))]
    pub fn minimize(
        &self,
        data: &Dataset,
        weights: &Weights,
        lambda: Value,
        max_iters: usize,
        verbose: bool,
    ) -> Result<(Weights, Value), ModelError> {
        let mut weights = weights.clone();
        let mut j = None;

        for iteration in 0..max_iters {
            let (initial_j, gradient) = cost_and_gradient(data, &weights, lambda)?;

            if verbose {
                debug!(iteration, cost = initial_j, "Searching for a step size.");
            }

            let (next_weights, next_j) =
                self.search_step(data, &weights, &gradient, lambda, initial_j, verbose)?;

            weights = next_weights;
            j = Some(next_j);
        }

        let j = match j {
            Some(j) => j,
            None => cost(data, &weights, lambda, false)?.0,
        };

        if verbose {
            debug!(cost = j, iterations = max_iters, "Minimization finished.");
        }

        Ok((weights, j))
    }

    fn search_step(
        &self,
        data: &Dataset,
        weights: &Weights,
        gradient: &Weights,
        lambda: Value,
        initial_j: Value,
        verbose: bool,
    ) -> Result<(Weights, Value), ModelError> {
        let mut step = self.initial_step;
        let mut last_j = initial_j;
        let mut accepted = None;

        for _ in 0..self.max_doublings {
            step *= 2.0;

            let candidate = weights.descend(gradient, step)?;
            let (j, _) = cost(data, &candidate, lambda, false)?;

            if verbose {
                debug!(step, cost = j, improvement = last_j - j, "Step tried.");
            }

            // NaN never counts as an improvement.
            if j < last_j {
                last_j = j;
                accepted = Some((candidate, step));
            } else {
                break;
            }
        }

        if let Some((candidate, step)) = accepted {
            if verbose {
                debug!(step, cost = last_j, "Step found.");
            }
            return Ok((candidate, last_j));
        }

        // Not even the first doubled step improved; fall back to half of it, as long as that
        // doesn't make things worse.
        let candidate = weights.descend(gradient, step / 2.0)?;
        let (j, _) = cost(data, &candidate, lambda, false)?;

        if j <= initial_j {
            if verbose {
                debug!(step = step / 2.0, cost = j, "Step retreated.");
            }
            Ok((candidate, j))
        } else {
            if verbose {
                debug!(cost = initial_j, "No step improves the cost.");
            }
            Ok((weights.clone(), initial_j))
        }
    }
}
