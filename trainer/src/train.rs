use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use tracing::{info, warn};

use ann::{rng, train, Dataset, Matrix, Model, ModelError, ParseError, TrainConfig, Weights};

use crate::args::Args;

pub fn run_training(args: Args) -> Result<(), TrainerError> {
    let config = load_config(&args)?;

    let x = read_matrix(&args.x)?;
    let y = read_matrix(&args.y)?;
    let data = Dataset::new(x, y)?;

    let weights = if args.theta.is_empty() {
        Weights::random(&args.layers, &mut rng(config.seed)).map_err(ModelError::from)?
    } else {
        if !args.layers.is_empty() {
            warn!("Layer sizes are ignored when initial weights are given.");
        }

        let layers = args
            .theta
            .iter()
            .map(|path| read_matrix(path))
            .collect::<Result<Vec<_>, _>>()?;
        Weights::new(layers).map_err(ModelError::from)?
    };

    info!(
        examples = data.len(),
        layer_sizes = ?weights.layer_sizes(),
        "Loaded model.",
    );

    let mut model = Model::new(data, weights)?;
    let report = train(&mut model, &config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for trial in &report.trials {
            println!(
                "lambda {:<10} training cost {:<12.6} cv cost {:.6}",
                trial.lambda, trial.training_cost, trial.cv_cost,
            );
        }
        println!("Selected lambda: {}", report.lambda);
        println!("Test cost:       {:.6}", report.cost);
        println!("Test accuracy:   {:.2}%", report.accuracy * 100.0);
    }

    Ok(())
}

/// Reads the config file, if any, and applies the command line's overrides.
fn load_config(args: &Args) -> Result<TrainConfig, TrainerError> {
    let mut config = match &args.config {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => TrainConfig::default(),
    };

    if !args.lambdas.is_empty() {
        config.lambdas = args.lambdas.clone();
    }
    if let Some(max_iters) = args.max_iters {
        config.max_iters = max_iters;
    }
    if let Some(cv_lambda) = args.cv_lambda {
        config.cv_lambda = cv_lambda;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    config.shuffle |= args.shuffle;
    config.parallel |= args.parallel;
    config.verbose |= args.verbose;

    Ok(config)
}

fn read_matrix(path: &Path) -> Result<Matrix, TrainerError> {
    Matrix::from_file(path).map_err(|error| TrainerError::Parse {
        path: path.display().to_string(),
        error,
    })
}

#[derive(Debug)]
pub enum TrainerError {
    Io(io::Error),
    Config(serde_json::Error),
    Parse { path: String, error: ParseError },
    Model(ModelError),
}

impl From<io::Error> for TrainerError {
    fn from(error: io::Error) -> Self {
        Self::Io(error)
    }
}

impl From<serde_json::Error> for TrainerError {
    fn from(error: serde_json::Error) -> Self {
        Self::Config(error)
    }
}

impl From<ModelError> for TrainerError {
    fn from(error: ModelError) -> Self {
        Self::Model(error)
    }
}

impl fmt::Display for TrainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(error) => write!(f, "{error}"),
            Self::Config(error) => write!(f, "invalid config: {error}"),
            Self::Parse { path, error } => write!(f, "{path}: {error}"),
            Self::Model(error) => write!(f, "{error}"),
        }
    }
}

impl Error for TrainerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(error) => Some(error),
            Self::Config(error) => Some(error),
            Self::Parse { error, .. } => Some(error),
            Self::Model(error) => Some(error),
        }
    }
}
