use std::path::PathBuf;

use clap::{ArgGroup, Parser};

use ann::{CvLambda, Value};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("weights").required(true).args(["theta", "layers"])))]
pub struct Args {
    /// A file of example inputs, one whitespace-separated row per example.
    #[arg(long)]
    pub x: PathBuf,

    /// A file of example targets, one row per example, in the same order as the inputs.
    #[arg(long)]
    pub y: PathBuf,

    /// Initial weights, one file per layer, input layer first.
    ///
    /// Each file holds one row per unit of its layer, with the bias weight first.
    #[arg(long, num_args = 1.., verbatim_doc_comment)]
    pub theta: Vec<PathBuf>,

    /// Randomly initialize weights for these layer sizes, input layer first.
    /// (e.g. 400,25,10)
    #[arg(long, value_delimiter = ',', verbatim_doc_comment)]
    pub layers: Vec<usize>,

    /// A JSON file of training options. Options given on the command line take precedence.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Candidate regularization strengths. (e.g. 0,0.1,1)
    #[arg(long = "lambda", value_delimiter = ',', verbatim_doc_comment)]
    pub lambdas: Vec<Value>,

    /// The number of gradient descent iterations per candidate.
    #[arg(long)]
    pub max_iters: Option<usize>,

    /// Shuffle the examples before splitting them into training, cross-validation and test sets.
    #[arg(long)]
    pub shuffle: bool,

    /// Seeds weight initialization and shuffling.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Train the candidates in parallel.
    #[arg(long)]
    pub parallel: bool,

    /// The regularization strength used when scoring on the cross-validation set.
    /// (zero or training)
    #[arg(long, value_parser = parse_cv_lambda, verbatim_doc_comment)]
    pub cv_lambda: Option<CvLambda>,

    /// Log the progress of every iteration.
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

fn parse_cv_lambda(s: &str) -> Result<CvLambda, String> {
    match s.to_lowercase().as_str() {
        "zero" => Ok(CvLambda::Zero),
        "training" => Ok(CvLambda::Training),
        _ => Err(format!("expected \"zero\" or \"training\", found \"{s}\"")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_arguments() {
        let args = Args::try_parse_from([
            "trainer",
            "--x",
            "x.txt",
            "--y",
            "y.txt",
            "--layers",
            "2,3,1",
            "--lambda",
            "0,0.5",
            "--cv-lambda",
            "training",
            "--seed",
            "7",
        ])
        .unwrap();

        assert_eq!(args.layers, vec![2, 3, 1]);
        assert_eq!(args.lambdas, vec![0.0, 0.5]);
        assert_eq!(args.cv_lambda, Some(CvLambda::Training));
        assert_eq!(args.seed, Some(7));
        assert!(args.theta.is_empty());
        assert!(!args.shuffle);
    }

    #[test]
    fn weights_are_required() {
        assert!(Args::try_parse_from(["trainer", "--x", "x.txt", "--y", "y.txt"]).is_err());
        assert!(Args::try_parse_from([
            "trainer", "--x", "x.txt", "--y", "y.txt", "--theta", "t1.txt", "t2.txt",
        ])
        .is_ok());
    }

    #[test]
    fn invalid_cv_lambda() {
        assert!(parse_cv_lambda("Zero").is_ok());
        assert!(parse_cv_lambda("lambda").is_err());
    }
}
