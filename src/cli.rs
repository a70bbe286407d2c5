use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line interface definition.
#[derive(Debug, Parser)]
#[command(
    name = "topicmix",
    version,
    about = "Multinomial mixture topic models fitted by expectation-maximization"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit a mixture with a fixed number of topics.
    Fit(FitArgs),
    /// Continue a fit from a checkpoint file.
    Resume(ResumeArgs),
    /// Compute topic responsibilities for documents under a fitted model.
    Assign(AssignArgs),
}

/// Input count table.
#[derive(Debug, Clone, Args)]
pub struct DataArgs {
    /// Delimited count table: header `id, term...`, one row per document.
    #[arg(long, value_name = "FILE")]
    pub data: PathBuf,

    /// Single-byte field delimiter for input and output tables. Default is tab.
    #[arg(long, default_value = "\t", value_parser = parse_delimiter)]
    pub delimiter: u8,
}

/// Convergence settings. Flags override values from `--config`.
#[derive(Debug, Clone, Default, Args)]
pub struct SettingsArgs {
    /// TOML file with tolerance, max_iter, regression_slack, seed, empty_topic_policy.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Stop once an iteration improves the log-likelihood by less than this.
    #[arg(long)]
    pub tol: Option<f64>,

    /// Maximum number of E/M iterations.
    #[arg(long)]
    pub max_iter: Option<usize>,

    /// Log-likelihood drops up to this size are treated as rounding noise.
    #[arg(long)]
    pub regression_slack: Option<f64>,

    /// Seed for random initialization and topic reseeding.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Redraw a topic's emission row instead of failing when it loses all mass.
    #[arg(long)]
    pub reseed_empty_topics: bool,
}

/// Fit outputs.
#[derive(Debug, Clone, Args)]
pub struct OutputArgs {
    /// JSON model output.
    #[arg(long, value_name = "FILE")]
    pub output_model: PathBuf,

    /// Optional per-document responsibilities table.
    #[arg(long, value_name = "FILE")]
    pub output_responsibilities: Option<PathBuf>,

    /// Optional table of the most probable terms per topic.
    #[arg(long, value_name = "FILE")]
    pub output_top_terms: Option<PathBuf>,

    /// Number of terms per topic in the top-terms table.
    #[arg(long, default_value_t = 10)]
    pub n_top_terms: usize,

    /// Checkpoint file, written when the fit ends.
    #[arg(long, value_name = "FILE")]
    pub checkpoint: Option<PathBuf>,

    /// Also write the checkpoint every N iterations (requires --checkpoint).
    #[arg(long, value_name = "N", requires = "checkpoint")]
    pub checkpoint_every: Option<usize>,
}

/// Arguments for fitting a model.
#[derive(Debug, Clone, Args)]
pub struct FitArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Number of topics K.
    #[arg(long, short = 'k')]
    pub topics: usize,

    /// JSON file with optional starting `rho` and `beta`.
    #[arg(long, value_name = "FILE")]
    pub priors: Option<PathBuf>,

    #[command(flatten)]
    pub settings: SettingsArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Arguments for resuming from a checkpoint.
#[derive(Debug, Clone, Args)]
pub struct ResumeArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Checkpoint to continue from.
    #[arg(long, value_name = "FILE")]
    pub from: PathBuf,

    #[command(flatten)]
    pub settings: SettingsArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Arguments for assigning documents with a fitted model.
#[derive(Debug, Clone, Args)]
pub struct AssignArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Model JSON written by `fit` or `resume`.
    #[arg(long, value_name = "FILE")]
    pub model: PathBuf,

    /// Responsibilities table output.
    #[arg(long, value_name = "FILE")]
    pub output: PathBuf,
}

fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value.as_bytes() {
        [byte] => Ok(*byte),
        _ => Err(format!("delimiter must be a single byte, got {:?}", value)),
    }
}
