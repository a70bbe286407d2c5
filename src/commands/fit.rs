use crate::cli::FitArgs;
use crate::commands::shared::{
    describe_result, load_data, resolve_settings, write_outputs, CheckpointWriter,
};
use crate::mixture::params::load_priors;
use crate::mixture::{fit_with_observer, FitOptions, Initializer};
use anyhow::Result;
use std::time::Instant;
use tracing::info;

pub fn run(args: FitArgs) -> Result<()> {
    let counts = load_data(&args.data.data, args.data.delimiter)?;
    let (settings, seed) = resolve_settings(&args.settings)?;
    let initializer = match &args.priors {
        Some(path) => {
            info!(path = %path.display(), "Loading priors");
            let priors = load_priors(path)?;
            Initializer::new(priors.rho_array(), priors.beta_array()?)
        }
        None => Initializer::default(),
    };
    let options = FitOptions {
        initializer,
        settings,
        seed,
    };

    info!(
        topics = args.topics,
        max_iter = settings.max_iter,
        tolerance = settings.tolerance,
        "Fitting EM"
    );
    let start = Instant::now();
    let mut checkpoints = CheckpointWriter::new(&args.output)?;
    let result = fit_with_observer(&counts, args.topics, &options, |report| {
        checkpoints.observe(report)
    })?;
    checkpoints.finish()?;
    info!("Fit complete in {:.2?}: {}", start.elapsed(), describe_result(&result));

    write_outputs(&counts, &result, &args.output, args.data.delimiter)
}
