use crate::cli::{OutputArgs, SettingsArgs};
use crate::mixture::checkpoint::write_checkpoint;
use crate::mixture::config::{load_config, FitConfig};
use crate::mixture::counts::{load_counts, CountMatrix};
use crate::mixture::report::{self, ModelFile};
use crate::mixture::{EmResult, EmSettings, EmptyTopicPolicy, IterationReport, MixtureError};
use anyhow::{bail, Result};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use tracing::info;

/// Resolve settings: defaults, then the config file, then explicit flags.
pub fn resolve_settings(args: &SettingsArgs) -> Result<(EmSettings, Option<u64>)> {
    let config = match &args.config {
        Some(path) => {
            info!(path = %path.display(), "Loading fit config");
            load_config(path)?
        }
        None => FitConfig::default(),
    };
    let mut settings = config.apply(EmSettings::default());
    if let Some(tol) = args.tol {
        settings.tolerance = tol;
    }
    if let Some(max_iter) = args.max_iter {
        settings.max_iter = max_iter;
    }
    if let Some(slack) = args.regression_slack {
        settings.regression_slack = slack;
    }
    if args.reseed_empty_topics {
        settings.empty_topic_policy = EmptyTopicPolicy::Reseed;
    }
    settings.validate()?;
    Ok((settings, args.seed.or(config.seed)))
}

pub fn load_data(path: &Path, delimiter: u8) -> Result<CountMatrix> {
    info!(path = %path.display(), "Loading count table");
    let counts = load_counts(path, delimiter)?;
    let total: f64 = counts.doc_lengths().iter().sum();
    info!(
        documents = counts.n_docs(),
        terms = counts.n_terms(),
        total_count = total,
        "Count table loaded"
    );
    Ok(counts)
}

/// Writes a checkpoint every `every` iterations from inside the EM loop.
pub struct CheckpointWriter {
    path: Option<PathBuf>,
    every: Option<usize>,
    error: Option<MixtureError>,
}

impl CheckpointWriter {
    pub fn new(output: &OutputArgs) -> Result<Self> {
        if output.checkpoint_every == Some(0) {
            bail!("--checkpoint-every must be > 0");
        }
        Ok(Self {
            path: output.checkpoint.clone(),
            every: output.checkpoint_every,
            error: None,
        })
    }

    pub fn observe(&mut self, report: &IterationReport<'_>) -> ControlFlow<()> {
        let (path, every) = match (&self.path, self.every) {
            (Some(path), Some(every)) => (path, every),
            _ => return ControlFlow::Continue(()),
        };
        if report.iteration % every != 0 {
            return ControlFlow::Continue(());
        }
        match report
            .to_checkpoint()
            .and_then(|ckpt| write_checkpoint(path, &ckpt))
        {
            Ok(()) => {
                info!(iteration = report.iteration, path = %path.display(), "Checkpoint written");
                ControlFlow::Continue(())
            }
            Err(e) => {
                self.error = Some(e);
                ControlFlow::Break(())
            }
        }
    }

    /// Surface a checkpoint write failure that stopped the loop.
    pub fn finish(self) -> Result<()> {
        match self.error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

/// Write the model and every optional output requested on the command line.
pub fn write_outputs(
    counts: &CountMatrix,
    result: &EmResult,
    output: &OutputArgs,
    delimiter: u8,
) -> Result<()> {
    let model = ModelFile::from_result(counts, result);
    info!(path = %output.output_model.display(), "Writing model");
    report::write_model(&output.output_model, &model)?;
    if let Some(path) = &output.output_responsibilities {
        info!(path = %path.display(), "Writing responsibilities");
        report::write_responsibilities(path, counts, &result.responsibilities, delimiter)?;
    }
    if let Some(path) = &output.output_top_terms {
        info!(path = %path.display(), n = output.n_top_terms, "Writing top terms");
        report::write_top_terms(
            path,
            &result.params,
            counts.vocabulary(),
            output.n_top_terms,
            delimiter,
        )?;
    }
    if let Some(path) = &output.checkpoint {
        info!(path = %path.display(), "Writing final checkpoint");
        write_checkpoint(path, &result.checkpoint()?)?;
    }
    Ok(())
}

pub fn describe_result(result: &EmResult) -> String {
    let prevalence: Vec<String> = result
        .params
        .rho()
        .iter()
        .map(|r| format!("{:.4}", r))
        .collect();
    format!(
        "status = {:?}, iterations = {}, log-likelihood = {:.4}, rho = [{}]",
        result.status,
        result.iterations,
        result.final_log_likelihood,
        prevalence.join(", ")
    )
}
