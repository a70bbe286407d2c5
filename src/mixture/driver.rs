use crate::mixture::checkpoint::Checkpoint;
use crate::mixture::counts::CountMatrix;
use crate::mixture::error::MixtureError;
use crate::mixture::estep::{e_step, log_likelihood};
use crate::mixture::init::Initializer;
use crate::mixture::mstep::{m_step_with_policy, EmptyTopicPolicy};
use crate::mixture::params::ParameterState;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;
use tracing::{debug, info, warn};

/// EM loop settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmSettings {
    /// Stop once the log-likelihood gain of an iteration falls below this.
    pub tolerance: f64,
    /// Upper bound on completed E/M iterations.
    pub max_iter: usize,
    /// Log-likelihood drops smaller than this are treated as rounding noise.
    pub regression_slack: f64,
    pub empty_topic_policy: EmptyTopicPolicy,
}

impl Default for EmSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-3,
            max_iter: 500,
            regression_slack: 1e-9,
            empty_topic_policy: EmptyTopicPolicy::Fail,
        }
    }
}

impl EmSettings {
    pub fn validate(&self) -> Result<(), MixtureError> {
        if !(self.tolerance >= 0.0) || !self.tolerance.is_finite() {
            return Err(MixtureError::Config(format!(
                "tolerance must be finite and non-negative, got {}",
                self.tolerance
            )));
        }
        if self.max_iter == 0 {
            return Err(MixtureError::Config("max_iter must be > 0".into()));
        }
        if !(self.regression_slack >= 0.0) || !self.regression_slack.is_finite() {
            return Err(MixtureError::Config(format!(
                "regression_slack must be finite and non-negative, got {}",
                self.regression_slack
            )));
        }
        Ok(())
    }
}

/// How a fit ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitStatus {
    Converged,
    MaxIterationsReached,
    /// The iteration observer asked to stop at an iteration boundary.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriverState {
    Running,
    Terminated(FitStatus),
}

/// Snapshot handed to the observer between iterations.
#[derive(Debug)]
pub struct IterationReport<'a> {
    pub iteration: usize,
    pub log_likelihood: f64,
    pub params: &'a ParameterState,
    pub trajectory: &'a [f64],
}

impl IterationReport<'_> {
    pub fn to_checkpoint(&self) -> Result<Checkpoint, MixtureError> {
        Checkpoint::new(self.params.clone(), self.iteration, self.trajectory.to_vec())
    }
}

/// Inputs of the fit entry point besides the counts and topic count.
#[derive(Debug, Clone, Default)]
pub struct FitOptions {
    pub initializer: Initializer,
    pub settings: EmSettings,
    /// Seed for random initialization and reseeding; OS entropy when absent.
    pub seed: Option<u64>,
}

/// Result of an EM fit.
#[derive(Debug, Clone)]
pub struct EmResult {
    pub params: ParameterState,
    /// Responsibilities from the last E-step, shape [n_docs][n_topics].
    pub responsibilities: Array2<f64>,
    /// Corpus log-likelihood after each E-step, oldest first. Entry `i` scores
    /// the parameters that iteration `i + 1` started from.
    pub trajectory: Vec<f64>,
    pub iterations: usize,
    /// Corpus log-likelihood of `params`, i.e. after the final M-step.
    pub final_log_likelihood: f64,
    pub status: FitStatus,
    /// Iterations (numbered from 1) whose log-likelihood dropped by more
    /// than the slack.
    pub regressions: Vec<usize>,
    /// (iteration, topic) pairs whose emission row was redrawn; iterations
    /// are numbered from 1.
    pub reseeded_topics: Vec<(usize, usize)>,
}

impl EmResult {
    /// Most probable topic per document.
    pub fn assignments(&self) -> Vec<usize> {
        hard_assignments(&self.responsibilities)
    }

    pub fn checkpoint(&self) -> Result<Checkpoint, MixtureError> {
        Checkpoint::new(self.params.clone(), self.iterations, self.trajectory.clone())
    }
}

pub(crate) fn hard_assignments(responsibilities: &Array2<f64>) -> Vec<usize> {
    responsibilities
        .rows()
        .into_iter()
        .map(|row| {
            let mut best = 0;
            for (k, &r) in row.iter().enumerate() {
                if r > row[best] {
                    best = k;
                }
            }
            best
        })
        .collect()
}

/// Fit a `n_topics` mixture to `counts`.
pub fn fit(counts: &CountMatrix, n_topics: usize, options: &FitOptions) -> Result<EmResult, MixtureError> {
    fit_with_observer(counts, n_topics, options, |_| ControlFlow::Continue(()))
}

/// Like [`fit`], calling `observer` at every iteration boundary. Returning
/// `ControlFlow::Break` ends the fit with `FitStatus::Cancelled`.
pub fn fit_with_observer<F>(
    counts: &CountMatrix,
    n_topics: usize,
    options: &FitOptions,
    observer: F,
) -> Result<EmResult, MixtureError>
where
    F: FnMut(&IterationReport<'_>) -> ControlFlow<()>,
{
    options.settings.validate()?;
    let mut rng = seeded_rng(options.seed);
    let params = options
        .initializer
        .initialize(counts.n_docs(), counts.n_terms(), n_topics, &mut rng)?;
    run_em(counts, Checkpoint::initial(params), &options.settings, &mut rng, observer)
}

/// Continue a fit from a checkpoint. `settings.max_iter` counts the
/// iterations already in the checkpoint.
pub fn resume<F>(
    counts: &CountMatrix,
    checkpoint: Checkpoint,
    settings: &EmSettings,
    seed: Option<u64>,
    observer: F,
) -> Result<EmResult, MixtureError>
where
    F: FnMut(&IterationReport<'_>) -> ControlFlow<()>,
{
    settings.validate()?;
    if checkpoint.iteration() >= settings.max_iter {
        return Err(MixtureError::Config(format!(
            "checkpoint already ran {} iterations (max_iter = {})",
            checkpoint.iteration(),
            settings.max_iter
        )));
    }
    let mut rng = seeded_rng(seed);
    run_em(counts, checkpoint, settings, &mut rng, observer)
}

pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// Alternate E and M steps from `start` until the stopping rule fires.
pub fn run_em<R, F>(
    counts: &CountMatrix,
    start: Checkpoint,
    settings: &EmSettings,
    rng: &mut R,
    mut observer: F,
) -> Result<EmResult, MixtureError>
where
    R: Rng + ?Sized,
    F: FnMut(&IterationReport<'_>) -> ControlFlow<()>,
{
    if counts.n_terms() != start.params().n_terms() {
        return Err(MixtureError::InvalidShape(format!(
            "counts have {} terms, parameters have {}",
            counts.n_terms(),
            start.params().n_terms()
        )));
    }
    let (mut params, mut iteration, mut trajectory) = start.into_parts();
    let mut regressions = Vec::new();
    let mut reseeded_topics = Vec::new();
    let mut state = DriverState::Running;
    let mut responsibilities = Array2::<f64>::zeros((counts.n_docs(), params.n_topics()));

    while state == DriverState::Running {
        // Iterations are numbered from 1 everywhere they are reported.
        iteration += 1;
        let expectation = e_step(counts, &params).map_err(|e| e.at_iteration(iteration))?;
        trajectory.push(expectation.log_likelihood);
        let step = m_step_with_policy(
            counts,
            &expectation.responsibilities,
            settings.empty_topic_policy,
            rng,
        )
        .map_err(|e| e.at_iteration(iteration))?;
        for &k in &step.reseeded {
            warn!(iteration, topic = k, "topic lost all mass; reseeded its emission row");
            reseeded_topics.push((iteration, k));
        }
        params = step.params;
        responsibilities = expectation.responsibilities;
        debug!(iteration, log_likelihood = expectation.log_likelihood, "EM iteration");

        let (next, regression) = stopping_rule(&trajectory, iteration, settings);
        if let Some(delta) = regression {
            warn!(
                iteration,
                delta, "log-likelihood decreased; not treating this iteration as converged"
            );
            regressions.push(iteration);
        }
        state = next;
        if state == DriverState::Running {
            let report = IterationReport {
                iteration,
                log_likelihood: expectation.log_likelihood,
                params: &params,
                trajectory: &trajectory,
            };
            if observer(&report).is_break() {
                state = DriverState::Terminated(FitStatus::Cancelled);
            }
        }
    }

    let status = match state {
        DriverState::Terminated(status) => status,
        DriverState::Running => FitStatus::Cancelled,
    };
    let final_log_likelihood =
        log_likelihood(counts, &params).map_err(|e| e.at_iteration(iteration))?;
    info!(
        ?status,
        iterations = iteration,
        log_likelihood = final_log_likelihood,
        "EM finished"
    );
    Ok(EmResult {
        params,
        responsibilities,
        trajectory,
        iterations: iteration,
        final_log_likelihood,
        status,
        regressions,
        reseeded_topics,
    })
}

/// Decide the next driver state after `iterations` completed iterations.
/// Also returns the delta when the last iteration lowered the likelihood
/// beyond the slack.
fn stopping_rule(
    trajectory: &[f64],
    iterations: usize,
    settings: &EmSettings,
) -> (DriverState, Option<f64>) {
    let mut regression = None;
    if trajectory.len() >= 2 {
        let delta = trajectory[trajectory.len() - 1] - trajectory[trajectory.len() - 2];
        if delta < -settings.regression_slack {
            regression = Some(delta);
        } else if delta < settings.tolerance {
            return (DriverState::Terminated(FitStatus::Converged), None);
        }
    }
    if iterations >= settings.max_iter {
        return (
            DriverState::Terminated(FitStatus::MaxIterationsReached),
            regression,
        );
    }
    (DriverState::Running, regression)
}
